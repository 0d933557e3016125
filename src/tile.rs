use anyhow::{Context, Result};
use reqwest::StatusCode;
use std::path::{Path, PathBuf};
use tokio::{fs, io::AsyncWriteExt};

use crate::config::Config;

/// A tile of a WMTS tile matrix, addressed both by its source coordinates
/// (zoom, row, col) and by its zero-based position in the local pyramid
/// (level_index, row_index, col_index).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Tile {
    pub zoom: u8,
    pub row: u32,
    pub col: u32,
    pub level_index: u8,
    pub row_index: u32,
    pub col_index: u32,
}

/// What happened to a single tile during a fetch.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TileOutcome {
    Written,
    /// Already on disk and not re-fetched.
    Skipped,
    /// The service answered with a non-success status.
    Rejected(StatusCode),
}

impl Tile {
    /// Destination of the tile: `<map_dir>/<level_index>/<row_index>/<col_index>.<extension>`.
    pub fn path(&self, map_dir: &Path, extension: &str) -> PathBuf {
        let mut target = self.row_dir(map_dir);
        target.push(format!("{}.{}", self.col_index, extension));
        target
    }

    fn row_dir(&self, map_dir: &Path) -> PathBuf {
        let mut target = map_dir.join(self.level_index.to_string());
        target.push(self.row_index.to_string());
        target
    }

    /// Fetches the tile with the given HTTP client and writes it below the map
    /// directory of `cfg`.
    ///
    /// Transport and filesystem errors are returned. A non-success HTTP status is
    /// not an error: nothing is written and the status is reported back.
    pub async fn fetch_from(
        &self,
        client: &reqwest::Client,
        layer: &str,
        cfg: &Config,
    ) -> Result<TileOutcome> {
        let map_dir = cfg.map_dir();
        let output_file = self.path(&map_dir, &cfg.extension);

        // if the tile's already been downloaded, skip it
        if !cfg.fetch_existing && output_file.exists() {
            return Ok(TileOutcome::Skipped);
        }

        let formatted_url = cfg.url.tile_url(layer, self)?;
        log::debug!(
            "downloading zoom {} row {} col {}",
            self.zoom,
            self.row,
            self.col
        );

        let mut request = client.get(&formatted_url);
        if let Some(creds) = &cfg.credentials {
            request = request.basic_auth(&creds.user, Some(&creds.password));
        }

        let mut response = request.send().await.with_context(|| {
            format!(
                "failed fetching tile {}x{}x{}",
                self.zoom, self.row, self.col
            )
        })?;

        if response.status() != StatusCode::OK {
            return Ok(TileOutcome::Rejected(response.status()));
        }

        let row_dir = self.row_dir(&map_dir);
        fs::create_dir_all(&row_dir).await.with_context(|| {
            format!(
                "failed creating output directory for tile {}x{}x{}",
                self.zoom, self.row, self.col
            )
        })?;

        // only a complete body is moved to the tile's path
        let part_file = output_file.with_extension(format!("{}.part", cfg.extension));
        if let Err(e) = self.stream_body(&mut response, &part_file).await {
            let _ = fs::remove_file(&part_file).await;
            return Err(e);
        }
        fs::rename(&part_file, &output_file)
            .await
            .with_context(|| format!("failed moving tile to {}", output_file.display()))?;

        Ok(TileOutcome::Written)
    }

    async fn stream_body(&self, response: &mut reqwest::Response, target: &Path) -> Result<()> {
        let mut file = fs::File::create(target)
            .await
            .with_context(|| format!("failed creating {}", target.display()))?;
        while let Some(chunk) = response.chunk().await.with_context(|| {
            format!(
                "failed streaming tile {}x{}x{}",
                self.zoom, self.row, self.col
            )
        })? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_uses_zero_based_indices() {
        let tile = Tile {
            zoom: 15,
            row: 18360,
            col: 21450,
            level_index: 1,
            row_index: 6,
            col_index: 6,
        };
        assert_eq!(
            tile.path(Path::new("out/reunion-est"), "jpg"),
            Path::new("out/reunion-est/1/6/6.jpg")
        );
    }
}
