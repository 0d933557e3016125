use anyhow::{bail, Context, Result};
use clap::crate_version;
use futures::{prelude::*, stream};
use indicatif::{ProgressBar, ProgressStyle};
use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};
use tokio::fs;

use crate::config::Config;
use crate::grid::{self, ZoomLevel};
use crate::tile::TileOutcome;

const ZERO_DURATION: Duration = Duration::from_secs(0);

/// Average size of a downloaded tile, in bytes.
const AVERAGE_TILE_BYTES: f64 = 16_900.0;

/// Number of tiles billed as one service transaction.
const TILES_PER_TRANSACTION: f64 = 15.981973;

/// Outcome of a fetch run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FetchSummary {
    pub written: u64,
    pub skipped: u64,
    pub failed: u64,
}

/// What a fetch of the given levels would cost.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Estimate {
    pub tiles: u64,
    pub bytes: f64,
    pub transactions: u64,
}

impl Estimate {
    pub fn for_levels(levels: &[ZoomLevel]) -> Self {
        let tiles = grid::count_tiles(levels);
        Estimate {
            tiles,
            bytes: tiles as f64 * AVERAGE_TILE_BYTES,
            transactions: (tiles as f64 / TILES_PER_TRANSACTION).ceil() as u64,
        }
    }
}

impl fmt::Display for Estimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tiles (approx {}, {} transactions)",
            self.tiles,
            pretty_bytes::converter::convert(self.bytes),
            self.transactions
        )
    }
}

/// Asynchronously fetch the WMTS tiles specified in `cfg` and save them to the
/// file system under `<output_folder>/<map_name>/<level>/<row>/<col>.<ext>`.
///
/// The grid of every level is resolved before any request is made, so invalid
/// coordinates fail fast. A tile the service refuses, or that fails in transport,
/// is logged and skipped; the run continues.
///
/// # Example
/// ```no_run
/// use tile_pyramid::{fetch, BoundingBox, Config, UrlFormat, IGN_WMTS_URL};
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() {
/// let config = Config {
///     bounding_box: BoundingBox::new(-21.147418, 55.593894, -21.346769, 55.797828).unwrap(),
///     credentials: None,
///     layer: "GEOGRAPHICALGRIDSYSTEMS.MAPS".into(),
///     fetch_existing: false,
///     fetch_rate: 1,
///     output_folder: "./tiles".into(),
///     map_name: "reunion-est".into(),
///     url: UrlFormat::new(IGN_WMTS_URL.into(), "API_KEY".into()),
///     extension: "jpg".into(),
///     timeout: Duration::from_secs(30),
///     min_zoom: 14,
///     max_zoom: 16,
/// };
///
/// fetch(config).await.expect("failed fetching tiles");
/// # }
/// ```
pub async fn fetch(cfg: Config) -> Result<FetchSummary> {
    let levels = cfg.levels()?;

    let output_folder = cfg.output_folder.as_path();
    if output_folder.exists() && !output_folder.is_dir() {
        bail!("output {} must be a directory", output_folder.display());
    }

    let map_dir = cfg.map_dir();
    fs::create_dir_all(&map_dir)
        .await
        .context("failed to create map directory")?;

    log::info!("using layer {}", cfg.layer);
    for (index, level) in levels.iter().enumerate() {
        log::info!("level {} (zoom {}): {:?}", index, level.zoom, level.grid);
    }
    let (top_left, bottom_right) = grid::calibration_points(&levels[0]);
    log::info!(
        "calibration: top left ({}, {}), bottom right ({}, {})",
        top_left.proj_x,
        top_left.proj_y,
        bottom_right.proj_x,
        bottom_right.proj_y
    );

    let pb = ProgressBar::new(grid::count_tiles(&levels));
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:60.cyan/blue} {pos:>7}/{len:7} ETA: {eta} {msg}")
            .context("invalid progress bar template")?
            .progress_chars("##-"),
    );

    let mut builder = reqwest::Client::builder()
        .user_agent(format!("tile-pyramid_rs_{}", crate_version!()));
    if cfg.timeout > ZERO_DURATION {
        builder = builder.timeout(cfg.timeout);
    }
    let client = builder
        .build()
        .with_context(|| "failed creating HTTP client")?;

    let written = AtomicU64::new(0);
    let skipped = AtomicU64::new(0);
    let failed = AtomicU64::new(0);

    let cfg = &cfg;
    let client = &client;
    let (written_ref, skipped_ref, failed_ref) = (&written, &skipped, &failed);

    let all_tiles = levels.iter().enumerate().flat_map(|(index, level)| {
        let layer = level.layer.as_str();
        level.tiles(index as u8).map(move |tile| (layer, tile))
    });

    stream::iter(pb.wrap_iter(all_tiles))
        .for_each_concurrent(cfg.fetch_rate.max(1) as usize, |(layer, tile)| async move {
            match tile.fetch_from(client, layer, cfg).await {
                Ok(TileOutcome::Written) => {
                    written_ref.fetch_add(1, Ordering::Relaxed);
                }
                Ok(TileOutcome::Skipped) => {
                    skipped_ref.fetch_add(1, Ordering::Relaxed);
                }
                Ok(TileOutcome::Rejected(status)) => {
                    log::warn!(
                        "tile zoom {} row {} col {} refused: {}",
                        tile.zoom,
                        tile.row,
                        tile.col,
                        status
                    );
                    failed_ref.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    log::warn!(
                        "failed fetching tile zoom {} row {} col {}: {:?}",
                        tile.zoom,
                        tile.row,
                        tile.col,
                        e
                    );
                    failed_ref.fetch_add(1, Ordering::Relaxed);
                }
            }
        })
        .await;

    pb.finish_and_clear();

    let summary = FetchSummary {
        written: written.into_inner(),
        skipped: skipped.into_inner(),
        failed: failed.into_inner(),
    };
    log::info!(
        "{} tiles written, {} skipped, {} failed",
        summary.written,
        summary.skipped,
        summary.failed
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounding_box::BoundingBox;
    use crate::config::tests::reunion_config;
    use crate::error::GridError;
    use crate::url::UrlFormat;
    use std::{
        io::{Read, Write},
        net::{SocketAddr, TcpListener},
        path::Path,
        thread::{self, JoinHandle},
    };

    /// Answers `connections` requests with the raw response `respond` builds from
    /// the request path, then returns the request heads it received.
    fn serve(
        connections: usize,
        respond: fn(&str) -> String,
    ) -> (SocketAddr, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let mut heads = Vec::new();
            for _ in 0..connections {
                let (mut stream, _) = listener.accept().unwrap();
                let mut head = Vec::new();
                let mut byte = [0_u8; 1];
                while !head.ends_with(b"\r\n\r\n") && stream.read(&mut byte).unwrap() == 1 {
                    head.push(byte[0]);
                }
                let head = String::from_utf8(head).unwrap();
                let path = head.split_whitespace().nth(1).unwrap_or_default().to_owned();
                stream.write_all(respond(&path).as_bytes()).unwrap();
                heads.push(head);
            }
            heads
        });

        (addr, handle)
    }

    fn response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        )
    }

    /// Two tiles at zoom 1: row 1, cols 0 and 1.
    fn local_config(addr: SocketAddr, output_folder: &Path) -> Config {
        let mut cfg = reunion_config();
        cfg.bounding_box = BoundingBox::new(-5.0, -170.0, -10.0, 170.0).unwrap();
        cfg.min_zoom = 1;
        cfg.max_zoom = 1;
        cfg.layer = "ortho".into();
        cfg.output_folder = output_folder.to_path_buf();
        cfg.url = UrlFormat::new(
            format!("http://{}/{{layer}}/{{zoom}}/{{row}}/{{col}}", addr),
            String::new(),
        );
        cfg
    }

    #[test]
    fn estimate_reunion() {
        let levels = reunion_config().levels().unwrap();
        let estimate = Estimate::for_levels(&levels);
        // 11x11 at zoom 14, then 22x22 and 44x44
        assert_eq!(estimate.tiles, 121 + 484 + 1936);
        assert_eq!(estimate.transactions, 159);
        assert!((estimate.bytes - 2541.0 * 16_900.0).abs() < 1e-6);
        assert!(estimate.to_string().starts_with("2541 tiles"));
    }

    #[tokio::test]
    async fn invalid_zoom_range_fails_before_any_io() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = reunion_config();
        cfg.output_folder = dir.path().to_path_buf();
        cfg.min_zoom = 16;
        cfg.max_zoom = 14;

        let err = fetch(cfg).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<GridError>(),
            Some(&GridError::InvalidZoomRange { min: 16, max: 14 })
        );
        assert!(!dir.path().join("reunion-est").exists());
    }

    #[tokio::test]
    async fn existing_tiles_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = reunion_config();
        cfg.output_folder = dir.path().to_path_buf();
        cfg.max_zoom = 14;

        let levels = cfg.levels().unwrap();
        for tile in grid::tiles(&levels) {
            let path = tile.path(&cfg.map_dir(), &cfg.extension);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, b"jpeg").unwrap();
        }

        let summary = fetch(cfg).await.unwrap();
        assert_eq!(
            summary,
            FetchSummary {
                written: 0,
                skipped: 121,
                failed: 0
            }
        );
    }

    #[tokio::test]
    async fn writes_accepted_tiles_and_counts_refused_ones() {
        let (addr, server) = serve(2, |path| match path {
            "/ortho/1/1/0" => response("200 OK", "tile 1/1/0"),
            _ => response("404 Not Found", ""),
        });
        let dir = tempfile::tempdir().unwrap();
        let cfg = local_config(addr, dir.path());
        let map_dir = cfg.map_dir();

        let summary = fetch(cfg).await.unwrap();
        assert_eq!(
            summary,
            FetchSummary {
                written: 1,
                skipped: 0,
                failed: 1
            }
        );
        assert_eq!(
            std::fs::read_to_string(map_dir.join("0/0/0.jpg")).unwrap(),
            "tile 1/1/0"
        );
        assert!(!map_dir.join("0/0/1.jpg").exists());

        let heads = server.join().unwrap();
        assert_eq!(heads.len(), 2);
        for head in heads {
            // login:secret
            assert!(head
                .to_lowercase()
                .contains("authorization: basic bg9naw46c2vjcmv0"));
        }
    }

    #[tokio::test]
    async fn truncated_tile_is_fetched_again() {
        let (addr, server) = serve(2, |_| {
            "HTTP/1.1 200 OK\r\nContent-Length: 1000\r\nConnection: close\r\n\r\n0123456789"
                .to_owned()
        });
        let dir = tempfile::tempdir().unwrap();
        let cfg = local_config(addr, dir.path());
        let tile_dir = cfg.map_dir().join("0/0");

        let summary = fetch(cfg).await.unwrap();
        assert_eq!(
            summary,
            FetchSummary {
                written: 0,
                skipped: 0,
                failed: 2
            }
        );
        server.join().unwrap();
        let leftovers = std::fs::read_dir(&tile_dir)
            .map(|entries| entries.count())
            .unwrap_or(0);
        assert_eq!(leftovers, 0);

        let (addr, server) = serve(2, |_| response("200 OK", "complete"));
        let summary = fetch(local_config(addr, dir.path())).await.unwrap();
        assert_eq!(
            summary,
            FetchSummary {
                written: 2,
                skipped: 0,
                failed: 0
            }
        );
        assert_eq!(
            std::fs::read_to_string(tile_dir.join("1.jpg")).unwrap(),
            "complete"
        );
        server.join().unwrap();
    }
}
