//! Stitching of equally sized tiles into a single raster.

use anyhow::{Context, Result};
use image::{imageops, DynamicImage, GenericImageView, RgbaImage};
use std::path::{Path, PathBuf};

use crate::error::GridError;
use crate::tree;

/// Arranges `images` row-major, `columns` per row, into one raster. The last row
/// may be incomplete; missing cells stay transparent.
///
/// All images must share the pixel dimensions of the first one.
pub fn join_images(images: &[DynamicImage], columns: u32) -> Result<RgbaImage, GridError> {
    if columns == 0 {
        return Err(GridError::InvalidColumns);
    }

    let per_row = columns as usize;
    let rows = u32::try_from(images.len().div_ceil(per_row)).map_err(|_| {
        GridError::CanvasTooLarge {
            rows: u32::MAX,
            columns,
        }
    })?;
    let cells = images
        .iter()
        .enumerate()
        .map(move |(i, img)| ((i / per_row) as u32, (i % per_row) as u32, img));

    compose(cells, rows, columns)
}

/// Places each `(row, col, image)` cell on a `rows` x `columns` canvas.
fn compose<'a>(
    cells: impl Iterator<Item = (u32, u32, &'a DynamicImage)> + Clone,
    rows: u32,
    columns: u32,
) -> Result<RgbaImage, GridError> {
    let (tile_width, tile_height) = match cells.clone().next() {
        Some((_, _, first)) => first.dimensions(),
        None => return Err(GridError::NoTiles),
    };

    let too_large = || GridError::CanvasTooLarge { rows, columns };
    let width = columns.checked_mul(tile_width).ok_or_else(too_large)?;
    let height = rows.checked_mul(tile_height).ok_or_else(too_large)?;
    (width as u64)
        .checked_mul(height as u64)
        .and_then(|pixels| pixels.checked_mul(4))
        .and_then(|bytes| usize::try_from(bytes).ok())
        .ok_or_else(too_large)?;

    let mut canvas = RgbaImage::new(width, height);
    for (index, (row, col, img)) in cells.enumerate() {
        let (width, height) = img.dimensions();
        if (width, height) != (tile_width, tile_height) {
            return Err(GridError::TileSizeMismatch {
                index,
                expected_width: tile_width,
                expected_height: tile_height,
                actual_width: width,
                actual_height: height,
            });
        }

        imageops::replace(
            &mut canvas,
            &img.to_rgba8(),
            (col * tile_width) as i64,
            (row * tile_height) as i64,
        );
    }

    Ok(canvas)
}

fn open(path: &Path) -> Result<DynamicImage> {
    image::open(path).with_context(|| format!("failed reading tile {}", path.display()))
}

fn save(canvas: RgbaImage, output: &Path) -> Result<()> {
    let is_jpeg = output
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
        .unwrap_or(false);

    let result = if is_jpeg {
        DynamicImage::ImageRgba8(canvas).to_rgb8().save(output)
    } else {
        canvas.save(output)
    };
    result.with_context(|| format!("failed writing {}", output.display()))
}

/// Joins the image files at `paths`, in the given order, `columns` per row, and
/// writes the result to `output`. Returns the (width, height) of the result.
pub fn join_tiles(paths: &[PathBuf], columns: u32, output: &Path) -> Result<(u32, u32)> {
    let images = paths
        .iter()
        .map(|path| open(path))
        .collect::<Result<Vec<_>>>()?;

    let canvas = join_images(&images, columns)?;
    let dimensions = canvas.dimensions();
    save(canvas, output)?;

    log::info!(
        "joined {} tiles into {} ({}x{} px)",
        paths.len(),
        output.display(),
        dimensions.0,
        dimensions.1
    );
    Ok(dimensions)
}

/// Tiles of a `<row>/<col>.<ext>` level folder, keyed by their numbers.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelTiles {
    /// (row, col, path), ordered row-major.
    pub tiles: Vec<(u32, u32, PathBuf)>,
    pub rows: u32,
    pub columns: u32,
}

/// Collects the tiles of a level folder. The grid spans from (0, 0) to the
/// largest row and column numbers found.
pub fn collect_level_tiles(level_dir: &Path) -> Result<LevelTiles> {
    let mut tiles = Vec::new();
    for row in tree::numeric_dirs(level_dir)? {
        for col in tree::numeric_files(&row.path)? {
            tiles.push((row.number, col.number, col.path));
        }
    }

    let rows = tiles.iter().map(|t| t.0 + 1).max().unwrap_or(0);
    let columns = tiles.iter().map(|t| t.1 + 1).max().unwrap_or(0);

    Ok(LevelTiles {
        tiles,
        rows,
        columns,
    })
}

/// Joins every tile of an aligned level folder into one raster, each tile at the
/// position given by its row folder and file number.
pub fn join_level(level_dir: &Path, output: &Path) -> Result<(u32, u32)> {
    let level = collect_level_tiles(level_dir)?;
    if level.tiles.is_empty() {
        return Err(GridError::EmptyLevel(level_dir.to_path_buf()).into());
    }

    let images = level
        .tiles
        .iter()
        .map(|(row, col, path)| -> Result<_> { Ok((*row, *col, open(path)?)) })
        .collect::<Result<Vec<_>>>()?;

    let cells = images.iter().map(|(row, col, img)| (*row, *col, img));
    let canvas = compose(cells, level.rows, level.columns)?;
    let dimensions = canvas.dimensions();
    save(canvas, output)?;

    log::info!(
        "joined level {} into {} ({}x{} px)",
        level_dir.display(),
        output.display(),
        dimensions.0,
        dimensions.1
    );
    Ok(dimensions)
}
