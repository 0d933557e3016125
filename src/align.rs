//! Re-indexing of OpenStreetMap-style tile trees.
//!
//! Third party downloaders write each zoom level with its native slippy-map tile
//! numbers, `<zoom>/<x>/<y>.png`. Here the folders below a level are called rows
//! and the files in them columns, whatever map axis they stand for; both axes scale
//! by the same factor between zoom levels, so the shifts do not depend on it.
//!
//! The aligner finds, for every level, the row and column shift that puts its top
//! left tile at the same geographic place as the top left tile of the minimum
//! level, then copies all tiles into a zero-based tree:
//! `<dest>/<level_index>/<row_index>/<col_index>.<ext>`. The output keeps the axis
//! order of the source, so an `<x>/<y>` source gives an `<x>/<y>` output.
//!
//! The top left tile of the minimum level is taken as the anchor of every level.
//! If the source tree is missing tiles on that edge, levels end up misaligned.

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::GridError;
use crate::grid::MAX_ZOOM;
use crate::mercator::TILE_SIZE_PX;
use crate::slippy;
use crate::tree;

/// Tolerance on virtual tile coordinates at `zoom` before flooring them; a tile
/// corner projected to a higher zoom may land a hair below its exact integer
/// index. The round trip error grows with the number of tiles of the level.
fn virtual_tile_epsilon(zoom: u8) -> f64 {
    (2_f64.powi(zoom as i32) * 1e-12).max(1e-6)
}

/// A zoom level folder of a source tile tree.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SourceLevel {
    pub zoom: u8,
    pub path: PathBuf,
}

/// Offset that maps a level's native tile coordinates into the shared
/// zero-based frame.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AlignmentShift {
    pub zoom: u8,
    pub row_shift: u32,
    pub col_shift: u32,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct AlignSummary {
    pub levels: usize,
    pub tiles: u64,
}

/// Lists the zoom level folders of `wd`, in increasing zoom order.
///
/// Folders whose name is not a zoom level are skipped with a warning.
pub fn scan_levels(wd: &Path) -> Result<Vec<SourceLevel>> {
    let levels = tree::numeric_dirs(wd)?
        .into_iter()
        .filter_map(|entry| {
            if entry.number > MAX_ZOOM as u32 {
                log::warn!("ignored level {}", entry.path.display());
                return None;
            }
            Some(SourceLevel {
                zoom: entry.number as u8,
                path: entry.path,
            })
        })
        .collect();

    Ok(levels)
}

/// Returns the (row, col) of the top left tile of a level folder: the smallest
/// row folder, and the smallest tile number inside it.
pub fn locate_top_left_tile(level_dir: &Path) -> Result<(u32, u32)> {
    let rows = tree::numeric_dirs(level_dir)?;
    let first_row = rows
        .first()
        .ok_or_else(|| GridError::EmptyLevel(level_dir.to_path_buf()))?;

    let cols = tree::numeric_files(&first_row.path)?;
    let first_col = cols
        .first()
        .ok_or_else(|| GridError::EmptyLevel(level_dir.to_path_buf()))?;

    Ok((first_row.number, first_col.number))
}

/// Computes the shift of a level at `zoom` whose top left tile is `top_left`
/// (row, col), relative to the reference point `reference` (lat, lon).
///
/// Fails with [`GridError::NegativeShift`] when the level starts above or left of
/// the reference, meaning the trees are not nested.
pub fn compute_shift(
    reference: (f64, f64),
    zoom: u8,
    top_left: (u32, u32),
) -> Result<AlignmentShift, GridError> {
    let (virtual_col, virtual_row) = slippy::deg_to_tile(reference.0, reference.1, zoom);
    let epsilon = virtual_tile_epsilon(zoom);

    let row_shift = top_left.0 as i64 - (virtual_row + epsilon).floor() as i64;
    let col_shift = top_left.1 as i64 - (virtual_col + epsilon).floor() as i64;

    if row_shift < 0 || col_shift < 0 {
        return Err(GridError::NegativeShift {
            zoom,
            row_shift,
            col_shift,
        });
    }

    Ok(AlignmentShift {
        zoom,
        row_shift: row_shift as u32,
        col_shift: col_shift as u32,
    })
}

/// Computes the shift of every level. The first level is the reference and is
/// never shifted.
pub fn compute_shifts(levels: &[SourceLevel]) -> Result<Vec<AlignmentShift>> {
    let min_level = match levels.first() {
        Some(level) => level,
        None => return Ok(Vec::new()),
    };

    let (ref_row, ref_col) = locate_top_left_tile(&min_level.path)?;
    let reference = slippy::tile_to_deg(ref_col as f64, ref_row as f64, min_level.zoom);
    log::debug!(
        "reference tile row {} col {} at zoom {}: {:?}",
        ref_row,
        ref_col,
        min_level.zoom,
        reference
    );

    let mut shifts = vec![AlignmentShift {
        zoom: min_level.zoom,
        row_shift: 0,
        col_shift: 0,
    }];

    for level in &levels[1..] {
        let top_left = locate_top_left_tile(&level.path)?;
        let shift = compute_shift(reference, level.zoom, top_left)?;
        log::info!(
            "zoom {}: row shift {}, col shift {}",
            shift.zoom,
            shift.row_shift,
            shift.col_shift
        );
        shifts.push(shift);
    }

    Ok(shifts)
}

/// Size in pixels (columns, rows) of the full map at its highest level, given
/// the folder of its minimum level and the number of levels. Axes follow the
/// source tree, so an `<x>/<y>` tree gives (height, width).
pub fn viewport_size(min_level_dir: &Path, level_count: usize) -> Result<(u64, u64)> {
    let rows = tree::numeric_dirs(min_level_dir)?;
    let first_row = rows
        .first()
        .ok_or_else(|| GridError::EmptyLevel(min_level_dir.to_path_buf()))?;
    let n_cols = tree::numeric_files(&first_row.path)?.len() as u64;
    let n_rows = rows.len() as u64;

    let scale = TILE_SIZE_PX as u64 * (1_u64 << level_count.saturating_sub(1));
    Ok((n_cols * scale, n_rows * scale))
}

/// Copies the tiles of every level into `dest_dir`, renumbered from zero and
/// offset by the level's shift. Sources are left untouched.
///
/// Returns the number of copied tiles.
pub fn materialize_aligned_tree(
    levels: &[SourceLevel],
    shifts: &[AlignmentShift],
    dest_dir: &Path,
    extension: &str,
) -> Result<u64> {
    let mut copied = 0;

    for (level_index, (level, shift)) in levels.iter().zip(shifts).enumerate() {
        let level_dir = dest_dir.join(level_index.to_string());

        for (row_index, row) in tree::numeric_dirs(&level.path)?.iter().enumerate() {
            let row_dir = level_dir.join((shift.row_shift as usize + row_index).to_string());
            fs::create_dir_all(&row_dir)
                .with_context(|| format!("failed creating {}", row_dir.display()))?;

            for (col_index, tile) in tree::numeric_files(&row.path)?.iter().enumerate() {
                let target = row_dir.join(format!(
                    "{}.{}",
                    shift.col_shift as usize + col_index,
                    extension
                ));
                fs::copy(&tile.path, &target).with_context(|| {
                    format!(
                        "failed copying {} to {}",
                        tile.path.display(),
                        target.display()
                    )
                })?;
                copied += 1;
            }
        }
    }

    Ok(copied)
}

/// Aligns the zoom level folders found in `wd` into `wd/<map_name>`.
pub fn align(wd: &Path, map_name: &str, extension: &str) -> Result<AlignSummary> {
    let levels = scan_levels(wd)?;

    match levels.len() {
        0 => return Err(GridError::NoLevels(wd.to_path_buf()).into()),
        1 => {
            log::warn!("only one level found, there is nothing to align");
            return Ok(AlignSummary {
                levels: 1,
                tiles: 0,
            });
        }
        _ => {}
    }

    let shifts = compute_shifts(&levels)?;

    let (width, height) = viewport_size(&levels[0].path, levels.len())?;
    log::info!("size of the map at its highest level: {}x{} px (columns x rows)", width, height);

    let dest_dir = wd.join(map_name);
    let tiles = materialize_aligned_tree(&levels, &shifts, &dest_dir, extension)?;
    log::info!(
        "{} tiles of {} levels written to {}",
        tiles,
        levels.len(),
        dest_dir.display()
    );

    Ok(AlignSummary {
        levels: levels.len(),
        tiles,
    })
}
