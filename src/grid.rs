//! Tile-index extents of a bounding box across a range of zoom levels.
//!
//! The extent of the minimum zoom level is computed from the projected bounding
//! box. Every higher level is derived from it by exact doubling, so each tile of
//! the minimum level has exactly its four (sixteen, ...) children at the higher
//! levels, no more and no less.

use crate::bounding_box::BoundingBox;
use crate::error::GridError;
use crate::mercator::{self, X0, Y0};
use crate::tile::Tile;

/// Highest supported zoom level. Tile indices at this level still fit in a `u32`.
pub const MAX_ZOOM: u8 = 30;

/// Inclusive tile-index bounds at a given zoom.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct GridExtent {
    pub row_top: u32,
    pub col_left: u32,
    pub row_bot: u32,
    pub col_right: u32,
}

impl GridExtent {
    pub fn rows(&self) -> u32 {
        self.row_bot - self.row_top + 1
    }

    pub fn cols(&self) -> u32 {
        self.col_right - self.col_left + 1
    }

    pub fn tile_count(&self) -> u64 {
        self.rows() as u64 * self.cols() as u64
    }

    /// The extent covering exactly the same area `levels_up` zoom levels higher.
    pub fn scaled(&self, levels_up: u8) -> GridExtent {
        let factor = 1_u32 << levels_up;
        GridExtent {
            row_top: self.row_top * factor,
            col_left: self.col_left * factor,
            row_bot: (self.row_bot + 1) * factor - 1,
            col_right: (self.col_right + 1) * factor - 1,
        }
    }
}

/// One zoom level of a tile pyramid.
#[derive(Clone, Debug, PartialEq)]
pub struct ZoomLevel {
    pub zoom: u8,
    pub layer: String,
    pub grid: GridExtent,
}

impl ZoomLevel {
    /// Iterates the tiles of this level row by row. `level_index` is the
    /// zero-based position of the level in its pyramid.
    pub fn tiles(&self, level_index: u8) -> impl Iterator<Item = Tile> {
        let zoom = self.zoom;
        let grid = self.grid;

        (grid.row_top..=grid.row_bot).flat_map(move |row| {
            (grid.col_left..=grid.col_right).map(move |col| Tile {
                zoom,
                row,
                col,
                level_index,
                row_index: row - grid.row_top,
                col_index: col - grid.col_left,
            })
        })
    }
}

/// Computes the extent of `bbox` at `min_zoom`.
///
/// Left and top bounds are floored, right and bottom bounds are ceiled, so the
/// extent over-covers the box rather than clipping it. Indices are clamped to the
/// tile matrix of the zoom level.
pub fn resolve_min_level_extent(bbox: &BoundingBox, min_zoom: u8) -> Result<GridExtent, GridError> {
    if min_zoom > MAX_ZOOM {
        return Err(GridError::InvalidZoomRange {
            min: min_zoom,
            max: MAX_ZOOM,
        });
    }

    let top_left = mercator::project(bbox.north, bbox.west)?;
    let bottom_right = mercator::project(bbox.south, bbox.east)?;
    let tile_size = mercator::tile_size_meters(min_zoom);

    let col_left = ((top_left.x - X0) / tile_size).floor();
    let row_top = ((Y0 - top_left.y) / tile_size).floor();
    let col_right = ((bottom_right.x - X0) / tile_size).ceil();
    let row_bot = ((Y0 - bottom_right.y) / tile_size).ceil();

    let extent = GridExtent {
        row_top: clamp_index(row_top, min_zoom),
        col_left: clamp_index(col_left, min_zoom),
        row_bot: clamp_index(row_bot, min_zoom),
        col_right: clamp_index(col_right, min_zoom),
    };
    log::debug!("extent at zoom {}: {:?}", min_zoom, extent);

    Ok(extent)
}

fn clamp_index(index: f64, zoom: u8) -> u32 {
    let last = ((1_u64 << zoom) - 1) as f64;
    index.max(0.0).min(last) as u32
}

/// Derives the extents of the `count` zoom levels above the level of `min_extent`,
/// in increasing zoom order.
pub fn derive_higher_extents(min_extent: &GridExtent, count: u8) -> Vec<GridExtent> {
    (1..=count).map(|k| min_extent.scaled(k)).collect()
}

/// Builds one [`ZoomLevel`] per zoom in `min_zoom..=max_zoom`.
pub fn resolve_levels(
    bbox: &BoundingBox,
    min_zoom: u8,
    max_zoom: u8,
    layer: &str,
) -> Result<Vec<ZoomLevel>, GridError> {
    if min_zoom > max_zoom || max_zoom > MAX_ZOOM {
        return Err(GridError::InvalidZoomRange {
            min: min_zoom,
            max: max_zoom,
        });
    }

    let min_extent = resolve_min_level_extent(bbox, min_zoom)?;
    let higher = derive_higher_extents(&min_extent, max_zoom - min_zoom);

    let levels = std::iter::once(min_extent)
        .chain(higher)
        .zip(min_zoom..=max_zoom)
        .map(|(grid, zoom)| ZoomLevel {
            zoom,
            layer: layer.to_owned(),
            grid,
        })
        .collect();

    Ok(levels)
}

/// Iterates every tile of the pyramid, level by level.
pub fn tiles(levels: &[ZoomLevel]) -> impl Iterator<Item = Tile> + '_ {
    levels
        .iter()
        .enumerate()
        .flat_map(|(index, level)| level.tiles(index as u8))
}

pub fn count_tiles(levels: &[ZoomLevel]) -> u64 {
    levels.iter().map(|level| level.grid.tile_count()).sum()
}

/// Maps a normalized position of the map (`x`, `y` in [0, 1]) to Web-Mercator
/// coordinates.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CalibrationPoint {
    pub x: f64,
    pub y: f64,
    pub proj_x: f64,
    pub proj_y: f64,
}

/// Calibration points at the top left and bottom right corners of the area
/// covered by `level`.
pub fn calibration_points(level: &ZoomLevel) -> (CalibrationPoint, CalibrationPoint) {
    let tile_size = mercator::tile_size_meters(level.zoom);
    let grid = &level.grid;

    let top_left = CalibrationPoint {
        x: 0.0,
        y: 0.0,
        proj_x: grid.col_left as f64 * tile_size + X0,
        proj_y: Y0 - grid.row_top as f64 * tile_size,
    };
    let bottom_right = CalibrationPoint {
        x: 1.0,
        y: 1.0,
        proj_x: (grid.col_right + 1) as f64 * tile_size + X0,
        proj_y: Y0 - (grid.row_bot + 1) as f64 * tile_size,
    };

    (top_left, bottom_right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounding_box::Fixture;

    const LAYER: &str = "GEOGRAPHICALGRIDSYSTEMS.MAPS";

    fn reunion() -> BoundingBox {
        BoundingBox::new(-21.147418, 55.593894, -21.346769, 55.797828).unwrap()
    }

    fn extent(row_top: u32, col_left: u32, row_bot: u32, col_right: u32) -> GridExtent {
        GridExtent {
            row_top,
            col_left,
            row_bot,
            col_right,
        }
    }

    #[test]
    fn reunion_min_level() {
        assert_eq!(
            resolve_min_level_extent(&reunion(), 14).unwrap(),
            extent(9177, 10722, 9187, 10732)
        );
    }

    #[test]
    fn reunion_pyramid_nests() {
        let levels = resolve_levels(&reunion(), 14, 16, LAYER).unwrap();
        assert_eq!(levels.len(), 3);
        assert_eq!(
            levels.iter().map(|l| l.zoom).collect::<Vec<_>>(),
            vec![14, 15, 16]
        );
        assert_eq!(levels[1].grid, extent(18354, 21444, 18375, 21465));
        assert_eq!(levels[2].grid, extent(36708, 42888, 36751, 42931));

        for pair in levels.windows(2) {
            let (lower, upper) = (&pair[0].grid, &pair[1].grid);
            assert_eq!(upper.row_top, 2 * lower.row_top);
            assert_eq!(upper.col_left, 2 * lower.col_left);
            assert_eq!(upper.row_bot, 2 * (lower.row_bot + 1) - 1);
            assert_eq!(upper.col_right, 2 * (lower.col_right + 1) - 1);
            assert_eq!(upper.rows(), 2 * lower.rows());
            assert_eq!(upper.cols(), 2 * lower.cols());
        }
        assert!(levels.iter().all(|l| l.layer == LAYER));
    }

    #[test]
    fn higher_extents_compose() {
        let min = extent(3, 5, 4, 9);
        let derived = derive_higher_extents(&min, 4);
        assert_eq!(derived.len(), 4);
        for (k, e) in derived.iter().enumerate() {
            assert_eq!(*e, min.scaled(k as u8 + 1));
            if k > 0 {
                assert_eq!(*e, derived[k - 1].scaled(1));
            }
        }
        assert!(derive_higher_extents(&min, 0).is_empty());
    }

    #[test]
    fn min_extent_contains_box() {
        let boxes = [
            reunion(),
            BoundingBox::from(Fixture::BaliCentre),
            BoundingBox::new(50.811, 6.031, 50.7492, 6.1649).unwrap(),
            BoundingBox::new(60.0, -130.0, 20.0, -60.0).unwrap(),
            BoundingBox::new(-33.0, 150.9, -34.1, 151.4).unwrap(),
        ];

        for bbox in &boxes {
            for zoom in 3..=17 {
                let e = resolve_min_level_extent(bbox, zoom).unwrap();
                let tile_size = mercator::tile_size_meters(zoom);
                let nw = mercator::project(bbox.north, bbox.west).unwrap();
                let se = mercator::project(bbox.south, bbox.east).unwrap();

                assert!(e.row_top <= e.row_bot && e.col_left <= e.col_right);
                assert!(e.col_left as f64 * tile_size + X0 <= nw.x);
                assert!(Y0 - e.row_top as f64 * tile_size >= nw.y);
                assert!((e.col_right + 1) as f64 * tile_size + X0 >= se.x);
                assert!(Y0 - (e.row_bot + 1) as f64 * tile_size <= se.y);
            }
        }
    }

    #[test]
    fn extent_is_clamped_to_matrix() {
        let world = BoundingBox::new(89.0, -180.0, -89.0, 180.0).unwrap();
        assert_eq!(
            resolve_min_level_extent(&world, 2).unwrap(),
            extent(0, 0, 3, 3)
        );
    }

    #[test]
    fn invalid_zoom_range() {
        assert_eq!(
            resolve_levels(&reunion(), 16, 14, LAYER),
            Err(GridError::InvalidZoomRange { min: 16, max: 14 })
        );
        assert!(resolve_levels(&reunion(), 14, 31, LAYER).is_err());
    }

    #[test]
    fn tiles_are_zero_indexed_per_level() {
        let levels = vec![
            ZoomLevel {
                zoom: 3,
                layer: LAYER.into(),
                grid: extent(2, 4, 3, 5),
            },
            ZoomLevel {
                zoom: 4,
                layer: LAYER.into(),
                grid: extent(2, 4, 3, 5).scaled(1),
            },
        ];

        let all: Vec<Tile> = tiles(&levels).collect();
        assert_eq!(all.len() as u64, count_tiles(&levels));
        assert_eq!(count_tiles(&levels), 4 + 16);

        assert_eq!(
            all[0],
            Tile {
                zoom: 3,
                row: 2,
                col: 4,
                level_index: 0,
                row_index: 0,
                col_index: 0,
            }
        );
        assert_eq!((all[1].row_index, all[1].col_index), (0, 1));
        assert_eq!((all[2].row_index, all[2].col_index), (1, 0));

        let last = all.last().unwrap();
        assert_eq!((last.zoom, last.row, last.col), (4, 7, 11));
        assert_eq!((last.level_index, last.row_index, last.col_index), (1, 3, 3));
    }

    #[test]
    fn calibration_matches_tile_edges() {
        let level = ZoomLevel {
            zoom: 1,
            layer: LAYER.into(),
            grid: extent(0, 0, 1, 1),
        };
        let (top_left, bottom_right) = calibration_points(&level);
        assert_eq!((top_left.x, top_left.y), (0.0, 0.0));
        assert_eq!((bottom_right.x, bottom_right.y), (1.0, 1.0));
        assert!((top_left.proj_x - X0).abs() < 1e-3);
        assert!((top_left.proj_y - Y0).abs() < 1e-3);
        assert!((bottom_right.proj_x + X0).abs() < 1e-3);
        assert!((bottom_right.proj_y + Y0).abs() < 1e-3);
    }
}
