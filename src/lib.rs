//! Prepare offline map tile pyramids.
//!
//! * Fetch tiles from a WMTS service for a bounding box and a range of zoom
//!   levels. The tiles of the minimum level cover the bounding box; every
//!   higher level covers exactly the same area, so the pyramid is seamless.
//! * Re-index OpenStreetMap-style tile trees produced by third party downloaders
//!   so that every level is zero-based and aligned on the same top left corner.
//! * Stitch the tiles of a level into a single raster.
//!
//! Output trees are laid out as `<map>/<level_index>/<row_index>/<col_index>.<ext>`.
//!
//! # CLI Example
//!
//! ```bash
//! tile-pyramid fetch \
//!   --api-key API_KEY --user LOGIN --password PASSWORD \
//!   --layer-scan-express-standard \
//!   --zmin 14 --zmax 16 \
//!   -n -21.147418 -w 55.593894 -s -21.346769 -e 55.797828 \
//!   --output ./maps --mapname reunion-est
//!
//! tile-pyramid align --wd ./bali-download --mapname bali
//! tile-pyramid join --level-dir ./bali/bali/0 --output bali-overview.png
//! ```
//!
//! # Library Example
//! ```rust
//! use tile_pyramid::BoundingBox;
//!
//! let bbox = BoundingBox::new(-21.147418, 55.593894, -21.346769, 55.797828).unwrap();
//! let levels = bbox.levels(14, 16, "GEOGRAPHICALGRIDSYSTEMS.MAPS").unwrap();
//! assert_eq!(levels[1].grid, levels[0].grid.scaled(1));
//! ```

pub mod align;
mod bounding_box;
mod config;
mod error;
mod fetch;
pub mod grid;
pub mod join;
pub mod mercator;
pub mod slippy;
mod tile;
pub mod tree;
mod url;

pub use align::{align, AlignSummary, AlignmentShift};
pub use bounding_box::{BoundingBox, Fixture};
pub use config::{Config, Credentials, DEFAULT_LAYER, SCAN_EXPRESS_STANDARD_LAYER};
pub use error::GridError;
pub use fetch::{fetch, Estimate, FetchSummary};
pub use grid::{GridExtent, ZoomLevel};
pub use join::{join_level, join_tiles};
pub use mercator::ProjectedPoint;
pub use tile::{Tile, TileOutcome};
pub use url::{UrlFormat, IGN_WMTS_URL};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_rejects_out_of_range_deg() {
        assert!(BoundingBox::new(360.0, 0.0, 0.0, 0.0).is_err());
    }

    #[test]
    fn tile_index() {
        let (col, row) = slippy::deg_to_tile(50.7929, 6.0402, 18);
        assert_eq!((col as u32, row as u32), (135470, 87999));
    }

    #[test]
    fn fetched_pyramid_aligns_onto_itself() {
        // A WMTS pyramid is already zero-based and nested: realigning its
        // source numbering must give zero shifts on every level.
        let bbox = BoundingBox::from(Fixture::BaliCentre);
        let levels = bbox.levels(12, 15, DEFAULT_LAYER).unwrap();

        let min = &levels[0].grid;
        let reference = slippy::tile_to_deg(min.col_left as f64, min.row_top as f64, 12);
        for level in &levels[1..] {
            let shift = align::compute_shift(
                reference,
                level.zoom,
                (level.grid.row_top, level.grid.col_left),
            )
            .unwrap();
            assert_eq!((shift.row_shift, shift.col_shift), (0, 0));
        }
    }
}
