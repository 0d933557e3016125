//! Error types for grid resolution, alignment and joining.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the tile-grid computations.
#[derive(Debug, Error, PartialEq)]
pub enum GridError {
    /// Latitude outside [-90, 90] or longitude outside [-180, 180].
    #[error("invalid coordinate: lat {lat}, lon {lon}")]
    InvalidCoordinate { lat: f64, lon: f64 },

    #[error("invalid bounding box: {0}")]
    InvalidBoundingBox(String),

    #[error("invalid zoom range: min {min} > max {max}")]
    InvalidZoomRange { min: u8, max: u8 },

    /// The source tile trees are not nested as expected.
    #[error(
        "negative shift at zoom {zoom} (row {row_shift}, col {col_shift}); \
         the tile trees are not geographically nested"
    )]
    NegativeShift {
        zoom: u8,
        row_shift: i64,
        col_shift: i64,
    },

    #[error("no numeric zoom level folders found in {0}")]
    NoLevels(PathBuf),

    #[error("no tiles found in level {0}")]
    EmptyLevel(PathBuf),

    #[error(
        "tile {index} is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}"
    )]
    TileSizeMismatch {
        index: usize,
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("no tiles to join")]
    NoTiles,

    #[error("column count must be > 0")]
    InvalidColumns,

    #[error("a canvas of {rows}x{columns} tiles is too large")]
    CanvasTooLarge { rows: u32, columns: u32 },
}
