use std::{fmt, path::PathBuf, time::Duration};

use crate::bounding_box::BoundingBox;
use crate::error::GridError;
use crate::grid::{self, ZoomLevel};
use crate::url::UrlFormat;

/// Default WMTS layer: the IGN topographic maps.
pub const DEFAULT_LAYER: &str = "GEOGRAPHICALGRIDSYSTEMS.MAPS";

/// IGN topographic maps rendered with pastel colors.
pub const SCAN_EXPRESS_STANDARD_LAYER: &str =
    "GEOGRAPHICALGRIDSYSTEMS.MAPS.SCAN-EXPRESS.STANDARD";

/// Basic authentication for the tile service.
#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// Tile fetching configuration.
#[derive(Debug, PartialEq)]
pub struct Config {
    /// Area to cover at the minimum zoom level.
    pub bounding_box: BoundingBox,

    /// Sent as basic authentication with every request, when present.
    pub credentials: Option<Credentials>,

    /// WMTS layer requested for every zoom level.
    pub layer: String,

    /// Whether to re-fetch tiles that are already downloaded.
    pub fetch_existing: bool,

    /// Maximum number of parallel downloads. 1 fetches strictly in sequence.
    pub fetch_rate: u8,

    /// The folder to create the map folder in.
    pub output_folder: PathBuf,

    /// Name of the map folder created under `output_folder`.
    pub map_name: String,

    /// The URL to download individual tiles from.
    pub url: UrlFormat,

    /// Extension of the written tile files.
    pub extension: String,

    /// Timeout for fetching a single tile.
    ///
    /// Pass the zero duration to disable the timeout.
    pub timeout: Duration,

    /// The minimum zoom level to download.
    pub min_zoom: u8,

    /// The maximum zoom level to download.
    pub max_zoom: u8,
}

impl Config {
    /// Resolves the grid extent of every zoom level to fetch.
    pub fn levels(&self) -> Result<Vec<ZoomLevel>, GridError> {
        grid::resolve_levels(&self.bounding_box, self.min_zoom, self.max_zoom, &self.layer)
    }

    /// `<output_folder>/<map_name>`
    pub fn map_dir(&self) -> PathBuf {
        self.output_folder.join(&self.map_name)
    }
}
