use crate::error::GridError;
use crate::grid::{self, ZoomLevel};

/// A geographic bounding box with north, west, south and east boundaries given
/// in decimal degrees (WGS84).
///
/// # Example
/// ```rust
/// # use tile_pyramid::BoundingBox;
/// let reunion_est = BoundingBox::new(-21.147418, 55.593894, -21.346769, 55.797828).unwrap();
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundingBox {
    pub north: f64,
    pub west: f64,
    pub south: f64,
    pub east: f64,
}

impl BoundingBox {
    /// Create a new bounding box from coordinates in degrees
    /// (-90 to 90° latitude, -180 to 180° longitude).
    ///
    /// Fails if a coordinate is out of range, if `north` is not strictly above
    /// `south`, or if `west` is not strictly left of `east`.
    pub fn new(north: f64, west: f64, south: f64, east: f64) -> Result<Self, GridError> {
        for &(lat, lon) in &[(north, west), (south, east)] {
            if !is_valid_lat(lat) || !is_valid_lon(lon) {
                return Err(GridError::InvalidCoordinate { lat, lon });
            }
        }

        if north <= south {
            return Err(GridError::InvalidBoundingBox(format!(
                "north ({}) must be greater than south ({})",
                north, south
            )));
        }
        if west >= east {
            return Err(GridError::InvalidBoundingBox(format!(
                "west ({}) must be less than east ({})",
                west, east
            )));
        }

        Ok(BoundingBox {
            north,
            west,
            south,
            east,
        })
    }

    /// Resolves the grid extents of every zoom level in `min_zoom..=max_zoom`,
    /// all levels using the same `layer`.
    pub fn levels(
        &self,
        min_zoom: u8,
        max_zoom: u8,
        layer: &str,
    ) -> Result<Vec<ZoomLevel>, GridError> {
        grid::resolve_levels(self, min_zoom, max_zoom, layer)
    }
}

pub(crate) fn is_valid_lat(lat: f64) -> bool {
    (-90.0..=90.0).contains(&lat)
}

pub(crate) fn is_valid_lon(lon: f64) -> bool {
    (-180.0..=180.0).contains(&lon)
}

/// A bounding box fixture containing preset coordinates for a known area.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Fixture {
    ReunionEst,
    BaliCentre,
}

impl std::str::FromStr for Fixture {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use Fixture::*;

        let s = s.to_lowercase();
        if s.starts_with("reunion") {
            return Ok(ReunionEst);
        }

        if s.starts_with("bali") {
            return Ok(BaliCentre);
        }

        Err("unrecognized fixture")
    }
}

impl std::convert::From<Fixture> for BoundingBox {
    fn from(fixture: Fixture) -> Self {
        use Fixture::*;

        let (north, west, south, east) = match fixture {
            ReunionEst => (-21.147418, 55.593894, -21.346769, 55.797828),
            BaliCentre => (-8.0579, 115.0076, -8.6245, 115.7149),
        };

        BoundingBox {
            north,
            west,
            south,
            east,
        }
    }
}
