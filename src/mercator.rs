//! Spherical Web-Mercator (EPSG:3857) projection and the WMTS "PM" tile matrix
//! geometry.

use crate::bounding_box::{is_valid_lat, is_valid_lon};
use crate::error::GridError;

const EARTH_RADIUS: f64 = 6378137.0;

/// Half the earth radius; the y formula is written with the log of the ratio
/// instead of `ln(tan(...))`.
const HALF_EARTH_RADIUS: f64 = 3189068.5;

/// X of the top left corner of the tile matrix, in meters.
pub const X0: f64 = -20037508.3427892476;

/// Y of the top left corner of the tile matrix, in meters.
pub const Y0: f64 = -X0;

/// Width and height of a tile, in pixels.
pub const TILE_SIZE_PX: u32 = 256;

const BASE_ZOOM: i32 = 10;
const BASE_RESOLUTION: f64 = 152.8740565704;

/// A point in Web-Mercator meters.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ProjectedPoint {
    pub x: f64,
    pub y: f64,
}

/// Projects WGS84 degrees to Web-Mercator meters.
///
/// Latitudes of exactly ±90° project to an infinite `y`.
pub fn project(lat: f64, lon: f64) -> Result<ProjectedPoint, GridError> {
    if !is_valid_lat(lat) || !is_valid_lon(lon) {
        return Err(GridError::InvalidCoordinate { lat, lon });
    }

    let x = lon.to_radians() * EARTH_RADIUS;
    let sin_lat = lat.to_radians().sin();
    let y = HALF_EARTH_RADIUS * ((1.0 + sin_lat) / (1.0 - sin_lat)).ln();

    Ok(ProjectedPoint { x, y })
}

/// Ground resolution in meters per pixel at `zoom`. Halves with every zoom increment.
pub fn resolution(zoom: u8) -> f64 {
    BASE_RESOLUTION / 2_f64.powi(zoom as i32 - BASE_ZOOM)
}

/// Side length of one tile at `zoom`, in meters.
pub fn tile_size_meters(zoom: u8) -> f64 {
    TILE_SIZE_PX as f64 * resolution(zoom)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, delta: f64) {
        assert!((a - b).abs() <= delta, "{} differs from {}", a, b);
    }

    #[test]
    fn origin_projects_to_zero() {
        assert_eq!(project(0.0, 0.0).unwrap(), ProjectedPoint { x: 0.0, y: 0.0 });
    }

    #[test]
    fn antimeridian_matches_matrix_origin() {
        let p = project(0.0, -180.0).unwrap();
        assert_close(p.x, X0, 1e-6);
    }

    #[test]
    fn projects_reunion() {
        let p = project(-21.147418, 55.593894).unwrap();
        assert_close(p.x, 6188683.97, 0.01);
        assert!(p.y < 0.0);
        // y is symmetric in latitude
        let q = project(21.147418, 55.593894).unwrap();
        assert_close(p.y, -q.y, 1e-6);
    }

    #[test]
    fn rejects_out_of_range() {
        assert_eq!(
            project(91.0, 0.0),
            Err(GridError::InvalidCoordinate { lat: 91.0, lon: 0.0 })
        );
        assert!(project(0.0, -180.5).is_err());
    }

    #[test]
    fn resolution_halves_per_zoom() {
        assert_close(resolution(10), 152.8740565704, 1e-9);
        assert_close(resolution(14), 9.5546285356, 1e-9);
        assert_close(resolution(17), 1.194328567, 1e-9);
        assert_close(resolution(9), 2.0 * 152.8740565704, 1e-9);
        assert_close(resolution(0), 156543.03392804097, 1e-3);
    }

    #[test]
    fn one_tile_covers_the_world_at_zoom_zero() {
        assert_close(tile_size_meters(0), 2.0 * Y0, 1e-3);
    }
}
