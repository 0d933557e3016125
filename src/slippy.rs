//! Slippy-map tile coordinates (OpenStreetMap addressing).
//! ref: https://wiki.openstreetmap.org/wiki/Slippy_map_tilenames

use std::f64::consts::PI;

/// Returns the latitude and longitude (degrees) of the north west corner of the
/// tile at (`col`, `row`, `zoom`). Fractional tile coordinates are accepted.
pub fn tile_to_deg(col: f64, row: f64, zoom: u8) -> (f64, f64) {
    let n = 2_f64.powi(zoom as i32);
    let lon = col / n * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * row / n)).sinh().atan().to_degrees();

    (lat, lon)
}

/// Returns the fractional (column, row) tile coordinates of a point at `zoom`.
pub fn deg_to_tile(lat: f64, lon: f64, zoom: u8) -> (f64, f64) {
    let n = 2_f64.powi(zoom as i32);
    let lat_rad = lat.to_radians();
    let col = (lon + 180.0) / 360.0 * n;
    let row = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n;

    (col, row)
}
