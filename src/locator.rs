// Maidenhead locator conversion
//
// Origin is at -180°, -90°. A field is 20° lon x 10° lat, a square 2° x 1°,
// a subsquare 5' x 2.5' (1/12° x 1/24°).

use crate::model::Coordinates;

/// Convert a 4 or 6 character locator to the coordinates of its centre
pub fn grid_to_latlon(grid: &str) -> Option<Coordinates> {
    let grid = grid.trim().to_ascii_uppercase();
    let bytes = grid.as_bytes();
    if bytes.len() != 4 && bytes.len() != 6 {
        return None;
    }

    // Letter, Letter, Digit, Digit, [Letter, Letter]
    if !(b'A'..=b'R').contains(&bytes[0]) || !(b'A'..=b'R').contains(&bytes[1]) {
        return None;
    }
    if !bytes[2].is_ascii_digit() || !bytes[3].is_ascii_digit() {
        return None;
    }

    let lon_field = f64::from(bytes[0] - b'A');
    let lat_field = f64::from(bytes[1] - b'A');
    let lon_square = f64::from(bytes[2] - b'0');
    let lat_square = f64::from(bytes[3] - b'0');

    let mut lon = -180.0 + lon_field * 20.0 + lon_square * 2.0;
    let mut lat = -90.0 + lat_field * 10.0 + lat_square;

    if bytes.len() == 6 {
        if !(b'A'..=b'X').contains(&bytes[4]) || !(b'A'..=b'X').contains(&bytes[5]) {
            return None;
        }
        let lon_subsq = f64::from(bytes[4] - b'A');
        let lat_subsq = f64::from(bytes[5] - b'A');
        lon += lon_subsq * (2.0 / 24.0) + 1.0 / 24.0;
        lat += lat_subsq * (1.0 / 24.0) + 0.5 / 24.0;
    } else {
        lon += 1.0;
        lat += 0.5;
    }

    Some(Coordinates::new(lat, lon))
}

/// Convert coordinates to a locator of `len` characters (2, 4 or 6).
/// Longitude is east-positive.
pub fn latlon_to_grid(lat: f64, lon: f64, len: usize) -> Option<String> {
    if !matches!(len, 2 | 4 | 6) || !lat.is_finite() || !lon.is_finite() {
        return None;
    }
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return None;
    }

    // Shift to the origin; clamp the upper edge into the last field
    let x = (lon + 180.0).min(359.999_999);
    let y = (lat + 90.0).min(179.999_999);

    let mut grid = String::with_capacity(len);
    let lon_field = (x / 20.0).floor();
    let lat_field = (y / 10.0).floor();
    grid.push(char::from(b'A' + lon_field as u8));
    grid.push(char::from(b'A' + lat_field as u8));
    if len == 2 {
        return Some(grid);
    }

    let x = x - lon_field * 20.0;
    let y = y - lat_field * 10.0;
    let lon_square = (x / 2.0).floor();
    let lat_square = y.floor();
    grid.push(char::from(b'0' + lon_square as u8));
    grid.push(char::from(b'0' + lat_square as u8));
    if len == 4 {
        return Some(grid);
    }

    let x = x - lon_square * 2.0;
    let y = y - lat_square;
    let lon_subsq = (x * 12.0).floor().min(23.0);
    let lat_subsq = (y * 24.0).floor().min(23.0);
    grid.push(char::from(b'a' + lon_subsq as u8));
    grid.push(char::from(b'a' + lat_subsq as u8));
    Some(grid)
}
