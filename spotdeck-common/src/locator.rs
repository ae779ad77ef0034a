//! Maidenhead locator resolution
//!
//! Converts a 4- or 6-character grid locator into the approximate
//! latitude/longitude of the centre of the cell it names.

use serde::{Deserialize, Serialize};

/// Geographic position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

/// Resolve a locator such as "FN31" or "FN31pr".
///
/// Returns `None` for anything shorter than four characters or with
/// characters outside the field (A-R), square (0-9) ranges. A six-character
/// locator with an invalid subsquare pair falls back to square precision.
/// Longer locators (extended squares) are resolved on their first six
/// characters.
pub fn grid_to_lat_lon(grid: &str) -> Option<LatLon> {
    let g: Vec<char> = grid.trim().chars().map(|c| c.to_ascii_uppercase()).collect();
    if g.len() < 4 {
        return None;
    }

    let field_lon = letter_index(g[0], 'R')?;
    let field_lat = letter_index(g[1], 'R')?;
    let square_lon = g[2].to_digit(10)?;
    let square_lat = g[3].to_digit(10)?;

    let lon = f64::from(field_lon) * 20.0 - 180.0 + f64::from(square_lon) * 2.0;
    let lat = f64::from(field_lat) * 10.0 - 90.0 + f64::from(square_lat);

    let subsquare = if g.len() >= 6 {
        letter_index(g[4], 'X').zip(letter_index(g[5], 'X'))
    } else {
        None
    };

    match subsquare {
        Some((sub_lon, sub_lat)) => Some(LatLon {
            lat: lat + f64::from(sub_lat) / 24.0 + 0.5 / 24.0,
            lon: lon + f64::from(sub_lon) * 2.0 / 24.0 + 1.0 / 24.0,
        }),
        None => Some(LatLon {
            lat: lat + 0.5,
            lon: lon + 1.0,
        }),
    }
}

fn letter_index(c: char, last: char) -> Option<u32> {
    if ('A'..=last).contains(&c) {
        Some(c as u32 - 'A' as u32)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_four_char_centre() {
        let pos = grid_to_lat_lon("FN31").unwrap();
        assert!(close(pos.lon, -73.0));
        assert!(close(pos.lat, 41.5));
    }

    #[test]
    fn test_six_char_subsquare() {
        let pos = grid_to_lat_lon("FN31pr").unwrap();
        assert!(close(pos.lon, -80.0 + 6.0 + 15.0 * 2.0 / 24.0 + 1.0 / 24.0));
        assert!(close(pos.lat, 40.0 + 1.0 + 17.0 / 24.0 + 0.5 / 24.0));
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(grid_to_lat_lon("fn31PR"), grid_to_lat_lon("FN31pr"));
    }

    #[test]
    fn test_extremes() {
        let sw = grid_to_lat_lon("AA00aa").unwrap();
        assert!(sw.lon > -180.0 && sw.lat > -90.0);
        let ne = grid_to_lat_lon("RR99xx").unwrap();
        assert!(ne.lon < 180.0 && ne.lat < 90.0);
    }

    #[test]
    fn test_invalid() {
        assert_eq!(grid_to_lat_lon(""), None);
        assert_eq!(grid_to_lat_lon("FN3"), None);
        assert_eq!(grid_to_lat_lon("ZZ00"), None);
        assert_eq!(grid_to_lat_lon("FNAB"), None);
    }

    #[test]
    fn test_bad_subsquare_falls_back() {
        assert_eq!(grid_to_lat_lon("FN31!!"), grid_to_lat_lon("FN31"));
        assert_eq!(grid_to_lat_lon("FN31p"), grid_to_lat_lon("FN31"));
    }
}
