//! Map coordinates.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};

/// Geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Longitude.
    pub lng: f64,
    /// Latitude.
    pub lat: f64,
}

impl Position {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Build a position, rejecting out-of-range coordinates.
    pub fn checked(lng: f64, lat: f64) -> Result<Self> {
        if is_valid_coordinate(lng, lat) {
            Ok(Self { lng, lat })
        } else {
            Err(CoreError::InvalidCoordinate { lng, lat })
        }
    }

    pub fn is_valid(&self) -> bool {
        is_valid_coordinate(self.lng, self.lat)
    }

    /// Planar distance to another position, in degrees.
    pub fn distance_to(&self, other: &Position) -> f64 {
        calculate_distance(self, other)
    }
}

/// Check that longitude is within [-180, 180] and latitude within [-90, 90].
///
/// NaN is never valid.
pub fn is_valid_coordinate(lng: f64, lat: f64) -> bool {
    (-180.0..=180.0).contains(&lng) && (-90.0..=90.0).contains(&lat)
}

/// Euclidean distance between two points in coordinate space.
///
/// This is not a great-circle distance; it is only meant for ranking
/// nearby markers.
pub fn calculate_distance(a: &Position, b: &Position) -> f64 {
    let dx = a.lng - b.lng;
    let dy = a.lat - b.lat;
    (dx * dx + dy * dy).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_coordinates() {
        assert!(is_valid_coordinate(121.4, 31.2));
        assert!(is_valid_coordinate(-180.0, 90.0));
        assert!(is_valid_coordinate(0.0, 0.0));
        assert!(!is_valid_coordinate(200.0, 100.0));
        assert!(!is_valid_coordinate(0.0, -90.5));
        assert!(!is_valid_coordinate(f64::NAN, 0.0));
    }

    #[test]
    fn test_checked_position() {
        assert!(Position::checked(121.4, 31.2).is_ok());
        assert!(matches!(
            Position::checked(181.0, 0.0),
            Err(CoreError::InvalidCoordinate { .. })
        ));
    }

    #[test]
    fn test_distance() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(3.0, 4.0);
        assert!((calculate_distance(&a, &b) - 5.0).abs() < 1e-12);
        assert!((b.distance_to(&a) - 5.0).abs() < 1e-12);
        assert_eq!(a.distance_to(&a), 0.0);
    }
}
