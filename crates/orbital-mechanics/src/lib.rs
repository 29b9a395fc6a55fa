//! Orbital Mechanics Library
//!
//! Earth-centred Cartesian positions (km), vertex angles and geodetic
//! transforms used by the beam planner to decide which satellites a ground
//! terminal can see and which emitters crowd its line of sight.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrbitalError {
    #[error("Angle undefined: vertex {vertex} coincides with {endpoint}")]
    DegenerateAngle { vertex: Position, endpoint: Position },
    #[error("Non-finite geometry: {0}")]
    NonFinite(String),
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),
}

pub type Result<T> = std::result::Result<T, OrbitalError>;

/// Center of the Earth in the scenario frame.
pub const EARTH_CENTER: Position = Position::new(0.0, 0.0, 0.0);

/// A point in the Earth-centred frame, kilometres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn to_vector(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

pub mod geometry {
    use super::*;
    use tracing::warn;

    /// Clamp drift on the normalised dot product above this is reported.
    pub const DOT_PRODUCT_TOLERANCE: f64 = 1e-6;

    /// Angle at `vertex` between the rays toward `a` and `b`, in degrees.
    ///
    /// Fails with [`OrbitalError::DegenerateAngle`] when `vertex` coincides
    /// with either endpoint, since no direction exists.
    pub fn angle_degrees(vertex: &Position, a: &Position, b: &Position) -> Result<f64> {
        let va = a.to_vector() - vertex.to_vector();
        let vb = b.to_vector() - vertex.to_vector();

        let va_mag = va.norm();
        let vb_mag = vb.norm();
        if va_mag == 0.0 {
            return Err(OrbitalError::DegenerateAngle {
                vertex: *vertex,
                endpoint: *a,
            });
        }
        if vb_mag == 0.0 {
            return Err(OrbitalError::DegenerateAngle {
                vertex: *vertex,
                endpoint: *b,
            });
        }

        let dot_product = (va / va_mag).dot(&(vb / vb_mag));
        if !dot_product.is_finite() {
            return Err(OrbitalError::NonFinite(format!(
                "dot product at {} toward {} and {}",
                vertex, a, b
            )));
        }

        // Error accumulates in the normalisation; acos needs [-1, 1].
        let bounded = dot_product.clamp(-1.0, 1.0);
        if (bounded - dot_product).abs() > DOT_PRODUCT_TOLERANCE {
            warn!(
                dot_product,
                bounded, "Dot product drifted beyond tolerance, clamped"
            );
        }

        Ok(bounded.acos().to_degrees())
    }

    /// Euclidean distance between two points, km
    pub fn distance(a: &Position, b: &Position) -> f64 {
        (b.to_vector() - a.to_vector()).norm()
    }
}

pub mod transforms {
    use super::*;

    pub const EARTH_RADIUS_KM: f64 = 6378.137;
    const EARTH_FLATTENING: f64 = 1.0 / 298.257223563;

    #[derive(Debug, Clone, Copy, Serialize, Deserialize)]
    pub struct GeodeticPosition {
        pub latitude: f64,
        pub longitude: f64,
        pub altitude_km: f64,
    }

    pub fn geodetic_to_position(pos: &GeodeticPosition) -> Result<Position> {
        if !(-90.0..=90.0).contains(&pos.latitude) {
            return Err(OrbitalError::InvalidCoordinates(format!(
                "latitude {} outside [-90, 90]",
                pos.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&pos.longitude) {
            return Err(OrbitalError::InvalidCoordinates(format!(
                "longitude {} outside [-180, 180]",
                pos.longitude
            )));
        }
        if !pos.altitude_km.is_finite() {
            return Err(OrbitalError::NonFinite(format!(
                "altitude {}",
                pos.altitude_km
            )));
        }

        let lat_rad = pos.latitude.to_radians();
        let lon_rad = pos.longitude.to_radians();
        let alt = pos.altitude_km;

        let n = EARTH_RADIUS_KM / (1.0 - EARTH_FLATTENING * lat_rad.sin().powi(2)).sqrt();

        let x = (n + alt) * lat_rad.cos() * lon_rad.cos();
        let y = (n + alt) * lat_rad.cos() * lon_rad.sin();
        let z = (n * (1.0 - EARTH_FLATTENING) + alt) * lat_rad.sin();

        Ok(Position::new(x, y, z))
    }
}

#[cfg(test)]
mod tests {
    use super::geometry::*;
    use super::transforms::*;
    use super::*;

    #[test]
    fn test_overhead_satellite_is_180_degrees() {
        let user = Position::new(0.0, 0.0, 6371.0);
        let sat = Position::new(0.0, 0.0, 42164.0);
        let angle = angle_degrees(&user, &EARTH_CENTER, &sat).unwrap();
        assert!((angle - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_horizon_is_90_degrees() {
        let user = Position::new(0.0, 0.0, 6371.0);
        let sat = Position::new(1000.0, 0.0, 6371.0);
        let angle = angle_degrees(&user, &EARTH_CENTER, &sat).unwrap();
        assert!((angle - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_equatorial_user_sees_polar_satellite_low() {
        let user = Position::new(6371.0, 0.0, 0.0);
        let sat = Position::new(0.0, 0.0, 42164.0);
        let angle = angle_degrees(&user, &EARTH_CENTER, &sat).unwrap();
        assert!(angle <= 135.0);
    }

    #[test]
    fn test_degenerate_angle_is_an_error() {
        let p = Position::new(1.0, 2.0, 3.0);
        let q = Position::new(4.0, 5.0, 6.0);
        assert!(matches!(
            angle_degrees(&p, &p, &q),
            Err(OrbitalError::DegenerateAngle { .. })
        ));
        assert!(matches!(
            angle_degrees(&p, &q, &p),
            Err(OrbitalError::DegenerateAngle { .. })
        ));
    }

    #[test]
    fn test_identical_directions_clamp_to_zero() {
        let vertex = Position::new(0.0, 0.0, 0.0);
        let a = Position::new(0.1, 0.2, 0.3);
        let b = Position::new(0.3, 0.6, 0.9);
        let angle = angle_degrees(&vertex, &a, &b).unwrap();
        assert!(angle.is_finite());
        assert!(angle < 1e-5);
    }

    #[test]
    fn test_distance() {
        let a = Position::new(1.0, 2.0, 3.0);
        let b = Position::new(4.0, 6.0, 3.0);
        assert!((distance(&a, &b) - 5.0).abs() < 1e-12);
        assert_eq!(distance(&a, &a), 0.0);
    }

    #[test]
    fn test_geodetic_on_equator() {
        let geo = GeodeticPosition {
            latitude: 0.0,
            longitude: 90.0,
            altitude_km: 550.0,
        };
        let pos = geodetic_to_position(&geo).unwrap();
        assert!(pos.x.abs() < 1e-6);
        assert!((pos.y - (EARTH_RADIUS_KM + 550.0)).abs() < 1e-6);
        assert!(pos.z.abs() < 1e-9);
    }

    #[test]
    fn test_geodetic_pole_is_flattened() {
        let geo = GeodeticPosition {
            latitude: 90.0,
            longitude: 0.0,
            altitude_km: 550.0,
        };
        let pos = geodetic_to_position(&geo).unwrap();
        assert!(pos.x.abs() < 1e-6);
        assert!(pos.y.abs() < 1e-6);
        assert!(pos.z > 550.0 + 6350.0);
        assert!(pos.z < EARTH_RADIUS_KM + 550.0);
    }

    #[test]
    fn test_geodetic_rejects_bad_latitude() {
        let geo = GeodeticPosition {
            latitude: 91.0,
            longitude: 0.0,
            altitude_km: 0.0,
        };
        assert!(geodetic_to_position(&geo).is_err());
    }
}
