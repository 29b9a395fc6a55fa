//! Planner thresholds and hardware limits

use crate::MAX_COLORS;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Same-colour beams from one satellite closer than this interfere, degrees
pub const SELF_INTERFERENCE_MAX_DEG: f64 = 10.0;

/// Third-party emitters closer than this to the line of sight block it, degrees
pub const NON_STARLINK_INTERFERENCE_MAX_DEG: f64 = 20.0;

/// Terminals cannot form beams further than this from vertical, degrees
pub const MAX_USER_VISIBLE_ANGLE_DEG: f64 = 45.0;

/// Active beams a satellite can carry across all colours
pub const BEAMS_PER_SATELLITE: usize = 32;

/// Frequency/polarisation channels per satellite
pub const COLORS_PER_SATELLITE: usize = 4;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be a finite angle in [0, 180] degrees, got {value}")]
    InvalidAngle { name: &'static str, value: f64 },
    #[error("beams_per_satellite must be at least 1")]
    NoBeams,
    #[error("colors_per_satellite must be in [1, {max}], got {got}")]
    InvalidColorCount { got: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Geometry thresholds and capacity limits injected into the builder and
/// scheduler. Missing fields deserialize to the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeamConfig {
    pub self_interference_max_deg: f64,
    pub non_starlink_interference_max_deg: f64,
    pub max_user_visible_angle_deg: f64,
    pub beams_per_satellite: usize,
    pub colors_per_satellite: usize,
}

impl Default for BeamConfig {
    fn default() -> Self {
        Self {
            self_interference_max_deg: SELF_INTERFERENCE_MAX_DEG,
            non_starlink_interference_max_deg: NON_STARLINK_INTERFERENCE_MAX_DEG,
            max_user_visible_angle_deg: MAX_USER_VISIBLE_ANGLE_DEG,
            beams_per_satellite: BEAMS_PER_SATELLITE,
            colors_per_satellite: COLORS_PER_SATELLITE,
        }
    }
}

impl BeamConfig {
    pub fn validate(&self) -> Result<()> {
        check_angle("self_interference_max_deg", self.self_interference_max_deg)?;
        check_angle(
            "non_starlink_interference_max_deg",
            self.non_starlink_interference_max_deg,
        )?;
        check_angle("max_user_visible_angle_deg", self.max_user_visible_angle_deg)?;

        if self.beams_per_satellite == 0 {
            return Err(ConfigError::NoBeams);
        }
        if self.colors_per_satellite == 0 || self.colors_per_satellite > MAX_COLORS {
            return Err(ConfigError::InvalidColorCount {
                got: self.colors_per_satellite,
                max: MAX_COLORS,
            });
        }
        Ok(())
    }

    /// Elevation (angle at the user between Earth's center and the satellite)
    /// that a satellite must strictly exceed to be usable.
    pub fn min_visible_elevation_deg(&self) -> f64 {
        180.0 - self.max_user_visible_angle_deg
    }

    pub fn with_beams_per_satellite(mut self, beams: usize) -> Self {
        self.beams_per_satellite = beams;
        self
    }

    pub fn with_colors_per_satellite(mut self, colors: usize) -> Self {
        self.colors_per_satellite = colors;
        self
    }

    pub fn with_self_interference_max_deg(mut self, deg: f64) -> Self {
        self.self_interference_max_deg = deg;
        self
    }

    pub fn with_non_starlink_interference_max_deg(mut self, deg: f64) -> Self {
        self.non_starlink_interference_max_deg = deg;
        self
    }

    pub fn with_max_user_visible_angle_deg(mut self, deg: f64) -> Self {
        self.max_user_visible_angle_deg = deg;
        self
    }
}

fn check_angle(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && (0.0..=180.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidAngle { name, value })
    }
}
