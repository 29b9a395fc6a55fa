//! Beam Routing Library
//!
//! Greedy first-fit assignment of satellite beams to ground terminals.
//!
//! A run has three stages:
//!
//! 1. [`VisibilityMatrix::build`] marks every `(user, satellite, colour)` cell
//!    available when the satellite is within the terminal's cone around
//!    zenith and no interferer sits near the line of sight.
//! 2. [`BeamScheduler::run`] walks users in ID order and claims the first
//!    available cell for each, propagating capacity and self-interference
//!    constraints after every claim.
//! 3. [`verify::verify_plan`] optionally re-checks the finished
//!    [`AssignmentPlan`] from scratch.
//!
//! ```text
//! Scenario ──► VisibilityMatrix ──► BeamScheduler ──► AssignmentPlan
//! ```

use serde::{Serialize, Serializer};

pub mod config;
pub mod scenario;
pub mod scheduler;
pub mod verify;
pub mod visibility;

pub use config::{BeamConfig, ConfigError};
pub use scenario::{Node, ObjectId, ObjectKind, Scenario, ScenarioBuilder, ScenarioError};
pub use scheduler::{plan_beams, Assignment, AssignmentPlan, BeamScheduler};
pub use verify::{verify_plan, Violation};
pub use visibility::{BeamSlot, BeamState, MatrixError, VisibilityMatrix};

/// Colours are rendered as letters, which bounds how many a satellite may use.
pub const MAX_COLORS: usize = 26;

/// A frequency/polarisation channel index, shown as `A`, `B`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Color(u8);

impl Color {
    pub fn new(index: usize) -> Option<Self> {
        if index < MAX_COLORS {
            Some(Color(index as u8))
        } else {
            None
        }
    }

    #[cfg(test)]
    pub(crate) fn from_letter(letter: char) -> Option<Self> {
        if letter.is_ascii_uppercase() {
            Some(Color(letter as u8 - b'A'))
        } else {
            None
        }
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }

    pub fn letter(&self) -> char {
        (b'A' + self.0) as char
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_char(self.letter())
    }
}
