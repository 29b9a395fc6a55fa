//! Visibility matrix
//!
//! One row per user, one column per `(satellite, colour)` beam slot, ordered
//! satellite-major so that scanning a row left to right visits satellites in
//! ascending ID and colours in ascending index within each satellite.
//!
//! Cells only ever leave [`BeamState::Available`]; every mutation goes
//! through a checked method that refuses to move a cell backwards.

use crate::config::{BeamConfig, ConfigError};
use crate::scenario::Scenario;
use crate::Color;
use orbital_mechanics::geometry::angle_degrees;
use orbital_mechanics::{Position, EARTH_CENTER};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatrixError {
    #[error("Cell (user {user}, column {column}) outside {users}x{columns} matrix")]
    OutOfRange {
        user: usize,
        column: usize,
        users: usize,
        columns: usize,
    },
    #[error("Illegal transition {from:?} -> {to:?} at (user {user}, column {column})")]
    IllegalTransition {
        user: usize,
        column: usize,
        from: BeamState,
        to: BeamState,
    },
}

pub type Result<T> = std::result::Result<T, MatrixError>;

/// Cell state. `Available` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BeamState {
    Available,
    InUse,
    Unavailable,
}

impl BeamState {
    pub fn can_transition_to(self, next: BeamState) -> bool {
        matches!(
            (self, next),
            (BeamState::Available, BeamState::InUse) | (BeamState::Available, BeamState::Unavailable)
        )
    }

    pub fn symbol(self) -> char {
        match self {
            BeamState::Available => '.',
            BeamState::InUse => '#',
            BeamState::Unavailable => 'x',
        }
    }
}

/// `(satellite index, colour)` addressed by a matrix column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BeamSlot {
    pub satellite: usize,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityMatrix {
    users: usize,
    satellites: usize,
    colors: usize,
    cells: Vec<BeamState>,
}

impl VisibilityMatrix {
    /// Evaluate every `(user, satellite)` pair of the scenario.
    ///
    /// A pair is usable when the satellite lies strictly within
    /// `max_user_visible_angle_deg` of the user's zenith and no interferer is
    /// closer than `non_starlink_interference_max_deg` to the line of sight.
    /// All colour cells of a usable pair start `Available`; everything else
    /// starts `Unavailable`. Fails if `config` does not validate.
    pub fn build(
        scenario: &Scenario,
        config: &BeamConfig,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;

        let users = scenario.users().len();
        let satellites = scenario.satellites().len();
        let colors = config.colors_per_satellite;
        let mut cells = vec![BeamState::Unavailable; users * satellites * colors];

        let min_elevation = config.min_visible_elevation_deg();
        let mut usable_pairs = 0usize;
        let mut below_horizon = 0usize;
        let mut interfered = 0usize;

        for (u, user) in scenario.users().iter().enumerate() {
            for (s, sat) in scenario.satellites().iter().enumerate() {
                let elevation = match angle_degrees(&user.position, &EARTH_CENTER, &sat.position) {
                    Ok(angle) => angle,
                    Err(e) => {
                        warn!(user = user.id, sat = sat.id, "Elevation undefined, pair unusable: {}", e);
                        below_horizon += 1;
                        continue;
                    }
                };

                // User terminals are unable to form beams too far off vertical.
                if elevation <= min_elevation {
                    below_horizon += 1;
                    continue;
                }

                if let Some(interferer) =
                    first_interferer(scenario, &user.position, &sat.position, config)
                {
                    debug!(user = user.id, sat = sat.id, interferer, "Line of sight interfered");
                    interfered += 1;
                    continue;
                }

                let start = (u * satellites + s) * colors;
                cells[start..start + colors].fill(BeamState::Available);
                usable_pairs += 1;
            }
        }

        info!(
            users,
            satellites,
            usable_pairs,
            below_horizon,
            interfered,
            "Visibility matrix built"
        );

        Ok(Self {
            users,
            satellites,
            colors,
            cells,
        })
    }

    pub fn num_users(&self) -> usize {
        self.users
    }

    pub fn num_satellites(&self) -> usize {
        self.satellites
    }

    pub fn colors_per_satellite(&self) -> usize {
        self.colors
    }

    /// Columns per row: satellites times colours
    pub fn num_columns(&self) -> usize {
        self.satellites * self.colors
    }

    pub fn column(&self, slot: BeamSlot) -> usize {
        slot.satellite * self.colors + slot.color.index()
    }

    pub fn slot(&self, column: usize) -> BeamSlot {
        BeamSlot {
            satellite: column / self.colors,
            color: Color((column % self.colors) as u8),
        }
    }

    /// Columns of every colour of one satellite
    pub fn satellite_columns(&self, satellite: usize) -> std::ops::Range<usize> {
        satellite * self.colors..(satellite + 1) * self.colors
    }

    pub fn get(&self, user: usize, column: usize) -> Option<BeamState> {
        self.offset(user, column).ok().map(|i| self.cells[i])
    }

    pub fn row(&self, user: usize) -> Option<&[BeamState]> {
        if user >= self.users {
            return None;
        }
        let width = self.num_columns();
        Some(&self.cells[user * width..(user + 1) * width])
    }

    /// Move a cell to `next`, rejecting anything but `Available -> InUse` and
    /// `Available -> Unavailable`.
    pub fn set(&mut self, user: usize, column: usize, next: BeamState) -> Result<()> {
        let i = self.offset(user, column)?;
        let current = self.cells[i];
        if !current.can_transition_to(next) {
            return Err(MatrixError::IllegalTransition {
                user,
                column,
                from: current,
                to: next,
            });
        }
        self.cells[i] = next;
        Ok(())
    }

    /// Take the cell for a beam if it is still available.
    pub fn claim(&mut self, user: usize, column: usize) -> bool {
        self.set(user, column, BeamState::InUse).is_ok()
    }

    /// Rule the cell out if it is still available. Returns whether it changed.
    pub fn block_if_available(&mut self, user: usize, column: usize) -> bool {
        self.set(user, column, BeamState::Unavailable).is_ok()
    }

    pub fn count(&self, state: BeamState) -> usize {
        self.cells.iter().filter(|c| **c == state).count()
    }

    fn offset(&self, user: usize, column: usize) -> Result<usize> {
        let columns = self.num_columns();
        if user >= self.users || column >= columns {
            return Err(MatrixError::OutOfRange {
                user,
                column,
                users: self.users,
                columns,
            });
        }
        Ok(user * columns + column)
    }
}

/// ID of the first interferer (ascending ID) too close to the user's line of
/// sight toward `sat`. Coinciding with the user counts as too close.
fn first_interferer(
    scenario: &Scenario,
    user: &Position,
    sat: &Position,
    config: &BeamConfig,
) -> Option<u32> {
    scenario
        .interferers()
        .iter()
        .find(|interferer| match angle_degrees(user, &interferer.position, sat) {
            Ok(angle) => angle < config.non_starlink_interference_max_deg,
            Err(e) => {
                warn!(interferer = interferer.id, "Interference angle undefined: {}", e);
                true
            }
        })
        .map(|interferer| interferer.id)
}

/// One line per user, satellites separated by `|`.
impl std::fmt::Display for VisibilityMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for user in 0..self.users {
            write!(f, "u{:<4}", user)?;
            for (column, state) in self.row(user).unwrap_or(&[]).iter().enumerate() {
                if column > 0 && column % self.colors == 0 {
                    f.write_str(" |")?;
                }
                write!(f, " {}", state.symbol())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MAX_COLORS;

    const EARTH_R: f64 = 6371.0;

    fn polar_scenario(interferers: Vec<(u32, Position)>) -> Scenario {
        Scenario::from_nodes(
            [(1, Position::new(0.0, 0.0, 42164.0))],
            [
                (1, Position::new(0.0, 0.0, EARTH_R)),
                (2, Position::new(EARTH_R, 0.0, 0.0)),
            ],
            interferers,
        )
        .unwrap()
    }

    #[test]
    fn test_overhead_pair_available_on_all_colors() {
        let matrix =
            VisibilityMatrix::build(&polar_scenario(vec![]), &BeamConfig::default()).unwrap();
        assert_eq!(matrix.num_columns(), 4);
        assert_eq!(matrix.row(0).unwrap(), &[BeamState::Available; 4]);
    }

    #[test]
    fn test_horizon_pair_unavailable() {
        let matrix =
            VisibilityMatrix::build(&polar_scenario(vec![]), &BeamConfig::default()).unwrap();
        assert_eq!(matrix.row(1).unwrap(), &[BeamState::Unavailable; 4]);
    }

    #[test]
    fn test_interferer_near_line_of_sight_blocks_pair() {
        // Slightly off the user-satellite axis, well inside 20 degrees.
        let interferer = Position::new(500.0, 0.0, 20000.0);
        let matrix = VisibilityMatrix::build(
            &polar_scenario(vec![(1, interferer)]),
            &BeamConfig::default(),
        )
        .unwrap();
        assert_eq!(matrix.count(BeamState::Available), 0);
    }

    #[test]
    fn test_interferer_far_from_line_of_sight_ignored() {
        let interferer = Position::new(40000.0, 0.0, EARTH_R);
        let matrix = VisibilityMatrix::build(
            &polar_scenario(vec![(1, interferer)]),
            &BeamConfig::default(),
        )
        .unwrap();
        assert_eq!(matrix.count(BeamState::Available), 4);
    }

    #[test]
    fn test_interferer_on_top_of_user_blocks_pair() {
        let matrix = VisibilityMatrix::build(
            &polar_scenario(vec![(7, Position::new(0.0, 0.0, EARTH_R))]),
            &BeamConfig::default(),
        )
        .unwrap();
        assert_eq!(matrix.row(0).unwrap(), &[BeamState::Unavailable; 4]);
    }

    #[test]
    fn test_user_at_earth_center_is_unusable() {
        let scenario = Scenario::from_nodes(
            [(1, Position::new(0.0, 0.0, 42164.0))],
            [(1, EARTH_CENTER)],
            [],
        )
        .unwrap();
        let matrix = VisibilityMatrix::build(&scenario, &BeamConfig::default()).unwrap();
        assert_eq!(matrix.count(BeamState::Available), 0);
    }

    #[test]
    fn test_wider_cone_admits_horizon_user() {
        let config = BeamConfig::default().with_max_user_visible_angle_deg(100.0);
        let matrix = VisibilityMatrix::build(&polar_scenario(vec![]), &config).unwrap();
        assert_eq!(matrix.row(1).unwrap(), &[BeamState::Available; 4]);
    }

    #[test]
    fn test_transitions_are_one_way() {
        let mut matrix =
            VisibilityMatrix::build(&polar_scenario(vec![]), &BeamConfig::default()).unwrap();

        assert!(matrix.claim(0, 0));
        assert!(!matrix.claim(0, 0));
        assert!(!matrix.block_if_available(0, 0));
        assert_eq!(matrix.get(0, 0), Some(BeamState::InUse));

        assert!(matrix.block_if_available(0, 1));
        assert_eq!(
            matrix.set(0, 1, BeamState::Available),
            Err(MatrixError::IllegalTransition {
                user: 0,
                column: 1,
                from: BeamState::Unavailable,
                to: BeamState::Available,
            })
        );
        assert!(matrix.set(0, 2, BeamState::Available).is_err());
        assert!(!matrix.claim(1, 0));
    }

    #[test]
    fn test_out_of_range() {
        let mut matrix =
            VisibilityMatrix::build(&polar_scenario(vec![]), &BeamConfig::default()).unwrap();
        assert_eq!(matrix.get(2, 0), None);
        assert_eq!(matrix.get(0, 4), None);
        assert!(matches!(
            matrix.set(0, 4, BeamState::InUse),
            Err(MatrixError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_slot_column_mapping() {
        let scenario = Scenario::from_nodes(
            [
                (1, Position::new(0.0, 0.0, 42164.0)),
                (2, Position::new(0.0, 0.0, 42165.0)),
            ],
            [],
            [],
        )
        .unwrap();
        let matrix = VisibilityMatrix::build(&scenario, &BeamConfig::default()).unwrap();
        let slot = matrix.slot(6);
        assert_eq!(slot.satellite, 1);
        assert_eq!(slot.color.letter(), 'C');
        assert_eq!(matrix.column(slot), 6);
        assert_eq!(matrix.satellite_columns(1), 4..8);
    }

    #[test]
    fn test_build_rejects_unusable_color_counts() {
        for colors in [0, MAX_COLORS + 1, 30] {
            let config = BeamConfig::default().with_colors_per_satellite(colors);
            assert_eq!(
                VisibilityMatrix::build(&polar_scenario(vec![]), &config),
                Err(ConfigError::InvalidColorCount {
                    got: colors,
                    max: MAX_COLORS,
                })
            );
        }
    }

    #[test]
    fn test_last_color_has_a_letter() {
        let config = BeamConfig::default().with_colors_per_satellite(MAX_COLORS);
        let matrix = VisibilityMatrix::build(&polar_scenario(vec![]), &config).unwrap();
        assert_eq!(matrix.slot(MAX_COLORS - 1).color.letter(), 'Z');
    }

    #[test]
    fn test_display_marks_states() {
        let mut matrix =
            VisibilityMatrix::build(&polar_scenario(vec![]), &BeamConfig::default()).unwrap();
        matrix.claim(0, 0);
        let dump = matrix.to_string();
        let lines: Vec<_> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("# . . ."));
        assert!(lines[1].ends_with("x x x x"));
    }
}
