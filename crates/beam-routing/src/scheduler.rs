//! Greedy first-fit beam scheduler
//!
//! # Algorithm
//!
//! 1. Visit users in ascending ID order.
//! 2. Scan the user's matrix row left to right (satellite ascending, colour
//!    ascending) and claim the first available cell. Each user gets at most
//!    one beam; a user with no available cell gets none.
//! 3. After each claim, propagate constraints for the chosen satellite:
//!    - if it now carries `beams_per_satellite` beams, every remaining
//!      available cell of every colour on it is ruled out;
//!    - otherwise, any other user whose cell on the same satellite and colour
//!      is within `self_interference_max_deg` of the new beam (angle measured
//!      at the satellite) is ruled out.
//!
//! No backtracking: the first fit in ID order wins.
//!
//! # Complexity
//! O(U * S * C) for the scans plus O(U) per propagation, O(U^2) overall.

use crate::config::{BeamConfig, ConfigError};
use crate::scenario::{ObjectId, Scenario};
use crate::visibility::{BeamState, VisibilityMatrix};
use crate::Color;
use orbital_mechanics::geometry::angle_degrees;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// One beam: satellite `satellite` serves `user` on `color` as its
/// `beam`-th assignment (1-based, counted across colours).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub satellite: ObjectId,
    pub beam: usize,
    pub user: ObjectId,
    pub color: Color,
}

/// Assignments grouped by satellite, satellites in ascending ID order, each
/// satellite's beams in assignment order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AssignmentPlan {
    satellites: BTreeMap<ObjectId, Vec<Assignment>>,
}

impl AssignmentPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a beam for `satellite`, numbering it after the existing ones.
    pub fn push(&mut self, satellite: ObjectId, user: ObjectId, color: Color) -> Assignment {
        let beams = self.satellites.entry(satellite).or_default();
        let assignment = Assignment {
            satellite,
            beam: beams.len() + 1,
            user,
            color,
        };
        beams.push(assignment);
        assignment
    }

    pub fn beams(&self, satellite: ObjectId) -> &[Assignment] {
        self.satellites
            .get(&satellite)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Satellites carrying at least one beam, ascending
    pub fn satellites(&self) -> impl Iterator<Item = (ObjectId, &[Assignment])> {
        self.satellites.iter().map(|(id, beams)| (*id, beams.as_slice()))
    }

    /// Every assignment, satellite-major
    pub fn iter(&self) -> impl Iterator<Item = &Assignment> {
        self.satellites.values().flatten()
    }

    #[cfg(test)]
    pub(crate) fn for_user(&self, user: ObjectId) -> Option<&Assignment> {
        self.iter().find(|a| a.user == user)
    }

    pub fn len(&self) -> usize {
        self.satellites.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.satellites.is_empty()
    }
}

/// Owns the visibility matrix for one run and mutates it as beams are
/// assigned.
pub struct BeamScheduler<'a> {
    scenario: &'a Scenario,
    config: BeamConfig,
    matrix: VisibilityMatrix,
    plan: AssignmentPlan,
    served: Vec<bool>,
}

impl<'a> BeamScheduler<'a> {
    /// Validate `config` and build the visibility matrix for `scenario`.
    pub fn new(scenario: &'a Scenario, config: BeamConfig) -> Result<Self, ConfigError> {
        let matrix = VisibilityMatrix::build(scenario, &config)?;
        Ok(Self {
            scenario,
            config,
            matrix,
            plan: AssignmentPlan::new(),
            served: vec![false; scenario.users().len()],
        })
    }

    /// Assign every user in ascending ID order.
    pub fn run(&mut self) -> &AssignmentPlan {
        for user in 0..self.served.len() {
            self.assign_user(user);
        }

        info!(
            assigned = self.plan.len(),
            users = self.served.len(),
            satellites_used = self.plan.satellites.len(),
            "Beam assignment complete"
        );
        &self.plan
    }

    /// Give user index `user` the first available beam slot, if any.
    pub fn assign_user(&mut self, user: usize) -> Option<Assignment> {
        if self.served.get(user).copied().unwrap_or(true) {
            return None;
        }

        let column = (0..self.matrix.num_columns()).find(|&c| self.matrix.claim(user, c))?;
        self.served[user] = true;

        let slot = self.matrix.slot(column);
        let sat_id = self.scenario.satellites()[slot.satellite].id;
        let user_id = self.scenario.users()[user].id;
        let assignment = self.plan.push(sat_id, user_id, slot.color);
        debug!(
            sat = sat_id,
            beam = assignment.beam,
            user = user_id,
            color = %slot.color,
            "Assigned beam"
        );

        self.propagate(user, column, assignment.beam);
        Some(assignment)
    }

    /// Rule out cells made infeasible by the beam just placed at `column`
    /// for `user`. `beams_on_sat` counts the satellite's beams including it.
    fn propagate(&mut self, user: usize, column: usize, beams_on_sat: usize) {
        let slot = self.matrix.slot(column);

        if beams_on_sat >= self.config.beams_per_satellite {
            // Full satellite: every colour goes, so the angle check is moot.
            let mut blocked = 0usize;
            for other in 0..self.matrix.num_users() {
                for c in self.matrix.satellite_columns(slot.satellite) {
                    if self.matrix.block_if_available(other, c) {
                        blocked += 1;
                    }
                }
            }
            debug!(
                sat = self.scenario.satellites()[slot.satellite].id,
                blocked, "Satellite saturated"
            );
            return;
        }

        let sat_pos = self.scenario.satellites()[slot.satellite].position;
        let user_pos = self.scenario.users()[user].position;

        for other in 0..self.matrix.num_users() {
            if other == user || self.matrix.get(other, column) != Some(BeamState::Available) {
                continue;
            }

            let other_pos = self.scenario.users()[other].position;
            let interferes = match angle_degrees(&sat_pos, &user_pos, &other_pos) {
                Ok(angle) => angle < self.config.self_interference_max_deg,
                Err(e) => {
                    warn!("Self-interference angle undefined, ruling out cell: {}", e);
                    true
                }
            };
            if interferes {
                self.matrix.block_if_available(other, column);
            }
        }
    }

    pub fn matrix(&self) -> &VisibilityMatrix {
        &self.matrix
    }

    pub fn plan(&self) -> &AssignmentPlan {
        &self.plan
    }

    pub fn into_plan(self) -> AssignmentPlan {
        self.plan
    }
}

/// Build, schedule and return the plan in one call.
pub fn plan_beams(scenario: &Scenario, config: BeamConfig) -> Result<AssignmentPlan, ConfigError> {
    let mut scheduler = BeamScheduler::new(scenario, config)?;
    scheduler.run();
    Ok(scheduler.into_plan())
}
