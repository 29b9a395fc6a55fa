//! Independent plan checker
//!
//! Re-derives every constraint from the scenario geometry, without the
//! visibility matrix, so a plan can be audited after the fact (or a plan
//! produced elsewhere can be checked against the same rules).

use crate::config::BeamConfig;
use crate::scenario::{ObjectId, ObjectKind, Scenario};
use crate::scheduler::AssignmentPlan;
use crate::Color;
use orbital_mechanics::geometry::angle_degrees;
use orbital_mechanics::EARTH_CENTER;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum Violation {
    #[error("{kind} {id} is not in the scenario")]
    UnknownReference { kind: ObjectKind, id: ObjectId },
    #[error("sat {satellite} beam {beam} uses color {color} beyond the configured {colors}")]
    ColorOutOfRange {
        satellite: ObjectId,
        beam: usize,
        color: Color,
        colors: usize,
    },
    #[error("sat {satellite} carries {count} beams, limit {limit}")]
    CapacityExceeded {
        satellite: ObjectId,
        count: usize,
        limit: usize,
    },
    #[error("sat {satellite} beam numbering expected {expected}, found {found}")]
    BeamIndexGap {
        satellite: ObjectId,
        expected: usize,
        found: usize,
    },
    #[error("user {user} is assigned more than one beam")]
    UserAssignedTwice { user: ObjectId },
    #[error("user {user} cannot see sat {satellite} (elevation {elevation_deg:?})")]
    NotVisible {
        user: ObjectId,
        satellite: ObjectId,
        elevation_deg: Option<f64>,
    },
    #[error("interferer {interferer} is {angle_deg:?} deg from user {user}'s line to sat {satellite}")]
    InterfererTooClose {
        user: ObjectId,
        satellite: ObjectId,
        interferer: ObjectId,
        angle_deg: Option<f64>,
    },
    #[error("sat {satellite} color {color}: users {first} and {second} only {angle_deg:?} deg apart")]
    SelfInterference {
        satellite: ObjectId,
        color: Color,
        first: ObjectId,
        second: ObjectId,
        angle_deg: Option<f64>,
    },
}

/// Check `plan` against capacity, numbering, visibility and interference
/// rules. An empty result means the plan is valid.
pub fn verify_plan(scenario: &Scenario, config: &BeamConfig, plan: &AssignmentPlan) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut seen_users: BTreeMap<ObjectId, usize> = BTreeMap::new();

    for (sat_id, beams) in plan.satellites() {
        let Some(sat) = scenario.find(ObjectKind::Satellite, sat_id) else {
            violations.push(Violation::UnknownReference {
                kind: ObjectKind::Satellite,
                id: sat_id,
            });
            continue;
        };

        if beams.len() > config.beams_per_satellite {
            violations.push(Violation::CapacityExceeded {
                satellite: sat_id,
                count: beams.len(),
                limit: config.beams_per_satellite,
            });
        }

        for (i, beam) in beams.iter().enumerate() {
            if beam.beam != i + 1 {
                violations.push(Violation::BeamIndexGap {
                    satellite: sat_id,
                    expected: i + 1,
                    found: beam.beam,
                });
            }
            if beam.color.index() >= config.colors_per_satellite {
                violations.push(Violation::ColorOutOfRange {
                    satellite: sat_id,
                    beam: beam.beam,
                    color: beam.color,
                    colors: config.colors_per_satellite,
                });
            }

            let count = seen_users.entry(beam.user).or_default();
            *count += 1;
            if *count == 2 {
                violations.push(Violation::UserAssignedTwice { user: beam.user });
            }

            let Some(user) = scenario.find(ObjectKind::User, beam.user) else {
                violations.push(Violation::UnknownReference {
                    kind: ObjectKind::User,
                    id: beam.user,
                });
                continue;
            };

            let elevation = angle_degrees(&user.position, &EARTH_CENTER, &sat.position).ok();
            if !elevation.is_some_and(|e| e > config.min_visible_elevation_deg()) {
                violations.push(Violation::NotVisible {
                    user: beam.user,
                    satellite: sat_id,
                    elevation_deg: elevation,
                });
            }

            for interferer in scenario.interferers() {
                let angle = angle_degrees(&user.position, &interferer.position, &sat.position).ok();
                if !angle.is_some_and(|a| a >= config.non_starlink_interference_max_deg) {
                    violations.push(Violation::InterfererTooClose {
                        user: beam.user,
                        satellite: sat_id,
                        interferer: interferer.id,
                        angle_deg: angle,
                    });
                }
            }
        }

        // Same-colour pairs on this satellite
        for (i, a) in beams.iter().enumerate() {
            for b in &beams[i + 1..] {
                if a.color != b.color {
                    continue;
                }
                let (Some(ua), Some(ub)) = (
                    scenario.find(ObjectKind::User, a.user),
                    scenario.find(ObjectKind::User, b.user),
                ) else {
                    continue;
                };
                let angle = angle_degrees(&sat.position, &ua.position, &ub.position).ok();
                if !angle.is_some_and(|deg| deg >= config.self_interference_max_deg) {
                    violations.push(Violation::SelfInterference {
                        satellite: sat_id,
                        color: a.color,
                        first: a.user,
                        second: b.user,
                        angle_deg: angle,
                    });
                }
            }
        }
    }

    info!(
        beams = plan.len(),
        violations = violations.len(),
        "Plan verified"
    );
    violations
}
