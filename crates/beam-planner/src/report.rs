//! Plan rendering and run summary

use beam_routing::{Assignment, AssignmentPlan, BeamConfig, Scenario};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// `sat <id> beam <n> user <id> color <letter>` lines
    Text,
    /// Assignments plus summary as JSON
    Json,
}

/// Aggregate figures for one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanSummary {
    pub users: usize,
    pub users_served: usize,
    pub satellites: usize,
    pub satellites_used: usize,
    pub saturated_satellites: usize,
    pub beams_per_color: BTreeMap<char, usize>,
}

impl PlanSummary {
    pub fn new(scenario: &Scenario, config: &BeamConfig, plan: &AssignmentPlan) -> Self {
        let mut beams_per_color = BTreeMap::new();
        for assignment in plan.iter() {
            *beams_per_color.entry(assignment.color.letter()).or_insert(0) += 1;
        }

        Self {
            users: scenario.users().len(),
            users_served: plan.len(),
            satellites: scenario.satellites().len(),
            satellites_used: plan.satellites().count(),
            saturated_satellites: plan
                .satellites()
                .filter(|(_, beams)| beams.len() >= config.beams_per_satellite)
                .count(),
            beams_per_color,
        }
    }

    pub fn log(&self) {
        info!("{}", "=".repeat(60));
        info!("SUMMARY");
        info!("{}", "=".repeat(60));
        info!("Users served: {} / {}", self.users_served, self.users);
        info!(
            "Satellites used: {} / {} ({} saturated)",
            self.satellites_used, self.satellites, self.saturated_satellites
        );
        for (color, count) in &self.beams_per_color {
            info!("  color {}: {} beams", color, count);
        }
    }
}

#[derive(Serialize)]
struct PlanReport<'a> {
    assignments: Vec<&'a Assignment>,
    summary: &'a PlanSummary,
}

/// One `sat <id> beam <n> user <id> color <letter>` line per beam, satellites
/// ascending, beams in assignment order.
///
/// Satellites are listed by ID, not in the order they first received a beam,
/// so the output depends only on the plan's contents.
pub fn format_plan(plan: &AssignmentPlan) -> String {
    plan.iter()
        .map(|a| {
            format!(
                "sat {} beam {} user {} color {}\n",
                a.satellite, a.beam, a.user, a.color
            )
        })
        .collect()
}

pub fn write_plan(
    mut writer: impl Write,
    plan: &AssignmentPlan,
    summary: &PlanSummary,
    format: OutputFormat,
) -> std::io::Result<()> {
    match format {
        OutputFormat::Text => writer.write_all(format_plan(plan).as_bytes())?,
        OutputFormat::Json => {
            let report = PlanReport {
                assignments: plan.iter().collect(),
                summary,
            };
            serde_json::to_writer_pretty(&mut writer, &report)?;
            writeln!(writer)?;
        }
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use beam_routing::{plan_beams, Color};
    use orbital_mechanics::Position;

    fn example() -> (Scenario, BeamConfig, AssignmentPlan) {
        let scenario = Scenario::from_nodes(
            [(1, Position::new(0.0, 0.0, 42164.0))],
            [
                (1, Position::new(0.0, 0.0, 6371.0)),
                (2, Position::new(6371.0, 0.0, 0.0)),
            ],
            [],
        )
        .unwrap();
        let config = BeamConfig::default();
        let plan = plan_beams(&scenario, config).unwrap();
        (scenario, config, plan)
    }

    #[test]
    fn test_format_single_overhead_user() {
        let (_, _, plan) = example();
        assert_eq!(format_plan(&plan), "sat 1 beam 1 user 1 color A\n");
    }

    #[test]
    fn test_format_orders_satellites_by_id() {
        let mut plan = AssignmentPlan::new();
        let b = Color::new(1).unwrap();
        plan.push(3, 1, b);
        plan.push(1, 2, b);
        plan.push(3, 4, b);
        assert_eq!(
            format_plan(&plan),
            "sat 1 beam 1 user 2 color B\n\
             sat 3 beam 1 user 1 color B\n\
             sat 3 beam 2 user 4 color B\n"
        );
    }

    #[test]
    fn test_empty_plan_writes_nothing() {
        let plan = AssignmentPlan::new();
        let summary = PlanSummary::new(&Scenario::default(), &BeamConfig::default(), &plan);
        let mut out = Vec::new();
        write_plan(&mut out, &plan, &summary, OutputFormat::Text).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_summary() {
        let (scenario, config, plan) = example();
        let summary = PlanSummary::new(&scenario, &config, &plan);
        assert_eq!(summary.users, 2);
        assert_eq!(summary.users_served, 1);
        assert_eq!(summary.satellites_used, 1);
        assert_eq!(summary.saturated_satellites, 0);
        assert_eq!(summary.beams_per_color.get(&'A'), Some(&1));
    }

    #[test]
    fn test_json_output() {
        let (scenario, config, plan) = example();
        let summary = PlanSummary::new(&scenario, &config, &plan);
        let mut out = Vec::new();
        write_plan(&mut out, &plan, &summary, OutputFormat::Json).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["assignments"][0]["satellite"], 1);
        assert_eq!(value["assignments"][0]["beam"], 1);
        assert_eq!(value["assignments"][0]["user"], 1);
        assert_eq!(value["assignments"][0]["color"], "A");
        assert_eq!(value["summary"]["users_served"], 1);
    }
}
