//! Beam Planning CLI
//!
//! Assigns satellite beams to user terminals for one scenario.
//!
//! Usage:
//!   plan-beams scenarios/polar.txt
//!   plan-beams --verify --format json < scenarios/polar.txt

use anyhow::{bail, Context, Result};
use beam_planner::{load_config, load_scenario, read_scenario, write_plan, OutputFormat, PlanSummary};
use beam_routing::{verify_plan, BeamConfig, BeamScheduler};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "plan-beams",
    about = "Assign constellation beams to user terminals"
)]
struct Args {
    /// Scenario file; read from stdin when omitted or `-`
    scenario: Option<PathBuf>,

    /// Write the plan here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// JSON planner configuration; omitted fields use defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum active beams per satellite
    #[arg(long)]
    beams_per_sat: Option<usize>,

    /// Colours per satellite
    #[arg(long)]
    colors: Option<usize>,

    /// Minimum angle between same-colour beams of one satellite, degrees
    #[arg(long)]
    self_interference_deg: Option<f64>,

    /// Minimum angle between an interferer and a user's line of sight, degrees
    #[arg(long)]
    interferer_deg: Option<f64>,

    /// Maximum satellite angle from a user's zenith, degrees
    #[arg(long)]
    max_visible_deg: Option<f64>,

    /// Re-check the plan and fail if any constraint is violated
    #[arg(long)]
    verify: bool,

    /// Log the final visibility matrix at debug level
    #[arg(long)]
    dump_matrix: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn beam_config(&self) -> Result<BeamConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => BeamConfig::default(),
        };

        if let Some(beams) = self.beams_per_sat {
            config.beams_per_satellite = beams;
        }
        if let Some(colors) = self.colors {
            config.colors_per_satellite = colors;
        }
        if let Some(deg) = self.self_interference_deg {
            config.self_interference_max_deg = deg;
        }
        if let Some(deg) = self.interferer_deg {
            config.non_starlink_interference_max_deg = deg;
        }
        if let Some(deg) = self.max_visible_deg {
            config.max_user_visible_angle_deg = deg;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout carries only the plan.
    let default_filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = args.beam_config()?;
    debug!(?config, "Planner configuration");

    let scenario = match args.scenario.as_deref() {
        Some(path) if path.as_os_str() != "-" => load_scenario(path)
            .with_context(|| format!("Failed to load scenario {:?}", path))?,
        _ => {
            info!("Reading scenario from stdin");
            read_scenario(io::stdin().lock()).context("Failed to read scenario from stdin")?
        }
    };

    let mut scheduler = BeamScheduler::new(&scenario, config)?;
    scheduler.run();
    if args.dump_matrix {
        debug!("Visibility matrix (. available, # in use, x unavailable):\n{}", scheduler.matrix());
    }
    let plan = scheduler.into_plan();
    let summary = PlanSummary::new(&scenario, &config, &plan);

    match &args.output {
        Some(path) => {
            info!("Writing plan to {:?}", path);
            let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
            write_plan(BufWriter::new(file), &plan, &summary, args.format)?;
        }
        None => write_plan(io::stdout().lock(), &plan, &summary, args.format)?,
    }

    summary.log();

    if args.verify {
        let violations = verify_plan(&scenario, &config, &plan);
        for v in &violations {
            error!("{}", v);
        }
        if !violations.is_empty() {
            bail!("Plan failed verification with {} violations", violations.len());
        }
        info!("Plan verified: no violations");
    }

    Ok(())
}
