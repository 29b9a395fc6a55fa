//! Beam Planner
//!
//! Text-format adapters around the `beam-routing` core: loads scenario files,
//! reads planner configuration, and renders assignment plans.
//!
//! # Scenario format
//!
//! ```text
//! # comment lines contain a '#' anywhere
//! sat 1 0 0 42164
//! user 1 0 0 6371
//! interferer 1 20000 0 30000
//! ```
//!
//! # Output format
//!
//! ```text
//! sat 1 beam 1 user 1 color A
//! ```

use beam_routing::{ConfigError, ScenarioError};
use thiserror::Error;

pub mod loader;
pub mod report;

pub use loader::{load_config, load_scenario, parse_scenario, read_scenario};
pub use report::{format_plan, write_plan, OutputFormat, PlanSummary};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("line {line}: expected `<kind> <id> <x> <y> <z>`, got {content:?}")]
    InvalidLine { line: usize, content: String },
    #[error("line {line}: unknown object kind {keyword:?}")]
    UnknownKind { line: usize, keyword: String },
    #[error("line {line}: invalid ID {id:?}, expected a positive integer")]
    InvalidId { line: usize, id: String },
    #[error("line {line}: invalid coordinate {value:?}")]
    InvalidCoordinate { line: usize, value: String },
    #[error("line {line}: {source}")]
    Scenario {
        line: usize,
        #[source]
        source: ScenarioError,
    },
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, LoadError>;
