//! Scenario and configuration loading

use crate::{LoadError, Result};
use beam_routing::{BeamConfig, ObjectKind, Scenario};
use orbital_mechanics::Position;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{info, warn};

/// Parse scenario text. Any malformed line rejects the whole scenario.
pub fn parse_scenario(text: &str) -> Result<Scenario> {
    let mut builder = Scenario::builder();

    for (i, raw) in text.lines().enumerate() {
        let line = i + 1;
        if raw.contains('#') || raw.trim().is_empty() {
            continue;
        }

        let tokens: Vec<&str> = raw.split_whitespace().collect();
        let kind = ObjectKind::from_keyword(tokens[0]).ok_or_else(|| LoadError::UnknownKind {
            line,
            keyword: tokens[0].to_string(),
        })?;
        if tokens.len() != 5 {
            return Err(LoadError::InvalidLine {
                line,
                content: raw.trim().to_string(),
            });
        }

        let id = parse_id(line, tokens[1])?;
        let position = Position::new(
            parse_coordinate(line, tokens[2])?,
            parse_coordinate(line, tokens[3])?,
            parse_coordinate(line, tokens[4])?,
        );

        let replaced = builder
            .insert(kind, id, position)
            .map_err(|source| LoadError::Scenario { line, source })?;
        if let Some(previous) = replaced {
            warn!(line, %kind, id, %previous, "Duplicate ID, later definition wins");
        }
    }

    info!(
        satellites = builder.len(ObjectKind::Satellite),
        users = builder.len(ObjectKind::User),
        interferers = builder.len(ObjectKind::Interferer),
        "Scenario parsed"
    );

    Ok(builder.build())
}

/// Parse a scenario from any reader (file, stdin)
pub fn read_scenario(mut reader: impl Read) -> Result<Scenario> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    parse_scenario(&text)
}

/// Load a scenario file
pub fn load_scenario(path: impl AsRef<Path>) -> Result<Scenario> {
    let path = path.as_ref();
    info!("Loading scenario from {:?}", path);
    read_scenario(BufReader::new(File::open(path)?))
}

/// Load planner configuration from JSON. Omitted fields keep their defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<BeamConfig> {
    let path = path.as_ref();
    info!("Loading config from {:?}", path);

    let file = File::open(path)?;
    let config: BeamConfig = serde_json::from_reader(BufReader::new(file))?;
    config.validate()?;
    Ok(config)
}

fn parse_id(line: usize, token: &str) -> Result<u32> {
    match token.parse::<u32>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(LoadError::InvalidId {
            line,
            id: token.to_string(),
        }),
    }
}

fn parse_coordinate(line: usize, token: &str) -> Result<f64> {
    match token.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(LoadError::InvalidCoordinate {
            line,
            value: token.to_string(),
        }),
    }
}
