//! Scenario model
//!
//! Satellites, user terminals and third-party interferers, each keyed by a
//! positive integer ID. IDs are resolved to dense indices here, once: every
//! collection is stored sorted by ID so that index order is ID order, and the
//! rest of the crate works on indices only.

use orbital_mechanics::Position;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub type ObjectId = u32;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScenarioError {
    #[error("{kind} ID must be a positive integer, got {id}")]
    InvalidId { kind: ObjectKind, id: ObjectId },
    #[error("{kind} {id} has a non-finite position {position}")]
    NonFinitePosition {
        kind: ObjectKind,
        id: ObjectId,
        position: Position,
    },
}

pub type Result<T> = std::result::Result<T, ScenarioError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectKind {
    Satellite,
    User,
    Interferer,
}

impl ObjectKind {
    /// Keyword used for this kind in scenario files
    pub fn keyword(&self) -> &'static str {
        match self {
            ObjectKind::Satellite => "sat",
            ObjectKind::User => "user",
            ObjectKind::Interferer => "interferer",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "sat" => Some(ObjectKind::Satellite),
            "user" => Some(ObjectKind::User),
            "interferer" => Some(ObjectKind::Interferer),
            _ => None,
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A named point in the scenario
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: ObjectId,
    pub position: Position,
}

/// Immutable input to one planning run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    satellites: Vec<Node>,
    users: Vec<Node>,
    interferers: Vec<Node>,
}

impl Scenario {
    pub fn builder() -> ScenarioBuilder {
        ScenarioBuilder::default()
    }

    /// Build from `(id, position)` lists. A repeated ID keeps the last entry.
    pub fn from_nodes(
        satellites: impl IntoIterator<Item = (ObjectId, Position)>,
        users: impl IntoIterator<Item = (ObjectId, Position)>,
        interferers: impl IntoIterator<Item = (ObjectId, Position)>,
    ) -> Result<Self> {
        let mut builder = Self::builder();
        for (id, position) in satellites {
            builder.insert(ObjectKind::Satellite, id, position)?;
        }
        for (id, position) in users {
            builder.insert(ObjectKind::User, id, position)?;
        }
        for (id, position) in interferers {
            builder.insert(ObjectKind::Interferer, id, position)?;
        }
        Ok(builder.build())
    }

    pub fn satellites(&self) -> &[Node] {
        &self.satellites
    }

    pub fn users(&self) -> &[Node] {
        &self.users
    }

    pub fn interferers(&self) -> &[Node] {
        &self.interferers
    }

    pub fn nodes(&self, kind: ObjectKind) -> &[Node] {
        match kind {
            ObjectKind::Satellite => &self.satellites,
            ObjectKind::User => &self.users,
            ObjectKind::Interferer => &self.interferers,
        }
    }

    /// Dense index of an object, if the scenario defines it
    pub fn index_of(&self, kind: ObjectKind, id: ObjectId) -> Option<usize> {
        self.nodes(kind).binary_search_by_key(&id, |n| n.id).ok()
    }

    pub fn find(&self, kind: ObjectKind, id: ObjectId) -> Option<&Node> {
        self.index_of(kind, id).map(|i| &self.nodes(kind)[i])
    }

    pub fn is_empty(&self) -> bool {
        self.satellites.is_empty() && self.users.is_empty() && self.interferers.is_empty()
    }
}

/// Collects objects in any order; `build` sorts them by ID.
#[derive(Debug, Clone, Default)]
pub struct ScenarioBuilder {
    satellites: BTreeMap<ObjectId, Position>,
    users: BTreeMap<ObjectId, Position>,
    interferers: BTreeMap<ObjectId, Position>,
}

impl ScenarioBuilder {
    /// Add an object. Returns the position it replaced if the ID was already
    /// defined for this kind.
    pub fn insert(
        &mut self,
        kind: ObjectKind,
        id: ObjectId,
        position: Position,
    ) -> Result<Option<Position>> {
        if id == 0 {
            return Err(ScenarioError::InvalidId { kind, id });
        }
        if !position.is_finite() {
            return Err(ScenarioError::NonFinitePosition { kind, id, position });
        }

        let table = match kind {
            ObjectKind::Satellite => &mut self.satellites,
            ObjectKind::User => &mut self.users,
            ObjectKind::Interferer => &mut self.interferers,
        };
        Ok(table.insert(id, position))
    }

    pub fn len(&self, kind: ObjectKind) -> usize {
        match kind {
            ObjectKind::Satellite => self.satellites.len(),
            ObjectKind::User => self.users.len(),
            ObjectKind::Interferer => self.interferers.len(),
        }
    }

    pub fn build(self) -> Scenario {
        fn into_nodes(table: BTreeMap<ObjectId, Position>) -> Vec<Node> {
            table
                .into_iter()
                .map(|(id, position)| Node { id, position })
                .collect()
        }

        Scenario {
            satellites: into_nodes(self.satellites),
            users: into_nodes(self.users),
            interferers: into_nodes(self.interferers),
        }
    }
}
