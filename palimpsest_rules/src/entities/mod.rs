//! Entity definitions for the narrative graph.

mod node;

pub use node::*;

use serde::{Deserialize, Serialize};

/// Identifier of a narrative node (e.g. `arch-discovery`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Create a node ID from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The narrators of the constellation. Every node belongs to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Character {
    Archaeologist,
    Algorithm,
    LastHuman,
}

impl Character {
    /// All characters in declaration order.
    pub const ALL: [Character; 3] = [
        Character::Archaeologist,
        Character::Algorithm,
        Character::LastHuman,
    ];

    /// Lowercase, hyphenated name used in section keys.
    pub fn slug(&self) -> &'static str {
        match self {
            Character::Archaeologist => "archaeologist",
            Character::Algorithm => "algorithm",
            Character::LastHuman => "last-human",
        }
    }

    /// Name of the content section shown when arriving from this character.
    pub fn bleed_section(&self) -> String {
        format!("after-{}", self.slug())
    }
}

impl std::fmt::Display for Character {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Character::Archaeologist => write!(f, "Archaeologist"),
            Character::Algorithm => write!(f, "Algorithm"),
            Character::LastHuman => write!(f, "Last Human"),
        }
    }
}

/// Coarse temporal bucket derived from a node's temporal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TemporalLayer {
    Past,
    Present,
    Future,
}

impl TemporalLayer {
    /// Map a raw temporal value to its layer: up to 3 is the past,
    /// 4 through 6 the present, anything later the future.
    pub fn from_value(value: i32) -> Self {
        match value {
            i32::MIN..=3 => TemporalLayer::Past,
            4..=6 => TemporalLayer::Present,
            _ => TemporalLayer::Future,
        }
    }
}
