//! Core field types.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Node identifier, as configured on each agent.
pub type NodeId = String;

/// The emitted fields of one node, keyed by type.
pub type FieldSet = BTreeMap<FieldType, FieldValue>;

/// One of the three scalar signals a node emits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Error-rate and latency derived wellness
    Health,
    /// Resource pressure
    Load,
    /// Remaining headroom
    Capacity,
}

impl FieldType {
    /// All field types, in wire order.
    pub const ALL: [FieldType; 3] = [FieldType::Health, FieldType::Load, FieldType::Capacity];

    /// Wire name of this field.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Health => "health",
            FieldType::Load => "load",
            FieldType::Capacity => "capacity",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "health" => Ok(FieldType::Health),
            "load" => Ok(FieldType::Load),
            "capacity" => Ok(FieldType::Capacity),
            other => Err(Error::UnknownField(other.to_string())),
        }
    }
}

/// A single emitted field reading.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Node that emitted the reading
    pub source: NodeId,
    /// Intensity in [0, 1]
    pub intensity: f64,
    /// Emission time, ms since Unix epoch
    pub timestamp: u64,
}

impl FieldValue {
    /// Create a reading stamped with the current time.
    pub fn new(field_type: FieldType, source: impl Into<NodeId>, intensity: f64) -> Self {
        Self {
            field_type,
            source: source.into(),
            intensity,
            timestamp: now_millis(),
        }
    }
}

/// Aggregated view of one node's fields.
///
/// Unknown fields read as zero, never as absent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalFieldState {
    pub node_id: NodeId,
    pub health: f64,
    pub load: f64,
    pub capacity: f64,
    /// Time of the last write to this node, ms since Unix epoch (0 if never written)
    pub last_updated: u64,
}

impl LocalFieldState {
    /// All-zero state for a node nobody has reported on.
    pub fn neutral(node_id: impl Into<NodeId>) -> Self {
        Self {
            node_id: node_id.into(),
            ..Default::default()
        }
    }

    /// Read one field by type.
    pub fn get(&self, field_type: FieldType) -> f64 {
        match field_type {
            FieldType::Health => self.health,
            FieldType::Load => self.load,
            FieldType::Capacity => self.capacity,
        }
    }
}

/// Clamp into [0, 1]. NaN maps to 0.
pub fn clamp01(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// Current wall-clock time in ms since Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
