//! Gossip wire format.
//!
//! One message per datagram, JSON encoded:
//!
//! ```text
//! {
//!   "origin": "node-a",
//!   "hops": 0,
//!   "fields": {
//!     "health":   {"type": "health", "source": "node-a", "intensity": 0.93, "timestamp": 1700000000000},
//!     "load":     {...},
//!     "capacity": {...}
//!   },
//!   "timestamp": 1700000000000
//! }
//! ```
//!
//! No authentication, integrity check or compression.

use crate::error::Result;
use gradient_fields::{now_millis, FieldSet, FieldValue, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A field announcement travelling through the mesh.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GossipMessage {
    /// Node whose fields these are
    pub origin: NodeId,
    /// Relay steps taken so far
    pub hops: u32,
    /// Field name to reading
    pub fields: BTreeMap<String, FieldValue>,
    /// Creation time at the origin, ms since Unix epoch
    pub timestamp: u64,
}

impl GossipMessage {
    /// A fresh announcement of `origin`'s own fields.
    pub fn announce(origin: impl Into<NodeId>, fields: &FieldSet) -> Self {
        Self {
            origin: origin.into(),
            hops: 0,
            fields: fields
                .iter()
                .map(|(ft, value)| (ft.as_str().to_string(), value.clone()))
                .collect(),
            timestamp: now_millis(),
        }
    }

    /// Encode to a datagram payload.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a datagram payload.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradient_fields::FieldType;

    #[test]
    fn announce_starts_at_zero_hops() {
        let mut fields = FieldSet::new();
        fields.insert(FieldType::Health, FieldValue::new(FieldType::Health, "node-a", 0.9));
        fields.insert(FieldType::Load, FieldValue::new(FieldType::Load, "node-a", 0.2));

        let msg = GossipMessage::announce("node-a", &fields);
        assert_eq!(msg.origin, "node-a");
        assert_eq!(msg.hops, 0);
        assert_eq!(msg.fields.len(), 2);
        assert_eq!(msg.fields["health"].intensity, 0.9);
        assert!(msg.timestamp > 0);
    }

    #[test]
    fn decodes_peer_payload() {
        let raw = br#"{
            "origin": "node-b",
            "hops": 2,
            "fields": {
                "capacity": {"type": "capacity", "source": "node-b", "intensity": 0.4, "timestamp": 7}
            },
            "timestamp": 9
        }"#;
        let msg = GossipMessage::decode(raw).unwrap();
        assert_eq!(msg.origin, "node-b");
        assert_eq!(msg.hops, 2);
        assert_eq!(msg.fields["capacity"].field_type, FieldType::Capacity);
        assert_eq!(msg.timestamp, 9);
    }

    #[test]
    fn rejects_malformed_payloads() {
        assert!(GossipMessage::decode(b"not json").is_err());
        assert!(GossipMessage::decode(br#"{"origin":"a","hops":-1,"fields":{},"timestamp":0}"#).is_err());
        assert!(GossipMessage::decode(br#"{"origin":"a"}"#).is_err());
    }

    #[test]
    fn encode_is_decodable() {
        let msg = GossipMessage {
            origin: "n".into(),
            hops: 1,
            fields: BTreeMap::new(),
            timestamp: 3,
        };
        let bytes = msg.encode().unwrap();
        assert_eq!(GossipMessage::decode(&bytes).unwrap(), msg);
    }
}
