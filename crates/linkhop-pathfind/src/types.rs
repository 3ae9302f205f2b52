//! Request and response types for discovery operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use linkhop_core::{PathDiscoveryResult, VertexId};

use crate::error::{PathfindError, Result};
use crate::loader::GraphTensors;

/// Largest hop budget a request may ask for.
pub const MAX_HOPS_LIMIT: usize = 4;

/// Request to discover how two entities are connected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryRequest {
    #[serde(alias = "entityA")]
    pub entity_a: VertexId,
    #[serde(alias = "entityB")]
    pub entity_b: VertexId,
    /// Hop budget, 1 to 4.
    #[serde(alias = "maxHops")]
    pub max_hops: usize,
    /// Maximum vertices per sampled neighborhood (default: 500).
    #[serde(default, alias = "nodeBudget")]
    pub node_budget: Option<usize>,
    /// Deadline for the whole discovery.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Also load the first subgraph as dense tensors.
    #[serde(default)]
    pub include_tensors: Option<bool>,
}

impl DiscoveryRequest {
    pub fn new(entity_a: impl Into<VertexId>, entity_b: impl Into<VertexId>, max_hops: usize) -> Self {
        Self {
            entity_a: entity_a.into(),
            entity_b: entity_b.into(),
            max_hops,
            node_budget: None,
            timeout_ms: None,
            include_tensors: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.entity_a.as_str().is_empty() || self.entity_b.as_str().is_empty() {
            return Err(PathfindError::InvalidRequest {
                reason: "entity ids must not be empty".to_string(),
            });
        }
        if !(1..=MAX_HOPS_LIMIT).contains(&self.max_hops) {
            return Err(PathfindError::InvalidRequest {
                reason: format!(
                    "max_hops must be between 1 and {MAX_HOPS_LIMIT}, got {}",
                    self.max_hops
                ),
            });
        }
        if self.node_budget == Some(0) {
            return Err(PathfindError::InvalidRequest {
                reason: "node_budget must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Complete result of one discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryReport {
    pub request_id: Uuid,
    pub entity_a: VertexId,
    pub entity_b: VertexId,
    pub max_hops: usize,
    pub result: PathDiscoveryResult,
    pub tensors: Option<GraphTensors>,
    pub computation_ms: u64,
    pub computed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_from_json_with_defaults() {
        let json = r#"{"entity_a": "player100", "entity_b": "team204", "max_hops": 3}"#;
        let request: DiscoveryRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.entity_a.as_str(), "player100");
        assert_eq!(request.node_budget, None);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_request_accepts_camel_case() {
        let json = r#"{"entityA": "player100", "entityB": "team204", "maxHops": 2, "nodeBudget": 50}"#;
        let request: DiscoveryRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.max_hops, 2);
        assert_eq!(request.node_budget, Some(50));
    }

    #[test]
    fn test_hop_bounds() {
        assert!(DiscoveryRequest::new("a", "b", 0).validate().is_err());
        assert!(DiscoveryRequest::new("a", "b", 1).validate().is_ok());
        assert!(DiscoveryRequest::new("a", "b", 4).validate().is_ok());
        assert!(matches!(
            DiscoveryRequest::new("a", "b", 5).validate(),
            Err(PathfindError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn test_zero_budget_and_empty_ids_rejected() {
        let mut request = DiscoveryRequest::new("a", "b", 2);
        request.node_budget = Some(0);
        assert!(request.validate().is_err());
        assert!(DiscoveryRequest::new("", "b", 2).validate().is_err());
    }
}
