use serde::{Deserialize, Serialize};
use trellis_core::action::SessionPropertyChanges;
use trellis_core::hook::HookSpec;
use trellis_core::identity::IdentifiedIdentity;
use trellis_core::node::NodeId;
use trellis_core::state::{StateDocument, StateTiers};
use uuid::Uuid;

/// Everything one execution of a tree carries between round trips.
///
/// The executor hands the journey back whenever it has to wait for the
/// client; the caller persists it and passes it in again on the next
/// request. Nothing in it refers to node instances, so it serializes as is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Journey {
    pub id: Uuid,
    pub tree: String,
    /// Node to process on the next step.
    pub current: NodeId,
    pub tiers: StateTiers,
    /// Every node entered so far, in order; repeats are kept.
    pub visited: Vec<NodeId>,
    #[serde(default)]
    pub session_properties: SessionPropertyChanges,
    #[serde(default)]
    pub hooks: Vec<HookSpec>,
    #[serde(default)]
    pub webhooks: Vec<String>,
    #[serde(default)]
    pub identity: Option<IdentifiedIdentity>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub lockout_message: Option<String>,
    #[serde(default)]
    pub suspended_id: Option<Uuid>,
}

impl Journey {
    pub fn new(tree: impl Into<String>, entry: NodeId, shared: StateDocument) -> Self {
        Self {
            id: Uuid::new_v4(),
            tree: tree.into(),
            current: entry,
            tiers: StateTiers {
                shared,
                ..StateTiers::default()
            },
            visited: Vec::new(),
            session_properties: SessionPropertyChanges::default(),
            hooks: Vec::new(),
            webhooks: Vec::new(),
            identity: None,
            error_message: None,
            lockout_message: None,
            suspended_id: None,
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended_id.is_some()
    }

    /// Visited node ids without repeats, in first-visit order.
    pub fn distinct_visited(&self) -> Vec<NodeId> {
        let mut seen = std::collections::BTreeSet::new();
        self.visited.iter().copied().filter(|id| seen.insert(*id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn journey_survives_serialization() {
        let entry = Uuid::new_v4();
        let mut shared = StateDocument::new();
        shared.insert("realm", json!("/"));
        let mut journey = Journey::new("Login", entry, shared);
        journey.visited = vec![entry, entry];
        journey.session_properties.set("department", "finance").unwrap();

        let encoded = serde_json::to_string(&journey).unwrap();
        let decoded: Journey = serde_json::from_str(&encoded).unwrap();

        assert_eq!(decoded, journey);
        assert_eq!(decoded.distinct_visited(), vec![entry]);
    }
}
