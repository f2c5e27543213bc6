use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use trellis_core::node::NodeId;
use uuid::Uuid;

/// A discrete event in the life of a journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    NodeEnter {
        node_id: NodeId,
        node_type: String,
        at: DateTime<Utc>,
    },
    NodeExit {
        node_id: NodeId,
        /// "Continue", "AskForInput", "Suspend" or "Error"
        result: String,
        outcome: Option<String>,
        detail: Value,
        duration_ms: u64,
        at: DateTime<Utc>,
    },
    Suspended {
        node_id: NodeId,
        suspended_id: Uuid,
        at: DateTime<Utc>,
    },
    Completed {
        status: String,
        at: DateTime<Utc>,
    },
}

impl AuditEvent {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            AuditEvent::NodeEnter { at, .. }
            | AuditEvent::NodeExit { at, .. }
            | AuditEvent::Suspended { at, .. }
            | AuditEvent::Completed { at, .. } => *at,
        }
    }
}

/// Sequential record of the nodes run during one executor step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditTrail {
    pub events: Vec<AuditEvent>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: AuditEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Node ids in the order they were entered.
    pub fn entered(&self) -> Vec<NodeId> {
        self.events
            .iter()
            .filter_map(|event| match event {
                AuditEvent::NodeEnter { node_id, .. } => Some(*node_id),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trail_lists_entered_nodes_in_order() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut trail = AuditTrail::new();
        trail.push(AuditEvent::NodeEnter {
            node_id: a,
            node_type: "Username".into(),
            at: Utc::now(),
        });
        trail.push(AuditEvent::NodeExit {
            node_id: a,
            result: "Continue".into(),
            outcome: Some("outcome".into()),
            detail: Value::Null,
            duration_ms: 0,
            at: Utc::now(),
        });
        trail.push(AuditEvent::NodeEnter {
            node_id: b,
            node_type: "Password".into(),
            at: Utc::now(),
        });

        assert_eq!(trail.entered(), vec![a, b]);
        let encoded = serde_json::to_value(&trail).unwrap();
        assert_eq!(encoded["events"][1]["event"], "node_exit");
        assert!(trail.events.windows(2).all(|pair| pair[0].at() <= pair[1].at()));
    }
}
