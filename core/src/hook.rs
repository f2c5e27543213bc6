//! Tree hooks and lifecycle notification.
//!
//! A node schedules a [`TreeHook`] through the continue branch of its action;
//! the driver instantiates and runs it once the tree reaches a terminal
//! state. [`LifecycleNode`]s on the path are told about completion whether
//! or not they scheduled anything.

use crate::context::TreeContext;
use crate::error::{HookError, NodeError};
use crate::identity::IdentifiedIdentity;
use crate::node::NodeId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// A scheduled hook: which hook type to run and for which node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookSpec {
    pub hook_type: String,
    pub node_id: Option<NodeId>,
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl HookSpec {
    pub fn new(hook_type: impl Into<String>, node_id: Option<NodeId>, node_type: impl Into<String>) -> Self {
        Self {
            hook_type: hook_type.into(),
            node_id,
            node_type: node_type.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }
}

/// The session created when a tree completes successfully.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub properties: BTreeMap<String, String>,
    pub identity: Option<IdentifiedIdentity>,
    /// Webhooks to call on logout.
    pub webhooks: Vec<String>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            properties: BTreeMap::new(),
            identity: None,
            webhooks: Vec::new(),
        }
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Side effect run after the tree reaches a terminal state.
///
/// Each notification is optional. A failing hook is reported but never
/// undoes the session outcome that has already been decided.
#[async_trait]
pub trait TreeHook: Send + Sync {
    /// The tree succeeded; the new session may be read and mutated.
    async fn accept(&self, _session: &mut Session) -> Result<(), HookError> {
        Ok(())
    }

    /// The tree ended on a failure node. No session exists.
    async fn accept_failure(&self) -> Result<(), HookError> {
        Ok(())
    }

    /// The tree was aborted by a processing error. No session exists.
    async fn accept_exception(&self) -> Result<(), HookError> {
        Ok(())
    }
}

/// A node that wants to hear about the end of any tree it took part in.
///
/// Meant for node-local cleanup such as resetting a retry counter, not for
/// touching the session.
pub trait LifecycleNode: Send + Sync {
    fn on_tree_complete(&self, context: &mut TreeContext, success: bool) -> Result<(), NodeError>;
}
