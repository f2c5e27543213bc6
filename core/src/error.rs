//! Error types for the node contract, the layered state and the action protocol.

use thiserror::Error;

/// Structural violations raised by [`NodeState`](crate::node_state::NodeState) merges.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// A nested object was merged under a key that is not a registered state container.
    #[error("key '{key}' holds a nested object but is not a registered state container")]
    NotAContainer { key: String },

    /// A registered state container was merged with something other than an object.
    #[error("registered state container '{key}' can only be merged with an object")]
    ContainerRequiresObject { key: String },
}

/// Misuse of the [`Action`](crate::action::Action) builders.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("an action must name the outcome to follow")]
    MissingOutcome,

    #[error("an action requesting input must carry at least one callback")]
    EmptyCallbacks,

    #[error("session property '{key}' is reserved and cannot be set by a node")]
    BlacklistedSessionProperty { key: String },
}

/// Failure to resolve a node step to a single outcome.
///
/// The message and lockout message are shown to the end-user as they are;
/// the driver does not localize them further.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct NodeError {
    message: String,
    lockout_message: Option<String>,
    #[source]
    source: Option<anyhow::Error>,
}

impl NodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            lockout_message: None,
            source: None,
        }
    }

    pub fn with_lockout(mut self, lockout_message: impl Into<String>) -> Self {
        self.lockout_message = Some(lockout_message.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn lockout_message(&self) -> Option<&str> {
        self.lockout_message.as_deref()
    }
}

impl From<anyhow::Error> for NodeError {
    fn from(err: anyhow::Error) -> Self {
        Self {
            message: err.to_string(),
            lockout_message: None,
            source: Some(err),
        }
    }
}

impl From<StateError> for NodeError {
    fn from(err: StateError) -> Self {
        NodeError::new(err.to_string()).with_source(err)
    }
}

impl From<ActionError> for NodeError {
    fn from(err: ActionError) -> Self {
        NodeError::new(err.to_string()).with_source(err)
    }
}

/// Errors describing a node's set of outgoing edges.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OutcomeError {
    /// A dynamic provider could not compute its edges from the node configuration.
    #[error("outcomes cannot be determined: {reason}")]
    Undetermined { reason: String },

    /// A bounded provider returned an outcome outside of its declared superset.
    #[error("outcome '{outcome}' is not part of the provider's full outcome set")]
    NotInSuperset { outcome: String },
}

impl OutcomeError {
    pub fn undetermined(reason: impl Into<String>) -> Self {
        OutcomeError::Undetermined {
            reason: reason.into(),
        }
    }
}

impl From<OutcomeError> for NodeError {
    fn from(err: OutcomeError) -> Self {
        NodeError::new(err.to_string()).with_source(err)
    }
}

/// Failure raised by a [`TreeHook`](crate::hook::TreeHook).
#[derive(Debug, Error)]
#[error("tree hook failed: {message}")]
pub struct HookError {
    message: String,
    #[source]
    source: Option<anyhow::Error>,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<anyhow::Error> for HookError {
    fn from(err: anyhow::Error) -> Self {
        Self {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

/// Failure to deliver a resume URI out-of-band.
#[derive(Debug, Error)]
#[error("suspension could not be delivered: {message}")]
pub struct SuspensionError {
    message: String,
    #[source]
    source: Option<anyhow::Error>,
}

impl SuspensionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<anyhow::Error> for SuspensionError {
    fn from(err: anyhow::Error) -> Self {
        Self {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

/// Errors loading an [`EngineConfig`](crate::config::EngineConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
