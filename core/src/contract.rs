//! Declarative state contracts a node publishes for ahead-of-time graph validation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Wildcard used both as an input name (unrestricted view) and as an
/// output outcome id (applies to every outcome).
pub const WILDCARD: &str = "*";

/// A state key a node consumes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputState {
    pub name: String,
    /// When false the node must tolerate the key being absent.
    pub required: bool,
}

impl InputState {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
        }
    }

    /// Declares that the node may read every key.
    pub fn wildcard() -> Self {
        Self::optional(WILDCARD)
    }

    pub fn is_wildcard(&self) -> bool {
        self.name == WILDCARD
    }
}

/// A state key a node produces, per outcome.
///
/// `outcomes` maps an outcome id (or [`WILDCARD`]) to whether the key is
/// guaranteed (`true`) or only possibly (`false`) present when the node is
/// left through that outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputState {
    pub name: String,
    pub outcomes: BTreeMap<String, bool>,
}

impl OutputState {
    /// The key is guaranteed on every outcome.
    pub fn always(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcomes: BTreeMap::from([(WILDCARD.to_string(), true)]),
        }
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcomes: BTreeMap::new(),
        }
    }

    pub fn on(mut self, outcome: impl Into<String>, guaranteed: bool) -> Self {
        self.outcomes.insert(outcome.into(), guaranteed);
        self
    }

    /// Whether the key is guaranteed once the node follows `outcome`.
    ///
    /// An explicit entry for the outcome wins over the wildcard entry.
    pub fn is_guaranteed_for(&self, outcome: &str) -> bool {
        self.outcomes
            .get(outcome)
            .or_else(|| self.outcomes.get(WILDCARD))
            .copied()
            .unwrap_or(false)
    }
}
