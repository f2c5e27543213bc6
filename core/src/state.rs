//! State tiers: the three key/value documents a tree execution carries
//! between round trips.
//!
//! * **shared** - non-confidential, signed by the driver across round trips.
//! * **transient** - confidential, encrypted across round trips, only kept
//!   while a downstream node declares the key as an input.
//! * **secure** - transient values promoted so they survive a callback round
//!   trip. Nodes never create secure entries; it is context only.

use crate::error::StateError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;

/// An ordered key/value document holding scalars, sequences or nested documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateDocument {
    entries: Map<String, Value>,
}

impl StateDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries.get_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Inserts `value`, returning the previous value for `key` if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    /// Removes `key` keeping the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.entries
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.entries
    }

    /// Removes `sub_key` from the object stored under `container`, if both exist.
    ///
    /// A container left empty is removed so it no longer shadows other tiers.
    pub(crate) fn remove_nested(&mut self, container: &str, sub_key: &str) -> Option<Value> {
        let object = self.entries.get_mut(container)?.as_object_mut()?;
        let removed = object.shift_remove(sub_key)?;
        if object.is_empty() {
            self.entries.shift_remove(container);
        }
        Some(removed)
    }

    /// Returns the object stored under `container`, creating it when absent.
    pub(crate) fn container_mut(&mut self, container: &str) -> Result<&mut Map<String, Value>, StateError> {
        match self
            .entries
            .entry(container.to_string())
            .or_insert_with(|| Value::Object(Map::new()))
        {
            Value::Object(object) => Ok(object),
            _ => Err(StateError::ContainerRequiresObject {
                key: container.to_string(),
            }),
        }
    }
}

impl From<Map<String, Value>> for StateDocument {
    fn from(entries: Map<String, Value>) -> Self {
        Self { entries }
    }
}

impl FromIterator<(String, Value)> for StateDocument {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Which of the three documents a value lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateTier {
    Shared,
    Transient,
    Secure,
}

impl StateTier {
    /// Read precedence used by node state views.
    pub const READ_ORDER: [StateTier; 3] = [StateTier::Transient, StateTier::Secure, StateTier::Shared];
}

/// The three state documents of one tree execution.
///
/// Owned by the driver between invocations and lent to a single
/// [`TreeContext`](crate::context::TreeContext) for the duration of a step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateTiers {
    #[serde(default)]
    pub shared: StateDocument,
    #[serde(default)]
    pub transient: StateDocument,
    #[serde(default)]
    pub secure: StateDocument,
}

impl StateTiers {
    pub fn new(shared: StateDocument, transient: StateDocument, secure: StateDocument) -> Self {
        Self {
            shared,
            transient,
            secure,
        }
    }

    pub fn tier(&self, tier: StateTier) -> &StateDocument {
        match tier {
            StateTier::Shared => &self.shared,
            StateTier::Transient => &self.transient,
            StateTier::Secure => &self.secure,
        }
    }

    pub fn tier_mut(&mut self, tier: StateTier) -> &mut StateDocument {
        match tier {
            StateTier::Shared => &mut self.shared,
            StateTier::Transient => &mut self.transient,
            StateTier::Secure => &mut self.secure,
        }
    }

    /// Moves every transient entry into the secure tier.
    ///
    /// Called by the driver before a callback round trip so transient values
    /// can be presented again when the client calls back.
    pub fn promote_transient_to_secure(&mut self) {
        let transient = std::mem::take(&mut self.transient);
        for (key, value) in transient.into_map() {
            self.secure.insert(key, value);
        }
    }

    /// Keeps only the transient entries for which `keep` returns true.
    pub fn retain_transient<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str) -> bool,
    {
        let transient = std::mem::take(&mut self.transient);
        self.transient = transient
            .into_map()
            .into_iter()
            .filter(|(key, _)| keep(key))
            .collect();
    }
}

/// Tree-wide whitelist of keys allowed to hold mergeable nested objects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateContainers(Arc<BTreeSet<String>>);

impl StateContainers {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(Arc::new(keys.into_iter().map(Into::into).collect()))
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn document_preserves_insertion_order() {
        let mut doc = StateDocument::new();
        doc.insert("zeta", 1);
        doc.insert("alpha", 2);
        doc.insert("mid", 3);
        doc.remove("alpha");

        let keys: Vec<_> = doc.keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "mid"]);
    }

    #[test]
    fn promote_moves_transient_into_secure() {
        let mut tiers = StateTiers::default();
        tiers.transient.insert("password", "s3cret");
        tiers.secure.insert("otp", "123456");

        tiers.promote_transient_to_secure();

        assert!(tiers.transient.is_empty());
        assert_eq!(tiers.secure.get("password"), Some(&json!("s3cret")));
        assert_eq!(tiers.secure.get("otp"), Some(&json!("123456")));
    }

    #[test]
    fn retain_transient_drops_undeclared_keys() {
        let mut tiers = StateTiers::default();
        tiers.transient.insert("password", "s3cret");
        tiers.transient.insert("scratch", true);

        tiers.retain_transient(|key| key == "password");

        assert!(tiers.transient.contains_key("password"));
        assert!(!tiers.transient.contains_key("scratch"));
    }

    #[test]
    fn tiers_round_trip_through_json() {
        let mut tiers = StateTiers::default();
        tiers.shared.insert("username", "alice");
        tiers.shared.insert("objectAttributes", json!({"mail": "alice@example.com"}));

        let encoded = serde_json::to_value(&tiers).unwrap();
        assert_eq!(encoded["shared"]["username"], json!("alice"));

        let decoded: StateTiers = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, tiers);
    }
}
