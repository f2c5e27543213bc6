//! NodeState - a per-node view over the three state tiers.
//!
//! Reads resolve a key in the order transient, secure, shared and are
//! filtered by the node's declared inputs. Writes are never filtered.

use crate::contract::{InputState, WILDCARD};
use crate::error::StateError;
use crate::state::{StateContainers, StateTier, StateTiers};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Read/write façade over [`StateTiers`] for a single node invocation.
///
/// Borrows the tiers owned by the [`TreeContext`](crate::context::TreeContext);
/// nothing is copied when a view is created.
#[derive(Debug)]
pub struct NodeState<'a> {
    tiers: &'a mut StateTiers,
    containers: &'a StateContainers,
    /// `None` means unrestricted.
    visible: Option<BTreeSet<String>>,
}

impl<'a> NodeState<'a> {
    /// A view restricted to the given declared inputs.
    ///
    /// A wildcard input makes the view unrestricted.
    pub fn for_inputs(
        tiers: &'a mut StateTiers,
        containers: &'a StateContainers,
        inputs: &[InputState],
    ) -> Self {
        let visible = if inputs.iter().any(InputState::is_wildcard) {
            None
        } else {
            Some(inputs.iter().map(|input| input.name.clone()).collect())
        };
        Self {
            tiers,
            containers,
            visible,
        }
    }

    /// A view that can read every key.
    pub fn unrestricted(tiers: &'a mut StateTiers, containers: &'a StateContainers) -> Self {
        Self {
            tiers,
            containers,
            visible: None,
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.visible.is_none()
    }

    fn is_visible(&self, key: &str) -> bool {
        match &self.visible {
            None => true,
            Some(names) => names.contains(key) || names.contains(WILDCARD),
        }
    }

    /// True if the key is visible to this node and present in some tier.
    pub fn is_defined(&self, key: &str) -> bool {
        self.is_visible(key)
            && StateTier::READ_ORDER
                .iter()
                .any(|tier| self.tiers.tier(*tier).contains_key(key))
    }

    /// The value for `key` from the highest-precedence tier that holds it.
    pub fn get(&self, key: &str) -> Option<&Value> {
        if !self.is_visible(key) {
            return None;
        }
        StateTier::READ_ORDER
            .iter()
            .find_map(|tier| self.tiers.tier(*tier).get(key))
    }

    /// The tier `key` would be read from, if visible and present.
    pub fn tier_of(&self, key: &str) -> Option<StateTier> {
        if !self.is_visible(key) {
            return None;
        }
        StateTier::READ_ORDER
            .iter()
            .copied()
            .find(|tier| self.tiers.tier(*tier).contains_key(key))
    }

    /// Combined view of a container spread across several tiers.
    ///
    /// Sub-keys are resolved with the same precedence as [`get`](Self::get).
    pub fn get_object(&self, key: &str) -> Option<Map<String, Value>> {
        if !self.is_visible(key) {
            return None;
        }
        let mut combined: Option<Map<String, Value>> = None;
        for tier in StateTier::READ_ORDER.iter().rev() {
            if let Some(Value::Object(object)) = self.tiers.tier(*tier).get(key) {
                let target = combined.get_or_insert_with(Map::new);
                for (sub_key, value) in object {
                    target.insert(sub_key.clone(), value.clone());
                }
            }
        }
        combined
    }

    /// Every visible key present in at least one tier.
    pub fn keys(&self) -> BTreeSet<String> {
        StateTier::READ_ORDER
            .iter()
            .flat_map(|tier| self.tiers.tier(*tier).keys())
            .filter(|key| self.is_visible(key))
            .cloned()
            .collect()
    }

    /// Writes `key` to shared state, evicting it from the transient and secure tiers.
    pub fn put_shared(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.put(StateTier::Shared, key.into(), value.into());
        self
    }

    /// Writes `key` to transient state, evicting it from the shared and secure tiers.
    pub fn put_transient(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.put(StateTier::Transient, key.into(), value.into());
        self
    }

    /// Removes `key` from every tier.
    pub fn remove(&mut self, key: &str) -> &mut Self {
        for tier in StateTier::READ_ORDER {
            self.tiers.tier_mut(tier).remove(key);
        }
        self
    }

    /// Merges `object` into shared state.
    ///
    /// Nested objects are only accepted under registered state containers;
    /// their sub-keys are moved out of the other two tiers first. Nothing is
    /// written when the object fails validation.
    pub fn merge_shared(&mut self, object: Map<String, Value>) -> Result<&mut Self, StateError> {
        self.merge(StateTier::Shared, object)?;
        Ok(self)
    }

    /// Merges `object` into transient state. See [`merge_shared`](Self::merge_shared).
    pub fn merge_transient(&mut self, object: Map<String, Value>) -> Result<&mut Self, StateError> {
        self.merge(StateTier::Transient, object)?;
        Ok(self)
    }

    fn put(&mut self, target: StateTier, key: String, value: Value) {
        for tier in StateTier::READ_ORDER {
            if tier != target {
                self.tiers.tier_mut(tier).remove(&key);
            }
        }
        self.tiers.tier_mut(target).insert(key, value);
    }

    fn merge(&mut self, target: StateTier, object: Map<String, Value>) -> Result<(), StateError> {
        for (key, value) in &object {
            let registered = self.containers.contains(key);
            match (registered, value.is_object()) {
                (false, true) => return Err(StateError::NotAContainer { key: key.clone() }),
                (true, false) => {
                    return Err(StateError::ContainerRequiresObject { key: key.clone() });
                }
                (true, true) if self.tiers.tier(target).get(key).is_some_and(|held| !held.is_object()) => {
                    return Err(StateError::ContainerRequiresObject { key: key.clone() });
                }
                _ => {}
            }
        }

        for (key, value) in object {
            match value {
                Value::Object(entries) => self.merge_container(target, &key, entries)?,
                other => self.put(target, key, other),
            }
        }
        Ok(())
    }

    fn merge_container(
        &mut self,
        target: StateTier,
        container: &str,
        entries: Map<String, Value>,
    ) -> Result<(), StateError> {
        for (sub_key, value) in entries {
            for tier in StateTier::READ_ORDER {
                if tier != target && self.tiers.tier_mut(tier).remove_nested(container, &sub_key).is_some() {
                    tracing::trace!(container, sub_key = %sub_key, from = ?tier, to = ?target, "moved container entry between tiers");
                }
            }
            self.tiers
                .tier_mut(target)
                .container_mut(container)?
                .insert(sub_key, value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateDocument;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn tiers() -> StateTiers {
        let mut tiers = StateTiers::default();
        tiers.shared.insert("username", "shared-alice");
        tiers.shared.insert("realm", "/alpha");
        tiers.secure.insert("username", "secure-alice");
        tiers.transient.insert("username", "transient-alice");
        tiers.secure.insert("otp", "424242");
        tiers
    }

    #[test]
    fn undeclared_key_is_invisible() {
        let mut tiers = tiers();
        let containers = StateContainers::none();
        let state = NodeState::for_inputs(&mut tiers, &containers, &[InputState::required("username")]);

        assert!(state.is_defined("username"));
        assert!(!state.is_defined("realm"));
        assert_eq!(state.get("realm"), None);
        assert_eq!(state.keys(), BTreeSet::from(["username".to_string()]));
    }

    #[test]
    fn reads_prefer_transient_then_secure_then_shared() {
        let mut tiers = tiers();
        let containers = StateContainers::none();
        {
            let state = NodeState::unrestricted(&mut tiers, &containers);
            assert_eq!(state.get("username"), Some(&json!("transient-alice")));
            assert_eq!(state.tier_of("username"), Some(StateTier::Transient));
        }

        tiers.transient.remove("username");
        {
            let state = NodeState::unrestricted(&mut tiers, &containers);
            assert_eq!(state.get("username"), Some(&json!("secure-alice")));
        }

        tiers.secure.remove("username");
        let state = NodeState::unrestricted(&mut tiers, &containers);
        assert_eq!(state.get("username"), Some(&json!("shared-alice")));
    }

    #[test]
    fn optional_input_sees_shared_only_value() {
        let mut tiers = StateTiers::default();
        tiers.shared.insert("email", "alice@example.com");
        let containers = StateContainers::none();
        let state = NodeState::for_inputs(&mut tiers, &containers, &[InputState::optional("email")]);

        assert_eq!(state.get("email"), Some(&json!("alice@example.com")));
    }

    #[test]
    fn wildcard_input_is_unrestricted() {
        let mut tiers = tiers();
        let containers = StateContainers::none();
        let state = NodeState::for_inputs(&mut tiers, &containers, &[InputState::wildcard()]);

        assert!(state.is_unrestricted());
        assert!(state.is_defined("realm"));
        assert_eq!(state.keys().len(), 3);
    }

    #[test]
    fn writes_ignore_the_input_filter() {
        let mut tiers = StateTiers::default();
        let containers = StateContainers::none();
        let mut state = NodeState::for_inputs(&mut tiers, &containers, &[]);

        state.put_shared("authLevel", 10).put_transient("password", "s3cret");
        assert!(!state.is_defined("authLevel"));

        assert_eq!(tiers.shared.get("authLevel"), Some(&json!(10)));
        assert_eq!(tiers.transient.get("password"), Some(&json!("s3cret")));
    }

    #[test]
    fn put_evicts_key_from_other_tiers() {
        let mut tiers = tiers();
        let containers = StateContainers::none();
        NodeState::unrestricted(&mut tiers, &containers).put_shared("username", "bob");

        assert_eq!(tiers.shared.get("username"), Some(&json!("bob")));
        assert!(!tiers.transient.contains_key("username"));
        assert!(!tiers.secure.contains_key("username"));
    }

    #[test]
    fn remove_clears_every_tier() {
        let mut tiers = tiers();
        let containers = StateContainers::none();
        let mut state = NodeState::unrestricted(&mut tiers, &containers);
        state.remove("username");

        assert!(!state.is_defined("username"));
    }

    #[test]
    fn merge_into_registered_container_moves_sub_keys() {
        let mut tiers = StateTiers::default();
        tiers.transient.insert("profile", json!({"age": 25, "nickname": "al"}));
        let containers = StateContainers::new(["profile"]);

        NodeState::unrestricted(&mut tiers, &containers)
            .merge_shared(object(json!({"profile": {"age": 30}})))
            .unwrap();

        assert_eq!(tiers.shared.get("profile"), Some(&json!({"age": 30})));
        assert_eq!(tiers.transient.get("profile"), Some(&json!({"nickname": "al"})));
    }

    #[test]
    fn merge_moving_last_sub_key_drops_the_emptied_container() {
        let mut tiers = StateTiers::default();
        tiers.transient.insert("profile", json!({"age": 25}));
        let containers = StateContainers::new(["profile"]);
        let mut state = NodeState::unrestricted(&mut tiers, &containers);

        state.merge_shared(object(json!({"profile": {"age": 30}}))).unwrap();

        assert_eq!(state.get("profile"), Some(&json!({"age": 30})));
        assert_eq!(state.tier_of("profile"), Some(StateTier::Shared));
        assert!(!tiers.transient.contains_key("profile"));
    }

    #[test]
    fn merge_over_scalar_held_under_container_fails() {
        let mut tiers = StateTiers::default();
        tiers.shared.insert("profile", "legacy-string");
        let containers = StateContainers::new(["profile"]);

        let err = NodeState::unrestricted(&mut tiers, &containers)
            .merge_shared(object(json!({"profile": {"age": 30}})))
            .unwrap_err();

        assert_eq!(err, StateError::ContainerRequiresObject { key: "profile".into() });
        assert_eq!(tiers.shared.get("profile"), Some(&json!("legacy-string")));
    }

    #[test]
    fn merge_nested_object_into_plain_key_fails() {
        let mut tiers = StateTiers::default();
        tiers.shared.insert("username", "alice");
        let containers = StateContainers::none();

        let err = NodeState::unrestricted(&mut tiers, &containers)
            .merge_shared(object(json!({"username": "bob", "profile": {"age": 30}})))
            .unwrap_err();

        assert_eq!(err, StateError::NotAContainer { key: "profile".into() });
        assert_eq!(tiers.shared.get("username"), Some(&json!("alice")));
        assert!(!tiers.shared.contains_key("profile"));
    }

    #[test]
    fn merge_scalar_into_container_fails() {
        let mut tiers = StateTiers::default();
        let containers = StateContainers::new(["objectAttributes"]);

        let err = NodeState::unrestricted(&mut tiers, &containers)
            .merge_transient(object(json!({"objectAttributes": "mail"})))
            .unwrap_err();

        assert_eq!(
            err,
            StateError::ContainerRequiresObject {
                key: "objectAttributes".into()
            }
        );
    }

    #[test]
    fn merging_twice_is_idempotent() {
        let containers = StateContainers::new(["objectAttributes"]);
        let update = object(json!({"objectAttributes": {"mail": "a@example.com", "sn": "Smith"}}));

        let mut once = StateTiers::default();
        NodeState::unrestricted(&mut once, &containers)
            .merge_shared(update.clone())
            .unwrap();

        let mut twice = StateTiers::default();
        {
            let mut state = NodeState::unrestricted(&mut twice, &containers);
            state.merge_shared(update.clone()).unwrap();
            state.merge_shared(update).unwrap();
        }

        assert_eq!(once, twice);
    }

    #[test]
    fn get_object_combines_tiers_with_precedence() {
        let mut tiers = StateTiers::new(
            StateDocument::from(object(json!({"objectAttributes": {"mail": "shared@example.com", "sn": "Smith"}}))),
            StateDocument::from(object(json!({"objectAttributes": {"mail": "transient@example.com"}}))),
            StateDocument::from(object(json!({"objectAttributes": {"password": "s3cret"}}))),
        );
        let containers = StateContainers::new(["objectAttributes"]);
        let state = NodeState::unrestricted(&mut tiers, &containers);

        let combined = state.get_object("objectAttributes").unwrap();
        assert_eq!(combined.get("mail"), Some(&json!("transient@example.com")));
        assert_eq!(combined.get("sn"), Some(&json!("Smith")));
        assert_eq!(combined.get("password"), Some(&json!("s3cret")));
    }
}
