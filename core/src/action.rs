//! Action - the immutable result of one node invocation.
//!
//! An action is in exactly one of three modes, each with its own entry point:
//!
//! * [`Action::goto`] - continue along a named outcome.
//! * [`Action::send`] - ask the client for more input.
//! * [`Action::suspend`] - park the tree until an out-of-band event.
//!
//! Session properties, tree hooks, webhooks and identity confirmation only
//! matter once the tree reaches a terminal node, so they can only be set on
//! the builder returned by [`Action::goto`].

use crate::callback::Callback;
use crate::config::session_property_blacklist;
use crate::error::ActionError;
use crate::hook::HookSpec;
use crate::identity::{IdentifiedIdentity, IdentityType};
use crate::node::NodeId;
use crate::state::StateDocument;
use crate::suspension::SuspensionHandler;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Well-known return property keys.
pub mod return_keys {
    pub const HEADER: &str = "header";
    pub const DESCRIPTION: &str = "description";
    pub const STAGE: &str = "stage";
}

/// Session properties staged by a node: `Some` sets, `None` removes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionPropertyChanges {
    changes: BTreeMap<String, Option<String>>,
}

impl SessionPropertyChanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages `key = value`. Reserved keys are rejected and nothing is staged.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<(), ActionError> {
        let key = Self::check(key.into())?;
        self.changes.insert(key, Some(value.into()));
        Ok(())
    }

    /// Stages removal of `key`. Reserved keys are rejected and nothing is staged.
    pub fn remove(&mut self, key: impl Into<String>) -> Result<(), ActionError> {
        let key = Self::check(key.into())?;
        self.changes.insert(key, None);
        Ok(())
    }

    fn check(key: String) -> Result<String, ActionError> {
        if session_property_blacklist().contains(&key) {
            return Err(ActionError::BlacklistedSessionProperty { key });
        }
        Ok(key)
    }

    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.changes.get(key).map(Option::as_deref)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.changes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Folds `other` into `self`; later changes win.
    pub fn extend(&mut self, other: SessionPropertyChanges) {
        self.changes.extend(other.changes);
    }

    /// Applies the staged changes to a property map.
    pub fn apply_to(&self, properties: &mut BTreeMap<String, String>) {
        for (key, value) in &self.changes {
            match value {
                Some(value) => {
                    properties.insert(key.clone(), value.clone());
                }
                None => {
                    properties.remove(key);
                }
            }
        }
    }
}

/// Everything a [`Continue`](ActionMode::Continue) action carries besides state.
#[derive(Debug, Clone, PartialEq)]
pub struct Continuation {
    pub outcome: String,
    pub session_properties: SessionPropertyChanges,
    pub session_hooks: Vec<HookSpec>,
    pub webhooks: Vec<String>,
    pub identified_identity: Option<IdentifiedIdentity>,
}

/// The three mutually exclusive things an action can ask the driver to do.
#[derive(Clone)]
pub enum ActionMode {
    Continue(Continuation),
    AskForInput(Vec<Callback>),
    Suspend(Arc<dyn SuspensionHandler>),
}

impl std::fmt::Debug for ActionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionMode::Continue(continuation) => f.debug_tuple("Continue").field(continuation).finish(),
            ActionMode::AskForInput(callbacks) => f.debug_tuple("AskForInput").field(callbacks).finish(),
            ActionMode::Suspend(_) => f.debug_tuple("Suspend").field(&"<handler>").finish(),
        }
    }
}

impl ActionMode {
    pub fn name(&self) -> &'static str {
        match self {
            ActionMode::Continue(_) => "Continue",
            ActionMode::AskForInput(_) => "AskForInput",
            ActionMode::Suspend(_) => "Suspend",
        }
    }
}

/// An action taken apart by the driver.
#[derive(Debug)]
pub struct ActionParts {
    pub mode: ActionMode,
    pub shared_state: Option<StateDocument>,
    pub transient_state: Option<StateDocument>,
    pub return_properties: Map<String, Value>,
    pub error_message: Option<String>,
    pub lockout_message: Option<String>,
}

/// Immutable description of what happens after a node step.
#[derive(Debug, Clone)]
pub struct Action {
    mode: ActionMode,
    shared_state: Option<StateDocument>,
    transient_state: Option<StateDocument>,
    return_properties: Map<String, Value>,
    error_message: Option<String>,
    lockout_message: Option<String>,
}

impl Action {
    /// Continue to the named outcome.
    pub fn goto(outcome: impl Into<String>) -> ActionBuilder<Continuing> {
        ActionBuilder::new(Continuing {
            outcome: outcome.into(),
            session_properties: SessionPropertyChanges::default(),
            session_hooks: Vec::new(),
            webhooks: Vec::new(),
            identified_identity: None,
        })
    }

    /// Ask the client for input. Fails on an empty callback list.
    pub fn send<I>(callbacks: I) -> Result<ActionBuilder<SendingCallbacks>, ActionError>
    where
        I: IntoIterator<Item = Callback>,
    {
        let callbacks: Vec<Callback> = callbacks.into_iter().collect();
        if callbacks.is_empty() {
            return Err(ActionError::EmptyCallbacks);
        }
        Ok(ActionBuilder::new(SendingCallbacks { callbacks }))
    }

    /// Suspend the tree; the driver hands the resume URI to `handler`.
    pub fn suspend<H: SuspensionHandler + 'static>(handler: H) -> ActionBuilder<Suspending> {
        Self::suspend_with(Arc::new(handler))
    }

    pub fn suspend_with(handler: Arc<dyn SuspensionHandler>) -> ActionBuilder<Suspending> {
        ActionBuilder::new(Suspending { handler })
    }

    pub fn mode(&self) -> &ActionMode {
        &self.mode
    }

    pub fn outcome(&self) -> Option<&str> {
        match &self.mode {
            ActionMode::Continue(continuation) => Some(&continuation.outcome),
            _ => None,
        }
    }

    pub fn callbacks(&self) -> &[Callback] {
        match &self.mode {
            ActionMode::AskForInput(callbacks) => callbacks,
            _ => &[],
        }
    }

    pub fn suspension_handler(&self) -> Option<&Arc<dyn SuspensionHandler>> {
        match &self.mode {
            ActionMode::Suspend(handler) => Some(handler),
            _ => None,
        }
    }

    /// True when the action asks the client for input.
    pub fn sending_callbacks(&self) -> bool {
        matches!(self.mode, ActionMode::AskForInput(_))
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self.mode, ActionMode::Suspend(_))
    }

    fn continuation(&self) -> Option<&Continuation> {
        match &self.mode {
            ActionMode::Continue(continuation) => Some(continuation),
            _ => None,
        }
    }

    pub fn identified_identity(&self) -> Option<&IdentifiedIdentity> {
        self.continuation()?.identified_identity.as_ref()
    }

    pub fn session_hooks(&self) -> &[HookSpec] {
        self.continuation()
            .map(|c| c.session_hooks.as_slice())
            .unwrap_or_default()
    }

    pub fn webhooks(&self) -> &[String] {
        self.continuation()
            .map(|c| c.webhooks.as_slice())
            .unwrap_or_default()
    }

    pub fn session_properties(&self) -> Option<&SessionPropertyChanges> {
        self.continuation().map(|c| &c.session_properties)
    }

    pub fn shared_state(&self) -> Option<&StateDocument> {
        self.shared_state.as_ref()
    }

    pub fn transient_state(&self) -> Option<&StateDocument> {
        self.transient_state.as_ref()
    }

    pub fn return_properties(&self) -> &Map<String, Value> {
        &self.return_properties
    }

    pub fn header(&self) -> Option<&str> {
        self.return_properties.get(return_keys::HEADER).and_then(Value::as_str)
    }

    pub fn description(&self) -> Option<&str> {
        self.return_properties
            .get(return_keys::DESCRIPTION)
            .and_then(Value::as_str)
    }

    pub fn stage(&self) -> Option<&str> {
        self.return_properties.get(return_keys::STAGE).and_then(Value::as_str)
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn lockout_message(&self) -> Option<&str> {
        self.lockout_message.as_deref()
    }

    pub fn into_parts(self) -> ActionParts {
        ActionParts {
            mode: self.mode,
            shared_state: self.shared_state,
            transient_state: self.transient_state,
            return_properties: self.return_properties,
            error_message: self.error_message,
            lockout_message: self.lockout_message,
        }
    }
}

/// Builder mode of [`Action::goto`].
#[derive(Debug)]
pub struct Continuing {
    outcome: String,
    session_properties: SessionPropertyChanges,
    session_hooks: Vec<HookSpec>,
    webhooks: Vec<String>,
    identified_identity: Option<IdentifiedIdentity>,
}

/// Builder mode of [`Action::send`].
#[derive(Debug)]
pub struct SendingCallbacks {
    callbacks: Vec<Callback>,
}

/// Builder mode of [`Action::suspend`].
pub struct Suspending {
    handler: Arc<dyn SuspensionHandler>,
}

impl std::fmt::Debug for Suspending {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Suspending").finish_non_exhaustive()
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Continuing {}
    impl Sealed for super::SendingCallbacks {}
    impl Sealed for super::Suspending {}
}

/// Converts a builder mode into its [`ActionMode`], checking its invariants.
pub trait BuildMode: sealed::Sealed {
    fn into_mode(self) -> Result<ActionMode, ActionError>;
}

impl BuildMode for Continuing {
    fn into_mode(self) -> Result<ActionMode, ActionError> {
        if self.outcome.trim().is_empty() {
            return Err(ActionError::MissingOutcome);
        }
        Ok(ActionMode::Continue(Continuation {
            outcome: self.outcome,
            session_properties: self.session_properties,
            session_hooks: self.session_hooks,
            webhooks: self.webhooks,
            identified_identity: self.identified_identity,
        }))
    }
}

impl BuildMode for SendingCallbacks {
    fn into_mode(self) -> Result<ActionMode, ActionError> {
        if self.callbacks.is_empty() {
            return Err(ActionError::EmptyCallbacks);
        }
        Ok(ActionMode::AskForInput(self.callbacks))
    }
}

impl BuildMode for Suspending {
    fn into_mode(self) -> Result<ActionMode, ActionError> {
        Ok(ActionMode::Suspend(self.handler))
    }
}

/// Builds an [`Action`] in mode `M`.
#[derive(Debug)]
pub struct ActionBuilder<M> {
    mode: M,
    shared_state: Option<StateDocument>,
    transient_state: Option<StateDocument>,
    return_properties: Map<String, Value>,
    error_message: Option<String>,
    lockout_message: Option<String>,
}

impl<M> ActionBuilder<M> {
    fn new(mode: M) -> Self {
        Self {
            mode,
            shared_state: None,
            transient_state: None,
            return_properties: Map::new(),
            error_message: None,
            lockout_message: None,
        }
    }

    /// Replaces the whole shared state document.
    pub fn replace_shared_state(mut self, state: StateDocument) -> Self {
        self.shared_state = Some(state);
        self
    }

    /// Replaces the whole transient state document.
    pub fn replace_transient_state(mut self, state: StateDocument) -> Self {
        self.transient_state = Some(state);
        self
    }

    pub fn with_header(self, header: impl Into<String>) -> Self {
        self.with_return_property(return_keys::HEADER, Value::String(header.into()))
    }

    pub fn with_description(self, description: impl Into<String>) -> Self {
        self.with_return_property(return_keys::DESCRIPTION, Value::String(description.into()))
    }

    pub fn with_stage(self, stage: impl Into<String>) -> Self {
        self.with_return_property(return_keys::STAGE, Value::String(stage.into()))
    }

    pub fn with_return_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.return_properties.insert(key.into(), value.into());
        self
    }

    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_lockout_message(mut self, message: impl Into<String>) -> Self {
        self.lockout_message = Some(message.into());
        self
    }
}

impl<M: BuildMode> ActionBuilder<M> {
    pub fn build(self) -> Result<Action, ActionError> {
        Ok(Action {
            mode: self.mode.into_mode()?,
            shared_state: self.shared_state,
            transient_state: self.transient_state,
            return_properties: self.return_properties,
            error_message: self.error_message,
            lockout_message: self.lockout_message,
        })
    }
}

impl ActionBuilder<Continuing> {
    /// Stages a session property for the session created on success.
    pub fn put_session_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Result<Self, ActionError> {
        self.mode.session_properties.set(key, value)?;
        Ok(self)
    }

    /// Stages removal of a session property.
    pub fn remove_session_property(mut self, key: impl Into<String>) -> Result<Self, ActionError> {
        self.mode.session_properties.remove(key)?;
        Ok(self)
    }

    /// Runs a tree hook of type `hook_type` once the tree completes.
    pub fn add_session_hook(
        self,
        hook_type: impl Into<String>,
        node_id: Option<NodeId>,
        node_type: impl Into<String>,
    ) -> Self {
        self.add_hook(HookSpec::new(hook_type, node_id, node_type))
    }

    pub fn add_hook(mut self, hook: HookSpec) -> Self {
        self.mode.session_hooks.push(hook);
        self
    }

    /// Names a webhook to call when the resulting session logs out.
    pub fn add_webhook(mut self, name: impl Into<String>) -> Self {
        self.mode.webhooks.push(name.into());
        self
    }

    pub fn add_webhooks<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mode.webhooks.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_identified_identity(mut self, username: impl Into<String>, identity_type: IdentityType) -> Self {
        self.mode.identified_identity = Some(IdentifiedIdentity::new(username, identity_type));
        self
    }
}
