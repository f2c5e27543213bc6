//! # Trellis Core
//!
//! The node execution contract of an authentication tree engine: the layered
//! state model, the [`Action`] protocol, outcome descriptions, suspension and
//! tree hooks. Protocol-agnostic; the driver that walks a tree lives in
//! `trellis-runtime`.

pub mod action;
pub mod callback;
pub mod config;
pub mod context;
pub mod contract;
pub mod error;
pub mod hook;
pub mod identity;
pub mod node;
pub mod node_state;
pub mod outcome;
pub mod request;
pub mod state;
pub mod suspension;
pub mod telemetry;

pub use action::{Action, ActionBuilder, ActionMode, ActionParts, Continuation, SessionPropertyChanges};
pub use callback::Callback;
pub use config::EngineConfig;
pub use context::TreeContext;
pub use contract::{InputState, OutputState};
pub use error::{ActionError, HookError, NodeError, OutcomeError, StateError, SuspensionError};
pub use hook::{HookSpec, LifecycleNode, Session, TreeHook};
pub use identity::{IdentifiedIdentity, IdentityType};
pub use node::{DecisionNode, Node, NodeId, SingleOutcomeNode};
pub use node_state::NodeState;
pub use outcome::{BoundedOutcomeProvider, Outcome, OutcomeProvider, OutcomeProviders, StaticOutcomeProvider};
pub use request::{PreferredLocales, RequestContext};
pub use state::{StateContainers, StateDocument, StateTier, StateTiers};
pub use suspension::SuspensionHandler;
pub use telemetry::Traced;

pub mod prelude {
    pub use crate::action::{Action, ActionMode};
    pub use crate::callback::Callback;
    pub use crate::context::TreeContext;
    pub use crate::contract::{InputState, OutputState};
    pub use crate::error::{HookError, NodeError, OutcomeError, SuspensionError};
    pub use crate::hook::{HookSpec, LifecycleNode, Session, TreeHook};
    pub use crate::identity::IdentityType;
    pub use crate::node::{DecisionNode, Node, NodeId, SingleOutcomeNode};
    pub use crate::outcome::{
        BooleanOutcomeProvider, BoundedOutcomeProvider, Outcome, OutcomeProvider, OutcomeProviders,
        SingleOutcomeProvider, StaticOutcomeProvider,
    };
    pub use crate::request::{PreferredLocales, RequestContext};
    pub use crate::state::{StateDocument, StateTiers};
    pub use crate::suspension::SuspensionHandler;
}
