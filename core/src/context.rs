//! TreeContext - everything a node receives for one invocation.

use crate::callback::Callback;
use crate::node::{Node, NodeId};
use crate::node_state::NodeState;
use crate::request::RequestContext;
use crate::state::{StateContainers, StateDocument, StateTiers};
use std::sync::Arc;

/// Default identity resource when the driver does not configure one.
pub const DEFAULT_IDENTITY_RESOURCE: &str = "managed/user";

/// Per-invocation aggregate of the state tiers, the request and tree facts.
///
/// A context lives for exactly one `process` call. The driver recovers the
/// (possibly mutated) tiers with [`into_tiers`](Self::into_tiers) afterwards.
#[derive(Debug)]
pub struct TreeContext {
    tiers: StateTiers,
    containers: StateContainers,
    request: Arc<RequestContext>,
    identity_resource: String,
    resumed_from_suspend: bool,
    current_node: Option<NodeId>,
}

impl TreeContext {
    pub fn new(tiers: StateTiers, request: Arc<RequestContext>) -> Self {
        Self {
            tiers,
            containers: StateContainers::none(),
            request,
            identity_resource: DEFAULT_IDENTITY_RESOURCE.to_string(),
            resumed_from_suspend: false,
            current_node: None,
        }
    }

    pub fn with_containers(mut self, containers: StateContainers) -> Self {
        self.containers = containers;
        self
    }

    pub fn with_identity_resource(mut self, resource: impl Into<String>) -> Self {
        self.identity_resource = resource.into();
        self
    }

    pub fn with_resumed_from_suspend(mut self, resumed: bool) -> Self {
        self.resumed_from_suspend = resumed;
        self
    }

    pub fn with_current_node(mut self, node: NodeId) -> Self {
        self.current_node = Some(node);
        self
    }

    /// State view filtered by `node`'s declared inputs.
    pub fn state_for<N: Node + ?Sized>(&mut self, node: &N) -> NodeState<'_> {
        let inputs = node.inputs();
        NodeState::for_inputs(&mut self.tiers, &self.containers, &inputs)
    }

    /// Unrestricted state view.
    pub fn state(&mut self) -> NodeState<'_> {
        NodeState::unrestricted(&mut self.tiers, &self.containers)
    }

    pub fn shared_state(&self) -> &StateDocument {
        &self.tiers.shared
    }

    pub fn transient_state(&self) -> &StateDocument {
        &self.tiers.transient
    }

    pub fn secure_state(&self) -> &StateDocument {
        &self.tiers.secure
    }

    pub fn containers(&self) -> &StateContainers {
        &self.containers
    }

    pub fn request(&self) -> &RequestContext {
        &self.request
    }

    /// Identity resource the tree targets, e.g. `managed/user`.
    pub fn identity_resource(&self) -> &str {
        &self.identity_resource
    }

    /// True when the tree re-entered this node after a suspension.
    pub fn has_resumed_from_suspend(&self) -> bool {
        self.resumed_from_suspend
    }

    /// Id of the node being processed, when the driver supplies it.
    pub fn current_node(&self) -> Option<NodeId> {
        self.current_node
    }

    pub fn callbacks(&self) -> &[Callback] {
        self.request.callbacks()
    }

    pub fn has_callbacks(&self) -> bool {
        !self.request.callbacks().is_empty()
    }

    /// First submitted callback of the given kind.
    pub fn callback(&self, kind: &str) -> Option<&Callback> {
        self.callbacks().iter().find(|callback| callback.is(kind))
    }

    pub fn callbacks_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Callback> + 'a {
        self.callbacks().iter().filter(move |callback| callback.is(kind))
    }

    pub fn tiers(&self) -> &StateTiers {
        &self.tiers
    }

    pub fn into_tiers(self) -> StateTiers {
        self.tiers
    }
}
