//! # TreeExecutor: walking a tree across round trips
//!
//! The executor runs nodes one after another until one of them asks the
//! client for input, suspends, or the walk reaches a terminal target. State
//! between round trips lives in the [`Journey`], never in the executor, so a
//! single executor serves any number of concurrent journeys.

use crate::audit::{AuditEvent, AuditTrail};
use crate::error::TreeError;
use crate::hooks::TreeHookRegistry;
use crate::journey::Journey;
use crate::tree::{Target, Tree};
use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use trellis_core::action::{Action, ActionMode, return_keys};
use trellis_core::callback::Callback;
use trellis_core::config::{EngineConfig, SessionPropertyBlacklist};
use trellis_core::context::TreeContext;
use trellis_core::error::{ActionError, HookError, NodeError};
use trellis_core::hook::{Session, TreeHook};
use trellis_core::node::NodeId;
use trellis_core::request::RequestContext;
use trellis_core::state::{StateContainers, StateDocument};
use uuid::Uuid;

/// Query parameter carrying the suspension id on the resume URI.
pub const SUSPENDED_ID_PARAMETER: &str = "suspendedId";

/// The client must answer callbacks before the journey can continue.
#[derive(Debug)]
pub struct Interaction {
    pub journey: Journey,
    pub node: NodeId,
    pub callbacks: Vec<Callback>,
    pub return_properties: Map<String, Value>,
    pub trail: AuditTrail,
}

impl Interaction {
    pub fn header(&self) -> Option<&str> {
        self.return_property(return_keys::HEADER)
    }

    pub fn description(&self) -> Option<&str> {
        self.return_property(return_keys::DESCRIPTION)
    }

    pub fn stage(&self) -> Option<&str> {
        self.return_property(return_keys::STAGE)
    }

    fn return_property(&self, key: &str) -> Option<&str> {
        self.return_properties.get(key).and_then(Value::as_str)
    }
}

/// The journey waits for an out-of-band resume.
#[derive(Debug)]
pub struct Suspended {
    pub journey: Journey,
    pub suspended_id: Uuid,
    pub resume_uri: http::Uri,
    /// What the handler wants shown to the user meanwhile.
    pub callback: Callback,
    pub trail: AuditTrail,
}

/// The tree reached its success terminus.
#[derive(Debug)]
pub struct Completion {
    pub session: Session,
    pub hook_errors: Vec<HookError>,
    pub lifecycle_errors: Vec<NodeError>,
    pub trail: AuditTrail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The walk reached the failure terminus.
    FailureNode,
    /// A suspension handler could not deliver the resume URI.
    Suspension,
    /// A node returned an error.
    Error,
}

#[derive(Debug)]
pub struct Failure {
    pub kind: FailureKind,
    pub error_message: Option<String>,
    pub lockout_message: Option<String>,
    pub hook_errors: Vec<HookError>,
    pub lifecycle_errors: Vec<NodeError>,
    pub trail: AuditTrail,
}

#[derive(Debug)]
pub enum StepResult {
    Callbacks(Interaction),
    Suspended(Suspended),
    Completed(Completion),
    Failed(Failure),
}

impl StepResult {
    pub fn trail(&self) -> &AuditTrail {
        match self {
            StepResult::Callbacks(interaction) => &interaction.trail,
            StepResult::Suspended(suspended) => &suspended.trail,
            StepResult::Completed(completion) => &completion.trail,
            StepResult::Failed(failure) => &failure.trail,
        }
    }

    /// The journey to persist, when the tree has not finished.
    pub fn journey(&self) -> Option<&Journey> {
        match self {
            StepResult::Callbacks(interaction) => Some(&interaction.journey),
            StepResult::Suspended(suspended) => Some(&suspended.journey),
            StepResult::Completed(_) | StepResult::Failed(_) => None,
        }
    }
}

pub struct TreeExecutor {
    tree: Arc<Tree>,
    config: Arc<EngineConfig>,
    hooks: TreeHookRegistry,
    containers: StateContainers,
    blacklist: SessionPropertyBlacklist,
}

impl TreeExecutor {
    /// Extra reserved session properties in `config` are also installed
    /// process-wide, unless a blacklist is already in effect.
    pub fn new(tree: Arc<Tree>, config: EngineConfig) -> Self {
        if !config.session_property_blacklist.is_empty() {
            config.install();
        }
        let containers = config.state_containers();
        let blacklist = config.blacklist();
        Self {
            tree,
            config: Arc::new(config),
            hooks: TreeHookRegistry::new(),
            containers,
            blacklist,
        }
    }

    pub fn with_hooks(mut self, hooks: TreeHookRegistry) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Starts a new journey at the entry node.
    pub async fn start(&self, request: RequestContext) -> Result<StepResult, TreeError> {
        self.start_with(StateDocument::new(), request).await
    }

    /// Starts a new journey with pre-seeded shared state.
    pub async fn start_with(&self, shared: StateDocument, request: RequestContext) -> Result<StepResult, TreeError> {
        let journey = Journey::new(self.tree.name(), self.tree.entry(), shared);
        tracing::debug!(journey = %journey.id, tree = %self.tree.name(), "Starting journey");
        self.run(journey, request, false).await
    }

    /// Continues a journey that was waiting for callbacks.
    pub async fn resume(&self, journey: Journey, request: RequestContext) -> Result<StepResult, TreeError> {
        if journey.is_suspended() {
            return Err(TreeError::Suspended(journey.id));
        }
        self.run(journey, request, false).await
    }

    /// Continues a suspended journey. The request must carry the suspension
    /// id handed out on the resume URI.
    pub async fn resume_from_suspend(
        &self,
        mut journey: Journey,
        request: RequestContext,
    ) -> Result<StepResult, TreeError> {
        let Some(expected) = journey.suspended_id else {
            return Err(TreeError::NotSuspended(journey.id));
        };
        let found = request.parameter(SUSPENDED_ID_PARAMETER).unwrap_or_default();
        if found != expected.to_string() {
            return Err(TreeError::SuspensionMismatch {
                journey: journey.id,
                found: found.to_string(),
            });
        }
        journey.suspended_id = None;
        self.run(journey, request, true).await
    }

    /// Rejects actions staging a property this executor's config reserves.
    fn check_session_properties(&self, action: Action) -> Result<Action, NodeError> {
        let reserved = action
            .session_properties()
            .and_then(|staged| staged.iter().map(|(key, _)| key).find(|key| self.blacklist.contains(key)));
        if let Some(key) = reserved {
            return Err(ActionError::BlacklistedSessionProperty { key: key.to_string() }.into());
        }
        Ok(action)
    }

    async fn run(&self, journey: Journey, request: RequestContext, resumed: bool) -> Result<StepResult, TreeError> {
        let span = tracing::info_span!("Tree", trellis.tree = %self.tree.name(), trellis.journey = %journey.id);
        self.walk(journey, request, resumed).instrument(span).await
    }

    async fn walk(&self, mut journey: Journey, request: RequestContext, mut resumed: bool) -> Result<StepResult, TreeError> {
        let mut request = Arc::new(request);
        let mut trail = AuditTrail::new();

        loop {
            let node_id = journey.current;
            let tree_node = self.tree.node(node_id).ok_or(TreeError::UnknownNode(node_id))?;
            journey.visited.push(node_id);
            trail.push(AuditEvent::NodeEnter {
                node_id,
                node_type: tree_node.node_type.clone(),
                at: Utc::now(),
            });

            let started = Instant::now();
            let mut context = self
                .context(&mut journey, request.clone(), node_id)
                .with_resumed_from_suspend(resumed);
            let result = tree_node
                .node
                .process(&mut context)
                .and_then(|action| self.check_session_properties(action));
            journey.tiers = context.into_tiers();
            let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

            let action = match result {
                Ok(action) => action,
                Err(error) => {
                    tracing::error!(node = %node_id, node_type = %tree_node.node_type, error = %error, "Node failed; aborting tree");
                    trail.push(AuditEvent::NodeExit {
                        node_id,
                        result: "Error".to_string(),
                        outcome: None,
                        detail: Value::Null,
                        duration_ms,
                        at: Utc::now(),
                    });
                    let error_message = Some(error.message().to_string());
                    let lockout_message = error.lockout_message().map(str::to_string);
                    let failure = self
                        .fail(journey, &request, FailureKind::Error, error_message, lockout_message, trail)
                        .await;
                    return Ok(StepResult::Failed(failure));
                }
            };

            let parts = action.into_parts();
            trail.push(AuditEvent::NodeExit {
                node_id,
                result: parts.mode.name().to_string(),
                outcome: match &parts.mode {
                    ActionMode::Continue(continuation) => Some(continuation.outcome.clone()),
                    _ => None,
                },
                detail: tree_node.node.audit_entry_detail(),
                duration_ms,
                at: Utc::now(),
            });

            if let Some(shared) = parts.shared_state {
                journey.tiers.shared = shared;
            }
            if let Some(transient) = parts.transient_state {
                journey.tiers.transient = transient;
            }
            if parts.error_message.is_some() {
                journey.error_message = parts.error_message;
            }
            if parts.lockout_message.is_some() {
                journey.lockout_message = parts.lockout_message;
            }

            match parts.mode {
                ActionMode::Continue(continuation) => {
                    let target = *tree_node.connections.get(&continuation.outcome).ok_or_else(|| {
                        TreeError::UnknownOutcome {
                            node: node_id,
                            outcome: continuation.outcome.clone(),
                        }
                    })?;
                    tracing::debug!(node = %node_id, outcome = %continuation.outcome, ?target, "Following outcome");

                    journey.session_properties.extend(continuation.session_properties);
                    journey.hooks.extend(continuation.session_hooks);
                    journey.webhooks.extend(continuation.webhooks);
                    if continuation.identified_identity.is_some() {
                        journey.identity = continuation.identified_identity;
                    }

                    match target {
                        Target::Node(next) => {
                            journey.current = next;
                            resumed = false;
                            if !request.callbacks().is_empty() {
                                request = Arc::new(request.without_callbacks());
                            }
                        }
                        Target::Success => {
                            return Ok(StepResult::Completed(self.succeed(journey, &request, trail).await));
                        }
                        Target::Failure => {
                            let error_message = journey.error_message.clone();
                            let lockout_message = journey.lockout_message.clone();
                            let failure = self
                                .fail(journey, &request, FailureKind::FailureNode, error_message, lockout_message, trail)
                                .await;
                            return Ok(StepResult::Failed(failure));
                        }
                    }
                }
                ActionMode::AskForInput(callbacks) => {
                    tracing::debug!(node = %node_id, callbacks = callbacks.len(), "Waiting for client input");
                    self.park(&mut journey);
                    return Ok(StepResult::Callbacks(Interaction {
                        journey,
                        node: node_id,
                        callbacks,
                        return_properties: parts.return_properties,
                        trail,
                    }));
                }
                ActionMode::Suspend(handler) => {
                    let suspended_id = Uuid::new_v4();
                    let resume_uri = self.resume_uri(suspended_id)?;
                    match handler.handle(&resume_uri).await {
                        Ok(callback) => {
                            tracing::info!(node = %node_id, %suspended_id, "Journey suspended");
                            self.park(&mut journey);
                            journey.suspended_id = Some(suspended_id);
                            trail.push(AuditEvent::Suspended {
                                node_id,
                                suspended_id,
                                at: Utc::now(),
                            });
                            return Ok(StepResult::Suspended(Suspended {
                                journey,
                                suspended_id,
                                resume_uri,
                                callback,
                                trail,
                            }));
                        }
                        Err(error) => {
                            tracing::error!(node = %node_id, error = %error, "Suspension handler failed; failing tree");
                            let failure = self
                                .fail(
                                    journey,
                                    &request,
                                    FailureKind::Suspension,
                                    Some(error.message().to_string()),
                                    None,
                                    trail,
                                )
                                .await;
                            return Ok(StepResult::Failed(failure));
                        }
                    }
                }
            }
        }
    }

    fn context(&self, journey: &mut Journey, request: Arc<RequestContext>, node: NodeId) -> TreeContext {
        TreeContext::new(std::mem::take(&mut journey.tiers), request)
            .with_containers(self.containers.clone())
            .with_identity_resource(self.config.identity_resource.clone())
            .with_current_node(node)
    }

    /// Prepares the journey to leave memory: transient entries nobody
    /// downstream reads are dropped, the rest move to secure state.
    fn park(&self, journey: &mut Journey) {
        if let Some(needed) = self.tree.downstream_inputs(journey.current) {
            journey.tiers.retain_transient(|key| needed.contains(key));
        }
        journey.tiers.promote_transient_to_secure();
    }

    fn resume_uri(&self, suspended_id: Uuid) -> Result<http::Uri, TreeError> {
        let base = &self.config.resume_uri;
        let separator = if base.contains('?') { '&' } else { '?' };
        Ok(format!("{base}{separator}{SUSPENDED_ID_PARAMETER}={suspended_id}").parse()?)
    }

    async fn succeed(&self, mut journey: Journey, request: &Arc<RequestContext>, mut trail: AuditTrail) -> Completion {
        let lifecycle_errors = self.notify_lifecycle(&mut journey, request, true);

        let mut session = Session::new();
        journey.session_properties.apply_to(&mut session.properties);
        session.identity = journey.identity.take();
        session.webhooks = std::mem::take(&mut journey.webhooks);

        let mut hook_errors = Vec::new();
        for spec in &journey.hooks {
            let result = match self.hooks.instantiate(spec) {
                Ok(hook) => hook.accept(&mut session).await,
                Err(error) => Err(error),
            };
            if let Err(error) = result {
                tracing::error!(hook_type = %spec.hook_type, error = %error, "Tree hook failed after success");
                hook_errors.push(error);
            }
        }

        tracing::info!(session = %session.id, "Tree completed successfully");
        trail.push(AuditEvent::Completed {
            status: "success".to_string(),
            at: Utc::now(),
        });
        Completion {
            session,
            hook_errors,
            lifecycle_errors,
            trail,
        }
    }

    async fn fail(
        &self,
        mut journey: Journey,
        request: &Arc<RequestContext>,
        kind: FailureKind,
        error_message: Option<String>,
        lockout_message: Option<String>,
        mut trail: AuditTrail,
    ) -> Failure {
        let lifecycle_errors = self.notify_lifecycle(&mut journey, request, false);

        let mut hook_errors = Vec::new();
        for spec in &journey.hooks {
            let result = match self.hooks.instantiate(spec) {
                Ok(hook) => notify_failure(hook.as_ref(), kind).await,
                Err(error) => Err(error),
            };
            if let Err(error) = result {
                tracing::error!(hook_type = %spec.hook_type, error = %error, "Tree hook failed after failure");
                hook_errors.push(error);
            }
        }

        tracing::info!(?kind, "Tree failed");
        trail.push(AuditEvent::Completed {
            status: match kind {
                FailureKind::FailureNode => "failure",
                FailureKind::Suspension => "suspension_failure",
                FailureKind::Error => "error",
            }
            .to_string(),
            at: Utc::now(),
        });
        Failure {
            kind,
            error_message,
            lockout_message,
            hook_errors,
            lifecycle_errors,
            trail,
        }
    }

    fn notify_lifecycle(&self, journey: &mut Journey, request: &Arc<RequestContext>, success: bool) -> Vec<NodeError> {
        let mut errors = Vec::new();
        for id in journey.distinct_visited() {
            let Some(lifecycle) = self.tree.node(id).and_then(|tree_node| tree_node.node.as_lifecycle()) else {
                continue;
            };
            let mut context = self.context(journey, request.clone(), id);
            let result = lifecycle.on_tree_complete(&mut context, success);
            journey.tiers = context.into_tiers();
            if let Err(error) = result {
                tracing::warn!(node = %id, error = %error, "Tree completion notification failed");
                errors.push(error);
            }
        }
        errors
    }
}

async fn notify_failure(hook: &dyn TreeHook, kind: FailureKind) -> Result<(), HookError> {
    match kind {
        FailureKind::Error => hook.accept_exception().await,
        FailureKind::FailureNode | FailureKind::Suspension => hook.accept_failure().await,
    }
}

impl std::fmt::Debug for TreeExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeExecutor")
            .field("tree", &self.tree.name())
            .field("hooks", &self.hooks)
            .finish()
    }
}
