//! # Telemetry: Observability Decorators
//!
//! Decorators adding tracing to any [`Node`] without touching its code.

use crate::action::{Action, ActionMode};
use crate::context::TreeContext;
use crate::contract::{InputState, OutputState};
use crate::error::NodeError;
use crate::hook::LifecycleNode;
use crate::node::Node;

/// A wrapper node that records a span, the step duration and the result
/// of the inner node.
#[derive(Debug, Clone)]
pub struct Traced<N> {
    inner: N,
    name: String,
}

impl<N> Traced<N> {
    pub fn new(inner: N, name: &str) -> Self {
        Self {
            inner,
            name: name.to_string(),
        }
    }

    pub fn inner(&self) -> &N {
        &self.inner
    }
}

impl<N: Node> Node for Traced<N> {
    fn process(&self, context: &mut TreeContext) -> Result<Action, NodeError> {
        let span = tracing::info_span!(
            "Node",
            trellis.node = %self.name,
            trellis.resumed = context.has_resumed_from_suspend()
        );
        let _entered = span.enter();

        tracing::debug!(callbacks = context.callbacks().len(), "Entering node");
        let start = std::time::Instant::now();
        let result = self.inner.process(context);
        let duration = start.elapsed();

        match &result {
            Ok(action) => match action.mode() {
                ActionMode::Continue(continuation) => {
                    tracing::info!(outcome = %continuation.outcome, ?duration, "Node completed: Continue");
                }
                ActionMode::AskForInput(callbacks) => {
                    tracing::info!(callbacks = callbacks.len(), ?duration, "Node completed: AskForInput");
                }
                ActionMode::Suspend(_) => {
                    tracing::info!(?duration, "Node completed: Suspend");
                }
            },
            Err(e) => {
                tracing::error!(error = %e, lockout = ?e.lockout_message(), ?duration, "Node failed");
            }
        }
        result
    }

    fn inputs(&self) -> Vec<InputState> {
        self.inner.inputs()
    }

    fn outputs(&self) -> Vec<OutputState> {
        self.inner.outputs()
    }

    fn audit_entry_detail(&self) -> serde_json::Value {
        self.inner.audit_entry_detail()
    }

    fn as_lifecycle(&self) -> Option<&dyn LifecycleNode> {
        self.inner.as_lifecycle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestContext;
    use crate::state::StateTiers;
    use std::sync::Arc;

    struct Fails;

    impl Node for Fails {
        fn process(&self, _context: &mut TreeContext) -> Result<Action, NodeError> {
            Err(NodeError::new("directory unavailable"))
        }

        fn inputs(&self) -> Vec<InputState> {
            vec![InputState::required("username")]
        }
    }

    #[test]
    fn traced_node_is_transparent() {
        let traced = Traced::new(Fails, "Fails");
        let mut context = TreeContext::new(StateTiers::default(), Arc::new(RequestContext::default()));

        let err = traced.process(&mut context).unwrap_err();
        assert_eq!(err.message(), "directory unavailable");
        assert_eq!(traced.inputs(), vec![InputState::required("username")]);
    }
}
