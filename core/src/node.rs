use crate::action::{Action, ActionBuilder, Continuing};
use crate::context::TreeContext;
use crate::contract::{InputState, OutputState};
use crate::error::NodeError;
use crate::hook::LifecycleNode;
use crate::outcome::{FALSE_OUTCOME_ID, SINGLE_OUTCOME_ID, TRUE_OUTCOME_ID};
use uuid::Uuid;

pub type NodeId = Uuid;

/// The unit of work of an authentication tree.
///
/// Node instances are shared by every tree execution in flight, so an
/// implementation holds configuration only. Everything that belongs to one
/// execution travels through the [`TreeContext`] and the returned [`Action`].
pub trait Node: Send + Sync + 'static {
    /// Resolve this step to a single [`Action`].
    ///
    /// Fails when the step cannot be resolved, e.g. malformed state or an
    /// unreachable dependency.
    fn process(&self, context: &mut TreeContext) -> Result<Action, NodeError>;

    /// State keys this node reads. Used for ahead-of-time graph validation
    /// and to filter the node's state view.
    fn inputs(&self) -> Vec<InputState> {
        Vec::new()
    }

    /// State keys this node writes, per outcome.
    fn outputs(&self) -> Vec<OutputState> {
        Vec::new()
    }

    /// Extra detail recorded in the audit trail for the completed step.
    fn audit_entry_detail(&self) -> serde_json::Value {
        serde_json::Value::Null
    }

    /// Returns `Some` for nodes that want tree completion notifications.
    fn as_lifecycle(&self) -> Option<&dyn LifecycleNode> {
        None
    }
}

/// A node with exactly one outgoing edge, [`SINGLE_OUTCOME_ID`].
pub trait SingleOutcomeNode: Node {
    fn goto_next(&self) -> ActionBuilder<Continuing> {
        Action::goto(SINGLE_OUTCOME_ID)
    }
}

/// A node with a boolean decision: [`TRUE_OUTCOME_ID`] or [`FALSE_OUTCOME_ID`].
pub trait DecisionNode: Node {
    fn goto(&self, outcome: bool) -> ActionBuilder<Continuing> {
        Action::goto(if outcome {
            TRUE_OUTCOME_ID
        } else {
            FALSE_OUTCOME_ID
        })
    }
}

impl<N: Node + ?Sized> Node for Box<N> {
    fn process(&self, context: &mut TreeContext) -> Result<Action, NodeError> {
        (**self).process(context)
    }

    fn inputs(&self) -> Vec<InputState> {
        (**self).inputs()
    }

    fn outputs(&self) -> Vec<OutputState> {
        (**self).outputs()
    }

    fn audit_entry_detail(&self) -> serde_json::Value {
        (**self).audit_entry_detail()
    }

    fn as_lifecycle(&self) -> Option<&dyn LifecycleNode> {
        (**self).as_lifecycle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestContext;
    use crate::state::StateTiers;
    use std::sync::Arc;

    struct Pass;

    impl Node for Pass {
        fn process(&self, _context: &mut TreeContext) -> Result<Action, NodeError> {
            Ok(self.goto_next().build()?)
        }
    }

    impl SingleOutcomeNode for Pass {}

    struct HasUsername;

    impl Node for HasUsername {
        fn process(&self, context: &mut TreeContext) -> Result<Action, NodeError> {
            let present = context.state_for(self).is_defined("username");
            Ok(self.goto(present).build()?)
        }

        fn inputs(&self) -> Vec<InputState> {
            vec![InputState::required("username")]
        }
    }

    impl DecisionNode for HasUsername {}

    fn context() -> TreeContext {
        TreeContext::new(StateTiers::default(), Arc::new(RequestContext::default()))
    }

    #[test]
    fn single_outcome_node_uses_fixed_id() {
        let action = Pass.process(&mut context()).unwrap();
        assert_eq!(action.outcome(), Some(SINGLE_OUTCOME_ID));
    }

    #[test]
    fn decision_node_maps_booleans_to_fixed_ids() {
        let mut ctx = context();
        assert_eq!(HasUsername.process(&mut ctx).unwrap().outcome(), Some(FALSE_OUTCOME_ID));

        ctx.state().put_shared("username", "alice");
        assert_eq!(HasUsername.process(&mut ctx).unwrap().outcome(), Some(TRUE_OUTCOME_ID));
    }

    #[test]
    fn defaults_declare_nothing() {
        assert!(Pass.inputs().is_empty());
        assert!(Pass.outputs().is_empty());
        assert!(Pass.audit_entry_detail().is_null());
        assert!(Pass.as_lifecycle().is_none());
    }
}
