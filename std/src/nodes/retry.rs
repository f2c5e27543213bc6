use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use trellis_core::prelude::*;

fn default_counter_key() -> String {
    "retryCount".to_string()
}

/// Allows `limit` passes (`true`), then answers `false`.
///
/// The attempt counter lives in shared state and is cleared when the tree
/// completes, whatever the result.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RetryLimitDecisionNode {
    pub limit: u32,
    #[serde(default = "default_counter_key")]
    pub counter_key: String,
}

impl RetryLimitDecisionNode {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            counter_key: default_counter_key(),
        }
    }
}

impl Node for RetryLimitDecisionNode {
    fn process(&self, context: &mut TreeContext) -> Result<Action, NodeError> {
        let mut state = context.state_for(self);
        let attempts = state.get(&self.counter_key).and_then(|v| v.as_u64()).unwrap_or(0) + 1;
        state.put_shared(self.counter_key.clone(), attempts);

        let allowed = attempts <= u64::from(self.limit);
        if !allowed {
            tracing::info!(attempts, limit = self.limit, "Retry limit reached");
        }
        Ok(self.goto(allowed).build()?)
    }

    fn inputs(&self) -> Vec<InputState> {
        vec![InputState::optional(self.counter_key.clone())]
    }

    fn outputs(&self) -> Vec<OutputState> {
        vec![OutputState::always(self.counter_key.clone())]
    }

    fn as_lifecycle(&self) -> Option<&dyn LifecycleNode> {
        Some(self)
    }
}

impl DecisionNode for RetryLimitDecisionNode {}

impl LifecycleNode for RetryLimitDecisionNode {
    fn on_tree_complete(&self, context: &mut TreeContext, _success: bool) -> Result<(), NodeError> {
        context.state_for(self).remove(&self.counter_key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use trellis_core::state::StateTiers;

    #[test]
    fn counts_attempts_then_refuses() {
        let node = RetryLimitDecisionNode::new(2);
        let mut context = TreeContext::new(StateTiers::default(), Arc::new(RequestContext::default()));

        let outcomes: Vec<_> = (0..3)
            .map(|_| node.process(&mut context).unwrap().outcome().map(str::to_string))
            .collect();
        assert_eq!(
            outcomes,
            vec![Some("true".to_string()), Some("true".to_string()), Some("false".to_string())]
        );
        assert_eq!(context.shared_state().get("retryCount"), Some(&json!(3)));

        node.as_lifecycle().unwrap().on_tree_complete(&mut context, false).unwrap();
        assert!(context.shared_state().get("retryCount").is_none());
    }
}
