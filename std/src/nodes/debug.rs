use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use trellis_core::prelude::*;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
}

/// Logs the state keys visible to it and moves on.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LogNode {
    pub message: String,
    #[serde(default)]
    pub level: LogLevel,
}

impl LogNode {
    pub fn new(message: impl Into<String>, level: LogLevel) -> Self {
        Self {
            message: message.into(),
            level,
        }
    }
}

impl Node for LogNode {
    fn process(&self, context: &mut TreeContext) -> Result<Action, NodeError> {
        let keys = context.state().keys();
        match self.level {
            LogLevel::Error => tracing::error!(?keys, "{}", self.message),
            LogLevel::Warn => tracing::warn!(?keys, "{}", self.message),
            LogLevel::Debug => tracing::debug!(?keys, "{}", self.message),
            LogLevel::Info => tracing::info!(?keys, "{}", self.message),
        }
        Ok(self.goto_next().build()?)
    }

    fn inputs(&self) -> Vec<InputState> {
        vec![InputState::wildcard()]
    }
}

impl SingleOutcomeNode for LogNode {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use trellis_core::state::StateTiers;

    #[test]
    fn log_node_continues_on_single_outcome() {
        let mut context = TreeContext::new(StateTiers::default(), Arc::new(RequestContext::default()));
        context.state().put_shared("realm", "alpha");

        let action = LogNode::new("reached", LogLevel::Warn).process(&mut context).unwrap();
        assert_eq!(action.outcome(), Some("outcome"));
    }

    #[test]
    fn level_defaults_to_info() {
        let node: LogNode = serde_json::from_value(json!({ "message": "hello" })).unwrap();
        assert_eq!(node.level, LogLevel::Info);
    }
}
