use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use trellis_core::prelude::*;

/// Stages fixed session properties for the session created on success.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SetSessionPropertyNode {
    pub properties: BTreeMap<String, String>,
}

impl SetSessionPropertyNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

impl Node for SetSessionPropertyNode {
    fn process(&self, _context: &mut TreeContext) -> Result<Action, NodeError> {
        let mut action = self.goto_next();
        for (key, value) in &self.properties {
            action = action.put_session_property(key.clone(), value.clone())?;
        }
        Ok(action.build()?)
    }
}

impl SingleOutcomeNode for SetSessionPropertyNode {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use trellis_core::state::StateTiers;

    fn context() -> TreeContext {
        TreeContext::new(StateTiers::default(), Arc::new(RequestContext::default()))
    }

    #[test]
    fn stages_configured_properties() {
        let node = SetSessionPropertyNode::new().property("department", "finance");
        let action = node.process(&mut context()).unwrap();

        let staged = action.session_properties().unwrap();
        assert_eq!(staged.get("department"), Some(Some("finance")));
    }

    #[test]
    fn reserved_property_fails_the_node() {
        let node = SetSessionPropertyNode::new().property("AuthLevel", "10");
        let err = node.process(&mut context()).unwrap_err();
        assert!(err.message().contains("AuthLevel"));
    }
}
