use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use trellis_core::prelude::*;
use trellis_core::suspension::DisplayResumeUri;

/// Suspends the tree until the resume URI is followed, then continues.
///
/// Without an explicit handler the resume URI is shown to the user.
#[derive(Clone, Serialize, Deserialize, JsonSchema)]
pub struct SuspendNode {
    pub message: String,
    #[serde(skip)]
    handler: Option<Arc<dyn SuspensionHandler>>,
}

impl SuspendNode {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            handler: None,
        }
    }

    pub fn with_handler<H: SuspensionHandler + 'static>(mut self, handler: H) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }
}

impl Node for SuspendNode {
    fn process(&self, context: &mut TreeContext) -> Result<Action, NodeError> {
        if context.has_resumed_from_suspend() {
            tracing::debug!("Resumed from suspension");
            return Ok(self.goto_next().build()?);
        }
        let handler: Arc<dyn SuspensionHandler> = match &self.handler {
            Some(handler) => handler.clone(),
            None => Arc::new(DisplayResumeUri::new(self.message.clone())),
        };
        Ok(Action::suspend_with(handler).build()?)
    }
}

impl SingleOutcomeNode for SuspendNode {}

impl std::fmt::Debug for SuspendNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuspendNode")
            .field("message", &self.message)
            .field("custom_handler", &self.handler.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::state::StateTiers;

    #[test]
    fn suspends_until_resumed() {
        let node = SuspendNode::new("Check your inbox");
        let request = Arc::new(RequestContext::default());

        let mut fresh = TreeContext::new(StateTiers::default(), request.clone());
        assert!(node.process(&mut fresh).unwrap().is_suspended());

        let mut resumed = TreeContext::new(StateTiers::default(), request).with_resumed_from_suspend(true);
        assert_eq!(node.process(&mut resumed).unwrap().outcome(), Some("outcome"));
    }
}
