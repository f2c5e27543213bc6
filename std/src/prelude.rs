pub use crate::nodes::choice::{ChoiceCollectorNode, ChoiceCollectorOutcomes};
pub use crate::nodes::debug::{LogLevel, LogNode};
pub use crate::nodes::flow::SuspendNode;
pub use crate::nodes::logic::{AttributePresentDecisionNode, StateMatchNode, StateMatchOutcomes};
pub use crate::nodes::retry::RetryLimitDecisionNode;
pub use crate::nodes::session::SetSessionPropertyNode;
