use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use trellis_core::prelude::*;

/// `true` when a state key is defined in any tier.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AttributePresentDecisionNode {
    pub attribute: String,
}

impl AttributePresentDecisionNode {
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
        }
    }
}

impl Node for AttributePresentDecisionNode {
    fn process(&self, context: &mut TreeContext) -> Result<Action, NodeError> {
        let present = context.state_for(self).is_defined(&self.attribute);
        Ok(self.goto(present).build()?)
    }

    fn inputs(&self) -> Vec<InputState> {
        vec![InputState::optional(self.attribute.clone())]
    }
}

impl DecisionNode for AttributePresentDecisionNode {}

pub const MATCH_OUTCOME_ID: &str = "match";
pub const MISMATCH_OUTCOME_ID: &str = "mismatch";
pub const MISSING_OUTCOME_ID: &str = "missing";

/// Compares a state value with an expected one.
///
/// The `missing` edge exists only when `distinguish_missing` is set;
/// otherwise an absent key follows `mismatch`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StateMatchNode {
    pub key: String,
    pub expected: Value,
    #[serde(default)]
    pub distinguish_missing: bool,
}

impl StateMatchNode {
    pub fn new(key: impl Into<String>, expected: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            expected: expected.into(),
            distinguish_missing: false,
        }
    }

    pub fn distinguishing_missing(mut self) -> Self {
        self.distinguish_missing = true;
        self
    }

    /// Configuration as consumed by [`StateMatchOutcomes`].
    pub fn config(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn outcome_provider() -> OutcomeProviders {
        OutcomeProviders::bounded(StateMatchOutcomes)
    }
}

impl Node for StateMatchNode {
    fn process(&self, context: &mut TreeContext) -> Result<Action, NodeError> {
        let outcome = match context.state_for(self).get(&self.key) {
            Some(value) if *value == self.expected => MATCH_OUTCOME_ID,
            Some(_) => MISMATCH_OUTCOME_ID,
            None if self.distinguish_missing => MISSING_OUTCOME_ID,
            None => MISMATCH_OUTCOME_ID,
        };
        Ok(Action::goto(outcome).build()?)
    }

    fn inputs(&self) -> Vec<InputState> {
        vec![InputState::optional(self.key.clone())]
    }

    fn audit_entry_detail(&self) -> Value {
        serde_json::json!({ "key": self.key })
    }
}

/// Edges of [`StateMatchNode`], bounded by match, mismatch and missing.
#[derive(Debug, Clone, Copy, Default)]
pub struct StateMatchOutcomes;

impl OutcomeProvider for StateMatchOutcomes {
    fn outcomes(&self, locales: &PreferredLocales, config: &Value) -> Result<Vec<Outcome>, OutcomeError> {
        let distinguish_missing = match config.get("distinguish_missing") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(flag)) => *flag,
            Some(other) => {
                return Err(OutcomeError::undetermined(format!(
                    "distinguish_missing must be a boolean, got {other}"
                )));
            }
        };
        let mut outcomes = self.all_outcomes(locales)?;
        if !distinguish_missing {
            outcomes.retain(|outcome| outcome.id != MISSING_OUTCOME_ID);
        }
        Ok(outcomes)
    }
}

impl BoundedOutcomeProvider for StateMatchOutcomes {
    fn all_outcomes(&self, _locales: &PreferredLocales) -> Result<Vec<Outcome>, OutcomeError> {
        Ok(vec![
            Outcome::new(MATCH_OUTCOME_ID, "Match"),
            Outcome::new(MISMATCH_OUTCOME_ID, "Mismatch"),
            Outcome::new(MISSING_OUTCOME_ID, "Missing"),
        ])
    }
}
