use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use trellis_core::prelude::*;

/// Lets the user pick one of the configured choices; each choice is an edge.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ChoiceCollectorNode {
    pub prompt: String,
    pub choices: Vec<String>,
    #[serde(default)]
    pub default_choice: Option<usize>,
}

impl ChoiceCollectorNode {
    pub fn new<I, S>(prompt: impl Into<String>, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prompt: prompt.into(),
            choices: choices.into_iter().map(Into::into).collect(),
            default_choice: None,
        }
    }

    pub fn with_default(mut self, index: usize) -> Self {
        self.default_choice = Some(index);
        self
    }

    pub fn config(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn outcome_provider() -> OutcomeProviders {
        OutcomeProviders::dynamic(ChoiceCollectorOutcomes)
    }

    /// Accepts either the index of a choice or its text.
    fn selected(&self, callback: &Callback) -> Option<&str> {
        let index = match callback.input.as_ref()? {
            Value::Number(number) => usize::try_from(number.as_u64()?).ok()?,
            Value::String(text) => self.choices.iter().position(|choice| choice == text)?,
            _ => return None,
        };
        self.choices.get(index).map(String::as_str)
    }
}

impl Node for ChoiceCollectorNode {
    fn process(&self, context: &mut TreeContext) -> Result<Action, NodeError> {
        let Some(callback) = context.callback(Callback::CHOICE) else {
            let mut callback = Callback::choice(self.prompt.clone(), self.choices.iter().cloned());
            if let Some(index) = self.default_choice {
                callback = callback.with_output("defaultChoice", index);
            }
            return Ok(Action::send([callback])?.build()?);
        };
        let choice = self
            .selected(callback)
            .ok_or_else(|| NodeError::new(format!("'{}' is not one of the offered choices", display(callback))))?;
        Ok(Action::goto(choice).build()?)
    }
}

fn display(callback: &Callback) -> String {
    callback.input.as_ref().map(Value::to_string).unwrap_or_default()
}

/// Edges of [`ChoiceCollectorNode`]: one per configured choice.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChoiceCollectorOutcomes;

impl OutcomeProvider for ChoiceCollectorOutcomes {
    fn outcomes(&self, _locales: &PreferredLocales, config: &Value) -> Result<Vec<Outcome>, OutcomeError> {
        let node: ChoiceCollectorNode = serde_json::from_value(config.clone())
            .map_err(|err| OutcomeError::undetermined(format!("invalid choice collector configuration: {err}")))?;
        if node.choices.is_empty() {
            return Err(OutcomeError::undetermined("choice collector has no choices"));
        }
        Ok(node
            .choices
            .into_iter()
            .map(|choice| Outcome::new(choice.clone(), choice))
            .collect())
    }
}
