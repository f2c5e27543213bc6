use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A structured request for client-supplied input.
///
/// The core does not fix a wire format; `kind` names the callback type the
/// driver knows how to render (e.g. `"NameCallback"`), `output` carries what
/// is shown to the client and `input` what the client submitted back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Callback {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub output: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
}

impl Callback {
    pub const TEXT_OUTPUT: &'static str = "TextOutputCallback";
    pub const NAME: &'static str = "NameCallback";
    pub const PASSWORD: &'static str = "PasswordCallback";
    pub const CHOICE: &'static str = "ChoiceCallback";
    pub const SUSPENDED_TEXT_OUTPUT: &'static str = "SuspendedTextOutputCallback";

    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            prompt: None,
            output: Map::new(),
            input: None,
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn with_output(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.output.insert(key.into(), value.into());
        self
    }

    /// Attaches the value submitted by the client.
    pub fn with_input(mut self, input: impl Into<Value>) -> Self {
        self.input = Some(input.into());
        self
    }

    pub fn text_output(message: impl Into<String>) -> Self {
        Self::new(Self::TEXT_OUTPUT).with_output("message", Value::String(message.into()))
    }

    pub fn name(prompt: impl Into<String>) -> Self {
        Self::new(Self::NAME).with_prompt(prompt)
    }

    pub fn password(prompt: impl Into<String>) -> Self {
        Self::new(Self::PASSWORD).with_prompt(prompt)
    }

    pub fn choice<I, S>(prompt: impl Into<String>, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let choices: Vec<Value> = choices.into_iter().map(|c| Value::String(c.into())).collect();
        Self::new(Self::CHOICE)
            .with_prompt(prompt)
            .with_output("choices", choices)
    }

    /// Shown to the client while the tree waits for an out-of-band event.
    pub fn suspended_text_output(message: impl Into<String>) -> Self {
        Self::new(Self::SUSPENDED_TEXT_OUTPUT).with_output("message", Value::String(message.into()))
    }

    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }

    pub fn input_str(&self) -> Option<&str> {
        self.input.as_ref().and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn choice_callback_lists_choices() {
        let callback = Callback::choice("Pick one", ["email", "sms"]);
        assert!(callback.is(Callback::CHOICE));
        assert_eq!(callback.output.get("choices"), Some(&json!(["email", "sms"])));
    }

    #[test]
    fn submitted_input_is_readable() {
        let callback = Callback::name("User Name").with_input("alice");
        assert_eq!(callback.input_str(), Some("alice"));
        assert_eq!(callback.prompt.as_deref(), Some("User Name"));
    }
}
