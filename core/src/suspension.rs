use crate::callback::Callback;
use crate::error::SuspensionError;
use async_trait::async_trait;

/// Delivers the resume URI of a suspended tree out-of-band.
///
/// Invoked by the driver, never by the node, once a node returns a
/// suspend action. The returned callback tells the client what happened
/// (e.g. "we sent you an email"). An error fails the authentication attempt.
///
/// When the resume URI is followed the tree re-enters the same node with
/// [`TreeContext::has_resumed_from_suspend`](crate::context::TreeContext::has_resumed_from_suspend)
/// set.
#[async_trait]
pub trait SuspensionHandler: Send + Sync {
    async fn handle(&self, resume_uri: &http::Uri) -> Result<Callback, SuspensionError>;
}

/// Reports the resume URI to the client instead of sending it anywhere.
///
/// Useful for flows where the user copies a link to another device.
#[derive(Debug, Clone)]
pub struct DisplayResumeUri {
    message: String,
}

impl DisplayResumeUri {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl SuspensionHandler for DisplayResumeUri {
    async fn handle(&self, resume_uri: &http::Uri) -> Result<Callback, SuspensionError> {
        Ok(Callback::suspended_text_output(self.message.clone()).with_output("resumeUri", resume_uri.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn display_handler_echoes_uri() {
        let uri: http::Uri = "https://am.example.com/resume?suspendedId=abc".parse().unwrap();
        let callback = DisplayResumeUri::new("Open this link on your phone")
            .handle(&uri)
            .await
            .unwrap();

        assert!(callback.is(Callback::SUSPENDED_TEXT_OUTPUT));
        assert_eq!(
            callback.output.get("resumeUri").and_then(|v| v.as_str()),
            Some("https://am.example.com/resume?suspendedId=abc")
        );
    }
}
