use trellis_core::error::OutcomeError;
use trellis_core::node::NodeId;
use thiserror::Error;
use uuid::Uuid;

/// Errors in tree wiring or driver usage.
///
/// Node failures are not `TreeError`s: they end the journey on the failure
/// terminus and are reported through the completion.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("tree has no entry node")]
    MissingEntry,

    #[error("node {0} is not part of the tree")]
    UnknownNode(NodeId),

    #[error("node {node} has no outcome '{outcome}'")]
    UnknownOutcome { node: NodeId, outcome: String },

    #[error("outcome '{outcome}' of node {node} is not connected")]
    UnconnectedOutcome { node: NodeId, outcome: String },

    #[error("node {node} requires '{input}' but no path to it guarantees that state")]
    MissingInput { node: NodeId, input: String },

    #[error("outcomes of node {node} cannot be resolved: {source}")]
    Outcomes {
        node: NodeId,
        #[source]
        source: OutcomeError,
    },

    #[error("journey {0} is suspended and can only be resumed from suspension")]
    Suspended(Uuid),

    #[error("journey {0} is not suspended")]
    NotSuspended(Uuid),

    #[error("journey {journey} is not suspended under id '{found}'")]
    SuspensionMismatch { journey: Uuid, found: String },

    #[error("invalid resume URI: {0}")]
    InvalidResumeUri(#[from] http::uri::InvalidUri),
}
