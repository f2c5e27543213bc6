//! # Trellis Runtime
//!
//! The reference driver for trees of [`trellis_core::Node`]s: graph
//! construction and validation, journey persistence between round trips,
//! suspension, tree hooks and an audit trail of every step.

pub mod audit;
pub mod error;
pub mod executor;
pub mod hooks;
pub mod journey;
pub mod telemetry;
pub mod tree;

pub use audit::{AuditEvent, AuditTrail};
pub use error::TreeError;
pub use executor::{Completion, Failure, FailureKind, Interaction, StepResult, Suspended, TreeExecutor};
pub use hooks::TreeHookRegistry;
pub use journey::Journey;
pub use tree::{Schematic, Target, Tree, TreeNode};

pub mod prelude {
    pub use crate::error::TreeError;
    pub use crate::executor::{FailureKind, StepResult, TreeExecutor};
    pub use crate::hooks::TreeHookRegistry;
    pub use crate::journey::Journey;
    pub use crate::tree::{Target, Tree, TreeNode};
}
