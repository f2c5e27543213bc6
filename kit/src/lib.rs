//! Trellis facade crate.
//!
//! This crate re-exports the core, runtime and std crates with a single entry point.

pub use trellis_core as core;
pub use trellis_runtime as runtime;
#[cfg(feature = "std")]
pub use trellis_std as std;

pub use trellis_core::{Action, EngineConfig, Node, TreeContext};
pub use trellis_runtime::telemetry::init_stdout_tracing;
pub use trellis_runtime::{StepResult, Tree, TreeExecutor};

pub mod prelude {
    pub use trellis_core::prelude::*;
    pub use trellis_runtime::prelude::*;
    #[cfg(feature = "std")]
    pub use trellis_std::prelude::*;
}
