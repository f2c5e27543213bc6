//! # Trellis Std
//!
//! Configuration-only nodes covering the common shapes of an authentication
//! tree: single outcome, boolean decision, dynamic and bounded outcomes,
//! suspension and completion notification. Every node is serde- and
//! schemars-describable so tree editors can configure it.

pub mod nodes;
pub mod prelude;

/// JSON schema of a node's configuration.
pub fn config_schema<N: schemars::JsonSchema>() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(N)).unwrap_or(serde_json::Value::Null)
}
