use std::collections::BTreeMap;
use std::sync::Arc;
use trellis_core::error::HookError;
use trellis_core::hook::{HookSpec, TreeHook};

type HookFactory = Arc<dyn Fn(&HookSpec) -> Result<Box<dyn TreeHook>, HookError> + Send + Sync>;

/// Maps hook type names to factories building [`TreeHook`] instances.
///
/// A hook is instantiated only when its tree reaches a terminal state, so
/// the factory sees the [`HookSpec`] exactly as the scheduling node recorded it.
#[derive(Clone, Default)]
pub struct TreeHookRegistry {
    factories: BTreeMap<String, HookFactory>,
}

impl TreeHookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, hook_type: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&HookSpec) -> Result<Box<dyn TreeHook>, HookError> + Send + Sync + 'static,
    {
        self.factories.insert(hook_type.into(), Arc::new(factory));
        self
    }

    pub fn with<F>(mut self, hook_type: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&HookSpec) -> Result<Box<dyn TreeHook>, HookError> + Send + Sync + 'static,
    {
        self.register(hook_type, factory);
        self
    }

    pub fn contains(&self, hook_type: &str) -> bool {
        self.factories.contains_key(hook_type)
    }

    pub fn instantiate(&self, spec: &HookSpec) -> Result<Box<dyn TreeHook>, HookError> {
        let factory = self
            .factories
            .get(&spec.hook_type)
            .ok_or_else(|| HookError::new(format!("no tree hook registered for type '{}'", spec.hook_type)))?;
        factory(spec)
    }
}

impl std::fmt::Debug for TreeHookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeHookRegistry")
            .field("hook_types", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Noop;

    #[async_trait]
    impl TreeHook for Noop {}

    #[test]
    fn unknown_hook_type_is_an_error() {
        let registry = TreeHookRegistry::new().with("noop", |_| Ok(Box::new(Noop) as Box<dyn TreeHook>));

        assert!(registry.contains("noop"));
        assert!(registry.instantiate(&HookSpec::new("noop", None, "Test")).is_ok());
        let err = registry
            .instantiate(&HookSpec::new("missing", None, "Test"))
            .err()
            .unwrap();
        assert!(err.message().contains("missing"));
    }
}
