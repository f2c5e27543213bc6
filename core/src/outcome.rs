//! Outcomes - descriptions of a node's outgoing edges.
//!
//! These are not runtime values: the driver and editor tooling use them to
//! build and validate tree graphs. A node picks its edge at runtime through
//! [`Action::goto`](crate::action::Action::goto).

use crate::error::OutcomeError;
use crate::request::PreferredLocales;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

pub const SINGLE_OUTCOME_ID: &str = "outcome";
pub const TRUE_OUTCOME_ID: &str = "true";
pub const FALSE_OUTCOME_ID: &str = "false";

/// An edge descriptor: its id and the label shown in editors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Outcome {
    pub id: String,
    pub display_name: String,
}

impl Outcome {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Edges fixed for every instance of a node type.
pub trait StaticOutcomeProvider: Send + Sync {
    fn outcomes(&self, locales: &PreferredLocales) -> Vec<Outcome>;
}

/// Edges computed from an instance's (unvalidated) configuration.
pub trait OutcomeProvider: Send + Sync {
    fn outcomes(&self, locales: &PreferredLocales, config: &Value) -> Result<Vec<Outcome>, OutcomeError>;
}

/// Configuration-dependent edges drawn from a configuration-independent superset.
///
/// [`outcomes`](OutcomeProvider::outcomes) must always return a subset of
/// [`all_outcomes`](Self::all_outcomes); see [`check_bounded`].
pub trait BoundedOutcomeProvider: OutcomeProvider {
    fn all_outcomes(&self, locales: &PreferredLocales) -> Result<Vec<Outcome>, OutcomeError>;
}

/// The edge-set capability of a node, dispatched by graph validation.
pub enum OutcomeProviders {
    Static(Box<dyn StaticOutcomeProvider>),
    Dynamic(Box<dyn OutcomeProvider>),
    Bounded(Box<dyn BoundedOutcomeProvider>),
}

impl OutcomeProviders {
    pub fn fixed<P: StaticOutcomeProvider + 'static>(provider: P) -> Self {
        OutcomeProviders::Static(Box::new(provider))
    }

    pub fn dynamic<P: OutcomeProvider + 'static>(provider: P) -> Self {
        OutcomeProviders::Dynamic(Box::new(provider))
    }

    pub fn bounded<P: BoundedOutcomeProvider + 'static>(provider: P) -> Self {
        OutcomeProviders::Bounded(Box::new(provider))
    }

    /// Edges for a configured node instance.
    pub fn outcomes(&self, locales: &PreferredLocales, config: &Value) -> Result<Vec<Outcome>, OutcomeError> {
        match self {
            OutcomeProviders::Static(provider) => Ok(provider.outcomes(locales)),
            OutcomeProviders::Dynamic(provider) => provider.outcomes(locales, config),
            OutcomeProviders::Bounded(provider) => {
                check_bounded(provider.as_ref(), locales, config)?;
                provider.outcomes(locales, config)
            }
        }
    }

    /// Every edge the node type could ever have, where that is known
    /// independently of configuration.
    pub fn all_outcomes(&self, locales: &PreferredLocales) -> Option<Result<Vec<Outcome>, OutcomeError>> {
        match self {
            OutcomeProviders::Static(provider) => Some(Ok(provider.outcomes(locales))),
            OutcomeProviders::Dynamic(_) => None,
            OutcomeProviders::Bounded(provider) => Some(provider.all_outcomes(locales)),
        }
    }
}

impl std::fmt::Debug for OutcomeProviders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            OutcomeProviders::Static(_) => "Static",
            OutcomeProviders::Dynamic(_) => "Dynamic",
            OutcomeProviders::Bounded(_) => "Bounded",
        };
        f.debug_tuple("OutcomeProviders").field(&kind).finish()
    }
}

/// Checks that a bounded provider's configured edges are within its superset.
pub fn check_bounded<P>(provider: &P, locales: &PreferredLocales, config: &Value) -> Result<(), OutcomeError>
where
    P: BoundedOutcomeProvider + ?Sized,
{
    let all: BTreeSet<String> = provider
        .all_outcomes(locales)?
        .into_iter()
        .map(|outcome| outcome.id)
        .collect();
    match provider
        .outcomes(locales, config)?
        .into_iter()
        .find(|outcome| !all.contains(&outcome.id))
    {
        Some(outcome) => Err(OutcomeError::NotInSuperset { outcome: outcome.id }),
        None => Ok(()),
    }
}

/// The single [`SINGLE_OUTCOME_ID`] edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleOutcomeProvider;

impl StaticOutcomeProvider for SingleOutcomeProvider {
    fn outcomes(&self, _locales: &PreferredLocales) -> Vec<Outcome> {
        vec![Outcome::new(SINGLE_OUTCOME_ID, "Outcome")]
    }
}

/// The [`TRUE_OUTCOME_ID`] / [`FALSE_OUTCOME_ID`] pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanOutcomeProvider;

impl StaticOutcomeProvider for BooleanOutcomeProvider {
    fn outcomes(&self, _locales: &PreferredLocales) -> Vec<Outcome> {
        vec![
            Outcome::new(TRUE_OUTCOME_ID, "True"),
            Outcome::new(FALSE_OUTCOME_ID, "False"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Superset `a`, `b`, `c`; configuration enables a subset via `enabled`.
    struct Letters {
        leak: bool,
    }

    impl OutcomeProvider for Letters {
        fn outcomes(&self, _locales: &PreferredLocales, config: &Value) -> Result<Vec<Outcome>, OutcomeError> {
            let enabled = config
                .get("enabled")
                .and_then(Value::as_array)
                .ok_or_else(|| OutcomeError::undetermined("'enabled' must be a list"))?;
            let mut outcomes: Vec<Outcome> = enabled
                .iter()
                .filter_map(Value::as_str)
                .map(|id| Outcome::new(id, id.to_uppercase()))
                .collect();
            if self.leak {
                outcomes.push(Outcome::new("z", "Z"));
            }
            Ok(outcomes)
        }
    }

    impl BoundedOutcomeProvider for Letters {
        fn all_outcomes(&self, _locales: &PreferredLocales) -> Result<Vec<Outcome>, OutcomeError> {
            Ok(["a", "b", "c"].iter().map(|id| Outcome::new(*id, id.to_uppercase())).collect())
        }
    }

    #[test]
    fn bounded_subset_passes_for_every_configuration() {
        let locales = PreferredLocales::default();
        let provider = Letters { leak: false };
        for config in [
            json!({"enabled": []}),
            json!({"enabled": ["a"]}),
            json!({"enabled": ["c", "a"]}),
            json!({"enabled": ["a", "b", "c"]}),
        ] {
            assert!(check_bounded(&provider, &locales, &config).is_ok(), "{config}");
        }
    }

    #[test]
    fn bounded_leak_is_rejected() {
        let provider = OutcomeProviders::bounded(Letters { leak: true });
        let err = provider
            .outcomes(&PreferredLocales::default(), &json!({"enabled": ["a"]}))
            .unwrap_err();
        assert_eq!(err, OutcomeError::NotInSuperset { outcome: "z".into() });
    }

    #[test]
    fn dynamic_provider_reports_undeterminable_config() {
        let provider = OutcomeProviders::dynamic(Letters { leak: false });
        let err = provider
            .outcomes(&PreferredLocales::default(), &json!({}))
            .unwrap_err();
        assert!(matches!(err, OutcomeError::Undetermined { .. }));
        assert!(provider.all_outcomes(&PreferredLocales::default()).is_none());
    }

    #[test]
    fn fixed_shapes_expose_expected_ids() {
        let locales = PreferredLocales::default();
        let single: Vec<_> = SingleOutcomeProvider.outcomes(&locales).into_iter().map(|o| o.id).collect();
        assert_eq!(single, vec![SINGLE_OUTCOME_ID]);

        let boolean = OutcomeProviders::fixed(BooleanOutcomeProvider)
            .outcomes(&locales, &Value::Null)
            .unwrap();
        assert_eq!(boolean.len(), 2);
        assert_eq!(boolean[0].id, TRUE_OUTCOME_ID);
        assert_eq!(boolean[1].id, FALSE_OUTCOME_ID);
    }
}
