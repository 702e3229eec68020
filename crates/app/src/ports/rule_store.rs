//! Rule store port: durable mirror of the engine's rule map.

use std::future::Future;
use std::sync::Arc;

use adrules_domain::error::RulesError;
use adrules_domain::rule::Rule;

/// Persists the complete rule set.
///
/// The engine keeps the authoritative map in memory and writes the whole set
/// back after every mutation, so stores only need whole-set semantics.
pub trait RuleStore {
    /// Load every persisted rule. An empty store yields an empty vector.
    fn load_all(&self) -> impl Future<Output = Result<Vec<Rule>, RulesError>> + Send;

    /// Replace the persisted set with `rules`.
    fn save_all(&self, rules: &[Rule]) -> impl Future<Output = Result<(), RulesError>> + Send;
}

impl<T: RuleStore + Send + Sync> RuleStore for Arc<T> {
    fn load_all(&self) -> impl Future<Output = Result<Vec<Rule>, RulesError>> + Send {
        (**self).load_all()
    }

    fn save_all(&self, rules: &[Rule]) -> impl Future<Output = Result<(), RulesError>> + Send {
        (**self).save_all(rules)
    }
}
