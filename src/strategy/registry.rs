use std::sync::Arc;

use tracing::debug;

use super::Strategy;
use crate::domain::{OpportunityKind, StrategyId};
use crate::error::RegistryError;

/// Immutable catalogue of strategies, in registration order.
///
/// Built once through [`StrategyRegistryBuilder`] and shared read-only.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: Vec<Arc<dyn Strategy>>,
}

impl StrategyRegistry {
    #[must_use]
    pub fn builder() -> StrategyRegistryBuilder {
        StrategyRegistryBuilder::default()
    }

    /// Look up a strategy by id.
    pub fn get(&self, id: &StrategyId) -> Result<Arc<dyn Strategy>, RegistryError> {
        self.strategies
            .iter()
            .find(|s| s.id() == id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id.clone()))
    }

    /// All strategies in registration order.
    #[must_use]
    pub fn all(&self) -> &[Arc<dyn Strategy>] {
        &self.strategies
    }

    /// Strategies accepting `kind`, in registration order.
    pub fn for_kind(&self, kind: OpportunityKind) -> impl Iterator<Item = &Arc<dyn Strategy>> {
        self.strategies.iter().filter(move |s| s.accepts(kind))
    }

    #[must_use]
    pub fn ids(&self) -> Vec<StrategyId> {
        self.strategies.iter().map(|s| s.id().clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

/// Collects strategies before the registry is frozen.
#[derive(Default)]
pub struct StrategyRegistryBuilder {
    strategies: Vec<Arc<dyn Strategy>>,
}

impl StrategyRegistryBuilder {
    /// Add a strategy. A duplicate id is rejected and the earlier
    /// registration stays in place.
    pub fn register(&mut self, strategy: Arc<dyn Strategy>) -> Result<&mut Self, RegistryError> {
        if self.strategies.iter().any(|s| s.id() == strategy.id()) {
            return Err(RegistryError::DuplicateStrategy(strategy.id().clone()));
        }
        debug!(strategy = %strategy.id(), "Registered strategy");
        self.strategies.push(strategy);
        Ok(self)
    }

    #[must_use]
    pub fn build(self) -> StrategyRegistry {
        StrategyRegistry {
            strategies: self.strategies,
        }
    }
}
