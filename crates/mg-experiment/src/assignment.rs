//! Sticky variant assignment
//!
//! Resolution order for one experiment dimension:
//! 1. a query override naming a catalog key (not persisted unless
//!    [`ExperimentConfig::persist_override`](crate::config::ExperimentConfig) is set)
//! 2. a previously persisted key that is still in the catalog
//! 3. a fresh coin flip, persisted before it is returned
//!
//! Unknown keys at steps 1 and 2 fall through silently. The pricing and
//! messaging dimensions resolve independently, each with its own storage key
//! and override parameter.

use crate::capability::SharedRandom;
use crate::catalog::Catalog;
use crate::error::StoreError;
use crate::storage::SharedStore;
use serde::Serialize;
use std::fmt;

/// Where a resolved key came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentSource {
    /// Query-string override
    Override,
    /// Previously persisted assignment
    Sticky,
    /// Fresh random draw
    Fresh,
}

impl fmt::Display for AssignmentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignmentSource::Override => f.write_str("override"),
            AssignmentSource::Sticky => f.write_str("sticky"),
            AssignmentSource::Fresh => f.write_str("fresh"),
        }
    }
}

/// Resolved variant for one dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Assignment {
    /// Catalog key
    pub key: &'static str,
    /// How it was chosen
    pub source: AssignmentSource,
}

/// Resolves and persists assignments
#[derive(Debug, Clone)]
pub struct AssignmentResolver {
    store: SharedStore,
    random: SharedRandom,
    persist_override: bool,
}

impl AssignmentResolver {
    /// Create a resolver over a store and random source
    #[inline]
    #[must_use]
    pub fn new(store: SharedStore, random: SharedRandom) -> Self {
        Self {
            store,
            random,
            persist_override: false,
        }
    }

    /// Make valid overrides sticky as well
    #[inline]
    #[must_use]
    pub fn with_persist_override(mut self, persist: bool) -> Self {
        self.persist_override = persist;
        self
    }

    /// Resolve the variant for one dimension
    ///
    /// Only a failing store is an error; unknown override or stored keys are
    /// treated as absent.
    pub fn resolve<P>(
        &self,
        catalog: &Catalog<P>,
        override_value: Option<&str>,
        storage_key: &str,
    ) -> Result<Assignment, StoreError> {
        if let Some(key) = override_value.and_then(|v| catalog.canonical_key(v)) {
            if self.persist_override {
                self.store.set(storage_key, key)?;
            }
            tracing::debug!(storage_key, key, "assignment forced by override");
            return Ok(Assignment {
                key,
                source: AssignmentSource::Override,
            });
        }

        if let Some(stored) = self.store.get(storage_key)? {
            if let Some(key) = catalog.canonical_key(&stored) {
                tracing::debug!(storage_key, key, "sticky assignment");
                return Ok(Assignment {
                    key,
                    source: AssignmentSource::Sticky,
                });
            }
            tracing::warn!(storage_key, stored = %stored, "ignoring persisted key absent from catalog");
        }

        let key = catalog.pick(self.random.unit());
        self.store.set(storage_key, key)?;
        tracing::debug!(storage_key, key, "fresh assignment persisted");
        Ok(Assignment {
            key,
            source: AssignmentSource::Fresh,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{RandomSource, SeededRandom};
    use crate::catalog::PRICING;
    use crate::storage::{KeyValueStore, MemoryStore};
    use std::sync::Arc;

    const KEY: &str = "mergeguard_variant";

    #[derive(Debug)]
    struct Fixed(f64);

    impl RandomSource for Fixed {
        fn unit(&self) -> f64 {
            self.0
        }
    }

    fn resolver(store: &Arc<MemoryStore>, unit: f64) -> AssignmentResolver {
        AssignmentResolver::new(store.clone(), Arc::new(Fixed(unit)))
    }

    #[test]
    fn fresh_draw_is_persisted() {
        let store = Arc::new(MemoryStore::new());
        let a = resolver(&store, 0.9).resolve(&PRICING, None, KEY).unwrap();
        assert_eq!(a, Assignment { key: "b", source: AssignmentSource::Fresh });
        assert_eq!(store.get(KEY).unwrap().as_deref(), Some("b"));
    }

    #[test]
    fn stored_key_is_sticky() {
        let store = Arc::new(MemoryStore::with_entries([(KEY, "a")]));
        for unit in [0.1, 0.6, 0.99] {
            let a = resolver(&store, unit).resolve(&PRICING, None, KEY).unwrap();
            assert_eq!(a, Assignment { key: "a", source: AssignmentSource::Sticky });
        }
    }

    #[test]
    fn override_wins_without_persisting() {
        let store = Arc::new(MemoryStore::with_entries([(KEY, "a")]));
        let a = resolver(&store, 0.1).resolve(&PRICING, Some("b"), KEY).unwrap();
        assert_eq!(a, Assignment { key: "b", source: AssignmentSource::Override });
        assert_eq!(store.get(KEY).unwrap().as_deref(), Some("a"));
    }

    #[test]
    fn override_on_fresh_profile_leaves_store_empty() {
        let store = Arc::new(MemoryStore::new());
        resolver(&store, 0.1).resolve(&PRICING, Some("b"), KEY).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn persist_override_opt_in() {
        let store = Arc::new(MemoryStore::with_entries([(KEY, "a")]));
        let r = resolver(&store, 0.1).with_persist_override(true);
        r.resolve(&PRICING, Some("b"), KEY).unwrap();
        assert_eq!(store.get(KEY).unwrap().as_deref(), Some("b"));

        let a = r.resolve(&PRICING, None, KEY).unwrap();
        assert_eq!(a.source, AssignmentSource::Sticky);
        assert_eq!(a.key, "b");
    }

    #[test]
    fn unknown_override_falls_through() {
        let store = Arc::new(MemoryStore::with_entries([(KEY, "a")]));
        let a = resolver(&store, 0.9).resolve(&PRICING, Some("z"), KEY).unwrap();
        assert_eq!(a, Assignment { key: "a", source: AssignmentSource::Sticky });

        let empty = Arc::new(MemoryStore::new());
        let a = resolver(&empty, 0.9).resolve(&PRICING, Some(""), KEY).unwrap();
        assert_eq!(a.source, AssignmentSource::Fresh);
    }

    #[test]
    fn unknown_stored_key_is_replaced() {
        let store = Arc::new(MemoryStore::with_entries([(KEY, "legacy")]));
        let a = resolver(&store, 0.2).resolve(&PRICING, None, KEY).unwrap();
        assert_eq!(a, Assignment { key: "a", source: AssignmentSource::Fresh });
        assert_eq!(store.get(KEY).unwrap().as_deref(), Some("a"));
    }

    #[test]
    fn fresh_draws_are_roughly_even() {
        let random = Arc::new(SeededRandom::new(42));
        let mut first = 0usize;
        let n = 4_000;
        for _ in 0..n {
            let store = Arc::new(MemoryStore::new());
            let r = AssignmentResolver::new(store, random.clone());
            if r.resolve(&PRICING, None, KEY).unwrap().key == "a" {
                first += 1;
            }
        }
        let share = first as f64 / n as f64;
        assert!((0.45..=0.55).contains(&share), "share of 'a' was {share}");
    }
}
