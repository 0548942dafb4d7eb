//! The active rule set.
//!
//! Rules are only ever appended. Every append publishes a new immutable
//! snapshot and bumps the generation, so a reader holding a snapshot never
//! sees a half-updated list.

use std::collections::HashSet;
use std::sync::Arc;

use aingle_terms::KnowledgeBase;
use log::{debug, warn};
use parking_lot::RwLock;

use crate::rule::RuleRef;

#[derive(Debug)]
struct RegistryState {
    rules: Arc<[RuleRef]>,
    ids: HashSet<String>,
    generation: u64,
}

/// Append-only, generation-stamped list of rules.
#[derive(Debug)]
pub struct RuleRegistry {
    state: RwLock<RegistryState>,
}

impl RuleRegistry {
    /// Creates the registry. Rules with the same id are kept once.
    pub fn new(rules: impl IntoIterator<Item = RuleRef>) -> Self {
        let mut ids = HashSet::new();
        let rules: Vec<RuleRef> = rules
            .into_iter()
            .filter(|r| ids.insert(r.id().to_string()))
            .collect();
        Self {
            state: RwLock::new(RegistryState {
                rules: rules.into(),
                ids,
                generation: 0,
            }),
        }
    }

    /// The current rule list.
    pub fn snapshot(&self) -> Arc<[RuleRef]> {
        self.state.read().rules.clone()
    }

    /// The number of appends that added at least one rule.
    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }

    pub fn len(&self) -> usize {
        self.state.read().rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if a rule with this id is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.state.read().ids.contains(id)
    }

    /// Appends the rules not registered yet. Returns how many were added.
    pub fn append(&self, rules: impl IntoIterator<Item = RuleRef>) -> usize {
        let mut state = self.state.write();
        let fresh: Vec<RuleRef> = rules
            .into_iter()
            .filter(|r| state.ids.insert(r.id().to_string()))
            .collect();
        if fresh.is_empty() {
            return 0;
        }

        let added = fresh.len();
        let mut rules = state.rules.to_vec();
        rules.extend(fresh);
        state.rules = rules.into();
        state.generation += 1;
        added
    }

    /// The registered meta rules, in registration order.
    pub fn meta_rules(&self) -> Vec<RuleRef> {
        self.snapshot()
            .iter()
            .filter(|r| r.is_meta())
            .cloned()
            .collect()
    }

    /// Runs every meta rule against `kb` and registers what they generate.
    ///
    /// Returns how many rules were added. A failing meta rule is logged and
    /// skipped.
    pub fn expand_meta_rules(&self, kb: &dyn KnowledgeBase) -> usize {
        let mut generated = Vec::new();
        for meta in self.meta_rules() {
            match meta.expand_meta(kb) {
                Ok(rules) => generated.extend(rules),
                Err(e) => warn!("meta rule {} failed to expand: {}", meta, e),
            }
        }

        let added = self.append(generated);
        if added > 0 {
            debug!(
                "meta expansion added {} rule(s), {} active",
                added,
                self.len()
            );
        }
        added
    }
}
