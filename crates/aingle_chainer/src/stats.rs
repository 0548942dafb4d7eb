//! Inference trace and aggregated results.

use std::fmt;
use std::sync::Arc;

use aingle_terms::{KnowledgeBase, Term};
use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::rule::RuleRef;

/// One successful rule application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceRecord {
    /// Iteration of the step that produced this record.
    pub iteration: usize,
    /// The premise the rule was applied to.
    pub source: Term,
    pub rule_id: String,
    pub rule_name: String,
    /// What the rule produced, deduplicated.
    pub products: IndexSet<Term>,
    pub recorded_at: DateTime<Utc>,
}

impl InferenceRecord {
    /// The record as an `(Execution (Rule name) source (Set products...))` term.
    pub fn to_term(&self) -> Term {
        Term::link(
            "Execution",
            vec![
                Term::node("Rule", self.rule_name.clone()),
                self.source.clone(),
                Term::set(self.products.iter().cloned()),
            ],
        )
    }
}

/// Append-only trace of a chaining run.
///
/// When a trace store is attached, every record is also written to it as an
/// `Execution` term.
#[derive(Default)]
pub struct ForwardChainerStats {
    records: Vec<InferenceRecord>,
    results: IndexSet<Term>,
    trace: Option<Arc<dyn KnowledgeBase>>,
}

impl ForwardChainerStats {
    /// Creates an empty trace with no trace store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a trace that also writes every record to `trace`.
    pub fn with_trace(trace: Arc<dyn KnowledgeBase>) -> Self {
        Self {
            trace: Some(trace),
            ..Self::default()
        }
    }

    /// Appends a record and folds its products into the results.
    ///
    /// # Arguments
    ///
    /// * `iteration` - The step that applied the rule.
    /// * `source` - The premise the rule was applied to.
    /// * `rule` - The applied rule instance.
    /// * `products` - What the application produced, possibly nothing.
    pub fn add_inference_record(
        &mut self,
        iteration: usize,
        source: &Term,
        rule: &RuleRef,
        products: IndexSet<Term>,
    ) {
        let record = InferenceRecord {
            iteration,
            source: source.clone(),
            rule_id: rule.id().to_string(),
            rule_name: rule.name().to_string(),
            products,
            recorded_at: Utc::now(),
        };
        if let Some(trace) = &self.trace {
            trace.add(record.to_term());
        }
        self.results.extend(record.products.iter().cloned());
        self.records.push(record);
    }

    /// Every product of every record, in order of first production.
    pub fn get_all_products(&self) -> &IndexSet<Term> {
        &self.results
    }

    /// Every record, in the order they were added.
    pub fn records(&self) -> &[InferenceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns `true` if a trace store is attached.
    pub fn has_trace(&self) -> bool {
        self.trace.is_some()
    }
}

impl fmt::Debug for ForwardChainerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForwardChainerStats")
            .field("records", &self.records.len())
            .field("results", &self.results.len())
            .field("trace", &self.has_trace())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::BuiltinRules;
    use aingle_terms::TermSpace;

    fn products(names: &[&str]) -> IndexSet<Term> {
        names.iter().map(|n| Term::concept(*n)).collect()
    }

    #[test]
    fn test_results_aggregate_and_deduplicate() {
        let mut stats = ForwardChainerStats::new();
        let rule = BuiltinRules::deduction();
        stats.add_inference_record(1, &Term::concept("s"), &rule, products(&["a", "b"]));
        stats.add_inference_record(2, &Term::concept("s"), &rule, products(&["b", "c"]));
        stats.add_inference_record(3, &Term::concept("s"), &rule, IndexSet::new());

        assert_eq!(stats.len(), 3);
        assert_eq!(stats.get_all_products(), &products(&["a", "b", "c"]));
        assert_eq!(stats.records()[0].rule_name, "deduction");
    }

    #[test]
    fn test_trace_store_receives_executions() {
        let trace = Arc::new(TermSpace::named("trace"));
        let mut stats = ForwardChainerStats::with_trace(trace.clone());
        let rule = BuiltinRules::modus_ponens();
        stats.add_inference_record(1, &Term::concept("rain"), &rule, products(&["wet"]));

        let expected = Term::link(
            "Execution",
            vec![
                Term::node("Rule", "modus-ponens"),
                Term::concept("rain"),
                Term::set(vec![Term::concept("wet")]),
            ],
        );
        assert!(trace.contains(&expected));
        assert_eq!(trace.len(), 1);
    }

    #[test]
    fn test_record_serializes() {
        let mut stats = ForwardChainerStats::new();
        stats.add_inference_record(
            4,
            &Term::concept("s"),
            &BuiltinRules::deduction(),
            products(&["x"]),
        );
        let json = serde_json::to_string(&stats.records()[0]).unwrap();
        let back: InferenceRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stats.records()[0]);
    }
}
