//! AIngle Chainer - Probabilistic Forward-Chaining Inference
//!
//! This crate derives new facts from a knowledge base of terms. It
//! repeatedly picks a premise (a "source"), picks a rule applicable to it
//! by Thompson sampling over the rules' truth values, applies the rule and
//! feeds the products back in as new sources.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Forward Chainer                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │                 Step Controller                       │   │
//! │  │  Bounded Fork │ Termination │ Cancellation           │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │                           │                                  │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │                    Selection                          │   │
//! │  │  Source Pool (weights) │ Rules (Thompson sampling)   │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │                           │                                  │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │                    Application                        │   │
//! │  │  Child Scope │ Constant-Clause Guard │ Focus Set     │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │                           │                                  │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │              Rule Registry & Trace                    │   │
//! │  │  Meta-Rule Expansion │ Inference Records             │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │                                                              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use aingle_chainer::{BuiltinRules, ChainerConfig, ForwardChainer};
//! use aingle_terms::{KnowledgeBase, Term, TermSpace};
//!
//! # fn main() -> Result<(), aingle_chainer::Error> {
//! let kb = Arc::new(TermSpace::new());
//! kb.add(Term::implication(Term::concept("rain"), Term::concept("wet")));
//! kb.add(Term::concept("rain"));
//!
//! let chainer = ForwardChainer::builder(kb, BuiltinRules::minimal())
//!     .source(Term::concept("rain"))
//!     .config(ChainerConfig::exhaustive().with_seed(1))
//!     .build()?;
//! chainer.do_chain();
//!
//! assert!(chainer.get_results_set().contains(&Term::concept("wet")));
//! # Ok(())
//! # }
//! ```

pub mod builtin;
pub mod chainer;
pub mod config;
pub mod error;
pub mod registry;
pub mod rule;
pub mod source;
pub mod stats;
pub mod thompson;
pub mod truth;

// Re-exports
pub use builtin::BuiltinRules;
pub use chainer::{CancelHandle, ForwardChainer, ForwardChainerBuilder, DUMMY_SOURCE};
pub use config::ChainerConfig;
pub use error::{Error, Result};
pub use registry::RuleRegistry;
pub use rule::{
    load_rules_file, load_rules_json, MetaRule, PatternRule, PatternRuleBuilder, Rule,
    RuleDefinition, RuleRef,
};
pub use source::{Source, Sources};
pub use stats::{ForwardChainerStats, InferenceRecord};
pub use thompson::ThompsonSampling;
pub use truth::{BetaDistribution, TruthValue};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
