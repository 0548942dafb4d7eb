//! AIngle Terms - Structured Term Store and Unifier
//!
//! Hypergraph-style terms for the AIngle reasoning engines. A fact, a
//! pattern and a rule body are all the same kind of value: a [`Term`].
//! Terms live in a [`KnowledgeBase`], and patterns are matched against them
//! with the unifier in [`pattern`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      AIngle Terms                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │                     Unifier                           │   │
//! │  │  unify │ match_term │ substitute │ satisfy           │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │                           │                                  │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │                   Term Stores                         │   │
//! │  │  TermSpace (shared) │ ScopedSpace (child scope)       │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │                           │                                  │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │                      Terms                            │   │
//! │  │  Node │ Link │ Variable │ VariableDecl               │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │                                                              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use aingle_terms::{pattern, KnowledgeBase, Term, TermSpace, VariableDecl};
//!
//! let kb = TermSpace::new();
//! kb.add(Term::inheritance(Term::concept("cat"), Term::concept("mammal")));
//! kb.add(Term::inheritance(Term::concept("mammal"), Term::concept("animal")));
//!
//! let clauses = vec![
//!     Term::inheritance(Term::variable("x"), Term::variable("y")),
//!     Term::inheritance(Term::variable("y"), Term::variable("z")),
//! ];
//! let vars = VariableDecl::from_names(["x", "y", "z"]);
//!
//! let groundings = pattern::satisfy(&clauses, &vars, &kb)?;
//! assert_eq!(groundings.len(), 1);
//! assert_eq!(groundings[0].get("z"), Some(&Term::concept("animal")));
//! # Ok::<(), aingle_terms::Error>(())
//! ```

pub mod error;
pub mod pattern;
pub mod space;
pub mod term;

// Re-exports
pub use error::{Error, Result};
pub use pattern::Bindings;
pub use space::{KnowledgeBase, ScopedSpace, TermSpace};
pub use term::{Term, VariableDecl, LIST_KIND, SET_KIND};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
