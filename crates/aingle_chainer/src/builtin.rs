//! Built-in rules for common inference scenarios
//!
//! These rules cover:
//! - Deduction over inheritance (transitivity of `Inheritance`)
//! - Modus ponens over `Implication`
//! - Symmetry of `Similarity`
//! - A meta rule turning `(Transitive R)` declarations into transitivity rules for `R`

use aingle_terms::{Term, VariableDecl};

use crate::rule::{MetaRule, PatternRule, RuleRef};
use crate::truth::TruthValue;

/// A collection of pre-defined rules.
pub struct BuiltinRules;

fn var(name: &str) -> Term {
    Term::variable(name)
}

fn decl(names: &[&str]) -> VariableDecl {
    VariableDecl::from_names(names.iter().copied())
}

impl BuiltinRules {
    /// All built-in rules, meta rules included.
    pub fn all() -> Vec<RuleRef> {
        vec![
            Self::deduction(),
            Self::modus_ponens(),
            Self::similarity_symmetry(),
            Self::transitivity_meta(),
        ]
    }

    /// The concrete (non-meta) built-in rules.
    pub fn minimal() -> Vec<RuleRef> {
        vec![Self::deduction(), Self::modus_ponens()]
    }

    /// `(Inheritance A B), (Inheritance B C) => (Inheritance A C)`
    pub fn deduction() -> RuleRef {
        PatternRule::from_parts(
            "deduction",
            decl(&["a", "b", "c"]),
            vec![
                Term::inheritance(var("a"), var("b")),
                Term::inheritance(var("b"), var("c")),
            ],
            vec![Term::inheritance(var("a"), var("c"))],
            TruthValue::new(0.9, 0.5),
        )
        .into_ref()
    }

    /// `(Implication P Q), P => Q`
    pub fn modus_ponens() -> RuleRef {
        PatternRule::from_parts(
            "modus-ponens",
            decl(&["p", "q"]),
            vec![Term::implication(var("p"), var("q")), var("p")],
            vec![var("q")],
            TruthValue::new(0.8, 0.5),
        )
        .into_ref()
    }

    /// `(Similarity A B) => (Similarity B A)`
    pub fn similarity_symmetry() -> RuleRef {
        PatternRule::from_parts(
            "similarity-symmetry",
            decl(&["a", "b"]),
            vec![Term::link("Similarity", vec![var("a"), var("b")])],
            vec![Term::link("Similarity", vec![var("b"), var("a")])],
            TruthValue::new(1.0, 0.2),
        )
        .into_ref()
    }

    /// For every `(Transitive R)` in the knowledge base, generates
    /// `(Evaluation R (List X Y)), (Evaluation R (List Y Z)) => (Evaluation R (List X Z))`.
    pub fn transitivity_meta() -> RuleRef {
        let template = PatternRule::from_parts(
            "transitivity",
            decl(&["x", "y", "z"]),
            vec![
                Term::evaluation(var("r"), vec![var("x"), var("y")]),
                Term::evaluation(var("r"), vec![var("y"), var("z")]),
            ],
            vec![Term::evaluation(var("r"), vec![var("x"), var("z")])],
            TruthValue::new(0.9, 0.5),
        );
        let clauses = vec![Term::link("Transitive", vec![var("r")])];
        let variables = decl(&["r"]);
        RuleRef::new(MetaRule::from_parts(
            "transitivity-meta",
            variables,
            clauses,
            template,
        ))
    }
}
