//! Integration tests for term stores and the unifier
//!
//! Exercises the public surface the reasoning engines rely on: shared
//! stores, child scopes, and conjunctive pattern search.

use aingle_terms::pattern::{self, Bindings};
use aingle_terms::{Error, KnowledgeBase, ScopedSpace, Term, TermSpace, VariableDecl};
use std::sync::Arc;

fn inh(a: &str, b: &str) -> Term {
    Term::inheritance(Term::concept(a), Term::concept(b))
}

// ============================================================================
// Store Tests
// ============================================================================

#[test]
fn test_store_deduplicates_structurally() {
    let kb = TermSpace::named("kb");
    kb.add(inh("cat", "mammal"));
    kb.add(Term::link(
        "Inheritance",
        vec![Term::node("Concept", "cat"), Term::node("Concept", "mammal")],
    ));

    assert_eq!(kb.len(), 1);
    assert!(kb.contains(&inh("cat", "mammal")));
    assert!(!kb.contains(&inh("mammal", "cat")));
}

#[test]
fn test_shared_store_across_threads() {
    let kb: Arc<dyn KnowledgeBase> = Arc::new(TermSpace::new());

    std::thread::scope(|s| {
        for worker in 0..4 {
            let kb = &kb;
            s.spawn(move || {
                for i in 0..25 {
                    kb.add(inh(&format!("n{}", i), "thing"));
                    kb.add(inh(&format!("w{}", worker), "worker"));
                }
            });
        }
    });

    assert_eq!(kb.len(), 25 + 4);
}

#[test]
fn test_scope_sees_parent_and_stays_local() {
    let kb = TermSpace::with_terms(vec![inh("cat", "mammal")]);
    let scope = ScopedSpace::new(&kb);
    scope.add(inh("mammal", "animal"));

    let clauses = vec![
        Term::inheritance(Term::variable("x"), Term::variable("y")),
        Term::inheritance(Term::variable("y"), Term::variable("z")),
    ];
    let vars = VariableDecl::from_names(["x", "y", "z"]);

    assert_eq!(pattern::satisfy(&clauses, &vars, &scope).unwrap().len(), 1);
    assert!(pattern::satisfy(&clauses, &vars, &kb).unwrap().is_empty());
    assert_eq!(kb.len(), 1);
}

// ============================================================================
// Search Tests
// ============================================================================

#[test]
fn test_satisfy_with_nested_patterns() {
    let kb = TermSpace::with_terms(vec![
        Term::evaluation(
            Term::predicate("likes"),
            vec![Term::concept("alice"), Term::concept("bob")],
        ),
        Term::evaluation(
            Term::predicate("likes"),
            vec![Term::concept("bob"), Term::concept("carol")],
        ),
        Term::evaluation(
            Term::predicate("knows"),
            vec![Term::concept("alice"), Term::concept("carol")],
        ),
    ]);

    let clauses = vec![Term::evaluation(
        Term::predicate("likes"),
        vec![Term::variable("a"), Term::variable("b")],
    )];
    let vars = VariableDecl::from_names(["a", "b"]);

    let found = pattern::satisfy(&clauses, &vars, &kb).unwrap();
    let liked: Vec<&Term> = found.iter().filter_map(|b| b.get("b")).collect();
    assert_eq!(liked, vec![&Term::concept("bob"), &Term::concept("carol")]);
}

#[test]
fn test_instantiate_after_search() {
    let kb = TermSpace::with_terms(vec![inh("a", "b"), inh("b", "c")]);
    let clauses = vec![
        Term::inheritance(Term::variable("x"), Term::variable("y")),
        Term::inheritance(Term::variable("y"), Term::variable("z")),
    ];
    let vars = VariableDecl::from_names(["x", "y", "z"]);
    let implicand = Term::inheritance(Term::variable("x"), Term::variable("z"));

    let products: Vec<Term> = pattern::satisfy(&clauses, &vars, &kb)
        .unwrap()
        .iter()
        .map(|b| pattern::instantiate(&implicand, b, &vars).unwrap())
        .collect();
    assert_eq!(products, vec![inh("a", "c")]);

    let err = pattern::instantiate(&implicand, &Bindings::new(), &vars).unwrap_err();
    assert!(matches!(err, Error::UnboundVariable(..)));
}

#[test]
fn test_unify_rule_clause_with_pattern_source() {
    // The source `(Inheritance cat $_)` is itself a pattern.
    let source = Term::inheritance(Term::concept("cat"), Term::variable("_"));
    let source_vars = VariableDecl::from_names(["_"]);
    let clause = Term::inheritance(Term::variable("x"), Term::variable("y"));
    let clause_vars = VariableDecl::from_names(["x", "y"]);

    let mut b = Bindings::new();
    assert!(pattern::unify(&clause, &clause_vars, &source, &source_vars, &mut b));
    assert_eq!(b.len(), 1);
    assert_eq!(b.to_string(), r#"{$x=(Concept "cat")}"#);
}
