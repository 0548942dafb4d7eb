//! Unification and pattern matching over terms.
//!
//! Patterns are terms whose declared variables stand for arbitrary
//! sub-terms. Matching binds those variables; [`satisfy`] searches a store
//! for every grounding of a conjunction of clauses.

use crate::{Error, KnowledgeBase, Result, Term, VariableDecl};
use std::collections::BTreeMap;
use std::fmt;

/// Variable bindings produced by matching.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Bindings {
    values: BTreeMap<String, Term>,
}

impl Bindings {
    /// Create empty bindings
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a variable to a term
    pub fn bind(&mut self, var: impl Into<String>, value: Term) {
        self.values.insert(var.into(), value);
    }

    /// Get a bound term
    pub fn get(&self, var: &str) -> Option<&Term> {
        self.values.get(var)
    }

    /// Check if a variable is bound
    pub fn is_bound(&self, var: &str) -> bool {
        self.values.contains_key(var)
    }

    /// Extend with another set of bindings
    pub fn extend(&mut self, other: &Bindings) {
        self.values
            .extend(other.values.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    /// Iterate bindings in variable-name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Term)> {
        self.values.iter()
    }

    /// Number of bound variables
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Clear all bindings
    pub fn clear(&mut self) {
        self.values.clear();
    }
}

impl fmt::Display for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self
            .values
            .iter()
            .map(|(k, v)| format!("${}={}", k, v))
            .collect();
        write!(f, "{{{}}}", pairs.join(", "))
    }
}

/// Unifies `pattern` against `term`.
///
/// Variables declared in `pattern_vars` bind to the sub-term at their
/// position, consistently with `bindings`. Variables of `term` declared in
/// `term_vars` (the term is itself a pattern) match anything without
/// binding. Undeclared variables on either side compare literally.
///
/// On success the new bindings are merged into `bindings`; on failure
/// `bindings` is left untouched.
pub fn unify(
    pattern: &Term,
    pattern_vars: &VariableDecl,
    term: &Term,
    term_vars: &VariableDecl,
    bindings: &mut Bindings,
) -> bool {
    let mut scratch = bindings.clone();
    if unify_into(pattern, pattern_vars, term, term_vars, &mut scratch) {
        *bindings = scratch;
        true
    } else {
        false
    }
}

/// One-way match of `pattern` against a ground `term`.
pub fn match_term(
    pattern: &Term,
    pattern_vars: &VariableDecl,
    term: &Term,
    bindings: &mut Bindings,
) -> bool {
    unify(pattern, pattern_vars, term, &VariableDecl::new(), bindings)
}

fn unify_into(
    pattern: &Term,
    pattern_vars: &VariableDecl,
    term: &Term,
    term_vars: &VariableDecl,
    bindings: &mut Bindings,
) -> bool {
    if let Term::Variable(name) = term {
        if term_vars.contains(name) {
            return true;
        }
    }

    match pattern {
        Term::Variable(var) if pattern_vars.contains(var) => match bindings.get(var) {
            Some(bound) => bound == term,
            None => {
                bindings.bind(var.clone(), term.clone());
                true
            }
        },
        Term::Link { kind, outgoing } => match term {
            Term::Link {
                kind: term_kind,
                outgoing: term_outgoing,
            } => {
                kind == term_kind
                    && outgoing.len() == term_outgoing.len()
                    && outgoing
                        .iter()
                        .zip(term_outgoing)
                        .all(|(p, t)| unify_into(p, pattern_vars, t, term_vars, bindings))
            }
            _ => false,
        },
        _ => pattern == term,
    }
}

/// Replaces every bound variable in `term` by its binding.
pub fn substitute(term: &Term, bindings: &Bindings) -> Term {
    match term {
        Term::Variable(var) => bindings.get(var).cloned().unwrap_or_else(|| term.clone()),
        Term::Link { kind, outgoing } => Term::Link {
            kind: kind.clone(),
            outgoing: outgoing.iter().map(|t| substitute(t, bindings)).collect(),
        },
        Term::Node { .. } => term.clone(),
    }
}

/// Substitutes `bindings` into `term` and fails if a variable of `varset`
/// is left free.
pub fn instantiate(term: &Term, bindings: &Bindings, varset: &VariableDecl) -> Result<Term> {
    let grounded = substitute(term, bindings);
    if let Some(free) = varset.iter().find(|v| grounded.contains_variable(v)) {
        return Err(Error::UnboundVariable(free.clone(), grounded.to_string()));
    }
    Ok(grounded)
}

/// Returns `true` if `clause` mentions none of the variables in `varset`.
pub fn is_constant(varset: &VariableDecl, clause: &Term) -> bool {
    !varset.iter().any(|v| clause.contains_variable(v))
}

/// Finds every grounding of the conjunction `clauses` in `store`.
///
/// Clauses are solved left to right. A constant clause (after substituting
/// the bindings found so far) must be present in the store; any other clause
/// is matched against each stored term. A clause that is a bare variable
/// still unbound at its turn cannot be searched and is reported as
/// [`Error::MalformedPattern`].
///
/// An empty conjunction is satisfied once, by the empty bindings.
pub fn satisfy(
    clauses: &[Term],
    varset: &VariableDecl,
    store: &dyn KnowledgeBase,
) -> Result<Vec<Bindings>> {
    let candidates = store.terms();
    let mut groundings = Vec::new();
    solve(
        clauses,
        varset,
        store,
        &candidates,
        Bindings::new(),
        &mut groundings,
    )?;
    Ok(groundings)
}

fn solve(
    clauses: &[Term],
    varset: &VariableDecl,
    store: &dyn KnowledgeBase,
    candidates: &[Term],
    bindings: Bindings,
    groundings: &mut Vec<Bindings>,
) -> Result<()> {
    let Some((first, rest)) = clauses.split_first() else {
        if !groundings.contains(&bindings) {
            groundings.push(bindings);
        }
        return Ok(());
    };

    let clause = substitute(first, &bindings);
    if let Term::Variable(var) = &clause {
        if varset.contains(var) {
            return Err(Error::MalformedPattern(format!(
                "clause ${} is an unbound bare variable",
                var
            )));
        }
    }

    if is_constant(varset, &clause) {
        if store.contains(&clause) {
            solve(rest, varset, store, candidates, bindings, groundings)?;
        }
        return Ok(());
    }

    for candidate in candidates {
        let mut extended = bindings.clone();
        if match_term(&clause, varset, candidate, &mut extended) {
            solve(rest, varset, store, candidates, extended, groundings)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TermSpace;

    fn vars(names: &[&str]) -> VariableDecl {
        VariableDecl::from_names(names.iter().copied())
    }

    fn inh(a: &str, b: &str) -> Term {
        Term::inheritance(Term::concept(a), Term::concept(b))
    }

    #[test]
    fn test_match_binds_consistently() {
        let pattern = Term::inheritance(Term::variable("x"), Term::variable("x"));
        let mut b = Bindings::new();
        assert!(!match_term(&pattern, &vars(&["x"]), &inh("a", "b"), &mut b));
        assert!(b.is_empty());
        assert!(match_term(&pattern, &vars(&["x"]), &inh("a", "a"), &mut b));
        assert_eq!(b.get("x"), Some(&Term::concept("a")));
    }

    #[test]
    fn test_undeclared_variable_is_literal() {
        let pattern = Term::inheritance(Term::variable("x"), Term::concept("b"));
        let mut b = Bindings::new();
        assert!(!match_term(&pattern, &VariableDecl::new(), &inh("a", "b"), &mut b));
        assert!(match_term(
            &pattern,
            &VariableDecl::new(),
            &Term::inheritance(Term::variable("x"), Term::concept("b")),
            &mut b
        ));
    }

    #[test]
    fn test_unify_with_pattern_source() {
        let pattern = Term::inheritance(Term::variable("x"), Term::variable("y"));
        let source = Term::inheritance(Term::concept("a"), Term::variable("s"));
        let mut b = Bindings::new();
        assert!(unify(&pattern, &vars(&["x", "y"]), &source, &vars(&["s"]), &mut b));
        assert_eq!(b.get("x"), Some(&Term::concept("a")));
        assert!(!b.is_bound("y"));
    }

    #[test]
    fn test_substitute_and_instantiate() {
        let mut b = Bindings::new();
        b.bind("x", Term::concept("a"));
        let t = Term::inheritance(Term::variable("x"), Term::variable("y"));
        assert_eq!(
            substitute(&t, &b),
            Term::inheritance(Term::concept("a"), Term::variable("y"))
        );
        assert!(matches!(
            instantiate(&t, &b, &vars(&["x", "y"])),
            Err(Error::UnboundVariable(v, _)) if v == "y"
        ));
        b.bind("y", Term::concept("b"));
        assert_eq!(instantiate(&t, &b, &vars(&["x", "y"])).unwrap(), inh("a", "b"));
    }

    #[test]
    fn test_is_constant() {
        let t = Term::inheritance(Term::variable("x"), Term::concept("b"));
        assert!(!is_constant(&vars(&["x"]), &t));
        assert!(is_constant(&vars(&["y"]), &t));
    }

    #[test]
    fn test_satisfy_joins_clauses() {
        let store = TermSpace::with_terms(vec![inh("a", "b"), inh("b", "c"), inh("c", "d")]);
        let clauses = vec![
            Term::inheritance(Term::variable("x"), Term::variable("y")),
            Term::inheritance(Term::variable("y"), Term::variable("z")),
        ];
        let found = satisfy(&clauses, &vars(&["x", "y", "z"]), &store).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found
            .iter()
            .any(|b| b.get("x") == Some(&Term::concept("a")) && b.get("z") == Some(&Term::concept("c"))));
    }

    #[test]
    fn test_satisfy_constant_clause() {
        let store = TermSpace::with_terms(vec![inh("a", "b")]);
        let ok = satisfy(&[inh("a", "b")], &VariableDecl::new(), &store).unwrap();
        assert_eq!(ok, vec![Bindings::new()]);
        let none = satisfy(&[inh("a", "z")], &VariableDecl::new(), &store).unwrap();
        assert!(none.is_empty());
        let empty = satisfy(&[], &VariableDecl::new(), &store).unwrap();
        assert_eq!(empty.len(), 1);
    }

    #[test]
    fn test_satisfy_bare_variable() {
        let store = TermSpace::with_terms(vec![
            Term::implication(Term::concept("p"), Term::concept("q")),
            Term::concept("p"),
        ]);
        // Bound by the first clause, so the bare variable is a lookup.
        let clauses = vec![
            Term::implication(Term::variable("p"), Term::variable("q")),
            Term::variable("p"),
        ];
        let found = satisfy(&clauses, &vars(&["p", "q"]), &store).unwrap();
        assert_eq!(found.len(), 1);

        let reversed: Vec<Term> = clauses.into_iter().rev().collect();
        assert!(matches!(
            satisfy(&reversed, &vars(&["p", "q"]), &store),
            Err(Error::MalformedPattern(_))
        ));
    }
}
