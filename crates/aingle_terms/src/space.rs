//! Term stores.
//!
//! [`TermSpace`] is a thread-safe, insertion-ordered set of terms.
//! [`ScopedSpace`] is a child scope layered over a parent store: everything
//! the parent holds is visible through the scope, while terms added to the
//! scope stay local to it and disappear with it.

use crate::Term;
use indexmap::IndexSet;
use log::trace;
use parking_lot::RwLock;
use std::sync::Arc;

/// The knowledge base contract consumed by reasoning engines.
///
/// Implementations must be safe for concurrent insert-if-absent.
pub trait KnowledgeBase: Send + Sync {
    /// Adds `term` if it is not already present and returns the stored term.
    fn add(&self, term: Term) -> Term;

    /// Returns the stored term structurally equal to `term`, if any.
    fn lookup(&self, term: &Term) -> Option<Term>;

    /// Returns `true` if a structurally equal term is stored.
    fn contains(&self, term: &Term) -> bool {
        self.lookup(term).is_some()
    }

    /// Returns a snapshot of all visible terms.
    fn terms(&self) -> Vec<Term>;

    /// Number of visible terms.
    fn len(&self) -> usize;

    /// Returns `true` if no term is visible.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: KnowledgeBase + ?Sized> KnowledgeBase for Arc<T> {
    fn add(&self, term: Term) -> Term {
        (**self).add(term)
    }

    fn lookup(&self, term: &Term) -> Option<Term> {
        (**self).lookup(term)
    }

    fn contains(&self, term: &Term) -> bool {
        (**self).contains(term)
    }

    fn terms(&self) -> Vec<Term> {
        (**self).terms()
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}

/// An in-memory term store.
///
/// # Examples
///
/// ```
/// use aingle_terms::{KnowledgeBase, Term, TermSpace};
///
/// let space = TermSpace::new();
/// space.add(Term::concept("cat"));
/// space.add(Term::concept("cat"));
///
/// assert_eq!(space.len(), 1);
/// assert!(space.contains(&Term::concept("cat")));
/// ```
#[derive(Debug, Default)]
pub struct TermSpace {
    name: String,
    terms: RwLock<IndexSet<Term>>,
}

impl TermSpace {
    /// Creates an empty, unnamed store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store with a name used in log output.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            terms: RwLock::new(IndexSet::new()),
        }
    }

    /// Creates a store holding `terms`.
    pub fn with_terms(terms: impl IntoIterator<Item = Term>) -> Self {
        let space = Self::new();
        space.add_all(terms);
        space
    }

    /// Adds every term in `terms`. Returns how many were new.
    pub fn add_all(&self, terms: impl IntoIterator<Item = Term>) -> usize {
        let mut guard = self.terms.write();
        terms.into_iter().filter(|t| guard.insert(t.clone())).count()
    }

    /// The store name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Removes every term.
    pub fn clear(&self) {
        self.terms.write().clear();
    }

    fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "space"
        } else {
            &self.name
        }
    }
}

impl KnowledgeBase for TermSpace {
    fn add(&self, term: Term) -> Term {
        {
            let terms = self.terms.read();
            if let Some(existing) = terms.get(&term) {
                return existing.clone();
            }
        }
        let mut terms = self.terms.write();
        // Another writer may have won the race between the two locks.
        let (index, inserted) = terms.insert_full(term);
        if inserted {
            trace!("{} += {}", self.display_name(), terms[index]);
        }
        terms[index].clone()
    }

    fn lookup(&self, term: &Term) -> Option<Term> {
        self.terms.read().get(term).cloned()
    }

    fn contains(&self, term: &Term) -> bool {
        self.terms.read().contains(term)
    }

    fn terms(&self) -> Vec<Term> {
        self.terms.read().iter().cloned().collect()
    }

    fn len(&self) -> usize {
        self.terms.read().len()
    }
}

/// A child scope over a parent store.
///
/// Lookups see the parent and the scope; additions of terms the parent does
/// not already hold land in the scope only.
pub struct ScopedSpace<'a> {
    parent: &'a dyn KnowledgeBase,
    local: TermSpace,
}

impl<'a> ScopedSpace<'a> {
    /// Opens a scope over `parent`.
    pub fn new(parent: &'a dyn KnowledgeBase) -> Self {
        Self {
            parent,
            local: TermSpace::named("scope"),
        }
    }

    /// The terms added to this scope that the parent does not hold.
    pub fn local(&self) -> &TermSpace {
        &self.local
    }

    /// The parent store.
    pub fn parent(&self) -> &'a dyn KnowledgeBase {
        self.parent
    }
}

impl KnowledgeBase for ScopedSpace<'_> {
    fn add(&self, term: Term) -> Term {
        match self.parent.lookup(&term) {
            Some(existing) => existing,
            None => self.local.add(term),
        }
    }

    fn lookup(&self, term: &Term) -> Option<Term> {
        self.local.lookup(term).or_else(|| self.parent.lookup(term))
    }

    fn terms(&self) -> Vec<Term> {
        let mut terms = self.parent.terms();
        terms.extend(self.local.terms());
        terms
    }

    fn len(&self) -> usize {
        self.parent.len() + self.local.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_is_idempotent() {
        let space = TermSpace::named("kb");
        let t = Term::inheritance(Term::concept("a"), Term::concept("b"));
        assert_eq!(space.add(t.clone()), t);
        space.add(t.clone());
        assert_eq!(space.len(), 1);
        assert_eq!(space.lookup(&t), Some(t));
        assert_eq!(space.name(), "kb");
    }

    #[test]
    fn test_insertion_order() {
        let space = TermSpace::with_terms(vec![Term::concept("z"), Term::concept("a")]);
        assert_eq!(space.terms(), vec![Term::concept("z"), Term::concept("a")]);
        assert_eq!(space.add_all(vec![Term::concept("a"), Term::concept("m")]), 1);
    }

    #[test]
    fn test_scope_isolation() {
        let parent = TermSpace::with_terms(vec![Term::concept("a")]);
        {
            let scope = ScopedSpace::new(&parent);
            scope.add(Term::concept("a"));
            scope.add(Term::concept("tmp"));

            assert!(scope.contains(&Term::concept("a")));
            assert!(scope.contains(&Term::concept("tmp")));
            assert_eq!(scope.local().len(), 1);
            assert_eq!(scope.len(), 2);
        }
        assert!(!parent.contains(&Term::concept("tmp")));
        assert_eq!(parent.len(), 1);
    }

    #[test]
    fn test_concurrent_insert_if_absent() {
        let space = Arc::new(TermSpace::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let space = space.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        space.add(Term::concept(format!("n{}", i)));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(space.len(), 50);
    }

    #[test]
    fn test_arc_is_a_knowledge_base() {
        let kb: Arc<dyn KnowledgeBase> = Arc::new(TermSpace::new());
        kb.add(Term::concept("x"));
        assert!(kb.contains(&Term::concept("x")));
        assert!(!kb.is_empty());
    }
}
