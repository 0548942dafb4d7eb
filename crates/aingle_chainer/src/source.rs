//! The source pool: premises the chainer may pick next.
//!
//! Every source remembers which rule instances were already applied to it,
//! whether the rule selector found it exhausted, and the accumulated
//! complexity of the derivation that produced it. Complexity drives the
//! selection weight: the longer and less likely the chain behind a source,
//! the less often it is picked.

use aingle_terms::{Term, VariableDecl, SET_KIND};
use indexmap::IndexSet;
use log::trace;

use crate::rule::RuleRef;

/// Information cost charged for a product of a zero-probability rule.
pub const MAX_INFORMATION: f64 = 1024.0;

/// Returns `-log2(prob)`, clamped to [`MAX_INFORMATION`].
pub fn information(prob: f64) -> f64 {
    if prob.is_nan() || prob <= 0.0 {
        MAX_INFORMATION
    } else {
        (-prob.log2()).clamp(0.0, MAX_INFORMATION)
    }
}

/// A premise in the pool.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    /// The premise itself.
    pub body: Term,
    /// Variables of the premise, when the premise is a pattern.
    pub vardecl: Option<VariableDecl>,
    /// Rule instances already applied to this premise.
    pub rules: IndexSet<RuleRef>,
    /// Set when no valid rule is left for this premise.
    pub exhausted: bool,
    /// Accumulated information cost of the derivation of this premise.
    pub complexity: f64,
    /// Set while a step is processing this premise.
    pub(crate) claimed: bool,
}

impl Source {
    /// Creates a fresh source with no derivation cost.
    pub fn new(body: Term, vardecl: Option<VariableDecl>) -> Self {
        Self::with_complexity(body, vardecl, 0.0)
    }

    /// Creates a source derived at the given cost.
    ///
    /// # Arguments
    ///
    /// * `body` - The premise.
    /// * `vardecl` - The premise's variables, if it is a pattern.
    /// * `complexity` - Accumulated information cost of its derivation.
    pub fn with_complexity(body: Term, vardecl: Option<VariableDecl>, complexity: f64) -> Self {
        Self {
            body,
            vardecl,
            rules: IndexSet::new(),
            exhausted: false,
            complexity,
            claimed: false,
        }
    }

    /// Complexity of a source derived from this one by a rule with
    /// success probability `prob`.
    pub fn expand_complexity(&self, prob: f64) -> f64 {
        self.complexity + information(prob)
    }

    /// Returns `true` if `rule` was already applied to this source.
    pub fn has_applied(&self, rule: &RuleRef) -> bool {
        self.rules.contains(rule)
    }

    /// Returns `true` while some step is processing this source.
    pub fn is_claimed(&self) -> bool {
        self.claimed
    }
}

/// The pool of sources.
#[derive(Debug, Clone, Default)]
pub struct Sources {
    sources: Vec<Source>,
    bodies: IndexSet<Term>,
    exhausted: bool,
    complexity_penalty: f64,
}

impl Sources {
    /// Creates the pool from the initial source.
    ///
    /// A `Set` link is unpacked: each member becomes a source, and an empty
    /// set gives an empty pool.
    pub fn new(source: &Term, vardecl: Option<VariableDecl>) -> Self {
        let members: Vec<Term> = if source.is_link() && source.kind() == Some(SET_KIND) {
            source.outgoing().to_vec()
        } else {
            vec![source.clone()]
        };

        let mut pool = Self::default();
        for body in members {
            pool.push(Source::new(body, vardecl.clone()));
        }
        pool
    }

    /// Sets how strongly selection favors low-complexity sources.
    pub fn with_complexity_penalty(mut self, penalty: f64) -> Self {
        self.complexity_penalty = penalty;
        self
    }

    fn push(&mut self, source: Source) -> bool {
        if self.bodies.insert(source.body.clone()) {
            self.sources.push(source);
            true
        } else {
            false
        }
    }

    /// Selection weight of every source, in pool order.
    ///
    /// Exhausted and claimed sources weigh 0. Others weigh
    /// `exp(-penalty * complexity)`, never less than the smallest positive
    /// float so that a live source always stays reachable.
    pub fn weights(&self) -> Vec<f64> {
        let weights: Vec<f64> = self
            .sources
            .iter()
            .map(|s| {
                if s.exhausted || s.claimed {
                    0.0
                } else {
                    (-self.complexity_penalty * s.complexity)
                        .exp()
                        .max(f64::MIN_POSITIVE)
                }
            })
            .collect();
        trace!("source weights: {:?}", weights);
        weights
    }

    /// Adds the products of a rule applied to the source at `origin` with
    /// success probability `prob`. Returns how many sources were new.
    pub fn insert<'a>(
        &mut self,
        products: impl IntoIterator<Item = &'a Term>,
        origin: usize,
        prob: f64,
    ) -> usize {
        let (complexity, vardecl) = match self.sources.get(origin) {
            Some(src) => (src.expand_complexity(prob), src.vardecl.clone()),
            None => (information(prob), None),
        };

        let mut added = 0;
        for product in products {
            if self.bodies.contains(product) {
                continue;
            }
            let inherited = vardecl
                .as_ref()
                .filter(|decl| decl.iter().any(|v| product.contains_variable(v)))
                .cloned();
            if self.push(Source::with_complexity(product.clone(), inherited, complexity)) {
                added += 1;
            }
        }
        added
    }

    /// Clears the exhaustion flag of every source and of the pool.
    pub fn reset_exhausted(&mut self) {
        for source in &mut self.sources {
            source.exhausted = false;
        }
        self.exhausted = false;
    }

    /// Returns `true` once the selector has given up on the whole pool.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub(crate) fn set_exhausted(&mut self) {
        self.exhausted = true;
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// The source at `index`, in insertion order.
    pub fn get(&self, index: usize) -> Option<&Source> {
        self.sources.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Source> {
        self.sources.get_mut(index)
    }

    /// Iterates over the sources in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter()
    }

    /// Position of the source whose body is `body`.
    pub fn find(&self, body: &Term) -> Option<usize> {
        self.bodies.get_index_of(body)
    }

    /// Returns `true` if some step is processing a source.
    pub fn any_claimed(&self) -> bool {
        self.sources.iter().any(|s| s.claimed)
    }

    pub(crate) fn claim(&mut self, index: usize) {
        if let Some(source) = self.sources.get_mut(index) {
            source.claimed = true;
        }
    }

    pub(crate) fn release(&mut self, index: usize) {
        if let Some(source) = self.sources.get_mut(index) {
            source.claimed = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(name: &str) -> Term {
        Term::concept(name)
    }

    #[test]
    fn test_set_source_is_unpacked() {
        let pool = Sources::new(&Term::set(vec![c("a"), c("b")]), None);
        assert_eq!(pool.len(), 2);
        assert!(Sources::new(&Term::set(vec![]), None).is_empty());
        assert_eq!(Sources::new(&c("a"), None).len(), 1);
        assert_eq!(Sources::new(&Term::list(vec![c("a"), c("b")]), None).len(), 1);
    }

    #[test]
    fn test_exhausted_weighs_zero() {
        let mut pool = Sources::new(&Term::set(vec![c("a"), c("b")]), None);
        pool.get_mut(0).unwrap().exhausted = true;
        assert_eq!(pool.weights(), vec![0.0, 1.0]);

        pool.claim(1);
        assert_eq!(pool.weights(), vec![0.0, 0.0]);
        assert!(pool.any_claimed());
        pool.release(1);
        assert!(!pool.any_claimed());

        pool.reset_exhausted();
        assert_eq!(pool.weights(), vec![1.0, 1.0]);
    }

    #[test]
    fn test_insert_deduplicates_and_accumulates_complexity() {
        let mut pool = Sources::new(&c("a"), None).with_complexity_penalty(1.0);
        let products: IndexSet<Term> = [c("a"), c("b"), c("c")].into_iter().collect();
        assert_eq!(pool.insert(&products, 0, 0.5), 2);
        assert_eq!(pool.insert(&products, 0, 0.5), 0);
        assert_eq!(pool.len(), 3);

        let b = pool.get(pool.find(&c("b")).unwrap()).unwrap();
        assert!((b.complexity - 1.0).abs() < 1e-12);
        let w = pool.weights();
        assert_eq!(w[0], 1.0);
        assert!((w[1] - (-1.0f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_weight_never_underflows() {
        let mut pool = Sources::new(&c("a"), None).with_complexity_penalty(1e6);
        pool.insert([&c("b")], 0, 0.0);
        assert!(pool.weights().iter().all(|w| *w > 0.0));
    }

    #[test]
    fn test_information() {
        assert_eq!(information(1.0), 0.0);
        assert_eq!(information(0.25), 2.0);
        assert_eq!(information(0.0), MAX_INFORMATION);
    }

    #[test]
    fn test_pattern_products_inherit_vardecl() {
        let decl = VariableDecl::from_names(["x"]);
        let mut pool = Sources::new(&Term::inheritance(Term::variable("x"), c("b")), Some(decl));
        let with_var = Term::inheritance(Term::variable("x"), c("c"));
        pool.insert([&with_var, &c("ground")], 0, 1.0);
        assert!(pool.get(1).unwrap().vardecl.is_some());
        assert!(pool.get(2).unwrap().vardecl.is_none());
    }
}
