//! The forward chainer
//!
//! Each step picks a source from the pool, picks a rule valid for that
//! source by Thompson sampling, applies it, and folds the products back into
//! the pool as new sources. Steps repeat until the pool is exhausted, the
//! iteration limit is hit, or the run is cancelled.
//!
//! Up to `jobs` steps run at once. The driver forks a step onto a scoped
//! thread while slots are free, keeps stepping itself, and reclaims each
//! slot when it joins the forked step on the way out.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use aingle_terms::pattern;
use aingle_terms::{KnowledgeBase, ScopedSpace, Term, TermSpace, VariableDecl};
use indexmap::IndexSet;
use log::{debug, trace, warn};
use parking_lot::{Mutex, MutexGuard};
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::ChainerConfig;
use crate::error::{Error, Result};
use crate::registry::RuleRegistry;
use crate::rule::RuleRef;
use crate::source::{Source, Sources};
use crate::stats::{ForwardChainerStats, InferenceRecord};
use crate::thompson::ThompsonSampling;
use crate::truth::TruthValue;

/// Name of the placeholder source recorded when rules are applied without
/// any source.
pub const DUMMY_SOURCE: &str = "dummy-source";

/// Cooperative cancellation flag, checked before every step.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Creates a handle that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Steps already running finish; no new step
    /// starts.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once [`CancelHandle::cancel`] has been called on this
    /// handle or a clone of it.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

struct PoolState {
    sources: Sources,
    rng: StdRng,
}

/// Releases a claimed source when the step that claimed it ends.
struct Claim<'a> {
    pool: &'a Mutex<PoolState>,
    index: usize,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.pool.lock().sources.release(self.index);
    }
}

/// A probabilistic forward chainer over a knowledge base.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use aingle_chainer::{BuiltinRules, ChainerConfig, ForwardChainer};
/// use aingle_terms::{KnowledgeBase, Term, TermSpace};
///
/// # fn main() -> Result<(), aingle_chainer::Error> {
/// let kb = Arc::new(TermSpace::new());
/// let cat_mammal = Term::inheritance(Term::concept("cat"), Term::concept("mammal"));
/// kb.add(cat_mammal.clone());
/// kb.add(Term::inheritance(Term::concept("mammal"), Term::concept("animal")));
///
/// let chainer = ForwardChainer::builder(kb.clone(), vec![BuiltinRules::deduction()])
///     .source(cat_mammal)
///     .config(ChainerConfig::exhaustive().with_seed(7))
///     .build()?;
/// chainer.do_chain();
///
/// let cat_animal = Term::inheritance(Term::concept("cat"), Term::concept("animal"));
/// assert!(chainer.get_results_set().contains(&cat_animal));
/// assert!(kb.contains(&cat_animal));
/// # Ok(())
/// # }
/// ```
pub struct ForwardChainer {
    kb: Arc<dyn KnowledgeBase>,
    /// When set, rules are matched against and produce into this store only.
    focus_set: Option<TermSpace>,
    config: ChainerConfig,
    rules: RuleRegistry,
    /// Sources, their exhaustion and claim flags, and the source RNG.
    pool: Mutex<PoolState>,
    /// Serializes rule validation, rule sampling and meta expansion.
    selection: Mutex<StdRng>,
    stats: Mutex<ForwardChainerStats>,
    iteration: AtomicUsize,
    jobs: AtomicUsize,
    cancel: CancelHandle,
}

impl ForwardChainer {
    /// Starts building a chainer.
    ///
    /// # Arguments
    ///
    /// * `kb` - The knowledge base rules are matched against and produce into.
    /// * `rules` - The initial rule set. Rules with the same id are kept once.
    pub fn builder(
        kb: Arc<dyn KnowledgeBase>,
        rules: impl IntoIterator<Item = RuleRef>,
    ) -> ForwardChainerBuilder {
        ForwardChainerBuilder::new(kb, rules)
    }

    /// Runs the chainer to termination.
    pub fn do_chain(&self) {
        debug!("Start Forward Chaining");
        debug!(
            "With rule set: [{}]",
            self.rules
                .snapshot()
                .iter()
                .map(|r| r.name().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let no_sources = self.pool.lock().sources.is_empty();
        if no_sources {
            self.apply_all_rules();
            return;
        }

        thread::scope(|scope| self.do_step_rec(scope));
        debug!("Finished Forward Chaining");
    }

    /// Alias of [`ForwardChainer::do_chain`].
    pub fn run(&self) {
        self.do_chain();
    }

    fn do_step_rec<'scope, 'env>(&'env self, scope: &'scope thread::Scope<'scope, 'env>) {
        while let Some(iteration) = self.next_iteration() {
            if self.jobs.load(Ordering::SeqCst) + 1 < self.config.jobs {
                self.jobs.fetch_add(1, Ordering::SeqCst);
                let step = scope.spawn(move || self.do_step(iteration));
                self.do_step_rec(scope);
                if step.join().is_err() {
                    warn!("Iteration {} panicked", iteration + 1);
                }
                self.jobs.fetch_sub(1, Ordering::SeqCst);
                return;
            }
            if !self.do_step(iteration) {
                // Nothing was free to work on; the number is reused.
                self.iteration.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }

    /// Reserves the next iteration number, or returns `None` once the run
    /// must stop. Only the driver calls this, so the number of steps never
    /// exceeds the limit. A step that found every source busy hands its
    /// number back.
    fn next_iteration(&self) -> Option<usize> {
        if self.termination() {
            None
        } else {
            Some(self.iteration.fetch_add(1, Ordering::SeqCst))
        }
    }

    /// Returns `true` if the run must stop.
    pub fn termination(&self) -> bool {
        let reason = if self.cancel.is_cancelled() {
            Some("cancelled")
        } else if self.pool.lock().sources.is_exhausted() {
            Some("all sources have been exhausted")
        } else if self.config.is_bounded()
            && (self.config.maximum_iterations as u64) <= (self.iteration() as u64)
        {
            Some("reach maximum number of iterations")
        } else {
            None
        };

        match reason {
            Some(msg) => {
                debug!("Terminate: {}", msg);
                true
            }
            None => false,
        }
    }

    /// Runs one step. Returns `false` if the step found every live source
    /// claimed by other steps and did nothing.
    fn do_step(&self, iteration: usize) -> bool {
        debug!(
            "Iteration {}/{}",
            iteration + 1,
            self.config.maximum_iterations_str()
        );

        self.expand_meta_rules();

        let Some(index) = self.select_source() else {
            debug!("No source selected, abort iteration");
            let pool = self.pool.lock();
            let busy = !pool.sources.is_exhausted() && pool.sources.any_claimed();
            drop(pool);
            thread::yield_now();
            return !busy;
        };
        let _claim = Claim {
            pool: &self.pool,
            index,
        };

        let Some(source) = self.source_at(index) else {
            return true;
        };
        debug!("Selected source: {}", source.body);

        let Some((rule, prob)) = self.select_rule_at(index, &source) else {
            debug!("No selected rule, abort iteration");
            return true;
        };
        debug!(
            "Selected rule {}, with probability {} of success",
            rule, prob
        );

        let Some(products) = self.apply_rule_on_source(&rule, index) else {
            return true;
        };

        self.pool.lock().sources.insert(&products, index, prob);
        self.stats
            .lock()
            .add_inference_record(iteration, &source.body, &rule, products);
        true
    }

    fn expand_meta_rules(&self) {
        let _selection = self.selection.lock();
        let before = self.rules.len();
        self.rules.expand_meta_rules(self.kb.as_ref());
        let after = self.rules.len();
        if before != after {
            debug!("The rule set has gone from {} rules to {}", before, after);
        }
    }

    fn source_at(&self, index: usize) -> Option<Source> {
        self.pool.lock().sources.get(index).cloned()
    }

    /// Samples a source by weight and claims it.
    ///
    /// On zero total weight with some source claimed by another step, gives
    /// up without touching exhaustion state. Otherwise resets the exhaustion
    /// flags once if retrying is enabled, and failing that marks the pool
    /// exhausted.
    fn select_source(&self) -> Option<usize> {
        let mut pool = self.pool.lock();
        let mut retried = false;
        loop {
            let weights = pool.sources.weights();
            let positive = weights.iter().filter(|w| **w > 0.0).count();
            debug!(
                "Positively weighted sources ({}/{})",
                positive,
                weights.len()
            );

            let total: f64 = weights.iter().sum();
            if total > 0.0 {
                let PoolState { sources, rng } = &mut *pool;
                let index = match WeightedIndex::new(&weights) {
                    Ok(dist) => dist.sample(rng),
                    Err(e) => {
                        warn!("Cannot sample sources: {}", e);
                        return None;
                    }
                };
                sources.claim(index);
                return Some(index);
            }

            if pool.sources.any_claimed() {
                debug!("Every live source is being processed");
                return None;
            }

            debug!("All sources have been exhausted");
            if self.config.retry_exhausted_sources && !retried && !pool.sources.is_empty() {
                debug!("Reset all exhausted flags to retry them");
                pool.sources.reset_exhausted();
                retried = true;
                continue;
            }

            pool.sources.set_exhausted();
            return None;
        }
    }

    /// The store rules are matched against.
    fn reference_store(&self) -> &dyn KnowledgeBase {
        match &self.focus_set {
            Some(focus_set) => focus_set,
            None => self.kb.as_ref(),
        }
    }

    /// Returns the rule instances that may still be applied to `source`.
    ///
    /// Meta rules are skipped. With rule specialization, every specialized
    /// instance not yet applied to the source is valid; without it, the
    /// unaltered rule is valid if it unifies with the source at all and was
    /// not applied to it yet.
    pub fn get_valid_rules(&self, source: &Source) -> Vec<RuleRef> {
        let store = self.reference_store();
        let mut valid: IndexSet<RuleRef> = IndexSet::new();

        for rule in self.rules.snapshot().iter() {
            if rule.is_meta() {
                continue;
            }
            let instances = match rule.unify_source(&source.body, source.vardecl.as_ref(), store)
            {
                Ok(instances) => instances,
                Err(e) => {
                    debug!("Rule {} does not unify with {}: {}", rule, source.body, e);
                    continue;
                }
            };

            if self.config.rule_specialization {
                valid.extend(instances.into_iter().filter(|r| !source.has_applied(r)));
            } else if !instances.is_empty() && !source.has_applied(rule) {
                valid.insert(rule.clone());
            }
        }

        valid.into_iter().collect()
    }

    fn select_rule_at(&self, index: usize, source: &Source) -> Option<(RuleRef, f64)> {
        let mut rng = self.selection.lock();
        let valid = self.get_valid_rules(source);
        if valid.is_empty() {
            debug!("No valid rule");
            if let Some(source) = self.pool.lock().sources.get_mut(index) {
                source.exhausted = true;
            }
            return None;
        }
        debug!(
            "The following rules are valid: [{}]",
            valid
                .iter()
                .map(|r| r.name().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Some(self.sample_rule(&valid, &mut *rng))
    }

    /// Selects a rule for a bare term, as if it were a fresh source.
    pub fn select_rule_for(&self, term: &Term) -> Option<(RuleRef, f64)> {
        let mut rng = self.selection.lock();
        let valid = self.get_valid_rules(&Source::new(term.clone(), None));
        if valid.is_empty() {
            return None;
        }
        Some(self.sample_rule(&valid, &mut *rng))
    }

    /// Thompson-samples one of `valid` and returns it with the mean of its
    /// success distribution.
    fn sample_rule<R: Rng + ?Sized>(&self, valid: &[RuleRef], rng: &mut R) -> (RuleRef, f64) {
        let tvs: Vec<TruthValue> = valid.iter().map(|r| r.truth_value()).collect();
        let weights = ThompsonSampling::new(&tvs)
            .with_trials(self.config.thompson_trials)
            .distribution(rng);
        for (rule, weight) in valid.iter().zip(&weights) {
            trace!("Rule weight {} {}", weight, rule);
        }

        let index = WeightedIndex::new(&weights)
            .map(|dist| dist.sample(rng))
            .unwrap_or(0);
        let rule = valid[index].clone();
        let prob = rule.success_distribution().mean();
        (rule, prob)
    }

    /// Records `rule` as applied to the source at `index` and applies it.
    /// Returns `None` if the pair was already applied.
    fn apply_rule_on_source(&self, rule: &RuleRef, index: usize) -> Option<IndexSet<Term>> {
        {
            let mut pool = self.pool.lock();
            let source = pool.sources.get_mut(index)?;
            if !source.rules.insert(rule.clone()) {
                debug!("Rule {} was already applied to {}", rule, source.body);
                return None;
            }
        }
        Some(self.apply_rule(rule))
    }

    /// Applies `rule` against the reference store and returns the products.
    ///
    /// The rule body is added to a child scope of the reference store, and
    /// the rule runs against that scope. The body and anything the rule
    /// adds while running stay local to the scope. A constant clause that the reference store does not
    /// hold makes the result empty. `Set` and `List` products are unpacked.
    /// Products are added to the focus set in focus-set mode, to the
    /// knowledge base otherwise. A failing rule yields an empty result.
    pub fn apply_rule(&self, rule: &RuleRef) -> IndexSet<Term> {
        let store = self.reference_store();
        let mut results = IndexSet::new();

        let scope = ScopedSpace::new(store);
        scope.add(rule.body());

        let varset = rule.variables();
        if let Some(missing) = rule
            .clauses()
            .iter()
            .find(|c| pattern::is_constant(varset, c) && !store.contains(c))
        {
            debug!("Constant clause {} is absent, nothing to apply", missing);
            return results;
        }

        let produced = match rule.apply(&scope) {
            Ok(produced) => produced,
            Err(e) => {
                warn!("Rule {} failed: {}", rule, e);
                return results;
            }
        };

        for term in produced {
            if term.is_collection() {
                for member in term.outgoing() {
                    results.insert(store.add(member.clone()));
                }
            } else {
                results.insert(store.add(term));
            }
        }

        debug!(
            "Results: [{}]",
            results
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );
        results
    }

    /// Applies every registered rule once, recording each application
    /// against a placeholder source.
    pub fn apply_all_rules(&self) {
        let dummy = self.kb.add(Term::concept(DUMMY_SOURCE));
        for rule in self.rules.snapshot().iter() {
            debug!("Apply rule {}", rule);
            let products = self.apply_rule(rule);
            self.stats
                .lock()
                .add_inference_record(self.iteration(), &dummy, rule, products);
        }
    }

    /// Every product so far, as a `Set` link.
    pub fn get_results(&self) -> Term {
        Term::set(self.get_results_set())
    }

    /// Every product so far, in order of first production.
    pub fn get_results_set(&self) -> IndexSet<Term> {
        self.stats.lock().get_all_products().clone()
    }

    /// A copy of every inference record so far.
    pub fn inference_records(&self) -> Vec<InferenceRecord> {
        self.stats.lock().records().to_vec()
    }

    /// Locks and returns the trace. Do not hold it across a call to
    /// [`ForwardChainer::do_chain`].
    pub fn stats(&self) -> MutexGuard<'_, ForwardChainerStats> {
        self.stats.lock()
    }

    /// The number of iterations reserved so far. Steps that found every
    /// source busy are not counted.
    pub fn iteration(&self) -> usize {
        self.iteration.load(Ordering::SeqCst)
    }

    /// A copy of the source pool.
    pub fn sources(&self) -> Sources {
        self.pool.lock().sources.clone()
    }

    /// The current rule set, including rules generated by meta rules.
    pub fn rules(&self) -> Arc<[RuleRef]> {
        self.rules.snapshot()
    }

    /// Retrieves the configuration the chainer runs with.
    pub fn config(&self) -> &ChainerConfig {
        &self.config
    }

    /// The focus set, or `None` when the whole knowledge base is searched.
    pub fn focus_set(&self) -> Option<&TermSpace> {
        self.focus_set.as_ref()
    }

    /// Returns `true` if the chainer works within a focus set.
    pub fn is_focus_set_search(&self) -> bool {
        self.focus_set.is_some()
    }

    /// A handle that cancels this chainer, also from another thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }
}

impl fmt::Debug for ForwardChainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForwardChainer")
            .field("config", &self.config)
            .field("rules", &self.rules.len())
            .field("sources", &self.pool.lock().sources.len())
            .field("focus_set", &self.is_focus_set_search())
            .field("iteration", &self.iteration())
            .finish()
    }
}

/// Builder for [`ForwardChainer`].
pub struct ForwardChainerBuilder {
    kb: Arc<dyn KnowledgeBase>,
    rules: Vec<RuleRef>,
    source: Option<Term>,
    vardecl: Option<VariableDecl>,
    focus_set: Vec<Term>,
    trace: Option<Arc<dyn KnowledgeBase>>,
    config: ChainerConfig,
    cancel: CancelHandle,
}

impl ForwardChainerBuilder {
    /// Creates a builder with the default configuration and no source.
    ///
    /// # Arguments
    ///
    /// * `kb` - The knowledge base.
    /// * `rules` - The initial rule set.
    pub fn new(kb: Arc<dyn KnowledgeBase>, rules: impl IntoIterator<Item = RuleRef>) -> Self {
        Self {
            kb,
            rules: rules.into_iter().collect(),
            source: None,
            vardecl: None,
            focus_set: Vec::new(),
            trace: None,
            config: ChainerConfig::default(),
            cancel: CancelHandle::default(),
        }
    }

    /// The initial source. A `Set` link gives one source per member.
    pub fn source(mut self, source: Term) -> Self {
        self.source = Some(source);
        self
    }

    /// Declares the variables of a pattern source.
    pub fn vardecl(mut self, vardecl: VariableDecl) -> Self {
        self.vardecl = Some(vardecl);
        self
    }

    /// Restricts matching and production to these terms plus the sources.
    /// An empty focus set searches the whole knowledge base.
    pub fn focus_set(mut self, terms: impl IntoIterator<Item = Term>) -> Self {
        self.focus_set.extend(terms);
        self
    }

    /// Records every inference as an `Execution` term in `trace`.
    pub fn trace(mut self, trace: Arc<dyn KnowledgeBase>) -> Self {
        self.trace = Some(trace);
        self
    }

    /// Sets the configuration, replacing the default one.
    pub fn config(mut self, config: ChainerConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses an existing cancellation flag instead of a fresh one.
    pub fn cancel_handle(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    /// Validates the configuration and creates the chainer.
    ///
    /// Fails with [`Error::InvalidConfig`] if the configuration is out of
    /// range, and with [`Error::InvalidSource`] if no source was given.
    pub fn build(self) -> Result<ForwardChainer> {
        self.config.validate()?;
        let source = self
            .source
            .ok_or_else(|| Error::InvalidSource("no source given".to_string()))?;

        let sources = Sources::new(&source, self.vardecl)
            .with_complexity_penalty(self.config.complexity_penalty);

        let focus_set = if self.focus_set.is_empty() {
            None
        } else {
            let space = TermSpace::named("focus-set");
            space.add_all(self.focus_set);
            space.add_all(sources.iter().map(|s| s.body.clone()));
            Some(space)
        };

        let (pool_rng, selection_rng) = match self.config.random_seed {
            Some(seed) => (
                StdRng::seed_from_u64(seed),
                StdRng::seed_from_u64(seed.wrapping_add(1)),
            ),
            None => (
                StdRng::from_rng(&mut rand::rng()),
                StdRng::from_rng(&mut rand::rng()),
            ),
        };

        let stats = match self.trace {
            Some(trace) => ForwardChainerStats::with_trace(trace),
            None => ForwardChainerStats::new(),
        };

        debug!(
            "Forward chainer over {} source(s), {} rule(s), max iterations {}, {} job(s)",
            sources.len(),
            self.rules.len(),
            self.config.maximum_iterations_str(),
            self.config.jobs
        );

        Ok(ForwardChainer {
            kb: self.kb,
            focus_set,
            rules: RuleRegistry::new(self.rules),
            pool: Mutex::new(PoolState {
                sources,
                rng: pool_rng,
            }),
            selection: Mutex::new(selection_rng),
            stats: Mutex::new(stats),
            iteration: AtomicUsize::new(0),
            jobs: AtomicUsize::new(0),
            cancel: self.cancel,
            config: self.config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::BuiltinRules;
    use crate::rule::PatternRule;

    fn c(name: &str) -> Term {
        Term::concept(name)
    }

    fn inh(a: &str, b: &str) -> Term {
        Term::inheritance(c(a), c(b))
    }

    fn chainer_for(
        kb: Arc<TermSpace>,
        rules: Vec<RuleRef>,
        source: Term,
        config: ChainerConfig,
    ) -> ForwardChainer {
        ForwardChainer::builder(kb, rules)
            .source(source)
            .config(config.with_seed(42))
            .build()
            .unwrap()
    }

    #[test]
    fn test_select_source_skips_zero_weight() {
        let kb = Arc::new(TermSpace::new());
        let fc = chainer_for(kb, vec![], Term::set(vec![c("a"), c("b"), c("c")]), ChainerConfig::default());
        {
            let mut pool = fc.pool.lock();
            pool.sources.get_mut(0).unwrap().exhausted = true;
            pool.sources.get_mut(2).unwrap().exhausted = true;
        }
        let b = fc.pool.lock().sources.find(&c("b")).unwrap();
        for _ in 0..50 {
            let index = fc.select_source().unwrap();
            assert_eq!(index, b);
            fc.pool.lock().sources.release(index);
        }
    }

    #[test]
    fn test_select_source_exhausts_pool_without_retry() {
        let kb = Arc::new(TermSpace::new());
        let fc = chainer_for(kb, vec![], c("a"), ChainerConfig::default());
        fc.pool.lock().sources.get_mut(0).unwrap().exhausted = true;

        assert!(fc.select_source().is_none());
        assert!(fc.pool.lock().sources.is_exhausted());
        assert!(fc.termination());
    }

    #[test]
    fn test_select_source_retry_resets_flags() {
        let kb = Arc::new(TermSpace::new());
        let config = ChainerConfig::default().with_retry_exhausted_sources(true);
        let fc = chainer_for(kb, vec![], Term::set(vec![c("a"), c("b")]), config);
        {
            let mut pool = fc.pool.lock();
            pool.sources.get_mut(0).unwrap().exhausted = true;
            pool.sources.get_mut(1).unwrap().exhausted = true;
        }

        assert!(fc.select_source().is_some());
        let pool = fc.pool.lock();
        assert!(!pool.sources.is_exhausted());
        assert!(pool.sources.iter().all(|s| !s.exhausted));
    }

    #[test]
    fn test_claimed_sources_do_not_exhaust_pool() {
        let kb = Arc::new(TermSpace::new());
        let fc = chainer_for(kb, vec![], c("a"), ChainerConfig::default());
        let first = fc.select_source();
        assert_eq!(first, Some(0));

        assert!(fc.select_source().is_none());
        assert!(!fc.pool.lock().sources.is_exhausted());
    }

    #[test]
    fn test_step_on_claimed_pool_gives_back_iteration() {
        let kb = Arc::new(TermSpace::with_terms(vec![inh("a", "b"), inh("b", "c")]));
        let fc = chainer_for(kb, vec![BuiltinRules::deduction()], inh("a", "b"), ChainerConfig::default());
        fc.pool.lock().sources.claim(0);

        assert!(!fc.do_step(0));
        assert!(fc.inference_records().is_empty());
        assert!(!fc.pool.lock().sources.is_exhausted());

        fc.pool.lock().sources.release(0);
        assert!(fc.do_step(0));
        assert_eq!(fc.inference_records().len(), 1);
    }

    #[test]
    fn test_constant_clause_guard() {
        let rule = PatternRule::builder("guarded")
            .clause(inh("x", "y"))
            .clause(Term::inheritance(Term::variable("a"), c("z")))
            .produces(Term::inheritance(Term::variable("a"), c("done")))
            .build()
            .unwrap()
            .into_ref();
        let kb = Arc::new(TermSpace::with_terms(vec![inh("q", "z")]));
        let fc = chainer_for(kb.clone(), vec![rule.clone()], c("q"), ChainerConfig::default());

        assert!(fc.apply_rule(&rule).is_empty());

        kb.add(inh("x", "y"));
        assert_eq!(fc.apply_rule(&rule).into_iter().collect::<Vec<_>>(), vec![inh("q", "done")]);
    }

    #[test]
    fn test_apply_rule_keeps_body_out_of_store() {
        let rule = BuiltinRules::deduction();
        let kb = Arc::new(TermSpace::with_terms(vec![inh("a", "b"), inh("b", "c")]));
        let fc = chainer_for(kb.clone(), vec![rule.clone()], inh("a", "b"), ChainerConfig::default());

        let results = fc.apply_rule(&rule);
        assert!(results.contains(&inh("a", "c")));
        assert!(!kb.contains(&rule.body()));
        assert_eq!(kb.len(), 3);
    }

    #[test]
    fn test_apply_rule_unpacks_collections() {
        let rule = PatternRule::builder("pair")
            .clause(c("a"))
            .produces(Term::list(vec![c("x"), c("y")]))
            .produces(Term::set(vec![c("z")]))
            .build()
            .unwrap()
            .into_ref();
        let kb = Arc::new(TermSpace::with_terms(vec![c("a")]));
        let fc = chainer_for(kb.clone(), vec![rule.clone()], c("a"), ChainerConfig::default());

        let results = fc.apply_rule(&rule);
        assert_eq!(results.len(), 3);
        assert!(results.contains(&c("x")) && results.contains(&c("z")));
        assert!(kb.contains(&c("y")));
        assert!(!kb.contains(&Term::list(vec![c("x"), c("y")])));
    }

    #[test]
    fn test_valid_rules_without_specialization() {
        let kb = Arc::new(TermSpace::new());
        let config = ChainerConfig::default().with_rule_specialization(false);
        let fc = chainer_for(kb, vec![BuiltinRules::deduction()], inh("a", "b"), config);

        let source = fc.source_at(0).unwrap();
        let valid = fc.get_valid_rules(&source);
        assert_eq!(valid, vec![BuiltinRules::deduction()]);

        let mut applied = source.clone();
        applied.rules.insert(BuiltinRules::deduction());
        assert!(fc.get_valid_rules(&applied).is_empty());
    }

    #[test]
    fn test_valid_rules_skip_applied_specializations() {
        let kb = Arc::new(TermSpace::new());
        let fc = chainer_for(kb, vec![BuiltinRules::deduction()], inh("a", "b"), ChainerConfig::default());

        let mut source = fc.source_at(0).unwrap();
        let valid = fc.get_valid_rules(&source);
        assert_eq!(valid.len(), 2);

        source.rules.insert(valid[0].clone());
        assert_eq!(fc.get_valid_rules(&source), vec![valid[1].clone()]);
    }

    #[test]
    fn test_apply_rule_on_source_once() {
        let kb = Arc::new(TermSpace::with_terms(vec![inh("a", "b"), inh("b", "c")]));
        let fc = chainer_for(kb, vec![BuiltinRules::deduction()], inh("a", "b"), ChainerConfig::default());
        let rule = BuiltinRules::deduction();

        assert!(fc.apply_rule_on_source(&rule, 0).is_some());
        assert!(fc.apply_rule_on_source(&rule, 0).is_none());
    }

    #[test]
    fn test_select_rule_for_term() {
        let kb = Arc::new(TermSpace::new());
        let fc = chainer_for(kb, BuiltinRules::minimal(), c("x"), ChainerConfig::default());

        let (rule, prob) = fc.select_rule_for(&inh("a", "b")).unwrap();
        assert!(rule.name() == "deduction" || rule.name() == "modus-ponens");
        assert!(prob > 0.0 && prob < 1.0);
    }
}
