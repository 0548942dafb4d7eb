//! Rule definitions for the forward chainer
//!
//! A rule is a conjunction of clauses and the terms it produces when every
//! clause is satisfied. The chainer only sees rules through the [`Rule`]
//! trait; [`PatternRule`] and [`MetaRule`] are the concrete kinds shipped
//! with this crate.

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

use aingle_terms::pattern::{self, Bindings};
use aingle_terms::{KnowledgeBase, Term, VariableDecl};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::truth::{BetaDistribution, TruthValue};

/// An inference rule as seen by the chainer.
pub trait Rule: Send + Sync + fmt::Debug {
    /// Structural identity. Two specializations of the same rule have
    /// different ids.
    fn id(&self) -> &str;

    /// Human-readable name, shared by all specializations.
    fn name(&self) -> &str;

    fn truth_value(&self) -> TruthValue;

    /// Meta rules produce rules rather than facts.
    fn is_meta(&self) -> bool {
        false
    }

    fn clauses(&self) -> &[Term];

    fn variables(&self) -> &VariableDecl;

    fn implicand(&self) -> &[Term];

    /// Unifies the rule with a premise.
    ///
    /// Returns one specialized instance per way the premise can stand in for
    /// a clause; empty if the rule does not apply. `vardecl` declares the
    /// variables of a premise that is itself a pattern. Fails with
    /// [`Error::Unification`] if the premise cannot stand in for anything,
    /// such as a bare declared variable.
    fn unify_source(
        &self,
        source: &Term,
        vardecl: Option<&VariableDecl>,
        store: &dyn KnowledgeBase,
    ) -> Result<Vec<RuleRef>>;

    /// Runs the rule against `scope` and returns what it produces.
    fn apply(&self, scope: &dyn KnowledgeBase) -> Result<Vec<Term>>;

    /// Synthesizes concrete rules from the knowledge base.
    fn expand_meta(&self, _kb: &dyn KnowledgeBase) -> Result<Vec<RuleRef>> {
        Ok(Vec::new())
    }

    fn success_distribution(&self) -> BetaDistribution {
        BetaDistribution::from_truth_value(&self.truth_value())
    }

    /// The rule as a term: `(Bind (List vars...) (And clauses...) (List produced...))`.
    fn body(&self) -> Term {
        Term::link(
            "Bind",
            vec![
                Term::list(self.variables().iter().map(Term::variable).collect()),
                Term::link("And", self.clauses().to_vec()),
                Term::list(self.implicand().to_vec()),
            ],
        )
    }
}

/// A shared handle to a registered rule.
///
/// Equality, hashing and ordering go by [`Rule::id`].
#[derive(Debug, Clone)]
pub struct RuleRef(Arc<dyn Rule>);

impl RuleRef {
    /// Wraps a rule in a shared handle.
    pub fn new<R: Rule + 'static>(rule: R) -> Self {
        Self(Arc::new(rule))
    }

    /// Wraps an already shared rule.
    pub fn from_arc(rule: Arc<dyn Rule>) -> Self {
        Self(rule)
    }
}

impl Deref for RuleRef {
    type Target = dyn Rule;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl PartialEq for RuleRef {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for RuleRef {}

impl Hash for RuleRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl PartialOrd for RuleRef {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RuleRef {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id().cmp(other.id())
    }
}

impl fmt::Display for RuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A rule given as clause patterns and produced-term templates.
///
/// # Examples
///
/// ```
/// use aingle_chainer::PatternRule;
/// use aingle_terms::Term;
///
/// let rule = PatternRule::builder("deduction")
///     .variables(["a", "b", "c"])
///     .clause(Term::inheritance(Term::variable("a"), Term::variable("b")))
///     .clause(Term::inheritance(Term::variable("b"), Term::variable("c")))
///     .produces(Term::inheritance(Term::variable("a"), Term::variable("c")))
///     .build()?;
///
/// assert_eq!(rule.clauses().len(), 2);
/// # Ok::<(), aingle_chainer::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PatternRule {
    id: String,
    name: String,
    variables: VariableDecl,
    clauses: Vec<Term>,
    implicand: Vec<Term>,
    tv: TruthValue,
}

impl PatternRule {
    /// Starts building a rule with the given name.
    pub fn builder(name: impl Into<String>) -> PatternRuleBuilder {
        PatternRuleBuilder::new(name)
    }

    /// Assembles a rule without validating it.
    pub(crate) fn from_parts(
        name: impl Into<String>,
        variables: VariableDecl,
        clauses: Vec<Term>,
        implicand: Vec<Term>,
        tv: TruthValue,
    ) -> Self {
        let name = name.into();
        let id = rule_id(&name, &variables, &clauses, &implicand);
        Self {
            id,
            name,
            variables,
            clauses,
            implicand,
            tv,
        }
    }

    /// Returns the rule with `bindings` substituted in and the bound
    /// variables no longer declared.
    pub fn specialize(&self, bindings: &Bindings) -> PatternRule {
        self.specialize_as(self.name.clone(), bindings)
    }

    fn specialize_as(&self, name: String, bindings: &Bindings) -> PatternRule {
        let mut variables = self.variables.clone();
        for (var, _) in bindings.iter() {
            variables.remove(var);
        }
        let clauses = self
            .clauses
            .iter()
            .map(|c| pattern::substitute(c, bindings))
            .collect();
        let implicand = self
            .implicand
            .iter()
            .map(|t| pattern::substitute(t, bindings))
            .collect();
        Self::from_parts(name, variables, clauses, implicand, self.tv)
    }

    /// The clauses that must all be satisfied.
    pub fn clauses(&self) -> &[Term] {
        &self.clauses
    }

    /// The templates instantiated for every grounding of the clauses.
    pub fn implicand(&self) -> &[Term] {
        &self.implicand
    }

    /// The variables still free in this rule.
    pub fn variables(&self) -> &VariableDecl {
        &self.variables
    }

    /// Converts the rule into a shared handle.
    pub fn into_ref(self) -> RuleRef {
        RuleRef::new(self)
    }
}

fn rule_id(name: &str, variables: &VariableDecl, clauses: &[Term], implicand: &[Term]) -> String {
    let join = |terms: &[Term]| {
        terms
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    };
    format!(
        "{}{}({})->({})",
        name,
        variables,
        join(clauses),
        join(implicand)
    )
}

impl Rule for PatternRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn truth_value(&self) -> TruthValue {
        self.tv
    }

    fn clauses(&self) -> &[Term] {
        &self.clauses
    }

    fn variables(&self) -> &VariableDecl {
        &self.variables
    }

    fn implicand(&self) -> &[Term] {
        &self.implicand
    }

    fn unify_source(
        &self,
        source: &Term,
        vardecl: Option<&VariableDecl>,
        _store: &dyn KnowledgeBase,
    ) -> Result<Vec<RuleRef>> {
        let no_vars = VariableDecl::new();
        let source_vars = vardecl.unwrap_or(&no_vars);

        if let Term::Variable(var) = source {
            if source_vars.contains(var) {
                return Err(Error::Unification {
                    rule: self.name.clone(),
                    reason: format!("source ${} is an unconstrained variable", var),
                });
            }
        }

        let mut seen = HashSet::new();
        let mut instances = Vec::new();
        for clause in &self.clauses {
            let mut bindings = Bindings::new();
            if pattern::unify(clause, &self.variables, source, source_vars, &mut bindings) {
                let instance = self.specialize(&bindings);
                if seen.insert(instance.id.clone()) {
                    instances.push(instance.into_ref());
                }
            }
        }
        Ok(instances)
    }

    fn apply(&self, scope: &dyn KnowledgeBase) -> Result<Vec<Term>> {
        let groundings = pattern::satisfy(&self.clauses, &self.variables, scope)?;
        let mut products = Vec::new();
        for bindings in &groundings {
            for template in &self.implicand {
                products.push(pattern::instantiate(template, bindings, &self.variables)?);
            }
        }
        Ok(products)
    }
}

/// Fluent builder for [`PatternRule`].
pub struct PatternRuleBuilder {
    name: String,
    variables: Option<VariableDecl>,
    clauses: Vec<Term>,
    implicand: Vec<Term>,
    tv: TruthValue,
}

impl PatternRuleBuilder {
    /// Creates a builder with no clauses and the default truth value.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: None,
            clauses: Vec::new(),
            implicand: Vec::new(),
            tv: TruthValue::default(),
        }
    }

    /// Declares the rule variables. Without a declaration every variable
    /// occurring in the clauses is declared.
    pub fn variables<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.variables = Some(VariableDecl::from_names(names));
        self
    }

    /// Adds a clause.
    pub fn clause(mut self, clause: Term) -> Self {
        self.clauses.push(clause);
        self
    }

    /// Adds several clauses, in order.
    pub fn clauses(mut self, clauses: impl IntoIterator<Item = Term>) -> Self {
        self.clauses.extend(clauses);
        self
    }

    /// Adds a term the rule produces.
    pub fn produces(mut self, term: Term) -> Self {
        self.implicand.push(term);
        self
    }

    /// Sets the rule's truth value.
    pub fn truth_value(mut self, tv: TruthValue) -> Self {
        self.tv = tv;
        self
    }

    /// Creates the rule.
    ///
    /// When no variables were declared, every variable in the clauses is.
    /// Fails with [`Error::InvalidRule`] if the name is empty, there are no
    /// clauses or no products, or a produced variable occurs in no clause.
    pub fn build(self) -> Result<PatternRule> {
        if self.name.is_empty() {
            return Err(Error::InvalidRule("rule name is empty".to_string()));
        }
        if self.clauses.is_empty() {
            return Err(Error::InvalidRule(format!("{} has no clauses", self.name)));
        }
        if self.implicand.is_empty() {
            return Err(Error::InvalidRule(format!("{} produces nothing", self.name)));
        }

        let variables = self
            .variables
            .unwrap_or_else(|| VariableDecl::from_terms(&self.clauses));
        let bound = VariableDecl::from_terms(&self.clauses);
        for term in &self.implicand {
            if let Some(free) = term
                .variables()
                .into_iter()
                .find(|v| variables.contains(v) && !bound.contains(v))
            {
                return Err(Error::InvalidRule(format!(
                    "{}: ${} is produced but never matched",
                    self.name, free
                )));
            }
        }

        Ok(PatternRule::from_parts(
            self.name,
            variables,
            self.clauses,
            self.implicand,
            self.tv,
        ))
    }
}

/// A rule that produces rules.
///
/// Every grounding of the meta clauses in the knowledge base specializes
/// the template with those bindings. A generated rule is named after the
/// template followed by its bindings, e.g. `transitivity{$r=(Predicate "ancestor")}`.
#[derive(Debug, Clone)]
pub struct MetaRule {
    id: String,
    name: String,
    variables: VariableDecl,
    clauses: Vec<Term>,
    template: PatternRule,
    produced: Vec<Term>,
}

impl MetaRule {
    /// Creates a meta rule.
    ///
    /// # Arguments
    ///
    /// * `name` - The meta rule's name.
    /// * `clauses` - Patterns searched in the knowledge base. Every variable in them is declared.
    /// * `template` - The rule specialized with each grounding of `clauses`.
    pub fn new(name: impl Into<String>, clauses: Vec<Term>, template: PatternRule) -> Result<Self> {
        let name = name.into();
        if clauses.is_empty() {
            return Err(Error::InvalidRule(format!("{} has no meta clauses", name)));
        }
        let variables = VariableDecl::from_terms(&clauses);
        Ok(Self::from_parts(name, variables, clauses, template))
    }

    pub(crate) fn from_parts(
        name: impl Into<String>,
        variables: VariableDecl,
        clauses: Vec<Term>,
        template: PatternRule,
    ) -> Self {
        let name = name.into();
        let produced = vec![template.body()];
        Self {
            id: rule_id(&name, &variables, &clauses, &produced),
            name,
            variables,
            clauses,
            template,
            produced,
        }
    }

    /// The rule that generated rules are specialized from.
    pub fn template(&self) -> &PatternRule {
        &self.template
    }
}

impl Rule for MetaRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn truth_value(&self) -> TruthValue {
        self.template.truth_value()
    }

    fn is_meta(&self) -> bool {
        true
    }

    fn clauses(&self) -> &[Term] {
        &self.clauses
    }

    fn variables(&self) -> &VariableDecl {
        &self.variables
    }

    fn implicand(&self) -> &[Term] {
        &self.produced
    }

    fn unify_source(
        &self,
        _source: &Term,
        _vardecl: Option<&VariableDecl>,
        _store: &dyn KnowledgeBase,
    ) -> Result<Vec<RuleRef>> {
        Ok(Vec::new())
    }

    fn apply(&self, _scope: &dyn KnowledgeBase) -> Result<Vec<Term>> {
        Ok(Vec::new())
    }

    fn expand_meta(&self, kb: &dyn KnowledgeBase) -> Result<Vec<RuleRef>> {
        let groundings = pattern::satisfy(&self.clauses, &self.variables, kb)?;
        Ok(groundings
            .iter()
            .map(|b| {
                let name = format!("{}{}", self.template.name, b);
                self.template.specialize_as(name, b).into_ref()
            })
            .collect())
    }
}

/// Serializable description of a rule, for loading rule files.
///
/// A definition with `meta` clauses describes a [`MetaRule`] whose template
/// is the rest of the definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Vec<String>>,
    pub clauses: Vec<Term>,
    pub produces: Vec<Term>,
    #[serde(default)]
    pub truth_value: TruthValue,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub meta: Vec<Term>,
}

impl RuleDefinition {
    /// Builds the rule, or the meta rule when `meta` is not empty.
    pub fn into_rule(self) -> Result<RuleRef> {
        let mut builder = PatternRule::builder(self.name.clone())
            .clauses(self.clauses)
            .truth_value(self.truth_value);
        if let Some(vars) = self.variables {
            builder = builder.variables(vars);
        }
        for term in self.produces {
            builder = builder.produces(term);
        }
        let rule = builder.build()?;

        if self.meta.is_empty() {
            Ok(rule.into_ref())
        } else {
            Ok(RuleRef::new(MetaRule::new(self.name, self.meta, rule)?))
        }
    }
}

/// Parses a JSON array of [`RuleDefinition`]s.
pub fn load_rules_json(json: &str) -> Result<Vec<RuleRef>> {
    let defs: Vec<RuleDefinition> = serde_json::from_str(json)?;
    defs.into_iter().map(RuleDefinition::into_rule).collect()
}

/// Reads a JSON rule file.
pub fn load_rules_file(path: impl AsRef<Path>) -> Result<Vec<RuleRef>> {
    let json = std::fs::read_to_string(path)?;
    load_rules_json(&json)
}
