//! Structured terms: the facts, patterns and rule bodies stored in a term space.
//!
//! A [`Term`] is a node (a typed name), a link (a typed, ordered list of
//! outgoing terms) or a variable. Terms compare and hash structurally, so two
//! independently built terms with the same shape are the same fact.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Link kind of unordered collections. Members are kept sorted and deduplicated.
pub const SET_KIND: &str = "Set";

/// Link kind of ordered collections.
pub const LIST_KIND: &str = "List";

/// A structured term in a hypergraph.
///
/// # Examples
///
/// ```
/// use aingle_terms::Term;
///
/// let cat = Term::concept("cat");
/// let animal = Term::concept("animal");
/// let fact = Term::inheritance(cat.clone(), animal);
///
/// assert!(fact.is_link());
/// assert_eq!(fact.outgoing()[0], cat);
/// assert_eq!(fact.to_string(), r#"(Inheritance (Concept "cat") (Concept "animal"))"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Term {
    /// A typed leaf, e.g. `(Concept "cat")`.
    Node {
        /// The node kind, e.g. `"Concept"` or `"Predicate"`.
        kind: String,
        /// The node name.
        name: String,
    },
    /// A typed ordered list of terms, e.g. `(Inheritance A B)`.
    Link {
        /// The link kind, e.g. `"Inheritance"`.
        kind: String,
        /// The outgoing set of the link.
        outgoing: Vec<Term>,
    },
    /// A named variable, written `$name`.
    Variable(String),
}

impl Term {
    /// Creates a node of the given kind.
    pub fn node(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Node {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Creates a `Concept` node.
    pub fn concept(name: impl Into<String>) -> Self {
        Self::node("Concept", name)
    }

    /// Creates a `Predicate` node.
    pub fn predicate(name: impl Into<String>) -> Self {
        Self::node("Predicate", name)
    }

    /// Creates a link of the given kind.
    pub fn link(kind: impl Into<String>, outgoing: Vec<Term>) -> Self {
        Self::Link {
            kind: kind.into(),
            outgoing,
        }
    }

    /// Creates a variable.
    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    /// Creates an unordered `Set` link. Members are sorted and deduplicated,
    /// so sets with the same members are structurally equal.
    pub fn set(members: impl IntoIterator<Item = Term>) -> Self {
        let members: BTreeSet<Term> = members.into_iter().collect();
        Self::link(SET_KIND, members.into_iter().collect())
    }

    /// Creates an ordered `List` link.
    pub fn list(members: Vec<Term>) -> Self {
        Self::link(LIST_KIND, members)
    }

    /// Creates `(Inheritance sub super)`.
    pub fn inheritance(sub: Term, sup: Term) -> Self {
        Self::link("Inheritance", vec![sub, sup])
    }

    /// Creates `(Implication antecedent consequent)`.
    pub fn implication(antecedent: Term, consequent: Term) -> Self {
        Self::link("Implication", vec![antecedent, consequent])
    }

    /// Creates `(Evaluation predicate (List args...))`.
    pub fn evaluation(predicate: Term, args: Vec<Term>) -> Self {
        Self::link("Evaluation", vec![predicate, Self::list(args)])
    }

    /// Returns the node or link kind, or `None` for variables.
    pub fn kind(&self) -> Option<&str> {
        match self {
            Self::Node { kind, .. } | Self::Link { kind, .. } => Some(kind),
            Self::Variable(_) => None,
        }
    }

    /// Returns the node name, or the variable name for variables.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Node { name, .. } => Some(name),
            Self::Variable(name) => Some(name),
            Self::Link { .. } => None,
        }
    }

    /// Returns the outgoing set of a link, empty for nodes and variables.
    pub fn outgoing(&self) -> &[Term] {
        match self {
            Self::Link { outgoing, .. } => outgoing,
            _ => &[],
        }
    }

    /// Returns `true` if this is a node.
    pub fn is_node(&self) -> bool {
        matches!(self, Self::Node { .. })
    }

    /// Returns `true` if this is a link.
    pub fn is_link(&self) -> bool {
        matches!(self, Self::Link { .. })
    }

    /// Returns `true` if this is a variable.
    pub fn is_variable(&self) -> bool {
        matches!(self, Self::Variable(_))
    }

    /// Returns `true` for `Set` and `List` links, whose members stand for
    /// several facts at once.
    pub fn is_collection(&self) -> bool {
        matches!(self.kind(), Some(SET_KIND) | Some(LIST_KIND)) && self.is_link()
    }

    /// Returns the names of all variables occurring in this term.
    pub fn variables(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables(&self, names: &mut BTreeSet<String>) {
        match self {
            Self::Variable(name) => {
                names.insert(name.clone());
            }
            Self::Link { outgoing, .. } => {
                for t in outgoing {
                    t.collect_variables(names);
                }
            }
            Self::Node { .. } => {}
        }
    }

    /// Returns `true` if the variable `name` occurs anywhere in this term.
    pub fn contains_variable(&self, name: &str) -> bool {
        match self {
            Self::Variable(v) => v == name,
            Self::Link { outgoing, .. } => outgoing.iter().any(|t| t.contains_variable(name)),
            Self::Node { .. } => false,
        }
    }

    /// Parses a term from its JSON representation.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the term to JSON.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node { kind, name } => write!(f, "({} {:?})", kind, name),
            Self::Link { kind, outgoing } => {
                write!(f, "({}", kind)?;
                for t in outgoing {
                    write!(f, " {}", t)?;
                }
                write!(f, ")")
            }
            Self::Variable(name) => write!(f, "${}", name),
        }
    }
}

/// The set of variables a pattern declares as free.
///
/// Variables that occur in a term but are not declared are matched literally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableDecl(BTreeSet<String>);

impl VariableDecl {
    /// Creates an empty declaration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a declaration from variable names.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    /// Declares every variable occurring in `terms`.
    pub fn from_terms<'a>(terms: impl IntoIterator<Item = &'a Term>) -> Self {
        let mut names = BTreeSet::new();
        for t in terms {
            t.collect_variables(&mut names);
        }
        Self(names)
    }

    /// Adds a variable. Returns `false` if it was already declared.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.0.insert(name.into())
    }

    /// Removes a variable. Returns `true` if it was declared.
    pub fn remove(&mut self, name: &str) -> bool {
        self.0.remove(name)
    }

    /// Returns `true` if `name` is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    /// Iterates declared names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    /// Number of declared variables.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for VariableDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.0.iter().map(|n| format!("${}", n)).collect();
        write!(f, "[{}]", names.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_identity() {
        let a = Term::inheritance(Term::concept("cat"), Term::concept("animal"));
        let b = Term::link(
            "Inheritance",
            vec![Term::node("Concept", "cat"), Term::node("Concept", "animal")],
        );
        assert_eq!(a, b);

        let mut set = std::collections::HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_set_is_canonical() {
        let s1 = Term::set(vec![Term::concept("b"), Term::concept("a"), Term::concept("a")]);
        let s2 = Term::set(vec![Term::concept("a"), Term::concept("b")]);
        assert_eq!(s1, s2);
        assert_eq!(s1.outgoing().len(), 2);
        assert!(s1.is_collection());
        assert!(Term::list(vec![]).is_collection());
        assert!(!Term::concept("Set").is_collection());
    }

    #[test]
    fn test_variables() {
        let t = Term::inheritance(Term::variable("x"), Term::evaluation(Term::predicate("p"), vec![Term::variable("y")]));
        let vars = t.variables();
        assert_eq!(vars.len(), 2);
        assert!(t.contains_variable("y"));
        assert!(!t.contains_variable("z"));

        let decl = VariableDecl::from_terms([&t]);
        assert!(decl.contains("x"));
        assert_eq!(decl.to_string(), "[$x $y]");
    }

    #[test]
    fn test_display() {
        let t = Term::implication(Term::variable("p"), Term::concept("q"));
        assert_eq!(t.to_string(), r#"(Implication $p (Concept "q"))"#);
    }

    #[test]
    fn test_json() {
        let t = Term::evaluation(Term::predicate("likes"), vec![Term::concept("alice"), Term::variable("x")]);
        let json = t.to_json().unwrap();
        assert_eq!(Term::from_json(&json).unwrap(), t);
        assert!(Term::from_json("{\"bogus\": 1}").is_err());
    }
}
