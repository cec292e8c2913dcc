//! Property paths: reading them from the shapes graph, resolving them from a focus node
//! and writing them back as `sh:resultPath` structures.
//!
//! A path is either an IRI or a node carrying one of `sh:inversePath`, `sh:alternativePath`,
//! `sh:zeroOrMorePath`, `sh:oneOrMorePath` or `sh:zeroOrOnePath`, or an RDF list (a sequence).
//!
//! Repetition closures are computed with a visited set, so evaluation terminates on cyclic data.

use oxrdf::vocab::rdf;
use oxrdf::{GraphNameRef, NamedNode, QuadRef, Term, TermRef};
use rustc_hash::FxHashSet;
use std::fmt;

use crate::error::ShaclParseError;
use crate::store::{Store, StoreMut, graph_nodes, rdf_list};
use crate::vocab::sh;

/// Nesting bound for path structures read from the shapes graph.
const MAX_PATH_DEPTH: usize = 64;

/// A property path, from a focus node to its value nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyPath {
    Predicate(NamedNode),
    /// Steps applied one after the other. An empty sequence reaches the focus node itself.
    Sequence(Vec<PropertyPath>),
    /// Union of the alternatives.
    Alternative(Vec<PropertyPath>),
    Inverse(Box<PropertyPath>),
    ZeroOrMore(Box<PropertyPath>),
    OneOrMore(Box<PropertyPath>),
    ZeroOrOne(Box<PropertyPath>),
}

impl PropertyPath {
    pub fn predicate(predicate: impl Into<NamedNode>) -> Self {
        Self::Predicate(predicate.into())
    }

    pub fn sequence(steps: Vec<PropertyPath>) -> Self {
        Self::Sequence(steps)
    }

    pub fn alternative(alternatives: Vec<PropertyPath>) -> Self {
        Self::Alternative(alternatives)
    }

    pub fn inverse(inner: PropertyPath) -> Self {
        Self::Inverse(Box::new(inner))
    }

    pub fn zero_or_more(inner: PropertyPath) -> Self {
        Self::ZeroOrMore(Box::new(inner))
    }

    pub fn one_or_more(inner: PropertyPath) -> Self {
        Self::OneOrMore(Box::new(inner))
    }

    pub fn zero_or_one(inner: PropertyPath) -> Self {
        Self::ZeroOrOne(Box::new(inner))
    }

    /// The IRI of a single predicate path, the only paths `sh:closed` counts as declared.
    pub fn as_predicate(&self) -> Option<&NamedNode> {
        match self {
            Self::Predicate(p) => Some(p),
            _ => None,
        }
    }

    /// Parses the path that starts at `term` in the shapes graph.
    ///
    /// `shape` is only used to identify the owner of the path in errors.
    pub fn parse(
        store: &dyn Store,
        graph_name: GraphNameRef<'_>,
        shape: TermRef<'_>,
        term: TermRef<'_>,
    ) -> Result<Self, ShaclParseError> {
        parse_path(store, graph_name, shape, term, 0)
    }

    /// Evaluates the path from a focus node and returns the reached value nodes.
    ///
    /// The result has no duplicates and keeps the order in which values were first reached.
    /// Degenerate repetitions are logged and otherwise ignored. Use
    /// [`resolve_with_advisories`](Self::resolve_with_advisories) to collect them.
    pub fn resolve(
        &self,
        store: &dyn Store,
        graph_name: GraphNameRef<'_>,
        focus_node: TermRef<'_>,
    ) -> Vec<Term> {
        self.resolve_with_advisories(store, graph_name, focus_node, &mut Vec::new())
    }

    /// Same as [`resolve`](Self::resolve) but also appends the path advisories raised.
    pub fn resolve_with_advisories(
        &self,
        store: &dyn Store,
        graph_name: GraphNameRef<'_>,
        focus_node: TermRef<'_>,
        advisories: &mut Vec<PathAdvisory>,
    ) -> Vec<Term> {
        let mut evaluator = PathEvaluator {
            store,
            graph_name,
            advisories,
        };
        evaluator.eval(self, &focus_node.into_owned()).into_vec()
    }

    /// Writes the path structure into a graph and returns the term that denotes it.
    ///
    /// Predicate paths are their own IRI; the other forms allocate fresh blank nodes.
    pub fn write_to(&self, store: &mut dyn StoreMut, graph_name: GraphNameRef<'_>) -> Term {
        let (predicate, inner) = match self {
            Self::Predicate(p) => return p.clone().into(),
            Self::Sequence(paths) => return write_list(store, graph_name, paths),
            Self::Alternative(paths) => {
                let list = write_list(store, graph_name, paths);
                (sh::ALTERNATIVE_PATH, list)
            }
            Self::Inverse(p) => (sh::INVERSE_PATH, p.write_to(store, graph_name)),
            Self::ZeroOrMore(p) => (sh::ZERO_OR_MORE_PATH, p.write_to(store, graph_name)),
            Self::OneOrMore(p) => (sh::ONE_OR_MORE_PATH, p.write_to(store, graph_name)),
            Self::ZeroOrOne(p) => (sh::ZERO_OR_ONE_PATH, p.write_to(store, graph_name)),
        };
        let node = store.fresh_blank_node();
        store.assert(QuadRef::new(
            node.as_ref(),
            predicate,
            inner.as_ref(),
            graph_name,
        ));
        node.into()
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Predicate(p) => write!(f, "<{}>", p.as_str()),
            Self::Sequence(paths) => {
                write!(f, "(")?;
                for (i, p) in paths.iter().enumerate() {
                    if i > 0 {
                        write!(f, " / ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ")")
            }
            Self::Alternative(paths) => {
                write!(f, "(")?;
                for (i, p) in paths.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ")")
            }
            Self::Inverse(p) => write!(f, "^{p}"),
            Self::ZeroOrMore(p) => write!(f, "{p}*"),
            Self::OneOrMore(p) => write!(f, "{p}+"),
            Self::ZeroOrOne(p) => write!(f, "{p}?"),
        }
    }
}

/// A non-fatal anomaly met while evaluating a path.
///
/// Advisories never turn into validation results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathAdvisory {
    /// The node the repetition was evaluated from.
    pub focus_node: Term,
    /// The repetition path.
    pub path: PropertyPath,
    /// What was unexpected.
    pub kind: PathAdvisoryKind,
}

/// The kinds of [`PathAdvisory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathAdvisoryKind {
    /// A one-or-more path reached nothing.
    EmptyOneOrMore,
    /// A zero-or-one path reached more than one node besides the focus node.
    AmbiguousZeroOrOne {
        /// Number of reached nodes that are not the focus node.
        count: usize,
    },
}

impl fmt::Display for PathAdvisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            PathAdvisoryKind::EmptyOneOrMore => write!(
                f,
                "{} reaches no value from {}, at least one was expected",
                self.path, self.focus_node
            ),
            PathAdvisoryKind::AmbiguousZeroOrOne { count } => write!(
                f,
                "{} reaches {count} values from {}, at most one was expected",
                self.path, self.focus_node
            ),
        }
    }
}

/// Insertion ordered set of terms.
#[derive(Default)]
struct TermSet {
    terms: Vec<Term>,
    seen: FxHashSet<Term>,
}

impl TermSet {
    fn insert(&mut self, term: Term) -> bool {
        if self.seen.insert(term.clone()) {
            self.terms.push(term);
            true
        } else {
            false
        }
    }

    fn extend(&mut self, terms: impl IntoIterator<Item = Term>) {
        for term in terms {
            self.insert(term);
        }
    }

    fn contains(&self, term: &Term) -> bool {
        self.seen.contains(term)
    }

    fn into_vec(self) -> Vec<Term> {
        self.terms
    }
}

struct PathEvaluator<'a, 'b> {
    store: &'a dyn Store,
    graph_name: GraphNameRef<'a>,
    advisories: &'b mut Vec<PathAdvisory>,
}

impl PathEvaluator<'_, '_> {
    fn eval(&mut self, path: &PropertyPath, focus_node: &Term) -> TermSet {
        let mut results = TermSet::default();
        match path {
            PropertyPath::Predicate(predicate) => {
                results.extend(self.store.each(
                    focus_node.as_ref(),
                    predicate.as_ref(),
                    self.graph_name,
                ));
            }
            PropertyPath::Inverse(inner) => {
                if let PropertyPath::Predicate(predicate) = inner.as_ref() {
                    results.extend(self.store.each_subject(
                        predicate.as_ref(),
                        focus_node.as_ref(),
                        self.graph_name,
                    ));
                } else {
                    // Complex inverse: keep every node from which the inner path reaches the focus node
                    for candidate in graph_nodes(self.store, self.graph_name) {
                        if self.eval(inner, &candidate).contains(focus_node) {
                            results.insert(candidate);
                        }
                    }
                }
            }
            PropertyPath::Sequence(paths) => {
                let mut current = vec![focus_node.clone()];
                for step in paths {
                    let mut next = TermSet::default();
                    for node in &current {
                        next.extend(self.eval(step, node).into_vec());
                    }
                    current = next.into_vec();
                }
                results.extend(current);
            }
            PropertyPath::Alternative(paths) => {
                for alternative in paths {
                    results.extend(self.eval(alternative, focus_node).into_vec());
                }
            }
            PropertyPath::OneOrMore(inner) => {
                results = self.closure(inner, focus_node, false);
                if results.terms.is_empty() {
                    self.advise(path, focus_node, PathAdvisoryKind::EmptyOneOrMore);
                }
            }
            PropertyPath::ZeroOrMore(inner) => {
                results = self.closure(inner, focus_node, true);
            }
            PropertyPath::ZeroOrOne(inner) => {
                let step = self.eval(inner, focus_node).into_vec();
                let count = step.iter().filter(|t| *t != focus_node).count();
                if count > 1 {
                    self.advise(path, focus_node, PathAdvisoryKind::AmbiguousZeroOrOne { count });
                }
                results.insert(focus_node.clone());
                results.extend(step);
            }
        }
        results
    }

    /// Transitive closure of `step` from `focus_node`.
    ///
    /// The focus node is part of the result if `include_focus` is set or if a cycle leads back to it.
    fn closure(&mut self, step: &PropertyPath, focus_node: &Term, include_focus: bool) -> TermSet {
        let mut results = TermSet::default();
        if include_focus {
            results.insert(focus_node.clone());
        }
        let mut expanded = FxHashSet::default();
        expanded.insert(focus_node.clone());
        let mut frontier = vec![focus_node.clone()];
        while !frontier.is_empty() {
            let mut next = Vec::new();
            for node in &frontier {
                for value in self.eval(step, node).into_vec() {
                    results.insert(value.clone());
                    if expanded.insert(value.clone()) {
                        next.push(value);
                    }
                }
            }
            frontier = next;
        }
        results
    }

    fn advise(&mut self, path: &PropertyPath, focus_node: &Term, kind: PathAdvisoryKind) {
        let advisory = PathAdvisory {
            focus_node: focus_node.clone(),
            path: path.clone(),
            kind,
        };
        tracing::warn!("{advisory}");
        self.advisories.push(advisory);
    }
}

fn parse_path(
    store: &dyn Store,
    graph_name: GraphNameRef<'_>,
    shape: TermRef<'_>,
    term: TermRef<'_>,
    depth: usize,
) -> Result<PropertyPath, ShaclParseError> {
    if depth > MAX_PATH_DEPTH {
        return Err(ShaclParseError::invalid_property_path(
            shape.into_owned(),
            term.into_owned(),
            "path structure is nested too deeply or cyclic",
        ));
    }
    let parse_inner = |inner: Term| parse_path(store, graph_name, shape, inner.as_ref(), depth + 1);
    let parse_list = |head: Term| -> Result<Vec<PropertyPath>, ShaclParseError> {
        rdf_list(store, head.as_ref(), graph_name)
            .ok_or_else(|| ShaclParseError::invalid_rdf_list(shape.into_owned(), "malformed path list"))?
            .into_iter()
            .map(parse_inner)
            .collect()
    };

    match term {
        TermRef::NamedNode(n) if n == rdf::NIL => Ok(PropertyPath::Sequence(Vec::new())),
        TermRef::NamedNode(n) => Ok(PropertyPath::Predicate(n.into_owned())),
        TermRef::BlankNode(_) => {
            if let Some(list) = store.any(term, sh::ALTERNATIVE_PATH, graph_name) {
                return Ok(PropertyPath::Alternative(parse_list(list)?));
            }
            if let Some(inner) = store.any(term, sh::INVERSE_PATH, graph_name) {
                return Ok(PropertyPath::inverse(parse_inner(inner)?));
            }
            if let Some(inner) = store.any(term, sh::ZERO_OR_MORE_PATH, graph_name) {
                return Ok(PropertyPath::zero_or_more(parse_inner(inner)?));
            }
            if let Some(inner) = store.any(term, sh::ONE_OR_MORE_PATH, graph_name) {
                return Ok(PropertyPath::one_or_more(parse_inner(inner)?));
            }
            if let Some(inner) = store.any(term, sh::ZERO_OR_ONE_PATH, graph_name) {
                return Ok(PropertyPath::zero_or_one(parse_inner(inner)?));
            }
            if store.any(term, rdf::FIRST, graph_name).is_some() {
                return Ok(PropertyPath::Sequence(parse_list(term.into_owned())?));
            }
            Err(ShaclParseError::invalid_property_path(
                shape.into_owned(),
                term.into_owned(),
                "unknown property path structure",
            ))
        }
        _ => Err(ShaclParseError::invalid_property_path(
            shape.into_owned(),
            term.into_owned(),
            "a property path must be an IRI or a blank node",
        )),
    }
}

fn write_list(
    store: &mut dyn StoreMut,
    graph_name: GraphNameRef<'_>,
    paths: &[PropertyPath],
) -> Term {
    let mut head = Term::from(rdf::NIL.into_owned());
    for path in paths.iter().rev() {
        let first = path.write_to(store, graph_name);
        let cell = store.fresh_blank_node();
        store.assert(QuadRef::new(cell.as_ref(), rdf::FIRST, first.as_ref(), graph_name));
        store.assert(QuadRef::new(cell.as_ref(), rdf::REST, head.as_ref(), graph_name));
        head = cell.into();
    }
    head
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxrdf::{BlankNode, Dataset, Literal};

    const G: GraphNameRef<'static> = GraphNameRef::DefaultGraph;

    fn ex(name: &str) -> NamedNode {
        NamedNode::new(format!("http://example.org/{name}")).unwrap()
    }

    fn term(name: &str) -> Term {
        ex(name).into()
    }

    fn add(dataset: &mut Dataset, s: &str, p: &str, o: &str) {
        dataset.insert(QuadRef::new(ex(s).as_ref(), ex(p).as_ref(), ex(o).as_ref(), G));
    }

    fn resolve(path: &PropertyPath, dataset: &Dataset, focus: &str) -> Vec<Term> {
        path.resolve(dataset, G, term(focus).as_ref())
    }

    #[test]
    fn test_predicate_path() {
        let mut dataset = Dataset::new();
        add(&mut dataset, "s", "p", "o");
        let path = PropertyPath::predicate(ex("p"));
        assert_eq!(resolve(&path, &dataset, "s"), vec![term("o")]);
        assert!(resolve(&path, &dataset, "o").is_empty());
    }

    #[test]
    fn test_literal_focus_has_no_forward_values() {
        let mut dataset = Dataset::new();
        add(&mut dataset, "s", "p", "o");
        let path = PropertyPath::predicate(ex("p"));
        let literal = Literal::new_simple_literal("s");
        assert!(path.resolve(&dataset, G, literal.as_ref().into()).is_empty());
    }

    #[test]
    fn test_inverse_path() {
        let mut dataset = Dataset::new();
        add(&mut dataset, "s", "p", "o");
        let path = PropertyPath::inverse(PropertyPath::predicate(ex("p")));
        assert_eq!(resolve(&path, &dataset, "o"), vec![term("s")]);
    }

    #[test]
    fn test_inverse_of_sequence() {
        let mut dataset = Dataset::new();
        add(&mut dataset, "a", "p", "b");
        add(&mut dataset, "b", "q", "c");
        let path = PropertyPath::inverse(PropertyPath::sequence(vec![
            PropertyPath::predicate(ex("p")),
            PropertyPath::predicate(ex("q")),
        ]));
        assert_eq!(resolve(&path, &dataset, "c"), vec![term("a")]);
    }

    #[test]
    fn test_sequence_is_union_of_second_step() {
        let mut dataset = Dataset::new();
        add(&mut dataset, "n", "p1", "a");
        add(&mut dataset, "n", "p1", "b");
        add(&mut dataset, "a", "p2", "x");
        add(&mut dataset, "b", "p2", "y");
        add(&mut dataset, "b", "p2", "x");

        let p1 = PropertyPath::predicate(ex("p1"));
        let p2 = PropertyPath::predicate(ex("p2"));
        let sequence = PropertyPath::sequence(vec![p1.clone(), p2.clone()]);

        let mut expected = FxHashSet::default();
        for middle in resolve(&p1, &dataset, "n") {
            expected.extend(p2.resolve(&dataset, G, middle.as_ref()));
        }
        let actual = resolve(&sequence, &dataset, "n");
        assert_eq!(actual.len(), expected.len());
        assert_eq!(actual.into_iter().collect::<FxHashSet<_>>(), expected);
    }

    #[test]
    fn test_empty_sequence_is_focus() {
        let dataset = Dataset::new();
        let path = PropertyPath::sequence(Vec::new());
        assert_eq!(resolve(&path, &dataset, "n"), vec![term("n")]);
    }

    #[test]
    fn test_alternative_path() {
        let mut dataset = Dataset::new();
        add(&mut dataset, "s", "p", "a");
        add(&mut dataset, "s", "q", "b");
        add(&mut dataset, "s", "q", "a");
        let path = PropertyPath::alternative(vec![
            PropertyPath::predicate(ex("p")),
            PropertyPath::predicate(ex("q")),
        ]);
        assert_eq!(resolve(&path, &dataset, "s").len(), 2);
    }

    #[test]
    fn test_one_or_more_terminates_on_cycle() {
        let mut dataset = Dataset::new();
        add(&mut dataset, "a", "next", "b");
        add(&mut dataset, "b", "next", "c");
        add(&mut dataset, "c", "next", "a");
        let path = PropertyPath::one_or_more(PropertyPath::predicate(ex("next")));
        let values = resolve(&path, &dataset, "a");
        assert_eq!(values, vec![term("b"), term("c"), term("a")]);
    }

    #[test]
    fn test_one_or_more_excludes_focus_without_cycle() {
        let mut dataset = Dataset::new();
        add(&mut dataset, "a", "next", "b");
        add(&mut dataset, "b", "next", "c");
        let path = PropertyPath::one_or_more(PropertyPath::predicate(ex("next")));
        assert_eq!(resolve(&path, &dataset, "a"), vec![term("b"), term("c")]);
    }

    #[test]
    fn test_empty_one_or_more_is_advisory() {
        let dataset = Dataset::new();
        let path = PropertyPath::one_or_more(PropertyPath::predicate(ex("next")));
        let mut advisories = Vec::new();
        let values =
            path.resolve_with_advisories(&dataset, G, term("a").as_ref(), &mut advisories);
        assert!(values.is_empty());
        assert_eq!(advisories.len(), 1);
        assert_eq!(advisories[0].kind, PathAdvisoryKind::EmptyOneOrMore);
    }

    #[test]
    fn test_zero_or_more_includes_focus() {
        let mut dataset = Dataset::new();
        add(&mut dataset, "a", "next", "b");
        let path = PropertyPath::zero_or_more(PropertyPath::predicate(ex("next")));
        assert_eq!(resolve(&path, &dataset, "a"), vec![term("a"), term("b")]);
        assert_eq!(resolve(&path, &dataset, "z"), vec![term("z")]);
    }

    #[test]
    fn test_zero_or_one() {
        let mut dataset = Dataset::new();
        add(&mut dataset, "a", "p", "b");
        add(&mut dataset, "a", "p", "c");
        let path = PropertyPath::zero_or_one(PropertyPath::predicate(ex("p")));
        let mut advisories = Vec::new();
        let values =
            path.resolve_with_advisories(&dataset, G, term("a").as_ref(), &mut advisories);
        assert_eq!(values, vec![term("a"), term("b"), term("c")]);
        assert_eq!(
            advisories[0].kind,
            PathAdvisoryKind::AmbiguousZeroOrOne { count: 2 }
        );
    }

    #[test]
    fn test_parse_and_write_round_trip() {
        let path = PropertyPath::sequence(vec![
            PropertyPath::inverse(PropertyPath::predicate(ex("p"))),
            PropertyPath::alternative(vec![
                PropertyPath::predicate(ex("q")),
                PropertyPath::zero_or_more(PropertyPath::predicate(ex("r"))),
            ]),
        ]);
        let mut dataset = Dataset::new();
        let node = path.write_to(&mut dataset, G);
        let shape = BlankNode::default();
        let parsed = PropertyPath::parse(&dataset, G, shape.as_ref().into(), node.as_ref()).unwrap();
        assert_eq!(parsed, path);
    }

    #[test]
    fn test_parse_rejects_literal() {
        let dataset = Dataset::new();
        let shape = BlankNode::default();
        let literal = Literal::new_simple_literal("p");
        assert!(matches!(
            PropertyPath::parse(&dataset, G, shape.as_ref().into(), literal.as_ref().into()),
            Err(ShaclParseError::InvalidPropertyPath { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_cyclic_structure() {
        let mut dataset = Dataset::new();
        let node = BlankNode::default();
        dataset.insert(QuadRef::new(node.as_ref(), sh::INVERSE_PATH, node.as_ref(), G));
        let shape = BlankNode::default();
        assert!(
            PropertyPath::parse(&dataset, G, shape.as_ref().into(), node.as_ref().into()).is_err()
        );
    }

    #[test]
    fn test_display() {
        let path = PropertyPath::one_or_more(PropertyPath::inverse(PropertyPath::predicate(ex("p"))));
        assert_eq!(path.to_string(), "^<http://example.org/p>+");
    }
}
