//! The graph store the checker reads shapes and data from and writes reports into.
//!
//! The checker never owns the statements it validates. It talks to them through
//! the [`Store`] trait (read access) and the [`StoreMut`] trait (report
//! materialization). Both are implemented for [`oxrdf::Dataset`], where each
//! graph context (shapes, data, report) is a [`GraphName`](oxrdf::GraphName).

use oxrdf::vocab::rdf;
use oxrdf::{BlankNode, Dataset, GraphNameRef, NamedNodeRef, Quad, QuadRef, Term, TermRef};
use rustc_hash::FxHashSet;

/// Read access to a collection of statements scoped by graph context.
///
/// Subjects are given as [`TermRef`] so that focus nodes can be passed as is:
/// a literal subject simply matches nothing.
pub trait Store {
    /// Returns the statements matching a pattern, `None` being a wildcard.
    fn statements_matching(
        &self,
        subject: Option<TermRef<'_>>,
        predicate: Option<NamedNodeRef<'_>>,
        object: Option<TermRef<'_>>,
        graph_name: Option<GraphNameRef<'_>>,
    ) -> Vec<Quad>;

    /// Returns all the objects of `subject predicate ?o` in the given graph.
    fn each(
        &self,
        subject: TermRef<'_>,
        predicate: NamedNodeRef<'_>,
        graph_name: GraphNameRef<'_>,
    ) -> Vec<Term> {
        self.statements_matching(Some(subject), Some(predicate), None, Some(graph_name))
            .into_iter()
            .map(|q| q.object)
            .collect()
    }

    /// Returns all the subjects of `?s predicate object` in the given graph.
    fn each_subject(
        &self,
        predicate: NamedNodeRef<'_>,
        object: TermRef<'_>,
        graph_name: GraphNameRef<'_>,
    ) -> Vec<Term> {
        self.statements_matching(None, Some(predicate), Some(object), Some(graph_name))
            .into_iter()
            .map(|q| q.subject.into())
            .collect()
    }

    /// Returns the first object of `subject predicate ?o`, if any.
    fn any(
        &self,
        subject: TermRef<'_>,
        predicate: NamedNodeRef<'_>,
        graph_name: GraphNameRef<'_>,
    ) -> Option<Term> {
        self.each(subject, predicate, graph_name).into_iter().next()
    }

    /// Checks if the statement is in the given graph.
    fn holds(
        &self,
        subject: TermRef<'_>,
        predicate: NamedNodeRef<'_>,
        object: TermRef<'_>,
        graph_name: GraphNameRef<'_>,
    ) -> bool {
        !self
            .statements_matching(Some(subject), Some(predicate), Some(object), Some(graph_name))
            .is_empty()
    }
}

/// Write access used to materialize validation reports.
pub trait StoreMut: Store {
    /// Adds a statement.
    fn assert(&mut self, quad: QuadRef<'_>);

    /// Allocates a blank node that is not used yet.
    fn fresh_blank_node(&mut self) -> BlankNode {
        BlankNode::default()
    }
}

impl Store for Dataset {
    fn statements_matching(
        &self,
        subject: Option<TermRef<'_>>,
        predicate: Option<NamedNodeRef<'_>>,
        object: Option<TermRef<'_>>,
        graph_name: Option<GraphNameRef<'_>>,
    ) -> Vec<Quad> {
        let keep = |q: &QuadRef<'_>| {
            subject.is_none_or(|s| TermRef::from(q.subject) == s)
                && predicate.is_none_or(|p| q.predicate == p)
                && object.is_none_or(|o| q.object == o)
                && graph_name.is_none_or(|g| q.graph_name == g)
        };
        match (subject, object, predicate, graph_name) {
            (Some(TermRef::NamedNode(s)), ..) => self
                .quads_for_subject(s)
                .filter(keep)
                .map(QuadRef::into_owned)
                .collect(),
            (Some(TermRef::BlankNode(s)), ..) => self
                .quads_for_subject(s)
                .filter(keep)
                .map(QuadRef::into_owned)
                .collect(),
            (Some(_), ..) => Vec::new(),
            (None, Some(o), ..) => self
                .quads_for_object(o)
                .filter(keep)
                .map(QuadRef::into_owned)
                .collect(),
            (None, None, Some(p), _) => self
                .quads_for_predicate(p)
                .filter(keep)
                .map(QuadRef::into_owned)
                .collect(),
            (None, None, None, Some(g)) => self
                .quads_for_graph_name(g)
                .map(QuadRef::into_owned)
                .collect(),
            (None, None, None, None) => self.iter().map(QuadRef::into_owned).collect(),
        }
    }

    fn each(
        &self,
        subject: TermRef<'_>,
        predicate: NamedNodeRef<'_>,
        graph_name: GraphNameRef<'_>,
    ) -> Vec<Term> {
        let graph = self.graph(graph_name);
        match subject {
            TermRef::NamedNode(s) => graph
                .objects_for_subject_predicate(s, predicate)
                .map(TermRef::into_owned)
                .collect(),
            TermRef::BlankNode(s) => graph
                .objects_for_subject_predicate(s, predicate)
                .map(TermRef::into_owned)
                .collect(),
            _ => Vec::new(),
        }
    }

    fn holds(
        &self,
        subject: TermRef<'_>,
        predicate: NamedNodeRef<'_>,
        object: TermRef<'_>,
        graph_name: GraphNameRef<'_>,
    ) -> bool {
        match subject {
            TermRef::NamedNode(s) => self.contains(QuadRef::new(s, predicate, object, graph_name)),
            TermRef::BlankNode(s) => self.contains(QuadRef::new(s, predicate, object, graph_name)),
            _ => false,
        }
    }
}

impl StoreMut for Dataset {
    fn assert(&mut self, quad: QuadRef<'_>) {
        self.insert(quad);
    }
}

/// Reads the members of an RDF list.
///
/// Returns `None` if the list is malformed: a node without exactly one `rdf:first`
/// and `rdf:rest`, or a cycle.
pub fn rdf_list(
    store: &dyn Store,
    head: TermRef<'_>,
    graph_name: GraphNameRef<'_>,
) -> Option<Vec<Term>> {
    let mut items = Vec::new();
    let mut visited = FxHashSet::default();
    let mut current = head.into_owned();
    while current.as_ref() != TermRef::NamedNode(rdf::NIL) {
        if !visited.insert(current.clone()) {
            return None;
        }
        let [first] =
            <[Term; 1]>::try_from(store.each(current.as_ref(), rdf::FIRST, graph_name)).ok()?;
        let [rest] =
            <[Term; 1]>::try_from(store.each(current.as_ref(), rdf::REST, graph_name)).ok()?;
        items.push(first);
        current = rest;
    }
    Some(items)
}

/// Returns the terms used as subject or object in a graph, in matching order.
pub(crate) fn graph_nodes(store: &dyn Store, graph_name: GraphNameRef<'_>) -> Vec<Term> {
    let mut seen = FxHashSet::default();
    let mut nodes = Vec::new();
    for quad in store.statements_matching(None, None, None, Some(graph_name)) {
        for term in [Term::from(quad.subject), quad.object] {
            if seen.insert(term.clone()) {
                nodes.push(term);
            }
        }
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxrdf::{GraphName, Literal, NamedNode};

    fn ex(name: &str) -> NamedNode {
        NamedNode::new(format!("http://example.org/{name}")).unwrap()
    }

    #[test]
    fn test_each_is_scoped_to_graph() {
        let (s, p, o1, o2) = (ex("s"), ex("p"), ex("o1"), ex("o2"));
        let data = GraphName::NamedNode(ex("data"));
        let other = GraphName::NamedNode(ex("other"));
        let mut dataset = Dataset::new();
        dataset.insert(QuadRef::new(s.as_ref(), p.as_ref(), o1.as_ref(), data.as_ref()));
        dataset.insert(QuadRef::new(s.as_ref(), p.as_ref(), o2.as_ref(), other.as_ref()));

        let values = dataset.each(s.as_ref().into(), p.as_ref(), data.as_ref());
        assert_eq!(values, vec![Term::from(o1)]);
        assert!(dataset.holds(s.as_ref().into(), p.as_ref(), o2.as_ref().into(), other.as_ref()));
        assert!(!dataset.holds(s.as_ref().into(), p.as_ref(), o2.as_ref().into(), data.as_ref()));
    }

    #[test]
    fn test_literal_subject_matches_nothing() {
        let (s, p, o) = (ex("s"), ex("p"), ex("o"));
        let mut dataset = Dataset::new();
        dataset.insert(QuadRef::new(s.as_ref(), p.as_ref(), o.as_ref(), GraphNameRef::DefaultGraph));
        let literal = Literal::new_simple_literal("s");
        assert!(
            dataset
                .statements_matching(Some(literal.as_ref().into()), None, None, None)
                .is_empty()
        );
    }

    #[test]
    fn test_statements_matching_by_object() {
        let (a, b, p, q, o) = (ex("a"), ex("b"), ex("p"), ex("q"), ex("o"));
        let mut dataset = Dataset::new();
        dataset.insert(QuadRef::new(a.as_ref(), p.as_ref(), o.as_ref(), GraphNameRef::DefaultGraph));
        dataset.insert(QuadRef::new(b.as_ref(), q.as_ref(), o.as_ref(), GraphNameRef::DefaultGraph));
        let quads = dataset.statements_matching(
            None,
            Some(q.as_ref()),
            Some(o.as_ref().into()),
            Some(GraphNameRef::DefaultGraph),
        );
        assert_eq!(quads.len(), 1);
        assert_eq!(Term::from(quads[0].subject.clone()), Term::from(b));
    }

    #[test]
    fn test_rdf_list() {
        let (a, b) = (ex("a"), ex("b"));
        let mut dataset = Dataset::new();
        let g = GraphNameRef::DefaultGraph;
        let (l1, l2) = (BlankNode::default(), BlankNode::default());
        dataset.insert(QuadRef::new(l1.as_ref(), rdf::FIRST, a.as_ref(), g));
        dataset.insert(QuadRef::new(l1.as_ref(), rdf::REST, l2.as_ref(), g));
        dataset.insert(QuadRef::new(l2.as_ref(), rdf::FIRST, b.as_ref(), g));
        dataset.insert(QuadRef::new(l2.as_ref(), rdf::REST, rdf::NIL, g));

        let items = rdf_list(&dataset, l1.as_ref().into(), g).unwrap();
        assert_eq!(items, vec![Term::from(a), Term::from(b)]);
        assert_eq!(rdf_list(&dataset, rdf::NIL.into(), g), Some(Vec::new()));
    }

    #[test]
    fn test_cyclic_rdf_list_is_rejected() {
        let a = ex("a");
        let mut dataset = Dataset::new();
        let g = GraphNameRef::DefaultGraph;
        let l1 = BlankNode::default();
        dataset.insert(QuadRef::new(l1.as_ref(), rdf::FIRST, a.as_ref(), g));
        dataset.insert(QuadRef::new(l1.as_ref(), rdf::REST, l1.as_ref(), g));
        assert_eq!(rdf_list(&dataset, l1.as_ref().into(), g), None);
    }
}
