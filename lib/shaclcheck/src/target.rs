//! Focus node selection.

use oxrdf::vocab::rdf;
use oxrdf::{GraphNameRef, NamedNode, NamedNodeRef, Term};
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::model::ShapeId;
use crate::store::Store;
use crate::vocab::sh;

/// Target declaration for selecting focus nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// sh:targetClass - Direct instances of the class.
    Class(NamedNode),
    /// sh:targetNode - The node itself.
    Node(Term),
    /// sh:targetSubjectsOf - Subjects of statements with the predicate.
    SubjectsOf(NamedNode),
    /// sh:targetObjectsOf - Objects of statements with the predicate.
    ObjectsOf(NamedNode),
}

impl Target {
    fn predicate(&self) -> NamedNodeRef<'static> {
        match self {
            Self::Class(_) => sh::TARGET_CLASS,
            Self::Node(_) => sh::TARGET_NODE,
            Self::SubjectsOf(_) => sh::TARGET_SUBJECTS_OF,
            Self::ObjectsOf(_) => sh::TARGET_OBJECTS_OF,
        }
    }

    /// Returns the focus nodes of the target in the data graph, in store order.
    pub fn focus_nodes(&self, store: &dyn Store, data_graph: GraphNameRef<'_>) -> Vec<Term> {
        match self {
            Self::Class(class) => store.each_subject(rdf::TYPE, class.as_ref().into(), data_graph),
            Self::Node(node) => vec![node.clone()],
            Self::SubjectsOf(predicate) => store
                .statements_matching(None, Some(predicate.as_ref()), None, Some(data_graph))
                .into_iter()
                .map(|q| q.subject.into())
                .collect(),
            Self::ObjectsOf(predicate) => store
                .statements_matching(None, Some(predicate.as_ref()), None, Some(data_graph))
                .into_iter()
                .map(|q| q.object)
                .collect(),
        }
    }
}

/// Enumerates the (focus node, shape) pairs declared in the shapes graph.
///
/// Declarations are visited per target kind (class, node, subjects of, objects of),
/// each kind in store matching order. A pair is only returned once.
/// Target values of the wrong kind, like a literal `sh:targetClass`, select nothing.
pub fn select_targets(
    store: &dyn Store,
    shapes_graph: GraphNameRef<'_>,
    data_graph: GraphNameRef<'_>,
) -> Vec<(Term, ShapeId)> {
    let mut seen = FxHashSet::default();
    let mut pairs = Vec::new();
    for (shape, target) in declared_targets(store, shapes_graph) {
        let focus_nodes = target.focus_nodes(store, data_graph);
        debug!(
            "{} focus nodes for <{}> of {shape}",
            focus_nodes.len(),
            target.predicate().as_str()
        );
        for node in focus_nodes {
            let pair = (node, shape.clone());
            if seen.insert(pair.clone()) {
                pairs.push(pair);
            }
        }
    }
    pairs
}

fn declared_targets(store: &dyn Store, shapes_graph: GraphNameRef<'_>) -> Vec<(ShapeId, Target)> {
    let kinds: [(NamedNodeRef<'_>, fn(Term) -> Option<Target>); 4] = [
        (sh::TARGET_CLASS, |t| match t {
            Term::NamedNode(n) => Some(Target::Class(n)),
            _ => None,
        }),
        (sh::TARGET_NODE, |t| Some(Target::Node(t))),
        (sh::TARGET_SUBJECTS_OF, |t| match t {
            Term::NamedNode(n) => Some(Target::SubjectsOf(n)),
            _ => None,
        }),
        (sh::TARGET_OBJECTS_OF, |t| match t {
            Term::NamedNode(n) => Some(Target::ObjectsOf(n)),
            _ => None,
        }),
    ];
    let mut targets = Vec::new();
    for (predicate, build) in kinds {
        for quad in store.statements_matching(None, Some(predicate), None, Some(shapes_graph)) {
            let Ok(shape) = ShapeId::try_from(Term::from(quad.subject)) else {
                continue;
            };
            if let Some(target) = build(quad.object) {
                targets.push((shape, target));
            }
        }
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxrdf::{Dataset, GraphName, QuadRef};

    fn ex(name: &str) -> NamedNode {
        NamedNode::new(format!("http://example.org/{name}")).unwrap()
    }

    #[test]
    fn test_target_class_uses_direct_types_in_data_graph() {
        let shapes = GraphName::NamedNode(ex("shapes"));
        let data = GraphName::NamedNode(ex("data"));
        let mut dataset = Dataset::new();
        dataset.insert(QuadRef::new(
            ex("S").as_ref(),
            sh::TARGET_CLASS,
            ex("Person").as_ref(),
            shapes.as_ref(),
        ));
        dataset.insert(QuadRef::new(
            ex("alice").as_ref(),
            rdf::TYPE,
            ex("Person").as_ref(),
            data.as_ref(),
        ));
        dataset.insert(QuadRef::new(
            ex("bob").as_ref(),
            rdf::TYPE,
            ex("Person").as_ref(),
            shapes.as_ref(),
        ));

        let expected: Vec<(Term, ShapeId)> = vec![(ex("alice").into(), ex("S").into())];
        assert_eq!(select_targets(&dataset, shapes.as_ref(), data.as_ref()), expected);
    }

    #[test]
    fn test_target_node_and_subjects_of() {
        let g = GraphNameRef::DefaultGraph;
        let mut dataset = Dataset::new();
        dataset.insert(QuadRef::new(ex("S").as_ref(), sh::TARGET_NODE, ex("n").as_ref(), g));
        dataset.insert(QuadRef::new(ex("S").as_ref(), sh::TARGET_SUBJECTS_OF, ex("p").as_ref(), g));
        dataset.insert(QuadRef::new(ex("T").as_ref(), sh::TARGET_OBJECTS_OF, ex("p").as_ref(), g));
        dataset.insert(QuadRef::new(ex("n").as_ref(), ex("p").as_ref(), ex("o").as_ref(), g));

        let expected: Vec<(Term, ShapeId)> = vec![
            (ex("n").into(), ex("S").into()),
            (ex("o").into(), ex("T").into()),
        ];
        assert_eq!(select_targets(&dataset, g, g), expected);
    }
}
