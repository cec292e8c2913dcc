//! Closed shapes: only declared or ignored predicates may be used on the focus node.

use oxrdf::{GraphNameRef, NamedNode, Term};
use rustc_hash::FxHashSet;

use crate::constraint::ConstraintComponent;
use crate::model::Shape;
use crate::path::PropertyPath;
use crate::report::ValidationResult;
use crate::store::Store;

/// Flags the statements about `focus_node` whose predicate is neither in `declared`
/// nor in the shape's `sh:ignoredProperties`.
///
/// Each offending statement yields one result, with the object as value and the predicate as path.
pub(crate) fn check_closed(
    store: &dyn Store,
    data_graph: GraphNameRef<'_>,
    focus_node: &Term,
    shape: &Shape,
    declared: &FxHashSet<NamedNode>,
    results: &mut Vec<ValidationResult>,
) {
    let ignored = shape.ignored_properties.iter().collect::<FxHashSet<_>>();
    for quad in store.statements_matching(Some(focus_node.as_ref()), None, None, Some(data_graph)) {
        if declared.contains(&quad.predicate) || ignored.contains(&quad.predicate) {
            continue;
        }
        let message = shape.message.clone().unwrap_or_else(|| {
            format!(
                "Predicate <{}> is not allowed (closed shape)",
                quad.predicate.as_str()
            )
        });
        results.push(
            ValidationResult::new(focus_node.clone(), shape.id.clone(), ConstraintComponent::Closed)
                .with_path(PropertyPath::Predicate(quad.predicate))
                .with_value(quad.object)
                .with_severity(shape.severity)
                .with_message(message),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxrdf::{Dataset, QuadRef};

    const G: GraphNameRef<'static> = GraphNameRef::DefaultGraph;

    fn ex(name: &str) -> NamedNode {
        NamedNode::new(format!("http://example.org/{name}")).unwrap()
    }

    fn dataset() -> Dataset {
        let mut dataset = Dataset::new();
        for (p, o) in [("name", "alice"), ("age", "thirty"), ("extra", "x")] {
            dataset.insert(QuadRef::new(ex("n").as_ref(), ex(p).as_ref(), ex(o).as_ref(), G));
        }
        dataset
    }

    #[test]
    fn test_undeclared_predicate_is_flagged_once() {
        let shape = Shape::new(ex("S").into());
        let declared = [ex("name"), ex("age")].into_iter().collect();
        let mut results = Vec::new();
        check_closed(&dataset(), G, &ex("n").into(), &shape, &declared, &mut results);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].value, Some(ex("x").into()));
        assert_eq!(results[0].result_path, Some(PropertyPath::predicate(ex("extra"))));
    }

    #[test]
    fn test_ignored_properties_are_allowed() {
        let mut shape = Shape::new(ex("S").into());
        shape.ignored_properties.push(ex("extra"));
        let declared = [ex("name"), ex("age")].into_iter().collect();
        let mut results = Vec::new();
        check_closed(&dataset(), G, &ex("n").into(), &shape, &declared, &mut results);
        assert!(results.is_empty());
    }
}
