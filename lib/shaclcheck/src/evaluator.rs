//! Evaluation of a focus node against a shape.

use oxrdf::{GraphNameRef, NamedNode, Term};
use rustc_hash::FxHashSet;
use tracing::{debug, warn};

use crate::closed::check_closed;
use crate::component::{self, Scope};
use crate::constraint::Constraint;
use crate::error::{ShaclError, ShaclValidationError};
use crate::model::{Shape, ShapeId, ShapesGraph};
use crate::options::CheckerOptions;
use crate::path::PathAdvisory;
use crate::report::ValidationResult;
use crate::store::Store;

/// State of one evaluation run.
///
/// The store is only read. Nested shapes are evaluated depth first.
pub(crate) struct Evaluator<'a> {
    store: &'a dyn Store,
    data_graph: GraphNameRef<'a>,
    shapes: &'a ShapesGraph,
    max_recursion_depth: usize,
    /// The (focus node, shape) pairs currently being evaluated.
    in_progress: FxHashSet<(Term, ShapeId)>,
    advisories: Vec<PathAdvisory>,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        store: &'a dyn Store,
        data_graph: GraphNameRef<'a>,
        shapes: &'a ShapesGraph,
        options: &CheckerOptions,
    ) -> Self {
        Self {
            store,
            data_graph,
            shapes,
            max_recursion_depth: options.max_recursion_depth,
            in_progress: FxHashSet::default(),
            advisories: Vec::new(),
        }
    }

    pub fn store(&self) -> &'a dyn Store {
        self.store
    }

    pub fn data_graph(&self) -> GraphNameRef<'a> {
        self.data_graph
    }

    /// Returns the path advisories raised so far and clears them.
    pub fn take_advisories(&mut self) -> Vec<PathAdvisory> {
        std::mem::take(&mut self.advisories)
    }

    /// Checks a node against a shape and returns the issues found, empty if it conforms.
    ///
    /// Unknown and deactivated shapes conform. Re-entering a (node, shape) pair that is
    /// already being evaluated also conforms.
    pub fn check_node_shape(
        &mut self,
        node: &Term,
        shape_id: &ShapeId,
    ) -> Result<Vec<ValidationResult>, ShaclError> {
        let shapes = self.shapes;
        let Some(shape) = shapes.get(shape_id) else {
            debug!("Shape {shape_id} is not declared, {node} conforms to it");
            return Ok(Vec::new());
        };
        if shape.deactivated {
            return Ok(Vec::new());
        }
        let key = (node.clone(), shape_id.clone());
        if self.in_progress.contains(&key) {
            warn!("Cyclic reference to shape {shape_id} while checking {node}, assuming it conforms");
            return Ok(Vec::new());
        }
        if self.in_progress.len() >= self.max_recursion_depth {
            return Err(ShaclValidationError::max_recursion_depth(
                self.max_recursion_depth,
                node.clone(),
                shape_id.to_term(),
            )
            .into());
        }

        self.in_progress.insert(key.clone());
        let result = self.evaluate(node, shape);
        self.in_progress.remove(&key);
        result
    }

    fn evaluate(
        &mut self,
        node: &Term,
        shape: &Shape,
    ) -> Result<Vec<ValidationResult>, ShaclError> {
        debug!("Checking {node} against {}", shape.id);
        let mut issues = Vec::new();

        let scope = Scope {
            focus_node: node,
            values: std::slice::from_ref(node),
            path: None,
            source_shape: &shape.id,
            severity: shape.severity,
            message: shape.message.as_deref(),
        };
        self.run_constraints(&scope, &shape.constraints, &mut issues)?;

        let allowed = self.check_properties(node, shape, &mut issues)?;
        if shape.closed {
            check_closed(self.store, self.data_graph, node, shape, &allowed, &mut issues);
        }
        Ok(issues)
    }

    /// Checks the property constraints of a shape.
    ///
    /// Returns the predicates of the simple paths declared on the shape.
    fn check_properties(
        &mut self,
        node: &Term,
        shape: &Shape,
        issues: &mut Vec<ValidationResult>,
    ) -> Result<FxHashSet<NamedNode>, ShaclError> {
        let mut allowed = FxHashSet::default();
        for property in &shape.properties {
            if let Some(predicate) = property.path.as_predicate() {
                allowed.insert(predicate.clone());
            }
            if property.deactivated {
                continue;
            }
            let values = property.path.resolve_with_advisories(
                self.store,
                self.data_graph,
                node.as_ref(),
                &mut self.advisories,
            );
            let scope = Scope {
                focus_node: node,
                values: &values,
                path: Some(&property.path),
                source_shape: &shape.id,
                severity: property.severity.unwrap_or(shape.severity),
                message: property.message.as_deref().or(shape.message.as_deref()),
            };
            self.run_constraints(&scope, &property.constraints, issues)?;
        }
        Ok(allowed)
    }

    /// Runs the constraints in declaration order: cardinality is always read first.
    fn run_constraints(
        &mut self,
        scope: &Scope<'_>,
        constraints: &[Constraint],
        issues: &mut Vec<ValidationResult>,
    ) -> Result<(), ShaclError> {
        for constraint in constraints {
            if let Some(check) = component::lookup(constraint.component()) {
                check(self, scope, constraint, issues)?;
            }
        }
        Ok(())
    }
}
