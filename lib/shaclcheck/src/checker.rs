//! The shape checker entry point.

use oxrdf::{GraphName, Term};
use tracing::debug;

use crate::error::ShaclError;
use crate::evaluator::Evaluator;
use crate::model::{ShapeId, ShapesGraph};
use crate::options::CheckerOptions;
use crate::report::{ReportBuilder, ValidationReport, ValidationResult};
use crate::store::{Store, StoreMut};
use crate::target::select_targets;

/// Checks the data of a graph against the shapes of another graph of the same store.
///
/// ```
/// use oxrdf::{Dataset, GraphName, NamedNode, QuadRef};
/// use shaclcheck::{ShapeChecker, sh};
///
/// let shapes = GraphName::NamedNode(NamedNode::new("http://example.com/shapes")?);
/// let data = GraphName::NamedNode(NamedNode::new("http://example.com/data")?);
/// let report = GraphName::NamedNode(NamedNode::new("http://example.com/report")?);
///
/// let shape = NamedNode::new("http://example.com/Shape")?;
/// let node = NamedNode::new("http://example.com/node")?;
/// let mut dataset = Dataset::new();
/// dataset.insert(QuadRef::new(shape.as_ref(), sh::TARGET_NODE, node.as_ref(), shapes.as_ref()));
/// dataset.insert(QuadRef::new(shape.as_ref(), sh::NODE_KIND, sh::LITERAL, shapes.as_ref()));
///
/// let checker = ShapeChecker::new(shapes, data).with_report_graph(report.clone());
/// let result = checker.execute(&mut dataset)?;
/// assert!(!result.conforms());
/// assert_eq!(dataset.quads_for_graph_name(report.as_ref()).count(), 10);
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Debug, Clone)]
pub struct ShapeChecker {
    shapes_graph: GraphName,
    data_graph: GraphName,
    report_graph: Option<GraphName>,
    options: CheckerOptions,
}

impl ShapeChecker {
    /// Builds a checker reading shapes from `shapes_graph` and focus nodes from `data_graph`.
    pub fn new(shapes_graph: impl Into<GraphName>, data_graph: impl Into<GraphName>) -> Self {
        Self {
            shapes_graph: shapes_graph.into(),
            data_graph: data_graph.into(),
            report_graph: None,
            options: CheckerOptions::default(),
        }
    }

    /// Sets the graph [`execute`](Self::execute) writes the report into.
    #[must_use]
    pub fn with_report_graph(mut self, report_graph: impl Into<GraphName>) -> Self {
        self.report_graph = Some(report_graph.into());
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: CheckerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &CheckerOptions {
        &self.options
    }

    /// Runs the checks and returns the report without writing anything.
    pub fn validate(&self, store: &dyn Store) -> Result<ValidationReport, ShaclError> {
        let shapes = ShapesGraph::from_store(store, self.shapes_graph.as_ref())?;
        debug!("Read {} shapes from {}", shapes.len(), self.shapes_graph);
        let targets = select_targets(store, self.shapes_graph.as_ref(), self.data_graph.as_ref());

        let mut evaluator =
            Evaluator::new(store, self.data_graph.as_ref(), &shapes, &self.options);
        let mut builder = ReportBuilder::record_conformance();
        for (node, shape) in &targets {
            for issue in evaluator.check_node_shape(node, shape)? {
                builder.record_issue(issue);
            }
        }
        builder.record_advisories(evaluator.take_advisories());
        let report = builder.finalize();
        debug!(
            "Checked {} focus nodes: {} results",
            targets.len(),
            report.results().len()
        );
        Ok(report)
    }

    /// Runs the checks, then writes the report into the report graph, if one is set.
    ///
    /// Nothing is written if the shapes are malformed or the evaluation fails.
    /// Each call writes a new report node.
    pub fn execute<S: StoreMut>(&self, store: &mut S) -> Result<ValidationReport, ShaclError> {
        let report = self.validate(&*store)?;
        if let Some(report_graph) = &self.report_graph {
            report.write_to(
                store,
                report_graph.as_ref(),
                !self.options.no_result_message,
            );
        }
        Ok(report)
    }

    /// Checks a single node against a shape of the shapes graph.
    ///
    /// Returns the issues found, empty if the node conforms.
    pub fn check_node_shape(
        &self,
        store: &dyn Store,
        node: &Term,
        shape: &ShapeId,
    ) -> Result<Vec<ValidationResult>, ShaclError> {
        let shapes = ShapesGraph::from_store(store, self.shapes_graph.as_ref())?;
        Evaluator::new(store, self.data_graph.as_ref(), &shapes, &self.options)
            .check_node_shape(node, shape)
    }
}
