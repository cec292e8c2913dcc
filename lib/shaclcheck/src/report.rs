//! Validation reports.
//!
//! Issues are collected in memory by a [`ReportBuilder`] while shapes are evaluated.
//! The finished [`ValidationReport`] can then be written into a graph of a [`StoreMut`]
//! using the SHACL report vocabulary.

use std::fmt;

use oxrdf::vocab::rdf;
use oxrdf::{BlankNode, Dataset, GraphNameRef, Literal, NamedNodeRef, QuadRef, Term};

use crate::constraint::ConstraintComponent;
use crate::model::ShapeId;
use crate::path::{PathAdvisory, PropertyPath};
use crate::store::StoreMut;
use crate::vocab::sh;

/// `sh:severity` of a shape, copied to the results it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Severity {
    #[default]
    Violation,
    Warning,
    Info,
}

impl Severity {
    pub fn iri(self) -> NamedNodeRef<'static> {
        match self {
            Self::Violation => sh::VIOLATION,
            Self::Warning => sh::WARNING,
            Self::Info => sh::INFO,
        }
    }

    /// Maps `sh:Violation`, `sh:Warning` and `sh:Info`. Other IRIs give `None`.
    pub fn from_iri(iri: NamedNodeRef<'_>) -> Option<Self> {
        [Self::Violation, Self::Warning, Self::Info]
            .into_iter()
            .find(|s| s.iri() == iri)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Violation => "Violation",
            Self::Warning => "Warning",
            Self::Info => "Info",
        })
    }
}

/// An issue found on a focus node, written as an `sh:ValidationResult`.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub focus_node: Term,

    /// The path of the property constraint, if the result comes from one.
    pub result_path: Option<PropertyPath>,

    /// The value that caused the result.
    pub value: Option<Term>,

    /// The shape that produced this result.
    pub source_shape: ShapeId,

    /// The constraint component that was not satisfied.
    pub source_constraint_component: ConstraintComponent,

    /// Human-readable message.
    pub result_message: Option<String>,

    pub result_severity: Severity,

    /// Nested results that caused this one.
    pub detail: Vec<ValidationResult>,
}

impl ValidationResult {
    /// Creates a new validation result with the `Violation` severity.
    pub fn new(
        focus_node: Term,
        source_shape: ShapeId,
        source_constraint_component: ConstraintComponent,
    ) -> Self {
        Self {
            focus_node,
            result_path: None,
            value: None,
            source_shape,
            source_constraint_component,
            result_message: None,
            result_severity: Severity::Violation,
            detail: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: PropertyPath) -> Self {
        self.result_path = Some(path);
        self
    }

    #[must_use]
    pub fn with_value(mut self, value: Term) -> Self {
        self.value = Some(value);
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.result_message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.result_severity = severity;
        self
    }

    /// Attaches the nested results that explain this one, written as `sh:detail`.
    #[must_use]
    pub fn with_details(mut self, details: impl IntoIterator<Item = ValidationResult>) -> Self {
        self.detail.extend(details);
        self
    }

    fn write_to(
        &self,
        store: &mut dyn StoreMut,
        graph_name: GraphNameRef<'_>,
        include_message: bool,
    ) -> BlankNode {
        let node = store.fresh_blank_node();
        let subject = node.as_ref();
        store.assert(QuadRef::new(subject, rdf::TYPE, sh::VALIDATION_RESULT, graph_name));
        store.assert(QuadRef::new(
            subject,
            sh::FOCUS_NODE,
            self.focus_node.as_ref(),
            graph_name,
        ));
        if let Some(path) = &self.result_path {
            let path = path.write_to(store, graph_name);
            store.assert(QuadRef::new(subject, sh::RESULT_PATH, path.as_ref(), graph_name));
        }
        if let Some(value) = &self.value {
            store.assert(QuadRef::new(subject, sh::VALUE, value.as_ref(), graph_name));
        }
        if include_message {
            if let Some(message) = &self.result_message {
                let message = Literal::new_simple_literal(message);
                store.assert(QuadRef::new(
                    subject,
                    sh::RESULT_MESSAGE,
                    message.as_ref(),
                    graph_name,
                ));
            }
        }
        store.assert(QuadRef::new(
            subject,
            sh::RESULT_SEVERITY,
            self.result_severity.iri(),
            graph_name,
        ));
        store.assert(QuadRef::new(
            subject,
            sh::SOURCE_SHAPE,
            self.source_shape.as_term(),
            graph_name,
        ));
        store.assert(QuadRef::new(
            subject,
            sh::SOURCE_CONSTRAINT_COMPONENT,
            self.source_constraint_component.iri(),
            graph_name,
        ));
        for detail in &self.detail {
            let detail = detail.write_to(store, graph_name, include_message);
            store.assert(QuadRef::new(subject, sh::DETAIL, detail.as_ref(), graph_name));
        }
        node
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} on {}",
            self.result_severity, self.source_constraint_component, self.focus_node
        )?;
        if let Some(path) = &self.result_path {
            write!(f, " via {path}")?;
        }
        if let Some(value) = &self.value {
            write!(f, " (value {value})")?;
        }
        if let Some(message) = &self.result_message {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}

/// A validation report.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    conforms: bool,
    results: Vec<ValidationResult>,
    advisories: Vec<PathAdvisory>,
}

impl ValidationReport {
    /// Creates an empty, conforming report.
    pub fn new() -> Self {
        Self {
            conforms: true,
            results: Vec::new(),
            advisories: Vec::new(),
        }
    }

    /// Returns true if no issue was recorded, whatever its severity.
    pub fn conforms(&self) -> bool {
        self.conforms
    }

    /// Returns the validation results in the order they were recorded.
    pub fn results(&self) -> &[ValidationResult] {
        &self.results
    }

    /// Returns the degenerate path evaluations met during the run.
    pub fn advisories(&self) -> &[PathAdvisory] {
        &self.advisories
    }

    pub fn violation_count(&self) -> usize {
        self.count(Severity::Violation)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    pub fn info_count(&self) -> usize {
        self.count(Severity::Info)
    }

    fn count(&self, severity: Severity) -> usize {
        self.results
            .iter()
            .filter(|r| r.result_severity == severity)
            .count()
    }

    /// Checks if no result was recorded.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Writes the report into a graph and returns the report node.
    ///
    /// Every call creates a new `sh:ValidationReport` node. `sh:conforms` is asserted last.
    pub fn write_to(
        &self,
        store: &mut dyn StoreMut,
        graph_name: GraphNameRef<'_>,
        include_messages: bool,
    ) -> BlankNode {
        let report = store.fresh_blank_node();
        store.assert(QuadRef::new(
            report.as_ref(),
            rdf::TYPE,
            sh::VALIDATION_REPORT,
            graph_name,
        ));
        for result in &self.results {
            let node = result.write_to(store, graph_name, include_messages);
            store.assert(QuadRef::new(report.as_ref(), sh::RESULT, node.as_ref(), graph_name));
        }
        let conforms = Literal::from(self.conforms);
        store.assert(QuadRef::new(
            report.as_ref(),
            sh::CONFORMS,
            conforms.as_ref(),
            graph_name,
        ));
        report
    }

    /// Converts the report to a dataset, in the default graph.
    pub fn to_dataset(&self) -> Dataset {
        let mut dataset = Dataset::new();
        self.write_to(&mut dataset, GraphNameRef::DefaultGraph, true);
        dataset
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Accumulates the issues of a run.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    report: ValidationReport,
}

impl ReportBuilder {
    /// Starts a conforming report.
    pub fn record_conformance() -> Self {
        Self::default()
    }

    /// Records an issue. Any issue makes the report non conforming.
    pub fn record_issue(&mut self, issue: ValidationResult) {
        self.report.conforms = false;
        self.report.results.push(issue);
    }

    pub fn record_advisories(&mut self, advisories: impl IntoIterator<Item = PathAdvisory>) {
        self.report.advisories.extend(advisories);
    }

    /// Returns the finished report.
    pub fn finalize(self) -> ValidationReport {
        self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxrdf::vocab::xsd;
    use oxrdf::{NamedNode, TermRef};

    fn ex(name: &str) -> NamedNode {
        NamedNode::new(format!("http://example.org/{name}")).unwrap()
    }

    fn issue() -> ValidationResult {
        ValidationResult::new(
            ex("alice").into(),
            ex("PersonShape").into(),
            ConstraintComponent::MinCount,
        )
        .with_path(PropertyPath::predicate(ex("name")))
        .with_message("Less than 1 values")
    }

    #[test]
    fn test_empty_report_conforms() {
        let report = ReportBuilder::record_conformance().finalize();
        assert!(report.conforms());
        assert!(report.is_empty());
    }

    #[test]
    fn test_warning_fails_conformance() {
        let mut builder = ReportBuilder::record_conformance();
        builder.record_issue(issue().with_severity(Severity::Warning));
        let report = builder.finalize();
        assert!(!report.conforms());
        assert_eq!(report.warning_count(), 1);
        assert_eq!(report.violation_count(), 0);
    }

    #[test]
    fn test_write_report() {
        let mut builder = ReportBuilder::record_conformance();
        builder.record_issue(issue());
        let report = builder.finalize();

        let mut dataset = Dataset::new();
        let graph = ex("report");
        let graph = GraphNameRef::NamedNode(graph.as_ref());
        let node = report.write_to(&mut dataset, graph, true);

        let conforms = Literal::new_typed_literal("false", xsd::BOOLEAN);
        assert!(dataset.contains(QuadRef::new(
            node.as_ref(),
            sh::CONFORMS,
            conforms.as_ref(),
            graph
        )));
        assert_eq!(dataset.quads_for_predicate(sh::RESULT).count(), 1);
        let result = dataset.quads_for_predicate(sh::FOCUS_NODE).next().unwrap().subject;
        for (predicate, object) in [
            (sh::FOCUS_NODE, TermRef::from(ex("alice").as_ref())),
            (sh::RESULT_PATH, ex("name").as_ref().into()),
            (sh::RESULT_SEVERITY, sh::VIOLATION.into()),
            (sh::SOURCE_SHAPE, ex("PersonShape").as_ref().into()),
            (sh::SOURCE_CONSTRAINT_COMPONENT, sh::MIN_COUNT_CONSTRAINT_COMPONENT.into()),
        ] {
            assert!(dataset.contains(QuadRef::new(result, predicate, object, graph)));
        }
        assert_eq!(dataset.quads_for_predicate(sh::RESULT_MESSAGE).count(), 1);
    }

    #[test]
    fn test_write_without_messages() {
        let mut builder = ReportBuilder::record_conformance();
        builder.record_issue(issue());
        let report = builder.finalize();
        let mut dataset = Dataset::new();
        report.write_to(&mut dataset, GraphNameRef::DefaultGraph, false);
        assert_eq!(dataset.quads_for_predicate(sh::RESULT_MESSAGE).count(), 0);
    }

    #[test]
    fn test_details_are_written() {
        let nested = issue();
        let outer = ValidationResult::new(
            ex("bob").into(),
            ex("OtherShape").into(),
            ConstraintComponent::Node,
        )
        .with_value(ex("alice").into())
        .with_details([nested]);
        let mut builder = ReportBuilder::record_conformance();
        builder.record_issue(outer);
        let dataset = builder.finalize().to_dataset();
        assert_eq!(dataset.quads_for_predicate(sh::DETAIL).count(), 1);
        assert_eq!(dataset.quads_for_predicate(sh::FOCUS_NODE).count(), 2);
    }
}
