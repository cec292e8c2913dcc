//! Shapes read from the shapes graph.
//!
//! - [`ShapeId`] - Identifier of a shape (IRI or blank node)
//! - [`Shape`] - A node shape with its own constraints and its property constraints
//! - [`PropertyConstraint`] - A path and the constraints on the values it reaches
//! - [`ShapesGraph`] - The shapes reachable from the targets and shape declarations of a graph

use std::fmt;

use oxrdf::vocab::rdf;
use oxrdf::{BlankNode, GraphNameRef, Literal, NamedNode, NamedNodeRef, Term, TermRef};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::constraint::{Constraint, NodeKind, Pattern};
use crate::error::ShaclParseError;
use crate::path::PropertyPath;
use crate::report::Severity;
use crate::store::{Store, rdf_list};
use crate::vocab::sh;

/// Unique identifier for a shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShapeId {
    /// Named shape (IRI).
    Named(NamedNode),
    /// Anonymous shape (blank node).
    Blank(BlankNode),
}

impl ShapeId {
    /// Converts to a Term.
    pub fn to_term(&self) -> Term {
        match self {
            Self::Named(n) => n.clone().into(),
            Self::Blank(b) => b.clone().into(),
        }
    }

    /// Borrows the shape ID as a term.
    pub fn as_term(&self) -> TermRef<'_> {
        match self {
            Self::Named(n) => n.as_ref().into(),
            Self::Blank(b) => b.as_ref().into(),
        }
    }
}

impl TryFrom<Term> for ShapeId {
    type Error = Term;

    fn try_from(term: Term) -> Result<Self, Term> {
        match term {
            Term::NamedNode(n) => Ok(Self::Named(n)),
            Term::BlankNode(b) => Ok(Self::Blank(b)),
            _ => Err(term),
        }
    }
}

impl From<NamedNode> for ShapeId {
    fn from(n: NamedNode) -> Self {
        Self::Named(n)
    }
}

impl From<BlankNode> for ShapeId {
    fn from(b: BlankNode) -> Self {
        Self::Blank(b)
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(n) => write!(f, "<{}>", n.as_str()),
            Self::Blank(b) => write!(f, "_:{}", b.as_str()),
        }
    }
}

/// A shape as read from the shapes graph.
///
/// A shape that carries its own `sh:path` holds itself as its single property constraint.
#[derive(Debug, Clone)]
pub struct Shape {
    pub id: ShapeId,
    /// `sh:closed`.
    pub closed: bool,
    /// `sh:ignoredProperties`, only used when the shape is closed.
    pub ignored_properties: Vec<NamedNode>,
    /// `sh:severity`, defaults to `sh:Violation`.
    pub severity: Severity,
    /// `sh:message`.
    pub message: Option<String>,
    /// `sh:deactivated`.
    pub deactivated: bool,
    /// Constraints applied to the focus node itself.
    pub constraints: Vec<Constraint>,
    /// `sh:property` members, in store order.
    pub properties: Vec<PropertyConstraint>,
}

impl Shape {
    /// Creates a shape without any constraint.
    pub fn new(id: ShapeId) -> Self {
        Self {
            id,
            closed: false,
            ignored_properties: Vec::new(),
            severity: Severity::Violation,
            message: None,
            deactivated: false,
            constraints: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// Returns all the shapes this shape refers to through logical and shape based constraints.
    pub fn shape_references(&self) -> impl Iterator<Item = &ShapeId> {
        self.constraints
            .iter()
            .chain(self.properties.iter().flat_map(|p| p.constraints.iter()))
            .flat_map(Constraint::shape_references)
    }
}

/// A property constraint: a path and constraints on the values it reaches.
#[derive(Debug, Clone)]
pub struct PropertyConstraint {
    /// The node describing the property constraint in the shapes graph.
    pub node: Term,
    pub path: PropertyPath,
    pub constraints: Vec<Constraint>,
    /// `sh:severity` on the property constraint, overrides the shape severity.
    pub severity: Option<Severity>,
    /// `sh:message` on the property constraint, overrides the shape message.
    pub message: Option<String>,
    /// `sh:deactivated` on the property constraint.
    pub deactivated: bool,
}

/// The shapes read from a shapes graph.
#[derive(Debug, Clone, Default)]
pub struct ShapesGraph {
    shapes: FxHashMap<ShapeId, Shape>,
    order: Vec<ShapeId>,
}

impl ShapesGraph {
    /// Creates an empty shapes graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the shapes declared in a graph of the store.
    ///
    /// The shapes read are the subjects of target declarations, the instances of
    /// `sh:NodeShape` and `sh:PropertyShape`, and every shape they refer to.
    /// A referenced shape without any statement is an empty shape.
    pub fn from_store(
        store: &dyn Store,
        graph_name: GraphNameRef<'_>,
    ) -> Result<Self, ShaclParseError> {
        let reader = ShapeReader { store, graph_name };
        let mut pending = Vec::new();
        for predicate in [
            sh::TARGET_CLASS,
            sh::TARGET_NODE,
            sh::TARGET_SUBJECTS_OF,
            sh::TARGET_OBJECTS_OF,
        ] {
            for quad in store.statements_matching(None, Some(predicate), None, Some(graph_name)) {
                pending.push(Term::from(quad.subject));
            }
        }
        for class in [sh::NODE_SHAPE, sh::PROPERTY_SHAPE] {
            pending.extend(store.each_subject(rdf::TYPE, class.into(), graph_name));
        }

        let mut shapes = Self::new();
        let mut seen = FxHashSet::default();
        let mut pending = pending
            .into_iter()
            .filter_map(|term| ShapeId::try_from(term).ok())
            .collect::<Vec<_>>();
        pending.reverse();
        while let Some(id) = pending.pop() {
            if !seen.insert(id.clone()) {
                continue;
            }
            let shape = reader.read_shape(id)?;
            let mut referenced = shape
                .shape_references()
                .filter(|r| !seen.contains(*r))
                .cloned()
                .collect::<Vec<_>>();
            referenced.reverse();
            pending.extend(referenced);
            shapes.add_shape(shape);
        }
        Ok(shapes)
    }

    /// Adds a shape, replacing any shape with the same id.
    pub fn add_shape(&mut self, shape: Shape) {
        if !self.shapes.contains_key(&shape.id) {
            self.order.push(shape.id.clone());
        }
        self.shapes.insert(shape.id.clone(), shape);
    }

    /// Returns a shape by its id.
    pub fn get(&self, id: &ShapeId) -> Option<&Shape> {
        self.shapes.get(id)
    }

    /// Iterates over the shapes in the order they were read.
    pub fn shapes(&self) -> impl Iterator<Item = &Shape> {
        self.order.iter().filter_map(|id| self.shapes.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

struct ShapeReader<'a> {
    store: &'a dyn Store,
    graph_name: GraphNameRef<'a>,
}

impl ShapeReader<'_> {
    fn read_shape(&self, id: ShapeId) -> Result<Shape, ShaclParseError> {
        let term = id.to_term();
        let mut shape = Shape::new(id);
        shape.deactivated = self.boolean(&term, sh::DEACTIVATED)?.unwrap_or(false);
        shape.severity = self.severity(&term)?.unwrap_or_default();
        shape.message = self.message(&term);
        shape.closed = self.boolean(&term, sh::CLOSED)?.unwrap_or(false);
        if let Some(head) = self.object(&term, sh::IGNORED_PROPERTIES) {
            shape.ignored_properties = self
                .list(&term, &head)?
                .into_iter()
                .map(|t| match t {
                    Term::NamedNode(n) => Ok(n),
                    t => Err(ShaclParseError::invalid_parameter(
                        term.clone(),
                        sh::IGNORED_PROPERTIES,
                        "a list of IRIs",
                        t,
                    )),
                })
                .collect::<Result<_, _>>()?;
        }

        if let Some(path) = self.object(&term, sh::PATH) {
            let path = PropertyPath::parse(self.store, self.graph_name, term.as_ref(), path.as_ref())?;
            shape.properties.push(PropertyConstraint {
                node: term.clone(),
                path,
                constraints: self.constraints(&term, true)?,
                severity: None,
                message: None,
                deactivated: false,
            });
        } else {
            shape.constraints = self.constraints(&term, false)?;
        }
        for property in self.objects(&term, sh::PROPERTY) {
            shape.properties.push(self.read_property(&term, property)?);
        }
        Ok(shape)
    }

    fn read_property(
        &self,
        shape: &Term,
        property: Term,
    ) -> Result<PropertyConstraint, ShaclParseError> {
        let Some(path) = self.object(&property, sh::PATH) else {
            return Err(ShaclParseError::missing_path(shape.clone(), property));
        };
        Ok(PropertyConstraint {
            path: PropertyPath::parse(self.store, self.graph_name, shape.as_ref(), path.as_ref())?,
            constraints: self.constraints(&property, true)?,
            severity: self.severity(&property)?,
            message: self.message(&property),
            deactivated: self.boolean(&property, sh::DEACTIVATED)?.unwrap_or(false),
            node: property,
        })
    }

    /// Reads the constraint parameters of a shape or a property constraint.
    ///
    /// Cardinality is only read on property constraints.
    fn constraints(
        &self,
        owner: &Term,
        property_level: bool,
    ) -> Result<Vec<Constraint>, ShaclParseError> {
        let mut constraints = Vec::new();

        if property_level {
            for value in self.objects(owner, sh::MIN_COUNT) {
                constraints.push(Constraint::MinCount(Self::count(owner, sh::MIN_COUNT, value)?));
            }
            for value in self.objects(owner, sh::MAX_COUNT) {
                constraints.push(Constraint::MaxCount(Self::count(owner, sh::MAX_COUNT, value)?));
            }
        }

        for class in self.objects(owner, sh::CLASS) {
            constraints.push(Constraint::Class(Self::iri(owner, sh::CLASS, class)?));
        }
        for datatype in self.objects(owner, sh::DATATYPE) {
            constraints.push(Constraint::Datatype(Self::iri(owner, sh::DATATYPE, datatype)?));
        }
        for kind in self.objects(owner, sh::NODE_KIND) {
            let iri = Self::iri(owner, sh::NODE_KIND, kind)?;
            let kind = NodeKind::from_iri(iri.as_ref()).ok_or_else(|| {
                ShaclParseError::invalid_parameter(owner.clone(), sh::NODE_KIND, "a node kind", iri)
            })?;
            constraints.push(Constraint::NodeKind(kind));
        }

        let pairs: [(NamedNodeRef<'_>, fn(NamedNode) -> Constraint); 4] = [
            (sh::EQUALS, Constraint::Equals),
            (sh::DISJOINT, Constraint::Disjoint),
            (sh::LESS_THAN, Constraint::LessThan),
            (sh::LESS_THAN_OR_EQUALS, Constraint::LessThanOrEquals),
        ];
        for (parameter, constraint) in pairs {
            for value in self.objects(owner, parameter) {
                constraints.push(constraint(Self::iri(owner, parameter, value)?));
            }
        }

        let ranges: [(NamedNodeRef<'_>, fn(Literal) -> Constraint); 4] = [
            (sh::MIN_INCLUSIVE, Constraint::MinInclusive),
            (sh::MIN_EXCLUSIVE, Constraint::MinExclusive),
            (sh::MAX_INCLUSIVE, Constraint::MaxInclusive),
            (sh::MAX_EXCLUSIVE, Constraint::MaxExclusive),
        ];
        for (parameter, constraint) in ranges {
            for value in self.objects(owner, parameter) {
                constraints.push(constraint(Self::literal(owner, parameter, value)?));
            }
        }

        for value in self.objects(owner, sh::MIN_LENGTH) {
            constraints.push(Constraint::MinLength(Self::count(owner, sh::MIN_LENGTH, value)?));
        }
        for value in self.objects(owner, sh::MAX_LENGTH) {
            constraints.push(Constraint::MaxLength(Self::count(owner, sh::MAX_LENGTH, value)?));
        }

        let flags = self
            .objects(owner, sh::FLAGS)
            .into_iter()
            .next()
            .map(|f| Self::literal(owner, sh::FLAGS, f))
            .transpose()?
            .map(|f| f.value().to_owned());
        for value in self.objects(owner, sh::PATTERN) {
            let pattern = Self::literal(owner, sh::PATTERN, value)?;
            let pattern = Pattern::new(pattern.value(), flags.clone()).map_err(|e| {
                ShaclParseError::invalid_regex(owner.clone(), pattern.value(), e.to_string())
            })?;
            constraints.push(Constraint::Pattern(pattern));
        }

        for head in self.objects(owner, sh::LANGUAGE_IN) {
            let languages = self
                .list(owner, &head)?
                .into_iter()
                .map(|t| {
                    Self::literal(owner, sh::LANGUAGE_IN, t)
                        .map(|l| l.value().to_owned())
                })
                .collect::<Result<_, ShaclParseError>>()?;
            constraints.push(Constraint::LanguageIn(languages));
        }
        if self.boolean(owner, sh::UNIQUE_LANG)?.unwrap_or(false) {
            constraints.push(Constraint::UniqueLang);
        }

        for value in self.objects(owner, sh::NODE) {
            constraints.push(Constraint::Node(Self::shape_id(owner, sh::NODE, value)?));
        }
        for value in self.objects(owner, sh::NOT) {
            constraints.push(Constraint::Not(Self::shape_id(owner, sh::NOT, value)?));
        }
        let logical: [(NamedNodeRef<'_>, fn(Vec<ShapeId>) -> Constraint); 3] = [
            (sh::AND, Constraint::And),
            (sh::OR, Constraint::Or),
            (sh::XONE, Constraint::Xone),
        ];
        for (parameter, constraint) in logical {
            for head in self.objects(owner, parameter) {
                let shapes = self
                    .list(owner, &head)?
                    .into_iter()
                    .map(|t| Self::shape_id(owner, parameter, t))
                    .collect::<Result<_, _>>()?;
                constraints.push(constraint(shapes));
            }
        }

        for head in self.objects(owner, sh::IN) {
            constraints.push(Constraint::In(self.list(owner, &head)?));
        }
        for value in self.objects(owner, sh::HAS_VALUE) {
            constraints.push(Constraint::HasValue(value));
        }

        Ok(constraints)
    }

    fn objects(&self, subject: &Term, predicate: NamedNodeRef<'_>) -> Vec<Term> {
        self.store.each(subject.as_ref(), predicate, self.graph_name)
    }

    fn object(&self, subject: &Term, predicate: NamedNodeRef<'_>) -> Option<Term> {
        self.store.any(subject.as_ref(), predicate, self.graph_name)
    }

    fn list(&self, owner: &Term, head: &Term) -> Result<Vec<Term>, ShaclParseError> {
        rdf_list(self.store, head.as_ref(), self.graph_name).ok_or_else(|| {
            ShaclParseError::invalid_rdf_list(
                owner.clone(),
                format!("{head} is not a well-formed RDF list"),
            )
        })
    }

    fn iri(
        owner: &Term,
        parameter: NamedNodeRef<'_>,
        value: Term,
    ) -> Result<NamedNode, ShaclParseError> {
        match value {
            Term::NamedNode(n) => Ok(n),
            value => Err(ShaclParseError::invalid_parameter(
                owner.clone(),
                parameter,
                "an IRI",
                value,
            )),
        }
    }

    fn literal(
        owner: &Term,
        parameter: NamedNodeRef<'_>,
        value: Term,
    ) -> Result<Literal, ShaclParseError> {
        match value {
            Term::Literal(l) => Ok(l),
            value => Err(ShaclParseError::invalid_parameter(
                owner.clone(),
                parameter,
                "a literal",
                value,
            )),
        }
    }

    fn count(
        owner: &Term,
        parameter: NamedNodeRef<'_>,
        value: Term,
    ) -> Result<usize, ShaclParseError> {
        if let Term::Literal(l) = &value {
            if let Ok(count) = l.value().trim().parse() {
                return Ok(count);
            }
        }
        Err(ShaclParseError::invalid_parameter(
            owner.clone(),
            parameter,
            "a non-negative integer",
            value,
        ))
    }

    fn boolean(
        &self,
        owner: &Term,
        parameter: NamedNodeRef<'_>,
    ) -> Result<Option<bool>, ShaclParseError> {
        let Some(value) = self.object(owner, parameter) else {
            return Ok(None);
        };
        if let Term::Literal(l) = &value {
            match l.value() {
                "true" | "1" => return Ok(Some(true)),
                "false" | "0" => return Ok(Some(false)),
                _ => (),
            }
        }
        Err(ShaclParseError::invalid_parameter(
            owner.clone(),
            parameter,
            "a boolean",
            value,
        ))
    }

    fn severity(&self, owner: &Term) -> Result<Option<Severity>, ShaclParseError> {
        let Some(value) = self.object(owner, sh::SEVERITY) else {
            return Ok(None);
        };
        if let Term::NamedNode(iri) = &value {
            if let Some(severity) = Severity::from_iri(iri.as_ref()) {
                return Ok(Some(severity));
            }
        }
        Err(ShaclParseError::invalid_parameter(
            owner.clone(),
            sh::SEVERITY,
            "sh:Violation, sh:Warning or sh:Info",
            value,
        ))
    }

    fn message(&self, owner: &Term) -> Option<String> {
        self.objects(owner, sh::MESSAGE)
            .into_iter()
            .find_map(|t| match t {
                Term::Literal(l) => Some(l.value().to_owned()),
                _ => None,
            })
    }

    fn shape_id(
        owner: &Term,
        parameter: NamedNodeRef<'_>,
        value: Term,
    ) -> Result<ShapeId, ShaclParseError> {
        ShapeId::try_from(value).map_err(|value| {
            ShaclParseError::invalid_parameter(owner.clone(), parameter, "a shape", value)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::ConstraintComponent;
    use oxrdf::vocab::xsd;
    use oxrdf::{Dataset, QuadRef};

    const G: GraphNameRef<'static> = GraphNameRef::DefaultGraph;

    fn ex(name: &str) -> NamedNode {
        NamedNode::new(format!("http://example.org/{name}")).unwrap()
    }


    #[test]
    fn test_parse_empty_shapes_graph() {
        let shapes = ShapesGraph::from_store(&Dataset::new(), G).unwrap();
        assert!(shapes.is_empty());
    }

    #[test]
    fn test_parse_node_shape_with_property() {
        let (shape, name) = (ex("PersonShape"), ex("name"));
        let property = BlankNode::default();
        let count = Literal::new_typed_literal("1", xsd::INTEGER);
        let mut dataset = Dataset::new();
        dataset.insert(QuadRef::new(shape.as_ref(), rdf::TYPE, sh::NODE_SHAPE, G));
        dataset.insert(QuadRef::new(shape.as_ref(), sh::TARGET_CLASS, ex("Person").as_ref(), G));
        dataset.insert(QuadRef::new(shape.as_ref(), sh::PROPERTY, property.as_ref(), G));
        dataset.insert(QuadRef::new(property.as_ref(), sh::PATH, name.as_ref(), G));
        dataset.insert(QuadRef::new(property.as_ref(), sh::MIN_COUNT, count.as_ref(), G));
        dataset.insert(QuadRef::new(property.as_ref(), sh::SEVERITY, sh::WARNING, G));

        let shapes = ShapesGraph::from_store(&dataset, G).unwrap();
        assert_eq!(shapes.len(), 1);
        let parsed = shapes.get(&ShapeId::Named(shape)).unwrap();
        assert_eq!(parsed.properties.len(), 1);
        let property = &parsed.properties[0];
        assert_eq!(property.path, PropertyPath::predicate(name));
        assert_eq!(property.severity, Some(Severity::Warning));
        assert_eq!(
            property.constraints[0].component(),
            ConstraintComponent::MinCount
        );
    }

    #[test]
    fn test_missing_path_is_error() {
        let shape = ex("S");
        let property = BlankNode::default();
        let mut dataset = Dataset::new();
        dataset.insert(QuadRef::new(shape.as_ref(), rdf::TYPE, sh::NODE_SHAPE, G));
        dataset.insert(QuadRef::new(shape.as_ref(), sh::PROPERTY, property.as_ref(), G));
        dataset.insert(QuadRef::new(property.as_ref(), sh::MIN_COUNT, Literal::from(1).as_ref(), G));
        assert!(matches!(
            ShapesGraph::from_store(&dataset, G),
            Err(ShaclParseError::MissingPath { .. })
        ));
    }

    #[test]
    fn test_referenced_shapes_are_read() {
        let (a, b, c) = (ex("A"), ex("B"), ex("C"));
        let mut dataset = Dataset::new();
        dataset.insert(QuadRef::new(a.as_ref(), sh::TARGET_NODE, ex("n").as_ref(), G));
        dataset.insert(QuadRef::new(a.as_ref(), sh::NOT, b.as_ref(), G));
        dataset.insert(QuadRef::new(b.as_ref(), sh::NODE, c.as_ref(), G));
        dataset.insert(QuadRef::new(c.as_ref(), sh::NODE, a.as_ref(), G));

        let shapes = ShapesGraph::from_store(&dataset, G).unwrap();
        let ids = shapes.shapes().map(|s| s.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids, vec![a.into(), b.into(), ShapeId::Named(c)]);
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        let shape = ex("S");
        let mut dataset = Dataset::new();
        dataset.insert(QuadRef::new(shape.as_ref(), rdf::TYPE, sh::NODE_SHAPE, G));
        dataset.insert(QuadRef::new(shape.as_ref(), sh::PATTERN, Literal::new_simple_literal("[").as_ref(), G));
        assert!(matches!(
            ShapesGraph::from_store(&dataset, G),
            Err(ShaclParseError::InvalidRegex { .. })
        ));
    }

    #[test]
    fn test_shape_reference_must_be_a_node() {
        let shape = ex("S");
        let mut dataset = Dataset::new();
        dataset.insert(QuadRef::new(shape.as_ref(), rdf::TYPE, sh::NODE_SHAPE, G));
        dataset.insert(QuadRef::new(shape.as_ref(), sh::NODE, Literal::new_simple_literal("other").as_ref(), G));
        assert!(matches!(
            ShapesGraph::from_store(&dataset, G),
            Err(ShaclParseError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_shape_with_own_path() {
        let (shape, p) = (ex("S"), ex("p"));
        let mut dataset = Dataset::new();
        dataset.insert(QuadRef::new(shape.as_ref(), rdf::TYPE, sh::PROPERTY_SHAPE, G));
        dataset.insert(QuadRef::new(shape.as_ref(), sh::PATH, p.as_ref(), G));
        dataset.insert(QuadRef::new(shape.as_ref(), sh::DATATYPE, xsd::STRING, G));

        let shapes = ShapesGraph::from_store(&dataset, G).unwrap();
        let parsed = shapes.get(&ShapeId::Named(shape)).unwrap();
        assert!(parsed.constraints.is_empty());
        assert_eq!(parsed.properties.len(), 1);
        assert_eq!(parsed.properties[0].path, PropertyPath::predicate(p));
    }
}
