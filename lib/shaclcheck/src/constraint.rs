//! Compiled constraint parameters.
//!
//! A [`Constraint`] is a constraint component together with the parameter values read from
//! the shapes graph. Patterns are compiled to [`Regex`] once, when the shape is read.

use std::fmt;

use oxrdf::{Literal, NamedNode, NamedNodeRef, Term, TermRef};
use regex::Regex;

use crate::model::ShapeId;
use crate::vocab::sh;

/// A constraint declared on a shape or a property constraint.
#[derive(Debug, Clone)]
pub enum Constraint {
    // === Cardinality ===
    /// sh:minCount - Minimum number of value nodes.
    MinCount(usize),

    /// sh:maxCount - Maximum number of value nodes.
    MaxCount(usize),

    // === Value type ===
    /// sh:class - Value node must have a direct `rdf:type` of the class.
    Class(NamedNode),

    /// sh:datatype - Value node must be a literal of the datatype.
    Datatype(NamedNode),

    /// sh:nodeKind - Value node must be of the node kind.
    NodeKind(NodeKind),

    // === Property pairs ===
    /// sh:equals - Value nodes must be the values of the property on the focus node.
    Equals(NamedNode),

    /// sh:disjoint - Value nodes must not be values of the property on the focus node.
    Disjoint(NamedNode),

    /// sh:lessThan - Value nodes must be smaller than the values of the property.
    LessThan(NamedNode),

    /// sh:lessThanOrEquals - Value nodes must be smaller than or equal to the values of the property.
    LessThanOrEquals(NamedNode),

    // === Value range ===
    MinInclusive(Literal),
    MinExclusive(Literal),
    MaxInclusive(Literal),
    MaxExclusive(Literal),

    // === String based ===
    MinLength(usize),
    MaxLength(usize),

    /// sh:pattern with its optional sh:flags.
    Pattern(Pattern),

    /// sh:languageIn - Allowed language ranges.
    LanguageIn(Vec<String>),

    /// sh:uniqueLang - No two value nodes may share a language tag.
    UniqueLang,

    // === Shape based ===
    Node(ShapeId),
    Not(ShapeId),
    And(Vec<ShapeId>),
    Or(Vec<ShapeId>),
    Xone(Vec<ShapeId>),

    // === Other ===
    /// sh:in - Value node must be one of the members.
    In(Vec<Term>),

    /// sh:hasValue - The term must be one of the value nodes.
    HasValue(Term),
}

impl Constraint {
    /// Returns the constraint component this constraint belongs to.
    pub fn component(&self) -> ConstraintComponent {
        match self {
            Self::MinCount(_) => ConstraintComponent::MinCount,
            Self::MaxCount(_) => ConstraintComponent::MaxCount,
            Self::Class(_) => ConstraintComponent::Class,
            Self::Datatype(_) => ConstraintComponent::Datatype,
            Self::NodeKind(_) => ConstraintComponent::NodeKind,
            Self::Equals(_) => ConstraintComponent::Equals,
            Self::Disjoint(_) => ConstraintComponent::Disjoint,
            Self::LessThan(_) => ConstraintComponent::LessThan,
            Self::LessThanOrEquals(_) => ConstraintComponent::LessThanOrEquals,
            Self::MinInclusive(_) => ConstraintComponent::MinInclusive,
            Self::MinExclusive(_) => ConstraintComponent::MinExclusive,
            Self::MaxInclusive(_) => ConstraintComponent::MaxInclusive,
            Self::MaxExclusive(_) => ConstraintComponent::MaxExclusive,
            Self::MinLength(_) => ConstraintComponent::MinLength,
            Self::MaxLength(_) => ConstraintComponent::MaxLength,
            Self::Pattern(_) => ConstraintComponent::Pattern,
            Self::LanguageIn(_) => ConstraintComponent::LanguageIn,
            Self::UniqueLang => ConstraintComponent::UniqueLang,
            Self::Node(_) => ConstraintComponent::Node,
            Self::Not(_) => ConstraintComponent::Not,
            Self::And(_) => ConstraintComponent::And,
            Self::Or(_) => ConstraintComponent::Or,
            Self::Xone(_) => ConstraintComponent::Xone,
            Self::In(_) => ConstraintComponent::In,
            Self::HasValue(_) => ConstraintComponent::HasValue,
        }
    }

    /// Returns the shapes this constraint refers to.
    pub fn shape_references(&self) -> &[ShapeId] {
        match self {
            Self::Node(shape) | Self::Not(shape) => std::slice::from_ref(shape),
            Self::And(shapes) | Self::Or(shapes) | Self::Xone(shapes) => shapes,
            _ => &[],
        }
    }
}

/// A compiled `sh:pattern`.
#[derive(Debug, Clone)]
pub struct Pattern {
    pattern: String,
    regex: Regex,
}

impl Pattern {
    /// Compiles a pattern with SHACL flags.
    ///
    /// The supported flags are `i`, `m`, `s` and `x`. Other flags are ignored.
    pub fn new(pattern: impl Into<String>, flags: Option<String>) -> Result<Self, regex::Error> {
        let pattern = pattern.into();
        let inline = flags
            .as_deref()
            .unwrap_or_default()
            .chars()
            .filter(|c| matches!(c, 'i' | 'm' | 's' | 'x'))
            .collect::<String>();
        let regex = if inline.is_empty() {
            Regex::new(&pattern)?
        } else {
            Regex::new(&format!("(?{inline}){pattern}"))?
        };
        Ok(Self { pattern, regex })
    }

    /// The pattern as written in the shapes graph.
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Checks if the pattern matches somewhere in the string.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// The node kinds of `sh:nodeKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Iri,
    BlankNode,
    Literal,
    BlankNodeOrIri,
    BlankNodeOrLiteral,
    IriOrLiteral,
}

impl NodeKind {
    /// Returns the IRI for this node kind.
    pub fn iri(self) -> NamedNodeRef<'static> {
        match self {
            Self::Iri => sh::IRI,
            Self::BlankNode => sh::BLANK_NODE,
            Self::Literal => sh::LITERAL,
            Self::BlankNodeOrIri => sh::BLANK_NODE_OR_IRI,
            Self::BlankNodeOrLiteral => sh::BLANK_NODE_OR_LITERAL,
            Self::IriOrLiteral => sh::IRI_OR_LITERAL,
        }
    }

    /// Parses a node kind from an IRI.
    pub fn from_iri(iri: NamedNodeRef<'_>) -> Option<Self> {
        [
            Self::Iri,
            Self::BlankNode,
            Self::Literal,
            Self::BlankNodeOrIri,
            Self::BlankNodeOrLiteral,
            Self::IriOrLiteral,
        ]
        .into_iter()
        .find(|kind| kind.iri() == iri)
    }

    /// Checks if a term is of this kind.
    pub fn matches(self, term: TermRef<'_>) -> bool {
        let (iri, blank, literal) = match term {
            TermRef::NamedNode(_) => (true, false, false),
            TermRef::BlankNode(_) => (false, true, false),
            TermRef::Literal(_) => (false, false, true),
            #[cfg(feature = "rdf-12")]
            TermRef::Triple(_) => return false,
        };
        match self {
            Self::Iri => iri,
            Self::BlankNode => blank,
            Self::Literal => literal,
            Self::BlankNodeOrIri => blank || iri,
            Self::BlankNodeOrLiteral => blank || literal,
            Self::IriOrLiteral => iri || literal,
        }
    }
}

/// SHACL constraint component identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintComponent {
    MinCount,
    MaxCount,
    Class,
    Datatype,
    NodeKind,
    Equals,
    Disjoint,
    LessThan,
    LessThanOrEquals,
    MinInclusive,
    MinExclusive,
    MaxInclusive,
    MaxExclusive,
    MinLength,
    MaxLength,
    Pattern,
    LanguageIn,
    UniqueLang,
    Node,
    Not,
    And,
    Or,
    Xone,
    In,
    HasValue,
    Closed,
}

impl ConstraintComponent {
    /// Returns the IRI of this constraint component.
    pub fn iri(self) -> NamedNodeRef<'static> {
        match self {
            Self::MinCount => sh::MIN_COUNT_CONSTRAINT_COMPONENT,
            Self::MaxCount => sh::MAX_COUNT_CONSTRAINT_COMPONENT,
            Self::Class => sh::CLASS_CONSTRAINT_COMPONENT,
            Self::Datatype => sh::DATATYPE_CONSTRAINT_COMPONENT,
            Self::NodeKind => sh::NODE_KIND_CONSTRAINT_COMPONENT,
            Self::Equals => sh::EQUALS_CONSTRAINT_COMPONENT,
            Self::Disjoint => sh::DISJOINT_CONSTRAINT_COMPONENT,
            Self::LessThan => sh::LESS_THAN_CONSTRAINT_COMPONENT,
            Self::LessThanOrEquals => sh::LESS_THAN_OR_EQUALS_CONSTRAINT_COMPONENT,
            Self::MinInclusive => sh::MIN_INCLUSIVE_CONSTRAINT_COMPONENT,
            Self::MinExclusive => sh::MIN_EXCLUSIVE_CONSTRAINT_COMPONENT,
            Self::MaxInclusive => sh::MAX_INCLUSIVE_CONSTRAINT_COMPONENT,
            Self::MaxExclusive => sh::MAX_EXCLUSIVE_CONSTRAINT_COMPONENT,
            Self::MinLength => sh::MIN_LENGTH_CONSTRAINT_COMPONENT,
            Self::MaxLength => sh::MAX_LENGTH_CONSTRAINT_COMPONENT,
            Self::Pattern => sh::PATTERN_CONSTRAINT_COMPONENT,
            Self::LanguageIn => sh::LANGUAGE_IN_CONSTRAINT_COMPONENT,
            Self::UniqueLang => sh::UNIQUE_LANG_CONSTRAINT_COMPONENT,
            Self::Node => sh::NODE_CONSTRAINT_COMPONENT,
            Self::Not => sh::NOT_CONSTRAINT_COMPONENT,
            Self::And => sh::AND_CONSTRAINT_COMPONENT,
            Self::Or => sh::OR_CONSTRAINT_COMPONENT,
            Self::Xone => sh::XONE_CONSTRAINT_COMPONENT,
            Self::In => sh::IN_CONSTRAINT_COMPONENT,
            Self::HasValue => sh::HAS_VALUE_CONSTRAINT_COMPONENT,
            Self::Closed => sh::CLOSED_CONSTRAINT_COMPONENT,
        }
    }
}

impl fmt::Display for ConstraintComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let iri = self.iri().as_str();
        f.write_str(iri.strip_prefix(sh::NAMESPACE).unwrap_or(iri))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxrdf::{BlankNode, Literal};

    #[test]
    fn test_pattern_flags() {
        let pattern = Pattern::new("^abc", Some("i".into())).unwrap();
        assert!(pattern.is_match("ABCdef"));
        let pattern = Pattern::new("^abc", None).unwrap();
        assert!(!pattern.is_match("ABCdef"));
        let pattern = Pattern::new("a b c", Some("x".into())).unwrap();
        assert!(pattern.is_match("abc"));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(Pattern::new("(", None).is_err());
    }

    #[test]
    fn test_node_kind_matches() {
        let iri = NamedNode::new("http://example.org/a").unwrap();
        let blank = BlankNode::default();
        let literal = Literal::new_simple_literal("a");
        assert!(NodeKind::Iri.matches(iri.as_ref().into()));
        assert!(!NodeKind::Iri.matches(blank.as_ref().into()));
        assert!(NodeKind::BlankNodeOrLiteral.matches(literal.as_ref().into()));
        assert!(!NodeKind::BlankNodeOrIri.matches(literal.as_ref().into()));
        assert_eq!(NodeKind::from_iri(sh::IRI_OR_LITERAL), Some(NodeKind::IriOrLiteral));
        assert_eq!(NodeKind::from_iri(sh::NODE_SHAPE), None);
    }

    #[test]
    fn test_component_display() {
        assert_eq!(ConstraintComponent::MinCount.to_string(), "MinCountConstraintComponent");
        assert_eq!(
            Constraint::LessThan(NamedNode::new("http://example.org/p").unwrap()).component(),
            ConstraintComponent::LessThan
        );
    }
}
