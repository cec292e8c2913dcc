//! Error types for shape checking.

use oxrdf::{NamedNode, Term};

/// Main error type returned by the checker.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ShaclError {
    /// The shapes graph is malformed.
    #[error(transparent)]
    Parse(#[from] ShaclParseError),

    /// The evaluation could not complete.
    #[error(transparent)]
    Validation(#[from] ShaclValidationError),
}

/// A malformed shape declaration.
///
/// These are fatal: the run stops before anything is written to the report graph.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ShaclParseError {
    /// A property constraint without `sh:path`.
    #[error("Property {property} of shape {shape} has no sh:path")]
    MissingPath { shape: Term, property: Term },

    /// A path structure that is not a SHACL property path.
    #[error("Invalid property path {path} in shape {shape}: {message}")]
    InvalidPropertyPath {
        shape: Term,
        path: Term,
        message: String,
    },

    /// A broken RDF list.
    #[error("Invalid RDF list in shape {shape}: {message}")]
    InvalidRdfList { shape: Term, message: String },

    /// A parameter whose value has the wrong kind.
    #[error("Invalid value for {parameter} in shape {shape}: expected {expected}, got {actual}")]
    InvalidParameter {
        shape: Term,
        parameter: NamedNode,
        expected: &'static str,
        actual: Term,
    },

    /// An `sh:pattern` that does not compile.
    #[error("Invalid regex pattern '{pattern}' in shape {shape}: {message}")]
    InvalidRegex {
        shape: Term,
        pattern: String,
        message: String,
    },
}

/// An evaluation failure.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ShaclValidationError {
    /// Shape nesting went deeper than the configured bound.
    #[error("Maximum recursion depth ({depth}) exceeded while checking {focus_node} against {shape}")]
    MaxRecursionDepth {
        depth: usize,
        focus_node: Term,
        shape: Term,
    },
}

impl ShaclParseError {
    /// Creates a missing path error.
    pub fn missing_path(shape: impl Into<Term>, property: impl Into<Term>) -> Self {
        Self::MissingPath {
            shape: shape.into(),
            property: property.into(),
        }
    }

    pub fn invalid_property_path(
        shape: impl Into<Term>,
        path: impl Into<Term>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidPropertyPath {
            shape: shape.into(),
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn invalid_rdf_list(shape: impl Into<Term>, message: impl Into<String>) -> Self {
        Self::InvalidRdfList {
            shape: shape.into(),
            message: message.into(),
        }
    }

    /// `expected` describes the accepted values, like `"an IRI"`.
    pub fn invalid_parameter(
        shape: impl Into<Term>,
        parameter: impl Into<NamedNode>,
        expected: &'static str,
        actual: impl Into<Term>,
    ) -> Self {
        Self::InvalidParameter {
            shape: shape.into(),
            parameter: parameter.into(),
            expected,
            actual: actual.into(),
        }
    }

    pub fn invalid_regex(
        shape: impl Into<Term>,
        pattern: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidRegex {
            shape: shape.into(),
            pattern: pattern.into(),
            message: message.into(),
        }
    }
}

impl ShaclValidationError {
    pub fn max_recursion_depth(
        depth: usize,
        focus_node: impl Into<Term>,
        shape: impl Into<Term>,
    ) -> Self {
        Self::MaxRecursionDepth {
            depth,
            focus_node: focus_node.into(),
            shape: shape.into(),
        }
    }
}
