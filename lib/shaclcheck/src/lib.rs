#![doc = include_str!("../README.md")]
#![doc(test(attr(deny(warnings))))]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc(html_favicon_url = "https://raw.githubusercontent.com/oxigraph/oxigraph/main/logo.svg")]
#![doc(html_logo_url = "https://raw.githubusercontent.com/oxigraph/oxigraph/main/logo.svg")]

mod checker;
mod closed;
mod component;
mod constraint;
mod error;
mod evaluator;
mod model;
mod options;
mod path;
mod report;
mod store;
mod target;
pub mod vocab;

pub use checker::ShapeChecker;
pub use constraint::{Constraint, ConstraintComponent, NodeKind, Pattern};
pub use error::{ShaclError, ShaclParseError, ShaclValidationError};
pub use model::{PropertyConstraint, Shape, ShapeId, ShapesGraph};
pub use options::CheckerOptions;
pub use path::{PathAdvisory, PathAdvisoryKind, PropertyPath};
pub use report::{ReportBuilder, Severity, ValidationReport, ValidationResult};
pub use store::{Store, StoreMut, rdf_list};
pub use target::{Target, select_targets};
pub use vocab::sh;
