//! The constraint component library.
//!
//! Every component is a plain function registered in [`REGISTRY`] under its
//! [`ConstraintComponent`] tag. A check receives the value nodes of the constraint
//! owner and pushes zero or more results.

use std::cmp::Ordering;
use std::str::FromStr;

use oxrdf::vocab::{rdf, xsd};
use oxrdf::{Literal, NamedNode, NamedNodeRef, Term};
use oxsdatatypes::{Date, DateTime, Decimal, Double, Float, Integer};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::constraint::{Constraint, ConstraintComponent};
use crate::error::ShaclError;
use crate::evaluator::Evaluator;
use crate::model::ShapeId;
use crate::path::PropertyPath;
use crate::report::{Severity, ValidationResult};

/// What a check needs to know about the constraint owner.
pub(crate) struct Scope<'a> {
    pub focus_node: &'a Term,
    /// The value nodes: the focus node itself for shape level constraints.
    pub values: &'a [Term],
    pub path: Option<&'a PropertyPath>,
    pub source_shape: &'a ShapeId,
    pub severity: Severity,
    /// Overrides the generated messages.
    pub message: Option<&'a str>,
}

impl Scope<'_> {
    fn issue(
        &self,
        component: ConstraintComponent,
        value: Option<&Term>,
        message: impl FnOnce() -> String,
    ) -> ValidationResult {
        let mut result = ValidationResult::new(
            self.focus_node.clone(),
            self.source_shape.clone(),
            component,
        )
        .with_severity(self.severity)
        .with_message(self.message.map_or_else(message, str::to_owned));
        if let Some(path) = self.path {
            result = result.with_path(path.clone());
        }
        if let Some(value) = value {
            result = result.with_value(value.clone());
        }
        result
    }
}

pub(crate) type CheckFn = fn(
    &mut Evaluator<'_>,
    &Scope<'_>,
    &Constraint,
    &mut Vec<ValidationResult>,
) -> Result<(), ShaclError>;

/// Check functions by component.
static REGISTRY: &[(ConstraintComponent, CheckFn)] = &[
    (ConstraintComponent::MinCount, min_count),
    (ConstraintComponent::MaxCount, max_count),
    (ConstraintComponent::Class, class),
    (ConstraintComponent::Datatype, datatype),
    (ConstraintComponent::NodeKind, node_kind),
    (ConstraintComponent::Equals, equals),
    (ConstraintComponent::Disjoint, disjoint),
    (ConstraintComponent::LessThan, less_than),
    (ConstraintComponent::LessThanOrEquals, less_than),
    (ConstraintComponent::MinInclusive, range),
    (ConstraintComponent::MinExclusive, range),
    (ConstraintComponent::MaxInclusive, range),
    (ConstraintComponent::MaxExclusive, range),
    (ConstraintComponent::MinLength, length),
    (ConstraintComponent::MaxLength, length),
    (ConstraintComponent::Pattern, pattern),
    (ConstraintComponent::LanguageIn, language_in),
    (ConstraintComponent::UniqueLang, unique_lang),
    (ConstraintComponent::Node, node),
    (ConstraintComponent::Not, not),
    (ConstraintComponent::And, and),
    (ConstraintComponent::Or, or),
    (ConstraintComponent::Xone, xone),
    (ConstraintComponent::In, in_list),
    (ConstraintComponent::HasValue, has_value),
];

/// Returns the check function of a component.
///
/// `sh:closed` is not in the registry: it is checked once per shape by [`crate::closed`].
pub(crate) fn lookup(component: ConstraintComponent) -> Option<CheckFn> {
    REGISTRY
        .iter()
        .find(|(c, _)| *c == component)
        .map(|(_, check)| *check)
}

fn min_count(
    _: &mut Evaluator<'_>,
    scope: &Scope<'_>,
    constraint: &Constraint,
    results: &mut Vec<ValidationResult>,
) -> Result<(), ShaclError> {
    if let Constraint::MinCount(min) = constraint {
        if scope.values.len() < *min {
            results.push(scope.issue(ConstraintComponent::MinCount, None, || {
                format!("Less than {min} values")
            }));
        }
    }
    Ok(())
}

fn max_count(
    _: &mut Evaluator<'_>,
    scope: &Scope<'_>,
    constraint: &Constraint,
    results: &mut Vec<ValidationResult>,
) -> Result<(), ShaclError> {
    if let Constraint::MaxCount(max) = constraint {
        if scope.values.len() > *max {
            results.push(scope.issue(ConstraintComponent::MaxCount, None, || {
                format!("More than {max} values")
            }));
        }
    }
    Ok(())
}

fn class(
    evaluator: &mut Evaluator<'_>,
    scope: &Scope<'_>,
    constraint: &Constraint,
    results: &mut Vec<ValidationResult>,
) -> Result<(), ShaclError> {
    let Constraint::Class(class) = constraint else {
        return Ok(());
    };
    for value in scope.values {
        let is_instance = !matches!(value, Term::Literal(_))
            && evaluator.store().holds(
                value.as_ref(),
                rdf::TYPE,
                class.as_ref().into(),
                evaluator.data_graph(),
            );
        if !is_instance {
            results.push(scope.issue(ConstraintComponent::Class, Some(value), || {
                format!("Value is not an instance of <{}>", class.as_str())
            }));
        }
    }
    Ok(())
}

fn datatype(
    _: &mut Evaluator<'_>,
    scope: &Scope<'_>,
    constraint: &Constraint,
    results: &mut Vec<ValidationResult>,
) -> Result<(), ShaclError> {
    let Constraint::Datatype(datatype) = constraint else {
        return Ok(());
    };
    for value in scope.values {
        if !matches!(value, Term::Literal(l) if l.datatype() == datatype.as_ref()) {
            results.push(scope.issue(ConstraintComponent::Datatype, Some(value), || {
                format!("Value does not have datatype <{}>", datatype.as_str())
            }));
        }
    }
    Ok(())
}

fn node_kind(
    _: &mut Evaluator<'_>,
    scope: &Scope<'_>,
    constraint: &Constraint,
    results: &mut Vec<ValidationResult>,
) -> Result<(), ShaclError> {
    let Constraint::NodeKind(kind) = constraint else {
        return Ok(());
    };
    for value in scope.values {
        if !kind.matches(value.as_ref()) {
            results.push(scope.issue(ConstraintComponent::NodeKind, Some(value), || {
                format!("Value does not match node kind <{}>", kind.iri().as_str())
            }));
        }
    }
    Ok(())
}

fn equals(
    evaluator: &mut Evaluator<'_>,
    scope: &Scope<'_>,
    constraint: &Constraint,
    results: &mut Vec<ValidationResult>,
) -> Result<(), ShaclError> {
    let Constraint::Equals(property) = constraint else {
        return Ok(());
    };
    let others = direct_values(evaluator, scope.focus_node, property);
    for value in scope.values {
        for other in &others {
            if other != value {
                results.push(scope.issue(ConstraintComponent::Equals, Some(value), || {
                    format!("Value is not equal to {other}")
                }));
            }
        }
    }
    Ok(())
}

fn disjoint(
    evaluator: &mut Evaluator<'_>,
    scope: &Scope<'_>,
    constraint: &Constraint,
    results: &mut Vec<ValidationResult>,
) -> Result<(), ShaclError> {
    let Constraint::Disjoint(property) = constraint else {
        return Ok(());
    };
    let others = direct_values(evaluator, scope.focus_node, property);
    for value in scope.values {
        if others.contains(value) {
            results.push(scope.issue(ConstraintComponent::Disjoint, Some(value), || {
                format!("Value is also a value of <{}>", property.as_str())
            }));
        }
    }
    Ok(())
}

fn less_than(
    evaluator: &mut Evaluator<'_>,
    scope: &Scope<'_>,
    constraint: &Constraint,
    results: &mut Vec<ValidationResult>,
) -> Result<(), ShaclError> {
    let (property, component, accept, relation): (_, _, fn(Ordering) -> bool, _) =
        match constraint {
            Constraint::LessThan(p) => (p, ConstraintComponent::LessThan, Ordering::is_lt, "less than"),
            Constraint::LessThanOrEquals(p) => (
                p,
                ConstraintComponent::LessThanOrEquals,
                Ordering::is_le,
                "less than or equal to",
            ),
            _ => return Ok(()),
        };
    let others = direct_values(evaluator, scope.focus_node, property);
    for value in scope.values {
        for other in &others {
            if !compare_terms(value, other).is_some_and(accept) {
                results.push(scope.issue(component, Some(value), || {
                    format!("Value is not {relation} {other}")
                }));
            }
        }
    }
    Ok(())
}

fn range(
    _: &mut Evaluator<'_>,
    scope: &Scope<'_>,
    constraint: &Constraint,
    results: &mut Vec<ValidationResult>,
) -> Result<(), ShaclError> {
    let (bound, accept, relation): (_, fn(Ordering) -> bool, _) = match constraint {
        Constraint::MinInclusive(b) => (b, Ordering::is_ge, "greater than or equal to"),
        Constraint::MinExclusive(b) => (b, Ordering::is_gt, "greater than"),
        Constraint::MaxInclusive(b) => (b, Ordering::is_le, "less than or equal to"),
        Constraint::MaxExclusive(b) => (b, Ordering::is_lt, "less than"),
        _ => return Ok(()),
    };
    for value in scope.values {
        let in_range = match value {
            Term::Literal(literal) => compare_literals(literal, bound).is_some_and(accept),
            _ => false,
        };
        if !in_range {
            results.push(scope.issue(constraint.component(), Some(value), || {
                format!("Value must be {relation} {}", bound.value())
            }));
        }
    }
    Ok(())
}

fn length(
    _: &mut Evaluator<'_>,
    scope: &Scope<'_>,
    constraint: &Constraint,
    results: &mut Vec<ValidationResult>,
) -> Result<(), ShaclError> {
    let (bound, accept, relation): (_, fn(&usize, &usize) -> bool, _) = match constraint {
        Constraint::MinLength(n) => (*n, usize::ge, "at least"),
        Constraint::MaxLength(n) => (*n, usize::le, "at most"),
        _ => return Ok(()),
    };
    for value in scope.values {
        let ok = lexical_form(value).is_some_and(|s| accept(&s.chars().count(), &bound));
        if !ok {
            results.push(scope.issue(constraint.component(), Some(value), || {
                format!("Value must have {relation} {bound} characters")
            }));
        }
    }
    Ok(())
}

fn pattern(
    _: &mut Evaluator<'_>,
    scope: &Scope<'_>,
    constraint: &Constraint,
    results: &mut Vec<ValidationResult>,
) -> Result<(), ShaclError> {
    let Constraint::Pattern(pattern) = constraint else {
        return Ok(());
    };
    for value in scope.values {
        if !lexical_form(value).is_some_and(|s| pattern.is_match(s)) {
            results.push(scope.issue(ConstraintComponent::Pattern, Some(value), || {
                format!("Value does not match pattern '{}'", pattern.as_str())
            }));
        }
    }
    Ok(())
}

fn language_in(
    _: &mut Evaluator<'_>,
    scope: &Scope<'_>,
    constraint: &Constraint,
    results: &mut Vec<ValidationResult>,
) -> Result<(), ShaclError> {
    let Constraint::LanguageIn(languages) = constraint else {
        return Ok(());
    };
    for value in scope.values {
        let language = match value {
            Term::Literal(l) => l.language(),
            _ => None,
        };
        if !language.is_some_and(|tag| languages.iter().any(|l| l.eq_ignore_ascii_case(tag))) {
            results.push(scope.issue(ConstraintComponent::LanguageIn, Some(value), || {
                format!("Language tag not in {}", languages.join(", "))
            }));
        }
    }
    Ok(())
}

fn unique_lang(
    _: &mut Evaluator<'_>,
    scope: &Scope<'_>,
    constraint: &Constraint,
    results: &mut Vec<ValidationResult>,
) -> Result<(), ShaclError> {
    if !matches!(constraint, Constraint::UniqueLang) {
        return Ok(());
    }
    let mut counts = FxHashMap::<String, usize>::default();
    let mut order = Vec::new();
    for value in scope.values {
        if let Term::Literal(literal) = value {
            if let Some(language) = literal.language() {
                let language = language.to_ascii_lowercase();
                let count = counts.entry(language.clone()).or_default();
                *count += 1;
                if *count == 2 {
                    order.push(language);
                }
            }
        }
    }
    for language in order {
        results.push(scope.issue(ConstraintComponent::UniqueLang, None, || {
            format!("Duplicate language tag: {language}")
        }));
    }
    Ok(())
}

fn node(
    evaluator: &mut Evaluator<'_>,
    scope: &Scope<'_>,
    constraint: &Constraint,
    results: &mut Vec<ValidationResult>,
) -> Result<(), ShaclError> {
    let Constraint::Node(shape) = constraint else {
        return Ok(());
    };
    for value in scope.values {
        let nested = evaluator.check_node_shape(value, shape)?;
        if !nested.is_empty() {
            results.push(
                scope
                    .issue(ConstraintComponent::Node, Some(value), || {
                        format!("Value does not conform to shape {shape}")
                    })
                    .with_details(nested),
            );
        }
    }
    Ok(())
}

fn not(
    evaluator: &mut Evaluator<'_>,
    scope: &Scope<'_>,
    constraint: &Constraint,
    results: &mut Vec<ValidationResult>,
) -> Result<(), ShaclError> {
    let Constraint::Not(shape) = constraint else {
        return Ok(());
    };
    for value in scope.values {
        if evaluator.check_node_shape(value, shape)?.is_empty() {
            results.push(scope.issue(ConstraintComponent::Not, Some(value), || {
                format!("Value conforms to negated shape {shape}")
            }));
        }
    }
    Ok(())
}

fn and(
    evaluator: &mut Evaluator<'_>,
    scope: &Scope<'_>,
    constraint: &Constraint,
    results: &mut Vec<ValidationResult>,
) -> Result<(), ShaclError> {
    let Constraint::And(shapes) = constraint else {
        return Ok(());
    };
    for value in scope.values {
        let mut details = Vec::new();
        for shape in shapes {
            details.extend(evaluator.check_node_shape(value, shape)?);
        }
        if !details.is_empty() {
            results.push(
                scope
                    .issue(ConstraintComponent::And, Some(value), || {
                        "Value does not conform to all shapes in sh:and".into()
                    })
                    .with_details(details),
            );
        }
    }
    Ok(())
}

fn or(
    evaluator: &mut Evaluator<'_>,
    scope: &Scope<'_>,
    constraint: &Constraint,
    results: &mut Vec<ValidationResult>,
) -> Result<(), ShaclError> {
    let Constraint::Or(shapes) = constraint else {
        return Ok(());
    };
    for value in scope.values {
        let mut conforms = false;
        for shape in shapes {
            if evaluator.check_node_shape(value, shape)?.is_empty() {
                conforms = true;
                break;
            }
        }
        if !conforms {
            results.push(scope.issue(ConstraintComponent::Or, Some(value), || {
                "Value does not conform to any shape in sh:or".into()
            }));
        }
    }
    Ok(())
}

fn xone(
    evaluator: &mut Evaluator<'_>,
    scope: &Scope<'_>,
    constraint: &Constraint,
    results: &mut Vec<ValidationResult>,
) -> Result<(), ShaclError> {
    let Constraint::Xone(shapes) = constraint else {
        return Ok(());
    };
    for value in scope.values {
        let mut conforming = 0;
        for shape in shapes {
            if evaluator.check_node_shape(value, shape)?.is_empty() {
                conforming += 1;
            }
        }
        if conforming != 1 {
            results.push(scope.issue(ConstraintComponent::Xone, Some(value), || {
                format!("Value conforms to {conforming} shapes in sh:xone, exactly one was expected")
            }));
        }
    }
    Ok(())
}

fn in_list(
    _: &mut Evaluator<'_>,
    scope: &Scope<'_>,
    constraint: &Constraint,
    results: &mut Vec<ValidationResult>,
) -> Result<(), ShaclError> {
    let Constraint::In(members) = constraint else {
        return Ok(());
    };
    let members = members.iter().collect::<FxHashSet<_>>();
    for value in scope.values {
        if !members.contains(value) {
            results.push(scope.issue(ConstraintComponent::In, Some(value), || {
                "Value is not in the allowed list".into()
            }));
        }
    }
    Ok(())
}

fn has_value(
    _: &mut Evaluator<'_>,
    scope: &Scope<'_>,
    constraint: &Constraint,
    results: &mut Vec<ValidationResult>,
) -> Result<(), ShaclError> {
    let Constraint::HasValue(expected) = constraint else {
        return Ok(());
    };
    if !scope.values.contains(expected) {
        results.push(scope.issue(ConstraintComponent::HasValue, None, || {
            format!("Missing expected value {expected}")
        }));
    }
    Ok(())
}

/// The string length and pattern constraints apply to: IRIs and literal lexical forms.
fn lexical_form(term: &Term) -> Option<&str> {
    match term {
        Term::NamedNode(n) => Some(n.as_str()),
        Term::Literal(l) => Some(l.value()),
        _ => None,
    }
}

const INTEGER_DATATYPES: [NamedNodeRef<'static>; 13] = [
    xsd::INTEGER,
    xsd::LONG,
    xsd::INT,
    xsd::SHORT,
    xsd::BYTE,
    xsd::NON_NEGATIVE_INTEGER,
    xsd::POSITIVE_INTEGER,
    xsd::NON_POSITIVE_INTEGER,
    xsd::NEGATIVE_INTEGER,
    xsd::UNSIGNED_LONG,
    xsd::UNSIGNED_INT,
    xsd::UNSIGNED_SHORT,
    xsd::UNSIGNED_BYTE,
];

/// The value of a literal, for ordering comparisons.
#[derive(Debug, Clone, Copy)]
enum TypedValue<'a> {
    Integer(Integer),
    Decimal(Decimal),
    Float(Float),
    Double(Double),
    DateTime(DateTime),
    Date(Date),
    String(&'a str),
}

impl<'a> TypedValue<'a> {
    fn from_literal(literal: &'a Literal) -> Option<Self> {
        let datatype = literal.datatype();
        let value = literal.value();
        Some(if datatype == xsd::STRING {
            Self::String(value)
        } else if INTEGER_DATATYPES.iter().any(|d| *d == datatype) {
            Self::Integer(Integer::from_str(value).ok()?)
        } else if datatype == xsd::DECIMAL {
            Self::Decimal(Decimal::from_str(value).ok()?)
        } else if datatype == xsd::FLOAT {
            Self::Float(Float::from_str(value).ok()?)
        } else if datatype == xsd::DOUBLE {
            Self::Double(Double::from_str(value).ok()?)
        } else if datatype == xsd::DATE_TIME || datatype == xsd::DATE_TIME_STAMP {
            Self::DateTime(DateTime::from_str(value).ok()?)
        } else if datatype == xsd::DATE {
            Self::Date(Date::from_str(value).ok()?)
        } else {
            return None;
        })
    }

    fn to_double(self) -> Option<Double> {
        match self {
            Self::Integer(v) => Some(v.into()),
            Self::Decimal(v) => Some(v.into()),
            Self::Float(v) => Some(v.into()),
            Self::Double(v) => Some(v),
            _ => None,
        }
    }

    fn partial_cmp(self, other: Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a.partial_cmp(&b),
            (Self::Integer(a), Self::Decimal(b)) => Decimal::from(a).partial_cmp(&b),
            (Self::Decimal(a), Self::Integer(b)) => a.partial_cmp(&Decimal::from(b)),
            (Self::Decimal(a), Self::Decimal(b)) => a.partial_cmp(&b),
            (Self::DateTime(a), Self::DateTime(b)) => a.partial_cmp(&b),
            (Self::Date(a), Self::Date(b)) => a.partial_cmp(&b),
            (Self::String(a), Self::String(b)) => a.partial_cmp(b),
            (a, b) => a.to_double()?.partial_cmp(&b.to_double()?),
        }
    }
}

/// Compares two literals by value.
///
/// Returns `None` when the literals have no comparable typed values.
pub(crate) fn compare_literals(a: &Literal, b: &Literal) -> Option<Ordering> {
    TypedValue::from_literal(a)?.partial_cmp(TypedValue::from_literal(b)?)
}

/// Compares two terms by value. Only literals are comparable.
pub(crate) fn compare_terms(a: &Term, b: &Term) -> Option<Ordering> {
    match (a, b) {
        (Term::Literal(a), Term::Literal(b)) => compare_literals(a, b),
        _ => None,
    }
}

/// Values of a predicate on a node, in the data graph.
fn direct_values(evaluator: &Evaluator<'_>, node: &Term, property: &NamedNode) -> Vec<Term> {
    evaluator
        .store()
        .each(node.as_ref(), property.as_ref(), evaluator.data_graph())
}
