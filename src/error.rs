use std::fmt;

use crate::expr::{Field, Spec};

/// All errors produced when building a recurrence plan.
///
/// Every variant carries the field it was raised for and the offending
/// sub-expression, so the caller can point at the exact part of the
/// expression that needs fixing. Evaluation itself never errors: domains
/// that are empty for a particular date simply carry over to the next
/// applicable parent field.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum RecurrenceError {
    /// The field cannot accept this expression shape (for example a named
    /// value on a purely numeric field, or an unknown name).
    InvalidField { field: Field, spec: Spec },

    /// An enumeration contains an item that cannot resolve to a value of
    /// the field, or no item of it ever can.
    InvalidEnumeration { field: Field, spec: Spec },

    /// A nested element of an enumeration is malformed.
    InvalidSubField { field: Field, spec: Spec },

    /// A range expression is structurally malformed. Only reachable from
    /// untyped input surfaces such as deserialization.
    RangeInvalidField { field: Field, detail: String },

    /// A range has a non-positive step, or is empty after clipping against
    /// the field's domain.
    RangeStepMustBePositive { field: Field, spec: Spec },
}

impl fmt::Display for RecurrenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidField { field, spec } => {
                write!(f, "invalid expression for {}: {spec}", field.as_str())
            }
            Self::InvalidEnumeration { field, spec } => {
                write!(f, "invalid enumeration for {}: {spec}", field.as_str())
            }
            Self::InvalidSubField { field, spec } => {
                write!(
                    f,
                    "invalid enumeration element for {}: {spec}",
                    field.as_str()
                )
            }
            Self::RangeInvalidField { field, detail } => {
                write!(f, "invalid range for {}: {detail}", field.as_str())
            }
            Self::RangeStepMustBePositive { field, spec } => {
                write!(
                    f,
                    "range step must be positive and span non-empty for {}: {spec}",
                    field.as_str()
                )
            }
        }
    }
}

impl std::error::Error for RecurrenceError {}

impl RecurrenceError {
    pub(crate) fn invalid_field(field: Field, spec: &Spec) -> Self {
        Self::InvalidField {
            field,
            spec: spec.clone(),
        }
    }

    pub(crate) fn invalid_enumeration(field: Field, spec: &Spec) -> Self {
        Self::InvalidEnumeration {
            field,
            spec: spec.clone(),
        }
    }

    pub(crate) fn invalid_sub_field(field: Field, spec: &Spec) -> Self {
        Self::InvalidSubField {
            field,
            spec: spec.clone(),
        }
    }

    pub(crate) fn range_step(field: Field, spec: &Spec) -> Self {
        Self::RangeStepMustBePositive {
            field,
            spec: spec.clone(),
        }
    }
}
