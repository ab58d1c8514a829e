// Errors raised by the crate itself. Collaborator errors (store, parser, io) pass through as-is.

use std::fmt;

/// A facet strategy could not derive a value from a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FacetError {
    /// The row has no value for the binding the strategy reads.
    MissingBinding(String),
    /// The row has a value, but not one the strategy understands.
    Unparseable { binding: String, value: String },
}

impl fmt::Display for FacetError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FacetError::MissingBinding(binding) => write!(f, "Row has no binding {}", binding),
            FacetError::Unparseable { binding, value } => {
                write!(f, "Cannot interpret {:?} in binding {}", value, binding)
            }
        }
    }
}

impl std::error::Error for FacetError {}

#[derive(Debug)]
pub struct ResourceNotFound {
    pub label: String,
}

impl fmt::Display for ResourceNotFound {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "No resource found for {:?}", self.label)
    }
}

impl std::error::Error for ResourceNotFound {}

/// The full-text index refused a value because it does not match the field's declared type.
#[derive(Debug)]
pub struct FieldTypeError {
    pub field: String,
    pub expected: String,
    pub found: String,
}

impl fmt::Display for FieldTypeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Field {} expects a value of type {}, got {}",
            self.field, self.expected, self.found
        )
    }
}

impl std::error::Error for FieldTypeError {}
