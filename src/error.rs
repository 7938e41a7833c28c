use thiserror::Error;

use crate::fields::FieldError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProgressionError {
    #[error("points cannot be negative (got {0})")]
    NegativePoints(i64),

    #[error("points value {0} is out of range")]
    PointsOverflow(i64),

    #[error("invalid email: {0}")]
    InvalidEmail(String),

    #[error("invalid field configuration: {0}")]
    InvalidFieldSpec(String),

    #[error("submission rejected: {}", format_field_errors(.0))]
    InvalidSubmission(Vec<FieldError>),

    #[error("unknown badge id: {0}")]
    UnknownBadge(String),
}

fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
