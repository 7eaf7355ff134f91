//! Error types for `ncc-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unexpected response shape: expected {0}")]
  UnexpectedShape(&'static str),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error(transparent)]
  Validation(#[from] ValidationError),
}

/// A form rejected before submission. No request is issued for it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
  /// Wire name of the offending form field.
  pub field:   &'static str,
  pub message: String,
}

impl ValidationError {
  pub fn new(field: &'static str, message: impl Into<String>) -> Self {
    Self {
      field,
      message: message.into(),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
