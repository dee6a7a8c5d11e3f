//! Error types for `psur-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Boundary input that cannot be turned into a record field.
  #[error("invalid value for field `{field}`: {message}")]
  Validation { field: String, message: String },

  #[error("unknown field: {0:?}")]
  UnknownField(String),

  #[error("field `{0}` cannot be changed through a patch")]
  ReadOnlyField(String),
}

impl Error {
  pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
    Self::Validation { field: field.into(), message: message.into() }
  }

  /// The offending field name.
  pub fn field(&self) -> &str {
    match self {
      Self::Validation { field, .. } | Self::UnknownField(field) | Self::ReadOnlyField(field) => {
        field
      }
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
