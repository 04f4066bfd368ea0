//! Error types for `roll-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("validation failed: {0}")]
  Validation(String),

  #[error("child not found: {0}")]
  ChildNotFound(Uuid),

  #[error("unknown {kind}: {value:?}")]
  UnknownLabel { kind: &'static str, value: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
