//! Error types for the roll-csv codec.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("csv error: {0}")]
  Csv(#[from] csv::Error),

  #[error("i/o error: {0}")]
  Io(#[from] std::io::Error),

  #[error("missing required column: {0}")]
  MissingColumn(&'static str),

  #[error("line {line}: invalid date {value:?}")]
  InvalidDate { line: u64, value: String },

  #[error("line {line}: invalid {column} {value:?}")]
  InvalidValue {
    line:   u64,
    column: &'static str,
    value:  String,
  },

  #[error("line {line}: {source}")]
  Label {
    line:   u64,
    #[source]
    source: roll_core::Error,
  },

  #[error("no child named {0:?}")]
  UnknownChild(String),

  #[error("{name:?} matches {count} children")]
  AmbiguousChild { name: String, count: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
