//! Tolerant parsing of human-entered enum labels.
//!
//! The register has been kept in spreadsheets and flat files with slightly
//! different spellings over time ("Chosen Generation(grade PP1–PP2)",
//! "chosen_generation", "Grade 1" vs "grade1"). Labels are compared on their
//! lower-cased alphanumeric characters only, so spacing, punctuation and the
//! dash variant never matter.

use std::fmt::Display;

use strum::IntoEnumIterator;

use crate::{Error, Result};

/// Reduce a label to its comparison key.
pub fn label_key(label: &str) -> String {
  label
    .chars()
    .filter(|c| c.is_alphanumeric())
    .flat_map(char::to_lowercase)
    .collect()
}

/// A closed enumeration with a display label and optional legacy aliases.
pub trait Labelled: IntoEnumIterator + Display + Copy {
  /// Noun used in [`Error::UnknownLabel`].
  const KIND: &'static str;

  /// Additional spellings accepted by [`Labelled::from_label`].
  fn aliases(self) -> &'static [&'static str] { &[] }

  /// Parse a label, accepting the display form, the serde form, and any
  /// alias.
  fn from_label(label: &str) -> Result<Self> {
    let key = label_key(label);
    Self::iter()
      .find(|v| {
        label_key(&v.to_string()) == key
          || v.aliases().iter().any(|a| label_key(a) == key)
      })
      .ok_or_else(|| Error::UnknownLabel {
        kind:  Self::KIND,
        value: label.to_owned(),
      })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn label_key_ignores_case_spacing_and_dashes() {
    assert_eq!(label_key("Chosen Nation(grade 1–3)"), "chosennationgrade13");
    assert_eq!(label_key("chosen nation (Grade 1-3)"), "chosennationgrade13");
    assert_eq!(label_key("  PP1 "), "pp1");
  }
}
