//! A name → id index rebuilt from current data.
//!
//! Older copies of the register link attendance to children by full name.
//! When such data is brought in, names are resolved through this index and
//! every stored reference uses the child's id from then on.

use std::collections::HashMap;

use uuid::Uuid;

use crate::child::Child;

/// Outcome of a [`NameIndex::lookup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameLookup {
  Unique(Uuid),
  /// More than one child carries this name; the caller must disambiguate.
  Ambiguous(Vec<Uuid>),
  Missing,
}

#[derive(Debug, Clone, Default)]
pub struct NameIndex {
  by_name: HashMap<String, Vec<Uuid>>,
}

impl NameIndex {
  pub fn build(children: &[Child]) -> Self {
    let mut index = Self::default();
    for child in children {
      index.insert(&child.full_name, child.child_id);
    }
    index
  }

  /// Trim, collapse internal whitespace and lower-case.
  pub fn normalize(name: &str) -> String {
    name
      .split_whitespace()
      .collect::<Vec<_>>()
      .join(" ")
      .to_lowercase()
  }

  pub fn insert(&mut self, name: &str, child_id: Uuid) {
    let ids = self.by_name.entry(Self::normalize(name)).or_default();
    if !ids.contains(&child_id) {
      ids.push(child_id);
    }
  }

  pub fn lookup(&self, name: &str) -> NameLookup {
    match self.by_name.get(&Self::normalize(name)).map(Vec::as_slice) {
      None | Some([]) => NameLookup::Missing,
      Some([id]) => NameLookup::Unique(*id),
      Some(ids) => NameLookup::Ambiguous(ids.to_vec()),
    }
  }

  /// Normalised names shared by more than one child.
  pub fn duplicates(&self) -> impl Iterator<Item = (&str, &[Uuid])> {
    self
      .by_name
      .iter()
      .filter(|(_, ids)| ids.len() > 1)
      .map(|(name, ids)| (name.as_str(), ids.as_slice()))
  }

  pub fn len(&self) -> usize { self.by_name.len() }

  pub fn is_empty(&self) -> bool { self.by_name.is_empty() }
}
