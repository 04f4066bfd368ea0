//! A registered member of the Sunday school.
//!
//! Children are identified by a generated UUID that never changes. The full
//! name is a display attribute only: it is not unique and may be edited at
//! any time without breaking attendance links.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};
use uuid::Uuid;

use crate::{Error, Result, label::Labelled};

// ─── Enumerations ────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
  Display, EnumIter,
)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
  #[default]
  #[strum(to_string = "Unset")]
  Unset,
  #[strum(to_string = "Male")]
  Male,
  #[strum(to_string = "Female")]
  Female,
}

impl Labelled for Gender {
  const KIND: &'static str = "gender";

  fn aliases(self) -> &'static [&'static str] {
    match self {
      Self::Unset => &["", "none", "unknown"],
      Self::Male => &["m", "boy"],
      Self::Female => &["f", "girl"],
    }
  }
}

/// School grade or form, from pre-primary through secondary.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
  Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
  #[strum(to_string = "PP1")]
  Pp1,
  #[strum(to_string = "PP2")]
  Pp2,
  #[strum(to_string = "Grade 1")]
  Grade1,
  #[strum(to_string = "Grade 2")]
  Grade2,
  #[strum(to_string = "Grade 3")]
  Grade3,
  #[strum(to_string = "Grade 4")]
  Grade4,
  #[strum(to_string = "Grade 5")]
  Grade5,
  #[strum(to_string = "Grade 6")]
  Grade6,
  #[strum(to_string = "Grade 7")]
  Grade7,
  #[strum(to_string = "Grade 8")]
  Grade8,
  #[strum(to_string = "Grade 9")]
  Grade9,
  #[strum(to_string = "Grade 10")]
  Grade10,
  #[strum(to_string = "Grade 11")]
  Grade11,
  #[strum(to_string = "Grade 12")]
  Grade12,
  #[strum(to_string = "Form 1")]
  Form1,
  #[strum(to_string = "Form 2")]
  Form2,
  #[strum(to_string = "Form 3")]
  Form3,
  #[strum(to_string = "Form 4")]
  Form4,
}

impl Labelled for Grade {
  const KIND: &'static str = "grade";
}

/// The five fixed age-banded cohorts children are assigned to.
///
/// Ordering follows age, youngest first; reports list groups in this order.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
  Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum ClassGroup {
  #[strum(to_string = "Chosen Generation (PP1–PP2)")]
  ChosenGeneration,
  #[strum(to_string = "Chosen Nation (Grade 1–3)")]
  ChosenNation,
  #[strum(to_string = "Priesthood (Grade 4–6)")]
  Priesthood,
  #[strum(to_string = "Priesthood 2 (Grade 7–12)")]
  PriesthoodUpper,
  #[strum(to_string = "Priesthood 2 (Form 1–4)")]
  PriesthoodForms,
}

impl Labelled for ClassGroup {
  const KIND: &'static str = "class group";

  fn aliases(self) -> &'static [&'static str] {
    match self {
      Self::ChosenGeneration => &[
        "Chosen Generation",
        "Chosen Generation(grade PP1–PP2)",
        "chosen_generation",
      ],
      Self::ChosenNation => {
        &["Chosen Nation", "Chosen Nation(grade 1–3)", "chosen_nation"]
      }
      Self::Priesthood => &["Priesthood"],
      Self::PriesthoodUpper => &[
        "Preisthood 2(grade 7–12)",
        "Priesthood 2(grade 7–12)",
        "priesthood_upper",
      ],
      Self::PriesthoodForms => {
        &["Priesthood 2(form 1–4)", "priesthood_forms"]
      }
    }
  }
}

impl ClassGroup {
  /// The cohort a child in `grade` is normally placed in.
  pub fn for_grade(grade: Grade) -> Self {
    use Grade::*;
    match grade {
      Pp1 | Pp2 => Self::ChosenGeneration,
      Grade1 | Grade2 | Grade3 => Self::ChosenNation,
      Grade4 | Grade5 | Grade6 => Self::Priesthood,
      Grade7 | Grade8 | Grade9 | Grade10 | Grade11 | Grade12 => {
        Self::PriesthoodUpper
      }
      Form1 | Form2 | Form3 | Form4 => Self::PriesthoodForms,
    }
  }
}

// ─── Child ───────────────────────────────────────────────────────────────────

/// A parent or guardian with a free-text contact (usually a phone number).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guardian {
  pub name:    String,
  #[serde(default)]
  pub contact: String,
}

impl Guardian {
  pub fn new(name: impl Into<String>, contact: impl Into<String>) -> Self {
    Self { name: name.into(), contact: contact.into() }
  }

  pub fn is_blank(&self) -> bool {
    self.name.trim().is_empty() && self.contact.trim().is_empty()
  }
}

/// A registered child as persisted by a [`crate::store::RecordStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Child {
  pub child_id:           Uuid,
  pub full_name:          String,
  pub gender:             Gender,
  pub date_of_birth:      Option<NaiveDate>,
  pub school:             String,
  pub grade:              Option<Grade>,
  pub class_group:        ClassGroup,
  pub residence:          String,
  pub primary_guardian:   Option<Guardian>,
  pub secondary_guardian: Option<Guardian>,
  /// Sponsored by the external programme ("OCM").
  pub sponsored:          bool,
  /// Server-assigned on first registration; preserved across edits.
  pub registered_at:      DateTime<Utc>,
}

// ─── ChildInput ──────────────────────────────────────────────────────────────

/// Input to [`crate::store::RecordStore::upsert_child`].
///
/// Without a `child_id` a new child is created. With one, the matching child
/// is replaced (keeping its `registered_at`) or, if absent, inserted under
/// that id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildInput {
  #[serde(default)]
  pub child_id:           Option<Uuid>,
  pub full_name:          String,
  #[serde(default)]
  pub gender:             Gender,
  #[serde(default)]
  pub date_of_birth:      Option<NaiveDate>,
  #[serde(default)]
  pub school:             String,
  #[serde(default)]
  pub grade:              Option<Grade>,
  pub class_group:        ClassGroup,
  #[serde(default)]
  pub residence:          String,
  #[serde(default)]
  pub primary_guardian:   Option<Guardian>,
  #[serde(default)]
  pub secondary_guardian: Option<Guardian>,
  #[serde(default)]
  pub sponsored:          bool,
}

impl ChildInput {
  /// Convenience constructor with all optional fields empty.
  pub fn new(full_name: impl Into<String>, class_group: ClassGroup) -> Self {
    Self {
      child_id: None,
      full_name: full_name.into(),
      gender: Gender::default(),
      date_of_birth: None,
      school: String::new(),
      grade: None,
      class_group,
      residence: String::new(),
      primary_guardian: None,
      secondary_guardian: None,
      sponsored: false,
    }
  }

  /// Check the registration rules that do not depend on stored data.
  pub fn validate(&self, today: NaiveDate) -> Result<()> {
    if self.full_name.trim().is_empty() {
      return Err(Error::Validation("full name is required".into()));
    }
    if let Some(dob) = self.date_of_birth
      && dob > today
    {
      return Err(Error::Validation(format!(
        "date of birth {dob} is in the future"
      )));
    }
    Ok(())
  }

  /// Build the stored form. Names are trimmed and blank guardians dropped.
  pub fn into_child(self, child_id: Uuid, registered_at: DateTime<Utc>) -> Child {
    let keep = |g: Option<Guardian>| g.filter(|g| !g.is_blank());
    Child {
      child_id,
      full_name: self.full_name.trim().to_owned(),
      gender: self.gender,
      date_of_birth: self.date_of_birth,
      school: self.school.trim().to_owned(),
      grade: self.grade,
      class_group: self.class_group,
      residence: self.residence.trim().to_owned(),
      primary_guardian: keep(self.primary_guardian),
      secondary_guardian: keep(self.secondary_guardian),
      sponsored: self.sponsored,
      registered_at,
    }
  }
}

impl From<Child> for ChildInput {
  fn from(c: Child) -> Self {
    Self {
      child_id:           Some(c.child_id),
      full_name:          c.full_name,
      gender:             c.gender,
      date_of_birth:      c.date_of_birth,
      school:             c.school,
      grade:              c.grade,
      class_group:        c.class_group,
      residence:          c.residence,
      primary_guardian:   c.primary_guardian,
      secondary_guardian: c.secondary_guardian,
      sponsored:          c.sponsored,
    }
  }
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator;

  use super::*;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  #[test]
  fn class_group_parses_legacy_labels() {
    assert_eq!(
      ClassGroup::from_label("Preisthood 2(grade 7–12)").unwrap(),
      ClassGroup::PriesthoodUpper
    );
    assert_eq!(
      ClassGroup::from_label("Chosen Generation(grade PP1–PP2)").unwrap(),
      ClassGroup::ChosenGeneration
    );
    assert_eq!(
      ClassGroup::from_label("priesthood 2 (form 1-4)").unwrap(),
      ClassGroup::PriesthoodForms
    );
    assert!(ClassGroup::from_label("Youth Choir").is_err());
  }

  #[test]
  fn every_class_group_round_trips_through_its_label() {
    for group in ClassGroup::iter() {
      assert_eq!(ClassGroup::from_label(&group.to_string()).unwrap(), group);
    }
    assert_eq!(ClassGroup::iter().count(), 5);
  }

  #[test]
  fn grade_and_gender_labels() {
    assert_eq!(Grade::from_label("Grade 10").unwrap(), Grade::Grade10);
    assert_eq!(Grade::from_label("grade1").unwrap(), Grade::Grade1);
    assert_eq!(Grade::from_label("FORM 4").unwrap(), Grade::Form4);
    assert_eq!(Gender::from_label("").unwrap(), Gender::Unset);
    assert_eq!(Gender::from_label("female").unwrap(), Gender::Female);
  }

  #[test]
  fn class_group_for_grade() {
    assert_eq!(ClassGroup::for_grade(Grade::Pp2), ClassGroup::ChosenGeneration);
    assert_eq!(ClassGroup::for_grade(Grade::Grade6), ClassGroup::Priesthood);
    assert_eq!(ClassGroup::for_grade(Grade::Grade9), ClassGroup::PriesthoodUpper);
    assert_eq!(ClassGroup::for_grade(Grade::Form1), ClassGroup::PriesthoodForms);
  }

  #[test]
  fn class_group_serialises_snake_case() {
    let json = serde_json::to_string(&ClassGroup::PriesthoodUpper).unwrap();
    assert_eq!(json, "\"priesthood_upper\"");
  }

  #[test]
  fn validate_rejects_blank_name_and_future_birthday() {
    let today = date(2024, 1, 7);

    let blank = ChildInput::new("   ", ClassGroup::ChosenNation);
    assert!(matches!(blank.validate(today), Err(Error::Validation(_))));

    let mut future = ChildInput::new("Amani", ClassGroup::ChosenNation);
    future.date_of_birth = Some(date(2024, 1, 8));
    assert!(future.validate(today).is_err());

    future.date_of_birth = Some(today);
    assert!(future.validate(today).is_ok());
  }

  #[test]
  fn into_child_trims_and_drops_blank_guardians() {
    let mut input = ChildInput::new("  Amani Wanjiru ", ClassGroup::Priesthood);
    input.primary_guardian = Some(Guardian::new("Grace", "0700 000 000"));
    input.secondary_guardian = Some(Guardian::new(" ", ""));

    let child = input.into_child(Uuid::new_v4(), Utc::now());
    assert_eq!(child.full_name, "Amani Wanjiru");
    assert!(child.primary_guardian.is_some());
    assert!(child.secondary_guardian.is_none());
  }
}
