//! Termly academic performance records.
//!
//! The log is append-only: submitting scores for a `(child, year, term)` that
//! already has a row adds a second row rather than replacing the first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};
use uuid::Uuid;

use crate::{Error, Result, label::Labelled};

/// Maximum score for any subject.
pub const MAX_SCORE: u8 = 100;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
  Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum Term {
  #[strum(to_string = "Term 1")]
  Term1,
  #[strum(to_string = "Term 2")]
  Term2,
  #[strum(to_string = "Term 3")]
  Term3,
}

impl Labelled for Term {
  const KIND: &'static str = "term";
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
  Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum SchoolSubject {
  #[strum(to_string = "Mathematics")]
  Mathematics,
  #[strum(to_string = "English")]
  English,
  #[strum(to_string = "Kiswahili")]
  Kiswahili,
  #[strum(to_string = "Science")]
  Science,
  #[strum(to_string = "Social Studies")]
  SocialStudies,
  #[strum(to_string = "Religious Education")]
  ReligiousEducation,
}

/// One score (0–100) per subject.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectScores {
  pub mathematics:         u8,
  pub english:             u8,
  pub kiswahili:           u8,
  pub science:             u8,
  pub social_studies:      u8,
  pub religious_education: u8,
}

impl SubjectScores {
  pub fn get(&self, subject: SchoolSubject) -> u8 {
    match subject {
      SchoolSubject::Mathematics => self.mathematics,
      SchoolSubject::English => self.english,
      SchoolSubject::Kiswahili => self.kiswahili,
      SchoolSubject::Science => self.science,
      SchoolSubject::SocialStudies => self.social_studies,
      SchoolSubject::ReligiousEducation => self.religious_education,
    }
  }

  pub fn mean(&self) -> f64 {
    let (sum, n) = SchoolSubject::iter()
      .fold((0u32, 0u32), |(sum, n), s| (sum + u32::from(self.get(s)), n + 1));
    f64::from(sum) / f64::from(n)
  }
}

/// Input to [`crate::store::RecordStore::record_performance`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPerformance {
  pub child_id: Uuid,
  pub year:     i32,
  pub term:     Term,
  pub scores:   SubjectScores,
  #[serde(default)]
  pub remarks:  String,
}

impl NewPerformance {
  pub fn validate(&self) -> Result<()> {
    if !(1900..=9999).contains(&self.year) {
      return Err(Error::Validation(format!("year {} is out of range", self.year)));
    }
    if let Some(subject) =
      SchoolSubject::iter().find(|s| self.scores.get(*s) > MAX_SCORE)
    {
      return Err(Error::Validation(format!(
        "{subject} score {} exceeds {MAX_SCORE}",
        self.scores.get(subject)
      )));
    }
    Ok(())
  }
}

/// A stored performance row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
  pub performance_id: Uuid,
  pub child_id:       Uuid,
  pub year:           i32,
  pub term:           Term,
  pub scores:         SubjectScores,
  pub remarks:        String,
  pub recorded_at:    DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn scores(all: u8) -> SubjectScores {
    SubjectScores {
      mathematics:         all,
      english:             all,
      kiswahili:           all,
      science:             all,
      social_studies:      all,
      religious_education: all,
    }
  }

  #[test]
  fn validate_rejects_scores_over_100() {
    let mut input = NewPerformance {
      child_id: Uuid::new_v4(),
      year:     2024,
      term:     Term::Term2,
      scores:   scores(100),
      remarks:  String::new(),
    };
    assert!(input.validate().is_ok());

    input.scores.science = 101;
    let err = input.validate().unwrap_err().to_string();
    assert!(err.contains("Science"), "{err}");
  }

  #[test]
  fn validate_rejects_implausible_year() {
    let input = NewPerformance {
      child_id: Uuid::new_v4(),
      year:     24,
      term:     Term::Term1,
      scores:   scores(50),
      remarks:  String::new(),
    };
    assert!(input.validate().is_err());
  }

  #[test]
  fn mean_covers_every_subject() {
    let mut s = scores(60);
    s.mathematics = 90;
    assert!((s.mean() - 65.0).abs() < 1e-9);
  }

  #[test]
  fn term_labels() {
    assert_eq!(Term::from_label("Term 3").unwrap(), Term::Term3);
    assert_eq!(Term::from_label("term2").unwrap(), Term::Term2);
  }
}
