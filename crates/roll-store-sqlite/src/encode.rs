//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, calendar dates are `YYYY-MM-DD` (so they
//! sort lexically), enums are their serde tags, and UUIDs are hyphenated
//! lowercase strings.

use chrono::{DateTime, NaiveDate, Utc};
use roll_core::{
  attendance::{AttendanceRecord, ParticipationFlags},
  child::{Child, Grade, Guardian},
  performance::{PerformanceRecord, SubjectScores},
};
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ────────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Enums ────────────────────────────────────────────────────────────────────

/// The serde tag of a unit enum variant, e.g. `ClassGroup::ChosenNation` →
/// `"chosen_nation"`.
pub fn encode_tag<T: Serialize>(value: &T) -> Result<String> {
  match serde_json::to_value(value)? {
    serde_json::Value::String(s) => Ok(s),
    other => Err(Error::Encoding(format!("not a unit variant: {other}"))),
  }
}

pub fn decode_tag<T: DeserializeOwned>(s: &str) -> Result<T> {
  Ok(serde_json::from_value(serde_json::Value::String(s.to_owned()))?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const CHILD_COLUMNS: &str = "child_id, full_name, gender, date_of_birth, \
  school, grade, class_group, residence, parent1_name, parent1_contact, \
  parent2_name, parent2_contact, sponsored, registered_at";

/// Raw values read directly from a `children` row.
pub struct RawChild {
  pub child_id:        String,
  pub full_name:       String,
  pub gender:          String,
  pub date_of_birth:   Option<String>,
  pub school:          String,
  pub grade:           Option<String>,
  pub class_group:     String,
  pub residence:       String,
  pub parent1_name:    Option<String>,
  pub parent1_contact: Option<String>,
  pub parent2_name:    Option<String>,
  pub parent2_contact: Option<String>,
  pub sponsored:       bool,
  pub registered_at:   String,
}

impl RawChild {
  /// Map a row selected with [`CHILD_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      child_id:        row.get(0)?,
      full_name:       row.get(1)?,
      gender:          row.get(2)?,
      date_of_birth:   row.get(3)?,
      school:          row.get(4)?,
      grade:           row.get(5)?,
      class_group:     row.get(6)?,
      residence:       row.get(7)?,
      parent1_name:    row.get(8)?,
      parent1_contact: row.get(9)?,
      parent2_name:    row.get(10)?,
      parent2_contact: row.get(11)?,
      sponsored:       row.get(12)?,
      registered_at:   row.get(13)?,
    })
  }

  pub fn into_child(self) -> Result<Child> {
    fn guardian(name: Option<String>, contact: Option<String>) -> Option<Guardian> {
      match (name, contact) {
        (None, None) => None,
        (name, contact) => {
          Some(Guardian::new(name.unwrap_or_default(), contact.unwrap_or_default()))
        }
      }
    }

    Ok(Child {
      child_id:           decode_uuid(&self.child_id)?,
      full_name:          self.full_name,
      gender:             decode_tag(&self.gender)?,
      date_of_birth:      self.date_of_birth.as_deref().map(decode_date).transpose()?,
      school:             self.school,
      grade:              self.grade.as_deref().map(decode_tag::<Grade>).transpose()?,
      class_group:        decode_tag(&self.class_group)?,
      residence:          self.residence,
      primary_guardian:   guardian(self.parent1_name, self.parent1_contact),
      secondary_guardian: guardian(self.parent2_name, self.parent2_contact),
      sponsored:          self.sponsored,
      registered_at:      decode_dt(&self.registered_at)?,
    })
  }
}

pub const ATTENDANCE_COLUMNS: &str = "child_id, session_date, present, early, \
  has_book, has_pen, has_bible, gave_offering, recorded_at, updated_at";

/// Raw values read directly from an `attendance` row.
pub struct RawAttendance {
  pub child_id:     String,
  pub session_date: String,
  pub present:      bool,
  pub flags:        ParticipationFlags,
  pub recorded_at:  String,
  pub updated_at:   String,
}

impl RawAttendance {
  /// Map a row selected with [`ATTENDANCE_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      child_id:     row.get(0)?,
      session_date: row.get(1)?,
      present:      row.get(2)?,
      flags:        ParticipationFlags {
        early:         row.get(3)?,
        has_book:      row.get(4)?,
        has_pen:       row.get(5)?,
        has_bible:     row.get(6)?,
        gave_offering: row.get(7)?,
      },
      recorded_at:  row.get(8)?,
      updated_at:   row.get(9)?,
    })
  }

  pub fn into_record(self) -> Result<AttendanceRecord> {
    Ok(AttendanceRecord {
      child_id:     decode_uuid(&self.child_id)?,
      session_date: decode_date(&self.session_date)?,
      present:      self.present,
      flags:        self.flags,
      recorded_at:  decode_dt(&self.recorded_at)?,
      updated_at:   decode_dt(&self.updated_at)?,
    })
  }
}

pub const PERFORMANCE_COLUMNS: &str = "performance_id, child_id, year, term, \
  mathematics, english, kiswahili, science, social_studies, \
  religious_education, remarks, recorded_at";

/// Raw values read directly from a `performance` row.
pub struct RawPerformance {
  pub performance_id: String,
  pub child_id:       String,
  pub year:           i32,
  pub term:           String,
  pub scores:         SubjectScores,
  pub remarks:        String,
  pub recorded_at:    String,
}

impl RawPerformance {
  /// Map a row selected with [`PERFORMANCE_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      performance_id: row.get(0)?,
      child_id:       row.get(1)?,
      year:           row.get(2)?,
      term:           row.get(3)?,
      scores:         SubjectScores {
        mathematics:         row.get(4)?,
        english:             row.get(5)?,
        kiswahili:           row.get(6)?,
        science:             row.get(7)?,
        social_studies:      row.get(8)?,
        religious_education: row.get(9)?,
      },
      remarks:        row.get(10)?,
      recorded_at:    row.get(11)?,
    })
  }

  pub fn into_record(self) -> Result<PerformanceRecord> {
    Ok(PerformanceRecord {
      performance_id: decode_uuid(&self.performance_id)?,
      child_id:       decode_uuid(&self.child_id)?,
      year:           self.year,
      term:           decode_tag(&self.term)?,
      scores:         self.scores,
      remarks:        self.remarks,
      recorded_at:    decode_dt(&self.recorded_at)?,
    })
  }
}
