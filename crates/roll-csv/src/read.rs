//! Tolerant readers for register tables.
//!
//! Pipeline:
//!   raw reader
//!     └─ csv::Reader (trimmed, flexible row length)
//!          └─ resolve header aliases  → column indices
//!               └─ decode each row     → Result<T> per row

use std::io::Read;

use chrono::NaiveDate;
use roll_core::{
  attendance::{AttendanceInput, ParticipationFlags},
  child::{ChildInput, ClassGroup, Gender, Grade, Guardian},
  label::{Labelled, label_key},
  names::{NameIndex, NameLookup},
};
use uuid::Uuid;

use crate::error::{Error, Result};

// ─── Header aliases ──────────────────────────────────────────────────────────

// Headers are compared with `label_key`, so "Full Name", "full_name" and
// "FULL NAME" are one alias.
const CHILD_ID: &[&str] = &["child_id", "id"];
const FULL_NAME: &[&str] = &["full_name", "name", "child name"];
const GENDER: &[&str] = &["gender", "sex"];
const DATE_OF_BIRTH: &[&str] = &["date_of_birth", "dob", "birth date"];
const SCHOOL: &[&str] = &["school"];
const GRADE: &[&str] = &["grade"];
const CLASS_GROUP: &[&str] = &["class_group", "group/class", "class", "group"];
const RESIDENCE: &[&str] = &["residence"];
const PARENT1_NAME: &[&str] = &["parent1_name", "parent 1"];
const PARENT1_CONTACT: &[&str] = &["parent1_contact", "contact 1"];
const PARENT2_NAME: &[&str] = &["parent2_name", "parent 2"];
const PARENT2_CONTACT: &[&str] = &["parent2_contact", "contact 2"];
const SPONSORED: &[&str] = &["sponsored", "sponsored by ocm"];

const SESSION_DATE: &[&str] = &["session_date", "session date", "date"];
const PRESENT: &[&str] = &["present", "attendance status", "status"];
const EARLY: &[&str] = &["early", "arrival time", "arrived early"];
const HAS_BOOK: &[&str] = &["has_book", "brought book"];
const HAS_PEN: &[&str] = &["has_pen", "brought pen"];
const HAS_BIBLE: &[&str] = &["has_bible", "brought bible"];
const GAVE_OFFERING: &[&str] = &["gave_offering", "brought offering", "offering"];

fn find_column(headers: &csv::StringRecord, aliases: &[&str]) -> Option<usize> {
  let keys: Vec<String> = aliases.iter().map(|a| label_key(a)).collect();
  headers
    .iter()
    .position(|h| keys.contains(&label_key(h)))
}

fn cell(record: &csv::StringRecord, column: Option<usize>) -> &str {
  column.and_then(|i| record.get(i)).unwrap_or("")
}

fn line_of(record: &csv::StringRecord) -> u64 {
  record.position().map_or(0, csv::Position::line)
}

fn reader<R: Read>(input: R) -> csv::Reader<R> {
  csv::ReaderBuilder::new()
    .flexible(true)
    .trim(csv::Trim::All)
    .from_reader(input)
}

// ─── Cell decoding ───────────────────────────────────────────────────────────

/// Parse a yes/no style cell. Blank is `false`.
pub(crate) fn parse_bool(value: &str) -> Option<bool> {
  match label_key(value).as_str() {
    "" | "no" | "n" | "false" | "f" | "0" | "absent" | "late" | "ontime" => {
      Some(false)
    }
    "yes" | "y" | "true" | "t" | "1" | "x" | "present" | "early" => Some(true),
    _ => None,
  }
}

/// Accepts ISO dates (optionally followed by a time) and day-first
/// `DD/MM/YYYY` or `DD-MM-YYYY`.
pub(crate) fn parse_date(value: &str) -> Option<NaiveDate> {
  let iso = value.get(..10).filter(|_| {
    value.len() == 10 || matches!(value.as_bytes().get(10), Some(b' ' | b'T'))
  });
  iso
    .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
    .or_else(|| NaiveDate::parse_from_str(value, "%d/%m/%Y").ok())
    .or_else(|| NaiveDate::parse_from_str(value, "%d-%m-%Y").ok())
}

fn bool_cell(
  record: &csv::StringRecord,
  column: Option<usize>,
  name: &'static str,
) -> Result<bool> {
  let value = cell(record, column);
  parse_bool(value).ok_or_else(|| Error::InvalidValue {
    line:   line_of(record),
    column: name,
    value:  value.to_owned(),
  })
}

fn label_cell<T: Labelled>(
  record: &csv::StringRecord,
  column: Option<usize>,
) -> Result<Option<T>> {
  let value = cell(record, column);
  if value.is_empty() {
    return Ok(None);
  }
  T::from_label(value)
    .map(Some)
    .map_err(|source| Error::Label { line: line_of(record), source })
}

fn guardian(name: &str, contact: &str) -> Option<Guardian> {
  let g = Guardian::new(name, contact);
  (!g.is_blank()).then_some(g)
}

// ─── Children ────────────────────────────────────────────────────────────────

struct ChildColumns {
  child_id:        Option<usize>,
  full_name:       usize,
  gender:          Option<usize>,
  date_of_birth:   Option<usize>,
  school:          Option<usize>,
  grade:           Option<usize>,
  class_group:     Option<usize>,
  residence:       Option<usize>,
  parent1_name:    Option<usize>,
  parent1_contact: Option<usize>,
  parent2_name:    Option<usize>,
  parent2_contact: Option<usize>,
  sponsored:       Option<usize>,
}

impl ChildColumns {
  fn resolve(headers: &csv::StringRecord) -> Result<Self> {
    Ok(Self {
      child_id:        find_column(headers, CHILD_ID),
      full_name:       find_column(headers, FULL_NAME)
        .ok_or(Error::MissingColumn("full_name"))?,
      gender:          find_column(headers, GENDER),
      date_of_birth:   find_column(headers, DATE_OF_BIRTH),
      school:          find_column(headers, SCHOOL),
      grade:           find_column(headers, GRADE),
      class_group:     find_column(headers, CLASS_GROUP),
      residence:       find_column(headers, RESIDENCE),
      parent1_name:    find_column(headers, PARENT1_NAME),
      parent1_contact: find_column(headers, PARENT1_CONTACT),
      parent2_name:    find_column(headers, PARENT2_NAME),
      parent2_contact: find_column(headers, PARENT2_CONTACT),
      sponsored:       find_column(headers, SPONSORED),
    })
  }

  fn decode(&self, record: &csv::StringRecord) -> Result<ChildInput> {
    let line = line_of(record);

    let child_id = match cell(record, self.child_id) {
      "" => None,
      s => Some(Uuid::parse_str(s).map_err(|_| Error::InvalidValue {
        line,
        column: "child_id",
        value: s.to_owned(),
      })?),
    };

    let full_name = cell(record, Some(self.full_name));
    if full_name.is_empty() {
      return Err(Error::InvalidValue {
        line,
        column: "full_name",
        value: String::new(),
      });
    }

    let date_of_birth = match cell(record, self.date_of_birth) {
      "" => None,
      s => Some(parse_date(s).ok_or_else(|| Error::InvalidDate {
        line,
        value: s.to_owned(),
      })?),
    };

    let grade: Option<Grade> = label_cell(record, self.grade)?;
    // An explicit class wins; otherwise derive it from the grade.
    let class_group = label_cell::<ClassGroup>(record, self.class_group)?
      .or_else(|| grade.map(ClassGroup::for_grade))
      .ok_or_else(|| Error::InvalidValue {
        line,
        column: "class_group",
        value: String::new(),
      })?;

    Ok(ChildInput {
      child_id,
      full_name: full_name.to_owned(),
      gender: label_cell::<Gender>(record, self.gender)?.unwrap_or_default(),
      date_of_birth,
      school: cell(record, self.school).to_owned(),
      grade,
      class_group,
      residence: cell(record, self.residence).to_owned(),
      primary_guardian: guardian(
        cell(record, self.parent1_name),
        cell(record, self.parent1_contact),
      ),
      secondary_guardian: guardian(
        cell(record, self.parent2_name),
        cell(record, self.parent2_contact),
      ),
      sponsored: bool_cell(record, self.sponsored, "sponsored")?,
    })
  }
}

/// Read a children table.
///
/// Fails outright only when the header row lacks a name column; each data
/// row otherwise yields its own `Result` so one bad row does not abort the
/// rest.
pub fn read_children<R: Read>(input: R) -> Result<Vec<Result<ChildInput>>> {
  let mut rdr = reader(input);
  let columns = ChildColumns::resolve(rdr.headers()?)?;

  Ok(
    rdr
      .records()
      .map(|record| columns.decode(&record?))
      .collect(),
  )
}

// ─── Attendance ──────────────────────────────────────────────────────────────

/// How an attendance row names its child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildRef {
  Id(Uuid),
  /// Older tables only carry the child's full name.
  Name(String),
}

/// One decoded attendance row, before the child reference is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceRow {
  pub child:        ChildRef,
  pub session_date: NaiveDate,
  pub present:      bool,
  pub flags:        ParticipationFlags,
}

impl AttendanceRow {
  /// Resolve the child reference through `index`. Ids pass through
  /// unchanged; names must match exactly one child.
  pub fn resolve(self, index: &NameIndex) -> Result<AttendanceInput> {
    let child_id = match self.child {
      ChildRef::Id(id) => id,
      ChildRef::Name(name) => match index.lookup(&name) {
        NameLookup::Unique(id) => id,
        NameLookup::Ambiguous(ids) => {
          return Err(Error::AmbiguousChild { name, count: ids.len() });
        }
        NameLookup::Missing => return Err(Error::UnknownChild(name)),
      },
    };
    Ok(
      AttendanceInput {
        child_id,
        session_date: self.session_date,
        present: self.present,
        flags: self.flags,
      }
      .normalized(),
    )
  }
}

struct AttendanceColumns {
  child_id:      Option<usize>,
  full_name:     Option<usize>,
  session_date:  usize,
  present:       Option<usize>,
  early:         Option<usize>,
  has_book:      Option<usize>,
  has_pen:       Option<usize>,
  has_bible:     Option<usize>,
  gave_offering: Option<usize>,
}

impl AttendanceColumns {
  fn resolve(headers: &csv::StringRecord) -> Result<Self> {
    let child_id = find_column(headers, CHILD_ID);
    let full_name = find_column(headers, FULL_NAME);
    if child_id.is_none() && full_name.is_none() {
      return Err(Error::MissingColumn("child_id"));
    }
    Ok(Self {
      child_id,
      full_name,
      session_date: find_column(headers, SESSION_DATE)
        .ok_or(Error::MissingColumn("session_date"))?,
      present: find_column(headers, PRESENT),
      early: find_column(headers, EARLY),
      has_book: find_column(headers, HAS_BOOK),
      has_pen: find_column(headers, HAS_PEN),
      has_bible: find_column(headers, HAS_BIBLE),
      gave_offering: find_column(headers, GAVE_OFFERING),
    })
  }

  fn decode(&self, record: &csv::StringRecord) -> Result<AttendanceRow> {
    let line = line_of(record);

    let child = match (cell(record, self.child_id), cell(record, self.full_name)) {
      ("", "") => {
        return Err(Error::InvalidValue {
          line,
          column: "child_id",
          value: String::new(),
        });
      }
      ("", name) => ChildRef::Name(name.to_owned()),
      (id, _) => ChildRef::Id(Uuid::parse_str(id).map_err(|_| Error::InvalidValue {
        line,
        column: "child_id",
        value: id.to_owned(),
      })?),
    };

    let raw_date = cell(record, Some(self.session_date));
    let session_date = parse_date(raw_date).ok_or_else(|| Error::InvalidDate {
      line,
      value: raw_date.to_owned(),
    })?;

    Ok(AttendanceRow {
      child,
      session_date,
      present: bool_cell(record, self.present, "present")?,
      flags: ParticipationFlags {
        early:         bool_cell(record, self.early, "early")?,
        has_book:      bool_cell(record, self.has_book, "has_book")?,
        has_pen:       bool_cell(record, self.has_pen, "has_pen")?,
        has_bible:     bool_cell(record, self.has_bible, "has_bible")?,
        gave_offering: bool_cell(record, self.gave_offering, "gave_offering")?,
      },
    })
  }
}

/// Read an attendance table. Rows reference children by `child_id` when that
/// column is present and filled, otherwise by name.
pub fn read_attendance<R: Read>(input: R) -> Result<Vec<Result<AttendanceRow>>> {
  let mut rdr = reader(input);
  let columns = AttendanceColumns::resolve(rdr.headers()?)?;

  Ok(
    rdr
      .records()
      .map(|record| columns.decode(&record?))
      .collect(),
  )
}
