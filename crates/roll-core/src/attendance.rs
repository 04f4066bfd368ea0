//! Attendance: one row per child per session date.
//!
//! The participation vocabulary has varied over the life of the register
//! (early arrival, book, pen, bible, offering). All of them live in a single
//! superset schema; a flag that was never captured is simply `false`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Participation flags ─────────────────────────────────────────────────────

/// A boolean sub-attribute of an attendance row, meaningful only when the
/// child was present.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
  Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum ParticipationFlag {
  #[strum(to_string = "Early")]
  Early,
  #[strum(to_string = "Brought Book")]
  HasBook,
  #[strum(to_string = "Brought Pen")]
  HasPen,
  #[strum(to_string = "Brought Bible")]
  HasBible,
  #[strum(to_string = "Gave Offering")]
  GaveOffering,
}

/// The full set of participation flags for one attendance row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticipationFlags {
  pub early:         bool,
  pub has_book:      bool,
  pub has_pen:       bool,
  pub has_bible:     bool,
  pub gave_offering: bool,
}

impl ParticipationFlags {
  pub fn get(&self, flag: ParticipationFlag) -> bool {
    match flag {
      ParticipationFlag::Early => self.early,
      ParticipationFlag::HasBook => self.has_book,
      ParticipationFlag::HasPen => self.has_pen,
      ParticipationFlag::HasBible => self.has_bible,
      ParticipationFlag::GaveOffering => self.gave_offering,
    }
  }

  pub fn set(&mut self, flag: ParticipationFlag, value: bool) {
    match flag {
      ParticipationFlag::Early => self.early = value,
      ParticipationFlag::HasBook => self.has_book = value,
      ParticipationFlag::HasPen => self.has_pen = value,
      ParticipationFlag::HasBible => self.has_bible = value,
      ParticipationFlag::GaveOffering => self.gave_offering = value,
    }
  }

  /// Builder-style [`ParticipationFlags::set`].
  pub fn with(mut self, flag: ParticipationFlag) -> Self {
    self.set(flag, true);
    self
  }
}

// ─── AttendanceRecord ────────────────────────────────────────────────────────

/// A stored attendance row. Unique per `(child_id, session_date)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
  pub child_id:     Uuid,
  pub session_date: NaiveDate,
  pub present:      bool,
  /// Always all-`false` when `present` is `false`.
  pub flags:        ParticipationFlags,
  pub recorded_at:  DateTime<Utc>,
  pub updated_at:   DateTime<Utc>,
}

impl AttendanceRecord {
  /// Whether `flag` counts towards participation for this row.
  pub fn counts(&self, flag: ParticipationFlag) -> bool {
    self.present && self.flags.get(flag)
  }
}

/// Input to [`crate::store::RecordStore::upsert_attendance`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceInput {
  pub child_id:     Uuid,
  pub session_date: NaiveDate,
  pub present:      bool,
  #[serde(default)]
  pub flags:        ParticipationFlags,
}

impl AttendanceInput {
  pub fn present(child_id: Uuid, session_date: NaiveDate) -> Self {
    Self {
      child_id,
      session_date,
      present: true,
      flags: ParticipationFlags::default(),
    }
  }

  pub fn absent(child_id: Uuid, session_date: NaiveDate) -> Self {
    Self { present: false, ..Self::present(child_id, session_date) }
  }

  pub fn with_flags(mut self, flags: ParticipationFlags) -> Self {
    self.flags = flags;
    self
  }

  /// Clear participation flags on an absent row.
  pub fn normalized(mut self) -> Self {
    if !self.present {
      self.flags = ParticipationFlags::default();
    }
    self
  }
}

// ─── Filtering ───────────────────────────────────────────────────────────────

/// An inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
  pub start: NaiveDate,
  pub end:   NaiveDate,
}

impl DateRange {
  pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
    if end < start {
      return Err(Error::Validation(format!(
        "date range ends ({end}) before it starts ({start})"
      )));
    }
    Ok(Self { start, end })
  }

  /// The whole of `month` in `year`; `None` for an invalid month.
  pub fn month(year: i32, month: u32) -> Option<Self> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let (next_year, next_month) =
      if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let end = NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()?;
    Some(Self { start, end })
  }

  pub fn contains(&self, date: NaiveDate) -> bool {
    self.start <= date && date <= self.end
  }
}

/// Parameters for [`crate::store::RecordStore::list_attendance`]. All set
/// fields must match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AttendanceFilter {
  pub session_date: Option<NaiveDate>,
  pub child_id:     Option<Uuid>,
  pub date_range:   Option<DateRange>,
}

impl AttendanceFilter {
  pub fn all() -> Self { Self::default() }

  pub fn on(session_date: NaiveDate) -> Self {
    Self { session_date: Some(session_date), ..Self::default() }
  }

  pub fn for_child(child_id: Uuid) -> Self {
    Self { child_id: Some(child_id), ..Self::default() }
  }

  pub fn within(date_range: DateRange) -> Self {
    Self { date_range: Some(date_range), ..Self::default() }
  }

  pub fn matches(&self, record: &AttendanceRecord) -> bool {
    self.session_date.is_none_or(|d| record.session_date == d)
      && self.child_id.is_none_or(|id| record.child_id == id)
      && self.date_range.is_none_or(|r| r.contains(record.session_date))
  }
}
