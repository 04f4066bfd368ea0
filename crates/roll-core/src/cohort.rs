//! First-attendance tracking against a reference window.
//!
//! Children seen during a configured reference window are "pre-existing" and
//! are measured against every session since the window opened. Anyone whose
//! first attendance falls outside the window is "new" and is only measured
//! against sessions from their own first attendance onwards, so joining late
//! in the year does not count as months of absence.
//!
//! The window is always supplied by the caller (normally from
//! configuration); nothing here assumes particular months.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  attendance::{AttendanceRecord, DateRange},
  child::Child,
  report::rate,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cohort {
  /// Present at least once inside the reference window.
  PreExisting,
  /// First present after (or before) the window, never inside it.
  New,
  /// No present rows at all.
  NeverAttended,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirstAttendance {
  pub child_id:           Uuid,
  pub full_name:          String,
  pub cohort:             Cohort,
  pub first_attended:     Option<NaiveDate>,
  /// First session date included in `available_sessions`.
  pub counted_from:       Option<NaiveDate>,
  /// Distinct session dates on or after `counted_from`.
  pub available_sessions: usize,
  /// Sessions on or after `counted_from` the child was present at.
  pub present_count:      usize,
  pub attendance_rate:    f64,
}

/// Track one child. `attendance` is the full history of every child: session
/// dates are derived from it. Returns `None` for an unknown child.
pub fn first_attendance_tracking(
  children: &[Child],
  attendance: &[AttendanceRecord],
  child_id: Uuid,
  window: DateRange,
) -> Option<FirstAttendance> {
  let child = children.iter().find(|c| c.child_id == child_id)?;
  let sessions: BTreeSet<NaiveDate> =
    attendance.iter().map(|r| r.session_date).collect();
  Some(track(child, &sessions, attendance, window))
}

/// Track every child in `children`, ordered by name.
pub fn first_attendance_report(
  children: &[Child],
  attendance: &[AttendanceRecord],
  window: DateRange,
) -> Vec<FirstAttendance> {
  let sessions: BTreeSet<NaiveDate> =
    attendance.iter().map(|r| r.session_date).collect();
  let mut rows: Vec<FirstAttendance> = children
    .iter()
    .map(|c| track(c, &sessions, attendance, window))
    .collect();
  rows.sort_by(|a, b| a.full_name.cmp(&b.full_name));
  rows
}

fn track(
  child: &Child,
  sessions: &BTreeSet<NaiveDate>,
  attendance: &[AttendanceRecord],
  window: DateRange,
) -> FirstAttendance {
  let present: BTreeSet<NaiveDate> = attendance
    .iter()
    .filter(|r| r.child_id == child.child_id && r.present)
    .map(|r| r.session_date)
    .collect();

  let Some(&first) = present.first() else {
    return FirstAttendance {
      child_id:           child.child_id,
      full_name:          child.full_name.clone(),
      cohort:             Cohort::NeverAttended,
      first_attended:     None,
      counted_from:       None,
      available_sessions: 0,
      present_count:      0,
      attendance_rate:    0.0,
    };
  };

  let (cohort, counted_from) = if present.iter().any(|d| window.contains(*d)) {
    (Cohort::PreExisting, window.start)
  } else {
    (Cohort::New, first)
  };

  let available_sessions = sessions.range(counted_from..).count();
  let present_count = present.range(counted_from..).count();

  FirstAttendance {
    child_id: child.child_id,
    full_name: child.full_name.clone(),
    cohort,
    first_attended: Some(first),
    counted_from: Some(counted_from),
    available_sessions,
    present_count,
    attendance_rate: rate(present_count, available_sessions),
  }
}
