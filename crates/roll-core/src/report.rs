//! The report aggregator.
//!
//! Every function here is a pure, deterministic transform of an in-memory
//! snapshot of children and attendance rows. Nothing fails: an empty input
//! produces zero counts, and every rate whose denominator is zero is `0.0`.
//!
//! Rates are percentages in `0.0..=100.0`. Participation rates are taken
//! over children who were present, never over the whole roster. A row whose
//! child is not in the supplied roster is ignored, so `absent_count` can
//! never go negative.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use uuid::Uuid;

use crate::{
  attendance::{AttendanceRecord, DateRange, ParticipationFlag},
  child::{Child, ClassGroup},
  performance::{PerformanceRecord, SchoolSubject, Term},
};

pub type FlagCounts = BTreeMap<ParticipationFlag, usize>;
pub type FlagRates = BTreeMap<ParticipationFlag, f64>;

/// `numerator / denominator` as a percentage; `0.0` when `denominator == 0`.
pub fn rate(numerator: usize, denominator: usize) -> f64 {
  if denominator == 0 {
    0.0
  } else {
    numerator as f64 / denominator as f64 * 100.0
  }
}

fn count_flags<'a>(rows: impl IntoIterator<Item = &'a AttendanceRecord>) -> FlagCounts {
  let mut counts: FlagCounts = ParticipationFlag::iter().map(|f| (f, 0)).collect();
  for row in rows {
    for flag in ParticipationFlag::iter() {
      if row.counts(flag) {
        *counts.entry(flag).or_default() += 1;
      }
    }
  }
  counts
}

fn flag_rates(counts: &FlagCounts, present: usize) -> FlagRates {
  counts.iter().map(|(flag, n)| (*flag, rate(*n, present))).collect()
}

// ─── Daily summaries ─────────────────────────────────────────────────────────

/// Attendance and participation for one session date over one roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
  pub date:            NaiveDate,
  pub total_children:  usize,
  pub present_count:   usize,
  /// Children without a row, or with a row marked absent.
  pub absent_count:    usize,
  /// `present_count / total_children`.
  pub attendance_rate: f64,
  /// Flag-true counts among present children; every flag is listed.
  pub flag_counts:     FlagCounts,
  /// `flag_counts / present_count`.
  pub flag_rates:      FlagRates,
}

fn summarize(
  date: NaiveDate,
  roster: &HashSet<Uuid>,
  attendance: &[AttendanceRecord],
) -> DailySummary {
  let mut seen = HashSet::new();
  let present: Vec<&AttendanceRecord> = attendance
    .iter()
    .filter(|r| r.session_date == date && r.present && roster.contains(&r.child_id))
    .filter(|r| seen.insert(r.child_id))
    .collect();

  let present_count = present.len();
  let flag_counts = count_flags(present);
  DailySummary {
    date,
    total_children: roster.len(),
    present_count,
    absent_count: roster.len() - present_count,
    attendance_rate: rate(present_count, roster.len()),
    flag_rates: flag_rates(&flag_counts, present_count),
    flag_counts,
  }
}

fn roster<'a>(children: impl IntoIterator<Item = &'a Child>) -> HashSet<Uuid> {
  children.into_iter().map(|c| c.child_id).collect()
}

/// Summary of `date` across every child in `children`.
pub fn daily_summary(
  children: &[Child],
  attendance: &[AttendanceRecord],
  date: NaiveDate,
) -> DailySummary {
  summarize(date, &roster(children), attendance)
}

/// One [`DailySummary`] per class group. All five groups are always present,
/// including groups with no children.
pub fn class_breakdown(
  children: &[Child],
  attendance: &[AttendanceRecord],
  date: NaiveDate,
) -> BTreeMap<ClassGroup, DailySummary> {
  ClassGroup::iter()
    .map(|group| {
      let members = roster(children.iter().filter(|c| c.class_group == group));
      (group, summarize(date, &members, attendance))
    })
    .collect()
}

/// [`DailySummary`] restricted to sponsored children.
pub fn sponsored_breakdown(
  children: &[Child],
  attendance: &[AttendanceRecord],
  date: NaiveDate,
) -> DailySummary {
  summarize(date, &roster(children.iter().filter(|c| c.sponsored)), attendance)
}

// ─── Child profile ───────────────────────────────────────────────────────────

/// Historical attendance statistics for a single child.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildProfile {
  pub child_id:          Uuid,
  pub full_name:         String,
  pub class_group:       ClassGroup,
  /// Sessions the child was present at.
  pub total_sessions:    usize,
  pub present_count:     usize,
  /// Every row recorded for the child, present or not.
  pub recorded_sessions: usize,
  /// `present_count / recorded_sessions`.
  pub attendance_rate:   f64,
  pub flag_counts:       FlagCounts,
  /// `flag_counts / present_count`.
  pub flag_rates:        FlagRates,
  pub first_attended:    Option<NaiveDate>,
  pub last_attended:     Option<NaiveDate>,
}

/// Profile for `child_id`, or `None` if the child is not in `children`.
pub fn child_profile(
  children: &[Child],
  attendance: &[AttendanceRecord],
  child_id: Uuid,
) -> Option<ChildProfile> {
  let child = children.iter().find(|c| c.child_id == child_id)?;

  // One row per date; the store guarantees it, a raw slice might not.
  let mut by_date: BTreeMap<NaiveDate, &AttendanceRecord> = BTreeMap::new();
  for row in attendance.iter().filter(|r| r.child_id == child_id) {
    by_date.entry(row.session_date).or_insert(row);
  }

  let present: Vec<&AttendanceRecord> =
    by_date.values().copied().filter(|r| r.present).collect();
  let present_count = present.len();
  let first_attended = present.first().map(|r| r.session_date);
  let last_attended = present.last().map(|r| r.session_date);
  let flag_counts = count_flags(present);

  Some(ChildProfile {
    child_id,
    full_name: child.full_name.clone(),
    class_group: child.class_group,
    total_sessions: present_count,
    present_count,
    recorded_sessions: by_date.len(),
    attendance_rate: rate(present_count, by_date.len()),
    flag_rates: flag_rates(&flag_counts, present_count),
    flag_counts,
    first_attended,
    last_attended,
  })
}

// ─── Period summaries ────────────────────────────────────────────────────────

/// Per-session statistics over a period; drives trend charts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
  /// `None` when the requested period was not a valid calendar range.
  pub range:                Option<DateRange>,
  /// Distinct session dates inside the period, ascending.
  pub session_dates:        Vec<NaiveDate>,
  /// One summary per entry of `session_dates`, in the same order.
  pub per_session:          Vec<DailySummary>,
  /// Mean of the per-session attendance rates; `0.0` with no sessions.
  pub mean_attendance_rate: f64,
}

impl PeriodSummary {
  fn empty(range: Option<DateRange>) -> Self {
    Self {
      range,
      session_dates: Vec::new(),
      per_session: Vec::new(),
      mean_attendance_rate: 0.0,
    }
  }
}

fn mean_rate(per_session: &[DailySummary]) -> f64 {
  if per_session.is_empty() {
    return 0.0;
  }
  per_session.iter().map(|s| s.attendance_rate).sum::<f64>()
    / per_session.len() as f64
}

/// Summaries for every session held inside `range` (inclusive).
///
/// A session is any date with at least one attendance row.
pub fn period_summary(
  children: &[Child],
  attendance: &[AttendanceRecord],
  range: DateRange,
) -> PeriodSummary {
  let session_dates: BTreeSet<NaiveDate> = attendance
    .iter()
    .map(|r| r.session_date)
    .filter(|d| range.contains(*d))
    .collect();

  let members = roster(children);
  let per_session: Vec<DailySummary> = session_dates
    .iter()
    .map(|d| summarize(*d, &members, attendance))
    .collect();

  PeriodSummary {
    range: Some(range),
    session_dates: session_dates.into_iter().collect(),
    mean_attendance_rate: mean_rate(&per_session),
    per_session,
  }
}

/// [`period_summary`] over a calendar month. An invalid month yields an
/// empty summary.
pub fn monthly_summary(
  children: &[Child],
  attendance: &[AttendanceRecord],
  year: i32,
  month: u32,
) -> PeriodSummary {
  match DateRange::month(year, month) {
    Some(range) => period_summary(children, attendance, range),
    None => PeriodSummary::empty(None),
  }
}

// ─── Performance ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
  pub year:             i32,
  pub term:             Term,
  pub record_count:     usize,
  /// Mean score per subject; every subject is listed.
  pub subject_averages: BTreeMap<SchoolSubject, f64>,
  pub overall_average:  f64,
}

/// Average scores of every row logged for `year` / `term`. Duplicate rows
/// from re-submission are counted as logged.
pub fn performance_summary(
  records: &[PerformanceRecord],
  year: i32,
  term: Term,
) -> PerformanceSummary {
  let rows: Vec<&PerformanceRecord> =
    records.iter().filter(|r| r.year == year && r.term == term).collect();

  let mean = |values: Vec<f64>| {
    if values.is_empty() {
      0.0
    } else {
      values.iter().sum::<f64>() / values.len() as f64
    }
  };

  let subject_averages = SchoolSubject::iter()
    .map(|s| (s, mean(rows.iter().map(|r| f64::from(r.scores.get(s))).collect())))
    .collect();

  PerformanceSummary {
    year,
    term,
    record_count: rows.len(),
    subject_averages,
    overall_average: mean(rows.iter().map(|r| r.scores.mean()).collect()),
  }
}
