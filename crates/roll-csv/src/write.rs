//! CSV export with fixed snake_case headers.
//!
//! Enum cells use their display labels; [`crate::read_children`] accepts
//! them back.

use std::{collections::HashMap, io::Write};

use roll_core::{attendance::AttendanceRecord, child::Child};
use uuid::Uuid;

use crate::error::Result;

const CHILD_HEADERS: [&str; 14] = [
  "child_id",
  "full_name",
  "gender",
  "date_of_birth",
  "school",
  "grade",
  "class_group",
  "residence",
  "parent1_name",
  "parent1_contact",
  "parent2_name",
  "parent2_contact",
  "sponsored",
  "registered_at",
];

const ATTENDANCE_HEADERS: [&str; 9] = [
  "child_id",
  "full_name",
  "session_date",
  "present",
  "early",
  "has_book",
  "has_pen",
  "has_bible",
  "gave_offering",
];

fn yes_no(value: bool) -> &'static str { if value { "yes" } else { "no" } }

/// Write `children` as a CSV table with a header row.
pub fn write_children<W: Write>(output: W, children: &[Child]) -> Result<()> {
  let mut wtr = csv::Writer::from_writer(output);
  wtr.write_record(CHILD_HEADERS)?;

  for c in children {
    let (p1_name, p1_contact) = c
      .primary_guardian
      .as_ref()
      .map_or(("", ""), |g| (g.name.as_str(), g.contact.as_str()));
    let (p2_name, p2_contact) = c
      .secondary_guardian
      .as_ref()
      .map_or(("", ""), |g| (g.name.as_str(), g.contact.as_str()));

    wtr.write_record([
      c.child_id.to_string().as_str(),
      c.full_name.as_str(),
      c.gender.to_string().as_str(),
      c.date_of_birth.map(|d| d.to_string()).unwrap_or_default().as_str(),
      c.school.as_str(),
      c.grade.map(|g| g.to_string()).unwrap_or_default().as_str(),
      c.class_group.to_string().as_str(),
      c.residence.as_str(),
      p1_name,
      p1_contact,
      p2_name,
      p2_contact,
      yes_no(c.sponsored),
      c.registered_at.to_rfc3339().as_str(),
    ])?;
  }

  wtr.flush()?;
  Ok(())
}

/// Write `records` with each child's name joined in from `children`. Rows
/// for children missing from `children` get a blank name.
pub fn write_attendance<W: Write>(
  output: W,
  children: &[Child],
  records: &[AttendanceRecord],
) -> Result<()> {
  let names: HashMap<Uuid, &str> = children
    .iter()
    .map(|c| (c.child_id, c.full_name.as_str()))
    .collect();

  let mut wtr = csv::Writer::from_writer(output);
  wtr.write_record(ATTENDANCE_HEADERS)?;

  for r in records {
    let f = &r.flags;
    wtr.write_record([
      r.child_id.to_string().as_str(),
      names.get(&r.child_id).copied().unwrap_or(""),
      r.session_date.to_string().as_str(),
      yes_no(r.present),
      yes_no(f.early),
      yes_no(f.has_book),
      yes_no(f.has_pen),
      yes_no(f.has_bible),
      yes_no(f.gave_offering),
    ])?;
  }

  wtr.flush()?;
  Ok(())
}
