//! [`SqliteStore`], the SQLite implementation of [`RecordStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use roll_core::{
  Error as CoreError,
  attendance::{AttendanceFilter, AttendanceInput, AttendanceRecord},
  child::{Child, ChildInput},
  performance::{NewPerformance, PerformanceRecord},
  store::RecordStore,
};

use crate::{
  encode::{
    ATTENDANCE_COLUMNS, CHILD_COLUMNS, PERFORMANCE_COLUMNS, RawAttendance,
    RawChild, RawPerformance, encode_date, encode_dt, encode_tag, encode_uuid,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Roll record store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn child_exists(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let exists = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM children WHERE child_id = ?1",
              rusqlite::params![id_str],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;
    Ok(exists)
  }

  async fn get_attendance(
    &self,
    child_id: Uuid,
    session_date: chrono::NaiveDate,
  ) -> Result<Option<AttendanceRecord>> {
    let id_str   = encode_uuid(child_id);
    let date_str = encode_date(session_date);

    let raw: Option<RawAttendance> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {ATTENDANCE_COLUMNS} FROM attendance
                 WHERE child_id = ?1 AND session_date = ?2"
              ),
              rusqlite::params![id_str, date_str],
              RawAttendance::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAttendance::into_record).transpose()
  }
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  type Error = Error;

  // ── Children ──────────────────────────────────────────────────────────────

  async fn list_children(&self) -> Result<Vec<Child>> {
    let raws: Vec<RawChild> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CHILD_COLUMNS} FROM children
           ORDER BY full_name COLLATE NOCASE, child_id"
        ))?;
        let rows = stmt
          .query_map([], RawChild::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawChild::into_child).collect()
  }

  async fn get_child(&self, id: Uuid) -> Result<Option<Child>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawChild> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {CHILD_COLUMNS} FROM children WHERE child_id = ?1"),
              rusqlite::params![id_str],
              RawChild::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawChild::into_child).transpose()
  }

  async fn upsert_child(&self, input: ChildInput) -> Result<Child> {
    input.validate(Utc::now().date_naive())?;

    let child_id = input.child_id.unwrap_or_else(Uuid::new_v4);
    // `registered_at` is only written on insert; an update keeps the stored
    // value, which is read back below.
    let child = input.into_child(child_id, Utc::now());

    let id_str        = encode_uuid(child.child_id);
    let name          = child.full_name.clone();
    let gender        = encode_tag(&child.gender)?;
    let dob           = child.date_of_birth.map(encode_date);
    let school        = child.school.clone();
    let grade         = child.grade.as_ref().map(encode_tag).transpose()?;
    let class_group   = encode_tag(&child.class_group)?;
    let residence     = child.residence.clone();
    let (p1_name, p1_contact) = child
      .primary_guardian
      .clone()
      .map(|g| (g.name, g.contact))
      .unzip();
    let (p2_name, p2_contact) = child
      .secondary_guardian
      .clone()
      .map(|g| (g.name, g.contact))
      .unzip();
    let sponsored     = child.sponsored;
    let registered_at = encode_dt(child.registered_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO children (
             child_id, full_name, gender, date_of_birth, school, grade,
             class_group, residence, parent1_name, parent1_contact,
             parent2_name, parent2_contact, sponsored, registered_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
           ON CONFLICT(child_id) DO UPDATE SET
             full_name       = excluded.full_name,
             gender          = excluded.gender,
             date_of_birth   = excluded.date_of_birth,
             school          = excluded.school,
             grade           = excluded.grade,
             class_group     = excluded.class_group,
             residence       = excluded.residence,
             parent1_name    = excluded.parent1_name,
             parent1_contact = excluded.parent1_contact,
             parent2_name    = excluded.parent2_name,
             parent2_contact = excluded.parent2_contact,
             sponsored       = excluded.sponsored",
          rusqlite::params![
            id_str,
            name,
            gender,
            dob,
            school,
            grade,
            class_group,
            residence,
            p1_name,
            p1_contact,
            p2_name,
            p2_contact,
            sponsored,
            registered_at,
          ],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!(child_id = %child.child_id, "upserted child");

    self
      .get_child(child.child_id)
      .await?
      .ok_or(CoreError::ChildNotFound(child.child_id).into())
  }

  async fn delete_child(&self, id: Uuid) -> Result<bool> {
    if !self.child_exists(id).await? {
      return Ok(false);
    }

    // Dependent rows first; each step is its own statement and a failure
    // part-way leaves the earlier deletions in place.
    let attendance = self.delete_attendance_for_child(id).await?;

    let id_str = encode_uuid(id);
    let performance = self
      .conn
      .call(move |conn| {
        let performance = conn.execute(
          "DELETE FROM performance WHERE child_id = ?1",
          rusqlite::params![id_str],
        )?;
        conn.execute(
          "DELETE FROM children WHERE child_id = ?1",
          rusqlite::params![id_str],
        )?;
        Ok(performance)
      })
      .await?;

    tracing::info!(child_id = %id, attendance, performance, "deleted child");
    Ok(true)
  }

  async fn delete_attendance_for_child(&self, child_id: Uuid) -> Result<usize> {
    let id_str = encode_uuid(child_id);
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM attendance WHERE child_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;
    Ok(removed)
  }

  // ── Attendance ────────────────────────────────────────────────────────────

  async fn list_attendance(
    &self,
    filter: AttendanceFilter,
  ) -> Result<Vec<AttendanceRecord>> {
    // Build WHERE clause dynamically.
    let mut conds: Vec<String> = Vec::new();
    let mut params: Vec<String> = Vec::new();
    let mut push = |cond: &str, value: String| {
      params.push(value);
      conds.push(format!("{cond} ?{}", params.len()));
    };
    if let Some(date) = filter.session_date {
      push("session_date =", encode_date(date));
    }
    if let Some(id) = filter.child_id {
      push("child_id =", encode_uuid(id));
    }
    if let Some(range) = filter.date_range {
      push("session_date >=", encode_date(range.start));
      push("session_date <=", encode_date(range.end));
    }

    let where_clause = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };
    let sql = format!(
      "SELECT {ATTENDANCE_COLUMNS} FROM attendance
       {where_clause}
       ORDER BY session_date, child_id"
    );

    let raws: Vec<RawAttendance> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawAttendance::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAttendance::into_record).collect()
  }

  async fn upsert_attendance(&self, input: AttendanceInput) -> Result<AttendanceRecord> {
    let input = input.normalized();
    if !self.child_exists(input.child_id).await? {
      return Err(CoreError::ChildNotFound(input.child_id).into());
    }

    let id_str   = encode_uuid(input.child_id);
    let date_str = encode_date(input.session_date);
    let now_str  = encode_dt(Utc::now());
    let present  = input.present;
    let flags    = input.flags;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO attendance (
             child_id, session_date, present, early, has_book, has_pen,
             has_bible, gave_offering, recorded_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
           ON CONFLICT(child_id, session_date) DO UPDATE SET
             present       = excluded.present,
             early         = excluded.early,
             has_book      = excluded.has_book,
             has_pen       = excluded.has_pen,
             has_bible     = excluded.has_bible,
             gave_offering = excluded.gave_offering,
             updated_at    = excluded.updated_at",
          rusqlite::params![
            id_str,
            date_str,
            present,
            flags.early,
            flags.has_book,
            flags.has_pen,
            flags.has_bible,
            flags.gave_offering,
            now_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!(
      child_id = %input.child_id,
      session_date = %input.session_date,
      present,
      "upserted attendance"
    );

    self
      .get_attendance(input.child_id, input.session_date)
      .await?
      .ok_or(CoreError::ChildNotFound(input.child_id).into())
  }

  // ── Performance ───────────────────────────────────────────────────────────

  async fn record_performance(&self, input: NewPerformance) -> Result<PerformanceRecord> {
    input.validate()?;
    if !self.child_exists(input.child_id).await? {
      return Err(CoreError::ChildNotFound(input.child_id).into());
    }

    let record = PerformanceRecord {
      performance_id: Uuid::new_v4(),
      child_id:       input.child_id,
      year:           input.year,
      term:           input.term,
      scores:         input.scores,
      remarks:        input.remarks,
      recorded_at:    Utc::now(),
    };

    let id_str       = encode_uuid(record.performance_id);
    let child_id_str = encode_uuid(record.child_id);
    let year         = record.year;
    let term         = encode_tag(&record.term)?;
    let s            = record.scores;
    let remarks      = record.remarks.clone();
    let at_str       = encode_dt(record.recorded_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO performance (
             performance_id, child_id, year, term, mathematics, english,
             kiswahili, science, social_studies, religious_education,
             remarks, recorded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
          rusqlite::params![
            id_str,
            child_id_str,
            year,
            term,
            s.mathematics,
            s.english,
            s.kiswahili,
            s.science,
            s.social_studies,
            s.religious_education,
            remarks,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(record)
  }

  async fn list_performance(&self, child_id: Option<Uuid>) -> Result<Vec<PerformanceRecord>> {
    let id_str = child_id.map(encode_uuid);

    let raws: Vec<RawPerformance> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PERFORMANCE_COLUMNS} FROM performance
           WHERE ?1 IS NULL OR child_id = ?1
           ORDER BY rowid"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawPerformance::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPerformance::into_record).collect()
  }
}
