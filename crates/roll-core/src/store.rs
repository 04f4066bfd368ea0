//! The `RecordStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `roll-store-sqlite`)
//! and by the read-through [`crate::cache::CachedStore`]. Higher layers
//! (`roll-api`, `roll-server`) depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  attendance::{AttendanceFilter, AttendanceInput, AttendanceRecord},
  child::{Child, ChildInput},
  performance::{NewPerformance, PerformanceRecord},
};

/// Abstraction over the two tables of the register (children and
/// attendance) plus the performance log.
///
/// No operation is transactional across tables and nothing is retried; a
/// failure is reported to the caller as-is. Concurrent writers are not
/// coordinated: the last write wins.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait RecordStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Children ──────────────────────────────────────────────────────────

  /// List every registered child, ordered by name.
  fn list_children(
    &self,
  ) -> impl Future<Output = Result<Vec<Child>, Self::Error>> + Send + '_;

  /// Retrieve a child by id. Returns `None` if not found.
  fn get_child(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Child>, Self::Error>> + Send + '_;

  /// Create or replace a child, matching on `child_id` only.
  ///
  /// Validates the input first. Two children may share a name.
  fn upsert_child(
    &self,
    input: ChildInput,
  ) -> impl Future<Output = Result<Child, Self::Error>> + Send + '_;

  /// Delete a child together with its attendance and performance rows.
  ///
  /// Implementations call [`RecordStore::delete_attendance_for_child`]
  /// first and then remove the child as a separate step. Returns `false`
  /// if no such child existed.
  fn delete_child(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Remove every attendance row for `child_id`, returning how many went.
  fn delete_attendance_for_child(
    &self,
    child_id: Uuid,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Attendance ────────────────────────────────────────────────────────

  /// List attendance rows matching `filter`, ordered by session date then
  /// child id.
  fn list_attendance(
    &self,
    filter: AttendanceFilter,
  ) -> impl Future<Output = Result<Vec<AttendanceRecord>, Self::Error>> + Send + '_;

  /// Insert or update the row for `(child_id, session_date)`.
  ///
  /// Participation flags of an absent row are stored as `false`. Returns an
  /// error if the child does not exist.
  fn upsert_attendance(
    &self,
    input: AttendanceInput,
  ) -> impl Future<Output = Result<AttendanceRecord, Self::Error>> + Send + '_;

  // ── Performance ───────────────────────────────────────────────────────

  /// Append a performance row.
  fn record_performance(
    &self,
    input: NewPerformance,
  ) -> impl Future<Output = Result<PerformanceRecord, Self::Error>> + Send + '_;

  /// List performance rows, optionally for a single child, oldest first.
  fn list_performance(
    &self,
    child_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<PerformanceRecord>, Self::Error>> + Send + '_;
}
