//! Read-through snapshot caching.
//!
//! [`SnapshotCache`] is a small TTL map of `(key, value, inserted_at)`
//! entries. [`CachedStore`] puts one in front of any [`RecordStore`]: list
//! reads are served from it until they expire, and every write clears it so
//! the next read sees the change.

use std::{
  collections::HashMap,
  hash::Hash,
  sync::{Mutex, MutexGuard, PoisonError},
  time::{Duration, Instant},
};

use uuid::Uuid;

use crate::{
  attendance::{AttendanceFilter, AttendanceInput, AttendanceRecord},
  child::{Child, ChildInput},
  performance::{NewPerformance, PerformanceRecord},
  store::RecordStore,
};

/// How long list snapshots stay fresh unless configured otherwise.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

// ─── SnapshotCache ───────────────────────────────────────────────────────────

struct Entry<V> {
  value:       V,
  inserted_at: Instant,
}

struct Inner<K, V> {
  entries:    HashMap<K, Entry<V>>,
  /// Bumped by every [`SnapshotCache::clear`].
  generation: u64,
}

/// A map whose entries expire a fixed `ttl` after insertion.
///
/// Expired entries are evicted on lookup of their key and swept on every
/// insert. A zero TTL disables caching: every entry is already stale when
/// read.
pub struct SnapshotCache<K, V> {
  ttl:   Duration,
  inner: Mutex<Inner<K, V>>,
}

impl<K: Eq + Hash, V: Clone> SnapshotCache<K, V> {
  pub fn new(ttl: Duration) -> Self {
    Self {
      ttl,
      inner: Mutex::new(Inner { entries: HashMap::new(), generation: 0 }),
    }
  }

  pub fn ttl(&self) -> Duration { self.ttl }

  fn lock(&self) -> MutexGuard<'_, Inner<K, V>> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn get(&self, key: &K) -> Option<V> { self.get_at(key, Instant::now()) }

  /// Look up `key` as of `now`, evicting it if it has expired.
  pub fn get_at(&self, key: &K, now: Instant) -> Option<V> {
    let mut inner = self.lock();
    let fresh = inner
      .entries
      .get(key)
      .map(|e| now.saturating_duration_since(e.inserted_at) < self.ttl)?;
    if fresh {
      inner.entries.get(key).map(|e| e.value.clone())
    } else {
      inner.entries.remove(key);
      None
    }
  }

  /// The current generation. Pair with [`Self::insert_if_generation`] to
  /// cache a value that was loaded outside the lock.
  pub fn generation(&self) -> u64 { self.lock().generation }

  pub fn insert(&self, key: K, value: V) {
    let mut inner = self.lock();
    let generation = inner.generation;
    self.store(&mut inner, key, value, Instant::now(), generation);
  }

  /// Insert unless the cache was cleared since `generation` was read.
  /// Returns whether the value was stored.
  pub fn insert_if_generation(&self, key: K, value: V, generation: u64) -> bool {
    self.insert_at(key, value, Instant::now(), generation)
  }

  /// [`Self::insert_if_generation`] with an explicit insertion time.
  pub fn insert_at(
    &self,
    key: K,
    value: V,
    inserted_at: Instant,
    generation: u64,
  ) -> bool {
    let mut inner = self.lock();
    self.store(&mut inner, key, value, inserted_at, generation)
  }

  fn store(
    &self,
    inner: &mut Inner<K, V>,
    key: K,
    value: V,
    inserted_at: Instant,
    generation: u64,
  ) -> bool {
    if inner.generation != generation {
      return false;
    }
    let ttl = self.ttl;
    inner
      .entries
      .retain(|_, e| inserted_at.saturating_duration_since(e.inserted_at) < ttl);
    inner.entries.insert(key, Entry { value, inserted_at });
    true
  }

  pub fn clear(&self) {
    let mut inner = self.lock();
    inner.entries.clear();
    inner.generation = inner.generation.wrapping_add(1);
  }

  /// Number of entries held, including any not yet evicted.
  pub fn len(&self) -> usize { self.lock().entries.len() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

// ─── CachedStore ─────────────────────────────────────────────────────────────

/// Which list read a snapshot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotKey {
  Children,
  Attendance(AttendanceFilter),
  Performance(Option<Uuid>),
}

#[derive(Debug, Clone)]
enum Snapshot {
  Children(Vec<Child>),
  Attendance(Vec<AttendanceRecord>),
  Performance(Vec<PerformanceRecord>),
}

/// A [`RecordStore`] wrapper that caches list reads.
///
/// Single-record reads (`get_child`) always go to the inner store. Every
/// upsert or delete clears the whole cache once the inner write returns,
/// whether or not it succeeded. A list read that overlaps a write is
/// returned to its caller but not cached.
pub struct CachedStore<S> {
  inner: S,
  cache: SnapshotCache<SnapshotKey, Snapshot>,
}

impl<S: RecordStore> CachedStore<S> {
  pub fn new(inner: S) -> Self { Self::with_ttl(inner, DEFAULT_TTL) }

  pub fn with_ttl(inner: S, ttl: Duration) -> Self {
    Self { inner, cache: SnapshotCache::new(ttl) }
  }

  pub fn inner(&self) -> &S { &self.inner }

  /// Drop every cached snapshot.
  pub fn refresh(&self) { self.cache.clear() }

  pub fn ttl(&self) -> Duration { self.cache.ttl() }

  /// Number of snapshots currently held.
  pub fn cached_snapshots(&self) -> usize { self.cache.len() }
}

impl<S: RecordStore> RecordStore for CachedStore<S> {
  type Error = S::Error;

  async fn list_children(&self) -> Result<Vec<Child>, S::Error> {
    if let Some(Snapshot::Children(children)) =
      self.cache.get(&SnapshotKey::Children)
    {
      return Ok(children);
    }
    let generation = self.cache.generation();
    let children = self.inner.list_children().await?;
    self.cache.insert_if_generation(
      SnapshotKey::Children,
      Snapshot::Children(children.clone()),
      generation,
    );
    Ok(children)
  }

  async fn get_child(&self, id: Uuid) -> Result<Option<Child>, S::Error> {
    self.inner.get_child(id).await
  }

  async fn upsert_child(&self, input: ChildInput) -> Result<Child, S::Error> {
    let result = self.inner.upsert_child(input).await;
    self.cache.clear();
    result
  }

  async fn delete_child(&self, id: Uuid) -> Result<bool, S::Error> {
    let result = self.inner.delete_child(id).await;
    self.cache.clear();
    result
  }

  async fn delete_attendance_for_child(
    &self,
    child_id: Uuid,
  ) -> Result<usize, S::Error> {
    let result = self.inner.delete_attendance_for_child(child_id).await;
    self.cache.clear();
    result
  }

  async fn list_attendance(
    &self,
    filter: AttendanceFilter,
  ) -> Result<Vec<AttendanceRecord>, S::Error> {
    let key = SnapshotKey::Attendance(filter);
    if let Some(Snapshot::Attendance(rows)) = self.cache.get(&key) {
      return Ok(rows);
    }
    let generation = self.cache.generation();
    let rows = self.inner.list_attendance(filter).await?;
    self
      .cache
      .insert_if_generation(key, Snapshot::Attendance(rows.clone()), generation);
    Ok(rows)
  }

  async fn upsert_attendance(
    &self,
    input: AttendanceInput,
  ) -> Result<AttendanceRecord, S::Error> {
    let result = self.inner.upsert_attendance(input).await;
    self.cache.clear();
    result
  }

  async fn record_performance(
    &self,
    input: NewPerformance,
  ) -> Result<PerformanceRecord, S::Error> {
    let result = self.inner.record_performance(input).await;
    self.cache.clear();
    result
  }

  async fn list_performance(
    &self,
    child_id: Option<Uuid>,
  ) -> Result<Vec<PerformanceRecord>, S::Error> {
    let key = SnapshotKey::Performance(child_id);
    if let Some(Snapshot::Performance(rows)) = self.cache.get(&key) {
      return Ok(rows);
    }
    let generation = self.cache.generation();
    let rows = self.inner.list_performance(child_id).await?;
    self
      .cache
      .insert_if_generation(key, Snapshot::Performance(rows.clone()), generation);
    Ok(rows)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
  };

  use chrono::{NaiveDate, Utc};
  use tokio::sync::Notify;

  use super::*;
  use crate::{Error, child::ClassGroup};

  // ── SnapshotCache ──────────────────────────────────────────────────────

  #[test]
  fn entries_expire_after_ttl() {
    let cache = SnapshotCache::new(Duration::from_secs(30));
    let t0 = Instant::now();
    cache.insert_at("children", 3, t0, cache.generation());

    assert_eq!(cache.get_at(&"children", t0 + Duration::from_secs(29)), Some(3));
    assert_eq!(cache.get_at(&"children", t0 + Duration::from_secs(30)), None);
    assert!(cache.is_empty(), "expired entry should be evicted on lookup");
  }

  #[test]
  fn zero_ttl_never_serves_hits() {
    let cache = SnapshotCache::new(Duration::ZERO);
    cache.insert("k", 1);
    assert_eq!(cache.get(&"k"), None);
  }

  #[test]
  fn inserts_sweep_expired_entries() {
    let cache = SnapshotCache::new(Duration::from_secs(30));
    let t0 = Instant::now();
    for day in 0..1000 {
      cache.insert_at(day, day, t0, 0);
    }
    assert_eq!(cache.len(), 1000);

    let later = t0 + Duration::from_secs(3600);
    assert_eq!(cache.get_at(&5000, later), None);
    cache.insert_at(5000, 5000, later, 0);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get_at(&5000, later), Some(5000));
  }

  #[test]
  fn insert_after_clear_is_dropped() {
    let cache = SnapshotCache::new(DEFAULT_TTL);
    let before = cache.generation();
    cache.clear();

    assert!(!cache.insert_if_generation("children", 1, before));
    assert_eq!(cache.get(&"children"), None);

    assert!(cache.insert_if_generation("children", 2, cache.generation()));
    assert_eq!(cache.get(&"children"), Some(2));
  }

  // ── CachedStore ────────────────────────────────────────────────────────

  /// Minimal store that counts list reads.
  ///
  /// With `hold_next_read` set, the next `list_children` takes its snapshot,
  /// signals `read_started` and then waits for `release` before returning.
  #[derive(Default)]
  struct CountingStore {
    children:       Mutex<Vec<Child>>,
    list_calls:     AtomicUsize,
    hold_next_read: AtomicBool,
    read_started:   Notify,
    release:        Notify,
  }

  impl RecordStore for CountingStore {
    type Error = Error;

    async fn list_children(&self) -> Result<Vec<Child>, Error> {
      self.list_calls.fetch_add(1, Ordering::SeqCst);
      let children = self.children.lock().unwrap().clone();
      if self.hold_next_read.swap(false, Ordering::SeqCst) {
        self.read_started.notify_one();
        self.release.notified().await;
      }
      Ok(children)
    }

    async fn get_child(&self, id: Uuid) -> Result<Option<Child>, Error> {
      Ok(self.children.lock().unwrap().iter().find(|c| c.child_id == id).cloned())
    }

    async fn upsert_child(&self, input: ChildInput) -> Result<Child, Error> {
      let child = input.into_child(Uuid::new_v4(), Utc::now());
      self.children.lock().unwrap().push(child.clone());
      Ok(child)
    }

    async fn delete_child(&self, id: Uuid) -> Result<bool, Error> {
      let mut children = self.children.lock().unwrap();
      let before = children.len();
      children.retain(|c| c.child_id != id);
      Ok(children.len() != before)
    }

    async fn delete_attendance_for_child(&self, _: Uuid) -> Result<usize, Error> {
      Ok(0)
    }

    async fn list_attendance(
      &self,
      _: AttendanceFilter,
    ) -> Result<Vec<AttendanceRecord>, Error> {
      self.list_calls.fetch_add(1, Ordering::SeqCst);
      Ok(Vec::new())
    }

    async fn upsert_attendance(
      &self,
      input: AttendanceInput,
    ) -> Result<AttendanceRecord, Error> {
      Err(Error::ChildNotFound(input.child_id))
    }

    async fn record_performance(
      &self,
      input: NewPerformance,
    ) -> Result<PerformanceRecord, Error> {
      Err(Error::ChildNotFound(input.child_id))
    }

    async fn list_performance(
      &self,
      _: Option<Uuid>,
    ) -> Result<Vec<PerformanceRecord>, Error> {
      Ok(Vec::new())
    }
  }

  fn calls(store: &CachedStore<CountingStore>) -> usize {
    store.inner().list_calls.load(Ordering::SeqCst)
  }

  #[tokio::test]
  async fn repeated_reads_hit_the_cache() {
    let store = CachedStore::new(CountingStore::default());
    assert_eq!(store.ttl(), DEFAULT_TTL);
    store.list_children().await.unwrap();
    store.list_children().await.unwrap();
    assert_eq!(calls(&store), 1);
  }

  #[tokio::test]
  async fn writes_invalidate_snapshots() {
    let store = CachedStore::new(CountingStore::default());
    assert!(store.list_children().await.unwrap().is_empty());

    store
      .upsert_child(ChildInput::new("Neema", ClassGroup::ChosenNation))
      .await
      .unwrap();

    let children = store.list_children().await.unwrap();
    assert_eq!(children.len(), 1, "read after write must not be stale");
    assert_eq!(calls(&store), 2);
  }

  #[tokio::test]
  async fn failed_writes_still_invalidate() {
    let store = CachedStore::new(CountingStore::default());
    let day = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
    store.list_attendance(AttendanceFilter::on(day)).await.unwrap();
    assert_eq!(store.cached_snapshots(), 1);

    let result = store
      .upsert_attendance(AttendanceInput::present(Uuid::new_v4(), day))
      .await;
    assert!(result.is_err());
    assert_eq!(store.cached_snapshots(), 0);
  }

  #[tokio::test]
  async fn attendance_snapshots_are_keyed_by_filter() {
    let store = CachedStore::new(CountingStore::default());
    let day = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
    store.list_attendance(AttendanceFilter::all()).await.unwrap();
    store.list_attendance(AttendanceFilter::on(day)).await.unwrap();
    store.list_attendance(AttendanceFilter::on(day)).await.unwrap();
    assert_eq!(calls(&store), 2);
  }

  #[tokio::test]
  async fn refresh_forces_a_reload() {
    let store = CachedStore::new(CountingStore::default());
    store.list_children().await.unwrap();
    store.refresh();
    store.list_children().await.unwrap();
    assert_eq!(calls(&store), 2);
  }

  #[tokio::test]
  async fn read_overlapping_a_write_is_not_cached() {
    let store = Arc::new(CachedStore::new(CountingStore::default()));
    store.inner().hold_next_read.store(true, Ordering::SeqCst);

    let reader = tokio::spawn({
      let store = Arc::clone(&store);
      async move { store.list_children().await.unwrap() }
    });
    store.inner().read_started.notified().await;

    store
      .upsert_child(ChildInput::new("Amani", ClassGroup::ChosenNation))
      .await
      .unwrap();
    store.inner().release.notify_one();

    let before_write = reader.await.unwrap();
    assert!(before_write.is_empty());
    assert_eq!(store.cached_snapshots(), 0);
    assert_eq!(store.list_children().await.unwrap().len(), 1);
  }
}
