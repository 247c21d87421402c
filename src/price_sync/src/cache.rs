//! Read-through snapshot of every stored row.
//!
//! Readers call [`SnapshotCache::get_or_load`]; while the snapshot is younger than
//! the configured max age they get the same `Arc` back with one atomic load and no
//! database access. Once it is stale (or after [`SnapshotCache::invalidate`]) the
//! next caller reloads from the store and swaps the new snapshot in.
//!
//! Implementation notes:
//! - Uses `arc-swap` for the slot, so readers never block each other.
//! - Two callers racing on a stale snapshot may both reload; the last store wins.
//! - Writers (the ingestion run) do not touch the cache. Call
//!   [`SnapshotCache::invalidate`] after a run if readers must see it immediately.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use arc_swap::ArcSwapOption;
use once_cell::sync::Lazy;

use crate::{error::StoreResult, models::PriceObservation, store::Store};

/// Max age of the process-wide cache unless reconfigured.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(3600);

/// Rows shared by every reader of one snapshot.
pub type Rows = Arc<Vec<PriceObservation>>;

struct Snapshot {
    rows: Rows,
    loaded_at: Instant,
}

/// Time-bounded, explicitly invalidated cache of [`Store::load_all`].
pub struct SnapshotCache {
    slot: ArcSwapOption<Snapshot>,
    max_age_ms: AtomicU64,
}

static GLOBAL: Lazy<SnapshotCache> = Lazy::new(|| SnapshotCache::new(DEFAULT_MAX_AGE));

/// The process-wide cache.
pub fn global() -> &'static SnapshotCache {
    &GLOBAL
}

impl SnapshotCache {
    /// Empty cache whose snapshots expire after `max_age`.
    pub fn new(max_age: Duration) -> Self {
        Self {
            slot: ArcSwapOption::empty(),
            max_age_ms: AtomicU64::new(duration_ms(max_age)),
        }
    }

    /// Current max age.
    pub fn max_age(&self) -> Duration {
        Duration::from_millis(self.max_age_ms.load(Ordering::Relaxed))
    }

    /// Changes the max age. Applies to the snapshot already held too.
    pub fn set_max_age(&self, max_age: Duration) {
        self.max_age_ms.store(duration_ms(max_age), Ordering::Relaxed);
    }

    /// The held snapshot if it is still fresh.
    pub fn get(&self) -> Option<Rows> {
        let guard = self.slot.load();
        let snap = (*guard).as_ref()?;
        (snap.loaded_at.elapsed() < self.max_age()).then(|| Arc::clone(&snap.rows))
    }

    /// Fresh snapshot, reloading from `store` when needed.
    pub fn get_or_load(&self, store: &mut Store) -> StoreResult<Rows> {
        self.get_or_load_with(|| store.load_all())
    }

    /// Fresh snapshot, calling `load` when needed. A failed load leaves the
    /// previous snapshot in place.
    pub fn get_or_load_with<F, E>(&self, load: F) -> Result<Rows, E>
    where
        F: FnOnce() -> Result<Vec<PriceObservation>, E>,
    {
        if let Some(rows) = self.get() {
            return Ok(rows);
        }
        self.refresh_with(load)
    }

    /// Reloads from `store` unconditionally.
    pub fn refresh(&self, store: &mut Store) -> StoreResult<Rows> {
        self.refresh_with(|| store.load_all())
    }

    fn refresh_with<F, E>(&self, load: F) -> Result<Rows, E>
    where
        F: FnOnce() -> Result<Vec<PriceObservation>, E>,
    {
        let rows: Rows = Arc::new(load()?);
        tracing::debug!(rows = rows.len(), "snapshot cache reloaded");
        self.slot.store(Some(Arc::new(Snapshot {
            rows: Arc::clone(&rows),
            loaded_at: Instant::now(),
        })));
        Ok(rows)
    }

    /// Drops the held snapshot; the next read reloads.
    pub fn invalidate(&self) {
        self.slot.store(None);
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
