// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Engine handle cache with idle release

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Once, Weak};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::engine::{EngineMesh, Solid};

/// Engine handle plus the validated mesh it was built from
#[derive(Debug)]
pub(crate) struct CacheSlot {
    solid: Option<Arc<Solid>>,
    validated: Option<Arc<EngineMesh>>,
    last_access: Instant,
}

impl CacheSlot {
    fn empty() -> Self {
        Self {
            solid: None,
            validated: None,
            last_access: Instant::now(),
        }
    }

    fn clear(&mut self) {
        self.solid = None;
        self.validated = None;
    }
}

type SharedSlot = Arc<Mutex<CacheSlot>>;
type SlotRegistry = DashMap<u64, Weak<Mutex<CacheSlot>>>;

/// Per-buffer cache. An absent handle means "rebuild before use".
#[derive(Debug)]
pub(crate) struct ManifoldCache {
    slot: SharedSlot,
}

impl ManifoldCache {
    pub fn new(reaper: &IdleReaper) -> Self {
        let slot = Arc::new(Mutex::new(CacheSlot::empty()));
        reaper.register(&slot);
        Self { slot }
    }

    /// Cached handle and validated mesh, refreshing the idle clock
    pub fn get(&self) -> Option<(Arc<Solid>, Arc<EngineMesh>)> {
        let mut slot = self.slot.lock();
        let solid = slot.solid.clone()?;
        let validated = slot.validated.clone()?;
        slot.last_access = Instant::now();
        Some((solid, validated))
    }

    pub fn store(&self, solid: Arc<Solid>, validated: Arc<EngineMesh>) {
        let mut slot = self.slot.lock();
        slot.solid = Some(solid);
        slot.validated = Some(validated);
        slot.last_access = Instant::now();
    }

    /// Drop the handle; returns whether one was held
    pub fn clear(&self) -> bool {
        let mut slot = self.slot.lock();
        let held = slot.solid.is_some();
        slot.clear();
        held
    }

    pub fn has_handle(&self) -> bool {
        self.slot.lock().solid.is_some()
    }
}

/// Releases engine handles that sat unused longer than the idle window.
///
/// Slots are tracked weakly; a background thread sweeps them until the
/// owning kernel is dropped.
pub(crate) struct IdleReaper {
    window: Option<Duration>,
    slots: Arc<SlotRegistry>,
    next_key: AtomicU64,
    started: Once,
}

impl IdleReaper {
    pub fn new(window: Option<Duration>) -> Self {
        Self {
            window,
            slots: Arc::new(DashMap::new()),
            next_key: AtomicU64::new(0),
            started: Once::new(),
        }
    }

    pub fn window(&self) -> Option<Duration> {
        self.window
    }

    fn register(&self, slot: &SharedSlot) {
        let Some(window) = self.window else {
            return;
        };
        let key = self.next_key.fetch_add(1, Ordering::Relaxed);
        self.slots.insert(key, Arc::downgrade(slot));
        self.started.call_once(|| self.spawn(window));
    }

    fn spawn(&self, window: Duration) {
        let slots = Arc::downgrade(&self.slots);
        let interval = (window / 2).max(Duration::from_millis(5));
        let spawned = thread::Builder::new()
            .name("facemesh-reaper".into())
            .spawn(move || loop {
                thread::sleep(interval);
                let Some(slots) = slots.upgrade() else {
                    debug!("kernel dropped, idle reaper exiting");
                    break;
                };
                sweep(&slots, window);
            });
        if let Err(err) = spawned {
            warn!(%err, "could not start idle reaper; handles are only released explicitly");
        }
    }

    /// Run one sweep now. Returns the number of handles released.
    pub fn sweep_now(&self) -> usize {
        match self.window {
            Some(window) => sweep(&self.slots, window),
            None => 0,
        }
    }

    /// Live slots currently tracked
    pub fn tracked(&self) -> usize {
        self.slots.iter().filter(|e| e.value().strong_count() > 0).count()
    }
}

fn sweep(slots: &SlotRegistry, window: Duration) -> usize {
    let mut released = 0;
    slots.retain(|_, weak| {
        let Some(slot) = weak.upgrade() else {
            return false;
        };
        let mut slot = slot.lock();
        if slot.solid.is_some() && slot.last_access.elapsed() >= window {
            slot.clear();
            released += 1;
        }
        true
    });
    if released > 0 {
        debug!(released, "idle engine handles released");
    }
    released
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> (Arc<Solid>, Arc<EngineMesh>) {
        (
            Arc::new(Solid::new("test", (), 0, 0)),
            Arc::new(EngineMesh::default()),
        )
    }

    #[test]
    fn test_store_get_clear() {
        let reaper = IdleReaper::new(None);
        let cache = ManifoldCache::new(&reaper);
        assert!(cache.get().is_none());

        let (solid, mesh) = handle();
        cache.store(solid, mesh);
        assert!(cache.has_handle());
        assert!(cache.get().is_some());
        assert!(cache.clear());
        assert!(!cache.has_handle());
        assert!(!cache.clear());
    }

    #[test]
    fn test_sweep_releases_idle_handles() {
        let reaper = IdleReaper::new(Some(Duration::from_millis(1)));
        let cache = ManifoldCache::new(&reaper);
        let (solid, mesh) = handle();
        cache.store(solid, mesh);

        thread::sleep(Duration::from_millis(10));
        reaper.sweep_now();
        assert!(!cache.has_handle());
    }

    #[test]
    fn test_dropped_slots_are_forgotten() {
        let reaper = IdleReaper::new(Some(Duration::from_secs(60)));
        let cache = ManifoldCache::new(&reaper);
        assert_eq!(reaper.tracked(), 1);
        drop(cache);
        assert_eq!(reaper.tracked(), 0);
        reaper.sweep_now();
        assert!(reaper.slots.is_empty());
    }
}
