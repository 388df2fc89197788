//! # Handle Registry
//!
//! Process-shared storage for every live object of one kind, keyed by a
//! typed handle. Callers never own the objects; they hold handles that are
//! validated on every access.
//!
//! ## Concurrency
//!
//! The map is a `DashMap`, so handles are independent of each other. Each
//! entry sits behind its own `parking_lot::Mutex`, so every operation on a
//! single handle runs to completion before the next one on that handle
//! starts.
//!
//! Releasing a handle removes it from the map and then empties its slot
//! under the slot lock. An operation already holding the lock finishes on
//! the old value; any operation that acquires the lock afterwards sees an
//! empty slot and fails with the registry's invalid-handle kind.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::error::{CredexError, CredexResult, ErrorKind};
use crate::handle::HandleId;

type Slot<T> = Arc<Mutex<Option<T>>>;

/// Registry of live objects addressed by handle `H`.
pub struct HandleRegistry<H: HandleId, T> {
    name: &'static str,
    invalid_kind: ErrorKind,
    next: AtomicU32,
    entries: DashMap<H, Slot<T>>,
}

impl<H: HandleId, T> HandleRegistry<H, T> {
    /// Create an empty registry.
    ///
    /// `invalid_kind` is the error reported for lookups of dead handles.
    pub fn new(name: &'static str, invalid_kind: ErrorKind) -> Self {
        Self {
            name,
            invalid_kind,
            next: AtomicU32::new(1),
            entries: DashMap::new(),
        }
    }

    /// Store `value` under a freshly allocated handle.
    pub fn add(&self, value: T) -> H {
        let slot: Slot<T> = Arc::new(Mutex::new(Some(value)));
        loop {
            let raw = self.next.fetch_add(1, Ordering::Relaxed);
            if raw == 0 {
                continue;
            }
            let handle = H::from_raw(raw);
            if let dashmap::mapref::entry::Entry::Vacant(vacant) = self.entries.entry(handle) {
                vacant.insert(slot);
                tracing::debug!(registry = self.name, %handle, "handle allocated");
                return handle;
            }
        }
    }

    /// Whether `handle` refers to a live object.
    pub fn has_handle(&self, handle: H) -> bool {
        self.entries.contains_key(&handle)
    }

    /// Run `f` with shared access to the object behind `handle`.
    pub fn get<R>(&self, handle: H, f: impl FnOnce(&T) -> CredexResult<R>) -> CredexResult<R> {
        let slot = self.slot(handle)?;
        let guard = slot.lock();
        match guard.as_ref() {
            Some(value) => f(value),
            None => Err(self.invalid(handle)),
        }
    }

    /// Run `f` with exclusive access to the object behind `handle`.
    pub fn get_mut<R>(
        &self,
        handle: H,
        f: impl FnOnce(&mut T) -> CredexResult<R>,
    ) -> CredexResult<R> {
        let slot = self.slot(handle)?;
        let mut guard = slot.lock();
        match guard.as_mut() {
            Some(value) => f(value),
            None => Err(self.invalid(handle)),
        }
    }

    /// Remove `handle` and drop its object.
    pub fn release(&self, handle: H) -> CredexResult<()> {
        let (_, slot) = self
            .entries
            .remove(&handle)
            .ok_or_else(|| self.invalid(handle))?;
        slot.lock().take();
        tracing::debug!(registry = self.name, %handle, "handle released");
        Ok(())
    }

    /// Release every live handle. Returns how many were released.
    pub fn release_all(&self) -> usize {
        self.handles()
            .into_iter()
            .filter(|h| self.release(*h).is_ok())
            .count()
    }

    /// Snapshot of the live handles.
    pub fn handles(&self) -> Vec<H> {
        self.entries.iter().map(|e| *e.key()).collect()
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry holds no live handles.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // The map guard is dropped before the slot is locked, so a concurrent
    // `release` on the same shard never waits on a slot lock.
    fn slot(&self, handle: H) -> CredexResult<Slot<T>> {
        self.entries
            .get(&handle)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| self.invalid(handle))
    }

    fn invalid(&self, handle: H) -> CredexError {
        CredexError::new(
            self.invalid_kind,
            format!("{} registry has no live object for {handle}", self.name),
        )
    }
}

impl<H: HandleId, T> std::fmt::Debug for HandleRegistry<H, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleRegistry")
            .field("name", &self.name)
            .field("live", &self.entries.len())
            .finish()
    }
}
