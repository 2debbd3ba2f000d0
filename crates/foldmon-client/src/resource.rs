//! Shared slots for resources published by one task and used by others.
//!
//! Two modes:
//!
//! - [`Guarded`]: the value needs teardown (a socket, a stream). Every use
//!   holds the lock, so a value can never be released or replaced while
//!   someone is using it.
//! - [`Published`]: the value needs no teardown. The lock is held only long
//!   enough to clone an `Arc`; readers then use their copy freely while the
//!   slot is replaced or cleared behind them.

use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::{Mutex, MutexGuard};

/// Slot for a value that must be torn down; all access is serialized.
#[derive(Debug)]
pub struct Guarded<T> {
    slot: Mutex<Option<T>>,
}

impl<T> Guarded<T> {
    pub fn empty() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Lock the slot for the duration of a use.
    pub async fn lock(&self) -> MutexGuard<'_, Option<T>> {
        self.slot.lock().await
    }

    /// Store a value, returning the previous one for the caller to release.
    pub async fn publish(&self, value: T) -> Option<T> {
        self.slot.lock().await.replace(value)
    }

    /// Remove the value, waiting for any in-flight use to finish.
    pub async fn take(&self) -> Option<T> {
        self.slot.lock().await.take()
    }

    pub async fn is_present(&self) -> bool {
        self.slot.lock().await.is_some()
    }
}

impl<T> Default for Guarded<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Slot for a value with no teardown; readers only lock to fetch it.
#[derive(Debug)]
pub struct Published<T> {
    slot: RwLock<Option<Arc<T>>>,
}

impl<T> Published<T> {
    pub fn empty() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    /// Current value, if any.
    pub fn get(&self) -> Option<Arc<T>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the value; outstanding readers keep the old one.
    pub fn publish(&self, value: T) -> Option<Arc<T>> {
        self.slot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Arc::new(value))
    }

    pub fn clear(&self) -> Option<Arc<T>> {
        self.slot.write().unwrap_or_else(PoisonError::into_inner).take()
    }
}

impl<T> Default for Published<T> {
    fn default() -> Self {
        Self::empty()
    }
}
