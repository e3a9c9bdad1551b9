//! Per-key reservations for preventing duplicate fetches
//!
//! Two requests for the same cache key in one process would otherwise both
//! observe a miss and both hit the network. A reservation serializes the
//! validate, fetch and write sequence per key; different keys never block
//! each other. Reservations are advisory and process-local.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, warn};

use super::path::CacheKey;

/// How a reservation was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationStatus {
    /// Key was free
    Reserved,
    /// Another task held the key; this one waited for it
    WaitedForOther,
}

/// Held reservation for one key; released on drop
#[derive(Debug)]
pub struct KeyReservation {
    key: CacheKey,
    status: ReservationStatus,
    _guard: OwnedMutexGuard<()>,
}

impl KeyReservation {
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn status(&self) -> ReservationStatus {
        self.status
    }
}

/// Registry of per-key locks
#[derive(Debug, Default)]
pub struct KeyReservations {
    locks: Mutex<HashMap<CacheKey, Arc<AsyncMutex<()>>>>,
}

impl KeyReservations {
    pub fn new() -> Self {
        Self::default()
    }

    fn locks(&self) -> MutexGuard<'_, HashMap<CacheKey, Arc<AsyncMutex<()>>>> {
        match self.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Reservation registry lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Reserve a key, waiting while another task holds it
    pub async fn reserve(&self, key: &CacheKey) -> KeyReservation {
        let lock = {
            let mut locks = self.locks();
            Arc::clone(locks.entry(key.clone()).or_default())
        };

        let (guard, status) = match Arc::clone(&lock).try_lock_owned() {
            Ok(guard) => (guard, ReservationStatus::Reserved),
            Err(_) => {
                debug!("{} is being fetched by another task, waiting", key);
                (lock.lock_owned().await, ReservationStatus::WaitedForOther)
            }
        };

        debug!("Reserved {}", key);
        KeyReservation {
            key: key.clone(),
            status,
            _guard: guard,
        }
    }

    /// Whether a key is currently held
    pub fn is_reserved(&self, key: &CacheKey) -> bool {
        self.locks()
            .get(key)
            .map(|lock| lock.try_lock().is_err())
            .unwrap_or(false)
    }

    /// Number of keys with a registered lock
    pub fn len(&self) -> usize {
        self.locks().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks().is_empty()
    }

    /// Drop locks nobody holds or waits on; returns how many were removed
    pub fn cleanup_idle(&self) -> usize {
        let mut locks = self.locks();
        let before = locks.len();
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        let removed = before - locks.len();
        if removed > 0 {
            debug!("Pruned {} idle reservations", removed);
        }
        removed
    }
}
