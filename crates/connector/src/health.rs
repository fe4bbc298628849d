//! Liveness flag.
//!
//! `true` exactly while a session is open and being served. The flag is the
//! only state the supervisor shares with the embedding application.

use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, Default)]
pub(crate) struct Health {
    alive: Arc<Mutex<bool>>,
}

impl Health {
    pub(crate) fn get(&self) -> bool {
        *self.alive.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set(&self, alive: bool) {
        *self.alive.lock().unwrap_or_else(PoisonError::into_inner) = alive;
    }

    /// Marks the connector alive until the returned guard is dropped.
    pub(crate) fn enter(&self) -> HealthGuard {
        self.set(true);
        HealthGuard {
            health: self.clone(),
        }
    }
}

/// Clears the flag on drop, including when the session future is cancelled.
#[derive(Debug)]
pub(crate) struct HealthGuard {
    health: Health,
}

impl Drop for HealthGuard {
    fn drop(&mut self) {
        self.health.set(false);
    }
}
