//! Per-user checkout serialization.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tokio::sync::{Mutex, OwnedMutexGuard};

use cosmic_blueprints_core::UserId;

/// One mutex per user, created on demand and dropped once idle.
#[derive(Clone)]
pub struct CheckoutLocks {
    locks: Cache<UserId, Arc<Mutex<()>>>,
}

impl CheckoutLocks {
    #[must_use]
    pub fn new() -> Self {
        let locks = Cache::builder()
            .time_to_idle(Duration::from_secs(600)) // 10 minutes
            .build();
        Self { locks }
    }

    /// Wait for and take the user's checkout lock.
    pub async fn acquire(&self, user_id: UserId) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .get_with(user_id, async { Arc::new(Mutex::new(())) })
            .await;
        lock.lock_owned().await
    }
}

impl Default for CheckoutLocks {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CheckoutLocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutLocks")
            .field("entries", &self.locks.entry_count())
            .finish()
    }
}
