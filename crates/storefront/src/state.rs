//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::db::Repository;
use crate::services::checkout::{CheckoutLocks, CheckoutService};
use crate::services::payments::PaymentProvider;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the repository and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    repo: Arc<dyn Repository>,
    payments: Arc<dyn PaymentProvider>,
    checkout_locks: CheckoutLocks,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `repo` - Backing store for every entity
    /// * `payments` - Payment provider used by checkout
    #[must_use]
    pub fn new(
        config: StorefrontConfig,
        repo: Arc<dyn Repository>,
        payments: Arc<dyn PaymentProvider>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                repo,
                payments,
                checkout_locks: CheckoutLocks::new(),
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the repository.
    #[must_use]
    pub fn repo(&self) -> &dyn Repository {
        self.inner.repo.as_ref()
    }

    /// Get a reference to the payment provider.
    #[must_use]
    pub fn payments(&self) -> &dyn PaymentProvider {
        self.inner.payments.as_ref()
    }

    /// A checkout service bound to this state.
    #[must_use]
    pub fn checkout(&self) -> CheckoutService<'_> {
        CheckoutService::new(
            self.repo(),
            self.payments(),
            &self.inner.checkout_locks,
            self.inner.config.payments.timeout,
        )
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.inner.config)
            .field("checkout_locks", &self.inner.checkout_locks)
            .finish_non_exhaustive()
    }
}
