//! Auth-change notification: listener trait, registry, and subscription handle.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::models::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// A session change observed by the auth service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChange {
    pub event: AuthEvent,
    /// Session after the change; `None` when signed out or expired.
    pub session: Option<Session>,
}

impl AuthChange {
    #[must_use]
    pub fn signed_in(session: Session) -> Self {
        Self {
            event: AuthEvent::SignedIn,
            session: Some(session),
        }
    }

    #[must_use]
    pub fn signed_out() -> Self {
        Self {
            event: AuthEvent::SignedOut,
            session: None,
        }
    }

    /// Same user, new tokens.
    #[must_use]
    pub fn token_refreshed(session: Session) -> Self {
        Self {
            event: AuthEvent::TokenRefreshed,
            session: Some(session),
        }
    }

    #[must_use]
    pub fn user_updated(session: Session) -> Self {
        Self {
            event: AuthEvent::UserUpdated,
            session: Some(session),
        }
    }
}

/// Handler invoked on every session change after registration.
#[async_trait]
pub trait AuthListener: Send + Sync {
    async fn on_auth_change(&self, change: AuthChange);
}

type ListenerMap = Mutex<BTreeMap<u64, Arc<dyn AuthListener>>>;

/// Registry of auth listeners, shared by backend implementations.
///
/// Listeners are notified in registration order. The registry lock is never
/// held while a listener runs.
#[derive(Default)]
pub struct AuthListeners {
    next_id: AtomicU64,
    listeners: Arc<ListenerMap>,
}

impl AuthListeners {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn register(&self, listener: Arc<dyn AuthListener>) -> AuthSubscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().insert(id, listener);
        AuthSubscription {
            id,
            registry: Arc::downgrade(&self.listeners),
            active: AtomicBool::new(true),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub async fn notify(&self, change: AuthChange) {
        let listeners: Vec<Arc<dyn AuthListener>> =
            self.listeners.lock().values().cloned().collect();
        tracing::debug!(event = ?change.event, listeners = listeners.len(), "Dispatching auth change");
        for listener in listeners {
            listener.on_auth_change(change.clone()).await;
        }
    }
}

/// Handle for a registered [`AuthListener`].
///
/// Unregistration is explicit: dropping the handle keeps the listener
/// registered. [`unsubscribe`](Self::unsubscribe) may be called any number
/// of times.
pub struct AuthSubscription {
    id: u64,
    registry: Weak<ListenerMap>,
    active: AtomicBool,
}

impl AuthSubscription {
    /// A handle that is not attached to any registry.
    #[must_use]
    pub fn detached() -> Self {
        Self {
            id: 0,
            registry: Weak::new(),
            active: AtomicBool::new(false),
        }
    }

    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().remove(&self.id);
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for AuthSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSubscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}
