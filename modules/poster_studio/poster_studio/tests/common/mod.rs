#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

//! Common test utilities for poster studio integration tests

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use poster_studio::domain::demo;
use poster_studio::{
    AuthService, Backend, BackendKind, DataService, InMemoryBackend, ServiceError, Session,
    SessionState, Studio, User, WriteMode,
};
use poster_studio_sdk::{AuthListener, AuthSubscription, Embed, Filter, Query, Row, SignUpResult, Table};
use tokio::sync::Notify;

pub const EMAIL: &str = "owner@shop.co.ke";
pub const PASSWORD: &str = "hunter22";

/// Studio whose backend fails every call.
pub fn offline_studio(write_mode: WriteMode) -> Studio {
    Studio::new(&Backend::unavailable("backend url is not configured"), write_mode)
}

/// Studio over an embedded backend seeded with the built-in catalog.
pub fn embedded_studio(write_mode: WriteMode) -> (Arc<InMemoryBackend>, Studio) {
    let backend = Arc::new(InMemoryBackend::new());
    backend.seed_templates(&demo::templates()).unwrap();
    let studio = Studio::new(&Backend::embedded(backend.clone()), write_mode);
    (backend, studio)
}

/// Registers the test account and signs it out again, so the backend holds
/// no session.
pub async fn register(backend: &InMemoryBackend) -> String {
    let result = backend.sign_up(EMAIL, PASSWORD, "Wanjiku").await.unwrap();
    let SignUpResult::Session(session) = result else {
        panic!("embedded sign-up should open a session");
    };
    backend.sign_out().await.unwrap();
    session.user.id
}

pub fn assert_profile_invariant(state: &SessionState) {
    assert_eq!(
        state.user.is_some(),
        state.profile.is_some(),
        "profile must be present exactly when a user is: {state:?}"
    );
    if let (Some(user), Some(profile)) = (&state.user, &state.profile) {
        assert_eq!(user.id, profile.id);
    }
}

/// Embedded backend that can hold `get_session` and `select` calls until
/// [`GatedBackend::release`] runs. Counts profile reads.
pub struct GatedBackend {
    inner: Arc<InMemoryBackend>,
    closed: AtomicBool,
    gate: Notify,
    profile_reads: AtomicUsize,
}

impl GatedBackend {
    pub fn inner(&self) -> &InMemoryBackend {
        &self.inner
    }

    /// Calls made from now on wait for [`release`](Self::release).
    pub fn hold(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.closed.store(false, Ordering::SeqCst);
        self.gate.notify_one();
    }

    pub fn profile_reads(&self) -> usize {
        self.profile_reads.load(Ordering::SeqCst)
    }

    async fn pass(&self) {
        if self.closed.load(Ordering::SeqCst) {
            self.gate.notified().await;
        }
    }
}

#[async_trait]
impl DataService for GatedBackend {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, ServiceError> {
        self.pass().await;
        if query.table == Table::Profiles {
            self.profile_reads.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.select(query).await
    }

    async fn insert(
        &self,
        table: Table,
        row: Row,
        embed: Option<Embed>,
    ) -> Result<Row, ServiceError> {
        self.inner.insert(table, row, embed).await
    }

    async fn update(
        &self,
        table: Table,
        filters: &[Filter],
        patch: Row,
    ) -> Result<Vec<Row>, ServiceError> {
        self.inner.update(table, filters, patch).await
    }

    async fn delete(&self, table: Table, filters: &[Filter]) -> Result<u64, ServiceError> {
        self.inner.delete(table, filters).await
    }
}

#[async_trait]
impl AuthService for GatedBackend {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ServiceError> {
        self.inner.sign_in_with_password(email, password).await
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<SignUpResult, ServiceError> {
        self.inner.sign_up(email, password, full_name).await
    }

    async fn sign_out(&self) -> Result<(), ServiceError> {
        self.inner.sign_out().await
    }

    async fn get_session(&self) -> Result<Option<Session>, ServiceError> {
        self.pass().await;
        self.inner.get_session().await
    }

    async fn get_user(&self) -> Result<Option<User>, ServiceError> {
        self.inner.get_user().await
    }

    fn subscribe(&self, listener: Arc<dyn AuthListener>) -> AuthSubscription {
        self.inner.subscribe(listener)
    }
}

/// Studio over a [`GatedBackend`] seeded with the built-in catalog.
pub fn gated_studio(write_mode: WriteMode) -> (Arc<GatedBackend>, Studio) {
    let inner = Arc::new(InMemoryBackend::new());
    inner.seed_templates(&demo::templates()).unwrap();
    let backend = Arc::new(GatedBackend {
        inner,
        closed: AtomicBool::new(false),
        gate: Notify::new(),
        profile_reads: AtomicUsize::new(0),
    });
    let studio = Studio::new(
        &Backend::from_shared(backend.clone(), BackendKind::Embedded),
        write_mode,
    );
    (backend, studio)
}
