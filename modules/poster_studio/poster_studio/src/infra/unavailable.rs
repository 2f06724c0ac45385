use std::sync::Arc;

use async_trait::async_trait;
use poster_studio_sdk::{
    AuthListener, AuthService, AuthSubscription, DataService, Embed, Filter, Query, Row,
    ServiceError, Session, SignUpResult, Table, User,
};

/// Backend used when no remote endpoint is configured. Every call fails
/// with [`ServiceError::Unavailable`] carrying the configured reason.
#[derive(Debug, Clone)]
pub struct UnavailableBackend {
    reason: String,
}

impl UnavailableBackend {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    fn fail<T>(&self) -> Result<T, ServiceError> {
        Err(ServiceError::unavailable(self.reason.clone()))
    }
}

#[async_trait]
impl DataService for UnavailableBackend {
    async fn select(&self, _query: &Query) -> Result<Vec<Row>, ServiceError> {
        self.fail()
    }

    async fn insert(
        &self,
        _table: Table,
        _row: Row,
        _embed: Option<Embed>,
    ) -> Result<Row, ServiceError> {
        self.fail()
    }

    async fn update(
        &self,
        _table: Table,
        _filters: &[Filter],
        _patch: Row,
    ) -> Result<Vec<Row>, ServiceError> {
        self.fail()
    }

    async fn delete(&self, _table: Table, _filters: &[Filter]) -> Result<u64, ServiceError> {
        self.fail()
    }
}

#[async_trait]
impl AuthService for UnavailableBackend {
    async fn sign_in_with_password(
        &self,
        _email: &str,
        _password: &str,
    ) -> Result<Session, ServiceError> {
        self.fail()
    }

    async fn sign_up(
        &self,
        _email: &str,
        _password: &str,
        _full_name: &str,
    ) -> Result<SignUpResult, ServiceError> {
        self.fail()
    }

    async fn sign_out(&self) -> Result<(), ServiceError> {
        self.fail()
    }

    async fn get_session(&self) -> Result<Option<Session>, ServiceError> {
        self.fail()
    }

    async fn get_user(&self) -> Result<Option<User>, ServiceError> {
        self.fail()
    }

    /// No session change can ever happen, so the listener is dropped.
    fn subscribe(&self, _listener: Arc<dyn AuthListener>) -> AuthSubscription {
        AuthSubscription::detached()
    }
}
