//! Backend access traits.
//!
//! Both traits report every failure as a [`ServiceError`]; none of them
//! panics or blocks when the remote endpoint is missing. Callers decide per
//! operation whether a failure propagates or falls back to local data.

use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::{AuthListener, AuthSubscription};
use crate::errors::ServiceError;
use crate::models::{Session, User};
use crate::query::{Embed, Filter, Query, Row, Table};

/// Table-style CRUD over the remote record collections.
#[async_trait]
pub trait DataService: Send + Sync {
    /// Filtered, ordered read.
    async fn select(&self, query: &Query) -> Result<Vec<Row>, ServiceError>;

    /// Inserts one row and returns it as stored, with server defaults filled.
    async fn insert(
        &self,
        table: Table,
        row: Row,
        embed: Option<Embed>,
    ) -> Result<Row, ServiceError>;

    /// Applies `patch` to every matching row and returns the updated rows.
    async fn update(
        &self,
        table: Table,
        filters: &[Filter],
        patch: Row,
    ) -> Result<Vec<Row>, ServiceError>;

    /// Deletes every matching row and returns how many were removed.
    async fn delete(&self, table: Table, filters: &[Filter]) -> Result<u64, ServiceError>;
}

/// Outcome of a successful sign-up call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpResult {
    /// Account created and signed in.
    Session(Session),
    /// Account created; the service requires confirmation before sign-in.
    ConfirmationPending(User),
}

/// Session lifecycle of the remote auth service.
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ServiceError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<SignUpResult, ServiceError>;

    async fn sign_out(&self) -> Result<(), ServiceError>;

    /// Current session, if one is held and still valid.
    async fn get_session(&self) -> Result<Option<Session>, ServiceError>;

    /// Current user as confirmed by the service.
    async fn get_user(&self) -> Result<Option<User>, ServiceError>;

    /// Registers `listener` for every future session change.
    fn subscribe(&self, listener: Arc<dyn AuthListener>) -> AuthSubscription;
}
