use std::sync::Arc;

use async_trait::async_trait;
use poster_studio_sdk::{
    AuthChange, AuthListener, AuthService, AuthSubscription, Secret, ServiceError, Session,
    SignUpResult, User,
};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use super::RestBackend;
use super::wire::{
    PasswordGrant, RefreshGrant, SignUpBody, SignUpMetadata, SignUpWire, TokenWire, UserWire,
};

impl RestBackend {
    async fn open_session(&self, session: Session) {
        *self.session.lock() = Some(session.clone());
        info!(user_id = %session.user.id, "Signed in");
        self.listeners.notify(AuthChange::signed_in(session)).await;
    }

    /// Held session if it is still valid.
    ///
    /// An expired session is replaced through its refresh token. When that is
    /// impossible the session is dropped and listeners see a sign-out.
    pub(super) async fn live_session(&self) -> Option<Session> {
        let now = OffsetDateTime::now_utc();
        let expired = {
            let mut held = self.session.lock();
            if !held.as_ref().is_some_and(|s| s.is_expired(now)) {
                return held.clone();
            }
            held.take()?
        };
        debug!(user_id = %expired.user.id, "Held session expired");

        if let Some(refresh_token) = &expired.refresh_token {
            match self.refresh(refresh_token).await {
                Ok(session) => {
                    *self.session.lock() = Some(session.clone());
                    info!(user_id = %session.user.id, "Session refreshed");
                    self.listeners
                        .notify(AuthChange::token_refreshed(session.clone()))
                        .await;
                    return Some(session);
                }
                Err(e) => warn!(error = %e, "Session refresh failed"),
            }
        }
        self.listeners.notify(AuthChange::signed_out()).await;
        None
    }

    async fn refresh(&self, refresh_token: &Secret) -> Result<Session, ServiceError> {
        let url = self.endpoint("auth/v1/token")?;
        let builder = self
            .authorize(self.client.post(url), &self.anon_key)
            .query(&[("grant_type", "refresh_token")])
            .json(&RefreshGrant {
                refresh_token: refresh_token.expose(),
            });
        let token: TokenWire = Self::execute(builder, true).await?;
        Ok(token.into_session(OffsetDateTime::now_utc()))
    }
}

#[async_trait]
impl AuthService for RestBackend {
    #[tracing::instrument(skip_all)]
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ServiceError> {
        let url = self.endpoint("auth/v1/token")?;
        let builder = self
            .authorize(self.client.post(url), &self.anon_key)
            .query(&[("grant_type", "password")])
            .json(&PasswordGrant { email, password });

        let token: TokenWire = Self::execute(builder, true).await?;
        let session = token.into_session(OffsetDateTime::now_utc());
        self.open_session(session.clone()).await;
        Ok(session)
    }

    #[tracing::instrument(skip_all)]
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<SignUpResult, ServiceError> {
        let url = self.endpoint("auth/v1/signup")?;
        let builder = self
            .authorize(self.client.post(url), &self.anon_key)
            .json(&SignUpBody {
                email,
                password,
                data: SignUpMetadata { full_name },
            });

        let now = OffsetDateTime::now_utc();
        match Self::execute::<SignUpWire>(builder, false).await? {
            SignUpWire::Session(token) => {
                let session = token.into_session(now);
                self.open_session(session.clone()).await;
                Ok(SignUpResult::Session(session))
            }
            SignUpWire::User(user) => {
                let user = user.into_user(now);
                debug!(user_id = %user.id, "Sign-up pending confirmation");
                Ok(SignUpResult::ConfirmationPending(user))
            }
        }
    }

    /// Local session is dropped even if the remote call fails.
    #[tracing::instrument(skip_all)]
    async fn sign_out(&self) -> Result<(), ServiceError> {
        let held = self.session.lock().take();
        let Some(session) = held else {
            return Ok(());
        };

        let remote = match self.endpoint("auth/v1/logout") {
            Ok(url) => {
                let builder = self.authorize(self.client.post(url), &session.access_token);
                Self::send(builder, false).await.map(drop)
            }
            Err(e) => Err(e),
        };
        self.listeners.notify(AuthChange::signed_out()).await;
        remote
    }

    async fn get_session(&self) -> Result<Option<Session>, ServiceError> {
        Ok(self.live_session().await)
    }

    /// Asks the service for the user behind the held session. A changed
    /// record replaces the held one and is announced as `UserUpdated`.
    #[tracing::instrument(skip_all)]
    async fn get_user(&self) -> Result<Option<User>, ServiceError> {
        let Some(session) = self.live_session().await else {
            return Ok(None);
        };
        let url = self.endpoint("auth/v1/user")?;
        let builder = self.authorize(self.client.get(url), &session.access_token);
        let user = match Self::execute::<UserWire>(builder, true).await {
            Ok(user) => user.into_user(OffsetDateTime::now_utc()),
            Err(ServiceError::InvalidCredentials) => return Ok(None),
            Err(e) => return Err(e),
        };

        if user != session.user {
            let updated = {
                let mut held = self.session.lock();
                match held.as_mut() {
                    Some(current) if current.user.id == user.id => {
                        current.user = user.clone();
                        Some(current.clone())
                    }
                    _ => None,
                }
            };
            if let Some(updated) = updated {
                debug!(user_id = %user.id, "User record changed");
                self.listeners
                    .notify(AuthChange::user_updated(updated))
                    .await;
            }
        }
        Ok(Some(user))
    }

    fn subscribe(&self, listener: Arc<dyn AuthListener>) -> AuthSubscription {
        self.listeners.register(listener)
    }
}
