//! Session store: current identity, its profile, and the auth lifecycle.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use poster_studio_sdk::{
    AuthChange, AuthEvent, AuthListener, AuthService, AuthSubscription, Profile, ProfilePatch,
    SignUpResult, StoreError, User,
};
use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::WriteOutcome;
use super::access;
use super::demo;
use super::repo::PosterRepository;

/// Observable session state.
///
/// After any store operation resolves, `profile` is present exactly when
/// `user` is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub user: Option<User>,
    pub profile: Option<Profile>,
    /// True only while [`SessionStore::initialize`] runs.
    pub loading: bool,
    pub initialized: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    Loading,
    Authenticated,
    Unauthenticated,
}

impl SessionState {
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        if self.loading {
            SessionPhase::Loading
        } else if self.user.is_some() {
            SessionPhase::Authenticated
        } else if self.initialized {
            SessionPhase::Unauthenticated
        } else {
            SessionPhase::Uninitialized
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInOutcome {
    /// The auth service accepted the credentials.
    Authenticated,
    /// The auth service failed; a local identity was set instead.
    Demo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignUpOutcome {
    Authenticated,
    /// Account created, sign-in waits for confirmation. State is unchanged.
    ConfirmationPending,
    Demo,
}

/// What an export was paid with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditCharge {
    /// Active subscription, no credit used.
    Subscription,
    Credit { remaining: u32, outcome: WriteOutcome },
}

pub struct SessionStore {
    auth: Arc<dyn AuthService>,
    repo: Arc<dyn PosterRepository>,
    state: watch::Sender<SessionState>,
    subscription: Mutex<Option<AuthSubscription>>,
    this: Weak<SessionStore>,
}

impl SessionStore {
    #[must_use]
    pub fn new(auth: Arc<dyn AuthService>, repo: Arc<dyn PosterRepository>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            auth,
            repo,
            state: watch::Sender::new(SessionState::default()),
            subscription: Mutex::new(None),
            this: this.clone(),
        })
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    #[must_use]
    pub fn profile(&self) -> Option<Profile> {
        self.state.borrow().profile.clone()
    }

    #[must_use]
    pub fn plan_label(&self) -> &'static str {
        self.state
            .borrow()
            .profile
            .as_ref()
            .map_or("Free Plan", Profile::plan_label)
    }

    #[must_use]
    pub fn can_export(&self) -> bool {
        access::can_export(self.state.borrow().profile.as_ref())
    }

    /// Restores a held session and starts following auth changes.
    ///
    /// Runs once; later calls return immediately. Backend failures end in the
    /// unauthenticated state.
    #[tracing::instrument(skip_all)]
    pub async fn initialize(&self) {
        let started = self.state.send_if_modified(|s| {
            if s.initialized || s.loading {
                return false;
            }
            s.loading = true;
            true
        });
        if !started {
            debug!("Session store already initialized");
            return;
        }

        let restored = match self.auth.get_session().await {
            Ok(session) => session.map(|s| s.user),
            Err(e) => {
                warn!(error = %e, "Session restore failed, continuing signed out");
                None
            }
        };
        let resolved = match restored {
            Some(user) => {
                let profile = self.resolve_profile(&user).await;
                Some((user, profile))
            }
            None => None,
        };

        self.listen();

        let restored_user = resolved.is_some();
        self.state.send_modify(|s| {
            if let Some((user, profile)) = resolved {
                s.user = Some(user);
                s.profile = Some(profile);
            }
            s.loading = false;
            s.initialized = true;
        });
        info!(restored = restored_user, "Session store initialized");
    }

    fn listen(&self) {
        let listener = Arc::new(SessionListener {
            store: self.this.clone(),
        });
        let subscription = self.auth.subscribe(listener);
        if let Some(previous) = self.subscription.lock().replace(subscription) {
            previous.unsubscribe();
        }
    }

    /// Stops following auth changes. Safe to call repeatedly.
    pub fn shutdown(&self) {
        if let Some(subscription) = self.subscription.lock().take() {
            subscription.unsubscribe();
            debug!("Auth listener removed");
        }
    }

    /// Signs in; any auth failure switches to a local identity for `email`.
    ///
    /// # Errors
    /// `Validation` when `email` is blank.
    #[tracing::instrument(skip_all)]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SignInOutcome, StoreError> {
        let email = require_email(email)?;
        match self.auth.sign_in_with_password(email, password).await {
            Ok(session) => {
                self.adopt(session.user).await;
                Ok(SignInOutcome::Authenticated)
            }
            Err(e) => {
                warn!(error = %e, "Sign-in failed, using local identity");
                self.set_user(demo::user(email, OffsetDateTime::now_utc()))
                    .await;
                Ok(SignInOutcome::Demo)
            }
        }
    }

    /// # Errors
    /// `Validation` when `email` is blank.
    #[tracing::instrument(skip_all)]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<SignUpOutcome, StoreError> {
        let email = require_email(email)?;
        match self.auth.sign_up(email, password, full_name).await {
            Ok(SignUpResult::Session(session)) => {
                self.adopt(session.user).await;
                Ok(SignUpOutcome::Authenticated)
            }
            Ok(SignUpResult::ConfirmationPending(user)) => {
                info!(user_id = %user.id, "Sign-up awaiting confirmation");
                Ok(SignUpOutcome::ConfirmationPending)
            }
            Err(e) => {
                warn!(error = %e, "Sign-up failed, using local identity");
                self.set_user(demo::user(email, OffsetDateTime::now_utc()))
                    .await;
                Ok(SignUpOutcome::Demo)
            }
        }
    }

    /// Best-effort remote sign-out; local state is always cleared.
    #[tracing::instrument(skip_all)]
    pub async fn sign_out(&self) {
        if let Err(e) = self.auth.sign_out().await {
            warn!(error = %e, "Remote sign-out failed");
        }
        self.clear();
    }

    /// Reloads the profile of the current user. No-op when signed out.
    #[tracing::instrument(skip_all)]
    pub async fn fetch_profile(&self) {
        let Some(user) = self.user() else {
            return;
        };
        let profile = self.resolve_profile(&user).await;
        self.publish_profile(&user.id, profile);
    }

    /// Updates the current profile remotely, or merges locally when that fails.
    ///
    /// # Errors
    /// `AuthenticationRequired` when no user is signed in.
    #[tracing::instrument(skip_all)]
    pub async fn update_profile(&self, patch: &ProfilePatch) -> Result<WriteOutcome, StoreError> {
        let user = self.user().ok_or(StoreError::AuthenticationRequired)?;
        if patch.is_empty() {
            return Ok(WriteOutcome::Synced);
        }

        match self.repo.update_profile(&user.id, patch).await {
            Ok(()) => {
                match self.repo.fetch_profile(&user.id).await {
                    Ok(profile) => self.publish_profile(&user.id, profile),
                    Err(e) => {
                        warn!(error = %e, "Profile refresh after update failed");
                        self.merge_profile(&user.id, patch);
                    }
                }
                Ok(WriteOutcome::Synced)
            }
            Err(e) => {
                warn!(error = %e, user_id = %user.id, "Profile update failed, applying locally");
                self.merge_profile(&user.id, patch);
                Ok(WriteOutcome::LocalOnly)
            }
        }
    }

    /// Pays for one export: free under an active subscription, otherwise one
    /// credit.
    ///
    /// # Errors
    /// `AuthenticationRequired` when signed out, `InsufficientCredits` when
    /// there is neither a subscription nor a credit left.
    #[tracing::instrument(skip_all)]
    pub async fn consume_export_credit(&self) -> Result<CreditCharge, StoreError> {
        let profile = self.profile().ok_or(StoreError::AuthenticationRequired)?;
        if profile.has_active_subscription() {
            return Ok(CreditCharge::Subscription);
        }
        let remaining = profile
            .credits_remaining
            .checked_sub(1)
            .ok_or(StoreError::InsufficientCredits)?;
        let outcome = self
            .update_profile(&ProfilePatch::credits(remaining))
            .await?;
        debug!(remaining, "Export credit consumed");
        Ok(CreditCharge::Credit { remaining, outcome })
    }

    async fn resolve_profile(&self, user: &User) -> Profile {
        match self.repo.fetch_profile(&user.id).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(error = %e, user_id = %user.id, "Profile fetch failed, using local profile");
                demo::profile_for(user, OffsetDateTime::now_utc())
            }
        }
    }

    async fn set_user(&self, user: User) {
        let profile = self.resolve_profile(&user).await;
        debug!(user_id = %user.id, "User set");
        self.state.send_modify(|s| {
            s.user = Some(user);
            s.profile = Some(profile);
        });
    }

    /// Makes `user` current. The profile is fetched only when the state does
    /// not already hold one for the same id, e.g. when the auth listener has
    /// just loaded it.
    async fn adopt(&self, user: User) {
        let known = {
            let state = self.state.borrow();
            state.profile.is_some() && state.user.as_ref().is_some_and(|u| u.id == user.id)
        };
        if !known {
            self.set_user(user).await;
            return;
        }
        self.state.send_if_modified(|s| {
            if s.user.as_ref() == Some(&user) {
                return false;
            }
            s.user = Some(user);
            true
        });
    }

    fn clear(&self) {
        self.state.send_if_modified(|s| {
            let changed = s.user.is_some() || s.profile.is_some();
            s.user = None;
            s.profile = None;
            changed
        });
    }

    // Drops results for a user that is no longer current.
    fn publish_profile(&self, user_id: &str, profile: Profile) {
        self.state.send_if_modified(|s| {
            if s.user.as_ref().is_none_or(|u| u.id != user_id) {
                return false;
            }
            s.profile = Some(profile);
            true
        });
    }

    fn merge_profile(&self, user_id: &str, patch: &ProfilePatch) {
        self.state.send_if_modified(|s| {
            if s.user.as_ref().is_none_or(|u| u.id != user_id) {
                return false;
            }
            match s.profile.as_mut() {
                Some(profile) => {
                    profile.apply(patch);
                    true
                }
                None => false,
            }
        });
    }
}

fn require_email(email: &str) -> Result<&str, StoreError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(StoreError::validation("email", "must not be empty"));
    }
    Ok(email)
}

struct SessionListener {
    store: Weak<SessionStore>,
}

#[async_trait]
impl AuthListener for SessionListener {
    async fn on_auth_change(&self, change: AuthChange) {
        let Some(store) = self.store.upgrade() else {
            return;
        };
        debug!(event = ?change.event, "Auth change received");
        match (change.event, change.session) {
            (AuthEvent::TokenRefreshed, Some(session)) => store.adopt(session.user).await,
            (_, Some(session)) => store.set_user(session.user).await,
            (_, None) => store.clear(),
        }
    }
}
