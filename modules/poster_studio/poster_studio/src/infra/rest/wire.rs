//! Request and response bodies of the auth API.

use poster_studio_sdk::{Secret, Session, User};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Serialize)]
pub struct PasswordGrant<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RefreshGrant<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Serialize)]
pub struct SignUpBody<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub data: SignUpMetadata<'a>,
}

#[derive(Debug, Serialize)]
pub struct SignUpMetadata<'a> {
    pub full_name: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct UserWire {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

impl UserWire {
    pub fn into_user(self, now: OffsetDateTime) -> User {
        let created_at = self.created_at.unwrap_or(now);
        User {
            id: self.id,
            email: self.email.filter(|e| !e.is_empty()),
            created_at,
            updated_at: self.updated_at.unwrap_or(created_at),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TokenWire {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds. Negative values fail to decode.
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: UserWire,
}

impl TokenWire {
    pub fn into_session(self, now: OffsetDateTime) -> Session {
        Session {
            user: self.user.into_user(now),
            access_token: Secret::new(self.access_token),
            refresh_token: self.refresh_token.map(Secret::new),
            expires_at: self.expires_in.and_then(|secs| expiry(now, secs)),
        }
    }
}

/// A lifetime past the representable calendar yields `None`, i.e. no expiry.
fn expiry(now: OffsetDateTime, secs: u64) -> Option<OffsetDateTime> {
    let secs = i64::try_from(secs).ok()?;
    now.checked_add(time::Duration::seconds(secs))
}

/// Sign-up answers with a session, or with the bare user while the account
/// awaits confirmation.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SignUpWire {
    Session(TokenWire),
    User(UserWire),
}
