//! Embedded backend: tables and accounts held in process memory.
//!
//! Evaluates queries over JSON rows the way the hosted service does, fills
//! server defaults on insert, and emits auth events. It can be switched
//! offline, after which every call fails as unavailable.

use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use poster_studio_sdk::{
    AuthChange, AuthListener, AuthListeners, AuthService, AuthSubscription, DataService, Embed,
    Filter, Query, Row, Secret, ServiceError, Session, SignUpResult, Table, Template, User,
};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::debug;
use uuid::Uuid;

use super::storage::mapper;

/// Credits granted to a freshly registered account.
pub const SIGN_UP_CREDITS: u32 = 3;

struct Account {
    user: User,
    password: Secret,
    confirmed: bool,
}

#[derive(Default)]
struct State {
    tables: HashMap<Table, Vec<Row>>,
    accounts: HashMap<String, Account>,
    session: Option<Session>,
}

pub struct InMemoryBackend {
    state: Mutex<State>,
    listeners: AuthListeners,
    online: AtomicBool,
    require_confirmation: bool,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            listeners: AuthListeners::new(),
            online: AtomicBool::new(true),
            require_confirmation: false,
        }
    }

    /// Sign-ups return no session until the account is confirmed.
    #[must_use]
    pub fn with_email_confirmation(mut self) -> Self {
        self.require_confirmation = true;
        self
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Release);
        debug!(online, "Embedded backend availability changed");
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    /// Stores `rows` as they are, without server defaults.
    pub fn seed(&self, table: Table, rows: impl IntoIterator<Item = Row>) {
        self.state
            .lock()
            .tables
            .entry(table)
            .or_default()
            .extend(rows);
    }

    /// Loads `templates` into the catalog table.
    ///
    /// # Errors
    /// When a template cannot be encoded as a row.
    pub fn seed_templates(&self, templates: &[Template]) -> Result<(), ServiceError> {
        let rows = templates
            .iter()
            .map(mapper::template_to_row)
            .collect::<Result<Vec<_>, _>>()?;
        self.seed(Table::Templates, rows);
        Ok(())
    }

    /// Copy of every row currently in `table`.
    #[must_use]
    pub fn rows(&self, table: Table) -> Vec<Row> {
        self.state
            .lock()
            .tables
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }

    /// Marks the account registered under `email` as confirmed. False when
    /// there is no such account.
    #[must_use]
    pub fn confirm(&self, email: &str) -> bool {
        match self.state.lock().accounts.get_mut(email) {
            Some(account) => {
                account.confirmed = true;
                true
            }
            None => false,
        }
    }

    fn ensure_online(&self) -> Result<(), ServiceError> {
        if self.is_online() {
            Ok(())
        } else {
            Err(ServiceError::unavailable("embedded backend is offline"))
        }
    }

    fn open_session(state: &mut State, user: User) -> Session {
        let session = Session {
            user,
            access_token: Secret::new(Uuid::new_v4().to_string()),
            refresh_token: Some(Secret::new(Uuid::new_v4().to_string())),
            expires_at: Some(OffsetDateTime::now_utc() + time::Duration::hours(1)),
        };
        state.session = Some(session.clone());
        session
    }
}

fn matches(row: &Row, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| match filter {
        Filter::Eq { column, value } => row.get(column).unwrap_or(&Value::Null) == value,
    })
}

fn as_timestamp(value: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(value, &Rfc3339).ok()
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

// Null sorts lowest. Timestamps compare as instants, not as text.
fn compare(a: Option<&Value>, b: Option<&Value>) -> CmpOrdering {
    let (a, b) = (a.unwrap_or(&Value::Null), b.unwrap_or(&Value::Null));
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(CmpOrdering::Equal),
        (Value::String(x), Value::String(y)) => match (as_timestamp(x), as_timestamp(y)) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x.cmp(y),
        },
        _ => rank(a).cmp(&rank(b)),
    }
}

fn attach(tables: &HashMap<Table, Vec<Row>>, embed: Embed, mut row: Row) -> Row {
    let related = row.get(embed.foreign_key()).and_then(|key| {
        tables
            .get(&embed.table())?
            .iter()
            .find(|candidate| candidate.get("id") == Some(key))
            .cloned()
    });
    row.insert(
        embed.key().to_owned(),
        related.map_or(Value::Null, Value::Object),
    );
    row
}

#[async_trait]
impl DataService for InMemoryBackend {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, ServiceError> {
        self.ensure_online()?;
        let state = self.state.lock();
        let mut rows: Vec<Row> = state
            .tables
            .get(&query.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches(row, &query.filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        rows.sort_by(|a, b| {
            query.order.iter().fold(CmpOrdering::Equal, |acc, order| {
                acc.then_with(|| {
                    let ord = compare(a.get(&order.column), b.get(&order.column));
                    if order.ascending { ord } else { ord.reverse() }
                })
            })
        });
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        if let Some(embed) = query.embed {
            rows = rows
                .into_iter()
                .map(|row| attach(&state.tables, embed, row))
                .collect();
        }
        Ok(rows)
    }

    async fn insert(
        &self,
        table: Table,
        mut row: Row,
        embed: Option<Embed>,
    ) -> Result<Row, ServiceError> {
        self.ensure_online()?;
        let now = mapper::timestamp(table, OffsetDateTime::now_utc())?;
        row.entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        row.entry("created_at").or_insert_with(|| now.clone());
        row.entry("updated_at").or_insert(now);
        if table == Table::UserDesigns {
            row.entry("design_data")
                .or_insert_with(|| Value::Object(Map::new()));
        }

        let mut state = self.state.lock();
        state.tables.entry(table).or_default().push(row.clone());
        Ok(match embed {
            Some(embed) => attach(&state.tables, embed, row),
            None => row,
        })
    }

    async fn update(
        &self,
        table: Table,
        filters: &[Filter],
        patch: Row,
    ) -> Result<Vec<Row>, ServiceError> {
        self.ensure_online()?;
        let now = mapper::timestamp(table, OffsetDateTime::now_utc())?;
        let mut state = self.state.lock();
        let Some(rows) = state.tables.get_mut(&table) else {
            return Ok(Vec::new());
        };

        let mut updated = Vec::new();
        for row in rows.iter_mut().filter(|row| matches(row, filters)) {
            for (column, value) in &patch {
                row.insert(column.clone(), value.clone());
            }
            if !patch.contains_key("updated_at") && row.contains_key("updated_at") {
                row.insert("updated_at".to_owned(), now.clone());
            }
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn delete(&self, table: Table, filters: &[Filter]) -> Result<u64, ServiceError> {
        self.ensure_online()?;
        let mut state = self.state.lock();
        let Some(rows) = state.tables.get_mut(&table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|row| !matches(row, filters));
        Ok(u64::try_from(before - rows.len()).unwrap_or(u64::MAX))
    }
}

#[async_trait]
impl AuthService for InMemoryBackend {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ServiceError> {
        self.ensure_online()?;
        let session = {
            let mut state = self.state.lock();
            let account = state
                .accounts
                .get(email)
                .filter(|account| account.password.expose() == password)
                .ok_or(ServiceError::InvalidCredentials)?;
            if !account.confirmed {
                return Err(ServiceError::rejected(400, "Email not confirmed"));
            }
            let user = account.user.clone();
            Self::open_session(&mut state, user)
        };
        self.listeners
            .notify(AuthChange::signed_in(session.clone()))
            .await;
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<SignUpResult, ServiceError> {
        self.ensure_online()?;
        let now = OffsetDateTime::now_utc();
        let created_at = mapper::timestamp(Table::Profiles, now)?;

        let result = {
            let mut state = self.state.lock();
            if state.accounts.contains_key(email) {
                return Err(ServiceError::rejected(422, "User already registered"));
            }
            let user = User {
                id: Uuid::new_v4().to_string(),
                email: Some(email.to_owned()),
                created_at: now,
                updated_at: now,
            };

            let mut profile = Map::new();
            profile.insert("id".to_owned(), user.id.clone().into());
            profile.insert("email".to_owned(), email.into());
            profile.insert("full_name".to_owned(), full_name.into());
            profile.insert("avatar_url".to_owned(), Value::Null);
            profile.insert("subscription_plan".to_owned(), "free".into());
            profile.insert("subscription_status".to_owned(), "inactive".into());
            profile.insert("subscription_end_date".to_owned(), Value::Null);
            profile.insert("credits_remaining".to_owned(), SIGN_UP_CREDITS.into());
            profile.insert("created_at".to_owned(), created_at.clone());
            profile.insert("updated_at".to_owned(), created_at);
            state
                .tables
                .entry(Table::Profiles)
                .or_default()
                .push(profile);

            state.accounts.insert(
                email.to_owned(),
                Account {
                    user: user.clone(),
                    password: Secret::new(password),
                    confirmed: !self.require_confirmation,
                },
            );

            if self.require_confirmation {
                SignUpResult::ConfirmationPending(user)
            } else {
                SignUpResult::Session(Self::open_session(&mut state, user))
            }
        };

        if let SignUpResult::Session(session) = &result {
            self.listeners
                .notify(AuthChange::signed_in(session.clone()))
                .await;
        }
        Ok(result)
    }

    async fn sign_out(&self) -> Result<(), ServiceError> {
        self.ensure_online()?;
        let had_session = self.state.lock().session.take().is_some();
        if had_session {
            self.listeners.notify(AuthChange::signed_out()).await;
        }
        Ok(())
    }

    async fn get_session(&self) -> Result<Option<Session>, ServiceError> {
        self.ensure_online()?;
        let now = OffsetDateTime::now_utc();
        Ok(self
            .state
            .lock()
            .session
            .clone()
            .filter(|session| !session.is_expired(now)))
    }

    async fn get_user(&self) -> Result<Option<User>, ServiceError> {
        Ok(self.get_session().await?.map(|session| session.user))
    }

    fn subscribe(&self, listener: Arc<dyn AuthListener>) -> AuthSubscription {
        self.listeners.register(listener)
    }
}
