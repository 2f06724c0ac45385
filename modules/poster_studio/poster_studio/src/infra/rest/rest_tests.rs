use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use httpmock::prelude::*;
use poster_studio_sdk::{
    AuthChange, AuthEvent, AuthListener, AuthService, DataService, Embed, Filter, Order, Query,
    ServiceError, SignUpResult, Table,
};
use parking_lot::Mutex;
use serde_json::json;
use url::Url;

use super::{RestBackend, SetupError, error_message, map_status};
use crate::config::BackendConfig;
use poster_studio_sdk::Secret;
use reqwest::StatusCode;

fn config(server: &MockServer) -> BackendConfig {
    BackendConfig {
        url: Some(Url::parse(&server.base_url()).unwrap()),
        anon_key: Some(Secret::new("anon-key")),
        request_timeout: Duration::from_secs(5),
    }
}

fn token_body(access_token: &str) -> serde_json::Value {
    json!({
        "access_token": access_token,
        "refresh_token": "refresh",
        "expires_in": 3600,
        "token_type": "bearer",
        "user": {
            "id": "u-1",
            "email": "owner@shop.co.ke",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        }
    })
}

fn expired_token_body(access_token: &str, refresh_token: Option<&str>) -> serde_json::Value {
    let mut body = token_body(access_token);
    body["expires_in"] = json!(0);
    match refresh_token {
        Some(token) => body["refresh_token"] = json!(token),
        None => {
            body.as_object_mut().unwrap().remove("refresh_token");
        }
    }
    body
}

struct Events(AtomicUsize);

/// Every event, in delivery order.
#[derive(Default)]
struct History(Mutex<Vec<AuthEvent>>);

impl History {
    fn events(&self) -> Vec<AuthEvent> {
        self.0.lock().clone()
    }
}

#[async_trait]
impl AuthListener for History {
    async fn on_auth_change(&self, change: AuthChange) {
        self.0.lock().push(change.event);
    }
}

async fn mock_password_grant(server: &MockServer, body: serde_json::Value) {
    server
        .mock_async(move |when, then| {
            when.method(POST)
                .path("/auth/v1/token")
                .query_param("grant_type", "password");
            then.status(200).json_body(body);
        })
        .await;
}

#[async_trait]
impl AuthListener for Events {
    async fn on_auth_change(&self, change: AuthChange) {
        if change.event == AuthEvent::SignedIn {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[test]
fn test_setup_requires_url_and_key() {
    let missing_url = BackendConfig::default();
    assert!(matches!(
        RestBackend::new(&missing_url),
        Err(SetupError::MissingUrl)
    ));

    let missing_key = BackendConfig {
        url: Some(Url::parse("https://demo.supabase.co").unwrap()),
        ..BackendConfig::default()
    };
    assert!(matches!(
        RestBackend::new(&missing_key),
        Err(SetupError::MissingAnonKey)
    ));
}

#[test]
fn test_status_mapping() {
    assert!(map_status(StatusCode::BAD_GATEWAY, "down", false).is_unavailable());
    assert_eq!(
        map_status(StatusCode::BAD_REQUEST, "bad", true),
        ServiceError::InvalidCredentials
    );
    assert_eq!(
        map_status(StatusCode::BAD_REQUEST, "bad", false),
        ServiceError::rejected(400, "bad")
    );
    assert_eq!(
        map_status(StatusCode::NOT_FOUND, "", false),
        ServiceError::NotFound
    );
}

#[test]
fn test_error_message_extraction() {
    assert_eq!(
        error_message(r#"{"code":"42501","message":"permission denied"}"#),
        "permission denied"
    );
    assert_eq!(
        error_message(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#),
        "Invalid login credentials"
    );
    assert_eq!(error_message("  plain text "), "plain text");
}

#[tokio::test]
async fn test_select_sends_table_query() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/user_designs")
                .query_param("select", "*,template:templates(*)")
                .query_param("user_id", "eq.u-1")
                .query_param("order", "updated_at.desc")
                .header("apikey", "anon-key")
                .header("authorization", "Bearer anon-key");
            then.status(200)
                .json_body(json!([{"id": "d-1", "user_id": "u-1", "template": null}]));
        })
        .await;

    let backend = RestBackend::new(&config(&server)).unwrap();
    let query = Query::from(Table::UserDesigns)
        .filter(Filter::eq("user_id", "u-1"))
        .order(Order::desc("updated_at"))
        .embed(Embed::Template);
    let rows = backend.select(&query).await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], "d-1");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_insert_asks_for_representation() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/rest/v1/user_designs")
                .query_param("select", "*")
                .header("prefer", "return=representation")
                .json_body(json!({"user_id": "u-1"}));
            then.status(201)
                .json_body(json!([{"id": "d-9", "user_id": "u-1"}]));
        })
        .await;

    let backend = RestBackend::new(&config(&server)).unwrap();
    let mut row = serde_json::Map::new();
    row.insert("user_id".to_owned(), json!("u-1"));
    let stored = backend.insert(Table::UserDesigns, row, None).await.unwrap();

    assert_eq!(stored["id"], "d-9");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_delete_counts_returned_rows() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path("/rest/v1/user_designs")
                .query_param("id", "eq.d-1");
            then.status(200).json_body(json!([{"id": "d-1"}]));
        })
        .await;

    let backend = RestBackend::new(&config(&server)).unwrap();
    let removed = backend
        .delete(Table::UserDesigns, &[Filter::eq("id", "d-1")])
        .await
        .unwrap();
    assert_eq!(removed, 1);

    let err = backend.delete(Table::UserDesigns, &[]).await.unwrap_err();
    assert_eq!(err, ServiceError::rejected(400, "write without a row filter"));
}

#[tokio::test]
async fn test_server_error_is_unavailable() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/v1/templates");
            then.status(503).body("upstream down");
        })
        .await;

    let backend = RestBackend::new(&config(&server)).unwrap();
    let err = backend
        .select(&Query::from(Table::Templates))
        .await
        .unwrap_err();
    assert!(err.is_unavailable());
}

#[tokio::test]
async fn test_unreachable_host_is_unavailable() {
    let config = BackendConfig {
        url: Some(Url::parse("http://127.0.0.1:9").unwrap()),
        anon_key: Some(Secret::new("anon-key")),
        request_timeout: Duration::from_secs(2),
    };
    let backend = RestBackend::new(&config).unwrap();
    let err = backend
        .select(&Query::from(Table::Templates))
        .await
        .unwrap_err();
    assert!(err.is_unavailable());
}

#[tokio::test]
async fn test_sign_in_stores_session_and_notifies() {
    let server = MockServer::start_async().await;
    let token = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/auth/v1/token")
                .query_param("grant_type", "password")
                .json_body(json!({"email": "owner@shop.co.ke", "password": "pw"}));
            then.status(200).json_body(token_body("user-token"));
        })
        .await;
    let templates = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/templates")
                .header("authorization", "Bearer user-token");
            then.status(200).json_body(json!([]));
        })
        .await;

    let backend = RestBackend::new(&config(&server)).unwrap();
    let events = Arc::new(Events(AtomicUsize::new(0)));
    let _subscription = backend.subscribe(events.clone());

    let session = backend
        .sign_in_with_password("owner@shop.co.ke", "pw")
        .await
        .unwrap();
    assert_eq!(session.user.id, "u-1");
    assert!(session.expires_at.is_some());
    assert_eq!(events.0.load(Ordering::SeqCst), 1);
    assert_eq!(
        backend.get_session().await.unwrap().map(|s| s.user.id),
        Some("u-1".to_owned())
    );

    backend.select(&Query::from(Table::Templates)).await.unwrap();
    token.assert_async().await;
    templates.assert_async().await;
}

#[tokio::test]
async fn test_wrong_password_is_invalid_credentials() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/auth/v1/token");
            then.status(400).json_body(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            }));
        })
        .await;

    let backend = RestBackend::new(&config(&server)).unwrap();
    let err = backend
        .sign_in_with_password("owner@shop.co.ke", "nope")
        .await
        .unwrap_err();
    assert_eq!(err, ServiceError::InvalidCredentials);
    assert!(backend.get_session().await.unwrap().is_none());
}

#[tokio::test]
async fn test_sign_up_without_session_awaits_confirmation() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/auth/v1/signup")
                .body_includes("\"full_name\":\"Wanjiku\"");
            then.status(200).json_body(json!({
                "id": "u-2",
                "email": "new@shop.co.ke",
                "created_at": "2024-01-01T00:00:00Z"
            }));
        })
        .await;

    let backend = RestBackend::new(&config(&server)).unwrap();
    let result = backend
        .sign_up("new@shop.co.ke", "pw", "Wanjiku")
        .await
        .unwrap();

    let SignUpResult::ConfirmationPending(user) = result else {
        panic!("expected pending confirmation");
    };
    assert_eq!(user.id, "u-2");
    assert!(backend.get_session().await.unwrap().is_none());
}

#[tokio::test]
async fn test_sign_out_clears_session_even_if_remote_fails() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/auth/v1/token");
            then.status(200).json_body(token_body("user-token"));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/auth/v1/logout");
            then.status(500);
        })
        .await;

    let backend = RestBackend::new(&config(&server)).unwrap();
    backend
        .sign_in_with_password("owner@shop.co.ke", "pw")
        .await
        .unwrap();

    assert!(backend.sign_out().await.unwrap_err().is_unavailable());
    assert!(backend.get_session().await.unwrap().is_none());
    assert!(backend.sign_out().await.is_ok());
}

#[tokio::test]
async fn test_expired_session_is_refreshed_before_data_calls() {
    let server = MockServer::start_async().await;
    mock_password_grant(&server, expired_token_body("stale-token", Some("refresh-1"))).await;
    let refresh = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/auth/v1/token")
                .query_param("grant_type", "refresh_token")
                .header("authorization", "Bearer anon-key")
                .json_body(json!({"refresh_token": "refresh-1"}));
            then.status(200).json_body(token_body("fresh-token"));
        })
        .await;
    let templates = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/templates")
                .header("authorization", "Bearer fresh-token");
            then.status(200).json_body(json!([]));
        })
        .await;

    let backend = RestBackend::new(&config(&server)).unwrap();
    let history = Arc::new(History::default());
    let _subscription = backend.subscribe(history.clone());

    backend
        .sign_in_with_password("owner@shop.co.ke", "pw")
        .await
        .unwrap();
    backend.select(&Query::from(Table::Templates)).await.unwrap();

    assert_eq!(
        history.events(),
        vec![AuthEvent::SignedIn, AuthEvent::TokenRefreshed]
    );
    let session = backend.get_session().await.unwrap().unwrap();
    assert_eq!(session.access_token.expose(), "fresh-token");
    assert!(session.expires_at.is_some());
    refresh.assert_hits_async(1).await;
    templates.assert_async().await;
}

#[tokio::test]
async fn test_expired_session_without_refresh_token_signs_out() {
    let server = MockServer::start_async().await;
    mock_password_grant(&server, expired_token_body("stale-token", None)).await;
    let templates = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/templates")
                .header("authorization", "Bearer anon-key");
            then.status(200).json_body(json!([]));
        })
        .await;

    let backend = RestBackend::new(&config(&server)).unwrap();
    let history = Arc::new(History::default());
    let _subscription = backend.subscribe(history.clone());

    backend
        .sign_in_with_password("owner@shop.co.ke", "pw")
        .await
        .unwrap();
    backend.select(&Query::from(Table::Templates)).await.unwrap();

    assert_eq!(
        history.events(),
        vec![AuthEvent::SignedIn, AuthEvent::SignedOut]
    );
    assert!(backend.get_session().await.unwrap().is_none());
    assert_eq!(history.events().len(), 2);
    templates.assert_async().await;
}

#[tokio::test]
async fn test_rejected_refresh_drops_session_once() {
    let server = MockServer::start_async().await;
    mock_password_grant(&server, expired_token_body("stale-token", Some("revoked"))).await;
    let refresh = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/auth/v1/token")
                .query_param("grant_type", "refresh_token");
            then.status(400).json_body(json!({
                "error": "invalid_grant",
                "error_description": "Invalid Refresh Token"
            }));
        })
        .await;

    let backend = RestBackend::new(&config(&server)).unwrap();
    let history = Arc::new(History::default());
    let _subscription = backend.subscribe(history.clone());

    backend
        .sign_in_with_password("owner@shop.co.ke", "pw")
        .await
        .unwrap();
    assert!(backend.get_session().await.unwrap().is_none());
    assert!(backend.get_session().await.unwrap().is_none());

    assert_eq!(
        history.events(),
        vec![AuthEvent::SignedIn, AuthEvent::SignedOut]
    );
    refresh.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_oversized_lifetime_signs_in_without_expiry() {
    let server = MockServer::start_async().await;
    let mut body = token_body("user-token");
    body["expires_in"] = json!(u64::MAX);
    mock_password_grant(&server, body).await;

    let backend = RestBackend::new(&config(&server)).unwrap();
    let session = backend
        .sign_in_with_password("owner@shop.co.ke", "pw")
        .await
        .unwrap();

    assert_eq!(session.expires_at, None);
    assert!(backend.get_session().await.unwrap().is_some());
}

#[tokio::test]
async fn test_negative_lifetime_is_a_malformed_response() {
    let server = MockServer::start_async().await;
    let mut body = token_body("user-token");
    body["expires_in"] = json!(-60);
    mock_password_grant(&server, body).await;

    let backend = RestBackend::new(&config(&server)).unwrap();
    let err = backend
        .sign_in_with_password("owner@shop.co.ke", "pw")
        .await
        .unwrap_err();

    assert!(err.is_unavailable());
    assert!(backend.get_session().await.unwrap().is_none());
}

#[tokio::test]
async fn test_changed_user_record_is_announced() {
    let server = MockServer::start_async().await;
    mock_password_grant(&server, token_body("user-token")).await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/auth/v1/user")
                .header("authorization", "Bearer user-token");
            then.status(200).json_body(json!({
                "id": "u-1",
                "email": "renamed@shop.co.ke",
                "created_at": "2024-01-01T00:00:00Z",
                "updated_at": "2024-02-01T00:00:00Z"
            }));
        })
        .await;

    let backend = RestBackend::new(&config(&server)).unwrap();
    let history = Arc::new(History::default());
    let _subscription = backend.subscribe(history.clone());

    backend
        .sign_in_with_password("owner@shop.co.ke", "pw")
        .await
        .unwrap();
    let user = backend.get_user().await.unwrap().unwrap();

    assert_eq!(user.email.as_deref(), Some("renamed@shop.co.ke"));
    assert_eq!(
        history.events(),
        vec![AuthEvent::SignedIn, AuthEvent::UserUpdated]
    );
    let held = backend.get_session().await.unwrap().unwrap();
    assert_eq!(held.user, user);

    backend.get_user().await.unwrap();
    assert_eq!(history.events().len(), 2);
}
