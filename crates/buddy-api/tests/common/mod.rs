//! Shared fixtures for the HTTP tests: an in-memory database, cheap KDF
//! parameters and a mailer that records instead of sending.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde_json::{Value, json};
use tower::ServiceExt;

use buddy_api::config::{MailConfig, TokenConfig};
use buddy_api::mailer::Mailer;
use buddy_api::{AppState, AppStateInner, Config};
use buddy_crypto::CredentialConfig;
use buddy_db::Database;
use buddy_db::models::{NewUserRow, UnnotifiedGroup};
use buddy_types::models::{Gender, Role};

pub const PASSWORD: &str = "correct horse battery";
pub const JSON_API: &str = "application/vnd.api+json";

#[derive(Default)]
pub struct RecordingMailer {
    /// (email, username, code)
    pub verifications: Mutex<Vec<(String, String, String)>>,
    pub notifications: Mutex<Vec<UnnotifiedGroup>>,
    /// Receivers whose notification should fail.
    pub failing: Mutex<Vec<String>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_verification_email(
        &self,
        email: &str,
        username: &str,
        code: &str,
    ) -> anyhow::Result<()> {
        self.verifications
            .lock()
            .unwrap()
            .push((email.into(), username.into(), code.into()));
        Ok(())
    }

    async fn send_message_notification(&self, group: &UnnotifiedGroup) -> anyhow::Result<()> {
        if self.failing.lock().unwrap().contains(&group.receiver) {
            anyhow::bail!("mailbox unavailable");
        }
        self.notifications.lock().unwrap().push(group.clone());
        Ok(())
    }
}

pub struct TestApp {
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
    router: Router,
}

pub fn config() -> Config {
    Config {
        token: TokenConfig {
            secret: "integration-test-secret".into(),
            expiration: Duration::from_secs(7 * 24 * 3600),
            admin_expiration: Duration::from_secs(3600),
        },
        credentials: CredentialConfig {
            iterations: 1,
            memory_kib: 64,
        },
        email_code_expiration: Duration::from_secs(2 * 3600),
        db_path: ":memory:".into(),
        host: "127.0.0.1".into(),
        port: 0,
        notify_interval: Duration::from_secs(300),
        mail: MailConfig {
            smtp_host: None,
            smtp_port: 25,
            from: "info@buddybrno.cz".into(),
            app_url: "http://localhost:8080".into(),
        },
    }
}

impl TestApp {
    pub fn new() -> Self {
        let mailer = Arc::new(RecordingMailer::default());
        let db = Database::open_in_memory().unwrap();
        let state: AppState = Arc::new(AppStateInner::new(db, config(), mailer.clone()));
        let router = buddy_api::router(state.clone());
        Self {
            state,
            mailer,
            router,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    /// Insert a user directly. `verified` users are also available.
    pub fn user(&self, username: &str, role: Role, verified: bool) {
        let now = chrono::Utc::now().timestamp_millis();
        let credentials = &self.state.credentials;
        let row = NewUserRow {
            username: username.into(),
            temporary_email: format!("{username}@example.com"),
            role,
            given_name: format!("Given {username}"),
            family_name: format!("Family {username}"),
            gender: Gender::Female,
            birthday: now - 25 * buddy_db::YEAR_MS,
            password: credentials.hash(PASSWORD).unwrap(),
            email_code: credentials.hash("0123456789abcdef0123456789abcdef").unwrap(),
            email_code_expire: now + 7_200_000,
            created: now,
        };
        self.state.db.create_user(&row).unwrap();
        if verified {
            self.state.db.finalize_email_verification(username).unwrap();
            self.state.db.update_available(username, true).unwrap();
        }
    }

    pub fn active_buddy(&self, username: &str) {
        self.user(username, Role::Buddy, true);
        self.state.db.update_active(username, true).unwrap();
    }

    pub fn comer(&self, username: &str) {
        self.user(username, Role::Comer, true);
    }

    pub fn admin(&self, username: &str) {
        self.user(username, Role::Comer, true);
        self.state.db.update_admin(username, true).unwrap();
    }

    /// A regular token obtained through `GET /auth/token`.
    pub async fn login(&self, username: &str) -> String {
        self.token("/auth/token", username).await
    }

    pub async fn login_admin(&self, username: &str) -> String {
        self.token("/auth/token/admin", username).await
    }

    async fn token(&self, uri: &str, username: &str) -> String {
        let (status, body) = self.send(basic(uri, username, PASSWORD)).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["meta"]["token"].as_str().unwrap().to_string()
    }
}

pub fn basic(uri: &str, username: &str, password: &str) -> Request<Body> {
    let credentials = BASE64.encode(format!("{username}:{password}"));
    Request::get(uri)
        .header(header::AUTHORIZATION, format!("Basic {credentials}"))
        .body(Body::empty())
        .unwrap()
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    request("GET", uri, token, None)
}

pub fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, JSON_API);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn message(receiver: &str, body: &str) -> Value {
    json!({
        "data": {
            "type": "messages",
            "attributes": { "body": body },
            "relationships": {
                "receiver": { "data": { "type": "users", "id": receiver } }
            }
        }
    })
}
