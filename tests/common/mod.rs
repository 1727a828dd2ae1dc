//! Shared setup for HTTP-level tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::Router;
use hyper::{Method, Request, StatusCode};
use leadbook::auth::PasswordHasher;
use leadbook::error::{AppError, Result};
use leadbook::notify::{MailSettings, Notification, Notifier};
use leadbook::{api, AppState, Settings};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;

/// Notifier that remembers what it was asked to send
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        self.sent.lock().unwrap().push(notification.clone());
        if self.fail {
            return Err(AppError::Internal("relay unavailable".to_string()));
        }
        Ok(())
    }
}

pub struct TestApp {
    pub app: Router,
    pub notifier: Arc<RecordingNotifier>,
    pub pool: sqlx::SqlitePool,
}

pub async fn setup_app() -> TestApp {
    setup_app_with(RecordingNotifier::default()).await
}

pub async fn setup_app_with(notifier: RecordingNotifier) -> TestApp {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let notifier = Arc::new(notifier);
    let settings = Settings {
        mail: MailSettings {
            from: "test@test.com".to_string(),
            to: vec!["test2@test.com".to_string()],
        },
        // Cheap parameters keep tests fast
        hasher: PasswordHasher::new(8, 1, 1).expect("Invalid test hasher params"),
        session_ttl: chrono::Duration::hours(1),
    };
    let state = AppState::new(pool.clone(), notifier.clone(), settings);

    TestApp {
        app: api::router(state),
        notifier,
        pool,
    }
}

impl TestApp {
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/login",
                None,
                Some(json!({"username": username, "password": password})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["token"].as_str().unwrap().to_string()
    }

    /// Sign up an organisor and return a session token
    pub async fn organisor(&self, username: &str, organisation: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/signup",
                None,
                Some(json!({
                    "username": username,
                    "password1": "correct horse battery",
                    "password2": "correct horse battery",
                    "organisation": organisation,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "signup failed: {}", body);
        self.login(username, "correct horse battery").await
    }

    /// Create an agent under the organisor and return (agent id, agent token)
    pub async fn agent(&self, organisor_token: &str, username: &str) -> (String, String) {
        let (status, body) = self
            .call(
                Method::POST,
                "/agents",
                Some(organisor_token),
                Some(json!({"username": username, "password": "agent password"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "agent creation failed: {}", body);
        let agent_id = body["agent"]["id"].as_str().unwrap().to_string();
        let token = self.login(username, "agent password").await;
        (agent_id, token)
    }

    /// Create a lead and return its id
    pub async fn lead(&self, token: &str, first_name: &str, agent_id: Option<&str>) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/leads",
                Some(token),
                Some(json!({
                    "first_name": first_name,
                    "last_name": "Prospect",
                    "age": 35,
                    "agent_id": agent_id,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "lead creation failed: {}", body);
        body["lead"]["id"].as_str().unwrap().to_string()
    }
}

pub fn lead_names(body: &Value) -> Vec<String> {
    body["leads"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["first_name"].as_str().unwrap().to_string())
        .collect()
}
