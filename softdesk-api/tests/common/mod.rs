//! Common test utilities for integration tests
//!
//! This module provides shared infrastructure for integration tests:
//! - An application backed by a fresh in-memory store
//! - User registration and token acquisition through the API
//! - Request helpers returning status and JSON body

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use softdesk_api::app::{build_router, AppState};
use softdesk_api::config::Config;
use softdesk_shared::store::memory::MemoryStore;
use std::sync::Arc;
use tower::Service as _;
use uuid::Uuid;

pub const PASSWORD: &str = "correct horse battery";
pub const JWT_SECRET: &str = "test-secret-key-at-least-32-bytes-long";

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: MemoryStore,
    pub app: axum::Router,
    pub config: Config,
}

/// Response status with parsed JSON body (`Null` when empty)
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

/// A registered user with a valid access token
pub struct TestUser {
    pub id: Uuid,
    pub access: String,
    pub refresh: String,
}

impl TestUser {
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access)
    }
}

impl TestContext {
    /// Creates a new test context with an empty store
    pub fn new() -> Self {
        let config = Config::from_lookup(|key| match key {
            "STORAGE_BACKEND" => Some("memory".to_string()),
            "JWT_SECRET" => Some(JWT_SECRET.to_string()),
            _ => None,
        })
        .expect("test configuration should load");

        let store = MemoryStore::new();
        let app = build_router(AppState::new(Arc::new(store.clone()), config.clone()));

        Self { store, app, config }
    }

    /// Sends a request, optionally authenticated and with a JSON body
    pub async fn send(&self, method: &str, uri: &str, auth: Option<&str>, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            builder = builder.header("authorization", auth);
        }

        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.app.clone().call(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };

        TestResponse { status, headers, body }
    }

    pub async fn get(&self, uri: &str, user: &TestUser) -> TestResponse {
        self.send("GET", uri, Some(&user.bearer()), None).await
    }

    pub async fn post(&self, uri: &str, user: &TestUser, body: Value) -> TestResponse {
        self.send("POST", uri, Some(&user.bearer()), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, user: &TestUser, body: Value) -> TestResponse {
        self.send("PATCH", uri, Some(&user.bearer()), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, user: &TestUser) -> TestResponse {
        self.send("DELETE", uri, Some(&user.bearer()), None).await
    }

    /// Registers `username` and logs in
    pub async fn user(&self, username: &str) -> TestUser {
        let registered = self
            .send(
                "POST",
                "/api/user/",
                None,
                Some(json!({
                    "username": username,
                    "password": PASSWORD,
                    "email": format!("{}@example.com", username),
                    "age": 30,
                })),
            )
            .await;
        assert_eq!(registered.status, StatusCode::CREATED, "register {}: {}", username, registered.body);

        let id = registered.body["id"].as_str().unwrap().parse().unwrap();

        let tokens = self
            .send(
                "POST",
                "/api/token/",
                None,
                Some(json!({ "username": username, "password": PASSWORD })),
            )
            .await;
        assert_eq!(tokens.status, StatusCode::OK, "token {}: {}", username, tokens.body);

        TestUser {
            id,
            access: tokens.body["access"].as_str().unwrap().to_string(),
            refresh: tokens.body["refresh"].as_str().unwrap().to_string(),
        }
    }

    /// Creates a project and returns its id
    pub async fn project(&self, author: &TestUser, title: &str) -> String {
        let response = self.post("/api/projects/", author, json!({ "title": title })).await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["id"].as_str().unwrap().to_string()
    }

    /// Creates an issue and returns its id
    pub async fn issue(&self, author: &TestUser, project_id: &str, title: &str) -> String {
        let response = self
            .post(
                &format!("/api/projects/{}/issues/", project_id),
                author,
                json!({ "title": title, "tag": "BUG" }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["id"].as_str().unwrap().to_string()
    }
}
