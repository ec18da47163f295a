//! Shared fixture for the HTTP integration tests.
//!
//! Each test gets its own in-memory store, a throwaway upload directory and the full
//! router, driven with `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use std::{collections::HashMap, path::PathBuf};

use axum::{
    Router,
    body::Body,
    http::{Method, Request, Response, StatusCode, header},
};
use bson::Uuid;
use http_body_util::BodyExt;
use serde_json::Value;
use shopdesk::{
    config::Config,
    router::app,
    service::auth::{create_admin, token::Role},
    startup::build_state,
    state::AppState,
};
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-signing-secret-0123456789";

pub struct TestBuilder {
    vars: HashMap<String, String>,
}

impl TestBuilder {
    pub fn new() -> Self {
        let upload_dir = std::env::temp_dir().join(format!("shopdesk-test-{}", Uuid::new()));

        let vars = [
            ("STORE_BACKEND", "memory".to_string()),
            ("JWT_SECRET", TEST_SECRET.to_string()),
            ("BCRYPT_COST", "4".to_string()),
            ("UPLOAD_DIR", upload_dir.display().to_string()),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect();

        Self { vars }
    }

    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_string(), value.to_string());
        self
    }

    pub async fn build(self) -> TestApp {
        let config = Config::from_lookup(|key| self.vars.get(key).cloned()).unwrap();
        let state = build_state(config).await.unwrap();

        TestApp {
            router: app(state.clone()),
            state,
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    /// A valid admin token. The account behind it does not have to exist.
    pub fn admin_token(&self) -> String {
        self.state
            .tokens
            .issue(&Uuid::new(), "root", Role::Admin)
            .unwrap()
    }

    /// Creates a stored administrator and returns a token for it.
    pub async fn admin_account(&self, name: &str, password: &str) -> String {
        let admin = create_admin(&self.state.store, name, password, self.state.config.bcrypt_cost)
            .await
            .unwrap();

        self.state
            .tokens
            .issue(&admin.id, &admin.name, Role::Admin)
            .unwrap()
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.state.config.upload_dir.clone()
    }

    /// Unauthenticated GET returning the raw response, for non-JSON bodies.
    pub async fn fetch(&self, uri: &str) -> Response<Body> {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, body)
    }

    pub async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        };

        self.send(request.unwrap()).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.call(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.call(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.call(Method::DELETE, uri, token, None).await
    }

    /// Posts a `multipart/form-data` body with one part per `(field, filename, bytes)`.
    pub async fn upload(&self, uri: &str, token: &str, parts: &[(&str, &str, &[u8])]) -> (StatusCode, Value) {
        let boundary = "shopdesk-test-boundary";
        let mut body = Vec::new();

        for (field, filename, bytes) in parts {
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n").as_bytes(),
            );
            body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();

        self.send(request).await
    }
}
