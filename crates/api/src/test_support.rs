//! Router harness for handler tests.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header::AUTHORIZATION, header::CONTENT_TYPE},
};
use http_body_util::BodyExt;
use ledgerline_db::LedgerRepository;
use ledgerline_shared::types::EmployeeId;
use ledgerline_shared::{JwtConfig, JwtService, LedgerConfig};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use crate::{AppState, create_router};

/// Role of a regular caller.
pub(crate) const USER: &str = "employee";

const ADMIN: &str = "admin";

pub(crate) struct TestApp {
    router: Router,
    jwt_service: Arc<JwtService>,
}

impl TestApp {
    pub(crate) fn new() -> Self {
        let jwt_service = Arc::new(JwtService::new(JwtConfig::default()));
        let state = AppState {
            repository: Arc::new(LedgerRepository::with_system_clock(LedgerConfig::default())),
            jwt_service: Arc::clone(&jwt_service),
            ledger_config: LedgerConfig::default(),
        };
        Self {
            router: create_router(state),
            jwt_service,
        }
    }

    fn token(&self, role: &str) -> String {
        self.jwt_service
            .generate_access_token(Uuid::new_v4(), role)
            .unwrap()
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn build(method: &str, uri: &str, token: Option<String>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    pub(crate) async fn request_without_token(&self, method: &str, uri: &str) -> (StatusCode, Value) {
        self.send(Self::build(method, uri, None, None)).await
    }

    pub(crate) async fn get(&self, role: &str, uri: &str) -> (StatusCode, Value) {
        self.send(Self::build("GET", uri, Some(self.token(role)), None))
            .await
    }

    pub(crate) async fn get_as_admin(&self, uri: &str) -> (StatusCode, Value) {
        self.get(ADMIN, uri).await
    }

    pub(crate) async fn post(&self, role: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        let body = (!body.is_null()).then_some(body);
        self.send(Self::build("POST", uri, Some(self.token(role)), body))
            .await
    }

    pub(crate) async fn post_as_admin(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.post(ADMIN, uri, body).await
    }

    pub(crate) async fn open(&self, employee: EmployeeId) {
        let (status, _) = self
            .post(USER, "/ledger/employees", json!({ "employee_id": employee }))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }
}
