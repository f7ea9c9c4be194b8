//! Helpers for driving the full router in tests.

use axum::{
    body::Body,
    extract::FromRef,
    http::{header, Request, StatusCode},
};
use serde_json::Value;
use tower::ServiceExt;

use crate::{
    app::build_app,
    auth::{jwt::JwtKeys, password::hash_password},
    state::AppState,
    users::repo_types::{Role, Status, User},
};

/// Sends one request through the app and returns status plus JSON body
/// (`Value::Null` when the body is empty or not JSON).
pub async fn send(
    state: &AppState,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(json) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => req.body(Body::empty()),
    }
    .unwrap();

    let res = build_app(state.clone()).oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Active account with password `<username>-pw` and a valid token.
pub async fn create_user(state: &AppState, username: &str, role: Role) -> (User, String) {
    let hash = hash_password(&format!("{username}-pw")).unwrap();
    let user = User::create(&state.db, username, &hash, role, Status::Active)
        .await
        .unwrap();
    let token = JwtKeys::from_ref(state).sign(user.id).unwrap();
    (user, token)
}
