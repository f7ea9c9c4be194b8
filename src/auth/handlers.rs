use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{
            AuthResponse, ChangePasswordRequest, LoginRequest, Message, PublicUser,
            RegisterRequest, UserMessage,
        },
        extractors::AuthUser,
        jwt::JwtKeys,
    },
    error::ApiResult,
    state::AppState,
    users::services,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/password", put(change_password))
        .route("/auth/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<UserMessage>)> {
    let Json(payload) = payload?;
    let user = services::register(&state.db, &payload.username, &payload.password).await?;

    info!(user_id = user.id, username = %user.username, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(UserMessage::new(
            "Registration successful, please wait for admin approval",
            &user,
        )),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<AuthResponse>> {
    let Json(payload) = payload?;
    let user = services::authenticate(&state.db, &payload.username, &payload.password).await?;

    let token = JwtKeys::from_ref(&state).sign(user.id)?;

    info!(user_id = user.id, username = %user.username, "user logged in");
    Ok(Json(AuthResponse {
        token,
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip_all)]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> ApiResult<Json<Message>> {
    let Json(payload) = payload?;
    services::change_password(&state.db, &user, &payload.old_password, &payload.new_password)
        .await?;
    info!(user_id = user.id, "password changed");
    Ok(Json(Message::new("Password changed")))
}

pub async fn get_me(AuthUser(user): AuthUser) -> Json<PublicUser> {
    Json(PublicUser::from(&user))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::{
        state::AppState,
        test_support::{create_user, send},
        users::repo_types::{Role, Status, User},
    };

    #[tokio::test]
    async fn register_returns_sanitized_summary() {
        let state = AppState::fake().await;
        let (status, body) = send(
            &state,
            "POST",
            "/api/v1/auth/register",
            None,
            Some(json!({ "username": "newbie", "password": "longenough" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user"]["username"], "newbie");
        assert_eq!(body["user"]["status"], "inactive");
        assert_eq!(body["user"]["role"], "user");
        assert!(body["user"].get("password_hash").is_none());

        let (status, _) = send(
            &state,
            "POST",
            "/api/v1/auth/register",
            None,
            Some(json!({ "username": "newbie", "password": "another-one" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn register_rejects_malformed_body() {
        let state = AppState::fake().await;
        let (status, body) = send(
            &state,
            "POST",
            "/api/v1/auth/register",
            None,
            Some(json!({ "username": "missing-password" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn login_requires_active_account() {
        let state = AppState::fake().await;
        send(
            &state,
            "POST",
            "/api/v1/auth/register",
            None,
            Some(json!({ "username": "pending", "password": "pending-pw" })),
        )
        .await;
        let creds = json!({ "username": "pending", "password": "pending-pw" });

        let (status, _) = send(&state, "POST", "/api/v1/auth/login", None, Some(creds.clone())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(
            &state,
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({ "username": "pending", "password": "wrong-pw" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let user = User::find_by_username(&state.db, "pending").await.unwrap().unwrap();
        User::set_status(&state.db, user.id, Status::Active).await.unwrap();

        let (status, body) = send(&state, "POST", "/api/v1/auth/login", None, Some(creds)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
        assert_eq!(body["user"]["id"], user.id);
    }

    #[tokio::test]
    async fn token_is_rechecked_against_live_status() {
        let state = AppState::fake().await;
        let (user, token) = create_user(&state, "wanderer", Role::User).await;

        let (status, body) = send(&state, "GET", "/api/v1/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "wanderer");

        User::set_status(&state.db, user.id, Status::Blocked).await.unwrap();
        let (status, _) = send(&state, "GET", "/api/v1/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn protected_routes_reject_missing_or_bad_tokens() {
        let state = AppState::fake().await;
        let (status, _) = send(&state, "GET", "/api/v1/auth/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = send(&state, "GET", "/api/v1/auth/me", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn change_password_checks_old_password() {
        let state = AppState::fake().await;
        let (_, token) = create_user(&state, "rotator", Role::User).await;

        let (status, _) = send(
            &state,
            "PUT",
            "/api/v1/auth/password",
            Some(&token),
            Some(json!({ "old_password": "not-it", "new_password": "fresh-pw" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &state,
            "PUT",
            "/api/v1/auth/password",
            Some(&token),
            Some(json!({ "old_password": "rotator-pw", "new_password": "fresh-pw" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            &state,
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({ "username": "rotator", "password": "fresh-pw" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
}
