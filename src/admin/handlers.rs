use std::str::FromStr;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, State,
    },
    routing::{delete, get, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::dto::{ListUsersQuery, ListUsersResponse, SetPasswordRequest, SetRoleRequest};
use crate::{
    auth::{dto::UserMessage, extractors::AdminUser},
    error::{ApiError, ApiResult},
    state::AppState,
    users::{
        repo_types::{Role, Status, User},
        services,
    },
};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/users/:id", delete(delete_user))
        .route("/admin/users/:id/activate", post(activate_user))
        .route("/admin/users/:id/block", post(block_user))
        .route("/admin/users/:id/role", put(set_role))
        .route("/admin/users/:id/password", put(set_password))
}

fn parse_filter<T: FromStr<Err = String>>(raw: Option<String>) -> ApiResult<Option<T>> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => v.parse().map(Some).map_err(ApiError::validation),
    }
}

fn user_not_found() -> ApiError {
    ApiError::not_found("User not found")
}

#[instrument(skip(state, admin), fields(admin_id = admin.id))]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Query(q): Query<ListUsersQuery>,
) -> ApiResult<Json<ListUsersResponse>> {
    let status = parse_filter::<Status>(q.status)?;
    let role = parse_filter::<Role>(q.role)?;
    let users = User::list(&state.db, status, role).await?;
    Ok(Json(ListUsersResponse {
        total: users.len(),
        users,
    }))
}

#[instrument(skip(state, admin), fields(admin_id = admin.id))]
pub async fn activate_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<UserMessage>> {
    let Path(id) = path?;
    let user = User::set_status(&state.db, id, Status::Active)
        .await?
        .ok_or_else(user_not_found)?;
    info!(user_id = user.id, "user activated");
    Ok(Json(UserMessage::new("User activated", &user)))
}

#[instrument(skip(state, admin), fields(admin_id = admin.id))]
pub async fn block_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<UserMessage>> {
    let Path(id) = path?;
    let target = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(user_not_found)?;
    if target.is_admin() {
        warn!(user_id = target.id, "refused to block admin account");
        return Err(ApiError::forbidden("Admin accounts cannot be blocked"));
    }

    let user = User::set_status(&state.db, id, Status::Blocked)
        .await?
        .ok_or_else(user_not_found)?;
    info!(user_id = user.id, "user blocked");
    Ok(Json(UserMessage::new("User blocked", &user)))
}

#[instrument(skip(state, admin, payload), fields(admin_id = admin.id))]
pub async fn set_role(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<SetRoleRequest>, JsonRejection>,
) -> ApiResult<Json<UserMessage>> {
    let Path(id) = path?;
    let Json(payload) = payload?;
    let role = Role::from_str(payload.role.trim()).map_err(ApiError::validation)?;
    let user = User::set_role(&state.db, id, role)
        .await?
        .ok_or_else(user_not_found)?;
    info!(user_id = user.id, role = %role, "user role updated");
    Ok(Json(UserMessage::new("User role updated", &user)))
}

#[instrument(skip(state, admin, payload), fields(admin_id = admin.id))]
pub async fn set_password(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<SetPasswordRequest>, JsonRejection>,
) -> ApiResult<Json<UserMessage>> {
    let Path(id) = path?;
    let Json(payload) = payload?;
    let user = services::set_password(&state.db, id, &payload.password)
        .await?
        .ok_or_else(user_not_found)?;
    info!(user_id = user.id, "user password reset by admin");
    Ok(Json(UserMessage::new("Password updated", &user)))
}

#[instrument(skip(state, admin), fields(admin_id = admin.id))]
pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<UserMessage>> {
    let Path(id) = path?;
    let target = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(user_not_found)?;
    if target.id == admin.id {
        return Err(ApiError::forbidden("You cannot delete your own account"));
    }

    if !User::delete_with_todos(&state.db, target.id).await? {
        return Err(user_not_found());
    }
    info!(user_id = target.id, "user deleted with todos");
    Ok(Json(UserMessage::new("User deleted", &target)))
}
