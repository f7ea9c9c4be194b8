use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{debug, info, instrument};

use super::{
    dto::{CreateTodoRequest, ListTodosQuery, UpdateTodoRequest},
    repo,
    repo_types::Todo,
    services::{apply_update, build_new_todo, TodoFilter},
};
use crate::{
    auth::{dto::Message, extractors::AuthUser},
    error::{ApiError, ApiResult},
    state::AppState,
    timefmt,
};

pub fn todo_routes() -> Router<AppState> {
    Router::new()
        .route("/todos", get(list_todos).post(create_todo))
        .route("/todos/:id", get(get_todo).put(update_todo).delete(delete_todo))
}

fn todo_not_found() -> ApiError {
    ApiError::not_found("Todo not found")
}

#[instrument(skip(state, user, payload), fields(user_id = user.id))]
pub async fn create_todo(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<CreateTodoRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Todo>)> {
    let Json(payload) = payload?;
    let now = timefmt::now();
    let new = build_new_todo(payload, now)?;
    let todo = repo::insert(&state.db, user.id, &new, now).await?;
    info!(todo_id = todo.id, "todo created");
    Ok((StatusCode::CREATED, Json(todo)))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn list_todos(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(q): Query<ListTodosQuery>,
) -> ApiResult<Json<Vec<Todo>>> {
    let filter = TodoFilter::from(q);
    let todos = repo::list_by_user(&state.db, user.id, &filter).await?;
    debug!(count = todos.len(), "todos listed");
    Ok(Json(todos))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn get_todo(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Todo>> {
    let Path(id) = path?;
    let todo = repo::find_owned(&state.db, user.id, id)
        .await?
        .ok_or_else(todo_not_found)?;
    Ok(Json(todo))
}

#[instrument(skip(state, user, payload), fields(user_id = user.id))]
pub async fn update_todo(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateTodoRequest>, JsonRejection>,
) -> ApiResult<Json<Todo>> {
    let Path(id) = path?;
    let mut todo = repo::find_owned(&state.db, user.id, id)
        .await?
        .ok_or_else(todo_not_found)?;
    let Json(payload) = payload?;

    apply_update(&mut todo, payload, timefmt::now())?;
    let todo = repo::save(&state.db, &todo)
        .await?
        .ok_or_else(todo_not_found)?;
    info!(todo_id = todo.id, "todo updated");
    Ok(Json(todo))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn delete_todo(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Message>> {
    let Path(id) = path?;
    if !repo::delete_owned(&state.db, user.id, id).await? {
        return Err(todo_not_found());
    }
    info!(todo_id = id, "todo deleted");
    Ok(Json(Message::new("Todo deleted")))
}
