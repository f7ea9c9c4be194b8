use anyhow::Context;
use sqlx::{types::Json, QueryBuilder, Sqlite, SqlitePool};
use time::OffsetDateTime;

use super::{
    repo_types::{NewTodo, Todo},
    services::TodoFilter,
};

const TODO_COLUMNS: &str = "id, user_id, title, description, completed, completed_at, \
    is_long_term, is_starred, start_time, end_time, tags, created_at, updated_at";

pub async fn insert(
    db: &SqlitePool,
    user_id: i64,
    todo: &NewTodo,
    now: OffsetDateTime,
) -> anyhow::Result<Todo> {
    let row = sqlx::query_as::<_, Todo>(&format!(
        r#"
        INSERT INTO todos (user_id, title, description, completed, completed_at,
                           is_long_term, is_starred, start_time, end_time, tags,
                           created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
        RETURNING {TODO_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(&todo.title)
    .bind(&todo.description)
    .bind(todo.completed)
    .bind(todo.completed_at)
    .bind(todo.is_long_term)
    .bind(todo.is_starred)
    .bind(todo.start_time)
    .bind(todo.end_time)
    .bind(Json(&todo.tags))
    .bind(now)
    .fetch_one(db)
    .await
    .context("insert todo")?;
    Ok(row)
}

/// The caller's todos matching every set filter, in creation order.
pub async fn list_by_user(
    db: &SqlitePool,
    user_id: i64,
    filter: &TodoFilter,
) -> anyhow::Result<Vec<Todo>> {
    let mut qb =
        QueryBuilder::<Sqlite>::new(format!("SELECT {TODO_COLUMNS} FROM todos WHERE user_id = "));
    qb.push_bind(user_id);

    if let Some(tag) = &filter.tag {
        qb.push(" AND EXISTS (SELECT 1 FROM json_each(todos.tags) WHERE json_each.value = ")
            .push_bind(tag.clone())
            .push(")");
    }
    if let Some(from) = filter.start_from {
        qb.push(" AND start_time >= ").push_bind(from);
    }
    if let Some(until) = filter.end_until {
        qb.push(" AND end_time IS NOT NULL AND end_time <= ").push_bind(until);
    }
    if let Some(is_long_term) = filter.is_long_term {
        qb.push(" AND is_long_term = ").push_bind(is_long_term);
    }
    if let Some(is_starred) = filter.is_starred {
        qb.push(" AND is_starred = ").push_bind(is_starred);
    }
    qb.push(" ORDER BY id ASC");

    let rows = qb
        .build_query_as::<Todo>()
        .fetch_all(db)
        .await
        .context("list todos")?;
    Ok(rows)
}

/// `None` both when the todo is missing and when it belongs to someone else.
pub async fn find_owned(db: &SqlitePool, user_id: i64, id: i64) -> anyhow::Result<Option<Todo>> {
    let row = sqlx::query_as::<_, Todo>(&format!(
        "SELECT {TODO_COLUMNS} FROM todos WHERE id = $1 AND user_id = $2"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await
    .context("find todo")?;
    Ok(row)
}

pub async fn save(db: &SqlitePool, todo: &Todo) -> anyhow::Result<Option<Todo>> {
    let row = sqlx::query_as::<_, Todo>(&format!(
        r#"
        UPDATE todos
           SET title = $1, description = $2, completed = $3, completed_at = $4,
               is_long_term = $5, is_starred = $6, start_time = $7, end_time = $8,
               tags = $9, updated_at = $10
         WHERE id = $11 AND user_id = $12
        RETURNING {TODO_COLUMNS}
        "#
    ))
    .bind(&todo.title)
    .bind(&todo.description)
    .bind(todo.completed)
    .bind(todo.completed_at)
    .bind(todo.is_long_term)
    .bind(todo.is_starred)
    .bind(todo.start_time)
    .bind(todo.end_time)
    .bind(&todo.tags)
    .bind(todo.updated_at)
    .bind(todo.id)
    .bind(todo.user_id)
    .fetch_optional(db)
    .await
    .context("update todo")?;
    Ok(row)
}

pub async fn delete_owned(db: &SqlitePool, user_id: i64, id: i64) -> anyhow::Result<bool> {
    let affected = sqlx::query("DELETE FROM todos WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await
        .context("delete todo")?
        .rows_affected();
    Ok(affected > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        state::AppState,
        timefmt,
        todos::{dto::CreateTodoRequest, services::build_new_todo},
        users::repo_types::{Role, Status, User},
    };
    use time::macros::datetime;

    async fn owner(state: &AppState, name: &str) -> i64 {
        User::create(&state.db, name, "h", Role::User, Status::Active)
            .await
            .unwrap()
            .id
    }

    async fn add(state: &AppState, user_id: i64, json: &str) -> Todo {
        let req: CreateTodoRequest = serde_json::from_str(json).unwrap();
        let now = timefmt::now();
        let new = build_new_todo(req, now).unwrap();
        insert(&state.db, user_id, &new, now).await.unwrap()
    }

    #[tokio::test]
    async fn insert_round_trips_fields() {
        let state = AppState::fake().await;
        let uid = owner(&state, "ann").await;
        let todo = add(
            &state,
            uid,
            r#"{"title":"t","tags":["a","b"],"start_time":"2024-02-01 10:00:00","is_long_term":true}"#,
        )
        .await;
        assert_eq!(todo.user_id, uid);
        assert_eq!(todo.tags.0, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(todo.start_time, datetime!(2024-02-01 10:00:00 UTC));
        assert_eq!(todo.end_time, None);
        assert!(todo.is_long_term);
    }

    #[tokio::test]
    async fn list_applies_filters_and_ownership() {
        let state = AppState::fake().await;
        let ann = owner(&state, "ann").await;
        let ben = owner(&state, "ben").await;

        add(&state, ann, r#"{"title":"work early","tags":["work"],"start_time":"2024-01-01 08:00:00"}"#).await;
        add(&state, ann, r#"{"title":"work late","tags":["work","urgent"],"start_time":"2024-03-01 08:00:00","is_starred":true}"#).await;
        add(&state, ann, r#"{"title":"hobby","tags":["fun"],"is_long_term":true}"#).await;
        add(&state, ben, r#"{"title":"ben work","tags":["work"]}"#).await;

        let all = list_by_user(&state.db, ann, &TodoFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);

        let work = TodoFilter {
            tag: Some("work".into()),
            ..Default::default()
        };
        assert_eq!(list_by_user(&state.db, ann, &work).await.unwrap().len(), 2);

        let recent_work = TodoFilter {
            start_from: Some(datetime!(2024-02-01 00:00:00 UTC)),
            ..work.clone()
        };
        let rows = list_by_user(&state.db, ann, &recent_work).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "work late");

        let early_end = TodoFilter {
            end_until: Some(datetime!(2024-01-05 00:00:00 UTC)),
            ..Default::default()
        };
        let rows = list_by_user(&state.db, ann, &early_end).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "work early");

        let starred = TodoFilter {
            is_starred: Some(true),
            ..Default::default()
        };
        let rows = list_by_user(&state.db, ann, &starred).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "work late");

        let long_term = TodoFilter {
            is_long_term: Some(true),
            ..Default::default()
        };
        let rows = list_by_user(&state.db, ann, &long_term).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "hobby");
    }

    #[tokio::test]
    async fn other_users_todos_are_invisible() {
        let state = AppState::fake().await;
        let ann = owner(&state, "ann").await;
        let ben = owner(&state, "ben").await;
        let todo = add(&state, ann, r#"{"title":"private"}"#).await;

        assert!(find_owned(&state.db, ben, todo.id).await.unwrap().is_none());
        assert!(!delete_owned(&state.db, ben, todo.id).await.unwrap());
        assert!(find_owned(&state.db, ann, todo.id).await.unwrap().is_some());
        assert!(delete_owned(&state.db, ann, todo.id).await.unwrap());
        assert!(find_owned(&state.db, ann, todo.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_persists_changes() {
        let state = AppState::fake().await;
        let ann = owner(&state, "ann").await;
        let mut todo = add(&state, ann, r#"{"title":"draft"}"#).await;
        todo.title = "final".into();
        todo.tags = Json(vec!["x".into()]);
        let saved = save(&state.db, &todo).await.unwrap().unwrap();
        assert_eq!(saved.title, "final");
        assert_eq!(saved.tags.0, vec!["x".to_string()]);
    }
}
