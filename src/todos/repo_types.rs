use serde::Serialize;
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;

/// Todo record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Todo {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub completed: bool,
    #[serde(with = "crate::timefmt::option")]
    pub completed_at: Option<OffsetDateTime>,
    pub is_long_term: bool,
    pub is_starred: bool,
    #[serde(with = "crate::timefmt")]
    pub start_time: OffsetDateTime,
    #[serde(with = "crate::timefmt::option")]
    pub end_time: Option<OffsetDateTime>, // NULL only for long-term todos
    pub tags: Json<Vec<String>>,
    #[serde(with = "crate::timefmt")]
    pub created_at: OffsetDateTime,
    #[serde(with = "crate::timefmt")]
    pub updated_at: OffsetDateTime,
}

/// A normalized todo ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTodo {
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub completed_at: Option<OffsetDateTime>,
    pub is_long_term: bool,
    pub is_starred: bool,
    pub start_time: OffsetDateTime,
    pub end_time: Option<OffsetDateTime>,
    pub tags: Vec<String>,
}
