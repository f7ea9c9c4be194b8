use serde::{Deserialize, Deserializer};
use time::OffsetDateTime;

#[derive(Debug, Deserialize)]
pub struct CreateTodoRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub is_long_term: Option<bool>,
    #[serde(default)]
    pub is_starred: Option<bool>,
    #[serde(default, with = "crate::timefmt::option")]
    pub start_time: Option<OffsetDateTime>,
    #[serde(default, with = "crate::timefmt::option")]
    pub end_time: Option<OffsetDateTime>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Partial update: `None` leaves the field untouched.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTodoRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub is_long_term: Option<bool>,
    #[serde(default)]
    pub is_starred: Option<bool>,
    #[serde(default, with = "crate::timefmt::option")]
    pub start_time: Option<OffsetDateTime>,
    #[serde(default, deserialize_with = "crate::timefmt::present::deserialize")]
    pub end_time: Option<Option<OffsetDateTime>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Raw `GET /todos` query; see `services::TodoFilter` for the parsed form.
#[derive(Debug, Default, Deserialize)]
pub struct ListTodosQuery {
    pub tag: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub is_long_term: Option<String>,
    pub is_starred: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BoolOrInt {
    Bool(bool),
    Int(i64),
}

/// Accepts `true`/`false` as well as `1`/`0`.
fn flexible_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    Ok(Option::<BoolOrInt>::deserialize(d)?.map(|v| match v {
        BoolOrInt::Bool(b) => b,
        BoolOrInt::Int(n) => n != 0,
    }))
}
