//! Field derivation for todos: default start/end times, completion stamps
//! and list filters. Pure functions over an injected `now`.

use sqlx::types::Json;
use time::{Duration, OffsetDateTime};

use super::{
    dto::{CreateTodoRequest, ListTodosQuery, UpdateTodoRequest},
    repo_types::{NewTodo, Todo},
};
use crate::{
    error::{ApiError, ApiResult},
    timefmt,
};

/// Span given to a non-long-term todo that has no explicit end time.
pub const DEFAULT_SPAN: Duration = Duration::hours(24);

/// Parsed `GET /todos` filters. `None` means "don't filter".
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TodoFilter {
    pub tag: Option<String>,
    pub start_from: Option<OffsetDateTime>,
    pub end_until: Option<OffsetDateTime>,
    pub is_long_term: Option<bool>,
    pub is_starred: Option<bool>,
}

impl From<ListTodosQuery> for TodoFilter {
    /// Unparseable times are ignored rather than rejected.
    fn from(q: ListTodosQuery) -> Self {
        let time = |raw: Option<String>| raw.and_then(|s| timefmt::parse(&s).ok());
        Self {
            tag: q
                .tag
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            start_from: time(q.start_time),
            end_until: time(q.end_time),
            is_long_term: parse_flag(q.is_long_term),
            is_starred: parse_flag(q.is_starred),
        }
    }
}

fn parse_flag(raw: Option<String>) -> Option<bool> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(v) => Some(v.eq_ignore_ascii_case("true") || v == "1"),
    }
}

fn validate_title(title: &str) -> ApiResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ApiError::validation("Title must not be empty"));
    }
    Ok(title.to_string())
}

/// Trimmed, non-empty, first occurrence wins.
fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

/// Long-term todos may stay open-ended; everything else ends a day after it starts.
fn resolve_end_time(
    is_long_term: bool,
    start_time: OffsetDateTime,
    end_time: Option<OffsetDateTime>,
) -> Option<OffsetDateTime> {
    match end_time {
        Some(t) => Some(t),
        None if is_long_term => None,
        None => Some(start_time + DEFAULT_SPAN),
    }
}

fn check_window(start_time: OffsetDateTime, end_time: Option<OffsetDateTime>) -> ApiResult<()> {
    match end_time {
        Some(end) if end < start_time => Err(ApiError::validation(
            "End time must not be earlier than start time",
        )),
        _ => Ok(()),
    }
}

/// Stamped once on the first save with `completed`, cleared whenever it is unset.
pub fn stamp_completion(
    completed: bool,
    completed_at: Option<OffsetDateTime>,
    now: OffsetDateTime,
) -> Option<OffsetDateTime> {
    if completed {
        completed_at.or(Some(now))
    } else {
        None
    }
}

pub fn build_new_todo(req: CreateTodoRequest, now: OffsetDateTime) -> ApiResult<NewTodo> {
    let title = validate_title(&req.title)?;
    let is_long_term = req.is_long_term.unwrap_or(false);
    let start_time = req.start_time.map(timefmt::truncate).unwrap_or(now);
    let end_time = resolve_end_time(is_long_term, start_time, req.end_time.map(timefmt::truncate));
    check_window(start_time, end_time)?;
    let completed = req.completed.unwrap_or(false);

    Ok(NewTodo {
        title,
        description: req.description.unwrap_or_default(),
        completed,
        completed_at: stamp_completion(completed, None, now),
        is_long_term,
        is_starred: req.is_starred.unwrap_or(false),
        start_time,
        end_time,
        tags: normalize_tags(req.tags.unwrap_or_default()),
    })
}

/// Applies only the fields present in `req`, then re-derives end time and
/// completion stamp.
pub fn apply_update(todo: &mut Todo, req: UpdateTodoRequest, now: OffsetDateTime) -> ApiResult<()> {
    if let Some(title) = req.title {
        todo.title = validate_title(&title)?;
    }
    if let Some(description) = req.description {
        todo.description = description;
    }
    if let Some(completed) = req.completed {
        todo.completed = completed;
    }
    if let Some(is_long_term) = req.is_long_term {
        todo.is_long_term = is_long_term;
    }
    if let Some(is_starred) = req.is_starred {
        todo.is_starred = is_starred;
    }
    if let Some(start_time) = req.start_time {
        todo.start_time = timefmt::truncate(start_time);
    }
    if let Some(tags) = req.tags {
        todo.tags = Json(normalize_tags(tags));
    }

    let end_time = match req.end_time {
        Some(explicit) => explicit.map(timefmt::truncate),
        None => todo.end_time,
    };
    todo.end_time = resolve_end_time(todo.is_long_term, todo.start_time, end_time);
    check_window(todo.start_time, todo.end_time)?;
    todo.completed_at = stamp_completion(todo.completed, todo.completed_at, now);
    todo.updated_at = now;
    Ok(())
}
