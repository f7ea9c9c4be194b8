use anyhow::Context;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::timefmt;
use crate::users::repo_types::{Role, Status, User};

const USER_COLUMNS: &str = "id, username, password_hash, role, status, created_at, updated_at";

impl User {
    /// Find a user by username.
    pub async fn find_by_username(db: &SqlitePool, username: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &SqlitePool, id: i64) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new user with an already hashed password.
    pub async fn create(
        db: &SqlitePool,
        username: &str,
        password_hash: &str,
        role: Role,
        status: Status,
    ) -> anyhow::Result<User> {
        let now = timefmt::now();
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, password_hash, role, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(username)
        .bind(password_hash)
        .bind(role)
        .bind(status)
        .bind(now)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Users matching the optional filters, oldest first.
    pub async fn list(
        db: &SqlitePool,
        status: Option<Status>,
        role: Option<Role>,
    ) -> anyhow::Result<Vec<User>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {USER_COLUMNS} FROM users WHERE 1 = 1"));
        if let Some(status) = status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(role) = role {
            qb.push(" AND role = ").push_bind(role);
        }
        qb.push(" ORDER BY id ASC");

        let users = qb
            .build_query_as::<User>()
            .fetch_all(db)
            .await
            .context("list users")?;
        Ok(users)
    }

    pub async fn count_admins(db: &SqlitePool) -> anyhow::Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = $1")
            .bind(Role::Admin)
            .fetch_one(db)
            .await?;
        Ok(count)
    }

    pub async fn set_status(db: &SqlitePool, id: i64, status: Status) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET status = $1, updated_at = $2 WHERE id = $3 RETURNING {USER_COLUMNS}"
        ))
        .bind(status)
        .bind(timefmt::now())
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn set_role(db: &SqlitePool, id: i64, role: Role) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET role = $1, updated_at = $2 WHERE id = $3 RETURNING {USER_COLUMNS}"
        ))
        .bind(role)
        .bind(timefmt::now())
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn set_password_hash(
        db: &SqlitePool,
        id: i64,
        password_hash: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET password_hash = $1, updated_at = $2 WHERE id = $3 RETURNING {USER_COLUMNS}"
        ))
        .bind(password_hash)
        .bind(timefmt::now())
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Delete the user's todos and then the user in one transaction.
    /// Returns `false` when no such user existed.
    pub async fn delete_with_todos(db: &SqlitePool, id: i64) -> anyhow::Result<bool> {
        let mut tx = db.begin().await.context("begin tx")?;

        sqlx::query("DELETE FROM todos WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("delete user todos")?;

        let removed = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("delete user")?
            .rows_affected();

        tx.commit().await.context("commit tx")?;
        Ok(removed > 0)
    }
}

/// True when `err` wraps a unique-constraint violation from the database.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<sqlx::Error>(),
        Some(sqlx::Error::Database(db)) if db.is_unique_violation()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;

    #[tokio::test]
    async fn create_and_find_user() {
        let state = AppState::fake().await;
        let created = User::create(&state.db, "bob", "hash", Role::User, Status::Inactive)
            .await
            .unwrap();
        assert_eq!(created.username, "bob");
        assert_eq!(created.status, Status::Inactive);

        let by_name = User::find_by_username(&state.db, "bob").await.unwrap().unwrap();
        assert_eq!(by_name.id, created.id);
        let by_id = User::find_by_id(&state.db, created.id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "bob");
        assert!(User::find_by_username(&state.db, "nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_username_is_unique_violation() {
        let state = AppState::fake().await;
        User::create(&state.db, "dup", "h", Role::User, Status::Inactive)
            .await
            .unwrap();
        let err = User::create(&state.db, "dup", "h", Role::User, Status::Inactive)
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn list_filters_by_status_and_role() {
        let state = AppState::fake().await;
        User::create(&state.db, "root", "h", Role::Admin, Status::Active).await.unwrap();
        User::create(&state.db, "u1", "h", Role::User, Status::Active).await.unwrap();
        User::create(&state.db, "u2", "h", Role::User, Status::Inactive).await.unwrap();

        assert_eq!(User::list(&state.db, None, None).await.unwrap().len(), 3);
        let active_users = User::list(&state.db, Some(Status::Active), Some(Role::User))
            .await
            .unwrap();
        assert_eq!(active_users.len(), 1);
        assert_eq!(active_users[0].username, "u1");
        assert_eq!(User::count_admins(&state.db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn setters_return_none_for_missing_user() {
        let state = AppState::fake().await;
        assert!(User::set_status(&state.db, 999, Status::Active).await.unwrap().is_none());
        assert!(User::set_role(&state.db, 999, Role::Admin).await.unwrap().is_none());
        assert!(!User::delete_with_todos(&state.db, 999).await.unwrap());
    }
}
