use lazy_static::lazy_static;
use regex::Regex;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::{
    auth::password::{hash_password, verify_password},
    config::AdminSeed,
    error::{ApiError, ApiResult},
    users::{
        repo::is_unique_violation,
        repo_types::{Role, Status, User},
    },
};

pub const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex =
            Regex::new(r"^[A-Za-z0-9_.\-]{3,30}$").expect("username pattern compiles");
    }
    USERNAME_RE.is_match(username)
}

pub(crate) fn validate_password(password: &str) -> ApiResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// New accounts start as an inactive plain user awaiting admin approval.
pub async fn register(db: &SqlitePool, username: &str, password: &str) -> ApiResult<User> {
    let username = username.trim();
    if !is_valid_username(username) {
        return Err(ApiError::validation(
            "Username must be 3-30 characters of letters, digits, '_', '.' or '-'",
        ));
    }
    validate_password(password)?;

    if User::find_by_username(db, username).await?.is_some() {
        warn!(username, "username already registered");
        return Err(ApiError::validation("Username already exists"));
    }

    let hash = hash_password(password)?;
    match User::create(db, username, &hash, Role::User, Status::Inactive).await {
        Ok(user) => Ok(user),
        Err(e) if is_unique_violation(&e) => Err(ApiError::validation("Username already exists")),
        Err(e) => Err(e.into()),
    }
}

/// Unknown user and wrong password fail identically; account status is only
/// revealed after the credentials match.
pub async fn authenticate(db: &SqlitePool, username: &str, password: &str) -> ApiResult<User> {
    let invalid = || ApiError::unauthorized("Invalid username or password");

    let Some(user) = User::find_by_username(db, username.trim()).await? else {
        warn!(username, "login unknown username");
        return Err(invalid());
    };

    if !verify_password(password, &user.password_hash).unwrap_or(false) {
        warn!(user_id = user.id, "login invalid password");
        return Err(invalid());
    }

    match user.status {
        Status::Active => Ok(user),
        Status::Inactive => Err(ApiError::forbidden(
            "Account is not activated yet, please wait for admin approval",
        )),
        Status::Blocked => Err(ApiError::forbidden(
            "Account has been blocked, please contact an admin",
        )),
    }
}

pub async fn change_password(
    db: &SqlitePool,
    user: &User,
    old_password: &str,
    new_password: &str,
) -> ApiResult<()> {
    if !verify_password(old_password, &user.password_hash).unwrap_or(false) {
        return Err(ApiError::validation("Old password is incorrect"));
    }
    set_password(db, user.id, new_password).await.map(|_| ())
}

/// Hash and store a new password; `None` when the user does not exist.
pub async fn set_password(db: &SqlitePool, id: i64, new_password: &str) -> ApiResult<Option<User>> {
    validate_password(new_password)?;
    let hash = hash_password(new_password)?;
    Ok(User::set_password_hash(db, id, &hash).await?)
}

/// Creates the configured admin account when no admin exists yet.
pub async fn seed_admin(db: &SqlitePool, seed: Option<&AdminSeed>) -> anyhow::Result<()> {
    if User::count_admins(db).await? > 0 {
        return Ok(());
    }
    let Some(seed) = seed else {
        warn!("no admin account exists and ADMIN_PASSWORD is unset; skipping admin seeding");
        return Ok(());
    };
    if let Some(existing) = User::find_by_username(db, &seed.username).await? {
        warn!(
            user_id = existing.id,
            username = %existing.username,
            "ADMIN_USERNAME is taken by a non-admin account; skipping admin seeding"
        );
        return Ok(());
    }
    let hash = hash_password(&seed.password)?;
    let admin = User::create(db, &seed.username, &hash, Role::Admin, Status::Active).await?;
    info!(user_id = admin.id, username = %admin.username, "default admin created");
    Ok(())
}
