use serde::{Deserialize, Serialize};

use crate::users::repo_types::{Role, Status, User};

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

/// `{message, user}` envelope shared by registration and admin actions.
#[derive(Debug, Serialize)]
pub struct UserMessage {
    pub message: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub status: Status,
}

impl From<&User> for PublicUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            username: u.username.clone(),
            role: u.role,
            status: u.status,
        }
    }
}

impl UserMessage {
    pub fn new<T: Into<String>>(message: T, user: &User) -> Self {
        Self {
            message: message.into(),
            user: PublicUser::from(user),
        }
    }
}

impl Message {
    pub fn new<T: Into<String>>(message: T) -> Self {
        Self {
            message: message.into(),
        }
    }
}
