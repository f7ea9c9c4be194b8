use serde::{Deserialize, Serialize};

use crate::users::repo_types::User;

/// `GET /admin/users` filters; empty values are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    pub status: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListUsersResponse {
    pub total: usize,
    pub users: Vec<User>,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct SetPasswordRequest {
    pub password: String,
}
