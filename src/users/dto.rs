use serde::{Deserialize, Serialize};

use super::repo::UserRow;
use crate::auth::dto::PublicProfile;
use crate::auth::repo_types::Role;

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub q: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::Customer
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct UserView {
    #[serde(flatten)]
    pub profile: PublicProfile,
    pub order_count: i64,
}

impl From<UserRow> for UserView {
    fn from(row: UserRow) -> Self {
        Self {
            profile: row.profile.into(),
            order_count: row.order_count,
        }
    }
}
