use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub create_new: bool,
    pub transaction_in: bool,
    pub transaction_out: bool,
    pub view: bool,
}

impl Permissions {
    pub fn all() -> Self {
        Self {
            create_new: true,
            transaction_in: true,
            transaction_out: true,
            view: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub permissions: Permissions,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub permissions: Permissions,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(rename = "permission_createNew")]
    pub create_new: bool,
    #[serde(rename = "permission_transactionIn")]
    pub transaction_in: bool,
    #[serde(rename = "permission_transactionOut")]
    pub transaction_out: bool,
    #[serde(rename = "permission_view")]
    pub view: bool,
}

impl From<&User> for LoginResponse {
    fn from(user: &User) -> Self {
        Self {
            success: true,
            create_new: user.permissions.create_new,
            transaction_in: user.permissions.transaction_in,
            transaction_out: user.permissions.transaction_out,
            view: user.permissions.view,
        }
    }
}
