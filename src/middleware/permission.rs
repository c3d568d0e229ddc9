use axum::http::{header, HeaderMap};
use log::debug;
use serde::Serialize;
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::{
    error::{InventoryError, InventoryResult},
    models::Permissions,
    utils::verify_token,
    AppState,
};

pub const AUTH_COOKIE: &str = "auth_token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    CreateNew,
    TransactionIn,
    TransactionOut,
    View,
}

impl Permission {
    pub fn label(&self) -> &'static str {
        match self {
            Self::CreateNew => "createNew",
            Self::TransactionIn => "transactionIn",
            Self::TransactionOut => "transactionOut",
            Self::View => "view",
        }
    }

    pub fn granted_by(&self, permissions: &Permissions) -> bool {
        match self {
            Self::CreateNew => permissions.create_new,
            Self::TransactionIn => permissions.transaction_in,
            Self::TransactionOut => permissions.transaction_out,
            Self::View => permissions.view,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
    pub permissions: Permissions,
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value.strip_prefix("Bearer ").map(|t| t.trim().to_string())
}

/// Resolves the caller from the `auth_token` cookie or a bearer token.
/// `None` means no valid credentials; store failures are passed on.
pub async fn get_current_user(
    cookies: &Cookies,
    headers: &HeaderMap,
    state: &AppState,
) -> InventoryResult<Option<CurrentUser>> {
    let Some(token) = cookies
        .get(AUTH_COOKIE)
        .map(|c| c.value().to_string())
        .or_else(|| bearer_token(headers))
    else {
        return Ok(None);
    };

    let claims = match verify_token(&token, &state.config.jwt_secret) {
        Ok(claims) => claims,
        Err(err) => {
            debug!("rejected token: {}", err);
            return Ok(None);
        }
    };
    let Some(user_id) = claims.user_id() else {
        return Ok(None);
    };

    let user = state.store.user_by_id(user_id).await?;
    Ok(user.map(|user| CurrentUser {
        id: user.id,
        username: user.username,
        permissions: user.permissions,
    }))
}

/// Checks that the caller holds `permission`. Always passes when
/// authentication is switched off.
pub async fn require_permission(
    cookies: &Cookies,
    headers: &HeaderMap,
    state: &AppState,
    permission: Permission,
) -> InventoryResult<()> {
    if !state.config.auth_required {
        return Ok(());
    }

    let user = get_current_user(cookies, headers, state)
        .await?
        .ok_or(InventoryError::Unauthorized)?;

    if permission.granted_by(&user.permissions) {
        Ok(())
    } else {
        Err(InventoryError::Forbidden(permission.label()))
    }
}
