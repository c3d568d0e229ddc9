use axum::{
    extract::{Form, State},
    Json,
};
use log::{error, info, warn};
use serde::Deserialize;
use tower_cookies::{Cookie, Cookies};

use super::{flag, required_text, Outcome};
use crate::{
    error::{InventoryError, InventoryResult},
    middleware::AUTH_COOKIE,
    models::{LoginResponse, NewUser, Permissions},
    utils::{create_token, hash_password, verify_password},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    username: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    username: Option<String>,
    password: Option<String>,
    #[serde(rename = "permission_createNew")]
    create_new: Option<String>,
    #[serde(rename = "permission_transactionIn")]
    transaction_in: Option<String>,
    #[serde(rename = "permission_transactionOut")]
    transaction_out: Option<String>,
    #[serde(rename = "permission_view")]
    view: Option<String>,
}

pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> InventoryResult<Json<Outcome>> {
    let username = required_text("username", &form.username)?;
    let password = required_text("password", &form.password)?;

    let password_hash = hash_password(&password).map_err(|err| {
        error!("password hashing failed: {}", err);
        InventoryError::invalid_input("password could not be processed")
    })?;

    let user = NewUser {
        username,
        password_hash,
        permissions: Permissions {
            create_new: flag(&form.create_new),
            transaction_in: flag(&form.transaction_in),
            transaction_out: flag(&form.transaction_out),
            view: flag(&form.view),
        },
    };

    match state.store.insert_user(&user).await? {
        Some(id) => {
            info!("registered user {} ({})", user.username, id);
            Ok(Outcome::ok())
        }
        None => Err(InventoryError::invalid_input(format!(
            "username '{}' is already taken",
            user.username
        ))),
    }
}

pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<LoginForm>,
) -> InventoryResult<Json<LoginResponse>> {
    let username = required_text("username", &form.username)?;
    let password = required_text("password", &form.password)?;

    let user = state
        .store
        .user_by_name(&username)
        .await?
        .ok_or(InventoryError::Unauthorized)?;

    if !verify_password(&password, &user.password_hash).unwrap_or(false) {
        warn!("failed login for {}", username);
        return Err(InventoryError::Unauthorized);
    }

    let token = create_token(user.id, user.username.clone(), &state.config.jwt_secret).map_err(|err| {
        error!("token creation failed: {}", err);
        InventoryError::Unauthorized
    })?;

    let cookie = Cookie::build((AUTH_COOKIE, token))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::hours(24))
        .build();
    cookies.add(cookie);

    info!("user {} logged in", user.username);
    Ok(Json(LoginResponse::from(&user)))
}

pub async fn logout(cookies: Cookies) -> Json<Outcome> {
    let mut cookie = Cookie::from(AUTH_COOKIE);
    cookie.set_path("/");
    cookies.remove(cookie);
    Outcome::ok()
}
