use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use password_hash::rand_core::OsRng;

use crate::{
    audit::log_audit,
    dto::auth::{LoginForm, RegisterForm},
    error::{AppError, AppResult},
    models::{NewUser, User},
    session::CurrentUser,
    state::AppState,
};

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(password_hash)
}

pub async fn register_user(state: &AppState, form: RegisterForm) -> AppResult<CurrentUser> {
    let RegisterForm {
        username,
        email,
        password,
    } = form;
    let username = username.trim().to_string();
    if username.is_empty() || password.is_empty() {
        return Err(AppError::BadRequest(
            "username and password are required".to_string(),
        ));
    }

    let password_hash = hash_password(&password)?;
    let user = state
        .users
        .create(NewUser {
            username,
            email,
            password_hash,
        })
        .await?;

    log_audit(
        state.audit.as_ref(),
        Some(user.id),
        "user_register",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id })),
    )
    .await;

    Ok(current_user(&user))
}

pub async fn authenticate(state: &AppState, form: &LoginForm) -> AppResult<CurrentUser> {
    let user = match state.users.find_by_username(form.username.trim()).await? {
        Some(u) => u,
        None => return Err(AppError::BadRequest("Invalid username or password".into())),
    };

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;

    let argon2 = Argon2::default();
    if argon2
        .verify_password(form.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::BadRequest("Invalid username or password".into()));
    }

    log_audit(
        state.audit.as_ref(),
        Some(user.id),
        "user_login",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id })),
    )
    .await;

    Ok(current_user(&user))
}

fn current_user(user: &User) -> CurrentUser {
    CurrentUser {
        id: user.id,
        username: user.username.clone(),
    }
}
