use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::info;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{session::Session, user::User},
    state::AppState,
    validation::FieldErrors,
};

pub const SESSION_COOKIE: &str = "trips_session";

const USER_COLUMNS: &str = "id, uuid, username, email, password_hash, created_at, last_login_at";

/// The caller behind a request. Trip operations receive it explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub uuid: String,
    pub username: String,
}

impl From<User> for AuthenticatedUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            uuid: user.uuid,
            username: user.username,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<AuthenticatedUser>);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = PrivateCookieJar::from_headers(&parts.headers, state.cookie_key.clone());
        match presented_token(&parts.headers, &jar) {
            Some(token) => Ok(Self(resolve_session(state, &token).await?)),
            None => Ok(Self(None)),
        }
    }
}

impl CurrentUser {
    pub fn require_user(&self) -> Result<&AuthenticatedUser, AppError> {
        self.0.as_ref().ok_or(AppError::Unauthorized)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn token_digest(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

async fn resolve_session(
    state: &AppState,
    token: &str,
) -> Result<Option<AuthenticatedUser>, AppError> {
    let session_id = token_digest(token);
    let session = sqlx::query_as::<_, Session>(
        "SELECT id, user_id, created_at, last_seen_at, expires_at FROM sessions WHERE id = ?",
    )
    .bind(&session_id)
    .fetch_optional(&state.db)
    .await?;

    let Some(session) = session else {
        return Ok(None);
    };

    let now = Utc::now();
    if session.expires_at.is_some_and(|expires_at| expires_at <= now) {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(&session.id)
            .execute(&state.db)
            .await?;
        return Ok(None);
    }

    sqlx::query("UPDATE sessions SET last_seen_at = ? WHERE id = ?")
        .bind(now)
        .bind(&session.id)
        .execute(&state.db)
        .await?;

    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(session.user_id)
        .fetch_optional(&state.db)
        .await?;
    Ok(user.map(AuthenticatedUser::from))
}

fn validate_registration(username: &str, email: &str, password: &str) -> FieldErrors {
    let mut errors = FieldErrors::default();
    let username_len = username.chars().count();
    if username_len == 0 {
        errors.add("username", "The username field is required.");
    } else if !(3..=32).contains(&username_len) {
        errors.add("username", "The username must be between 3 and 32 characters.");
    } else if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        errors.add(
            "username",
            "The username may only contain letters, numbers, dashes and underscores.",
        );
    }

    if email.is_empty() {
        errors.add("email", "The email field is required.");
    } else if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        errors.add("email", "The email must be a valid email address.");
    }

    if password.chars().count() < 8 {
        errors.add("password", "The password must be at least 8 characters.");
    }
    errors
}

pub async fn register_user(
    state: &AppState,
    username: &str,
    email: &str,
    password: &str,
) -> Result<AuthenticatedUser, AppError> {
    let username = username.trim();
    let email = email.trim().to_lowercase();
    let mut errors = validate_registration(username, &email, password);

    if errors.get("username").is_none() || errors.get("email").is_none() {
        let taken: Vec<(String, String)> =
            sqlx::query_as("SELECT username, email FROM users WHERE username = ? OR email = ?")
                .bind(username)
                .bind(&email)
                .fetch_all(&state.db)
                .await?;
        if taken.iter().any(|(existing, _)| existing == username) {
            errors.add("username", "The username has already been taken.");
        }
        if taken.iter().any(|(_, existing)| *existing == email) {
            errors.add("email", "The email has already been taken.");
        }
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| AppError::Other(anyhow::anyhow!("hashing password failed: {err}")))?
        .to_string();

    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (uuid, username, email, password_hash, created_at) \
         VALUES (?, ?, ?, ?, ?) RETURNING {USER_COLUMNS}"
    ))
    .bind(Uuid::new_v4().to_string())
    .bind(username)
    .bind(&email)
    .bind(password_hash)
    .bind(Utc::now())
    .fetch_one(&state.db)
    .await?;

    info!(user_id = user.id, "registered user {}", user.username);
    Ok(user.into())
}

/// Accepts either the username or the email as `identifier`.
pub async fn authenticate_user(
    state: &AppState,
    identifier: &str,
    password: &str,
) -> Result<AuthenticatedUser, AppError> {
    let identifier = identifier.trim();
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = ? OR email = ?"
    ))
    .bind(identifier)
    .bind(identifier.to_lowercase())
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::Unauthorized)?;

    let parsed = PasswordHash::new(&user.password_hash)
        .map_err(|err| AppError::Other(anyhow::anyhow!("stored password hash invalid: {err}")))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AppError::Unauthorized)?;

    sqlx::query("UPDATE users SET last_login_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(user.id)
        .execute(&state.db)
        .await?;

    Ok(user.into())
}

/// Stores a new session and returns the raw token for the client.
pub async fn create_session(state: &AppState, user_id: i64) -> Result<String, AppError> {
    let token = Uuid::new_v4().simple().to_string();
    let now = Utc::now();
    let expires_at = chrono::Duration::from_std(state.config.session_ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl));

    sqlx::query(
        "INSERT INTO sessions (id, user_id, created_at, last_seen_at, expires_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(token_digest(&token))
    .bind(user_id)
    .bind(now)
    .bind(now)
    .bind(expires_at)
    .execute(&state.db)
    .await?;
    Ok(token)
}

pub async fn destroy_session(state: &AppState, token: &str) -> Result<(), AppError> {
    sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(token_digest(token))
        .execute(&state.db)
        .await?;
    Ok(())
}

/// The token presented by a request, bearer header first.
pub fn presented_token(headers: &HeaderMap, jar: &PrivateCookieJar) -> Option<String> {
    bearer_token(headers).or_else(|| {
        jar.get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
    })
}

pub fn apply_session_cookie(jar: PrivateCookieJar, token: &str) -> PrivateCookieJar {
    jar.add(
        Cookie::build((SESSION_COOKIE, token.to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax),
    )
}

pub fn clear_session_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}
