use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::PrivateCookieJar;
use serde::{Deserialize, Serialize};

use crate::{
    auth::{self, AuthenticatedUser},
    error::AppError,
    response::Envelope,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/login", post(login_submit))
        .route("/register", post(register_submit))
        .route("/logout", post(logout))
}

async fn health() -> Json<Envelope<()>> {
    Json(Envelope::message("ok"))
}

#[derive(Debug, Serialize)]
struct SessionGrant {
    user: AuthenticatedUser,
    token: String,
}

#[derive(Deserialize)]
struct LoginForm {
    identifier: String,
    password: String,
}

async fn login_submit(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    form: Result<Json<LoginForm>, JsonRejection>,
) -> Result<(PrivateCookieJar, Json<Envelope<SessionGrant>>), AppError> {
    let Json(form) = form?;
    let user = auth::authenticate_user(&state, &form.identifier, &form.password).await?;
    let token = auth::create_session(&state, user.id).await?;
    Ok((
        auth::apply_session_cookie(jar, &token),
        Json(Envelope::with_data("Login success", SessionGrant { user, token })),
    ))
}

#[derive(Deserialize)]
struct RegisterForm {
    username: String,
    email: String,
    password: String,
}

async fn register_submit(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    form: Result<Json<RegisterForm>, JsonRejection>,
) -> Result<(StatusCode, PrivateCookieJar, Json<Envelope<SessionGrant>>), AppError> {
    let Json(form) = form?;
    let user = auth::register_user(&state, &form.username, &form.email, &form.password).await?;
    let token = auth::create_session(&state, user.id).await?;
    Ok((
        StatusCode::CREATED,
        auth::apply_session_cookie(jar, &token),
        Json(Envelope::with_data(
            "Register success",
            SessionGrant { user, token },
        )),
    ))
}

async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: PrivateCookieJar,
) -> Result<(PrivateCookieJar, Json<Envelope<()>>), AppError> {
    if let Some(token) = auth::presented_token(&headers, &jar) {
        auth::destroy_session(&state, &token).await?;
    }
    Ok((
        auth::clear_session_cookie(jar),
        Json(Envelope::message("Logout success")),
    ))
}
