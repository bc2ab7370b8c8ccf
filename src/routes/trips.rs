use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{
    auth::CurrentUser,
    error::AppError,
    models::trip::Trip,
    response::Envelope,
    services::trips::{self, PageSize},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/trips", get(index).post(store))
        .route("/trips/:id", get(show).put(update).patch(update).delete(destroy))
}

#[derive(Deserialize)]
struct ListQuery {
    page_size: Option<String>,
}

/// The raw `{id}` segment. Segments axum cannot decode are passed on as
/// written, so they end up as an ordinary lookup miss.
fn trip_id(path: Result<Path<String>, PathRejection>, uri: &Uri) -> String {
    match path {
        Ok(Path(id)) => id,
        Err(_) => uri.path().rsplit('/').next().unwrap_or_default().to_string(),
    }
}

async fn index(
    State(state): State<AppState>,
    current: CurrentUser,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let user = current.require_user()?;
    // An unreadable query string gets the default page size, like any other bad value.
    let page_size = match query {
        Ok(Query(query)) => PageSize::from_query(query.page_size.as_deref()),
        Err(_) => PageSize::from_query(None),
    };
    let body = trips::list_trips(&state, user, page_size).await?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

async fn store(
    State(state): State<AppState>,
    current: CurrentUser,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<Trip>>), AppError> {
    let user = current.require_user()?;
    let Json(payload) = payload?;
    let trip = trips::create_trip(&state, user, &payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_data(trips::CREATED, trip)),
    ))
}

async fn show(
    State(state): State<AppState>,
    current: CurrentUser,
    uri: Uri,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Envelope<Trip>>, AppError> {
    let user = current.require_user()?;
    let id = trip_id(path, &uri);
    let trip = trips::show_trip(&state, user, &id).await?;
    Ok(Json(Envelope::with_data(trips::SHOWN, trip)))
}

async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    uri: Uri,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<Envelope<Trip>>, AppError> {
    let user = current.require_user()?;
    let id = trip_id(path, &uri);
    let Json(payload) = payload?;
    let trip = trips::update_trip(&state, user, &id, &payload).await?;
    Ok(Json(Envelope::with_data(trips::UPDATED, trip)))
}

async fn destroy(
    State(state): State<AppState>,
    current: CurrentUser,
    uri: Uri,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Envelope<()>>, AppError> {
    let user = current.require_user()?;
    let id = trip_id(path, &uri);
    trips::delete_trip(&state, user, &id).await?;
    Ok(Json(Envelope::message(trips::DELETED)))
}
