use std::{collections::HashMap, fmt, fs::File, net::SocketAddr, time::Duration};

use anyhow::Context;
use axum::response::IntoResponse;
use cucumber::{given, then, when, World as _};
use serde_json::{json, Map, Value};
use tempfile::TempDir;
use trips::{
    auth::{self, AuthenticatedUser},
    config::AppConfig,
    db::{init_pool, run_migrations},
    error::AppError,
    models::trip::Trip,
    services::trips::{self as trip_ops, PageSize},
    state::AppState,
};

#[derive(Debug, cucumber::World, Default)]
struct AppWorld {
    state: Option<TestState>,
    users: HashMap<String, AuthenticatedUser>,
    last_trip: Option<Trip>,
    last_status: Option<u16>,
}

impl AppWorld {
    fn app_state(&self) -> &AppState {
        self.state
            .as_ref()
            .expect("state must be initialised first")
            .app()
    }

    fn user(&self, username: &str) -> AuthenticatedUser {
        self.users
            .get(username)
            .cloned()
            .unwrap_or_else(|| panic!("user {username} must be registered first"))
    }

    fn trip_id(&self) -> String {
        self.last_trip
            .as_ref()
            .expect("a trip must have been created")
            .id
            .to_string()
    }

    fn record(&mut self, outcome: Result<(u16, Option<Trip>), AppError>) {
        match outcome {
            Ok((status, trip)) => {
                self.last_status = Some(status);
                if trip.is_some() {
                    self.last_trip = trip;
                }
            }
            Err(err) => self.last_status = Some(err.into_response().status().as_u16()),
        }
    }
}

struct TestState {
    app: AppState,
    _root: TempDir,
}

impl fmt::Debug for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestState").finish()
    }
}

impl TestState {
    async fn new() -> anyhow::Result<Self> {
        let root = TempDir::new().context("create temp dir for bdd world")?;
        let db_path = root.path().join("bdd.sqlite");
        File::create(&db_path)?;
        let database_url = format!("sqlite://{}", db_path.to_string_lossy());

        let config = AppConfig {
            database_url,
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            cookie_secret: "bdd-cookie-secret".into(),
            list_cache_ttl: Duration::from_secs(60 * 60),
            session_ttl: Duration::from_secs(60 * 60),
        };

        let db = init_pool(&config.database_url).await?;
        run_migrations(&db).await?;

        let app = AppState::new(config, db);
        Ok(Self { app, _root: root })
    }

    fn app(&self) -> &AppState {
        &self.app
    }
}

fn trip_payload(title: &str, trip_type: &str) -> Map<String, Value> {
    let value = json!({
        "title": title,
        "origin": "JKT",
        "destination": "DPS",
        "type": trip_type,
        "description": "vacation",
        "start_date": "2024-01-01",
        "end_date": "2024-01-10",
    });
    match value {
        Value::Object(map) => map,
        _ => unreachable!("literal is an object"),
    }
}

#[given("a fresh application state")]
async fn given_fresh_state(world: &mut AppWorld) {
    world.state = Some(TestState::new().await.expect("state"));
    world.users.clear();
    world.last_trip = None;
    world.last_status = None;
}

#[given(regex = r#"^a registered user \"([^\"]+)\"$"#)]
async fn given_registered_user(world: &mut AppWorld, username: String) {
    let user = auth::register_user(
        world.app_state(),
        &username,
        &format!("{username}@example.com"),
        "correct horse battery",
    )
    .await
    .expect("register user");
    world.users.insert(username, user);
}

#[when(regex = r#"^\"([^\"]+)\" creates a trip titled \"([^\"]*)\" of type \"([^\"]*)\"$"#)]
async fn when_create_trip(world: &mut AppWorld, username: String, title: String, kind: String) {
    let user = world.user(&username);
    let outcome = trip_ops::create_trip(world.app_state(), &user, &trip_payload(&title, &kind))
        .await
        .map(|trip| (201, Some(trip)));
    world.record(outcome);
}

#[when(regex = r#"^\"([^\"]+)\" updates that trip with title \"([^\"]*)\"$"#)]
async fn when_update_trip(world: &mut AppWorld, username: String, title: String) {
    let user = world.user(&username);
    let id = world.trip_id();
    let outcome = trip_ops::update_trip(
        world.app_state(),
        &user,
        &id,
        &trip_payload(&title, "regular"),
    )
    .await
    .map(|trip| (200, Some(trip)));
    world.record(outcome);
}

#[when(regex = r#"^\"([^\"]+)\" views that trip$"#)]
async fn when_view_trip(world: &mut AppWorld, username: String) {
    let user = world.user(&username);
    let id = world.trip_id();
    let outcome = trip_ops::show_trip(world.app_state(), &user, &id)
        .await
        .map(|_| (200, None));
    world.record(outcome);
}

#[when(regex = r#"^\"([^\"]+)\" deletes that trip$"#)]
async fn when_delete_trip(world: &mut AppWorld, username: String) {
    let user = world.user(&username);
    let id = world.trip_id();
    let outcome = trip_ops::delete_trip(world.app_state(), &user, &id)
        .await
        .map(|()| (200, None));
    world.record(outcome);
}

#[then(regex = r"^the response status is (\d+)$")]
async fn then_status(world: &mut AppWorld, expected: u16) {
    assert_eq!(world.last_status, Some(expected));
}

#[then(regex = r#"^the trip belongs to \"([^\"]+)\"$"#)]
async fn then_trip_owner(world: &mut AppWorld, username: String) {
    let user = world.user(&username);
    let trip = world.last_trip.as_ref().expect("trip");
    assert_eq!(trip.user_id, user.id);
}

#[then(regex = r#"^that trip is still titled \"([^\"]*)\"$"#)]
async fn then_trip_title(world: &mut AppWorld, title: String) {
    let id = world.last_trip.as_ref().expect("trip").id;
    let stored = world
        .app_state()
        .trips
        .find(id)
        .await
        .expect("lookup")
        .expect("trip still stored");
    assert_eq!(stored.title, title);
}

#[then(regex = r#"^\"([^\"]+)\" sees exactly the trips \"([^\"]*)\"$"#)]
async fn then_listing(world: &mut AppWorld, username: String, titles: String) {
    let user = world.user(&username);
    let body = trip_ops::list_trips(world.app_state(), &user, PageSize::from_query(None))
        .await
        .expect("listing");
    let listing: Value = serde_json::from_slice(&body).expect("listing json");
    let listed: Vec<&str> = listing["data"]
        .as_array()
        .expect("data array")
        .iter()
        .filter_map(|trip| trip["title"].as_str())
        .collect();
    let expected: Vec<&str> = titles
        .split(", ")
        .filter(|title| !title.is_empty())
        .collect();
    assert_eq!(listed, expected);
}

#[tokio::main]
async fn main() {
    AppWorld::cucumber()
        .fail_on_skipped()
        .with_default_cli()
        .run("tests/features")
        .await;
}
