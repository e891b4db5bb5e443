use std::sync::Arc;

use axum::http::Method;
use axum::routing::get;
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::routes::{health, tables};
use crate::schema::Schema;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub schema: Arc<Schema>,
}

impl AppState {
    pub fn new(pool: SqlitePool, schema: Schema) -> Self {
        Self {
            pool,
            schema: Arc::new(schema),
        }
    }
}

pub fn create_app(pool: SqlitePool, schema: Schema) -> Router {
    let state = AppState::new(pool, schema);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    // Scoped to one described table: /tables/:table
    let table_routes = Router::new()
        .route("/rows", get(tables::select_rows).post(tables::insert_rows))
        .route("/first", get(tables::find_first))
        .route("/many", get(tables::find_many));

    Router::new()
        .route("/api/health", get(health::health))
        .nest("/tables/:table", table_routes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
