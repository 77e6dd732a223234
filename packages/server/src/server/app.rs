//! Application wiring and router construction.

use std::sync::Arc;

use axum::extract::Extension;
use axum::http::header::CONTENT_TYPE;
use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::domains::randomizing_jobs::{PostgresJobStore, RandomizingJobService};
use crate::domains::users::UserService;
use crate::kernel::DbCluster;
use crate::server::routes::{
    cancel_job_handler, create_job_handler, create_user_handler, get_user_handler, health_handler,
    list_cities_handler, list_jobs_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: DbCluster,
    pub users: Arc<UserService>,
    pub randomizing_jobs: Arc<RandomizingJobService>,
}

/// Wire the service graph around the connection pools.
pub fn build_state(config: &Config, db: DbCluster) -> AppState {
    let users = Arc::new(UserService::new(
        db.clone(),
        config.synthetic_user_password.clone(),
    ));

    let job_store = Arc::new(PostgresJobStore::new(db.clone()));
    let randomizing_jobs = Arc::new(RandomizingJobService::new(job_store, users.clone()));

    AppState {
        db,
        users,
        randomizing_jobs,
    }
}

/// Build the Axum application router
pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/v1/city/list", get(list_cities_handler))
        .route("/v1/user/create", post(create_user_handler))
        .route("/v1/user/:id", get(get_user_handler))
        .route("/v1/randomizing-job/create", post(create_job_handler))
        .route("/v1/randomizing-job/cancel", post(cancel_job_handler))
        .route("/v1/randomizing-job/list", get(list_jobs_handler))
        .layer(Extension(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
