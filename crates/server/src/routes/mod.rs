use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod auth;
mod classrooms;
mod health;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Auth routes
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        // Classrooms and the join flow
        .route(
            "/classrooms",
            post(classrooms::create_classroom).get(classrooms::list_my_classrooms),
        )
        .route("/classrooms/join", post(classrooms::join))
        .route(
            "/classrooms/:id/invitations",
            post(classrooms::create_invitation),
        )
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
