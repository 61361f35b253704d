// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{attempt, quiz},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Every route requires a valid bearer token.
/// * Applies global middleware (Trace, CORS).
/// * Injects the application state.
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let meeting_routes = Router::new().route("/{meeting_id}/quizzes", get(quiz::list_meeting_quizzes));

    let quiz_routes = Router::new()
        .route("/", post(quiz::create_quiz))
        .route(
            "/{id}",
            get(quiz::get_quiz)
                .put(quiz::update_quiz)
                .delete(quiz::delete_quiz),
        )
        .route("/{id}/questions", get(quiz::get_quiz_questions))
        .route("/{id}/questions/import", post(quiz::import_questions))
        .route(
            "/{id}/attempts",
            post(attempt::start_attempt).get(attempt::list_my_attempts),
        )
        .route("/{id}/attempts/active", get(attempt::get_active_attempt));

    let attempt_routes = Router::new()
        .route("/{id}", get(attempt::get_attempt))
        .route("/{id}/answers", put(attempt::save_answer))
        .route("/{id}/submit", post(attempt::submit_attempt))
        .route("/{id}/result", get(attempt::get_attempt_result));

    Router::new()
        .nest("/api/meetings", meeting_routes)
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/attempts", attempt_routes)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
