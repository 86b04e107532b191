// src/routes.rs

use axum::{
    Router,
    http::{Method, header},
    middleware,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{chat_settings, feedback, report},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * LMS-facing routes require any valid bearer token.
/// * Admin routes additionally require the 'admin' role.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    // The LMS calls from its own servers, browsers never hold tokens.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let feedback_routes = Router::new()
        .route("/api/send-feedback", post(feedback::send_feedback))
        .route("/api/resend-feedback", post(feedback::resend_feedback))
        .route("/api/send-report", post(report::send_report))
        // route_layer keeps unmatched paths out of auth, so they still 404
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let admin_routes = Router::new()
        .route(
            "/chat-settings",
            get(chat_settings::list_chat_settings).post(chat_settings::create_chat_settings),
        )
        .route("/chat-settings/{id}", get(chat_settings::get_chat_settings))
        // Auth first, then the admin check
        .route_layer(middleware::from_fn(admin_middleware))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(feedback_routes)
        .nest("/api/admin", admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
