pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
pub mod state;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn app(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/users/me", get(handlers::auth::me))
        .route("/doctors", get(handlers::doctors::list_doctors))
        .route(
            "/doctors/:id/working-hours",
            get(handlers::doctors::get_working_hours).put(handlers::doctors::set_working_hours),
        )
        .route(
            "/services",
            get(handlers::services::list_services).post(handlers::services::create_service),
        )
        .route("/services/:id", put(handlers::services::update_service))
        .route("/appointments", post(handlers::appointments::create_appointment))
        .route("/appointments/slots", get(handlers::appointments::get_slots))
        .route("/appointments/my", get(handlers::appointments::my_appointments))
        .route(
            "/appointments/:id/cancel",
            put(handlers::appointments::cancel_appointment),
        )
        .route(
            "/appointments/:id/complete",
            put(handlers::appointments::complete_appointment),
        )
        .route(
            "/time-slots/:doctor_id/available",
            get(handlers::appointments::get_time_slots),
        );

    Router::new()
        .route("/health", get(handlers::health::health))
        .nest("/api", api)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, ?latency, "response");
                        } else {
                            tracing::info!(%status, ?latency, "response");
                        }
                    },
                ),
        )
}
