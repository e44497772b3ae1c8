//! HTTP router: public scheduling endpoints under `/api`, cookie-gated
//! admin endpoints under `/api/admin`.

use axum::{
    body::Body,
    extract::Request,
    response::Response,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::{
    classify::ServerErrorsFailureClass,
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{debug, warn, Span};

use crate::state::AppState;
use crate::web::{admin, auth, public};

pub fn create_router(app_state: AppState) -> Router {
    let public_router = Router::new()
        .route("/parse", post(public::parse))
        .route("/slots", post(public::slots))
        .route("/book", post(public::book))
        .with_state(app_state.clone());

    let admin_router = Router::new()
        .route("/admin/login", post(auth::login))
        .route("/admin/logout", post(auth::logout))
        .route("/admin/session", get(auth::session))
        .route("/admin/bookings", get(admin::bookings::list))
        .route("/admin/bookings/{id}", get(admin::bookings::get))
        .route(
            "/admin/bookings/{id}/cancel",
            post(admin::bookings::cancel),
        )
        .route("/admin/dashboard", get(admin::dashboard::get))
        .route("/admin/calendars", get(admin::calendars::list))
        .route(
            "/admin/calendars/{id}/history",
            get(admin::calendars::history),
        )
        .route(
            "/admin/calendars/{id}/sync",
            post(admin::calendars::sync_now),
        )
        .route(
            "/admin/availability",
            get(admin::availability::get).put(admin::availability::put),
        )
        .route(
            "/admin/settings",
            get(admin::settings::get).put(admin::settings::put),
        )
        .route("/admin/calendar-view", get(admin::calendar_view::get))
        .with_state(app_state);

    let router = Router::new()
        .nest("/api", public_router)
        .nest("/api", admin_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    router.layer((
        CompressionLayer::new()
            .zstd(true)
            .br(true)
            .gzip(true)
            .quality(tower_http::CompressionLevel::Fastest),
        TraceLayer::new_for_http()
            .make_span_with(|request: &Request<Body>| {
                tracing::debug_span!("request", path = request.uri().path())
            })
            .on_request(())
            .on_body_chunk(())
            .on_eos(())
            .on_response(
                |response: &Response<Body>, latency: Duration, _span: &Span| {
                    let latency_threshold = if cfg!(debug_assertions) {
                        Duration::from_millis(100)
                    } else {
                        Duration::from_millis(1000)
                    };

                    let (latency_str, status) = (
                        format!("{latency:.2?}"),
                        format!(
                            "{} {}",
                            response.status().as_u16(),
                            response.status().canonical_reason().unwrap_or("??")
                        ),
                    );

                    if latency > latency_threshold {
                        warn!(latency = latency_str, status = status, "Response");
                    } else {
                        debug!(latency = latency_str, status = status, "Response");
                    }
                },
            )
            .on_failure(
                |error: ServerErrorsFailureClass, latency: Duration, _span: &Span| {
                    warn!(
                        error = ?error,
                        latency = format!("{latency:.2?}"),
                        "Request failed"
                    );
                },
            ),
        TimeoutLayer::new(Duration::from_secs(10)),
    ))
}
