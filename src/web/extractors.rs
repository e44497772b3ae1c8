//! Axum extractor for the admin session cookie.

use axum::extract::FromRequestParts;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Json;
use http::request::Parts;
use serde_json::json;

use crate::domain::AdminSession;
use crate::state::AppState;

pub const SESSION_COOKIE_NAME: &str = "michael_session";

/// Extractor that resolves the `michael_session` cookie to a live
/// [`AdminSession`]. Rejects with 401 when the cookie is missing, unknown,
/// or expired. The rejection also clears the session cookie client-side.
pub struct Admin(pub AdminSession);

impl FromRequestParts<AppState> for Admin {
    type Rejection = (StatusCode, [(header::HeaderName, HeaderValue); 1], Json<serde_json::Value>);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|cookies| {
                cookies.split(';').find_map(|c| {
                    c.trim()
                        .strip_prefix(&format!("{SESSION_COOKIE_NAME}="))
                        .map(|v| v.to_owned())
                })
            })
            .ok_or_else(unauthorized)?;

        let now = state.clock.now();
        let session = state
            .session_cache
            .validate(&token, now)
            .await
            .ok_or_else(unauthorized)?;

        Ok(Admin(session))
    }
}

fn unauthorized() -> (StatusCode, [(header::HeaderName, HeaderValue); 1], Json<serde_json::Value>) {
    let clear_cookie = HeaderValue::from_str(&format!(
        "{SESSION_COOKIE_NAME}=; HttpOnly; SameSite=Strict; Path=/api/admin; Max-Age=0"
    ))
    .expect("cookie header value is always valid ASCII");

    (
        StatusCode::UNAUTHORIZED,
        [(header::SET_COOKIE, clear_cookie)],
        Json(json!({"error": "unauthorized"})),
    )
}
