//! Admin password login, logout, and session-introspection handlers.

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use super::extractors::{Admin, SESSION_COOKIE_NAME};
use crate::state::AppState;
use crate::store;

#[derive(Deserialize)]
pub struct LoginRequest {
    password: String,
}

/// Build a `Set-Cookie` header value for the admin session cookie.
///
/// `Path=/api/admin`, `HttpOnly`, `SameSite=Strict`; `Secure` outside
/// development.
fn session_cookie(token: &str, max_age: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; HttpOnly; SameSite=Strict; Path=/api/admin; Max-Age={max_age}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .find_map(|cookie| {
            cookie
                .trim()
                .strip_prefix(&format!("{SESSION_COOKIE_NAME}="))
                .map(|v| v.to_owned())
        })
}

/// `POST /api/admin/login`. Verifies the password with a constant-time
/// comparison (the password hashing primitive itself is an external
/// collaborator; here the configured password is compared directly).
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Result<Response, (StatusCode, Json<Value>)> {
    if !constant_time_eq(body.password.as_bytes(), state.admin_password.as_bytes()) {
        warn!("admin login attempt with incorrect password");
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "invalid password"})),
        ));
    }

    let now = state.clock.now();
    let session = store::sessions::create(state.store.pool(), now)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to create admin session");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "internal error"})),
            )
        })?;

    let secure = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(|h| !h.starts_with("localhost") && !h.starts_with("127.0.0.1"))
        .unwrap_or(true);

    let max_age = (session.expires_at - now).num_seconds();
    let cookie = session_cookie(&session.token, max_age, secure);

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({"ok": true})),
    )
        .into_response())
}

/// `POST /api/admin/logout`.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = extract_session_token(&headers) {
        if let Err(e) = store::sessions::revoke(state.store.pool(), &token).await {
            warn!(error = %e, "failed to revoke admin session");
        }
        state.session_cache.evict(&token);
    }

    let cookie = session_cookie("", 0, false);

    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({"ok": true})),
    )
        .into_response()
}

/// `GET /api/admin/session`. 200 if the session cookie is present and
/// valid, 401 otherwise (handled by the `Admin` extractor's rejection).
pub async fn session(Admin(_session): Admin) -> Json<Value> {
    Json(json!({"ok": true}))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
