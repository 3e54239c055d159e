//! HTTP binding of the control API
//!
//! Routes mirror the dotted paths load scripts already call:
//! - `POST /connection.add` with `{"id", "many", "centrifugoUrl", "cookie"}`
//! - `POST /connection.remove` with `{"id"}`
//! - `/connection.clean` removes every session
//! - `/connection.count` returns `{"Total", "Connected", "Subscribed"}`
//!
//! Bodies are parsed as JSON whatever their content type. Validation
//! failures answer `400` with the error text.

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{any, post};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::control::ControlApi;
use super::request::{AddRequest, CountResponse, RemoveRequest};
use crate::utils::error::ValidationError;
use crate::worker::cookies::parse_cookie_headers;

pub fn router(control: ControlApi) -> Router {
    Router::new()
        .route("/connection.add", post(add_sessions))
        .route("/connection.remove", post(remove_session))
        .route("/connection.clean", any(remove_all))
        .route("/connection.count", any(counts))
        .fallback(not_found)
        .with_state(control)
}

/// Serve the control API on `addr` until `shutdown` fires.
pub async fn serve(
    addr: String,
    control: ControlApi,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Listening at {}", listener.local_addr()?);

    axum::serve(listener, router(control))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

async fn add_sessions(
    State(control): State<ControlApi>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request: AddRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => return bad_request(e.into()),
    };
    debug!(?request, "Add request");

    let cookies = parse_cookie_headers(
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok()),
    );

    match control.add_sessions(&request, cookies) {
        Ok(outcomes) => {
            let body: String = outcomes.iter().map(|o| format!("{o}\n")).collect();
            (StatusCode::OK, body).into_response()
        }
        Err(e) => bad_request(e),
    }
}

async fn remove_session(State(control): State<ControlApi>, body: Bytes) -> Response {
    let request: RemoveRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => return bad_request(e.into()),
    };

    match control.remove_session(&request.id) {
        Ok(outcome) => (StatusCode::OK, format!("{outcome}\n")).into_response(),
        Err(e) => bad_request(e),
    }
}

async fn remove_all(State(control): State<ControlApi>) -> StatusCode {
    control.remove_all();
    StatusCode::OK
}

async fn counts(State(control): State<ControlApi>) -> Json<CountResponse> {
    Json(control.counts().into())
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not found")
}

fn bad_request(error: ValidationError) -> Response {
    warn!(error = %error, "Rejected control request");
    (StatusCode::BAD_REQUEST, error.to_string()).into_response()
}
