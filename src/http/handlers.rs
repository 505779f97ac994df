//! Request handlers.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
};

use crate::http::request::request_id;
use crate::http::response::{ApiError, Reply};
use crate::http::server::AppState;
use crate::rendezvous::{Outcome, SessionDescription, SlotKey};

const INDEX_PAGE: &str = include_str!("index.html");

/// `GET /`: human-readable protocol description.
pub async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

/// `POST /{slot}`: submit an offer or an answer.
///
/// The body is decoded as JSON whatever its content type, because browsers
/// posting a string send `text/plain`.
pub async fn submit(
    State(state): State<AppState>,
    Path(raw_slot): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Reply, ApiError> {
    let request_id = request_id(&headers);

    let key = SlotKey::parse(&raw_slot, state.max_slot_key_len).inspect_err(|e| {
        tracing::warn!(request_id = %request_id, error = %e, "Invalid slot key");
    })?;
    let message = SessionDescription::from_slice(&body).inspect_err(|e| {
        tracing::warn!(request_id = %request_id, error = %e, "Malformed session description");
    })?;

    tracing::debug!(request_id = %request_id, slot = %key, kind = ?message.kind, "Submission");

    let outcome = state.table.resolve(key, message).inspect_err(|e| {
        tracing::info!(request_id = %request_id, error = %e, "Submission rejected");
    })?;

    match outcome {
        Outcome::Offerer(pending) => {
            tracing::debug!(request_id = %request_id, "Waiting for answer");
            let answer = pending.wait().await?;
            Ok(Reply::Description(answer))
        }
        Outcome::Reflected(offer) => Ok(Reply::Description(offer)),
        Outcome::Delivered => Ok(Reply::Ack),
    }
}

/// `OPTIONS /{slot}`: CORS preflight for clients that post `application/json`.
pub async fn preflight() -> Response {
    (
        StatusCode::NO_CONTENT,
        [
            (
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static("POST, OPTIONS"),
            ),
            (
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static("content-type"),
            ),
        ],
    )
        .into_response()
}

/// Any other method on a slot path.
pub async fn invalid_method() -> ApiError {
    ApiError::Method
}
