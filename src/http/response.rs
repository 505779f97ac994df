//! Mapping rendezvous results onto HTTP.
//!
//! | result | status | body |
//! |---|---|---|
//! | answer / reflected offer | 200 | `{type, sdp}` JSON |
//! | answer delivered | 200 | empty |
//! | rejected, bad key, malformed body | 400 | text |
//! | idle timeout | 408 | text |
//! | shutting down | 503 | text |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::rendezvous::{RendezvousError, SessionDescription, SlotKeyError};

/// Successful reply to a submission.
#[derive(Debug)]
pub enum Reply {
    /// The answer (for the offerer) or the stored offer (for the loser).
    Description(SessionDescription),
    /// The answer was handed over.
    Ack,
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self {
            Reply::Description(desc) => Json(desc).into_response(),
            Reply::Ack => StatusCode::OK.into_response(),
        }
    }
}

/// Failed submission.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Rendezvous(#[from] RendezvousError),

    #[error("invalid slot: {0}")]
    SlotKey(#[from] SlotKeyError),

    #[error("malformed session description")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid method")]
    Method,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Rendezvous(RendezvousError::Expired(_)) => StatusCode::REQUEST_TIMEOUT,
            ApiError::Rendezvous(RendezvousError::Closed) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Rendezvous(
                RendezvousError::InvalidType | RendezvousError::NoPendingOffer,
            )
            | ApiError::SlotKey(_)
            | ApiError::Malformed(_)
            | ApiError::Method => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            ApiError::from(RendezvousError::NoPendingOffer).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(RendezvousError::InvalidType).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(RendezvousError::Expired(std::time::Duration::from_secs(30))).status(),
            StatusCode::REQUEST_TIMEOUT
        );
        assert_eq!(
            ApiError::from(RendezvousError::Closed).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(SlotKeyError::Empty).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn rendezvous_errors_keep_their_message() {
        assert_eq!(
            ApiError::from(RendezvousError::NoPendingOffer).to_string(),
            "no pending offer for slot"
        );
    }

    #[test]
    fn ack_has_empty_body() {
        let response = Reply::Ack.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
