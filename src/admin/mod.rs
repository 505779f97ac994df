//! Operator status endpoint.
//!
//! Served on its own bind address, behind a bearer token. Reports counts
//! only; slot names never leave the table.

pub mod auth;
pub mod handlers;

use axum::{middleware, routing::get, Router};
use std::sync::Arc;

use self::auth::admin_auth_middleware;
use self::handlers::get_status;
use crate::rendezvous::RendezvousTable;

/// State shared by admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub table: RendezvousTable,
    pub api_key: Arc<str>,
}

impl AdminState {
    pub fn new(table: RendezvousTable, api_key: &str) -> Self {
        Self {
            table,
            api_key: Arc::from(api_key),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use crate::rendezvous::{SessionDescription, SlotKey};

    fn status_request(token: Option<&str>) -> Request<Body> {
        let mut builder = Request::get("/admin/status");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn requires_bearer_token() {
        let router = setup_admin_router(AdminState::new(RendezvousTable::new(), "secret"));

        let response = router.clone().oneshot(status_request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = router.oneshot(status_request(Some("wrong"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn reports_open_slots() {
        let table = RendezvousTable::new();
        let _pending = table
            .resolve(
                SlotKey::try_from("room").unwrap(),
                SessionDescription::offer("X"),
            )
            .unwrap();
        let router = setup_admin_router(AdminState::new(table, "secret"));

        let response = router.oneshot(status_request(Some("secret"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let status: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(status["open_slots"], 1);
        assert_eq!(status["status"], "operational");
        assert!(status.get("room").is_none());
    }
}
