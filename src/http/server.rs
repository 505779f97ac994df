//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with all handlers
//! - Wire up middleware (tracing, body limit, request ID, CORS header)
//! - Serve plain HTTP, and HTTPS when configured, over one shared table
//! - Serve the admin router when enabled
//! - On shutdown, close the table so parked offerers return before draining

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Request},
    routing::{get, post},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use std::future::IntoFuture;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::admin::{self, AdminState};
use crate::config::BrokerConfig;
use crate::http::handlers;
use crate::http::request::{UuidRequestId, X_REQUEST_ID};
use crate::lifecycle::shutdown;
use crate::net::tls::load_tls_config;
use crate::rendezvous::RendezvousTable;

/// How long HTTPS connections get to finish after shutdown starts.
const TLS_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub table: RendezvousTable,
    pub max_slot_key_len: usize,
}

/// HTTP front end of the broker.
pub struct HttpServer {
    router: Router,
    config: BrokerConfig,
    table: RendezvousTable,
}

impl HttpServer {
    /// Create a server with a fresh table configured from `config`.
    pub fn new(config: BrokerConfig) -> Self {
        let table = RendezvousTable::with_idle_timeout(config.rendezvous.idle_timeout());
        Self::with_table(config, table)
    }

    /// Create a server around an existing table.
    pub fn with_table(config: BrokerConfig, table: RendezvousTable) -> Self {
        let state = AppState {
            table: table.clone(),
            max_slot_key_len: config.rendezvous.max_slot_key_len,
        };
        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            table,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &BrokerConfig, state: AppState) -> Router {
        Router::new()
            .route("/", get(handlers::index))
            .route(
                "/{*slot}",
                post(handlers::submit)
                    .options(handlers::preflight)
                    .fallback(handlers::invalid_method),
            )
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.rendezvous.max_body_bytes))
            .layer(DefaultBodyLimit::disable())
            .layer(SetResponseHeaderLayer::overriding(
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static("*"),
            ))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .headers()
                        .get(X_REQUEST_ID)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("unknown");
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        request_id = %request_id,
                    )
                }),
            )
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
    }

    /// Run the server on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let mut tasks = JoinSet::new();

        if let Some(tls) = &self.config.listener.tls {
            let tls_addr = parse_addr(&tls.bind_address)?;
            let rustls = load_tls_config(tls).await?;
            let tls_listener = TcpListener::bind(tls_addr).await?.into_std()?;
            tracing::info!(address = %tls_listener.local_addr()?, "HTTPS server starting");
            tasks.spawn(serve_tls(
                tls_listener,
                rustls,
                self.router.clone(),
                self.table.clone(),
                shutdown.resubscribe(),
            ));
        }

        if self.config.admin.enabled {
            let admin_listener = TcpListener::bind(&self.config.admin.bind_address).await?;
            tracing::info!(address = %admin_listener.local_addr()?, "Admin server starting");
            let admin_router = admin::setup_admin_router(AdminState::new(
                self.table.clone(),
                &self.config.admin.api_key,
            ));
            let admin_shutdown = shutdown.resubscribe();
            tasks.spawn(async move {
                axum::serve(admin_listener, admin_router)
                    .with_graceful_shutdown(shutdown::recv(admin_shutdown))
                    .await
            });
        }

        let table = self.table.clone();
        let plain = axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move {
                shutdown::recv(shutdown).await;
                table.close();
            })
            .into_future();
        tokio::pin!(plain);

        // A listener that dies early takes the whole broker down with it.
        loop {
            tokio::select! {
                served = &mut plain => {
                    served?;
                    break;
                }
                Some(joined) = tasks.join_next() => {
                    if let Err(e) = joined.map_err(io::Error::other)? {
                        tracing::error!(error = %e, "Listener failed");
                        self.table.close();
                        return Err(e);
                    }
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            joined.map_err(io::Error::other)??;
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a clone of the router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn table(&self) -> &RendezvousTable {
        &self.table
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }
}

async fn serve_tls(
    listener: std::net::TcpListener,
    tls: RustlsConfig,
    router: Router,
    table: RendezvousTable,
    shutdown: broadcast::Receiver<()>,
) -> Result<(), io::Error> {
    let handle = axum_server::Handle::new();
    let trigger = handle.clone();
    let watcher = tokio::spawn(async move {
        shutdown::recv(shutdown).await;
        table.close();
        trigger.graceful_shutdown(Some(TLS_GRACE_PERIOD));
    });

    let served = axum_server::from_tcp_rustls(listener, tls)
        .handle(handle)
        .serve(router.into_make_service())
        .await;
    watcher.abort();
    served
}

fn parse_addr(raw: &str) -> Result<SocketAddr, io::Error> {
    raw.parse()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, StatusCode};
    use axum::response::Response;
    use tower::ServiceExt;

    use crate::rendezvous::SessionDescription;

    fn server() -> HttpServer {
        HttpServer::new(BrokerConfig::default())
    }

    fn post(slot: &str, body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(format!("/{}", slot))
            .header(header::CONTENT_TYPE, "text/plain;charset=UTF-8")
            .body(body.into())
            .unwrap()
    }

    fn post_desc(slot: &str, desc: &SessionDescription) -> Request<Body> {
        post(slot, serde_json::to_vec(desc).unwrap())
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_desc(response: Response) -> SessionDescription {
        serde_json::from_str(&body_text(response).await).unwrap()
    }

    async fn wait_for_slot(server: &HttpServer, slot: &str) {
        let key = crate::rendezvous::SlotKey::try_from(slot).unwrap();
        for _ in 0..100 {
            if server.table().contains(&key) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("slot {} never opened", slot);
    }

    #[tokio::test]
    async fn index_page_served() {
        let response = server()
            .router()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("<title>minsig</title>"));
    }

    #[tokio::test]
    async fn full_rendezvous_over_router() {
        let server = server();
        let router = server.router();

        let offerer = tokio::spawn(
            router
                .clone()
                .oneshot(post_desc("room1", &SessionDescription::offer("X"))),
        );
        wait_for_slot(&server, "room1").await;

        let reflected = router
            .clone()
            .oneshot(post_desc("room1", &SessionDescription::offer("Y")))
            .await
            .unwrap();
        assert_eq!(reflected.status(), StatusCode::OK);
        assert_eq!(body_desc(reflected).await, SessionDescription::offer("X"));

        let ack = router
            .clone()
            .oneshot(post_desc("room1", &SessionDescription::answer("Z")))
            .await
            .unwrap();
        assert_eq!(ack.status(), StatusCode::OK);
        assert!(body_text(ack).await.is_empty());

        let answered = offerer.await.unwrap().unwrap();
        assert_eq!(answered.status(), StatusCode::OK);
        assert_eq!(body_desc(answered).await, SessionDescription::answer("Z"));
        assert!(server.table().is_empty());
    }

    #[tokio::test]
    async fn answer_without_offer_is_client_error() {
        let server = server();
        let response = server
            .router()
            .oneshot(post_desc("room2", &SessionDescription::answer("Z")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "no pending offer for slot");
        assert!(server.table().is_empty());
    }

    #[tokio::test]
    async fn malformed_body_is_client_error() {
        let server = server();
        let response = server
            .router()
            .oneshot(post("room", "{not json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(server.table().is_empty());
    }

    #[tokio::test]
    async fn unknown_type_is_client_error() {
        let response = server()
            .router()
            .oneshot(post("room", r#"{"type":"rollback","sdp":""}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_text(response).await,
            "invalid session description type"
        );
    }

    #[tokio::test]
    async fn overlong_slot_is_client_error() {
        let slot = "s".repeat(256);
        let response = server()
            .router()
            .oneshot(post_desc(&slot, &SessionDescription::offer("X")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let mut config = BrokerConfig::default();
        config.rendezvous.max_body_bytes = 16;
        let server = HttpServer::new(config);

        let response = server
            .router()
            .oneshot(post_desc("big", &SessionDescription::offer("x".repeat(64))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(server.table().is_empty());
    }

    #[tokio::test]
    async fn other_methods_are_rejected() {
        let response = server()
            .router()
            .oneshot(
                Request::builder()
                    .method(Method::PUT)
                    .uri("/room")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "invalid method");
    }

    #[tokio::test]
    async fn preflight_allows_post() {
        let response = server()
            .router()
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/room")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS],
            "POST, OPTIONS"
        );
    }

    #[tokio::test]
    async fn responses_carry_cors_and_request_id() {
        let response = server()
            .router()
            .oneshot(post_desc("room", &SessionDescription::answer("Z")))
            .await
            .unwrap();
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(response.headers().contains_key(X_REQUEST_ID));
    }

    #[tokio::test]
    async fn client_request_id_is_propagated() {
        let mut request = post_desc("room", &SessionDescription::answer("Z"));
        request
            .headers_mut()
            .insert(X_REQUEST_ID, HeaderValue::from_static("client-123"));
        let response = server().router().oneshot(request).await.unwrap();
        assert_eq!(response.headers()[X_REQUEST_ID], "client-123");
    }

    #[tokio::test]
    async fn closed_table_returns_unavailable() {
        let server = server();
        let router = server.router();

        let offerer = tokio::spawn(
            router
                .clone()
                .oneshot(post_desc("held", &SessionDescription::offer("X"))),
        );
        wait_for_slot(&server, "held").await;

        server.table().close();
        let response = offerer.await.unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn idle_timeout_returns_request_timeout() {
        let table = RendezvousTable::with_idle_timeout(Some(Duration::from_millis(50)));
        let server = HttpServer::with_table(BrokerConfig::default(), table);

        let response = server
            .router()
            .oneshot(post_desc("slow", &SessionDescription::offer("X")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        assert!(server.table().is_empty());
    }
}
