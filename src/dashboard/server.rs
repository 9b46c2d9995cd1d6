//! Dashboard HTTP Server
//!
//! Axum-based server with embedded static files, compression, security
//! headers, and graceful shutdown. The access gate wraps every route.

use crate::config::Config;
use crate::dashboard::api::{health_router, AppState};
use crate::dashboard::auth::{gate_middleware, GateState};
use crate::dashboard::config::DashboardConfig;
use axum::{
    http::{header, HeaderValue, StatusCode},
    middleware,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use rust_embed::Embed;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Embedded static files for the dashboard
#[derive(Embed)]
#[folder = "src/dashboard/static/"]
struct StaticAssets;

/// Dashboard server
pub struct DashboardServer {
    config: DashboardConfig,
    gate: Arc<GateState>,
    health: Arc<AppState>,
}

impl DashboardServer {
    /// Create a new dashboard server from the startup configuration
    pub fn new(config: &Config) -> Self {
        Self::with_gate(config.dashboard.clone(), GateState::from_config(config))
    }

    /// Create with an explicit gate (tests pin the clock this way)
    pub fn with_gate(config: DashboardConfig, gate: GateState) -> Self {
        let health = Arc::new(AppState::new(gate.oracle().clone(), gate.allow_list().len()));
        Self {
            config,
            gate: Arc::new(gate),
            health,
        }
    }

    /// Build the router with all routes and middleware
    pub fn build_router(&self) -> Router {
        let mut router = Router::new()
            // Static file serving
            .route("/", get(index_handler))
            .route("/{*path}", get(static_handler))
            .nest("/api", health_router(self.health.clone()))
            .layer(CompressionLayer::new())
            // Gate wraps every route; nothing below runs for rejected requests
            .layer(middleware::from_fn_with_state(self.gate.clone(), gate_middleware))
            // Header hardening also applies to 401/403 responses
            .layer(SetResponseHeaderLayer::if_not_present(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                header::X_FRAME_OPTIONS,
                HeaderValue::from_static("DENY"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                header::REFERRER_POLICY,
                HeaderValue::from_static("no-referrer"),
            ));

        // Add request logging if enabled
        if self.config.log_requests {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Start the server and run until `shutdown` resolves
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.socket_addr();
        let router = self.build_router();

        info!("Starting dashboard server on {}", addr);

        let oracle = self.gate.oracle();
        info!(
            "Access gate: {} allow-list range(s), {} mode, zone {}",
            self.gate.allow_list().len(),
            oracle.mode().as_str(),
            oracle.timezone().name()
        );
        if self.gate.allow_list().is_empty() {
            warn!("Allow-list is empty - every request will be rejected with 403");
        }

        info!("Dashboard available at {}", self.config.base_url());

        let listener = tokio::net::TcpListener::bind(addr).await?;

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await?;

        info!("Dashboard server shut down gracefully");
        Ok(())
    }
}

/// Serve the index.html file
async fn index_handler() -> impl IntoResponse {
    match StaticAssets::get("index.html") {
        Some(content) => Html(content.data.into_owned()).into_response(),
        None => Html(FALLBACK_INDEX).into_response(),
    }
}

/// Serve static files from embedded assets
async fn static_handler(axum::extract::Path(path): axum::extract::Path<String>) -> impl IntoResponse {
    let path = path.trim_start_matches('/');

    // Security: prevent path traversal
    if path.contains("..") {
        return StatusCode::BAD_REQUEST.into_response();
    }

    match StaticAssets::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path)
                .first_or_octet_stream()
                .to_string();

            (
                [
                    (header::CONTENT_TYPE, mime),
                    // Responses are per-user behind auth; never cache in shared proxies
                    (header::CACHE_CONTROL, "private, max-age=3600".to_string()),
                ],
                content.data.into_owned(),
            )
                .into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Graceful shutdown signal handler
pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

/// Fallback index page when no static files are embedded
const FALLBACK_INDEX: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Dashboard</title>
</head>
<body>
    <h1>Dashboard</h1>
    <p>The dashboard UI is not installed.</p>
    <a href="/api/health">Health Check</a>
</body>
</html>"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cidr::AllowList;
    use crate::password::{PasswordMode, PasswordOracle};
    use axum::body::{to_bytes, Body};
    use axum::extract::ConnectInfo;
    use axum::http::Request;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use chrono::{DateTime, TimeZone, Utc};
    use tower::ServiceExt;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn test_server() -> DashboardServer {
        let gate = GateState::new(
            AllowList::from_specs(&["127.0.0.1/32"]),
            "admin",
            PasswordOracle::new(PasswordMode::Daily, "secret", "", chrono_tz::UTC, false),
        )
        .with_clock(Arc::new(fixed_now));

        DashboardServer::with_gate(
            DashboardConfig {
                log_requests: false,
                ..Default::default()
            },
            gate,
        )
    }

    fn authed(uri: &str) -> Request<Body> {
        let mut req = Request::builder()
            .uri(uri)
            .header(
                header::AUTHORIZATION,
                format!("Basic {}", STANDARD.encode("admin:secret-20240615")),
            )
            .body(Body::empty())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 50000))));
        req
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = test_server().build_router();

        let response = app.oneshot(authed("/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["status"], "ok");
        assert_eq!(json["password_mode"], "DAILY");
        assert!(json["uptime_secs"].is_number());
    }

    #[tokio::test]
    async fn test_liveness_endpoint() {
        let app = test_server().build_router();
        let response = app.oneshot(authed("/api/healthz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_index_returns_html() {
        let app = test_server().build_router();

        let response = app.oneshot(authed("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::X_CONTENT_TYPE_OPTIONS).unwrap(),
            "nosniff"
        );

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8_lossy(&body);
        assert!(html.contains("<!DOCTYPE html>"));
        assert!(html.contains("Dashboard"));
    }

    #[tokio::test]
    async fn test_static_asset_mime() {
        let app = test_server().build_router();

        let response = app.oneshot(authed("/style.css")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "text/css");
    }

    #[tokio::test]
    async fn test_path_traversal_blocked() {
        let app = test_server().build_router();
        let response = app.oneshot(authed("/../../etc/passwd")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_file_returns_404() {
        let app = test_server().build_router();
        let response = app.oneshot(authed("/nonexistent.js")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_no_connection_info_is_forbidden() {
        let app = test_server().build_router();
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            response.headers().get(header::X_FRAME_OPTIONS).unwrap(),
            "DENY"
        );
    }

    #[tokio::test]
    async fn test_gate_protects_static_routes() {
        let app = test_server().build_router();
        let mut request = Request::builder().uri("/style.css").body(Body::empty()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 50000))));

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }
}
