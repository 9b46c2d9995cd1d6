//! Dashboard Access Gate
//!
//! Two layers in front of every dashboard request, evaluated in a fixed order:
//!
//! 1. **IP allow-list**: the resolved client address must fall inside one of
//!    the configured IPv4 CIDR ranges, otherwise `403`
//! 2. **Basic auth**: the configured username plus the password derived for
//!    the current day, otherwise `401` with a `WWW-Authenticate` challenge
//!
//! All `401` responses are identical regardless of which field was wrong.
//! Candidate passwords are never logged.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::cidr::AllowList;
use crate::config::Config;
use crate::dashboard::client_ip;
use crate::password::{secure_eq, PasswordOracle};

/// Realm sent in the Basic challenge
pub const REALM: &str = "Dashboard";

/// Body of the IP rejection
pub const FORBIDDEN_BODY: &str = "Forbidden: IP not allowed";

/// Body of every authentication challenge
pub const UNAUTHORIZED_BODY: &str = "Unauthorized";

/// Source of the current instant
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Gate rejections
#[derive(Debug, Error)]
pub enum GateError {
    #[error("Client address not allowed")]
    IpNotAllowed,

    #[error("Missing or malformed credentials")]
    MissingCredentials,

    #[error("Invalid credentials")]
    InvalidCredentials,
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        match self {
            GateError::IpNotAllowed => (StatusCode::FORBIDDEN, FORBIDDEN_BODY).into_response(),
            GateError::MissingCredentials | GateError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, format!("Basic realm=\"{}\"", REALM))],
                UNAUTHORIZED_BODY,
            )
                .into_response(),
        }
    }
}

/// Username and password from one request's Authorization header
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Parse `Basic <base64(user:password)>`, splitting on the first colon
    pub fn parse_basic(value: &str) -> Option<Self> {
        let (scheme, payload) = value.trim().split_once(|c: char| c.is_ascii_whitespace())?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }

        let decoded = STANDARD.decode(payload.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (user, password) = decoded.split_once(':')?;

        Some(Self {
            user: user.to_string(),
            password: password.to_string(),
        })
    }

    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        Self::parse_basic(value)
    }
}

/// Immutable gate state shared by all requests
pub struct GateState {
    allow_list: AllowList,
    username: String,
    oracle: PasswordOracle,
    clock: Clock,
}

impl GateState {
    pub fn new(allow_list: AllowList, username: impl Into<String>, oracle: PasswordOracle) -> Self {
        Self {
            allow_list,
            username: username.into(),
            oracle,
            clock: Arc::new(Utc::now),
        }
    }

    /// Build from the startup configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            AllowList::from_specs(&config.allowed_ips),
            config.basic_auth_user.clone(),
            PasswordOracle::from_config(config),
        )
    }

    /// Replace the wall clock (tests pin the instant this way)
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    pub fn oracle(&self) -> &PasswordOracle {
        &self.oracle
    }

    /// Evaluate one request using the configured clock
    pub fn check(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> Result<(), GateError> {
        self.check_at(headers, peer, (self.clock)())
    }

    /// Evaluate one request at a given instant
    pub fn check_at(
        &self,
        headers: &HeaderMap,
        peer: Option<SocketAddr>,
        now: DateTime<Utc>,
    ) -> Result<(), GateError> {
        let client = client_ip::resolve(headers, peer);
        let allowed = client
            .as_deref()
            .is_some_and(|ip| self.allow_list.contains(ip));
        if !allowed {
            debug!(client = ?client, "Rejected: address not in allow-list");
            return Err(GateError::IpNotAllowed);
        }

        let Some(credentials) = Credentials::from_headers(headers) else {
            debug!(client = ?client, "Challenge: no usable Basic credentials");
            return Err(GateError::MissingCredentials);
        };

        if !secure_eq(&credentials.user, &self.username) {
            debug!(client = ?client, "Challenge: unknown username");
            return Err(GateError::InvalidCredentials);
        }

        if !self.oracle.matches(&credentials.password, now) {
            debug!(client = ?client, user = %credentials.user, "Challenge: wrong password");
            return Err(GateError::InvalidCredentials);
        }

        Ok(())
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Access gate middleware, installed outside every dashboard route
pub async fn gate_middleware(
    State(state): State<Arc<GateState>>,
    req: Request,
    next: Next,
) -> Result<Response, GateError> {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    state.check(req.headers(), peer)?;

    Ok(next.run(req).await)
}

// ============================================================================
// Tests
// ============================================================================
