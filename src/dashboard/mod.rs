//! Web Dashboard Module
//!
//! Serves the dashboard behind a two-layer access gate.
//!
//! # Security Model
//!
//! - **Network layer**: client IPv4 address must be in the CIDR allow-list
//! - **Application layer**: HTTP Basic auth with a password that rotates at
//!   midnight in the configured time zone
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  TraceLayer → security headers          │
//! │    → Access Gate (IP, then Basic auth)  │
//! │      → Compression                      │
//! ├─────────────────────────────────────────┤
//! │  GET /                 → Static files   │
//! │  GET /api/health       → Health check   │
//! │  GET /api/healthz      → Liveness       │
//! └─────────────────────────────────────────┘
//! ```

pub mod api;
pub mod auth;
pub mod client_ip;
pub mod config;
pub mod server;

pub use api::{health_router, AppState, HealthResponse};
pub use auth::{gate_middleware, Clock, Credentials, GateError, GateState, REALM};
pub use config::DashboardConfig;
pub use server::{shutdown_signal, DashboardServer};
