//! Dashboard API Endpoints

pub mod health;

pub use health::{health_router, AppState, HealthResponse};
