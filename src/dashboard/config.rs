//! Dashboard Configuration
//!
//! Listener settings for the dashboard server. Access control does not depend
//! on the bind address: every request passes the IP and Basic auth gate.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::config::parse_bool;

/// Dashboard server configuration
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Bind address (default: 0.0.0.0, the gate restricts access)
    pub bind_addr: IpAddr,
    /// Port number (default: 8080)
    pub port: u16,
    /// Enable request logging
    pub log_requests: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
            log_requests: true,
        }
    }
}

impl DashboardConfig {
    /// Create config from an arbitrary key/value source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("DASHBOARD_BIND_ADDR") {
            if let Ok(parsed) = addr.trim().parse() {
                config.bind_addr = parsed;
            }
        }

        if let Some(port) = lookup("DASHBOARD_PORT") {
            if let Ok(parsed) = port.trim().parse() {
                config.port = parsed;
            }
        }

        if let Some(val) = lookup("DASHBOARD_LOG_REQUESTS") {
            config.log_requests = parse_bool(&val);
        }

        config
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }

    /// Get the base URL for this server
    pub fn base_url(&self) -> String {
        let scheme = "http"; // HTTPS handled by reverse proxy
        format!("{}://{}:{}", scheme, self.bind_addr, self.port)
    }
}
