//! Client address resolution
//!
//! Assumes exactly one trusted reverse proxy that prepends `X-Forwarded-For`.
//! The proxy chain depth is not validated.

use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// Pick the address the allow-list should evaluate.
///
/// `None` means nothing usable was found; callers treat it as unmatched.
pub fn resolve(headers: &HeaderMap, connection: Option<SocketAddr>) -> Option<String> {
    if let Some(forwarded) = headers.get(FORWARDED_FOR) {
        // A present but unreadable header is not silently replaced by the peer address
        let value = forwarded.to_str().ok()?;
        let first = value.split(',').next()?.trim();
        if first.is_empty() {
            return None;
        }
        // Unparseable tokens pass through and fail the allow-list lookup
        return Some(match first.parse::<IpAddr>() {
            Ok(ip) => plain_ip(ip),
            Err(_) => first.to_string(),
        });
    }

    connection.map(|addr| plain_ip(addr.ip()))
}

/// Render an address as dotted-quad when it is IPv4 or IPv4-mapped IPv6
fn plain_ip(ip: IpAddr) -> String {
    match ip {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => v4.to_string(),
            None => v6.to_string(),
        },
        IpAddr::V4(v4) => v4.to_string(),
    }
}
