//! Dashgate
//!
//! IP allow-list plus daily rotating Basic auth in front of a web dashboard.
//!
//! # Features
//!
//! - **CIDR allow-list**: IPv4 ranges, malformed entries dropped at startup
//! - **Daily password**: `<secret>-YYYYMMDD` in a fixed time zone, never stored
//! - **Grace period**: optionally accept yesterday's password after midnight
//! - **Daily notifier**: pushes today's password to a webhook once per day
//!
//! # Architecture
//!
//! ```text
//! Request ──► Client IP ──► Allow-list ──► Basic auth ──► Dashboard
//!                              │               │
//!                              403          401 + challenge
//!
//! Timer (09:00 local) ──► Password derivation ──► POST webhook
//! ```

pub mod cidr;
pub mod config;
pub mod dashboard;
pub mod notifier;
pub mod password;

pub use cidr::{AddrRange, AllowList};
pub use config::Config;
pub use dashboard::{DashboardServer, GateState};
pub use notifier::{DailyNotifier, NotifyError};
pub use password::{PasswordMode, PasswordOracle};
