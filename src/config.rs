//! Configuration management
//!
//! Everything is read once at startup into an immutable [`Config`] that is
//! handed to each component. Unset variables take defaults; unparseable ones
//! log a warning and fall back to the default instead of aborting startup.

use chrono::NaiveTime;
use chrono_tz::Tz;

use crate::dashboard::config::DashboardConfig;
use crate::password::PasswordMode;

pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_SECRET: &str = "changeme";
pub const DEFAULT_ALLOWED_IPS: &str = "127.0.0.1/32";

/// Service configuration
#[derive(Clone)]
pub struct Config {
    /// Zone whose midnight rotates the daily password
    pub timezone: Tz,

    /// Required Basic auth username (case-sensitive)
    pub basic_auth_user: String,

    pub password_mode: PasswordMode,

    /// Prefix of the daily password
    pub daily_secret: String,

    /// Password used in Static mode
    pub static_password: String,

    /// Also accept the previous day's password
    pub grace_period: bool,

    /// Raw allow-list entries (CIDR or bare address)
    pub allowed_ips: Vec<String>,

    /// Notification endpoint; the notifier is not started when unset
    pub webhook_url: Option<String>,

    /// Local time of day at which the notifier fires
    pub notify_time: NaiveTime,

    pub dashboard: DashboardConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::UTC,
            basic_auth_user: DEFAULT_USERNAME.to_string(),
            password_mode: PasswordMode::Daily,
            daily_secret: DEFAULT_SECRET.to_string(),
            static_password: DEFAULT_SECRET.to_string(),
            grace_period: false,
            allowed_ips: split_csv(DEFAULT_ALLOWED_IPS),
            webhook_url: None,
            notify_time: default_notify_time(),
            dashboard: DashboardConfig::default(),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("timezone", &self.timezone)
            .field("basic_auth_user", &self.basic_auth_user)
            .field("password_mode", &self.password_mode)
            .field("grace_period", &self.grace_period)
            .field("allowed_ips", &self.allowed_ips)
            .field("webhook_url", &self.webhook_url.as_ref().map(|_| "<set>"))
            .field("notify_time", &self.notify_time)
            .field("dashboard", &self.dashboard)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key/value source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(tz) = lookup("TIMEZONE") {
            match tz.trim().parse::<Tz>() {
                Ok(parsed) => config.timezone = parsed,
                Err(_) => tracing::warn!("Unknown TIMEZONE '{}', using {}", tz, config.timezone.name()),
            }
        }

        if let Some(user) = lookup("BASIC_AUTH_USER") {
            config.basic_auth_user = user;
        }

        if let Some(mode) = lookup("PASSWORD_MODE") {
            match mode.parse() {
                Ok(parsed) => config.password_mode = parsed,
                Err(e) => tracing::warn!("{}, using {}", e, config.password_mode.as_str()),
            }
        }

        if let Some(secret) = lookup("DAILY_SECRET") {
            config.daily_secret = secret;
        }

        if let Some(password) = lookup("STATIC_PASSWORD") {
            config.static_password = password;
        }

        if let Some(val) = lookup("PASSWORD_GRACE") {
            config.grace_period = parse_bool(&val);
        }

        if let Some(list) = lookup("ALLOWED_IPS") {
            config.allowed_ips = split_csv(&list);
        }

        config.webhook_url = lookup("WEBHOOK_URL")
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());

        if let Some(time) = lookup("NOTIFY_TIME") {
            match NaiveTime::parse_from_str(time.trim(), "%H:%M") {
                Ok(parsed) => config.notify_time = parsed,
                Err(_) => tracing::warn!("Invalid NOTIFY_TIME '{}', using {}", time, config.notify_time),
            }
        }

        config.dashboard = DashboardConfig::from_lookup(&lookup);

        if config.uses_default_password() {
            match config.password_mode {
                PasswordMode::Daily => {
                    tracing::warn!("DAILY_SECRET not set - using the built-in default secret")
                }
                PasswordMode::Static => {
                    tracing::warn!("STATIC_PASSWORD not set - using the built-in default password")
                }
            }
        }

        config
    }

    /// Whether the active mode still relies on the built-in default secret
    pub fn uses_default_password(&self) -> bool {
        match self.password_mode {
            PasswordMode::Daily => self.daily_secret == DEFAULT_SECRET,
            PasswordMode::Static => self.static_password == DEFAULT_SECRET,
        }
    }
}

pub(crate) fn parse_bool(val: &str) -> bool {
    matches!(val.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

fn split_csv(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn default_notify_time() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.timezone, chrono_tz::UTC);
        assert_eq!(config.basic_auth_user, "admin");
        assert_eq!(config.password_mode, PasswordMode::Daily);
        assert!(!config.grace_period);
        assert_eq!(config.allowed_ips, vec!["127.0.0.1/32"]);
        assert!(config.webhook_url.is_none());
        assert_eq!(config.notify_time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
    }

    #[test]
    fn test_full_override() {
        let config = Config::from_lookup(lookup_from(&[
            ("TIMEZONE", "Asia/Tokyo"),
            ("BASIC_AUTH_USER", "ops"),
            ("PASSWORD_MODE", "static"),
            ("DAILY_SECRET", "abc"),
            ("STATIC_PASSWORD", "xyz"),
            ("PASSWORD_GRACE", "true"),
            ("ALLOWED_IPS", "10.0.0.5/32, 192.168.0.0/16"),
            ("WEBHOOK_URL", "https://hooks.example.com/x"),
            ("NOTIFY_TIME", "07:30"),
        ]));

        assert_eq!(config.timezone, chrono_tz::Asia::Tokyo);
        assert_eq!(config.basic_auth_user, "ops");
        assert_eq!(config.password_mode, PasswordMode::Static);
        assert_eq!(config.daily_secret, "abc");
        assert_eq!(config.static_password, "xyz");
        assert!(config.grace_period);
        assert_eq!(config.allowed_ips, vec!["10.0.0.5/32", "192.168.0.0/16"]);
        assert_eq!(config.webhook_url.as_deref(), Some("https://hooks.example.com/x"));
        assert_eq!(config.notify_time, NaiveTime::from_hms_opt(7, 30, 0).unwrap());
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = Config::from_lookup(lookup_from(&[
            ("TIMEZONE", "Mars/Olympus"),
            ("PASSWORD_MODE", "hourly"),
            ("PASSWORD_GRACE", "maybe"),
            ("NOTIFY_TIME", "25:99"),
            ("WEBHOOK_URL", "  "),
        ]));

        assert_eq!(config.timezone, chrono_tz::UTC);
        assert_eq!(config.password_mode, PasswordMode::Daily);
        assert!(!config.grace_period);
        assert_eq!(config.notify_time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert!(config.webhook_url.is_none());
    }

    #[test]
    fn test_default_password_detected_per_mode() {
        assert!(Config::from_lookup(|_| None).uses_default_password());

        let config = Config::from_lookup(lookup_from(&[("PASSWORD_MODE", "STATIC")]));
        assert!(config.uses_default_password());

        let config = Config::from_lookup(lookup_from(&[
            ("PASSWORD_MODE", "STATIC"),
            ("STATIC_PASSWORD", "hunter2"),
        ]));
        assert!(!config.uses_default_password());

        // A custom daily secret does not cover an unset static password
        let config = Config::from_lookup(lookup_from(&[
            ("PASSWORD_MODE", "STATIC"),
            ("DAILY_SECRET", "abc"),
        ]));
        assert!(config.uses_default_password());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = Config::from_lookup(lookup_from(&[
            ("DAILY_SECRET", "d41ly-s3cr3t"),
            ("STATIC_PASSWORD", "st4t1c"),
            ("WEBHOOK_URL", "https://hooks.example.com/token123"),
        ]));
        let out = format!("{:?}", config);
        assert!(!out.contains("d41ly-s3cr3t"));
        assert!(!out.contains("st4t1c"));
        assert!(!out.contains("token123"));
    }
}
