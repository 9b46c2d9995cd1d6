//! Password Derivation
//!
//! The dashboard password is never stored. It is recomputed on demand from the
//! configured secret and the current calendar date in a fixed time zone, so the
//! request gate and the daily notifier always agree on today's value.
//!
//! - **Daily**: `<secret>-<YYYYMMDD>`, rotating at midnight in the configured zone
//! - **Static**: the configured static password, forever

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use sha2::{Digest, Sha256};
use std::str::FromStr;

use crate::config::Config;

/// Which derivation rule applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PasswordMode {
    #[default]
    Daily,
    Static,
}

impl PasswordMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "DAILY",
            Self::Static => "STATIC",
        }
    }
}

impl FromStr for PasswordMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DAILY" => Ok(Self::Daily),
            "STATIC" => Ok(Self::Static),
            other => Err(format!("unknown password mode '{}'", other)),
        }
    }
}

/// Calendar date of `now` as seen in `tz`
pub fn local_date(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// Daily password for a given calendar date
pub fn daily_password(secret: &str, date: NaiveDate) -> String {
    format!("{}-{}", secret, date.format("%Y%m%d"))
}

/// Compute the single valid password at `now`
pub fn derive(
    mode: PasswordMode,
    secret: &str,
    static_password: &str,
    now: DateTime<Utc>,
    tz: Tz,
) -> String {
    match mode {
        PasswordMode::Static => static_password.to_string(),
        PasswordMode::Daily => daily_password(secret, local_date(now, tz)),
    }
}

/// Check a candidate against the password valid at `now`.
///
/// With `grace` in Daily mode, the previous calendar day's password (in the
/// same zone) is accepted too.
pub fn matches(
    candidate: &str,
    mode: PasswordMode,
    secret: &str,
    static_password: &str,
    now: DateTime<Utc>,
    tz: Tz,
    grace: bool,
) -> bool {
    match mode {
        PasswordMode::Static => secure_eq(candidate, static_password),
        PasswordMode::Daily => {
            let today = local_date(now, tz);
            if secure_eq(candidate, &daily_password(secret, today)) {
                return true;
            }
            if !grace {
                return false;
            }
            match today.pred_opt() {
                Some(yesterday) => secure_eq(candidate, &daily_password(secret, yesterday)),
                None => false,
            }
        }
    }
}

/// Compare via SHA-256 digests without early exit on the first differing byte
pub(crate) fn secure_eq(a: &str, b: &str) -> bool {
    let da = Sha256::digest(a.as_bytes());
    let db = Sha256::digest(b.as_bytes());
    da.iter().zip(db.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Password settings bundled from the startup configuration
#[derive(Clone)]
pub struct PasswordOracle {
    mode: PasswordMode,
    secret: String,
    static_password: String,
    tz: Tz,
    grace: bool,
}

// Manual impl keeps secrets out of debug output
impl std::fmt::Debug for PasswordOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordOracle")
            .field("mode", &self.mode)
            .field("tz", &self.tz)
            .field("grace", &self.grace)
            .finish_non_exhaustive()
    }
}

impl PasswordOracle {
    pub fn new(
        mode: PasswordMode,
        secret: impl Into<String>,
        static_password: impl Into<String>,
        tz: Tz,
        grace: bool,
    ) -> Self {
        Self {
            mode,
            secret: secret.into(),
            static_password: static_password.into(),
            tz,
            grace,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.password_mode,
            config.daily_secret.clone(),
            config.static_password.clone(),
            config.timezone,
            config.grace_period,
        )
    }

    pub fn mode(&self) -> PasswordMode {
        self.mode
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Password valid at `now` under the configured mode
    pub fn derive(&self, now: DateTime<Utc>) -> String {
        derive(self.mode, &self.secret, &self.static_password, now, self.tz)
    }

    /// Daily-mode password at `now`, regardless of the configured mode
    pub fn derive_daily(&self, now: DateTime<Utc>) -> String {
        daily_password(&self.secret, local_date(now, self.tz))
    }

    pub fn matches(&self, candidate: &str, now: DateTime<Utc>) -> bool {
        matches(
            candidate,
            self.mode,
            &self.secret,
            &self.static_password,
            now,
            self.tz,
            self.grace,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("DAILY".parse::<PasswordMode>().unwrap(), PasswordMode::Daily);
        assert_eq!("static".parse::<PasswordMode>().unwrap(), PasswordMode::Static);
        assert!("weekly".parse::<PasswordMode>().is_err());
    }

    #[test]
    fn test_daily_format() {
        let now = utc(2024, 3, 7, 12, 0);
        let pw = derive(PasswordMode::Daily, "s3cret", "unused", now, chrono_tz::UTC);
        assert_eq!(pw, "s3cret-20240307");
    }

    #[test]
    fn test_rotation_follows_configured_zone() {
        // 2024-03-07 16:30 UTC is already 2024-03-08 01:30 in Tokyo
        let now = utc(2024, 3, 7, 16, 30);
        let tokyo = derive(PasswordMode::Daily, "k", "", now, chrono_tz::Asia::Tokyo);
        let utc_pw = derive(PasswordMode::Daily, "k", "", now, chrono_tz::UTC);
        let ny = derive(PasswordMode::Daily, "k", "", now, chrono_tz::America::New_York);

        assert_eq!(tokyo, "k-20240308");
        assert_eq!(utc_pw, "k-20240307");
        assert_eq!(ny, "k-20240307");
    }

    #[test]
    fn test_rotation_boundary_is_local_midnight() {
        let tz = chrono_tz::Asia::Tokyo;
        // Tokyo is UTC+9: local midnight of 2024-03-08 is 15:00 UTC on the 7th
        let before = utc(2024, 3, 7, 14, 59);
        let after = utc(2024, 3, 7, 15, 0);
        assert_eq!(derive(PasswordMode::Daily, "k", "", before, tz), "k-20240307");
        assert_eq!(derive(PasswordMode::Daily, "k", "", after, tz), "k-20240308");
    }

    #[test]
    fn test_matches_current_day() {
        let oracle = PasswordOracle::new(PasswordMode::Daily, "k", "", chrono_tz::Europe::Berlin, false);
        for hour in [0, 5, 11, 22, 23] {
            let now = utc(2024, 12, 31, hour, 45);
            assert!(oracle.matches(&oracle.derive(now), now));
        }
    }

    #[test]
    fn test_yesterday_rejected_without_grace() {
        let oracle = PasswordOracle::new(PasswordMode::Daily, "k", "", chrono_tz::UTC, false);
        let day0 = utc(2024, 2, 28, 10, 0);
        let pw = oracle.derive(day0);

        assert!(oracle.matches(&pw, day0));
        assert!(!oracle.matches(&pw, day0 + Duration::days(1)));
    }

    #[test]
    fn test_grace_accepts_exactly_one_extra_day() {
        let oracle = PasswordOracle::new(PasswordMode::Daily, "k", "", chrono_tz::UTC, true);
        let day0 = utc(2024, 2, 28, 10, 0);
        let pw = oracle.derive(day0);

        assert!(oracle.matches(&pw, day0));
        assert!(oracle.matches(&pw, day0 + Duration::days(1)));
        assert!(!oracle.matches(&pw, day0 + Duration::days(2)));
        // Grace never looks forward
        assert!(!oracle.matches(&pw, day0 - Duration::days(1)));
    }

    #[test]
    fn test_grace_uses_zone_calendar_day() {
        let tz = chrono_tz::America::New_York;
        let oracle = PasswordOracle::new(PasswordMode::Daily, "k", "", tz, true);
        // 03:00 UTC on Mar 1 is still Feb 29 evening in New York
        let now = utc(2024, 3, 1, 3, 0);
        assert_eq!(oracle.derive(now), "k-20240229");
        assert!(oracle.matches("k-20240228", now));
        assert!(!oracle.matches("k-20240301", now));
    }

    #[test]
    fn test_static_mode_ignores_time() {
        let oracle = PasswordOracle::new(PasswordMode::Static, "k", "hunter2:x", chrono_tz::UTC, true);
        let t1 = utc(2020, 1, 1, 0, 0);
        let t2 = utc(2031, 7, 19, 23, 59);

        assert!(oracle.matches("hunter2:x", t1));
        assert!(oracle.matches("hunter2:x", t2));
        assert!(!oracle.matches("hunter2", t1));
        assert!(!oracle.matches(&oracle.derive_daily(t1), t1));
        assert_eq!(oracle.derive(t2), "hunter2:x");
    }

    #[test]
    fn test_derive_daily_ignores_mode() {
        let oracle = PasswordOracle::new(PasswordMode::Static, "k", "fixed", chrono_tz::UTC, false);
        assert_eq!(oracle.derive_daily(utc(2025, 1, 2, 9, 0)), "k-20250102");
    }

    #[test]
    fn test_debug_hides_secrets() {
        let oracle = PasswordOracle::new(PasswordMode::Daily, "topsecret", "alsosecret", chrono_tz::UTC, false);
        let out = format!("{:?}", oracle);
        assert!(!out.contains("topsecret"));
        assert!(!out.contains("alsosecret"));
    }
}
