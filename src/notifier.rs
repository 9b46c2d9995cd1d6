//! Daily Password Notifier
//!
//! Once per calendar day, at a fixed wall-clock time in the configured zone,
//! derives today's password and POSTs it to a webhook:
//!
//! ```text
//! POST <WEBHOOK_URL>
//! Content-Type: application/json
//!
//! {"password": "<secret>-YYYYMMDD"}
//! ```
//!
//! Delivery failures are logged and dropped. There is no retry queue; the next
//! opportunity is the following day's fire.

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::password::{local_date, PasswordOracle};

/// Outbound request timeout
const WEBHOOK_TIMEOUT_SECS: u64 = 10;

/// Max characters of a failed response body kept for logging
const BODY_EXCERPT_CHARS: usize = 200;

/// Sentinel for "never fired"
const NEVER: i32 = i32::MIN;

/// Notification delivery errors
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Webhook returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Webhook body
#[derive(Debug, Serialize)]
pub struct PasswordPayload<'a> {
    pub password: &'a str,
}

/// First instant strictly after `now` at which the clock in `tz` reads `at`.
///
/// A time skipped by a DST gap resolves to the first valid local minute after
/// it; an ambiguous time resolves to its earliest occurrence.
pub fn next_fire_after(now: DateTime<Utc>, at: NaiveTime, tz: Tz) -> DateTime<Utc> {
    let today = local_date(now, tz);

    for offset in 0..=2 {
        let Some(date) = today.checked_add_days(Days::new(offset)) else {
            break;
        };
        if let Some(candidate) = resolve_local(date, at, tz) {
            if candidate > now {
                return candidate;
            }
        }
    }

    now + Duration::days(1)
}

fn resolve_local(date: NaiveDate, at: NaiveTime, tz: Tz) -> Option<DateTime<Utc>> {
    let naive = date.and_time(at);
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            // DST gaps are at most a few hours
            (1..=180).find_map(|m| {
                tz.from_local_datetime(&(naive + Duration::minutes(m)))
                    .earliest()
            })
        })
        .map(|dt| dt.with_timezone(&Utc))
}

/// Counters for notifier monitoring
#[derive(Debug, Default)]
pub struct NotifierStats {
    pub sent: AtomicU64,
    pub failed: AtomicU64,
    pub skipped: AtomicU64,
}

/// Background notifier for the daily password
pub struct DailyNotifier {
    client: reqwest::Client,
    webhook_url: String,
    oracle: PasswordOracle,
    notify_time: NaiveTime,
    /// Zone date (days from CE) of the last scheduled fire
    last_fired: AtomicI32,
    scheduled: AtomicBool,
    stats: NotifierStats,
}

impl DailyNotifier {
    pub fn new(webhook_url: impl Into<String>, oracle: PasswordOracle, notify_time: NaiveTime) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(WEBHOOK_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self {
            client,
            webhook_url: webhook_url.into(),
            oracle,
            notify_time,
            last_fired: AtomicI32::new(NEVER),
            scheduled: AtomicBool::new(false),
            stats: NotifierStats::default(),
        }
    }

    /// Build from config; `None` when no webhook is configured
    pub fn from_config(config: &Config) -> Option<Self> {
        let url = config.webhook_url.as_ref()?;
        Some(Self::new(
            url.clone(),
            PasswordOracle::from_config(config),
            config.notify_time,
        ))
    }

    pub fn stats(&self) -> &NotifierStats {
        &self.stats
    }

    /// Derive the daily password for `now` and deliver it once
    pub async fn fire(&self, now: DateTime<Utc>) -> Result<(), NotifyError> {
        let password = self.oracle.derive_daily(now);

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&PasswordPayload { password: &password })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Status {
                status,
                body: body.chars().take(BODY_EXCERPT_CHARS).collect(),
            });
        }

        Ok(())
    }

    /// Scheduled fire: at most one delivery per zone date, failures swallowed
    pub async fn fire_scheduled(&self, now: DateTime<Utc>) {
        let today = local_date(now, self.oracle.timezone());
        let prev = self
            .last_fired
            .swap(today.num_days_from_ce(), Ordering::SeqCst);

        if prev == today.num_days_from_ce() {
            debug!(date = %today, "Password notification already sent today, skipping");
            self.stats.skipped.fetch_add(1, Ordering::Relaxed);
            return;
        }

        match self.fire(now).await {
            Ok(()) => {
                info!(date = %today, "Daily password notification sent");
                self.stats.sent.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                warn!(date = %today, "Daily password notification failed: {}", e);
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Spawn the single recurring trigger.
    ///
    /// Returns `None` if this notifier was already scheduled.
    pub fn schedule(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> Option<JoinHandle<()>> {
        if self.scheduled.swap(true, Ordering::SeqCst) {
            warn!("Daily notifier already scheduled, ignoring");
            return None;
        }

        Some(tokio::spawn(self.run(shutdown)))
    }

    async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let tz = self.oracle.timezone();
        info!(
            "Starting daily notifier at {} {}",
            self.notify_time.format("%H:%M"),
            tz.name()
        );

        loop {
            let now = Utc::now();
            let next = next_fire_after(now, self.notify_time, tz);
            info!(next = %next, "Next password notification scheduled");

            let wait = (next - now).to_std().unwrap_or_default();

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Daily notifier shutting down");
                        return;
                    }
                    continue;
                }
            }

            // Monotonic sleep can drift from the wall clock; re-arm if early
            let now = Utc::now();
            if now < next {
                continue;
            }

            self.fire_scheduled(now).await;
        }
    }
}
