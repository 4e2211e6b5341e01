//! Recurring trigger with idempotent registration.
//!
//! The next run time of each event is persisted through a `ScheduleStore`,
//! so registering the same event again after a restart keeps the existing
//! slot instead of starting a new cadence.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::future::Future;
use tracing::{debug, info, warn};

pub const DAILY_PRICE_UPDATE_EVENT: &str = "daily_price_update";

#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn next_run(&self, event: &str) -> Result<Option<DateTime<Utc>>>;
    async fn set_next_run(&self, event: &str, at: DateTime<Utc>) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct Schedule {
    event: String,
    interval: Duration,
}

impl Schedule {
    pub fn new(event: &str, interval: Duration) -> Self {
        Self {
            event: event.to_string(),
            interval,
        }
    }

    pub fn daily(event: &str) -> Self {
        Self::new(event, Duration::days(1))
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Registers the event to run at `now` unless it is already scheduled.
    /// Returns the next run time.
    pub async fn ensure_scheduled(
        &self,
        store: &dyn ScheduleStore,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        if let Some(next) = store.next_run(&self.event).await? {
            debug!(event = %self.event, %next, "Already scheduled");
            return Ok(next);
        }
        store
            .set_next_run(&self.event, now)
            .await
            .with_context(|| format!("Failed to schedule event: {}", self.event))?;
        info!(event = %self.event, first_run = %now, "Scheduled recurring event");
        Ok(now)
    }

    /// Next slot after `previous` that lies strictly after `now`.
    ///
    /// Runs missed while nothing was polling collapse into the one that just
    /// happened.
    pub fn following_run(&self, previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
        let mut next = previous + self.interval;
        if next <= now && self.interval > Duration::zero() {
            let behind = (now - next).num_seconds() / self.interval.num_seconds().max(1);
            next = next + self.interval * (behind as i32);
            while next <= now {
                next = next + self.interval;
            }
        }
        next
    }

    pub fn runner<'a>(&'a self, store: &'a dyn ScheduleStore) -> ScheduleRunner<'a> {
        ScheduleRunner {
            schedule: self,
            store,
            next: None,
        }
    }
}

/// Polls one schedule from a long-running process.
///
/// The next slot is kept in memory once known. If the store cannot save the
/// following slot the runner still waits for it, so a broken store delays at
/// most persistence, never the cadence.
pub struct ScheduleRunner<'a> {
    schedule: &'a Schedule,
    store: &'a dyn ScheduleStore,
    next: Option<DateTime<Utc>>,
}

impl ScheduleRunner<'_> {
    /// Next slot known to this runner, if any poll has succeeded yet.
    pub fn next(&self) -> Option<DateTime<Utc>> {
        self.next
    }

    /// Runs `job` when the event is due at `now` and moves the event to its
    /// following slot. Returns whether the job ran.
    pub async fn poll<F, Fut>(&mut self, now: DateTime<Utc>, job: F) -> Result<bool>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let schedule = self.schedule;
        let event = schedule.event();
        let due_at = match self.next {
            Some(next) => next,
            None => schedule.ensure_scheduled(self.store, now).await?,
        };
        self.next = Some(due_at);
        if due_at > now {
            return Ok(false);
        }

        debug!(event, %due_at, "Running scheduled event");
        let result = job().await;

        let next = schedule.following_run(due_at, now);
        self.next = Some(next);
        match self.store.set_next_run(event, next).await {
            Ok(()) => debug!(event, %next, "Rescheduled"),
            Err(e) => warn!(event, %next, error = %e, "Failed to save next run"),
        }

        result.map(|_| true)
    }
}
