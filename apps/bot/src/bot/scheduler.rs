//! Poll Scheduler: single-flight, completion-then-reschedule.
//!
//! A cycle starts immediately, and each following cycle starts `interval` after
//! the previous one finished, so a slow walk delays the next one instead of
//! overlapping it.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info};

use crate::bot::error::FeedFetchError;
use crate::bot::walker::{log_report, NotificationWalker, WalkReport};

/// Work driven by the scheduler.
#[async_trait]
pub trait PollTask: Send {
    async fn run_cycle(&mut self) -> Result<WalkReport, FeedFetchError>;
}

#[async_trait]
impl PollTask for NotificationWalker {
    async fn run_cycle(&mut self) -> Result<WalkReport, FeedFetchError> {
        NotificationWalker::run_cycle(self).await
    }
}

pub struct PollScheduler {
    interval: Duration,
}

impl PollScheduler {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Runs `task` forever. Feed errors are logged and the next cycle proceeds
    /// as scheduled.
    pub async fn run<T: PollTask>(self, mut task: T) {
        info!(
            "Polling notifications every {}ms",
            self.interval.as_millis()
        );
        loop {
            match task.run_cycle().await {
                Ok(report) => log_report(&report),
                Err(e) => error!("Walk aborted, retrying next cycle: {e}"),
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}
