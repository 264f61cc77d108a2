use crate::shutdown::Shutdown;
use crate::types::Result;
use crate::utils::format_duration;
use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDateTime, NaiveTime};
use std::sync::Arc;
use tracing::{error, info};

/// Source of the local wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Work run once per scheduled fire.
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    fn job_name(&self) -> String;

    async fn run(&self) -> Result<()>;
}

/// First occurrence of `post_time` strictly after `now`.
pub fn next_fire_after(now: NaiveDateTime, post_time: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(post_time);
    if now < today {
        today
    } else {
        today + Duration::days(1)
    }
}

/// Runs a job once a day at a fixed local time of day.
pub struct DailyScheduler {
    post_time: NaiveTime,
    clock: Arc<dyn Clock>,
}

impl DailyScheduler {
    pub fn new(post_time: NaiveTime) -> Self {
        Self::with_clock(post_time, Arc::new(SystemClock))
    }

    pub fn with_clock(post_time: NaiveTime, clock: Arc<dyn Clock>) -> Self {
        Self { post_time, clock }
    }

    /// Time left until the next fire, measured from the clock's current time.
    pub fn time_until_next(&self) -> (NaiveDateTime, Duration) {
        let now = self.clock.now();
        let next = next_fire_after(now, self.post_time);
        (next, next - now)
    }

    /// Loop forever: sleep until the next fire, run the job, repeat.
    ///
    /// A failing job is logged and the loop carries on with the next day.
    /// Returns only when `shutdown` fires.
    pub async fn run(&self, job: Arc<dyn ScheduledJob>, mut shutdown: Shutdown) -> Result<()> {
        loop {
            let (next, wait) = self.time_until_next();
            info!("Next {} at {} (in {})", job.job_name(), next, format_duration(wait));

            let sleep = wait.to_std().unwrap_or_default();
            tokio::select! {
                _ = shutdown.wait() => {
                    info!("Scheduler stopping");
                    return Ok(());
                }
                _ = tokio::time::sleep(sleep) => {}
            }

            info!("Running {}", job.job_name());
            if let Err(e) = job.run().await {
                error!("{} failed, will retry at the next scheduled time: {}", job.job_name(), e);
            }
        }
    }
}
