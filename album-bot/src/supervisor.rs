use crate::shutdown::Shutdown;
use crate::types::{BotError, RestartPolicy, Result};
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use std::future::Future;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// Keep a background task alive.
///
/// `task` is called to start each run. Whenever a run ends without a shutdown
/// having been requested (error, panic, or plain return) the supervisor waits
/// with exponential backoff and starts a fresh run. A run lasting at least
/// `policy.healthy_after` resets the backoff.
pub async fn supervise<F, Fut>(name: &str, policy: &RestartPolicy, mut shutdown: Shutdown, mut task: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
        current_interval: policy.initial_interval,
        initial_interval: policy.initial_interval,
        max_interval: policy.max_interval,
        multiplier: 2.0,
        randomization_factor: 0.1,
        max_elapsed_time: None,
        ..Default::default()
    };
    let mut restarts: u32 = 0;

    loop {
        info!("Starting {}", name);
        let started = Instant::now();
        let outcome = tokio::spawn(task()).await;

        if shutdown.is_triggered() {
            info!("{} stopped", name);
            return Ok(());
        }

        match outcome {
            Ok(Ok(())) => warn!("{} exited unexpectedly", name),
            Ok(Err(e)) => error!("{} failed: {}", name, e),
            Err(e) if e.is_panic() => error!("{} panicked", name),
            Err(e) => error!("{} was cancelled: {}", name, e),
        }

        if started.elapsed() >= policy.healthy_after {
            backoff.reset();
        }

        if let Some(max) = policy.max_restarts {
            if restarts >= max {
                return Err(BotError::Supervisor(format!("{} gave up after {} restarts", name, restarts)));
            }
        }
        restarts += 1;

        let delay = backoff.next_backoff().unwrap_or(policy.max_interval);
        warn!("Restarting {} in {:?} (restart #{})", name, delay, restarts);

        tokio::select! {
            _ = shutdown.wait() => {
                info!("{} stopped during backoff", name);
                return Ok(());
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
