use super::checker::RegistrationCheck;
use super::errors::SinkError;
use super::types::StatusOutcome;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Receives the classified outcome of every cycle.
///
/// Written from a single loop, but implementations must synchronise internally
/// so readers on other tasks can observe the latest value.
pub trait MetricsSink: Send + Sync {
    fn set_pending(&self) -> Result<(), SinkError>;

    fn record_outcome(&self, outcome: &StatusOutcome) -> Result<(), SinkError>;
}

/// Runs one check immediately, then one per interval, until cancelled.
pub struct Scheduler<C, S> {
    checker: C,
    sink: Arc<S>,
    interval: Duration,
}

impl<C, S> Scheduler<C, S>
where
    C: RegistrationCheck,
    S: MetricsSink,
{
    pub fn new(checker: C, sink: Arc<S>, interval: Duration) -> Self {
        Self {
            checker,
            sink,
            interval,
        }
    }

    /// Drives the loop. Cancellation is observed between cycles only; an
    /// in-flight cycle is bounded by the per-request timeout.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), SinkError> {
        self.sink.set_pending()?;

        self.run_cycle().await;

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("registration scheduler stopped");
                    return Ok(());
                }
                _ = ticker.tick() => self.run_cycle().await,
            }
        }
    }

    /// Runs a single check and forwards its outcome, successful or not.
    pub async fn run_cycle(&self) {
        let outcome = match self.checker.check().await {
            Ok(outcome) => outcome,
            Err(failure) => {
                error!(error = %failure, "unable to get the registration status");
                failure.outcome
            }
        };
        debug!(status = %outcome.status, "registration check completed");

        if let Err(e) = self.sink.record_outcome(&outcome) {
            error!(error = %e, "unable to update registration status metric");
        }
    }
}
