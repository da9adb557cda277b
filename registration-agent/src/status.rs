use pck_registration::registration::{MetricsSink, SinkError, StatusCode, StatusOutcome};
use std::sync::RwLock;
use tracing::{info, warn};

#[derive(Clone, Debug)]
/// Latest registration status as seen by readers of the board.
pub struct StatusSnapshot {
    pub outcome: StatusOutcome,
    /// Number of completed cycles since startup.
    pub cycles: u64,
}

/// In-process status sink shared between the scheduler and any reader.
pub struct StatusBoard {
    current: RwLock<StatusSnapshot>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(StatusSnapshot {
                outcome: StatusOutcome::pending(),
                cycles: 0,
            }),
        }
    }

    pub fn snapshot(&self) -> Result<StatusSnapshot, SinkError> {
        self.current
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| SinkError("status board lock poisoned".into()))
    }

    fn update(&self, outcome: StatusOutcome, completed_cycle: bool) -> Result<StatusSnapshot, SinkError> {
        let mut guard = self
            .current
            .write()
            .map_err(|_| SinkError("status board lock poisoned".into()))?;
        let previous = guard.outcome.status;
        guard.outcome = outcome;
        if completed_cycle {
            guard.cycles += 1;
        }
        if previous != guard.outcome.status {
            info!(from = %previous, to = %guard.outcome.status, "registration status changed");
        }
        Ok(guard.clone())
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSink for StatusBoard {
    fn set_pending(&self) -> Result<(), SinkError> {
        self.update(StatusOutcome::pending(), false).map(|_| ())
    }

    fn record_outcome(&self, outcome: &StatusOutcome) -> Result<(), SinkError> {
        let snapshot = self.update(outcome.clone(), true)?;
        match snapshot.outcome.status {
            StatusCode::RebootNeeded => {
                warn!("platform registered, reboot required before PCK retrieval")
            }
            StatusCode::ResetNeeded => {
                warn!("registration invalidated upstream, SGX reset required")
            }
            _ => {}
        }
        info!(
            status = %snapshot.outcome,
            cycles = snapshot.cycles,
            "registration status recorded"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_pending_without_cycles() {
        let board = StatusBoard::new();
        let snap = board.snapshot().unwrap();
        assert_eq!(snap.outcome.status, StatusCode::Pending);
        assert_eq!(snap.cycles, 0);
    }

    #[test]
    fn records_latest_outcome_and_counts_cycles() {
        let board = StatusBoard::new();
        board.set_pending().unwrap();
        board
            .record_outcome(&StatusOutcome::with_http(StatusCode::RetryNeeded, 500, None))
            .unwrap();
        board
            .record_outcome(&StatusOutcome::with_http(StatusCode::DirectlyRegistered, 200, None))
            .unwrap();

        let snap = board.snapshot().unwrap();
        assert_eq!(snap.outcome.status, StatusCode::DirectlyRegistered);
        assert_eq!(snap.outcome.http_status.as_deref(), Some("200"));
        assert_eq!(snap.cycles, 2);
    }

    #[test]
    fn set_pending_resets_status_but_not_cycle_count() {
        let board = StatusBoard::new();
        board
            .record_outcome(&StatusOutcome::new(StatusCode::ConnectFailed))
            .unwrap();
        board.set_pending().unwrap();

        let snap = board.snapshot().unwrap();
        assert_eq!(snap.outcome.status, StatusCode::Pending);
        assert_eq!(snap.cycles, 1);
    }
}
