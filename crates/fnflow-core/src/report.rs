//! Run Report: what happened during one pipeline invocation
use crate::error::{ErrorKind, StepError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a single run: `Pending -> Running -> {Succeeded, Failed, Cancelled}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Succeeded | RunState::Failed | RunState::Cancelled
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StepOutcome {
    Ok,
    Err { kind: ErrorKind, message: String },
    /// Cancellation was observed before this step started.
    Cancelled,
}

impl StepOutcome {
    pub fn from_error(err: &StepError) -> Self {
        StepOutcome::Err {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, StepOutcome::Ok)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,
    /// 1-based position in the pipeline.
    pub position: usize,
    pub started_at: DateTime<Utc>,
    pub latency_ms: u64,
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub trace_id: String,
    pub pipeline_id: String,
    pub fingerprint: String,
    pub state: RunState,
    pub steps: Vec<StepRecord>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunReport {
    /// Names of the steps that were actually invoked, in order.
    pub fn invoked(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| !matches!(s.outcome, StepOutcome::Cancelled))
            .map(|s| s.name.as_str())
            .collect()
    }

    /// The step that ended the run with an error, if any.
    pub fn failed_step(&self) -> Option<&StepRecord> {
        self.steps
            .iter()
            .find(|s| matches!(s.outcome, StepOutcome::Err { .. }))
    }

    pub fn total_latency_ms(&self) -> u64 {
        self.steps.iter().map(|s| s.latency_ms).sum()
    }
}
