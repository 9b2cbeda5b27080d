use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AutoApplyError;

/// Lifecycle state of a target.
///
/// `Pending → InProgress → {Submitted, Skipped, Failed, AwaitingHuman}`.
/// `AwaitingHuman` is a suspend state, not terminal: it resumes to
/// `InProgress` or the target is abandoned to `Skipped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetState {
    Pending,
    InProgress,
    Submitted,
    Skipped,
    Failed,
    AwaitingHuman,
}

impl TargetState {
    /// Terminal states are immutable once reached.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TargetState::Submitted | TargetState::Skipped | TargetState::Failed
        )
    }
}

impl std::fmt::Display for TargetState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetState::Pending => write!(f, "PENDING"),
            TargetState::InProgress => write!(f, "IN_PROGRESS"),
            TargetState::Submitted => write!(f, "SUBMITTED"),
            TargetState::Skipped => write!(f, "SKIPPED"),
            TargetState::Failed => write!(f, "FAILED"),
            TargetState::AwaitingHuman => write!(f, "AWAITING_HUMAN"),
        }
    }
}

/// Result of one capture→plan→validate→execute cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Continue,
    SubmissionDetected,
    SecurityCheckDetected,
    PlanRejected(String),
    ExecutionFailed(String),
}

/// One unit of work: a job posting processed end to end.
///
/// Owned exclusively by the queue runner and mutated only by the flow
/// controller assigned to it — never two controllers at once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub id: String,
    pub url: String,
    pub title: Option<String>,
    pub discovered_at: DateTime<Utc>,
    pub state: TargetState,
    pub state_history: Vec<TargetState>,
}

impl Target {
    pub fn new(url: String, title: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            url,
            title,
            discovered_at: Utc::now(),
            state: TargetState::Pending,
            state_history: Vec::new(),
        }
    }

    /// Transition to `next`, recording the previous state. Returns false (and
    /// changes nothing) if the current state is terminal.
    pub fn set_state(&mut self, next: TargetState) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state_history.push(self.state);
        self.state = next;
        true
    }
}

/// One entry of the jobs file handed to `autoapply run --jobs`.
#[derive(Debug, Deserialize)]
struct JobEntry {
    url: String,
    #[serde(default)]
    title: Option<String>,
}

/// Parse a jobs file (JSON array of `{"url", "title"?}`) into targets.
pub fn parse_jobs(json: &str, source: &str) -> Result<Vec<Target>, AutoApplyError> {
    let entries: Vec<JobEntry> = serde_json::from_str(json)?;
    if entries.is_empty() {
        return Err(AutoApplyError::NoTargets(source.to_string()));
    }
    Ok(entries
        .into_iter()
        .map(|e| Target::new(e.url, e.title))
        .collect())
}

/// Structured record produced when a flow controller finishes a target.
#[derive(Debug, Clone, Serialize)]
pub struct TargetReport {
    pub target_id: String,
    pub url: String,
    pub state: TargetState,
    pub cycles: u32,
    pub failures: u32,
    pub reason: Option<String>,
    pub state_transitions: Vec<TargetState>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl TargetReport {
    pub fn from_target(
        target: &Target,
        started_at: DateTime<Utc>,
        cycles: u32,
        failures: u32,
        reason: Option<String>,
    ) -> Self {
        let now = Utc::now();
        let mut transitions = target.state_history.clone();
        transitions.push(target.state);

        Self {
            target_id: target.id.clone(),
            url: target.url.clone(),
            state: target.state,
            cycles,
            failures,
            reason,
            state_transitions: transitions,
            started_at,
            completed_at: now,
            duration_ms: (now - started_at).num_milliseconds(),
        }
    }
}
