//! Per-target flow controller — the core state machine.
//!
//! One controller owns one target's lifecycle: it selects the apply flow,
//! drives the capture→plan→validate→execute cycle, detects submission and
//! security-check conditions, enforces the safety limit and the failure
//! budget, and yields a terminal [`TargetReport`]. The controller instance is
//! discarded once a terminal state is reached.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::sleep;

use super::target::{CycleOutcome, Target, TargetReport, TargetState};
use crate::browser::BrowserSession;
use crate::config::AutoApplyConfig;
use crate::executor;
use crate::plan::{self, DocumentSet};
use crate::planner::{PlanRequest, PlanSource};
use crate::snapshot;

/// Locator probed on the landing page to pick the in-place flow.
pub(crate) const EASY_APPLY_LOCATOR: &str = "//button[contains(translate(., \
     'ABCDEFGHIJKLMNOPQRSTUVWXYZ', 'abcdefghijklmnopqrstuvwxyz'), 'easy apply')] \
     | //a[contains(translate(., 'ABCDEFGHIJKLMNOPQRSTUVWXYZ', \
     'abcdefghijklmnopqrstuvwxyz'), 'easy apply')]";

/// Phrases that mark a completed submission in the post-execution snapshot.
const SUBMISSION_PHRASES: &[&str] = &[
    "application submitted",
    "application sent",
    "your application was sent",
    "thanks for applying",
    "thank you for applying",
];

/// Phrases that mark a security challenge. Detection is a mandatory halt.
const SECURITY_PHRASES: &[&str] = &[
    "security check",
    "captcha",
    "verify you are human",
    "verify you're human",
    "unusual activity",
    "are you a robot",
];

/// Which apply flow was selected for a target. Chosen once, never mid-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    /// In-place "Easy apply" flow on the landing page.
    Easy,
    /// External application site, opened in an isolated tab.
    External,
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowKind::Easy => write!(f, "easy-apply"),
            FlowKind::External => write!(f, "external"),
        }
    }
}

/// External signal resolving an `AwaitingHuman` suspension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Intervention {
    #[default]
    Pending,
    /// The challenge was resolved; automation may resume.
    Resolved,
    /// The target is abandoned; it becomes `Skipped`.
    Abandoned,
}

/// Safety limits for one target.
#[derive(Debug, Clone)]
pub struct FlowLimits {
    /// Maximum cycles before the target is forced to `Failed`.
    pub max_cycles: u32,
    /// Consecutive cycle failures tolerated before `Failed`.
    pub max_consecutive_failures: u32,
    /// Page re-inspection cadence while awaiting human intervention.
    pub poll_interval: Duration,
}

impl FlowLimits {
    pub fn from_config(config: &AutoApplyConfig) -> Self {
        Self {
            max_cycles: config.max_cycles,
            max_consecutive_failures: config.max_consecutive_failures,
            poll_interval: Duration::from_secs(config.poll_interval_secs),
        }
    }
}

impl Default for FlowLimits {
    fn default() -> Self {
        Self {
            max_cycles: 12,
            max_consecutive_failures: 3,
            poll_interval: Duration::from_secs(10),
        }
    }
}

enum HumanOutcome {
    Resumed,
    Abandoned(String),
}

/// Drives a single [`Target`] to a terminal state.
pub struct FlowController<'a, S, P> {
    session: &'a mut S,
    planner: &'a P,
    target: &'a mut Target,
    docs: &'a DocumentSet,
    profile: Option<String>,
    limits: FlowLimits,
    intervention: watch::Receiver<Intervention>,
    shutdown: watch::Receiver<bool>,
    cycles: u32,
    consecutive_failures: u32,
    total_failures: u32,
}

impl<'a, S: BrowserSession, P: PlanSource> FlowController<'a, S, P> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session: &'a mut S,
        planner: &'a P,
        target: &'a mut Target,
        docs: &'a DocumentSet,
        profile: Option<String>,
        limits: FlowLimits,
        intervention: watch::Receiver<Intervention>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            session,
            planner,
            target,
            docs,
            profile,
            limits,
            intervention,
            shutdown,
            cycles: 0,
            consecutive_failures: 0,
            total_failures: 0,
        }
    }

    /// Run the target to a terminal state and produce its report.
    pub async fn run(mut self) -> TargetReport {
        let started_at = Utc::now();
        self.target.set_state(TargetState::InProgress);

        let kind = match self.select_flow().await {
            Ok(kind) => kind,
            Err(reason) => return self.finish(started_at, TargetState::Failed, reason),
        };

        loop {
            if *self.shutdown.borrow() {
                return self.finish(started_at, TargetState::Skipped, "operator abort".into());
            }
            self.cycles += 1;
            if self.cycles > self.limits.max_cycles {
                return self.finish(
                    started_at,
                    TargetState::Failed,
                    "safety-limit-exceeded".into(),
                );
            }

            match self.run_cycle(kind).await {
                CycleOutcome::Continue => self.consecutive_failures = 0,
                CycleOutcome::SubmissionDetected => {
                    return self.finish(
                        started_at,
                        TargetState::Submitted,
                        "submission confirmed".into(),
                    );
                }
                CycleOutcome::SecurityCheckDetected => {
                    eprintln!(
                        "  ⏸ Security check detected for target {} — awaiting human",
                        self.target.id
                    );
                    self.target.set_state(TargetState::AwaitingHuman);
                    match self.await_human().await {
                        HumanOutcome::Resumed => {
                            self.target.set_state(TargetState::InProgress);
                            self.consecutive_failures = 0;
                        }
                        HumanOutcome::Abandoned(reason) => {
                            return self.finish(started_at, TargetState::Skipped, reason);
                        }
                    }
                }
                CycleOutcome::PlanRejected(reason) | CycleOutcome::ExecutionFailed(reason) => {
                    self.consecutive_failures += 1;
                    self.total_failures += 1;
                    log_cycle_failure(
                        self.consecutive_failures,
                        self.limits.max_consecutive_failures,
                        &reason,
                    );
                    if self.consecutive_failures >= self.limits.max_consecutive_failures {
                        return self.finish(started_at, TargetState::Failed, reason);
                    }
                }
            }
        }
    }

    /// Inspect the landing page once and pick the flow for this target.
    async fn select_flow(&mut self) -> Result<FlowKind, String> {
        self.session
            .navigate(&self.target.url)
            .await
            .map_err(|e| format!("navigate:{e}"))?;
        let easy = self
            .session
            .find_by_locator(EASY_APPLY_LOCATOR)
            .await
            .map(|els| !els.is_empty())
            .unwrap_or(false);
        if easy {
            return Ok(FlowKind::Easy);
        }
        self.session
            .open_isolated_tab(&self.target.url)
            .await
            .map_err(|e| format!("open-tab:{e}"))?;
        Ok(FlowKind::External)
    }

    /// One capture→plan→validate→execute round.
    async fn run_cycle(&mut self, kind: FlowKind) -> CycleOutcome {
        let snapshot = snapshot::capture(&mut *self.session).await;
        let request = PlanRequest {
            stage: kind.to_string(),
            uploads_available: true,
            profile: self.profile.clone(),
            snapshot,
        };

        let raw = match self.planner.request_plan(&request).await {
            Ok(raw) => raw,
            Err(e) => return CycleOutcome::ExecutionFailed(format!("plan-request:{e}")),
        };
        let plan = match plan::validate(&raw, self.session.viewport()) {
            Ok(plan) => plan,
            Err(reason) => return CycleOutcome::PlanRejected(reason),
        };

        // Strictly in plan order; each action completes or fails before the
        // next is issued, and a failure abandons the rest of the plan.
        for action in &plan.actions {
            if *self.shutdown.borrow() {
                break;
            }
            if let Err(reason) = executor::execute(&mut *self.session, action).await {
                return CycleOutcome::ExecutionFailed(reason);
            }
        }

        // An abort stops the cycle after the in-flight action; no further
        // browser mutation, the run loop forces the target to Skipped.
        if *self.shutdown.borrow() {
            return CycleOutcome::Continue;
        }

        if let Some(path) = plan::resolve_upload(plan.upload, self.docs) {
            if let Err(e) = self.session.upload_file(path).await {
                return CycleOutcome::ExecutionFailed(format!("upload:{e}"));
            }
        }

        // Both terminal signals come from the post-execution snapshot.
        let post = snapshot::capture(&mut *self.session).await;
        if contains_any(&post.visible_text, SUBMISSION_PHRASES) {
            return CycleOutcome::SubmissionDetected;
        }
        if contains_any(&post.visible_text, SECURITY_PHRASES) {
            return CycleOutcome::SecurityCheckDetected;
        }
        CycleOutcome::Continue
    }

    /// Suspend until the challenge is resolved or the target is abandoned.
    ///
    /// No click or type executes while suspended. Between signal checks the
    /// page is re-inspected read-only; the suspension ends early if the
    /// challenge phrase has cleared.
    async fn await_human(&mut self) -> HumanOutcome {
        // A signal sent before this suspension does not count: each challenge
        // needs its own resolution, observed as a fresh edge on the channel.
        self.intervention.mark_unchanged();
        loop {
            if *self.shutdown.borrow() {
                return HumanOutcome::Abandoned("operator abort".into());
            }

            tokio::select! {
                changed = self.intervention.changed() => {
                    if changed.is_err() {
                        // Signal source gone; page polling is the only way out.
                        sleep(self.limits.poll_interval).await;
                    } else {
                        match *self.intervention.borrow() {
                            Intervention::Resolved => return HumanOutcome::Resumed,
                            Intervention::Abandoned => {
                                return HumanOutcome::Abandoned(
                                    "security challenge abandoned".into(),
                                );
                            }
                            Intervention::Pending => continue,
                        }
                    }
                }
                changed = self.shutdown.changed() => {
                    if changed.is_ok() {
                        continue;
                    }
                    sleep(self.limits.poll_interval).await;
                }
                _ = sleep(self.limits.poll_interval) => {}
            }

            let snap = snapshot::capture(&mut *self.session).await;
            if !contains_any(&snap.visible_text, SECURITY_PHRASES) {
                return HumanOutcome::Resumed;
            }
        }
    }

    fn finish(
        &mut self,
        started_at: DateTime<Utc>,
        state: TargetState,
        reason: String,
    ) -> TargetReport {
        self.target.set_state(state);
        TargetReport::from_target(
            self.target,
            started_at,
            self.cycles,
            self.total_failures,
            Some(reason),
        )
    }
}

fn contains_any(text: &str, phrases: &[&str]) -> bool {
    let lower = text.to_lowercase();
    phrases.iter().any(|p| lower.contains(p))
}

fn log_cycle_failure(count: u32, max: u32, reason: &str) {
    eprintln!("  ↻ Cycle failure {count}/{max}: {reason}");
}
