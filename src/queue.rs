//! Sequential target queue.
//!
//! Targets run strictly one at a time: the runner hands the browser session
//! to one flow controller, waits for its terminal report, then moves on. The
//! queue never reorders and never runs two targets concurrently.

use serde::Serialize;
use tokio::sync::watch;

use crate::browser::BrowserSession;
use crate::flow::{FlowController, FlowLimits, Intervention, Target, TargetReport, TargetState};
use crate::plan::DocumentSet;
use crate::planner::PlanSource;
use crate::ui::RunProgress;

/// Aggregate outcome of one queue run.
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub submitted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub reports: Vec<TargetReport>,
}

impl RunSummary {
    fn record(&mut self, report: TargetReport) {
        match report.state {
            TargetState::Submitted => self.submitted += 1,
            TargetState::Skipped => self.skipped += 1,
            _ => self.failed += 1,
        }
        self.reports.push(report);
    }
}

/// Processes a batch of targets sequentially against one browser session.
pub struct QueueRunner<'a, S, P> {
    session: &'a mut S,
    planner: &'a P,
    docs: &'a DocumentSet,
    profile: Option<String>,
    limits: FlowLimits,
    /// Per-run cap; targets past this index are left untouched.
    max_targets: usize,
    intervention: watch::Receiver<Intervention>,
    shutdown: watch::Receiver<bool>,
    progress: Option<&'a RunProgress>,
}

impl<'a, S: BrowserSession, P: PlanSource> QueueRunner<'a, S, P> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session: &'a mut S,
        planner: &'a P,
        docs: &'a DocumentSet,
        profile: Option<String>,
        limits: FlowLimits,
        max_targets: usize,
        intervention: watch::Receiver<Intervention>,
        shutdown: watch::Receiver<bool>,
        progress: Option<&'a RunProgress>,
    ) -> Self {
        Self {
            session,
            planner,
            docs,
            profile,
            limits,
            max_targets,
            intervention,
            shutdown,
            progress,
        }
    }

    /// Run each pending target to a terminal state. One target's failure
    /// never aborts the rest of the queue; only shutdown does.
    pub async fn run(self, targets: &mut [Target]) -> RunSummary {
        let total = targets.len().min(self.max_targets);
        let mut summary = RunSummary::default();

        for (index, target) in targets.iter_mut().take(self.max_targets).enumerate() {
            if *self.shutdown.borrow() {
                break;
            }
            if let Some(progress) = self.progress {
                progress.target_started(index + 1, total, target);
            }

            let controller = FlowController::new(
                &mut *self.session,
                self.planner,
                target,
                self.docs,
                self.profile.clone(),
                self.limits.clone(),
                self.intervention.clone(),
                self.shutdown.clone(),
            );
            let report = controller.run().await;

            if let Some(progress) = self.progress {
                progress.target_finished(&report);
            }
            summary.record(report);
        }

        if let Err(e) = self.session.close().await {
            eprintln!("  Session close failed: {e}");
        }
        summary
    }
}
