//! Validated action plans and the whitelist validator.
//!
//! A plan is a single atomic instruction set for one cycle. Validation is
//! all-or-nothing: every action must pass before any action executes, so a
//! single bad entry rejects the whole plan and nothing runs. The action
//! vocabulary is exactly {click, type, wait} — scroll, keypress and script
//! actions are excluded by construction, not by omission.

use std::path::{Path, PathBuf};

use crate::browser::Viewport;
use crate::planner::{RawAction, RawPlan};

/// Upper bound for a single `wait` action, capping worst-case stall per cycle.
pub const MAX_WAIT_SECS: f64 = 30.0;

/// A whitelisted, validated action.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Pointer click at viewport pixel coordinates (element centroid).
    Click { x: i64, y: i64 },
    /// Inject text into the field named by `locator`, or the focused field
    /// when no locator is given.
    Type {
        locator: Option<String>,
        text: String,
        clear_first: bool,
    },
    /// Suspend the flow for the given duration.
    Wait { seconds: f64 },
}

/// Which tailored document to attach this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadChoice {
    Resume,
    CoverLetter,
    #[default]
    None,
}

/// A fully validated plan, safe to hand to the executor.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionPlan {
    pub actions: Vec<Action>,
    pub upload: UploadChoice,
    /// Diagnostic only; never executed.
    pub rationale: Option<String>,
}

/// The two opaque file handles produced by the document renderer. The core
/// never inspects their content, only routes them.
#[derive(Debug, Clone)]
pub struct DocumentSet {
    /// Merged resume + cover letter file.
    pub merged_resume: PathBuf,
    /// Cover-letter-only file.
    pub cover_letter: PathBuf,
}

/// Map an upload choice to the file to attach, if any. Pure and deterministic.
pub fn resolve_upload(choice: UploadChoice, docs: &DocumentSet) -> Option<&Path> {
    match choice {
        UploadChoice::Resume => Some(&docs.merged_resume),
        UploadChoice::CoverLetter => Some(&docs.cover_letter),
        UploadChoice::None => Option::None,
    }
}

/// Validate a raw plan against the whitelist and the current viewport.
///
/// The error string is the rejection reason; on any rejection the caller must
/// execute none of the actions.
pub fn validate(raw: &RawPlan, viewport: Viewport) -> Result<ActionPlan, String> {
    let upload = match raw.upload_choice.as_deref() {
        Option::None | Some("none") => UploadChoice::None,
        Some("resume") => UploadChoice::Resume,
        Some("cover_letter") => UploadChoice::CoverLetter,
        Some(other) => return Err(format!("invalid-upload-choice:{other}")),
    };

    let mut actions = Vec::with_capacity(raw.actions.len());
    for (index, action) in raw.actions.iter().enumerate() {
        actions.push(
            validate_action(action, viewport).map_err(|reason| format!("action[{index}]:{reason}"))?,
        );
    }

    Ok(ActionPlan {
        actions,
        upload,
        rationale: raw.comment.clone(),
    })
}

fn validate_action(raw: &RawAction, viewport: Viewport) -> Result<Action, String> {
    match raw.kind.as_str() {
        "click" => {
            let (x, y) = match (raw.x, raw.y) {
                (Some(x), Some(y)) => (x, y),
                _ => return Err("click-missing-coordinates".to_string()),
            };
            if !viewport.contains(x, y) {
                return Err(format!("click-out-of-viewport:{x},{y}"));
            }
            Ok(Action::Click { x, y })
        }
        "type" => {
            let text = raw.text.clone().ok_or("type-missing-text")?;
            let clear_first = raw.clear_first.unwrap_or(false);
            if clear_first && raw.locator.is_some() && text.trim().is_empty() {
                return Err("type-clear-with-empty-text".to_string());
            }
            Ok(Action::Type {
                locator: raw.locator.clone(),
                text,
                clear_first,
            })
        }
        "wait" => {
            let seconds = raw.seconds.ok_or("wait-missing-seconds")?;
            if !seconds.is_finite() || seconds <= 0.0 || seconds > MAX_WAIT_SECS {
                return Err(format!("wait-out-of-bounds:{seconds}"));
            }
            Ok(Action::Wait { seconds })
        }
        other => Err(format!("unsupported-action:{other}")),
    }
}
