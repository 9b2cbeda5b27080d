//! Target lifecycle and the per-target flow state machine.

pub mod controller;
pub mod target;

pub use controller::{FlowController, FlowKind, FlowLimits, Intervention};
pub use target::{CycleOutcome, Target, TargetReport, TargetState, parse_jobs};
