pub mod client;
pub mod error;
pub mod types;

pub use client::GeminiPlanner;
pub use error::PlannerError;
pub use types::{PlanRequest, RawAction, RawPlan};

/// Seam for the plan request. The flow controller is generic over this so
/// tests can script plans without a network, mirroring the production
/// [`GeminiPlanner`].
pub trait PlanSource {
    async fn request_plan(&self, req: &PlanRequest) -> Result<RawPlan, PlannerError>;
}
