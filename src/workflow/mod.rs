pub mod builder_session;
pub mod plan_ctx;
pub mod plan_flow;

pub use builder_session::BuilderSession;
pub use plan_ctx::PlanCtx;
pub use plan_flow::{PlanFlow, PlanOutcome, StepResult};
