pub mod attempt_ctx;
pub mod submission_flow;

pub use attempt_ctx::AttemptCtx;
pub use submission_flow::{FormDriver, Submitter};
