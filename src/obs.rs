//! Optional observability helpers for pipeline stages.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to run each stage inside a span named `principal_propagation.stage` with
//!   the `stage` and `attempt` fields, and to log state transitions and HTTP exchanges.
//! - Enable `metrics` to increment the `principal_propagation_stage_total` counter for every
//!   attempt/success/failure/cancellation, labeled by `stage` + `outcome`.
//!
//! Nothing emitted here carries secret material: tokens appear only as
//! [`TokenSecret::fingerprint`](crate::auth::TokenSecret::fingerprint) digests.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Outcome labels recorded for each stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageOutcome {
	/// Stage started.
	Attempt,
	/// Stage produced its output.
	Success,
	/// Stage failed and the invocation stopped.
	Failure,
	/// Invocation was cancelled before or during the stage.
	Cancelled,
}
impl StageOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			StageOutcome::Attempt => "attempt",
			StageOutcome::Success => "success",
			StageOutcome::Failure => "failure",
			StageOutcome::Cancelled => "cancelled",
		}
	}
}
impl Display for StageOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
