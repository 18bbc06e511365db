//! Per-stage counters owned by a pipeline.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::flows::Stage;

/// Thread-safe per-stage counters shared by every invocation of one pipeline.
#[derive(Debug, Default)]
pub struct StageMetrics {
	stages: [StageCounters; 3],
}
impl StageMetrics {
	/// Number of times `stage` was started (its request was issued).
	pub fn attempts(&self, stage: Stage) -> u64 {
		self.stages[stage.index()].attempts.load(Ordering::Relaxed)
	}

	/// Number of times `stage` produced its output.
	pub fn successes(&self, stage: Stage) -> u64 {
		self.stages[stage.index()].success.load(Ordering::Relaxed)
	}

	/// Number of times `stage` failed.
	pub fn failures(&self, stage: Stage) -> u64 {
		self.stages[stage.index()].failure.load(Ordering::Relaxed)
	}

	/// Number of invocations cancelled before or during `stage`.
	pub fn cancellations(&self, stage: Stage) -> u64 {
		self.stages[stage.index()].cancelled.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self, stage: Stage) {
		self.stages[stage.index()].attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self, stage: Stage) {
		self.stages[stage.index()].success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self, stage: Stage) {
		self.stages[stage.index()].failure.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_cancelled(&self, stage: Stage) {
		self.stages[stage.index()].cancelled.fetch_add(1, Ordering::Relaxed);
	}
}

#[derive(Debug, Default)]
struct StageCounters {
	attempts: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
	cancelled: AtomicU64,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn counters_are_tracked_per_stage() {
		let metrics = StageMetrics::default();

		metrics.record_attempt(Stage::OnBehalfOf);
		metrics.record_success(Stage::OnBehalfOf);
		metrics.record_attempt(Stage::SamlBearer);
		metrics.record_failure(Stage::SamlBearer);
		metrics.record_cancelled(Stage::ResourceFetch);

		assert_eq!(metrics.attempts(Stage::OnBehalfOf), 1);
		assert_eq!(metrics.successes(Stage::OnBehalfOf), 1);
		assert_eq!(metrics.failures(Stage::SamlBearer), 1);
		assert_eq!(metrics.attempts(Stage::ResourceFetch), 0);
		assert_eq!(metrics.cancellations(Stage::ResourceFetch), 1);
	}
}
