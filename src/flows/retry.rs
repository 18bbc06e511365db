//! Caller-visible retry around whole pipeline invocations.
//!
//! Hops never retry on their own. [`Pipeline::run_with_retry`] re-runs the entire chain as a
//! fresh invocation, and only while the previous failure is transient.

// std
use std::time::Duration as StdDuration;
// crates.io
use rand::Rng;
// self
use crate::{
	_prelude::*,
	auth::{Assertion, TokenSecret},
	flows::{Pipeline, Stage, pipeline},
	http::{HttpTransport, TransportErrorMapper},
	resource::ResourceRecord,
};

const DEFAULT_BASE_DELAY: StdDuration = StdDuration::from_millis(200);
const DEFAULT_MAX_DELAY: StdDuration = StdDuration::from_secs(5);

/// Bounded retry policy with exponential backoff and random jitter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Total number of invocations, the first one included. Values below `1` behave as `1`.
	pub max_attempts: u32,
	/// Delay before the second attempt; doubled for every attempt after it.
	pub base_delay: StdDuration,
	/// Upper bound for any single delay, `Retry-After` hints included.
	pub max_delay: StdDuration,
}
impl RetryPolicy {
	/// Policy that never retries.
	pub const fn none() -> Self {
		Self { max_attempts: 1, base_delay: StdDuration::ZERO, max_delay: StdDuration::ZERO }
	}

	/// Policy allowing up to `max_attempts` invocations with the default delays.
	pub const fn new(max_attempts: u32) -> Self {
		Self { max_attempts, base_delay: DEFAULT_BASE_DELAY, max_delay: DEFAULT_MAX_DELAY }
	}

	/// Overrides the base delay.
	pub const fn with_base_delay(mut self, base_delay: StdDuration) -> Self {
		self.base_delay = base_delay;

		self
	}

	/// Overrides the delay cap.
	pub const fn with_max_delay(mut self, max_delay: StdDuration) -> Self {
		self.max_delay = max_delay;

		self
	}

	fn attempts(&self) -> u32 {
		self.max_attempts.max(1)
	}

	/// Delay to wait after failed attempt number `attempt` (1-based).
	///
	/// The exponential delay keeps its lower half and randomizes the upper half. A `Retry-After`
	/// hint raises the result; the cap applies last.
	pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> StdDuration {
		let exponent = attempt.saturating_sub(1).min(16);
		let backoff = self.base_delay.saturating_mul(1 << exponent).min(self.max_delay);
		let half = backoff / 2;
		let jitter_ms = u64::try_from(half.as_millis()).unwrap_or(u64::MAX);
		let jittered = half
			+ StdDuration::from_millis(if jitter_ms == 0 {
				0
			} else {
				rand::rng().random_range(0..=jitter_ms)
			});
		let hinted = retry_after
			.and_then(|hint| StdDuration::try_from(hint).ok())
			.map_or(jittered, |hint| jittered.max(hint));

		hinted.min(self.max_delay)
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self::new(3)
	}
}

impl<C, M> Pipeline<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Runs the chain, re-running it from Hop A after transient failures.
	///
	/// Each attempt is an independent invocation with its own copy of the assertion. Permanent
	/// failures and exhausted attempts return the last error unchanged. A cancellation observed
	/// while waiting between attempts returns [`PipelineError::Cancelled`] for Hop A, the stage
	/// the abandoned attempt would have started with.
	pub async fn run_with_retry(
		&self,
		assertion: impl Into<String>,
		resource_id: &str,
		policy: &RetryPolicy,
		cancel: &CancellationToken,
	) -> Result<Vec<ResourceRecord>> {
		let query = pipeline::parse_query(resource_id)?;
		let assertion = TokenSecret::new(assertion);
		let max_attempts = policy.attempts();
		let mut attempt = 1;

		loop {
			let result = self
				.invocation_attempt(Assertion::from(assertion.clone()), query.clone(), attempt)
				.drive(cancel)
				.await;
			let err = match result {
				Ok(records) => return Ok(records),
				Err(e) => e,
			};

			if attempt >= max_attempts || !err.is_transient() {
				return Err(err);
			}

			let delay = policy.delay_for(attempt, err.retry_after());

			#[cfg(feature = "tracing")]
			tracing::info!(
				attempt,
				stage = err.stage().map(|stage| stage.as_str()),
				delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
				"retrying pipeline after transient failure"
			);

			tokio::select! {
				biased;
				_ = cancel.cancelled() => {
					return Err(PipelineError::Cancelled { stage: Stage::OnBehalfOf });
				},
				_ = tokio::time::sleep(delay) => {},
			}

			attempt += 1;
		}
	}
}
