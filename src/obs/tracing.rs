// std
use std::time::Duration as StdDuration;
// self
use crate::{_prelude::*, flows::Stage};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedStage<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedStage<F> = F;

/// A span builder used by pipeline stages.
#[derive(Clone, Debug)]
pub struct StageSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl StageSpan {
	/// Creates a new span tagged with the stage and the invocation attempt number.
	pub fn new(stage: Stage, attempt: u32) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"principal_propagation.stage",
				stage = stage.as_str(),
				attempt
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (stage, attempt);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedStage<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Logs a state machine transition; `credential` is a fingerprint, never a token.
pub fn record_transition(from: &str, to: &str, credential: &str) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(from, to, credential, "pipeline transition");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (from, to, credential);
	}
}

/// Logs a failed stage with the error's secret-free display and its source chain.
pub fn record_stage_failure(stage: Stage, error: &(dyn StdError + 'static)) {
	#[cfg(feature = "tracing")]
	{
		let mut chain = error.to_string();
		let mut source = error.source();

		while let Some(cause) = source {
			chain.push_str(": ");
			chain.push_str(&cause.to_string());

			source = cause.source();
		}

		tracing::warn!(stage = stage.as_str(), error = %chain, "pipeline stage failed");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (stage, error);
	}
}

/// Logs one HTTP exchange: method, host, path, status, and latency only.
pub fn record_http_exchange(
	method: &str,
	host: &str,
	path: &str,
	status: Option<u16>,
	elapsed: StdDuration,
) {
	#[cfg(feature = "tracing")]
	{
		let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

		tracing::debug!(method, host, path, status, elapsed_ms, "http exchange");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (method, host, path, status, elapsed);
	}
}

/// Audit event emitted when certificate validation is disabled for a host.
pub fn record_insecure_tls(host: &str) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(host, "certificate validation disabled for resource endpoint");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = host;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = StageSpan::new(Stage::OnBehalfOf, 1);
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}

	#[test]
	fn event_helpers_accept_plain_values() {
		record_transition("idle", "hop_a_in_flight", "0123456789ab");
		record_http_exchange("POST", "login.example.com", "/token", Some(200), StdDuration::ZERO);
		record_insecure_tls("erp.example.com");
	}
}
