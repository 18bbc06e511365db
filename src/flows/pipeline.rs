//! Sequential orchestration of Hop A, Hop B, and the resource fetch.
//!
//! A [`PipelineInvocation`] owns the caller's [`Assertion`] and [`ResourceQuery`] and walks the
//! [`PipelineState`] machine exactly once. Each stage's output is moved into the next stage, so no
//! more than one token is alive at any point, and the query captured at entry reaches the fetch
//! untouched. The first failure stops the walk; cancellation is observed before every stage and
//! while each request is in flight.

// self
use crate::{
	_prelude::*,
	auth::{Assertion, ResourceId},
	flows::{Pipeline, PipelineState, Stage},
	http::{HttpTransport, TransportErrorMapper},
	obs::{self, StageOutcome, StageSpan},
	resource::{ResourceQuery, ResourceRecord},
};

impl<C, M> Pipeline<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Prepares an invocation in [`PipelineState::Idle`]; nothing is sent until it is driven.
	pub fn invocation(
		&self,
		assertion: impl Into<Assertion>,
		query: ResourceQuery,
	) -> PipelineInvocation<'_, C, M> {
		PipelineInvocation::new(self, assertion.into(), query, 1)
	}

	/// Runs the full chain for `resource_id` without external cancellation.
	pub async fn run(
		&self,
		assertion: impl Into<String>,
		resource_id: &str,
	) -> Result<Vec<ResourceRecord>> {
		self.run_with_cancellation(assertion, resource_id, &CancellationToken::new()).await
	}

	/// Runs the full chain for `resource_id`, stopping early once `cancel` fires.
	///
	/// An invalid identifier is rejected before any request is issued.
	pub async fn run_with_cancellation(
		&self,
		assertion: impl Into<String>,
		resource_id: &str,
		cancel: &CancellationToken,
	) -> Result<Vec<ResourceRecord>> {
		let query = parse_query(resource_id)?;

		self.invocation(Assertion::new(assertion), query).drive(cancel).await
	}

	pub(crate) fn invocation_attempt(
		&self,
		assertion: Assertion,
		query: ResourceQuery,
		attempt: u32,
	) -> PipelineInvocation<'_, C, M> {
		PipelineInvocation::new(self, assertion, query, attempt)
	}
}

/// One end-to-end run of the chain for a single caller request.
pub struct PipelineInvocation<'p, C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pipeline: &'p Pipeline<C, M>,
	assertion: Option<Assertion>,
	query: ResourceQuery,
	attempt: u32,
	credential: String,
	state: PipelineState,
	history: Vec<PipelineState>,
}
impl<'p, C, M> PipelineInvocation<'p, C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn new(
		pipeline: &'p Pipeline<C, M>,
		assertion: Assertion,
		query: ResourceQuery,
		attempt: u32,
	) -> Self {
		let credential = assertion.secret().fingerprint();

		Self {
			pipeline,
			assertion: Some(assertion),
			query,
			attempt,
			credential,
			state: PipelineState::Idle,
			history: vec![PipelineState::Idle],
		}
	}

	/// Current state.
	pub fn state(&self) -> PipelineState {
		self.state
	}

	/// Every state visited so far, starting with [`PipelineState::Idle`].
	pub fn history(&self) -> &[PipelineState] {
		&self.history
	}

	/// Query captured when the invocation was created.
	pub fn query(&self) -> &ResourceQuery {
		&self.query
	}

	/// Walks Hop A, Hop B, and the fetch in order, returning the fetched records.
	///
	/// The assertion is consumed by the first call; driving the same invocation again returns
	/// [`PipelineError::AlreadyDriven`] without touching the network.
	pub async fn drive(&mut self, cancel: &CancellationToken) -> Result<Vec<ResourceRecord>> {
		let assertion = self.assertion.take().ok_or(PipelineError::AlreadyDriven)?;
		let pipeline = self.pipeline;
		let saml = self
			.stage(Stage::OnBehalfOf, cancel, pipeline.on_behalf_of.exchange(assertion.into_secret()))
			.await?;
		let bearer = self
			.stage(Stage::SamlBearer, cancel, pipeline.saml_bearer.exchange(saml.into_secret()))
			.await?;
		let query = self.query.clone();
		let records =
			self.stage(Stage::ResourceFetch, cancel, pipeline.resource.fetch(bearer, &query)).await?;

		self.transition(PipelineState::Done);

		Ok(records)
	}

	async fn stage<T, E, F>(&mut self, stage: Stage, cancel: &CancellationToken, fut: F) -> Result<T>
	where
		E: 'static + StdError + Into<PipelineError>,
		F: Future<Output = Result<T, E>>,
	{
		let pipeline = self.pipeline;
		let metrics = &pipeline.metrics;

		if cancel.is_cancelled() {
			return Err(self.cancelled(stage));
		}

		self.transition(PipelineState::in_flight(stage));
		metrics.record_attempt(stage);
		obs::record_stage_outcome(stage, StageOutcome::Attempt);

		let span = StageSpan::new(stage, self.attempt);
		let outcome = tokio::select! {
			biased;
			_ = cancel.cancelled() => None,
			output = span.instrument(fut) => Some(output),
		};

		match outcome {
			None => Err(self.cancelled(stage)),
			Some(Ok(value)) => {
				metrics.record_success(stage);
				obs::record_stage_outcome(stage, StageOutcome::Success);

				Ok(value)
			},
			Some(Err(e)) => {
				metrics.record_failure(stage);
				obs::record_stage_outcome(stage, StageOutcome::Failure);
				obs::record_stage_failure(stage, &e);
				self.transition(PipelineState::Failed { stage });

				Err(e.into())
			},
		}
	}

	fn cancelled(&mut self, stage: Stage) -> PipelineError {
		self.pipeline.metrics.record_cancelled(stage);
		obs::record_stage_outcome(stage, StageOutcome::Cancelled);
		self.transition(PipelineState::Cancelled { stage });

		PipelineError::Cancelled { stage }
	}

	fn transition(&mut self, to: PipelineState) {
		obs::record_transition(self.state.as_str(), to.as_str(), &self.credential);

		self.state = to;
		self.history.push(to);
	}
}
impl<C, M> Debug for PipelineInvocation<'_, C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PipelineInvocation")
			.field("query", &self.query)
			.field("attempt", &self.attempt)
			.field("state", &self.state)
			.finish()
	}
}

pub(crate) fn parse_query(resource_id: &str) -> Result<ResourceQuery> {
	ResourceId::new(resource_id).map(ResourceQuery::new).map_err(PipelineError::InvalidQuery)
}
