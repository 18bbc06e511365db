//! Pipeline stages and the orchestrator that sequences them.

pub mod common;
pub mod exchange;
pub mod fetch;
pub mod metrics;
pub mod pipeline;
pub mod retry;

pub use common::*;
pub use exchange::*;
pub use fetch::*;
pub use metrics::*;
pub use pipeline::*;
pub use retry::*;

// self
use crate::{
	_prelude::*,
	config::PipelineConfig,
	http::{HttpTransport, Transport, TransportErrorMapper},
};
#[cfg(feature = "reqwest")]
use crate::{
	error::ConfigError,
	http::{ReqwestHttpClient, ReqwestTransportErrorMapper},
	obs,
};

#[cfg(feature = "reqwest")]
/// Pipeline specialized for the crate's default reqwest transport stack.
pub type ReqwestPipeline = Pipeline<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Delegated token exchange pipeline: Hop A, then Hop B, then the resource fetch.
///
/// The pipeline holds only immutable configuration and shared transports, so one value (or its
/// clones) can serve any number of concurrent invocations. Every invocation starts from scratch;
/// nothing issued by one invocation is visible to another.
pub struct Pipeline<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Hop A: on-behalf-of exchange.
	pub on_behalf_of: TokenExchange<C, M>,
	/// Hop B: SAML-bearer exchange.
	pub saml_bearer: TokenExchange<C, M>,
	/// Resource collection read.
	pub resource: ResourceFetch<C, M>,
	/// Per-stage counters shared by every invocation.
	pub metrics: Arc<StageMetrics>,
}
impl<C, M> Pipeline<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a pipeline that sends token requests through `token_transport` and the resource
	/// read through `resource_transport`.
	///
	/// The two transports may be the same; they are split so the resource host can carry its own
	/// TLS settings.
	pub fn with_transports(
		config: PipelineConfig,
		token_transport: Transport<C, M>,
		resource_transport: Transport<C, M>,
	) -> Self {
		let PipelineConfig { on_behalf_of, saml_bearer, fetch } = config;

		Self {
			on_behalf_of: TokenExchange::new(on_behalf_of, token_transport.clone()),
			saml_bearer: TokenExchange::new(saml_bearer, token_transport),
			resource: ResourceFetch::new(fetch, resource_transport),
			metrics: Default::default(),
		}
	}
}
#[cfg(feature = "reqwest")]
impl Pipeline<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a pipeline backed by reqwest clients built from `config`.
	///
	/// Token endpoints always validate certificates. The resource client skips validation only
	/// when [`FetchEndpoint::accept_invalid_certs`](crate::config::FetchEndpoint) is set, and an
	/// audit event is logged once when that happens.
	pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
		let insecure = config.fetch.accept_invalid_certs;

		if insecure {
			obs::record_insecure_tls(config.fetch.url.host_str().unwrap_or_default());
		}

		let mapper = Arc::new(ReqwestTransportErrorMapper);
		let token_transport = Transport::new(ReqwestHttpClient::new(false)?, Arc::clone(&mapper));
		let resource_transport = Transport::new(ReqwestHttpClient::new(insecure)?, mapper);

		Ok(Self::with_transports(config, token_transport, resource_transport))
	}
}
impl<C, M> Clone for Pipeline<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			on_behalf_of: self.on_behalf_of.clone(),
			saml_bearer: self.saml_bearer.clone(),
			resource: self.resource.clone(),
			metrics: Arc::clone(&self.metrics),
		}
	}
}
impl<C, M> Debug for Pipeline<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Pipeline")
			.field("on_behalf_of", &self.on_behalf_of)
			.field("saml_bearer", &self.saml_bearer)
			.field("resource", &self.resource)
			.finish()
	}
}
