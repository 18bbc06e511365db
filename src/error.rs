//! Layered error types: transport, exchange hop, resource fetch, and the pipeline aggregate.
//!
//! Every layer wraps the failure below it and adds its own stage identity. Display strings never
//! contain request bodies, headers, or token material; the structured fields carry only status
//! codes, OAuth error codes, and parse locations.

// self
use crate::{
	_prelude::*,
	auth::IdentifierError,
	config::{ExchangeConfigError, FetchEndpointError},
	flows::Stage,
};

/// Crate-wide result type alias returning [`PipelineError`] by default.
pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Configuration and validation failures raised while assembling a pipeline.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A required environment variable is absent or empty.
	#[error("Missing configuration variable `{name}`.")]
	MissingVariable {
		/// Variable name.
		name: &'static str,
	},
	/// A port variable is not a valid TCP port.
	#[error("Configuration variable `{name}` is not a valid port.")]
	InvalidPort {
		/// Variable name.
		name: &'static str,
	},
	/// A boolean flag variable holds something other than `true` or `false`.
	#[error("Configuration variable `{name}` must be `true` or `false`.")]
	InvalidFlag {
		/// Variable name.
		name: &'static str,
	},
	/// Endpoint host/port/path could not be assembled into a URL.
	#[error("Endpoint URL is invalid.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Tenant identifier failed validation.
	#[error(transparent)]
	Tenant(#[from] IdentifierError),
	/// Token exchange configuration failed validation.
	#[error(transparent)]
	Exchange(#[from] ExchangeConfigError),
	/// Resource endpoint configuration failed validation.
	#[error(transparent)]
	Fetch(#[from] FetchEndpointError),
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, TLS, framing).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// DNS resolution, TCP connect, or TLS handshake failed.
	#[error("Connection to the remote endpoint failed.")]
	Connection {
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
	/// The request did not complete within the fixed upper bound.
	#[error("Request to the remote endpoint timed out.")]
	Timeout {
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
	/// The remote endpoint sent a malformed HTTP response, or the request could not be framed.
	#[error("Remote endpoint returned a malformed HTTP response.")]
	Protocol {
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
	/// Underlying I/O failure surfaced during transport.
	#[error("I/O error occurred while calling the remote endpoint.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a connect-phase failure.
	pub fn connection(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Connection { source: Box::new(src) }
	}

	/// Wraps a timeout failure.
	pub fn timeout(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Timeout { source: Box::new(src) }
	}

	/// Wraps a framing or decoding failure.
	pub fn protocol(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Protocol { source: Box::new(src) }
	}

	/// Returns `true` when a fresh attempt may succeed.
	pub fn is_transient(&self) -> bool {
		matches!(self, Self::Connection { .. } | Self::Timeout { .. } | Self::Io(_))
	}
}

/// Underlying cause of a failed token exchange hop.
#[derive(Debug, ThisError)]
pub enum HopFailure {
	/// The outbound request could not be constructed.
	#[error("Token request could not be constructed.")]
	Request(#[from] oauth2::http::Error),
	/// The transport failed before a response was received.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// The token endpoint answered with a non-2xx status.
	#[error("Token endpoint answered with HTTP {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// OAuth `error` code, when the body is an OAuth error document.
		oauth_error: Option<String>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// The 2xx body is not JSON or lacks the `access_token` field.
	#[error("Token endpoint returned a malformed response.")]
	MalformedResponse {
		/// Structured parsing failure (location only, never the body).
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// The 2xx body carries an empty `access_token`.
	#[error("Token endpoint returned an empty access token.")]
	EmptyAccessToken,
}
impl HopFailure {
	/// Returns `true` when a fresh attempt may succeed.
	pub fn is_transient(&self) -> bool {
		match self {
			Self::Transport(e) => e.is_transient(),
			Self::Status { status, oauth_error, .. } =>
				status_is_transient(*status, oauth_error.as_deref()),
			_ => false,
		}
	}

	/// Retry-After hint captured from the response, if any.
	pub fn retry_after(&self) -> Option<Duration> {
		match self {
			Self::Status { retry_after, .. } => *retry_after,
			_ => None,
		}
	}
}

/// Token exchange failure tagged with the hop that produced it.
#[derive(Debug, ThisError)]
#[error("Token exchange failed at the {stage} stage.")]
pub struct HopError {
	/// Hop that failed.
	pub stage: Stage,
	/// Underlying cause.
	#[source]
	pub cause: HopFailure,
}
impl HopError {
	/// Tags `cause` with the failing hop.
	pub fn new(stage: Stage, cause: impl Into<HopFailure>) -> Self {
		Self { stage, cause: cause.into() }
	}
}

/// Resource fetch failures.
#[derive(Debug, ThisError)]
pub enum FetchError {
	/// The outbound request could not be constructed.
	#[error("Resource request could not be constructed.")]
	Request(#[from] oauth2::http::Error),
	/// A header value (bearer token or resource identifier) is not valid in HTTP.
	#[error("Resource request header `{header}` has an invalid value.")]
	InvalidHeader {
		/// Header name.
		header: String,
	},
	/// The transport failed before a response was received.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// The resource endpoint answered with a non-2xx status.
	#[error("Resource endpoint answered with HTTP {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// The body is not the expected `{ "d": { "results": [...] } }` envelope.
	#[error("Resource endpoint returned an unexpected envelope.")]
	Envelope {
		/// Structured parsing failure (location only, never the body).
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl FetchError {
	/// Returns `true` when a fresh attempt may succeed.
	pub fn is_transient(&self) -> bool {
		match self {
			Self::Transport(e) => e.is_transient(),
			Self::Status { status, .. } => status_is_transient(*status, None),
			_ => false,
		}
	}

	/// Retry-After hint captured from the response, if any.
	pub fn retry_after(&self) -> Option<Duration> {
		match self {
			Self::Status { retry_after, .. } => *retry_after,
			_ => None,
		}
	}
}

/// Aggregate failure returned to pipeline callers.
///
/// Render [`PipelineError::user_message`] to end users; the `Display` output and the source chain
/// are meant for operators.
#[derive(Debug, ThisError)]
pub enum PipelineError {
	/// The caller-supplied resource identifier was rejected before any network call.
	#[error("Resource identifier is invalid.")]
	InvalidQuery(#[source] IdentifierError),
	/// One of the token exchange hops failed.
	#[error(transparent)]
	Hop(#[from] HopError),
	/// The resource fetch failed.
	#[error("Resource fetch failed.")]
	Fetch(#[from] FetchError),
	/// The caller cancelled the invocation.
	#[error("Pipeline was cancelled at the {stage} stage.")]
	Cancelled {
		/// Stage that was about to start or was in flight.
		stage: Stage,
	},
	/// The invocation already consumed its assertion.
	#[error("Pipeline invocation was already driven.")]
	AlreadyDriven,
}
impl PipelineError {
	/// Stage the invocation stopped at; `None` when it never left `Idle`.
	pub fn stage(&self) -> Option<Stage> {
		match self {
			Self::InvalidQuery(_) | Self::AlreadyDriven => None,
			Self::Hop(e) => Some(e.stage),
			Self::Fetch(_) => Some(Stage::ResourceFetch),
			Self::Cancelled { stage } => Some(*stage),
		}
	}

	/// Generic, secret-free message suitable for end users.
	pub fn user_message(&self) -> &'static str {
		match self {
			Self::InvalidQuery(_) => "The requested item identifier is not valid.",
			Self::Hop(_) => "Could not complete sign-in. Please try again.",
			Self::Fetch(_) => "Could not fetch the requested data. Please try again.",
			Self::Cancelled { .. } => "The request was cancelled.",
			Self::AlreadyDriven => "The request was already processed.",
		}
	}

	/// Returns `true` when re-running the whole pipeline may succeed.
	pub fn is_transient(&self) -> bool {
		match self {
			Self::Hop(e) => e.cause.is_transient(),
			Self::Fetch(e) => e.is_transient(),
			Self::InvalidQuery(_) | Self::Cancelled { .. } | Self::AlreadyDriven => false,
		}
	}

	/// Retry-After hint surfaced by the failing stage, if any.
	pub fn retry_after(&self) -> Option<Duration> {
		match self {
			Self::Hop(e) => e.cause.retry_after(),
			Self::Fetch(e) => e.retry_after(),
			_ => None,
		}
	}
}

fn status_is_transient(status: u16, oauth_error: Option<&str>) -> bool {
	if let Some(code) = oauth_error {
		if code.eq_ignore_ascii_case("temporarily_unavailable")
			|| code.eq_ignore_ascii_case("server_error")
		{
			return true;
		}
		if code.eq_ignore_ascii_case("invalid_grant")
			|| code.eq_ignore_ascii_case("invalid_client")
			|| code.eq_ignore_ascii_case("unauthorized_client")
		{
			return false;
		}
	}

	status == 429 || status >= 500
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn hop_error_display_names_stage_without_cause_details() {
		let err = HopError::new(Stage::SamlBearer, HopFailure::Status {
			status: 401,
			oauth_error: Some("invalid_client".into()),
			retry_after: None,
		});

		assert_eq!(err.to_string(), "Token exchange failed at the saml_bearer stage.");
		assert!(!err.cause.is_transient());
	}

	#[test]
	fn classifies_transient_statuses() {
		assert!(status_is_transient(503, None));
		assert!(status_is_transient(429, None));
		assert!(status_is_transient(400, Some("temporarily_unavailable")));
		assert!(!status_is_transient(500, Some("invalid_grant")));
		assert!(!status_is_transient(404, None));
	}

	#[test]
	fn pipeline_error_reports_stage_and_generic_message() {
		let cancelled = PipelineError::Cancelled { stage: Stage::ResourceFetch };

		assert_eq!(cancelled.stage(), Some(Stage::ResourceFetch));
		assert!(!cancelled.is_transient());

		let fetch = PipelineError::from(FetchError::Status {
			status: 503,
			retry_after: Some(Duration::seconds(3)),
		});

		assert_eq!(fetch.stage(), Some(Stage::ResourceFetch));
		assert!(fetch.is_transient());
		assert_eq!(fetch.retry_after(), Some(Duration::seconds(3)));
		assert_eq!(fetch.user_message(), "Could not fetch the requested data. Please try again.");
	}
}
