// crates.io
use oauth2::HttpClientError;
// self
use crate::{_prelude::*, error::TransportError};

/// Maps HTTP client failures into the crate's [`TransportError`] taxonomy.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a [`TransportError`].
	fn map_transport_error(&self, error: HttpClientError<E>) -> TransportError;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(&self, err: HttpClientError<ReqwestError>) -> TransportError {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(*inner),
			HttpClientError::Http(inner) => TransportError::protocol(inner),
			HttpClientError::Io(inner) => TransportError::Io(inner),
			HttpClientError::Other(message) => TransportError::protocol(OtherTransportError(message)),
			_ => TransportError::protocol(OtherTransportError("unknown HTTP client failure".into())),
		}
	}
}

/// Message-only failure reported by a client that has no structured error for it.
#[derive(Debug, ThisError)]
#[error("{0}")]
pub struct OtherTransportError(pub String);

#[cfg(feature = "reqwest")]
fn map_reqwest_error(err: ReqwestError) -> TransportError {
	// Reqwest error displays may include the request URL but never headers or bodies.
	if err.is_timeout() {
		return TransportError::timeout(err);
	}
	if err.is_connect() {
		return TransportError::connection(err);
	}
	if err.is_decode() || err.is_body() || err.is_builder() || err.is_redirect() {
		return TransportError::protocol(err);
	}

	TransportError::connection(err)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[cfg(feature = "reqwest")]
	#[test]
	fn other_messages_become_protocol_errors() {
		let mapped = ReqwestTransportErrorMapper
			.map_transport_error(HttpClientError::Other("truncated response".into()));

		assert!(matches!(mapped, TransportError::Protocol { .. }));
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn io_errors_stay_io() {
		let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
		let mapped = ReqwestTransportErrorMapper.map_transport_error(HttpClientError::Io(io));

		assert!(matches!(mapped, TransportError::Io(_)));
	}
}
