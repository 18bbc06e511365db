//! Transport primitives for token exchanges and the resource fetch.
//!
//! [`HttpTransport`] is the pipeline's only dependency on an HTTP stack. A transport sends one
//! fully buffered request and returns the buffered response; it never interprets status codes.
//! [`TransportErrorMapper`] folds client-specific failures into the crate's
//! [`TransportError`] taxonomy, and [`Transport`] pairs the two so flows can issue requests
//! without knowing which client sits underneath.

mod mapper;

pub use mapper::*;

// std
use std::time::{Duration as StdDuration, Instant};
// crates.io
use oauth2::{
	HttpClientError, HttpRequest, HttpResponse,
	http::{HeaderMap, header::RETRY_AFTER},
};
use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, error::TransportError, obs};
#[cfg(feature = "reqwest")] use crate::error::ConfigError;

/// Upper bound for a single request, connect phase included.
pub const REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(30);
/// Upper bound for establishing the TCP + TLS connection.
pub const CONNECT_TIMEOUT: StdDuration = StdDuration::from_secs(10);

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a, E> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, HttpClientError<E>>> + 'a + Send>>;

/// Abstraction over HTTP clients able to execute a single buffered request.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared by every
/// concurrent pipeline invocation. They must not log request or response headers and bodies,
/// because those carry assertions, client secrets, and issued tokens.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying client.
	type TransportError: 'static + Send + Sync + StdError;

	/// Sends `request` and buffers the full response, whatever its status.
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_, Self::TransportError>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Token endpoints return results directly, so clients built by [`ReqwestHttpClient::new`]
/// never follow redirects.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Builds a client with redirects disabled and the crate's fixed timeouts.
	///
	/// `accept_invalid_certs` disables certificate validation for this client only. Pass `true`
	/// solely for the non-production host that requires it.
	pub fn new(accept_invalid_certs: bool) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.redirect(reqwest::redirect::Policy::none())
			.timeout(REQUEST_TIMEOUT)
			.connect_timeout(CONNECT_TIMEOUT)
			.danger_accept_invalid_certs(accept_invalid_certs)
			.build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestHttpClient {
	type TransportError = ReqwestError;

	fn execute(&self, request: HttpRequest) -> TransportFuture<'_, Self::TransportError> {
		let client = self.0.clone();

		Box::pin(async move {
			let response = client
				.execute(request.try_into().map_err(Box::new)?)
				.await
				.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

/// Pairs an [`HttpTransport`] with the mapper that classifies its failures.
pub struct Transport<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	client: Arc<C>,
	mapper: Arc<M>,
}
impl<C, M> Transport<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a transport from a client and its error mapper.
	pub fn new(client: impl Into<Arc<C>>, mapper: impl Into<Arc<M>>) -> Self {
		Self { client: client.into(), mapper: mapper.into() }
	}

	/// Sends one request and returns the buffered response or a classified transport failure.
	///
	/// Only the method, host, path, status, and elapsed time are logged.
	pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
		let method = request.method().clone();
		let host = request.uri().host().unwrap_or_default().to_owned();
		let path = request.uri().path().to_owned();
		let started = Instant::now();
		let outcome = self.client.execute(request).await;
		let status = outcome.as_ref().ok().map(|response| response.status().as_u16());

		obs::record_http_exchange(method.as_str(), &host, &path, status, started.elapsed());

		outcome.map_err(|err| self.mapper.map_transport_error(err))
	}
}
impl<C, M> Clone for Transport<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self { client: Arc::clone(&self.client), mapper: Arc::clone(&self.mapper) }
	}
}
impl<C, M> Debug for Transport<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("Transport(..)")
	}
}

/// Parses a `Retry-After` header given either as delay seconds or as an RFC 2822 date.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(i64::try_from(secs).ok()?));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
