//! Resource collection read with the final bearer token.

// crates.io
use oauth2::{
	HttpRequest,
	http::{
		HeaderValue, Method, Request,
		header::{ACCEPT, AUTHORIZATION, COOKIE},
	},
};
// self
use crate::{
	_prelude::*,
	auth::TokenResult,
	config::FetchEndpoint,
	error::FetchError,
	http::{self, HttpTransport, Transport, TransportErrorMapper},
	resource::{self, ResourceQuery, ResourceRecord},
};

/// Reads the downstream collection for one [`ResourceQuery`].
pub struct ResourceFetch<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	endpoint: Arc<FetchEndpoint>,
	transport: Transport<C, M>,
}
impl<C, M> ResourceFetch<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a fetcher bound to `endpoint` that sends through `transport`.
	pub fn new(endpoint: impl Into<Arc<FetchEndpoint>>, transport: Transport<C, M>) -> Self {
		Self { endpoint: endpoint.into(), transport }
	}

	/// Endpoint this fetcher reads from.
	pub fn endpoint(&self) -> &FetchEndpoint {
		&self.endpoint
	}

	/// Consumes the bearer `token` and returns the records matching `query`.
	///
	/// An empty `results` array is a successful, empty read.
	pub async fn fetch(
		&self,
		token: TokenResult,
		query: &ResourceQuery,
	) -> Result<Vec<ResourceRecord>, FetchError> {
		let request = self.build_request(&token, query)?;

		drop(token);

		let response = self.transport.send(request).await?;
		let status = response.status();

		if !status.is_success() {
			return Err(FetchError::Status {
				status: status.as_u16(),
				retry_after: http::retry_after(response.headers()),
			});
		}

		resource::parse_envelope(response.body()).map_err(|source| FetchError::Envelope { source })
	}

	/// Builds the GET request without sending it.
	pub fn build_request(
		&self,
		token: &TokenResult,
		query: &ResourceQuery,
	) -> Result<HttpRequest, FetchError> {
		let endpoint = self.endpoint.as_ref();
		let mut authorization =
			HeaderValue::from_str(&format!("Bearer {}", token.access_token.expose())).map_err(
				|_| FetchError::InvalidHeader { header: AUTHORIZATION.as_str().to_owned() },
			)?;

		authorization.set_sensitive(true);

		let resource_id = HeaderValue::from_str(&query.resource_id).map_err(|_| {
			FetchError::InvalidHeader { header: endpoint.resource_id_header.as_str().to_owned() }
		})?;

		Ok(Request::builder()
			.method(Method::GET)
			.uri(endpoint.url.as_str())
			.header(AUTHORIZATION, authorization)
			.header(ACCEPT, endpoint.accept.clone())
			.header(COOKIE, endpoint.client_context_cookie.clone())
			.header(endpoint.resource_id_header.clone(), resource_id)
			.body(Vec::new())?)
	}
}
impl<C, M> Clone for ResourceFetch<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self { endpoint: Arc::clone(&self.endpoint), transport: self.transport.clone() }
	}
}
impl<C, M> Debug for ResourceFetch<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ResourceFetch").field("url", &self.endpoint.url.as_str()).finish()
	}
}
