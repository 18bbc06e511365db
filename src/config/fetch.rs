//! Downstream resource endpoint configuration.

// crates.io
use oauth2::http::{HeaderName, HeaderValue};
// self
use crate::_prelude::*;

/// OData verbose JSON media type.
pub const ACCEPT_ODATA_VERBOSE: &str = "application/json;odata=verbose";
/// Default session-scoping cookie selecting the backend client.
pub const DEFAULT_CLIENT_CONTEXT_COOKIE: &str = "sap-usercontext=sap-client=001";
/// Default header carrying the caller-supplied resource identifier.
pub const DEFAULT_RESOURCE_ID_HEADER: &str = "productid";

/// Errors raised while constructing or validating a [`FetchEndpoint`].
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum FetchEndpointError {
	/// Resource endpoint must use HTTPS.
	#[error("The resource endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// The identifier header name is not a valid HTTP header name.
	#[error("`{name}` is not a valid header name.")]
	InvalidHeaderName {
		/// Rejected header name.
		name: String,
	},
	/// A fixed header value is not valid in HTTP.
	#[error("Value for header `{header}` is invalid.")]
	InvalidHeaderValue {
		/// Header whose value was rejected.
		header: &'static str,
	},
}

/// Immutable description of the downstream resource collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchEndpoint {
	/// HTTPS collection URL (host, port, and path).
	pub url: Url,
	/// `Accept` header value.
	pub accept: HeaderValue,
	/// `Cookie` header value scoping the backend session.
	pub client_context_cookie: HeaderValue,
	/// Header that carries the resource identifier.
	pub resource_id_header: HeaderName,
	/// Disables certificate validation for this endpoint's connection only.
	pub accept_invalid_certs: bool,
}
impl FetchEndpoint {
	/// Creates a new builder for the provided collection URL.
	pub fn builder(url: Url) -> FetchEndpointBuilder {
		FetchEndpointBuilder::new(url)
	}
}

/// Builder for [`FetchEndpoint`] values.
#[derive(Debug)]
pub struct FetchEndpointBuilder {
	/// Collection URL.
	pub url: Url,
	/// `Accept` header value.
	pub accept: String,
	/// `Cookie` header value.
	pub client_context_cookie: String,
	/// Identifier header name.
	pub resource_id_header: String,
	/// Certificate validation opt-out.
	pub accept_invalid_certs: bool,
}
impl FetchEndpointBuilder {
	/// Creates a builder seeded with the OData verbose defaults.
	pub fn new(url: Url) -> Self {
		Self {
			url,
			accept: ACCEPT_ODATA_VERBOSE.into(),
			client_context_cookie: DEFAULT_CLIENT_CONTEXT_COOKIE.into(),
			resource_id_header: DEFAULT_RESOURCE_ID_HEADER.into(),
			accept_invalid_certs: false,
		}
	}

	/// Overrides the `Accept` header value.
	pub fn accept(mut self, value: impl Into<String>) -> Self {
		self.accept = value.into();

		self
	}

	/// Overrides the session-scoping cookie.
	pub fn client_context_cookie(mut self, value: impl Into<String>) -> Self {
		self.client_context_cookie = value.into();

		self
	}

	/// Overrides the header that carries the resource identifier.
	pub fn resource_id_header(mut self, name: impl Into<String>) -> Self {
		self.resource_id_header = name.into();

		self
	}

	/// Disables certificate validation for the resource host.
	///
	/// Only for non-production hosts with self-signed certificates. Token endpoints are never
	/// affected.
	pub fn danger_accept_invalid_certs(mut self, accept: bool) -> Self {
		self.accept_invalid_certs = accept;

		self
	}

	/// Consumes the builder and validates the resulting endpoint.
	pub fn build(self) -> Result<FetchEndpoint, FetchEndpointError> {
		if self.url.scheme() != "https" {
			return Err(FetchEndpointError::InsecureEndpoint { url: self.url.to_string() });
		}

		let resource_id_header = HeaderName::from_bytes(self.resource_id_header.as_bytes())
			.map_err(|_| FetchEndpointError::InvalidHeaderName { name: self.resource_id_header })?;
		let accept = HeaderValue::from_str(&self.accept)
			.map_err(|_| FetchEndpointError::InvalidHeaderValue { header: "accept" })?;
		let client_context_cookie = HeaderValue::from_str(&self.client_context_cookie)
			.map_err(|_| FetchEndpointError::InvalidHeaderValue { header: "cookie" })?;

		Ok(FetchEndpoint {
			url: self.url,
			accept,
			client_context_cookie,
			resource_id_header,
			accept_invalid_certs: self.accept_invalid_certs,
		})
	}
}
