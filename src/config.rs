//! Startup configuration for the pipeline.
//!
//! [`PipelineConfig`] bundles the two [`ExchangeConfig`]s and the [`FetchEndpoint`]. It is
//! loaded once, usually from environment variables via [`PipelineConfig::from_env`], and never
//! mutated afterwards. Every value is supplied externally; only protocol constants (grant URNs,
//! the OData media type) have defaults.

pub mod exchange;
pub mod fetch;

pub use exchange::*;
pub use fetch::*;

// std
use std::env;
// self
use crate::{_prelude::*, auth::TenantId, error::ConfigError};

/// Default authority host for identity provider A.
pub const DEFAULT_AUTHORITY_HOST: &str = "login.microsoftonline.com";

const DEFAULT_HTTPS_PORT: u16 = 443;

/// Variable names read by [`PipelineConfig::from_env`].
pub mod vars {
	/// Authority host of identity provider A (optional).
	pub const AUTHORITY_HOST: &str = "PP_AUTHORITY_HOST";
	/// Authority port of identity provider A (optional).
	pub const AUTHORITY_PORT: &str = "PP_AUTHORITY_PORT";
	/// Directory tenant scoping the on-behalf-of token endpoint.
	pub const TENANT_ID: &str = "PP_TENANT_ID";
	/// Client identifier registered with identity provider A.
	pub const CLIENT_ID: &str = "PP_CLIENT_ID";
	/// Client secret registered with identity provider A.
	pub const CLIENT_SECRET: &str = "PP_CLIENT_SECRET";
	/// Resource the on-behalf-of token is requested for.
	pub const RESOURCE: &str = "PP_RESOURCE";
	/// Scope sent alongside the resource (optional).
	pub const SCOPE: &str = "PP_SCOPE";
	/// Token host of identity provider B.
	pub const SAML_TOKEN_HOST: &str = "PP_SAML_TOKEN_HOST";
	/// Token path of identity provider B.
	pub const SAML_TOKEN_PATH: &str = "PP_SAML_TOKEN_PATH";
	/// Token port of identity provider B (optional).
	pub const SAML_TOKEN_PORT: &str = "PP_SAML_TOKEN_PORT";
	/// Client identifier registered with identity provider B.
	pub const SAML_CLIENT_ID: &str = "PP_SAML_CLIENT_ID";
	/// Client secret registered with identity provider B.
	pub const SAML_CLIENT_SECRET: &str = "PP_SAML_CLIENT_SECRET";
	/// Resource service host.
	pub const RESOURCE_HOST: &str = "PP_RESOURCE_HOST";
	/// Resource collection path.
	pub const RESOURCE_PATH: &str = "PP_RESOURCE_PATH";
	/// Resource service port (optional).
	pub const RESOURCE_PORT: &str = "PP_RESOURCE_PORT";
	/// Header carrying the resource identifier (optional).
	pub const RESOURCE_ID_HEADER: &str = "PP_RESOURCE_ID_HEADER";
	/// Session-scoping cookie (optional).
	pub const RESOURCE_COOKIE: &str = "PP_RESOURCE_COOKIE";
	/// Certificate validation opt-out for the resource host (optional, `false` by default).
	pub const RESOURCE_ACCEPT_INVALID_CERTS: &str = "PP_RESOURCE_ACCEPT_INVALID_CERTS";
}

/// Complete, validated configuration for one [`Pipeline`](crate::flows::Pipeline).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
	/// Hop A.
	pub on_behalf_of: ExchangeConfig,
	/// Hop B.
	pub saml_bearer: ExchangeConfig,
	/// Resource fetch endpoint.
	pub fetch: FetchEndpoint,
}
impl PipelineConfig {
	/// Loads the configuration from process environment variables.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| env::var(name).ok())
	}

	/// Loads a `.env` file from the working directory (if any), then reads the environment.
	///
	/// Variables already present in the process environment take precedence over the file.
	pub fn from_dotenv() -> Result<Self, ConfigError> {
		let _ = dotenvy::dotenv();

		Self::from_env()
	}

	/// Builds the configuration from an arbitrary variable lookup.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let source = Vars(lookup);
		let authority_host =
			source.optional(vars::AUTHORITY_HOST).unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.into());
		let tenant = TenantId::new(source.required(vars::TENANT_ID)?)?;
		let mut on_behalf_of = ExchangeConfig::on_behalf_of(
			on_behalf_of_endpoint(&authority_host, source.port(vars::AUTHORITY_PORT)?, &tenant)?,
			source.required(vars::CLIENT_ID)?,
			source.required(vars::CLIENT_SECRET)?,
			source.required(vars::RESOURCE)?,
		)?;

		on_behalf_of.scope = source.optional(vars::SCOPE);

		let saml_bearer = ExchangeConfig::saml_bearer(
			https_endpoint(
				&source.required(vars::SAML_TOKEN_HOST)?,
				source.port(vars::SAML_TOKEN_PORT)?,
				&source.required(vars::SAML_TOKEN_PATH)?,
			)?,
			source.required(vars::SAML_CLIENT_ID)?,
			source.required(vars::SAML_CLIENT_SECRET)?,
		)?;
		let mut fetch = FetchEndpoint::builder(https_endpoint(
			&source.required(vars::RESOURCE_HOST)?,
			source.port(vars::RESOURCE_PORT)?,
			&source.required(vars::RESOURCE_PATH)?,
		)?)
		.danger_accept_invalid_certs(source.flag(vars::RESOURCE_ACCEPT_INVALID_CERTS)?);

		if let Some(header) = source.optional(vars::RESOURCE_ID_HEADER) {
			fetch = fetch.resource_id_header(header);
		}
		if let Some(cookie) = source.optional(vars::RESOURCE_COOKIE) {
			fetch = fetch.client_context_cookie(cookie);
		}

		Ok(Self { on_behalf_of, saml_bearer, fetch: fetch.build()? })
	}
}

/// Builds the tenant-scoped on-behalf-of token endpoint,
/// `https://{host}:{port}/{tenant}/oauth2/token`.
pub fn on_behalf_of_endpoint(
	host: &str,
	port: u16,
	tenant: &TenantId,
) -> Result<Url, ConfigError> {
	https_endpoint(host, port, &format!("/{tenant}/oauth2/token"))
}

/// Assembles an HTTPS URL from a host/port/path triple.
///
/// Anything after the first `?` in `path` becomes the query string, kept verbatim.
pub fn https_endpoint(host: &str, port: u16, path: &str) -> Result<Url, ConfigError> {
	let mut url = Url::parse(&format!("https://{host}"))
		.map_err(|source| ConfigError::InvalidEndpoint { source })?;

	url.set_port(Some(port)).map_err(|_| ConfigError::InvalidEndpoint {
		source: url::ParseError::InvalidPort,
	})?;

	match path.split_once('?') {
		Some((path, query)) => {
			url.set_path(path);
			url.set_query(Some(query));
		},
		None => url.set_path(path),
	}

	Ok(url)
}

struct Vars<F>(F);
impl<F> Vars<F>
where
	F: Fn(&str) -> Option<String>,
{
	fn optional(&self, name: &'static str) -> Option<String> {
		(self.0)(name).map(|value| value.trim().to_owned()).filter(|value| !value.is_empty())
	}

	fn required(&self, name: &'static str) -> Result<String, ConfigError> {
		self.optional(name).ok_or(ConfigError::MissingVariable { name })
	}

	fn port(&self, name: &'static str) -> Result<u16, ConfigError> {
		match self.optional(name) {
			None => Ok(DEFAULT_HTTPS_PORT),
			Some(raw) => raw
				.parse::<u16>()
				.ok()
				.filter(|port| *port != 0)
				.ok_or(ConfigError::InvalidPort { name }),
		}
	}

	fn flag(&self, name: &'static str) -> Result<bool, ConfigError> {
		match self.optional(name).as_deref() {
			None | Some("false") => Ok(false),
			Some("true") => Ok(true),
			Some(_) => Err(ConfigError::InvalidFlag { name }),
		}
	}
}
