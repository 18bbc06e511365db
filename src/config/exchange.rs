//! Per-hop token exchange configuration.

/// Builder API for assembling exchange configurations.
pub mod builder;
/// Grant identifiers and token-type URNs used by the two hops.
pub mod grant;

pub use builder::*;
pub use grant::*;

// self
use crate::{_prelude::*, auth::TokenSecret, flows::Stage};

/// How the client authenticates to a token endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	/// Form POST body parameters for `client_id`/`client_secret`.
	#[default]
	ClientSecretPost,
	/// HTTP Basic with `client_id`/`client_secret`; the body carries neither.
	ClientSecretBasic,
}

/// Immutable configuration for one token exchange hop.
///
/// Built once at startup through [`ExchangeConfig::builder`] or one of the presets and shared by
/// every pipeline invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExchangeConfig {
	/// Hop this configuration drives.
	pub stage: Stage,
	/// HTTPS token endpoint (host, port, and path).
	pub token_endpoint: Url,
	/// Value sent as `grant_type`.
	pub grant_type: GrantType,
	/// Value sent as `requested_token_use`, when the hop needs it.
	pub requested_token_use: Option<String>,
	/// Value sent as `requested_token_type`, when the hop needs it.
	pub requested_token_type: Option<String>,
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret; redacted in `Debug` output.
	pub client_secret: TokenSecret,
	/// Value sent as `resource`, when the hop needs it.
	pub resource: Option<String>,
	/// Value sent as `scope`, when the hop needs it.
	pub scope: Option<String>,
	/// Where the client credentials travel.
	pub client_auth: ClientAuthMethod,
}
impl ExchangeConfig {
	/// Creates a new builder for the provided hop.
	pub fn builder(stage: Stage) -> ExchangeConfigBuilder {
		ExchangeConfigBuilder::new(stage)
	}

	/// On-behalf-of exchange against identity provider A: JWT-bearer assertion in, SAML2 token out.
	pub fn on_behalf_of(
		token_endpoint: Url,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		resource: impl Into<String>,
	) -> Result<Self, ExchangeConfigError> {
		Self::builder(Stage::OnBehalfOf)
			.token_endpoint(token_endpoint)
			.grant_type(GrantType::JwtBearer)
			.requested_token_use(REQUESTED_TOKEN_USE_ON_BEHALF_OF)
			.requested_token_type(TOKEN_TYPE_SAML2)
			.client_credentials(client_id, client_secret)
			.resource(resource)
			.client_auth(ClientAuthMethod::ClientSecretPost)
			.build()
	}

	/// SAML-bearer exchange against identity provider B: SAML2 token in, bearer access token out.
	pub fn saml_bearer(
		token_endpoint: Url,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> Result<Self, ExchangeConfigError> {
		Self::builder(Stage::SamlBearer)
			.token_endpoint(token_endpoint)
			.grant_type(GrantType::Saml2Bearer)
			.client_credentials(client_id, client_secret)
			.client_auth(ClientAuthMethod::ClientSecretBasic)
			.build()
	}
}
