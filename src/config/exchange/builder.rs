// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	config::{ClientAuthMethod, ExchangeConfig, GrantType},
	flows::Stage,
};

/// Errors raised while constructing or validating exchange configurations.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum ExchangeConfigError {
	/// Only the two hops carry an exchange configuration.
	#[error("The {stage} stage is not a token exchange hop.")]
	NotAHop {
		/// Stage the builder was created for.
		stage: Stage,
	},
	/// Token endpoint is mandatory.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// Grant type is mandatory.
	#[error("Missing grant type.")]
	MissingGrantType,
	/// Token endpoint must use HTTPS.
	#[error("The token endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Client identifier is empty.
	#[error("Client identifier cannot be empty.")]
	MissingClientId,
	/// Client secret is empty.
	#[error("Client secret cannot be empty.")]
	MissingClientSecret,
	/// HTTP Basic user-ids cannot contain a colon.
	#[error("Client identifier cannot contain `:` when using HTTP Basic authentication.")]
	ColonInBasicClientId,
}

/// Builder for [`ExchangeConfig`] values.
#[derive(Debug)]
pub struct ExchangeConfigBuilder {
	/// Hop being configured.
	pub stage: Stage,
	/// Token endpoint.
	pub token_endpoint: Option<Url>,
	/// Grant sent as `grant_type`.
	pub grant_type: Option<GrantType>,
	/// Optional `requested_token_use`.
	pub requested_token_use: Option<String>,
	/// Optional `requested_token_type`.
	pub requested_token_type: Option<String>,
	/// Client identifier.
	pub client_id: String,
	/// Client secret.
	pub client_secret: TokenSecret,
	/// Optional `resource`.
	pub resource: Option<String>,
	/// Optional `scope`.
	pub scope: Option<String>,
	/// Client authentication placement.
	pub client_auth: ClientAuthMethod,
}
impl ExchangeConfigBuilder {
	/// Creates a new builder for the provided hop.
	pub fn new(stage: Stage) -> Self {
		Self {
			stage,
			token_endpoint: None,
			grant_type: None,
			requested_token_use: None,
			requested_token_type: None,
			client_id: String::new(),
			client_secret: TokenSecret::new(String::new()),
			resource: None,
			scope: None,
			client_auth: ClientAuthMethod::default(),
		}
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the grant type.
	pub fn grant_type(mut self, grant: GrantType) -> Self {
		self.grant_type = Some(grant);

		self
	}

	/// Sets `requested_token_use`.
	pub fn requested_token_use(mut self, value: impl Into<String>) -> Self {
		self.requested_token_use = Some(value.into());

		self
	}

	/// Sets `requested_token_type`.
	pub fn requested_token_type(mut self, value: impl Into<String>) -> Self {
		self.requested_token_type = Some(value.into());

		self
	}

	/// Sets the client identifier and secret.
	pub fn client_credentials(
		mut self,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> Self {
		self.client_id = client_id.into();
		self.client_secret = TokenSecret::new(client_secret);

		self
	}

	/// Sets `resource`.
	pub fn resource(mut self, value: impl Into<String>) -> Self {
		self.resource = Some(value.into());

		self
	}

	/// Sets `scope`.
	pub fn scope(mut self, value: impl Into<String>) -> Self {
		self.scope = Some(value.into());

		self
	}

	/// Overrides where client credentials travel.
	pub fn client_auth(mut self, method: ClientAuthMethod) -> Self {
		self.client_auth = method;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ExchangeConfig, ExchangeConfigError> {
		if !self.stage.is_hop() {
			return Err(ExchangeConfigError::NotAHop { stage: self.stage });
		}

		let token_endpoint =
			self.token_endpoint.ok_or(ExchangeConfigError::MissingTokenEndpoint)?;
		let grant_type = self.grant_type.ok_or(ExchangeConfigError::MissingGrantType)?;
		let config = ExchangeConfig {
			stage: self.stage,
			token_endpoint,
			grant_type,
			requested_token_use: self.requested_token_use,
			requested_token_type: self.requested_token_type,
			client_id: self.client_id,
			client_secret: self.client_secret,
			resource: self.resource,
			scope: self.scope,
			client_auth: self.client_auth,
		};

		config.validate()?;

		Ok(config)
	}
}

impl ExchangeConfig {
	fn validate(&self) -> Result<(), ExchangeConfigError> {
		if self.token_endpoint.scheme() != "https" {
			return Err(ExchangeConfigError::InsecureEndpoint {
				url: self.token_endpoint.to_string(),
			});
		}
		if self.client_id.trim().is_empty() {
			return Err(ExchangeConfigError::MissingClientId);
		}
		if self.client_secret.is_empty() {
			return Err(ExchangeConfigError::MissingClientSecret);
		}
		if matches!(self.client_auth, ClientAuthMethod::ClientSecretBasic)
			&& self.client_id.contains(':')
		{
			return Err(ExchangeConfigError::ColonInBasicClientId);
		}

		Ok(())
	}
}
