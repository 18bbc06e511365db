//! Single token-exchange hop: form POST in, `access_token` out.

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
use oauth2::{
	HttpRequest, HttpResponse,
	http::{
		HeaderValue, Method, Request,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
use url::form_urlencoded::Serializer;
// self
use crate::{
	_prelude::*,
	auth::{TokenResult, TokenSecret},
	config::{ClientAuthMethod, ExchangeConfig},
	error::{HopError, HopFailure},
	flows::Stage,
	http::{self, HttpTransport, Transport, TransportErrorMapper},
};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";
const MAX_OAUTH_ERROR_LEN: usize = 64;

/// Performs one token exchange against a single token endpoint.
///
/// A hop never retries; a failed exchange is reported once, tagged with the hop's [`Stage`].
pub struct TokenExchange<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	config: Arc<ExchangeConfig>,
	transport: Transport<C, M>,
}
impl<C, M> TokenExchange<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a hop bound to `config` that sends through `transport`.
	pub fn new(config: impl Into<Arc<ExchangeConfig>>, transport: Transport<C, M>) -> Self {
		Self { config: config.into(), transport }
	}

	/// Configuration this hop was built with.
	pub fn config(&self) -> &ExchangeConfig {
		&self.config
	}

	/// Stage this hop reports in results and errors.
	pub fn stage(&self) -> Stage {
		self.config.stage
	}

	/// Trades `inbound` (the assertion or the previous hop's token) for a new token.
	pub async fn exchange(&self, inbound: TokenSecret) -> Result<TokenResult, HopError> {
		let stage = self.stage();
		let request = self.build_request(&inbound).map_err(|e| HopError::new(stage, e))?;

		drop(inbound);

		let response = self.transport.send(request).await.map_err(|e| HopError::new(stage, e))?;
		let access_token = parse_token_response(&response).map_err(|e| HopError::new(stage, e))?;

		Ok(TokenResult::new(stage, access_token))
	}

	/// Builds the form POST for `inbound` without sending it.
	pub fn build_request(&self, inbound: &TokenSecret) -> Result<HttpRequest, HopFailure> {
		let config = self.config.as_ref();
		let mut builder = Request::builder()
			.method(Method::POST)
			.uri(config.token_endpoint.as_str())
			.header(CONTENT_TYPE, FORM_CONTENT_TYPE)
			.header(ACCEPT, JSON_CONTENT_TYPE);

		if config.client_auth == ClientAuthMethod::ClientSecretBasic {
			builder = builder.header(AUTHORIZATION, basic_authorization(config)?);
		}

		Ok(builder.body(form_body(config, inbound).into_bytes())?)
	}
}
impl<C, M> Clone for TokenExchange<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self { config: Arc::clone(&self.config), transport: self.transport.clone() }
	}
}
impl<C, M> Debug for TokenExchange<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenExchange")
			.field("stage", &self.config.stage)
			.field("token_endpoint", &self.config.token_endpoint.as_str())
			.finish()
	}
}

#[derive(Deserialize)]
struct TokenResponseBody {
	access_token: String,
}

#[derive(Deserialize)]
struct OAuthErrorBody {
	error: String,
}

fn form_body(config: &ExchangeConfig, inbound: &TokenSecret) -> String {
	let mut form = Serializer::new(String::new());

	form.append_pair("assertion", inbound.expose());
	form.append_pair("grant_type", config.grant_type.as_str());

	if config.client_auth == ClientAuthMethod::ClientSecretPost {
		form.append_pair("client_id", &config.client_id);
		form.append_pair("client_secret", config.client_secret.expose());
	}
	if let Some(resource) = &config.resource {
		form.append_pair("resource", resource);
	}
	if let Some(requested_token_use) = &config.requested_token_use {
		form.append_pair("requested_token_use", requested_token_use);
	}
	if let Some(requested_token_type) = &config.requested_token_type {
		form.append_pair("requested_token_type", requested_token_type);
	}
	if let Some(scope) = &config.scope {
		form.append_pair("scope", scope);
	}

	form.finish()
}

fn basic_authorization(config: &ExchangeConfig) -> Result<HeaderValue, HopFailure> {
	let credentials =
		STANDARD.encode(format!("{}:{}", config.client_id, config.client_secret.expose()));
	let mut value = HeaderValue::from_str(&format!("Basic {credentials}"))
		.map_err(|e| HopFailure::Request(e.into()))?;

	value.set_sensitive(true);

	Ok(value)
}

fn parse_token_response(response: &HttpResponse) -> Result<TokenSecret, HopFailure> {
	let status = response.status();

	if !status.is_success() {
		return Err(HopFailure::Status {
			status: status.as_u16(),
			oauth_error: oauth_error_code(response.body()),
			retry_after: http::retry_after(response.headers()),
		});
	}

	let de = &mut serde_json::Deserializer::from_slice(response.body());
	let body: TokenResponseBody = serde_path_to_error::deserialize(de)
		.map_err(|source| HopFailure::MalformedResponse { source })?;

	if body.access_token.is_empty() {
		return Err(HopFailure::EmptyAccessToken);
	}

	Ok(TokenSecret::new(body.access_token))
}

// Only short printable codes are kept; anything else may echo request data.
fn oauth_error_code(body: &[u8]) -> Option<String> {
	let parsed = serde_json::from_slice::<OAuthErrorBody>(body).ok()?;

	(!parsed.error.is_empty()
		&& parsed.error.len() <= MAX_OAUTH_ERROR_LEN
		&& parsed.error.bytes().all(|b| b.is_ascii_graphic()))
	.then_some(parsed.error)
}
