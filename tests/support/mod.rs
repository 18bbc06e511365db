//! Shared builders for integration tests.

#![allow(dead_code)]

// std
use std::{
	collections::{HashMap, VecDeque},
	error::Error as StdError,
	fmt,
	sync::Arc,
};
// crates.io
use httpmock::MockServer;
use parking_lot::Mutex;
use principal_propagation::{
	CancellationToken,
	config::{ExchangeConfig, FetchEndpoint, PipelineConfig},
	error::TransportError,
	flows::{Pipeline, ReqwestPipeline},
	http::{
		HttpTransport, ReqwestHttpClient, ReqwestTransportErrorMapper, Transport,
		TransportErrorMapper, TransportFuture,
	},
	oauth2::{
		HttpClientError, HttpRequest, HttpResponse,
		http::{HeaderMap, StatusCode},
	},
	reqwest::Client as ReqwestClient,
	url::Url,
};

pub const HOP_A_PATH: &str = "/contoso-tenant/oauth2/token";
pub const HOP_B_PATH: &str = "/sap/bc/sec/oauth2/token";
pub const RESOURCE_PATH: &str = "/sap/opu/odata/sap/EPM_REF_APPS_PROD_MAN_SRV/Products";

pub const HOP_A_CLIENT_ID: &str = "bot-app";
pub const HOP_A_CLIENT_SECRET: &str = "bot-secret";
pub const HOP_A_RESOURCE: &str = "https://erp.example.com";
pub const HOP_B_CLIENT_ID: &str = "TECHUSER";
pub const HOP_B_CLIENT_SECRET: &str = "tech-secret";

/// Resolves `path` on the mock server as an HTTPS URL.
pub fn mock_url(server: &MockServer, path: &str) -> Url {
	let mut url = Url::parse(&server.url(path)).expect("Mock server URL should parse.");

	url.set_scheme("https").expect("Mock server URL should accept the https scheme.");

	url
}

/// Builds a configuration whose three endpoints all live on `server`.
pub fn pipeline_config(server: &MockServer) -> PipelineConfig {
	PipelineConfig {
		on_behalf_of: ExchangeConfig::on_behalf_of(
			mock_url(server, HOP_A_PATH),
			HOP_A_CLIENT_ID,
			HOP_A_CLIENT_SECRET,
			HOP_A_RESOURCE,
		)
		.expect("Hop A configuration should build."),
		saml_bearer: ExchangeConfig::saml_bearer(
			mock_url(server, HOP_B_PATH),
			HOP_B_CLIENT_ID,
			HOP_B_CLIENT_SECRET,
		)
		.expect("Hop B configuration should build."),
		fetch: FetchEndpoint::builder(mock_url(server, RESOURCE_PATH))
			.build()
			.expect("Fetch endpoint should build."),
	}
}

/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
/// `httpmock` during tests.
pub fn test_reqwest_http_client() -> ReqwestHttpClient {
	let client = ReqwestClient::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	ReqwestHttpClient::with_client(client)
}

/// Constructs a reqwest-backed pipeline for `server`.
pub fn build_reqwest_test_pipeline(server: &MockServer) -> ReqwestPipeline {
	let transport =
		Transport::new(test_reqwest_http_client(), Arc::new(ReqwestTransportErrorMapper));

	Pipeline::with_transports(pipeline_config(server), transport.clone(), transport)
}

/// Configuration with placeholder HTTPS endpoints for tests that never reach the network.
pub fn offline_config() -> PipelineConfig {
	let url = |path: &str| {
		Url::parse(&format!("https://idp.example.com{path}")).expect("Static URL should parse.")
	};

	PipelineConfig {
		on_behalf_of: ExchangeConfig::on_behalf_of(
			url(HOP_A_PATH),
			HOP_A_CLIENT_ID,
			HOP_A_CLIENT_SECRET,
			HOP_A_RESOURCE,
		)
		.expect("Hop A configuration should build."),
		saml_bearer: ExchangeConfig::saml_bearer(
			url(HOP_B_PATH),
			HOP_B_CLIENT_ID,
			HOP_B_CLIENT_SECRET,
		)
		.expect("Hop B configuration should build."),
		fetch: FetchEndpoint::builder(url(RESOURCE_PATH))
			.build()
			.expect("Fetch endpoint should build."),
	}
}

/// Scripted reply returned by [`RecordingTransport`].
#[derive(Clone, Debug)]
pub enum Reply {
	/// Buffered response with the given status and body.
	Respond { status: u16, body: String },
	/// Never completes.
	Hang,
	/// Fails before any response is received.
	Refused,
}
impl Reply {
	pub fn json(status: u16, body: &str) -> Self {
		Self::Respond { status, body: body.to_owned() }
	}
}

/// Request captured by [`RecordingTransport`].
#[derive(Clone, Debug)]
pub struct RecordedRequest {
	pub method: String,
	pub path: String,
	pub headers: HeaderMap,
	pub body: String,
}

#[derive(Debug)]
pub struct FakeTransportError;
impl fmt::Display for FakeTransportError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str("Connection refused.")
	}
}
impl StdError for FakeTransportError {}

/// In-memory transport that records every request and answers from a per-path script.
///
/// Requests to a path whose script is exhausted hang forever.
#[derive(Debug, Default)]
pub struct RecordingTransport {
	requests: Mutex<Vec<RecordedRequest>>,
	script: Mutex<HashMap<String, VecDeque<Reply>>>,
	cancel_after: Mutex<Option<(String, CancellationToken)>>,
}
impl RecordingTransport {
	pub fn scripted<'a>(replies: impl IntoIterator<Item = (&'a str, Reply)>) -> Arc<Self> {
		let mut script = HashMap::<String, VecDeque<Reply>>::new();

		for (path, reply) in replies {
			script.entry(path.to_owned()).or_default().push_back(reply);
		}

		Arc::new(Self {
			requests: Mutex::default(),
			script: Mutex::new(script),
			cancel_after: Mutex::default(),
		})
	}

	/// Cancels `token` as soon as a scripted response for `path` has been handed back.
	pub fn cancel_after(&self, path: &str, token: CancellationToken) {
		*self.cancel_after.lock() = Some((path.to_owned(), token));
	}

	/// Transport with an empty script; every request hangs.
	pub fn silent() -> Arc<Self> {
		Arc::default()
	}

	pub fn requests(&self) -> Vec<RecordedRequest> {
		self.requests.lock().clone()
	}

	pub fn calls_to(&self, path: &str) -> usize {
		self.requests.lock().iter().filter(|request| request.path == path).count()
	}
}
impl HttpTransport for RecordingTransport {
	type TransportError = FakeTransportError;

	fn execute(&self, request: HttpRequest) -> TransportFuture<'_, Self::TransportError> {
		let path = request.uri().path().to_owned();
		let reply =
			self.script.lock().get_mut(&path).and_then(VecDeque::pop_front).unwrap_or(Reply::Hang);
		let trigger = self
			.cancel_after
			.lock()
			.as_ref()
			.filter(|(target, _)| *target == path)
			.map(|(_, token)| token.clone());

		self.requests.lock().push(RecordedRequest {
			method: request.method().to_string(),
			path,
			headers: request.headers().clone(),
			body: String::from_utf8_lossy(request.body()).into_owned(),
		});

		Box::pin(async move {
			match reply {
				Reply::Respond { status, body } => {
					let mut response = HttpResponse::new(body.into_bytes());

					*response.status_mut() =
						StatusCode::from_u16(status).expect("Scripted status should be valid.");

					if let Some(token) = trigger {
						token.cancel();
					}

					Ok(response)
				},
				Reply::Hang => std::future::pending().await,
				Reply::Refused => Err(HttpClientError::Reqwest(Box::new(FakeTransportError))),
			}
		})
	}
}

/// Maps every fake failure to a connection error.
#[derive(Clone, Copy, Debug, Default)]
pub struct FakeMapper;
impl TransportErrorMapper<FakeTransportError> for FakeMapper {
	fn map_transport_error(&self, error: HttpClientError<FakeTransportError>) -> TransportError {
		TransportError::connection(error)
	}
}

pub type FakePipeline = Pipeline<RecordingTransport, FakeMapper>;

/// Builds a pipeline whose three stages share one recording transport.
pub fn build_fake_pipeline(transport: Arc<RecordingTransport>) -> FakePipeline {
	let transport = Transport::new(transport, FakeMapper);

	Pipeline::with_transports(offline_config(), transport.clone(), transport)
}

pub fn token_body(token: &str) -> String {
	format!("{{\"access_token\":\"{token}\",\"token_type\":\"Bearer\",\"expires_in\":3599}}")
}

pub fn envelope(ids: &[&str]) -> String {
	let results = ids
		.iter()
		.map(|id| format!("{{\"ProductID\":\"{id}\",\"Name\":\"Product {id}\"}}"))
		.collect::<Vec<_>>()
		.join(",");

	format!("{{\"d\":{{\"results\":[{results}]}}}}")
}
