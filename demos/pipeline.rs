//! Runs the full exchange chain against local mock identity providers and a mock resource
//! service, then prints the fetched records.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use principal_propagation::{
	CancellationToken,
	config::{ExchangeConfig, FetchEndpoint, PipelineConfig},
	flows::{Pipeline, RetryPolicy, Stage},
	http::{ReqwestHttpClient, ReqwestTransportErrorMapper, Transport},
	reqwest::Client,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let hop_a = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/contoso/oauth2/token")
				.form_urlencoded_tuple("requested_token_use", "on_behalf_of");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"demo-saml-assertion\",\"token_type\":\"Bearer\"}");
		})
		.await;
	let hop_b = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/sap/bc/sec/oauth2/token")
				.form_urlencoded_tuple("assertion", "demo-saml-assertion");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"demo-bearer\",\"token_type\":\"Bearer\"}");
		})
		.await;
	let fetch = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/sap/opu/odata/sap/EPM_REF_APPS_PROD_MAN_SRV/Products")
				.header("authorization", "Bearer demo-bearer")
				.header("productid", "HT-1000");
			then.status(200).header("content-type", "application/json").body(
				"{\"d\":{\"results\":[{\"ProductID\":\"HT-1000\",\"Name\":\"Notebook Basic 15\",\"Price\":\"956.00\",\"CurrencyCode\":\"USD\"}]}}",
			);
		})
		.await;
	let config = PipelineConfig {
		on_behalf_of: ExchangeConfig::on_behalf_of(
			Url::parse(&server.url("/contoso/oauth2/token"))?,
			"demo-bot",
			"demo-bot-secret",
			"https://erp.example.com",
		)?,
		saml_bearer: ExchangeConfig::saml_bearer(
			Url::parse(&server.url("/sap/bc/sec/oauth2/token"))?,
			"TECHUSER",
			"demo-tech-secret",
		)?,
		fetch: FetchEndpoint::builder(Url::parse(
			&server.url("/sap/opu/odata/sap/EPM_REF_APPS_PROD_MAN_SRV/Products"),
		)?)
		.build()?,
	};
	let http_client = ReqwestHttpClient::with_client(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()?,
	);
	let transport: Transport<ReqwestHttpClient, ReqwestTransportErrorMapper> =
		Transport::new(http_client, Arc::new(ReqwestTransportErrorMapper));
	let pipeline = Pipeline::with_transports(config, transport.clone(), transport);
	let records = pipeline
		.run_with_retry("demo-user-jwt", "HT-1000", &RetryPolicy::new(2), &CancellationToken::new())
		.await?;

	for record in &records {
		println!(
			"{} {} {} {}",
			record.id.as_deref().unwrap_or("-"),
			record.name.as_deref().unwrap_or("-"),
			record.price.as_deref().unwrap_or("-"),
			record.currency_code.as_deref().unwrap_or("-"),
		);
	}

	println!("Fetch attempts: {}.", pipeline.metrics.attempts(Stage::ResourceFetch));

	hop_a.assert_async().await;
	hop_b.assert_async().await;
	fetch.assert_async().await;

	Ok(())
}
