mod support;

// std
use std::time::Duration;
// self
use principal_propagation::{
	CancellationToken,
	auth::Assertion,
	error::{HopFailure, PipelineError, TransportError},
	flows::{PipelineState, RetryPolicy, Stage},
	resource::ResourceQuery,
	url::form_urlencoded,
};
use support::*;

fn query(id: &str) -> ResourceQuery {
	ResourceQuery::new(id.parse().expect("Resource identifier should be valid."))
}

fn form(body: &str) -> Vec<(String, String)> {
	form_urlencoded::parse(body.as_bytes()).into_owned().collect()
}

#[tokio::test]
async fn invocation_walks_every_state_in_order() {
	let transport = RecordingTransport::scripted([
		(HOP_A_PATH, Reply::json(200, &token_body("tokA"))),
		(HOP_B_PATH, Reply::json(200, &token_body("tokB"))),
		(RESOURCE_PATH, Reply::json(200, &envelope(&["HT-1000", "HT-1001"]))),
	]);
	let pipeline = build_fake_pipeline(transport.clone());
	let mut invocation = pipeline.invocation("user-jwt", query("HT-1000"));

	assert_eq!(invocation.state(), PipelineState::Idle);

	let records =
		invocation.drive(&CancellationToken::new()).await.expect("Scripted run should succeed.");

	assert_eq!(records.len(), 2);
	assert_eq!(invocation.state(), PipelineState::Done);
	assert_eq!(invocation.history(), [
		PipelineState::Idle,
		PipelineState::HopAInFlight,
		PipelineState::HopBInFlight,
		PipelineState::FetchInFlight,
		PipelineState::Done,
	]);

	let requests = transport.requests();

	assert_eq!(requests.len(), 3);
	assert!(form(&requests[0].body).contains(&("assertion".into(), "user-jwt".into())));
	assert!(form(&requests[1].body).contains(&("assertion".into(), "tokA".into())));
	assert_eq!(requests[2].method, "GET");
	assert_eq!(
		requests[2].headers.get("authorization").map(|value| value.to_str().ok()),
		Some(Some("Bearer tokB"))
	);
	assert_eq!(
		requests[2].headers.get("productid").map(|value| value.to_str().ok()),
		Some(Some("HT-1000"))
	);
}

#[tokio::test]
async fn hop_b_body_carries_only_assertion_and_grant() {
	let transport = RecordingTransport::scripted([
		(HOP_A_PATH, Reply::json(200, &token_body("tokA"))),
		(HOP_B_PATH, Reply::json(200, &token_body("tokB"))),
		(RESOURCE_PATH, Reply::json(200, &envelope(&[]))),
	]);
	let pipeline = build_fake_pipeline(transport.clone());

	pipeline.run("user-jwt", "HT-1000").await.expect("Scripted run should succeed.");

	let hop_b = &transport.requests()[1];
	let keys = form(&hop_b.body).into_iter().map(|(key, _)| key).collect::<Vec<_>>();

	assert_eq!(keys, ["assertion", "grant_type"]);
	assert!(hop_b.headers.get("authorization").is_some_and(|value| value.is_sensitive()));
}

#[tokio::test]
async fn failure_state_names_the_failing_stage() {
	let transport = RecordingTransport::scripted([
		(HOP_A_PATH, Reply::json(200, &token_body("tokA"))),
		(HOP_B_PATH, Reply::json(503, "{\"error\":\"temporarily_unavailable\"}")),
	]);
	let pipeline = build_fake_pipeline(transport.clone());
	let mut invocation = pipeline.invocation("user-jwt", query("HT-1000"));
	let err = invocation
		.drive(&CancellationToken::new())
		.await
		.expect_err("Hop B outage should fail the run.");

	assert_eq!(invocation.state(), PipelineState::Failed { stage: Stage::SamlBearer });
	assert!(err.is_transient());
	assert_eq!(transport.calls_to(RESOURCE_PATH), 0);
	assert_eq!(pipeline.metrics.attempts(Stage::ResourceFetch), 0);
	assert_eq!(pipeline.metrics.failures(Stage::SamlBearer), 1);
}

#[tokio::test]
async fn transport_failures_are_wrapped_with_the_hop() {
	let transport = RecordingTransport::scripted([(HOP_A_PATH, Reply::Refused)]);
	let pipeline = build_fake_pipeline(transport.clone());
	let err = pipeline.run("user-jwt", "HT-1000").await.expect_err("Refused connect should fail.");

	assert_eq!(transport.requests().len(), 1);

	match err {
		PipelineError::Hop(hop) => {
			assert_eq!(hop.stage, Stage::OnBehalfOf);
			assert!(matches!(hop.cause, HopFailure::Transport(TransportError::Connection { .. })));
		},
		other => panic!("Unexpected pipeline error: {other:?}"),
	}
}

#[tokio::test]
async fn pre_cancelled_invocation_sends_nothing() {
	let transport = RecordingTransport::silent();
	let pipeline = build_fake_pipeline(transport.clone());
	let cancel = CancellationToken::new();

	cancel.cancel();

	let mut invocation = pipeline.invocation("user-jwt", query("HT-1000"));
	let err = invocation.drive(&cancel).await.expect_err("Cancelled run should not succeed.");

	assert!(matches!(err, PipelineError::Cancelled { stage: Stage::OnBehalfOf }));
	assert_eq!(invocation.state(), PipelineState::Cancelled { stage: Stage::OnBehalfOf });
	assert!(transport.requests().is_empty());
	assert_eq!(pipeline.metrics.attempts(Stage::OnBehalfOf), 0);
}

#[tokio::test]
async fn cancellation_between_hops_prevents_the_next_request() {
	let transport = RecordingTransport::scripted([
		(HOP_A_PATH, Reply::json(200, &token_body("tokA"))),
		(HOP_B_PATH, Reply::json(200, &token_body("tokB"))),
		(RESOURCE_PATH, Reply::json(200, &envelope(&["HT-1000"]))),
	]);
	let cancel = CancellationToken::new();

	transport.cancel_after(HOP_A_PATH, cancel.clone());

	let pipeline = build_fake_pipeline(transport.clone());
	let mut invocation = pipeline.invocation("user-jwt", query("HT-1000"));
	let err = invocation.drive(&cancel).await.expect_err("Cancelled run should not succeed.");

	assert!(matches!(err, PipelineError::Cancelled { stage: Stage::SamlBearer }));
	assert_eq!(invocation.state(), PipelineState::Cancelled { stage: Stage::SamlBearer });
	assert_eq!(invocation.history(), [
		PipelineState::Idle,
		PipelineState::HopAInFlight,
		PipelineState::Cancelled { stage: Stage::SamlBearer },
	]);
	assert_eq!(transport.calls_to(HOP_A_PATH), 1);
	assert_eq!(transport.calls_to(HOP_B_PATH), 0);
	assert_eq!(transport.calls_to(RESOURCE_PATH), 0);
	assert_eq!(pipeline.metrics.successes(Stage::OnBehalfOf), 1);
	assert_eq!(pipeline.metrics.attempts(Stage::SamlBearer), 0);
}

#[tokio::test]
async fn cancellation_during_a_hop_aborts_the_request() {
	// Hop B never answers.
	let transport =
		RecordingTransport::scripted([(HOP_A_PATH, Reply::json(200, &token_body("tokA")))]);
	let pipeline = build_fake_pipeline(transport.clone());
	let cancel = CancellationToken::new();
	let trigger = cancel.clone();
	let canceller = tokio::spawn(async move {
		tokio::time::sleep(Duration::from_millis(50)).await;
		trigger.cancel();
	});
	let err = pipeline
		.run_with_cancellation("user-jwt", "HT-1000", &cancel)
		.await
		.expect_err("Cancelled run should not succeed.");

	canceller.await.expect("Canceller task should finish.");

	assert!(matches!(err, PipelineError::Cancelled { stage: Stage::SamlBearer }));
	assert_eq!(transport.calls_to(HOP_B_PATH), 1);
	assert_eq!(transport.calls_to(RESOURCE_PATH), 0);
	assert_eq!(pipeline.metrics.cancellations(Stage::SamlBearer), 1);
}

#[tokio::test]
async fn an_invocation_drives_at_most_once() {
	let transport = RecordingTransport::scripted([
		(HOP_A_PATH, Reply::json(200, &token_body("tokA"))),
		(HOP_B_PATH, Reply::json(200, &token_body("tokB"))),
		(RESOURCE_PATH, Reply::json(200, &envelope(&[]))),
	]);
	let pipeline = build_fake_pipeline(transport.clone());
	let mut invocation = pipeline.invocation(Assertion::new("user-jwt"), query("HT-1000"));
	let cancel = CancellationToken::new();

	invocation.drive(&cancel).await.expect("First drive should succeed.");

	let err = invocation.drive(&cancel).await.expect_err("Second drive must be rejected.");

	assert!(matches!(err, PipelineError::AlreadyDriven));
	assert_eq!(transport.requests().len(), 3);
}

#[tokio::test]
async fn concurrent_invocations_do_not_share_tokens() {
	let transport = RecordingTransport::scripted([
		(HOP_A_PATH, Reply::json(200, &token_body("tokA"))),
		(HOP_A_PATH, Reply::json(200, &token_body("tokA"))),
		(HOP_B_PATH, Reply::json(200, &token_body("tokB"))),
		(HOP_B_PATH, Reply::json(200, &token_body("tokB"))),
		(RESOURCE_PATH, Reply::json(200, &envelope(&["HT-1000"]))),
		(RESOURCE_PATH, Reply::json(200, &envelope(&["HT-1001"]))),
	]);
	let pipeline = build_fake_pipeline(transport.clone());
	let (first, second) =
		tokio::join!(pipeline.run("alice-jwt", "HT-1000"), pipeline.run("bob-jwt", "HT-1001"));

	first.expect("First invocation should succeed.");
	second.expect("Second invocation should succeed.");

	let fetches = transport
		.requests()
		.into_iter()
		.filter(|request| request.path == RESOURCE_PATH)
		.filter_map(|request| {
			request.headers.get("productid").and_then(|value| value.to_str().ok().map(str::to_owned))
		})
		.collect::<Vec<_>>();

	assert_eq!(fetches.len(), 2);
	assert!(fetches.contains(&"HT-1000".to_owned()));
	assert!(fetches.contains(&"HT-1001".to_owned()));
	assert_eq!(pipeline.metrics.successes(Stage::OnBehalfOf), 2);
}

#[tokio::test]
async fn retry_policy_none_is_a_single_invocation() {
	let transport = RecordingTransport::scripted([(HOP_A_PATH, Reply::json(503, ""))]);
	let pipeline = build_fake_pipeline(transport.clone());
	let err = pipeline
		.run_with_retry("user-jwt", "HT-1000", &RetryPolicy::none(), &CancellationToken::new())
		.await
		.expect_err("Outage should fail.");

	assert!(err.is_transient());
	assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn cancellation_during_the_retry_wait_reports_cancelled() {
	let transport = RecordingTransport::scripted([
		(HOP_A_PATH, Reply::json(503, "{\"error\":\"temporarily_unavailable\"}")),
		(HOP_A_PATH, Reply::json(200, &token_body("tokA"))),
	]);
	let pipeline = build_fake_pipeline(transport.clone());
	let policy = RetryPolicy::new(3)
		.with_base_delay(Duration::from_secs(5))
		.with_max_delay(Duration::from_secs(5));
	let cancel = CancellationToken::new();
	let trigger = cancel.clone();
	let canceller = tokio::spawn(async move {
		tokio::time::sleep(Duration::from_millis(50)).await;
		trigger.cancel();
	});
	let started = std::time::Instant::now();
	let err = pipeline
		.run_with_retry("user-jwt", "HT-1000", &policy, &cancel)
		.await
		.expect_err("Cancelled retry should not succeed.");

	canceller.await.expect("Canceller task should finish.");

	assert!(matches!(err, PipelineError::Cancelled { stage: Stage::OnBehalfOf }));
	assert!(!err.is_transient());
	assert!(started.elapsed() < Duration::from_secs(2));
	assert_eq!(transport.calls_to(HOP_A_PATH), 1);
}

#[tokio::test]
async fn retry_recovers_from_a_transient_hop_failure() {
	let transport = RecordingTransport::scripted([
		(HOP_A_PATH, Reply::json(429, "{\"error\":\"temporarily_unavailable\"}")),
		(HOP_A_PATH, Reply::json(200, &token_body("tokA"))),
		(HOP_B_PATH, Reply::json(200, &token_body("tokB"))),
		(RESOURCE_PATH, Reply::json(200, &envelope(&["HT-1000"]))),
	]);
	let pipeline = build_fake_pipeline(transport.clone());
	let policy = RetryPolicy::new(2)
		.with_base_delay(Duration::from_millis(1))
		.with_max_delay(Duration::from_millis(5));
	let records = pipeline
		.run_with_retry("user-jwt", "HT-1000", &policy, &CancellationToken::new())
		.await
		.expect("Second attempt should succeed.");

	assert_eq!(records.len(), 1);
	assert_eq!(transport.calls_to(HOP_A_PATH), 2);
	assert_eq!(pipeline.metrics.failures(Stage::OnBehalfOf), 1);
	assert_eq!(pipeline.metrics.successes(Stage::OnBehalfOf), 1);
}
