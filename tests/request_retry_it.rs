mod common;

// std
use std::sync::Arc;
// self
use common::{Reply, StubTransport};
use oauth2_pipeline::{
	auth::TokenRecord,
	client::{ApiRequest, Body, RequestClient},
	error::Error,
	http_types::Method,
	store::MemoryStore,
	strategy::{AuthStrategy, BasicAuthStrategy, OAuth2Grant},
};

fn client(strategy: Arc<dyn AuthStrategy>, transport: Arc<StubTransport>) -> RequestClient {
	RequestClient::builder(common::base_url())
		.auth_strategy(strategy)
		.accept_language("en-GB")
		.transport(transport)
		.build()
		.expect("Request client fixture should build.")
}

fn seeded_store() -> Arc<MemoryStore> {
	let store = Arc::new(MemoryStore::default());

	common::seed(
		&store,
		&TokenRecord::new("access-1", Some("refresh-1".into()), 3600)
			.expect("Token record fixture should be valid."),
	);

	store
}

#[tokio::test]
async fn rejected_request_refreshes_and_retries_once() {
	let transport = StubTransport::new();

	transport
		.on("/oauth/token", Reply::tokens("access-2", Some("refresh-2"), 3600))
		.on("/profile", Reply::new(401, r#"{"message":"Token expired."}"#))
		.on("/profile", Reply::new(200, r#"{"name":"Ada"}"#));

	let strategy = common::strategy(OAuth2Grant::Password, seeded_store(), transport.clone());
	let response = client(strategy.clone(), transport.clone())
		.get("profile")
		.await
		.expect("Retried request should succeed.");

	assert_eq!(response.body, r#"{"name":"Ada"}"#);
	assert_eq!(transport.sends_to("/profile"), 2);
	assert_eq!(transport.sends_to("/oauth/token"), 1);
	assert_eq!(
		transport.authorization_headers("/profile"),
		["Bearer access-1", "Bearer access-2"]
	);
	assert_eq!(strategy.refresh_metrics().attempts(), 1);

	let stored = strategy
		.tokens()
		.await
		.expect("Store read should succeed.")
		.expect("Refreshed tokens should be persisted.");

	assert_eq!(stored.access_token().expose(), "access-2");
	assert_eq!(stored.refresh_token().map(|token| token.expose()), Some("refresh-2"));
}

#[tokio::test]
async fn second_rejection_is_surfaced_without_a_third_attempt() {
	let transport = StubTransport::new();

	transport
		.on("/oauth/token", Reply::tokens("access-2", Some("refresh-2"), 3600))
		.on("/profile", Reply::new(401, ""))
		.on("/profile", Reply::new(403, r#"{"message":"Account is locked."}"#))
		.otherwise(Reply::new(200, "third attempt"));

	let strategy = common::strategy(OAuth2Grant::Password, seeded_store(), transport.clone());
	let err = client(strategy, transport.clone())
		.get("profile")
		.await
		.expect_err("A second rejection should fail the request.");

	assert_eq!(transport.sends_to("/profile"), 2);
	assert_eq!(err.http_status(), Some(403));

	let Error::Http(failure) = err else {
		panic!("Rejected requests should surface as HTTP errors.");
	};

	assert_eq!(failure.message, "Account is locked.");
	assert_eq!(failure.body(), r#"{"message":"Account is locked."}"#);
}

#[tokio::test]
async fn failed_refresh_surfaces_its_own_error() {
	let transport = StubTransport::new();

	transport
		.on("/oauth/token", Reply::new(400, r#"{"message":"Refresh token revoked."}"#))
		.on("/profile", Reply::new(401, ""))
		.otherwise(Reply::new(200, "unexpected"));

	let strategy = common::strategy(OAuth2Grant::Password, seeded_store(), transport.clone());
	let err = client(strategy.clone(), transport.clone())
		.get("profile")
		.await
		.expect_err("A failed refresh should fail the request.");

	assert_eq!(err.http_status(), Some(400));
	assert_eq!(err.to_string(), "Refresh token revoked.");
	assert_eq!(transport.sends_to("/profile"), 1);
	assert_eq!(strategy.refresh_metrics().failures(), 1);
}

#[tokio::test]
async fn non_refreshable_strategies_do_not_retry() {
	let transport = StubTransport::new();

	transport.on("/profile", Reply::new(401, "")).otherwise(Reply::new(200, "unexpected"));

	let strategy = Arc::new(
		BasicAuthStrategy::with_credentials("ada", "pw")
			.expect("Basic credentials fixture should be valid."),
	);
	let err = client(strategy, transport.clone())
		.get("profile")
		.await
		.expect_err("Basic strategies should surface the rejection.");

	assert_eq!(err.http_status(), Some(401));
	assert_eq!(transport.sends(), 1);
	assert_eq!(transport.authorization_headers("/profile"), ["Basic YWRhOnB3"]);
}

#[tokio::test]
async fn request_bodies_are_replayed_on_retry() {
	let transport = StubTransport::new();

	transport
		.on("/oauth/token", Reply::tokens("access-2", None, 3600))
		.on("/notes", Reply::new(401, ""))
		.on("/notes", Reply::new(201, r#"{"id":1}"#));

	let strategy = common::strategy(OAuth2Grant::Password, seeded_store(), transport.clone());
	let request = ApiRequest::new(Method::POST, "notes")
		.header("X-Request-Id", "abc")
		.body(Body::form([("title", "Groceries")]));
	let response = client(strategy, transport.clone())
		.send(request)
		.await
		.expect("Replayed request should succeed.");

	assert_eq!(response.status.as_u16(), 201);
	assert_eq!(transport.form(0), [("title".to_owned(), "Groceries".to_owned())]);
	assert_eq!(transport.form(2), [("title".to_owned(), "Groceries".to_owned())]);
}

#[tokio::test]
async fn missing_login_is_reported_before_sending() {
	let transport = StubTransport::new();
	let strategy = common::strategy(
		OAuth2Grant::Password,
		Arc::new(MemoryStore::default()),
		transport.clone(),
	);
	let err = client(strategy, transport.clone())
		.get("profile")
		.await
		.expect_err("Requests without tokens should fail.");

	assert!(err.is_authentication_required());
	assert_eq!(transport.sends(), 0);
}
