mod common;

// std
use std::{env, process, sync::Arc, time::Duration};
// crates.io
use futures::future;
// self
use common::{Reply, StubTransport};
use oauth2_pipeline::{
	auth::TokenRecord,
	store::{DEFAULT_TOKEN_KEY, FileStore, MemoryStore, SecureStore},
	strategy::{AuthStrategy, Credentials, OAuth2Grant, OAuth2Strategy},
};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_share_one_refresh() {
	let transport = StubTransport::new();

	transport
		.delay(Duration::from_millis(50))
		.on("/oauth/token", Reply::tokens("access-2", Some("refresh-2"), 3600));

	let store = Arc::new(MemoryStore::default());

	common::seed(
		&store,
		&TokenRecord::new("access-1", Some("refresh-1".into()), 60)
			.expect("Expiring record fixture should be valid."),
	);

	let strategy = common::strategy(OAuth2Grant::Password, store, transport.clone());
	let callers = (0..10).map(|_| {
		let strategy = strategy.clone();

		tokio::spawn(async move { strategy.access_token().await })
	});
	let tokens = future::join_all(callers).await;

	for token in tokens {
		let token = token
			.expect("Caller task should not panic.")
			.expect("Every caller should receive a token.");

		assert_eq!(token.expose(), "access-2");
	}

	assert_eq!(transport.sends(), 1);
	assert_eq!(strategy.refresh_metrics().attempts(), 1);
}

#[tokio::test]
async fn client_credentials_log_in_once_for_concurrent_callers() {
	let transport = StubTransport::new();

	transport
		.delay(Duration::from_millis(20))
		.on("/oauth/token", Reply::tokens("app-token", None, 3600));

	let strategy = common::strategy(
		OAuth2Grant::ClientCredentials,
		Arc::new(MemoryStore::default()),
		transport.clone(),
	);
	let tokens =
		future::join_all((0..5).map(|_| strategy.access_token())).await.into_iter().map(|token| {
			token.expect("Client credentials should log in transparently.").expose().to_owned()
		});

	assert!(tokens.into_iter().all(|token| token == "app-token"));
	assert_eq!(transport.sends(), 1);
	assert_eq!(transport.form(0)[0], ("grant_type".to_owned(), "client_credentials".to_owned()));
	assert!(strategy.is_authenticated());
}

#[tokio::test]
async fn logout_clears_tokens_even_when_revocation_fails() {
	let transport = StubTransport::new();

	transport
		.on("/oauth/token", Reply::tokens("access-1", Some("refresh-1"), 3600))
		.on("/oauth/revoke", Reply::new(500, ""));

	let store = Arc::new(MemoryStore::default());
	let strategy = common::strategy(OAuth2Grant::Password, store.clone(), transport.clone());

	assert!(
		strategy
			.login(Credentials::password("ada", "pw"))
			.await
			.expect("Password login should succeed.")
	);
	assert!(strategy.is_authenticated());

	strategy.logout().await.expect("Logout should swallow revocation failures.");

	assert!(!strategy.is_authenticated());
	assert!(!strategy.is_authenticated_async().await);
	assert!(store.get(DEFAULT_TOKEN_KEY).expect("Store read should succeed.").is_none());
	assert_eq!(transport.sends_to("/oauth/revoke"), 1);
	assert_eq!(transport.authorization_headers("/oauth/revoke"), ["Bearer access-1"]);
	assert_eq!(transport.form(1)[1], ("token".to_owned(), "refresh-1".to_owned()));
}

#[tokio::test]
async fn logout_without_tokens_skips_revocation() {
	let transport = StubTransport::new();
	let strategy = common::strategy(
		OAuth2Grant::Password,
		Arc::new(MemoryStore::default()),
		transport.clone(),
	);

	strategy.logout().await.expect("Logout without tokens should succeed.");

	assert_eq!(transport.sends(), 0);
}

#[tokio::test]
async fn revoke_tokens_reports_failures() {
	let transport = StubTransport::new();

	transport.on("/oauth/revoke", Reply::new(503, ""));

	let strategy = common::strategy(
		OAuth2Grant::Password,
		Arc::new(MemoryStore::default()),
		transport.clone(),
	);
	let record =
		TokenRecord::new("access-1", None, 3600).expect("Token record fixture should be valid.");
	let err = strategy.revoke_tokens(&record).await.expect_err("Revocation should fail.");

	assert_eq!(err.http_status(), Some(503));
	assert_eq!(transport.form(0)[0], ("token_type_hint".to_owned(), "access_token".to_owned()));
}

#[tokio::test]
async fn one_time_token_login_uses_tid() {
	let transport = StubTransport::new();

	transport.on("/oauth/token", Reply::tokens("access-1", Some("refresh-1"), 3600));

	let strategy = common::strategy(
		OAuth2Grant::Password,
		Arc::new(MemoryStore::default()),
		transport.clone(),
	);

	assert!(
		strategy
			.login_with_one_time_token("magic-link-42")
			.await
			.expect("One-time token login should succeed.")
	);

	let form = transport.form(0);

	assert_eq!(form[0], ("grant_type".to_owned(), "one_time_token".to_owned()));
	assert_eq!(form[1], ("tid".to_owned(), "magic-link-42".to_owned()));
}

#[tokio::test]
async fn tokens_survive_in_a_file_store() {
	let path = env::temp_dir().join(format!(
		"oauth2_pipeline_lifecycle_{}_{}.json",
		process::id(),
		time::OffsetDateTime::now_utc().unix_timestamp_nanos(),
	));
	let transport = StubTransport::new();

	transport
		.on("/oauth/token", Reply::tokens("access-1", Some("refresh-1"), 3600))
		.on("/oauth/revoke", Reply::new(200, ""));

	let first = OAuth2Strategy::with_transport(
		common::config(OAuth2Grant::Password),
		Arc::new(FileStore::open(&path).expect("File store should open.")),
		transport.clone(),
	)
	.expect("File-backed strategy should build.");

	first.login(Credentials::password("ada", "pw")).await.expect("Password login should succeed.");

	let reopened = OAuth2Strategy::with_transport(
		common::config(OAuth2Grant::Password),
		Arc::new(FileStore::open(&path).expect("File store should reopen.")),
		transport.clone(),
	)
	.expect("File-backed strategy should build.");

	assert!(reopened.is_authenticated());
	assert_eq!(
		reopened.access_token().await.expect("Persisted token should be usable.").expose(),
		"access-1"
	);

	reopened.logout().await.expect("Logout should succeed.");

	let after = FileStore::open(&path).expect("File store should reopen after logout.");

	assert!(after.get(DEFAULT_TOKEN_KEY).expect("Store read should succeed.").is_none());

	let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn strategies_with_distinct_keys_share_a_store() {
	let transport = StubTransport::new();

	transport
		.on("/oauth/token", Reply::tokens("user-token", Some("refresh-1"), 3600))
		.on("/oauth/token", Reply::tokens("app-token", None, 3600));

	let store: Arc<dyn SecureStore> = Arc::new(MemoryStore::default());
	let user = OAuth2Strategy::with_transport(
		common::config(OAuth2Grant::Password),
		store.clone(),
		transport.clone(),
	)
	.expect("User strategy should build.");
	let app_config = oauth2_pipeline::strategy::OAuth2Config::builder(
		common::base_url(),
		common::CLIENT_ID,
		common::CLIENT_SECRET,
		OAuth2Grant::ClientCredentials,
	)
	.store_key("app-tokens")
	.build()
	.expect("App config should be valid.");
	let app = OAuth2Strategy::with_transport(app_config, store.clone(), transport.clone())
		.expect("App strategy should build.");

	user.login(Credentials::password("ada", "pw")).await.expect("User login should succeed.");

	let app_token = app.access_token().await.expect("App should log in transparently.");
	let user_token = user.access_token().await.expect("User token should remain stored.");

	assert_eq!(app_token.expose(), "app-token");
	assert_eq!(user_token.expose(), "user-token");
	assert!(store.get("app-tokens").expect("Store read should succeed.").is_some());
}
