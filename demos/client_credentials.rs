//! Demonstrates the client-credentials grant logging in transparently on first use and
//! persisting its token in a file-backed store.

// std
use std::{env, sync::Arc};
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use oauth2_pipeline::{
	client::{Body, RequestClient},
	store::FileStore,
	strategy::{OAuth2Config, OAuth2Grant, OAuth2Strategy},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth/token")
				.form_urlencoded_tuple("grant_type", "client_credentials");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"service-token\",\"expires_in\":900}",
			);
		})
		.await;
	let events = server
		.mock_async(|when, then| {
			when.method(POST).path("/events").header("authorization", "Bearer service-token");
			then.status(202);
		})
		.await;
	let base = Url::parse(&server.url("/"))?;
	let store = FileStore::open(env::temp_dir().join("oauth2_pipeline_demo_tokens.json"))?;
	let config = OAuth2Config::builder(
		base.clone(),
		"service-router",
		"super-secret",
		OAuth2Grant::ClientCredentials,
	)
	.store_key("service-router-tokens")
	.build()?;
	let strategy = Arc::new(OAuth2Strategy::new(config, Arc::new(store))?);
	let client = RequestClient::builder(base).auth_strategy(strategy.clone()).build()?;

	for id in 0..3 {
		let body = Body::json(&serde_json::json!({ "id": id, "kind": "ping" }))?;
		let response = client.post("events", body).await?;

		println!("Event {id} accepted with status {}.", response.status);
	}

	println!("Stored token expires at {:?}.", strategy.tokens().await?.map(|t| t.expires()));

	token.assert_async().await;
	events.assert_calls_async(3).await;

	Ok(())
}
