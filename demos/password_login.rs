//! Demonstrates a password login followed by authenticated API calls that survive a rejected
//! token through the pipeline's refresh-and-retry path.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use oauth2_pipeline::{
	client::RequestClient,
	store::MemoryStore,
	strategy::{AuthStrategy, Credentials, OAuth2Config, OAuth2Grant, OAuth2Strategy},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let login = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token").form_urlencoded_tuple("grant_type", "password");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"refresh_token\":\"demo-refresh\",\"expires_in\":3600}",
			);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth/token")
				.form_urlencoded_tuple("grant_type", "refresh_token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access-2\",\"expires_in\":3600}",
			);
		})
		.await;
	let revoked = server
		.mock_async(|when, then| {
			when.method(GET).path("/me").header("authorization", "Bearer demo-access");
			then.status(401).body("{\"message\":\"Token revoked.\"}");
		})
		.await;
	let me = server
		.mock_async(|when, then| {
			when.method(GET).path("/me").header("authorization", "Bearer demo-access-2");
			then.status(200).header("content-type", "application/json").body("{\"name\":\"Ada\"}");
		})
		.await;
	let revoke = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth/revoke")
				.form_urlencoded_tuple("token_type_hint", "refresh_token");
			then.status(200);
		})
		.await;
	let base = Url::parse(&server.url("/"))?;
	let config =
		OAuth2Config::builder(base.clone(), "demo-client", "demo-secret", OAuth2Grant::Password)
			.build()?;
	let strategy = Arc::new(OAuth2Strategy::new(config, Arc::new(MemoryStore::default()))?);

	strategy.login(Credentials::password("ada", "correct horse battery staple")).await?;

	let client = RequestClient::builder(base).auth_strategy(strategy.clone()).build()?;
	let profile = client.get("me").await?;

	println!("Profile: {}.", profile.body);
	println!("Refreshes performed: {}.", strategy.refresh_metrics().successes());

	strategy.logout().await?;

	println!("Authenticated after logout: {}.", strategy.is_authenticated());

	login.assert_async().await;
	refresh.assert_async().await;
	revoked.assert_async().await;
	me.assert_async().await;
	revoke.assert_async().await;

	Ok(())
}
