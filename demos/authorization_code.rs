//! Demonstrates the authorization-code grant: build the browser URL, intercept the redirect
//! an embedded browser reports, and exchange the captured code for tokens.

// std
use std::sync::Arc;
// crates.io
use color_eyre::{Result, eyre::eyre};
use httpmock::prelude::*;
use url::Url;
// self
use oauth2_pipeline::{
	auth::JsonWebToken,
	store::MemoryStore,
	strategy::{AuthorizationResponse, OAuth2Config, OAuth2Grant, OAuth2Strategy},
};

// Header `{"alg":"none"}`, payload `{"sub":"user-42","exp":4102444800}`.
const DEMO_JWT: &str = "eyJhbGciOiJub25lIn0.eyJzdWIiOiJ1c2VyLTQyIiwiZXhwIjo0MTAyNDQ0ODAwfQ.sig";

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth/token")
				.form_urlencoded_tuple("grant_type", "authorization_code")
				.form_urlencoded_tuple("code", "demo-code");
			then.status(200).header("content-type", "application/json").body(format!(
				"{{\"access_token\":\"{DEMO_JWT}\",\"refresh_token\":\"demo-refresh\",\"expires_in\":3600}}"
			));
		})
		.await;
	let grant = OAuth2Grant::AuthorizationCode {
		redirect_uri: Url::parse("https://app.example.com/oauth/callback")?,
		authorization_endpoint: "oauth/authorize".into(),
	};
	let config =
		OAuth2Config::builder(Url::parse(&server.url("/"))?, "demo-client", "demo-secret", grant)
			.build()?;
	let strategy = Arc::new(OAuth2Strategy::new(config, Arc::new(MemoryStore::default()))?);

	println!("Open this URL in a browser: {}.", strategy.authorization_url()?);

	let interceptor = strategy.redirect_interceptor()?;
	let navigations = [
		"https://provider.example.com/login",
		"https://www.app.example.com/oauth/callback/?code=demo-code&state=xyz",
		"https://www.app.example.com/oauth/callback/?code=replayed",
	];
	let mut outcome = None;

	for navigation in navigations {
		if let Some(response) = interceptor.intercept(navigation) {
			println!("Intercepted {navigation}.");

			outcome = Some(response);
		}
	}

	match outcome {
		Some(AuthorizationResponse::Code(code)) => {
			strategy.login_with_code(code.expose()).await?;
		},
		Some(AuthorizationResponse::Denied { error, description }) =>
			return Err(eyre!("authorization denied: {error} ({description:?})")),
		None => return Err(eyre!("the redirect was never observed")),
	}

	let access = strategy.access_token().await?;
	let jwt = JsonWebToken::parse(access.expose())?;

	println!("Logged in as {:?}; token expires at {:?}.", jwt.subject, jwt.expiration_time);

	token.assert_async().await;

	Ok(())
}
