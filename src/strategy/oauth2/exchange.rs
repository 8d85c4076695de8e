//! Token endpoint wire format: per-grant form bodies and token response parsing.

// crates.io
use serde::{Deserializer, de::Error as _};
// self
use crate::{
	_prelude::*,
	auth::{GrantType, TokenRecord},
	error::{ConfigError, TokenEndpointError},
	http::Response,
	strategy::{self, Credentials, OAuth2Config, OAuth2Grant},
};

/// Ordered `application/x-www-form-urlencoded` pairs.
pub(crate) type Form = Vec<(&'static str, String)>;

/// Builds the login form for `credentials` under the configured grant.
pub(crate) fn login_form(
	config: &OAuth2Config,
	credentials: &Credentials,
) -> Result<Form, ConfigError> {
	match (&config.grant, credentials) {
		(OAuth2Grant::Password, Credentials::Password { username, password }) => {
			strategy::require_non_blank("username", username)?;
			strategy::require_non_blank("password", password.expose())?;

			Ok(grant_form(
				config,
				GrantType::Password,
				&[("username", username.as_str()), ("password", password.expose())],
			))
		},
		(OAuth2Grant::Password, Credentials::OneTimeToken { token }) => {
			strategy::require_non_blank("token", token.expose())?;

			Ok(grant_form(config, GrantType::OneTimeToken, &[("tid", token.expose())]))
		},
		(OAuth2Grant::ClientCredentials, Credentials::None) =>
			Ok(grant_form(config, GrantType::ClientCredentials, &[])),
		(
			OAuth2Grant::AuthorizationCode { redirect_uri, .. },
			Credentials::AuthorizationCode { code },
		) => {
			strategy::require_non_blank("code", code.expose())?;

			Ok(grant_form(
				config,
				GrantType::AuthorizationCode,
				&[("code", code.expose()), ("redirect_uri", redirect_uri.as_str())],
			))
		},
		(grant, other) => Err(ConfigError::UnsupportedCredentials {
			grant: grant.as_str(),
			credentials: other.kind(),
		}),
	}
}

/// `grant_type`, then `params`, then the client credentials.
pub(crate) fn grant_form(
	config: &OAuth2Config,
	grant: GrantType,
	params: &[(&'static str, &str)],
) -> Form {
	let mut form = Vec::with_capacity(params.len() + 3);

	form.push(("grant_type", grant.as_str().to_owned()));
	form.extend(params.iter().map(|(name, value)| (*name, (*value).to_owned())));
	form.push(("client_id", config.client_id.clone()));
	form.push(("client_secret", config.client_secret.expose().to_owned()));

	form
}

/// Revocation form; the refresh token is revoked when present, the access token otherwise.
pub(crate) fn revoke_form(config: &OAuth2Config, record: &TokenRecord) -> Form {
	let (hint, token) = match record.refresh_token().filter(|token| !token.is_blank()) {
		Some(refresh) => ("refresh_token", refresh),
		None => ("access_token", record.access_token()),
	};

	vec![
		("token_type_hint", hint.to_owned()),
		("token", token.expose().to_owned()),
		("client_id", config.client_id.clone()),
		("client_secret", config.client_secret.expose().to_owned()),
	]
}

/// Turns a successful token endpoint response into a record issued now.
///
/// A missing `expires_in` yields a zero-second lifetime, which schedules a refresh on first use.
pub(crate) fn parse_token_response(response: &Response) -> Result<TokenRecord> {
	let status = response.status.as_u16();

	if response.body.trim().is_empty() {
		return Err(TokenEndpointError::EmptyBody { status }.into());
	}

	let mut deserializer = serde_json::Deserializer::from_str(&response.body);
	let payload: TokenResponse = serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|e| TokenEndpointError::Parse { source: Arc::new(e), status })?;
	let access_token = payload
		.access_token
		.filter(|token| !token.trim().is_empty())
		.ok_or(TokenEndpointError::MissingAccessToken { status })?;
	let refresh_token = payload.refresh_token.filter(|token| !token.trim().is_empty());

	Ok(TokenRecord::new(access_token, refresh_token, payload.expires_in.unwrap_or_default())?)
}

#[derive(Deserialize)]
struct TokenResponse {
	access_token: Option<String>,
	#[serde(default)]
	refresh_token: Option<String>,
	#[serde(default, deserialize_with = "lenient_seconds")]
	expires_in: Option<i64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Seconds {
	Integer(i64),
	Float(f64),
	Text(String),
}

fn lenient_seconds<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
	D: Deserializer<'de>,
{
	match Option::<Seconds>::deserialize(deserializer)? {
		None => Ok(None),
		Some(Seconds::Integer(seconds)) => Ok(Some(seconds)),
		Some(Seconds::Float(seconds)) => Ok(Some(seconds as i64)),
		Some(Seconds::Text(raw)) => raw
			.trim()
			.parse::<i64>()
			.map(Some)
			.map_err(|_| D::Error::custom("expected a number of seconds")),
	}
}
