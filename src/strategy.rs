//! Credential strategies that authenticate outgoing requests.
//!
//! [`AuthStrategy`] is the seam the [`RequestClient`](crate::client::RequestClient) talks to.
//! Strategies that can recover from a rejected request additionally implement
//! [`RefreshableAuthStrategy`] and expose it through [`AuthStrategy::as_refreshable`], which is
//! what arms the client's retry-once-on-401/403 behavior.

pub mod auth_code;
pub mod basic;
pub mod oauth2;

pub use auth_code::*;
pub use basic::BasicAuthStrategy;
pub use self::oauth2::{
	DEFAULT_LOGIN_ENDPOINT, DEFAULT_REVOKE_ENDPOINT, OAuth2Config, OAuth2ConfigBuilder, OAuth2Grant,
	OAuth2Strategy,
};

// crates.io
use futures::future::BoxFuture;
// self
use crate::{
	_prelude::*,
	auth::Secret,
	error::ConfigError,
	http::HttpRequest,
	http_types::{HeaderValue, header::AUTHORIZATION},
};

/// Boxed future returned by strategy operations.
pub type AuthFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Polymorphic credential capability consumed by the request client.
pub trait AuthStrategy
where
	Self: Send + Sync,
{
	/// Returns `true` when credentials are available without any network call.
	fn is_authenticated(&self) -> bool;

	/// Asynchronous variant of [`AuthStrategy::is_authenticated`] for slow credential stores.
	fn is_authenticated_async(&self) -> BoxFuture<'_, bool> {
		Box::pin(async move { self.is_authenticated() })
	}

	/// Attaches credentials to `request`, replacing any existing `Authorization` header.
	fn authenticate_request<'a>(&'a self, request: &'a mut HttpRequest) -> AuthFuture<'a, ()>;

	/// Performs a login with `credentials` and reports whether the strategy is now authenticated.
	fn login(&self, credentials: Credentials) -> AuthFuture<'_, bool>;

	/// Forgets the current credentials.
	fn logout(&self) -> AuthFuture<'_, ()>;

	/// Returns the refresh capability, if this strategy has one.
	fn as_refreshable(&self) -> Option<&dyn RefreshableAuthStrategy> {
		None
	}
}

/// Strategy that can force a credential refresh after the server rejected a request.
pub trait RefreshableAuthStrategy
where
	Self: AuthStrategy,
{
	/// Refreshes credentials unconditionally, then re-attaches them to `request`.
	fn refresh_and_authenticate_request<'a>(
		&'a self,
		request: &'a mut HttpRequest,
	) -> AuthFuture<'a, ()>;
}

/// Login input accepted by [`AuthStrategy::login`].
#[derive(Clone, Debug)]
pub enum Credentials {
	/// No end-user input (client credentials).
	None,
	/// Username and password.
	Password {
		/// Account identifier.
		username: String,
		/// Account password.
		password: Secret,
	},
	/// Authorization code captured from a redirect.
	AuthorizationCode {
		/// Code returned by the authorization server.
		code: Secret,
	},
	/// Single-use login token delivered out of band.
	OneTimeToken {
		/// Token identifier sent as `tid`.
		token: Secret,
	},
}
impl Credentials {
	/// Builds [`Credentials::Password`].
	pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
		Self::Password { username: username.into(), password: Secret::new(password) }
	}

	/// Builds [`Credentials::AuthorizationCode`].
	pub fn authorization_code(code: impl Into<String>) -> Self {
		Self::AuthorizationCode { code: Secret::new(code) }
	}

	/// Builds [`Credentials::OneTimeToken`].
	pub fn one_time_token(token: impl Into<String>) -> Self {
		Self::OneTimeToken { token: Secret::new(token) }
	}

	/// Stable label used in error messages.
	pub const fn kind(&self) -> &'static str {
		match self {
			Self::None => "no",
			Self::Password { .. } => "password",
			Self::AuthorizationCode { .. } => "authorization code",
			Self::OneTimeToken { .. } => "one-time token",
		}
	}
}

pub(crate) fn require_non_blank(field: &'static str, value: &str) -> Result<(), ConfigError> {
	if value.trim().is_empty() {
		return Err(ConfigError::Blank { field });
	}

	Ok(())
}

pub(crate) fn set_authorization(request: &mut HttpRequest, value: &str) -> Result<()> {
	let value = HeaderValue::from_str(value)
		.map_err(|_| ConfigError::InvalidHeader { name: AUTHORIZATION.as_str().into() })?;

	request.headers_mut().insert(AUTHORIZATION, value);

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn set_authorization_replaces_existing_values() {
		let mut request = HttpRequest::new(Vec::new());

		request.headers_mut().append(AUTHORIZATION, HeaderValue::from_static("Bearer stale"));
		request.headers_mut().append(AUTHORIZATION, HeaderValue::from_static("Bearer older"));
		set_authorization(&mut request, "Bearer fresh").expect("Header value should be valid.");

		let values = request.headers().get_all(AUTHORIZATION).iter().collect::<Vec<_>>();

		assert_eq!(values, vec![&HeaderValue::from_static("Bearer fresh")]);
	}

	#[test]
	fn credentials_debug_redacts_secrets() {
		let rendered = format!("{:?}", Credentials::password("ada", "hunter2"));

		assert!(rendered.contains("ada"));
		assert!(!rendered.contains("hunter2"));
	}
}
