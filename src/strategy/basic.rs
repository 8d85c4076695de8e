//! HTTP Basic credentials held in memory.

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
// self
use crate::{
	_prelude::*,
	auth::Secret,
	error::ConfigError,
	http::HttpRequest,
	strategy::{self, AuthFuture, AuthStrategy, Credentials},
};

/// Static username/password strategy sending `Authorization: Basic ...`.
///
/// The strategy is authenticated as soon as credentials are set and never refreshes.
#[derive(Debug, Default)]
pub struct BasicAuthStrategy {
	credentials: RwLock<Option<(String, Secret)>>,
}
impl BasicAuthStrategy {
	/// Creates a strategy without credentials; call [`AuthStrategy::login`] to set them.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a strategy that is already authenticated.
	pub fn with_credentials(
		username: impl Into<String>,
		password: impl Into<String>,
	) -> Result<Self, ConfigError> {
		let strategy = Self::new();

		strategy.set(username.into(), Secret::new(password))?;

		Ok(strategy)
	}

	fn set(&self, username: String, password: Secret) -> Result<(), ConfigError> {
		strategy::require_non_blank("username", &username)?;
		strategy::require_non_blank("password", password.expose())?;

		*self.credentials.write() = Some((username, password));

		Ok(())
	}

	fn header_value(&self) -> Option<String> {
		let credentials = self.credentials.read();
		let (username, password) = credentials.as_ref()?;
		let encoded = STANDARD.encode(format!("{username}:{}", password.expose()));

		Some(format!("Basic {encoded}"))
	}
}
impl AuthStrategy for BasicAuthStrategy {
	fn is_authenticated(&self) -> bool {
		self.credentials.read().is_some()
	}

	fn authenticate_request<'a>(&'a self, request: &'a mut HttpRequest) -> AuthFuture<'a, ()> {
		Box::pin(async move {
			let value = self.header_value().ok_or_else(|| {
				Error::authentication_required("no basic credentials have been set")
			})?;

			strategy::set_authorization(request, &value)
		})
	}

	fn login(&self, credentials: Credentials) -> AuthFuture<'_, bool> {
		Box::pin(async move {
			match credentials {
				Credentials::Password { username, password } => self.set(username, password)?,
				other =>
					return Err(ConfigError::UnsupportedCredentials {
						grant: "basic",
						credentials: other.kind(),
					}
					.into()),
			}

			Ok(self.is_authenticated())
		})
	}

	fn logout(&self) -> AuthFuture<'_, ()> {
		Box::pin(async move {
			*self.credentials.write() = None;

			Ok(())
		})
	}
}
