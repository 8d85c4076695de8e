//! Serializable OAuth 2.0 strategy configuration and its validating builder.

// self
use crate::{
	_prelude::*,
	auth::{GrantType, Secret},
	error::ConfigError,
	store::DEFAULT_TOKEN_KEY,
	strategy,
};

/// Token endpoint path used when none is configured.
pub const DEFAULT_LOGIN_ENDPOINT: &str = "oauth/token";
/// Revocation endpoint path used when none is configured.
pub const DEFAULT_REVOKE_ENDPOINT: &str = "oauth/revoke";

/// Grant an [`OAuth2Strategy`](crate::strategy::OAuth2Strategy) logs in with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OAuth2Grant {
	/// Username/password (or one-time token) login; refreshes with the refresh token.
	Password,
	/// App-only credentials; re-issues tokens without user input.
	ClientCredentials,
	/// Browser-based authorization code login.
	AuthorizationCode {
		/// Redirect URI registered with the provider.
		redirect_uri: Url,
		/// Authorization endpoint path, resolved against the base URI.
		authorization_endpoint: String,
	},
}
impl OAuth2Grant {
	/// Wire grant type used for the initial login.
	pub const fn grant_type(&self) -> GrantType {
		match self {
			Self::Password => GrantType::Password,
			Self::ClientCredentials => GrantType::ClientCredentials,
			Self::AuthorizationCode { .. } => GrantType::AuthorizationCode,
		}
	}

	/// Stable label used in error messages.
	pub const fn as_str(&self) -> &'static str {
		self.grant_type().as_str()
	}
}

/// Settings shared by every OAuth 2.0 grant.
///
/// Endpoints are paths resolved with [`Url::join`] against `base_uri`, so a base URI that should
/// keep its last path segment must end with `/`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OAuth2Config {
	/// API root the endpoints are resolved against.
	pub base_uri: Url,
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: Secret,
	/// Grant used to log in and re-issue tokens.
	pub grant: OAuth2Grant,
	/// Token endpoint path.
	#[serde(default = "default_login_endpoint")]
	pub login_endpoint: String,
	/// Revocation endpoint path.
	#[serde(default = "default_revoke_endpoint")]
	pub revoke_endpoint: String,
	/// Key of the persisted token record in the secure store.
	#[serde(default = "default_store_key")]
	pub store_key: String,
}
impl OAuth2Config {
	/// Returns a builder seeded with the required settings and default endpoints.
	pub fn builder(
		base_uri: Url,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		grant: OAuth2Grant,
	) -> OAuth2ConfigBuilder {
		OAuth2ConfigBuilder {
			config: Self {
				base_uri,
				client_id: client_id.into(),
				client_secret: Secret::new(client_secret),
				grant,
				login_endpoint: DEFAULT_LOGIN_ENDPOINT.into(),
				revoke_endpoint: DEFAULT_REVOKE_ENDPOINT.into(),
				store_key: DEFAULT_TOKEN_KEY.into(),
			},
		}
	}

	/// Checks every setting; deserialized configs should be validated before use.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.base_uri.cannot_be_a_base() {
			return Err(ConfigError::InvalidUrl {
				field: "base_uri",
				source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
			});
		}

		strategy::require_non_blank("client_id", &self.client_id)?;
		strategy::require_non_blank("client_secret", self.client_secret.expose())?;
		strategy::require_non_blank("store_key", &self.store_key)?;
		self.login_url()?;
		self.revoke_url()?;

		if let OAuth2Grant::AuthorizationCode { authorization_endpoint, .. } = &self.grant {
			self.endpoint("authorization_endpoint", authorization_endpoint)?;
		}

		Ok(())
	}

	/// Absolute token endpoint URL.
	pub fn login_url(&self) -> Result<Url, ConfigError> {
		self.endpoint("login_endpoint", &self.login_endpoint)
	}

	/// Absolute revocation endpoint URL.
	pub fn revoke_url(&self) -> Result<Url, ConfigError> {
		self.endpoint("revoke_endpoint", &self.revoke_endpoint)
	}

	/// Browser URL that starts an authorization code login.
	///
	/// The query carries `response_type=code`, `client_id`, and `redirect_uri`.
	pub fn authorization_url(&self) -> Result<Url, ConfigError> {
		let OAuth2Grant::AuthorizationCode { redirect_uri, authorization_endpoint } = &self.grant
		else {
			return Err(ConfigError::GrantMismatch {
				operation: "authorization_url",
				expected: GrantType::AuthorizationCode.as_str(),
				actual: self.grant.as_str(),
			});
		};
		let mut url = self.endpoint("authorization_endpoint", authorization_endpoint)?;

		url.query_pairs_mut()
			.append_pair("response_type", "code")
			.append_pair("client_id", &self.client_id)
			.append_pair("redirect_uri", redirect_uri.as_str());

		Ok(url)
	}

	fn endpoint(&self, field: &'static str, endpoint: &str) -> Result<Url, ConfigError> {
		strategy::require_non_blank(field, endpoint)?;

		self.base_uri.join(endpoint).map_err(|source| ConfigError::InvalidUrl { field, source })
	}
}

/// Builder for [`OAuth2Config`].
#[derive(Debug)]
pub struct OAuth2ConfigBuilder {
	config: OAuth2Config,
}
impl OAuth2ConfigBuilder {
	/// Overrides the token endpoint path.
	pub fn login_endpoint(mut self, endpoint: impl Into<String>) -> Self {
		self.config.login_endpoint = endpoint.into();

		self
	}

	/// Overrides the revocation endpoint path.
	pub fn revoke_endpoint(mut self, endpoint: impl Into<String>) -> Self {
		self.config.revoke_endpoint = endpoint.into();

		self
	}

	/// Overrides the secure-store key so several strategies can share one store.
	pub fn store_key(mut self, key: impl Into<String>) -> Self {
		self.config.store_key = key.into();

		self
	}

	/// Validates and returns the configuration.
	pub fn build(self) -> Result<OAuth2Config, ConfigError> {
		self.config.validate()?;

		Ok(self.config)
	}
}

fn default_login_endpoint() -> String {
	DEFAULT_LOGIN_ENDPOINT.into()
}

fn default_revoke_endpoint() -> String {
	DEFAULT_REVOKE_ENDPOINT.into()
}

fn default_store_key() -> String {
	DEFAULT_TOKEN_KEY.into()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn base() -> Url {
		Url::parse("https://auth.example.com/").expect("Base URL fixture should parse.")
	}

	fn auth_code_grant() -> OAuth2Grant {
		OAuth2Grant::AuthorizationCode {
			redirect_uri: Url::parse("https://app.example.com/callback")
				.expect("Redirect URL fixture should parse."),
			authorization_endpoint: "oauth/authorize".into(),
		}
	}

	#[test]
	fn builder_applies_defaults() {
		let config = OAuth2Config::builder(base(), "client", "secret", OAuth2Grant::Password)
			.build()
			.expect("Password config should be valid.");
		let login = config.login_url().expect("Login URL should resolve.");
		let revoke = config.revoke_url().expect("Revoke URL should resolve.");

		assert_eq!(login.as_str(), "https://auth.example.com/oauth/token");
		assert_eq!(revoke.as_str(), "https://auth.example.com/oauth/revoke");
		assert_eq!(config.store_key, DEFAULT_TOKEN_KEY);
	}

	#[test]
	fn blank_values_are_rejected() {
		let blank_secret =
			OAuth2Config::builder(base(), "client", " ", OAuth2Grant::Password).build();
		let blank_endpoint =
			OAuth2Config::builder(base(), "client", "secret", OAuth2Grant::Password)
				.login_endpoint("")
				.build();
		let blank_key = OAuth2Config::builder(base(), "client", "secret", OAuth2Grant::Password)
			.store_key("\t")
			.build();

		assert!(matches!(blank_secret, Err(ConfigError::Blank { field: "client_secret" })));
		assert!(matches!(blank_endpoint, Err(ConfigError::Blank { field: "login_endpoint" })));
		assert!(matches!(blank_key, Err(ConfigError::Blank { field: "store_key" })));
	}

	#[test]
	fn authorization_url_carries_code_request() {
		let config = OAuth2Config::builder(base(), "client 1", "secret", auth_code_grant())
			.build()
			.expect("Authorization code config should be valid.");
		let url = config.authorization_url().expect("Authorization URL should build.");

		assert_eq!(
			url.as_str(),
			"https://auth.example.com/oauth/authorize?response_type=code&client_id=client+1&redirect_uri=https%3A%2F%2Fapp.example.com%2Fcallback"
		);

		let password = OAuth2Config::builder(base(), "client", "secret", OAuth2Grant::Password)
			.build()
			.expect("Password config should be valid.");

		assert!(matches!(
			password.authorization_url(),
			Err(ConfigError::GrantMismatch {
				expected: "authorization_code",
				actual: "password",
				..
			})
		));
	}

	#[test]
	fn deserialized_config_fills_defaults() {
		let config: OAuth2Config = serde_json::from_str(
			r#"{
				"base_uri": "https://auth.example.com/",
				"client_id": "client",
				"client_secret": "secret",
				"grant": { "type": "client_credentials" }
			}"#,
		)
		.expect("Config JSON should deserialize.");

		config.validate().expect("Deserialized config should be valid.");

		assert_eq!(config.grant, OAuth2Grant::ClientCredentials);
		assert_eq!(config.login_endpoint, DEFAULT_LOGIN_ENDPOINT);
		assert_eq!(config.revoke_endpoint, DEFAULT_REVOKE_ENDPOINT);
		assert!(!format!("{config:?}").contains("\"secret\""));
	}
}
