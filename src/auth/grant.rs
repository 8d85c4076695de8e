//! Grant identifiers sent to the token endpoint as `grant_type`.

// self
use crate::_prelude::*;

/// Token endpoint grant types the pipeline sends in `grant_type`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
	/// Resource owner password credentials.
	Password,
	/// App-only client credentials.
	ClientCredentials,
	/// Authorization code obtained from a browser redirect.
	AuthorizationCode,
	/// Refresh token exchange for an expiring session.
	RefreshToken,
	/// Single-use login token issued out of band (for example, a magic link).
	OneTimeToken,
}
impl GrantType {
	/// Returns the wire identifier for the grant type.
	pub const fn as_str(self) -> &'static str {
		match self {
			GrantType::Password => "password",
			GrantType::ClientCredentials => "client_credentials",
			GrantType::AuthorizationCode => "authorization_code",
			GrantType::RefreshToken => "refresh_token",
			GrantType::OneTimeToken => "one_time_token",
		}
	}
}
impl Display for GrantType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
