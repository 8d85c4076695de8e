//! Pipeline-level error types shared across strategies, stores, transports, and the request client.

// self
use crate::{_prelude::*, http::Response};

/// Pipeline-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Shareable error source; single-flight generations hand the same failure to every caller.
pub type SharedError = Arc<dyn StdError + Send + Sync>;

/// Canonical pipeline error exposed by public APIs.
#[derive(Clone, Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem or invalid argument.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure other than missing connectivity (timeouts, protocol errors, I/O).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Token endpoint answered successfully but the payload was unusable.
	#[error(transparent)]
	TokenEndpoint(#[from] TokenEndpointError),
	/// Completed HTTP exchange with a non-success status.
	#[error(transparent)]
	Http(#[from] HttpRequestError),

	/// A successful response body could not be decoded into the requested type.
	#[error("Response body could not be decoded.")]
	Decode {
		/// Structured parsing failure including the failing JSON path.
		#[source]
		source: Arc<serde_path_to_error::Error<serde_json::Error>>,
	},
	/// The device has no usable network connection.
	#[error("No network connection is available.")]
	Connectivity {
		/// Transport-specific failure that was classified as offline.
		#[source]
		source: SharedError,
	},
	/// No token is available and the grant requires an interactive login.
	#[error("Authentication is required: {reason}.")]
	AuthenticationRequired {
		/// Human-readable reason string.
		reason: String,
	},
	/// Server-side revocation failed; callers treat this as a warning.
	#[error("Token revocation failed: {source}")]
	Revocation {
		/// Failure reported by the revoke call.
		#[source]
		source: Box<Error>,
	},
}
impl Error {
	/// Wraps a transport failure that was classified as missing connectivity.
	pub fn connectivity(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Connectivity { source: Arc::new(src) }
	}

	/// Builds an [`Error::AuthenticationRequired`] with the provided reason.
	pub fn authentication_required(reason: impl Into<String>) -> Self {
		Self::AuthenticationRequired { reason: reason.into() }
	}

	/// Returns `true` for invalid configuration or arguments.
	pub fn is_invalid_argument(&self) -> bool {
		matches!(self, Self::Config(_))
	}

	/// Returns `true` when the caller must log in interactively.
	pub fn is_authentication_required(&self) -> bool {
		matches!(self, Self::AuthenticationRequired { .. })
	}

	/// Returns `true` when the failure was caused by missing connectivity.
	pub fn is_connectivity(&self) -> bool {
		match self {
			Self::Connectivity { .. } => true,
			Self::Revocation { source } => source.is_connectivity(),
			_ => false,
		}
	}

	/// HTTP status code of a completed non-success exchange, if any.
	pub fn http_status(&self) -> Option<u16> {
		match self {
			Self::Http(err) => Some(err.status()),
			Self::TokenEndpoint(err) => Some(err.status()),
			Self::Revocation { source } => source.http_status(),
			_ => None,
		}
	}
}

/// Configuration and validation failures.
#[derive(Clone, Debug, ThisError)]
pub enum ConfigError {
	/// A required string value was empty or whitespace.
	#[error("The `{field}` value must not be blank.")]
	Blank {
		/// Name of the offending field.
		field: &'static str,
	},
	/// A URL or endpoint could not be parsed or joined.
	#[error("The `{field}` value is not a valid URL.")]
	InvalidUrl {
		/// Name of the offending field.
		field: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A header name or value contains characters HTTP does not allow.
	#[error("The `{name}` header is invalid.")]
	InvalidHeader {
		/// Header name as supplied by the caller.
		name: String,
	},
	/// A request body could not be serialized.
	#[error("Request body could not be serialized.")]
	InvalidBody {
		/// Underlying serializer failure.
		#[source]
		source: Arc<serde_json::Error>,
	},
	/// No HTTP transport was supplied and the default transport is disabled.
	#[error("No HTTP transport is configured; enable the `reqwest` feature or supply one.")]
	MissingTransport,
	/// HTTP request construction failed.
	#[error("HTTP request could not be constructed.")]
	HttpRequest(#[source] Arc<oauth2::http::Error>),
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: SharedError,
	},
	/// The supplied credentials do not fit the strategy's grant.
	#[error("The {grant} grant cannot log in with {credentials} credentials.")]
	UnsupportedCredentials {
		/// Grant configured on the strategy.
		grant: &'static str,
		/// Kind of credentials that were supplied.
		credentials: &'static str,
	},
	/// The operation only applies to a different grant.
	#[error("The `{operation}` operation requires the {expected} grant, not {actual}.")]
	GrantMismatch {
		/// Operation that was requested.
		operation: &'static str,
		/// Grant the operation requires.
		expected: &'static str,
		/// Grant configured on the strategy.
		actual: &'static str,
	},
	/// Token record validation failed.
	#[error("Unable to build token record.")]
	TokenRecord(#[from] crate::auth::TokenRecordError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Arc::new(src) }
	}
}
impl From<oauth2::http::Error> for ConfigError {
	fn from(e: oauth2::http::Error) -> Self {
		Self::HttpRequest(Arc::new(e))
	}
}
impl From<oauth2::http::Error> for Error {
	fn from(e: oauth2::http::Error) -> Self {
		ConfigError::from(e).into()
	}
}
impl From<crate::auth::TokenRecordError> for Error {
	fn from(e: crate::auth::TokenRecordError) -> Self {
		ConfigError::from(e).into()
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures that are not connectivity problems.
#[derive(Clone, Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while sending the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: SharedError,
	},
	/// The request did not complete in time.
	#[error("The request timed out.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: SharedError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while sending the request.")]
	Io(#[source] Arc<std::io::Error>),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Arc::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Timeout { source: Arc::new(src) }
	}
}
impl From<std::io::Error> for TransportError {
	fn from(e: std::io::Error) -> Self {
		Self::Io(Arc::new(e))
	}
}

/// Token endpoint responses that could not be turned into a token record.
#[derive(Clone, Debug, ThisError)]
pub enum TokenEndpointError {
	/// The endpoint answered with an empty body.
	#[error("Token endpoint returned an empty body.")]
	EmptyBody {
		/// HTTP status code of the response.
		status: u16,
	},
	/// The endpoint answered without a usable `access_token`.
	#[error("Token endpoint response did not include an access token.")]
	MissingAccessToken {
		/// HTTP status code of the response.
		status: u16,
	},
	/// The endpoint answered with JSON that does not describe a token.
	#[error("Token endpoint returned malformed JSON.")]
	Parse {
		/// Structured parsing failure including the failing JSON path.
		#[source]
		source: Arc<serde_path_to_error::Error<serde_json::Error>>,
		/// HTTP status code of the response.
		status: u16,
	},
}
impl TokenEndpointError {
	/// HTTP status code of the response that failed to parse.
	pub fn status(&self) -> u16 {
		match self {
			Self::EmptyBody { status }
			| Self::MissingAccessToken { status }
			| Self::Parse { status, .. } => *status,
		}
	}
}

/// Completed HTTP exchange with a non-success status code.
#[derive(Clone, Debug, ThisError)]
#[error("{message}")]
pub struct HttpRequestError {
	/// Full response as received from the server.
	pub response: Response,
	/// Best-effort human-readable message.
	pub message: String,
}
impl HttpRequestError {
	/// Message used when the server did not supply a readable error body.
	pub const SERVER_ERROR_MESSAGE: &'static str =
		"The server encountered an error while processing the request.";

	/// Builds the error from a failed response, extracting a `message` field from JSON bodies.
	pub fn from_response(response: Response) -> Self {
		let message = extract_message(&response.body);

		Self { response, message }
	}

	/// HTTP status code of the failed response.
	pub fn status(&self) -> u16 {
		self.response.status.as_u16()
	}

	/// Raw response body.
	pub fn body(&self) -> &str {
		&self.response.body
	}
}

fn extract_message(body: &str) -> String {
	if body.trim().is_empty() {
		return HttpRequestError::SERVER_ERROR_MESSAGE.into();
	}

	let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) else {
		return HttpRequestError::SERVER_ERROR_MESSAGE.into();
	};

	match map.iter().find(|(key, _)| key.eq_ignore_ascii_case("message")) {
		Some((_, serde_json::Value::String(message))) => message.to_owned(),
		Some((_, other)) => other.to_string(),
		None => body.to_owned(),
	}
}
