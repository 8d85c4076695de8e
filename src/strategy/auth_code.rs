//! Authorization code helpers: the browser login URL and redirect interception.
//!
//! Embedded browsers report every navigation they are about to perform. A
//! [`RedirectInterceptor`] checks each one against the registered redirect URI and fires exactly
//! once, with either the authorization code or the provider's denial.

// std
use std::sync::atomic::{AtomicBool, Ordering};
// self
use crate::{
	_prelude::*,
	auth::{GrantType, Secret},
	error::ConfigError,
	strategy::{OAuth2Grant, OAuth2Strategy},
};

impl OAuth2Strategy {
	/// Browser URL that starts the authorization code login.
	pub fn authorization_url(&self) -> Result<Url, ConfigError> {
		self.config().authorization_url()
	}

	/// Returns a fresh one-shot interceptor for the configured redirect URI.
	pub fn redirect_interceptor(&self) -> Result<RedirectInterceptor, ConfigError> {
		match &self.config().grant {
			OAuth2Grant::AuthorizationCode { redirect_uri, .. } =>
				Ok(RedirectInterceptor::new(redirect_uri)),
			other => Err(ConfigError::GrantMismatch {
				operation: "redirect_interceptor",
				expected: GrantType::AuthorizationCode.as_str(),
				actual: other.as_str(),
			}),
		}
	}
}

/// Outcome carried by a redirect back to the application.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthorizationResponse {
	/// The user approved; exchange the code with
	/// [`OAuth2Strategy::login_with_code`].
	Code(Secret),
	/// The provider redirected with an `error` instead of a code.
	Denied {
		/// `error` query parameter, e.g. `access_denied`.
		error: String,
		/// Optional `error_description` query parameter.
		description: Option<String>,
	},
}

/// Matches navigation URIs against a redirect URI by host, port, and path.
///
/// `http` and `https` are interchangeable, a leading `www.` is ignored, and trailing slashes do
/// not matter. Candidates without a scheme are treated as `https`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedirectMatcher {
	host: String,
	port: Option<u16>,
	path: String,
}
impl RedirectMatcher {
	/// Builds a matcher for `redirect_uri`.
	pub fn new(redirect_uri: &Url) -> Self {
		Self {
			host: normalize_host(redirect_uri.host_str().unwrap_or_default()),
			port: redirect_uri.port(),
			path: redirect_uri.path().trim_end_matches('/').to_owned(),
		}
	}

	/// Returns `true` when `candidate` points at the redirect URI.
	pub fn matches(&self, candidate: &str) -> bool {
		self.parse(candidate).is_some()
	}

	/// Reads the authorization outcome from a matching navigation.
	///
	/// Returns `None` when `candidate` does not match or carries neither `code` nor `error`.
	pub fn extract(&self, candidate: &str) -> Option<AuthorizationResponse> {
		let url = self.parse(candidate)?;
		let mut code = None;
		let mut error = None;
		let mut description = None;

		for (name, value) in url.query_pairs() {
			match name.as_ref() {
				"code" if !value.is_empty() => code = Some(value.into_owned()),
				"error" if !value.is_empty() => error = Some(value.into_owned()),
				"error_description" => description = Some(value.into_owned()),
				_ => {},
			}
		}

		match (code, error) {
			(Some(code), _) => Some(AuthorizationResponse::Code(Secret::new(code))),
			(None, Some(error)) => Some(AuthorizationResponse::Denied { error, description }),
			(None, None) => None,
		}
	}

	fn parse(&self, candidate: &str) -> Option<Url> {
		let candidate = candidate.trim();
		let url = match Url::parse(candidate) {
			Ok(url) if matches!(url.scheme(), "http" | "https") => url,
			Ok(_) if candidate.contains("://") => return None,
			_ => Url::parse(&format!("https://{}", candidate.trim_start_matches('/'))).ok()?,
		};
		let host = normalize_host(url.host_str()?);
		let matched = host == self.host
			&& url.port() == self.port
			&& url.path().trim_end_matches('/') == self.path;

		matched.then_some(url)
	}
}

/// One-shot redirect check for an embedded browser's navigation events.
///
/// After the first navigation that yields an [`AuthorizationResponse`], the interceptor detaches
/// itself and ignores everything else.
#[derive(Debug)]
pub struct RedirectInterceptor {
	matcher: RedirectMatcher,
	fired: AtomicBool,
}
impl RedirectInterceptor {
	/// Creates an armed interceptor for `redirect_uri`.
	pub fn new(redirect_uri: &Url) -> Self {
		Self { matcher: RedirectMatcher::new(redirect_uri), fired: AtomicBool::new(false) }
	}

	/// Inspects a navigation; `Some` means the browser should cancel it and the login continues.
	pub fn intercept(&self, navigation: &str) -> Option<AuthorizationResponse> {
		if self.has_fired() {
			return None;
		}

		let response = self.matcher.extract(navigation)?;

		self.fired.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).ok()?;

		Some(response)
	}

	/// Returns `true` once the interceptor has delivered its response.
	pub fn has_fired(&self) -> bool {
		self.fired.load(Ordering::Acquire)
	}

	/// Matcher used for navigation checks.
	pub fn matcher(&self) -> &RedirectMatcher {
		&self.matcher
	}
}

fn normalize_host(host: &str) -> String {
	let host = host.to_ascii_lowercase();

	match host.strip_prefix("www.") {
		Some(bare) => bare.to_owned(),
		None => host,
	}
}
