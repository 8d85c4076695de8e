//! Request client that authenticates calls against a base API and retries once on 401/403.
//!
//! [`RequestClient::send`] resolves the request path against the base URI, merges headers
//! (request headers win over client defaults, `Accept-Language` is added when absent), asks the
//! configured [`AuthStrategy`] to attach credentials, and sends. When the server answers 401 or
//! 403 and the strategy is refreshable, the request is rebuilt from its buffered parts, the
//! strategy refreshes, and the request goes out exactly once more.

// std
use std::env;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, HttpRequestError},
	http::{HttpRequest, HttpTransport, Response},
	http_types::{
		HeaderMap, HeaderName, HeaderValue, Method, Request,
		header::{ACCEPT_LANGUAGE, CONTENT_TYPE},
	},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	strategy::AuthStrategy,
};

/// Language tag used when the environment does not name one.
pub const FALLBACK_ACCEPT_LANGUAGE: &str = "en-US";

/// Sends requests against one base API on behalf of an optional [`AuthStrategy`].
#[derive(Clone)]
pub struct RequestClient {
	base_uri: Url,
	auth: Option<Arc<dyn AuthStrategy>>,
	default_headers: HeaderMap,
	accept_language: HeaderValue,
	transport: Arc<dyn HttpTransport>,
}
impl RequestClient {
	/// Returns a builder for a client rooted at `base_uri`.
	pub fn builder(base_uri: Url) -> RequestClientBuilder {
		RequestClientBuilder::new(base_uri)
	}

	/// Base URI every request path is resolved against.
	pub fn base_uri(&self) -> &Url {
		&self.base_uri
	}

	/// Strategy attached to outgoing requests, if any.
	pub fn auth_strategy(&self) -> Option<&Arc<dyn AuthStrategy>> {
		self.auth.as_ref()
	}

	/// Sends a `GET` request.
	pub async fn get(&self, path: &str) -> Result<Response> {
		self.send(ApiRequest::new(Method::GET, path)).await
	}

	/// Sends a `POST` request with `body`.
	pub async fn post(&self, path: &str, body: Body) -> Result<Response> {
		self.send(ApiRequest::new(Method::POST, path).body(body)).await
	}

	/// Sends a `PUT` request with `body`.
	pub async fn put(&self, path: &str, body: Body) -> Result<Response> {
		self.send(ApiRequest::new(Method::PUT, path).body(body)).await
	}

	/// Sends a `PATCH` request with `body`.
	pub async fn patch(&self, path: &str, body: Body) -> Result<Response> {
		self.send(ApiRequest::new(Method::PATCH, path).body(body)).await
	}

	/// Sends `request`, retrying once after a credential refresh when the server rejects it.
	///
	/// Non-success responses surface as [`Error::Http`] carrying the full response.
	pub async fn send(&self, request: ApiRequest) -> Result<Response> {
		const KIND: FlowKind = FlowKind::Request;

		let span = FlowSpan::new(KIND, "send");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.send_with_retry(&request)).await;

		obs::record_result(KIND, &result);

		result
	}

	async fn send_with_retry(&self, request: &ApiRequest) -> Result<Response> {
		let url = self.resolve(&request.path, &request.query)?;
		let mut outgoing = self.build_request(&url, request)?;

		if let Some(auth) = &self.auth {
			auth.authenticate_request(&mut outgoing).await?;
		}

		let mut response = Response::from(self.transport.send(outgoing).await?);
		let refreshable = self
			.auth
			.as_deref()
			.and_then(|auth| auth.as_refreshable())
			.filter(|_| response.is_authentication_required());

		if let Some(strategy) = refreshable {
			let mut retry = self.build_request(&url, request)?;

			strategy.refresh_and_authenticate_request(&mut retry).await?;

			response = Response::from(self.transport.send(retry).await?);
		}
		if !response.is_success() {
			return Err(HttpRequestError::from_response(response).into());
		}

		Ok(response)
	}

	fn resolve(&self, path: &str, query: &[(String, String)]) -> Result<Url, ConfigError> {
		let mut url = self
			.base_uri
			.join(path)
			.map_err(|source| ConfigError::InvalidUrl { field: "path", source })?;

		if !query.is_empty() {
			url.query_pairs_mut().extend_pairs(query);
		}

		Ok(url)
	}

	fn build_request(&self, url: &Url, request: &ApiRequest) -> Result<HttpRequest> {
		let mut headers = self.default_headers.clone();
		let mut overrides = HeaderMap::new();

		for (name, value) in &request.headers {
			overrides.append(parse_header_name(name)?, parse_header_value(name, value)?);
		}

		headers.extend(overrides);

		if !headers.contains_key(ACCEPT_LANGUAGE) {
			headers.insert(ACCEPT_LANGUAGE, self.accept_language.clone());
		}

		let body = match &request.body {
			Some(body) => {
				if !headers.contains_key(CONTENT_TYPE) {
					let content_type = parse_header_value("content-type", &body.content_type)?;

					headers.insert(CONTENT_TYPE, content_type);
				}

				body.bytes.clone()
			},
			None => Vec::new(),
		};
		let mut outgoing =
			Request::builder().method(request.method.clone()).uri(url.as_str()).body(body)?;

		*outgoing.headers_mut() = headers;

		Ok(outgoing)
	}
}
impl Debug for RequestClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestClient")
			.field("base_uri", &self.base_uri.as_str())
			.field("authenticated", &self.auth.is_some())
			.field("default_headers", &self.default_headers.len())
			.finish()
	}
}

/// Builder for [`RequestClient`].
pub struct RequestClientBuilder {
	base_uri: Url,
	auth: Option<Arc<dyn AuthStrategy>>,
	default_headers: Vec<(String, String)>,
	accept_language: Option<String>,
	transport: Option<Arc<dyn HttpTransport>>,
}
impl RequestClientBuilder {
	fn new(base_uri: Url) -> Self {
		Self {
			base_uri,
			auth: None,
			default_headers: Vec::new(),
			accept_language: None,
			transport: None,
		}
	}

	/// Attaches credentials through `strategy`.
	pub fn auth_strategy(mut self, strategy: Arc<dyn AuthStrategy>) -> Self {
		self.auth = Some(strategy);

		self
	}

	/// Adds a header sent with every request unless the request overrides it.
	pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.default_headers.push((name.into(), value.into()));

		self
	}

	/// Overrides the `Accept-Language` value derived from the environment.
	pub fn accept_language(mut self, language: impl Into<String>) -> Self {
		self.accept_language = Some(language.into());

		self
	}

	/// Overrides the HTTP transport.
	pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
		self.transport = Some(transport);

		self
	}

	/// Validates headers and produces the client.
	pub fn build(self) -> Result<RequestClient, ConfigError> {
		if self.base_uri.cannot_be_a_base() {
			return Err(ConfigError::InvalidUrl {
				field: "base_uri",
				source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
			});
		}

		let mut default_headers = HeaderMap::new();

		for (name, value) in &self.default_headers {
			default_headers.append(parse_header_name(name)?, parse_header_value(name, value)?);
		}

		let accept_language = self.accept_language.unwrap_or_else(system_accept_language);
		let accept_language = parse_header_value(ACCEPT_LANGUAGE.as_str(), &accept_language)?;
		let transport = match self.transport {
			Some(transport) => transport,
			None => default_transport()?,
		};

		Ok(RequestClient {
			base_uri: self.base_uri,
			auth: self.auth,
			default_headers,
			accept_language,
			transport,
		})
	}
}
impl Debug for RequestClientBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestClientBuilder")
			.field("base_uri", &self.base_uri.as_str())
			.field("default_headers", &self.default_headers.len())
			.finish()
	}
}

/// One API call; bodies are buffered so the request can be replayed on retry.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Path resolved against the client's base URI.
	pub path: String,
	/// Query parameters appended in order.
	pub query: Vec<(String, String)>,
	/// Request-specific headers; they replace client defaults of the same name.
	pub headers: Vec<(String, String)>,
	/// Optional buffered body.
	pub body: Option<Body>,
}
impl ApiRequest {
	/// Creates a request without query, headers, or body.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), query: Vec::new(), headers: Vec::new(), body: None }
	}

	/// Appends a query parameter.
	pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((name.into(), value.into()));

		self
	}

	/// Adds a request header.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}

	/// Sets the body.
	pub fn body(mut self, body: Body) -> Self {
		self.body = Some(body);

		self
	}
}

/// Fully buffered request body plus its content type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Body {
	/// Value sent as `Content-Type` unless the request sets one explicitly.
	pub content_type: String,
	/// Raw bytes.
	pub bytes: Vec<u8>,
}
impl Body {
	/// Raw bytes with an explicit content type.
	pub fn bytes(content_type: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
		Self { content_type: content_type.into(), bytes: bytes.into() }
	}

	/// `application/x-www-form-urlencoded` body built from `pairs`.
	pub fn form<I, K, V>(pairs: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<str>,
		V: AsRef<str>,
	{
		let encoded =
			url::form_urlencoded::Serializer::new(String::new()).extend_pairs(pairs).finish();

		Self::bytes("application/x-www-form-urlencoded", encoded)
	}

	/// `application/json` body serialized from `value`.
	pub fn json<T>(value: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		let bytes = serde_json::to_vec(value)
			.map_err(|e| ConfigError::InvalidBody { source: Arc::new(e) })?;

		Ok(Self::bytes("application/json", bytes))
	}
}

/// Derives an `Accept-Language` tag from `LC_ALL`, `LC_MESSAGES`, or `LANG`.
///
/// `en_US.UTF-8` becomes `en-US`; unset, `C`, and `POSIX` locales fall back to
/// [`FALLBACK_ACCEPT_LANGUAGE`].
pub fn system_accept_language() -> String {
	["LC_ALL", "LC_MESSAGES", "LANG"]
		.into_iter()
		.filter_map(|key| env::var(key).ok())
		.find_map(|raw| locale_to_language_tag(&raw))
		.unwrap_or_else(|| FALLBACK_ACCEPT_LANGUAGE.into())
}

fn locale_to_language_tag(raw: &str) -> Option<String> {
	let locale = raw.split(['.', '@']).next()?.trim();

	if locale.is_empty() || locale == "C" || locale == "POSIX" {
		return None;
	}

	Some(locale.replace('_', "-"))
}

fn parse_header_name(name: &str) -> Result<HeaderName, ConfigError> {
	HeaderName::from_bytes(name.as_bytes())
		.map_err(|_| ConfigError::InvalidHeader { name: name.into() })
}

fn parse_header_value(name: &str, value: &str) -> Result<HeaderValue, ConfigError> {
	HeaderValue::from_str(value).map_err(|_| ConfigError::InvalidHeader { name: name.into() })
}

#[cfg(feature = "reqwest")]
fn default_transport() -> Result<Arc<dyn HttpTransport>, ConfigError> {
	let client = ReqwestClient::builder().build()?;

	Ok(Arc::new(crate::http::ReqwestTransport::with_client(client)))
}

#[cfg(not(feature = "reqwest"))]
fn default_transport() -> Result<Arc<dyn HttpTransport>, ConfigError> {
	Err(ConfigError::MissingTransport)
}
