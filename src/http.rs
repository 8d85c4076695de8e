//! Transport seam for outgoing requests and the buffered [`Response`] handed back to callers.
//!
//! [`HttpTransport`] is the pipeline's only dependency on an HTTP stack. Requests and responses
//! use the `http` crate types re-exported by `oauth2`, so any client that speaks `http` 1.x can
//! be plugged in. Implementations classify their own failures exactly once: missing network
//! connectivity becomes [`Error::Connectivity`], everything else a [`TransportError`].

// std
#[cfg(feature = "reqwest")] use std::io::ErrorKind;
// crates.io
pub use oauth2::{HttpRequest, HttpResponse};
use oauth2::http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
// self
#[cfg(feature = "reqwest")] use crate::error::{ConfigError, TransportError};
use crate::_prelude::*;

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<HttpResponse>> + 'a + Send>>;

/// Pluggable HTTP sender used by [`RequestClient`](crate::client::RequestClient).
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared by the client
/// and the token exchanges of its strategy. The response body must be fully buffered.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and returns the buffered response, whatever its status.
	fn send(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// Default transport backed by a shared [`ReqwestClient`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let request = request.try_into().map_err(classify_reqwest_error)?;
			let response = self.0.execute(request).await.map_err(classify_reqwest_error)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body = response.bytes().await.map_err(classify_reqwest_error)?;
			let mut response = HttpResponse::new(body.to_vec());

			*response.status_mut() = status;
			*response.headers_mut() = headers;

			Ok(response)
		})
	}
}

#[cfg(feature = "reqwest")]
fn classify_reqwest_error(e: ReqwestError) -> Error {
	if e.is_builder() {
		return ConfigError::http_client_build(e).into();
	}
	if e.is_timeout() {
		return TransportError::timeout(e).into();
	}
	if e.is_connect() || is_offline(&e) {
		return Error::connectivity(e);
	}

	TransportError::network(e).into()
}

/// Returns `true` when any error in the source chain is an I/O error that signals a missing or
/// dropped network connection.
#[cfg(feature = "reqwest")]
fn is_offline(err: &(dyn StdError + 'static)) -> bool {
	let mut current = Some(err);

	while let Some(err) = current {
		let offline = err.downcast_ref::<std::io::Error>().is_some_and(|io| {
			matches!(
				io.kind(),
				ErrorKind::ConnectionRefused
					| ErrorKind::ConnectionReset
					| ErrorKind::ConnectionAborted
					| ErrorKind::NotConnected
					| ErrorKind::AddrNotAvailable
					| ErrorKind::BrokenPipe
					| ErrorKind::NetworkUnreachable
					| ErrorKind::HostUnreachable
			)
		});

		if offline {
			return true;
		}

		current = err.source();
	}

	false
}

/// Fully buffered HTTP response surfaced to callers.
#[derive(Clone, Debug)]
pub struct Response {
	/// HTTP status code.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Body decoded as UTF-8 (invalid sequences replaced).
	pub body: String,
}
impl Response {
	/// Builds a response from its parts.
	pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<String>) -> Self {
		Self { status, headers, body: body.into() }
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		self.status.is_success()
	}

	/// Returns `true` for 401 and 403, the statuses that trigger a credential refresh.
	pub fn is_authentication_required(&self) -> bool {
		matches!(self.status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
	}

	/// Returns a header value as a string, if present and valid UTF-8.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|value| value.to_str().ok())
	}

	/// Deserializes the JSON body, reporting the failing JSON path on error.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let mut deserializer = serde_json::Deserializer::from_str(&self.body);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|e| Error::Decode { source: Arc::new(e) })
	}
}
impl From<HttpResponse> for Response {
	fn from(response: HttpResponse) -> Self {
		let (parts, body) = response.into_parts();

		Self {
			status: parts.status,
			headers: parts.headers,
			body: String::from_utf8_lossy(&body).into_owned(),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[derive(Debug, Deserialize, PartialEq)]
	struct Profile {
		id: u64,
		name: String,
	}

	fn response(status: StatusCode, body: &str) -> Response {
		Response::new(status, HeaderMap::new(), body)
	}

	#[test]
	fn status_predicates() {
		assert!(response(StatusCode::NO_CONTENT, "").is_success());
		assert!(response(StatusCode::UNAUTHORIZED, "").is_authentication_required());
		assert!(response(StatusCode::FORBIDDEN, "").is_authentication_required());
		assert!(!response(StatusCode::NOT_FOUND, "").is_authentication_required());
	}

	#[test]
	fn json_reports_the_failing_path() {
		let ok = response(StatusCode::OK, r#"{"id":7,"name":"Ada"}"#);

		assert_eq!(
			ok.json::<Profile>().expect("Valid body should decode."),
			Profile { id: 7, name: "Ada".into() }
		);

		let err = response(StatusCode::OK, r#"{"id":"seven","name":"Ada"}"#)
			.json::<Profile>()
			.expect_err("Mistyped body should fail to decode.");
		let Error::Decode { source } = err else {
			panic!("Decode failures should map to Error::Decode.");
		};

		assert_eq!(source.path().to_string(), "id");
	}

	#[test]
	fn http_responses_convert_lossily() {
		let mut raw = HttpResponse::new(vec![0x68, 0x69, 0xff]);

		*raw.status_mut() = StatusCode::ACCEPTED;
		raw.headers_mut()
			.insert("x-request-id", "abc".parse().expect("Header fixture should parse."));

		let response = Response::from(raw);

		assert_eq!(response.status, StatusCode::ACCEPTED);
		assert_eq!(response.header("x-request-id"), Some("abc"));
		assert!(response.body.starts_with("hi"));
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn offline_detection_walks_the_source_chain() {
		#[derive(Debug, ThisError)]
		#[error("wrapped")]
		struct Wrapped(#[source] std::io::Error);

		let refused = Wrapped(std::io::Error::from(ErrorKind::ConnectionRefused));
		let other = Wrapped(std::io::Error::from(ErrorKind::InvalidData));

		assert!(is_offline(&refused));
		assert!(!is_offline(&other));
	}
}
