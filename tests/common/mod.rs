//! Shared fixtures for integration tests: a scripted transport that counts sends and
//! helpers for building OAuth 2.0 strategies against it.

#![allow(dead_code)]

// std
use std::{
	collections::VecDeque,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};
// crates.io
use parking_lot::Mutex;
// self
use oauth2_pipeline::{
	auth::TokenRecord,
	http::{HttpRequest, HttpResponse, HttpTransport, TransportFuture},
	http_types::{StatusCode, header::AUTHORIZATION},
	store::{DEFAULT_TOKEN_KEY, MemoryStore, SecureStore},
	strategy::{OAuth2Config, OAuth2Grant, OAuth2Strategy},
	url::Url,
};

pub const BASE: &str = "https://api.example.com/";
pub const CLIENT_ID: &str = "pipeline-client";
pub const CLIENT_SECRET: &str = "pipeline-secret";

/// One scripted reply.
#[derive(Clone, Debug)]
pub struct Reply {
	pub status: u16,
	pub body: String,
}
impl Reply {
	pub fn new(status: u16, body: impl Into<String>) -> Self {
		Self { status, body: body.into() }
	}

	pub fn tokens(access: &str, refresh: Option<&str>, expires_in: i64) -> Self {
		let body = match refresh {
			Some(refresh) => format!(
				r#"{{"access_token":"{access}","refresh_token":"{refresh}","expires_in":{expires_in}}}"#
			),
			None => format!(r#"{{"access_token":"{access}","expires_in":{expires_in}}}"#),
		};

		Self::new(200, body)
	}
}

/// Transport stub answering from a per-path script and counting every send.
#[derive(Default)]
pub struct StubTransport {
	scripts: Mutex<Vec<(String, VecDeque<Reply>)>>,
	fallback: Mutex<Option<Reply>>,
	sent: Mutex<Vec<HttpRequest>>,
	sends: AtomicUsize,
	delay: Mutex<Option<Duration>>,
}
impl StubTransport {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// Queues `reply` for requests whose path ends with `path`.
	pub fn on(&self, path: &str, reply: Reply) -> &Self {
		let mut scripts = self.scripts.lock();

		match scripts.iter_mut().find(|(candidate, _)| candidate == path) {
			Some((_, queue)) => queue.push_back(reply),
			None => scripts.push((path.to_owned(), VecDeque::from([reply]))),
		}

		self
	}

	/// Reply used once a path's script is exhausted.
	pub fn otherwise(&self, reply: Reply) -> &Self {
		*self.fallback.lock() = Some(reply);

		self
	}

	/// Delays every response so concurrent callers overlap.
	pub fn delay(&self, delay: Duration) -> &Self {
		*self.delay.lock() = Some(delay);

		self
	}

	pub fn sends(&self) -> usize {
		self.sends.load(Ordering::SeqCst)
	}

	pub fn sends_to(&self, path: &str) -> usize {
		self.sent.lock().iter().filter(|request| request.uri().path().ends_with(path)).count()
	}

	pub fn authorization_headers(&self, path: &str) -> Vec<String> {
		self.sent
			.lock()
			.iter()
			.filter(|request| request.uri().path().ends_with(path))
			.filter_map(|request| request.headers().get(AUTHORIZATION))
			.map(|value| value.to_str().expect("Authorization header should be ASCII.").to_owned())
			.collect()
	}

	pub fn form(&self, index: usize) -> Vec<(String, String)> {
		let sent = self.sent.lock();

		url::form_urlencoded::parse(sent[index].body()).into_owned().collect()
	}

	fn next_reply(&self, path: &str) -> Reply {
		let mut scripts = self.scripts.lock();
		let scripted = scripts
			.iter_mut()
			.find(|(candidate, _)| path.ends_with(candidate.as_str()))
			.and_then(|(_, queue)| queue.pop_front());

		scripted
			.or_else(|| self.fallback.lock().clone())
			.unwrap_or_else(|| Reply::new(500, "unscripted"))
	}
}
impl HttpTransport for StubTransport {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		self.sends.fetch_add(1, Ordering::SeqCst);

		let reply = self.next_reply(request.uri().path());
		let delay = *self.delay.lock();

		self.sent.lock().push(request);

		Box::pin(async move {
			if let Some(delay) = delay {
				tokio::time::sleep(delay).await;
			}

			let mut response = HttpResponse::new(reply.body.into_bytes());

			*response.status_mut() =
				StatusCode::from_u16(reply.status).expect("Scripted status should be valid.");

			Ok(response)
		})
	}
}

pub fn base_url() -> Url {
	Url::parse(BASE).expect("Base URL fixture should parse.")
}

pub fn config(grant: OAuth2Grant) -> OAuth2Config {
	OAuth2Config::builder(base_url(), CLIENT_ID, CLIENT_SECRET, grant)
		.build()
		.expect("OAuth2 config fixture should be valid.")
}

pub fn strategy(
	grant: OAuth2Grant,
	store: Arc<MemoryStore>,
	transport: Arc<StubTransport>,
) -> Arc<OAuth2Strategy> {
	Arc::new(
		OAuth2Strategy::with_transport(config(grant), store, transport)
			.expect("OAuth2 strategy fixture should build."),
	)
}

pub fn seed(store: &MemoryStore, record: &TokenRecord) {
	let blob = serde_json::to_string(record).expect("Token record fixture should serialize.");

	store.put(DEFAULT_TOKEN_KEY, &blob).expect("Memory store should accept writes.");
}
