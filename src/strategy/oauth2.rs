//! OAuth 2.0 bearer strategy backed by a [`SecureStore`] and a single-flight refresh.
//!
//! The strategy never caches tokens in memory: every access reads the persisted
//! [`TokenRecord`] immediately before use and every successful login or refresh writes it back
//! immediately after. Proactive refreshes start once a token is within
//! [`REFRESH_THRESHOLD`](crate::auth::REFRESH_THRESHOLD) of expiry; concurrent callers that
//! need a refresh at the same time share one token endpoint call.

mod config;
mod exchange;

pub use config::*;

// self
use crate::{
	_prelude::*,
	auth::{GrantType, Secret, TokenRecord},
	client::{ApiRequest, Body, RequestClient, RequestClientBuilder},
	error::ConfigError,
	http::{HttpRequest, HttpTransport},
	http_types::{Method, header::AUTHORIZATION},
	obs::{self, FlowKind, FlowOutcome, FlowSpan, RefreshMetrics},
	singleflight::SingleFlight,
	store::{SecureStore, StoreError},
	strategy::{self, AuthFuture, AuthStrategy, Credentials, RefreshableAuthStrategy},
};

/// Bearer-token strategy for the password, client-credentials, and authorization-code grants.
pub struct OAuth2Strategy {
	core: Arc<TokenCore>,
	refresh: SingleFlight<TokenRecord, Error>,
}
impl OAuth2Strategy {
	/// Creates a strategy that talks to the token endpoint through the default transport.
	pub fn new(config: OAuth2Config, store: Arc<dyn SecureStore>) -> Result<Self, ConfigError> {
		Self::from_client_builder(config, store, |builder| builder)
	}

	/// Creates a strategy that talks to the token endpoint through `transport`.
	pub fn with_transport(
		config: OAuth2Config,
		store: Arc<dyn SecureStore>,
		transport: Arc<dyn HttpTransport>,
	) -> Result<Self, ConfigError> {
		Self::from_client_builder(config, store, |builder| builder.transport(transport))
	}

	fn from_client_builder(
		config: OAuth2Config,
		store: Arc<dyn SecureStore>,
		customize: impl FnOnce(RequestClientBuilder) -> RequestClientBuilder,
	) -> Result<Self, ConfigError> {
		config.validate()?;

		let client = customize(RequestClient::builder(config.base_uri.clone())).build()?;
		let core = TokenCore {
			config,
			client,
			store,
			metrics: RefreshMetrics::default(),
			epoch: Mutex::new(0),
		};

		Ok(Self { core: Arc::new(core), refresh: SingleFlight::new() })
	}

	/// Validated configuration.
	pub fn config(&self) -> &OAuth2Config {
		&self.core.config
	}

	/// Counters for refresh executions; callers attached to an in-flight refresh are not counted.
	pub fn refresh_metrics(&self) -> &RefreshMetrics {
		&self.core.metrics
	}

	/// Returns the persisted token record, if a readable one exists.
	///
	/// An unreadable record is deleted and reported as absent.
	pub async fn tokens(&self) -> Result<Option<TokenRecord>> {
		self.core.load().await
	}

	/// Returns a usable access token, logging in or refreshing first when needed.
	///
	/// Without a stored token the client-credentials grant logs in transparently while the
	/// interactive grants fail with [`Error::AuthenticationRequired`]. When a proactive refresh
	/// fails for network reasons and the current token has not expired yet, the current token
	/// is returned.
	pub async fn access_token(&self) -> Result<Secret> {
		let Some(current) = self.core.load().await? else {
			return match self.core.config.grant {
				OAuth2Grant::ClientCredentials =>
					Ok(self.run_refresh(false).await?.access_token().clone()),
				_ => Err(Error::authentication_required("no token is stored; log in first")),
			};
		};

		if !current.should_refresh() {
			return Ok(current.access_token().clone());
		}

		match self.run_refresh(false).await {
			Ok(fresh) => Ok(fresh.access_token().clone()),
			Err(e)
				if (e.is_connectivity() || matches!(e, Error::Transport(_)))
					&& current.expires() > OffsetDateTime::now_utc() =>
			{
				obs::warn_swallowed(
					FlowKind::Refresh,
					"Proactive refresh failed; using the unexpired token.",
					&e,
				);

				Ok(current.access_token().clone())
			},
			Err(e) => Err(e),
		}
	}

	/// Re-issues tokens unconditionally through the single-flight runner.
	pub async fn force_refresh(&self) -> Result<TokenRecord> {
		self.run_refresh(true).await
	}

	/// Logs in with an authorization code captured from the redirect.
	pub async fn login_with_code(&self, code: impl Into<String>) -> Result<bool> {
		self.login(Credentials::authorization_code(code)).await
	}

	/// Logs in with a single-use token (password grant only).
	pub async fn login_with_one_time_token(&self, token: impl Into<String>) -> Result<bool> {
		self.login(Credentials::one_time_token(token)).await
	}

	/// Revokes `record` at the revocation endpoint.
	///
	/// Failures are wrapped in [`Error::Revocation`]; the persisted record is left untouched.
	pub async fn revoke_tokens(&self, record: &TokenRecord) -> Result<()> {
		const KIND: FlowKind = FlowKind::Revoke;

		let span = FlowSpan::new(KIND, "revoke_tokens");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.core.revoke(record)).await;

		obs::record_result(KIND, &result);

		result
	}

	async fn run_refresh(&self, force: bool) -> Result<TokenRecord> {
		let core = self.core.clone();

		self.refresh.run(move || async move { core.refresh(force).await }).await
	}
}
impl AuthStrategy for OAuth2Strategy {
	fn is_authenticated(&self) -> bool {
		self.core.load_blocking().is_ok_and(|record| record.is_some())
	}

	fn is_authenticated_async(&self) -> futures::future::BoxFuture<'_, bool> {
		Box::pin(async move { self.core.load().await.is_ok_and(|record| record.is_some()) })
	}

	fn authenticate_request<'a>(&'a self, request: &'a mut HttpRequest) -> AuthFuture<'a, ()> {
		Box::pin(async move {
			let token = self.access_token().await?;

			strategy::set_authorization(request, &bearer(&token))
		})
	}

	fn login(&self, credentials: Credentials) -> AuthFuture<'_, bool> {
		Box::pin(async move {
			const KIND: FlowKind = FlowKind::Login;

			let span = FlowSpan::new(KIND, "login");

			obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

			let result = span.instrument(self.core.login(&credentials)).await;

			obs::record_result(KIND, &result);

			result
		})
	}

	fn logout(&self) -> AuthFuture<'_, ()> {
		Box::pin(async move {
			match self.core.load().await {
				Ok(Some(record)) =>
					if let Err(e) = self.revoke_tokens(&record).await {
						obs::warn_swallowed(
							FlowKind::Revoke,
							"Token revocation failed; continuing logout.",
							&e,
						);
					},
				Ok(None) => {},
				Err(e) => obs::warn_swallowed(
					FlowKind::Revoke,
					"Stored token could not be read; skipping revocation.",
					&e,
				),
			}

			self.core.end_session()
		})
	}

	fn as_refreshable(&self) -> Option<&dyn RefreshableAuthStrategy> {
		Some(self)
	}
}
impl RefreshableAuthStrategy for OAuth2Strategy {
	fn refresh_and_authenticate_request<'a>(
		&'a self,
		request: &'a mut HttpRequest,
	) -> AuthFuture<'a, ()> {
		Box::pin(async move {
			let record = self.run_refresh(true).await?;

			strategy::set_authorization(request, &bearer(record.access_token()))
		})
	}
}
impl Debug for OAuth2Strategy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuth2Strategy")
			.field("config", &self.core.config)
			.field("refresh", &self.refresh)
			.finish()
	}
}

struct TokenCore {
	config: OAuth2Config,
	client: RequestClient,
	store: Arc<dyn SecureStore>,
	metrics: RefreshMetrics,
	/// Session counter bumped by every login and logout; guards store writes from refreshes.
	epoch: Mutex<u64>,
}
impl TokenCore {
	async fn load(&self) -> Result<Option<TokenRecord>> {
		let blob = self.store.get_async(&self.config.store_key).await?;

		Ok(blob.and_then(|blob| self.decode(&blob)))
	}

	fn load_blocking(&self) -> Result<Option<TokenRecord>> {
		let blob = self.store.get(&self.config.store_key)?;

		Ok(blob.and_then(|blob| self.decode(&blob)))
	}

	fn decode(&self, blob: &str) -> Option<TokenRecord> {
		match serde_json::from_str::<TokenRecord>(blob) {
			Ok(record) => Some(record),
			Err(e) => {
				obs::warn_swallowed(
					FlowKind::Refresh,
					"Persisted token record is unreadable; discarding it.",
					&e,
				);

				if let Err(e) = self.store.delete(&self.config.store_key) {
					obs::warn_swallowed(
						FlowKind::Refresh,
						"Unreadable token record could not be deleted.",
						&e,
					);
				}

				None
			},
		}
	}

	fn persist(&self, record: &TokenRecord) -> Result<()> {
		let blob = serde_json::to_string(record)
			.map_err(|e| StoreError::Serialization { message: e.to_string() })?;

		self.store.put(&self.config.store_key, &blob)?;

		Ok(())
	}

	fn begin_session(&self, record: &TokenRecord) -> Result<()> {
		let mut epoch = self.epoch.lock();

		self.persist(record)?;

		*epoch += 1;

		Ok(())
	}

	fn end_session(&self) -> Result<()> {
		let mut epoch = self.epoch.lock();

		*epoch += 1;

		self.store.delete(&self.config.store_key)?;

		Ok(())
	}

	/// Persists `record` only if no login or logout happened since `epoch` was observed.
	fn persist_within(&self, epoch: u64, record: &TokenRecord) -> Result<bool> {
		let current = self.epoch.lock();

		if *current != epoch {
			return Ok(false);
		}

		self.persist(record)?;

		Ok(true)
	}

	async fn exchange(&self, form: exchange::Form) -> Result<TokenRecord> {
		let request = ApiRequest::new(Method::POST, self.config.login_endpoint.as_str())
			.body(Body::form(form));
		let response = self.client.send(request).await?;

		exchange::parse_token_response(&response)
	}

	async fn login(&self, credentials: &Credentials) -> Result<bool> {
		let form = exchange::login_form(&self.config, credentials)?;
		let issued = self.exchange(form).await?;

		self.begin_session(&issued)?;

		Ok(self.load().await?.is_some())
	}

	async fn refresh(&self, force: bool) -> Result<TokenRecord> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "refresh");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async {
				let epoch = *self.epoch.lock();
				let baseline = self.load().await?;

				if let Some(current) = baseline.as_ref().filter(|r| !force && !r.should_refresh()) {
					return Ok(current.clone());
				}

				self.metrics.record_attempt();

				let result = self.reissue(epoch, baseline.as_ref()).await;

				match &result {
					Ok(_) => self.metrics.record_success(),
					Err(_) => self.metrics.record_failure(),
				}

				result
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	async fn reissue(&self, epoch: u64, baseline: Option<&TokenRecord>) -> Result<TokenRecord> {
		let issued = match self.config.grant {
			OAuth2Grant::ClientCredentials =>
				self.exchange(exchange::grant_form(&self.config, GrantType::ClientCredentials, &[]))
					.await?,
			_ => {
				let refresh_token = baseline
					.and_then(TokenRecord::refresh_token)
					.filter(|token| !token.is_blank())
					.cloned()
					.ok_or_else(|| Error::authentication_required("no refresh token is stored"))?;
				let form = exchange::grant_form(
					&self.config,
					GrantType::RefreshToken,
					&[("refresh_token", refresh_token.expose())],
				);

				self.exchange(form).await?.or_refresh_token(Some(&refresh_token))
			},
		};

		if self.persist_within(epoch, &issued)? {
			return Ok(issued);
		}

		// A login or logout finished while the exchange was in flight; its outcome wins.
		self.load().await?.ok_or_else(|| {
			Error::authentication_required("the session ended while tokens were being refreshed")
		})
	}

	async fn revoke(&self, record: &TokenRecord) -> Result<()> {
		let request = ApiRequest::new(Method::POST, self.config.revoke_endpoint.as_str())
			.header(AUTHORIZATION.as_str(), bearer(record.access_token()))
			.body(Body::form(exchange::revoke_form(&self.config, record)));

		self.client
			.send(request)
			.await
			.map(|_| ())
			.map_err(|e| Error::Revocation { source: Box::new(e) })
	}
}

fn bearer(token: &Secret) -> String {
	format!("Bearer {}", token.expose())
}
