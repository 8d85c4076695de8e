//! Immutable token pair with its proactive-refresh policy, plus a builder.

// crates.io
use time::PrimitiveDateTime;
// self
use crate::{_prelude::*, auth::token::secret::Secret};

/// Lead time before expiry at which a token is considered due for refresh.
pub const REFRESH_THRESHOLD: Duration = Duration::seconds(600);

/// Errors produced while constructing or decoding a [`TokenRecord`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum TokenRecordError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when the access token is empty or whitespace.
	#[error("Access token must not be blank.")]
	BlankAccessToken,
}

/// One OAuth 2.0 token pair plus the instant it was issued.
///
/// Records are never mutated; a refresh produces a new record that replaces the persisted one.
/// The serialized form keeps the absolute `created` instant so expiry stays correct after a
/// reload at a later wall-clock time.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTokenRecord")]
pub struct TokenRecord {
	access_token: Secret,
	#[serde(skip_serializing_if = "Option::is_none")]
	refresh_token: Option<Secret>,
	duration_seconds: i64,
	created: OffsetDateTime,
}
impl TokenRecord {
	/// Creates a record issued now.
	pub fn new(
		access_token: impl Into<String>,
		refresh_token: Option<String>,
		duration_seconds: i64,
	) -> Result<Self, TokenRecordError> {
		let builder = Self::builder().access_token(access_token).duration_seconds(duration_seconds);

		match refresh_token {
			Some(refresh) => builder.refresh_token(refresh).build(),
			None => builder.build(),
		}
	}

	/// Returns a builder for records with an explicit creation instant.
	pub fn builder() -> TokenRecordBuilder {
		TokenRecordBuilder::default()
	}

	/// Access token secret.
	pub fn access_token(&self) -> &Secret {
		&self.access_token
	}

	/// Refresh token secret, if the server issued one.
	pub fn refresh_token(&self) -> Option<&Secret> {
		self.refresh_token.as_ref()
	}

	/// Lifetime in seconds; zero or negative marks an already-expired token.
	pub fn duration_seconds(&self) -> i64 {
		self.duration_seconds
	}

	/// Instant the record was issued.
	pub fn created(&self) -> OffsetDateTime {
		self.created
	}

	/// Absolute expiry instant (`created + duration_seconds`).
	pub fn expires(&self) -> OffsetDateTime {
		let lifetime = Duration::seconds(self.duration_seconds);

		self.created.checked_add(lifetime).unwrap_or_else(|| {
			if self.duration_seconds > 0 {
				PrimitiveDateTime::MAX.assume_utc()
			} else {
				PrimitiveDateTime::MIN.assume_utc()
			}
		})
	}

	/// Returns `true` when the token expires within [`REFRESH_THRESHOLD`] of `now`.
	pub fn should_refresh_at(&self, now: OffsetDateTime) -> bool {
		now.checked_add(REFRESH_THRESHOLD).is_none_or(|lead| lead > self.expires())
	}

	/// Evaluates [`Self::should_refresh_at`] against the current UTC clock.
	pub fn should_refresh(&self) -> bool {
		self.should_refresh_at(OffsetDateTime::now_utc())
	}

	/// Returns a copy of this record carrying `previous` when no refresh token was issued.
	pub fn or_refresh_token(mut self, previous: Option<&Secret>) -> Self {
		if self.refresh_token.is_none() {
			self.refresh_token = previous.cloned();
		}

		self
	}
}
impl Debug for TokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRecord")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("duration_seconds", &self.duration_seconds)
			.field("created", &self.created)
			.finish()
	}
}
impl TryFrom<RawTokenRecord> for TokenRecord {
	type Error = TokenRecordError;

	fn try_from(raw: RawTokenRecord) -> Result<Self, Self::Error> {
		let builder = Self::builder()
			.access_token(raw.access_token)
			.duration_seconds(raw.duration_seconds)
			.created(raw.created);

		match raw.refresh_token {
			Some(refresh) => builder.refresh_token(refresh).build(),
			None => builder.build(),
		}
	}
}

#[derive(Deserialize)]
struct RawTokenRecord {
	access_token: String,
	#[serde(default)]
	refresh_token: Option<String>,
	duration_seconds: i64,
	created: OffsetDateTime,
}

/// Builder for [`TokenRecord`].
#[derive(Clone, Debug, Default)]
pub struct TokenRecordBuilder {
	access_token: Option<Secret>,
	refresh_token: Option<Secret>,
	duration_seconds: i64,
	created: Option<OffsetDateTime>,
}
impl TokenRecordBuilder {
	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(Secret::new(token));

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(Secret::new(token));

		self
	}

	/// Sets the lifetime in seconds.
	pub fn duration_seconds(mut self, seconds: i64) -> Self {
		self.duration_seconds = seconds;

		self
	}

	/// Sets the creation instant; defaults to the current clock.
	pub fn created(mut self, instant: OffsetDateTime) -> Self {
		self.created = Some(instant);

		self
	}

	/// Consumes the builder and produces a [`TokenRecord`].
	pub fn build(self) -> Result<TokenRecord, TokenRecordError> {
		let access_token = self.access_token.ok_or(TokenRecordError::MissingAccessToken)?;

		if access_token.is_blank() {
			return Err(TokenRecordError::BlankAccessToken);
		}

		Ok(TokenRecord {
			access_token,
			refresh_token: self.refresh_token,
			duration_seconds: self.duration_seconds,
			created: self.created.unwrap_or_else(OffsetDateTime::now_utc),
		})
	}
}
