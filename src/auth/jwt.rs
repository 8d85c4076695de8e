//! Unverified JSON Web Token inspection.
//!
//! [`JsonWebToken::parse`] decodes the registered header and payload claims of a compact JWT so
//! clients can read `exp` or `sub` from an access token. Signatures are never checked; the result
//! must not be used for authorization decisions.

// crates.io
use base64::{
	Engine,
	alphabet::URL_SAFE,
	engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
// self
use crate::_prelude::*;

const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
	&URL_SAFE,
	GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Errors produced by [`JsonWebToken::parse`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum JwtError {
	/// The token string was empty or whitespace.
	#[error("Token must not be blank.")]
	Blank,
	/// The token does not have the three dot-separated segments of a compact JWT.
	#[error("Token must contain a header, payload, and signature segment.")]
	MissingSegments,
	/// A segment is not valid URL-safe base64.
	#[error("The {segment} segment is not valid base64.")]
	Base64 {
		/// Segment name.
		segment: &'static str,
	},
	/// A segment did not decode to the expected JSON object.
	#[error("The {segment} segment is not a valid JSON object: {message}.")]
	Json {
		/// Segment name.
		segment: &'static str,
		/// Parser error including the failing path.
		message: String,
	},
	/// A timestamp claim is outside the representable range.
	#[error("The `{claim}` claim is not a valid timestamp.")]
	Timestamp {
		/// Claim name.
		claim: &'static str,
	},
}

/// Registered claims decoded from a compact JWT.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JsonWebToken {
	/// `typ` header parameter.
	pub token_type: Option<String>,
	/// `alg` header parameter.
	pub algorithm: Option<String>,
	/// `aud` claim; a single string audience becomes a one-element list.
	pub audience: Vec<String>,
	/// `jti` claim.
	pub jwt_id: Option<String>,
	/// `iat` claim.
	pub issued_at: Option<OffsetDateTime>,
	/// `nbf` claim.
	pub not_before: Option<OffsetDateTime>,
	/// `exp` claim.
	pub expiration_time: Option<OffsetDateTime>,
	/// `sub` claim.
	pub subject: Option<String>,
}
impl JsonWebToken {
	/// Decodes the header and payload of `token` without verifying its signature.
	pub fn parse(token: &str) -> Result<Self, JwtError> {
		let token = token.trim();

		if token.is_empty() {
			return Err(JwtError::Blank);
		}

		let mut segments = token.split('.');
		let (Some(header), Some(payload), Some(_signature)) =
			(segments.next(), segments.next(), segments.next())
		else {
			return Err(JwtError::MissingSegments);
		};
		let header: Header = decode_segment("header", header)?;
		let payload: Payload = decode_segment("payload", payload)?;

		Ok(Self {
			token_type: header.typ,
			algorithm: header.alg,
			audience: payload.aud.map(Audience::into_vec).unwrap_or_default(),
			jwt_id: payload.jti,
			issued_at: timestamp("iat", payload.iat)?,
			not_before: timestamp("nbf", payload.nbf)?,
			expiration_time: timestamp("exp", payload.exp)?,
			subject: payload.sub,
		})
	}

	/// Returns `true` when the `exp` claim is at or before `now`.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		self.expiration_time.is_some_and(|exp| exp <= now)
	}
}

#[derive(Deserialize)]
struct Header {
	typ: Option<String>,
	alg: Option<String>,
}

#[derive(Deserialize)]
struct Payload {
	aud: Option<Audience>,
	jti: Option<String>,
	iat: Option<i64>,
	nbf: Option<i64>,
	exp: Option<i64>,
	sub: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Audience {
	One(String),
	Many(Vec<String>),
}
impl Audience {
	fn into_vec(self) -> Vec<String> {
		match self {
			Audience::One(aud) => vec![aud],
			Audience::Many(auds) => auds,
		}
	}
}

fn decode_segment<T>(segment: &'static str, raw: &str) -> Result<T, JwtError>
where
	T: for<'de> Deserialize<'de>,
{
	let bytes = URL_SAFE_LENIENT.decode(raw).map_err(|_| JwtError::Base64 { segment })?;
	let mut deserializer = serde_json::Deserializer::from_slice(&bytes);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|e| JwtError::Json { segment, message: e.to_string() })
}

fn timestamp(
	claim: &'static str,
	seconds: Option<i64>,
) -> Result<Option<OffsetDateTime>, JwtError> {
	seconds
		.map(|s| OffsetDateTime::from_unix_timestamp(s).map_err(|_| JwtError::Timestamp { claim }))
		.transpose()
}
