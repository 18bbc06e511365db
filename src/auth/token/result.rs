//! Token issued by one exchange hop and handed to the next stage.

// self
use crate::{_prelude::*, auth::TokenSecret, flows::Stage};

/// Token obtained from a single hop.
///
/// A result lives for one pipeline invocation only. It is deliberately not `Clone`: the next stage
/// takes it by value through [`TokenResult::into_secret`], so at most one token is live at a time.
pub struct TokenResult {
	/// Access token returned by the hop's token endpoint; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Instant the hop observed the successful response.
	pub obtained_at: OffsetDateTime,
	/// Stage that produced the token.
	pub stage: Stage,
}
impl TokenResult {
	/// Creates a result stamped with the current UTC instant.
	pub fn new(stage: Stage, access_token: TokenSecret) -> Self {
		Self { access_token, obtained_at: OffsetDateTime::now_utc(), stage }
	}

	/// Overrides the instant the token was obtained.
	pub fn with_obtained_at(mut self, instant: OffsetDateTime) -> Self {
		self.obtained_at = instant;

		self
	}

	/// Consumes the result and yields the token for the next stage.
	pub fn into_secret(self) -> TokenSecret {
		self.access_token
	}
}
impl Debug for TokenResult {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenResult")
			.field("access_token", &"<redacted>")
			.field("obtained_at", &self.obtained_at)
			.field("stage", &self.stage)
			.finish()
	}
}
