//! Secure secret wrappers that redact sensitive material.

// crates.io
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

const FINGERPRINT_HEX_LEN: usize = 12;

/// Redacted secret wrapper keeping tokens and client secrets out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner secret value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns `true` when the secret holds no characters.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Short, non-reversible digest used to correlate log lines for the same secret.
	pub fn fingerprint(&self) -> String {
		let digest = Sha256::digest(self.0.as_bytes());
		let mut hex = String::with_capacity(FINGERPRINT_HEX_LEN);

		for byte in digest.iter().take(FINGERPRINT_HEX_LEN / 2) {
			hex.push_str(&format!("{byte:02x}"));
		}

		hex
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Caller-presented identity assertion that starts a pipeline invocation.
///
/// The assertion is moved into the pipeline, so one value can drive at most one invocation.
#[derive(PartialEq, Eq)]
pub struct Assertion(TokenSecret);
impl Assertion {
	/// Wraps the raw assertion issued by the upstream identity broker.
	pub fn new(value: impl Into<String>) -> Self {
		Self(TokenSecret::new(value))
	}

	/// Borrows the redacted secret.
	pub fn secret(&self) -> &TokenSecret {
		&self.0
	}

	/// Consumes the assertion and yields the wrapped secret.
	pub fn into_secret(self) -> TokenSecret {
		self.0
	}
}
impl From<String> for Assertion {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}
impl From<TokenSecret> for Assertion {
	fn from(value: TokenSecret) -> Self {
		Self(value)
	}
}
impl From<&str> for Assertion {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}
impl Debug for Assertion {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("Assertion").field(&"<redacted>").finish()
	}
}
