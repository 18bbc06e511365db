// self
use crate::_prelude::*;

/// `requested_token_use` value for the on-behalf-of hop.
pub const REQUESTED_TOKEN_USE_ON_BEHALF_OF: &str = "on_behalf_of";
/// `requested_token_type` value asking identity provider A for a SAML2 token.
pub const TOKEN_TYPE_SAML2: &str = "urn:ietf:params:oauth:token-type:saml2";

/// Assertion grants supported by the two hops.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
	/// RFC 7523 JWT bearer assertion grant (on-behalf-of hop).
	JwtBearer,
	/// RFC 7522 SAML 2.0 bearer assertion grant.
	Saml2Bearer,
}
impl GrantType {
	/// Returns the URN sent as `grant_type`.
	pub fn as_str(self) -> &'static str {
		match self {
			GrantType::JwtBearer => "urn:ietf:params:oauth:grant-type:jwt-bearer",
			GrantType::Saml2Bearer => "urn:ietf:params:oauth:grant-type:saml2-bearer",
		}
	}
}
impl Display for GrantType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
