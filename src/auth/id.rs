//! Strongly typed identifiers validated at the pipeline boundary.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal $(, $extra:path)?) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				validate_view($kind, view)?;
				$($extra($kind, view)?;)?

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				validate_view($kind, &value)?;
				$($extra($kind, &value)?;)?

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 128;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (tenant, resource).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (tenant, resource).
		kind: &'static str,
	},
	/// The identifier contains control characters that cannot travel in an HTTP header.
	#[error("{kind} identifier contains control characters.")]
	ContainsControl {
		/// Kind of identifier (tenant, resource).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (tenant, resource).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
	/// The identifier cannot be used verbatim as a single URL path segment.
	#[error("{kind} identifier is not a safe URL path segment.")]
	UnsafePathSegment {
		/// Kind of identifier (tenant, resource).
		kind: &'static str,
	},
}

def_id! {
	TenantId,
	"Directory tenant that scopes the on-behalf-of token endpoint.",
	"Tenant",
	validate_path_segment
}
def_id! { ResourceId, "Caller-supplied identifier of the downstream resource (e.g. a product code).", "Resource" }

fn validate_view(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.chars().any(char::is_control) {
		return Err(IdentifierError::ContainsControl { kind });
	}
	if view.chars().count() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}

// Tenants are spliced into `/{tenant}/oauth2/token`.
fn validate_path_segment(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view == "."
		|| view == ".."
		|| view.chars().any(|c| matches!(c, '/' | '\\' | '?' | '#' | '%'))
	{
		return Err(IdentifierError::UnsafePathSegment { kind });
	}

	Ok(())
}
