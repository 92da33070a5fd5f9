//! RFC 7662 token introspection result.

// self
use crate::_prelude::*;

/// Scopes that describe the login itself rather than a credential type.
const STANDARD_SCOPES: [&str; 5] = ["openid", "offline", "offline_access", "profile", "email"];

/// Introspection response describing the token holder.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Introspection {
	/// Whether the token is currently active.
	#[serde(default)]
	pub active: bool,
	/// Subject the token was issued to; the CMS looks users up by it.
	#[serde(default, rename = "sub")]
	pub subject: String,
	/// Space-delimited scopes granted to the token.
	#[serde(default)]
	pub scope: String,
	/// Client the token was issued to.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub client_id: Option<String>,
	/// Human-readable resource owner identifier.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub username: Option<String>,
	/// Token type, usually `access_token` or `Bearer`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub token_type: Option<String>,
	/// Expiry as a UNIX timestamp.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub exp: Option<i64>,
	/// Issue time as a UNIX timestamp.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub iat: Option<i64>,
	/// Provider-specific members.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}
impl Introspection {
	/// Iterator over the granted scopes.
	pub fn scopes(&self) -> impl Iterator<Item = &str> {
		self.scope.split_whitespace()
	}

	/// The first granted scope that names a credential type.
	///
	/// Standard OpenID Connect scopes are skipped, so `openid StudentCard` yields
	/// `StudentCard`.
	pub fn credential_scope(&self) -> Result<&str> {
		self.scopes()
			.find(|scope| !STANDARD_SCOPES.contains(&scope.to_ascii_lowercase().as_str()))
			.ok_or(Error::MissingCredentialScope)
	}
}
