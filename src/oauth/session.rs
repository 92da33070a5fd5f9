//! Login sessions: state and PKCE generation plus callback verification.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, auth::TokenSecret, provider::ProviderDescriptor};

const STATE_LEN: usize = 32;
const PKCE_VERIFIER_LEN: usize = 64;

/// Supported PKCE challenge methods surfaced via [`AuthorizationSession`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PkceCodeChallengeMethod {
	/// SHA-256 based PKCE (RFC 7636 S256).
	S256,
}
impl PkceCodeChallengeMethod {
	/// Returns the RFC 7636 identifier for the challenge method.
	pub fn as_str(self) -> &'static str {
		match self {
			PkceCodeChallengeMethod::S256 => "S256",
		}
	}
}

/// Authorization Code + PKCE handshake metadata produced when a login starts.
#[derive(Clone)]
pub struct AuthorizationSession {
	/// Opaque state value that must round-trip via the redirect handler.
	pub state: String,
	/// Fully-formed authorize URL the login handler redirects to.
	pub authorize_url: Url,
	pkce: PkcePair,
}
impl AuthorizationSession {
	/// Assembles a session from an already-built authorize URL.
	pub fn new(state: impl Into<String>, authorize_url: Url) -> Self {
		Self { state: state.into(), authorize_url, pkce: PkcePair::generate() }
	}

	/// PKCE code challenge derived from the secret verifier.
	pub fn code_challenge(&self) -> &str {
		&self.pkce.challenge
	}

	/// PKCE challenge method (currently always `S256`).
	pub fn code_challenge_method(&self) -> PkceCodeChallengeMethod {
		self.pkce.method
	}

	/// The values the callback needs to finish this session.
	pub fn pending(&self) -> PendingAuthorization {
		PendingAuthorization { state: self.state.clone(), pkce_verifier: self.pkce.verifier.clone() }
	}
}
impl Debug for AuthorizationSession {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizationSession")
			.field("state", &self.state)
			.field("authorize_url", &self.authorize_url)
			.field("code_challenge", &self.pkce.challenge)
			.field("code_challenge_method", &self.pkce.method)
			.finish()
	}
}

/// State and PKCE verifier carried between `/login` and `/callback`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingAuthorization {
	/// State value issued by the login.
	pub state: String,
	/// PKCE verifier matching the challenge sent to the provider.
	pub pkce_verifier: TokenSecret,
}

/// Everything the callback received, handed to [`TokenIssuer::exchange`](super::TokenIssuer::exchange).
#[derive(Clone, Debug, Default)]
pub struct CodeGrant {
	/// Authorization code returned by the provider.
	pub code: Option<String>,
	/// State value returned by the provider.
	pub state: Option<String>,
	/// Session the login stored for this browser, if any.
	pub pending: Option<PendingAuthorization>,
}
impl CodeGrant {
	/// Checks the callback against its login and yields the code plus PKCE verifier.
	pub fn verify(self) -> Result<(String, TokenSecret)> {
		let code = self.code.filter(|code| !code.is_empty()).ok_or_else(|| {
			Error::InvalidGrant { reason: "authorization code is missing".into() }
		})?;
		let pending = self.pending.ok_or_else(|| Error::InvalidGrant {
			reason: "no login session accompanies the callback".into(),
		})?;

		if self.state.as_deref() != Some(pending.state.as_str()) {
			return Err(Error::InvalidGrant { reason: "authorization state mismatch".into() });
		}

		Ok((code, pending.pkce_verifier))
	}
}

#[derive(Clone)]
struct PkcePair {
	verifier: TokenSecret,
	challenge: String,
	method: PkceCodeChallengeMethod,
}
impl PkcePair {
	fn generate() -> Self {
		let verifier = random_string(PKCE_VERIFIER_LEN);
		let challenge = compute_pkce_challenge(&verifier);

		Self { verifier: TokenSecret::new(verifier), challenge, method: PkceCodeChallengeMethod::S256 }
	}
}

/// Starts a session for `descriptor`, requesting `scopes` joined by spaces.
pub(crate) fn build_session(
	descriptor: &ProviderDescriptor,
	client_id: &str,
	redirect_uri: &Url,
	scopes: &[&str],
) -> AuthorizationSession {
	let state = random_string(STATE_LEN);
	let mut session = AuthorizationSession::new(state, descriptor.endpoints.authorization.clone());
	let mut pairs = session.authorize_url.query_pairs_mut();

	pairs.append_pair("response_type", "code");
	pairs.append_pair("client_id", client_id);
	pairs.append_pair("redirect_uri", redirect_uri.as_str());

	if !scopes.is_empty() {
		pairs.append_pair("scope", &scopes.join(" "));
	}

	pairs.append_pair("state", &session.state);
	pairs.append_pair("code_challenge", &session.pkce.challenge);
	pairs.append_pair("code_challenge_method", session.pkce.method.as_str());

	drop(pairs);

	session
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

fn compute_pkce_challenge(verifier: &str) -> String {
	let mut hasher = Sha256::new();
	hasher.update(verifier.as_bytes());
	let digest = hasher.finalize();
	URL_SAFE_NO_PAD.encode(digest)
}
