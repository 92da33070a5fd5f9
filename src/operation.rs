//! HTTP operations of the issuer.
//!
//! [`Operation::router`] serves four routes:
//!
//! - `GET /login` remembers the VCS profile and redirects to the OAuth provider.
//! - `GET /callback` exchanges the code, resolves the token, reads the CMS, then issues and stores
//!   a credential.
//! - `GET /retrieve` fetches a stored credential, optionally as a QR code.
//! - `POST /revoke` marks a credential revoked.
//!
//! Every failure becomes a `text/plain` response whose status is fixed by the step that failed.

pub mod callback;
pub mod login;
pub mod retrieve;
pub mod revoke;

// std
use std::time::Instant;
// crates.io
use axum::{
	Router,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use tower_http::trace::TraceLayer;
// self
use crate::{
	_prelude::*,
	cms::CmsClient,
	config::OperationConfig,
	http::ReqwestHttpClient,
	oauth::{TokenIssuer, TokenResolver},
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
	render::{self, Context},
	vcs::VcsClient,
};

/// Login route.
pub const LOGIN_PATH: &str = "/login";
/// OAuth redirect route.
pub const CALLBACK_PATH: &str = "/callback";
/// Credential retrieval route.
pub const RETRIEVE_PATH: &str = "/retrieve";
/// Credential revocation route.
pub const REVOKE_PATH: &str = "/revoke";

/// Cookie carrying the VCS profile from `/login` to later requests.
pub const VCS_PROFILE_COOKIE: &str = "vcsProfile";
/// Cookie carrying the OAuth state from `/login` to `/callback`.
pub const OAUTH_STATE_COOKIE: &str = "oauthState";
/// Cookie carrying the PKCE verifier from `/login` to `/callback`.
pub const OAUTH_PKCE_COOKIE: &str = "oauthPkce";

/// Handler failure rendered as a `text/plain` response.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("{message}")]
pub struct OperationError {
	/// Response status.
	pub status: StatusCode,
	/// Response body.
	pub message: String,
}
impl OperationError {
	/// Client-side problem (`400 Bad Request`).
	pub fn bad_request(message: impl Into<String>) -> Self {
		Self { status: StatusCode::BAD_REQUEST, message: message.into() }
	}

	/// Server-side or downstream problem (`500 Internal Server Error`).
	pub fn internal(message: impl Into<String>) -> Self {
		Self { status: StatusCode::INTERNAL_SERVER_ERROR, message: message.into() }
	}

	fn log(&self, kind: OperationKind) {
		if self.status.is_server_error() {
			tracing::error!(operation = %kind, status = %self.status, "{}", self.message);
		} else {
			tracing::warn!(operation = %kind, status = %self.status, "{}", self.message);
		}
	}
}
impl IntoResponse for OperationError {
	fn into_response(self) -> Response {
		(self.status, self.message).into_response()
	}
}

/// Issuer operation shared by every handler.
#[derive(Clone)]
pub struct Operation {
	config: Arc<OperationConfig>,
	issuer: Arc<dyn TokenIssuer>,
	resolver: Arc<dyn TokenResolver>,
	cms: CmsClient,
	vcs: VcsClient,
}
impl Operation {
	/// Validates `config` and builds the downstream clients.
	pub fn new(
		config: OperationConfig,
		issuer: Arc<dyn TokenIssuer>,
		resolver: Arc<dyn TokenResolver>,
	) -> Result<Self> {
		config.validate()?;

		let http_client = ReqwestHttpClient::with_timeout(config.request_timeout)?;
		let cms = CmsClient::new(config.cms_url.clone(), http_client.clone())?;
		let vcs = VcsClient::new(config.vcs_url.clone(), http_client)?;

		Ok(Self { config: Arc::new(config), issuer, resolver, cms, vcs })
	}

	/// Settings the handlers run with.
	pub fn config(&self) -> &OperationConfig {
		&self.config
	}

	/// Router serving the four issuer routes.
	pub fn router(&self) -> Router {
		Router::new()
			.route(LOGIN_PATH, get(login::handle))
			.route(CALLBACK_PATH, get(callback::handle))
			.route(RETRIEVE_PATH, get(retrieve::handle))
			.route(REVOKE_PATH, post(revoke::handle))
			.with_state(self.clone())
			.layer(TraceLayer::new_for_http())
	}

	/// Renders the template at `path` with `data`, the one variable every template receives.
	async fn render(
		&self,
		path: &Path,
		data: &str,
		extra: impl FnOnce(&mut Context),
	) -> Result<String, OperationError> {
		let mut context = Context::new();

		context.insert("data", data);
		extra(&mut context);

		render::render_template(path, &context)
			.await
			.map_err(|e| OperationError::internal(format!("Unable to load html: {e}")))
	}
}
impl Debug for Operation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Operation")
			.field("config", &self.config)
			.field("cms", &self.cms)
			.field("vcs", &self.vcs)
			.finish_non_exhaustive()
	}
}

/// Runs one request inside its operation span, recording the outcome.
async fn observe<F, R>(kind: OperationKind, fut: F) -> Response
where
	F: Future<Output = Result<R, OperationError>>,
	R: IntoResponse,
{
	let span = OperationSpan::new(kind, "request");

	span.instrument(async move {
		let started = Instant::now();
		let (outcome, response) = match fut.await {
			Ok(response) => (OperationOutcome::Success, response.into_response()),
			Err(e) => {
				e.log(kind);

				(OperationOutcome::Failure, e.into_response())
			},
		};

		obs::record_operation(kind, outcome, response.status(), started.elapsed());

		response
	})
	.await
}

/// Returns `value` unless it is missing or blank.
fn non_empty(value: Option<String>) -> Option<String> {
	value.filter(|value| !value.trim().is_empty())
}
