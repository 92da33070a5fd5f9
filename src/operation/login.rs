//! `GET /login`: start the OAuth login for a VCS profile.

// crates.io
use axum::{
	extract::{Query, State},
	response::{Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
// self
use crate::{
	_prelude::*,
	obs::{OperationKind, OperationSpan},
	operation::{
		OAUTH_PKCE_COOKIE, OAUTH_STATE_COOKIE, Operation, OperationError, VCS_PROFILE_COOKIE,
		non_empty,
	},
};

/// Query accepted by `/login`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct LoginQuery {
	/// VCS profile the credential will be issued under.
	#[serde(rename = "vcsProfile")]
	pub vcs_profile: Option<String>,
	/// Credential scope to request on top of the configured scopes.
	pub scope: Option<String>,
}

pub(crate) async fn handle(
	State(operation): State<Operation>,
	jar: CookieJar,
	Query(query): Query<LoginQuery>,
) -> Response {
	super::observe(OperationKind::Login, login(operation, jar, query)).await
}

async fn login(
	operation: Operation,
	jar: CookieJar,
	query: LoginQuery,
) -> Result<(CookieJar, Redirect), OperationError> {
	let profile = non_empty(query.vcs_profile)
		.ok_or_else(|| OperationError::bad_request("VCS profile is empty."))?;
	let session = OperationSpan::new(OperationKind::Login, "start_authorization")
		.instrument(async { operation.issuer.start_authorization(query.scope.as_deref()) })
		.await
		.map_err(|e| OperationError::internal(format!("Failed to start authorization: {e}")))?;
	let pending = session.pending();
	let jar = jar
		.add(
			Cookie::build((VCS_PROFILE_COOKIE, profile))
				.path("/")
				.max_age(Duration::days(1)),
		)
		.add(flow_cookie(OAUTH_STATE_COOKIE, pending.state))
		.add(flow_cookie(OAUTH_PKCE_COOKIE, pending.pkce_verifier.expose().to_owned()));

	tracing::info!(state = %session.state, "Redirecting to the OAuth provider.");

	Ok((jar, Redirect::temporary(session.authorize_url.as_str())))
}

/// Short-lived cookie that only has to survive the trip to the provider and back.
fn flow_cookie(name: &'static str, value: String) -> Cookie<'static> {
	Cookie::build((name, value))
		.path("/")
		.http_only(true)
		.same_site(SameSite::Lax)
		.max_age(Duration::minutes(10))
		.build()
}
