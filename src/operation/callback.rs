//! `GET /callback`: turn an OAuth redirect into an issued and stored credential.

// crates.io
use axum::{
	extract::{Query, State},
	response::{Html, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	oauth::{CodeGrant, PendingAuthorization},
	obs::{OperationKind, OperationSpan},
	operation::{
		OAUTH_PKCE_COOKIE, OAUTH_STATE_COOKIE, Operation, OperationError, VCS_PROFILE_COOKIE,
	},
};

/// Query the OAuth provider redirects with.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CallbackQuery {
	/// Authorization code.
	pub code: Option<String>,
	/// State issued by `/login`.
	pub state: Option<String>,
	/// OAuth error code, when the provider refused the login.
	pub error: Option<String>,
	/// Human-readable companion of `error`.
	pub error_description: Option<String>,
}

pub(crate) async fn handle(
	State(operation): State<Operation>,
	jar: CookieJar,
	Query(query): Query<CallbackQuery>,
) -> Response {
	super::observe(OperationKind::Callback, callback(operation, jar, query)).await
}

async fn callback(
	operation: Operation,
	jar: CookieJar,
	query: CallbackQuery,
) -> Result<(CookieJar, Html<String>), OperationError> {
	let stage = |name| OperationSpan::new(OperationKind::Callback, name);

	if let Some(error) = query.error {
		let reason = match query.error_description {
			Some(description) => format!("{error}: {description}"),
			None => error,
		};

		return Err(OperationError::bad_request(format!(
			"Failed to exchange code for token: provider returned {reason}."
		)));
	}

	let grant = CodeGrant { code: query.code, state: query.state, pending: pending(&jar) };
	let token = stage("exchange")
		.instrument(operation.issuer.exchange(grant))
		.await
		.map_err(|e| OperationError::bad_request(format!("Failed to exchange code for token: {e}")))?;
	let introspection = stage("introspect")
		.instrument(operation.resolver.resolve(&token.access_token))
		.await
		.map_err(|e| OperationError::bad_request(format!("Failed to get token info: {e}")))?;
	let profile = jar.get(VCS_PROFILE_COOKIE).map(|cookie| cookie.value().to_owned()).ok_or_else(
		|| {
			OperationError::bad_request(format!(
				"Failed to get cookie: named cookie `{VCS_PROFILE_COOKIE}` not present."
			))
		},
	)?;
	let subject = stage("cms")
		.instrument(operation.cms.fetch_subject(&token.access_token, &introspection))
		.await
		.map_err(|e| OperationError::bad_request(format!("Failed to get CMS data: {e}")))?;
	let credential = stage("create_credential")
		.instrument(operation.vcs.create_credential(subject, &introspection, &profile))
		.await
		.map_err(|e| OperationError::internal(format!("Failed to create credential: {e}")))?;

	stage("store_credential")
		.instrument(operation.vcs.store_credential(&credential, &profile))
		.await
		.map_err(|e| OperationError::internal(format!("Failed to store credential: {e}")))?;

	let html = operation
		.render(&operation.config.receive_vc_html, &credential.to_string(), |_| {})
		.await?;

	tracing::info!(%profile, "Credential issued and stored.");

	let jar = jar.remove(expired(OAUTH_STATE_COOKIE)).remove(expired(OAUTH_PKCE_COOKIE));

	Ok((jar, Html(html)))
}

/// Login session carried by the flow cookies, if both survived the round trip.
fn pending(jar: &CookieJar) -> Option<PendingAuthorization> {
	let state = jar.get(OAUTH_STATE_COOKIE)?;
	let verifier = jar.get(OAUTH_PKCE_COOKIE)?;

	Some(PendingAuthorization {
		state: state.value().to_owned(),
		pkce_verifier: TokenSecret::new(verifier.value()),
	})
}

fn expired(name: &'static str) -> Cookie<'static> {
	Cookie::build((name, "")).path("/").build()
}
