//! `GET /retrieve`: show a stored credential, optionally as a QR code.

// crates.io
use axum::{
	extract::{Query, State},
	http::{HeaderMap, header::HOST},
	response::{Html, Response},
};
use axum_extra::extract::cookie::CookieJar;
// self
use crate::{
	_prelude::*,
	obs::{OperationKind, OperationSpan},
	operation::{Operation, OperationError, VCS_PROFILE_COOKIE, non_empty},
	qr,
};

/// Query accepted by `/retrieve`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RetrieveQuery {
	/// Credential identifier.
	pub id: Option<String>,
	/// VCS profile; the `vcsProfile` cookie is used when absent.
	pub profile: Option<String>,
	/// Render a QR code linking back to this credential.
	#[serde(default)]
	pub qr: bool,
}

pub(crate) async fn handle(
	State(operation): State<Operation>,
	jar: CookieJar,
	headers: HeaderMap,
	Query(query): Query<RetrieveQuery>,
) -> Response {
	super::observe(OperationKind::Retrieve, retrieve(operation, jar, headers, query)).await
}

async fn retrieve(
	operation: Operation,
	jar: CookieJar,
	headers: HeaderMap,
	query: RetrieveQuery,
) -> Result<Html<String>, OperationError> {
	let id =
		non_empty(query.id).ok_or_else(|| OperationError::bad_request("Credential id is empty."))?;
	let profile = non_empty(query.profile)
		.or_else(|| non_empty(jar.get(VCS_PROFILE_COOKIE).map(|c| c.value().to_owned())))
		.ok_or_else(|| OperationError::bad_request("VCS profile is empty."))?;
	let credential = OperationSpan::new(OperationKind::Retrieve, "retrieve_credential")
		.instrument(operation.vcs.retrieve_credential(&id, &profile))
		.await
		.map_err(|e| OperationError::internal(format!("Failed to retrieve credential: {e}")))?;
	let data = String::from_utf8_lossy(&credential);

	if !query.qr {
		return operation.render(&operation.config.receive_vc_html, &data, |_| {}).await.map(Html);
	}

	let base = public_base(operation.config.external_url.as_ref(), &headers)?;
	let code = qr::generate_qr_code(&credential, &base, &profile)
		.map_err(|e| OperationError::internal(format!("Failed to generate QR code: {e}")))?;

	operation
		.render(&operation.config.qr_code_html, &data, |context| {
			context.insert("image", &code.image);
			context.insert("url", code.url.as_str());
		})
		.await
		.map(Html)
}

/// Base URL QR links point at: the configured external URL, else the request's `Host`.
fn public_base(external: Option<&Url>, headers: &HeaderMap) -> Result<Url, OperationError> {
	if let Some(url) = external {
		return Ok(url.clone());
	}

	let host = headers.get(HOST).and_then(|value| value.to_str().ok()).unwrap_or("localhost");

	Url::parse(&format!("http://{host}"))
		.map_err(|e| OperationError::internal(format!("Failed to generate QR code: {e}")))
}

#[cfg(test)]
mod tests {
	// crates.io
	use axum::http::HeaderValue;
	// self
	use super::*;

	#[test]
	fn public_base_prefers_external_url_then_host() {
		let external = Url::parse("https://issuer.example.com").expect("External URL should parse.");
		let mut headers = HeaderMap::new();

		assert_eq!(
			public_base(Some(&external), &headers).expect("External URL wins.").as_str(),
			"https://issuer.example.com/"
		);
		assert_eq!(
			public_base(None, &headers).expect("Localhost is the fallback.").as_str(),
			"http://localhost/"
		);

		headers.insert(HOST, HeaderValue::from_static("issuer.local:8080"));

		assert_eq!(
			public_base(None, &headers).expect("The Host header should be used.").as_str(),
			"http://issuer.local:8080/"
		);
	}
}
