//! Shared fixtures for the router integration tests.

#![allow(dead_code)]

// std
use std::{fs, sync::Arc};
// crates.io
use axum::{
	Router,
	body::Body,
	http::{HeaderMap, Request, StatusCode},
};
use http_body_util::BodyExt;
use httpmock::MockServer;
use tempfile::TempDir;
use tower::ServiceExt;
use url::Url;
// self
use vc_issuer_bridge::{
	auth::{AccessToken, Introspection, TokenSecret},
	config::OperationConfig,
	error::{Error, Result},
	oauth::{AuthorizationSession, CodeGrant, OAuthFuture, TokenIssuer, TokenResolver},
	operation::Operation,
};

pub const STATE: &str = "state-123";
pub const VERIFIER: &str = "verifier-123";
pub const PROFILE: &str = "issuer-1";
pub const ACCESS_TOKEN: &str = "access-123";
pub const AUTHORIZE_URL: &str = "https://hydra.example.com/oauth2/auth";

/// Cookies a browser presents after a successful `/login`.
pub fn login_cookies() -> String {
	format!("oauthState={STATE}; oauthPkce={VERIFIER}; vcsProfile={PROFILE}")
}

/// Issuer that hands out a fixed state and token while still checking the callback state.
#[derive(Debug, Default)]
pub struct MockIssuer {
	pub fail_start: bool,
	pub reject_exchange: Option<String>,
}
impl TokenIssuer for MockIssuer {
	fn start_authorization(&self, scope: Option<&str>) -> Result<AuthorizationSession> {
		if self.fail_start {
			return Err(Error::InvalidGrant { reason: "provider unavailable".into() });
		}

		let mut url = Url::parse(AUTHORIZE_URL).expect("Authorize URL fixture should parse.");

		url.query_pairs_mut().append_pair("state", STATE);

		if let Some(scope) = scope {
			url.query_pairs_mut().append_pair("scope", scope);
		}

		Ok(AuthorizationSession::new(STATE, url))
	}

	fn exchange(&self, grant: CodeGrant) -> OAuthFuture<'_, AccessToken> {
		Box::pin(async move {
			let (_code, verifier) = grant.verify()?;

			assert_eq!(verifier.expose(), VERIFIER);

			match &self.reject_exchange {
				Some(reason) => Err(Error::InvalidGrant { reason: reason.clone() }),
				None => Ok(AccessToken::new(ACCESS_TOKEN)),
			}
		})
	}
}

/// Resolver returning a canned introspection, or an inactive-token error when unset.
#[derive(Debug)]
pub struct MockResolver {
	pub introspection: Option<Introspection>,
}
impl MockResolver {
	pub fn active(scope: &str) -> Self {
		Self {
			introspection: Some(Introspection {
				active: true,
				subject: "foo@bar.com".into(),
				scope: scope.into(),
				..Default::default()
			}),
		}
	}

	pub fn inactive() -> Self {
		Self { introspection: None }
	}
}
impl TokenResolver for MockResolver {
	fn resolve<'a>(&'a self, token: &'a TokenSecret) -> OAuthFuture<'a, Introspection> {
		Box::pin(async move {
			assert_eq!(token.expose(), ACCESS_TOKEN);

			self.introspection.clone().ok_or(Error::InactiveToken)
		})
	}
}

/// Router wired to a mock CMS/VCS server and templates in a temporary directory.
pub struct TestApp {
	pub server: MockServer,
	pub router: Router,
	pub templates: TempDir,
}
impl TestApp {
	pub async fn new(issuer: MockIssuer, resolver: MockResolver) -> Self {
		Self::with_config(issuer, resolver, |config| config).await
	}

	pub async fn with_config(
		issuer: MockIssuer,
		resolver: MockResolver,
		customize: impl FnOnce(OperationConfig) -> OperationConfig,
	) -> Self {
		let server = MockServer::start_async().await;
		let templates = TempDir::new().expect("Template directory should be created.");
		let receive_vc = templates.path().join("receive_vc.html");
		let qr_code = templates.path().join("qr_code.html");
		let vc = templates.path().join("vc.html");

		fs::write(&receive_vc, "<pre>{{ data }}</pre>").expect("Template should be written.");
		fs::write(&qr_code, "<img src=\"{{ image }}\"><a>{{ url }}</a><pre>{{ data }}</pre>")
			.expect("Template should be written.");
		fs::write(&vc, "<p>Revoked</p><pre>{{ data }}</pre>").expect("Template should be written.");

		let config = OperationConfig::new(
			Url::parse(&server.url("/cms")).expect("CMS URL should parse."),
			Url::parse(&server.url("/vcs")).expect("VCS URL should parse."),
		)
		.with_templates(receive_vc, qr_code, vc);
		let operation = Operation::new(customize(config), Arc::new(issuer), Arc::new(resolver))
			.expect("Operation should build.");

		Self { server, router: operation.router(), templates }
	}

	pub async fn send(&self, request: Request<Body>) -> TestResponse {
		let response =
			self.router.clone().oneshot(request).await.expect("Router should always respond.");
		let status = response.status();
		let headers = response.headers().clone();
		let body = response
			.into_body()
			.collect()
			.await
			.expect("Response body should be readable.")
			.to_bytes();

		TestResponse { status, headers, body: String::from_utf8_lossy(&body).into_owned() }
	}

	pub async fn get(&self, uri: &str, cookies: Option<&str>) -> TestResponse {
		let mut request = Request::builder().method("GET").uri(uri);

		if let Some(cookies) = cookies {
			request = request.header("cookie", cookies);
		}

		self.send(request.body(Body::empty()).expect("Request should build.")).await
	}
}

#[derive(Debug)]
pub struct TestResponse {
	pub status: StatusCode,
	pub headers: HeaderMap,
	pub body: String,
}
impl TestResponse {
	/// `Set-Cookie` headers in response order.
	pub fn set_cookies(&self) -> Vec<String> {
		self.headers
			.get_all("set-cookie")
			.iter()
			.filter_map(|value| value.to_str().ok())
			.map(str::to_owned)
			.collect()
	}

	/// The `Set-Cookie` header for `name`, if any.
	pub fn set_cookie(&self, name: &str) -> Option<String> {
		self.set_cookies().into_iter().find(|cookie| cookie.starts_with(&format!("{name}=")))
	}
}
