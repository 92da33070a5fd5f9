// std
use std::collections::HashMap;
// crates.io
use httpmock::prelude::*;
use url::Url;
// self
use vc_issuer_bridge::{
	auth::TokenSecret,
	error::{DownstreamError, Error},
	http::ReqwestHttpClient,
	oauth::{CodeGrant, IntrospectionResolver, OAuth2TokenIssuer, TokenIssuer, TokenResolver},
	provider::{ClientAuthMethod, ProviderDescriptor},
};

const CLIENT_ID: &str = "issuer-it";
const CLIENT_SECRET: &str = "secret-it";

fn descriptor(server: &MockServer, method: ClientAuthMethod) -> ProviderDescriptor {
	ProviderDescriptor::builder("mock-hydra")
		.authorization_endpoint(
			Url::parse(&server.url("/oauth2/auth")).expect("Authorization URL should parse."),
		)
		.token_endpoint(Url::parse(&server.url("/oauth2/token")).expect("Token URL should parse."))
		.introspection_endpoint(
			Url::parse(&server.url("/oauth2/introspect")).expect("Introspection URL should parse."),
		)
		.preferred_client_auth_method(method)
		.build()
		.expect("Descriptor should build.")
}

fn issuer(server: &MockServer, method: ClientAuthMethod) -> OAuth2TokenIssuer {
	OAuth2TokenIssuer::new(
		descriptor(server, method),
		CLIENT_ID,
		Url::parse("https://issuer.example.com/callback").expect("Redirect URL should parse."),
		ReqwestHttpClient::default(),
	)
	.with_client_secret(CLIENT_SECRET)
	.with_scopes(["openid"])
}

fn grant_for(issuer: &OAuth2TokenIssuer, scope: Option<&str>) -> (CodeGrant, HashMap<String, String>) {
	let session = issuer.start_authorization(scope).expect("Authorization should start.");
	let pairs = session.authorize_url.query_pairs().into_owned().collect();
	let grant = CodeGrant {
		code: Some("code-it".into()),
		state: Some(session.state.clone()),
		pending: Some(session.pending()),
	};

	(grant, pairs)
}

#[tokio::test]
async fn start_authorization_merges_the_requested_scope() {
	let server = MockServer::start_async().await;
	let issuer = issuer(&server, ClientAuthMethod::ClientSecretBasic);
	let (_, pairs) = grant_for(&issuer, Some("StudentCard"));

	assert_eq!(pairs.get("scope"), Some(&"openid StudentCard".to_owned()));
	assert_eq!(pairs.get("client_id"), Some(&CLIENT_ID.to_owned()));

	let (_, pairs) = grant_for(&issuer, Some("openid"));

	assert_eq!(pairs.get("scope"), Some(&"openid".to_owned()));
}

#[tokio::test]
async fn exchange_posts_code_and_verifier() {
	let server = MockServer::start_async().await;
	let issuer = issuer(&server, ClientAuthMethod::ClientSecretPost);
	let (grant, _) = grant_for(&issuer, None);
	let verifier = grant
		.pending
		.as_ref()
		.map(|pending| pending.pkce_verifier.expose().to_owned())
		.expect("The grant should carry a verifier.");
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth2/token")
				.header("content-type", "application/x-www-form-urlencoded")
				.form_urlencoded_tuple("grant_type", "authorization_code")
				.form_urlencoded_tuple("code", "code-it")
				.form_urlencoded_tuple("code_verifier", verifier)
				.form_urlencoded_tuple("client_id", CLIENT_ID)
				.form_urlencoded_tuple("client_secret", CLIENT_SECRET);
			then.status(200).header("content-type", "application/json").body(
				r#"{"access_token":"access-it","refresh_token":"refresh-it","token_type":"bearer","expires_in":3600}"#,
			);
		})
		.await;
	let token = issuer.exchange(grant).await.expect("The exchange should succeed.");

	mock.assert_async().await;

	assert_eq!(token.access_token.expose(), "access-it");
	assert_eq!(token.refresh_token.as_ref().map(TokenSecret::expose), Some("refresh-it"));
	assert!(token.expires_at.is_some_and(|expires_at| expires_at > token.issued_at));
}

#[tokio::test]
async fn exchange_maps_provider_errors() {
	let server = MockServer::start_async().await;
	let issuer = issuer(&server, ClientAuthMethod::ClientSecretBasic);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(400)
				.header("content-type", "application/json")
				.body(r#"{"error":"invalid_grant","error_description":"code expired"}"#);
		})
		.await;
	let (grant, _) = grant_for(&issuer, None);
	let err = issuer.exchange(grant).await.expect_err("An OAuth error should fail.");

	assert!(matches!(err, Error::InvalidGrant { .. }));
	assert!(err.to_string().contains("code expired"), "{err}");

	mock.delete_async().await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(200).header("content-type", "application/json").body("{");
		})
		.await;

	let (grant, _) = grant_for(&issuer, None);
	let err = issuer.exchange(grant).await.expect_err("A truncated body should fail.");

	assert!(matches!(err, Error::Downstream(DownstreamError::Malformed { .. })), "{err}");
}

#[tokio::test]
async fn exchange_refuses_mismatched_state_before_calling_the_provider() {
	let server = MockServer::start_async().await;
	let issuer = issuer(&server, ClientAuthMethod::ClientSecretBasic);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(200);
		})
		.await;
	let (mut grant, _) = grant_for(&issuer, None);

	grant.state = Some("forged".into());

	let err = issuer.exchange(grant).await.expect_err("A forged state should fail.");

	assert!(matches!(err, Error::InvalidGrant { .. }));
	assert_eq!(mock.hits_async().await, 0);
}

#[tokio::test]
async fn introspection_resolves_active_tokens() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth2/introspect")
				.header_exists("authorization")
				.form_urlencoded_tuple("token", "access-it")
				.form_urlencoded_tuple("token_type_hint", "access_token");
			then.status(200).body(r#"{"active":true,"sub":"foo@bar.com","scope":"openid StudentCard"}"#);
		})
		.await;
	let resolver = IntrospectionResolver::from_descriptor(
		&descriptor(&server, ClientAuthMethod::ClientSecretBasic),
		ReqwestHttpClient::default(),
	)
	.expect("The descriptor declares an introspection endpoint.")
	.with_client_credentials(CLIENT_ID, CLIENT_SECRET);
	let info = resolver
		.resolve(&TokenSecret::new("access-it"))
		.await
		.expect("Introspection should succeed.");

	mock.assert_async().await;

	assert_eq!(info.subject, "foo@bar.com");
	assert_eq!(info.credential_scope().expect("A credential scope should be granted."), "StudentCard");
}

#[tokio::test]
async fn introspection_rejects_inactive_tokens_and_bad_statuses() {
	let server = MockServer::start_async().await;
	let resolver = IntrospectionResolver::new(
		Url::parse(&server.url("/oauth2/introspect")).expect("Introspection URL should parse."),
		ReqwestHttpClient::default(),
	);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/introspect");
			then.status(200).body(r#"{"active":false}"#);
		})
		.await;
	let err = resolver
		.resolve(&TokenSecret::new("stale"))
		.await
		.expect_err("An inactive token should fail.");

	assert!(matches!(err, Error::InactiveToken));

	mock.delete_async().await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/introspect");
			then.status(401).body("unauthorized");
		})
		.await;

	let err = resolver
		.resolve(&TokenSecret::new("stale"))
		.await
		.expect_err("A 401 should fail.");

	assert!(err.to_string().contains("401 Unauthorized"), "{err}");
}
