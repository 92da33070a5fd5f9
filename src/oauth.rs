//! OAuth 2.0 collaborators behind the callback pipeline.
//!
//! [`TokenIssuer`] starts logins and trades authorization codes for access tokens;
//! [`TokenResolver`] turns an access token into an [`Introspection`]. The operation only sees
//! the traits, so tests swap in fakes while the binary wires [`OAuth2TokenIssuer`] and
//! [`IntrospectionResolver`].

pub mod session;

pub use oauth2;
pub use session::*;

// crates.io
use oauth2::{
	AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, EndpointNotSet, EndpointSet,
	HttpClientError, PkceCodeVerifier, RedirectUrl, RequestTokenError, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError},
};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, Introspection, TokenSecret},
	error::{ConfigError, DownstreamError, TransportError},
	http::{self, ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot, Service},
	provider::{ClientAuthMethod, ProviderDescriptor},
};

type ConfiguredBasicClient =
	BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Boxed future returned by the OAuth collaborators.
pub type OAuthFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Starts Authorization Code logins and exchanges their codes.
pub trait TokenIssuer
where
	Self: Send + Sync,
{
	/// Builds the authorize redirect for a new login, optionally requesting `scope`.
	fn start_authorization(&self, scope: Option<&str>) -> Result<AuthorizationSession>;

	/// Verifies the callback in `grant` and exchanges its code for an access token.
	fn exchange(&self, grant: CodeGrant) -> OAuthFuture<'_, AccessToken>;
}

/// Resolves access tokens into introspection results.
pub trait TokenResolver
where
	Self: Send + Sync,
{
	/// Looks up `token` at the provider.
	fn resolve<'a>(&'a self, token: &'a TokenSecret) -> OAuthFuture<'a, Introspection>;
}

/// [`TokenIssuer`] backed by the `oauth2` crate and reqwest.
#[derive(Clone, Debug)]
pub struct OAuth2TokenIssuer {
	descriptor: ProviderDescriptor,
	client_id: String,
	client_secret: Option<TokenSecret>,
	redirect_uri: Url,
	scopes: Vec<String>,
	http_client: ReqwestHttpClient,
}
impl OAuth2TokenIssuer {
	/// Creates an issuer for `descriptor` that redirects back to `redirect_uri`.
	pub fn new(
		descriptor: ProviderDescriptor,
		client_id: impl Into<String>,
		redirect_uri: Url,
		http_client: ReqwestHttpClient,
	) -> Self {
		Self {
			descriptor,
			client_id: client_id.into(),
			client_secret: None,
			redirect_uri,
			scopes: Vec::new(),
			http_client,
		}
	}

	/// Sets the client secret used at the token endpoint.
	pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
		self.client_secret = Some(TokenSecret::new(secret));

		self
	}

	/// Sets the scopes every login requests.
	pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.scopes = scopes.into_iter().map(Into::into).collect();

		self
	}

	fn oauth_client(&self) -> Result<ConfiguredBasicClient> {
		let auth_url = AuthUrl::new(self.descriptor.endpoints.authorization.to_string())
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let token_url = TokenUrl::new(self.descriptor.endpoints.token.to_string())
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let redirect_url = RedirectUrl::new(self.redirect_uri.to_string())
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let mut client = BasicClient::new(ClientId::new(self.client_id.clone()))
			.set_auth_uri(auth_url)
			.set_token_uri(token_url)
			.set_redirect_uri(redirect_url);

		match self.descriptor.preferred_client_auth_method {
			ClientAuthMethod::NoneWithPkce => {},
			method => {
				if let Some(secret) = &self.client_secret {
					client = client.set_client_secret(ClientSecret::new(secret.expose().to_owned()));
				}
				if matches!(method, ClientAuthMethod::ClientSecretPost) {
					client = client.set_auth_type(AuthType::RequestBody);
				}
			},
		}

		Ok(client)
	}
}
impl TokenIssuer for OAuth2TokenIssuer {
	fn start_authorization(&self, scope: Option<&str>) -> Result<AuthorizationSession> {
		let mut scopes = self.scopes.iter().map(String::as_str).collect::<Vec<_>>();

		if let Some(scope) =
			scope.map(str::trim).filter(|scope| !scope.is_empty() && !scopes.contains(scope))
		{
			scopes.push(scope);
		}

		let session =
			session::build_session(&self.descriptor, &self.client_id, &self.redirect_uri, &scopes);

		tracing::debug!(provider = %self.descriptor.id, ?scopes, "Authorization session started.");

		Ok(session)
	}

	fn exchange(&self, grant: CodeGrant) -> OAuthFuture<'_, AccessToken> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let (code, verifier) = grant.verify()?;
			let client = self.oauth_client()?;
			let instrumented = self.http_client.instrumented(meta.clone());
			let response = client
				.exchange_code(AuthorizationCode::new(code))
				.set_pkce_verifier(PkceCodeVerifier::new(verifier.expose().to_owned()))
				.request_async(&instrumented)
				.await
				.map_err(|err| map_request_error(meta.take(), err))?;
			let mut token = AccessToken::new(response.access_token().secret().to_owned());

			if let Some(refresh) = response.refresh_token() {
				token = token.with_refresh_token(refresh.secret().to_owned());
			}
			if let Some(expires_in) =
				response.expires_in().and_then(|value| Duration::try_from(value).ok())
			{
				token = token.with_expires_in(expires_in);
			}

			Ok(token)
		})
	}
}

/// [`TokenResolver`] that calls an RFC 7662 introspection endpoint.
#[derive(Clone, Debug)]
pub struct IntrospectionResolver {
	endpoint: Url,
	client_id: Option<String>,
	client_secret: Option<TokenSecret>,
	http_client: ReqwestHttpClient,
}
impl IntrospectionResolver {
	/// Creates an unauthenticated resolver for `endpoint`.
	pub fn new(endpoint: Url, http_client: ReqwestHttpClient) -> Self {
		Self { endpoint, client_id: None, client_secret: None, http_client }
	}

	/// Creates a resolver for the introspection endpoint declared by `descriptor`.
	pub fn from_descriptor(
		descriptor: &ProviderDescriptor,
		http_client: ReqwestHttpClient,
	) -> Result<Self, ConfigError> {
		let endpoint = descriptor.endpoints.introspection.clone().ok_or_else(|| {
			ConfigError::MissingIntrospectionEndpoint { descriptor: descriptor.id.clone() }
		})?;

		Ok(Self::new(endpoint, http_client))
	}

	/// Authenticates introspection calls with HTTP Basic client credentials.
	pub fn with_client_credentials(
		mut self,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> Self {
		self.client_id = Some(client_id.into());
		self.client_secret = Some(TokenSecret::new(client_secret));

		self
	}
}
impl TokenResolver for IntrospectionResolver {
	fn resolve<'a>(&'a self, token: &'a TokenSecret) -> OAuthFuture<'a, Introspection> {
		Box::pin(async move {
			let body = url::form_urlencoded::Serializer::new(String::new())
				.append_pair("token", token.expose())
				.append_pair("token_type_hint", "access_token")
				.finish();
			let mut request = self
				.http_client
				.post(self.endpoint.clone())
				.header(CONTENT_TYPE, HeaderValue::from_static("application/x-www-form-urlencoded"))
				.body(body);

			if let (Some(id), Some(secret)) = (&self.client_id, &self.client_secret) {
				request = request.basic_auth(id, Some(secret.expose()));
			}

			let body = self.http_client.send(Service::Introspection, request, StatusCode::OK).await?;
			let introspection: Introspection = http::decode_json(Service::Introspection, &body)?;

			if !introspection.active {
				return Err(Error::InactiveToken);
			}

			Ok(introspection)
		})
	}
}

fn map_request_error(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<ReqwestError>>,
) -> Error {
	let status = meta.and_then(|meta| meta.status);

	match err {
		RequestTokenError::ServerResponse(response) => map_server_response_error(&response),
		RequestTokenError::Request(error) => map_transport_error(status, error),
		RequestTokenError::Parse(source, _body) =>
			DownstreamError::Malformed { service: Service::TokenEndpoint, source }.into(),
		RequestTokenError::Other(message) =>
			DownstreamError::TokenEndpoint { message, status }.into(),
	}
}

fn map_server_response_error(response: &BasicErrorResponse) -> Error {
	let reason = match response.error_description() {
		Some(description) => format!("{}: {description}", response.error().as_ref()),
		None => response.error().as_ref().to_owned(),
	};

	Error::InvalidGrant { reason }
}

fn map_transport_error(status: Option<u16>, err: HttpClientError<ReqwestError>) -> Error {
	match err {
		HttpClientError::Reqwest(inner) =>
			TransportError::network(Service::TokenEndpoint, *inner).into(),
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(source) =>
			TransportError::Io { service: Service::TokenEndpoint, source }.into(),
		HttpClientError::Other(message) => DownstreamError::TokenEndpoint { message, status }.into(),
		_ => DownstreamError::TokenEndpoint {
			message: "HTTP client error occurred while calling the token endpoint".into(),
			status,
		}
		.into(),
	}
}
