//! Transport primitives shared by every downstream call.
//!
//! [`ReqwestHttpClient`] wraps the reqwest client used for the CMS, the VC service, and the
//! OAuth provider. [`ReqwestHttpClient::send`] enforces the single status code each endpoint
//! promises and turns everything else into a [`DownstreamError`] that names the service.
//! Token exchanges go through the `oauth2` crate, which talks to the provider via
//! [`InstrumentedHandle`] so the HTTP status survives into error mapping.

// std
use std::{ops::Deref, time::Duration as StdDuration};
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, DownstreamError, TransportError},
};

const BODY_PREVIEW_LIMIT: usize = 256;

/// Downstream services the bridge talks to, used to label errors and spans.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Service {
	/// CMS holding user profiles.
	Cms,
	/// Verifiable-credential service.
	Vcs,
	/// OAuth 2.0 token endpoint.
	TokenEndpoint,
	/// OAuth 2.0 introspection endpoint.
	Introspection,
}
impl Service {
	/// Returns a stable label suitable for messages and span fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Service::Cms => "CMS",
			Service::Vcs => "VC service",
			Service::TokenEndpoint => "token endpoint",
			Service::Introspection => "introspection endpoint",
		}
	}
}
impl Display for Service {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Captures metadata from the most recent token-endpoint response for error mapping.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code returned by the token endpoint, if available.
	pub status: Option<u16>,
}

/// Thread-safe slot for sharing [`ResponseMetadata`] between transport and error layers.
///
/// The token issuer creates a fresh slot per exchange and reads it right after `oauth2`
/// resolves.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// [`ReqwestHttpClient::with_timeout`] builds the client the service runs with; it never
/// follows redirects, so token, CMS and VCS calls see the status the endpoint returned.
/// [`Default`] wraps a stock reqwest client, which does follow redirects.
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
impl ReqwestHttpClient {
	/// Builds a client whose requests give up after `timeout`.
	pub fn with_timeout(timeout: StdDuration) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.timeout(timeout)
			.redirect(reqwest::redirect::Policy::none())
			.build()?;

		Ok(Self(client))
	}

	/// Sends `request` and returns the body when the response carries `expected`.
	pub async fn send(
		&self,
		service: Service,
		request: RequestBuilder,
		expected: StatusCode,
	) -> Result<Vec<u8>> {
		let response =
			request.send().await.map_err(|e| TransportError::network(service, e))?;
		let status = response.status();
		let body = response.bytes().await.map_err(|e| TransportError::network(service, e))?;

		if status != expected {
			tracing::debug!(%service, %status, %expected, "Downstream call returned an unexpected status.");

			return Err(DownstreamError::UnexpectedStatus {
				service,
				status,
				expected,
				body: body_preview(&body),
			}
			.into());
		}

		Ok(body.to_vec())
	}

	/// Builds an instrumented handle that captures response metadata for `oauth2`.
	pub(crate) fn instrumented(&self, slot: ResponseMetadataSlot) -> InstrumentedHandle {
		InstrumentedHandle::new(self.0.clone(), slot)
	}
}
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

/// Instrumented adapter that implements [`AsyncHttpClient`] for reqwest.
pub(crate) struct InstrumentedHttpClient {
	client: ReqwestClient,
	slot: ResponseMetadataSlot,
}

/// Handle passed to `oauth2` request builders.
#[derive(Clone)]
pub struct InstrumentedHandle(Arc<InstrumentedHttpClient>);
impl InstrumentedHandle {
	fn new(client: ReqwestClient, slot: ResponseMetadataSlot) -> Self {
		Self(Arc::new(InstrumentedHttpClient { client, slot }))
	}
}
impl<'c> AsyncHttpClient<'c> for InstrumentedHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = Arc::clone(&self.0);

		Box::pin(async move {
			client.slot.take();

			let response = client
				.client
				.execute(request.try_into().map_err(Box::new)?)
				.await
				.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();

			client.slot.store(ResponseMetadata { status: Some(status.as_u16()) });

			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

/// Decodes a JSON body, keeping the failing path in the error.
pub fn decode_json<T>(service: Service, body: &[u8]) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut de = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut de)
		.map_err(|source| DownstreamError::Malformed { service, source }.into())
}

/// Appends path segments to a validated service base URL.
///
/// `base` must be able to carry path segments; [`validate_service_url`] guarantees that for
/// every URL the operation stores.
pub fn endpoint(base: &Url, segments: &[&str]) -> Url {
	let mut url = base.clone();

	if let Ok(mut path) = url.path_segments_mut() {
		path.pop_if_empty().extend(segments);
	}

	url
}

/// Accepts only `http`/`https` URLs that can carry path segments.
pub fn validate_service_url(service: Service, url: &Url) -> Result<(), ConfigError> {
	if matches!(url.scheme(), "http" | "https") && !url.cannot_be_a_base() {
		Ok(())
	} else {
		Err(ConfigError::InvalidServiceUrl { service, url: url.to_string() })
	}
}

fn body_preview(body: &[u8]) -> String {
	let text = String::from_utf8_lossy(body);
	let text = text.trim();

	match text.char_indices().nth(BODY_PREVIEW_LIMIT) {
		Some((idx, _)) => format!("{}…", &text[..idx]),
		None => text.to_owned(),
	}
}
