//! Verifiable-credential service client.

// self
use crate::{
	_prelude::*,
	auth::Introspection,
	cms::Subject,
	error::ConfigError,
	http::{self, ReqwestHttpClient, Service},
};

/// JSON-LD context attached to every issued credential.
pub const CREDENTIAL_CONTEXT: &str = "https://www.w3.org/2018/credentials/examples/v1";
/// Base type every issued credential carries.
pub const CREDENTIAL_BASE_TYPE: &str = "VerifiableCredential";

/// Body of a `POST /credential` call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreateCredentialRequest {
	/// JSON-LD contexts.
	#[serde(rename = "@context")]
	pub context: Vec<String>,
	/// Credential types; the base type followed by the granted scope.
	#[serde(rename = "type")]
	pub types: Vec<String>,
	/// Holder attributes taken from the CMS.
	#[serde(rename = "credentialSubject")]
	pub credential_subject: Subject,
	/// VCS issuer profile.
	pub profile: String,
}
impl CreateCredentialRequest {
	/// Builds the request for a `scope` credential about `subject`.
	pub fn new(subject: Subject, scope: &str, profile: &str) -> Self {
		Self {
			context: vec![CREDENTIAL_CONTEXT.into()],
			types: vec![CREDENTIAL_BASE_TYPE.into(), scope.into()],
			credential_subject: subject,
			profile: profile.into(),
		}
	}
}

#[derive(Debug, Serialize)]
struct StoreCredentialRequest<'a> {
	profile: &'a str,
	credential: &'a Value,
}

#[derive(Debug, Serialize)]
struct UpdateCredentialStatusRequest<'a> {
	credential: Value,
	status: &'a str,
	#[serde(rename = "statusReason")]
	status_reason: &'a str,
}

/// Issues, stores, retrieves, and updates credentials at the VC service.
#[derive(Clone, Debug)]
pub struct VcsClient {
	base: Url,
	http_client: ReqwestHttpClient,
}
impl VcsClient {
	/// Creates a client rooted at `base`.
	pub fn new(base: Url, http_client: ReqwestHttpClient) -> Result<Self, ConfigError> {
		http::validate_service_url(Service::Vcs, &base)?;

		Ok(Self { base, http_client })
	}

	/// Asks the VCS to issue a credential for `subject` under `profile`.
	///
	/// The credential type comes from the credential scope in `introspection`.
	pub async fn create_credential(
		&self,
		subject: Subject,
		introspection: &Introspection,
		profile: &str,
	) -> Result<Value> {
		let scope = introspection.credential_scope()?;
		let request = CreateCredentialRequest::new(subject, scope, profile);
		let body = self
			.http_client
			.send(
				Service::Vcs,
				self.http_client.post(self.url(&["credential"])).json(&request),
				StatusCode::CREATED,
			)
			.await?;

		http::decode_json(Service::Vcs, &body)
	}

	/// Stores an issued credential in the `profile` wallet.
	pub async fn store_credential(&self, credential: &Value, profile: &str) -> Result<()> {
		let request = StoreCredentialRequest { profile, credential };

		self.http_client
			.send(
				Service::Vcs,
				self.http_client.post(self.url(&["store"])).json(&request),
				StatusCode::OK,
			)
			.await?;

		Ok(())
	}

	/// Fetches a stored credential; the body is returned untouched.
	pub async fn retrieve_credential(&self, id: &str, profile: &str) -> Result<Vec<u8>> {
		let mut url = self.url(&["retrieve"]);

		url.query_pairs_mut().append_pair("id", id).append_pair("profile", profile);

		self.http_client.send(Service::Vcs, self.http_client.get(url), StatusCode::OK).await
	}

	/// Updates the status of `credential`.
	///
	/// Input that parses as JSON is forwarded as JSON; anything else travels as a string.
	pub async fn update_credential_status(
		&self,
		credential: &str,
		status: &str,
		reason: &str,
	) -> Result<()> {
		let credential = serde_json::from_str(credential)
			.unwrap_or_else(|_| Value::String(credential.to_owned()));
		let request = UpdateCredentialStatusRequest { credential, status, status_reason: reason };

		self.http_client
			.send(
				Service::Vcs,
				self.http_client.post(self.url(&["updateCredentialStatus"])).json(&request),
				StatusCode::OK,
			)
			.await?;

		Ok(())
	}

	fn url(&self, segments: &[&str]) -> Url {
		http::endpoint(&self.base, segments)
	}
}
