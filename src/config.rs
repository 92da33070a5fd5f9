//! Runtime configuration.
//!
//! [`Cli`] is the command-line/environment surface of the binary. It produces the
//! [`OperationConfig`] the HTTP handlers read plus the OAuth collaborators they call.

// std
use std::{net::SocketAddr, time::Duration as StdDuration};
// crates.io
use clap::Parser;
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	http::{self, ReqwestHttpClient, Service},
	oauth::{IntrospectionResolver, OAuth2TokenIssuer},
	operation::Operation,
	provider::{ClientAuthMethod, ProviderDescriptor},
};

const DEFAULT_REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// Settings shared by every operation handler.
#[derive(Clone, Debug)]
pub struct OperationConfig {
	/// CMS base URL.
	pub cms_url: Url,
	/// VC service base URL.
	pub vcs_url: Url,
	/// Template rendered after issuing or retrieving a credential.
	pub receive_vc_html: PathBuf,
	/// Template rendered for `retrieve?qr=true`.
	pub qr_code_html: PathBuf,
	/// Template rendered after revoking a credential.
	pub vc_html: PathBuf,
	/// Public base URL QR codes link to; derived from the `Host` header when unset.
	pub external_url: Option<Url>,
	/// Timeout applied to every downstream call.
	pub request_timeout: StdDuration,
}
impl OperationConfig {
	/// Creates a config with the bundled template locations and a 30 second timeout.
	pub fn new(cms_url: Url, vcs_url: Url) -> Self {
		Self {
			cms_url,
			vcs_url,
			receive_vc_html: PathBuf::from("templates/receive_vc.html"),
			qr_code_html: PathBuf::from("templates/qr_code.html"),
			vc_html: PathBuf::from("templates/vc.html"),
			external_url: None,
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
		}
	}

	/// Overrides the three template paths.
	pub fn with_templates(
		mut self,
		receive_vc_html: impl Into<PathBuf>,
		qr_code_html: impl Into<PathBuf>,
		vc_html: impl Into<PathBuf>,
	) -> Self {
		self.receive_vc_html = receive_vc_html.into();
		self.qr_code_html = qr_code_html.into();
		self.vc_html = vc_html.into();

		self
	}

	/// Sets the public base URL.
	pub fn with_external_url(mut self, url: Url) -> Self {
		self.external_url = Some(url);

		self
	}

	/// Overrides the downstream request timeout.
	pub fn with_request_timeout(mut self, timeout: StdDuration) -> Self {
		self.request_timeout = timeout;

		self
	}

	/// Checks that the service URLs and the public base URL can carry endpoint paths.
	pub fn validate(&self) -> Result<(), ConfigError> {
		http::validate_service_url(Service::Cms, &self.cms_url)?;
		http::validate_service_url(Service::Vcs, &self.vcs_url)?;

		let unusable = |url: &&Url| {
			!matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base()
		};

		if let Some(url) = self.external_url.as_ref().filter(unusable) {
			return Err(ConfigError::InvalidExternalUrl { url: url.to_string() });
		}

		Ok(())
	}
}

/// Command-line and environment configuration of the issuer bridge.
#[derive(Clone, Debug, Parser)]
#[command(name = "vc-issuer-bridge", version, about)]
pub struct Cli {
	/// Address the HTTP server binds to.
	#[arg(long, env = "ISSUER_LISTEN", default_value = "0.0.0.0:8080")]
	pub listen: SocketAddr,
	/// Public base URL used in QR-code links.
	#[arg(long, env = "ISSUER_EXTERNAL_URL")]
	pub external_url: Option<Url>,
	/// CMS base URL.
	#[arg(long, env = "ISSUER_CMS_URL")]
	pub cms_url: Url,
	/// VC service base URL.
	#[arg(long, env = "ISSUER_VCS_URL")]
	pub vcs_url: Url,
	/// OAuth 2.0 authorization endpoint.
	#[arg(long, env = "ISSUER_OAUTH2_AUTH_URL")]
	pub oauth2_auth_url: Url,
	/// OAuth 2.0 token endpoint.
	#[arg(long, env = "ISSUER_OAUTH2_TOKEN_URL")]
	pub oauth2_token_url: Url,
	/// RFC 7662 introspection endpoint.
	#[arg(long, env = "ISSUER_OAUTH2_INTROSPECTION_URL")]
	pub oauth2_introspection_url: Url,
	/// OAuth 2.0 client identifier.
	#[arg(long, env = "ISSUER_OAUTH2_CLIENT_ID")]
	pub oauth2_client_id: String,
	/// OAuth 2.0 client secret; omit for public PKCE clients.
	#[arg(long, env = "ISSUER_OAUTH2_CLIENT_SECRET", hide_env_values = true)]
	pub oauth2_client_secret: Option<String>,
	/// Redirect URL registered for `/callback`.
	#[arg(long, env = "ISSUER_OAUTH2_REDIRECT_URL")]
	pub oauth2_redirect_url: Url,
	/// Scopes every login requests.
	#[arg(long, env = "ISSUER_OAUTH2_SCOPES", value_delimiter = ',', default_value = "openid")]
	pub oauth2_scopes: Vec<String>,
	/// Template rendered after issuing or retrieving a credential.
	#[arg(long, env = "ISSUER_RECEIVE_VC_HTML", default_value = "templates/receive_vc.html")]
	pub receive_vc_html: PathBuf,
	/// Template rendered for QR-code retrieval.
	#[arg(long, env = "ISSUER_QR_CODE_HTML", default_value = "templates/qr_code.html")]
	pub qr_code_html: PathBuf,
	/// Template rendered after revocation.
	#[arg(long, env = "ISSUER_VC_HTML", default_value = "templates/vc.html")]
	pub vc_html: PathBuf,
	/// Downstream request timeout in seconds.
	#[arg(long, env = "ISSUER_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
	pub request_timeout_secs: u64,
	/// Emit JSON logs.
	#[arg(long, env = "ISSUER_LOG_JSON")]
	pub log_json: bool,
}
impl Cli {
	/// Handler settings derived from the flags.
	pub fn operation_config(&self) -> OperationConfig {
		let config = OperationConfig::new(self.cms_url.clone(), self.vcs_url.clone())
			.with_templates(&self.receive_vc_html, &self.qr_code_html, &self.vc_html)
			.with_request_timeout(StdDuration::from_secs(self.request_timeout_secs));

		match &self.external_url {
			Some(url) => config.with_external_url(url.clone()),
			None => config,
		}
	}

	/// Provider descriptor for the configured OAuth endpoints.
	///
	/// Clients without a secret authenticate with PKCE only.
	pub fn provider_descriptor(&self) -> Result<ProviderDescriptor, ConfigError> {
		let auth_method = if self.oauth2_client_secret.is_some() {
			ClientAuthMethod::ClientSecretBasic
		} else {
			ClientAuthMethod::NoneWithPkce
		};
		let descriptor = ProviderDescriptor::builder("oauth2")
			.authorization_endpoint(self.oauth2_auth_url.clone())
			.token_endpoint(self.oauth2_token_url.clone())
			.introspection_endpoint(self.oauth2_introspection_url.clone())
			.preferred_client_auth_method(auth_method)
			.build()?;

		Ok(descriptor)
	}

	/// Wires the OAuth collaborators and builds the [`Operation`].
	pub fn build_operation(&self) -> Result<Operation> {
		let config = self.operation_config();
		let descriptor = self.provider_descriptor()?;
		let http_client = ReqwestHttpClient::with_timeout(config.request_timeout)?;
		let mut issuer = OAuth2TokenIssuer::new(
			descriptor.clone(),
			&self.oauth2_client_id,
			self.oauth2_redirect_url.clone(),
			http_client.clone(),
		)
		.with_scopes(self.oauth2_scopes.iter().map(|scope| scope.trim()));
		let mut resolver = IntrospectionResolver::from_descriptor(&descriptor, http_client)?;

		if let Some(secret) = &self.oauth2_client_secret {
			issuer = issuer.with_client_secret(secret);
			resolver = resolver.with_client_credentials(&self.oauth2_client_id, secret);
		}

		Operation::new(config, Arc::new(issuer), Arc::new(resolver))
	}
}
