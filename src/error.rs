//! Crate-level error types shared by the OAuth, CMS, and VCS clients.

// self
use crate::{_prelude::*, http::Service, provider::ProviderDescriptorError};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by the issuance pipeline.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeouts).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// A downstream service answered, but not the way it was supposed to.
	#[error(transparent)]
	Downstream(#[from] DownstreamError),
	/// CMS lookup did not resolve to exactly one record.
	#[error(transparent)]
	Record(#[from] RecordError),

	/// Provider rejected the grant or the callback could not be verified.
	#[error("Provider rejected the grant: {reason}.")]
	InvalidGrant {
		/// Provider- or bridge-supplied reason string.
		reason: String,
	},
	/// Introspection reported the access token as inactive.
	#[error("Access token is not active.")]
	InactiveToken,
	/// Introspection returned no scope that names a credential type.
	#[error("Token introspection did not yield a credential scope.")]
	MissingCredentialScope,
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Service base URL cannot be used to derive endpoints.
	#[error("The {service} URL is invalid: {url}.")]
	InvalidServiceUrl {
		/// Which service the URL belongs to.
		service: Service,
		/// Offending URL.
		url: String,
	},
	/// Public base URL cannot carry the retrieve path.
	#[error("The external URL must be an http or https base URL: {url}.")]
	InvalidExternalUrl {
		/// Offending URL.
		url: String,
	},
	/// Provider descriptor contains an invalid URL.
	#[error("Descriptor contains an invalid URL.")]
	InvalidDescriptor {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Provider descriptor failed validation.
	#[error(transparent)]
	Descriptor(#[from] ProviderDescriptorError),
	/// Token resolution needs an introspection endpoint the descriptor does not declare.
	#[error("Descriptor `{descriptor}` does not declare an introspection endpoint.")]
	MissingIntrospectionEndpoint {
		/// Identifier of the incomplete descriptor.
		descriptor: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the {service}: {source}.")]
	Network {
		/// Service that could not be reached.
		service: Service,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the {service}: {source}.")]
	Io {
		/// Service that could not be reached.
		service: Service,
		/// IO failure.
		#[source]
		source: std::io::Error,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(service: Service, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { service, source: Box::new(src) }
	}
}

/// Downstream responses that do not match the expected contract.
#[derive(Debug, ThisError)]
pub enum DownstreamError {
	/// Response status differs from the one the endpoint promises.
	#[error("The {service} returned {status} instead of {expected}: {body}.")]
	UnexpectedStatus {
		/// Service that answered.
		service: Service,
		/// Received status.
		status: StatusCode,
		/// Status the call expected.
		expected: StatusCode,
		/// Truncated response body.
		body: String,
	},
	/// Response body could not be decoded.
	#[error("The {service} returned malformed JSON: {source}.")]
	Malformed {
		/// Service that answered.
		service: Service,
		/// Structured parsing failure, including the JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Token endpoint failed in a way the OAuth layer could not classify.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Cardinality failures for CMS lookups.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
pub enum RecordError {
	/// The users query matched nothing.
	#[error("User not found.")]
	UserNotFound,
	/// The users query matched more than one user.
	#[error("Multiple users found.")]
	MultipleUsers,
	/// The subject query matched nothing.
	#[error("Record not found.")]
	RecordNotFound,
	/// The subject query matched more than one record.
	#[error("Multiple records found.")]
	MultipleRecords,
}
