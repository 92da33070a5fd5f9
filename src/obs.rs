//! Observability helpers for the issuer operations.
//!
//! Every handler runs inside a `vc_issuer_bridge.operation` span carrying the `operation`
//! (route) and `stage` (call site) fields. With the `metrics` feature enabled, every finished
//! request is counted by operation, outcome and status, and its latency is recorded.

mod metrics;
mod tracing;

pub use self::{metrics::*, tracing::*};

// self
use crate::_prelude::*;

/// Issuer operations exposed over HTTP.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
	/// `GET /login`.
	Login,
	/// `GET /callback`.
	Callback,
	/// `GET /retrieve`.
	Retrieve,
	/// `POST /revoke`.
	Revoke,
}
impl OperationKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationKind::Login => "login",
			OperationKind::Callback => "callback",
			OperationKind::Retrieve => "retrieve",
			OperationKind::Revoke => "revoke",
		}
	}
}
impl Display for OperationKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationOutcome {
	/// Successful response.
	Success,
	/// Error response.
	Failure,
}
impl OperationOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationOutcome::Success => "success",
			OperationOutcome::Failure => "failure",
		}
	}
}
impl Display for OperationOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
