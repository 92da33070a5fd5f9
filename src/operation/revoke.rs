//! `POST /revoke`: mark a submitted credential revoked.

// crates.io
use axum::{
	extract::{Form, State, rejection::FormRejection},
	response::{Html, Response},
};
// self
use crate::{
	_prelude::*,
	obs::{OperationKind, OperationSpan},
	operation::{Operation, OperationError},
};

/// Status the VCS records for revoked credentials.
pub const REVOKED_STATUS: &str = "Revoked";
/// Reason attached to every revocation.
pub const REVOKED_REASON: &str = "Disciplinary action";

/// Form posted to `/revoke`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RevokeForm {
	/// Credential to revoke, usually its JSON.
	#[serde(rename = "vcDataInput", default)]
	pub vc_data_input: String,
}

pub(crate) async fn handle(
	State(operation): State<Operation>,
	form: Result<Form<RevokeForm>, FormRejection>,
) -> Response {
	super::observe(OperationKind::Revoke, revoke(operation, form)).await
}

async fn revoke(
	operation: Operation,
	form: Result<Form<RevokeForm>, FormRejection>,
) -> Result<Html<String>, OperationError> {
	let Form(form) =
		form.map_err(|e| OperationError::internal(format!("Failed to parse form: {e}")))?;
	let credential = form.vc_data_input.trim();

	if credential.is_empty() {
		return Err(OperationError::bad_request("Credential is empty."));
	}

	OperationSpan::new(OperationKind::Revoke, "update_credential_status")
		.instrument(operation.vcs.update_credential_status(
			credential,
			REVOKED_STATUS,
			REVOKED_REASON,
		))
		.await
		.map_err(|e| OperationError::bad_request(format!("Failed to update vc status: {e}")))?;

	tracing::info!("Credential revoked.");

	operation.render(&operation.config.vc_html, credential, |_| {}).await.map(Html)
}
