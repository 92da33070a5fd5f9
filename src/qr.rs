//! QR codes linking back to a stored credential.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use qrcode::{QrCode, render::svg, types::QrError};
// self
use crate::{_prelude::*, http};

const MIN_DIMENSION: u32 = 256;

/// Failures while turning a credential into a QR code.
#[derive(Debug, ThisError)]
pub enum QrCodeError {
	/// Credential bytes are not a JSON object.
	#[error("Generate QR code unmarshalling failed: {source}.")]
	Unmarshal {
		/// JSON decoding failure.
		#[source]
		source: serde_json::Error,
	},
	/// Credential lacks a string `id`.
	#[error("Credential has no id.")]
	MissingId,
	/// Link does not fit into a QR code.
	#[error("Failed to encode QR code: {source}.")]
	Encode {
		/// Encoder failure.
		#[source]
		source: QrError,
	},
}

/// Rendered QR code plus the link it encodes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QrCodeImage {
	/// `data:image/svg+xml;base64,…` URL ready for an `<img>` tag.
	pub image: String,
	/// Retrieve link encoded in the image.
	pub url: Url,
}

#[derive(Deserialize)]
struct CredentialId {
	id: Option<String>,
}

/// Encodes `<base>/retrieve?id=<id>&profile=<profile>` for the credential in `credential`.
pub fn generate_qr_code(
	credential: &[u8],
	base: &Url,
	profile: &str,
) -> Result<QrCodeImage, QrCodeError> {
	let CredentialId { id } = serde_json::from_slice(credential)
		.map_err(|source| QrCodeError::Unmarshal { source })?;
	let id = id.filter(|id| !id.is_empty()).ok_or(QrCodeError::MissingId)?;
	let mut url = http::endpoint(base, &["retrieve"]);

	url.query_pairs_mut().append_pair("id", &id).append_pair("profile", profile);

	let code =
		QrCode::new(url.as_str().as_bytes()).map_err(|source| QrCodeError::Encode { source })?;
	let svg = code
		.render::<svg::Color>()
		.min_dimensions(MIN_DIMENSION, MIN_DIMENSION)
		.build();
	let image = format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg));

	Ok(QrCodeImage { image, url })
}
