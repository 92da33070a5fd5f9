//! HTML responses rendered from templates on disk.
//!
//! Templates are read on every request so operators can edit them without a restart.
//! They are rendered with tera and HTML autoescaping, exposing whatever the handler placed in
//! the [`Context`].

// std
use std::io;
// crates.io
pub use tera::Context;
use tera::Tera;
// self
use crate::_prelude::*;

/// Template could not be loaded or rendered.
#[derive(Debug, ThisError)]
pub enum TemplateError {
	/// Template file could not be read.
	#[error("{}: {source}.", .path.display())]
	Read {
		/// Template path.
		path: PathBuf,
		/// Filesystem failure.
		#[source]
		source: io::Error,
	},
	/// Template failed to parse or render.
	#[error("{}: {source}.", .path.display())]
	Render {
		/// Template path.
		path: PathBuf,
		/// Tera failure.
		#[source]
		source: tera::Error,
	},
}

/// Reads the template at `path` and renders it with `context`.
pub async fn render_template(path: &Path, context: &Context) -> Result<String, TemplateError> {
	let source = tokio::fs::read_to_string(path)
		.await
		.map_err(|source| TemplateError::Read { path: path.to_owned(), source })?;

	Tera::one_off(&source, context, true)
		.map_err(|source| TemplateError::Render { path: path.to_owned(), source })
}
