//! OAuth 2.0 login bridge that turns an authenticated user into a verifiable credential.
//!
//! The crate serves four REST operations (`/login`, `/callback`, `/retrieve`, `/revoke`). The
//! callback drives the full issuance pipeline: authorization-code exchange, token
//! introspection, CMS profile lookup, credential creation and storage in the VC service, and a
//! templated HTML response.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cms;
pub mod config;
pub mod error;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod operation;
pub mod provider;
pub mod qr;
pub mod render;
pub mod vcs;

mod _prelude {
	pub use std::{
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		path::{Path, PathBuf},
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::Mutex;
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError, StatusCode};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::{Map, Value};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
// Only the binary reports through eyre.
use color_eyre as _;
#[cfg(test)] use {http_body_util as _, tower as _};
