//! Delegated token exchange pipeline: trade a user assertion for an on-behalf-of SAML2 token,
//! swap that for a SAML-bearer access token, and read a protected resource collection with it.
//!
//! The crate is organized leaves first:
//!
//! - [`http`] sends one buffered HTTPS request and classifies transport failures.
//! - [`flows::TokenExchange`] performs a single token-exchange hop.
//! - [`flows::ResourceFetch`] reads the downstream collection with the final bearer token.
//! - [`flows::Pipeline`] sequences both hops and the fetch, threading each output into the next
//!   stage and stopping at the first failure.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod error;
pub mod flows;
pub mod http;
pub mod obs;
pub mod resource;

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use tokio_util::sync::CancellationToken;
	pub use url::Url;

	pub use crate::error::{PipelineError, Result};
}

pub use oauth2;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use tokio_util::sync::CancellationToken;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _, parking_lot as _};
