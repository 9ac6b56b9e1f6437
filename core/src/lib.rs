//! Core components for signing load-test requests.
//!
//! This crate provides the foundational types and traits shared by the loadsign
//! workspace: the error type, the runtime [`Context`] used by credential
//! providers, and the [`SigningRequest`] view over an outbound request.
//!
//! ## Overview
//!
//! - **Context**: holds implementations for file reading, http sending and environment access
//! - **Traits**: [`ProvideCredential`] loads credentials, [`SigningCredential`] validates them
//! - **SigningRequest**: a mutable, signer friendly view of `http::request::Parts`
//!
//! ## Example
//!
//! ```no_run
//! use async_trait::async_trait;
//! use loadsign_core::{Context, ProvideCredential, Result, SigningCredential};
//!
//! #[derive(Clone, Debug)]
//! struct MyCredential {
//!     key: String,
//!     secret: String,
//! }
//!
//! impl SigningCredential for MyCredential {
//!     fn is_valid(&self) -> bool {
//!         !self.key.is_empty() && !self.secret.is_empty()
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct MyProvider;
//!
//! #[async_trait]
//! impl ProvideCredential for MyProvider {
//!     type Credential = MyCredential;
//!
//!     async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
//!         Ok(Some(MyCredential {
//!             key: "my-access-key".to_string(),
//!             secret: "my-secret-key".to_string(),
//!         }))
//!     }
//! }
//! ```
//!
//! ## Utilities
//!
//! - [`hash`]: Cryptographic hashing utilities
//! - [`time`]: Time manipulation utilities
//! - [`utils`]: General utilities including data redaction

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod hash;
pub mod time;
pub mod utils;

mod context;
pub use context::Context;
pub use context::Env;
pub use context::FileRead;
pub use context::HttpSend;
pub use context::NoopEnv;
pub use context::NoopFileRead;
pub use context::NoopHttpSend;
pub use context::OsEnv;
pub use context::StaticEnv;

mod error;
pub use error::{Error, ErrorKind, Result};

mod api;
pub use api::{ProvideCredential, SigningCredential};
mod request;
pub use request::SigningRequest;
