//! AWS SigV4 signer and credential providers.
//!
//! ## Example
//!
//! ```no_run
//! use loadsign_aws_v4::{Credential, RequestSigner};
//!
//! # fn example() -> loadsign_core::Result<()> {
//! let cred = Credential {
//!     access_key_id: "AKIDEXAMPLE".to_string(),
//!     secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string(),
//!     ..Default::default()
//! };
//!
//! let mut parts = http::Request::builder()
//!     .method("GET")
//!     .uri("https://api.example.com/items")
//!     .body(())?
//!     .into_parts()
//!     .0;
//!
//! RequestSigner::new("execute-api", "us-east-1").sign(&mut parts, b"", &cred)?;
//! assert!(parts.headers.contains_key(http::header::AUTHORIZATION));
//! # Ok(())
//! # }
//! ```

mod constants;
mod shared_config;

mod credential;
pub use credential::Credential;

mod sign_request;
pub use sign_request::RequestSigner;

mod provide_credential;
pub use provide_credential::*;

mod region;
pub use region::RegionResolver;
