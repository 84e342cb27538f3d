//! AWS SigV4 signing for API Gateway (`execute-api`) endpoints.
//!
//! This crate implements the subset of [Signature Version 4] needed to sign simple
//! JSON REST calls: a fixed canonical header set (`content-type`, `host`, `x-amz-date`),
//! an empty canonical query string and a SHA-256 payload hash.
//!
//! It also ships credential providers that resolve an access key pair for a named
//! profile from static values, the environment or the AWS shared config files.
//!
//! ## Example
//!
//! ```no_run
//! use skelerest_aws_v4::{DefaultCredentialProvider, RequestSigner};
//! use skelerest_core::{Context, OsEnv, Signer};
//!
//! # async fn example() -> skelerest_core::Result<()> {
//! let ctx = Context::new().with_env(OsEnv);
//! let signer = Signer::new(
//!     ctx,
//!     DefaultCredentialProvider::new(),
//!     RequestSigner::new("us-east-1"),
//! );
//!
//! let body = br#"{"id":"7"}"#;
//! let mut parts = http::Request::builder()
//!     .method(http::Method::POST)
//!     .uri("https://abc123.execute-api.us-east-1.amazonaws.com/prod/widgets")
//!     .body(())?
//!     .into_parts()
//!     .0;
//!
//! signer.sign(&mut parts, body, Some("dev")).await?;
//! # Ok(())
//! # }
//! ```
//!
//! [Signature Version 4]: https://docs.aws.amazon.com/general/latest/gr/signature-version-4.html

mod constants;
pub use constants::{ALGORITHM, CONTENT_TYPE_JSON, SERVICE, SIGNED_HEADERS};

mod credential;
pub use credential::Credential;

mod sign_request;
pub use sign_request::RequestSigner;

mod provide_credential;
pub use provide_credential::*;
