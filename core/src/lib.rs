//! Core components for declaring and executing REST calls.
//!
//! This crate provides the foundational types and traits shared by the skelerest
//! workspace. It defines the seams that keep the templating engine, the request
//! signer and the execution dispatcher testable without any live collaborator.
//!
//! ## Overview
//!
//! The crate is built around several key concepts:
//!
//! - **Context**: A container that holds implementations for file reading, HTTP sending, and environment access
//! - **Traits**: Abstract interfaces for credential resolution (`ProvideCredential`) and request signing (`SignRequest`)
//! - **Signer**: Resolves a credential for a profile and signs one request with it
//!
//! ## Example
//!
//! ```no_run
//! use skelerest_core::{Context, Signer, ProvideCredential, SignRequest, SigningCredential, Result};
//! use async_trait::async_trait;
//! use http::request::Parts;
//!
//! #[derive(Clone, Debug)]
//! struct MyCredential {
//!     key: String,
//! }
//!
//! impl SigningCredential for MyCredential {
//!     fn is_valid(&self) -> bool {
//!         !self.key.is_empty()
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
//!     async fn provide_credential(
//!         &self,
//!         _: &Context,
//!         _profile: Option<&str>,
//!     ) -> Result<Option<Self::Credential>> {
//!         Ok(Some(MyCredential { key: "my-key".to_string() }))
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct MySigner;
//!
//! #[async_trait]
//! impl SignRequest for MySigner {
//!     type Credential = MyCredential;
//!
//!     async fn sign_request(
//!         &self,
//!         _ctx: &Context,
//!         req: &mut Parts,
//!         _body: &[u8],
//!         cred: Option<&Self::Credential>,
//!     ) -> Result<()> {
//!         if let Some(cred) = cred {
//!             req.headers.insert("x-api-key", cred.key.parse()?);
//!         }
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> Result<()> {
//! let signer = Signer::new(Context::new(), MyProvider, MySigner);
//!
//! let mut parts = http::Request::builder()
//!     .method("GET")
//!     .uri("https://example.com")
//!     .body(())?
//!     .into_parts()
//!     .0;
//!
//! signer.sign(&mut parts, b"", None).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Utilities
//!
//! - [`hash`]: Cryptographic hashing utilities
//! - [`time`]: Time formatting used by signers
//! - [`utils`]: General utilities including data redaction

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod hash;
pub mod time;
pub mod utils;

mod context;
pub use context::{Context, Env, FileRead, HttpSend, NoopEnv, NoopFileRead, NoopHttpSend, OsEnv, StaticEnv};

mod error;
pub use error::{Error, ErrorKind, Result};

mod api;
pub use api::{ProvideCredential, ProvideCredentialChain, SignRequest, SigningCredential};
mod signer;
pub use signer::Signer;
