//! Declare REST calls in configuration and execute them by name.
//!
//! Requests are declared with placeholders such as `{site}` or `{page:1}` in their
//! endpoint, params, headers and body. Each request is registered under a command id
//! (`get-widgets`) and executed with caller supplied values. Requests flagged with
//! `aws: true` are signed with AWS SigV4 for API Gateway (`execute-api`).
//!
//! ## Example
//!
//! ```no_run
//! use serde_json::json;
//! use skelerest::{default_context, Dispatcher, Registry};
//! use std::collections::HashMap;
//!
//! # async fn example() -> skelerest::Result<()> {
//! let ctx = default_context();
//! let registry = Registry::load(
//!     &ctx,
//!     &[json!({
//!         "name": "widgets",
//!         "endpoint": "https://api.example.com/{site}/widgets",
//!         "method": "GET",
//!         "params": [{"name": "page", "value": "{page:1}"}],
//!     })],
//! )
//! .await?;
//!
//! let dispatcher = Dispatcher::new(ctx, registry);
//! let args = HashMap::from([("site".to_string(), "test".to_string())]);
//! let result = dispatcher.execute("get-widgets", &args).await?;
//! println!("{}: {}", result.status(), result.body());
//! # Ok(())
//! # }
//! ```

pub use skelerest_core::*;

/// AWS SigV4 signing and credential providers.
pub mod aws {
    pub use skelerest_aws_v4::*;
}

pub mod cli;
pub mod config;

mod context;
pub use context::{default_context, default_context_with_client};

mod dispatch;
pub use dispatch::{Dispatcher, ExecutionResult};

mod registry;
pub use registry::Registry;

mod request;
pub use request::{Method, NameValuePair, RequestDescriptor, DEFAULT_AWS_REGION};

mod variable;
pub use variable::{render_str, render_str_with, scan_str, Location, Template, Variable};
