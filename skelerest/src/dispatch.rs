use crate::registry::Registry;
use crate::request::{NameValuePair, RequestDescriptor};
use crate::variable::{render_str_with, Template};
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::StatusCode;
use log::{debug, error, info};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use skelerest_aws_v4::{Credential, DefaultCredentialProvider, RequestSigner};
use skelerest_core::time::DateTime;
use skelerest_core::{Context, Error, ProvideCredential, Result, Signer};
use std::collections::HashMap;
use std::sync::Arc;

/// Outcome of one execution that reached the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    /// The server answered with a 2xx status.
    Success {
        /// Response status.
        status: StatusCode,
        /// Response body, lossily decoded as UTF-8.
        body: String,
    },
    /// The server answered with any other status.
    Failure {
        /// Response status.
        status: StatusCode,
        /// Response body, lossily decoded as UTF-8.
        body: String,
    },
}

impl ExecutionResult {
    fn from_response(status: StatusCode, body: String) -> Self {
        if status.is_success() {
            ExecutionResult::Success { status, body }
        } else {
            ExecutionResult::Failure { status, body }
        }
    }

    /// Response status.
    pub fn status(&self) -> StatusCode {
        match self {
            ExecutionResult::Success { status, .. } | ExecutionResult::Failure { status, .. } => {
                *status
            }
        }
    }

    /// Response body.
    pub fn body(&self) -> &str {
        match self {
            ExecutionResult::Success { body, .. } | ExecutionResult::Failure { body, .. } => body,
        }
    }

    /// Returns true for [`ExecutionResult::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success { .. })
    }
}

/// Dispatcher executes registered requests by command id.
///
/// Every execution substitutes the caller values into copies of the declared request,
/// signs it when the request enables AWS signing and performs exactly one transport call.
/// Credentials are resolved on each signed execution.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    ctx: Context,
    registry: Arc<Registry>,
    provider: Arc<dyn ProvideCredential<Credential = Credential>>,
    signing_time: Option<DateTime>,
}

impl Dispatcher {
    /// Create a dispatcher resolving credentials with [`DefaultCredentialProvider`].
    pub fn new(ctx: Context, registry: Registry) -> Self {
        Self {
            ctx,
            registry: Arc::new(registry),
            provider: Arc::new(DefaultCredentialProvider::new()),
            signing_time: None,
        }
    }

    /// Replace the credential provider used for signed requests.
    pub fn with_credential_provider(
        mut self,
        provider: impl ProvideCredential<Credential = Credential>,
    ) -> Self {
        self.provider = Arc::new(provider);
        self
    }

    /// Pin the signing time.
    ///
    /// # Note
    ///
    /// Requests must be signed with the current time. Only use this function for testing.
    pub fn with_signing_time(mut self, time: DateTime) -> Self {
        self.signing_time = Some(time);
        self
    }

    /// Registered requests.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Execute the request registered as `command_id`.
    ///
    /// `args` is keyed by variable name. Variables without a value fall back to their
    /// default; a variable without either fails with [`skelerest_core::ErrorKind::RequestInvalid`]
    /// before anything is sent.
    pub async fn execute(
        &self,
        command_id: &str,
        args: &HashMap<String, String>,
    ) -> Result<ExecutionResult> {
        let desc = self.registry.get(command_id)?;
        let prepared = Prepared::new(desc, args)?;

        let url = prepared.url();
        let mut parts = http::Request::builder()
            .method(http::Method::from(desc.method()))
            .uri(&url)
            .body(())?
            .into_parts()
            .0;
        for (name, value) in &prepared.headers {
            let name = HeaderName::from_bytes(name.as_bytes())?;
            parts.headers.insert(name, HeaderValue::from_str(value)?);
        }

        let payload = if desc.method().sends_body() {
            prepared.body.clone().unwrap_or_default()
        } else {
            String::new()
        };

        if desc.aws() {
            let mut builder = RequestSigner::new(desc.aws_region());
            if let Some(time) = self.signing_time {
                builder = builder.with_time(time);
            }

            debug!(
                "signing {command_id} with profile {}",
                desc.aws_profile().unwrap_or("default")
            );
            Signer::with_shared_provider(self.ctx.clone(), self.provider.clone(), builder)
                .sign(&mut parts, payload.as_bytes(), desc.aws_profile())
                .await?;
        }

        prepared.trace(&parts.headers);

        let req = http::Request::from_parts(parts, Bytes::from(payload));
        let resp = self.ctx.http_send(req).await?;

        let status = resp.status();
        let body = String::from_utf8_lossy(resp.body()).to_string();
        let result = ExecutionResult::from_response(status, body);
        if result.is_success() {
            info!("SUCCESS: {}", status.as_u16());
        } else {
            error!("ERROR: {}", status.as_u16());
        }

        Ok(result)
    }
}

/// Characters escaped in values inserted into the endpoint.
///
/// `/` and `%` pass through so values can carry path segments and existing escapes.
const ENDPOINT_VALUE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Working copy of a descriptor with every variable substituted.
#[derive(Debug)]
struct Prepared {
    method: &'static str,
    endpoint: String,
    params: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Option<String>,
}

impl Prepared {
    fn new(desc: &RequestDescriptor, args: &HashMap<String, String>) -> Result<Self> {
        if let Some(var) = desc
            .variables()
            .iter()
            .find(|var| var.is_required() && !args.contains_key(&var.name))
        {
            return Err(Error::request_invalid(format!(
                "variable {} is required by {}",
                var.name,
                desc.command_id()
            )));
        }

        let endpoint = render_str_with(desc.endpoint(), args, |v| {
            utf8_percent_encode(v, ENDPOINT_VALUE).to_string()
        });
        let mut params = desc.params().to_vec();
        params.substitute(args);
        let mut headers = desc.headers().to_vec();
        headers.substitute(args);
        let mut body = desc.body().cloned();
        if let Some(body) = body.as_mut() {
            body.substitute(args);
        }

        let body = body
            .map(|v| serde_json::to_string(&v))
            .transpose()
            .map_err(|e| Error::unexpected("failed to serialize request body").with_source(e))?;

        Ok(Self {
            method: desc.method().as_str(),
            endpoint,
            params: collapse(params),
            headers: collapse(headers),
            body,
        })
    }

    /// Endpoint with the form encoded params appended.
    fn url(&self) -> String {
        if self.params.is_empty() {
            return self.endpoint.clone();
        }

        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.params.iter())
            .finish();
        let sep = if self.endpoint.contains('?') { '&' } else { '?' };
        format!("{}{sep}{query}", self.endpoint)
    }

    fn trace(&self, headers: &http::HeaderMap) {
        info!("{} {}", self.method, self.endpoint);
        info!("PARAMS");
        for (name, value) in &self.params {
            info!("- {name} : {value}");
        }
        info!("HEADERS");
        for (name, value) in headers {
            info!("- {name} : {}", String::from_utf8_lossy(value.as_bytes()));
        }
        if let Some(body) = &self.body {
            info!("BODY:");
            info!("{body}");
        }
    }
}

/// Turn pairs into an ordered mapping, a later entry overrides an earlier one.
fn collapse(pairs: Vec<NameValuePair>) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::with_capacity(pairs.len());
    for pair in pairs {
        match out.iter_mut().find(|(name, _)| *name == pair.name) {
            Some(entry) => entry.1 = pair.value,
            None => out.push((pair.name, pair.value)),
        }
    }
    out
}
