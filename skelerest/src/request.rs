use crate::variable::{scan_str, Location, Template, Variable};
use log::debug;
use serde_json::{Map, Value};
use skelerest_core::{Context, Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Region used when a request enables signing without naming one.
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

/// HTTP verbs a request can be declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
}

impl Method {
    /// Upper case name of the verb.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }

    /// Returns true if requests with this verb carry the body on the wire.
    pub fn sends_body(&self) -> bool {
        matches!(self, Method::Post | Method::Put)
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            _ => Err(Error::config_invalid(format!(
                "request 'method' must be one of GET, POST, PUT or DELETE, got {s}"
            ))),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for http::Method {
    fn from(m: Method) -> Self {
        match m {
            Method::Get => http::Method::GET,
            Method::Post => http::Method::POST,
            Method::Put => http::Method::PUT,
            Method::Delete => http::Method::DELETE,
        }
    }
}

/// A query parameter or header entry, both sides may carry placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameValuePair {
    /// Name of the entry.
    pub name: String,
    /// Value of the entry.
    pub value: String,
}

impl NameValuePair {
    /// Create a new pair.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for NameValuePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.value)
    }
}

/// Pairs are scanned in their `"{name} {value}"` form.
impl Template for [NameValuePair] {
    fn scan(&self, location: Location) -> Vec<Variable> {
        self.iter()
            .flat_map(|pair| scan_str(&pair.to_string(), location))
            .collect()
    }

    fn substitute(&mut self, args: &HashMap<String, String>) {
        for pair in self.iter_mut() {
            pair.name.substitute(args);
            pair.value.substitute(args);
        }
    }
}

/// One declared REST call.
///
/// Built once from configuration and read-only afterwards; executions work on copies.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    name: String,
    endpoint: String,
    method: Method,
    params: Vec<NameValuePair>,
    headers: Vec<NameValuePair>,
    body: Option<Value>,
    aws: bool,
    aws_profile: Option<String>,
    aws_region: String,
    variables: Vec<Variable>,
}

impl RequestDescriptor {
    /// Validate one request config and build its descriptor.
    ///
    /// A string `body` is a path to a JSON file which is read through the context.
    pub async fn build(ctx: &Context, config: &Value) -> Result<Self> {
        let obj = config
            .as_object()
            .ok_or_else(|| Error::config_invalid("request must be a mapping"))?;

        let name = required_str(obj, "name")?;
        let endpoint = required_str(obj, "endpoint")?;
        let method = required_str(obj, "method")?.parse::<Method>()?;
        let params = pairs(obj, "params")?;
        let headers = pairs(obj, "headers")?;

        let aws = match obj.get("aws") {
            None => false,
            Some(v) => v
                .as_bool()
                .ok_or_else(|| Error::config_invalid("request 'aws' must be a boolean"))?,
        };
        let aws_profile = optional_str(obj, "awsProfile")?;
        let aws_region =
            optional_str(obj, "awsRegion")?.unwrap_or_else(|| DEFAULT_AWS_REGION.to_string());

        let body = match obj.get("body") {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(Value::Object(map.clone())),
            Some(Value::String(path)) => Some(load_body(ctx, path).await?),
            Some(_) => {
                return Err(Error::config_invalid(
                    "request 'body' must be a mapping or a file path",
                ))
            }
        };

        Ok(Self::new(
            name, endpoint, method, params, headers, body, aws, aws_profile, aws_region,
        ))
    }

    /// Assemble a descriptor from already validated parts.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        endpoint: String,
        method: Method,
        params: Vec<NameValuePair>,
        headers: Vec<NameValuePair>,
        body: Option<Value>,
        aws: bool,
        aws_profile: Option<String>,
        aws_region: String,
    ) -> Self {
        let mut desc = Self {
            name,
            endpoint,
            method,
            params,
            headers,
            body,
            aws,
            aws_profile,
            aws_region,
            variables: Vec::new(),
        };
        desc.variables = desc.rescan();
        debug!(
            "built request {} with {} variables",
            desc.command_id(),
            desc.variables.len()
        );
        desc
    }

    /// Scan endpoint, params, headers and body in that order.
    pub fn rescan(&self) -> Vec<Variable> {
        let mut vars = self.endpoint.scan(Location::Endpoint);
        vars.extend(self.params.scan(Location::Params));
        vars.extend(self.headers.scan(Location::Headers));
        if let Some(body) = &self.body {
            vars.extend(body.scan(Location::Body));
        }
        vars
    }

    /// Registry key: `{method}-{name}` with the method lower cased.
    pub fn command_id(&self) -> String {
        format!("{}-{}", self.method.as_str().to_lowercase(), self.name)
    }

    /// Short description such as `GET to http://host/items`.
    pub fn summary(&self) -> String {
        format!("{} to {}", self.method, self.endpoint)
    }

    /// Variables in discovery order, one per occurrence.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Declared name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Endpoint template.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Declared verb.
    pub fn method(&self) -> Method {
        self.method
    }

    /// Query parameter templates.
    pub fn params(&self) -> &[NameValuePair] {
        &self.params
    }

    /// Header templates.
    pub fn headers(&self) -> &[NameValuePair] {
        &self.headers
    }

    /// Body template.
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Returns true if executions are signed with SigV4.
    pub fn aws(&self) -> bool {
        self.aws
    }

    /// Profile used to resolve credentials.
    pub fn aws_profile(&self) -> Option<&str> {
        self.aws_profile.as_deref()
    }

    /// Region used in the signing scope.
    pub fn aws_region(&self) -> &str {
        &self.aws_region
    }
}

fn required_str(obj: &Map<String, Value>, field: &str) -> Result<String> {
    match obj.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        _ => Err(Error::config_invalid(format!(
            "request '{field}' must be a string"
        ))),
    }
}

fn optional_str(obj: &Map<String, Value>, field: &str) -> Result<Option<String>> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(Error::config_invalid(format!(
            "request '{field}' must be a string"
        ))),
    }
}

fn pairs(obj: &Map<String, Value>, field: &str) -> Result<Vec<NameValuePair>> {
    let items = match obj.get(field) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(Error::config_invalid(format!(
                "request '{field}' must be a list"
            )))
        }
    };

    items
        .iter()
        .map(|item| {
            let pair = item.as_object().ok_or_else(|| {
                Error::config_invalid(format!("request '{field}' entries must be mappings"))
            })?;
            let get = |key: &str| match pair.get(key) {
                Some(Value::String(s)) => Ok(s.clone()),
                _ => Err(Error::config_invalid(format!(
                    "request '{field}' entry '{key}' must be a string"
                ))),
            };
            Ok(NameValuePair::new(get("name")?, get("value")?))
        })
        .collect()
}

async fn load_body(ctx: &Context, path: &str) -> Result<Value> {
    let expanded = ctx.expand_home_dir(path).ok_or_else(|| {
        Error::config_invalid(format!("failed to expand home dir in body path {path}"))
    })?;

    let content = ctx.file_read(&expanded).await.map_err(|e| {
        Error::config_invalid(format!("failed to read body file {expanded}")).with_source(e)
    })?;

    serde_json::from_slice(&content).map_err(|e| {
        Error::config_invalid(format!("body file {expanded} is not valid JSON")).with_source(e)
    })
}
