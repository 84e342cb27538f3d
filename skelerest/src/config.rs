//! Loading request declarations from a configuration document.
//!
//! The document is JSON, TOML or YAML, picked by extension. Its `requests` list is
//! looked up at the top level, then under `skelerest`, then under
//! `components.skelerest`.

use crate::registry::Registry;
use log::debug;
use serde_json::Value;
use skelerest_core::{Context, Error, Result};
use std::path::Path;

/// Supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `.json`
    Json,
    /// `.toml`
    Toml,
    /// `.yaml` or `.yml`
    Yaml,
}

impl Format {
    /// Pick the format from the extension of `path`.
    pub fn from_path(path: &str) -> Result<Self> {
        let ext = Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match ext.as_deref() {
            Some("json") => Ok(Format::Json),
            Some("toml") => Ok(Format::Toml),
            Some("yaml") | Some("yml") => Ok(Format::Yaml),
            _ => Err(Error::config_invalid(format!(
                "unsupported config format for {path}, expected .json, .toml, .yaml or .yml"
            ))),
        }
    }

    /// Parse `content` into a JSON value.
    pub fn parse(&self, content: &str) -> Result<Value> {
        match self {
            Format::Json => serde_json::from_str(content).map_err(|e| {
                Error::config_invalid("failed to parse JSON config").with_source(e)
            }),
            Format::Toml => toml::from_str(content).map_err(|e| {
                Error::config_invalid("failed to parse TOML config").with_source(e)
            }),
            Format::Yaml => serde_yaml::from_str(content).map_err(|e| {
                Error::config_invalid("failed to parse YAML config").with_source(e)
            }),
        }
    }
}

/// Read the document at `path` and return its request configs.
pub async fn load_document(ctx: &Context, path: &str) -> Result<Vec<Value>> {
    let format = Format::from_path(path)?;
    let expanded = ctx
        .expand_home_dir(path)
        .ok_or_else(|| Error::config_invalid(format!("failed to expand home dir in {path}")))?;

    let content = ctx.file_read_as_string(&expanded).await.map_err(|e| {
        Error::config_invalid(format!("failed to read config {expanded}")).with_source(e)
    })?;
    let doc = format.parse(&content)?;

    let requests = find_requests(&doc)?;
    debug!("loaded {} requests from {expanded}", requests.len());
    Ok(requests)
}

/// Load the document at `path` straight into a [`Registry`].
pub async fn load_registry(ctx: &Context, path: &str) -> Result<Registry> {
    let configs = load_document(ctx, path).await?;
    Registry::load(ctx, &configs).await
}

/// Locate the `requests` list inside a parsed document.
pub fn find_requests(doc: &Value) -> Result<Vec<Value>> {
    let requests = doc
        .get("requests")
        .or_else(|| doc.get("skelerest").and_then(|v| v.get("requests")))
        .or_else(|| doc.pointer("/components/skelerest/requests"))
        .ok_or_else(|| Error::config_invalid("config must declare a 'requests' list"))?;

    match requests {
        Value::Array(items) => Ok(items.clone()),
        _ => Err(Error::config_invalid("'requests' must be a list")),
    }
}
