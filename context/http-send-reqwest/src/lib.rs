//! Reqwest based implementation of [`HttpSend`].
//!
//! This is the transport used to execute declared requests. Configure timeouts,
//! proxies or TLS on the [`reqwest::Client`] passed to [`ReqwestHttpSend::new`].

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::BodyExt;
use reqwest::{Client, Request};
use skelerest_core::{Error, HttpSend, Result};

/// HttpSend implementation backed by a [`reqwest::Client`].
#[derive(Debug, Default, Clone)]
pub struct ReqwestHttpSend {
    client: Client,
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend with a reqwest::Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSend for ReqwestHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let uri = req.uri().to_string();
        let req = Request::try_from(req).map_err(|e| {
            Error::request_invalid(format!("failed to build request for {uri}")).with_source(e)
        })?;

        let resp: http::Response<_> = self
            .client
            .execute(req)
            .await
            .map_err(|e| Error::transport(format!("failed to send request to {uri}")).with_source(e))?
            .into();

        let (parts, body) = resp.into_parts();
        let bs = BodyExt::collect(body)
            .await
            .map(|buf| buf.to_bytes())
            .map_err(|e| {
                Error::transport(format!("failed to read response body from {uri}")).with_source(e)
            })?;
        Ok(http::Response::from_parts(parts, bs))
    }
}
