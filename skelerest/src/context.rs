use reqwest::Client;
use skelerest_core::{Context, OsEnv};
use skelerest_file_read_tokio::TokioFileRead;
use skelerest_http_send_reqwest::ReqwestHttpSend;

/// Context wired to the local filesystem, the process environment and a default
/// [`reqwest::Client`].
pub fn default_context() -> Context {
    default_context_with_client(Client::new())
}

/// Same as [`default_context`] but sends requests through `client`.
///
/// Configure timeouts, proxies or TLS on the client.
pub fn default_context_with_client(client: Client) -> Context {
    Context::new()
        .with_file_read(TokioFileRead)
        .with_http_send(ReqwestHttpSend::new(client))
        .with_env(OsEnv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_default_context_reads_files() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(file, r#"{{"id": "7"}}"#)?;

        let ctx = default_context();
        let content = ctx
            .file_read_as_string(&file.path().to_string_lossy())
            .await?;
        assert_eq!(content, r#"{"id": "7"}"#);
        Ok(())
    }

    #[test]
    fn test_default_context_reads_env() {
        let ctx = default_context();

        assert_eq!(
            ctx.env_var("CARGO_PKG_NAME").as_deref(),
            std::env::var("CARGO_PKG_NAME").ok().as_deref()
        );
    }
}
