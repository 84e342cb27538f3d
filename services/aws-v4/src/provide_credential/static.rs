use crate::Credential;
use async_trait::async_trait;
use skelerest_core::{Context, ProvideCredential, Result};

/// StaticCredentialProvider provides static AWS credentials.
///
/// The same credential is returned whatever profile is requested.
#[derive(Debug, Clone)]
pub struct StaticCredentialProvider {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl StaticCredentialProvider {
    /// Create a new StaticCredentialProvider with access key ID and secret access key.
    pub fn new(access_key_id: &str, secret_access_key: &str) -> Self {
        Self {
            access_key_id: access_key_id.to_string(),
            secret_access_key: secret_access_key.to_string(),
            session_token: None,
        }
    }

    /// Set the session token.
    pub fn with_session_token(mut self, token: &str) -> Self {
        self.session_token = Some(token.to_string());
        self
    }
}

#[async_trait]
impl ProvideCredential for StaticCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(
        &self,
        _: &Context,
        _: Option<&str>,
    ) -> Result<Option<Self::Credential>> {
        Ok(Some(Credential {
            access_key_id: self.access_key_id.clone(),
            secret_access_key: self.secret_access_key.clone(),
            session_token: self.session_token.clone(),
            expires_in: None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_static_credential_provider() -> anyhow::Result<()> {
        let ctx = Context::new();

        let provider = StaticCredentialProvider::new("test_access_key", "test_secret_key");
        let cred = provider
            .provide_credential(&ctx, Some("dev"))
            .await?
            .expect("credential must be provided");
        assert_eq!(cred.access_key_id, "test_access_key");
        assert_eq!(cred.secret_access_key, "test_secret_key");
        assert!(cred.session_token.is_none());

        let provider = StaticCredentialProvider::new("test_access_key", "test_secret_key")
            .with_session_token("test_session_token");
        let cred = provider
            .provide_credential(&ctx, None)
            .await?
            .expect("credential must be provided");
        assert_eq!(cred.session_token.as_deref(), Some("test_session_token"));

        Ok(())
    }
}
