use crate::{Context, Error, ProvideCredential, Result, SignRequest, SigningCredential};
use std::sync::Arc;

/// Signer resolves a credential and signs one request with it.
///
/// Credentials are resolved on every call and never cached, so a rotated
/// profile is picked up by the next execution.
#[derive(Clone, Debug)]
pub struct Signer<K: SigningCredential> {
    ctx: Context,
    provider: Arc<dyn ProvideCredential<Credential = K>>,
    builder: Arc<dyn SignRequest<Credential = K>>,
}

impl<K: SigningCredential> Signer<K> {
    /// Create a new signer.
    pub fn new(
        ctx: Context,
        provider: impl ProvideCredential<Credential = K>,
        builder: impl SignRequest<Credential = K>,
    ) -> Self {
        Self::with_shared_provider(ctx, Arc::new(provider), builder)
    }

    /// Create a new signer around a provider that is shared with other signers.
    pub fn with_shared_provider(
        ctx: Context,
        provider: Arc<dyn ProvideCredential<Credential = K>>,
        builder: impl SignRequest<Credential = K>,
    ) -> Self {
        Self {
            ctx,
            provider,
            builder: Arc::new(builder),
        }
    }

    /// Sign the request with the credential resolved for `profile`.
    ///
    /// Fails with [`crate::ErrorKind::CredentialInvalid`] when no usable credential exists.
    pub async fn sign(
        &self,
        req: &mut http::request::Parts,
        body: &[u8],
        profile: Option<&str>,
    ) -> Result<()> {
        let profile_name = profile.unwrap_or("default");

        let cred = self
            .provider
            .provide_credential(&self.ctx, profile)
            .await
            .map_err(|e| {
                Error::credential_invalid(format!(
                    "failed to resolve credential for profile {profile_name}"
                ))
                .with_source(e)
            })?
            .ok_or_else(|| {
                Error::credential_invalid(format!(
                    "no credential found for profile {profile_name}"
                ))
            })?;

        if !cred.is_valid() {
            return Err(Error::credential_invalid(format!(
                "credential for profile {profile_name} is invalid or expired"
            )));
        }

        self.builder
            .sign_request(&self.ctx, req, body, Some(&cred))
            .await
    }
}
