use crate::{Context, Result};
use std::fmt::{self, Debug};

/// SigningCredential is the trait used by signer as the signing key.
pub trait SigningCredential: Clone + Debug + Send + Sync + 'static {
    /// Check if the credential is usable for signing right now.
    fn is_valid(&self) -> bool;
}

impl<T: SigningCredential> SigningCredential for Option<T> {
    fn is_valid(&self) -> bool {
        let Some(cred) = self else {
            return false;
        };

        cred.is_valid()
    }
}

/// ProvideCredential resolves a credential for a named profile.
///
/// `profile` is `None` when the request did not pin a profile; implementations
/// then fall back to their own default (environment, `AWS_PROFILE`, `default`).
///
/// Returning `Ok(None)` means "nothing found here", which lets a
/// [`ProvideCredentialChain`] move on to the next provider.
#[async_trait::async_trait]
pub trait ProvideCredential: Debug + Send + Sync + 'static {
    /// Credential returned by this provider.
    type Credential: Send + Sync + 'static;

    /// Resolve the credential for the given profile.
    async fn provide_credential(
        &self,
        ctx: &Context,
        profile: Option<&str>,
    ) -> Result<Option<Self::Credential>>;
}

/// SignRequest adds authentication headers to an outgoing request.
#[async_trait::async_trait]
pub trait SignRequest: Debug + Send + Sync + 'static {
    /// Credential used by this signer.
    type Credential: Send + Sync + 'static;

    /// Sign the request in place.
    ///
    /// `body` is the exact payload that will be sent, it takes part in the signature.
    /// Headers produced by the signer replace existing headers with the same name.
    async fn sign_request(
        &self,
        ctx: &Context,
        req: &mut http::request::Parts,
        body: &[u8],
        credential: Option<&Self::Credential>,
    ) -> Result<()>;
}

/// ProvideCredentialChain tries a list of providers in order.
///
/// The first provider returning a credential wins. Errors from a provider are
/// logged and the chain moves on.
pub struct ProvideCredentialChain<C> {
    providers: Vec<Box<dyn ProvideCredential<Credential = C>>>,
}

impl<C: Send + Sync + 'static> ProvideCredentialChain<C> {
    /// Create a new empty credential provider chain.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Add a credential provider to the chain.
    pub fn push(mut self, provider: impl ProvideCredential<Credential = C>) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Number of providers in the chain.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Returns true if the chain holds no provider.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl<C: Send + Sync + 'static> Default for ProvideCredentialChain<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Debug for ProvideCredentialChain<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvideCredentialChain")
            .field("providers", &self.providers)
            .finish()
    }
}

#[async_trait::async_trait]
impl<C: Send + Sync + 'static> ProvideCredential for ProvideCredentialChain<C> {
    type Credential = C;

    async fn provide_credential(
        &self,
        ctx: &Context,
        profile: Option<&str>,
    ) -> Result<Option<Self::Credential>> {
        for provider in &self.providers {
            log::debug!("trying credential provider: {provider:?}");

            match provider.provide_credential(ctx, profile).await {
                Ok(Some(cred)) => {
                    log::debug!("loaded credential from provider: {provider:?}");
                    return Ok(Some(cred));
                }
                Ok(None) => {
                    log::debug!("no credential found in provider: {provider:?}");
                    continue;
                }
                Err(e) => {
                    log::warn!("error loading credential from provider {provider:?}: {e:?}");
                    continue;
                }
            }
        }

        Ok(None)
    }
}
