use crate::constants::*;
use crate::Credential;
use async_trait::async_trait;
use ini::Ini;
use log::debug;
use skelerest_core::{Context, Error, ProvideCredential, Result};

/// ProfileCredentialProvider loads AWS credentials from the shared configuration files.
///
/// This provider loads credentials from:
/// - `~/.aws/credentials` (or the path specified by `AWS_SHARED_CREDENTIALS_FILE`)
/// - `~/.aws/config` (or the path specified by `AWS_CONFIG_FILE`)
///
/// The profile to use is determined by:
/// 1. The profile requested by the caller
/// 2. The `AWS_PROFILE` environment variable
/// 3. The profile specified via `with_profile()`, `default` if unset
#[derive(Debug)]
pub struct ProfileCredentialProvider {
    profile: String,
    config_file: Option<String>,
    credentials_file: Option<String>,
}

impl Default for ProfileCredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileCredentialProvider {
    /// Create a new ProfileCredentialProvider with default settings.
    pub fn new() -> Self {
        Self {
            profile: "default".to_string(),
            config_file: None,
            credentials_file: None,
        }
    }

    /// Set the fallback profile name.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    /// Set the path to the config file.
    pub fn with_config_file(mut self, path: impl Into<String>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Set the path to the credentials file.
    pub fn with_credentials_file(mut self, path: impl Into<String>) -> Self {
        self.credentials_file = Some(path.into());
        self
    }

    async fn load_from_credentials_file(
        &self,
        ctx: &Context,
        profile: &str,
    ) -> Result<Option<Credential>> {
        let path = match &self.credentials_file {
            Some(path) => path.clone(),
            None => ctx
                .env_var(AWS_SHARED_CREDENTIALS_FILE)
                .unwrap_or_else(|| "~/.aws/credentials".to_string()),
        };

        let Some(conf) = load_ini(ctx, &path).await? else {
            return Ok(None);
        };

        // Sections in the credentials file are named after the profile itself.
        read_credential(&conf, profile, &path)
    }

    async fn load_from_config_file(
        &self,
        ctx: &Context,
        profile: &str,
    ) -> Result<Option<Credential>> {
        let path = match &self.config_file {
            Some(path) => path.clone(),
            None => ctx
                .env_var(AWS_CONFIG_FILE)
                .unwrap_or_else(|| "~/.aws/config".to_string()),
        };

        let Some(conf) = load_ini(ctx, &path).await? else {
            return Ok(None);
        };

        let section = match profile {
            "default" => "default".to_string(),
            x => format!("profile {x}"),
        };
        read_credential(&conf, &section, &path)
    }
}

#[async_trait]
impl ProvideCredential for ProfileCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(
        &self,
        ctx: &Context,
        profile: Option<&str>,
    ) -> Result<Option<Self::Credential>> {
        let profile = match profile {
            Some(profile) => profile.to_string(),
            None => ctx
                .env_var(AWS_PROFILE)
                .unwrap_or_else(|| self.profile.clone()),
        };

        // Try credentials file first
        if let Some(cred) = self.load_from_credentials_file(ctx, &profile).await? {
            return Ok(Some(cred));
        }

        // Then try config file
        self.load_from_config_file(ctx, &profile).await
    }
}

/// Read and parse an ini file, a missing or unreadable file yields `None`.
async fn load_ini(ctx: &Context, path: &str) -> Result<Option<Ini>> {
    let Some(expanded_path) = ctx.expand_home_dir(path) else {
        debug!("failed to expand homedir for path: {path}");
        return Ok(None);
    };

    let content = match ctx.file_read(&expanded_path).await {
        Ok(content) => content,
        Err(err) => {
            debug!("failed to read {expanded_path}: {err:?}");
            return Ok(None);
        }
    };

    let conf = Ini::load_from_str(&String::from_utf8_lossy(&content)).map_err(|e| {
        Error::credential_invalid(format!("failed to parse {expanded_path}")).with_source(e)
    })?;
    Ok(Some(conf))
}

fn read_credential(conf: &Ini, section: &str, path: &str) -> Result<Option<Credential>> {
    let Some(props) = conf.section(Some(section)) else {
        debug!("section {section} not found in {path}");
        return Ok(None);
    };

    match (
        props.get("aws_access_key_id"),
        props.get("aws_secret_access_key"),
    ) {
        (Some(ak), Some(sk)) => Ok(Some(Credential {
            access_key_id: ak.to_string(),
            secret_access_key: sk.to_string(),
            session_token: props.get("aws_session_token").map(|s| s.to_string()),
            expires_in: None,
        })),
        _ => Ok(None),
    }
}
