use anyhow::Result;
use http::header::AUTHORIZATION;
use skelerest_aws_v4::{Credential, DefaultCredentialProvider, ProfileCredentialProvider};
use skelerest_core::{Context, ErrorKind, ProvideCredential, Signer, StaticEnv};
use skelerest_file_read_tokio::TokioFileRead;
use std::collections::HashMap;
use std::fs;
use tempfile::tempdir;

use crate::signing::{fixed_signer, request_parts};

fn context(envs: HashMap<String, String>) -> Context {
    Context::new()
        .with_file_read(TokioFileRead)
        .with_env(StaticEnv {
            home_dir: None,
            envs,
        })
}

#[tokio::test]
async fn test_rotated_profile_is_picked_up() -> Result<()> {
    let tmp_dir = tempdir()?;
    let path = tmp_dir.path().join("credentials");
    fs::write(
        &path,
        "[dev]\naws_access_key_id = FIRSTKEY\naws_secret_access_key = FIRSTSECRET\n",
    )?;

    let signer: Signer<Credential> = Signer::new(
        context(HashMap::new()),
        ProfileCredentialProvider::new()
            .with_credentials_file(path.to_string_lossy())
            .with_config_file("/non/existent/config"),
        fixed_signer("us-east-2"),
    );

    let mut parts = request_parts(http::Method::GET, "https://api.example.com/items");
    signer.sign(&mut parts, b"", Some("dev")).await?;
    let first = parts.headers[AUTHORIZATION].clone();
    assert!(first.to_str()?.contains("Credential=FIRSTKEY/"));

    fs::write(
        &path,
        "[dev]\naws_access_key_id = SECONDKEY\naws_secret_access_key = SECONDSECRET\n",
    )?;

    let mut parts = request_parts(http::Method::GET, "https://api.example.com/items");
    signer.sign(&mut parts, b"", Some("dev")).await?;
    assert!(parts.headers[AUTHORIZATION]
        .to_str()?
        .contains("Credential=SECONDKEY/"));
    Ok(())
}

#[tokio::test]
async fn test_unknown_profile_is_credential_error() -> Result<()> {
    let tmp_dir = tempdir()?;
    let path = tmp_dir.path().join("credentials");
    fs::write(
        &path,
        "[default]\naws_access_key_id = AKEY\naws_secret_access_key = SKEY\n",
    )?;

    let ctx = context(HashMap::from([
        (
            "AWS_SHARED_CREDENTIALS_FILE".to_string(),
            path.to_string_lossy().to_string(),
        ),
        (
            "AWS_CONFIG_FILE".to_string(),
            "/non/existent/config".to_string(),
        ),
    ]));

    let provider = DefaultCredentialProvider::new();
    assert!(provider.provide_credential(&ctx, None).await?.is_some());

    let signer = Signer::new(ctx, provider, fixed_signer("us-east-2"));
    let mut parts = request_parts(http::Method::GET, "https://api.example.com/items");
    let err = signer
        .sign(&mut parts, b"", Some("staging"))
        .await
        .expect_err("unknown profile must fail");

    assert_eq!(err.kind(), ErrorKind::CredentialInvalid);
    assert!(err.to_string().contains("staging"));
    assert!(parts.headers.get(AUTHORIZATION).is_none());
    Ok(())
}
