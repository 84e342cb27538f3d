use anyhow::Result;
use bytes::Bytes;
use log::{debug, warn};
use skelerest_aws_v4::{DefaultCredentialProvider, RequestSigner};
use skelerest_core::{Context, OsEnv, Signer};
use skelerest_file_read_tokio::TokioFileRead;
use skelerest_http_send_reqwest::ReqwestHttpSend;
use std::env;

/// Signer for a real API Gateway stage, enabled by `SKELEREST_AWS_V4_TEST=on`.
fn init_live_test() -> Option<(Context, Signer<skelerest_aws_v4::Credential>, String)> {
    let _ = env_logger::builder().is_test(true).try_init();
    let _ = dotenv::dotenv();

    if env::var("SKELEREST_AWS_V4_TEST").unwrap_or_default() != "on" {
        return None;
    }

    let region = env::var("SKELEREST_AWS_V4_REGION").expect("SKELEREST_AWS_V4_REGION must be set");
    let url = env::var("SKELEREST_AWS_V4_URL").expect("SKELEREST_AWS_V4_URL must be set");

    let ctx = Context::new()
        .with_file_read(TokioFileRead)
        .with_http_send(ReqwestHttpSend::default())
        .with_env(OsEnv);
    let signer = Signer::new(
        ctx.clone(),
        DefaultCredentialProvider::new(),
        RequestSigner::new(&region),
    );

    Some((ctx, signer, url))
}

#[tokio::test]
async fn test_get_signed_endpoint() -> Result<()> {
    let Some((ctx, signer, url)) = init_live_test() else {
        warn!("SKELEREST_AWS_V4_TEST is not set, skipped");
        return Ok(());
    };

    let profile = env::var("SKELEREST_AWS_V4_PROFILE").ok();
    let (mut parts, _) = http::Request::get(&url).body(())?.into_parts();
    signer.sign(&mut parts, b"", profile.as_deref()).await?;

    let req = http::Request::from_parts(parts, Bytes::new());
    debug!("signed request: {req:?}");

    let resp = ctx.http_send(req).await?;
    debug!("got response: {resp:?}");

    // IAM authorizers answer 403 when the signature is rejected.
    assert_ne!(resp.status(), http::StatusCode::FORBIDDEN);
    Ok(())
}
