use super::{fixed_signer, request_parts};
use anyhow::Result;
use hmac::{Hmac, Mac};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use pretty_assertions::assert_eq;
use sha2::{Digest, Sha256};
use skelerest_aws_v4::{Credential, StaticCredentialProvider};
use skelerest_core::{Context, SignRequest, Signer};

fn hmac(key: &[u8], data: &str) -> Vec<u8> {
    let mut m = Hmac::<Sha256>::new_from_slice(key).expect("hmac accepts any key size");
    m.update(data.as_bytes());
    m.finalize().into_bytes().to_vec()
}

/// Independent rendition of the execute-api signing steps.
fn expected_authorization(
    method: &str,
    host: &str,
    uri: &str,
    body: &[u8],
    region: &str,
    ak: &str,
    sk: &str,
) -> String {
    let amz_date = "20220101T000000Z";
    let date = "20220101";

    let creq = format!(
        "{method}\n{uri}\n\ncontent-type:application/json\nhost:{host}\nx-amz-date:{amz_date}\n\ncontent-type;host;x-amz-date\n{}",
        hex::encode(Sha256::digest(body))
    );
    let scope = format!("{date}/{region}/execute-api/aws4_request");
    let sts = format!(
        "AWS4-HMAC-SHA256\n{amz_date}\n{scope}\n{}",
        hex::encode(Sha256::digest(creq.as_bytes()))
    );

    let k_date = hmac(format!("AWS4{sk}").as_bytes(), date);
    let k_region = hmac(&k_date, region);
    let k_service = hmac(&k_region, "execute-api");
    let k_signing = hmac(&k_service, "aws4_request");
    let signature = hex::encode(hmac(&k_signing, &sts));

    format!(
        "AWS4-HMAC-SHA256 Credential={ak}/{scope}, SignedHeaders=content-type;host;x-amz-date, Signature={signature}"
    )
}

#[test]
fn test_fixed_vector_get() -> Result<()> {
    let headers = fixed_signer("us-east-2").sign_headers(
        "https://api.example.com/items",
        "GET",
        b"",
        &Credential::new("AKEY", "SKEY"),
    )?;

    assert_eq!(
        headers[AUTHORIZATION],
        "AWS4-HMAC-SHA256 Credential=AKEY/20220101/us-east-2/execute-api/aws4_request, SignedHeaders=content-type;host;x-amz-date, Signature=0963becf2cb8829f6bd9537bd0c1d9653415a2c88fcbe3465e2c3dd61ebd0aeb"
    );
    assert_eq!(
        headers[AUTHORIZATION],
        expected_authorization(
            "GET",
            "api.example.com",
            "/items",
            b"",
            "us-east-2",
            "AKEY",
            "SKEY"
        )
        .as_str()
    );
    Ok(())
}

#[test]
fn test_vector_with_body() -> Result<()> {
    let body = br#"{"name":"say \"hi\" {twice}","tags":["a","b"]}"#;
    let headers = fixed_signer("eu-west-1").sign_headers(
        "https://abc123.execute-api.eu-west-1.amazonaws.com/prod/widgets/7",
        "PUT",
        body,
        &Credential::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY"),
    )?;

    assert_eq!(
        headers[AUTHORIZATION],
        expected_authorization(
            "PUT",
            "abc123.execute-api.eu-west-1.amazonaws.com",
            "/prod/widgets/7",
            body,
            "eu-west-1",
            "AKIDEXAMPLE",
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY"
        )
        .as_str()
    );
    Ok(())
}

#[tokio::test]
async fn test_sign_request_matches_sign_headers() -> Result<()> {
    let signer = fixed_signer("us-east-1");
    let cred = Credential::new("AKEY", "SKEY");
    let body = br#"{"id":"7"}"#;

    let mut parts = request_parts(
        http::Method::POST,
        "https://abc123.execute-api.us-east-1.amazonaws.com/prod/widgets",
    );
    parts.headers.insert(CONTENT_TYPE, "text/plain".parse()?);
    signer
        .sign_request(&Context::new(), &mut parts, body, Some(&cred))
        .await?;

    let headers = signer.sign_headers(
        "https://abc123.execute-api.us-east-1.amazonaws.com/prod/widgets",
        "POST",
        body,
        &cred,
    )?;
    for (name, value) in headers.iter() {
        assert_eq!(&parts.headers[name], value);
    }
    Ok(())
}

#[tokio::test]
async fn test_signer_with_static_provider() -> Result<()> {
    let signer = Signer::new(
        Context::new(),
        StaticCredentialProvider::new("AKEY", "SKEY"),
        fixed_signer("us-east-2"),
    );

    let mut parts = request_parts(http::Method::GET, "https://api.example.com/items");
    signer.sign(&mut parts, b"", Some("dev")).await?;

    assert_eq!(
        parts.headers[AUTHORIZATION],
        expected_authorization(
            "GET",
            "api.example.com",
            "/items",
            b"",
            "us-east-2",
            "AKEY",
            "SKEY"
        )
        .as_str()
    );
    Ok(())
}
