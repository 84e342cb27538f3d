use crate::constants::{
    ALGORITHM, CONTENT_TYPE_JSON, SERVICE, SIGNED_HEADERS, X_AMZ_DATE, X_AMZ_SECURITY_TOKEN,
};
use crate::Credential;
use async_trait::async_trait;
use http::request::Parts;
use http::{header, HeaderMap, HeaderValue};
use log::debug;
use skelerest_core::hash::{hex_hmac_sha256, hex_sha256, hmac_sha256};
use skelerest_core::time::{format_date, format_iso8601, now, DateTime};
use skelerest_core::{Context, Error, Result, SignRequest};
use std::fmt::Write;

/// RequestSigner that implements AWS SigV4 for `execute-api`.
///
/// Only `content-type`, `host` and `x-amz-date` are canonicalized and the canonical
/// query string is always empty: query parameters never take part in the signature.
///
/// - [Signature Version 4 signing process](https://docs.aws.amazon.com/general/latest/gr/signature-version-4.html)
#[derive(Debug, Clone)]
pub struct RequestSigner {
    region: String,

    time: Option<DateTime>,
}

impl RequestSigner {
    /// Create a new signer for the given region.
    pub fn new(region: &str) -> Self {
        Self {
            region: region.into(),

            time: None,
        }
    }

    /// Specify the signing time.
    ///
    /// # Note
    ///
    /// We should always take current time to sign requests.
    /// Only use this function for testing.
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }

    /// Region used in the credential scope.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Compute the signing headers for a request to `endpoint`.
    ///
    /// Returns `content-type`, `x-amz-date` and `authorization`, plus an unsigned
    /// `x-amz-security-token` when the credential carries a session token.
    pub fn sign_headers(
        &self,
        endpoint: &str,
        method: &str,
        body: &[u8],
        cred: &Credential,
    ) -> Result<HeaderMap> {
        let (host, uri) = split_endpoint(endpoint);
        self.build_headers(method, &host, &uri, body, cred)
    }

    fn build_headers(
        &self,
        method: &str,
        host: &str,
        uri: &str,
        body: &[u8],
        cred: &Credential,
    ) -> Result<HeaderMap> {
        let now = self.time.unwrap_or_else(now);
        let amz_date = format_iso8601(now);

        let creq = canonical_request_string(method, host, uri, &amz_date, body)?;
        debug!("calculated canonical request: {creq}");

        // Scope: "20220313/<region>/execute-api/aws4_request"
        let scope = format!("{}/{}/{}/aws4_request", format_date(now), self.region, SERVICE);
        debug!("calculated scope: {scope}");

        // StringToSign:
        //
        // AWS4-HMAC-SHA256
        // 20220313T072004Z
        // 20220313/<region>/execute-api/aws4_request
        // <hashed_canonical_request>
        let string_to_sign = {
            let mut f = String::new();
            writeln!(f, "{ALGORITHM}")?;
            writeln!(f, "{amz_date}")?;
            writeln!(f, "{scope}")?;
            write!(f, "{}", hex_sha256(creq.as_bytes()))?;
            f
        };
        debug!("calculated string to sign: {string_to_sign}");

        let signing_key = generate_signing_key(&cred.secret_access_key, now, &self.region);
        let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

        let mut authorization = HeaderValue::from_str(&format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={SIGNED_HEADERS}, Signature={signature}",
            cred.access_key_id,
        ))
        .map_err(|e| {
            Error::request_invalid("failed to create authorization header").with_source(e)
        })?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::with_capacity(4);
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(CONTENT_TYPE_JSON),
        );
        headers.insert(X_AMZ_DATE, HeaderValue::from_str(&amz_date)?);
        headers.insert(header::AUTHORIZATION, authorization);

        if let Some(token) = &cred.session_token {
            let mut value = HeaderValue::from_str(token).map_err(|e| {
                Error::credential_invalid("session token is not a valid header value")
                    .with_source(e)
            })?;
            // Set token value sensitive to valid leaking.
            value.set_sensitive(true);

            headers.insert(X_AMZ_SECURITY_TOKEN, value);
        }

        Ok(headers)
    }
}

#[async_trait]
impl SignRequest for RequestSigner {
    type Credential = Credential;

    async fn sign_request(
        &self,
        _: &Context,
        req: &mut Parts,
        body: &[u8],
        credential: Option<&Self::Credential>,
    ) -> Result<()> {
        let Some(cred) = credential else {
            return Err(Error::credential_invalid(
                "credential is required to sign execute-api requests",
            ));
        };

        let host = req
            .uri
            .authority()
            .ok_or_else(|| Error::request_invalid("request without authority is invalid for signing"))?
            .to_string();
        let uri = req.uri.path().to_string();

        let headers = self.build_headers(req.method.as_str(), &host, &uri, body, cred)?;
        for (name, value) in headers.iter() {
            req.headers.insert(name.clone(), value.clone());
        }

        Ok(())
    }
}

/// Split an endpoint into its host and request path.
///
/// The scheme is stripped, the host is everything up to the first `/` and the path
/// always starts with `/`. Any query or fragment is not part of the path.
fn split_endpoint(endpoint: &str) -> (String, String) {
    let rest = endpoint
        .strip_prefix("https://")
        .or_else(|| endpoint.strip_prefix("http://"))
        .unwrap_or(endpoint);
    let rest = rest.split(['?', '#']).next().unwrap_or_default();

    match rest.split_once('/') {
        Some((host, path)) => (host.to_string(), format!("/{path}")),
        None => (rest.to_string(), "/".to_string()),
    }
}

fn canonical_request_string(
    method: &str,
    host: &str,
    uri: &str,
    amz_date: &str,
    body: &[u8],
) -> Result<String> {
    // 256 is specially chosen to avoid reallocation for most requests.
    let mut f = String::with_capacity(256);

    writeln!(f, "{method}")?;
    writeln!(f, "{uri}")?;
    // Canonical query string is always empty.
    writeln!(f)?;
    writeln!(f, "content-type:{CONTENT_TYPE_JSON}")?;
    writeln!(f, "host:{host}")?;
    writeln!(f, "{X_AMZ_DATE}:{amz_date}")?;
    writeln!(f)?;
    writeln!(f, "{SIGNED_HEADERS}")?;
    write!(f, "{}", hex_sha256(body))?;

    Ok(f)
}

fn generate_signing_key(secret: &str, time: DateTime, region: &str) -> Vec<u8> {
    // Sign secret
    let secret = format!("AWS4{secret}");
    // Sign date
    let sign_date = hmac_sha256(secret.as_bytes(), format_date(time).as_bytes());
    // Sign region
    let sign_region = hmac_sha256(sign_date.as_slice(), region.as_bytes());
    // Sign service
    let sign_service = hmac_sha256(sign_region.as_slice(), SERVICE.as_bytes());
    // Sign request
    hmac_sha256(sign_service.as_slice(), "aws4_request".as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use skelerest_core::time::parse_iso8601;
    use skelerest_core::ErrorKind;
    use test_case::test_case;

    fn signer(region: &str) -> RequestSigner {
        RequestSigner::new(region)
            .with_time(parse_iso8601("20220101T000000Z").expect("time must be valid"))
    }

    #[test_case("https://api.example.com/items", "api.example.com", "/items"; "https")]
    #[test_case("https://api.example.com", "api.example.com", "/"; "no path")]
    #[test_case("https://api.example.com/", "api.example.com", "/"; "root path")]
    #[test_case("https://abc.execute-api.us-east-1.amazonaws.com/prod/a/b", "abc.execute-api.us-east-1.amazonaws.com", "/prod/a/b"; "nested path")]
    #[test_case("http://localhost:8080/widgets", "localhost:8080", "/widgets"; "http with port")]
    #[test_case("https://api.example.com/items?limit=1", "api.example.com", "/items"; "query is dropped")]
    fn test_split_endpoint(endpoint: &str, host: &str, uri: &str) {
        assert_eq!(split_endpoint(endpoint), (host.to_string(), uri.to_string()));
    }

    #[test]
    fn test_canonical_request_string() -> Result<()> {
        let creq = canonical_request_string("GET", "api.example.com", "/items", "20220101T000000Z", b"")?;

        assert_eq!(
            creq,
            "GET\n/items\n\ncontent-type:application/json\nhost:api.example.com\nx-amz-date:20220101T000000Z\n\ncontent-type;host;x-amz-date\ne3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        Ok(())
    }

    #[test]
    fn test_sign_headers_get() -> Result<()> {
        let headers = signer("us-east-2").sign_headers(
            "https://api.example.com/items",
            "GET",
            b"",
            &Credential::new("AKEY", "SKEY"),
        )?;

        assert_eq!(headers.len(), 3);
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(headers[X_AMZ_DATE], "20220101T000000Z");
        assert_eq!(
            headers[header::AUTHORIZATION],
            "AWS4-HMAC-SHA256 Credential=AKEY/20220101/us-east-2/execute-api/aws4_request, SignedHeaders=content-type;host;x-amz-date, Signature=0963becf2cb8829f6bd9537bd0c1d9653415a2c88fcbe3465e2c3dd61ebd0aeb"
        );
        assert!(headers[header::AUTHORIZATION].is_sensitive());
        Ok(())
    }

    #[test]
    fn test_sign_headers_post_body() -> Result<()> {
        let headers = signer("us-east-1").sign_headers(
            "https://abc123.execute-api.us-east-1.amazonaws.com/prod/widgets",
            "POST",
            br#"{"id":"7"}"#,
            &Credential::new("AKEY", "SKEY"),
        )?;

        let auth = headers[header::AUTHORIZATION].to_str().expect("must be valid");
        assert!(auth.ends_with(
            "Signature=7ad5c8aed2dd63a86e8b1da7dd9c480d9c946610db91668c311ad67bff00f864"
        ));
        Ok(())
    }

    #[test]
    fn test_sign_headers_deterministic() -> Result<()> {
        let s = signer("us-east-2");
        let cred = Credential::new("AKEY", "SKEY");

        let a = s.sign_headers("https://api.example.com/items", "GET", b"", &cred)?;
        let b = s.sign_headers("https://api.example.com/items", "GET", b"", &cred)?;
        assert_eq!(a, b);

        // Query parameters never change the signature.
        let c = s.sign_headers("https://api.example.com/items?one=1", "GET", b"", &cred)?;
        assert_eq!(a[header::AUTHORIZATION], c[header::AUTHORIZATION]);
        Ok(())
    }

    #[test]
    fn test_sign_headers_with_session_token() -> Result<()> {
        let cred = Credential {
            session_token: Some("SESSIONTOKEN".to_string()),
            ..Credential::new("AKEY", "SKEY")
        };
        let with_token =
            signer("us-east-2").sign_headers("https://api.example.com/items", "GET", b"", &cred)?;
        let without_token = signer("us-east-2").sign_headers(
            "https://api.example.com/items",
            "GET",
            b"",
            &Credential::new("AKEY", "SKEY"),
        )?;

        assert_eq!(with_token.len(), 4);
        assert_eq!(with_token[X_AMZ_SECURITY_TOKEN], "SESSIONTOKEN");
        // The token is sent but not signed.
        assert_eq!(
            with_token[header::AUTHORIZATION],
            without_token[header::AUTHORIZATION]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_sign_request_overrides_headers() -> Result<()> {
        let mut parts = http::Request::builder()
            .method(http::Method::GET)
            .uri("https://api.example.com/items?one=1")
            .header(header::CONTENT_TYPE, "text/plain")
            .header(header::AUTHORIZATION, "Bearer caller")
            .header("x-trace", "abc")
            .body(())?
            .into_parts()
            .0;

        signer("us-east-2")
            .sign_request(
                &Context::new(),
                &mut parts,
                b"",
                Some(&Credential::new("AKEY", "SKEY")),
            )
            .await?;

        assert_eq!(parts.headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(parts.headers["x-trace"], "abc");
        assert_eq!(
            parts.headers[header::AUTHORIZATION],
            "AWS4-HMAC-SHA256 Credential=AKEY/20220101/us-east-2/execute-api/aws4_request, SignedHeaders=content-type;host;x-amz-date, Signature=0963becf2cb8829f6bd9537bd0c1d9653415a2c88fcbe3465e2c3dd61ebd0aeb"
        );
        assert_eq!(parts.headers.get_all(header::AUTHORIZATION).iter().count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_sign_request_without_credential() {
        let mut parts = http::Request::builder()
            .uri("https://api.example.com/items")
            .body(())
            .expect("request must be valid")
            .into_parts()
            .0;

        let err = signer("us-east-2")
            .sign_request(&Context::new(), &mut parts, b"", None)
            .await
            .expect_err("sign must fail");
        assert_eq!(err.kind(), ErrorKind::CredentialInvalid);
    }
}
