mod golden;
mod live;

use http::request::Parts;
use skelerest_aws_v4::RequestSigner;
use skelerest_core::time::parse_iso8601;

/// Signer pinned to the clock used by every golden vector.
pub fn fixed_signer(region: &str) -> RequestSigner {
    RequestSigner::new(region).with_time(parse_iso8601("20220101T000000Z").expect("time must be valid"))
}

pub fn request_parts(method: http::Method, uri: &str) -> Parts {
    http::Request::builder()
        .method(method)
        .uri(uri)
        .body(())
        .expect("request must be valid")
        .into_parts()
        .0
}
