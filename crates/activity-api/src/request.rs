//! Builds the web invocation (request metadata + authenticated principal) from an HTTP request.
//!
//! Authentication happens upstream: a gateway forwards the principal as
//! `X-Auth-Guard`, `X-Auth-Subject` and `X-Auth-Claim-<name>` headers.

use activity_types::{Credential, Guard, Invocation, WebRequest};
use axum::extract::{ConnectInfo, FromRequestParts, MatchedPath};
use axum::http::header::{HeaderMap, REFERER, USER_AGENT};
use axum::http::request::Parts;
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const SESSION_ID_HEADER: &str = "x-session-id";
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
pub const AUTH_GUARD_HEADER: &str = "x-auth-guard";
pub const AUTH_SUBJECT_HEADER: &str = "x-auth-subject";
pub const AUTH_CLAIM_PREFIX: &str = "x-auth-claim-";

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Client address: first `X-Forwarded-For` hop when it is an IP address, else the socket peer.
fn client_ip(parts: &Parts) -> Option<String> {
    header(&parts.headers, FORWARDED_FOR_HEADER)
        .and_then(|v| v.split(',').next()?.trim().parse::<IpAddr>().ok())
        .map(|ip| ip.to_string())
        .or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
}

/// Principal forwarded by the gateway, if any. An unknown guard is ignored.
pub fn credentials_from_headers(headers: &HeaderMap) -> Vec<Credential> {
    let (Some(raw_guard), Some(subject)) = (
        header(headers, AUTH_GUARD_HEADER),
        header(headers, AUTH_SUBJECT_HEADER),
    ) else {
        return Vec::new();
    };
    let Some(guard) = Guard::parse(&raw_guard) else {
        tracing::warn!(guard = %raw_guard, "unknown auth guard header, treating request as anonymous");
        return Vec::new();
    };
    let mut credential = Credential::new(guard, subject);
    for (name, value) in headers {
        let Some(claim) = name.as_str().strip_prefix(AUTH_CLAIM_PREFIX) else {
            continue;
        };
        if let Ok(value) = value.to_str() {
            credential = credential.with_claim(claim.replace('-', "_"), value.trim());
        }
    }
    vec![credential]
}

pub fn web_request_from_parts(parts: &Parts) -> WebRequest {
    let headers = &parts.headers;
    WebRequest {
        ip: client_ip(parts),
        user_agent: header(headers, USER_AGENT.as_str()),
        request_id: header(headers, REQUEST_ID_HEADER),
        session_id: header(headers, SESSION_ID_HEADER),
        route: parts
            .extensions
            .get::<MatchedPath>()
            .map(|p| p.as_str().to_string()),
        method: Some(parts.method.as_str().to_string()),
        url: Some(parts.uri.to_string()),
        referrer: header(headers, REFERER.as_str()),
        credentials: credentials_from_headers(headers),
    }
}

/// Extractor yielding the current request as an activity invocation.
pub struct WebInvocation(pub Invocation);

#[axum::async_trait]
impl<S> FromRequestParts<S> for WebInvocation
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(Invocation::Web(web_request_from_parts(parts))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn gateway_headers_become_credential() {
        let p = parts(
            Request::builder()
                .uri("/posts")
                .header("X-Auth-Guard", "moderators")
                .header("X-Auth-Subject", "m-9")
                .header("X-Auth-Claim-Nickname", "mod_nina")
                .header("X-Auth-Claim-Moderator-Level", "2"),
        );
        let creds = credentials_from_headers(&p.headers);
        assert_eq!(creds.len(), 1);
        assert_eq!(creds[0].guard, Guard::Moderators);
        assert_eq!(creds[0].subject_id, "m-9");
        assert_eq!(creds[0].claim("nickname").as_deref(), Some("mod_nina"));
        assert_eq!(creds[0].claim("moderator_level").as_deref(), Some("2"));
    }

    #[test]
    fn missing_or_unknown_guard_is_anonymous() {
        let p = parts(Request::builder().uri("/").header("X-Auth-Subject", "x"));
        assert!(credentials_from_headers(&p.headers).is_empty());

        let p = parts(
            Request::builder()
                .uri("/")
                .header("X-Auth-Guard", "admins")
                .header("X-Auth-Subject", "x"),
        );
        assert!(credentials_from_headers(&p.headers).is_empty());
    }

    #[test]
    fn request_metadata_is_collected() {
        let p = parts(
            Request::builder()
                .method("PUT")
                .uri("/posts/3?draft=1")
                .header("User-Agent", "curl/8.0")
                .header("X-Forwarded-For", "203.0.113.7, 10.0.0.1")
                .header("X-Request-ID", "req-1")
                .header("Referer", "https://example.com/"),
        );
        let req = web_request_from_parts(&p);
        assert_eq!(req.ip.as_deref(), Some("203.0.113.7"));
        assert_eq!(req.user_agent.as_deref(), Some("curl/8.0"));
        assert_eq!(req.request_id.as_deref(), Some("req-1"));
        assert_eq!(req.session_id, None);
        assert_eq!(req.method.as_deref(), Some("PUT"));
        assert_eq!(req.url.as_deref(), Some("/posts/3?draft=1"));
        assert_eq!(req.referrer.as_deref(), Some("https://example.com/"));
        assert_eq!(req.route, None);
        assert!(req.credentials.is_empty());
    }

    #[test]
    fn non_address_forwarded_hop_falls_back_to_peer() {
        let p = parts(
            Request::builder()
                .uri("/")
                .header("X-Forwarded-For", "unknown, 10.0.0.1"),
        );
        assert_eq!(web_request_from_parts(&p).ip, None);

        let peer: SocketAddr = "192.0.2.10:51000".parse().unwrap();
        let p = parts(
            Request::builder()
                .uri("/")
                .header("X-Forwarded-For", "unknown, 10.0.0.1")
                .extension(ConnectInfo(peer)),
        );
        assert_eq!(web_request_from_parts(&p).ip.as_deref(), Some("192.0.2.10"));

        let p = parts(
            Request::builder()
                .uri("/")
                .header("X-Forwarded-For", " 2001:db8::1 ")
                .extension(ConnectInfo(peer)),
        );
        assert_eq!(web_request_from_parts(&p).ip.as_deref(), Some("2001:db8::1"));
    }
}
