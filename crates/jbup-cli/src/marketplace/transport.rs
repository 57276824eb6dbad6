//! HTTP transport seam
//!
//! The resolver and the downloader only need "GET this URL and tell me the
//! status, the redirect target and the body". Redirects are never followed
//! here; callers count hops themselves.

use crate::errors::{ConfigurationError, TransportError};
use reqwest::blocking::Client;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use std::io::Read;
use std::time::Duration;
use url::Url;

pub const USER_AGENT: &str = concat!("jbup/", env!("CARGO_PKG_VERSION"));

pub struct HttpResponse {
    pub status: StatusCode,
    /// Raw `Location` header, if any
    pub location: Option<String>,
    pub body: Box<dyn Read + Send>,
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

pub trait HttpTransport {
    fn get(&self, url: &Url) -> Result<HttpResponse, TransportError>;
}

/// Blocking reqwest client with automatic redirects disabled
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(connect_timeout: Duration, read_timeout: Duration) -> Result<Self, ConfigurationError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(Policy::none())
            .connect_timeout(connect_timeout)
            .timeout(read_timeout)
            .build()
            .map_err(ConfigurationError::HttpClient)?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, url: &Url) -> Result<HttpResponse, TransportError> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|source| TransportError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        tracing::debug!("{} -> {}", url, status);

        Ok(HttpResponse {
            status,
            location,
            body: Box::new(response),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> ReqwestTransport {
        let Ok(transport) = ReqwestTransport::new(Duration::from_secs(5), Duration::from_secs(5))
        else {
            panic!("client should build");
        };
        transport
    }

    #[test]
    fn test_redirect_is_not_followed() {
        let mut server = mockito::Server::new();
        let redirect = server
            .mock("GET", "/pluginManager")
            .match_query(mockito::Matcher::Any)
            .with_status(302)
            .with_header("location", "/files/foo/1.0/foo-1.0.zip")
            .create();
        let target = server.mock("GET", "/files/foo/1.0/foo-1.0.zip").expect(0).create();

        let Ok(url) = Url::parse(&format!("{}/pluginManager?action=download", server.url())) else {
            panic!("mock url should parse");
        };
        let response = transport().get(&url);

        assert!(response.is_ok_and(|r| r.status == StatusCode::FOUND
            && r.location.as_deref() == Some("/files/foo/1.0/foo-1.0.zip")));
        redirect.assert();
        target.assert();
    }

    #[test]
    fn test_body_is_streamed_with_user_agent() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/a.zip")
            .match_header("user-agent", USER_AGENT)
            .with_status(200)
            .with_body("PK-bytes")
            .create();

        let Ok(url) = Url::parse(&format!("{}/a.zip", server.url())) else {
            panic!("mock url should parse");
        };
        let Ok(mut response) = transport().get(&url) else {
            panic!("request should succeed");
        };
        let mut body = String::new();
        assert!(response.body.read_to_string(&mut body).is_ok());
        assert_eq!(body, "PK-bytes");
        mock.assert();
    }

    #[test]
    fn test_connection_refused_is_request_error() {
        let Ok(url) = Url::parse("http://127.0.0.1:1/nothing") else {
            panic!("url should parse");
        };
        assert!(matches!(
            transport().get(&url),
            Err(TransportError::Request { .. })
        ));
    }
}
