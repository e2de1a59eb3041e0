use std::io::Read;
use std::time::Duration;

use reqwest::blocking::Client as HttpClient;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::credential::redact_api_key;
use crate::error::{Error, Result};

const DEFAULT_KEY_PARAMETER: &str = "ApiKey";

/// A response body read fully into memory.
#[derive(Debug, Clone)]
pub struct TextResponse {
    pub status: u16,
    pub body: String,
}

impl TextResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A successful response whose body is read incrementally.
pub struct BodyStream {
    pub reader: Box<dyn Read + Send>,
    /// Length announced by the server, if any.
    pub content_length: Option<u64>,
}

/// The two HTTP operations the job lifecycle needs.
///
/// Every request is a plain GET; authentication travels in the query string.
pub trait Transport {
    /// Fetches `url` and returns the body whatever the status code.
    fn get_text(&self, url: &str) -> Result<TextResponse>;

    /// Opens `url` for streaming. Non-success statuses are errors.
    fn open(&self, url: &str) -> Result<BodyStream>;
}

/// [`Transport`] over a blocking `reqwest` client.
///
/// URLs in its errors have the default `ApiKey` parameter redacted. The client
/// redacts again with the parameter name of its own [`ProtocolConfig`].
///
/// [`ProtocolConfig`]: crate::ProtocolConfig
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: HttpClient,
}

impl HttpTransport {
    pub fn new(timeout: Duration, verify: bool) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("ukcpapi-rs/{}", env!("CARGO_PKG_VERSION")))
                .unwrap_or(HeaderValue::from_static("ukcpapi-rs")),
        );

        let mut builder = HttpClient::builder()
            .default_headers(default_headers)
            .timeout(timeout);

        if !verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http })
    }

    fn send(&self, url: &str) -> Result<reqwest::blocking::Response> {
        self.http.get(url).send().map_err(|source| Error::Transport {
            url: self.redact(url),
            source: source.without_url(),
        })
    }

    fn redact(&self, url: &str) -> String {
        redact_api_key(url, DEFAULT_KEY_PARAMETER)
    }
}

impl Transport for HttpTransport {
    fn get_text(&self, url: &str) -> Result<TextResponse> {
        let resp = self.send(url)?;
        let status = resp.status().as_u16();
        let body = resp.text().map_err(|source| Error::Transport {
            url: self.redact(url),
            source: source.without_url(),
        })?;
        Ok(TextResponse { status, body })
    }

    fn open(&self, url: &str) -> Result<BodyStream> {
        let resp = self.send(url)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                url: self.redact(url),
                body: resp.text().unwrap_or_default(),
            });
        }
        Ok(BodyStream {
            content_length: resp.content_length(),
            reader: Box::new(resp),
        })
    }
}
