use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::credential::redact_api_key;
use crate::status::ProcessFailure;

/// Result type alias for ukcpapi operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while configuring the client or running a job.
///
/// None of these are retried by the client; each aborts the current `submit` or
/// `retrieve` call and is returned to the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// The API key does not have the expected shape.
    #[error("invalid API key: {0}")]
    CredentialFormat(String),

    /// A required configuration value could not be resolved.
    #[error("missing configuration: {0}")]
    Config(String),

    /// The service did not hand back a status handle for the submitted job.
    #[error("Request failed: {0}")]
    Protocol(String),

    /// The status element named something outside the known set.
    #[error("Unknown status value: {0}")]
    UnknownStatus(String),

    /// The job finished with `ProcessFailed`.
    #[error("{0}")]
    ProcessFailed(ProcessFailure),

    /// The job succeeded but its response lists no output files.
    #[error("Cannot locate file URLs in \"<FileURL>\" tags.")]
    NoOutputs,

    /// The HTTP request could not be completed.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status and no service diagnostic.
    #[error("HTTP {status} for url ({url})\n{body}")]
    Http {
        status: u16,
        url: String,
        body: String,
    },

    /// The response body is not a well-formed XML document.
    #[error("malformed response document: {0}")]
    Parse(String),

    /// A local filesystem operation failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Process inputs that cannot be encoded into a `DataInputs` value.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Polling ran past the configured timeout.
    #[error("job at {handle} did not finish within {elapsed:?}")]
    Timeout { handle: String, elapsed: Duration },

    /// Polling was stopped through a [`CancelToken`](crate::CancelToken).
    #[error("polling of {0} was cancelled")]
    Cancelled(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Hides the value of `param` in the URL carried by HTTP-level errors.
    pub(crate) fn redact_url(self, param: &str) -> Self {
        match self {
            Error::Transport { url, source } => Error::Transport {
                url: redact_api_key(&url, param),
                source,
            },
            Error::Http { status, url, body } => Error::Http {
                status,
                url: redact_api_key(&url, param),
                body,
            },
            other => other,
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::Parse(e.to_string())
    }
}
