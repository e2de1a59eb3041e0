use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::{ProtocolConfig, load_config};
use crate::credential::{ApiKey, inject_api_key, redact_api_key};
use crate::download::{OutputRetriever, PartialOutputs};
use crate::error::{Error, Result};
use crate::poller::{CancelToken, PollOptions, Poller};
use crate::request::ExecuteRequest;
use crate::response::{ExecuteResponse, ResponseParser};
use crate::status::{JobStatus, Resolution, resolve};
use crate::transport::{HttpTransport, Transport};

/// Result of a job that ran to `ProcessSucceeded`.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub status: JobStatus,
    /// The final status document.
    pub response: ExecuteResponse,
    /// Local paths of the downloaded outputs, in the order the service listed them.
    pub outputs: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Client<T = HttpTransport> {
    api_key: ApiKey,
    outputs_dir: PathBuf,

    parser: ResponseParser,
    poll: PollOptions,
    progress: bool,
    partial_outputs: PartialOutputs,

    transport: T,
}

impl Client<HttpTransport> {
    /// Creates a client using environment variables and/or `.ukcpapirc`.
    ///
    /// This is equivalent to `Client::new(None, None, None)`.
    pub fn from_env() -> Result<Self> {
        Self::new(None, None, None)
    }

    /// Creates a client using (in order of precedence):
    /// - explicit `api_key`/`outputs_dir`/`verify` arguments
    /// - environment variables `UKCPAPI_KEY` (or `API_KEY`) / `UKCPAPI_OUTPUTS_DIR`
    /// - config file from `UKCPAPI_RC` or `.ukcpapirc`
    ///
    /// The key is validated and the outputs directory created if missing.
    pub fn new(
        api_key: Option<String>,
        outputs_dir: Option<PathBuf>,
        verify: Option<bool>,
    ) -> Result<Self> {
        let cfg = load_config(api_key, outputs_dir, verify)?;
        let transport = HttpTransport::new(Duration::from_secs(60), cfg.verify)?;
        Self::with_transport(&cfg.api_key, cfg.outputs_dir, transport)
    }
}

impl<T: Transport> Client<T> {
    /// Creates a client that talks to the service through `transport`.
    pub fn with_transport(
        api_key: &str,
        outputs_dir: impl Into<PathBuf>,
        transport: T,
    ) -> Result<Self> {
        let outputs_dir = outputs_dir.into();
        ensure_dir(&outputs_dir)?;
        Ok(Self {
            api_key: ApiKey::new(api_key)?,
            outputs_dir,
            parser: ResponseParser::default(),
            poll: PollOptions::default(),
            progress: true,
            partial_outputs: PartialOutputs::Keep,
            transport,
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll.interval = interval;
        self
    }

    pub fn with_poll_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.poll.timeout = timeout;
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.poll.cancel = Some(token);
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_partial_outputs(mut self, partial: PartialOutputs) -> Self {
        self.partial_outputs = partial;
        self
    }

    pub fn with_protocol(mut self, protocol: ProtocolConfig) -> Self {
        self.parser = ResponseParser::new(protocol);
        self
    }

    /// Validates and stores a new API key. The old key stays in place on error.
    pub fn set_api_key(&mut self, api_key: &str) -> Result<()> {
        self.api_key = ApiKey::new(api_key)?;
        Ok(())
    }

    /// Sets the default outputs directory, creating it if it does not exist.
    pub fn set_outputs_dir(&mut self, outputs_dir: impl Into<PathBuf>) -> Result<()> {
        let outputs_dir = outputs_dir.into();
        ensure_dir(&outputs_dir)?;
        self.outputs_dir = outputs_dir;
        Ok(())
    }

    pub fn api_key(&self) -> &ApiKey {
        &self.api_key
    }

    pub fn outputs_dir(&self) -> &Path {
        &self.outputs_dir
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn protocol(&self) -> &ProtocolConfig {
        self.parser.protocol()
    }

    /// Submits an Execute request URL, waits for the job and downloads its outputs.
    ///
    /// The client's API key is put into the URL (replacing any key already there).
    /// `outputs_dir`, when given, is used for this call only and created if
    /// needed. A job ending in `ProcessFailed` returns [`Error::ProcessFailed`]
    /// and downloads nothing.
    pub fn submit(&self, request_url: &str, outputs_dir: Option<&Path>) -> Result<JobOutcome> {
        let key_param = &self.protocol().api_key_parameter;
        let request_url = inject_api_key(request_url, key_param, &self.api_key);
        let context = redact_api_key(&request_url, key_param);

        let outputs_dir = match outputs_dir {
            Some(dir) => {
                ensure_dir(dir)?;
                dir
            }
            None => self.outputs_dir.as_path(),
        };

        info!(url = %context, "Submitting request");
        let submission = self.parser.parse(self.fetch_document(&request_url)?)?;
        debug!(body = submission.raw(), "Execute response");
        let handle = self.parser.status_handle(&submission)?;
        info!(%handle, "Job accepted");

        let (status, response) = Poller::new(self.poll.clone()).poll_until_terminal(
            &self.parser,
            &handle,
            |h| self.fetch_document(h.as_str()),
            thread::sleep,
        )?;

        let (status, message) = match status {
            JobStatus::Failed => self.parser.status_and_message(&response)?,
            _ => (status, String::new()),
        };

        match resolve(status, &message, &context) {
            Resolution::Failed(failure) => {
                warn!(message = %failure.message, "Process failed");
                Err(Error::ProcessFailed(failure))
            }
            Resolution::Pending(status) => Err(Error::Protocol(format!(
                "polling stopped on non-terminal status {status}"
            ))),
            Resolution::Succeeded => {
                let file_urls = self.parser.file_urls(&response)?;
                let outputs = self.retrieve(&file_urls, Some(outputs_dir))?;
                Ok(JobOutcome {
                    status,
                    response,
                    outputs,
                })
            }
        }
    }

    /// Builds the URL for `request` and [`submit`](Self::submit)s it.
    pub fn submit_request(
        &self,
        request: &ExecuteRequest,
        outputs_dir: Option<&Path>,
    ) -> Result<JobOutcome> {
        self.submit(&request.to_url(), outputs_dir)
    }

    /// Downloads output files into `outputs_dir` (default: the client's).
    pub fn retrieve(&self, file_urls: &[String], outputs_dir: Option<&Path>) -> Result<Vec<PathBuf>> {
        let outputs_dir = outputs_dir.unwrap_or(&self.outputs_dir);
        let outputs = OutputRetriever::new(&self.transport, self.protocol(), &self.api_key)
            .with_progress(self.progress)
            .with_partial_outputs(self.partial_outputs)
            .retrieve(file_urls, outputs_dir)?;
        for path in &outputs {
            info!(path = %path.display(), "Saved output");
        }
        Ok(outputs)
    }

    /// GETs a submission or status URL and returns the body.
    ///
    /// An error status whose body is an OWS exception report becomes
    /// [`Error::Protocol`] with the service's text.
    fn fetch_document(&self, url: &str) -> Result<String> {
        let key_param = &self.protocol().api_key_parameter;
        let resp = self
            .transport
            .get_text(url)
            .map_err(|e| e.redact_url(key_param))?;
        if resp.is_success() {
            return Ok(resp.body);
        }

        if let Some(message) = self
            .parser
            .parse(resp.body.as_str())
            .ok()
            .and_then(|doc| self.parser.exception_text(&doc))
        {
            return Err(Error::Protocol(message));
        }

        Err(Error::Http {
            status: resp.status,
            url: redact_api_key(url, key_param),
            body: resp.body,
        })
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        std::fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    }
    Ok(())
}
