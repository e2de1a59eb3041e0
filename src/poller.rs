use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::response::{ExecuteResponse, ResponseParser, StatusHandle};
use crate::status::JobStatus;

/// Pause between two polls of the status location.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Shared flag that stops a running poll loop at its next iteration.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct PollOptions {
    pub interval: Duration,
    /// Upper bound on the total polling time. `None` polls until the job ends.
    pub timeout: Option<Duration>,
    pub cancel: Option<CancelToken>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
            cancel: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Poller {
    options: PollOptions,
}

impl Poller {
    pub fn new(options: PollOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PollOptions {
        &self.options
    }

    /// Polls `handle` until the job reaches a terminal status.
    ///
    /// Every iteration sleeps for the configured interval before fetching, so the
    /// first poll never follows the submission back to back. Errors from `fetch`
    /// or from parsing end the loop immediately.
    pub fn poll_until_terminal<F, S>(
        &self,
        parser: &ResponseParser,
        handle: &StatusHandle,
        mut fetch: F,
        mut sleep: S,
    ) -> Result<(JobStatus, ExecuteResponse)>
    where
        F: FnMut(&StatusHandle) -> Result<String>,
        S: FnMut(Duration),
    {
        let started = Instant::now();
        let mut last_status: Option<JobStatus> = None;
        let mut polls = 0usize;

        loop {
            self.check_cancelled(handle)?;
            info!(
                interval = ?self.options.interval,
                "Pausing before polling server"
            );
            sleep(self.options.interval);
            self.check_cancelled(handle)?;

            let body = fetch(handle)?;
            polls += 1;
            let doc = parser.parse(body)?;
            let status = parser.status(&doc)?;

            if last_status != Some(status) {
                last_status = Some(status);
                info!(%status, polls, "Job status");
            }

            if status.is_terminal() {
                debug!(polls, body = doc.raw(), "Terminal status document");
                return Ok((status, doc));
            }

            if let Some(timeout) = self.options.timeout {
                let elapsed = started.elapsed();
                if elapsed >= timeout {
                    return Err(Error::Timeout {
                        handle: handle.to_string(),
                        elapsed,
                    });
                }
            }
        }
    }

    fn check_cancelled(&self, handle: &StatusHandle) -> Result<()> {
        match &self.options.cancel {
            Some(token) if token.is_cancelled() => Err(Error::Cancelled(handle.to_string())),
            _ => Ok(()),
        }
    }
}
