use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::Error;

/// State of a submitted WPS job as reported by the `<Status>` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum JobStatus {
    #[serde(rename = "ProcessAccepted")]
    Accepted,
    #[serde(rename = "ProcessStarted")]
    Started,
    #[serde(rename = "ProcessSucceeded")]
    Succeeded,
    #[serde(rename = "ProcessFailed")]
    Failed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Accepted,
        JobStatus::Started,
        JobStatus::Succeeded,
        JobStatus::Failed,
    ];

    /// Element name used on the wire.
    pub fn tag(self) -> &'static str {
        match self {
            JobStatus::Accepted => "ProcessAccepted",
            JobStatus::Started => "ProcessStarted",
            JobStatus::Succeeded => "ProcessSucceeded",
            JobStatus::Failed => "ProcessFailed",
        }
    }

    /// No further transition happens after a terminal status.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for JobStatus {
    type Err = Error;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|s| s.tag() == tag)
            .ok_or_else(|| Error::UnknownStatus(tag.to_string()))
    }
}

/// Diagnostic for a job that ended in `ProcessFailed`.
///
/// Displays as two lines. Downstream tooling reads the last one, so the wording
/// must stay exactly as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessFailure {
    /// Request that triggered the job (API key redacted).
    pub request: String,
    /// Text of the service's exception report.
    pub message: String,
}

impl fmt::Display for ProcessFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Failed to process request: {}\nThe process failed with error message: \"{}\"",
            self.request, self.message
        )
    }
}

/// Outcome of classifying one observed status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Pending(JobStatus),
    Succeeded,
    Failed(ProcessFailure),
}

/// Classifies a `(status, message)` pair observed for the request `context`.
pub fn resolve(status: JobStatus, message: &str, context: &str) -> Resolution {
    match status {
        JobStatus::Accepted | JobStatus::Started => Resolution::Pending(status),
        JobStatus::Succeeded => Resolution::Succeeded,
        JobStatus::Failed => Resolution::Failed(ProcessFailure {
            request: context.to_string(),
            message: message.to_string(),
        }),
    }
}
