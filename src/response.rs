//! Typed access to WPS `ExecuteResponse` documents.
//!
//! The same document shape comes back from the Execute request and from every
//! poll of the status location: a `Status` element whose single child names the
//! job state, an OWS exception report on failure, and `FileURL` elements once
//! the job has succeeded.

use std::fmt;

use crate::config::ProtocolConfig;
use crate::document::{self, Element};
use crate::error::{Error, Result};
use crate::status::JobStatus;

/// URL at which the current state of a submitted job can be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusHandle(String);

impl StatusHandle {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StatusHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A response body together with its parsed element tree.
#[derive(Debug, Clone)]
pub struct ExecuteResponse {
    raw: String,
    root: Element,
}

impl ExecuteResponse {
    /// The body exactly as received.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn root(&self) -> &Element {
        &self.root
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResponseParser {
    protocol: ProtocolConfig,
}

impl ResponseParser {
    pub fn new(protocol: ProtocolConfig) -> Self {
        Self { protocol }
    }

    pub fn protocol(&self) -> &ProtocolConfig {
        &self.protocol
    }

    pub fn parse(&self, body: impl Into<String>) -> Result<ExecuteResponse> {
        let raw = body.into();
        let root = document::parse(&raw)?;
        Ok(ExecuteResponse { raw, root })
    }

    /// Reads the status location of a freshly submitted job.
    ///
    /// When the attribute is missing the service usually sent an exception
    /// report instead; its text becomes the error message.
    pub fn status_handle(&self, doc: &ExecuteResponse) -> Result<StatusHandle> {
        let p = &self.protocol;
        match doc.root.attribute(&p.status_location_attribute) {
            Some(url) if !url.trim().is_empty() => Ok(StatusHandle::new(url.trim())),
            _ => Err(Error::Protocol(self.exception_text(doc).unwrap_or_else(
                || "could not get status handle from response.".to_string(),
            ))),
        }
    }

    /// Text of the first OWS exception in an exception report, if any.
    pub fn exception_text(&self, doc: &ExecuteResponse) -> Option<String> {
        let p = &self.protocol;
        doc.root
            .find(&p.ows_error_namespace, &p.exception_text_element)
            .map(|e| e.text().to_string())
    }

    /// Current job status plus its message.
    ///
    /// For `ProcessFailed` the message is the nested OWS `ExceptionText`; for
    /// every other status it is the text of the status element itself.
    pub fn status_and_message(&self, doc: &ExecuteResponse) -> Result<(JobStatus, String)> {
        let p = &self.protocol;
        let status_element = doc
            .root
            .child(&p.wps_namespace, &p.status_element)
            .ok_or_else(|| {
                Error::Protocol(format!("response has no <{}> element", p.status_element))
            })?;
        let node = status_element.children().first().ok_or_else(|| {
            Error::Protocol(format!("<{}> element is empty", p.status_element))
        })?;

        if node.namespace() != Some(p.wps_namespace.as_str()) {
            return Err(Error::UnknownStatus(match node.namespace() {
                Some(ns) => format!("{{{}}}{}", ns, node.name()),
                None => node.name().to_string(),
            }));
        }
        let status: JobStatus = node.name().parse()?;

        let message = match status {
            JobStatus::Failed => node
                .find(&p.ows_namespace, &p.exception_text_element)
                .unwrap_or(node)
                .text(),
            _ => node.text(),
        };

        Ok((status, message.to_string()))
    }

    pub fn status(&self, doc: &ExecuteResponse) -> Result<JobStatus> {
        self.status_and_message(doc).map(|(status, _)| status)
    }

    /// Every output file URL, in document order.
    pub fn file_urls(&self, doc: &ExecuteResponse) -> Result<Vec<String>> {
        let p = &self.protocol;
        let urls: Vec<String> = doc
            .root
            .descendants()
            .filter(|e| e.is(&p.wps_namespace, &p.file_url_element))
            .map(|e| e.text().to_string())
            .collect();

        if urls.is_empty() {
            return Err(Error::NoOutputs);
        }
        Ok(urls)
    }
}
