//! A small Rust client for the UK Climate Projections (UKCP) Web Processing Service.
//!
//! This crate implements the `ukcp-api-client` flow:
//! submit an Execute request, poll the job's status location until it succeeds or
//! fails, then download every output file the service lists.
//!
//! ## Quick start
//! - Configure the API key via environment variables (`UKCPAPI_KEY` or `API_KEY`)
//!   or a `.ukcpapirc` file (supported in the current directory and in your home
//!   directory).
//! - Call [`Client::submit`] with a request URL, or [`Client::submit_request`]
//!   with an [`ExecuteRequest`].
//!
//! ```no_run
//! use ukcpapi::{Client, ExecuteRequest, Result};
//! use serde_json::json;
//!
//! fn main() -> Result<()> {
//!     let client = Client::new(None, Some("my-outputs".into()), None)?;
//!     let request = ExecuteRequest::new("LS3_Subset_01").inputs(&json!({
//!         "TemporalAverage": "jan",
//!         "Area": ["bbox", 474459.24, 241777.72, 486311.19, 246518.35],
//!         "Collection": "land-rcm",
//!         "ClimateChangeType": "absolute",
//!         "EnsembleMemberSet": "land-rcm",
//!         "DataFormat": "csv",
//!         "TimeSlice": [2075, 2076],
//!         "Variable": "psl"
//!     }))?;
//!     let outcome = client.submit_request(&request, None)?;
//!     for path in &outcome.outputs {
//!         println!("{}", path.display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Failures are reported through [`Error`]. A job that ends in `ProcessFailed`
//! yields [`Error::ProcessFailed`], whose last line reads
//! `The process failed with error message: "<service message>"`.

#![forbid(unsafe_code)]

mod client;
mod config;
mod credential;
mod document;
mod download;
mod error;
mod poller;
mod request;
mod response;
mod status;
mod transport;
mod util;

pub use client::{Client, JobOutcome};
pub use config::{ClientConfig, ProtocolConfig, load_config};
pub use credential::{ApiKey, inject_api_key, redact_api_key};
pub use document::{Descendants, Element};
pub use download::{OutputFile, OutputRetriever, PartialOutputs, output_file_name, plan_outputs};
pub use error::{Error, Result};
pub use poller::{CancelToken, DEFAULT_POLL_INTERVAL, PollOptions, Poller};
pub use request::{DEFAULT_ENDPOINT, ExecuteRequest};
pub use response::{ExecuteResponse, ResponseParser, StatusHandle};
pub use status::{JobStatus, ProcessFailure, Resolution, resolve};
pub use transport::{BodyStream, HttpTransport, TextResponse, Transport};
