use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::config::ProtocolConfig;
use crate::credential::{ApiKey, redact_api_key};
use crate::error::{Error, Result};
use crate::transport::Transport;
use crate::util::{append_query, guess_filename_from_url, query_param};

/// What to do with files already written when a later download fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PartialOutputs {
    /// Leave them on disk.
    #[default]
    Keep,
    /// Delete every file written by the failed retrieval.
    Remove,
}

/// One remote output and where it will be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub url: String,
    pub target: PathBuf,
}

/// Local file name for an output URL.
///
/// An explicit `fileName` query parameter wins; otherwise the last path segment
/// is used.
pub fn output_file_name(url: &str, protocol: &ProtocolConfig) -> Result<String> {
    let name = query_param(url, &protocol.file_name_parameter)
        .map(str::to_string)
        .or_else(|| guess_filename_from_url(url))
        .ok_or_else(|| {
            Error::Protocol(format!("cannot derive a file name from output URL {url}"))
        })?;

    if name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(Error::Protocol(format!(
            "refusing to write output to unsafe file name {name:?}"
        )));
    }
    Ok(name)
}

/// Pairs each URL with its target under `outputs_dir`, keeping the order.
pub fn plan_outputs(
    file_urls: &[String],
    outputs_dir: &Path,
    protocol: &ProtocolConfig,
) -> Result<Vec<OutputFile>> {
    file_urls
        .iter()
        .map(|url| {
            Ok(OutputFile {
                url: url.clone(),
                target: outputs_dir.join(output_file_name(url, protocol)?),
            })
        })
        .collect()
}

/// Streams job outputs to local files.
pub struct OutputRetriever<'a, T: ?Sized> {
    transport: &'a T,
    protocol: &'a ProtocolConfig,
    api_key: &'a ApiKey,
    progress: bool,
    partial: PartialOutputs,
}

impl<'a, T: Transport + ?Sized> OutputRetriever<'a, T> {
    pub fn new(transport: &'a T, protocol: &'a ProtocolConfig, api_key: &'a ApiKey) -> Self {
        Self {
            transport,
            protocol,
            api_key,
            progress: false,
            partial: PartialOutputs::Keep,
        }
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_partial_outputs(mut self, partial: PartialOutputs) -> Self {
        self.partial = partial;
        self
    }

    /// Downloads every URL into `outputs_dir` and returns the local paths in
    /// input order. The first failure aborts the whole retrieval.
    pub fn retrieve(&self, file_urls: &[String], outputs_dir: &Path) -> Result<Vec<PathBuf>> {
        let files = plan_outputs(file_urls, outputs_dir, self.protocol)?;

        info!(dir = %outputs_dir.display(), count = files.len(), "Saving outputs");
        // Paths this call has created or truncated.
        let mut written: Vec<PathBuf> = Vec::with_capacity(files.len());
        for file in &files {
            if let Err(e) = self.download(file, &mut written) {
                if self.partial == PartialOutputs::Remove {
                    remove_partial(&written);
                }
                return Err(e);
            }
        }
        Ok(written)
    }

    fn download(&self, file: &OutputFile, written: &mut Vec<PathBuf>) -> Result<u64> {
        let key_param = self.protocol.api_key_parameter.as_str();
        let url = append_query(&file.url, &[(key_param, self.api_key.as_str())]);
        info!(target_path = %file.target.display(), "Downloading output");

        let mut body = self
            .transport
            .open(&url)
            .map_err(|e| e.redact_url(key_param))?;
        let mut out = File::create(&file.target).map_err(|e| Error::io(&file.target, e))?;
        written.push(file.target.clone());

        let pb = self.progress.then(|| progress_bar(body.content_length));

        let mut total: u64 = 0;
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = match body.reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(
                        url = %redact_api_key(&url, key_param),
                        error = %e,
                        "Download interrupted"
                    );
                    return Err(Error::io(&file.target, e));
                }
            };
            out.write_all(&buf[..n])
                .map_err(|e| Error::io(&file.target, e))?;
            total += n as u64;
            if let Some(pb) = &pb {
                pb.inc(n as u64);
            }
        }
        out.flush().map_err(|e| Error::io(&file.target, e))?;

        if let Some(pb) = &pb {
            pb.finish_and_clear();
        }
        Ok(total)
    }
}

fn remove_partial(written: &[PathBuf]) {
    for path in written {
        match std::fs::remove_file(path) {
            Ok(()) => info!(path = %path.display(), "Removed partial output"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Could not remove partial output"),
        }
    }
}

fn progress_bar(len: Option<u64>) -> ProgressBar {
    let pb = match len {
        Some(len) => ProgressBar::new(len),
        None => ProgressBar::new_spinner(),
    };
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} {bytes}/{total_bytes} ({bytes_per_sec}) {wide_bar} {eta}",
    ) {
        pb.set_style(style.progress_chars("=>-"));
    }
    pb
}
