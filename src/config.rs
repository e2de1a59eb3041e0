use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Settings resolved by [`load_config`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API key as issued by the UKCP user interface (32 characters).
    pub api_key: String,
    /// Directory that receives downloaded outputs.
    pub outputs_dir: PathBuf,
    /// Whether to verify TLS certificates.
    pub verify: bool,
}

/// Names and namespaces of the WPS 1.0 response vocabulary.
///
/// The defaults match the UKCP service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolConfig {
    /// Namespace of `Status`, `FileURL` and the status elements.
    pub wps_namespace: String,
    /// Namespace of the `ExceptionText` nested under `ProcessFailed`.
    pub ows_namespace: String,
    /// Namespace of the `ExceptionText` in exception reports returned on submission.
    pub ows_error_namespace: String,
    /// Root attribute holding the status handle.
    pub status_location_attribute: String,
    pub status_element: String,
    pub file_url_element: String,
    pub exception_text_element: String,
    /// Query parameter carrying the API key.
    pub api_key_parameter: String,
    /// Query parameter some download URLs use to name the file.
    pub file_name_parameter: String,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            wps_namespace: "http://www.opengeospatial.net/wps".into(),
            ows_namespace: "http://www.opengeospatial.net/ows".into(),
            ows_error_namespace: "http://www.opengis.net/ows/1.1".into(),
            status_location_attribute: "statusLocation".into(),
            status_element: "Status".into(),
            file_url_element: "FileURL".into(),
            exception_text_element: "ExceptionText".into(),
            api_key_parameter: "ApiKey".into(),
            file_name_parameter: "fileName".into(),
        }
    }
}

#[derive(Debug, Default)]
struct RcConfig {
    key: Option<String>,
    outputs_dir: Option<String>,
    verify: Option<bool>,
}

/// Resolves the client settings from (in order of precedence):
/// - explicit arguments
/// - environment variables `UKCPAPI_KEY` (or `API_KEY`) / `UKCPAPI_OUTPUTS_DIR`
/// - config file from `UKCPAPI_RC`, `./.ukcpapirc` or `~/.ukcpapirc`
pub fn load_config(
    api_key: Option<String>,
    outputs_dir: Option<PathBuf>,
    verify: Option<bool>,
) -> Result<ClientConfig> {
    resolve_config(api_key, outputs_dir, verify, |name| std::env::var_os(name))
}

/// [`load_config`] with environment lookups going through `env`.
fn resolve_config<E>(
    api_key: Option<String>,
    outputs_dir: Option<PathBuf>,
    verify: Option<bool>,
    env: E,
) -> Result<ClientConfig>
where
    E: Fn(&str) -> Option<OsString>,
{
    let env_string = |name: &str| env(name).and_then(|v| v.into_string().ok());

    let mut api_key = api_key
        .or_else(|| env_string("UKCPAPI_KEY"))
        .or_else(|| env_string("API_KEY"));
    let mut outputs_dir = outputs_dir.or_else(|| env("UKCPAPI_OUTPUTS_DIR").map(PathBuf::from));

    let rc_candidates = rc_candidates(env("UKCPAPI_RC"));
    let mut file_verify: Option<bool> = None;

    if api_key.is_none() || outputs_dir.is_none() || verify.is_none() {
        if let Some(rc_path) = rc_candidates.iter().find(|p| p.exists()) {
            let cfg = read_rc(rc_path)?;
            if api_key.is_none() {
                api_key = cfg.key;
            }
            if outputs_dir.is_none() {
                outputs_dir = cfg.outputs_dir.map(PathBuf::from);
            }
            file_verify = cfg.verify;
        }
    }

    let api_key = match api_key {
        Some(v) => v,
        None if !rc_candidates.is_empty() => {
            return Err(Error::Config(format!(
                "API key (set UKCPAPI_KEY or API_KEY, or put `key:` in one of: {})",
                rc_candidates
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }
        None => {
            return Err(Error::Config(
                "API key (set UKCPAPI_KEY or API_KEY, or create .ukcpapirc)".into(),
            ));
        }
    };

    Ok(ClientConfig {
        api_key,
        outputs_dir: outputs_dir.unwrap_or_else(std::env::temp_dir),
        verify: verify.or(file_verify).unwrap_or(true),
    })
}

fn read_rc(path: &Path) -> Result<RcConfig> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    Ok(parse_rc(&text))
}

fn parse_rc(text: &str) -> RcConfig {
    let mut cfg = RcConfig::default();

    // `key:` may be alone on its line with the token on the next one.
    let mut pending_key: Option<&str> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(pk) = pending_key.take() {
            if !line.contains(':') {
                let v = strip_quotes(line);
                match pk {
                    "key" => cfg.key = Some(v.to_string()),
                    "outputs_dir" => cfg.outputs_dir = Some(v.to_string()),
                    _ => {}
                }
                continue;
            }
        }

        if let Some((k, v)) = line.split_once(':') {
            let k = k.trim();
            let v = strip_quotes(v.trim());
            match k {
                "key" | "outputs_dir" if v.is_empty() => pending_key = Some(k),
                "key" => cfg.key = Some(v.to_string()),
                "outputs_dir" => cfg.outputs_dir = Some(v.to_string()),
                "verify" if !v.is_empty() => cfg.verify = Some(v != "0"),
                _ => {}
            }
        }
    }

    cfg
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn rc_candidates(explicit: Option<OsString>) -> Vec<PathBuf> {
    if let Some(p) = explicit {
        return vec![PathBuf::from(p)];
    }

    let mut v = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        v.push(cwd.join(".ukcpapirc"));
    }
    if let Some(home) = dirs::home_dir() {
        v.push(home.join(".ukcpapirc"));
    }
    v
}
