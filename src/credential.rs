use std::fmt;

use regex::Regex;

use crate::error::{Error, Result};

const API_KEY_LEN: usize = 32;

/// A validated UKCP API key.
///
/// Keys are exactly 32 characters of `[A-Za-z0-9_-]` and start and end with a
/// letter or digit. `Debug` output never shows the key itself.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.chars().count() != API_KEY_LEN {
            return Err(Error::CredentialFormat(format!(
                "API Key must be {API_KEY_LEN} characters long."
            )));
        }

        let allowed = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';
        let edges_ok = key.starts_with(|c: char| c.is_ascii_alphanumeric())
            && key.ends_with(|c: char| c.is_ascii_alphanumeric());
        if !key.chars().all(allowed) || !edges_ok {
            return Err(Error::CredentialFormat(
                "API Key must only contain letters, numbers and \"-\", \"_\". \
                 Must begin and end with a letter or number."
                    .into(),
            ));
        }

        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

fn param_pattern(param: &str) -> Regex {
    Regex::new(&format!(r"([?&]){}=[^&#]*", regex::escape(param)))
        .expect("escaped parameter name is a valid pattern")
}

/// Sets the `param` query parameter of `url` to `key`.
///
/// An existing occurrence is replaced in place and any further occurrences are
/// removed, so the result always carries the parameter exactly once. Without an
/// existing occurrence the parameter is appended.
pub fn inject_api_key(url: &str, param: &str, key: &ApiKey) -> String {
    let re = param_pattern(param);
    let mut out = String::with_capacity(url.len() + API_KEY_LEN + param.len() + 2);
    let mut last = 0;
    let mut replaced = false;

    for caps in re.captures_iter(url) {
        let (Some(whole), Some(sep)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&url[last..whole.start()]);
        if !replaced {
            out.push_str(sep.as_str());
            out.push_str(param);
            out.push('=');
            out.push_str(key.as_str());
            replaced = true;
        }
        last = whole.end();
    }
    out.push_str(&url[last..]);

    if replaced {
        return out;
    }
    crate::util::append_query(url, &[(param, key.as_str())])
}

/// Replaces the value of the `param` query parameter with `***`.
pub fn redact_api_key(url: &str, param: &str) -> String {
    param_pattern(param)
        .replace_all(url, |caps: &regex::Captures<'_>| {
            format!("{}{}=***", &caps[1], param)
        })
        .into_owned()
}
