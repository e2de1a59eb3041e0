use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// Execute endpoint of the UKCP user interface.
pub const DEFAULT_ENDPOINT: &str = "https://ukclimateprojections-ui.metoffice.gov.uk/wps/Execute";

/// Builder for a WPS `Execute` GET request.
///
/// Inputs end up in the `DataInputs` parameter as `Key=value` pairs joined by
/// `;`. List values are joined by `|`, which is how the service expects areas
/// and time slices (`Area=bbox|474459.24|241777.72|486311.19|246518.35`).
///
/// ```
/// use ukcpapi::ExecuteRequest;
///
/// let request = ExecuteRequest::new("LS3_Subset_01")
///     .input("TemporalAverage", "jan")
///     .input("TimeSlice", "2075|2076");
/// assert!(request.to_url().ends_with("DataInputs=TemporalAverage=jan;TimeSlice=2075|2076"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteRequest {
    endpoint: String,
    identifier: String,
    inputs: Vec<(String, String)>,
    params: Vec<(String, String)>,
}

impl ExecuteRequest {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            identifier: identifier.into(),
            inputs: Vec::new(),
            params: vec![
                ("Format".into(), "text/xml".into()),
                ("Inform".into(), "true".into()),
                ("Store".into(), "false".into()),
                ("Status".into(), "false".into()),
            ],
        }
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Adds one `DataInputs` entry, replacing an earlier one with the same key.
    pub fn input(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        set(&mut self.inputs, key.into(), value.into());
        self
    }

    /// Adds every field of a serializable map or struct as a `DataInputs` entry.
    ///
    /// Strings are used as is, numbers and booleans in their JSON spelling, and
    /// arrays of those joined by `|`. Nested objects and nulls are rejected.
    pub fn inputs<T: Serialize + ?Sized>(mut self, inputs: &T) -> Result<Self> {
        let value =
            serde_json::to_value(inputs).map_err(|e| Error::InvalidRequest(e.to_string()))?;
        let Value::Object(map) = value else {
            return Err(Error::InvalidRequest(
                "DataInputs must serialize to a map of input names to values".into(),
            ));
        };
        for (key, value) in map {
            let rendered = render_input(&key, &value)?;
            set(&mut self.inputs, key, rendered);
        }
        Ok(self)
    }

    /// Sets a top-level query parameter such as `Store` or `Status`.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        set(&mut self.params, key.into(), value.into());
        self
    }

    /// Renders the request URL (without any API key).
    pub fn to_url(&self) -> String {
        let mut url = self.endpoint.clone();
        url.push(if url.contains('?') { '&' } else { '?' });
        url.push_str("Request=Execute&Identifier=");
        url.push_str(&self.identifier);
        for (k, v) in &self.params {
            url.push('&');
            url.push_str(k);
            url.push('=');
            url.push_str(v);
        }
        if !self.inputs.is_empty() {
            url.push_str("&DataInputs=");
            let inputs: Vec<String> = self
                .inputs
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            url.push_str(&inputs.join(";"));
        }
        url
    }
}

fn set(entries: &mut Vec<(String, String)>, key: String, value: String) {
    match entries.iter_mut().find(|(k, _)| *k == key) {
        Some(entry) => entry.1 = value,
        None => entries.push((key, value)),
    }
}

fn render_input(key: &str, value: &Value) -> Result<String> {
    match value {
        Value::Array(items) => {
            let parts = items
                .iter()
                .map(|item| render_scalar(key, item))
                .collect::<Result<Vec<_>>>()?;
            Ok(parts.join("|"))
        }
        other => render_scalar(key, other),
    }
}

fn render_scalar(key: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => Err(Error::InvalidRequest(format!(
            "input {key} must be a string, number, boolean or a list of those"
        ))),
    }
}
