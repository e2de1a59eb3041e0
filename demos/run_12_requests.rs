use std::path::Path;

use anyhow::Result;
use serde_json::json;
use tracing_subscriber::EnvFilter;
use ukcpapi::{Client, ExecuteRequest};

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

fn main() -> Result<()> {
    // One subset per month, each saved to `monthly_subsets/<month>`.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let client = Client::from_env()?;
    let base_dir = Path::new("monthly_subsets");

    for month in MONTHS {
        let request = ExecuteRequest::new("LS3_Subset_01").inputs(&json!({
            "TemporalAverage": month,
            "Area": ["bbox", 474459.24, 241777.72, 486311.19, 246518.35],
            "Collection": "land-rcm",
            "ClimateChangeType": "absolute",
            "EnsembleMemberSet": "land-rcm",
            "DataFormat": "csv",
            "TimeSlice": [2075, 2076],
            "Variable": "psl"
        }))?;

        let outcome = client.submit_request(&request, Some(base_dir.join(month).as_path()))?;
        println!("{month}: {} file(s)", outcome.outputs.len());
    }
    Ok(())
}
