use anyhow::Result;
use tracing_subscriber::EnvFilter;
use ukcpapi::Client;

fn main() -> Result<()> {
    // Example program that calls the library API.
    // Configure the API key via UKCPAPI_KEY / API_KEY or a `.ukcpapirc` file.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let client = Client::new(None, Some("my-outputs".into()), None)?;

    let request_url = "https://ukclimateprojections-ui.metoffice.gov.uk/wps/Execute?\
        Request=Execute&Identifier=LS3_Subset_01&Format=text/xml&Inform=true&Store=false&\
        Status=false&DataInputs=TemporalAverage=jan;Area=bbox|474459.24|241777.72|\
        486311.19|246518.35;Collection=land-rcm;ClimateChangeType=absolute;\
        EnsembleMemberSet=land-rcm;DataFormat=csv;TimeSlice=2075|2076;Variable=psl";

    let outcome = client.submit(request_url, None)?;
    for path in &outcome.outputs {
        println!("{}", path.display());
    }
    Ok(())
}
