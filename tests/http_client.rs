//! End-to-end job lifecycle against a mock WPS server.
//!
//! The client is blocking, so every call runs on `spawn_blocking` while the mock
//! server keeps serving on the async runtime.

use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;
use ukcpapi::{Client, Error, HttpTransport, JobStatus, ProtocolConfig, Result};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "abcdefghijklmnopqrstuvwxyz012345";

fn execute_response(server: &str, status: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ExecuteResponse xmlns="http://www.opengeospatial.net/wps" xmlns:ows="http://www.opengeospatial.net/ows" statusLocation="{server}/status/job-1" version="1.0.0">
    <Process><ows:Identifier>LS3_Subset_01</ows:Identifier></Process>
    <Status>{status}</Status>
</ExecuteResponse>"#
    )
}

fn status_response(status: &str, file_urls: &[String]) -> String {
    let files: String = file_urls
        .iter()
        .map(|u| format!("<FileDetails><FileURL>{u}</FileURL></FileDetails>"))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ExecuteResponse xmlns="http://www.opengeospatial.net/wps" xmlns:ows="http://www.opengeospatial.net/ows" version="1.0.0">
    <Status>{status}</Status>
    <ProcessOutputs><Output><ComplexValue><WPSResponseDetails><JobDetails><FileSet>{files}</FileSet></JobDetails></WPSResponseDetails></ComplexValue></Output></ProcessOutputs>
</ExecuteResponse>"#
    )
}

fn xml(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/xml")
}

async fn mount_execute(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/wps/Execute"))
        .and(query_param("Identifier", "LS3_Subset_01"))
        .and(query_param("ApiKey", KEY))
        .respond_with(xml(execute_response(
            &server.uri(),
            "<ProcessAccepted>Process accepted</ProcessAccepted>",
        )))
        .expect(1)
        .mount(server)
        .await;
}

/// Status location answers with `statuses` in order, then keeps repeating the last one.
async fn mount_statuses(server: &MockServer, statuses: Vec<String>) {
    let last = statuses.len() - 1;
    for (i, body) in statuses.into_iter().enumerate() {
        let mock = Mock::given(method("GET"))
            .and(path("/status/job-1"))
            .respond_with(xml(body))
            .with_priority(u8::try_from(i + 1).unwrap());
        let mock = if i < last { mock.up_to_n_times(1) } else { mock };
        mock.mount(server).await;
    }
}

fn request_url(server: &str) -> String {
    format!(
        "{server}/wps/Execute?Request=Execute&Identifier=LS3_Subset_01&Format=text/xml\
         &Inform=true&Store=false&Status=false\
         &DataInputs=TemporalAverage=jan;Area=bbox|474459.24|241777.72|486311.19|246518.35;\
         TimeSlice=2075|2076;Variable=psl"
    )
}

/// Runs one `submit` on a blocking thread with a fast-polling client.
async fn submit(request: String, outputs_dir: PathBuf) -> Result<ukcpapi::JobOutcome> {
    tokio::task::spawn_blocking(move || {
        let transport = HttpTransport::new(Duration::from_secs(10), true)?;
        let client = Client::with_transport(KEY, outputs_dir, transport)?
            .with_poll_interval(Duration::from_millis(10))
            .with_progress(false);
        client.submit(&request, None)
    })
    .await
    .expect("submit thread panicked")
}

#[tokio::test(flavor = "multi_thread")]
async fn successful_job_saves_three_outputs() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let uri = server.uri();

    let file_urls = vec![
        format!("{uri}/dl/0/job-1/subset_2075-2076.csv"),
        format!("{uri}/dl/0/job-1/data_licence.txt"),
        format!("{uri}/download?fileName=request.txt"),
    ];

    mount_execute(&server).await;
    mount_statuses(
        &server,
        vec![
            status_response("<ProcessAccepted>Process accepted</ProcessAccepted>", &[]),
            status_response("<ProcessStarted percentCompleted=\"50\">Running</ProcessStarted>", &[]),
            status_response("<ProcessSucceeded>The End</ProcessSucceeded>", &file_urls),
        ],
    )
    .await;

    for (p, body) in [
        ("/dl/0/job-1/subset_2075-2076.csv", "date,psl\n2075-01-16,1013.2\n"),
        ("/dl/0/job-1/data_licence.txt", "Open Government Licence"),
        ("/download", "TemporalAverage=jan"),
    ] {
        Mock::given(method("GET"))
            .and(path(p))
            .and(query_param("ApiKey", KEY))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(1)
            .mount(&server)
            .await;
    }

    let outcome = submit(request_url(&uri), dir.path().to_path_buf())
        .await
        .unwrap();

    assert_eq!(outcome.status, JobStatus::Succeeded);
    assert_eq!(
        outcome.outputs,
        vec![
            dir.path().join("subset_2075-2076.csv"),
            dir.path().join("data_licence.txt"),
            dir.path().join("request.txt"),
        ]
    );
    for output in &outcome.outputs {
        assert!(output.exists(), "{} missing", output.display());
    }
    assert_eq!(
        std::fs::read_to_string(dir.path().join("request.txt")).unwrap(),
        "TemporalAverage=jan"
    );

    let polls = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == "/status/job-1")
        .count();
    assert_eq!(polls, 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_job_reports_service_message() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_execute(&server).await;
    mount_statuses(
        &server,
        vec![
            status_response("<ProcessStarted>Running</ProcessStarted>", &[]),
            status_response(
                r#"<ProcessFailed><ows:ExceptionReport><ows:Exception exceptionCode="NoApplicableCode"><ows:ExceptionText>IndexError= too many indices for array</ows:ExceptionText></ows:Exception></ows:ExceptionReport></ProcessFailed>"#,
                &[],
            ),
        ],
    )
    .await;

    let err = submit(request_url(&server.uri()), dir.path().to_path_buf())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ProcessFailed(_)));
    let text = err.to_string();
    let last_line = text.split('\n').next_back().unwrap().trim();
    assert_eq!(
        last_line,
        "The process failed with error message: \"IndexError= too many indices for array\""
    );
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_identifier_is_rejected_on_submit() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/wps/Execute"))
        .respond_with(ResponseTemplate::new(400).set_body_raw(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<ExceptionReport xmlns="http://www.opengis.net/ows/1.1" version="1.0.0">
    <Exception exceptionCode="InvalidParameterValue" locator="Identifier">
        <ExceptionText>InvalidParameterValue: Identifier not found (None)</ExceptionText>
    </Exception>
</ExceptionReport>"#,
            "text/xml",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!(
        "{}/wps/Execute?Request=Execute&Identifier=Rubbish&Format=text/xml&Inform=true&Store=false",
        server.uri()
    );
    let err = submit(url, dir.path().to_path_buf()).await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "Request failed: InvalidParameterValue: Identifier not found (None)"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_download_aborts_retrieval() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let uri = server.uri();

    mount_execute(&server).await;
    mount_statuses(
        &server,
        vec![status_response(
            "<ProcessSucceeded>The End</ProcessSucceeded>",
            &[format!("{uri}/dl/gone.csv")],
        )],
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/dl/gone.csv"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = submit(request_url(&uri), dir.path().to_path_buf())
        .await
        .unwrap_err();

    match err {
        Error::Http { status, url, .. } => {
            assert_eq!(status, 404);
            assert!(!url.contains(KEY), "key leaked into error: {url}");
        }
        other => panic!("expected HTTP error, got {other:?}"),
    }
}

#[test]
fn connection_errors_hide_a_custom_key_parameter() {
    let dir = TempDir::new().unwrap();
    let transport = HttpTransport::new(Duration::from_secs(5), true).unwrap();
    let client = Client::with_transport(KEY, dir.path(), transport)
        .unwrap()
        .with_protocol(ProtocolConfig {
            api_key_parameter: "Key".into(),
            ..ProtocolConfig::default()
        });

    // Nothing listens on the discard port.
    let err = client
        .submit("http://127.0.0.1:9/wps?Request=Execute", None)
        .unwrap_err();

    match err {
        Error::Transport { url, .. } => {
            assert_eq!(url, "http://127.0.0.1:9/wps?Request=Execute&Key=***");
        }
        other => panic!("expected transport error, got {other:?}"),
    }
}
