mod common;

use std::sync::{Arc, Mutex};

use tabular_pipeline::source::cloud::CloudCredentials;
use tabular_pipeline::source::database::{DatabaseCredentials, DatabaseDriver, DatabaseSession, DatabaseTarget};
use tabular_pipeline::source::{acquire, AcquireOptions, Acquisition, ProbeDetail, SourceDescriptor};
use tabular_pipeline::AcquisitionError;

use common::{serve_once, serve_sequence};

#[test]
fn web_404_is_unexpected_status() {
    let (base, handle) = serve_once(404, "not here");
    let url = format!("{base}/missing");

    let err = acquire(&SourceDescriptor::web(&url), &AcquireOptions::default()).unwrap_err();
    match err {
        AcquisitionError::UnexpectedStatus { url: got, code } => {
            assert_eq!(code, 404);
            assert_eq!(got, url);
        }
        other => panic!("expected UnexpectedStatus, got {other:?}"),
    }
    assert_eq!(handle.join().unwrap().url, "/missing");
}

#[test]
fn web_200_is_reachable_without_a_dataset() {
    let (base, handle) = serve_once(200, "hello");
    let acquisition = acquire(&SourceDescriptor::web(&base), &AcquireOptions::default()).unwrap();
    let captured = handle.join().unwrap();

    assert!(captured.header("user-agent").is_some_and(|ua| ua.starts_with("tabular-pipeline/")));
    let Acquisition::Reachable(report) = acquisition.clone() else {
        panic!("expected a reachability report");
    };
    assert_eq!(report.detail, ProbeDetail::Web { status: 200, body_len: 5 });
    assert!(acquisition.into_dataset().is_none());
}

#[test]
fn web_connection_refused_is_connection_error() {
    // Bind then drop to get a port nothing listens on.
    let port = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
    let url = format!("http://127.0.0.1:{port}/");
    let err = acquire(&SourceDescriptor::web(url), &AcquireOptions::default()).unwrap_err();
    assert!(matches!(err, AcquisitionError::ConnectionError { .. }));
}

fn cloud(provider: &str, endpoint: &str, access: &str, secret: &str) -> SourceDescriptor {
    SourceDescriptor::CloudStorage {
        provider: provider.to_string(),
        credentials: CloudCredentials::new(access, secret).with_endpoint(endpoint),
    }
}

fn containers(acquisition: Acquisition) -> Vec<String> {
    match acquisition {
        Acquisition::Reachable(report) => match report.detail {
            ProbeDetail::CloudStorage { containers, .. } => containers,
            other => panic!("unexpected detail {other:?}"),
        },
        Acquisition::Dataset(_) => panic!("cloud probes do not load data"),
    }
}

#[test]
fn s3_listing_is_signed_with_sigv4() {
    let body = "<?xml version=\"1.0\"?><ListAllMyBucketsResult><Buckets>\
                <Bucket><Name>raw-data</Name></Bucket><Bucket><Name>exports</Name></Bucket>\
                </Buckets></ListAllMyBucketsResult>";
    let (base, handle) = serve_once(200, body);

    let acquisition = acquire(&cloud("AWS", &base, "AKIDEXAMPLE", "secret"), &AcquireOptions::default()).unwrap();
    let captured = handle.join().unwrap();

    assert_eq!(containers(acquisition), vec!["raw-data".to_string(), "exports".to_string()]);
    let auth = captured.header("authorization").unwrap();
    assert!(auth.starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/"));
    assert!(auth.contains("/us-east-1/s3/aws4_request"));
    assert!(auth.contains("SignedHeaders=host;x-amz-content-sha256;x-amz-date"));
    assert!(captured.header("x-amz-date").is_some());
}

#[test]
fn azure_listing_uses_shared_key() {
    let body = "<EnumerationResults><Containers><Container><Name>landing</Name></Container>\
                </Containers></EnumerationResults>";
    let (base, handle) = serve_once(200, body);

    let acquisition = acquire(&cloud("azure", &base, "acct", "c2VjcmV0"), &AcquireOptions::default()).unwrap();
    let captured = handle.join().unwrap();

    assert_eq!(containers(acquisition), vec!["landing".to_string()]);
    assert_eq!(captured.url, "/?comp=list");
    assert!(captured.header("authorization").unwrap().starts_with("SharedKey acct:"));
    assert!(captured.header("x-ms-version").is_some());
}

#[test]
fn gcs_listing_uses_bearer_token() {
    let body = r#"{"kind":"storage#buckets","items":[{"name":"warehouse"}]}"#;
    let (base, handle) = serve_once(200, body);

    let acquisition = acquire(&cloud("GCS", &base, "my-project", "ya29.token"), &AcquireOptions::default()).unwrap();
    let captured = handle.join().unwrap();

    assert_eq!(containers(acquisition), vec!["warehouse".to_string()]);
    assert_eq!(captured.url, "/storage/v1/b?project=my-project");
    assert_eq!(captured.header("authorization"), Some("Bearer ya29.token"));
}

#[derive(serde::Deserialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
}

#[test]
fn gcs_service_account_key_mints_a_token_before_listing() {
    let (base, handle) = serve_sequence(vec![
        (200, r#"{"access_token":"minted-token","expires_in":3599,"token_type":"Bearer"}"#.to_string()),
        (200, r#"{"items":[{"name":"archive"}]}"#.to_string()),
    ]);
    let dir = tempfile::tempdir().unwrap();
    let key_path = dir.path().join("service-account.json");
    let key = serde_json::json!({
        "type": "service_account",
        "project_id": "sa-project",
        "client_email": "loader@sa-project.iam.gserviceaccount.com",
        "private_key": std::fs::read_to_string("tests/fixtures/gcs_test_key.pem").unwrap(),
        "token_uri": format!("{base}/token"),
    });
    std::fs::write(&key_path, key.to_string()).unwrap();

    let descriptor = cloud("gcp", &base, key_path.to_str().unwrap(), "");
    let acquisition = acquire(&descriptor, &AcquireOptions::default()).unwrap();
    let requests = handle.join().unwrap();

    assert_eq!(containers(acquisition), vec!["archive".to_string()]);
    let (token_request, list_request) = (&requests[0], &requests[1]);
    assert_eq!(token_request.method, "POST");
    assert_eq!(token_request.url, "/token");
    assert!(token_request
        .body
        .contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer"));

    let assertion = token_request
        .body
        .split('&')
        .find_map(|pair| pair.strip_prefix("assertion="))
        .unwrap();
    let assertion = urlencoding::decode(assertion).unwrap();
    let public_key = std::fs::read("tests/fixtures/gcs_test_key.pub.pem").unwrap();
    let mut validation = jsonwebtoken::Validation::new(jsonwebtoken::Algorithm::RS256);
    validation.set_audience(&[format!("{base}/token")]);
    let claims = jsonwebtoken::decode::<AssertionClaims>(
        &assertion,
        &jsonwebtoken::DecodingKey::from_rsa_pem(&public_key).unwrap(),
        &validation,
    )
    .unwrap()
    .claims;
    assert_eq!(claims.iss, "loader@sa-project.iam.gserviceaccount.com");
    assert!(claims.scope.contains("devstorage"));

    assert_eq!(list_request.url, "/storage/v1/b?project=sa-project");
    assert_eq!(list_request.header("authorization"), Some("Bearer minted-token"));
}

#[test]
fn gcs_token_rejection_is_connection_error() {
    let (base, handle) = serve_once(400, r#"{"error":"invalid_grant"}"#);
    let dir = tempfile::tempdir().unwrap();
    let key_path = dir.path().join("key.json");
    let key = serde_json::json!({
        "project_id": "p",
        "client_email": "svc@p.iam.gserviceaccount.com",
        "private_key": std::fs::read_to_string("tests/fixtures/gcs_test_key.pem").unwrap(),
        "token_uri": format!("{base}/token"),
    });
    std::fs::write(&key_path, key.to_string()).unwrap();

    let err = acquire(&cloud("gcs", &base, key_path.to_str().unwrap(), ""), &AcquireOptions::default()).unwrap_err();
    handle.join().unwrap();
    match err {
        AcquisitionError::ConnectionError { message, .. } => {
            assert!(message.contains("token exchange failed"));
            assert!(message.contains("400"));
        }
        other => panic!("expected ConnectionError, got {other:?}"),
    }
}

#[test]
fn cloud_auth_rejection_is_connection_error_without_secret() {
    let (base, handle) = serve_once(403, "<Error><Code>AccessDenied</Code></Error>");
    let err = acquire(&cloud("s3", &base, "AKID", "topsecret"), &AcquireOptions::default()).unwrap_err();
    handle.join().unwrap();

    match err {
        AcquisitionError::ConnectionError { target, message } => {
            assert!(message.contains("403"));
            assert!(!target.contains("topsecret"));
        }
        other => panic!("expected ConnectionError, got {other:?}"),
    }
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

struct RecordingDriver(Arc<Recorder>);

struct RecordingSession(Arc<Recorder>);

impl DatabaseDriver for RecordingDriver {
    fn open(&self, target: &DatabaseTarget) -> Result<Box<dyn DatabaseSession>, String> {
        self.0.events.lock().unwrap().push(format!("open {}", target.redacted()));
        Ok(Box::new(RecordingSession(Arc::clone(&self.0))))
    }
}

impl DatabaseSession for RecordingSession {
    fn ping(&mut self) -> Result<(), String> {
        self.0.events.lock().unwrap().push("ping".to_string());
        Err("server closed the connection unexpectedly".to_string())
    }

    fn close(&mut self) {
        self.0.events.lock().unwrap().push("close".to_string());
    }
}

#[test]
fn database_probe_releases_session_when_ping_fails() {
    let recorder = Arc::new(Recorder::default());
    let opts = AcquireOptions {
        database_driver: Some(Arc::new(RecordingDriver(Arc::clone(&recorder)))),
        ..Default::default()
    };
    let descriptor = SourceDescriptor::Database {
        engine: "PostgreSQL".to_string(),
        host: "db.internal".to_string(),
        port: 5432,
        credentials: DatabaseCredentials::new("etl", "s3cr3t"),
        database_name: "warehouse".to_string(),
    };

    let err = acquire(&descriptor, &opts).unwrap_err();
    assert!(matches!(err, AcquisitionError::ConnectionError { .. }));
    assert!(!err.to_string().contains("s3cr3t"));
    assert_eq!(
        *recorder.events.lock().unwrap(),
        vec![
            "open postgresql://etl@db.internal:5432/warehouse".to_string(),
            "ping".to_string(),
            "close".to_string(),
        ]
    );
}
