//! Cloud storage source: authenticate against a provider and list its top-level containers.
//!
//! - AWS: S3 `ListBuckets`, signed with Signature Version 4.
//! - Azure: Blob service `List Containers`, signed with SharedKey.
//! - GCP: Cloud Storage `buckets.list`, authorized with an OAuth bearer token. The token is either
//!   given directly or minted from a service-account JSON key (RS256 JWT bearer grant).
//!
//! Every provider honors [`CloudCredentials::endpoint`] so S3-compatible stores, Azurite, or a local
//! test server can stand in for the public endpoint.

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use log::debug;
use regex::Regex;
use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{AcquisitionError, AcquisitionResult};

type HmacSha256 = Hmac<Sha256>;

const AZURE_API_VERSION: &str = "2021-08-06";
const AWS_DEFAULT_REGION: &str = "us-east-1";
const GCS_SCOPE: &str = "https://www.googleapis.com/auth/devstorage.read_only";
const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

static NAME_ELEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<Name>([^<]*)</Name>").expect("valid <Name> pattern"));

/// Supported object-storage providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloudProvider {
    /// Amazon S3 (or any S3-compatible store).
    Aws,
    /// Azure Blob Storage.
    Azure,
    /// Google Cloud Storage.
    Gcp,
}

impl CloudProvider {
    /// Resolve a user-supplied provider name (case-insensitive).
    pub fn parse(name: &str) -> AcquisitionResult<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "aws" | "s3" | "amazon" => Ok(Self::Aws),
            "azure" | "blob" => Ok(Self::Azure),
            "gcp" | "gcs" | "google" => Ok(Self::Gcp),
            _ => Err(AcquisitionError::UnsupportedProvider {
                provider: name.to_string(),
            }),
        }
    }
}

impl fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Aws => "AWS",
            Self::Azure => "Azure",
            Self::Gcp => "GCP",
        })
    }
}

/// Provider credentials.
///
/// | provider | `access_key` | `secret_key` |
/// |---|---|---|
/// | AWS | access key id | secret access key |
/// | Azure | storage account name | base64 account key |
/// | GCP | service-account JSON key file | unused |
/// | GCP | project id | OAuth2 access token |
#[derive(Clone, PartialEq, Eq, Default)]
pub struct CloudCredentials {
    pub access_key: String,
    pub secret_key: String,
    /// AWS signing region; defaults to `us-east-1`.
    pub region: Option<String>,
    /// Base URL override (scheme + host [+ port] [+ path]).
    pub endpoint: Option<String>,
}

impl CloudCredentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            ..Default::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

impl fmt::Debug for CloudCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudCredentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Base URL the probe talks to (no credentials).
pub fn endpoint_for(provider: CloudProvider, credentials: &CloudCredentials) -> String {
    if let Some(endpoint) = &credentials.endpoint {
        return endpoint.trim_end_matches('/').to_string();
    }
    match provider {
        CloudProvider::Aws => "https://s3.amazonaws.com".to_string(),
        CloudProvider::Azure => format!("https://{}.blob.core.windows.net", credentials.access_key),
        CloudProvider::Gcp => "https://storage.googleapis.com".to_string(),
    }
}

/// Lists top-level containers (buckets) for a provider.
pub trait CloudStorageClient: Send + Sync {
    fn list_containers(&self, provider: CloudProvider, credentials: &CloudCredentials) -> Result<Vec<String>, String>;
}

/// Authenticate and list containers; failures become [`AcquisitionError::ConnectionError`].
pub fn probe_cloud(
    provider: CloudProvider,
    credentials: &CloudCredentials,
    client: &dyn CloudStorageClient,
) -> AcquisitionResult<Vec<String>> {
    let target = format!("{provider} {}", endpoint_for(provider, credentials));
    let containers = client
        .list_containers(provider, credentials)
        .map_err(|message| AcquisitionError::connection(&target, message))?;
    for name in &containers {
        debug!("{provider} container: {name}");
    }
    Ok(containers)
}

/// [`CloudStorageClient`] speaking each provider's REST API over a blocking HTTP client.
#[derive(Debug, Clone)]
pub struct HttpCloudClient {
    http: Client,
}

impl HttpCloudClient {
    pub fn new(user_agent: &str) -> Result<Self, String> {
        let http = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| e.to_string())?;
        Ok(Self { http })
    }

    fn list_s3_buckets(&self, credentials: &CloudCredentials, now: DateTime<Utc>) -> Result<Vec<String>, String> {
        let endpoint = endpoint_for(CloudProvider::Aws, credentials);
        let url = Url::parse(&format!("{endpoint}/")).map_err(|e| format!("invalid endpoint: {e}"))?;
        let host = host_header(&url)?;
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let payload_hash = hex(&Sha256::digest(b""));
        let region = credentials.region.as_deref().unwrap_or(AWS_DEFAULT_REGION);

        let authorization = sigv4_authorization(
            &SigV4Request {
                access_key: &credentials.access_key,
                secret_key: &credentials.secret_key,
                region,
                service: "s3",
                path: url.path(),
                query: "",
                headers: &[
                    ("host", host.as_str()),
                    ("x-amz-content-sha256", payload_hash.as_str()),
                    ("x-amz-date", amz_date.as_str()),
                ],
                payload_hash: &payload_hash,
            },
            &amz_date,
        )?;

        let request = self
            .http
            .get(url)
            .header("x-amz-date", &amz_date)
            .header("x-amz-content-sha256", &payload_hash)
            .header("authorization", authorization);
        let body = send(request)?;
        Ok(xml_names(&body))
    }

    fn list_azure_containers(&self, credentials: &CloudCredentials, now: DateTime<Utc>) -> Result<Vec<String>, String> {
        let endpoint = endpoint_for(CloudProvider::Azure, credentials);
        let url = Url::parse(&format!("{endpoint}/?comp=list")).map_err(|e| format!("invalid endpoint: {e}"))?;
        let ms_date = now.format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let resource = format!("/{}{}\ncomp:list", credentials.access_key, url.path());
        let authorization = azure_shared_key_authorization(
            &credentials.access_key,
            &credentials.secret_key,
            &ms_date,
            &resource,
        )?;

        let request = self
            .http
            .get(url)
            .header("x-ms-date", &ms_date)
            .header("x-ms-version", AZURE_API_VERSION)
            .header("authorization", authorization);
        let body = send(request)?;
        Ok(xml_names(&body))
    }

    fn list_gcs_buckets(&self, credentials: &CloudCredentials, now: DateTime<Utc>) -> Result<Vec<String>, String> {
        #[derive(Deserialize)]
        struct BucketList {
            #[serde(default)]
            items: Vec<Bucket>,
        }
        #[derive(Deserialize)]
        struct Bucket {
            name: String,
        }

        let (project, token) = match ServiceAccountKey::load(&credentials.access_key)? {
            Some(key) => {
                let project = key
                    .project_id
                    .clone()
                    .ok_or_else(|| "service account key has no project_id".to_string())?;
                (project, self.service_account_token(&key, now)?)
            }
            None => (credentials.access_key.clone(), credentials.secret_key.clone()),
        };

        let endpoint = endpoint_for(CloudProvider::Gcp, credentials);
        let mut url = Url::parse(&format!("{endpoint}/storage/v1/b")).map_err(|e| format!("invalid endpoint: {e}"))?;
        url.query_pairs_mut().append_pair("project", &project);

        let request = self.http.get(url).bearer_auth(&token);
        let body = send(request)?;
        let list: BucketList = serde_json::from_str(&body).map_err(|e| format!("invalid bucket list: {e}"))?;
        Ok(list.items.into_iter().map(|b| b.name).collect())
    }

    /// Exchange a signed JWT assertion for an access token at the key's `token_uri`.
    fn service_account_token(&self, key: &ServiceAccountKey, now: DateTime<Utc>) -> Result<String, String> {
        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
        }

        let assertion = jwt_assertion(key, now)?;
        let request = self
            .http
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())]);
        let body = send(request).map_err(|e| format!("token exchange failed: {e}"))?;
        let token: TokenResponse = serde_json::from_str(&body).map_err(|e| format!("invalid token response: {e}"))?;
        debug!("minted access token for {}", key.client_email);
        Ok(token.access_token)
    }
}

impl CloudStorageClient for HttpCloudClient {
    fn list_containers(&self, provider: CloudProvider, credentials: &CloudCredentials) -> Result<Vec<String>, String> {
        match provider {
            CloudProvider::Aws => self.list_s3_buckets(credentials, Utc::now()),
            CloudProvider::Azure => self.list_azure_containers(credentials, Utc::now()),
            CloudProvider::Gcp => self.list_gcs_buckets(credentials, Utc::now()),
        }
    }
}

/// Send a request and return the body of a 2xx response.
fn send(request: RequestBuilder) -> Result<String, String> {
    let response = request.send().map_err(|e| e.to_string())?;
    let status = response.status();
    let body = response.text().map_err(|e| e.to_string())?;
    if !status.is_success() {
        let snippet: String = body.chars().take(200).collect();
        return Err(format!("HTTP {}: {snippet}", status.as_u16()));
    }
    Ok(body)
}

fn host_header(url: &Url) -> Result<String, String> {
    let host = url.host_str().ok_or_else(|| "endpoint has no host".to_string())?;
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

/// Extract `<Name>..</Name>` values from an S3 or Azure listing.
fn xml_names(body: &str) -> Vec<String> {
    NAME_ELEMENT
        .captures_iter(body)
        .filter_map(|c| c.get(1))
        .map(|m| unescape_xml(m.as_str()))
        .collect()
}

/// The fields of a Google service-account key file used to mint tokens.
#[derive(Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
    project_id: Option<String>,
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    /// `None` when `access_key` does not name a file, so it is treated as a project id.
    fn load(access_key: &str) -> Result<Option<Self>, String> {
        let path = Path::new(access_key);
        if access_key.is_empty() || !path.is_file() {
            return Ok(None);
        }
        let text = fs::read_to_string(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| format!("invalid service account key {}: {e}", path.display()))
    }
}

#[derive(Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

fn jwt_assertion(key: &ServiceAccountKey, now: DateTime<Utc>) -> Result<String, String> {
    let iat = now.timestamp();
    let claims = JwtClaims {
        iss: &key.client_email,
        scope: GCS_SCOPE,
        aud: &key.token_uri,
        iat,
        exp: iat + 3600,
    };
    let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| format!("invalid service account private key: {e}"))?;
    jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &signing_key)
        .map_err(|e| format!("cannot sign token request: {e}"))
}

/// Decode the predefined XML entities; `&amp;` goes last so `&amp;lt;` stays `&lt;`.
fn unescape_xml(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn hmac_sha256(key: &[u8], message: &[u8]) -> Result<Vec<u8>, String> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| e.to_string())?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Inputs to a SigV4 signature. `headers` must be lowercase and sorted by name.
struct SigV4Request<'a> {
    access_key: &'a str,
    secret_key: &'a str,
    region: &'a str,
    service: &'a str,
    path: &'a str,
    query: &'a str,
    headers: &'a [(&'a str, &'a str)],
    payload_hash: &'a str,
}

fn sigv4_authorization(req: &SigV4Request<'_>, amz_date: &str) -> Result<String, String> {
    let date = amz_date.get(..8).ok_or_else(|| "malformed x-amz-date".to_string())?;
    let canonical_headers: String = req
        .headers
        .iter()
        .map(|(name, value)| format!("{name}:{}\n", value.trim()))
        .collect();
    let signed_headers = req
        .headers
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(";");
    let canonical_request = format!(
        "GET\n{}\n{}\n{canonical_headers}\n{signed_headers}\n{}",
        req.path, req.query, req.payload_hash
    );
    let scope = format!("{date}/{}/{}/aws4_request", req.region, req.service);
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{amz_date}\n{scope}\n{}",
        hex(&Sha256::digest(canonical_request.as_bytes()))
    );

    let k_date = hmac_sha256(format!("AWS4{}", req.secret_key).as_bytes(), date.as_bytes())?;
    let k_region = hmac_sha256(&k_date, req.region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, req.service.as_bytes())?;
    let k_signing = hmac_sha256(&k_service, b"aws4_request")?;
    let signature = hex(&hmac_sha256(&k_signing, string_to_sign.as_bytes())?);

    Ok(format!(
        "AWS4-HMAC-SHA256 Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
        req.access_key
    ))
}

fn azure_shared_key_authorization(
    account: &str,
    account_key_b64: &str,
    ms_date: &str,
    canonical_resource: &str,
) -> Result<String, String> {
    let key = BASE64
        .decode(account_key_b64.trim())
        .map_err(|e| format!("account key is not valid base64: {e}"))?;
    // Verb, then the eleven standard headers (all empty for a bodiless GET).
    let string_to_sign = format!(
        "GET\n{}x-ms-date:{ms_date}\nx-ms-version:{AZURE_API_VERSION}\n{canonical_resource}",
        "\n".repeat(11)
    );
    let signature = BASE64.encode(hmac_sha256(&key, string_to_sign.as_bytes())?);
    Ok(format!("SharedKey {account}:{signature}"))
}
