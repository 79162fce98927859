//! Web source: a blocking HTTP GET that succeeds only on `200 OK`.

use log::debug;
use reqwest::StatusCode;
use reqwest::blocking::Client;

use crate::error::{AcquisitionError, AcquisitionResult};

/// What a successful GET returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebResponse {
    pub status: u16,
    pub body_len: usize,
}

/// GET `url` and require HTTP 200.
///
/// Transport failures (DNS, refused connection, TLS) map to [`AcquisitionError::ConnectionError`];
/// a response with any other status maps to [`AcquisitionError::UnexpectedStatus`].
pub fn probe_web(url: &str, user_agent: &str) -> AcquisitionResult<WebResponse> {
    let client = Client::builder()
        .user_agent(user_agent)
        .build()
        .map_err(|e| AcquisitionError::connection(url, e.to_string()))?;

    debug!("GET {url}");
    let response = client
        .get(url)
        .send()
        .map_err(|e| AcquisitionError::connection(url, e.to_string()))?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(AcquisitionError::UnexpectedStatus {
            url: url.to_string(),
            code: status.as_u16(),
        });
    }

    let body = response
        .bytes()
        .map_err(|e| AcquisitionError::connection(url, e.to_string()))?;
    Ok(WebResponse {
        status: status.as_u16(),
        body_len: body.len(),
    })
}
