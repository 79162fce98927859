#![allow(dead_code)]

use std::io::Read;
use std::thread::{self, JoinHandle};

use tiny_http::{Response, Server, StatusCode};

/// A request a test server received.
#[derive(Debug, Clone)]
pub struct Captured {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Captured {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Start a local HTTP server that answers exactly one request with `status` and `body`.
///
/// Returns the base URL (`http://127.0.0.1:<port>`) and a handle yielding the captured request.
pub fn serve_once(status: u16, body: &'static str) -> (String, JoinHandle<Captured>) {
    let (base, handle) = serve_sequence(vec![(status, body.to_string())]);
    let handle = thread::spawn(move || {
        handle
            .join()
            .expect("server thread")
            .pop()
            .expect("one request")
    });
    (base, handle)
}

/// Answer one request per entry of `responses`, in order, then stop.
pub fn serve_sequence(responses: Vec<(u16, String)>) -> (String, JoinHandle<Vec<Captured>>) {
    let server = Server::http("127.0.0.1:0").expect("bind test server");
    let addr = server.server_addr().to_ip().expect("tcp listener");
    let handle = thread::spawn(move || {
        let mut captured = Vec::with_capacity(responses.len());
        for (status, body) in responses {
            let mut request = server.recv().expect("receive request");
            let mut request_body = String::new();
            let _ = request.as_reader().read_to_string(&mut request_body);
            captured.push(Captured {
                method: request.method().to_string(),
                url: request.url().to_string(),
                headers: request
                    .headers()
                    .iter()
                    .map(|h| (h.field.to_string(), h.value.to_string()))
                    .collect(),
                body: request_body,
            });
            let _ = request.respond(Response::from_string(body).with_status_code(StatusCode(status)));
        }
        captured
    });
    (format!("http://{addr}"), handle)
}
