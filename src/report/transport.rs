//! HTTP transport for the drafting service.

use std::time::Duration;

use crate::error::ReportError;

/// A JSON POST request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Sends requests to the drafting service.
pub trait Transport {
    /// Perform the request. Only failures to get any response are errors;
    /// non-success statuses come back as a normal [`HttpResponse`].
    fn post(&self, request: &HttpRequest) -> Result<HttpResponse, ReportError>;
}

/// Blocking HTTP client backed by `ureq`.
///
/// The API key travels only in the request headers.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn post(&self, request: &HttpRequest) -> Result<HttpResponse, ReportError> {
        let _scope = crate::perf::scope("report.post");
        let mut call = self.agent.post(&request.url).timeout(request.timeout);
        for (name, value) in &request.headers {
            call = call.set(name, value);
        }

        let (status, response) = match call.send_string(&request.body) {
            Ok(response) => (response.status(), response),
            Err(ureq::Error::Status(status, response)) => (status, response),
            Err(ureq::Error::Transport(err)) => {
                return Err(ReportError::Transport(err.to_string()));
            }
        };
        let body = response
            .into_string()
            .map_err(|err| ReportError::Transport(format!("read response body: {err}")))?;

        tracing::debug!(status, bytes = body.len(), "service responded");
        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread;

    use super::*;

    /// Serve one request with `reply` and hand back what was received.
    fn serve_once(reply: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/api/v1/chat/completions", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut head = String::new();
            let mut length = 0;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                    length = value.trim().parse().unwrap();
                }
                head.push_str(&line);
                if line == "\r\n" || line.is_empty() {
                    break;
                }
            }
            let mut body = vec![0; length];
            reader.read_exact(&mut body).unwrap();
            reader.get_mut().write_all(reply.as_bytes()).unwrap();
            head + &String::from_utf8(body).unwrap()
        });
        (url, handle)
    }

    fn request(url: String) -> HttpRequest {
        HttpRequest {
            url,
            headers: vec![("Authorization".to_string(), "Bearer sk-test".to_string())],
            body: "{\"model\":\"m\"}".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_post_sends_headers_and_body() {
        let (url, server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 11\r\nConnection: close\r\n\r\n{\"ok\":true}",
        );
        let response = UreqTransport::new().post(&request(url)).unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "{\"ok\":true}");
        assert!(response.is_success());

        let received = server.join().unwrap();
        assert!(received.starts_with("POST /api/v1/chat/completions"));
        assert!(received.contains("Bearer sk-test"));
        assert!(received.ends_with("{\"model\":\"m\"}"));
    }

    #[test]
    fn test_error_status_is_a_response() {
        let (url, server) = serve_once(
            "HTTP/1.1 401 Unauthorized\r\nContent-Length: 13\r\nConnection: close\r\n\r\nbad api key\r\n",
        );
        let response = UreqTransport::new().post(&request(url)).unwrap();
        assert_eq!(response.status, 401);
        assert_eq!(response.body, "bad api key\r\n");
        assert!(!response.is_success());
        server.join().unwrap();
    }

    #[test]
    fn test_unreachable_host_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        drop(listener);
        assert!(matches!(
            UreqTransport::new().post(&request(url)),
            Err(ReportError::Transport(_))
        ));
    }
}
