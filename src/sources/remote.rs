use crate::error::{AppError, SourceKind};
use crate::sources::{HourlyPrediction, PredictionSource, PredictionTarget};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::debug;

const API_VERSION: &str = "1.0";

/// Prediction model reached over plain HTTP/1.1.
pub struct RemotePredictionSource {
    endpoint: String,
    timeout: Duration,
}

impl RemotePredictionSource {
    pub fn new(endpoint: String, timeout: Duration) -> Self {
        Self { endpoint, timeout }
    }
}

impl fmt::Debug for RemotePredictionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemotePredictionSource")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl PredictionSource for RemotePredictionSource {
    async fn fetch_prediction(
        &self,
        garage_id: &str,
        target: PredictionTarget,
    ) -> Result<Vec<f64>, AppError> {
        let request = PredictRequest {
            api_version: API_VERSION,
            garage_id,
            target: target.to_string(),
        };
        let payload = serde_json::to_string(&request).map_err(RemoteError::Json)?;
        let endpoint = self.endpoint.clone();
        let timeout = self.timeout;

        debug!(garage_id, %target, endpoint = %endpoint, "Requesting remote prediction");
        let body = tokio::task::spawn_blocking(move || send_http_json(&endpoint, &payload, timeout))
            .await
            .map_err(|err| RemoteError::Task(err.to_string()))??;

        let response: HourlyPrediction = serde_json::from_str(&body).map_err(RemoteError::Json)?;
        Ok(response.hourly_values)
    }
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    api_version: &'static str,
    garage_id: &'a str,
    target: String,
}

#[derive(Debug)]
enum RemoteError {
    InvalidUrl(String),
    Dns(String),
    Connect(std::io::Error),
    Io(std::io::Error),
    Http(u16, String),
    Json(serde_json::Error),
    Task(String),
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteError::InvalidUrl(msg) => write!(f, "invalid url: {msg}"),
            RemoteError::Dns(msg) => write!(f, "dns error: {msg}"),
            RemoteError::Connect(err) => write!(f, "connect error: {err}"),
            RemoteError::Io(err) => write!(f, "io error: {err}"),
            RemoteError::Http(code, body) => {
                write!(f, "http status {code} ({})", body.trim())
            }
            RemoteError::Json(err) => write!(f, "json error: {err}"),
            RemoteError::Task(msg) => write!(f, "request task failed: {msg}"),
        }
    }
}

impl From<RemoteError> for AppError {
    fn from(err: RemoteError) -> Self {
        AppError::unavailable(SourceKind::Prediction, err.to_string())
    }
}

#[derive(Debug, PartialEq, Eq)]
struct ParsedUrl {
    host: String,
    port: u16,
    path: String,
}

fn parse_http_url(endpoint: &str) -> Result<ParsedUrl, RemoteError> {
    let trimmed = endpoint
        .strip_prefix("http://")
        .ok_or_else(|| RemoteError::InvalidUrl("only http:// supported".to_string()))?;

    let mut parts = trimmed.splitn(2, '/');
    let host_port = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| RemoteError::InvalidUrl("missing host".to_string()))?;
    let path = match parts.next() {
        Some(path) if !path.is_empty() => format!("/{path}"),
        _ => "/".to_string(),
    };

    let mut host_parts = host_port.splitn(2, ':');
    let host = host_parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| RemoteError::InvalidUrl("missing host".to_string()))?;
    let port = match host_parts.next() {
        Some(port_str) if !port_str.is_empty() => port_str
            .parse::<u16>()
            .map_err(|_| RemoteError::InvalidUrl("invalid port".to_string()))?,
        _ => 80,
    };

    Ok(ParsedUrl {
        host: host.to_string(),
        port,
        path,
    })
}

fn send_http_json(endpoint: &str, body: &str, timeout: Duration) -> Result<String, RemoteError> {
    let parsed = parse_http_url(endpoint)?;
    let addr = (parsed.host.as_str(), parsed.port)
        .to_socket_addrs()
        .map_err(|err| RemoteError::Dns(err.to_string()))?
        .next()
        .ok_or_else(|| RemoteError::Dns("no addresses resolved".to_string()))?;

    let mut stream = TcpStream::connect_timeout(&addr, timeout).map_err(RemoteError::Connect)?;
    stream
        .set_read_timeout(Some(timeout))
        .map_err(RemoteError::Io)?;
    stream
        .set_write_timeout(Some(timeout))
        .map_err(RemoteError::Io)?;

    let request = format!(
        "POST {} HTTP/1.1\r\nHost: {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        parsed.path,
        parsed.host,
        body.len(),
        body
    );

    stream
        .write_all(request.as_bytes())
        .map_err(RemoteError::Io)?;

    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .map_err(RemoteError::Io)?;

    let (headers, body) = response
        .split_once("\r\n\r\n")
        .ok_or_else(|| RemoteError::Http(0, "invalid http response".to_string()))?;

    let status_code = headers
        .lines()
        .next()
        .and_then(|status_line| status_line.split_whitespace().nth(1))
        .ok_or_else(|| RemoteError::Http(0, "missing status code".to_string()))?
        .parse::<u16>()
        .map_err(|_| RemoteError::Http(0, "invalid status code".to_string()))?;

    let chunked = headers.lines().skip(1).any(|line| {
        line.split_once(':').is_some_and(|(name, value)| {
            name.trim().eq_ignore_ascii_case("transfer-encoding")
                && value.to_ascii_lowercase().contains("chunked")
        })
    });
    let body = if chunked {
        decode_chunked(body)?
    } else {
        body.to_string()
    };

    if status_code >= 400 {
        return Err(RemoteError::Http(status_code, body));
    }

    Ok(body)
}

/// Joins a `Transfer-Encoding: chunked` body. Chunk extensions and trailers
/// are ignored.
fn decode_chunked(mut rest: &str) -> Result<String, RemoteError> {
    let mut decoded = String::new();
    loop {
        let (size_line, after) = rest
            .split_once("\r\n")
            .ok_or_else(|| RemoteError::Http(0, "truncated chunked body".to_string()))?;
        let size_hex = size_line.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size_hex, 16)
            .map_err(|_| RemoteError::Http(0, format!("invalid chunk size {size_hex:?}")))?;
        if size == 0 {
            return Ok(decoded);
        }
        let chunk = after
            .get(..size)
            .ok_or_else(|| RemoteError::Http(0, "truncated chunked body".to_string()))?;
        decoded.push_str(chunk);
        rest = after[size..].strip_prefix("\r\n").unwrap_or(&after[size..]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread::JoinHandle;

    /// Serves one canned response and returns the request body it received.
    fn serve_once(status_line: &'static str, body: String) -> std::io::Result<(String, JoinHandle<String>)> {
        let response = format!(
            "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        serve_raw(response)
    }

    fn serve_raw(response: String) -> std::io::Result<(String, JoinHandle<String>)> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let endpoint = format!("http://{}/predict", listener.local_addr()?);
        let handle = std::thread::spawn(move || {
            let Ok((mut stream, _)) = listener.accept() else {
                return String::new();
            };
            let request = read_request(&mut stream);
            let _ = stream.write_all(response.as_bytes());
            request
        });
        Ok((endpoint, handle))
    }

    fn read_request(stream: &mut TcpStream) -> String {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 512];
        loop {
            let text = String::from_utf8_lossy(&buffer).to_string();
            if let Some((headers, body)) = text.split_once("\r\n\r\n") {
                let expected = headers
                    .lines()
                    .find_map(|line| line.strip_prefix("Content-Length: "))
                    .and_then(|value| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if body.len() >= expected {
                    return body.to_string();
                }
            }
            match stream.read(&mut chunk) {
                Ok(0) | Err(_) => return String::new(),
                Ok(read) => buffer.extend_from_slice(&chunk[..read]),
            }
        }
    }

    #[test]
    fn parse_http_url_defaults_port_and_path() {
        let parsed = parse_http_url("http://predictor.local").expect("valid url");

        assert_eq!(
            parsed,
            ParsedUrl {
                host: "predictor.local".to_string(),
                port: 80,
                path: "/".to_string(),
            }
        );
    }

    #[test]
    fn parse_http_url_rejects_https_and_bad_ports() {
        assert!(matches!(
            parse_http_url("https://predictor.local/predict"),
            Err(RemoteError::InvalidUrl(_))
        ));
        assert!(matches!(
            parse_http_url("http://predictor.local:99999/predict"),
            Err(RemoteError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn fetch_prediction_posts_target_and_reads_hourly_values()
    -> Result<(), Box<dyn std::error::Error>> {
        let values: Vec<f64> = (0..24).map(|hour| 10.0 + hour as f64).collect();
        let body = serde_json::json!({ "hourly_values": values }).to_string();
        let (endpoint, server) = serve_once("HTTP/1.1 200 OK", body)?;
        let source = RemotePredictionSource::new(endpoint, Duration::from_secs(2));

        let prediction = source
            .fetch_prediction("south", PredictionTarget::Tomorrow)
            .await?;
        let request = server.join().expect("server thread");

        assert_eq!(prediction, values);
        let request: serde_json::Value = serde_json::from_str(&request)?;
        assert_eq!(
            request,
            serde_json::json!({
                "api_version": "1.0",
                "garage_id": "south",
                "target": "tomorrow"
            })
        );
        Ok(())
    }

    #[tokio::test]
    async fn chunked_response_is_reassembled() -> Result<(), Box<dyn std::error::Error>> {
        let values = vec![25.0; 24];
        let body = serde_json::json!({ "hourly_values": values }).to_string();
        let (head, tail) = body.split_at(10);
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n{:x}\r\n{head}\r\n{:x};ext=1\r\n{tail}\r\n0\r\n\r\n",
            head.len(),
            tail.len()
        );
        let (endpoint, server) = serve_raw(response)?;
        let source = RemotePredictionSource::new(endpoint, Duration::from_secs(2));

        let prediction = source
            .fetch_prediction("north", PredictionTarget::Tomorrow)
            .await?;
        let _ = server.join();

        assert_eq!(prediction, values);
        Ok(())
    }

    #[test]
    fn truncated_chunk_is_rejected() {
        assert!(matches!(
            decode_chunked("a\r\nshort"),
            Err(RemoteError::Http(0, _))
        ));
        assert!(matches!(
            decode_chunked("zz\r\n"),
            Err(RemoteError::Http(0, _))
        ));
    }

    #[tokio::test]
    async fn http_error_status_is_source_unavailable() -> Result<(), Box<dyn std::error::Error>> {
        let (endpoint, server) = serve_once(
            "HTTP/1.1 503 Service Unavailable",
            "{\"error\": \"model loading\"}".to_string(),
        )?;
        let source = RemotePredictionSource::new(endpoint, Duration::from_secs(2));

        let result = source
            .fetch_prediction("south", PredictionTarget::Tomorrow)
            .await;
        let _ = server.join();

        match result {
            Err(AppError::SourceUnavailable { kind, reason }) => {
                assert_eq!(kind, SourceKind::Prediction);
                assert!(reason.starts_with("http status 503"));
            }
            other => panic!("expected source unavailable, got {other:?}"),
        }
        Ok(())
    }
}
