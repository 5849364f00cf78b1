// HTTP readiness probe
// reason: reqwest for the HTTP GET, with a per-request timeout
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::trace;

use testbed_core::port::{ProbeError, ReadinessProbe};

/// One GET per probe; any 2xx/3xx answer (after redirects) counts as ready
pub struct HttpReadinessProbe {
    client: Client,
}

impl HttpReadinessProbe {
    /// Create a probe whose requests give up after `request_timeout`
    pub fn new(request_timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self { client })
    }
}

/// Only absolute http(s) URLs are probe targets
fn parse_target(url: &str) -> Result<Url, ProbeError> {
    let parsed =
        Url::parse(url).map_err(|e| ProbeError::MalformedTarget(format!("{}: {}", url, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(ProbeError::MalformedTarget(format!(
            "unsupported scheme '{}' in {}",
            other, url
        ))),
    }
}

#[async_trait]
impl ReadinessProbe for HttpReadinessProbe {
    async fn probe(&self, url: &str) -> Result<(), ProbeError> {
        let target = parse_target(url)?;

        let response = self
            .client
            .get(target)
            .send()
            .await
            .map_err(|e| ProbeError::NotReady(e.to_string()))?;

        trace!(status = %response.status(), "Probe response");
        response
            .error_for_status()
            .map(|_| ())
            .map_err(|e| ProbeError::NotReady(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answer a single request with `status`, return the base URL
    async fn serve_once(status: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                    status
                );
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });

        format!("http://{}/", addr)
    }

    fn probe() -> HttpReadinessProbe {
        HttpReadinessProbe::new(Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn test_ok_response_is_ready() {
        let url = serve_once("200 OK").await;
        tokio_test::assert_ok!(probe().probe(&url).await);
    }

    #[tokio::test]
    async fn test_error_status_is_not_ready() {
        let url = serve_once("503 Service Unavailable").await;
        let result = probe().probe(&url).await;
        assert!(matches!(result, Err(ProbeError::NotReady(_))));
    }

    #[tokio::test]
    async fn test_refused_connection_is_retryable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = probe().probe(&format!("http://{}/", addr)).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_malformed_targets_rejected() {
        for url in ["not a url", "ftp://127.0.0.1/", ""] {
            let err = probe().probe(url).await.unwrap_err();
            assert!(!err.is_retryable(), "{} should not be retried", url);
        }
    }
}
