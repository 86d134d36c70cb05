use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use tracing::debug;

use crate::error::FetchError;
use crate::registry::types::ResourceSpec;
use crate::registry::Registry;

/// Per-resource bounds on a single retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLimits {
    pub timeout_secs: u64,
    pub max_size_bytes: u64,
}

impl FetchLimits {
    pub fn for_spec(registry: &Registry, spec: &ResourceSpec) -> Self {
        Self {
            timeout_secs: registry.timeout_for(spec),
            max_size_bytes: registry.max_size_for(spec),
        }
    }
}

/// Outcome of one fetch attempt. Not persisted as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRecord {
    /// blake3 hex digest; `None` when the fetch failed.
    pub digest: Option<String>,
    pub byte_size: u64,
    /// Present iff the fetch did not succeed.
    pub error_detail: Option<String>,
}

impl FetchRecord {
    pub fn succeeded(&self) -> bool {
        self.error_detail.is_none()
    }

    fn failed(err: &FetchError) -> Self {
        Self {
            digest: None,
            byte_size: 0,
            error_detail: Some(err.to_string()),
        }
    }
}

/// A fetch record plus the retrieved bytes, when there are any.
pub struct Fetched {
    pub record: FetchRecord,
    pub content: Option<Vec<u8>>,
}

/// Transport seam: anything that can turn a location into bytes.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn retrieve(&self, location: &str, limits: FetchLimits) -> Result<Vec<u8>, FetchError>;
}

pub fn digest(content: &[u8]) -> String {
    blake3::hash(content).to_hex().to_string()
}

/// Bounded retrieval plus digest, shared by the detector and the downloader.
#[derive(Clone)]
pub struct ContentFetcher {
    source: Arc<dyn ContentSource>,
}

impl ContentFetcher {
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self { source }
    }

    pub async fn fetch(&self, spec: &ResourceSpec, limits: FetchLimits) -> Fetched {
        let result = self
            .source
            .retrieve(&spec.location, limits)
            .await
            .and_then(|content| {
                // Sources are not trusted to enforce the limit themselves.
                let size = content.len() as u64;
                if size > limits.max_size_bytes {
                    Err(FetchError::TooLarge {
                        size,
                        limit: limits.max_size_bytes,
                    })
                } else {
                    Ok(content)
                }
            });

        match result {
            Ok(content) => {
                let record = FetchRecord {
                    digest: Some(digest(&content)),
                    byte_size: content.len() as u64,
                    error_detail: None,
                };
                debug!(id = %spec.id, size = record.byte_size, "fetched");
                Fetched {
                    record,
                    content: Some(content),
                }
            }
            Err(e) => {
                debug!(id = %spec.id, error = %e, "fetch failed");
                Fetched {
                    record: FetchRecord::failed(&e),
                    content: None,
                }
            }
        }
    }
}

/// Production transport over reqwest.
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("resource-watch/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ContentSource for HttpSource {
    async fn retrieve(&self, location: &str, limits: FetchLimits) -> Result<Vec<u8>, FetchError> {
        let url = reqwest::Url::parse(location)
            .map_err(|_| FetchError::InvalidLocation(location.to_string()))?;
        let timeout = limits.timeout_secs;

        let resp = self
            .client
            .get(url)
            .timeout(Duration::from_secs(timeout))
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(e, timeout))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        // Reject early when the server announces an oversized body.
        if let Some(len) = resp.content_length() {
            if len > limits.max_size_bytes {
                return Err(FetchError::TooLarge {
                    size: len,
                    limit: limits.max_size_bytes,
                });
            }
        }

        let mut body = Vec::new();
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| FetchError::from_reqwest(e, timeout))?;
            body.extend_from_slice(&chunk);
            if body.len() as u64 > limits.max_size_bytes {
                return Err(FetchError::TooLarge {
                    size: body.len() as u64,
                    limit: limits.max_size_bytes,
                });
            }
        }

        Ok(body)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedSource;
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const LIMITS: FetchLimits = FetchLimits {
        timeout_secs: 5,
        max_size_bytes: 1024,
    };

    /// Serve exactly one HTTP response, optionally after a delay.
    async fn serve_once(status: &str, body: Vec<u8>, delay: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let head = format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status,
            body.len()
        );
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 2048];
            let _ = socket.read(&mut buf).await;
            tokio::time::sleep(delay).await;
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(&body).await;
            let _ = socket.shutdown().await;
        });
        format!("http://{}/a.txt", addr)
    }

    #[tokio::test]
    async fn test_http_success() {
        let url = serve_once("200 OK", b"hello".to_vec(), Duration::ZERO).await;
        let body = HttpSource::new()
            .unwrap()
            .retrieve(&url, LIMITS)
            .await
            .unwrap();
        assert_eq!(body, b"hello");
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let url = serve_once("404 Not Found", b"missing".to_vec(), Duration::ZERO).await;
        let err = HttpSource::new()
            .unwrap()
            .retrieve(&url, LIMITS)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status(404)));
    }

    #[tokio::test]
    async fn test_http_oversized_body() {
        let url = serve_once("200 OK", vec![b'x'; 2048], Duration::ZERO).await;
        let err = HttpSource::new()
            .unwrap()
            .retrieve(&url, LIMITS)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::TooLarge { limit: 1024, .. }));
    }

    #[tokio::test]
    async fn test_http_timeout() {
        let url = serve_once("200 OK", b"late".to_vec(), Duration::from_secs(3)).await;
        let limits = FetchLimits {
            timeout_secs: 1,
            max_size_bytes: 1024,
        };
        let err = HttpSource::new()
            .unwrap()
            .retrieve(&url, limits)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Timeout(1)));
    }

    #[test]
    fn test_digest_is_stable() {
        assert_eq!(digest(b"abc"), digest(b"abc"));
        assert_ne!(digest(b"abc"), digest(b"abd"));
        assert_eq!(digest(b"abc").len(), 64);
    }

    #[tokio::test]
    async fn test_fetcher_records_digest_and_size() {
        let source = Arc::new(ScriptedSource::new());
        source.respond("http://x/a.txt", &[7u8; 100]);
        let fetcher = ContentFetcher::new(source);

        let fetched = fetcher
            .fetch(&ResourceSpec::new("a", "http://x/a.txt"), LIMITS)
            .await;
        assert!(fetched.record.succeeded());
        assert_eq!(fetched.record.byte_size, 100);
        assert_eq!(fetched.record.digest, Some(digest(&[7u8; 100])));
        assert_eq!(fetched.content.map(|c| c.len()), Some(100));
    }

    #[tokio::test]
    async fn test_fetcher_enforces_limit_after_retrieval() {
        let source = Arc::new(ScriptedSource::new());
        source.respond("http://x/a.txt", &[1u8; 10]);
        let fetcher = ContentFetcher::new(source);
        let limits = FetchLimits {
            timeout_secs: 5,
            max_size_bytes: 9,
        };

        let fetched = fetcher
            .fetch(&ResourceSpec::new("a", "http://x/a.txt"), limits)
            .await;
        assert!(!fetched.record.succeeded());
        assert_eq!(fetched.record.digest, None);
        assert_eq!(fetched.record.byte_size, 0);
        assert!(fetched.content.is_none());
        assert!(fetched
            .record
            .error_detail
            .unwrap()
            .contains("size limit"));
    }
}
