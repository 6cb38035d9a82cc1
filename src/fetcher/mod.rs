//! Image fetcher: downloads caller-supplied image URLs with bounded time and size

use bytes::{Bytes, BytesMut};
use reqwest::{header::CONTENT_TYPE, Client};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Settings;
use crate::error::{FetchError, ServiceError};

/// Fetcher configuration
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Total time allowed for connect, headers and body
    pub timeout: Duration,
    /// Maximum accepted body size in bytes
    pub max_bytes: usize,
    /// User-Agent sent upstream
    pub user_agent: String,
}

impl FetcherConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            timeout: settings.fetch_timeout(),
            max_bytes: settings.max_image_bytes,
            user_agent: format!("{}/{}", settings.service_name, env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Raw image bytes as served upstream
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Bytes,
    /// Upstream `Content-Type`, informational only
    pub content_type: Option<String>,
}

/// HTTP image fetcher sharing one pooled client. Never retries.
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    config: FetcherConfig,
    http_client: Client,
}

impl ImageFetcher {
    /// Create a new fetcher
    pub fn new(config: FetcherConfig) -> crate::error::Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| ServiceError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        info!(
            "Initialized image fetcher (timeout={}s, max_bytes={})",
            config.timeout.as_secs(),
            config.max_bytes
        );

        Ok(Self { config, http_client })
    }

    /// Download the image at `url`
    pub async fn fetch(&self, url: &Url) -> Result<FetchedImage, FetchError> {
        debug!("Fetching image from {}", url);

        let mut response = self
            .http_client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| self.classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Upstream returned {} for {}", status, url);
            return Err(FetchError::UpstreamStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let too_large = || FetchError::TooLarge {
            url: url.to_string(),
            max_bytes: self.config.max_bytes,
        };

        let declared = response.content_length();
        if declared.is_some_and(|len| len > self.config.max_bytes as u64) {
            return Err(too_large());
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let capacity = declared.map_or(0, |len| len as usize);
        let mut buf = BytesMut::with_capacity(capacity);
        while let Some(chunk) = response.chunk().await.map_err(|e| self.classify(url, e))? {
            if buf.len() + chunk.len() > self.config.max_bytes {
                return Err(too_large());
            }
            buf.extend_from_slice(&chunk);
        }

        if buf.is_empty() {
            return Err(FetchError::EmptyBody { url: url.to_string() });
        }

        debug!(
            "Fetched {} bytes from {} ({})",
            buf.len(),
            url,
            content_type.as_deref().unwrap_or("no content type")
        );

        Ok(FetchedImage {
            bytes: buf.freeze(),
            content_type,
        })
    }

    fn classify(&self, url: &Url, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                secs: self.config.timeout.as_secs(),
            }
        } else {
            FetchError::Network {
                url: url.to_string(),
                source: err,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn fetcher(timeout: Duration, max_bytes: usize) -> ImageFetcher {
        ImageFetcher::new(FetcherConfig {
            timeout,
            max_bytes,
            user_agent: "embeddings-service-test".to_string(),
        })
        .unwrap()
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    /// One-shot HTTP server answering with a chunked body and no Content-Length
    async fn chunked_server(chunks: usize, chunk_len: usize) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;

            let mut response = Vec::new();
            response.extend_from_slice(
                b"HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nTransfer-Encoding: chunked\r\n\r\n",
            );
            for _ in 0..chunks {
                response.extend_from_slice(format!("{:x}\r\n", chunk_len).as_bytes());
                response.extend(std::iter::repeat(7u8).take(chunk_len));
                response.extend_from_slice(b"\r\n");
            }
            response.extend_from_slice(b"0\r\n\r\n");
            let _ = socket.write_all(&response).await;
            let _ = socket.flush().await;
        });
        addr
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/default.jpg")
            .with_status(200)
            .with_header("content-type", "image/jpeg")
            .with_body(vec![1u8, 2, 3, 4])
            .create_async()
            .await;

        let image = fetcher(Duration::from_secs(5), 1024)
            .fetch(&url(&format!("{}/default.jpg", server.url())))
            .await
            .unwrap();

        assert_eq!(&image.bytes[..], &[1, 2, 3, 4]);
        assert_eq!(image.content_type.as_deref(), Some("image/jpeg"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_non_success_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/missing.jpg")
            .with_status(404)
            .create_async()
            .await;

        let err = fetcher(Duration::from_secs(5), 1024)
            .fetch(&url(&format!("{}/missing.jpg", server.url())))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::UpstreamStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_fetch_too_large() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/huge.png")
            .with_status(200)
            .with_body(vec![0u8; 4096])
            .create_async()
            .await;

        let err = fetcher(Duration::from_secs(5), 1024)
            .fetch(&url(&format!("{}/huge.png", server.url())))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::TooLarge { max_bytes: 1024, .. }));
    }

    #[tokio::test]
    async fn test_fetch_streamed_body_over_cap() {
        let addr = chunked_server(8, 512).await;

        let err = fetcher(Duration::from_secs(5), 1024)
            .fetch(&url(&format!("http://{}/stream.png", addr)))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::TooLarge { max_bytes: 1024, .. }));
    }

    #[tokio::test]
    async fn test_fetch_streamed_body_under_cap() {
        let addr = chunked_server(3, 100).await;

        let image = fetcher(Duration::from_secs(5), 1024)
            .fetch(&url(&format!("http://{}/stream.png", addr)))
            .await
            .unwrap();

        assert_eq!(image.bytes.len(), 300);
        assert_eq!(image.content_type.as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn test_fetch_empty_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/empty.png")
            .with_status(200)
            .create_async()
            .await;

        let err = fetcher(Duration::from_secs(5), 1024)
            .fetch(&url(&format!("{}/empty.png", server.url())))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::EmptyBody { .. }));
    }

    #[tokio::test]
    async fn test_fetch_unreachable() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = fetcher(Duration::from_secs(5), 1024)
            .fetch(&url(&format!("http://{}/a.png", addr)))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Network { .. }));
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        // Accepts connections but never answers
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let err = fetcher(Duration::from_millis(200), 1024)
            .fetch(&url(&format!("http://{}/slow.png", addr)))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Timeout { .. }));
    }
}
