//! The authenticated session: connection pooling, retry/backoff, range GETs.

use crate::credentials::CredentialProvider;
use crate::{Error, Result};
use bytes::Bytes;
use futures::Stream;
use reqwest::{Client, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Default per-request timeout, per spec §4.2.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum number of attempts (the first try plus up to two retries).
const MAX_ATTEMPTS: u32 = 3;

/// Initial backoff before the first retry.
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Information returned by a `HEAD` request.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadInfo {
    /// `Content-Length`, if the server sent one. Callers must fall back to a
    /// single streaming `GET` when this is `None` (spec §4.5 step 2).
    pub content_length: Option<u64>,
    /// True if the server advertised byte-range support via `Accept-Ranges`.
    pub accepts_ranges: bool,
}

/// An authenticated HTTP session with a shared connection pool.
///
/// Cheap to clone: `reqwest::Client` is an `Arc` handle internally, and the
/// credential provider is already behind one.
#[derive(Clone)]
pub struct Session {
    client: Client,
    user_agent: String,
    credentials: Option<Arc<dyn CredentialProvider>>,
}

impl Session {
    /// Creates a builder for configuring a session.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    /// Issues a `HEAD` request, used before a V1 parallel-range download to learn
    /// the total content size (spec §4.5 step 2).
    pub async fn head(&self, url: &str) -> Result<HeadInfo> {
        let response = self.execute_with_retry(url, reqwest::Method::HEAD, None).await?;
        let content_length = response.content_length();
        let accepts_ranges = response
            .headers()
            .get(reqwest::header::ACCEPT_RANGES)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.eq_ignore_ascii_case("bytes"))
            .unwrap_or(false);
        Ok(HeadInfo {
            content_length,
            accepts_ranges,
        })
    }

    /// Issues a `GET`, optionally with a `Range: bytes=start-end` header, and
    /// returns the response body as a stream of chunks.
    pub async fn get_stream(
        &self,
        url: &str,
        range: Option<(u64, u64)>,
    ) -> Result<impl Stream<Item = std::result::Result<Bytes, reqwest::Error>> + use<>> {
        let response = self.execute_with_retry(url, reqwest::Method::GET, range).await?;
        Ok(response.bytes_stream())
    }

    /// Issues a `GET` and buffers the entire body. Used for metadata endpoints
    /// whose responses are small JSON documents.
    pub async fn get_bytes(&self, url: &str) -> Result<Bytes> {
        let response = self.execute_with_retry(url, reqwest::Method::GET, None).await?;
        response.bytes().await.map_err(|source| Error::Http {
            url: url.to_string(),
            source,
        })
    }

    /// Issues a ranged `GET` and buffers the body, checking the returned length
    /// matches the requested range exactly.
    pub async fn get_range(&self, url: &str, start: u64, end: u64) -> Result<Bytes> {
        let response = self.execute_with_retry(url, reqwest::Method::GET, Some((start, end))).await?;
        let expected = end - start + 1;
        let bytes = response.bytes().await.map_err(|source| Error::Http {
            url: url.to_string(),
            source,
        })?;
        if bytes.len() as u64 != expected {
            return Err(Error::SizeMismatch {
                url: url.to_string(),
                expected,
                actual: bytes.len() as u64,
            });
        }
        Ok(bytes)
    }

    async fn bearer_header(&self) -> Result<Option<String>> {
        let Some(provider) = &self.credentials else {
            return Ok(None);
        };
        let token = provider
            .token()
            .await
            .map_err(|_| Error::Unauthorized("credential provider failed".to_string()))?;
        Ok(Some(format!("Bearer {}", token.value)))
    }

    /// Retry policy: up to `MAX_ATTEMPTS` attempts total. Retries only on connect
    /// reset/abort, timeout, DNS failure, or HTTP 5xx; 4xx is never retried.
    /// Backoff starts at 1s and doubles each attempt (1s, 2s), per spec §4.2.
    async fn execute_with_retry(
        &self,
        url: &str,
        method: reqwest::Method,
        range: Option<(u64, u64)>,
    ) -> Result<Response> {
        let auth = self.bearer_header().await?;
        let mut last_error = None;

        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                let backoff = INITIAL_BACKOFF * 2u32.pow(attempt - 1);
                debug!("retrying {} after {:?} (attempt {})", url, backoff, attempt + 1);
                tokio::time::sleep(backoff).await;
            }

            let mut request = self
                .client
                .request(method.clone(), url)
                .header(reqwest::header::USER_AGENT, &self.user_agent)
                .timeout(DEFAULT_TIMEOUT);

            if let Some((start, end)) = range {
                request = request.header(reqwest::header::RANGE, format!("bytes={start}-{end}"));
            }
            if let Some(auth) = &auth {
                request = request.header(reqwest::header::AUTHORIZATION, auth);
            }

            match request.send().await {
                Ok(response) if response.status().is_success() || response.status() == StatusCode::PARTIAL_CONTENT => {
                    trace!("{} -> {}", url, response.status());
                    return Ok(response);
                }
                Ok(response) => {
                    let status = response.status();
                    if status.is_server_error() && attempt + 1 < MAX_ATTEMPTS {
                        warn!("{} returned {} (attempt {}), retrying", url, status, attempt + 1);
                        last_error = Some(Error::Status {
                            url: url.to_string(),
                            status: status.as_u16(),
                        });
                        continue;
                    }
                    return Err(Error::Status {
                        url: url.to_string(),
                        status: status.as_u16(),
                    });
                }
                Err(source) => {
                    let retryable = source.is_connect() || source.is_timeout() || source.is_request();
                    if retryable && attempt + 1 < MAX_ATTEMPTS {
                        warn!("{} failed (attempt {}): {}, retrying", url, attempt + 1, source);
                        last_error = Some(Error::Http {
                            url: url.to_string(),
                            source,
                        });
                        continue;
                    }
                    if source.is_timeout() {
                        return Err(Error::Timeout {
                            url: url.to_string(),
                            duration_ms: DEFAULT_TIMEOUT.as_millis() as u64,
                        });
                    }
                    return Err(Error::Http {
                        url: url.to_string(),
                        source,
                    });
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Status {
            url: url.to_string(),
            status: 0,
        }))
    }
}

/// Builder for [`Session`].
#[derive(Default)]
pub struct SessionBuilder {
    user_agent: Option<String>,
    credentials: Option<Arc<dyn CredentialProvider>>,
}

impl SessionBuilder {
    /// Sets the `User-Agent` header sent with every request.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Sets the credential provider consulted before each authenticated request.
    pub fn credentials(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(provider);
        self
    }

    /// Builds the session.
    pub fn build(self) -> Result<Session> {
        let client = Client::builder()
            .pool_max_idle_per_host(20)
            .gzip(true)
            .deflate(true)
            .build()
            .map_err(|source| Error::Http {
                url: String::new(),
                source,
            })?;
        Ok(Session {
            client,
            user_agent: self.user_agent.unwrap_or_else(|| "galaxy-dl/0.1".to_string()),
            credentials: self.credentials,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn get_bytes_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/hello"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"world".to_vec()))
            .mount(&server)
            .await;

        let session = Session::builder().user_agent("test").build().unwrap();
        let bytes = session.get_bytes(&format!("{}/hello", server.uri())).await.unwrap();
        assert_eq!(&bytes[..], b"world");
    }

    #[tokio::test]
    async fn retries_on_500_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
            .mount(&server)
            .await;

        let session = Session::builder().user_agent("test").build().unwrap();
        let bytes = session.get_bytes(&format!("{}/flaky", server.uri())).await.unwrap();
        assert_eq!(&bytes[..], b"ok");
    }

    #[tokio::test]
    async fn does_not_retry_on_404() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let session = Session::builder().user_agent("test").build().unwrap();
        let err = session
            .get_bytes(&format!("{}/missing", server.uri()))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn get_range_checks_length() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ranged"))
            .respond_with(ResponseTemplate::new(206).set_body_bytes(b"ab".to_vec()))
            .mount(&server)
            .await;

        let session = Session::builder().user_agent("test").build().unwrap();
        let err = session
            .get_range(&format!("{}/ranged", server.uri()), 0, 9)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SizeMismatch { .. }));
    }

    #[tokio::test]
    async fn stream_yields_all_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stream"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 32]))
            .mount(&server)
            .await;

        let session = Session::builder().user_agent("test").build().unwrap();
        let mut stream = Box::pin(session.get_stream(&format!("{}/stream", server.uri()), None).await.unwrap());
        let mut total = 0;
        while let Some(chunk) = stream.next().await {
            total += chunk.unwrap().len();
        }
        assert_eq!(total, 32);
    }
}
