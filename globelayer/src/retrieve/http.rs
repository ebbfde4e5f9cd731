//! HTTP client abstraction for testability

use std::time::Duration;

use super::error::RetrieveError;

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(8);

/// Default timeout for reading a response.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Body and content type of a successful response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(content_type: Option<&str>, body: Vec<u8>) -> Self {
        Self {
            content_type: content_type.map(str::to_string),
            body,
        }
    }
}

/// Trait for HTTP client operations.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock HTTP clients in tests.
pub trait HttpClient: Send + Sync {
    /// Performs an HTTP GET request.
    ///
    /// Non-success statuses are returned as [`RetrieveError::Status`].
    fn get(&self, url: &str) -> Result<HttpResponse, RetrieveError>;
}

/// Real HTTP client implementation using reqwest.
///
/// Uses the blocking client; requests run on load worker threads.
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Creates a client with the default connect and read timeouts.
    pub fn new() -> Result<Self, RetrieveError> {
        Self::with_timeouts(DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT)
    }

    /// Creates a client with custom timeouts.
    pub fn with_timeouts(connect: Duration, read: Duration) -> Result<Self, RetrieveError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(connect)
            .timeout(connect + read)
            .user_agent(concat!("globelayer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RetrieveError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<HttpResponse, RetrieveError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| RetrieveError::Http(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(RetrieveError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| RetrieveError::Http(format!("Failed to read response: {}", e)))?;

        Ok(HttpResponse { content_type, body })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Mock HTTP client for testing
    pub struct MockHttpClient {
        pub response: Result<HttpResponse, RetrieveError>,
        pub calls: AtomicUsize,
        pub urls: Mutex<Vec<String>>,
    }

    impl MockHttpClient {
        pub fn new(response: Result<HttpResponse, RetrieveError>) -> Self {
            Self {
                response,
                calls: AtomicUsize::new(0),
                urls: Mutex::new(Vec::new()),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl HttpClient for MockHttpClient {
        fn get(&self, url: &str) -> Result<HttpResponse, RetrieveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.urls.lock().unwrap().push(url.to_string());
            self.response.clone()
        }
    }

    #[test]
    fn test_mock_client_success() {
        let mock = MockHttpClient::new(Ok(HttpResponse::new(Some("image/png"), vec![1, 2, 3])));

        let result = mock.get("http://example.com");
        assert_eq!(result.unwrap().body, vec![1, 2, 3]);
        assert_eq!(mock.call_count(), 1);
    }

    #[test]
    fn test_mock_client_error() {
        let mock = MockHttpClient::new(Err(RetrieveError::Http("Test error".to_string())));

        let result = mock.get("http://example.com");
        assert!(result.is_err());
    }

    #[test]
    fn test_reqwest_client_builds() {
        assert!(ReqwestClient::with_timeouts(
            Duration::from_millis(500),
            Duration::from_millis(500)
        )
        .is_ok());
    }
}
