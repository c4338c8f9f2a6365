//! Document retrieval capability
//!
//! The key-set subsystem never talks HTTP directly; it asks a
//! [`DocumentRetriever`] for the body at a URL. Hosts can plug in their own
//! transport, and tests can serve canned documents.

use crate::config::ValidatorConfig;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error};

/// Document retrieval errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetrievalError {
    /// The request could not be sent or the body could not be read
    #[error("request to {url} failed: {reason}")]
    Transport {
        /// Requested URL
        url: String,
        /// Underlying failure
        reason: String,
    },

    /// The server answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// The response body exceeded the configured size limit
    #[error("response from {url} exceeds {limit} bytes")]
    TooLarge {
        /// Requested URL
        url: String,
        /// Configured limit
        limit: usize,
    },
}

/// Fetch a document body by URL
#[async_trait]
pub trait DocumentRetriever: Send + Sync {
    /// Retrieve the body of the document at `url`
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError`] when the document cannot be retrieved.
    async fn get(&self, url: &str) -> Result<String, RetrievalError>;
}

/// [`DocumentRetriever`] backed by `reqwest`
///
/// - Request timeout and user agent from [`ValidatorConfig`]
/// - Redirects are not followed
/// - Non-2xx responses are errors
/// - Bodies larger than `max_response_size` are rejected
#[derive(Debug, Clone)]
pub struct HttpDocumentRetriever {
    client: reqwest::Client,
    max_response_size: usize,
}

impl HttpDocumentRetriever {
    /// Create a retriever from the validator configuration
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: &ValidatorConfig) -> Result<Self, RetrievalError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| RetrievalError::Transport {
                url: String::new(),
                reason: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self::with_client(client, config.max_response_size))
    }

    /// Wrap an existing client
    pub fn with_client(client: reqwest::Client, max_response_size: usize) -> Self {
        Self {
            client,
            max_response_size,
        }
    }
}

#[async_trait]
impl DocumentRetriever for HttpDocumentRetriever {
    async fn get(&self, url: &str) -> Result<String, RetrievalError> {
        debug!(url = %url, "retrieving document");

        let mut response = self.client.get(url).send().await.map_err(|e| {
            error!(url = %url, error = %e, "document request failed");
            RetrievalError::Transport {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            error!(url = %url, status = %status, "document endpoint returned error status");
            return Err(RetrievalError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if let Some(content_length) = response.content_length()
            && content_length > self.max_response_size as u64
        {
            return Err(RetrievalError::TooLarge {
                url: url.to_string(),
                limit: self.max_response_size,
            });
        }

        // Content-Length may be absent; enforce the limit while reading
        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| RetrievalError::Transport {
            url: url.to_string(),
            reason: format!("failed to read response: {e}"),
        })? {
            if body.len() + chunk.len() > self.max_response_size {
                error!(url = %url, limit = self.max_response_size, "document exceeds size limit");
                return Err(RetrievalError::TooLarge {
                    url: url.to_string(),
                    limit: self.max_response_size,
                });
            }
            body.extend_from_slice(&chunk);
        }

        String::from_utf8(body).map_err(|e| RetrievalError::Transport {
            url: url.to_string(),
            reason: format!("response is not UTF-8: {e}"),
        })
    }
}
