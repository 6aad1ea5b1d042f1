// src/ingest/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    /// Connection failure or a non-2xx response.
    #[error("transport error for {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("request to {url} failed")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The body could not be read as a list of post objects.
    #[error("malformed response from {url}: {reason}")]
    MalformedResponse { url: String, reason: String },

    /// A post is missing a required field or carries an unusable value.
    #[error("post {post_id}: {reason}")]
    DataIntegrity { post_id: String, reason: String },
}

impl ExtractError {
    pub(crate) fn integrity(post_id: Option<&str>, reason: impl Into<String>) -> Self {
        Self::DataIntegrity {
            post_id: post_id.unwrap_or("<unknown>").to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Http { .. })
    }
}
