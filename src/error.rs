/// Error types for the download workflow
///
/// Fetch and storage failures carry the underlying error's description so it
/// can be shown to the user as-is in a toast.
use thiserror::Error;

/// Errors raised while fetching and decoding an image
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The URL could not be parsed
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Connection, TLS, timeout or body read failure
    #[error("Network error: {0}")]
    Network(String),

    /// Server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Response body is not a decodable image
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// The owning screen went away before the fetch finished
    #[error("Download cancelled")]
    Cancelled,
}

impl FetchError {
    /// Cancellation is not reported to the user
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            let url = err.url().map(|u| u.to_string()).unwrap_or_default();
            return FetchError::Status {
                status: status.as_u16(),
                url,
            };
        }
        FetchError::Network(error_chain(&err))
    }
}

/// `outer: cause: root cause`, skipping causes already quoted by their parent
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// Errors raised while writing an image to photo storage
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Could not write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode JPEG: {0}")]
    Encode(#[from] image::ImageError),

    #[error("No pictures directory available")]
    NoPicturesDir,
}

/// Any failure surfaced by a download attempt
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_underlying_text() {
        let err = WorkflowError::from(FetchError::Network("connection refused".into()));
        assert_eq!(err.to_string(), "Network error: connection refused");

        let err = FetchError::Status {
            status: 404,
            url: "https://example.com/a.png".into(),
        };
        assert!(err.to_string().contains("404"));
    }

    #[derive(Debug, Error)]
    #[error("error sending request")]
    struct Outer(#[source] std::io::Error);

    #[test]
    fn test_error_chain_names_root_cause() {
        let refused = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
        let message = error_chain(&Outer(refused));
        assert_eq!(message, "error sending request: connection refused");
    }

    #[test]
    fn test_only_cancel_is_cancelled() {
        assert!(FetchError::Cancelled.is_cancelled());
        assert!(!FetchError::Decode("bad".into()).is_cancelled());
    }
}
