//! Error types for treeline-remote.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    /// The request never produced an HTTP response (DNS, connect, TLS, I/O).
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The service answered with a non-2xx status.
    #[error("request to {url} failed: HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// The response body was not the JSON shape we expected.
    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: std::io::Error,
    },
}
