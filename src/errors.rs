use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP error {status} fetching {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Unsupported content type {content_type:?} at {url}")]
    UnsupportedContentType { content_type: String, url: String },

    #[error("Too many redirects, last location: {0}")]
    TooManyRedirects(String),

    #[error("Invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// A submit control was clicked that sits outside any form.
    #[error("Submit element <{0}> has no enclosing form")]
    OrphanSubmit(String),

    #[error("Connection reset: {0}")]
    ConnectionReset(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BrowserError>;

impl BrowserError {
    pub fn invalid_url(url: impl Into<String>, source: url::ParseError) -> Self {
        BrowserError::InvalidUrl {
            url: url.into(),
            source,
        }
    }

    /// Whether the failure came from the HTTP exchange itself.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            BrowserError::Transport(_)
                | BrowserError::HttpStatus { .. }
                | BrowserError::UnsupportedContentType { .. }
                | BrowserError::TooManyRedirects(_)
                | BrowserError::ConnectionReset(_)
        )
    }
}
