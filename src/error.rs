#[derive(Debug, thiserror::Error)]
pub enum ScreenerError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Element not found: {locator}")]
    ElementNotFound { locator: String },

    #[error("Stale element reference: the page changed since it was located")]
    StaleElement,

    #[error("Element <{tag}> cannot be clicked")]
    NotInteractable { tag: String },

    #[error("No control for page {page}")]
    PaginationEnd { page: u32 },

    #[error("Malformed company url: {0}")]
    MalformedUrl(String),

    #[error("Invalid locator: {0}")]
    InvalidLocator(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ScreenerError>;
