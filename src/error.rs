//! Error types for epubgen operations.

use thiserror::Error;

/// Boxed error returned by custom templates and image fetchers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while generating an EPUB.
///
/// Sanitizer rewrites are never errors; only the conditions below abort a build.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Title is required")]
    MissingTitle,

    #[error("Content is required")]
    MissingContent,

    #[error("Failed to render {document}: {source}")]
    Render {
        document: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("Failed to fetch image {url}: {source}")]
    ImageFetch {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

pub type Result<T> = std::result::Result<T, Error>;
