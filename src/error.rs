//! Error types for the autocon library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the application.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration value for '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // Stream state errors
    #[error("Malformed queue record in {} (line {line}): {reason}", path.display())]
    MalformedRecord {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Malformed info file {}: {reason}", path.display())]
    MalformedInfoFile { path: PathBuf, reason: String },

    #[error("Missing info file: {}", .0.display())]
    MissingInfoFile(PathBuf),

    #[error("Stream has no current item: {}", .0.display())]
    NoCurrentItem(PathBuf),

    #[error("Manual streams do not track progress: {}", .0.display())]
    ProgressNotTracked(PathBuf),

    #[error("Manual streams cannot have a feed: {}", .0.display())]
    FeedNotSupported(PathBuf),

    // Library tree errors
    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    #[error("Stream not found: {category}/{stream}")]
    StreamNotFound { category: String, stream: String },

    #[error("Already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    // Feed and download errors
    #[error("Feed unreachable ({url}): {reason}")]
    FeedUnreachable { url: String, reason: String },

    #[error("Download failed for '{item}': {reason}")]
    DownloadFailed { item: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    // URL parsing errors
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the error means the stream's own state files are unusable.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Error::MalformedRecord { .. } | Error::MalformedInfoFile { .. } | Error::MissingInfoFile(_)
        )
    }
}

/// Process exit codes used by the CLI.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const CONFIG_ERROR: i32 = 3;
    pub const STREAM_ERROR: i32 = 4;
    pub const UNEXPECTED_ERROR: i32 = 5;
    pub const SOME_STREAMS_FAILED: i32 = 6;
}
