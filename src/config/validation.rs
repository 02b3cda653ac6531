//! Configuration validation logic.

use crate::config::loader::Config;
use crate::error::{Error, Result};

/// Shortest fetch timeout we accept, in seconds.
const MIN_FETCH_TIMEOUT: u64 = 1;

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_root(config)?;
    validate_item_limit(config.sync.item_limit)?;
    validate_fetch_timeout(config.sync.fetch_timeout_secs)?;
    validate_user_agent(&config.sync.user_agent)?;

    Ok(())
}

/// The content root must be set and, if it exists, must be a directory.
pub fn validate_root(config: &Config) -> Result<()> {
    let root = config.root();

    if root.as_os_str().is_empty() {
        return Err(Error::ConfigValidation {
            field: "library.root".to_string(),
            message: "Content root cannot be empty".to_string(),
        });
    }

    if root.exists() && !root.is_dir() {
        return Err(Error::ConfigValidation {
            field: "library.root".to_string(),
            message: format!("{} exists but is not a directory", root.display()),
        });
    }

    Ok(())
}

/// Validate the per-stream item cap.
pub fn validate_item_limit(limit: usize) -> Result<()> {
    if limit == 0 {
        return Err(Error::ConfigValidation {
            field: "sync.item_limit".to_string(),
            message: "Item limit must be at least 1".to_string(),
        });
    }

    Ok(())
}

/// Validate the fetch timeout.
pub fn validate_fetch_timeout(secs: u64) -> Result<()> {
    if secs < MIN_FETCH_TIMEOUT {
        return Err(Error::ConfigValidation {
            field: "sync.fetch_timeout_secs".to_string(),
            message: format!("Timeout must be at least {} second(s)", MIN_FETCH_TIMEOUT),
        });
    }

    Ok(())
}

/// Validate the user agent string.
pub fn validate_user_agent(user_agent: &str) -> Result<()> {
    if user_agent.trim().is_empty() {
        return Err(Error::ConfigValidation {
            field: "sync.user_agent".to_string(),
            message: "User agent cannot be empty".to_string(),
        });
    }

    Ok(())
}
