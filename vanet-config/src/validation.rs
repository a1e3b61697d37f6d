//! Custom validation functions for configuration.

use validator::ValidationError;

/// Validate a tracing level name.
pub fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid = ["trace", "debug", "info", "warn", "error"]
        .contains(&level.to_lowercase().as_str());
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_level"))
    }
}

/// Validate a bare file extension (no leading dot).
pub fn validate_extension(ext: &str) -> Result<(), ValidationError> {
    let re =
        regex::Regex::new("^[A-Za-z0-9]+$").map_err(|_| ValidationError::new("invalid_regex"))?;
    if re.is_match(ext) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_extension"))
    }
}
