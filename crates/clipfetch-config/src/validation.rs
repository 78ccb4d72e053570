// SPDX-FileCopyrightText: 2026 Clipfetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes. Collects all errors instead of failing fast.

use thiserror::Error;

use crate::model::ClipfetchConfig;

/// A configuration error surfaced at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Parse(#[from] figment::Error),

    #[error("{message}")]
    Validation { message: String },
}

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or all collected errors.
pub fn validate_config(config: &ClipfetchConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.download.temp_root.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "download.temp_root must not be empty".to_string(),
        });
    }

    if config.download.workers == 0 {
        errors.push(ConfigError::Validation {
            message: "download.workers must be at least 1".to_string(),
        });
    }

    if config.download.max_attempts == 0 {
        errors.push(ConfigError::Validation {
            message: "download.max_attempts must be at least 1".to_string(),
        });
    }

    if config.extractor.timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "extractor.timeout_secs must be at least 1".to_string(),
        });
    }

    if let Some(ref token) = config.telegram.bot_token
        && token.trim().is_empty()
    {
        errors.push(ConfigError::Validation {
            message: "telegram.bot_token must not be empty when set".to_string(),
        });
    }

    // Warn-level concerns, not errors: missing cookie files are tolerated
    // because the no-credential strategies still work without them.
    for path in config.extractor.cookie_file_list() {
        if !std::path::Path::new(&path).exists() {
            tracing::warn!(path = %path, "configured cookie file does not exist");
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = ClipfetchConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_temp_root_fails_validation() {
        let mut config = ClipfetchConfig::default();
        config.download.temp_root = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("temp_root"))));
    }

    #[test]
    fn zero_workers_fails_validation() {
        let mut config = ClipfetchConfig::default();
        config.download.workers = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("workers"))));
    }

    #[test]
    fn empty_token_fails_validation() {
        let mut config = ClipfetchConfig::default();
        config.telegram.bot_token = Some("  ".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("bot_token"))));
    }

    #[test]
    fn multiple_errors_are_collected() {
        let mut config = ClipfetchConfig::default();
        config.download.workers = 0;
        config.download.max_attempts = 0;
        config.extractor.timeout_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
