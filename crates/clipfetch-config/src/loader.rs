// SPDX-FileCopyrightText: 2026 Clipfetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports the XDG hierarchy: `./clipfetch.toml` > `~/.config/clipfetch/clipfetch.toml`
//! > `/etc/clipfetch/clipfetch.toml`, with environment variable overrides via
//! the `CLIPFETCH_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::ClipfetchConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/clipfetch/clipfetch.toml` (system-wide)
/// 3. `~/.config/clipfetch/clipfetch.toml` (user XDG config)
/// 4. `./clipfetch.toml` (local directory)
/// 5. `CLIPFETCH_*` environment variables
pub fn load_config() -> Result<ClipfetchConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ClipfetchConfig::default()))
        .merge(Toml::file("/etc/clipfetch/clipfetch.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("clipfetch/clipfetch.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("clipfetch.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<ClipfetchConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ClipfetchConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ClipfetchConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ClipfetchConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `CLIPFETCH_TELEGRAM_BOT_TOKEN` must map
/// to `telegram.bot_token`, not `telegram.bot.token`.
///
/// The key arrives with the prefix stripped but otherwise as the process
/// environment spells it, i.e. upper case. Only a leading section name is
/// rewritten to dot notation, so field names keep their underscores.
fn env_provider() -> Env {
    const SECTIONS: &[&str] = &["bot", "telegram", "extractor", "download", "sweep"];
    Env::prefixed("CLIPFETCH_").map(|key| {
        let lower = key.as_str().to_ascii_lowercase();
        for section in SECTIONS {
            if let Some(field) = lower
                .strip_prefix(section)
                .and_then(|rest| rest.strip_prefix('_'))
            {
                return format!("{section}.{field}").into();
            }
        }
        lower.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn str_loader_overrides_defaults() {
        let config = load_config_from_str(
            r#"
[extractor]
timeout_secs = 90
"#,
        )
        .unwrap();
        assert_eq!(config.extractor.timeout_secs, 90);
        assert_eq!(config.download.workers, 4);
    }

    #[test]
    fn empty_string_yields_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.bot.name, "clipfetch");
    }

    #[test]
    fn unknown_section_is_rejected() {
        assert!(load_config_from_str("[nonsense]\nkey = 1\n").is_err());
    }

    #[test]
    fn env_vars_override_file_values() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "clipfetch.toml",
                r#"
[extractor]
timeout_secs = 60
"#,
            )?;
            jail.set_env("CLIPFETCH_EXTRACTOR_TIMEOUT_SECS", "120");
            jail.set_env("CLIPFETCH_TELEGRAM_BOT_TOKEN", "12345:test-token");
            jail.set_env("CLIPFETCH_DOWNLOAD_WORKERS", "8");

            let config = load_config_from_path(Path::new("clipfetch.toml"))?;
            assert_eq!(config.extractor.timeout_secs, 120);
            assert_eq!(config.telegram.bot_token.as_deref(), Some("12345:test-token"));
            assert_eq!(config.download.workers, 8);
            Ok(())
        });
    }

    #[test]
    fn env_mapping_keeps_underscores_inside_field_names() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("CLIPFETCH_BOT_LOG_LEVEL", "debug");
            jail.set_env("CLIPFETCH_SWEEP_WORKDIR_MAX_AGE_SECS", "120");

            // No file on disk; missing Toml::file layers are skipped.
            let config = load_config_from_path(Path::new("clipfetch.toml"))?;
            assert_eq!(config.bot.log_level, "debug");
            assert_eq!(config.sweep.workdir_max_age_secs, 120);
            Ok(())
        });
    }
}
