// SPDX-FileCopyrightText: 2026 Clipfetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for clipfetch.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so unrecognized keys are
//! rejected at startup instead of being silently ignored.

use serde::{Deserialize, Serialize};

/// Top-level clipfetch configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with `CLIPFETCH_*`
/// environment variable overrides. All sections default to sensible values;
/// only `telegram.bot_token` is required to actually serve.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClipfetchConfig {
    /// Bot identity and logging.
    #[serde(default)]
    pub bot: BotConfig,

    /// Telegram integration settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// External extractor binary settings.
    #[serde(default)]
    pub extractor: ExtractorConfig,

    /// Download job settings (workers, retries, size caps).
    #[serde(default)]
    pub download: DownloadConfig,

    /// Periodic cleanup sweeper settings.
    #[serde(default)]
    pub sweep: SweepConfig,
}

/// Bot identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Display name of the bot.
    #[serde(default = "default_bot_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_bot_name() -> String {
    "clipfetch".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telegram integration configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. `None` disables serving.
    #[serde(default)]
    pub bot_token: Option<String>,
}

/// External extractor binary configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractorConfig {
    /// Explicit path to the extractor binary. When unset, the binary is
    /// resolved from PATH and a list of common install locations.
    #[serde(default)]
    pub binary_path: Option<String>,

    /// Wall-clock budget for one extractor invocation, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Credential cookie files, comma-separated. Consumed in order until
    /// one succeeds; read-only.
    #[serde(default)]
    pub cookie_files: Option<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            binary_path: None,
            timeout_secs: default_timeout_secs(),
            cookie_files: None,
        }
    }
}

fn default_timeout_secs() -> u64 {
    60
}

impl ExtractorConfig {
    /// Splits `cookie_files` into an ordered list of paths.
    pub fn cookie_file_list(&self) -> Vec<String> {
        self.cookie_files
            .as_deref()
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Download job configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DownloadConfig {
    /// Root directory under which per-request work directories are created.
    #[serde(default = "default_temp_root")]
    pub temp_root: String,

    /// Number of concurrent download workers.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Maximum attempts per request before it is permanently failed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Upload cap for images, in bytes.
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: u64,

    /// Upload cap for videos, in bytes.
    #[serde(default = "default_max_video_bytes")]
    pub max_video_bytes: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            temp_root: default_temp_root(),
            workers: default_workers(),
            max_attempts: default_max_attempts(),
            max_image_bytes: default_max_image_bytes(),
            max_video_bytes: default_max_video_bytes(),
        }
    }
}

fn default_temp_root() -> String {
    "/tmp/clipfetch".to_string()
}

fn default_workers() -> usize {
    4
}

fn default_max_attempts() -> u32 {
    3
}

fn default_max_image_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_max_video_bytes() -> u64 {
    50 * 1024 * 1024
}

/// Periodic cleanup sweeper configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SweepConfig {
    /// How often the sweepers run, in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub interval_secs: u64,

    /// Work directories older than this are reclaimed, in seconds.
    #[serde(default = "default_workdir_max_age_secs")]
    pub workdir_max_age_secs: u64,

    /// Extractor processes older than this are killed, in seconds.
    #[serde(default = "default_process_max_age_secs")]
    pub process_max_age_secs: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sweep_interval_secs(),
            workdir_max_age_secs: default_workdir_max_age_secs(),
            process_max_age_secs: default_process_max_age_secs(),
        }
    }
}

fn default_sweep_interval_secs() -> u64 {
    300
}

fn default_workdir_max_age_secs() -> u64 {
    3600
}

fn default_process_max_age_secs() -> u64 {
    600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = ClipfetchConfig::default();
        assert_eq!(config.bot.name, "clipfetch");
        assert_eq!(config.extractor.timeout_secs, 60);
        assert_eq!(config.download.workers, 4);
        assert_eq!(config.download.max_attempts, 3);
        assert_eq!(config.download.max_image_bytes, 10 * 1024 * 1024);
        assert_eq!(config.download.max_video_bytes, 50 * 1024 * 1024);
        assert!(config.telegram.bot_token.is_none());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let toml_str = r#"
[extractor]
binary_path = "/usr/bin/yt-dlp"
not_a_real_key = true
"#;
        assert!(toml::from_str::<ClipfetchConfig>(toml_str).is_err());
    }

    #[test]
    fn cookie_file_list_splits_and_trims() {
        let extractor = ExtractorConfig {
            cookie_files: Some("/a/one.txt, /b/two.txt ,,".into()),
            ..Default::default()
        };
        assert_eq!(extractor.cookie_file_list(), vec!["/a/one.txt", "/b/two.txt"]);
    }

    #[test]
    fn cookie_file_list_empty_when_unset() {
        let extractor = ExtractorConfig::default();
        assert!(extractor.cookie_file_list().is_empty());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_str = r#"
[telegram]
bot_token = "123:abc"

[download]
workers = 8
"#;
        let config: ClipfetchConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.telegram.bot_token.as_deref(), Some("123:abc"));
        assert_eq!(config.download.workers, 8);
        assert_eq!(config.download.max_attempts, 3);
    }
}
