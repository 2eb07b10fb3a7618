//! Application Configuration Module
//!
//! Loads the lecture service settings from environment variables (and an
//! optional `.env` file) into a single struct shared by startup code.

use lecture_core::assets::{AuxiliaryClips, DEFAULT_CLIP_PREFIX};
use lecture_core::context::{DEFAULT_GREETING, DEFAULT_SYSTEM_PROMPT};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub qna_base_url: String,
    pub qna_timeout: Duration,
    pub assets_dir: PathBuf,
    pub slide_count: usize,
    pub clip_prefix: String,
    pub aux_clips: AuxiliaryClips,
    pub system_prompt: String,
    pub greeting: String,
    pub reaction_seed: Option<u64>,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// *   `BIND_ADDRESS`: Address the server binds to. Defaults to "0.0.0.0:3000".
    /// *   `QNA_BASE_URL`: Base URL of the answer/speech service. Defaults to "http://localhost:8000".
    /// *   `QNA_TIMEOUT_SECS`: Per-question request timeout. Defaults to 60.
    /// *   `ASSETS_DIR`: Directory holding the numbered slide folders. Defaults to "public".
    /// *   `SLIDE_COUNT`: Number of slides in the deck. Defaults to 9.
    /// *   `CLIP_PREFIX`: File stem prefix of slide clips. Defaults to "einstein".
    /// *   `IDLE_CLIP`, `TALKING_CLIP`, `FILLER_CLIP`: (Optional) URLs of the background loops.
    /// *   `REACTION_CLIPS`: (Optional) Comma-separated URLs of the reaction clips.
    /// *   `SYSTEM_PROMPT`: (Optional) Overrides the lecturer prompt that opens the context.
    /// *   `GREETING`: (Optional) Overrides what the lecturer says before the lesson starts.
    /// *   `REACTION_SEED`: (Optional) Seeds reaction clip selection.
    /// *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_address = parse_var(&lookup, "BIND_ADDRESS", "0.0.0.0:3000")?;
        let qna_base_url =
            lookup("QNA_BASE_URL").unwrap_or_else(|| "http://localhost:8000".to_string());
        let qna_timeout_secs: u64 = parse_var(&lookup, "QNA_TIMEOUT_SECS", "60")?;
        let assets_dir = PathBuf::from(lookup("ASSETS_DIR").unwrap_or_else(|| "public".to_string()));
        let slide_count = parse_var(&lookup, "SLIDE_COUNT", "9")?;
        let clip_prefix = lookup("CLIP_PREFIX").unwrap_or_else(|| DEFAULT_CLIP_PREFIX.to_string());
        let defaults = AuxiliaryClips::default();
        let aux_clips = AuxiliaryClips {
            idle_loop: lookup("IDLE_CLIP").unwrap_or(defaults.idle_loop),
            talking_loop: lookup("TALKING_CLIP").unwrap_or(defaults.talking_loop),
            no_sound_filler: lookup("FILLER_CLIP").unwrap_or(defaults.no_sound_filler),
            reactions: match lookup("REACTION_CLIPS") {
                Some(list) => list
                    .split(',')
                    .map(str::trim)
                    .filter(|clip| !clip.is_empty())
                    .map(str::to_string)
                    .collect(),
                None => defaults.reactions,
            },
        };
        let system_prompt =
            lookup("SYSTEM_PROMPT").unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
        let greeting = lookup("GREETING").unwrap_or_else(|| DEFAULT_GREETING.to_string());
        let reaction_seed = match lookup("REACTION_SEED") {
            Some(seed) => Some(seed.parse::<u64>().map_err(|e| {
                ConfigError::InvalidValue("REACTION_SEED".to_string(), e.to_string())
            })?),
            None => None,
        };

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address,
            qna_base_url,
            qna_timeout: Duration::from_secs(qna_timeout_secs),
            assets_dir,
            slide_count,
            clip_prefix,
            aux_clips,
            system_prompt,
            greeting,
            reaction_seed,
            log_level,
        })
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(key).unwrap_or_else(|| default.to_string());
    raw.parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.bind_address, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(config.qna_base_url, "http://localhost:8000");
        assert_eq!(config.qna_timeout, Duration::from_secs(60));
        assert_eq!(config.assets_dir, PathBuf::from("public"));
        assert_eq!(config.slide_count, 9);
        assert_eq!(config.clip_prefix, "einstein");
        assert_eq!(config.aux_clips, AuxiliaryClips::default());
        assert_eq!(config.greeting, DEFAULT_GREETING);
        assert_eq!(config.reaction_seed, None);
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    fn test_clip_urls_are_configurable() {
        let config = Config::from_lookup(lookup_from(&[
            ("IDLE_CLIP", "/curie-idle.mp4"),
            ("FILLER_CLIP", "/curie-quiet.mp4"),
            ("REACTION_CLIPS", " /r/a.mp4, ,/r/b.mp4 "),
        ]))
        .unwrap();

        assert_eq!(config.aux_clips.idle_loop, "/curie-idle.mp4");
        assert_eq!(config.aux_clips.talking_loop, "/einsten-basic.mp4");
        assert_eq!(config.aux_clips.no_sound_filler, "/curie-quiet.mp4");
        assert_eq!(config.aux_clips.reactions, vec!["/r/a.mp4", "/r/b.mp4"]);
    }

    #[test]
    fn test_values_are_read_from_lookup() {
        let config = Config::from_lookup(lookup_from(&[
            ("BIND_ADDRESS", "127.0.0.1:9000"),
            ("SLIDE_COUNT", "3"),
            ("QNA_TIMEOUT_SECS", "5"),
            ("REACTION_SEED", "11"),
            ("RUST_LOG", "debug"),
        ]))
        .unwrap();

        assert_eq!(config.bind_address.port(), 9000);
        assert_eq!(config.slide_count, 3);
        assert_eq!(config.qna_timeout, Duration::from_secs(5));
        assert_eq!(config.reaction_seed, Some(11));
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    fn test_invalid_slide_count_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[("SLIDE_COUNT", "nine")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(key, _) if key == "SLIDE_COUNT"));
    }

    #[test]
    fn test_invalid_log_level_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[("RUST_LOG", "LOUD")])).unwrap_err();
        assert!(err.to_string().contains("RUST_LOG"));
    }
}
