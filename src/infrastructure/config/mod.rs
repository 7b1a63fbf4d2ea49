use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid rate limit: {0}. Must be positive")]
    InvalidRateLimit(f64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid max_attempts: {0}. Cannot be 0")]
    InvalidMaxAttempts(u32),

    #[error(
        "Invalid backoff configuration: initial_delay_ms ({0}) must be less than max_delay_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid word count window: min ({0}) must be less than max ({1})")]
    InvalidWordCountWindow(usize, usize),

    #[error("Invalid confidence threshold: {0}. Must be within 0.0..=1.0")]
    InvalidConfidenceThreshold(f64),

    #[error("Invalid max_posts_per_day: {0}. Must be at least 1")]
    InvalidPostBudget(u32),

    #[error("Output directory cannot be empty")]
    EmptyOutputDir,

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. pressroom.yaml (project config)
    /// 3. pressroom.local.yaml (local overrides, optional)
    /// 4. Environment variables (PRESSROOM_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file("pressroom.yaml"))
            .merge(Yaml::file("pressroom.local.yaml"))
            .merge(Env::prefixed("PRESSROOM_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("PRESSROOM_").split("__"))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.generation.rate_limit_rps <= 0.0 {
            return Err(ConfigError::InvalidRateLimit(config.generation.rate_limit_rps));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if config.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts(config.retry.max_attempts));
        }

        if config.retry.initial_delay_ms >= config.retry.max_delay_ms {
            return Err(ConfigError::InvalidBackoff(
                config.retry.initial_delay_ms,
                config.retry.max_delay_ms,
            ));
        }

        if config.content.min_word_count >= config.content.max_word_count {
            return Err(ConfigError::InvalidWordCountWindow(
                config.content.min_word_count,
                config.content.max_word_count,
            ));
        }

        if !(0.0..=1.0).contains(&config.pipeline.confidence_threshold) {
            return Err(ConfigError::InvalidConfidenceThreshold(
                config.pipeline.confidence_threshold,
            ));
        }

        if config.pipeline.max_posts_per_day == 0 {
            return Err(ConfigError::InvalidPostBudget(
                config.pipeline.max_posts_per_day,
            ));
        }

        if config.pipeline.output_dir.is_empty() {
            return Err(ConfigError::EmptyOutputDir);
        }

        for gate in &config.gates {
            if gate.name.is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "Gate name cannot be empty".to_string(),
                ));
            }
            if gate.producer.is_empty() {
                return Err(ConfigError::ValidationFailed(format!(
                    "Gate '{}' producer cannot be empty",
                    gate.name
                )));
            }
            if gate.criteria.is_empty() {
                return Err(ConfigError::ValidationFailed(format!(
                    "Gate '{}' has no criteria",
                    gate.name
                )));
            }
        }

        Ok(())
    }
}
