use super::schema::SkyslotConfig;
use chrono::FixedOffset;
use skyslot_common::slug::slugify;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Missing environment value: {0}")]
    MissingEnv(&'static str),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from default locations:
    /// 1. ./skyslot.yaml
    /// 2. ~/.skyslot/config.yaml
    /// 3. Default configuration
    pub async fn load_default() -> Result<SkyslotConfig, ConfigError> {
        let local_config = PathBuf::from("./skyslot.yaml");
        if local_config.exists() {
            return Self::load_from(&local_config).await;
        }

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".skyslot").join("config.yaml");
            if home_config.exists() {
                return Self::load_from(&home_config).await;
            }
        }

        let config = SkyslotConfig::default();
        validate(&config)?;
        Ok(config)
    }

    pub async fn load_from(path: &Path) -> Result<SkyslotConfig, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<SkyslotConfig, ConfigError> {
        let config: SkyslotConfig = serde_yaml::from_str(content)?;
        validate(&config)?;
        Ok(config)
    }
}

pub fn validate(config: &SkyslotConfig) -> Result<(), ConfigError> {
    if config.page.url.trim().is_empty() {
        return Err(ConfigError::Invalid("page.url is empty".into()));
    }

    let mut seen = HashSet::new();
    for target in &config.capture.targets {
        if target.name.trim().is_empty() {
            return Err(ConfigError::Invalid("capture target without a name".into()));
        }
        if target.selectors.iter().all(|s| s.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "capture target '{}' has no selector candidates",
                target.name
            )));
        }
        if !seen.insert(slugify(&target.name)) {
            return Err(ConfigError::Invalid(format!(
                "duplicate capture target '{}'",
                target.name
            )));
        }
    }

    if config.archive.trigger_hour > 23 {
        return Err(ConfigError::Invalid(format!(
            "archive.trigger_hour must be 0-23, got {}",
            config.archive.trigger_hour
        )));
    }

    if let Some(offset) = &config.archive.utc_offset {
        parse_utc_offset(offset)?;
    }

    if config.archive.title_property.trim().is_empty()
        || config.archive.date_property.trim().is_empty()
    {
        return Err(ConfigError::Invalid(
            "archive.title_property and archive.date_property must be set".into(),
        ));
    }

    Ok(())
}

/// Parse `Z`, `UTC`, or `±HH:MM` / `±HHMM`.
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset, ConfigError> {
    let invalid = || ConfigError::Invalid(format!("invalid utc_offset '{}'", raw));
    let value = raw.trim();

    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }

    let (sign, rest) = match value.split_at_checked(1) {
        Some(("+", rest)) => (1, rest),
        Some(("-", rest)) => (-1, rest),
        _ => return Err(invalid()),
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
    let minutes: i32 = digits[2..].parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}
