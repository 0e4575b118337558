use crate::infrastructure::security::RateLimitProfile;
use aigov_errors::GovernanceError;
use std::time::Duration;

pub const DEFAULT_OPENROUTER_MODEL: &str = "deepseek/deepseek-chat";
const DEFAULT_SWEEP_SECS: u64 = 60;
const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// Process-wide settings, read once at start-up.
#[derive(Debug, Clone, PartialEq)]
pub struct GovernanceConfig {
    pub rate_limit_enabled: bool,
    pub profile: RateLimitProfile,
    /// `None` disables the background sweep of the memory store.
    pub sweep_interval: Option<Duration>,
    pub max_attempts: u32,
    pub openrouter_api_key: Option<String>,
    pub openrouter_model: String,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            rate_limit_enabled: true,
            profile: RateLimitProfile::Strict,
            sweep_interval: Some(Duration::from_secs(DEFAULT_SWEEP_SECS)),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            openrouter_api_key: None,
            openrouter_model: DEFAULT_OPENROUTER_MODEL.to_string(),
        }
    }
}

impl GovernanceConfig {
    pub fn from_env() -> Result<Self, GovernanceError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, GovernanceError> {
        let defaults = Self::default();

        let rate_limit_enabled = match lookup("AI_RATE_LIMIT_ENABLED") {
            Some(v) => parse_flag("AI_RATE_LIMIT_ENABLED", &v)?,
            None => defaults.rate_limit_enabled,
        };
        let profile = match lookup("AI_RATE_LIMIT_PROFILE") {
            Some(v) => v.parse()?,
            None => defaults.profile,
        };
        let sweep_interval = match lookup("AI_STORE_SWEEP_SECS") {
            Some(v) => match parse_number::<u64>("AI_STORE_SWEEP_SECS", &v)? {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            None => defaults.sweep_interval,
        };
        let max_attempts = match lookup("AI_MAX_ATTEMPTS") {
            Some(v) => parse_number::<u32>("AI_MAX_ATTEMPTS", &v)?.max(1),
            None => defaults.max_attempts,
        };

        Ok(Self {
            rate_limit_enabled,
            profile,
            sweep_interval,
            max_attempts,
            openrouter_api_key: lookup("OPENROUTER_API_KEY").filter(|k| !k.trim().is_empty()),
            openrouter_model: lookup("OPENROUTER_MODEL").unwrap_or(defaults.openrouter_model),
        })
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool, GovernanceError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        other => Err(GovernanceError::configuration(format!(
            "{} must be a boolean, got '{}'",
            name, other
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, GovernanceError> {
    value.trim().parse().map_err(|_| {
        GovernanceError::configuration(format!("{} must be a non-negative integer, got '{}'", name, value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<GovernanceConfig, GovernanceError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        GovernanceConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        assert_eq!(config_from(&[]).unwrap(), GovernanceConfig::default());
    }

    #[test]
    fn test_reads_every_variable() {
        let config = config_from(&[
            ("AI_RATE_LIMIT_ENABLED", "off"),
            ("AI_RATE_LIMIT_PROFILE", "relaxed"),
            ("AI_STORE_SWEEP_SECS", "0"),
            ("AI_MAX_ATTEMPTS", "4"),
            ("OPENROUTER_API_KEY", "sk-test"),
            ("OPENROUTER_MODEL", "openai/gpt-4o-mini"),
        ])
        .unwrap();

        assert!(!config.rate_limit_enabled);
        assert_eq!(config.profile, RateLimitProfile::Relaxed);
        assert_eq!(config.sweep_interval, None);
        assert_eq!(config.max_attempts, 4);
        assert_eq!(config.openrouter_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.openrouter_model, "openai/gpt-4o-mini");
    }

    #[test]
    fn test_invalid_values_are_configuration_errors() {
        for pairs in [
            [("AI_RATE_LIMIT_ENABLED", "maybe")],
            [("AI_RATE_LIMIT_PROFILE", "lenient")],
            [("AI_STORE_SWEEP_SECS", "-5")],
            [("AI_MAX_ATTEMPTS", "many")],
        ] {
            assert!(matches!(config_from(&pairs), Err(GovernanceError::Configuration(_))));
        }
    }

    #[test]
    fn test_blank_api_key_is_missing() {
        assert_eq!(config_from(&[("OPENROUTER_API_KEY", "  ")]).unwrap().openrouter_api_key, None);
    }

    #[test]
    fn test_zero_attempts_clamped_to_one() {
        assert_eq!(config_from(&[("AI_MAX_ATTEMPTS", "0")]).unwrap().max_attempts, 1);
    }
}
