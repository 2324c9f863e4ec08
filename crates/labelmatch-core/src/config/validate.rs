//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

const KNOWN_PROVIDERS: &[&str] = &["openai", "anthropic", "ollama"];

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fraction = self.scheduler.cpu_fraction;
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(ConfigError::ValidationError(
                "scheduler.cpu_fraction must be in (0.0, 1.0]".into(),
            ));
        }
        if self.scheduler.max_workers == Some(0) {
            return Err(ConfigError::ValidationError(
                "scheduler.max_workers must be > 0".into(),
            ));
        }
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.llm_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.llm_timeout_ms must be > 0".into(),
            ));
        }
        if !KNOWN_PROVIDERS.contains(&self.llm.default_provider.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "llm.default_provider must be one of {}",
                KNOWN_PROVIDERS.join(", ")
            )));
        }
        if self.general.input_dir == self.general.output_dir {
            return Err(ConfigError::ValidationError(
                "general.output_dir must differ from general.input_dir".into(),
            ));
        }
        Ok(())
    }
}
