use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub relevance_model: String,
    pub max_chunk_chars: usize,
    pub chunk_overlap: usize,
    pub ai_temperature: f32,
    pub ai_max_tokens: u32,
    pub ai_max_concurrency: usize,
    pub ai_timeout_secs: u64,
    pub relevance_threshold: f64,
    pub min_text_chars: usize,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Default for Config {
    fn default() -> Self {
        Self {
            server_address: "0.0.0.0:8000".to_string(),
            openai_api_key: String::new(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            openai_model: "gpt-4o-mini".to_string(),
            relevance_model: "gpt-3.5-turbo".to_string(),
            max_chunk_chars: 6000,
            chunk_overlap: 300,
            ai_temperature: 0.2,
            ai_max_tokens: 2500,
            ai_max_concurrency: 8,
            ai_timeout_secs: 120,
            relevance_threshold: 0.7,
            min_text_chars: 50,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        let defaults = Self::default();

        let config = Self {
            server_address: get_env_or("SERVER_ADDRESS", defaults.server_address),
            openai_api_key: get_env("OPENAI_API_KEY")?,
            openai_base_url: get_env_or("OPENAI_BASE_URL", defaults.openai_base_url),
            openai_model: get_env_or("OPENAI_MODEL", defaults.openai_model),
            relevance_model: get_env_or("RELEVANCE_MODEL", defaults.relevance_model),
            max_chunk_chars: get_env_parse_or("MAX_CHUNK_CHARS", defaults.max_chunk_chars)?,
            chunk_overlap: get_env_parse_or("CHUNK_OVERLAP", defaults.chunk_overlap)?,
            ai_temperature: get_env_parse_or("AI_TEMPERATURE", defaults.ai_temperature)?,
            ai_max_tokens: get_env_parse_or("AI_MAX_TOKENS", defaults.ai_max_tokens)?,
            ai_max_concurrency: get_env_parse_or(
                "AI_MAX_CONCURRENCY",
                defaults.ai_max_concurrency,
            )?,
            ai_timeout_secs: get_env_parse_or("AI_TIMEOUT_SECS", defaults.ai_timeout_secs)?,
            relevance_threshold: get_env_parse_or(
                "RELEVANCE_THRESHOLD",
                defaults.relevance_threshold,
            )?,
            min_text_chars: get_env_parse_or("MIN_TEXT_CHARS", defaults.min_text_chars)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings that would stall the chunker or produce
    /// meaningless thresholds.
    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_chars == 0 {
            return Err(Error::Config("MAX_CHUNK_CHARS must be positive".to_string()));
        }
        if self.chunk_overlap >= self.max_chunk_chars {
            return Err(Error::Config(format!(
                "CHUNK_OVERLAP ({}) must be smaller than MAX_CHUNK_CHARS ({})",
                self.chunk_overlap, self.max_chunk_chars
            )));
        }
        if !(0.0..=2.0).contains(&self.ai_temperature) {
            return Err(Error::Config(format!(
                "AI_TEMPERATURE must be within [0, 2], got {}",
                self.ai_temperature
            )));
        }
        if !(0.0..=1.0).contains(&self.relevance_threshold) {
            return Err(Error::Config(format!(
                "RELEVANCE_THRESHOLD must be within [0, 1], got {}",
                self.relevance_threshold
            )));
        }
        if self.ai_max_concurrency == 0 {
            return Err(Error::Config("AI_MAX_CONCURRENCY must be positive".to_string()));
        }
        Ok(())
    }

    pub fn masked_api_key(&self) -> String {
        let chars: Vec<char> = self.openai_api_key.chars().collect();
        if chars.len() < 8 {
            return "***".to_string();
        }
        let head: String = chars[..3].iter().collect();
        let tail: String = chars[chars.len() - 3..].iter().collect();
        format!("{}...{}", head, tail)
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: String) -> String {
    env::var(name).unwrap_or(default)
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> Result<&'static Config> {
    CONFIG
        .get()
        .ok_or_else(|| Error::Config("Configuration has not been initialized".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_chunk_chars, 6000);
        assert_eq!(config.chunk_overlap, 300);
        assert_eq!(config.ai_max_tokens, 2500);
    }

    #[test]
    fn overlap_not_smaller_than_chunk_is_rejected() {
        let config = Config {
            max_chunk_chars: 300,
            chunk_overlap: 300,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn threshold_out_of_range_is_rejected() {
        let config = Config {
            relevance_threshold: 1.5,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn api_key_is_masked() {
        let config = Config {
            openai_api_key: "sk-abcdefghijkl".to_string(),
            ..Config::default()
        };
        assert_eq!(config.masked_api_key(), "sk-...jkl");
        assert_eq!(Config::default().masked_api_key(), "***");
    }
}
