//! Configuration for querybot.
//!
//! Everything is read from the environment. `.env` files are loaded by the
//! binary with `dotenvy` before [`Config::from_env`] runs.

use std::path::PathBuf;
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};

use crate::error::ConfigError;

/// Main configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    pub database: DatabaseConfig,
    pub presentation: PresentationConfig,
    pub history: HistoryConfig,
    /// HTTP channel, only present when a port or secret is configured.
    pub http: Option<HttpConfig>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            llm: LlmConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            presentation: PresentationConfig::from_env()?,
            history: HistoryConfig::from_env()?,
            http: HttpConfig::from_env()?,
        })
    }
}

/// Which LLM backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmProviderType {
    /// Google Gemini through the OpenAI-compatible endpoint.
    #[default]
    Google,
}

impl FromStr for LlmProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "google" | "gemini" => Ok(Self::Google),
            other => Err(format!("unknown provider '{}', expected 'google'", other)),
        }
    }
}

/// LLM configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: LlmProviderType,
    pub google: GoogleConfig,
}

impl LlmConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            provider: parse_optional_env("LLM_PROVIDER", LlmProviderType::default())?,
            google: GoogleConfig::from_env()?,
        })
    }
}

/// Google Gemini provider configuration.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub api_key: Option<SecretString>,
    pub model: String,
    pub base_url: String,
}

impl GoogleConfig {
    pub const DEFAULT_MODEL: &'static str = "gemini-2.0-flash";
    pub const DEFAULT_BASE_URL: &'static str =
        "https://generativelanguage.googleapis.com/v1beta/openai";

    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: optional_env("GOOGLE_API_KEY")?.map(SecretString::from),
            model: optional_env("GOOGLE_MODEL")?
                .unwrap_or_else(|| Self::DEFAULT_MODEL.to_string()),
            base_url: optional_env("GOOGLE_BASE_URL")?
                .unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string()),
        })
    }
}

/// Database connection configuration.
///
/// `DATABASE_URL` wins over the individual `DB_*` variables when both are set.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<SecretString>,
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<SecretString>,
    pub name: String,
    pub pool_size: usize,
}

impl DatabaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let pool_size: usize = parse_optional_env("DB_POOL_SIZE", 1)?;
        if pool_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "DB_POOL_SIZE".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            url: optional_env("DATABASE_URL")?.map(SecretString::from),
            host: optional_env("DB_HOST")?.unwrap_or_else(|| "localhost".to_string()),
            port: parse_optional_env("DB_PORT", 5432)?,
            user: optional_env("DB_USER")?,
            password: optional_env("DB_PASSWORD")?.map(SecretString::from),
            name: optional_env("DB_NAME")?.unwrap_or_else(|| "chinook".to_string()),
            pool_size,
        })
    }

    /// Connection URL, if one was given explicitly.
    pub fn url(&self) -> Option<&str> {
        self.url.as_ref().map(|u| u.expose_secret())
    }

    /// Human-readable target for logs (never includes the password).
    pub fn display_target(&self) -> String {
        if self.url.is_some() {
            return "DATABASE_URL".to_string();
        }
        format!(
            "{}@{}:{}/{}",
            self.user.as_deref().unwrap_or("<default>"),
            self.host,
            self.port,
            self.name
        )
    }
}

/// How results are shown to the user.
#[derive(Debug, Clone)]
pub struct PresentationConfig {
    /// Results with more cells (rows × columns) than this are exported.
    pub cell_threshold: usize,
    /// Soft cap on rows rendered inline.
    pub max_display_rows: usize,
    /// Rows included in the summary prompt sample.
    pub summary_sample_rows: usize,
    /// Where the REPL writes spreadsheet exports.
    pub export_dir: PathBuf,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            cell_threshold: 60,
            max_display_rows: 10,
            summary_sample_rows: 10,
            export_dir: PathBuf::from("."),
        }
    }
}

impl PresentationConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            cell_threshold: parse_optional_env("CELL_THRESHOLD", defaults.cell_threshold)?,
            max_display_rows: parse_optional_env("MAX_DISPLAY_ROWS", defaults.max_display_rows)?,
            summary_sample_rows: parse_optional_env(
                "SUMMARY_SAMPLE_ROWS",
                defaults.summary_sample_rows,
            )?,
            export_dir: optional_env("EXPORT_DIR")?
                .map(PathBuf::from)
                .unwrap_or(defaults.export_dir),
        })
    }
}

/// Conversation transcript configuration.
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// JSON-lines file mirroring every appended turn. `None` disables it.
    pub transcript_path: Option<PathBuf>,
}

impl HistoryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let disabled: bool = parse_optional_env("QUERYBOT_TRANSCRIPT_DISABLED", false)?;
        if disabled {
            return Ok(Self {
                transcript_path: None,
            });
        }
        let path = optional_env("QUERYBOT_TRANSCRIPT")?
            .map(PathBuf::from)
            .unwrap_or_else(default_transcript_path);
        Ok(Self {
            transcript_path: Some(path),
        })
    }
}

/// Get the default transcript path (~/.querybot/transcript.jsonl).
pub fn default_transcript_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".querybot")
        .join("transcript.jsonl")
}

/// HTTP channel configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    pub webhook_secret: Option<SecretString>,
    pub user_id: String,
}

impl HttpConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let port = optional_env("HTTP_PORT")?;
        let secret = optional_env("HTTP_WEBHOOK_SECRET")?;
        if port.is_none() && secret.is_none() {
            return Ok(None);
        }

        let port = match port {
            Some(p) => p.parse().map_err(|e| ConfigError::InvalidValue {
                key: "HTTP_PORT".to_string(),
                message: format!("{}", e),
            })?,
            None => 8080,
        };

        Ok(Some(Self {
            host: optional_env("HTTP_HOST")?.unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            webhook_secret: secret.map(SecretString::from),
            user_id: optional_env("HTTP_USER_ID")?.unwrap_or_else(|| "http".to_string()),
        }))
    }
}

fn optional_env(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(val) if val.trim().is_empty() => Ok(None),
        Ok(val) => Ok(Some(val)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("failed to read: {}", e),
        }),
    }
}

fn parse_optional_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    optional_env(key)?
        .map(|s| {
            s.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{}", e),
            })
        })
        .transpose()
        .map(|opt| opt.unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presentation_defaults() {
        let config = PresentationConfig::default();
        assert_eq!(config.cell_threshold, 60);
        assert_eq!(config.max_display_rows, 10);
        assert_eq!(config.summary_sample_rows, 10);
    }

    #[test]
    fn test_provider_type_parse() {
        assert_eq!(
            "Gemini".parse::<LlmProviderType>().unwrap(),
            LlmProviderType::Google
        );
        assert!("openai".parse::<LlmProviderType>().is_err());
    }

    #[test]
    fn test_display_target_hides_password() {
        let config = DatabaseConfig {
            url: None,
            host: "db.local".to_string(),
            port: 5433,
            user: Some("reader".to_string()),
            password: Some(SecretString::from("hunter2")),
            name: "chinook".to_string(),
            pool_size: 1,
        };
        let target = config.display_target();
        assert_eq!(target, "reader@db.local:5433/chinook");
        assert!(!target.contains("hunter2"));
    }

    #[test]
    fn test_default_transcript_path() {
        let path = default_transcript_path();
        assert!(path.ends_with("transcript.jsonl"));
        assert!(path.to_string_lossy().contains(".querybot"));
    }
}
