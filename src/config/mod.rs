//! Server configuration (layered: code > env > `.env` file > defaults).

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{EcoError, Result};

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 4000;
const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_FORM_MODEL: &str = "gpt-3.5-turbo-1106";
const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 20;
const DEFAULT_HISTORY_MAX_MESSAGES: usize = 20;

/// Runtime configuration for the proxy.
#[derive(Clone)]
pub struct ServerConfig {
    pub api_key: String,
    pub base_url: Option<String>,
    pub chat_model: String,
    pub form_model: String,
    /// Assistant used by `/assistant`.
    pub assistant_id: Option<String>,
    /// Assistant used by `/ecoclaim_assistant`.
    pub ecoclaim_assistant_id: Option<String>,
    pub allowed_origins: Vec<String>,
    pub host: String,
    pub port: u16,
    pub poll_interval: Duration,
    pub poll_max_attempts: u32,
    pub history_max_messages: usize,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("api_key", &"..")
            .field("base_url", &self.base_url)
            .field("chat_model", &self.chat_model)
            .field("form_model", &self.form_model)
            .field("assistant_id", &self.assistant_id)
            .field("ecoclaim_assistant_id", &self.ecoclaim_assistant_id)
            .field("allowed_origins", &self.allowed_origins)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("poll_interval", &self.poll_interval)
            .field("poll_max_attempts", &self.poll_max_attempts)
            .field("history_max_messages", &self.history_max_messages)
            .finish()
    }
}

impl ServerConfig {
    /// Create a config with defaults and the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            form_model: DEFAULT_FORM_MODEL.to_string(),
            assistant_id: None,
            ecoclaim_assistant_id: None,
            allowed_origins: vec![DEFAULT_ALLOWED_ORIGIN.to_string()],
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            poll_max_attempts: DEFAULT_POLL_MAX_ATTEMPTS,
            history_max_messages: DEFAULT_HISTORY_MAX_MESSAGES,
        }
    }

    /// Load from environment variables, reading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("OPENAI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| EcoError::Configuration("Missing OPENAI_API_KEY".into()))?;
        let mut config = Self::new(api_key);

        config.base_url = lookup("OPENAI_BASE_URL");
        if let Some(model) = lookup("CHAT_MODEL") {
            config.chat_model = model;
        }
        if let Some(model) = lookup("FORM_MODEL") {
            config.form_model = model;
        }
        config.assistant_id = lookup("ASSISTANT_ID");
        config.ecoclaim_assistant_id = lookup("ECOCLAIM_ASSISTANT_ID");

        if let Some(origins) = lookup("ALLOWED_ORIGINS") {
            config.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(host) = lookup("HOST") {
            config.host = host;
        }
        if let Some(port) = parse_var::<u16, _>(&lookup, "PORT")? {
            config.port = port;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "RUN_POLL_INTERVAL_MS")? {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(attempts) = parse_var::<u32, _>(&lookup, "RUN_POLL_MAX_ATTEMPTS")? {
            if attempts == 0 {
                return Err(EcoError::Configuration(
                    "RUN_POLL_MAX_ATTEMPTS must be at least 1".into(),
                ));
            }
            config.poll_max_attempts = attempts;
        }
        if let Some(max) = parse_var::<usize, _>(&lookup, "HISTORY_MAX_MESSAGES")? {
            if max == 0 {
                return Err(EcoError::Configuration(
                    "HISTORY_MAX_MESSAGES must be at least 1".into(),
                ));
            }
            config.history_max_messages = max;
        }

        Ok(config)
    }

    /// Whether `origin` is in the CORS allow-list.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|allowed| allowed == "*" || allowed == origin)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| EcoError::Configuration(format!("Invalid {key} '{raw}': {e}"))),
    }
}
