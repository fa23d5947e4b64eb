use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub jwt_secret: String,
    pub jwt_expiry_minutes: u64,
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub llm: LlmSettings,
}

/// Chat model and agent settings. Without an API key the planner runs fallback-only.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
    pub max_iterations: usize,
    pub web_search: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            redis_url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into()),
            jwt_secret: required("JWT_SECRET")?,
            jwt_expiry_minutes: env::var("JWT_EXPIRY_MINUTES")
                .unwrap_or_else(|_| "120".into())
                .parse()?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".into())
                .parse()?,
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:5173,http://localhost:3000".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            llm: LlmSettings::from_env()?,
        })
    }
}

impl LlmSettings {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            api_key: env::var("TOGETHER_API_KEY").ok().filter(|s| !s.is_empty()),
            base_url: env::var("LLM_BASE_URL")
                .unwrap_or_else(|_| "https://api.together.xyz/v1".into()),
            model: env::var("LLM_MODEL")
                .unwrap_or_else(|_| "meta-llama/Llama-3-8b-chat-hf".into()),
            temperature: env::var("LLM_TEMPERATURE")
                .unwrap_or_else(|_| "0.7".into())
                .parse()?,
            timeout: Duration::from_secs(
                env::var("LLM_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "60".into())
                    .parse()?,
            ),
            max_iterations: env::var("AGENT_MAX_ITERATIONS")
                .unwrap_or_else(|_| "15".into())
                .parse()?,
            web_search: env::var("WEB_SEARCH_ENABLED")
                .map(|v| !matches!(v.to_lowercase().as_str(), "0" | "false" | "no" | "off"))
                .unwrap_or(true),
        })
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).map_err(|_| anyhow::anyhow!("Missing required env var: {}", key))
}
