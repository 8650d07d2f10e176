use crate::errors::{AppError, AppResult};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub quote_base_url: String,
    pub proxy_fallback: bool,
    pub data_dir: PathBuf,
    pub server_port: u16,
}

impl AppConfig {
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        let proxy_fallback = env_var_or("PROXY_FALLBACK", "true")
            .parse::<bool>()
            .map_err(|e| AppError::Config(format!("PROXY_FALLBACK: {e}")))?;

        let server_port = env_var_or("SERVER_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| AppError::Config(format!("SERVER_PORT: {e}")))?;

        Ok(Self {
            quote_base_url: env_var_or(
                "QUOTE_BASE_URL",
                "https://api.quicknse.example/option-chain",
            ),
            proxy_fallback,
            data_dir: PathBuf::from(env_var_or("DATA_DIR", "data")),
            server_port,
        })
    }
}

fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
