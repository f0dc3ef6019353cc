use crate::retry::RetryPolicy;

/// Process configuration, read once at startup.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub port: u16,
    pub frontend_url: Option<String>,
    pub database_url: Option<String>,
    pub retry: RetryPolicy,
}

impl AppConfig {
    pub fn from_env() -> Self {
        fn string_env(name: &str) -> Option<String> {
            std::env::var(name).ok().filter(|v| !v.trim().is_empty())
        }
        Self {
            bind_addr: string_env("BOARD_BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: string_env("BOARD_PORT").and_then(|v| v.parse().ok()).unwrap_or(8080),
            frontend_url: string_env("FRONTEND_URL"),
            database_url: string_env("DATABASE_URL"),
            retry: RetryPolicy::from_env(),
        }
    }
}
