use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

use dotenvy::dotenv;

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    pub addr: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub recipient: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub web: WebConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    // The contact forwarders are optional deployments; the matching
    // handler answers 500 when its section is absent.
    pub smtp: Option<SmtpConfig>,
    pub telegram: Option<TelegramConfig>,
}

impl AppConfig {
    /// Loads `Config.toml` and `APP_`-prefixed environment variables
    /// (e.g. `APP_DATABASE__URL`, `APP_JWT__SECRET`).
    ///
    /// There is deliberately no fallback signing secret: a missing or
    /// empty `jwt.secret` refuses to start the process.
    pub fn from_env() -> Result<Self, figment::Error> {
        dotenv().ok();

        let config: AppConfig = Figment::new()
            .merge(Toml::file("Config.toml"))
            .merge(Env::prefixed("APP_").split("__"))
            .extract()?;

        if config.jwt.secret.trim().is_empty() {
            return Err(figment::Error::from(
                "jwt.secret must not be empty; set APP_JWT__SECRET".to_string(),
            ));
        }

        tracing::info!(
            "Configuration loaded, serving on {}:{}",
            config.web.addr,
            config.web.port
        );

        Ok(config)
    }
}
