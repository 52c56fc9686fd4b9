use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub app: AppSettings,
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
    pub links: LinkSettings,
    pub sweep: SweepSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub name: String,
    pub max_pool_size: Option<u32>,
    pub min_pool_size: Option<u32>,
    pub server_selection_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub access_token_ttl_secs: u64,
    pub refresh_token_ttl_secs: u64,
    pub issuer: String,
}

/// Signed links handed out for company and project admission.
#[derive(Debug, Deserialize, Clone)]
pub struct LinkSettings {
    pub secret: String,
    pub company_invite_ttl_secs: u64,
    pub project_join_ttl_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SweepSettings {
    pub enabled: bool,
    /// Six-field cron expression (seconds first).
    pub cron: String,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::default()
                    .separator("__")
                    .prefix("WORKNEST")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("app.cors_origins"),
            )
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 5001)?
            .set_default("app.cors_origins", Vec::<String>::new())?
            .set_default("database.url", "mongodb://localhost:27017")?
            .set_default("database.name", "worknest")?
            .set_default("jwt.secret", "change-me-in-production")?
            .set_default("jwt.access_token_ttl_secs", 3600)?
            .set_default("jwt.refresh_token_ttl_secs", 604800)?
            .set_default("jwt.issuer", "worknest")?
            .set_default("links.secret", "change-me-links-in-production")?
            .set_default("links.company_invite_ttl_secs", 86400)?
            .set_default("links.project_join_ttl_secs", 604800)?
            .set_default("sweep.enabled", true)?
            .set_default("sweep.cron", "0 0 0 * * *")?
            .build()?;

        config.try_deserialize()
    }
}
