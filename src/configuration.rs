use std::time::Duration;

use serde_aux::field_attributes::deserialize_number_from_string;
use sqlx::postgres::{PgConnectOptions, PgSslMode};

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub scraper: ScraperSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    pub database_name: String,
    pub require_ssl: bool,
}

impl DatabaseSettings {
    pub fn without_db(&self) -> PgConnectOptions {
        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };
        PgConnectOptions::new()
            .host(&self.host)
            .username(&self.username)
            .password(&self.password)
            .port(self.port)
            .ssl_mode(ssl_mode)
    }

    pub fn with_db(&self) -> PgConnectOptions {
        self.without_db().database(&self.database_name)
    }
}

/// Knobs for the browser pool and the scrape pipeline.
#[derive(serde::Deserialize, Clone, Debug)]
pub struct ScraperSettings {
    pub webdriver_url: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub workers: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub ready_timeout_secs: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub navigation_timeout_secs: u64,
    pub harvest_base_url: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub upload_preview_limit: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub upload_max_bytes: usize,
}

impl ScraperSettings {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:4444".to_string(),
            workers: 3,
            ready_timeout_secs: 10,
            navigation_timeout_secs: 30,
            harvest_base_url: "https://www.facebook.com".to_string(),
            upload_preview_limit: 50,
            upload_max_bytes: 10 * 1024 * 1024,
        }
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().map_err(|e| {
        config::ConfigError::Message(format!("Failed to determine the current directory: {}", e))
    })?;
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;
    let environment_filename = format!("{}.yaml", environment.as_str());

    let settings = config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join("base.yaml"),
        ))
        .add_source(config::File::from(
            configuration_directory.join(environment_filename),
        ))
        // APP_SCRAPER__WORKERS=5 would set `Settings.scraper.workers`
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}

pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Environment;

    #[test]
    fn environment_parses_case_insensitively() {
        let env: Environment = "Production".to_string().try_into().unwrap();
        assert_eq!(env.as_str(), "production");
    }

    #[test]
    fn unknown_environment_is_rejected() {
        let env: Result<Environment, String> = "staging".to_string().try_into();
        assert!(env.is_err());
    }
}
