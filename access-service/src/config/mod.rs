use platform_core::config as core_config;
use platform_core::error::AppError;
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct AccessConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub database: DatabaseConfig,
    pub hierarchy: HierarchyConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HierarchyConfig {
    /// Ancestor-walk guard: chains longer than this are an error, not
    /// silently truncated.
    pub max_depth: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub idle_ttl_seconds: u64,
    pub max_entries: usize,
}

impl SessionConfig {
    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_seconds)
    }
}

impl AccessConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = AccessConfig {
            common: common_config,
            environment,
            service_name: get_env("SERVICE_NAME", Some("access-service"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            database: DatabaseConfig {
                url: get_env("DATABASE_URL", None, is_prod)?,
                max_connections: get_env("DATABASE_MAX_CONNECTIONS", Some("5"), is_prod)?
                    .parse()
                    .map_err(|e: std::num::ParseIntError| {
                        AppError::ConfigError(anyhow::anyhow!(e.to_string()))
                    })?,
                min_connections: get_env("DATABASE_MIN_CONNECTIONS", Some("1"), is_prod)?
                    .parse()
                    .map_err(|e: std::num::ParseIntError| {
                        AppError::ConfigError(anyhow::anyhow!(e.to_string()))
                    })?,
            },
            hierarchy: HierarchyConfig {
                max_depth: get_env("HIERARCHY_MAX_DEPTH", Some("64"), is_prod)?
                    .parse()
                    .map_err(|e: std::num::ParseIntError| {
                        AppError::ConfigError(anyhow::anyhow!(e.to_string()))
                    })?,
            },
            session: SessionConfig {
                idle_ttl_seconds: get_env("SESSION_IDLE_TTL_SECONDS", Some("1800"), is_prod)?
                    .parse()
                    .map_err(|e: std::num::ParseIntError| {
                        AppError::ConfigError(anyhow::anyhow!(e.to_string()))
                    })?,
                max_entries: get_env("SESSION_MAX_ENTRIES", Some("4096"), is_prod)?
                    .parse()
                    .map_err(|e: std::num::ParseIntError| {
                        AppError::ConfigError(anyhow::anyhow!(e.to_string()))
                    })?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.database.max_connections == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "DATABASE_MAX_CONNECTIONS must be greater than 0"
            )));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "DATABASE_MIN_CONNECTIONS must not exceed DATABASE_MAX_CONNECTIONS"
            )));
        }

        // The guard must sit well above any legitimate tenant chain.
        if self.hierarchy.max_depth < 16 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "HIERARCHY_MAX_DEPTH must be at least 16"
            )));
        }

        if self.session.idle_ttl_seconds == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "SESSION_IDLE_TTL_SECONDS must be greater than 0"
            )));
        }

        if self.session.max_entries == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "SESSION_MAX_ENTRIES must be greater than 0"
            )));
        }

        if self.environment == Environment::Prod && self.session.idle_ttl_seconds > 86_400 {
            // Tier is frozen at login, so idle sessions outlive
            // permission changes.
            tracing::warn!(
                idle_ttl_seconds = self.session.idle_ttl_seconds,
                "session idle TTL exceeds one day"
            );
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}
