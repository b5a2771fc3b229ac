//! Configuration loader for autoflow.
//!
//! Reads `config.toml` from the data directory (`~/.autoflow/` in production)
//! or from an explicit path, deserializes it into [`AppConfig`], then applies
//! `AUTOFLOW_*` environment overrides. Falls back to defaults when the file
//! is missing or malformed.

use std::path::{Path, PathBuf};

use autoflow_types::config::{AppConfig, SmtpConfig};

use crate::sqlite::pool::sqlite_url;

/// Environment variable naming the data directory.
pub const DATA_DIR_ENV: &str = "AUTOFLOW_DATA_DIR";

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `AUTOFLOW_DATA_DIR` environment variable
/// 2. `~/.autoflow`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".autoflow");
    }

    PathBuf::from(".autoflow")
}

/// Load configuration from `explicit` or `{data_dir}/config.toml`, then
/// overlay the process environment.
pub async fn load_config(data_dir: &Path, explicit: Option<&Path>) -> AppConfig {
    let config_path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| data_dir.join("config.toml"));

    let config = read_config_file(&config_path, explicit.is_some()).await;
    apply_overrides(config, |key| std::env::var(key).ok())
}

async fn read_config_file(config_path: &Path, explicit: bool) -> AppConfig {
    let content = match tokio::fs::read_to_string(config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            if explicit {
                tracing::warn!("Config file {} not found, using defaults", config_path.display());
            } else {
                tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            }
            return AppConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return AppConfig::default();
        }
    };

    match toml::from_str::<AppConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            AppConfig::default()
        }
    }
}

/// Apply `AUTOFLOW_*` overrides read through `lookup`.
pub fn apply_overrides(mut config: AppConfig, lookup: impl Fn(&str) -> Option<String>) -> AppConfig {
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = non_empty("AUTOFLOW_DATABASE_URL") {
        config.database.path = Some(url);
    }
    if let Some(url) = non_empty("AUTOFLOW_MAIL_RELAY_URL") {
        config.mail.relay_url = Some(url);
    }
    if let Some(token) = non_empty("AUTOFLOW_MAIL_API_TOKEN") {
        config.mail.api_token = Some(token);
    }
    if let Some(url) = non_empty("AUTOFLOW_PUBLIC_URL") {
        config.server.public_base_url = Some(url);
    }

    if let Some(host) = non_empty("AUTOFLOW_SMTP_HOST") {
        match config.mail.smtp.as_mut() {
            Some(smtp) => smtp.host = host,
            None => config.mail.smtp = Some(SmtpConfig::new(host)),
        }
    }
    if let Some(smtp) = config.mail.smtp.as_mut() {
        if let Some(port) = non_empty("AUTOFLOW_SMTP_PORT") {
            match port.trim().parse() {
                Ok(port) => smtp.port = port,
                Err(_) => tracing::warn!(port = %port, "ignoring invalid AUTOFLOW_SMTP_PORT"),
            }
        }
        if let Some(user) = non_empty("AUTOFLOW_SMTP_USER") {
            smtp.username = Some(user);
        }
        if let Some(pass) = non_empty("AUTOFLOW_SMTP_PASS") {
            smtp.password = Some(pass);
        }
    }
    config
}

/// The sqlx connection URL for this configuration.
///
/// `database.path` may be a full `sqlite:` URL or a plain file path. When
/// unset, the database lives at `{data_dir}/autoflow.db`.
pub fn database_url(config: &AppConfig, data_dir: &Path) -> String {
    match config.database.path.as_deref() {
        Some(url) if url.starts_with("sqlite:") => url.to_string(),
        Some(path) => sqlite_url(Path::new(path)),
        None => sqlite_url(&data_dir.join("autoflow.db")),
    }
}
