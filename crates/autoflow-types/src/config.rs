//! Application configuration types for autoflow.
//!
//! `AppConfig` represents the top-level `config.toml`. Every section and
//! field has a default so an empty (or missing) file yields a working setup.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
///
/// Loaded from `~/.autoflow/config.toml` by `autoflow-infra`, then overlaid
/// with `AUTOFLOW_*` environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub mail: MailConfig,

    /// Owner assigned to workflows created without an explicit user.
    #[serde(default = "default_user_id")]
    pub default_user_id: i64,
}

fn default_user_id() -> i64 {
    1
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Externally reachable base URL, used to build webhook URLs.
    #[serde(default)]
    pub public_base_url: Option<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_base_url: None,
        }
    }
}

impl ServerConfig {
    /// The base URL webhook callers should use.
    pub fn base_url(&self) -> String {
        match &self.public_base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://localhost:{}", self.port),
        }
    }
}

/// Database settings. `path` defaults to `<data_dir>/autoflow.db`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub path: Option<String>,
}

/// Scheduler tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between reconciliation passes against the store.
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_secs: u64,

    /// Maximum number of scheduled runs dispatched concurrently.
    #[serde(default = "default_worker_concurrency")]
    pub worker_concurrency: usize,

    /// Upper bound on how long the worker sleeps with an empty queue.
    #[serde(default = "default_idle_poll")]
    pub idle_poll_secs: u64,
}

fn default_reconcile_interval() -> u64 {
    300
}

fn default_worker_concurrency() -> usize {
    4
}

fn default_idle_poll() -> u64 {
    60
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            reconcile_interval_secs: default_reconcile_interval(),
            worker_concurrency: default_worker_concurrency(),
            idle_poll_secs: default_idle_poll(),
        }
    }
}

/// Outbound HTTP settings for `http_request` steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_http_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("autoflow/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Mail delivery settings for `send_email` steps.
///
/// `[mail.smtp]` wins over `relay_url`. With neither, email steps fail with
/// "mail relay not configured".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default)]
    pub smtp: Option<SmtpConfig>,

    /// HTTP endpoint accepting JSON messages, for hosted mail APIs.
    #[serde(default)]
    pub relay_url: Option<String>,

    #[serde(default)]
    pub api_token: Option<String>,

    #[serde(default = "default_from_address")]
    pub from_address: String,
}

/// SMTP submission server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,

    #[serde(default = "default_smtp_port")]
    pub port: u16,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub security: SmtpSecurity,
}

fn default_smtp_port() -> u16 {
    587
}

impl SmtpConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_smtp_port(),
            username: None,
            password: None,
            security: SmtpSecurity::default(),
        }
    }
}

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSecurity {
    /// Plain connection upgraded with STARTTLS (submission, port 587).
    #[default]
    StartTls,
    /// TLS from the first byte (port 465).
    Tls,
    /// No encryption. Local relays only.
    None,
}

fn default_from_address() -> String {
    "autoflow@localhost".to_string()
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp: None,
            relay_url: None,
            api_token: None,
            from_address: default_from_address(),
        }
    }
}
