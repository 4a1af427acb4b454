use std::{env, time::Duration};

use kpg_common::parse_boolean_flag;
use log::*;

const DEFAULT_KPG_HOST: &str = "127.0.0.1";
const DEFAULT_KPG_PORT: u16 = 4560;
const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// When true, embedded migrations run at startup. Disable this when the schema is managed externally.
    pub auto_migrate: bool,
    pub notify: NotifyConfig,
}

/// Where completed/failed payment notifications get POSTed. An empty URL list disables outbound
/// notifications entirely.
#[derive(Clone, Debug)]
pub struct NotifyConfig {
    pub urls: Vec<String>,
    pub timeout: Duration,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self { urls: Vec::new(), timeout: DEFAULT_NOTIFY_TIMEOUT }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_KPG_HOST.to_string(),
            port: DEFAULT_KPG_PORT,
            database_url: String::default(),
            auto_migrate: true,
            notify: NotifyConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("KPG_HOST").ok().unwrap_or_else(|| DEFAULT_KPG_HOST.into());
        let port = env::var("KPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for KPG_PORT. {e} Using the default, {DEFAULT_KPG_PORT}, instead."
                    );
                    DEFAULT_KPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_KPG_PORT);
        let database_url = karibu_payment_engine::sqlite::db::db_url();
        let auto_migrate = parse_boolean_flag(env::var("KPG_AUTO_MIGRATE").ok(), true);
        let urls = env::var("KPG_NOTIFY_URLS")
            .map(|s| s.split(',').map(|u| u.trim().to_string()).filter(|u| !u.is_empty()).collect::<Vec<_>>())
            .unwrap_or_default();
        if urls.is_empty() {
            info!("🪛️ KPG_NOTIFY_URLS is not set. Outbound payment notifications are disabled.");
        } else {
            info!("🪛️ Payment notifications will be sent to {} subscriber(s).", urls.len());
        }
        let timeout = env::var("KPG_NOTIFY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| {
                        error!("🪛️ {s} is not a valid value for KPG_NOTIFY_TIMEOUT_SECS. {e} Using the default.");
                        e
                    })
                    .ok()
            })
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_NOTIFY_TIMEOUT);
        Self { host, port, database_url, auto_migrate, notify: NotifyConfig { urls, timeout } }
    }
}
