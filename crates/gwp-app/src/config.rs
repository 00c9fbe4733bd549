//! Process configuration read from environment variables.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use gwp_engine::RetryPolicy;
use gwp_store::TableNames;
use url::Url;

use crate::error::{AppError, AppResult};

pub const DEFAULT_IMPACT_METHOD: &str = "IPCC 2021 AR6";

/// Datastore endpoint and service key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatastoreConfig {
    pub url: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub engine_host: String,
    pub engine_port: u16,
    pub retry: RetryPolicy,
    /// Timeout for opening one TCP connection to the engine.
    pub connect_timeout: Duration,
    pub poll_interval: Duration,
    pub impact_method: String,
    /// `None` when either the URL or the key is unset.
    pub datastore: Option<DatastoreConfig>,
    pub tables: TableNames,
    pub compensate_orphans: bool,
    pub bind_addr: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            engine_host: "olca".to_string(),
            engine_port: 8080,
            retry: RetryPolicy::default(),
            connect_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(500),
            impact_method: DEFAULT_IMPACT_METHOD.to_string(),
            datastore: None,
            tables: TableNames::default(),
            compensate_orphans: false,
            bind_addr: "0.0.0.0:5000".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from `lookup`; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let attempts: u32 = parse_or(&get, "IPC_CONNECT_RETRIES", defaults.retry.attempts)?;
        if attempts == 0 {
            return Err(AppError::Config {
                key: "IPC_CONNECT_RETRIES",
                message: "must be at least 1".to_string(),
            });
        }
        let delay_s: f64 = parse_or(&get, "IPC_CONNECT_DELAY", defaults.retry.delay.as_secs_f64())?;
        let delay = Duration::try_from_secs_f64(delay_s).map_err(|e| AppError::Config {
            key: "IPC_CONNECT_DELAY",
            message: e.to_string(),
        })?;
        let poll_ms: u64 = parse_or(
            &get,
            "OLCA_POLL_INTERVAL_MS",
            defaults.poll_interval.as_millis() as u64,
        )?;

        let datastore = match (get("SUPABASE_URL"), get("SUPABASE_KEY")) {
            (Some(url), Some(key)) => {
                Url::parse(&url).map_err(|e| AppError::Config {
                    key: "SUPABASE_URL",
                    message: e.to_string(),
                })?;
                Some(DatastoreConfig { url, key })
            }
            _ => None,
        };

        let tables = TableNames {
            impact: get("IPCC_TABLE").unwrap_or(defaults.tables.impact),
            tkm_detail: get("CO2_TKM_TABLE").unwrap_or(defaults.tables.tkm_detail),
            oil_detail: get("CO2_OIL_TABLE").unwrap_or(defaults.tables.oil_detail),
        };

        Ok(Self {
            engine_host: get("OLCA_IPC_HOST").unwrap_or(defaults.engine_host),
            engine_port: parse_or(&get, "OLCA_IPC_PORT", defaults.engine_port)?,
            retry: RetryPolicy { attempts, delay },
            connect_timeout: defaults.connect_timeout,
            poll_interval: Duration::from_millis(poll_ms),
            impact_method: get("OLCA_IMPACT_METHOD").unwrap_or(defaults.impact_method),
            datastore,
            tables,
            compensate_orphans: match get("GWP_COMPENSATE_ORPHANS") {
                Some(raw) => parse_flag("GWP_COMPENSATE_ORPHANS", &raw)?,
                None => defaults.compensate_orphans,
            },
            bind_addr: get("GWP_BIND_ADDR").unwrap_or(defaults.bind_addr),
        })
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse().map_err(|e: T::Err| AppError::Config {
            key,
            message: format!("{raw:?}: {e}"),
        }),
        None => Ok(default),
    }
}

fn parse_flag(key: &'static str, raw: &str) -> AppResult<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::Config {
            key,
            message: format!("{raw:?} is not a boolean"),
        }),
    }
}
