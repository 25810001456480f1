use std::{env, time::Duration};

use log::*;
use loyalty_engine::reconciler::{ReconcilerConfig, DEFAULT_POLL_INTERVAL, DEFAULT_WORKER_COUNT};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/loyalty.db";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub database_url: String,
    /// Base url of the external accrual calculation service, e.g. "http://localhost:8080".
    pub accrual_address: String,
    pub reconciler: ReconcilerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            accrual_address: String::default(),
            reconciler: ReconcilerConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env_or_default() -> Self {
        let database_url = env::var("DATABASE_URI").unwrap_or_else(|_| {
            warn!("🪛️ DATABASE_URI not set, using the default, {DEFAULT_DATABASE_URL}, instead.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let accrual_address = env::var("ACCRUAL_SYSTEM_ADDRESS").unwrap_or_else(|_| {
            error!("🪛️ ACCRUAL_SYSTEM_ADDRESS is not set. Orders will never be reconciled until it is.");
            String::default()
        });
        let worker_count = env::var("ACCRUAL_WORKER_COUNT")
            .map(|s| {
                s.parse::<usize>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid worker count for ACCRUAL_WORKER_COUNT. {e} Using the default, \
                         {DEFAULT_WORKER_COUNT}, instead."
                    );
                    DEFAULT_WORKER_COUNT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_WORKER_COUNT);
        let poll_interval = env::var("ACCRUAL_POLL_INTERVAL_MS")
            .map(|s| {
                s.parse::<u64>().map(Duration::from_millis).unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid interval for ACCRUAL_POLL_INTERVAL_MS. {e} Using the default, \
                         {}ms, instead.",
                        DEFAULT_POLL_INTERVAL.as_millis()
                    );
                    DEFAULT_POLL_INTERVAL
                })
            })
            .ok()
            .unwrap_or(DEFAULT_POLL_INTERVAL);
        let reconciler = ReconcilerConfig { worker_count, poll_interval };
        Self { database_url, accrual_address, reconciler }
    }
}
