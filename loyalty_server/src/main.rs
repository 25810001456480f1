use accrual_client::{AccrualApi, AccrualConfig};
use dotenvy::dotenv;
use log::*;
use loyalty_engine::{ReconcilerPool, SqliteDatabase};
use loyalty_server::{accrual::RemoteAccrual, config::ServerConfig, errors::ServerError};

const MAX_DB_CONNECTIONS: u32 = 16;

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    let config = ServerConfig::from_env_or_default();

    info!("🚀️ Starting the order reconciliation daemon against {}", config.accrual_address);
    match run(config).await {
        Ok(_) => println!("Bye!"),
        Err(e) => eprintln!("{e}"),
    }
}

async fn run(config: ServerConfig) -> Result<(), ServerError> {
    if config.accrual_address.is_empty() {
        return Err(ServerError::ConfigurationError("ACCRUAL_SYSTEM_ADDRESS must be set".to_string()));
    }
    let db = SqliteDatabase::new(&config.database_url, MAX_DB_CONNECTIONS)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    info!("🗃️ Database is at {}", config.database_url);
    let api = AccrualApi::new(AccrualConfig::new(&config.accrual_address))
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let pool = ReconcilerPool::start(config.reconciler, db, RemoteAccrual::new(api));

    tokio::signal::ctrl_c().await?;
    info!("🚀️ Interrupt received, draining in-flight reconciliations");
    pool.shutdown().await;
    Ok(())
}
