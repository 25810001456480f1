//! Fixtures for exercising the reconciliation engine without a real database or accrual authority.
mod memory_db;
mod scripted_accrual;

pub use memory_db::MemoryDatabase;
pub use scripted_accrual::ScriptedAccrual;

/// Loads `.env.test` (if present) and initialises logging for tests.
pub fn init_test_logging() {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
}
