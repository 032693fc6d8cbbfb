//! Database layer: pool, repositories, and the account store seam.

mod pool;
mod repositories;
mod store;

pub use pool::{create_pool, run_migrations, DbPool};
pub use repositories::*;
pub use store::{AccountStore, MemoryAccountStore, PgAccountStore};
