//! Infrastructure layer: database, repositories, cache and transactions.

pub mod cache;
pub mod db;
pub mod repositories;
pub mod unit_of_work;

pub use cache::{Cache, CacheBackend, MemoryBackend, RedisBackend};
pub use db::{Database, Migrator};
pub use unit_of_work::{with_transaction, Persistence, UnitOfWork};
