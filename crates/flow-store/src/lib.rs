//! Transaction store: the keyed-hash deduplication and status layer
//! described in §4.2/§6. Two backends share one contract
//! ([`TransactionStore`]) and one conformance suite (`tests/conformance.rs`):
//! [`RedisTransactionStore`] for production, [`InMemoryTransactionStore`]
//! as the degraded-mode / test fallback.

pub mod config;
pub mod error;
pub mod in_memory;
pub mod record;
pub mod redis_store;
pub mod store;

pub use config::StoreConfig;
pub use error::StoreError;
pub use in_memory::InMemoryTransactionStore;
pub use record::TransactionRecord;
pub use redis_store::RedisTransactionStore;
pub use store::{StatusUpdate, TransactionStore};
