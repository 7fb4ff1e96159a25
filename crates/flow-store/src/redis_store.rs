//! Redis-backed `TransactionStore`. Records live under `transaction:<key>`
//! hashes; the fingerprint -> key mapping lives in one side hash,
//! `transaction_hashes`, so `check_duplicate` is a single `HGET`.
//!
//! `create_transaction` has to check-and-claim the fingerprint and write
//! the record in one atomic step, or two concurrent identical requests
//! could both win the duplicate check and both create a run. A Lua script
//! gives us that atomicity in a single round trip without `WATCH` retries.

use std::collections::HashMap;

use async_trait::async_trait;
use flow_domain::RunStatus;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::record::TransactionRecord;
use crate::store::{StatusUpdate, TransactionStore};

const INDEX_KEY: &str = "transaction_hashes";

fn record_key(key: &str) -> String {
    format!("transaction:{key}")
}

/// `HSETNX` the fingerprint, bail out if it was already claimed, otherwise
/// write every record field and set the record's TTL. The index hash
/// itself is never expired — a stale fingerprint entry outliving its
/// record is harmless, since `check_duplicate` only ever trusts a
/// fingerprint hit once `get_transaction` confirms the record still
/// exists.
const CREATE_SCRIPT: &str = r#"
local record_key = KEYS[1]
local index_key = KEYS[2]
local fingerprint = ARGV[1]
local key = ARGV[2]
local ttl = tonumber(ARGV[3])

if redis.call('HSETNX', index_key, fingerprint, key) == 0 then
    return 0
end

for i = 4, #ARGV, 2 do
    redis.call('HSET', record_key, ARGV[i], ARGV[i + 1])
end
redis.call('EXPIRE', record_key, ttl)
return 1
"#;

/// Deletes the record and, only if `key` is still the fingerprint's current
/// claimant, its entry in the index hash — mirrors `CREATE_SCRIPT`'s
/// check-and-act atomicity so a release racing a newer claim can't delete
/// the newer claim's index entry out from under it.
const RELEASE_SCRIPT: &str = r#"
local record_key = KEYS[1]
local index_key = KEYS[2]
local fingerprint = ARGV[1]
local key = ARGV[2]

if redis.call('HGET', index_key, fingerprint) == key then
    redis.call('HDEL', index_key, fingerprint)
end
redis.call('DEL', record_key)
return 1
"#;

pub struct RedisTransactionStore {
    conn: ConnectionManager,
}

impl RedisTransactionStore {
    pub async fn connect(url: &str) -> Result<Self, crate::error::StoreError> {
        let client = redis::Client::open(url).map_err(crate::error::StoreError::from)?;
        let conn = client.get_connection_manager().await.map_err(crate::error::StoreError::from)?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl TransactionStore for RedisTransactionStore {
    async fn check_duplicate(&self, fingerprint: &str) -> Option<String> {
        let mut conn = self.conn.clone();
        match conn.hget::<_, _, Option<String>>(INDEX_KEY, fingerprint).await {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, fingerprint, "check_duplicate failed");
                None
            },
        }
    }

    async fn create_transaction(&self, key: &str, fingerprint: &str, exchange_id: Uuid, request_data: Value,
                                 ttl_seconds: u64)
                                 -> bool {
        let record = TransactionRecord::new(fingerprint, exchange_id, request_data, ttl_seconds);
        let fields = record.to_fields();

        let mut args: Vec<String> = vec![fingerprint.to_string(), key.to_string(), ttl_seconds.to_string()];
        for (field, value) in &fields {
            args.push(field.clone());
            args.push(value.clone());
        }

        let mut conn = self.conn.clone();
        let script = redis::Script::new(CREATE_SCRIPT);
        let mut invocation = script.key(record_key(key)).key(INDEX_KEY);
        for arg in &args {
            invocation = invocation.arg(arg);
        }
        match invocation.invoke_async::<_, i64>(&mut conn).await {
            Ok(created) => created == 1,
            Err(err) => {
                warn!(error = %err, key, fingerprint, "create_transaction failed");
                false
            },
        }
    }

    async fn update_status(&self, key: &str, status: RunStatus, update: Option<StatusUpdate>) -> bool {
        let mut conn = self.conn.clone();
        let Some(mut record) = self.get_transaction(key).await else { return false };

        record.status = status;
        record.updated_at = chrono::Utc::now();
        if let Some(update) = update {
            record.results.extend(update.results);
            record.errors.extend(update.errors);
            record.error_kinds.extend(update.error_kinds);
            if let Some(retry_count) = update.retry_count {
                record.retry_count = retry_count;
            }
        }

        let fields = record.to_fields();
        let pairs: Vec<(String, String)> = fields.into_iter().collect();
        let ttl = record.ttl_seconds as i64;
        let rk = record_key(key);

        let result: redis::RedisResult<()> = redis::pipe().atomic()
                                                            .hset_multiple(&rk, &pairs)
                                                            .ignore()
                                                            .expire(&rk, ttl)
                                                            .ignore()
                                                            .query_async(&mut conn)
                                                            .await;
        match result {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, key, "update_status failed");
                false
            },
        }
    }

    async fn get_transaction(&self, key: &str) -> Option<TransactionRecord> {
        let mut conn = self.conn.clone();
        match conn.hgetall::<_, HashMap<String, String>>(record_key(key)).await {
            Ok(fields) if fields.is_empty() => None,
            Ok(fields) => TransactionRecord::from_fields(&fields),
            Err(err) => {
                warn!(error = %err, key, "get_transaction failed");
                None
            },
        }
    }

    async fn get_transactions_by_status(&self, status: RunStatus) -> HashMap<String, TransactionRecord> {
        let mut conn = self.conn.clone();
        let mut out = HashMap::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = match redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg("transaction:*")
                .arg("COUNT")
                .arg(200)
                .query_async(&mut conn)
                .await
            {
                Ok(result) => result,
                Err(err) => {
                    warn!(error = %err, "scan failed while listing transactions by status");
                    break;
                },
            };
            for full_key in keys {
                let Some(short_key) = full_key.strip_prefix("transaction:") else { continue };
                if let Some(record) = self.get_transaction(short_key).await {
                    if record.status == status {
                        out.insert(short_key.to_string(), record);
                    }
                }
            }
            cursor = next;
            if cursor == 0 {
                break;
            }
        }
        out
    }

    async fn release_claim(&self, key: &str, fingerprint: &str) {
        let mut conn = self.conn.clone();
        let script = redis::Script::new(RELEASE_SCRIPT);
        let result: redis::RedisResult<i64> =
            script.key(record_key(key)).key(INDEX_KEY).arg(fingerprint).arg(key).invoke_async(&mut conn).await;
        if let Err(err) = result {
            warn!(error = %err, key, fingerprint, "release_claim failed");
        }
    }

    async fn close(&self) {}
}
