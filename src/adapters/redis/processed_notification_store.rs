//! Redis-backed notification seen-set for multi-node deployments.
//!
//! A lease is `SET key pending NX PX lease`, atomic across nodes. Marking a
//! key processed overwrites it with `done` for the retention window. Redis
//! expires both, so no cleanup job is needed.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{ClaimOutcome, ProcessedNotificationStore};

const PENDING: &str = "pending";
const DONE: &str = "done";

// Deletes the key only while it still holds a lease.
const RELEASE_LEASE: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

#[derive(Clone)]
pub struct RedisProcessedNotificationStore {
    conn: MultiplexedConnection,
    key_prefix: String,
}

impl RedisProcessedNotificationStore {
    pub fn new(conn: MultiplexedConnection, key_prefix: impl Into<String>) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
        }
    }

    fn redis_key(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }
}

fn cache_error(e: redis::RedisError) -> DomainError {
    DomainError::new(ErrorCode::CacheError, format!("redis: {}", e))
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl ProcessedNotificationStore for RedisProcessedNotificationStore {
    async fn try_claim(&self, key: &str, lease: Duration) -> Result<ClaimOutcome, DomainError> {
        let mut conn = self.conn.clone();
        let redis_key = self.redis_key(key);

        let reply: Option<String> = redis::cmd("SET")
            .arg(&redis_key)
            .arg(PENDING)
            .arg("NX")
            .arg("PX")
            .arg(millis(lease))
            .query_async(&mut conn)
            .await
            .map_err(cache_error)?;
        if reply.is_some() {
            return Ok(ClaimOutcome::Claimed);
        }

        let current: Option<String> = conn.get(&redis_key).await.map_err(cache_error)?;
        // A key that vanished between the two calls is treated as busy; the
        // gateway retries shortly.
        Ok(match current.as_deref() {
            Some(DONE) => ClaimOutcome::Processed,
            _ => ClaimOutcome::InFlight,
        })
    }

    async fn mark_processed(&self, key: &str, retention: Duration) -> Result<(), DomainError> {
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(self.redis_key(key))
            .arg(DONE)
            .arg("PX")
            .arg(millis(retention))
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(cache_error)
    }

    async fn release(&self, key: &str) -> Result<(), DomainError> {
        let mut conn = self.conn.clone();
        redis::Script::new(RELEASE_LEASE)
            .key(self.redis_key(key))
            .arg(PENDING)
            .invoke_async::<_, i64>(&mut conn)
            .await
            .map(|_| ())
            .map_err(cache_error)
    }
}
