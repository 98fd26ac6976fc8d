//! Redis adapters.

mod processed_notification_store;

pub use processed_notification_store::RedisProcessedNotificationStore;

use std::time::Duration;

use redis::aio::MultiplexedConnection;

use crate::domain::foundation::{DomainError, ErrorCode};

/// Opens a multiplexed connection, failing if Redis does not answer within `timeout`.
pub async fn connect(url: &str, timeout: Duration) -> Result<MultiplexedConnection, DomainError> {
    let client = redis::Client::open(url)
        .map_err(|e| DomainError::new(ErrorCode::CacheError, format!("invalid redis url: {}", e)))?;

    match tokio::time::timeout(timeout, client.get_multiplexed_tokio_connection()).await {
        Ok(Ok(conn)) => Ok(conn),
        Ok(Err(e)) => Err(DomainError::new(
            ErrorCode::CacheError,
            format!("redis connection failed: {}", e),
        )),
        Err(_) => Err(DomainError::new(
            ErrorCode::CacheError,
            "redis connection timed out",
        )),
    }
}
