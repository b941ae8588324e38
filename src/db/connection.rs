use diesel_async::pooled_connection::deadpool::{self, PoolError};
use diesel_async::pooled_connection::{deadpool::Pool, AsyncDieselConnectionManager};
use diesel_async::AsyncPgConnection;
use redis::aio::MultiplexedConnection;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::errors::ApiError;
use crate::Result;

const DEFAULT_POOL_SIZE: usize = 20;

#[derive(Clone)]
pub struct DbClient {
    pub db_pool: Pool<AsyncPgConnection>,
    pub async_redis_conn: Arc<Mutex<Option<MultiplexedConnection>>>,
    redis_url: String,
}

impl DbClient {
    pub fn new(db_url: &str, redis_url: &str) -> Result<Self> {
        Self::with_pool_size(db_url, redis_url, DEFAULT_POOL_SIZE)
    }

    /// Connections are opened lazily, so building a client never touches
    /// Postgres or Redis
    pub fn with_pool_size(db_url: &str, redis_url: &str, pool_size: usize) -> Result<Self> {
        let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(db_url);
        let postgres_pool = Pool::builder(config)
            .max_size(pool_size)
            .build()
            .map_err(|e| ApiError::Custom(format!("Failed to create DB pool: {e}")))?;

        Ok(Self {
            db_pool: postgres_pool,
            async_redis_conn: Arc::new(Mutex::new(None)),
            redis_url: redis_url.to_string(),
        })
    }

    /// Get a connection from the Postgres pool
    pub async fn get_db_conn(
        &self,
    ) -> std::result::Result<deadpool::Object<AsyncPgConnection>, PoolError> {
        self.db_pool.get().await
    }

    /// Get async Redis connection (creates one if it doesn't exist)
    pub async fn get_async_redis_conn(
        &self,
    ) -> std::result::Result<MultiplexedConnection, redis::RedisError> {
        let mut conn_guard = self.async_redis_conn.lock().await;

        if let Some(conn) = conn_guard.as_ref() {
            return Ok(conn.clone());
        }

        let client = redis::Client::open(self.redis_url.as_str())?;
        let multiplexed_conn = client.get_multiplexed_async_connection().await?;
        *conn_guard = Some(multiplexed_conn.clone());
        Ok(multiplexed_conn)
    }
}
