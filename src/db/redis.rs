use redis::AsyncCommands;

use super::DbClient;
use crate::errors::ApiError;
use crate::services::links::{self, LinkClaim};
use crate::Result;

impl DbClient {
    pub async fn set_cache_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        let mut redis_conn = self.get_async_redis_conn().await.map_err(|err| {
            tracing::error!("Redis connection error: {}", err);
            ApiError::from(err)
        })?;

        redis_conn
            .set_ex::<_, _, ()>(key, value, ttl_seconds)
            .await
            .map_err(|err| {
                tracing::error!("Redis SET failed: {}", err);
                ApiError::from(err)
            })?;
        Ok(())
    }

    pub async fn get_cache(&self, key: &str) -> Result<Option<String>> {
        let mut redis_conn = self.get_async_redis_conn().await.map_err(|err| {
            tracing::error!("Redis connection error: {}", err);
            ApiError::from(err)
        })?;

        redis_conn.get(key).await.map_err(|err| {
            tracing::error!("Redis GET failed: {}", err);
            ApiError::from(err)
        })
    }

    /// Stores a link claim and returns its freshly generated token
    pub async fn store_link(&self, claim: &LinkClaim, ttl_seconds: u64) -> Result<String> {
        let token = links::generate_token();
        let value = serde_json::to_string(claim)?;
        self.set_cache_ex(&links::cache_key(&token), &value, ttl_seconds)
            .await?;
        tracing::info!("Issued access link for {}", claim.phone);
        Ok(token)
    }

    /// Resolves a token to its claim; `None` when unknown or expired
    pub async fn get_link(&self, token: &str) -> Result<Option<LinkClaim>> {
        if !links::is_well_formed(token) {
            return Ok(None);
        }
        match self.get_cache(&links::cache_key(token)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_malformed_token_skips_redis() {
        // The Redis URL is unreachable; a lookup that got that far would fail
        let client = DbClient::new("postgres://localhost:1/unused", "redis://127.0.0.1:1").unwrap();
        let claim = client.get_link("not a token").await.unwrap();
        assert!(claim.is_none());
    }

    #[tokio::test]
    #[ignore = "needs TEST_REDIS_URL"]
    async fn test_link_round_trip() {
        dotenv::dotenv().ok();
        let redis_url = std::env::var("TEST_REDIS_URL").unwrap();
        let client = DbClient::new("postgres://localhost:1/unused", &redis_url).unwrap();

        let claim = LinkClaim {
            name: "Meera".to_string(),
            phone: "9000000001".to_string(),
            order_id: Some(5),
        };
        let token = client.store_link(&claim, 1).await.unwrap();
        assert_eq!(client.get_link(&token).await.unwrap(), Some(claim));

        tokio::time::sleep(std::time::Duration::from_millis(2100)).await;
        assert_eq!(client.get_link(&token).await.unwrap(), None);
    }
}
