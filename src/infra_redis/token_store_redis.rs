use crate::domain_model::*;
use crate::domain_port::*;
use redis::aio::ConnectionManager;
use redis::{
    AsyncCommands, FromRedisValue, RedisError, RedisResult, RedisWrite, ToRedisArgs, Value,
};
use std::time::Duration;

/// Token store backed by one Redis set per identity at `{prefix}:{user_id}`.
///
/// `SREM` reports how many members it dropped, which makes `remove` an
/// atomic remove-if-present.
pub struct RedisTokenStore {
    conn: ConnectionManager,
    prefix: String,
    key_ttl: Option<Duration>,
}

impl RedisTokenStore {
    pub fn new(conn: redis::aio::ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisTokenStore {
            conn,
            prefix: prefix.into(),
            key_ttl: None,
        }
    }

    /// Expire an identity's whole set this long after its last `add`.
    /// Pass the refresh TTL: every member has expired by then anyway.
    pub fn with_key_ttl(mut self, ttl: Duration) -> Self {
        self.key_ttl = Some(ttl);
        self
    }

    fn key(&self, user_id: &UserId) -> String {
        format!("{}:{}", self.prefix, user_id)
    }
}

fn store_error(e: RedisError) -> TokenStoreError {
    if e.is_io_error() || e.is_timeout() || e.is_connection_dropped() || e.is_connection_refusal()
    {
        TokenStoreError::Unavailable(e.to_string())
    } else {
        TokenStoreError::Internal(e.to_string())
    }
}

impl ToRedisArgs for RefreshToken {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        out.write_arg(self.0.as_bytes())
    }
}

impl FromRedisValue for RefreshToken {
    fn from_redis_value(v: &Value) -> RedisResult<Self> {
        let s: String = redis::from_redis_value(v)?;
        Ok(RefreshToken(s))
    }
}

#[async_trait::async_trait]
impl TokenStore for RedisTokenStore {
    async fn add(&self, user_id: &UserId, token: &RefreshToken) -> Result<(), TokenStoreError> {
        let key = self.key(user_id);
        let mut conn = self.conn.clone();
        match self.key_ttl {
            Some(ttl) => {
                let _: () = redis::pipe()
                    .atomic()
                    .sadd(&key, token)
                    .ignore()
                    .expire(&key, ttl.as_secs() as i64)
                    .ignore()
                    .query_async(&mut conn)
                    .await
                    .map_err(store_error)?;
            }
            None => {
                let _: i64 = conn.sadd(&key, token).await.map_err(store_error)?;
            }
        }
        Ok(())
    }

    async fn remove(
        &self,
        user_id: &UserId,
        token: &RefreshToken,
    ) -> Result<bool, TokenStoreError> {
        let key = self.key(user_id);
        let mut conn = self.conn.clone();
        let removed: i64 = conn.srem(&key, token).await.map_err(store_error)?;
        Ok(removed > 0)
    }

    async fn remove_all(&self, user_id: &UserId) -> Result<usize, TokenStoreError> {
        let key = self.key(user_id);
        let mut conn = self.conn.clone();
        let (count, _): (i64, i64) = redis::pipe()
            .atomic()
            .scard(&key)
            .del(&key)
            .query_async(&mut conn)
            .await
            .map_err(store_error)?;
        Ok(count.max(0) as usize)
    }

    async fn list_all(&self, user_id: &UserId) -> Result<Vec<RefreshToken>, TokenStoreError> {
        let key = self.key(user_id);
        let mut conn = self.conn.clone();
        let tokens: Vec<RefreshToken> = conn.smembers(&key).await.map_err(store_error)?;
        Ok(tokens)
    }
}
