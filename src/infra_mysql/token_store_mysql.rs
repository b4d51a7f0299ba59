use super::util::store_error;
use crate::domain_model::*;
use crate::domain_port::*;
use sqlx::MySqlPool;

/// Token store backed by the `refresh_token` table, one row per live token.
pub struct MySqlTokenStore {
    pool: MySqlPool,
}

impl MySqlTokenStore {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlTokenStore { pool }
    }
}

#[async_trait::async_trait]
impl TokenStore for MySqlTokenStore {
    async fn add(&self, user_id: &UserId, token: &RefreshToken) -> Result<(), TokenStoreError> {
        // Re-adding a live token is a no-op. Anything else, such as a token
        // too long for the column, must still fail.
        sqlx::query(
            r#"
INSERT INTO refresh_token (user_id, token)
VALUES (?, ?)
ON DUPLICATE KEY UPDATE token = token
"#,
        )
        .bind(user_id)
        .bind(token.as_str())
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(())
    }

    async fn remove(
        &self,
        user_id: &UserId,
        token: &RefreshToken,
    ) -> Result<bool, TokenStoreError> {
        let result = sqlx::query("DELETE FROM refresh_token WHERE user_id = ? AND token = ?")
            .bind(user_id)
            .bind(token.as_str())
            .execute(&self.pool)
            .await
            .map_err(store_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_all(&self, user_id: &UserId) -> Result<usize, TokenStoreError> {
        let result = sqlx::query("DELETE FROM refresh_token WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;

        Ok(result.rows_affected() as usize)
    }

    async fn list_all(&self, user_id: &UserId) -> Result<Vec<RefreshToken>, TokenStoreError> {
        let tokens: Vec<String> =
            sqlx::query_scalar("SELECT token FROM refresh_token WHERE user_id = ?")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await
                .map_err(store_error)?;

        Ok(tokens.into_iter().map(RefreshToken).collect())
    }
}
