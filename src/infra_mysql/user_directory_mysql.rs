use super::util::directory_error;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

pub struct MySqlUserDirectory {
    pool: MySqlPool,
}

impl MySqlUserDirectory {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlUserDirectory { pool }
    }

    fn row_to_record(row: MySqlRow) -> Result<UserRecord, DirectoryError> {
        let user_id: UserId = row.try_get("user_id").map_err(directory_error)?;
        let username: String = row.try_get("username").map_err(directory_error)?;
        let password_hash: String = row.try_get("password_hash").map_err(directory_error)?;
        let created_at: DateTime<Utc> = row.try_get("created_at").map_err(directory_error)?;

        Ok(UserRecord {
            user_id,
            username,
            password_hash,
            created_at,
        })
    }
}

#[async_trait::async_trait]
impl UserDirectory for MySqlUserDirectory {
    async fn create(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<UserRecord, DirectoryError> {
        let record = UserRecord {
            user_id: UserId::generate(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };

        // The unique index on `username` turns a lost sign-up race into
        // ER_DUP_ENTRY, reported as AlreadyExists.
        sqlx::query(
            r#"
INSERT INTO user (user_id, username, password_hash, created_at)
VALUES (?, ?, ?, ?)
"#,
        )
        .bind(&record.user_id)
        .bind(&record.username)
        .bind(&record.password_hash)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(directory_error)?;

        Ok(record)
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, DirectoryError> {
        let row_opt: Option<MySqlRow> = sqlx::query(
            r#"
SELECT user_id, username, password_hash, created_at
FROM user
WHERE username = ?
"#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(directory_error)?;

        row_opt.map(Self::row_to_record).transpose()
    }

    async fn find_by_id(&self, user_id: &UserId) -> Result<Option<UserRecord>, DirectoryError> {
        let row_opt: Option<MySqlRow> = sqlx::query(
            r#"
SELECT user_id, username, password_hash, created_at
FROM user
WHERE user_id = ?
"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(directory_error)?;

        row_opt.map(Self::row_to_record).transpose()
    }
}
