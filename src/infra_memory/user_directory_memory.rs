use crate::domain_model::*;
use crate::domain_port::*;
use chrono::Utc;
use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct MemoryUserDirectory {
    by_username: DashMap<String, UserRecord>,
    by_id: DashMap<UserId, String>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        MemoryUserDirectory {
            by_username: DashMap::new(),
            by_id: DashMap::new(),
        }
    }
}

#[async_trait::async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn create(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<UserRecord, DirectoryError> {
        let mut created = false;
        let record = self
            .by_username
            .entry(username.to_string())
            .or_insert_with(|| {
                created = true;
                UserRecord {
                    user_id: UserId::generate(),
                    username: username.to_string(),
                    password_hash: password_hash.to_string(),
                    created_at: Utc::now(),
                }
            })
            .value()
            .clone();

        if !created {
            return Err(DirectoryError::AlreadyExists);
        }
        self.by_id
            .insert(record.user_id.clone(), record.username.clone());
        Ok(record)
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, DirectoryError> {
        Ok(self.by_username.get(username).map(|r| r.value().clone()))
    }

    async fn find_by_id(&self, user_id: &UserId) -> Result<Option<UserRecord>, DirectoryError> {
        let username = match self.by_id.get(user_id) {
            Some(entry) => entry.value().clone(),
            None => return Ok(None),
        };
        self.find_by_username(&username).await
    }
}
