use crate::domain_model::*;
use crate::domain_port::*;
use dashmap::DashMap;
use std::collections::HashSet;

/// Reference token store.
///
/// Each identity's set lives behind the map's shard lock, so operations on
/// one identity serialize while different identities proceed in parallel.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: DashMap<UserId, HashSet<RefreshToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        MemoryTokenStore {
            tokens: DashMap::new(),
        }
    }
}

#[async_trait::async_trait]
impl TokenStore for MemoryTokenStore {
    async fn add(&self, user_id: &UserId, token: &RefreshToken) -> Result<(), TokenStoreError> {
        self.tokens
            .entry(user_id.clone())
            .or_default()
            .insert(token.clone());
        Ok(())
    }

    async fn remove(
        &self,
        user_id: &UserId,
        token: &RefreshToken,
    ) -> Result<bool, TokenStoreError> {
        let removed = match self.tokens.get_mut(user_id) {
            Some(mut set) => set.remove(token),
            None => false,
        };
        if removed {
            self.tokens.remove_if(user_id, |_, set| set.is_empty());
        }
        Ok(removed)
    }

    async fn remove_all(&self, user_id: &UserId) -> Result<usize, TokenStoreError> {
        Ok(self
            .tokens
            .remove(user_id)
            .map(|(_, set)| set.len())
            .unwrap_or(0))
    }

    async fn list_all(&self, user_id: &UserId) -> Result<Vec<RefreshToken>, TokenStoreError> {
        Ok(self
            .tokens
            .get(user_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }
}
