use crate::{config::EngineConfig, error::Result, intake::OrderDraft, notify::SessionId};
use async_trait::async_trait;
use std::{collections::HashMap, time::Duration};
use tokio::{sync::Mutex, time::Instant};

/// Keyed storage for in-flight order drafts
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Draft of a live session; expired sessions read as absent
    async fn load(&self, session: &SessionId) -> Result<Option<OrderDraft>>;

    /// Stores the draft and refreshes the session's expiry
    async fn save(&self, session: &SessionId, draft: &OrderDraft) -> Result<()>;

    async fn remove(&self, session: &SessionId) -> Result<()>;

    /// Drops expired sessions, returning how many were dropped
    async fn purge_expired(&self) -> Result<usize>;
}

/// Single-instance session store with a sliding TTL
pub struct MemorySessionStore {
    ttl: Duration,
    entries: Mutex<HashMap<SessionId, (OrderDraft, Instant)>>,
}

impl MemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Store expiring drafts after `intake_session_ttl_secs` of inactivity
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.intake_session_ttl())
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, session: &SessionId) -> Result<Option<OrderDraft>> {
        let mut entries = self.entries.lock().await;
        match entries.get(session) {
            Some((_, touched)) if touched.elapsed() >= self.ttl => {
                entries.remove(session);
                tracing::debug!(session = %session, "intake session expired");
                Ok(None)
            }
            Some((draft, _)) => Ok(Some(draft.clone())),
            None => Ok(None),
        }
    }

    async fn save(&self, session: &SessionId, draft: &OrderDraft) -> Result<()> {
        self.entries
            .lock()
            .await
            .insert(session.clone(), (draft.clone(), Instant::now()));
        Ok(())
    }

    async fn remove(&self, session: &SessionId) -> Result<()> {
        self.entries.lock().await.remove(session);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize> {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, (_, touched)| touched.elapsed() < self.ttl);
        Ok(before - entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_sessions_expire_after_ttl() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let session = SessionId::new("chat-1");
        store.save(&session, &OrderDraft::new()).await.unwrap();

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(store.load(&session).await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(store.load(&session).await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_refreshes_expiry() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let session = SessionId::new("chat-1");
        store.save(&session, &OrderDraft::new()).await.unwrap();

        tokio::time::advance(Duration::from_secs(50)).await;
        store.save(&session, &OrderDraft::new()).await.unwrap();

        tokio::time::advance(Duration::from_secs(50)).await;
        assert!(store.load(&session).await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_comes_from_config() {
        let config = EngineConfig::from_toml_str("intake_session_ttl_secs = 5").unwrap();
        let store = MemorySessionStore::from_config(&config);
        let session = SessionId::new("chat-1");
        store.save(&session, &OrderDraft::new()).await.unwrap();

        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(store.load(&session).await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(store.load(&session).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let store = MemorySessionStore::new(Duration::from_secs(10));
        store.save(&SessionId::new("old"), &OrderDraft::new()).await.unwrap();
        tokio::time::advance(Duration::from_secs(11)).await;
        store.save(&SessionId::new("fresh"), &OrderDraft::new()).await.unwrap();

        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(store.len().await, 1);
    }
}
