//! In-process turn log

use super::{SessionId, Turn, TurnLog};
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Turn log that lives only as long as the process
#[derive(Debug, Default)]
pub struct MemoryTurnLog {
    sessions: RwLock<HashMap<SessionId, Vec<Turn>>>,
}

impl MemoryTurnLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TurnLog for MemoryTurnLog {
    async fn append(&self, session: &SessionId, turn: Turn) -> Result<()> {
        self.sessions
            .write()
            .await
            .entry(session.clone())
            .or_default()
            .push(turn);
        Ok(())
    }

    async fn append_all(&self, session: &SessionId, turns: Vec<Turn>) -> Result<()> {
        self.sessions
            .write()
            .await
            .entry(session.clone())
            .or_default()
            .extend(turns);
        Ok(())
    }

    async fn read_all(&self, session: &SessionId) -> Result<Vec<Turn>> {
        Ok(self
            .sessions
            .read()
            .await
            .get(session)
            .cloned()
            .unwrap_or_default())
    }

    async fn clear(&self, session: &SessionId) -> Result<()> {
        self.sessions.write().await.remove(session);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let log = MemoryTurnLog::new();
        let a = SessionId::from("a");
        let b = SessionId::from("b");

        log.append(&a, Turn::human("left")).await.unwrap();
        log.append(&b, Turn::human("right")).await.unwrap();
        log.clear(&a).await.unwrap();

        assert!(log.read_all(&a).await.unwrap().is_empty());
        assert_eq!(log.read_all(&b).await.unwrap()[0].text, "right");
    }
}
