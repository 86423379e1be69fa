//! Turn log: the durable, ordered conversation history of a session
//!
//! Backends implement [`TurnLog`]. The orchestrator is the only writer for
//! its session; everything else only reads.

mod file;
mod memory;

pub use file::FileTurnLog;
pub use memory::MemoryTurnLog;

use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of one story session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    Narrator,
}

impl Role {
    /// Prefix used when the turn is rendered into a prompt.
    ///
    /// Narrator turns use `AI` so that history lines match the completion
    /// cue the narrative template ends with.
    pub fn label(&self) -> &'static str {
        match self {
            Role::Human => "Human",
            Role::Narrator => "AI",
        }
    }
}

/// One role-tagged unit of the conversation. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn human(text: impl Into<String>) -> Self {
        Self::new(Role::Human, text)
    }

    pub fn narrator(text: impl Into<String>) -> Self {
        Self::new(Role::Narrator, text)
    }
}

/// Append-only, ordered storage of turns keyed by session.
///
/// Every failure is reported as [`StoryError::StorageUnavailable`]; callers
/// never retry internally. A read that follows an append from the same
/// process must observe that append.
///
/// [`StoryError::StorageUnavailable`]: crate::StoryError::StorageUnavailable
#[async_trait]
pub trait TurnLog: Send + Sync {
    /// Append one turn at the end of the session's log.
    async fn append(&self, session: &SessionId, turn: Turn) -> Result<()>;

    /// Append several turns in order.
    ///
    /// Backends override this to write the batch in one operation so that a
    /// human turn and the narration it caused land together.
    async fn append_all(&self, session: &SessionId, turns: Vec<Turn>) -> Result<()> {
        for turn in turns {
            self.append(session, turn).await?;
        }
        Ok(())
    }

    /// All turns of the session, oldest first. Empty for a new session.
    async fn read_all(&self, session: &SessionId) -> Result<Vec<Turn>>;

    /// Remove every turn of the session. Idempotent.
    async fn clear(&self, session: &SessionId) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_labels() {
        assert_eq!(Role::Human.label(), "Human");
        assert_eq!(Role::Narrator.label(), "AI");
    }

    #[test]
    fn test_turn_serializes_lowercase_role() {
        let turn = Turn::narrator("You awaken.");
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["role"], "narrator");
        assert_eq!(json["text"], "You awaken.");
    }

    #[test]
    fn test_session_id_display() {
        let id = SessionId::from("test-session");
        assert_eq!(id.to_string(), "test-session");
        assert_eq!(id.as_str(), "test-session");
    }
}
