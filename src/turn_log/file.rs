//! JSONL turn log, one file per session.
//!
//! Directory layout:
//!   {dir}/{session_id}.jsonl

use super::{SessionId, Turn, TurnLog};
use crate::{Result, StoryError};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Turn log backed by append-only JSONL files
#[derive(Debug, Clone)]
pub struct FileTurnLog {
    dir: PathBuf,
}

impl FileTurnLog {
    /// Create a file turn log. Creates the directory if needed.
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| storage_error("create", &dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the log file for a session.
    pub fn session_path(&self, session: &SessionId) -> PathBuf {
        self.dir.join(format!("{}.jsonl", encode_file_stem(session.as_str())))
    }

    async fn write_lines(&self, session: &SessionId, turns: &[Turn]) -> Result<()> {
        let mut buf = String::new();
        for turn in turns {
            buf.push_str(&serde_json::to_string(turn)?);
            buf.push('\n');
        }

        let path = self.session_path(session);
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| storage_error("open", &path, e))?;
        file.write_all(buf.as_bytes())
            .await
            .map_err(|e| storage_error("append to", &path, e))?;
        file.flush()
            .await
            .map_err(|e| storage_error("flush", &path, e))?;
        file.sync_data()
            .await
            .map_err(|e| storage_error("sync", &path, e))?;

        debug!("Appended {} turn(s) to {}", turns.len(), path.display());
        Ok(())
    }
}

/// File-name-safe form of a session id. ASCII letters, digits and `-` pass
/// through; every other byte (including `_`) becomes `_xx`, so distinct ids
/// never share a file.
fn encode_file_stem(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("_{:02x}", byte));
        }
    }
    out
}

fn storage_error(action: &str, path: &Path, err: std::io::Error) -> StoryError {
    StoryError::StorageUnavailable(format!("failed to {} {}: {}", action, path.display(), err))
}

#[async_trait]
impl TurnLog for FileTurnLog {
    async fn append(&self, session: &SessionId, turn: Turn) -> Result<()> {
        self.write_lines(session, std::slice::from_ref(&turn)).await
    }

    async fn append_all(&self, session: &SessionId, turns: Vec<Turn>) -> Result<()> {
        if turns.is_empty() {
            return Ok(());
        }
        self.write_lines(session, &turns).await
    }

    async fn read_all(&self, session: &SessionId) -> Result<Vec<Turn>> {
        let path = self.session_path(session);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(storage_error("read", &path, e)),
        };

        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| {
                serde_json::from_str::<Turn>(line).map_err(|e| {
                    StoryError::StorageUnavailable(format!(
                        "corrupt turn at {}:{}: {}",
                        path.display(),
                        index + 1,
                        e
                    ))
                })
            })
            .collect()
    }

    async fn clear(&self, session: &SessionId) -> Result<()> {
        let path = self.session_path(session);
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Cleared turn log {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error("remove", &path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::turn_log::Role;
    use tempfile::TempDir;

    #[test]
    fn test_session_path_is_sanitized() {
        let log = FileTurnLog {
            dir: PathBuf::from("/tmp/logs"),
        };
        let path = log.session_path(&SessionId::from("../evil id"));
        assert_eq!(path, PathBuf::from("/tmp/logs/_2e_2e_2fevil_20id.jsonl"));
        assert_eq!(
            log.session_path(&SessionId::from("test-session")),
            PathBuf::from("/tmp/logs/test-session.jsonl")
        );
    }

    #[test]
    fn test_similar_ids_get_distinct_files() {
        let stems: Vec<String> = ["a.b", "a_b", "a/b", "a b", "a_2eb"]
            .iter()
            .map(|id| encode_file_stem(id))
            .collect();
        for (i, stem) in stems.iter().enumerate() {
            assert!(!stems[i + 1..].contains(stem), "duplicate stem {}", stem);
        }
    }

    #[tokio::test]
    async fn test_clear_leaves_lookalike_session() {
        let temp_dir = TempDir::new().unwrap();
        let log = FileTurnLog::new(temp_dir.path()).await.unwrap();
        let dotted = SessionId::from("a.b");
        let underscored = SessionId::from("a_b");

        log.append(&dotted, Turn::human("north")).await.unwrap();
        log.append(&underscored, Turn::human("south")).await.unwrap();
        log.clear(&dotted).await.unwrap();

        assert!(log.read_all(&dotted).await.unwrap().is_empty());
        let remaining = log.read_all(&underscored).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].text, "south");
    }

    #[tokio::test]
    async fn test_batch_append_keeps_order() {
        let temp_dir = TempDir::new().unwrap();
        let log = FileTurnLog::new(temp_dir.path()).await.unwrap();
        let session = SessionId::from("s1");

        log.append_all(
            &session,
            vec![Turn::human("start"), Turn::narrator("You awaken.")],
        )
        .await
        .unwrap();

        let turns = log.read_all(&session).await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::Human);
        assert_eq!(turns[1].text, "You awaken.");
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let log = FileTurnLog::new(temp_dir.path()).await.unwrap();
        let session = SessionId::from("s1");

        log.clear(&session).await.unwrap();
        log.append(&session, Turn::human("hello")).await.unwrap();
        log.clear(&session).await.unwrap();
        log.clear(&session).await.unwrap();

        assert!(log.read_all(&session).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_line_is_storage_error() {
        let temp_dir = TempDir::new().unwrap();
        let log = FileTurnLog::new(temp_dir.path()).await.unwrap();
        let session = SessionId::from("s1");
        std::fs::write(log.session_path(&session), "not json\n").unwrap();

        match log.read_all(&session).await {
            Err(StoryError::StorageUnavailable(msg)) => assert!(msg.contains(":1")),
            other => panic!("Expected StorageUnavailable, got {:?}", other),
        }
    }
}
