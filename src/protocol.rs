//! Messages between a front end and the session task
//!
//! The session runs on its own tokio task and owns the [`SessionSurface`].
//! Front ends send [`SurfaceCommand`]s and render the [`SurfaceEvent`]s that
//! come back. Commands are handled strictly one at a time.

use crate::session::{Exchange, SessionState, SessionSurface};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Requests from a front end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "text", rename_all = "snake_case")]
pub enum SurfaceCommand {
    /// Clear the session and let the narrator open a new story
    Open,
    /// One player choice
    Submit(String),
    /// Clear the session and the transcript without opening a story
    Reset,
}

/// Notifications to a front end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SurfaceEvent {
    /// A command was accepted and is being processed
    Busy,
    /// Full transcript after a successful command
    Transcript {
        exchanges: Vec<Exchange>,
        terminated: bool,
    },
    /// A command failed; the session is unchanged. `input` is the text to
    /// restore into the input field, if any.
    Failed {
        message: String,
        input: Option<String>,
    },
}

impl SurfaceEvent {
    fn transcript(surface: &SessionSurface) -> Self {
        SurfaceEvent::Transcript {
            exchanges: surface.transcript().to_vec(),
            terminated: surface.state() == SessionState::Terminated,
        }
    }
}

/// Run the session until the command channel closes or the front end goes away.
pub async fn serve(
    mut surface: SessionSurface,
    mut commands: mpsc::Receiver<SurfaceCommand>,
    events: mpsc::Sender<SurfaceEvent>,
) {
    info!("Session task started for {}", surface.session_id());

    while let Some(command) = commands.recv().await {
        debug!("Session command: {:?}", command);
        if events.send(SurfaceEvent::Busy).await.is_err() {
            break;
        }

        let outcome = match command {
            SurfaceCommand::Open => surface.open().await.map(|_| ()).map_err(|e| (e, None)),
            SurfaceCommand::Submit(text) => match surface.submit(&text).await {
                Ok(_) => Ok(()),
                Err(e) => Err((e, Some(text))),
            },
            SurfaceCommand::Reset => surface.reset().await.map_err(|e| (e, None)),
        };
        let event = match outcome {
            Ok(()) => SurfaceEvent::transcript(&surface),
            Err((e, input)) => failed(e, input),
        };

        if events.send(event).await.is_err() {
            break;
        }
    }

    info!("Session task stopped");
}

fn failed(err: crate::StoryError, input: Option<String>) -> SurfaceEvent {
    warn!("Session command failed: {}", err);
    SurfaceEvent::Failed {
        message: err.to_string(),
        input,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_format() {
        let json = serde_json::to_string(&SurfaceCommand::Submit("I draw my sword.".into())).unwrap();
        assert_eq!(json, r#"{"type":"submit","text":"I draw my sword."}"#);
        let parsed: SurfaceCommand = serde_json::from_str(r#"{"type":"reset"}"#).unwrap();
        assert_eq!(parsed, SurfaceCommand::Reset);
    }
}
