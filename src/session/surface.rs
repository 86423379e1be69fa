//! Session surface: the request/response loop seen by a player
//!
//! Keeps a display transcript next to the durable turn log. The transcript
//! is a projection for rendering only and is never persisted.

use super::orchestrator::{SessionState, TurnOrchestrator};
use crate::turn_log::SessionId;
use crate::{Result, StoryError};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// One rendered exchange. The opening narration has no human text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub human: Option<String>,
    pub narrator: String,
}

/// What a surface hands back after a successful submission
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceUpdate<'a> {
    pub transcript: &'a [Exchange],
    /// Replacement for the input field (always cleared)
    pub input: String,
    pub terminated: bool,
}

/// Player-facing session: transcript plus orchestrator.
///
/// Human submissions are only accepted while the story is active: before
/// [`SessionSurface::open`] has succeeded they are refused, and after the
/// end they are refused until the story is opened again.
pub struct SessionSurface {
    orchestrator: TurnOrchestrator,
    transcript: Vec<Exchange>,
}

impl SessionSurface {
    pub fn new(orchestrator: TurnOrchestrator) -> Self {
        Self {
            orchestrator,
            transcript: Vec::new(),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        self.orchestrator.session_id()
    }

    pub fn state(&self) -> SessionState {
        self.orchestrator.state()
    }

    pub fn is_terminated(&self) -> bool {
        self.state() == SessionState::Terminated
    }

    pub fn transcript(&self) -> &[Exchange] {
        &self.transcript
    }

    /// Start a fresh story: wipe the log, then let the narrator open.
    pub async fn open(&mut self) -> Result<SurfaceUpdate<'_>> {
        self.reset().await?;
        let outcome = self.orchestrator.bootstrap().await?;
        info!("Story opened for session {}", self.session_id());
        self.transcript.push(Exchange {
            human: None,
            narrator: outcome.text,
        });
        Ok(self.update(outcome.terminated))
    }

    /// Send one player choice to the narrator.
    pub async fn submit(&mut self, input: &str) -> Result<SurfaceUpdate<'_>> {
        match self.state() {
            SessionState::Terminated => {
                warn!("Refusing input after the story ended");
                return Err(StoryError::StoryEnded);
            }
            SessionState::Bootstrap => {
                warn!("Refusing input before the narrator opened the story");
                return Err(StoryError::NotStarted);
            }
            SessionState::Active => {}
        }
        if input.trim().is_empty() {
            return Err(StoryError::EmptyInput);
        }

        let outcome = self.orchestrator.submit(input).await?;
        self.transcript.push(Exchange {
            human: Some(input.to_string()),
            narrator: outcome.text,
        });
        Ok(self.update(outcome.terminated))
    }

    /// Clear the transcript and the durable history.
    pub async fn reset(&mut self) -> Result<()> {
        self.orchestrator.start().await?;
        self.transcript.clear();
        Ok(())
    }

    fn update(&self, terminated: bool) -> SurfaceUpdate<'_> {
        SurfaceUpdate {
            transcript: &self.transcript,
            input: String::new(),
            terminated,
        }
    }
}
