//! Story session: orchestrator state machine and the player-facing surface

mod orchestrator;
mod surface;

pub use orchestrator::{SessionState, TurnOrchestrator, TurnOutcome};
pub use surface::{Exchange, SessionSurface, SurfaceUpdate};

use crate::config::{StorageKind, StoryConfig};
use crate::gateway::GenerationGateway;
use crate::narrative::{ContextAssembler, NarrativeTemplate};
use crate::turn_log::{FileTurnLog, MemoryTurnLog, SessionId, TurnLog};
use crate::Result;
use std::sync::Arc;
use std::time::Duration;

/// Build the turn log selected by the configuration.
pub async fn turn_log_from_config(config: &StoryConfig) -> Result<Arc<dyn TurnLog>> {
    let log: Arc<dyn TurnLog> = match config.storage {
        StorageKind::File => Arc::new(FileTurnLog::new(&config.storage_dir).await?),
        StorageKind::Memory => Arc::new(MemoryTurnLog::new()),
    };
    Ok(log)
}

/// Load the configured template, or the built-in one.
pub async fn template_from_config(config: &StoryConfig) -> Result<NarrativeTemplate> {
    match &config.template_file {
        Some(path) => NarrativeTemplate::from_file(path).await,
        None => Ok(NarrativeTemplate::default()),
    }
}

/// Assemble an orchestrator from explicit collaborators.
pub fn orchestrator_with(
    config: &StoryConfig,
    template: NarrativeTemplate,
    gateway: Arc<dyn GenerationGateway>,
    log: Arc<dyn TurnLog>,
) -> TurnOrchestrator {
    let orchestrator = TurnOrchestrator::new(
        SessionId::new(config.session_id.clone()),
        ContextAssembler::new(Arc::new(template)),
        gateway,
        log,
    );
    match config.turn_timeout_secs {
        Some(secs) => orchestrator.with_turn_timeout(Duration::from_secs(secs)),
        None => orchestrator,
    }
}
