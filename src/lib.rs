//! Storyloop - narrator-driven interactive fiction
//!
//! A single long-lived story session in which a language model narrates a
//! branching tale:
//! - The turn log keeps the ordered, durable conversation history
//! - One narrative template carries both the rules and the injected history
//! - The orchestrator detects the end of the story from the generated text

pub mod config;
pub mod gateway;
pub mod narrative;
pub mod protocol;
pub mod session;
pub mod tui;
pub mod turn_log;

pub use config::{ProviderKind, StorageKind, StoryConfig};
pub use gateway::GenerationGateway;
pub use narrative::{is_terminal, ContextAssembler, NarrativeTemplate, TERMINATION_MARKER};
pub use session::{Exchange, SessionState, SessionSurface, TurnOrchestrator, TurnOutcome};
pub use turn_log::{Role, SessionId, Turn, TurnLog};

/// Result type for Storyloop operations
pub type Result<T> = std::result::Result<T, StoryError>;

/// Errors that can occur in Storyloop
#[derive(Debug, thiserror::Error)]
pub enum StoryError {
    #[error("Turn log unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Generation backend unavailable: {0}")]
    GenerationUnavailable(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("The story has ended; reset to play again")]
    StoryEnded,

    #[error("The story has not started; open it before playing")]
    NotStarted,

    #[error("Input is empty")]
    EmptyInput,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
