//! Turn orchestrator: the per-session state machine
//!
//! One turn is: read the log, assemble the prompt, generate, trim, check
//! for the end marker, then record the human turn and the narration
//! together. A turn that fails anywhere before the final append leaves the
//! log and the state untouched.

use crate::gateway::GenerationGateway;
use crate::narrative::{is_terminal, ContextAssembler, START_SENTINEL};
use crate::turn_log::{SessionId, Turn, TurnLog};
use crate::{Result, StoryError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Where the story stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No turns yet
    Bootstrap,
    /// At least one exchange, no ending detected
    Active,
    /// The latest narration contained the end marker
    Terminated,
}

/// Result of one successful turn
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// Narration with surrounding whitespace trimmed
    pub text: String,
    pub terminated: bool,
}

/// Drives one session's turns.
///
/// `submit` takes `&mut self`, so a single orchestrator never has two turns
/// in flight. Reaching [`SessionState::Terminated`] does not block further
/// calls; surfaces decide whether to keep playing.
pub struct TurnOrchestrator {
    session_id: SessionId,
    assembler: ContextAssembler,
    gateway: Arc<dyn GenerationGateway>,
    log: Arc<dyn TurnLog>,
    state: SessionState,
    turn_timeout: Option<Duration>,
}

impl TurnOrchestrator {
    pub fn new(
        session_id: SessionId,
        assembler: ContextAssembler,
        gateway: Arc<dyn GenerationGateway>,
        log: Arc<dyn TurnLog>,
    ) -> Self {
        Self {
            session_id,
            assembler,
            gateway,
            log,
            state: SessionState::Bootstrap,
            turn_timeout: None,
        }
    }

    /// Bound the generation step of every turn.
    pub fn with_turn_timeout(mut self, timeout: Duration) -> Self {
        self.turn_timeout = Some(timeout);
        self
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Wipe the session's log and go back to `Bootstrap`.
    ///
    /// Any game previously stored under this session id is discarded.
    pub async fn start(&mut self) -> Result<()> {
        self.log.clear(&self.session_id).await?;
        self.state = SessionState::Bootstrap;
        info!("Session {} cleared", self.session_id);
        Ok(())
    }

    /// Recompute the state from whatever the log already holds.
    pub async fn resume(&mut self) -> Result<SessionState> {
        let history = self.log.read_all(&self.session_id).await?;
        self.state = match history.last() {
            None => SessionState::Bootstrap,
            Some(turn) if is_terminal(&turn.text) => SessionState::Terminated,
            Some(_) => SessionState::Active,
        };
        info!(
            "Session {} resumed with {} turn(s), state={:?}",
            self.session_id,
            history.len(),
            self.state
        );
        Ok(self.state)
    }

    /// Opening turn: the narrator sets the scene before any player input.
    pub async fn bootstrap(&mut self) -> Result<TurnOutcome> {
        self.submit(START_SENTINEL).await
    }

    /// Play one turn.
    pub async fn submit(&mut self, human_text: &str) -> Result<TurnOutcome> {
        let started = Instant::now();
        info!(
            "Turn start: session={}, state={:?}, input_len={}",
            self.session_id,
            self.state,
            human_text.len()
        );

        let history = self.log.read_all(&self.session_id).await?;
        let prompt = self.assembler.render(&history, human_text);
        debug!(
            "Assembled prompt: {} bytes from {} prior turn(s)",
            prompt.len(),
            history.len()
        );

        let raw = match self.generate(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Turn failed in generation, log unchanged: {}", e);
                return Err(e);
            }
        };

        let text = raw.trim().to_string();
        let terminated = is_terminal(&text);
        debug!(
            "Completion: {} bytes via {}, terminated={}",
            text.len(),
            self.gateway.name(),
            terminated
        );

        if let Err(e) = self
            .log
            .append_all(
                &self.session_id,
                vec![Turn::human(human_text), Turn::narrator(text.clone())],
            )
            .await
        {
            warn!("Turn failed while recording: {}", e);
            return Err(e);
        }

        self.state = if terminated {
            SessionState::Terminated
        } else {
            SessionState::Active
        };
        info!(
            "Turn done in {:?}: state={:?}",
            started.elapsed(),
            self.state
        );

        Ok(TurnOutcome { text, terminated })
    }

    /// The session's full turn log
    pub async fn history(&self) -> Result<Vec<Turn>> {
        self.log.read_all(&self.session_id).await
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        match self.turn_timeout {
            Some(limit) => tokio::time::timeout(limit, self.gateway.complete(prompt))
                .await
                .map_err(|_| {
                    StoryError::GenerationUnavailable(format!("timed out after {:?}", limit))
                })?,
            None => self.gateway.complete(prompt).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::narrative::NarrativeTemplate;
    use crate::turn_log::{MemoryTurnLog, Role};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned completions and records the prompts it saw.
    struct Scripted {
        replies: Mutex<VecDeque<Result<String>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl GenerationGateway for Scripted {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(StoryError::GenerationUnavailable("script exhausted".into())))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    /// Never answers within any reasonable timeout.
    struct Stalled;

    #[async_trait]
    impl GenerationGateway for Stalled {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("too late".to_string())
        }

        fn name(&self) -> &str {
            "stalled"
        }
    }

    fn orchestrator(gateway: Arc<dyn GenerationGateway>, log: Arc<MemoryTurnLog>) -> TurnOrchestrator {
        let assembler = ContextAssembler::new(Arc::new(NarrativeTemplate::default()));
        TurnOrchestrator::new(SessionId::from("test-session"), assembler, gateway, log)
    }

    #[tokio::test]
    async fn test_bootstrap_uses_sentinel_and_activates() {
        let gateway = Scripted::new(vec![Ok("  You awaken in a clearing...\n".into())]);
        let log = Arc::new(MemoryTurnLog::new());
        let mut orch = orchestrator(gateway.clone(), log.clone());

        let outcome = orch.bootstrap().await.unwrap();
        assert_eq!(outcome.text, "You awaken in a clearing...");
        assert!(!outcome.terminated);
        assert_eq!(orch.state(), SessionState::Active);

        let prompts = gateway.prompts.lock().unwrap();
        assert!(prompts[0].ends_with("Human: start\nAI:"));

        let turns = orch.history().await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].text, START_SENTINEL);
        assert_eq!(turns[1].role, Role::Narrator);
    }

    #[tokio::test]
    async fn test_second_turn_sees_first_exchange() {
        let gateway = Scripted::new(vec![
            Ok("Choose a weapon.".into()),
            Ok("The bow it is.".into()),
        ]);
        let mut orch = orchestrator(gateway.clone(), Arc::new(MemoryTurnLog::new()));

        orch.bootstrap().await.unwrap();
        orch.submit("A bow.").await.unwrap();

        let prompts = gateway.prompts.lock().unwrap();
        assert!(prompts[1].contains("Human: start\nAI: Choose a weapon.\nHuman: A bow.\nAI:"));
    }

    #[tokio::test]
    async fn test_failed_generation_keeps_state() {
        let gateway = Scripted::new(vec![
            Ok("Choose a weapon.".into()),
            Err(StoryError::GenerationUnavailable("connection refused".into())),
        ]);
        let log = Arc::new(MemoryTurnLog::new());
        let mut orch = orchestrator(gateway, log);

        orch.bootstrap().await.unwrap();
        let err = orch.submit("A bow.").await.unwrap_err();
        assert!(matches!(err, StoryError::GenerationUnavailable(_)));
        assert_eq!(orch.state(), SessionState::Active);
        assert_eq!(orch.history().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_terminated_does_not_block_calls() {
        let gateway = Scripted::new(vec![
            Ok("You fall. The End.".into()),
            Ok("A voice echoes in the dark...".into()),
        ]);
        let mut orch = orchestrator(gateway, Arc::new(MemoryTurnLog::new()));

        assert!(orch.bootstrap().await.unwrap().terminated);
        assert_eq!(orch.state(), SessionState::Terminated);

        let outcome = orch.submit("Hello?").await.unwrap();
        assert!(!outcome.terminated);
        assert_eq!(orch.state(), SessionState::Active);
    }

    #[tokio::test]
    async fn test_turn_timeout_is_generation_unavailable() {
        let log = Arc::new(MemoryTurnLog::new());
        let mut orch =
            orchestrator(Arc::new(Stalled), log.clone()).with_turn_timeout(Duration::from_millis(20));

        match orch.bootstrap().await {
            Err(StoryError::GenerationUnavailable(msg)) => assert!(msg.contains("timed out")),
            other => panic!("Expected timeout, got {:?}", other),
        }
        assert_eq!(orch.state(), SessionState::Bootstrap);
        assert!(log.read_all(orch.session_id()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resume_recomputes_state() {
        let log = Arc::new(MemoryTurnLog::new());
        let session = SessionId::from("test-session");
        let mut orch = orchestrator(Scripted::new(vec![]), log.clone());

        assert_eq!(orch.resume().await.unwrap(), SessionState::Bootstrap);

        log.append_all(&session, vec![Turn::human("start"), Turn::narrator("Hi.")])
            .await
            .unwrap();
        assert_eq!(orch.resume().await.unwrap(), SessionState::Active);

        log.append_all(&session, vec![Turn::human("jump"), Turn::narrator("Splat. The End.")])
            .await
            .unwrap();
        assert_eq!(orch.resume().await.unwrap(), SessionState::Terminated);
    }
}
