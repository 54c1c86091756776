use thiserror::Error;

/// Single error taxonomy for the playback engine. Every failure surfaced
/// from a step handler, a wait, the resolver, the frame navigator, or the
/// healing cascade is one of these.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("protocol error in {method}: {details}")]
    ProtocolError { method: String, details: String },

    #[error("{wait_kind} timed out after {timeout_sec}s waiting for {query}")]
    Timeout {
        wait_kind: String,
        timeout_sec: u64,
        query: String,
    },

    #[error("no locator strategy resolved an element (tried {tried:?}, candidates {candidates:?}, identity {identity})")]
    ElementNotFound {
        tried: Vec<autoqa_model::LocatorStrategy>,
        candidates: Vec<String>,
        identity: String,
    },

    #[error("could not enter frame chain {chain:?}: {detail}")]
    FrameNavigation { chain: Vec<String>, detail: String },

    #[error("checkpoint '{label}' failed: expected {expected:?}, actual {actual:?}")]
    CheckpointFailure {
        label: String,
        expected: Option<String>,
        actual: String,
    },

    #[error("healing exhausted: {reason}")]
    HealingExhausted {
        reason: String,
        #[source]
        original: Box<PlaybackError>,
    },

    #[error("llm endpoint unavailable: {0}")]
    LLMUnavailable(String),

    #[error("playback interrupted: {0}")]
    Interrupted(String),

    #[error("invalid session or configuration: {0}")]
    Config(String),
}

impl PlaybackError {
    /// Short kind label used in the terminal user-visible failure message
    /// `"<Kind> at step N/M: <detail>"`.
    pub fn kind_label(&self) -> &'static str {
        match self {
            PlaybackError::Transport(_) => "Transport",
            PlaybackError::ProtocolError { .. } => "ProtocolError",
            PlaybackError::Timeout { .. } => "Timeout",
            PlaybackError::ElementNotFound { .. } => "ElementNotFound",
            PlaybackError::FrameNavigation { .. } => "FrameNavigation",
            PlaybackError::CheckpointFailure { .. } => "CheckpointFailure",
            PlaybackError::HealingExhausted { .. } => "HealingExhausted",
            PlaybackError::LLMUnavailable(_) => "LLMUnavailable",
            PlaybackError::Interrupted(_) => "Interrupted",
            PlaybackError::Config(_) => "Config",
        }
    }

    /// Renders the terminal user-visible failure message format from §7:
    /// `"<Kind> at step N/M: <detail>"`.
    pub fn terminal_message(&self, step: usize, total: usize) -> String {
        format!("{} at step {}/{}: {}", self.kind_label(), step, total, self)
    }
}
