use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomError {
    #[error("debug connector error: {0}")]
    Connector(String),
    #[error("script evaluation failed: {0}")]
    ScriptFailure(String),
}
