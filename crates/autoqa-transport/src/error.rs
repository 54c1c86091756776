use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("protocol error in {method}: {details}")]
    ProtocolError { method: String, details: String },
    #[error("timeout waiting for {method} response")]
    Timeout { method: String },
    #[error("debug-protocol connector is closed")]
    Closed,
}
