use std::time::Duration;

use async_trait::async_trait;
use autoqa_transport::DebugConnector;
use serde_json::{json, Value};

use crate::error::DomError;

/// Minimal surface the enricher needs from the debug-protocol connector:
/// evaluate one script expression and return its `returnByValue` result.
#[async_trait]
pub trait ScriptEvaluator: Send + Sync {
    async fn evaluate(&self, expression: &str, deadline: Duration) -> Result<Value, DomError>;
}

#[async_trait]
impl ScriptEvaluator for DebugConnector {
    async fn evaluate(&self, expression: &str, deadline: Duration) -> Result<Value, DomError> {
        let response = self
            .send(
                "Runtime.evaluate",
                json!({ "expression": expression, "returnByValue": true }),
                deadline,
            )
            .await
            .map_err(|error| DomError::Connector(error.to_string()))?;

        if let Some(exception) = response.get("exceptionDetails") {
            return Err(DomError::ScriptFailure(exception.to_string()));
        }
        response
            .get("result")
            .and_then(|result| result.get("value"))
            .cloned()
            .ok_or_else(|| DomError::ScriptFailure("missing result.value in evaluate response".to_string()))
    }
}
