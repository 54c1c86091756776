use std::sync::Arc;
use std::time::Duration;

use autoqa_model::ElementInfo;
use serde_json::Value;

use crate::evaluator::ScriptEvaluator;
use crate::scripts::{element_from_point_script, frame_detect_script};

const TOP_DOCUMENT_SENTINEL: &str = "__top__";

/// Given screen coordinates, produces a rich element identity and the
/// frame chain, via one scripted evaluation per call.
pub struct Enricher<E: ScriptEvaluator> {
    evaluator: Arc<E>,
    deadline: Duration,
}

impl<E: ScriptEvaluator> Enricher<E> {
    pub fn new(evaluator: Arc<E>, deadline: Duration) -> Self {
        Self { evaluator, deadline }
    }

    /// `None` when no element is present at (x, y) or the script call fails;
    /// script errors are logged and treated as `None`, never propagated.
    pub async fn enrich(&self, x: f64, y: f64) -> Option<ElementInfo> {
        let script = element_from_point_script(x, y);
        let value = match self.evaluator.evaluate(&script, self.deadline).await {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(%error, x, y, "dom enricher script evaluation failed");
                return None;
            }
        };
        if value.is_null() {
            return None;
        }
        match serde_json::from_value::<ElementInfo>(value) {
            Ok(info) => Some(info),
            Err(error) => {
                tracing::warn!(%error, "dom enricher could not parse elementFromPoint result");
                None
            }
        }
    }

    /// Empty for the top document; one-element for a framed element.
    /// Deeper nesting is out of scope for this enricher.
    pub async fn detect_frame_chain(&self, x: f64, y: f64) -> Vec<String> {
        let script = frame_detect_script(x, y);
        let value = match self.evaluator.evaluate(&script, self.deadline).await {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(%error, x, y, "dom enricher frame detection failed");
                return Vec::new();
            }
        };
        match value.as_str() {
            Some(frame_id) if frame_id != TOP_DOCUMENT_SENTINEL && !frame_id.is_empty() => {
                vec![frame_id.to_string()]
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedEvaluator {
        responses: Mutex<Vec<Result<Value, String>>>,
    }

    #[async_trait]
    impl ScriptEvaluator for ScriptedEvaluator {
        async fn evaluate(&self, _expression: &str, _deadline: Duration) -> Result<Value, DomError> {
            let mut responses = self.responses.lock().unwrap();
            match responses.remove(0) {
                Ok(value) => Ok(value),
                Err(message) => Err(DomError::ScriptFailure(message)),
            }
        }
    }

    fn evaluator(responses: Vec<Result<Value, String>>) -> Arc<ScriptedEvaluator> {
        Arc::new(ScriptedEvaluator {
            responses: Mutex::new(responses),
        })
    }

    #[tokio::test]
    async fn enrich_parses_element_info_from_script_result() {
        let value = serde_json::json!({
            "tagName": "button",
            "id": "submit",
            "name": null,
            "className": "btn",
            "css": "#submit",
            "xpath": "/html/body/button[1]",
            "text": "Submit",
            "value": null,
            "type": "submit",
            "attributes": {"data-test": "submit-btn"},
            "boundingBox": {"x": 1.0, "y": 2.0, "w": 3.0, "h": 4.0}
        });
        let enricher = Enricher::new(evaluator(vec![Ok(value)]), Duration::from_secs(1));
        let info = enricher.enrich(10.0, 20.0).await.expect("should enrich");
        assert_eq!(info.tag_name, "button");
        assert_eq!(info.id.as_deref(), Some("submit"));
        assert_eq!(info.css.as_deref(), Some("#submit"));
    }

    #[tokio::test]
    async fn enrich_returns_none_when_no_element_hit() {
        let enricher = Enricher::new(evaluator(vec![Ok(Value::Null)]), Duration::from_secs(1));
        assert!(enricher.enrich(0.0, 0.0).await.is_none());
    }

    #[tokio::test]
    async fn enrich_returns_none_on_script_error_instead_of_propagating() {
        let enricher = Enricher::new(
            evaluator(vec![Err("boom".to_string())]),
            Duration::from_secs(1),
        );
        assert!(enricher.enrich(0.0, 0.0).await.is_none());
    }

    #[tokio::test]
    async fn detect_frame_chain_returns_empty_for_top_document() {
        let enricher = Enricher::new(
            evaluator(vec![Ok(Value::String("__top__".to_string()))]),
            Duration::from_secs(1),
        );
        assert!(enricher.detect_frame_chain(0.0, 0.0).await.is_empty());
    }

    #[tokio::test]
    async fn detect_frame_chain_returns_single_frame_identifier() {
        let enricher = Enricher::new(
            evaluator(vec![Ok(Value::String("checkout-frame".to_string()))]),
            Duration::from_secs(1),
        );
        assert_eq!(
            enricher.detect_frame_chain(0.0, 0.0).await,
            vec!["checkout-frame".to_string()]
        );
    }
}
