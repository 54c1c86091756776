use serde::Deserialize;

use crate::error::ConnectorError;

#[derive(Debug, Clone, Deserialize)]
struct DebugTarget {
    #[serde(rename = "type")]
    target_type: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    websocket_debugger_url: Option<String>,
}

fn pick_page_target(targets: Vec<DebugTarget>) -> Option<String> {
    targets
        .into_iter()
        .find(|target| target.target_type == "page")
        .and_then(|target| target.websocket_debugger_url)
}

/// Fetches the debug endpoint's target list and returns the channel URL of
/// the first target whose type is `"page"`.
pub async fn discover_page_websocket_url(port: u16) -> Result<String, ConnectorError> {
    let list_url = format!("http://127.0.0.1:{port}/json/list");
    let targets: Vec<DebugTarget> = reqwest::get(&list_url)
        .await
        .map_err(|error| ConnectorError::Transport(format!("failed to fetch {list_url}: {error}")))?
        .json()
        .await
        .map_err(|error| {
            ConnectorError::Transport(format!("failed to parse target list from {list_url}: {error}"))
        })?;

    pick_page_target(targets)
        .ok_or_else(|| ConnectorError::Transport(format!("no 'page' target found at {list_url}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pick_page_target_skips_non_page_entries() {
        let targets = vec![
            DebugTarget {
                target_type: "background_page".to_string(),
                websocket_debugger_url: Some("ws://ignored".to_string()),
            },
            DebugTarget {
                target_type: "page".to_string(),
                websocket_debugger_url: Some("ws://127.0.0.1:9222/devtools/page/ABC123".to_string()),
            },
        ];
        assert_eq!(
            pick_page_target(targets),
            Some("ws://127.0.0.1:9222/devtools/page/ABC123".to_string())
        );
    }

    #[test]
    fn pick_page_target_returns_none_when_no_page_present() {
        let targets = vec![DebugTarget {
            target_type: "background_page".to_string(),
            websocket_debugger_url: None,
        }];
        assert_eq!(pick_page_target(targets), None);
    }

    #[tokio::test]
    async fn integration_discover_page_websocket_url_fails_cleanly_when_nothing_is_listening() {
        let error = discover_page_websocket_url(1)
            .await
            .expect_err("nothing listens on port 1");
        assert!(matches!(error, ConnectorError::Transport(_)));
    }
}
