use autoqa_model::{ElementInfo, ElementLocator, LocatorStrategy};
use autoqa_playback::PlaybackError;

use crate::llm_client::{ChatClient, ChatMessage};

/// Length cap on the visible-text prefix used by the text-similarity
/// fallback's XPath template. Kept short on purpose: a long prefix would
/// make the emitted XPath brittle against trivial trailing-text changes.
pub const TEXT_HEAL_PREFIX_CHARS: usize = 30;

const CANNOT_HEAL_SENTINEL: &str = "CANNOT_HEAL";

fn infer_strategy(response: &str) -> LocatorStrategy {
    if response.starts_with("//") || response.starts_with("(//") {
        LocatorStrategy::Xpath
    } else {
        LocatorStrategy::Css
    }
}

fn build_prompt(info: &ElementInfo, url: &str, dom_snippet: &str) -> Vec<ChatMessage> {
    let system = ChatMessage::system(
        "You repair broken UI test locators. Reply with exactly one CSS selector or \
         XPath expression that uniquely identifies the described element, and nothing \
         else. If no such locator can be determined, reply with CANNOT_HEAL.",
    );
    let user = ChatMessage::user(format!(
        "The following element could not be located during playback.\n\
         Tag: {}\nId: {:?}\nName: {:?}\nCss: {:?}\nXpath: {:?}\nText: {:?}\n\
         Current URL: {url}\n\nPage source (truncated):\n{dom_snippet}",
        info.tag_name, info.id, info.name, info.css, info.xpath, info.text,
    ));
    vec![system, user]
}

fn escape_single_quotes(value: &str) -> String {
    value.replace('\'', "\\'")
}

/// Stage 2: an XPath built from the element's visible text, scoped to its
/// tag name. `None` if the element carries no visible text.
fn text_similarity_locator(info: &ElementInfo) -> Option<ElementLocator> {
    let text = info.text.as_ref()?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let prefix: String = trimmed.chars().take(TEXT_HEAL_PREFIX_CHARS).collect();
    let tag = if info.tag_name.is_empty() { "*" } else { info.tag_name.as_str() };
    let xpath = format!(
        "//{tag}[contains(normalize-space(text()),'{}')]",
        escape_single_quotes(&prefix)
    );
    Some(ElementLocator { strategy: LocatorStrategy::Xpath, value: xpath })
}

/// Two-stage healing cascade, invoked exactly once per unresolved element
/// lookup: an LLM-proposed locator, falling back to a text-similarity
/// XPath, falling back to `HealingExhausted` wrapping `original`.
pub async fn heal(
    chat: &dyn ChatClient,
    info: &ElementInfo,
    url: &str,
    dom_source: &str,
    dom_snippet_chars: usize,
    original: PlaybackError,
) -> Result<ElementLocator, PlaybackError> {
    let snippet: String = dom_source.chars().take(dom_snippet_chars).collect();
    let prompt = build_prompt(info, url, &snippet);

    match chat.complete(&prompt).await {
        Ok(response) => {
            let trimmed = response.trim();
            if !trimmed.is_empty() && trimmed != CANNOT_HEAL_SENTINEL {
                return Ok(ElementLocator {
                    strategy: infer_strategy(trimmed),
                    value: trimmed.to_string(),
                });
            }
            tracing::warn!(response = trimmed, "llm healing stage declined, falling back to text similarity");
        }
        Err(error) => {
            tracing::warn!(%error, "llm healing stage failed, falling back to text similarity");
        }
    }

    if let Some(locator) = text_similarity_locator(info) {
        return Ok(locator);
    }

    Err(PlaybackError::HealingExhausted {
        reason: "both the llm and text-similarity healing stages failed".to_string(),
        original: Box::new(original),
    })
}
