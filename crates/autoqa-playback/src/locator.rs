use autoqa_model::{ElementInfo, LocatorStrategy};

use crate::driver::{Driver, ElementHandle};
use crate::error::PlaybackError;

/// Fixed priority order the resolver attempts strategies in.
const STRATEGY_ORDER: [LocatorStrategy; 4] = [
    LocatorStrategy::Id,
    LocatorStrategy::Name,
    LocatorStrategy::Css,
    LocatorStrategy::Xpath,
];

pub struct ResolvedElement {
    pub strategy: LocatorStrategy,
    pub value: String,
    pub handle: ElementHandle,
}

fn candidate_value(info: &ElementInfo, strategy: LocatorStrategy) -> Option<&str> {
    let value = match strategy {
        LocatorStrategy::Id => info.id.as_deref(),
        LocatorStrategy::Name => info.name.as_deref(),
        LocatorStrategy::Css => info.css.as_deref(),
        LocatorStrategy::Xpath => info.xpath.as_deref(),
        LocatorStrategy::Healed | LocatorStrategy::Text => None,
    };
    value.filter(|value| !value.trim().is_empty())
}

/// Attempts ID → NAME → CSS → XPATH in order, subject to `max_attempts`.
/// Each attempt issues exactly one DOM query and skips blank fields
/// without counting against the cap. Returns the first successful
/// (strategy, value, live element) triple.
pub async fn resolve(
    driver: &dyn Driver,
    info: &ElementInfo,
    max_attempts: usize,
) -> Result<ResolvedElement, PlaybackError> {
    let mut tried = Vec::new();
    let mut candidates = Vec::new();
    let mut attempts = 0usize;

    for strategy in STRATEGY_ORDER {
        if attempts >= max_attempts {
            break;
        }
        let Some(value) = candidate_value(info, strategy) else {
            continue;
        };
        attempts += 1;
        tried.push(strategy);
        candidates.push(value.to_string());
        if let Some(handle) = driver.query(strategy, value).await? {
            return Ok(ResolvedElement {
                strategy,
                value: value.to_string(),
                handle,
            });
        }
    }

    Err(PlaybackError::ElementNotFound {
        tried,
        candidates,
        identity: element_identity(info),
    })
}

fn element_identity(info: &ElementInfo) -> String {
    format!(
        "{}{}",
        info.tag_name,
        info.id
            .as_deref()
            .map(|id| format!("#{id}"))
            .unwrap_or_default()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_support::FakeDriver;

    fn element_info() -> ElementInfo {
        ElementInfo {
            tag_name: "button".to_string(),
            id: Some("a".to_string()),
            name: Some("b".to_string()),
            css: Some("#a".to_string()),
            xpath: Some("//button".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn cascades_to_name_when_id_is_absent() {
        let driver = FakeDriver::new();
        driver.set_absent(LocatorStrategy::Id, "a");
        driver.set_present(LocatorStrategy::Name, "b", ElementHandle("e1".into()));

        let resolved = resolve(&driver, &element_info(), 4).await.expect("should resolve");
        assert_eq!(resolved.strategy, LocatorStrategy::Name);
        assert_eq!(resolved.value, "b");
        assert_eq!(
            driver.query_log(),
            vec![
                (LocatorStrategy::Id, "a".to_string()),
                (LocatorStrategy::Name, "b".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn skips_blank_fields_without_counting_against_max_attempts() {
        let driver = FakeDriver::new();
        let mut info = element_info();
        info.id = None;
        info.name = Some("   ".to_string());
        driver.set_present(LocatorStrategy::Css, "#a", ElementHandle("e1".into()));

        let resolved = resolve(&driver, &info, 1).await.expect("css should still be tried");
        assert_eq!(resolved.strategy, LocatorStrategy::Css);
    }

    #[tokio::test]
    async fn max_attempts_one_fails_even_if_later_strategy_would_succeed() {
        let driver = FakeDriver::new();
        driver.set_absent(LocatorStrategy::Id, "a");
        driver.set_present(LocatorStrategy::Name, "b", ElementHandle("e1".into()));

        let error = resolve(&driver, &element_info(), 1).await.expect_err("should fail");
        assert!(matches!(error, PlaybackError::ElementNotFound { .. }));
        assert_eq!(driver.query_log().len(), 1);
    }

    #[tokio::test]
    async fn exhausting_all_strategies_raises_element_not_found_with_full_context() {
        let driver = FakeDriver::new();
        let error = resolve(&driver, &element_info(), 4).await.expect_err("should fail");
        match error {
            PlaybackError::ElementNotFound { tried, candidates, .. } => {
                assert_eq!(tried.len(), 4);
                assert_eq!(candidates.len(), 4);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
