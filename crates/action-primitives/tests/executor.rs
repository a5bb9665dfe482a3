use std::sync::Arc;
use std::time::Duration;

use action_primitives::memory::{MemoryElement, MemoryPage};
use action_primitives::{
    ActionError, ActionExecutor, AssertionEvaluator, DriverError, NoWait, Selector,
};
use testpilot_core_types::{LocatorDescriptor, LocatorStrategy, Reliability};

fn shop_page() -> Arc<MemoryPage> {
    let page = MemoryPage::new()
        .with_element(
            MemoryElement::new("#add")
                .role("button")
                .name("Add to Cart")
                .text("Add to Cart")
                .test_id("add-to-cart"),
        )
        .with_element(MemoryElement::new("#badge").text("Cart (0)"))
        .with_element(
            MemoryElement::new("#email")
                .role("textbox")
                .label("Email")
                .attribute("type", "email"),
        )
        .with_element(MemoryElement::new("#terms").role("checkbox").label("Accept terms"))
        .with_element(MemoryElement::new("#promo").text("Promo").hidden());
    page.on_click("#add", |dom| {
        if let Some(badge) = dom.element_mut("#badge") {
            badge.text = "Cart (1)".to_string();
        }
    });
    Arc::new(page)
}

fn by_test_id(id: &str) -> LocatorDescriptor {
    LocatorDescriptor::new(
        Selector::TestId(id.to_string()).address(),
        LocatorStrategy::TestId,
        Reliability::High,
    )
}

fn by_label(label: &str) -> LocatorDescriptor {
    LocatorDescriptor::new(
        Selector::Label(label.to_string()).address(),
        LocatorStrategy::Label,
        Reliability::High,
    )
}

#[tokio::test]
async fn click_then_assert_cart_badge() {
    let page = shop_page();
    let executor = ActionExecutor::new(page.clone());
    let evaluator = AssertionEvaluator::new(page.clone()).with_poll_interval(Duration::from_millis(5));

    executor
        .perform_action("click", &by_test_id("add-to-cart"), &[], Duration::from_millis(50))
        .await
        .unwrap();

    let badge = LocatorDescriptor::literal("#badge");
    assert!(
        evaluator
            .evaluate_assertion("hasText", &badge, Some("Cart (1)"), Duration::from_millis(50))
            .await
    );
    assert!(
        !evaluator
            .evaluate_assertion("hasText", &badge, Some("Cart (2)"), Duration::from_millis(30))
            .await
    );
    assert!(
        evaluator
            .evaluate_assertion("containsText", &badge, Some("(1)"), Duration::from_millis(30))
            .await
    );
}

#[tokio::test]
async fn unsupported_verb_is_the_named_fault() {
    let page = shop_page();
    let executor = ActionExecutor::new(page.clone());
    let err = executor
        .perform_action("teleport", &by_test_id("add-to-cart"), &[], Duration::ZERO)
        .await
        .unwrap_err();
    assert_eq!(err, ActionError::UnsupportedMethod("teleport".to_string()));
    assert!(page.actions().is_empty());
}

#[tokio::test]
async fn fill_and_check_update_the_page() {
    let page = shop_page();
    let executor = ActionExecutor::new(page.clone()).with_wait_strategy(Arc::new(NoWait));
    let evaluator = AssertionEvaluator::new(page.clone()).with_poll_interval(Duration::from_millis(5));
    let timeout = Duration::from_millis(30);

    executor
        .perform_action("fill", &by_label("Email"), &["alice@example.com".to_string()], Duration::ZERO)
        .await
        .unwrap();
    executor
        .perform_action("check", &by_label("Accept terms"), &[], Duration::ZERO)
        .await
        .unwrap();

    assert!(evaluator.evaluate_assertion("hasValue", &by_label("Email"), Some("alice@example.com"), timeout).await);
    assert!(evaluator.evaluate_assertion("focused", &by_label("Email"), None, timeout).await);
    assert!(evaluator.evaluate_assertion("checked", &by_label("Accept terms"), None, timeout).await);
    assert!(evaluator.evaluate_assertion("hasAttribute", &by_label("Email"), Some("type=email"), timeout).await);
    assert!(evaluator.evaluate_assertion("hasAttribute", &by_label("Email"), Some("type"), timeout).await);
    assert!(!evaluator.evaluate_assertion("hasAttribute", &by_label("Email"), Some("type=text"), timeout).await);

    executor
        .perform_action("clear", &by_label("Email"), &[], Duration::ZERO)
        .await
        .unwrap();
    assert!(evaluator.evaluate_assertion("empty", &by_label("Email"), None, timeout).await);
}

#[tokio::test]
async fn missing_argument_is_reported() {
    let page = shop_page();
    let executor = ActionExecutor::new(page);
    let err = executor
        .perform_action("fill", &by_label("Email"), &[], Duration::ZERO)
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::MissingArgument { .. }));
}

#[tokio::test]
async fn slow_driver_hits_action_timeout() {
    let page = shop_page();
    page.set_action_delay(Duration::from_millis(200));
    let executor = ActionExecutor::new(page).with_action_timeout(Duration::from_millis(20));
    let err = executor
        .perform_action("click", &by_test_id("add-to-cart"), &[], Duration::ZERO)
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::Timeout { after_ms: 20, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn settle_failure_does_not_fail_the_action() {
    let page = shop_page();
    page.set_settle_delay(Duration::from_secs(5));
    let executor = ActionExecutor::new(page.clone());
    executor
        .perform_action("click", &by_test_id("add-to-cart"), &[], Duration::from_millis(10))
        .await
        .unwrap();
    assert_eq!(page.actions().len(), 1);
}

#[tokio::test]
async fn missing_element_is_a_driver_error() {
    let page = shop_page();
    let executor = ActionExecutor::new(page);
    let err = executor
        .perform_action("click", &by_test_id("checkout"), &[], Duration::ZERO)
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::Driver(DriverError::ElementNotFound(_))));
}

#[tokio::test]
async fn assertions_never_raise() {
    let page = shop_page();
    let evaluator = AssertionEvaluator::new(page).with_poll_interval(Duration::from_millis(5));
    let timeout = Duration::from_millis(20);
    let promo = LocatorDescriptor::literal("#promo");
    let gone = LocatorDescriptor::literal("#gone");

    assert!(!evaluator.evaluate_assertion("looksNice", &promo, None, timeout).await);
    assert!(!evaluator.evaluate_assertion("hasText", &promo, None, timeout).await);
    assert!(!evaluator.evaluate_assertion("visible", &gone, None, timeout).await);
    assert!(evaluator.evaluate_assertion("hidden", &promo, None, timeout).await);
    assert!(evaluator.evaluate_assertion("hidden", &gone, None, timeout).await);
    assert!(evaluator.evaluate_assertion("attached", &promo, None, timeout).await);
    assert!(evaluator.evaluate_assertion("hasCount", &gone, Some("0"), timeout).await);
    assert!(!evaluator.evaluate_assertion("hasCount", &promo, Some("many"), timeout).await);
    assert!(evaluator.evaluate_assertion("enabled", &promo, None, timeout).await);
    assert!(!evaluator.evaluate_assertion("disabled", &promo, None, timeout).await);
}

#[tokio::test]
async fn assertion_waits_for_late_change() {
    let page = shop_page();
    let evaluator = AssertionEvaluator::new(page.clone()).with_poll_interval(Duration::from_millis(5));
    let delayed = page.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        delayed.with_dom(|dom| {
            if let Some(badge) = dom.element_mut("#badge") {
                badge.text = "Cart (3)".to_string();
            }
        });
    });

    assert!(
        evaluator
            .evaluate_assertion(
                "hasText",
                &LocatorDescriptor::literal("#badge"),
                Some("Cart (3)"),
                Duration::from_millis(500)
            )
            .await
    );
}

#[tokio::test]
async fn navigate_records_url() {
    let page = shop_page();
    let executor = ActionExecutor::new(page.clone());
    executor.navigate("https://shop.test/item/42", Duration::ZERO).await.unwrap();
    assert_eq!(page.with_dom(|dom| dom.url.clone()), "https://shop.test/item/42");
    assert!(executor.navigate("  ", Duration::ZERO).await.is_err());
}
