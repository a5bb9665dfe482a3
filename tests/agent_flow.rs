use std::path::Path;
use std::sync::Arc;

use action_primitives::memory::{MemoryElement, MemoryPage};
use agent_core::{LoopStatus, RunRequest, ScriptedModel, StepKind, ToolCall};
use result_cache::ResultCache;
use testpilot_cli::AppConfig;

fn shop_page() -> Arc<MemoryPage> {
    let page = MemoryPage::new()
        .with_element(
            MemoryElement::new("button.add-to-cart")
                .role("button")
                .name("Add to Cart")
                .text("Add to Cart"),
        )
        .with_element(MemoryElement::new("#badge").text("Cart (0)"));
    page.on_click("button.add-to-cart", |dom| {
        if let Some(badge) = dom.element_mut("#badge") {
            badge.text = "Cart (1)".to_string();
        }
    });
    Arc::new(page)
}

fn add_to_cart_script() -> Vec<ToolCall> {
    vec![
        ToolCall::goto("https://shop.test"),
        ToolCall::act("click", "0-1", &[]),
        ToolCall::assert("hasText", "0-2", Some("Cart (1)")).last_step(),
    ]
}

async fn load_config(dir: &Path) -> AppConfig {
    let path = dir.join("config.yaml");
    let yaml = format!(
        r#"cache:
  path: {}
  lock_timeout_ms: 1000
  poll_interval_ms: 10
planning:
  max_depth: 10
  max_backtracks: 2
actions:
  action_timeout_ms: 1000
  settle_timeout_ms: 100
  assertion_timeout_ms: 300
  default_wait_ms: 10
  max_wait_ms: 100
"#,
        dir.join("cache.json").display()
    );
    tokio::fs::write(&path, yaml).await.unwrap();

    let config = AppConfig::read_file(&path).await.unwrap();
    config.validate().unwrap();
    config
}

async fn run_once(
    config: &AppConfig,
    cache: Arc<ResultCache>,
    script: Vec<ToolCall>,
) -> agent_core::PlanningResult {
    let page = shop_page();
    let model = Arc::new(ScriptedModel::new(script));
    config
        .planning_loop(model, page.clone(), page, Some(cache))
        .run(RunRequest::new("Add the product to the cart"))
        .await
}

#[tokio::test]
async fn configured_run_is_replayed_by_another_cache_handle() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_config(dir.path()).await;
    assert!(config.planning.cache_model_steps);

    let first = run_once(&config, Arc::new(config.open_cache()), add_to_cart_script()).await;
    assert_eq!(first.status, LoopStatus::Succeeded, "{}", first.message);

    // a second handle on the same file stands in for another process
    let other = Arc::new(config.open_cache());
    let stats = other.stats().await.unwrap();
    assert!(stats.entries >= 3);
    assert_eq!(stats.request_ids, 1);

    let replay = run_once(&config, other, Vec::new()).await;
    assert_eq!(replay.status, LoopStatus::Succeeded, "{}", replay.message);
    assert_eq!(replay.history.records(), first.history.records());
}

#[tokio::test]
async fn exhausted_backtracks_leave_the_cache_clean() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_config(dir.path()).await;
    let cache = Arc::new(config.open_cache());

    let result = run_once(
        &config,
        cache.clone(),
        vec![
            ToolCall::goto("https://shop.test"),
            ToolCall::act("click", "0-1", &[]),
            ToolCall::control(StepKind::GoBack, "wrong product"),
            ToolCall::control(StepKind::SkipSection, "still wrong"),
        ],
    )
    .await;

    assert_eq!(result.status, LoopStatus::BacktracksExhausted);
    assert_eq!(result.history.len(), 4);
    assert_eq!(cache.stats().await.unwrap().entries, 0);
}

#[tokio::test]
async fn action_budgets_come_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_config(dir.path()).await;
    let page = shop_page();

    let services = config.step_services(page, None);
    assert_eq!(services.executor.action_timeout().as_millis(), 1000);
    assert_eq!(services.timings.assertion_timeout_ms, 300);
    assert!(services.cache.is_none());
}
