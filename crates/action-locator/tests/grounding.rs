use std::sync::Arc;
use std::time::Duration;

use action_locator::{DefaultElementResolver, ElementResolver, LocatorError, TreeSnapshot};
use action_primitives::memory::{MemoryElement, MemoryPage};
use result_cache::{CacheConfig, ResultCache};
use tempfile::tempdir;
use testpilot_core_types::{ElementRef, LocatorStrategy, Reliability, RequestId};

fn storefront() -> Arc<MemoryPage> {
    Arc::new(
        MemoryPage::new()
            .with_element(
                MemoryElement::new("#search")
                    .role("searchbox")
                    .placeholder("Search products"),
            )
            .with_element(
                MemoryElement::new("#add")
                    .role("button")
                    .name("Add to Cart")
                    .text("Add to Cart")
                    .test_id("add-to-cart"),
            ),
    )
}

fn cache(dir: &std::path::Path) -> Arc<ResultCache> {
    Arc::new(ResultCache::new(
        CacheConfig::new(dir.join("cache.json"))
            .lock_timeout(Duration::from_secs(2))
            .sweep_probability(0.0),
    ))
}

#[tokio::test]
async fn grounding_is_memoized_per_snapshot() {
    let dir = tempdir().unwrap();
    let page = storefront();
    let (tree, refs) = page.accessibility_outline();
    let snapshot = TreeSnapshot::from_pairs(tree, refs);
    let add = ElementRef::new(0, 2);
    let rid = RequestId::new();

    let resolver = DefaultElementResolver::new(page.clone()).with_cache(cache(dir.path()));
    let first = resolver.ground(&add, &snapshot, &rid).await.unwrap();
    assert!(!first.cached);
    assert_eq!(first.address, "#add");
    assert_eq!(first.locator.strategy, LocatorStrategy::Role);
    assert_eq!(first.locator.reliability, Reliability::High);

    let second = resolver.ground(&add, &snapshot, &rid).await.unwrap();
    assert!(second.cached);
    assert_eq!(second.locator, first.locator);

    // A different tree is a different page state: no reuse.
    let mutated = TreeSnapshot::from_pairs(
        format!("{}\n[0-9] dialog \"Added!\"", snapshot.simplified_tree),
        snapshot.id_to_address.clone(),
    );
    let third = resolver.ground(&add, &mutated, &rid).await.unwrap();
    assert!(!third.cached);
}

#[tokio::test]
async fn rollback_discards_groundings_of_a_request() {
    let dir = tempdir().unwrap();
    let shared = cache(dir.path());
    let page = storefront();
    let (tree, refs) = page.accessibility_outline();
    let snapshot = TreeSnapshot::from_pairs(tree, refs);
    let rid = RequestId::new();
    let resolver = DefaultElementResolver::new(page).with_cache(shared.clone());

    resolver.ground(&ElementRef::new(0, 1), &snapshot, &rid).await.unwrap();
    assert_eq!(shared.delete_all_for_request_id(&rid).await, 1);

    let again = resolver.ground(&ElementRef::new(0, 1), &snapshot, &rid).await.unwrap();
    assert!(!again.cached);
    assert_eq!(again.locator.strategy, LocatorStrategy::Role);
    assert_eq!(again.locator.address, "role=searchbox");
    assert_eq!(again.locator.reliability, Reliability::Medium);
}

#[tokio::test]
async fn unknown_reference_never_touches_the_page() {
    let page = storefront();
    let resolver = DefaultElementResolver::new(page.clone());
    let snapshot = TreeSnapshot::new("");
    let err = resolver
        .ground(&ElementRef::new(0, 1), &snapshot, &RequestId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LocatorError::NotFound(_)));
    assert!(page.actions().is_empty());
}
