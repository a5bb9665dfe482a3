//! Element resolver with strategy chain and cached grounding

use std::sync::Arc;

use action_primitives::PageDriver;
use async_trait::async_trait;
use result_cache::{content_hash, ResultCache};
use serde_json::json;
use testpilot_core_types::{ElementRef, LocatorDescriptor, RequestId};
use tracing::{debug, info, warn};

use crate::errors::LocatorError;
use crate::strategies::{fallback_chain, Strategy};
use crate::types::{Grounding, TreeSnapshot};

/// Element resolver trait
#[async_trait]
pub trait ElementResolver: Send + Sync {
    /// Map a snapshot reference to its page address. Fails closed when the
    /// reference is not in `snapshot`.
    fn resolve(&self, element_ref: &ElementRef, snapshot: &TreeSnapshot)
        -> Result<String, LocatorError>;

    /// Durable locator for the element at `address`. Falls back to the
    /// literal address, tagged `low`, when no strategy is unique.
    async fn synthesize_locator(&self, address: &str) -> LocatorDescriptor;

    /// `resolve` followed by `synthesize_locator`.
    async fn ground(
        &self,
        element_ref: &ElementRef,
        snapshot: &TreeSnapshot,
        request_id: &RequestId,
    ) -> Result<Grounding, LocatorError>;
}

/// Default element resolver implementation
pub struct DefaultElementResolver {
    page: Arc<dyn PageDriver>,
    strategies: Vec<Box<dyn Strategy>>,
    cache: Option<Arc<ResultCache>>,
}

impl DefaultElementResolver {
    /// Create a new resolver with all strategies
    pub fn new(page: Arc<dyn PageDriver>) -> Self {
        Self {
            page,
            strategies: fallback_chain(),
            cache: None,
        }
    }

    /// Memoize groundings in `cache`, keyed by snapshot content.
    pub fn with_cache(mut self, cache: Arc<ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_strategies(mut self, strategies: Vec<Box<dyn Strategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    fn cache_key(element_ref: &ElementRef, snapshot: &TreeSnapshot, address: &str) -> Option<String> {
        let descriptor = json!({
            "kind": "grounding",
            "tree": snapshot.simplified_tree,
            "ref": element_ref.to_string(),
            "address": address,
        });
        match content_hash(&descriptor) {
            Ok(key) => Some(key),
            Err(err) => {
                warn!("grounding key not computable: {}", err);
                None
            }
        }
    }
}

#[async_trait]
impl ElementResolver for DefaultElementResolver {
    fn resolve(
        &self,
        element_ref: &ElementRef,
        snapshot: &TreeSnapshot,
    ) -> Result<String, LocatorError> {
        snapshot
            .address(element_ref)
            .map(str::to_string)
            .ok_or(LocatorError::NotFound(*element_ref))
    }

    async fn synthesize_locator(&self, address: &str) -> LocatorDescriptor {
        let traits = match self.page.describe(address).await {
            Ok(Some(traits)) => traits,
            Ok(None) => {
                debug!(address, "element no longer on page; using literal address");
                return LocatorDescriptor::literal(address);
            }
            Err(err) => {
                warn!(address, "could not describe element: {}", err);
                return LocatorDescriptor::literal(address);
            }
        };

        for strategy in &self.strategies {
            let Some(candidate) = strategy.describe(&traits) else {
                continue;
            };
            match self.page.count(&candidate).await {
                Ok(1) => {
                    debug!(
                        address,
                        strategy = strategy.name(),
                        locator = %candidate.address,
                        "strategy is unique"
                    );
                    return candidate;
                }
                Ok(matches) => {
                    debug!(address, strategy = strategy.name(), matches, "strategy not unique")
                }
                Err(err) => {
                    debug!(address, strategy = strategy.name(), "strategy probe failed: {}", err)
                }
            }
        }

        debug!(address, "no unique strategy; using literal address");
        LocatorDescriptor::literal(address)
    }

    async fn ground(
        &self,
        element_ref: &ElementRef,
        snapshot: &TreeSnapshot,
        request_id: &RequestId,
    ) -> Result<Grounding, LocatorError> {
        let address = self.resolve(element_ref, snapshot)?;

        let key = match &self.cache {
            Some(_) => Self::cache_key(element_ref, snapshot, &address),
            None => None,
        };

        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            if let Some(locator) = cache.get_json::<LocatorDescriptor>(key, request_id).await {
                debug!(element = %element_ref, locator = %locator, "grounding served from cache");
                return Ok(Grounding {
                    element_ref: *element_ref,
                    address,
                    locator,
                    cached: true,
                });
            }
        }

        let locator = self.synthesize_locator(&address).await;
        info!(
            element = %element_ref,
            strategy = %locator.strategy,
            reliability = %locator.reliability,
            "element grounded"
        );

        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            cache.set_json(key, &locator, request_id).await;
        }

        Ok(Grounding {
            element_ref: *element_ref,
            address,
            locator,
            cached: false,
        })
    }
}
