use chrono::NaiveDate;
use moka::future::Cache;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::PricingConfig;
use crate::lifecycle::types::LineItem;
use crate::transport::{ProcurementApi, RfqLine};

/// Shared content of every RFQ in a batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RfqTemplate {
    pub response_deadline: Option<NaiveDate>,
    pub notes: Option<String>,
    /// Lines to quote. `None` copies the requisition's own line items.
    pub items: Option<Vec<LineItem>>,
}

impl RfqTemplate {
    pub fn with_deadline(response_deadline: NaiveDate) -> Self {
        Self {
            response_deadline: Some(response_deadline),
            ..Default::default()
        }
    }

    pub(crate) fn lines<'a>(&'a self, requisition_items: &'a [LineItem]) -> &'a [LineItem] {
        self.items.as_deref().unwrap_or(requisition_items)
    }
}

/// Read-through cache of supplier price lists, used to pre-fill RFQ lines.
///
/// Prices are advisory. A failed lookup yields no prices and is not cached.
pub struct PriceCatalog<A> {
    api: Arc<A>,
    cache: Cache<u64, Arc<HashMap<u64, f64>>>,
}

impl<A: ProcurementApi> PriceCatalog<A> {
    pub fn new(api: Arc<A>, config: &PricingConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.cache_capacity)
            .time_to_live(Duration::from_secs(config.cache_ttl_seconds))
            .build();
        Self { api, cache }
    }

    pub async fn prices_for(&self, supplier_id: u64) -> Arc<HashMap<u64, f64>> {
        if let Some(cached) = self.cache.get(&supplier_id).await {
            debug!(supplier_id, "Price list cache hit");
            return cached;
        }

        match self.api.supplier_price_list(supplier_id).await {
            Ok(list) => {
                let prices: Arc<HashMap<u64, f64>> =
                    Arc::new(list.into_iter().map(|p| (p.item_id, p.unit_price)).collect());
                self.cache.insert(supplier_id, Arc::clone(&prices)).await;
                prices
            }
            Err(e) => {
                warn!(supplier_id, error = %e, "Price list unavailable, RFQ goes out without prices");
                Arc::new(HashMap::new())
            }
        }
    }

    /// RFQ lines for `items` with the supplier's last known prices filled in.
    pub async fn prefill(&self, supplier_id: u64, items: &[LineItem]) -> Vec<RfqLine> {
        let prices = self.prices_for(supplier_id).await;
        items
            .iter()
            .map(|item| RfqLine {
                unit_price: prices.get(&item.item_id).copied(),
                ..RfqLine::from(item)
            })
            .collect()
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{CatalogPrice, MockProcurementApi, TransportError};

    fn pricing() -> PricingConfig {
        PricingConfig {
            cache_ttl_seconds: 60,
            cache_capacity: 10,
        }
    }

    #[tokio::test]
    async fn test_prefill_uses_known_prices_only() {
        let mut api = MockProcurementApi::new();
        api.expect_supplier_price_list().times(1).returning(|_| {
            Ok(vec![CatalogPrice {
                item_id: 100,
                unit_price: 12.5,
                currency: Some("EUR".to_string()),
            }])
        });
        let catalog = PriceCatalog::new(Arc::new(api), &pricing());

        let items = vec![LineItem::new(100, 2.0), LineItem::new(200, 1.0)];
        let lines = catalog.prefill(7, &items).await;
        assert_eq!(lines[0].unit_price, Some(12.5));
        assert_eq!(lines[1].unit_price, None);

        // Second lookup is served from the cache
        let again = catalog.prefill(7, &items).await;
        assert_eq!(again, lines);
    }

    #[tokio::test]
    async fn test_failed_lookup_is_not_cached() {
        let mut api = MockProcurementApi::new();
        api.expect_supplier_price_list()
            .times(2)
            .returning(|_| Err(TransportError::http(503, None)));
        let catalog = PriceCatalog::new(Arc::new(api), &pricing());

        assert!(catalog.prices_for(7).await.is_empty());
        assert!(catalog.prices_for(7).await.is_empty());
    }

    #[test]
    fn test_template_falls_back_to_requisition_items() {
        let requisition_items = vec![LineItem::new(1, 1.0)];
        let template = RfqTemplate::default();
        assert_eq!(template.lines(&requisition_items), &requisition_items[..]);

        let custom = RfqTemplate {
            items: Some(vec![LineItem::new(2, 3.0)]),
            ..Default::default()
        };
        assert_eq!(custom.lines(&requisition_items)[0].item_id, 2);
    }
}
