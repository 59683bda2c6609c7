use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use tracing::trace;

use super::EventStore;
use crate::analytics::{ClickEvent, NewClickEvent};
use crate::errors::Result;

/// In-process event store
pub struct MemoryEventStore {
    events: RwLock<Vec<ClickEvent>>,
    next_id: AtomicI64,
}

impl Default for MemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Seed the store with already-persisted events (fixtures, imports)
    pub fn with_events(events: Vec<ClickEvent>) -> Self {
        let next_id = events.iter().map(|e| e.id).max().unwrap_or(0) + 1;
        Self {
            events: RwLock::new(events),
            next_id: AtomicI64::new(next_id),
        }
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn insert(&self, event: NewClickEvent) -> Result<()> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let event = event.into_event(id, Utc::now());
        trace!("MemoryEventStore: inserted event {} ({})", id, event.slug);
        self.events.write().push(event);
        Ok(())
    }

    async fn query_all(&self) -> Result<Vec<ClickEvent>> {
        let mut events = self.events.read().clone();
        events.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(events)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.len() as u64)
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::DeviceClass;
    use chrono::Duration;

    fn new_event(slug: &str) -> NewClickEvent {
        NewClickEvent {
            slug: slug.to_string(),
            url: "https://example.com".to_string(),
            referrer: "direct".to_string(),
            browser: "Chrome".to_string(),
            os: "Windows".to_string(),
            device: DeviceClass::Desktop,
            country: "CL".to_string(),
            ip: None,
            isp: None,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let store = MemoryEventStore::new();
        store.insert(new_event("a")).await.unwrap();
        store.insert(new_event("b")).await.unwrap();

        let events = store.query_all().await.unwrap();
        assert_eq!(events.len(), 2);
        // 倒序：后写入的在前
        assert_eq!(events[0].slug, "b");
        assert!(events[0].id > events[1].id);
    }

    #[tokio::test]
    async fn test_query_all_orders_by_created_at_desc() {
        let now = Utc::now();
        let older = new_event("old").into_event(7, now - Duration::hours(2));
        let newer = new_event("new").into_event(3, now);
        let store = MemoryEventStore::with_events(vec![older, newer]);

        let events = store.query_all().await.unwrap();
        assert_eq!(events[0].slug, "new");
        assert_eq!(events[1].slug, "old");

        // 新写入的 id 接在种子数据之后
        store.insert(new_event("next")).await.unwrap();
        let events = store.query_all().await.unwrap();
        assert_eq!(events[0].id, 8);
    }
}
