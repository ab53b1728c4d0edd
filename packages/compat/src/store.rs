//! Compatibility record storage.
//!
//! The trait is deliberately narrow — upsert by key, get by key, range
//! query by the two fields resolution filters on. Concurrent upserts for
//! different products are independent; same-product races resolve last
//! write wins.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use normalizer::ComponentType;

use crate::error::Result;
use crate::record::CompatibilityRecord;

/// Storage for compatibility records, keyed by product id with an index
/// usable by `(component_type, socket)` and `(component_type,
/// memory_type)`.
#[async_trait]
pub trait CompatStore: Send + Sync {
    async fn upsert(&self, record: &CompatibilityRecord) -> Result<()>;

    async fn get(&self, product_id: Uuid) -> Result<Option<CompatibilityRecord>>;

    async fn find_by_socket(
        &self,
        component_type: ComponentType,
        socket: &str,
    ) -> Result<Vec<CompatibilityRecord>>;

    async fn find_by_memory_type(
        &self,
        component_type: ComponentType,
        memory_type: &str,
    ) -> Result<Vec<CompatibilityRecord>>;

    async fn list(&self, component_type: ComponentType) -> Result<Vec<CompatibilityRecord>>;
}

#[async_trait]
impl<T: CompatStore + ?Sized> CompatStore for std::sync::Arc<T> {
    async fn upsert(&self, record: &CompatibilityRecord) -> Result<()> {
        (**self).upsert(record).await
    }

    async fn get(&self, product_id: Uuid) -> Result<Option<CompatibilityRecord>> {
        (**self).get(product_id).await
    }

    async fn find_by_socket(
        &self,
        component_type: ComponentType,
        socket: &str,
    ) -> Result<Vec<CompatibilityRecord>> {
        (**self).find_by_socket(component_type, socket).await
    }

    async fn find_by_memory_type(
        &self,
        component_type: ComponentType,
        memory_type: &str,
    ) -> Result<Vec<CompatibilityRecord>> {
        (**self).find_by_memory_type(component_type, memory_type).await
    }

    async fn list(&self, component_type: ComponentType) -> Result<Vec<CompatibilityRecord>> {
        (**self).list(component_type).await
    }
}

/// In-memory store for tests and development. Data is lost on restart.
pub struct MemoryCompatStore {
    records: RwLock<HashMap<Uuid, CompatibilityRecord>>,
}

impl Default for MemoryCompatStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCompatStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    pub fn record_count(&self) -> usize {
        self.records.read().unwrap().len()
    }

    pub fn clear(&self) {
        self.records.write().unwrap().clear();
    }

    fn filtered<F>(&self, predicate: F) -> Vec<CompatibilityRecord>
    where
        F: Fn(&CompatibilityRecord) -> bool,
    {
        let mut records: Vec<_> = self
            .records
            .read()
            .unwrap()
            .values()
            .filter(|r| predicate(r))
            .cloned()
            .collect();
        // Deterministic output order for callers and tests.
        records.sort_by_key(|r| r.product_id);
        records
    }
}

#[async_trait]
impl CompatStore for MemoryCompatStore {
    async fn upsert(&self, record: &CompatibilityRecord) -> Result<()> {
        self.records
            .write()
            .unwrap()
            .insert(record.product_id, record.clone());
        Ok(())
    }

    async fn get(&self, product_id: Uuid) -> Result<Option<CompatibilityRecord>> {
        Ok(self.records.read().unwrap().get(&product_id).cloned())
    }

    async fn find_by_socket(
        &self,
        component_type: ComponentType,
        socket: &str,
    ) -> Result<Vec<CompatibilityRecord>> {
        Ok(self.filtered(|r| {
            r.component_type == component_type && r.socket.as_deref() == Some(socket)
        }))
    }

    async fn find_by_memory_type(
        &self,
        component_type: ComponentType,
        memory_type: &str,
    ) -> Result<Vec<CompatibilityRecord>> {
        Ok(self.filtered(|r| {
            r.component_type == component_type && r.memory_type.as_deref() == Some(memory_type)
        }))
    }

    async fn list(&self, component_type: ComponentType) -> Result<Vec<CompatibilityRecord>> {
        Ok(self.filtered(|r| r.component_type == component_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::record;

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let store = MemoryCompatStore::new();
        let rec = record(ComponentType::Cpu, Some("AM4"), None, 0.95);
        store.upsert(&rec).await.unwrap();

        let fetched = store.get(rec.product_id).await.unwrap().unwrap();
        assert_eq!(fetched, rec);
    }

    #[tokio::test]
    async fn upsert_overwrites_last_write_wins() {
        let store = MemoryCompatStore::new();
        let mut rec = record(ComponentType::Cpu, Some("AM4"), None, 0.80);
        store.upsert(&rec).await.unwrap();

        rec.socket = Some("AM5".to_string());
        rec.confidence = 0.95;
        store.upsert(&rec).await.unwrap();

        assert_eq!(store.record_count(), 1);
        let fetched = store.get(rec.product_id).await.unwrap().unwrap();
        assert_eq!(fetched.socket.as_deref(), Some("AM5"));
    }

    #[tokio::test]
    async fn indexes_filter_by_component_and_field() {
        let store = MemoryCompatStore::new();
        store
            .upsert(&record(ComponentType::Motherboard, Some("AM4"), None, 0.9))
            .await
            .unwrap();
        store
            .upsert(&record(ComponentType::Motherboard, Some("LGA1700"), None, 0.9))
            .await
            .unwrap();
        store
            .upsert(&record(ComponentType::Cpu, Some("AM4"), None, 0.9))
            .await
            .unwrap();
        store
            .upsert(&record(ComponentType::Ram, None, Some("DDR4"), 0.9))
            .await
            .unwrap();

        let am4_boards = store
            .find_by_socket(ComponentType::Motherboard, "AM4")
            .await
            .unwrap();
        assert_eq!(am4_boards.len(), 1);

        let ddr4 = store
            .find_by_memory_type(ComponentType::Ram, "DDR4")
            .await
            .unwrap();
        assert_eq!(ddr4.len(), 1);

        assert_eq!(store.list(ComponentType::Motherboard).await.unwrap().len(), 2);
    }
}
