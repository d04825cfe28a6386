//! Generic in-memory `ResultRepository<T>` test double: one instance per
//! entity kind, mirroring how the real repositories are provisioned one
//! per persisted store (spec.md §6 persistence layout).

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;
use wyckoff_core::collaborators::ResultRepository;
use wyckoff_core::error::WyckoffError;

#[derive(Default)]
pub struct InMemoryRepository<T> {
    rows: Mutex<HashMap<Uuid, T>>,
    insertion_order: Mutex<Vec<Uuid>>,
}

impl<T> InMemoryRepository<T> {
    pub fn new() -> Self {
        Self { rows: Mutex::new(HashMap::new()), insertion_order: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl<T> ResultRepository<T> for InMemoryRepository<T>
where
    T: Send + Sync + Serialize + Clone,
{
    async fn save_result(&self, result: &T) -> Result<Uuid, WyckoffError> {
        let id = Uuid::new_v4();
        self.rows.lock().expect("in-memory repository lock poisoned").insert(id, result.clone());
        self.insertion_order.lock().expect("in-memory repository lock poisoned").push(id);
        Ok(id)
    }

    async fn get_result(&self, id: Uuid) -> Result<Option<T>, WyckoffError> {
        Ok(self.rows.lock().expect("in-memory repository lock poisoned").get(&id).cloned())
    }

    async fn list_results(&self, limit: usize, offset: usize) -> Result<Vec<T>, WyckoffError> {
        let order = self.insertion_order.lock().expect("in-memory repository lock poisoned");
        let rows = self.rows.lock().expect("in-memory repository lock poisoned");
        Ok(order.iter().skip(offset).take(limit).filter_map(|id| rows.get(id).cloned()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Serialize, PartialEq)]
    struct Row {
        value: u32,
    }

    #[tokio::test]
    async fn save_then_get_round_trips() {
        let repo: InMemoryRepository<Row> = InMemoryRepository::new();
        let id = repo.save_result(&Row { value: 7 }).await.unwrap();
        let fetched = repo.get_result(id).await.unwrap();
        assert_eq!(fetched, Some(Row { value: 7 }));
    }

    #[tokio::test]
    async fn list_results_respects_insertion_order_and_paging() {
        let repo: InMemoryRepository<Row> = InMemoryRepository::new();
        for value in 0..5 {
            repo.save_result(&Row { value }).await.unwrap();
        }
        let page = repo.list_results(2, 1).await.unwrap();
        assert_eq!(page, vec![Row { value: 1 }, Row { value: 2 }]);
    }
}
