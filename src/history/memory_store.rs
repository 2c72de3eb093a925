// src/history/memory_store.rs

use parking_lot::RwLock;

use super::{
    insert_newest_first, remove_by_id, set_feedback, Feedback, HistoryRecord, HistoryResult,
    HistoryStore,
};

/// Process-local history, lost on restart
#[derive(Default)]
pub struct InMemoryHistoryStore {
    records: RwLock<Vec<HistoryRecord>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with records already ordered newest first
    pub fn with_records(records: Vec<HistoryRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }
}

impl HistoryStore for InMemoryHistoryStore {
    fn get(&self) -> HistoryResult<Vec<HistoryRecord>> {
        Ok(self.records.read().clone())
    }

    fn append(&self, record: HistoryRecord) -> HistoryResult<()> {
        insert_newest_first(&mut self.records.write(), record)
    }

    fn update_feedback(&self, id: i64, feedback: Feedback) -> HistoryResult<bool> {
        Ok(set_feedback(&mut self.records.write(), id, feedback))
    }

    fn remove(&self, id: i64) -> HistoryResult<bool> {
        Ok(remove_by_id(&mut self.records.write(), id))
    }

    fn clear(&self) -> HistoryResult<usize> {
        let mut records = self.records.write();
        let count = records.len();
        records.clear();
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::sample_record;

    #[test]
    fn test_append_keeps_newest_first() {
        let store = InMemoryHistoryStore::new();
        store.append(sample_record(1, "SELECT a FROM t", None)).unwrap();
        store.append(sample_record(2, "SELECT b FROM t", None)).unwrap();

        let ids: Vec<i64> = store.get().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn test_feedback_unknown_id_is_noop() {
        let store = InMemoryHistoryStore::new();
        store.append(sample_record(1, "SELECT a FROM t", None)).unwrap();

        assert!(!store.update_feedback(99, Feedback::Helpful).unwrap());
        assert!(store.get().unwrap()[0].feedback.is_none());
        assert!(store.update_feedback(1, Feedback::Helpful).unwrap());
        assert_eq!(store.get().unwrap()[0].feedback, Some(Feedback::Helpful));
    }

    #[test]
    fn test_remove_and_clear() {
        let store = InMemoryHistoryStore::new();
        for id in 1..=3 {
            store.append(sample_record(id, "SELECT 1", None)).unwrap();
        }
        assert!(store.remove(2).unwrap());
        assert!(!store.remove(2).unwrap());
        assert_eq!(store.clear().unwrap(), 2);
        assert!(store.get().unwrap().is_empty());
    }
}
