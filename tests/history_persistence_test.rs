// tests/history_persistence_test.rs
// History survives a process restart when backed by a JSON file

use sqltune::history::{Feedback, HistoryStore, JsonHistoryStore};
use sqltune::optimizer::{MatchPolicy, OptimizeRequest, OptimizerService};
use sqltune::optimizer::Source;
use std::sync::Arc;
use tempfile::tempdir;

fn service_at(path: &std::path::Path) -> OptimizerService {
    OptimizerService::heuristic(Arc::new(JsonHistoryStore::new(path)), MatchPolicy::default())
}

#[tokio::test]
async fn test_feedback_survives_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("history.json");

    let first_id = {
        let service = service_at(&path);
        let result = service
            .optimize(&OptimizeRequest::new("SELECT * FROM invoices WHERE paid = 0"))
            .await
            .unwrap();
        assert!(service.record_feedback(result.id, Feedback::Helpful).unwrap());
        result.id
    };
    assert!(path.exists());

    // Fresh store over the same file
    let service = service_at(&path);
    let reused = service
        .optimize(&OptimizeRequest::new("SELECT * FROM invoices WHERE paid = 0"))
        .await
        .unwrap();
    assert_eq!(reused.source, Source::History);
    assert_eq!(reused.id, first_id);

    let records = service.history().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].feedback, Some(Feedback::Helpful));
}

#[tokio::test]
async fn test_corrupt_file_does_not_block_optimization() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("history.json");
    std::fs::write(&path, "{ definitely not history").unwrap();

    let service = service_at(&path);
    let result = service
        .optimize(&OptimizeRequest::new("SELECT id FROM accounts"))
        .await
        .unwrap();
    assert_eq!(result.optimized_query, "SELECT id FROM accounts LIMIT 100");

    // Listing surfaces the corruption instead of hiding it
    assert!(service.history().is_err());
    assert!(JsonHistoryStore::new(&path).get().is_err());
}

#[tokio::test]
async fn test_clear_persists() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("history.json");

    let service = service_at(&path);
    for sql in ["SELECT * FROM a", "SELECT * FROM b"] {
        service.optimize(&OptimizeRequest::new(sql)).await.unwrap();
    }
    assert_eq!(service.clear_history().unwrap(), 2);

    let reopened = JsonHistoryStore::new(&path);
    assert!(reopened.get().unwrap().is_empty());
}
