use bk_core::store::HealthStore;
use bk_core::types::{BoardId, HealthRecord, HealthState, IssueRef};
use chrono::Utc;

fn failing_record(board: BoardId) -> HealthRecord {
    HealthRecord {
        board,
        state: HealthState::Failing,
        streak_started_at: Some(Utc::now()),
        issue: Some(IssueRef {
            number: 42,
            url: Some("https://github.com/owner/repo/issues/42".to_string()),
        }),
        last_run: 7,
        updated_at: Utc::now(),
    }
}

#[tokio::test]
async fn upsert_and_get_roundtrip() {
    let store = HealthStore::new_in_memory().await.unwrap();
    let record = failing_record(BoardId::new("vendorX", "modelY"));

    store.upsert(&record).await.unwrap();
    let loaded = store.get(&record.board).await.unwrap().expect("record exists");

    assert_eq!(loaded.board, record.board);
    assert_eq!(loaded.state, HealthState::Failing);
    assert_eq!(loaded.issue.as_ref().unwrap().number, 42);
    assert_eq!(loaded.last_run, 7);
    assert!(loaded.streak_started_at.is_some());
}

#[tokio::test]
async fn get_or_healthy_defaults_unknown_board() {
    let store = HealthStore::new_in_memory().await.unwrap();
    let board = BoardId::new("vendorZ", "modelW");

    let record = store.get_or_healthy(&board).await.unwrap();
    assert_eq!(record.state, HealthState::Healthy);
    assert_eq!(record.last_run, 0);
    assert!(record.issue.is_none());
    // not persisted until upserted
    assert!(store.get(&board).await.unwrap().is_none());
}

#[tokio::test]
async fn upsert_replaces_existing_row() {
    let store = HealthStore::new_in_memory().await.unwrap();
    let board = BoardId::new("vendorX", "modelY");
    let mut record = failing_record(board.clone());
    store.upsert(&record).await.unwrap();

    record.state = HealthState::Healthy;
    record.streak_started_at = None;
    record.issue = None;
    record.last_run = 8;
    store.upsert(&record).await.unwrap();

    let loaded = store.get(&board).await.unwrap().unwrap();
    assert_eq!(loaded.state, HealthState::Healthy);
    assert!(loaded.streak_started_at.is_none());
    assert!(loaded.issue.is_none());
    assert_eq!(loaded.last_run, 8);

    // exactly one row per board
    assert_eq!(store.list_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn list_by_state_filters() {
    let store = HealthStore::new_in_memory().await.unwrap();
    store
        .upsert(&failing_record(BoardId::new("vendorX", "modelY")))
        .await
        .unwrap();
    store
        .upsert(&HealthRecord::healthy(BoardId::new("vendorZ", "modelW")))
        .await
        .unwrap();

    let failing = store.list_by_state(HealthState::Failing).await.unwrap();
    assert_eq!(failing.len(), 1);
    assert_eq!(failing[0].board.as_str(), "vendorX/modelY");

    let stale = store.list_by_state(HealthState::Stale).await.unwrap();
    assert!(stale.is_empty());
}
