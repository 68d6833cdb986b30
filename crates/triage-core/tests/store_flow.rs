use chrono::{Duration, Utc};
use tempfile::tempdir;
use triage_core::backend::JsonFileBackend;
use triage_core::store::TaskStore;
use triage_core::task::Priority;

#[test]
fn store_roundtrip_across_reopen() {
    let temp = tempdir().expect("tempdir");
    let base = Utc::now();

    let written = {
        let backend = JsonFileBackend::open(temp.path()).expect("open backend");
        let mut store = TaskStore::open(Box::new(backend));

        let outcome = store
            .add("Write report", Priority::Critical, base)
            .expect("add should validate");
        assert!(outcome.is_saved());

        let outcome = store
            .add("Buy milk", Priority::Optional, base + Duration::milliseconds(250))
            .expect("add should validate");
        assert!(outcome.is_saved());

        let outcome = store
            .add("Review PR", Priority::Moderate, base + Duration::milliseconds(500))
            .expect("add should validate");
        assert!(outcome.is_saved());

        store.view()
    };

    let backend = JsonFileBackend::open(temp.path()).expect("reopen backend");
    let store = TaskStore::open(Box::new(backend));

    assert_eq!(store.len(), 3);
    assert_eq!(store.editing_id(), None);

    let reloaded = store.view();
    assert_eq!(reloaded, written);

    let texts: Vec<&str> = reloaded.iter().map(|task| task.text.as_str()).collect();
    assert_eq!(texts, vec!["Write report", "Review PR", "Buy milk"]);
}

#[test]
fn edit_and_remove_flow_persists() {
    let temp = tempdir().expect("tempdir");

    let backend = JsonFileBackend::open(temp.path()).expect("open backend");
    let mut store = TaskStore::open(Box::new(backend));

    let outcome = store
        .add("Draft notes", Priority::Moderate, Utc::now())
        .expect("add should validate");
    assert!(outcome.is_saved());
    let id = store.view()[0].id;

    store.start_editing(id);
    let outcome = store
        .update(id, "Publish notes", Priority::Critical)
        .expect("update should validate");
    assert!(outcome.is_saved());
    assert_eq!(store.editing_id(), None);

    let backend = JsonFileBackend::open(temp.path()).expect("reopen backend");
    let mut store = TaskStore::open(Box::new(backend));
    let task = store.get_by_id(id).expect("task survived reopen");
    assert_eq!(task.text, "Publish notes");
    assert_eq!(task.priority, Priority::Critical);

    let outcome = store.remove(id);
    assert!(outcome.is_saved());

    let backend = JsonFileBackend::open(temp.path()).expect("reopen backend again");
    let store = TaskStore::open(Box::new(backend));
    assert!(store.is_empty());
}

#[test]
fn malformed_slot_starts_empty_and_recovers_on_next_save() {
    let temp = tempdir().expect("tempdir");
    std::fs::write(temp.path().join("tasks.json"), "][ not json").expect("write garbage");

    let backend = JsonFileBackend::open(temp.path()).expect("open backend");
    let mut store = TaskStore::open(Box::new(backend));
    assert!(store.is_empty());

    let outcome = store
        .add("Fresh start", Priority::Optional, Utc::now())
        .expect("add should validate");
    assert!(outcome.is_saved());

    let backend = JsonFileBackend::open(temp.path()).expect("reopen backend");
    let store = TaskStore::open(Box::new(backend));
    assert_eq!(store.len(), 1);
    assert_eq!(store.view()[0].text, "Fresh start");
}
