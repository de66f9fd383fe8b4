use tempfile::tempdir;

use tend::model::{Bucket, Priority, Status, Task, TaskFilters, TaskUpdate};
use tend::store::engine::Storage;

fn new_task(action: &str, project: &str, status: Status) -> Task {
    Task::new(
        action.into(),
        String::new(),
        Priority::Medium,
        project.into(),
        status,
    )
}

#[test]
fn full_task_lifecycle() {
    let dir = tempdir().unwrap();
    let storage = Storage::init(dir.path()).unwrap();

    // T1 created with status todo in "general" appears in active.
    let t1 = storage
        .add_task(new_task("T1", "general", Status::Todo))
        .unwrap();
    let container = storage.containers.load("general").unwrap();
    assert_eq!(container.bucket_of(&t1.id), Some(Bucket::Active));

    // Complete: only in completed, status done, progress 100.
    storage.complete_task(&t1.id).unwrap();
    let container = storage.containers.load("general").unwrap();
    assert_eq!(container.bucket_of(&t1.id), Some(Bucket::Completed));
    let task = container.get(&t1.id).unwrap();
    assert_eq!(task.status, Status::Done);
    assert_eq!(task.progress, Some(100));

    // Delete: moves to deleted, status cancelled.
    storage.delete_task(&t1.id).unwrap();
    let container = storage.containers.load("general").unwrap();
    assert_eq!(container.bucket_of(&t1.id), Some(Bucket::Deleted));
    assert_eq!(container.get(&t1.id).unwrap().status, Status::Cancelled);

    // Still findable anywhere: soft-delete never erases the record.
    let found = storage.get_task_anywhere(&t1.id).unwrap();
    assert_eq!(found.id, t1.id);
    assert_eq!(found.status, Status::Cancelled);
}

#[test]
fn bucket_exclusivity_across_operations() {
    let dir = tempdir().unwrap();
    let storage = Storage::init(dir.path()).unwrap();

    let ids: Vec<String> = (0..4)
        .map(|i| {
            storage
                .add_task(new_task(&format!("task {i}"), "general", Status::Todo))
                .unwrap()
                .id
        })
        .collect();

    storage.start_task(&ids[0], None).unwrap();
    storage.complete_task(&ids[1]).unwrap();
    storage.cancel_task(&ids[2]).unwrap();
    storage.delete_task(&ids[3]).unwrap();

    let container = storage.containers.load("general").unwrap();
    for id in &ids {
        let occurrences = [
            Bucket::Active,
            Bucket::Completed,
            Bucket::Archived,
            Bucket::Deleted,
        ]
        .iter()
        .filter(|&&b| container.bucket(b).contains_key(id))
        .count();
        assert_eq!(occurrences, 1, "task {id} must live in exactly one bucket");
    }
    assert_eq!(container.bucket_of(&ids[0]), Some(Bucket::Active));
    assert_eq!(container.bucket_of(&ids[1]), Some(Bucket::Completed));
    assert_eq!(container.bucket_of(&ids[2]), Some(Bucket::Archived));
    assert_eq!(container.bucket_of(&ids[3]), Some(Bucket::Deleted));
}

#[test]
fn progress_bound_enforced_through_update() {
    let dir = tempdir().unwrap();
    let storage = Storage::init(dir.path()).unwrap();
    let task = storage
        .add_task(new_task("bounded", "general", Status::Todo))
        .unwrap();

    let err = storage
        .update_task(&task.id, TaskUpdate::new().with_progress(101))
        .unwrap_err();
    assert_eq!(err.code(), "invalid_argument");

    let updated = storage
        .update_task(&task.id, TaskUpdate::new().with_progress(100))
        .unwrap();
    assert_eq!(updated.progress, Some(100));
}

#[test]
fn record_round_trips_byte_for_byte() {
    let dir = tempdir().unwrap();
    let storage = Storage::init(dir.path()).unwrap();
    let task = storage
        .add_task(new_task("round trip", "general", Status::Todo))
        .unwrap();

    let container_path = storage.containers.container_path("general");
    let first = std::fs::read_to_string(&container_path).unwrap();

    // Load and rewrite the same state: identical bytes, timestamps included.
    let mut container = storage.containers.load("general").unwrap();
    let reparsed = serde_json::to_string_pretty(&container).unwrap();
    assert_eq!(first, reparsed);

    // The task inside survives a parse cycle unchanged.
    let loaded = container.remove(&task.id).unwrap();
    let json = serde_json::to_string(&loaded).unwrap();
    let round: Task = serde_json::from_str(&json).unwrap();
    assert_eq!(loaded, round);
    assert_eq!(loaded.created_at, round.created_at);
}

#[test]
fn search_filter_spans_action_and_notes() {
    let dir = tempdir().unwrap();
    let storage = Storage::init(dir.path()).unwrap();

    let mut with_notes = new_task("quiet title", "general", Status::Todo);
    with_notes.context_notes = Some("mentions BUDGET review".into());
    storage.add_task(with_notes).unwrap();
    storage
        .add_task(new_task("budget spreadsheet", "general", Status::Todo))
        .unwrap();
    storage
        .add_task(new_task("unrelated", "general", Status::Todo))
        .unwrap();

    let mut filters = TaskFilters::default();
    filters.search = Some("budget".into());
    let matches = storage.list_tasks(&filters).unwrap();
    assert_eq!(matches.len(), 2);
}

#[test]
fn listing_skips_corrupt_containers_direct_load_surfaces_them() {
    let dir = tempdir().unwrap();
    let storage = Storage::init(dir.path()).unwrap();
    storage
        .add_task(new_task("healthy", "general", Status::Todo))
        .unwrap();

    let corrupt_path = storage.containers.container_path("broken");
    std::fs::create_dir_all(corrupt_path.parent().unwrap()).unwrap();
    std::fs::write(&corrupt_path, "{not json").unwrap();

    // Best-effort listing still returns the healthy container's task.
    let all = storage.list_tasks(&TaskFilters::default()).unwrap();
    assert_eq!(all.len(), 1);

    // A direct load of the corrupt container is a hard failure.
    assert_eq!(
        storage.containers.load("broken").unwrap_err().code(),
        "corrupt"
    );
}

#[test]
fn contention_surfaces_instead_of_deadlocking() {
    let dir = tempdir().unwrap();
    let storage = Storage::init(dir.path()).unwrap();
    let task = storage
        .add_task(new_task("locked", "general", Status::Todo))
        .unwrap();

    // Hold the container's lock from a second handle; the engine operation
    // must time out with Contention, not hang.
    let other = Storage::open(dir.path()).unwrap();
    let _held = other.containers.lock("general").unwrap();

    let err = storage.complete_task(&task.id).unwrap_err();
    assert_eq!(err.code(), "contention");
}
