use tempfile::tempdir;

use tend::model::{Bucket, Priority, Status, Task, TaskUpdate};
use tend::store::engine::Storage;
use tend::store::legacy::LegacyCollection;

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
fn fix_repairs_legacy_drift() {
    let dir = tempdir().unwrap();
    let storage = Storage::init(dir.path()).unwrap();

    // Legacy active.json contains T2 with status done: drift.
    let t2 = new_task("T2", "general", Status::Done);
    let id = t2.id.clone();
    let mut active = storage.legacy.load(LegacyCollection::Active).unwrap();
    active.add_task(t2);
    storage
        .legacy
        .save(LegacyCollection::Active, &mut active)
        .unwrap();

    let report = storage.fix_consistency().unwrap();
    assert_eq!(report.fixed, 1);
    assert_eq!(report.task_ids, vec![id.clone()]);

    assert_eq!(
        storage.legacy.owner_of(&id).unwrap(),
        Some(LegacyCollection::Completed)
    );
    let fixed = storage.legacy.get(&id).unwrap();
    assert_eq!(fixed.status, Status::Done);
    assert_eq!(fixed.progress, Some(100));
}

#[test]
fn fix_repairs_container_drift_introduced_by_update() {
    let dir = tempdir().unwrap();
    let storage = Storage::init(dir.path()).unwrap();

    let task = storage
        .add_task(new_task("drifter", "general", Status::Todo))
        .unwrap();

    // A direct status mutation through update leaves the task in active.
    storage
        .update_task(&task.id, TaskUpdate::new().with_status(Status::Completed))
        .unwrap();
    let container = storage.containers.load("general").unwrap();
    assert_eq!(container.bucket_of(&task.id), Some(Bucket::Active));

    let report = storage.fix_consistency().unwrap();
    assert_eq!(report.fixed, 1);

    let container = storage.containers.load("general").unwrap();
    assert_eq!(container.bucket_of(&task.id), Some(Bucket::Completed));
    let fixed = container.get(&task.id).unwrap();
    assert_eq!(fixed.status, Status::Done);
    assert_eq!(fixed.progress, Some(100));
}

#[test]
fn fix_on_clean_storage_reports_zero() {
    let dir = tempdir().unwrap();
    let storage = Storage::init(dir.path()).unwrap();
    storage
        .add_task(new_task("honest", "general", Status::InProgress))
        .unwrap();

    let report = storage.fix_consistency().unwrap();
    assert_eq!(report.fixed, 0);
    assert!(report.task_ids.is_empty());
}
