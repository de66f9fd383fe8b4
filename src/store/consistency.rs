use crate::error::Result;
use crate::model::ConsistencyReport;
use crate::store::containers::ContainerStore;
use crate::store::legacy::{LegacyCollection, LegacyStore};

/// Repair drift in the legacy store: tasks whose status says terminal but
/// which still sit in the `active` collection are forced to done with full
/// progress and relocated to `completed`. Run on demand, never automatically.
pub fn fix_legacy(legacy: &LegacyStore) -> Result<ConsistencyReport> {
    let _active_lock = legacy.lock(LegacyCollection::Active)?;
    let _completed_lock = legacy.lock(LegacyCollection::Completed)?;

    let mut active = legacy.load(LegacyCollection::Active)?;
    let drifted: Vec<String> = active
        .tasks
        .values()
        .filter(|t| t.status.is_terminal())
        .map(|t| t.id.clone())
        .collect();

    if drifted.is_empty() {
        return Ok(ConsistencyReport::default());
    }

    let mut completed = legacy.load(LegacyCollection::Completed)?;
    for id in &drifted {
        if let Some(mut task) = active.remove_task(id) {
            task.complete();
            completed.add_task(task);
        }
    }
    legacy.save(LegacyCollection::Completed, &mut completed)?;
    legacy.save(LegacyCollection::Active, &mut active)?;

    Ok(ConsistencyReport {
        fixed: drifted.len(),
        task_ids: drifted,
    })
}

/// The same repair over every project container's active bucket.
pub fn fix_containers(containers: &ContainerStore) -> Result<ConsistencyReport> {
    let mut report = ConsistencyReport::default();
    for name in containers.project_names()? {
        let moved = containers.try_with_lock(&name, |container| {
            let drifted: Vec<String> = container
                .active_tasks
                .values()
                .filter(|t| t.status.is_terminal())
                .map(|t| t.id.clone())
                .collect();
            if drifted.is_empty() {
                return Ok(None);
            }
            for id in &drifted {
                if let Some(mut task) = container.remove(id) {
                    task.complete();
                    container.insert(task);
                }
            }
            Ok(Some(drifted))
        })?;
        if let Some(ids) = moved {
            report.fixed += ids.len();
            report.task_ids.extend(ids);
        }
    }
    Ok(report)
}

/// Repair both stores and merge the reports.
pub fn fix_all(legacy: &LegacyStore, containers: &ContainerStore) -> Result<ConsistencyReport> {
    let mut report = fix_legacy(legacy)?;
    let from_containers = fix_containers(containers)?;
    report.fixed += from_containers.fixed;
    report.task_ids.extend(from_containers.task_ids);
    Ok(report)
}
