use std::collections::BTreeMap;
use std::fs;

use crate::error::{Result, TendError};
use crate::model::{MigrationReport, ProjectMigrationStats, Task};
use crate::store::containers::ContainerStore;
use crate::store::legacy::{LegacyCollection, LegacyStore};

/// Options for a migration run.
#[derive(Debug, Default, Clone, Copy)]
pub struct MigrationOptions {
    /// Report what would happen without writing any container.
    pub dry_run: bool,
    /// After a clean run, remove legacy collection files that are empty.
    pub cleanup: bool,
}

/// One-shot, idempotent migration from the three-collection legacy scheme
/// into per-project containers. Never aborts on a single bad task or
/// project: per-item failures land in the report's error list and the run
/// continues.
pub fn run(
    legacy: &LegacyStore,
    containers: &ContainerStore,
    default_project: &str,
    options: MigrationOptions,
) -> Result<MigrationReport> {
    let mut report = MigrationReport::default();

    let tasks = load_legacy_tasks(legacy, &mut report);
    if tasks.is_empty() {
        return Ok(report);
    }

    // BTreeMap keeps per-project stats in a deterministic order.
    let mut groups: BTreeMap<String, Vec<Task>> = BTreeMap::new();
    for task in tasks {
        let project = if task.parent_project.is_empty() {
            default_project.to_string()
        } else {
            task.parent_project.clone()
        };
        groups.entry(project).or_default().push(task);
    }

    for (project, tasks) in groups {
        match migrate_project(containers, &project, tasks, options.dry_run) {
            Ok(stats) => {
                report.tasks_migrated += stats.migrated_tasks;
                report.projects_migrated += 1;
                report.project_stats.push(stats);
            }
            Err(err) => {
                report
                    .errors
                    .push(format!("project {project}: {err}"));
            }
        }
    }

    if options.cleanup && !options.dry_run && report.errors.is_empty() && validate(legacy, containers) {
        cleanup_legacy(legacy, &mut report);
    }

    Ok(report)
}

/// Accumulate every legacy task. An unreadable collection is recorded and
/// skipped rather than failing the run.
fn load_legacy_tasks(legacy: &LegacyStore, report: &mut MigrationReport) -> Vec<Task> {
    let mut all = Vec::new();
    for collection in LegacyCollection::ALL {
        match legacy.load(collection) {
            Ok(record) => {
                report.tasks_found += record.tasks.len();
                all.extend(record.tasks.into_values());
            }
            Err(err) => {
                report
                    .errors
                    .push(format!("collection {collection}: {err}"));
            }
        }
    }
    all
}

/// Insert one project group's tasks into its container under the container
/// lock. Membership across all four buckets is checked by id, which is what
/// makes re-running the migration a no-op.
fn migrate_project(
    containers: &ContainerStore,
    project: &str,
    tasks: Vec<Task>,
    dry_run: bool,
) -> Result<ProjectMigrationStats> {
    let _lock = containers.lock(project)?;
    let mut container = containers.load(project)?;

    let initial = container.len();
    let mut migrated = 0;
    for task in tasks {
        if container.get(&task.id).is_some() {
            continue;
        }
        container.insert(task);
        migrated += 1;
    }
    let final_tasks = container.len();

    if migrated > 0 && !dry_run {
        containers.save(&mut container)?;
    }

    Ok(ProjectMigrationStats {
        project_name: project.to_string(),
        initial_tasks: initial,
        migrated_tasks: migrated,
        final_tasks,
    })
}

/// The container scheme must hold at least every task the legacy scheme
/// still does (counting by totals; the per-id check happened during insert).
pub fn validate(legacy: &LegacyStore, containers: &ContainerStore) -> bool {
    let legacy_total = legacy.total_tasks();
    if legacy_total == 0 {
        return true;
    }
    let container_total: usize = containers
        .list()
        .map(|cs| cs.iter().map(|c| c.len()).sum())
        .unwrap_or(0);
    container_total >= legacy_total
}

/// Remove legacy collection files that are empty. Files still holding tasks
/// are left alone.
fn cleanup_legacy(legacy: &LegacyStore, report: &mut MigrationReport) {
    for collection in LegacyCollection::ALL {
        match legacy.load(collection) {
            Ok(record) if record.tasks.is_empty() => {
                let path = legacy.collection_file(collection);
                if path.exists()
                    && let Err(err) = fs::remove_file(&path)
                {
                    report
                        .errors
                        .push(format!("cleanup {collection}: {err}"));
                }
            }
            Ok(_) => {}
            Err(TendError::Corrupt { .. }) => {}
            Err(err) => {
                report
                    .errors
                    .push(format!("cleanup {collection}: {err}"));
            }
        }
    }
}
