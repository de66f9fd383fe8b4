use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};

use crate::error::Result;
use crate::model::{Bucket, ProjectContainer};

/// Derived id -> (project, bucket) index over the container files, stored in
/// `index.db`. Strictly an optimization: every hit is re-verified against the
/// container and every miss falls back to the linear scan, so a stale index
/// costs time, never correctness.
#[derive(Debug)]
pub struct LocationIndex {
    conn: Connection,
}

impl LocationIndex {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS task_locations (
                task_id TEXT PRIMARY KEY,
                project TEXT NOT NULL,
                bucket TEXT NOT NULL
            );",
        )?;
        Ok(Self { conn })
    }

    pub fn get_fingerprint(&self) -> Result<Option<String>> {
        let fp = self
            .conn
            .query_row(
                "SELECT value FROM meta WHERE key = 'containers_fingerprint'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(fp)
    }

    pub fn set_fingerprint(&self, fingerprint: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO meta (key, value) VALUES ('containers_fingerprint', ?1)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![fingerprint],
        )?;
        Ok(())
    }

    /// Replace the whole index from the given containers.
    pub fn rebuild(&self, containers: &[ProjectContainer]) -> Result<()> {
        self.conn.execute("DELETE FROM task_locations", [])?;
        for container in containers {
            self.insert_container(container)?;
        }
        Ok(())
    }

    /// Refresh one project's rows after a container write.
    pub fn upsert_container(&self, container: &ProjectContainer) -> Result<()> {
        self.conn.execute(
            "DELETE FROM task_locations WHERE project = ?1",
            params![container.project_name],
        )?;
        self.insert_container(container)
    }

    fn insert_container(&self, container: &ProjectContainer) -> Result<()> {
        let mut stmt = self.conn.prepare(
            "INSERT OR REPLACE INTO task_locations (task_id, project, bucket)
             VALUES (?1, ?2, ?3)",
        )?;
        for bucket in [
            Bucket::Active,
            Bucket::Completed,
            Bucket::Archived,
            Bucket::Deleted,
        ] {
            for id in container.bucket(bucket).keys() {
                stmt.execute(params![id, container.project_name, bucket.as_str()])?;
            }
        }
        Ok(())
    }

    pub fn lookup(&self, task_id: &str) -> Result<Option<(String, Bucket)>> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT project, bucket FROM task_locations WHERE task_id = ?1",
                params![task_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(row.and_then(|(project, bucket)| Bucket::parse(&bucket).map(|b| (project, b))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Priority, Status, Task};
    use tempfile::tempdir;

    fn container_with_task(project: &str, status: Status) -> (ProjectContainer, String) {
        let mut container = ProjectContainer::new(project);
        let task = Task::new(
            "A".into(),
            String::new(),
            Priority::Medium,
            project.into(),
            status,
        );
        let id = task.id.clone();
        container.insert(task);
        (container, id)
    }

    #[test]
    fn rebuild_and_lookup() {
        let dir = tempdir().unwrap();
        let index = LocationIndex::open(&dir.path().join("index.db")).unwrap();
        let (container, id) = container_with_task("general", Status::Todo);

        index.rebuild(&[container]).unwrap();
        let (project, bucket) = index.lookup(&id).unwrap().unwrap();
        assert_eq!(project, "general");
        assert_eq!(bucket, Bucket::Active);
        assert!(index.lookup("task_none").unwrap().is_none());
    }

    #[test]
    fn upsert_replaces_project_rows() {
        let dir = tempdir().unwrap();
        let index = LocationIndex::open(&dir.path().join("index.db")).unwrap();
        let (mut container, id) = container_with_task("general", Status::Todo);
        index.rebuild(&[container.clone()]).unwrap();

        let mut task = container.remove(&id).unwrap();
        task.status = Status::Done;
        container.insert(task);
        index.upsert_container(&container).unwrap();

        let (_, bucket) = index.lookup(&id).unwrap().unwrap();
        assert_eq!(bucket, Bucket::Completed);
    }

    #[test]
    fn fingerprint_round_trip() {
        let dir = tempdir().unwrap();
        let index = LocationIndex::open(&dir.path().join("index.db")).unwrap();
        assert_eq!(index.get_fingerprint().unwrap(), None);
        index.set_fingerprint("abc").unwrap();
        assert_eq!(index.get_fingerprint().unwrap().as_deref(), Some("abc"));
        index.set_fingerprint("def").unwrap();
        assert_eq!(index.get_fingerprint().unwrap().as_deref(), Some("def"));
    }
}
