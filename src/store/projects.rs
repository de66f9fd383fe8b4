use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, TendError};
use crate::model::Project;
use crate::store::codec;

/// Project records under `projects/<name>.json`.
#[derive(Debug)]
pub struct ProjectStore {
    root: PathBuf,
}

impl ProjectStore {
    pub fn open(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    fn projects_dir(&self) -> PathBuf {
        self.root.join("projects")
    }

    fn project_path(&self, name: &str) -> PathBuf {
        self.projects_dir().join(format!("{name}.json"))
    }

    /// Project names become filenames, so they are validated once here at
    /// the boundary.
    pub fn validate_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(TendError::InvalidArgument(
                "project name cannot be empty".into(),
            ));
        }
        if name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(TendError::InvalidArgument(format!(
                "project name {name:?} must not contain path separators"
            )));
        }
        Ok(())
    }

    pub fn save(&self, project: &Project) -> Result<()> {
        Self::validate_name(&project.name)?;
        codec::write_record(&self.project_path(&project.name), project)
    }

    pub fn load(&self, name: &str) -> Result<Project> {
        codec::read_record(&self.project_path(name))?
            .ok_or_else(|| TendError::ProjectNotFound(name.to_string()))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.project_path(name).exists()
    }

    /// All project records sorted by name. Corrupt records are skipped;
    /// listing is best-effort.
    pub fn list(&self) -> Result<Vec<Project>> {
        let dir = self.projects_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut projects = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match codec::read_record::<Project>(&path) {
                Ok(Some(project)) => projects.push(project),
                Ok(None) => {}
                Err(TendError::Corrupt { .. }) => continue,
                Err(err) => return Err(err),
            }
        }
        projects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(projects)
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.project_path(name);
        if !path.exists() {
            return Err(TendError::ProjectNotFound(name.to_string()));
        }
        fs::remove_file(path)?;
        Ok(())
    }
}
