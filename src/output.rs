use clap::ValueEnum;

use crate::error::Result;
use crate::model::{MigrationReport, Project, ProjectStats, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Pretty,
    Minimal,
}

pub fn print_task(task: &Task, format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(&task)?),
        Format::Pretty => {
            println!("[{}] {} ({})", task.id, task.action, task.status);
            println!(
                "  project: {} | priority: {} | status: {}",
                task.parent_project, task.priority, task.status
            );
            if !task.time.is_empty() {
                println!("  time: {}", task.time);
            }
            if let Some(ref assignee) = task.assignee {
                println!("  assignee: {assignee}");
            }
            if let Some(progress) = task.progress {
                println!("  progress: {progress}%");
            }
            if !task.tags.is_empty() {
                println!("  tags: {}", task.tags.join(", "));
            }
            if !task.dependencies.is_empty() {
                println!("  depends on: {}", task.dependencies.join(", "));
            }
            if let Some(ref notes) = task.context_notes {
                println!("  {notes}");
            }
        }
        Format::Minimal => {
            println!("{}", minimal_row(task));
        }
    }
    Ok(())
}

pub fn print_tasks(tasks: &[Task], format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(tasks)?),
        Format::Pretty => {
            for task in tasks {
                print_task(task, Format::Pretty)?;
                println!();
            }
        }
        Format::Minimal => {
            println!(
                "{:13} {:24} {:11} {:8} PROJECT",
                "ID", "ACTION", "STATUS", "PRIORITY"
            );
            println!("{}", "-".repeat(70));
            for task in tasks {
                println!("{}", minimal_row(task));
            }
        }
    }
    Ok(())
}

fn minimal_row(task: &Task) -> String {
    format!(
        "{:13} {:24} {:11} {:8} {}",
        task.id,
        truncate(&task.action, 24),
        task.status.to_string(),
        task.priority.to_string(),
        task.parent_project
    )
}

pub fn print_projects(projects: &[Project], format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(projects)?),
        _ => {
            for project in projects {
                let description = project.description.as_deref().unwrap_or("-");
                println!("{:20} {:10} {}", project.name, project.status.to_string(), description);
            }
        }
    }
    Ok(())
}

pub fn print_stats(stats: &ProjectStats, format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(stats)?),
        _ => {
            println!("{}", stats.project_name);
            println!("  active:    {}", stats.active_tasks);
            println!("  completed: {}", stats.completed_tasks);
            println!("  archived:  {}", stats.archived_tasks);
            println!("  deleted:   {}", stats.deleted_tasks);
            println!("  total:     {}", stats.total_tasks);
        }
    }
    Ok(())
}

pub fn print_migration_report(report: &MigrationReport, format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(report)?),
        _ => {
            println!(
                "found {} tasks, migrated {} across {} projects",
                report.tasks_found, report.tasks_migrated, report.projects_migrated
            );
            for stat in &report.project_stats {
                println!(
                    "  {}: {} -> {} tasks ({} migrated)",
                    stat.project_name, stat.initial_tasks, stat.final_tasks, stat.migrated_tasks
                );
            }
            if !report.errors.is_empty() {
                println!("errors:");
                for error in &report.errors {
                    println!("  {error}");
                }
            }
        }
    }
    Ok(())
}

pub fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        let truncated: String = text.chars().take(max_len - 3).collect();
        format!("{truncated}...")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_preserves_short_text() {
        assert_eq!(truncate("short", 12), "short");
    }

    #[test]
    fn truncate_appends_ellipsis() {
        assert_eq!(truncate("a very long action title", 12), "a very lo...");
    }
}
