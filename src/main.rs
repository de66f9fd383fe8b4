use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tend::error::{Result, TendError};
use tend::model::{Priority, Status};
use tend::output::Format;

#[derive(Parser)]
#[command(
    name = "tend",
    version,
    about = "File-backed task tracker for personal and AI-collaborative work"
)]
struct Cli {
    /// Output format
    #[arg(long, global = true, value_enum, default_value = "json")]
    format: Format,
    /// Storage root (default: $TEND_ROOT, then ~/.tend)
    #[arg(long, global = true)]
    root: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new storage root
    Init,
    /// Create a new task
    Add {
        /// What needs doing
        action: String,
        /// Time estimate (free text)
        #[arg(long)]
        time: Option<String>,
        /// Task priority
        #[arg(long, value_enum, default_value = "medium")]
        priority: Priority,
        /// Project the task belongs to (default: configured project)
        #[arg(long)]
        project: Option<String>,
        /// Initial status
        #[arg(long, value_enum, default_value = "todo")]
        status: Status,
        /// Assignee: human, ai, collaborative, or an agent name
        #[arg(long)]
        assignee: Option<String>,
        /// Tags to attach (comma-separated)
        #[arg(long = "tag", value_delimiter = ',')]
        tags: Vec<String>,
        /// Task ids or references this task depends on (comma-separated)
        #[arg(long, value_delimiter = ',')]
        depends_on: Vec<String>,
        /// Context notes
        #[arg(long)]
        notes: Option<String>,
        /// Progress percentage (0-100)
        #[arg(long)]
        progress: Option<u8>,
    },
    /// Display a single task
    Show {
        /// Task id
        id: String,
        /// Look only in this project's container
        #[arg(long)]
        project: Option<String>,
    },
    /// List and filter tasks
    List {
        /// Filter by project
        #[arg(long)]
        project: Option<String>,
        /// Filter by status
        #[arg(long, value_enum)]
        status: Option<Status>,
        /// Filter by priority
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        /// Filter by assignee
        #[arg(long)]
        assignee: Option<String>,
        /// Filter by tag (repeatable; any match)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Substring match against action and notes
        #[arg(long)]
        search: Option<String>,
    },
    /// Edit task fields
    Edit {
        /// Task id
        id: String,
        /// New action text
        #[arg(long)]
        action: Option<String>,
        /// New time estimate
        #[arg(long)]
        time: Option<String>,
        /// New priority
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        /// New project
        #[arg(long)]
        project: Option<String>,
        /// New status (note: does not move the task between buckets)
        #[arg(long, value_enum)]
        status: Option<Status>,
        /// New assignee
        #[arg(long)]
        assignee: Option<String>,
        /// Replace tags (comma-separated)
        #[arg(long = "tag", value_delimiter = ',')]
        tags: Option<Vec<String>>,
        /// Replace dependencies (comma-separated)
        #[arg(long, value_delimiter = ',')]
        depends_on: Option<Vec<String>>,
        /// New context notes
        #[arg(long)]
        notes: Option<String>,
        /// New progress percentage (0-100)
        #[arg(long)]
        progress: Option<u8>,
    },
    /// Set a task to in_progress
    Start {
        /// Task id
        id: String,
        /// Who is working on it
        #[arg(long)]
        assignee: Option<String>,
    },
    /// Complete a task (status done, progress 100)
    Done {
        /// Task id
        id: String,
    },
    /// Cancel a task (archives it)
    Cancel {
        /// Task id
        id: String,
    },
    /// Soft-delete a task into its container's deleted bucket
    Delete {
        /// Task id
        id: String,
    },
    /// Manage projects
    #[command(subcommand)]
    Project(ProjectCommands),
    /// Migrate the legacy flat store into per-project containers
    Migrate {
        /// Report without writing
        #[arg(long)]
        dry_run: bool,
        /// Remove empty legacy collection files after a clean run
        #[arg(long)]
        cleanup: bool,
    },
    /// Repair status/bucket drift
    Fix,
    /// Manage whole-tree backups
    #[command(subcommand)]
    Backup(BackupCommands),
}

#[derive(Subcommand)]
enum ProjectCommands {
    /// Create a project
    Add {
        /// Project name
        name: String,
        /// Project description
        #[arg(long, short)]
        description: Option<String>,
    },
    /// List all projects
    List,
    /// Per-bucket task counts for a project
    Stats {
        /// Project name
        name: String,
    },
    /// Archive a project
    Archive {
        /// Project name
        name: String,
    },
    /// Mark a project completed
    Complete {
        /// Project name
        name: String,
    },
    /// Delete a project record (its task container is kept)
    Delete {
        /// Project name
        name: String,
    },
}

#[derive(Subcommand)]
enum BackupCommands {
    /// Snapshot the storage tree
    Create,
    /// List available snapshots
    List,
    /// Restore a named snapshot (takes a safety backup first)
    Restore {
        /// Snapshot name, as printed by `backup list`
        name: String,
    },
}

fn resolve_root(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(root) = flag {
        return Ok(root);
    }
    if let Ok(env_root) = std::env::var("TEND_ROOT")
        && !env_root.is_empty()
    {
        return Ok(PathBuf::from(env_root));
    }
    dirs::home_dir()
        .map(|home| home.join(".tend"))
        .ok_or_else(|| TendError::InvalidArgument("could not determine home directory; pass --root".into()))
}

fn run(cli: Cli) -> Result<()> {
    let root = resolve_root(cli.root)?;
    let format = cli.format;

    match cli.command {
        Commands::Init => tend::commands::init::run(&root, format),
        Commands::Add {
            action,
            time,
            priority,
            project,
            status,
            assignee,
            tags,
            depends_on,
            notes,
            progress,
        } => tend::commands::add::run(
            &root, action, time, priority, project, status, assignee, tags, depends_on,
            notes, progress, format,
        ),
        Commands::Show { id, project } => tend::commands::show::run(&root, &id, project, format),
        Commands::List {
            project,
            status,
            priority,
            assignee,
            tags,
            search,
        } => tend::commands::list::run(
            &root, project, status, priority, assignee, tags, search, format,
        ),
        Commands::Edit {
            id,
            action,
            time,
            priority,
            project,
            status,
            assignee,
            tags,
            depends_on,
            notes,
            progress,
        } => tend::commands::edit::run(
            &root, &id, action, time, priority, project, status, assignee, tags,
            depends_on, notes, progress, format,
        ),
        Commands::Start { id, assignee } => {
            tend::commands::lifecycle::start(&root, &id, assignee, format)
        }
        Commands::Done { id } => tend::commands::lifecycle::done(&root, &id, format),
        Commands::Cancel { id } => tend::commands::lifecycle::cancel(&root, &id, format),
        Commands::Delete { id } => tend::commands::lifecycle::delete(&root, &id, format),
        Commands::Project(command) => match command {
            ProjectCommands::Add { name, description } => {
                tend::commands::project::add(&root, name, description, format)
            }
            ProjectCommands::List => tend::commands::project::list(&root, format),
            ProjectCommands::Stats { name } => {
                tend::commands::project::stats(&root, &name, format)
            }
            ProjectCommands::Archive { name } => {
                tend::commands::project::archive(&root, &name, format)
            }
            ProjectCommands::Complete { name } => {
                tend::commands::project::complete(&root, &name, format)
            }
            ProjectCommands::Delete { name } => {
                tend::commands::project::delete(&root, &name, format)
            }
        },
        Commands::Migrate { dry_run, cleanup } => {
            tend::commands::migrate::run(&root, dry_run, cleanup, format)
        }
        Commands::Fix => tend::commands::fix::run(&root, format),
        Commands::Backup(command) => match command {
            BackupCommands::Create => tend::commands::backup::create(&root, format),
            BackupCommands::List => tend::commands::backup::list(&root, format),
            BackupCommands::Restore { name } => {
                tend::commands::backup::restore(&root, &name, format)
            }
        },
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error[{}]: {err}", err.code());
        std::process::exit(1);
    }
}
