//! Command-line front end for the task tracker.
//!
//! Usage:
//!
//! ```text
//! taskhub [--storage json|sqlite|memory] [--store-path PATH] <command>
//! ```
//!
//! Commands extract tasks from story documents, create and query tasks, move
//! tasks between statuses, archive old completed work and print aggregate
//! statistics. Backends fall back to the `TASKHUB_STORAGE`,
//! `TASKHUB_STORE_PATH` and `TASKHUB_OBSERVABILITY` environment variables.

use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use eyre::{Result, WrapErr, bail};
use mockable::DefaultClock;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use taskhub::{
    config::{ObservabilityBackend, StorageBackend, TrackerConfig},
    events::EventBus,
    task::{
        domain::{AgentRole, Priority, StoryId, Task, TaskId, TaskStatus},
        ports::TaskRepository,
        services::{CreateTaskRequest, TaskQuery, TaskService},
    },
    telemetry,
};
use tracing::debug;

type Service = TaskService<dyn TaskRepository, DefaultClock>;

const RULE_WIDTH: usize = 40;
const DESCRIPTION_PREVIEW: usize = 100;
const SECONDS_PER_HOUR: f64 = 3600.0;

#[derive(Debug, Parser)]
#[command(name = "taskhub")]
#[command(about = "Track tasks extracted from story documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Storage backend: memory, json or sqlite
    #[arg(long, env = "TASKHUB_STORAGE", default_value = "json", global = true)]
    storage: String,

    /// Location of the task store
    #[arg(long, env = "TASKHUB_STORE_PATH", global = true)]
    store_path: Option<PathBuf>,

    /// Observability backend: disabled, console, verbose, otel or prometheus
    #[arg(
        long,
        env = "TASKHUB_OBSERVABILITY",
        default_value = "console",
        global = true
    )]
    observability: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Extract tasks from a story file
    Extract {
        /// Markdown story document
        story_file: PathBuf,

        /// Show assignee, priority and description of each task
        #[arg(short, long)]
        verbose: bool,
    },

    /// Create a single task
    Create {
        /// Task title
        title: String,

        /// Task description
        #[arg(short, long)]
        description: Option<String>,

        /// Priority: critical, high, medium or low
        #[arg(short, long)]
        priority: Option<Priority>,

        /// Assigned agent role
        #[arg(short, long)]
        assignee: Option<AgentRole>,

        /// Comma-separated labels
        #[arg(short, long, value_delimiter = ',')]
        labels: Vec<String>,
    },

    /// Query tasks with filters
    Query {
        /// Filter by status
        #[arg(short, long)]
        status: Option<TaskStatus>,

        /// Filter by assignee
        #[arg(short, long)]
        assignee: Option<AgentRole>,

        /// Filter by priority
        #[arg(short, long)]
        priority: Option<Priority>,

        /// Filter by story identifier
        #[arg(long)]
        story: Option<StoryId>,

        /// Match tasks carrying any of these comma-separated labels
        #[arg(short, long, value_delimiter = ',')]
        labels: Vec<String>,

        /// Maximum number of tasks to list
        #[arg(long)]
        limit: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Simple)]
        format: OutputFormat,
    },

    /// Move a task to a new status
    Update {
        /// Task identifier
        task_id: TaskId,

        /// Target status
        new_status: TaskStatus,

        /// Who is making the update
        #[arg(short = 'u', long, default_value = "cli")]
        actor: String,
    },

    /// Archive completed tasks
    Archive {
        /// Archive tasks completed more than this many days ago
        #[arg(short, long, default_value_t = 30)]
        days: i64,

        /// Show what would be archived without doing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Show task statistics
    Stats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Simple,
    Detailed,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_logging(cli.log_json).wrap_err("failed to initialise logging")?;

    let config = TrackerConfig {
        storage: StorageBackend::from_name(&cli.storage, cli.store_path)?,
        observability: ObservabilityBackend::from_name(&cli.observability)?,
    };
    debug!(?config, "resolved configuration");
    let repository = config
        .open_repository()
        .await
        .wrap_err("failed to open task store")?;
    let mut service: Service =
        TaskService::new(repository, Arc::new(EventBus::new()), Arc::new(DefaultClock));
    if let Some(observability) = config.build_observability() {
        service = service.with_observability(observability);
    }

    let mut out = io::stdout().lock();
    run(cli.command, &service, &mut out).await?;
    out.flush()?;

    if let Some(observability) = service.observability() {
        observability.flush()?;
    }
    Ok(())
}

async fn run(command: Command, service: &Service, out: &mut impl Write) -> Result<()> {
    match command {
        Command::Extract {
            story_file,
            verbose,
        } => extract(service, out, &story_file, verbose).await,
        Command::Create {
            title,
            description,
            priority,
            assignee,
            labels,
        } => {
            let mut request = CreateTaskRequest::new(title)
                .with_priority(priority.unwrap_or_default())
                .with_labels(labels);
            if let Some(text) = description {
                request = request.with_description(text);
            }
            if let Some(role) = assignee {
                request = request.with_assignee(role);
            }
            let task = service.create_task(request).await?;
            writeln!(out, "✓ Created task {}: {}", task.id(), task.title())?;
            Ok(())
        }
        Command::Query {
            status,
            assignee,
            priority,
            story,
            labels,
            limit,
            format,
        } => {
            let mut query = TaskQuery::new().with_labels(labels);
            if let Some(wanted) = status {
                query = query.with_status(wanted);
            }
            if let Some(role) = assignee {
                query = query.with_assignee(role);
            }
            if let Some(level) = priority {
                query = query.with_priority(level);
            }
            if let Some(story_id) = story {
                query = query.with_story_id(story_id);
            }
            if let Some(max) = limit {
                query = query.with_limit(max);
            }
            let tasks = service.query_tasks(&query).await?;
            write_tasks(out, &tasks, format)
        }
        Command::Update {
            task_id,
            new_status,
            actor,
        } => update(service, out, task_id, new_status, &actor).await,
        Command::Archive { days, dry_run } => archive(service, out, days, dry_run).await,
        Command::Stats => stats(service, out).await,
    }
}

async fn extract(
    service: &Service,
    out: &mut impl Write,
    story_file: &Path,
    verbose: bool,
) -> Result<()> {
    let tasks = service.extract_tasks_from_story(story_file).await?;
    for task in &tasks {
        let (number, title) = split_numbered_title(task.title());
        writeln!(out, "Task {number}: {title}")?;
        if verbose {
            if let Some(assignee) = task.assignee() {
                writeln!(out, "  Assignee: {assignee}")?;
            }
            if task.priority() != Priority::Medium {
                writeln!(out, "  Priority: {}", task.priority())?;
            }
            if !task.description().is_empty() {
                let preview: String = task
                    .description()
                    .chars()
                    .take(DESCRIPTION_PREVIEW)
                    .collect();
                writeln!(out, "  Description: {preview}...")?;
            }
            writeln!(out)?;
        }
    }
    writeln!(
        out,
        "\nExtracted {} tasks from {}",
        tasks.len(),
        story_file.display()
    )?;
    Ok(())
}

fn split_numbered_title(title: &str) -> (&str, &str) {
    title
        .strip_prefix('[')
        .and_then(|rest| rest.split_once(']'))
        .map_or(("", title), |(number, rest)| (number, rest.trim()))
}

const fn status_symbol(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "○",
        TaskStatus::InProgress => "◐",
        TaskStatus::Completed => "●",
        TaskStatus::Blocked => "□",
        TaskStatus::Failed => "✗",
        TaskStatus::Archived => "▪",
    }
}

fn write_tasks(out: &mut impl Write, tasks: &[Task], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, tasks)?;
            writeln!(out)?;
            return Ok(());
        }
        OutputFormat::Detailed => {
            for task in tasks {
                writeln!(out, "ID: {}", task.id())?;
                writeln!(out, "Title: {}", task.title())?;
                writeln!(out, "Status: {}", task.status())?;
                writeln!(out, "Priority: {}", task.priority())?;
                if let Some(assignee) = task.assignee() {
                    writeln!(out, "Assignee: {assignee}")?;
                }
                if !task.description().is_empty() {
                    writeln!(out, "Description: {}", task.description())?;
                }
                writeln!(out, "Created: {}", task.created_at().format("%Y-%m-%d %H:%M"))?;
                writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;
            }
        }
        OutputFormat::Simple => {
            for task in tasks {
                let assignee = task
                    .assignee()
                    .map_or_else(String::new, |role| format!(" @{role}"));
                writeln!(
                    out,
                    "{} {}{assignee}",
                    status_symbol(task.status()),
                    task.title()
                )?;
            }
        }
    }
    writeln!(out, "\nTotal: {} tasks", tasks.len())?;
    Ok(())
}

async fn update(
    service: &Service,
    out: &mut impl Write,
    task_id: TaskId,
    new_status: TaskStatus,
    actor: &str,
) -> Result<()> {
    let Some(task) = service.transition_status(task_id, new_status, actor).await? else {
        let Some(existing) = service.get_task(task_id).await? else {
            bail!("task {task_id} does not exist");
        };
        bail!(
            "cannot move task {task_id} from {} to {new_status}",
            existing.status()
        );
    };

    writeln!(out, "✓ Task {task_id} updated to {new_status}")?;
    if task.status() == TaskStatus::Completed
        && let Some(seconds) = task.metrics().total_duration.filter(|s| *s > 0.0)
    {
        writeln!(out, "  Completed in {:.1} hours", hours(seconds))?;
    }
    Ok(())
}

#[expect(clippy::float_arithmetic, reason = "durations are reported in fractional hours")]
const fn hours(seconds: f64) -> f64 {
    seconds / SECONDS_PER_HOUR
}

#[expect(clippy::float_arithmetic, reason = "rates are reported as percentages")]
const fn percent(rate: f64) -> f64 {
    rate * 100.0
}

fn archive_cutoff(now: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>> {
    let Some(cutoff) = Duration::try_days(days).and_then(|age| now.checked_sub_signed(age)) else {
        bail!("--days {days} is outside the supported date range");
    };
    Ok(cutoff)
}

async fn archive(service: &Service, out: &mut impl Write, days: i64, dry_run: bool) -> Result<()> {
    let cutoff = archive_cutoff(Utc::now(), days)?;
    if dry_run {
        let candidates = service.completed_before(cutoff).await?;
        writeln!(out, "Would archive {} tasks:", candidates.len())?;
        for task in &candidates {
            let completed = task
                .completed_at()
                .map(|at| at.format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            writeln!(out, "  - {} (completed {completed})", task.title())?;
        }
        return Ok(());
    }

    let archived = service.archive_completed_before(cutoff, "archive-cli").await?;
    writeln!(out, "✓ Archived {} tasks", archived.len())?;
    Ok(())
}

async fn stats(service: &Service, out: &mut impl Write) -> Result<()> {
    let summary = service.get_metrics_summary().await?;

    writeln!(out, "Task Statistics")?;
    writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;
    writeln!(out, "Total Tasks: {}", summary.total_tasks)?;
    writeln!(out)?;

    writeln!(out, "By Status:")?;
    for (status, count) in &summary.by_status {
        writeln!(out, "  {status}: {count}")?;
    }
    writeln!(out)?;

    writeln!(out, "By Priority:")?;
    for (priority, count) in &summary.by_priority {
        writeln!(out, "  {priority}: {count}")?;
    }
    writeln!(out)?;

    writeln!(out, "By Assignee:")?;
    if summary.by_assignee.is_empty() {
        writeln!(out, "  (none assigned)")?;
    }
    for (assignee, count) in &summary.by_assignee {
        writeln!(out, "  {assignee}: {count}")?;
    }
    writeln!(out)?;

    if let Some(seconds) = summary.average_duration {
        writeln!(
            out,
            "Average Task Duration: {:.1} hours",
            hours(seconds)
        )?;
    }
    if summary.completion_rate > 0.0 {
        writeln!(
            out,
            "Completion Rate: {:.1}%",
            percent(summary.completion_rate)
        )?;
    }
    Ok(())
}
