use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::*;
use eyre::{Context, Result, eyre};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use tasklist::{Config, Filter, ImportFile, Notification, RenderModel, Severity, TaskStore, TodoApp, TodoError};
use tracing::{Level, info};

#[derive(Parser)]
#[command(name = "tasklist")]
#[command(about = "Tasklist CLI - Manage a local task list with filtering and JSON backups")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Optional config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the task database (overrides config)
    #[arg(short, long)]
    store_path: Option<PathBuf>,

    /// Log level: error, warn, info, debug, trace (overrides config)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task
    Add {
        /// Task text (1-100 characters after trimming)
        text: String,
    },

    /// Show tasks
    List {
        /// Which tasks to show: all, active, completed
        #[arg(short, long, default_value = "all")]
        filter: Filter,
    },

    /// Mark a task complete, or incomplete again
    Toggle {
        /// Task ID
        id: String,
    },

    /// Replace a task's text
    Edit {
        /// Task ID
        id: String,

        /// New task text
        text: String,
    },

    /// Delete a task
    Delete {
        /// Task ID
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Delete all completed tasks
    ClearCompleted {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show task counters
    Stats,

    /// Write a dated JSON backup of all tasks
    Export {
        /// Output directory (default: export.dir from config)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Replace all tasks with the contents of a JSON backup
    Import {
        /// Backup file to read
        file: PathBuf,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {:#}", "Error:".red(), e);
        process::exit(2);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_ref())?;
    if let Some(path) = &cli.store_path {
        config.storage.store_dir = path.clone();
    }

    let level = cli
        .log_level
        .clone()
        .or_else(|| config.log_level.clone())
        .unwrap_or_else(|| "warn".to_string());
    setup_logging(&level)?;

    let store = TaskStore::open(&config.storage.store_dir, config.storage.slot_key.clone())
        .context("Failed to open task store")?;
    let mut app = TodoApp::new(store, config.notifications.clone());
    info!(store = %config.storage.store_dir.display(), "Task list ready");

    let outcome = execute(&cli.command, &mut app, &config);
    print_notifications(&mut app);

    if !outcome? {
        process::exit(1);
    }
    Ok(())
}

fn setup_logging(level: &str) -> Result<()> {
    let level: Level = level
        .parse()
        .map_err(|e| eyre!("Invalid log level '{}': {}", level, e))?;

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();
    Ok(())
}

/// Run one command; `Ok(false)` means it was refused and already reported
fn execute(command: &Commands, app: &mut TodoApp, config: &Config) -> Result<bool> {
    match command {
        Commands::Add { text } => Ok(app.add(text).is_ok()),
        Commands::List { filter } => {
            app.set_filter(*filter);
            print_render(&app.render(Utc::now()));
            Ok(true)
        }
        Commands::Toggle { id } => Ok(report_not_found(app.toggle(id).map(|_| ()))),
        Commands::Edit { id, text } => {
            if app.begin_edit(id).is_none() {
                return Ok(report_not_found(Err(TodoError::NotFound(id.clone()))));
            }
            Ok(app.save_edit(text).is_ok())
        }
        Commands::Delete { id, yes } => {
            let mut confirm = |prompt: &str| *yes || ask(prompt);
            Ok(report_not_found(app.delete(id, &mut confirm).map(|_| ())))
        }
        Commands::ClearCompleted { yes } => {
            let mut confirm = |prompt: &str| *yes || ask(prompt);
            app.clear_completed(&mut confirm);
            Ok(true)
        }
        Commands::Stats => {
            print_stats(&app.render(Utc::now()));
            Ok(true)
        }
        Commands::Export { out } => {
            let dir = out.as_ref().unwrap_or(&config.export.dir);
            match app.export(Utc::now().date_naive(), dir) {
                Ok(path) => {
                    println!("{} {}", "Wrote".green(), path.display());
                    Ok(true)
                }
                Err(_) => Ok(false),
            }
        }
        Commands::Import { file } => {
            let import = ImportFile::read(file).context(format!("Failed to read {}", file.display()))?;
            Ok(app.import(&import).is_ok())
        }
    }
}

/// Unknown ids are silent no-ops inside the app; say so on the terminal
fn report_not_found(result: tasklist::Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(TodoError::NotFound(id)) => {
            eprintln!("{} no task with id {}", "Not found:".yellow(), id);
            false
        }
        Err(_) => false,
    }
}

fn ask(prompt: &str) -> bool {
    print!("{} [y/N] ", prompt);
    if io::stdout().flush().is_err() {
        return false;
    }

    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn print_notifications(app: &mut TodoApp) {
    for notification in app.notifier_mut().drain() {
        println!("{}", styled(&notification));
    }
}

fn styled(notification: &Notification) -> ColoredString {
    let message = notification.message.as_str();
    match notification.severity {
        Severity::Success => message.green(),
        Severity::Error => message.red().bold(),
        Severity::Warning => message.yellow(),
        Severity::Info => message.cyan(),
    }
}

fn print_render(model: &RenderModel) {
    if let Some(empty) = &model.empty_state {
        println!("{}", empty.title.bold());
        println!("{}", empty.message.dimmed());
    }

    for task in &model.tasks {
        let (mark, text) = if task.completed {
            ("[x]".green(), task.text.strikethrough())
        } else {
            ("[ ]".normal(), task.text.normal())
        };
        println!("{} {}  {}", mark, text, task.id.dimmed());

        let mut meta = task.created_label.clone();
        if let Some(completed) = &task.completed_label {
            meta.push_str(" · ");
            meta.push_str(completed);
        }
        println!("    {}", meta.dimmed());
    }

    print_stats(model);
}

fn print_stats(model: &RenderModel) {
    println!(
        "{} {}  {} {}  {} {}",
        "Total:".bold(),
        model.stats.total,
        "Active:".bold(),
        model.stats.active,
        "Completed:".bold(),
        model.stats.completed
    );
}
