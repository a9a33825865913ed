//! tasktimer: drive inline task timers in a markdown file.
//!
//! # Responsibility
//! - Load one file into an in-memory host, run a timer action, write back.
//! - Keep a file's running timers ticking with `watch`.
//!
//! Each invocation is its own process session. One-shot commands act on the
//! addressed line directly; `watch` applies the configured auto-stop policy
//! to running markers it finds.

use clap::{Parser, Subcommand};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tasktimer_core::{
    format_duration, init_logging, parse_all, DocumentId, EditMode, ManualScheduler, MemoryHost,
    SystemClock, TimerOutcome, TimerService, TimerSettings,
};

const WATCH_INTERVAL: Duration = Duration::from_secs(1);

type FileService = TimerService<MemoryHost, ManualScheduler, SystemClock>;

#[derive(Parser)]
#[command(name = "tasktimer")]
#[command(about = "Inline time tracking for markdown task lists")]
#[command(version)]
struct Cli {
    /// JSON settings file
    #[arg(long, value_name = "FILE", global = true)]
    settings: Option<PathBuf>,

    /// Absolute directory for rolling log files
    #[arg(long, value_name = "DIR", global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start, pause or continue the timer on a line
    Toggle {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// 1-based line number
        #[arg(value_name = "LINE")]
        line: usize,
    },

    /// Remove the timer marker from a line
    Delete {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// 1-based line number
        #[arg(value_name = "LINE")]
        line: usize,
    },

    /// Print every timer marker in a file
    List {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Rewrite legacy markers into the compact form
    Upgrade {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Keep running timers ticking, saving the file every second
    Watch {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Stop after this many ticks (0 runs until no timer is live)
        #[arg(long, default_value_t = 0)]
        ticks: u64,
    },
}

#[derive(Debug)]
enum CliError {
    Io { path: PathBuf, source: std::io::Error },
    Settings(String),
    Logging(String),
    Timer(String),
    InvalidLine(usize),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Settings(message) => write!(f, "settings: {message}"),
            Self::Logging(message) => write!(f, "logging: {message}"),
            Self::Timer(message) => write!(f, "{message}"),
            Self::InvalidLine(line) => write!(f, "line numbers start at 1, got {line}"),
        }
    }
}

impl Error for CliError {}

impl From<tasktimer_core::TimerServiceError> for CliError {
    fn from(value: tasktimer_core::TimerServiceError) -> Self {
        Self::Timer(value.to_string())
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("tasktimer: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    if let Some(log_dir) = &cli.log_dir {
        init_logging(tasktimer_core::default_log_level(), log_dir)
            .map_err(|err| CliError::Logging(err.to_string()))?;
    }
    let settings = load_settings(cli.settings.as_deref())?;

    match cli.command {
        Commands::Toggle { file, line } => {
            let line = zero_based(line)?;
            let (mut service, document) = open_file(&file, settings)?;
            let outcome = service.toggle(&document, line)?;
            save(&file, &service, &document)?;
            let (verb, record) = match &outcome {
                TimerOutcome::Created(record) => ("started", record),
                TimerOutcome::Continued(record) => ("continued", record),
                TimerOutcome::Paused(record) => ("paused", record),
            };
            println!("{verb} {} {}", record.id, format_duration(record.accumulated));
        }
        Commands::Delete { file, line } => {
            let line = zero_based(line)?;
            let (mut service, document) = open_file(&file, settings)?;
            let id = service.delete(&document, line)?;
            save(&file, &service, &document)?;
            println!("deleted {id}");
        }
        Commands::List { file } => {
            let text = read(&file)?;
            for (index, line) in text.split('\n').enumerate() {
                for span in parse_all(line) {
                    println!(
                        "{}\t{}\t{}\t{}",
                        index + 1,
                        span.record.id,
                        span.record.status.as_str(),
                        format_duration(span.record.accumulated)
                    );
                }
            }
        }
        Commands::Upgrade { file } => {
            let (mut service, document) = open_file(&file, settings)?;
            let upgraded = service.upgrade_document(&document)?;
            if upgraded > 0 {
                save(&file, &service, &document)?;
            }
            println!("upgraded {upgraded}");
        }
        Commands::Watch { file, ticks } => watch(&file, settings, ticks)?,
    }
    Ok(())
}

fn watch(file: &Path, settings: TimerSettings, ticks: u64) -> Result<(), CliError> {
    let (mut service, document) = open_file(file, settings)?;
    let report = service.on_document_opened(&document)?;
    save(file, &service, &document)?;
    println!(
        "restored {} force-paused {} upgraded {}",
        report.restored.len(),
        report.force_paused.len(),
        report.upgraded
    );

    let mut fired = 0;
    while !service.registry().is_empty() && (ticks == 0 || fired < ticks) {
        std::thread::sleep(WATCH_INTERVAL);
        for task in service.scheduler().active_tasks() {
            service.run_task(&task);
        }
        save(file, &service, &document)?;
        fired += 1;
    }

    service.shutdown();
    info!(
        "event=watch_stop module=cli status=ok ticks={} file={}",
        fired,
        file.display()
    );
    Ok(())
}

fn zero_based(line: usize) -> Result<usize, CliError> {
    line.checked_sub(1).ok_or(CliError::InvalidLine(line))
}

fn load_settings(path: Option<&Path>) -> Result<TimerSettings, CliError> {
    match path {
        Some(path) => TimerSettings::from_json_str(&read(path)?)
            .map_err(|err| CliError::Settings(err.to_string())),
        None => Ok(TimerSettings::default()),
    }
}

fn read(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn open_file(path: &Path, settings: TimerSettings) -> Result<(FileService, DocumentId), CliError> {
    let text = read(path)?;
    let document = DocumentId::new(path.display().to_string());
    let mut host = MemoryHost::new();
    host.open_with_text(document.clone(), &text, EditMode::Editable);
    let service = TimerService::new(host, ManualScheduler::new(), SystemClock, settings);
    Ok((service, document))
}

fn save(path: &Path, service: &FileService, document: &DocumentId) -> Result<(), CliError> {
    let Some(text) = service.host().text(document) else {
        return Ok(());
    };
    std::fs::write(path, text).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}
