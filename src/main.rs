//! # taskcal
//!
//! A terminal calendar with per-day tasks. Every user gets their own task
//! data; a month grid, an upcoming digest and search sit on top.
//!
//! ## Features
//!
//! *   **Per-day tasks**: any number of tasks per calendar day, each with a priority,
//!     an optional time of day and an optional daily recurrence.
//! *   **Stable ordering**: open before done, then priority, then time, then creation.
//! *   **Upcoming digest**: open tasks in the next N days (7 by default).
//! *   **Recurring tasks**: cloned onto today once per session until completed or deleted.
//! *   **Backups**: export to `<user>_calendar.json` and restore from it.
//! *   **Dual Interface**: a scriptable CLI and an interactive TUI.
//!
//! ## Usage
//!
//! ```bash
//! taskcal register alice s3cret
//! export TASKCAL_USER=alice TASKCAL_PASSWORD=s3cret
//!
//! taskcal add "Pay rent" --date 2025-06-15 --priority high --time 09:00
//! taskcal add "Stretch" --recurring
//! taskcal day --date 2025-06-15
//! taskcal month --month 2025-06
//! taskcal upcoming --days 30
//! taskcal search rent
//! taskcal done 2025-06-15 <ID>
//! taskcal move 2025-06-15 <ID> 2025-06-16
//! taskcal export --out ~/backups
//! taskcal import ~/backups/alice_calendar.json
//!
//! # Interactive mode
//! taskcal
//! ```
//!
//! Task ids may be shortened to any unique prefix within their day.
//!
//! ## Data Storage
//!
//! Data lives in `~/.local/share/taskcal` (or the platform equivalent):
//! `users.json`, one `calendarData_<user>.json` per user, `config.json`
//! (optional) and `logs/`. Override the directory with `TASKCAL_DIR`, the
//! upcoming window with `TASKCAL_WINDOW`, and the log level with `RUST_LOG`.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{Datelike, Local, NaiveDate};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};

use taskcal::auth::UserDirectory;
use taskcal::commands::*;
use taskcal::config::Config;
use taskcal::logging::init_logging;
use taskcal::models::Priority;
use taskcal::session::Session;
use taskcal::storage::JsonDirStore;
use taskcal::tui::run_tui;

#[derive(Parser)]
#[command(name = "taskcal")]
#[command(about = "Terminal calendar with per-day tasks", long_about = None)]
struct Cli {
    /// Username to sign in as
    #[arg(short, long, global = true, env = "TASKCAL_USER")]
    user: Option<String>,
    /// Password for the user
    #[arg(short = 'P', long, global = true, env = "TASKCAL_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a user account
    Register {
        username: String,
        password: String,
    },
    /// Add a task to a day
    Add {
        /// Task text (quoted if it has spaces)
        text: String,
        /// Day in YYYY-MM-DD (default: today)
        #[arg(short, long, default_value = "today")]
        date: String,
        /// high, medium or low
        #[arg(short, long, default_value = "medium")]
        priority: Priority,
        /// Time of day in HH:MM
        #[arg(short, long)]
        time: Option<String>,
        /// Clone onto each new day until completed
        #[arg(short, long)]
        recurring: bool,
    },
    /// List one day's tasks
    Day {
        #[arg(short, long, default_value = "today")]
        date: String,
    },
    /// Show a month grid
    Month {
        /// Month in YYYY-MM (default: this month)
        #[arg(short, long)]
        month: Option<String>,
    },
    /// List open tasks in the coming days
    Upcoming {
        /// Window length in days (default from config)
        #[arg(short, long)]
        days: Option<u32>,
    },
    /// Search all tasks by text
    Search {
        query: String,
    },
    /// Mark a task as complete
    Done {
        date: String,
        id: String,
    },
    /// Mark a task as not complete
    Undone {
        date: String,
        id: String,
    },
    /// Edit a task
    Edit {
        date: String,
        id: String,
        /// New text
        #[arg(short = 'x', long)]
        text: Option<String>,
        /// New priority
        #[arg(short, long)]
        priority: Option<Priority>,
        /// New time of day in HH:MM
        #[arg(short, long)]
        time: Option<String>,
        /// Remove the time of day
        #[arg(long, conflicts_with = "time")]
        clear_time: bool,
        /// Set or unset daily recurrence
        #[arg(short, long)]
        recurring: Option<bool>,
    },
    /// Remove a task
    Remove {
        date: String,
        id: String,
    },
    /// Move a task to another day
    Move {
        date: String,
        id: String,
        to: String,
    },
    /// Write a backup file
    Export {
        /// Directory to write <user>_calendar.json into
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
    /// Replace all tasks with a backup file
    Import {
        file: PathBuf,
    },
    /// Generate shell completions
    Completions {
        shell: Shell,
    },
    /// Open interactive TUI
    Ui,
}

fn date_arg(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    parse_date(s, today).map_err(|e| eprintln!("{}", e)).ok()
}

fn run(cli: Cli) -> bool {
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            return false;
        }
    };
    let _guard = init_logging(&config.log_dir());
    let today = Local::now().date_naive();

    let mut users = match UserDirectory::open(&config.data_dir) {
        Ok(u) => u,
        Err(e) => {
            eprintln!("Failed to open user directory: {}", e);
            return false;
        }
    };

    let command = match cli.command {
        Some(Commands::Register { username, password }) => {
            return cmd_register(&mut users, &username, &password, false);
        }
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "taskcal", &mut io::stdout());
            return true;
        }
        other => other,
    };

    let (Some(user), Some(password)) = (cli.user, cli.password) else {
        eprintln!("Sign in with --user and --password (or TASKCAL_USER and TASKCAL_PASSWORD).");
        return false;
    };
    let persistence = JsonDirStore::new(&config.data_dir);
    let mut session = match Session::login(&users, persistence, &user, &password, today) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e);
            return false;
        }
    };

    match command {
        Some(Commands::Add { text, date, priority, time, recurring }) => {
            let Some(date) = date_arg(&date, today) else { return false };
            cmd_add(&mut session, date, &text, priority, time, recurring, false).is_some()
        }
        Some(Commands::Day { date }) => {
            let Some(date) = date_arg(&date, today) else { return false };
            cmd_day(&session, date);
            true
        }
        Some(Commands::Month { month }) => {
            let (year, month) = match month.as_deref().map(parse_month).transpose() {
                Ok(m) => m.unwrap_or((today.year(), today.month0())),
                Err(e) => {
                    eprintln!("{}", e);
                    return false;
                }
            };
            cmd_month(&session, year, month, today);
            true
        }
        Some(Commands::Upcoming { days }) => {
            cmd_upcoming(&mut session, today, days.unwrap_or(config.upcoming_window));
            true
        }
        Some(Commands::Search { query }) => {
            cmd_search(&mut session, &query);
            true
        }
        Some(Commands::Done { date, id }) => {
            let Some(date) = date_arg(&date, today) else { return false };
            cmd_set_done(&mut session, date, &id, true, false)
        }
        Some(Commands::Undone { date, id }) => {
            let Some(date) = date_arg(&date, today) else { return false };
            cmd_set_done(&mut session, date, &id, false, false)
        }
        Some(Commands::Edit { date, id, text, priority, time, clear_time, recurring }) => {
            let Some(date) = date_arg(&date, today) else { return false };
            cmd_edit(&mut session, date, &id, text, priority, time, clear_time, recurring, false)
        }
        Some(Commands::Remove { date, id }) => {
            let Some(date) = date_arg(&date, today) else { return false };
            cmd_remove(&mut session, date, &id, false)
        }
        Some(Commands::Move { date, id, to }) => {
            let (Some(date), Some(to)) = (date_arg(&date, today), date_arg(&to, today)) else {
                return false;
            };
            cmd_move(&mut session, date, &id, to, false)
        }
        Some(Commands::Export { out }) => cmd_export(&session, &out, false).is_some(),
        Some(Commands::Import { file }) => cmd_import(&mut session, &file, false),
        Some(Commands::Ui) | None => match run_tui(session, config.upcoming_window) {
            Ok(()) => true,
            Err(e) => {
                eprintln!("Error running TUI: {}", e);
                false
            }
        },
        Some(Commands::Register { .. }) | Some(Commands::Completions { .. }) => true,
    }
}

fn main() -> ExitCode {
    if run(Cli::parse()) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
