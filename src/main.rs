mod ui;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use kanban::audit::read_log;
use kanban::config::Config;
use kanban::credentials::CredentialStore;
use kanban::{KanbanBoard, ProjectStore, Session};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    fs::OpenOptions,
    io::{self, Stdout, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "kanban", version, about = "Kanban boards with WIP limits and an audit log")]
struct Cli {
    /// Directory holding boards and logs (overrides KANBAN_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Open a board in the terminal UI
    Open {
        project: String,
        /// Open as this admin (password is read from stdin)
        #[arg(long)]
        admin: Option<String>,
    },
    /// List stored boards
    List,
    /// Delete a board file, keeping its log
    Delete { project: String },
    /// Copy a board file elsewhere
    Export { project: String, destination: PathBuf },
    /// Copy a board's audit log elsewhere
    ExportLog { project: String, destination: PathBuf },
    /// Print a board's audit log
    Log { project: String },
    /// Register an admin account (password is read from stdin)
    RegisterAdmin { username: String },
}

fn init_tracing(filter: &str, log_file: Option<&Path>) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    if let Some(path) = log_file {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening log file {}", path.display()))?;
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    // The terminal UI owns the screen, so its diagnostics go to a file.
    let log_file = matches!(cli.command, Command::Open { .. })
        .then(|| config.data_dir.join("kanban.log"));
    init_tracing(&config.log_filter, log_file.as_deref())?;

    let store = ProjectStore::new(&config.data_dir);
    let credentials = CredentialStore::new(&config.admins_file);

    match cli.command {
        Command::Open { project, admin } => {
            let session = match admin {
                Some(username) => {
                    if !credentials.any_admin_exists()? {
                        bail!("no admin accounts yet; run `kanban register-admin <user>` first");
                    }
                    let password = read_password(&format!("Password for {username}"))?;
                    if !credentials.verify(&username, &password)? {
                        bail!("invalid admin credentials");
                    }
                    Session::Admin
                }
                None if store.exists(&project) => Session::User,
                None if !store.any_projects()? => {
                    bail!("no projects exist yet; an admin must create one with --admin")
                }
                None => {
                    bail!("project '{project}' does not exist; open it with --admin to create it")
                }
            };
            let board = KanbanBoard::open(&store, &project, session)?;
            run_board(board, &store)?;
        }
        Command::List => {
            for name in store.list_projects()? {
                println!("{name}");
            }
        }
        Command::Delete { project } => {
            store.delete_project(&project)?;
            println!("Deleted '{project}' (board file only, log preserved)");
        }
        Command::Export {
            project,
            destination,
        } => {
            store.export_project(&project, &destination)?;
            println!("Project saved as {}", destination.display());
        }
        Command::ExportLog {
            project,
            destination,
        } => {
            store.export_log(&project, &destination)?;
            println!("Log saved as {}", destination.display());
        }
        Command::Log { project } => {
            for line in read_log(&store.log_path(&project))? {
                println!("{}  {:<18} {}", line.timestamp, line.action, line.details);
            }
        }
        Command::RegisterAdmin { username } => {
            let password = read_password(&format!("New password for {username}"))?;
            credentials.register(&username, &password)?;
            println!("Admin '{username}' registered");
        }
    }
    Ok(())
}

fn run_board(board: KanbanBoard, store: &ProjectStore) -> Result<()> {
    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = ui::App::new(board, store);
    let result = ui::run_app(&mut terminal, &mut app);

    // Restore terminal
    let restored = restore_terminal(&mut terminal);

    close_board(app.into_board(), store, [result, restored])
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()
}

/// Leaving the board always saves it, whatever happened to the terminal.
fn close_board<const N: usize>(
    mut board: KanbanBoard,
    store: &ProjectStore,
    terminal: [io::Result<()>; N],
) -> Result<()> {
    board.on_close(store)?;
    for outcome in terminal {
        outcome.context("terminal error")?;
    }
    Ok(())
}

fn read_password(message: &str) -> Result<String> {
    print!("{message}: ");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}
