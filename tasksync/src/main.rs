//! `tasksync`: terminal client for a collaborative to-do list.
//!
//! Without a subcommand, launches the TUI. Configuration via CLI flags,
//! environment variables, or config file
//! (`~/.config/tasksync/config.toml`).
//!
//! ```bash
//! # Print the browser login URL, then store the token from the redirect
//! tasksync login
//! tasksync login --redirect 'http://localhost:3000/login/success?token=...'
//!
//! # Run against a remote server
//! tasksync --api-url https://todo.example.com
//! ```

use std::io;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use parking_lot::RwLock;
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;

use tasksync::api::{HttpTaskApi, SharedSession, TaskApi};
use tasksync::app::App;
use tasksync::config::{CliArgs, ClientConfig, Command};
use tasksync::net::{self, NetCommand, NetEvent};
use tasksync::push::ws::WsEventSource;
use tasksync::session::{FileStorage, MemoryStorage, Session};
use tasksync::ui;

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = CliArgs::parse();

    // CLI args > env > config file > defaults.
    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config: {e}");
            ClientConfig::default()
        }
    };

    // Logs go to a file; ratatui owns stdout.
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());
    tracing::info!(api_url = %config.api_url, push_url = %config.push_url, "tasksync starting");

    let session = open_session(&config)?;

    let result = match cli.command {
        Some(Command::Login { redirect, token }) => login(&session, &config, redirect, token),
        Some(Command::Logout) => {
            session.write().logout().map_err(io::Error::other)?;
            println!("Signed out.");
            Ok(())
        }
        Some(Command::Whoami) => whoami(session, &config).await,
        None => run_tui(session, &config),
    };

    tracing::info!("tasksync exiting");
    result
}

/// Initialize file-based logging.
///
/// Logs are written to a file (never stdout, since ratatui owns the terminal).
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("tasksync.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// Restores the session from the storage file, falling back to memory when
/// no data directory exists.
fn open_session(config: &ClientConfig) -> io::Result<SharedSession> {
    let path = config.storage_path.clone().or_else(FileStorage::default_path);
    let session = if let Some(path) = path {
        let storage = FileStorage::open(path).map_err(io::Error::other)?;
        tracing::debug!(path = %storage.path().display(), "session storage opened");
        Session::restore(storage)
    } else {
        tracing::warn!("no data directory; session will not persist");
        Session::restore(MemoryStorage::default())
    };
    Ok(Arc::new(RwLock::new(session)))
}

/// `tasksync login`: stores a token from `--token` or `--redirect`, or
/// prints the browser login URL.
fn login(
    session: &SharedSession,
    config: &ClientConfig,
    redirect: Option<String>,
    token: Option<String>,
) -> io::Result<()> {
    let mut session = session.write();
    let result = match (token, redirect) {
        (Some(token), _) => session.set_token(token),
        (None, Some(redirect)) => session.complete_login(&redirect),
        (None, None) => {
            println!("Open this address in a browser to sign in:");
            println!("  {}", Session::login_url(&config.api_url));
            println!("Then run: tasksync login --redirect '<address you were sent to>'");
            return Ok(());
        }
    };
    result.map_err(io::Error::other)?;
    println!("Signed in.");
    Ok(())
}

/// `tasksync whoami`: fetches and prints the signed-in user's profile.
async fn whoami(session: SharedSession, config: &ClientConfig) -> io::Result<()> {
    if !session.read().is_authenticated() {
        return Err(io::Error::other("not signed in; run `tasksync login`"));
    }
    let api = HttpTaskApi::new(&config.api_url, session, config.request_timeout)
        .map_err(io::Error::other)?;
    let profile = api.fetch_profile().await.map_err(io::Error::other)?;
    println!("{}", profile.display_name());
    if let Some(email) = &profile.email {
        println!("{email}");
    }
    Ok(())
}

fn run_tui(session: SharedSession, config: &ClientConfig) -> io::Result<()> {
    let api = HttpTaskApi::new(&config.api_url, Arc::clone(&session), config.request_timeout)
        .map_err(io::Error::other)?;
    let source = WsEventSource::new(&config.push_url, config.connect_timeout);

    // Set up terminal.
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, api, source, session, config);

    // Restore terminal.
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

/// Main application loop. Must run inside the tokio runtime.
fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    api: HttpTaskApi,
    source: WsEventSource,
    session: SharedSession,
    config: &ClientConfig,
) -> io::Result<()> {
    let (cmd_tx, mut evt_rx) = net::spawn_net(api, source, config.to_net_config());
    let mut app = App::new(session, &config.api_url, config.page_size, local_today());

    let startup = app.start();
    dispatch(&mut app, &cmd_tx, startup);

    loop {
        // Step 1: Draw the UI frame.
        terminal.draw(|frame| ui::draw(frame, &app))?;

        // Step 2: Drain all pending NetEvents (non-blocking).
        drain_net_events(&mut app, &mut evt_rx, &cmd_tx);

        // Step 3: Keep date comparisons on the local calendar day.
        app.set_today(local_today());

        // Step 4: Poll for terminal input events.
        if event::poll(config.poll_timeout)?
            && let Event::Key(key) = event::read()?
        {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            let cmds = app.handle_key_event(key);
            dispatch(&mut app, &cmd_tx, cmds);
        }

        if app.should_quit {
            let _ = cmd_tx.try_send(NetCommand::Shutdown);
            return Ok(());
        }
    }
}

fn local_today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

/// Forward commands to the networking layer without blocking the UI.
fn dispatch(app: &mut App, tx: &mpsc::Sender<NetCommand>, cmds: Vec<NetCommand>) {
    for cmd in cmds {
        match tx.try_send(cmd) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(cmd)) => {
                app.command_rejected(cmd, "Network busy, try again");
            }
            Err(mpsc::error::TrySendError::Closed(cmd)) => {
                app.command_rejected(cmd, "Network task stopped");
            }
        }
    }
}

/// Drain all pending `NetEvent`s from the receiver and apply them to the app.
fn drain_net_events(
    app: &mut App,
    rx: &mut mpsc::Receiver<NetEvent>,
    tx: &mpsc::Sender<NetCommand>,
) {
    while let Ok(event) = rx.try_recv() {
        let cmds = app.apply_net_event(event);
        dispatch(app, tx, cmds);
    }
}
