use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::Terminal;
use tokio::sync::mpsc;

mod api;
mod app;
mod cascade;
mod interaction;
mod store;
mod thread_view;
mod ui;

use api::{ApiClient, AuthToken};
use app::{App, AppEvent};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        println!("Usage: folio-tui");
        println!();
        println!("Environment:");
        println!("  FOLIO_SERVER_URL  Comment server base URL (default http://localhost:3000)");
        println!("  FOLIO_TOKEN       Bearer token issued by the identity service");
        println!("                    (falls back to the token file under the config dir)");
        println!("  FOLIO_LOG         Write tracing output to this file (RUST_LOG filters it)");
        return Ok(());
    }

    // The terminal belongs to the UI, so tracing goes to a file when asked for
    if let Ok(path) = std::env::var("FOLIO_LOG") {
        let log_file = std::fs::File::create(&path)
            .with_context(|| format!("could not create log file {path}"))?;
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "folio_tui=debug".into()),
            )
            .with_writer(std::sync::Arc::new(log_file))
            .with_ansi(false)
            .init();
    }

    let server_url =
        std::env::var("FOLIO_SERVER_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

    let auth = match AuthToken::load()? {
        Some(auth) if !auth.is_expired() => auth,
        Some(_) => {
            eprintln!("Error: the stored token has expired. Sign in again to get a fresh one.");
            std::process::exit(1);
        }
        None => {
            eprintln!("Error: no token found. Set FOLIO_TOKEN or write the token file.");
            std::process::exit(1);
        }
    };

    let api = ApiClient::new(&server_url, auth);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let app = App::new(api);
    let res = run_app(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, mut app: App) -> Result<()> {
    let (tx, mut rx) = mpsc::channel::<AppEvent>(100);

    // Forward terminal input alongside a steady tick
    let tx_input = tx.clone();
    tokio::spawn(async move {
        loop {
            if event::poll(Duration::from_millis(100)).unwrap_or(false) {
                if let Ok(Event::Key(key)) = event::read() {
                    if key.kind == KeyEventKind::Press && tx_input.send(AppEvent::Key(key)).await.is_err() {
                        return;
                    }
                }
            } else if tx_input.send(AppEvent::Tick).await.is_err() {
                return;
            }
        }
    });

    app.load_subjects().await;

    loop {
        terminal.draw(|f| ui::draw(f, &app))?;

        if let Some(event) = rx.recv().await {
            match event {
                AppEvent::Key(key) => {
                    if app.handle_key(key, tx.clone()).await? {
                        return Ok(());
                    }
                }
                AppEvent::Tick => {}
                AppEvent::ThreadUpdated {
                    subject_id,
                    comments,
                } => app.apply_thread(subject_id, comments),
            }
        }
    }
}
