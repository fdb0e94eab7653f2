use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use taskdeck_service::{BlockingService, StaticToken};
use taskdeck_tui::app::App;

const DEFAULT_URL: &str = "https://api.taskdeck.io/prod";

fn main() -> Result<()> {
    // Logs go to stderr so the alternate screen stays intact; quiet unless
    // RUST_LOG says otherwise.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".parse().unwrap()),
        )
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    // Parse CLI: taskdeck [--server URL] [--token KEY]
    // The token is also read from the TASKDECK_TOKEN env var.
    let server_url = match args.iter().position(|a| a == "--server") {
        Some(pos) => args
            .get(pos + 1)
            .context("--server requires a URL argument")?
            .clone(),
        None => DEFAULT_URL.to_string(),
    };

    let token = match args.iter().position(|a| a == "--token") {
        Some(pos) => args
            .get(pos + 1)
            .context("--token requires a key argument")?
            .clone(),
        None => std::env::var("TASKDECK_TOKEN").unwrap_or_default(),
    };

    let service = BlockingService::new(&server_url, Arc::new(StaticToken(token)));
    run_tui(service)
}

fn run_tui(service: BlockingService) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, service);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(ref e) = result {
        eprintln!("Error: {e}");
    }

    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    service: BlockingService,
) -> Result<()> {
    let mut app = App::new(service);

    loop {
        terminal.draw(|frame| app.render(frame))?;

        // Use poll with timeout while an upload is in flight, blocking
        // read otherwise.
        if app.needs_polling() {
            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.code == KeyCode::Char('c')
                        && key.modifiers.contains(KeyModifiers::CONTROL)
                    {
                        break;
                    }
                    app.handle_key(key);
                }
            } else {
                // Timeout — run the next upload step.
                app.advance_upload();
            }
        } else if let Event::Key(key) = event::read()? {
            // Ctrl+C always quits
            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                break;
            }
            // q quits from the top-level list only
            if key.code == KeyCode::Char('q') && app.can_quit() {
                break;
            }
            app.handle_key(key);
        }
    }

    Ok(())
}
