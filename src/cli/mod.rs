//! TUI front-end entry (Ratatui + Crossterm)
//! - Opens the session database and restores any saved login
//! - Sets up terminal and drives the draw / input / poll loop

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::config::Config;
use crate::database::db::{connection, migrate};

pub mod api;
pub mod fallback;
pub mod input;
pub mod resources;
pub mod session;
pub mod state;
pub mod ui;
pub mod util;
pub mod views;

pub async fn run(cfg: &Config) -> Result<()> {
    let session = init_session(cfg).await?;
    let mut app = state::App::new(session.clone());

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    crossterm::execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = session.scope(event_loop(&mut terminal, &mut app)).await;

    disable_raw_mode()?;
    let mut stdout = std::io::stdout();
    crossterm::execute!(stdout, LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    result
}

async fn event_loop(terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>, app: &mut state::App) -> Result<()> {
    app.start().await;

    let tick_rate = Duration::from_millis(200);
    let mut last_tick = Instant::now();

    loop {
        app.poll_updates();
        terminal.draw(|f| ui::draw(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key).await?;
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.quit {
            break;
        }
    }
    Ok(())
}

/// Open the session database, apply migrations and restore the saved login.
pub async fn init_session(cfg: &Config) -> Result<Arc<session::SessionStore>> {
    let pool = connection::get_db_pool(&cfg.database_url).await?;
    migrate::run_migrations(&pool).await?;

    let storage = session::SqliteSessionStorage::new(pool);
    let client = api::Client::from_config(cfg)?;
    let store = session::SessionStore::restore(client, Arc::new(storage)).await?;
    tracing::debug!(api = %cfg.api_url, authenticated = store.is_authenticated(), "session ready");
    Ok(Arc::new(store))
}
