//! Terminal UI for the channel chat
//!
//! Provides:
//! - Identity setup (generate or import a key)
//! - The chat screen: live timeline, input line, publish status
//!
//! The loop polls the terminal with a short timeout and drains the relay
//! event channel between key presses, so incoming messages render without
//! user input.

pub mod app;
pub mod components;
pub mod screens;

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Frame, Terminal};
use tokio::runtime::Handle;

use crate::config::Config;
use crate::storage::FileStorage;

use app::{App, Screen, SetupMode};

const TICK: Duration = Duration::from_millis(100);

/// Run the terminal UI
pub fn run(config: Config, storage: FileStorage, handle: Handle) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app and run
    let res = App::new(config, storage, handle).and_then(|mut app| run_app(&mut terminal, &mut app));

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        app.tick()?;
        terminal.draw(|f| ui(f, app))?;

        if !event::poll(TICK)? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                match app.screen {
                    Screen::Setup => handle_setup_keys(app, key),
                    Screen::Chat => handle_chat_keys(app, key),
                }
            }
        }
        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let area = frame.area();
    match app.screen {
        Screen::Setup => screens::setup::render(frame, app, area),
        Screen::Chat => screens::chat::render(frame, app, area),
    }
}

fn handle_setup_keys(app: &mut App, key: KeyEvent) {
    match app.setup_mode {
        SetupMode::Choose => match key.code {
            KeyCode::Char('g') => app.generate_identity(),
            KeyCode::Char('i') => {
                app.setup_error = None;
                app.setup_mode = SetupMode::Import;
            }
            KeyCode::Char('q') | KeyCode::Esc => app.quit(),
            _ => {}
        },
        SetupMode::Import => match key.code {
            KeyCode::Enter => app.import_identity(),
            KeyCode::Esc => {
                app.setup_error = None;
                app.setup_mode = SetupMode::Choose;
            }
            _ => {
                app.import_input.handle_key(key);
            }
        },
    }
}

fn handle_chat_keys(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.quit();
        return;
    }
    match key.code {
        KeyCode::Esc => app.quit(),
        KeyCode::Enter => app.send_current_input(),
        KeyCode::Up | KeyCode::PageUp => app.scroll_up(),
        KeyCode::Down | KeyCode::PageDown => app.scroll_down(),
        _ => {
            app.input.handle_key(key);
        }
    }
}
