use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    self, disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::sync::mpsc::{Receiver, Sender};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::app::App;
use crate::net::{RefreshCommand, RefreshMessage};
use crate::ui;
use crate::viewport::Viewport;

const FLAP_TICK: Duration = Duration::from_millis(30);
const IDLE_TICK: Duration = Duration::from_millis(100);

pub fn init_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

pub fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

pub fn measure_viewport(columns: u16, rows: u16, cell_px: (u16, u16)) -> Viewport {
    let pixels = terminal::window_size()
        .ok()
        .map(|size| (size.width, size.height));
    Viewport::from_terminal(columns, rows, pixels, cell_px)
}

pub fn initial_viewport(cell_px: (u16, u16)) -> Result<Viewport> {
    let (columns, rows) = terminal::size().context("Failed to read terminal size")?;
    Ok(measure_viewport(columns, rows, cell_px))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    Quit,
    Refresh,
    NextPage,
    None,
}

fn key_action(key: KeyEvent) -> Action {
    if key.kind == KeyEventKind::Release {
        return Action::None;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::Quit,
        KeyCode::Char('r') => Action::Refresh,
        KeyCode::Char('n') => Action::NextPage,
        _ => Action::None,
    }
}

fn request_refresh(commands: &Sender<RefreshCommand>) -> bool {
    debug!("manual refresh requested");
    if commands.send(RefreshCommand::Now).is_err() {
        warn!("refresher is gone, manual refresh dropped");
        return false;
    }
    true
}

pub fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    mut app: App,
    rx: Receiver<RefreshMessage>,
    commands: Sender<RefreshCommand>,
    cell_px: (u16, u16),
) -> Result<()> {
    loop {
        let now = Instant::now();
        while let Ok(message) = rx.try_recv() {
            match message {
                RefreshMessage::Updated(outcome) => app.apply_outcome(outcome, now),
                RefreshMessage::Failed(err) => app.apply_error(err),
            }
        }

        if app.rotation_due(now) {
            app.rotate(now);
        }
        app.poll_resize(now);
        app.advance_tick(now);

        terminal.draw(|f| ui::ui(f, &app))?;

        let tick_rate = if app.is_animating() { FLAP_TICK } else { IDLE_TICK };
        if event::poll(tick_rate)? {
            match event::read()? {
                Event::Key(key) => match key_action(key) {
                    Action::Quit => return Ok(()),
                    Action::Refresh => {
                        request_refresh(&commands);
                    }
                    Action::NextPage => app.rotate(Instant::now()),
                    Action::None => {}
                },
                Event::Resize(columns, rows) => {
                    app.observe_resize(measure_viewport(columns, rows, cell_px), Instant::now());
                }
                _ => {}
            }
        }
    }
}
