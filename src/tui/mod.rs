pub mod app;
pub mod ui;

use std::{error::Error, io};
use chrono::Local;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use app::{App, Focus, InputField, InputMode};
use ui::ui;

use crate::models::Priority;
use crate::session::Session;
use crate::storage::Persistence;

pub fn run_tui<P: Persistence>(session: Session<P>, window: u32) -> Result<(), Box<dyn Error>> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(session, Local::now().date_naive(), window);

    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    app.session.logout();

    if let Err(err) = res {
        tracing::error!(error = %err, "TUI loop failed");
        println!("{:?}", err)
    }

    Ok(())
}

fn run_app<B: Backend, P: Persistence>(terminal: &mut Terminal<B>, app: &mut App<P>) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        let Event::Key(key) = event::read()? else { continue };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        app.status = None;

        match app.input_mode {
            InputMode::Normal => match (app.focus, key.code) {
                (_, KeyCode::Char('q')) => return Ok(()),
                (_, KeyCode::Tab) => app.toggle_focus(),
                (_, KeyCode::Char('a')) => app.start_add(),
                (_, KeyCode::Char('/')) => app.start_search(),
                (_, KeyCode::Char('g')) => app.go_today(),
                (_, KeyCode::Char(']')) => app.shift_months(1),
                (_, KeyCode::Char('[')) => app.shift_months(-1),
                (_, KeyCode::Char('}')) => app.shift_months(12),
                (_, KeyCode::Char('{')) => app.shift_months(-12),
                (Focus::Calendar, KeyCode::Left | KeyCode::Char('h')) => app.shift_days(-1),
                (Focus::Calendar, KeyCode::Right | KeyCode::Char('l')) => app.shift_days(1),
                (Focus::Calendar, KeyCode::Up | KeyCode::Char('k')) => app.shift_days(-7),
                (Focus::Calendar, KeyCode::Down | KeyCode::Char('j')) => app.shift_days(7),
                (Focus::Calendar, KeyCode::Enter) => app.toggle_focus(),
                (Focus::Day, KeyCode::Down | KeyCode::Char('j')) => app.next(),
                (Focus::Day, KeyCode::Up | KeyCode::Char('k')) => app.previous(),
                (Focus::Day, KeyCode::Char(' ')) => app.toggle_selected(),
                (Focus::Day, KeyCode::Char('d') | KeyCode::Delete) => app.delete_selected(),
                (Focus::Day, KeyCode::Char('e')) => app.start_edit(InputField::Text),
                (Focus::Day, KeyCode::Char('t')) => app.start_edit(InputField::Time),
                (Focus::Day, KeyCode::Char('m')) => app.start_edit(InputField::MoveTo),
                (Focus::Day, KeyCode::Char('r')) => app.toggle_recurring(),
                (Focus::Day, KeyCode::Char('1')) => app.set_priority(Priority::High),
                (Focus::Day, KeyCode::Char('2')) => app.set_priority(Priority::Medium),
                (Focus::Day, KeyCode::Char('3')) => app.set_priority(Priority::Low),
                (Focus::Day, KeyCode::Esc) => app.toggle_focus(),
                _ => {}
            },
            InputMode::Editing | InputMode::Adding | InputMode::Searching => match key.code {
                KeyCode::Enter => app.handle_input(),
                KeyCode::Esc => app.cancel_input(),
                KeyCode::Down if app.input_mode == InputMode::Searching => app.search_next(),
                KeyCode::Up if app.input_mode == InputMode::Searching => app.search_previous(),
                KeyCode::Char(c) => app.push_char(c),
                KeyCode::Backspace => app.pop_char(),
                _ => {}
            },
        }
    }
}
