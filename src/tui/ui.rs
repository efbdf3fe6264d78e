use chrono::{Datelike, NaiveDate};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};

use crate::models::{days_in_month, DayKey, Priority, Task};
use crate::storage::Persistence;
use crate::views::DatedTask;
use super::app::{App, Focus, InputField, InputMode};

const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

pub fn ui<P: Persistence>(f: &mut Frame, app: &mut App<P>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Calendar, day and upcoming
            Constraint::Length(3), // Help
        ])
        .split(f.area());

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[0]);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(11), Constraint::Min(0)])
        .split(columns[0]);

    render_month(f, app, left[0]);
    render_day(f, app, left[1]);
    render_upcoming(f, app, columns[1]);

    let help_text = match app.input_mode {
        InputMode::Normal => match app.focus {
            Focus::Calendar => "q: Quit | hjkl/Arrows: Move | [ ]: Month | { }: Year | g: Today | Enter/Tab: Day | a: Add | /: Search",
            Focus::Day => "q: Quit | j/k: Select | Space: Done | a: Add | e: Edit | t: Time | 1/2/3: Priority | r: Recur | m: Move | d: Del | Tab: Calendar",
        },
        InputMode::Editing => "Enter: Save | Esc: Cancel",
        InputMode::Adding => "Enter: Next Step | Esc: Cancel",
        InputMode::Searching => "Type to search | Up/Down: Select | Enter: Jump | Esc: Close",
    };
    let help_line = match &app.status {
        Some(status) => format!("{}  |  {}", status, help_text),
        None => help_text.to_string(),
    };

    let help = Paragraph::new(help_line)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[1]);

    match app.input_mode {
        InputMode::Editing | InputMode::Adding => render_input(f, app),
        InputMode::Searching => render_search(f, app),
        InputMode::Normal => {}
    }
}

fn focus_block(title: String, focused: bool) -> Block<'static> {
    let style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    Block::default().borders(Borders::ALL).border_style(style).title(title)
}

fn priority_style(priority: Priority) -> Style {
    match priority {
        Priority::High => Style::default().fg(Color::Red),
        Priority::Medium => Style::default().fg(Color::Yellow),
        Priority::Low => Style::default().fg(Color::Green),
    }
}

fn render_month<P: Persistence>(f: &mut Frame, app: &App<P>, area: Rect) {
    let year = app.selected.year();
    let month = app.selected.month0();
    let counts = app.session.store().month_counts(year, month);
    let offset = NaiveDate::from_ymd_opt(year, month + 1, 1)
        .map(|d| d.weekday().num_days_from_sunday() as usize)
        .unwrap_or(0);
    let today_key = DayKey::from_date(app.today);

    let mut cells: Vec<Cell> = (0..offset).map(|_| Cell::from("")).collect();
    for day in 1..=days_in_month(year, month) {
        let count = counts.get(&day).copied().unwrap_or_default();
        let marker = match (count.open, count.done) {
            (0, 0) => String::new(),
            (0, _) => " ✓".to_string(),
            (open, _) => format!(" •{}", open),
        };
        let mut style = if count.open > 0 {
            Style::default().fg(Color::Yellow)
        } else if count.done > 0 {
            Style::default().fg(Color::Green)
        } else {
            Style::default()
        };
        if DayKey::new(year, month, day) == today_key {
            style = style.fg(Color::Cyan).add_modifier(Modifier::BOLD);
        }
        if day == app.selected.day() {
            style = style.add_modifier(Modifier::REVERSED);
        }
        cells.push(Cell::from(format!("{:>2}{}", day, marker)).style(style));
    }

    let mut rows = Vec::new();
    let mut cells = cells.into_iter().peekable();
    while cells.peek().is_some() {
        rows.push(Row::new(cells.by_ref().take(7).collect::<Vec<_>>()));
    }

    let widths = [Constraint::Ratio(1, 7); 7];
    let table = Table::new(rows, widths)
        .header(Row::new(WEEKDAYS.to_vec())
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)))
        .block(focus_block(format!("Taskcal - {}", app.month_title()), app.focus == Focus::Calendar));

    f.render_widget(table, area);
}

fn task_row(t: &Task) -> Row<'static> {
    let style = if t.completed {
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT)
    } else {
        Style::default()
    };
    let priority = if t.completed { Style::default().fg(Color::DarkGray) } else { priority_style(t.priority) };
    Row::new(vec![
        Cell::from(if t.completed { "[x]" } else { "[ ]" }),
        Cell::from(t.text.clone()),
        Cell::from(t.priority.as_str()).style(priority),
        Cell::from(t.time.clone().unwrap_or_default()),
        Cell::from(if t.recurring { "↻" } else { "" }),
    ])
    .style(style)
}

fn render_day<P: Persistence>(f: &mut Frame, app: &mut App<P>, area: Rect) {
    let rows: Vec<Row> = app.day_tasks().iter().map(task_row).collect();
    let title = app.selected.format("%A, %B %d %Y").to_string();
    let focused = app.focus == Focus::Day;

    if rows.is_empty() {
        let hint = Paragraph::new("No tasks. Press 'a' to add one.")
            .style(Style::default().fg(Color::Gray))
            .block(focus_block(title, focused));
        f.render_widget(hint, area);
        return;
    }

    let widths = [
        Constraint::Length(3),
        Constraint::Min(20),
        Constraint::Length(6),
        Constraint::Length(5),
        Constraint::Length(1),
    ];
    let table = Table::new(rows, widths)
        .block(focus_block(title, focused))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol(">> ");

    if focused {
        f.render_stateful_widget(table, area, &mut app.task_state);
    } else {
        f.render_widget(table, area);
    }
}

fn dated_row(item: &DatedTask) -> Row<'static> {
    let date = item
        .date
        .map(|d| d.format("%b %d").to_string())
        .unwrap_or_else(|| item.key.to_string());
    Row::new(vec![
        Cell::from(date),
        Cell::from(item.task.text.clone()),
        Cell::from(item.task.time.clone().unwrap_or_default()),
    ])
    .style(priority_style(item.task.priority))
}

fn render_upcoming<P: Persistence>(f: &mut Frame, app: &mut App<P>, area: Rect) {
    let window = app.window;
    let rows: Vec<Row> = app.upcoming().iter().map(dated_row).collect();
    let title = format!("Upcoming Tasks ({} days)", window);

    if rows.is_empty() {
        let empty = Paragraph::new(format!("No upcoming tasks in the next {} days.", window))
            .style(Style::default().fg(Color::Gray))
            .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(empty, area);
        return;
    }

    let widths = [Constraint::Length(6), Constraint::Min(10), Constraint::Length(5)];
    let table = Table::new(rows, widths).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(table, area);
}

fn render_input<P: Persistence>(f: &mut Frame, app: &App<P>) {
    let area = centered_rect(60, 3, f.area()); // Fixed height of 3 (border + 1 line)
    f.render_widget(Clear, area); // Clear the area first

    let title = match app.input_mode {
        InputMode::Adding => match app.add_state.step {
            0 => "Add Task: Enter Text",
            1 => "Add Task: Priority (high/medium/low, default medium)",
            2 => "Add Task: Time HH:MM (Optional)",
            3 => "Add Task: Recurring daily? (y/N)",
            _ => "Add Task",
        },
        InputMode::Editing => match app.input_field {
            InputField::Text => "Edit Text",
            InputField::Time => "Edit Time HH:MM (empty clears)",
            InputField::MoveTo => "Move To Date (YYYY-MM-DD)",
            InputField::None => "Edit",
        },
        _ => "",
    };

    let input = Paragraph::new(app.input_buffer.as_str())
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(input, area);
}

fn render_search<P: Persistence>(f: &mut Frame, app: &mut App<P>) {
    let area = centered_rect(70, 16, f.area());
    f.render_widget(Clear, area);

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let input = Paragraph::new(app.input_buffer.as_str())
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title("Search All Tasks"));
    f.render_widget(input, parts[0]);

    let rows: Vec<Row> = app
        .search_results
        .iter()
        .map(|item| {
            let date = item
                .date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| item.key.to_string());
            let status = if item.task.completed { "Done" } else { "Pending" };
            Row::new(vec![
                Cell::from(date),
                Cell::from(item.task.text.clone()),
                Cell::from(status),
            ])
        })
        .collect();

    let widths = [Constraint::Length(10), Constraint::Min(10), Constraint::Length(7)];
    let title = format!("{} matches", app.search_results.len());
    let table = Table::new(rows, widths)
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol(">> ");
    f.render_stateful_widget(table, parts[1], &mut app.search_state);
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let height = height.min(r.height);
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((r.height - height) / 2),
            Constraint::Length(height),
            Constraint::Length((r.height - height) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
