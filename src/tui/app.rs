use chrono::{Datelike, Duration, Months, NaiveDate};
use ratatui::widgets::TableState;

use crate::commands::{parse_date, parse_time, short_id};
use crate::models::{DayKey, NewTask, Priority, Task, TaskPatch};
use crate::session::Session;
use crate::storage::Persistence;
use crate::views::DatedTask;

#[derive(PartialEq)]
pub enum InputMode {
    Normal,
    Editing,
    Adding,
    Searching,
}

#[derive(PartialEq, Clone, Copy)]
pub enum Focus {
    Calendar,
    Day,
}

pub enum InputField {
    None,
    Text,
    Time,
    MoveTo,
}

/// State for the multi-step "Add Task" wizard.
#[derive(Default)]
pub struct AddState {
    pub text: String,
    pub priority: Priority,
    pub time: Option<String>,
    pub step: usize, // 0: Text, 1: Priority, 2: Time, 3: Recurring
}

pub struct App<P: Persistence> {
    pub session: Session<P>,
    pub today: NaiveDate,
    pub selected: NaiveDate,
    pub focus: Focus,
    pub task_state: TableState,
    pub search_state: TableState,
    pub search_results: Vec<DatedTask>,
    pub input_mode: InputMode,
    pub input_field: InputField,
    pub input_buffer: String,
    pub target_id: Option<String>,
    pub add_state: AddState,
    pub window: u32,
    pub status: Option<String>,
}

impl<P: Persistence> App<P> {
    pub fn new(session: Session<P>, today: NaiveDate, window: u32) -> App<P> {
        let mut app = App {
            session,
            today,
            selected: today,
            focus: Focus::Calendar,
            task_state: TableState::default(),
            search_state: TableState::default(),
            search_results: Vec::new(),
            input_mode: InputMode::Normal,
            input_field: InputField::None,
            input_buffer: String::new(),
            target_id: None,
            add_state: AddState::default(),
            window,
            status: None,
        };
        app.clamp_selection();
        app
    }

    pub fn selected_key(&self) -> DayKey {
        DayKey::from_date(self.selected)
    }

    pub fn day_tasks(&self) -> &[Task] {
        self.session.day_tasks(self.selected_key())
    }

    pub fn upcoming(&mut self) -> &[DatedTask] {
        self.session.upcoming(self.today, self.window)
    }

    fn selected_task(&self) -> Option<&Task> {
        self.task_state.selected().and_then(|i| self.day_tasks().get(i))
    }

    fn clamp_selection(&mut self) {
        let len = self.day_tasks().len();
        match self.task_state.selected() {
            _ if len == 0 => self.task_state.select(None),
            Some(i) if i >= len => self.task_state.select(Some(len - 1)),
            None => self.task_state.select(Some(0)),
            _ => {}
        }
    }

    fn select_date(&mut self, date: NaiveDate) {
        if date != self.selected {
            self.selected = date;
            self.task_state.select(None);
        }
        self.clamp_selection();
    }

    /// Moves the selected day by `days`.
    pub fn shift_days(&mut self, days: i64) {
        if let Some(date) = self.selected.checked_add_signed(Duration::days(days)) {
            self.select_date(date);
        }
    }

    /// Moves the selected day by whole months, clamping to the month's end.
    pub fn shift_months(&mut self, months: i32) {
        let shifted = if months >= 0 {
            self.selected.checked_add_months(Months::new(months.unsigned_abs()))
        } else {
            self.selected.checked_sub_months(Months::new(months.unsigned_abs()))
        };
        if let Some(date) = shifted {
            self.select_date(date);
        }
    }

    pub fn go_today(&mut self) {
        self.select_date(self.today);
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Calendar => Focus::Day,
            Focus::Day => Focus::Calendar,
        };
        self.clamp_selection();
    }

    /// Selects the next task of the day.
    pub fn next(&mut self) {
        let len = self.day_tasks().len();
        if len == 0 { return; }
        let i = match self.task_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.task_state.select(Some(i));
    }

    /// Selects the previous task of the day.
    pub fn previous(&mut self) {
        let len = self.day_tasks().len();
        if len == 0 { return; }
        let i = match self.task_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.task_state.select(Some(i));
    }

    /// Flips completion of the selected task.
    pub fn toggle_selected(&mut self) {
        let Some((id, completed)) = self.selected_task().map(|t| (t.id.clone(), t.completed)) else {
            return;
        };
        let key = self.selected_key();
        self.session.toggle_task(key, &id, !completed);
        self.follow(&id);
    }

    pub fn delete_selected(&mut self) {
        let Some(id) = self.selected_task().map(|t| t.id.clone()) else {
            return;
        };
        let key = self.selected_key();
        if self.session.delete_task(key, &id) {
            self.status = Some(format!("Deleted task {}", short_id(&id)));
        }
        self.clamp_selection();
    }

    pub fn set_priority(&mut self, priority: Priority) {
        let Some(id) = self.selected_task().map(|t| t.id.clone()) else {
            return;
        };
        let key = self.selected_key();
        let patch = TaskPatch { priority: Some(priority), ..TaskPatch::default() };
        self.session.update_task(key, &id, patch);
        self.follow(&id);
    }

    pub fn toggle_recurring(&mut self) {
        let Some((id, recurring)) = self.selected_task().map(|t| (t.id.clone(), t.recurring)) else {
            return;
        };
        let key = self.selected_key();
        let patch = TaskPatch { recurring: Some(!recurring), ..TaskPatch::default() };
        self.session.update_task(key, &id, patch);
        self.follow(&id);
    }

    /// Keeps the highlight on a task after a re-sort moved it.
    fn follow(&mut self, id: &str) {
        let pos = self.day_tasks().iter().position(|t| t.id == id);
        self.task_state.select(pos);
        self.clamp_selection();
    }

    /// Initiates the "Add Task" wizard for the selected day.
    pub fn start_add(&mut self) {
        self.input_mode = InputMode::Adding;
        self.add_state = AddState::default();
        self.input_buffer.clear();
    }

    /// Initiates editing of a field of the selected task.
    pub fn start_edit(&mut self, field: InputField) {
        let Some(task) = self.selected_task() else {
            return;
        };
        let id = task.id.clone();
        // Pre-fill buffer for editing
        let buffer = match field {
            InputField::Text => task.text.clone(),
            InputField::Time => task.time.clone().unwrap_or_default(),
            InputField::MoveTo => self.selected.to_string(),
            InputField::None => String::new(),
        };
        self.target_id = Some(id);
        self.input_field = field;
        self.input_buffer = buffer;
        self.input_mode = InputMode::Editing;
    }

    pub fn start_search(&mut self) {
        self.input_mode = InputMode::Searching;
        self.input_buffer.clear();
        self.search_results.clear();
        self.search_state.select(None);
    }

    pub fn cancel_input(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input_field = InputField::None;
        self.input_buffer.clear();
        self.target_id = None;
    }

    pub fn push_char(&mut self, c: char) {
        self.input_buffer.push(c);
        if self.input_mode == InputMode::Searching {
            self.refresh_search();
        }
    }

    pub fn pop_char(&mut self) {
        self.input_buffer.pop();
        if self.input_mode == InputMode::Searching {
            self.refresh_search();
        }
    }

    fn refresh_search(&mut self) {
        self.search_results = self.session.search(&self.input_buffer);
        self.search_state.select(if self.search_results.is_empty() { None } else { Some(0) });
    }

    pub fn search_next(&mut self) {
        let len = self.search_results.len();
        if len == 0 { return; }
        let i = self.search_state.selected().map_or(0, |i| (i + 1) % len);
        self.search_state.select(Some(i));
    }

    pub fn search_previous(&mut self) {
        let len = self.search_results.len();
        if len == 0 { return; }
        let i = match self.search_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.search_state.select(Some(i));
    }

    /// Handles Enter based on the current mode.
    pub fn handle_input(&mut self) {
        match self.input_mode {
            InputMode::Adding => self.handle_adding_input(),
            InputMode::Editing => self.handle_editing_input(),
            InputMode::Searching => self.handle_search_input(),
            InputMode::Normal => {}
        }
    }

    fn handle_adding_input(&mut self) {
        match self.add_state.step {
            0 => { // Text
                let text = self.input_buffer.trim();
                if !text.is_empty() {
                    self.add_state.text = text.to_string();
                    self.add_state.step += 1;
                    self.input_buffer.clear();
                }
            }
            1 => { // Priority
                if self.input_buffer.trim().is_empty() {
                    self.add_state.priority = Priority::Medium;
                } else if let Ok(p) = self.input_buffer.parse::<Priority>() {
                    self.add_state.priority = p;
                } else {
                    self.status = Some("Priority must be high, medium or low".into());
                    return;
                }
                self.add_state.step += 1;
                self.input_buffer.clear();
            }
            2 => { // Time
                if !self.input_buffer.trim().is_empty() {
                    match parse_time(&self.input_buffer) {
                        Ok(t) => self.add_state.time = Some(t),
                        Err(e) => {
                            self.status = Some(e);
                            return;
                        }
                    }
                }
                self.add_state.step += 1;
                self.input_buffer.clear();
            }
            3 => { // Recurring
                let recurring = matches!(self.input_buffer.trim().to_lowercase().as_str(), "y" | "yes");
                let new = NewTask::new(std::mem::take(&mut self.add_state.text))
                    .priority(self.add_state.priority)
                    .time(self.add_state.time.take())
                    .recurring(recurring);
                let key = self.selected_key();
                let id = self.session.add_task(key, new);
                self.status = Some(format!("Added task {}", short_id(&id)));
                self.cancel_input();
                self.focus = Focus::Day;
                self.follow(&id);
            }
            _ => {}
        }
    }

    fn handle_editing_input(&mut self) {
        let Some(id) = self.target_id.clone() else {
            self.cancel_input();
            return;
        };
        let key = self.selected_key();
        match self.input_field {
            InputField::Text => {
                let text = self.input_buffer.trim().to_string();
                if text.is_empty() {
                    self.status = Some("Task text must not be empty".into());
                    return;
                }
                let patch = TaskPatch { text: Some(text), ..TaskPatch::default() };
                self.session.update_task(key, &id, patch);
            }
            InputField::Time => {
                let time = if self.input_buffer.trim().is_empty() {
                    None
                } else {
                    match parse_time(&self.input_buffer) {
                        Ok(t) => Some(t),
                        Err(e) => {
                            self.status = Some(e);
                            return;
                        }
                    }
                };
                let patch = TaskPatch { time: Some(time), ..TaskPatch::default() };
                self.session.update_task(key, &id, patch);
            }
            InputField::MoveTo => {
                let to = match parse_date(&self.input_buffer, self.today) {
                    Ok(d) => d,
                    Err(e) => {
                        self.status = Some(e);
                        return;
                    }
                };
                if self.session.move_task(key, &id, DayKey::from_date(to)) {
                    self.status = Some(format!("Moved task to {}", to));
                }
                self.cancel_input();
                self.select_date(to);
                self.follow(&id);
                return;
            }
            InputField::None => {}
        }
        self.cancel_input();
        self.follow(&id);
    }

    fn handle_search_input(&mut self) {
        let hit = self
            .search_state
            .selected()
            .and_then(|i| self.search_results.get(i))
            .map(|t| (t.date, t.task.id.clone()));
        self.cancel_input();
        if let Some((Some(date), id)) = hit {
            self.select_date(date);
            self.focus = Focus::Day;
            self.follow(&id);
        }
    }

    /// Title for the month grid, e.g. "June 2025".
    pub fn month_title(&self) -> String {
        format!("{} {}", crate::commands::month_name(self.selected.month0()), self.selected.year())
    }
}
