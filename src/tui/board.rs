//! Weekly board interface.
//!
//! This module implements the board view where tasks are organised into one
//! column per day of the visible week, allowing for visual planning and
//! rapid rescheduling through keyboard-driven card movement. A settings
//! screen manages the tag registry and its focus divider, and an assist
//! panel (Ctrl+K) turns natural-language requests into scheduled tasks.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration as StdDuration;

use chrono::{Datelike, Duration, Local, NaiveDate};
use crossterm::event::{self, Event, KeyCode, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame, Terminal,
};

use crate::assist::{self, AssistClient, AssistConfig, AssistError};
use crate::cmd::tasks_path;
use crate::metrics::{day_summary, format_duration, format_hours, week_summary};
use crate::store::{week_start, Store};
use crate::tags::TagRegistry;
use crate::task::{NewTask, Task, TaskPatch};
use crate::tui::colors::{ALERT_RED, DIVIDER_GREY, FOCUS_TAG, HEALTHY_GREEN, TODAY_BLUE};
use crate::tui::input::InputField;

const DAYS_PER_WEEK: usize = 7;
const CARD_HEIGHT: usize = 5;

/// Which screen the board app is showing.
#[derive(Clone, Copy, PartialEq)]
enum Screen {
    Board,
    Settings,
}

/// Where typed input is routed while the input line is open.
#[derive(Clone, Copy, PartialEq)]
enum InputTarget {
    None,
    QuickAdd,
    EditTask { id: u64 },
    EditNote { id: u64 },
    Assist,
    TagAdd,
    TagRename { index: usize },
    Objective { index: usize },
}

/// A completed assist request, tagged with the generation that issued it.
struct AssistReply {
    seq: u64,
    result: Result<String, AssistError>,
}

/// In-flight state of the assist panel.
///
/// The generation counter implements discard-on-arrival: closing the panel
/// bumps `seq`, so a reply from an abandoned request no longer matches and
/// is dropped instead of being applied behind the user's back.
struct AssistState {
    open: bool,
    pending: bool,
    seq: u64,
    rx: Option<Receiver<AssistReply>>,
}

/// Main board application state.
pub struct BoardApp {
    store: Store,
    registry: TagRegistry,
    dir: PathBuf,
    week_anchor: NaiveDate,
    selected_col: usize,
    selected_card: usize,
    col_scroll: [usize; DAYS_PER_WEEK],
    screen: Screen,
    settings_row: usize,
    input: InputField,
    input_target: InputTarget,
    status_message: String,
    assist: AssistState,
}

impl BoardApp {
    /// Create a new board over the storage directory, anchored on the
    /// current week with today's column selected.
    pub fn new(dir: &Path) -> io::Result<Self> {
        let store = Store::load(&tasks_path(dir));
        let registry = TagRegistry::load(dir);
        let today = Local::now().date_naive();

        Ok(BoardApp {
            store,
            registry,
            dir: dir.to_path_buf(),
            week_anchor: week_start(today),
            selected_col: today.weekday().num_days_from_monday() as usize,
            selected_card: 0,
            col_scroll: [0; DAYS_PER_WEEK],
            screen: Screen::Board,
            settings_row: 0,
            input: InputField::new(),
            input_target: InputTarget::None,
            status_message: String::new(),
            assist: AssistState {
                open: false,
                pending: false,
                seq: 0,
                rx: None,
            },
        })
    }

    fn column_date(&self, col: usize) -> NaiveDate {
        self.week_anchor + Duration::days(col as i64)
    }

    fn selected_date(&self) -> NaiveDate {
        self.column_date(self.selected_col)
    }

    /// Id of the card under the cursor, honouring display order.
    fn selected_task_id(&self) -> Option<u64> {
        let date = self.selected_date();
        let order = self.store.display_order(date);
        let &stored = order.get(self.selected_card)?;
        Some(self.store.bucket(date)[stored].id)
    }

    fn selected_task(&self) -> Option<&Task> {
        let date = self.selected_date();
        let id = self.selected_task_id()?;
        self.store.get(id, date)
    }

    fn clamp_selection(&mut self) {
        let len = self.store.bucket(self.selected_date()).len();
        if len == 0 {
            self.selected_card = 0;
        } else if self.selected_card >= len {
            self.selected_card = len - 1;
        }
    }

    fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = msg.into();
    }

    /// Persist the task store; a failed write is reported but the
    /// in-memory state stands.
    fn save_store(&mut self) {
        if let Err(e) = self.store.save(&tasks_path(&self.dir)) {
            self.set_status(format!("Save failed: {e}"));
        }
    }

    fn save_registry(&mut self) {
        if let Err(e) = self.registry.save(&self.dir) {
            self.set_status(format!("Save failed: {e}"));
        }
    }

    /// Main event loop: draw, poll input, collect assist replies.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;
            self.poll_assist();
            if self.handle_input()? {
                break;
            }
        }
        Ok(())
    }

    fn handle_input(&mut self) -> io::Result<bool> {
        if !event::poll(StdDuration::from_millis(50))? {
            return Ok(false);
        }
        let Event::Key(key) = event::read()? else {
            return Ok(false);
        };

        if self.input_target != InputTarget::None {
            self.handle_input_line(key.code);
            return Ok(false);
        }

        // Ctrl+K toggles the assist panel from anywhere.
        if key.code == KeyCode::Char('k') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.toggle_assist_panel();
            return Ok(false);
        }

        match self.screen {
            Screen::Board => self.handle_board_input(key.code, key.modifiers),
            Screen::Settings => Ok(self.handle_settings_input(key.code, key.modifiers)),
        }
    }

    fn handle_board_input(&mut self, key: KeyCode, modifiers: KeyModifiers) -> io::Result<bool> {
        self.status_message.clear();
        match key {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return Ok(true),

            // Card movement between days (before plain navigation).
            KeyCode::Left if modifiers.contains(KeyModifiers::CONTROL) => self.move_card(-1),
            KeyCode::Right if modifiers.contains(KeyModifiers::CONTROL) => self.move_card(1),
            KeyCode::Up if modifiers.contains(KeyModifiers::CONTROL) => self.shift_card(-1),
            KeyCode::Down if modifiers.contains(KeyModifiers::CONTROL) => self.shift_card(1),

            KeyCode::Left => {
                if self.selected_col > 0 {
                    self.selected_col -= 1;
                } else {
                    self.week_anchor -= Duration::days(7);
                    self.selected_col = DAYS_PER_WEEK - 1;
                }
                self.clamp_selection();
            }
            KeyCode::Right => {
                if self.selected_col < DAYS_PER_WEEK - 1 {
                    self.selected_col += 1;
                } else {
                    self.week_anchor += Duration::days(7);
                    self.selected_col = 0;
                }
                self.clamp_selection();
            }
            KeyCode::Up => {
                if self.selected_card > 0 {
                    self.selected_card -= 1;
                }
            }
            KeyCode::Down => {
                let len = self.store.bucket(self.selected_date()).len();
                if len > 0 && self.selected_card < len - 1 {
                    self.selected_card += 1;
                }
            }

            KeyCode::Char('[') => {
                self.week_anchor -= Duration::days(7);
                self.clamp_selection();
            }
            KeyCode::Char(']') => {
                self.week_anchor += Duration::days(7);
                self.clamp_selection();
            }
            KeyCode::Char('t') => {
                let today = Local::now().date_naive();
                self.week_anchor = week_start(today);
                self.selected_col = today.weekday().num_days_from_monday() as usize;
                self.clamp_selection();
            }

            KeyCode::Char('a') => {
                self.input = InputField::new();
                self.input_target = InputTarget::QuickAdd;
                self.set_status("Add: title [#tag] [@minutes], Enter to create, Esc to cancel");
            }
            KeyCode::Char('e') => {
                if let Some(task) = self.selected_task() {
                    let id = task.id;
                    self.input = InputField::with_value(&format_quick_entry(task));
                    self.input_target = InputTarget::EditTask { id };
                    self.set_status("Edit: title [#tag] [@minutes], Enter to apply");
                }
            }
            KeyCode::Char('n') => {
                if let Some(task) = self.selected_task() {
                    let id = task.id;
                    self.input = InputField::with_value(task.note.as_deref().unwrap_or(""));
                    self.input_target = InputTarget::EditNote { id };
                    self.set_status("Note: Enter to save, empty clears, Esc to cancel");
                }
            }
            KeyCode::Char(' ') | KeyCode::Char('c') => {
                if let Some(id) = self.selected_task_id() {
                    let date = self.selected_date();
                    self.store.toggle_complete(id, date);
                    self.save_store();
                }
            }
            KeyCode::Char('d') => {
                if let Some(id) = self.selected_task_id() {
                    let date = self.selected_date();
                    self.store.delete(id, date);
                    self.save_store();
                    self.clamp_selection();
                    self.set_status(format!("Deleted task {id}"));
                }
            }

            KeyCode::Char('s') => {
                self.screen = Screen::Settings;
                self.settings_row = 0;
            }
            KeyCode::Char('h') | KeyCode::Char('?') => {
                self.set_status(
                    "a: Add | e: Edit | n: Note | Space: Done | d: Delete | Ctrl+arrows: Move | [/]: Week | s: Tags | Ctrl+K: Assist | q: Quit",
                );
            }
            _ => {}
        }
        Ok(false)
    }

    /// Move the selected card to the adjacent day, following it across the
    /// week boundary when needed.
    fn move_card(&mut self, dir: i64) {
        let Some(id) = self.selected_task_id() else {
            return;
        };
        let target = self.selected_date() + Duration::days(dir);
        self.store.reschedule(id, target);
        self.save_store();

        if target < self.week_anchor {
            self.week_anchor -= Duration::days(7);
            self.selected_col = DAYS_PER_WEEK - 1;
        } else if target >= self.week_anchor + Duration::days(DAYS_PER_WEEK as i64) {
            self.week_anchor += Duration::days(7);
            self.selected_col = 0;
        } else {
            self.selected_col = (target - self.week_anchor).num_days() as usize;
        }
        // Rescheduling appends, so the card is the last incomplete one.
        let order = self.store.display_order(target);
        let bucket = self.store.bucket(target);
        self.selected_card = order
            .iter()
            .position(|&i| bucket[i].id == id)
            .unwrap_or(0);
    }

    /// Swap the selected card with its display neighbour within the day.
    fn shift_card(&mut self, dir: i64) {
        let date = self.selected_date();
        let order = self.store.display_order(date);
        let pos = self.selected_card;
        let neighbour = pos as i64 + dir;
        if neighbour < 0 || neighbour as usize >= order.len() {
            return;
        }
        let src = order[pos];
        let dst = order[neighbour as usize];
        self.store.reorder(date, src, date, dst);
        self.save_store();
        self.selected_card = neighbour as usize;
    }

    // --- settings screen ---------------------------------------------------

    /// Number of selectable rows: every tag plus the divider row.
    fn settings_rows(&self) -> usize {
        self.registry.tags.len() + 1
    }

    /// Map a settings row to a tag index; `None` is the divider row.
    fn row_tag_index(&self, row: usize) -> Option<usize> {
        if row < self.registry.focus_count {
            Some(row)
        } else if row == self.registry.focus_count {
            None
        } else {
            Some(row - 1)
        }
    }

    fn handle_settings_input(&mut self, key: KeyCode, modifiers: KeyModifiers) -> bool {
        self.status_message.clear();
        match key {
            KeyCode::Esc | KeyCode::Char('s') => {
                self.screen = Screen::Board;
            }
            KeyCode::Char('q') => return true,
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return true,

            KeyCode::Up if modifiers.contains(KeyModifiers::CONTROL) => self.move_settings_row(-1),
            KeyCode::Down if modifiers.contains(KeyModifiers::CONTROL) => self.move_settings_row(1),

            KeyCode::Up => {
                if self.settings_row > 0 {
                    self.settings_row -= 1;
                }
            }
            KeyCode::Down => {
                if self.settings_row + 1 < self.settings_rows() {
                    self.settings_row += 1;
                }
            }

            KeyCode::Char('a') => {
                self.input = InputField::new();
                self.input_target = InputTarget::TagAdd;
                self.set_status("New tag name, Enter to add");
            }
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(index) = self.row_tag_index(self.settings_row) {
                    self.input = InputField::with_value(&self.registry.tags[index]);
                    self.input_target = InputTarget::TagRename { index };
                    self.set_status("Rename tag: empty removes it, Enter to apply");
                }
            }
            KeyCode::Char('d') => {
                if let Some(index) = self.row_tag_index(self.settings_row) {
                    let name = self.registry.tags[index].clone();
                    self.registry.remove_tag(index);
                    self.save_registry();
                    if self.settings_row + 1 >= self.settings_rows() && self.settings_row > 0 {
                        self.settings_row -= 1;
                    }
                    self.set_status(format!("Removed '{name}' (tasks keep the old value)"));
                }
            }
            KeyCode::Char('o') => {
                if let Some(index) = self.row_tag_index(self.settings_row) {
                    let tag = &self.registry.tags[index];
                    let current = self.registry.objective(tag).unwrap_or("");
                    self.input = InputField::with_value(current);
                    self.input_target = InputTarget::Objective { index };
                    self.set_status("Objective: Enter to save, empty clears");
                }
            }
            KeyCode::Char('h') | KeyCode::Char('?') => {
                self.set_status(
                    "Ctrl+Up/Down: Move row (divider too) | a: Add | e: Rename | d: Remove | o: Objective | Esc: Back",
                );
            }
            _ => {}
        }
        false
    }

    /// Move the selected settings row by one. Swapping a tag with the
    /// divider, or moving the divider itself, changes the focus count
    /// instead of reordering tags.
    fn move_settings_row(&mut self, dir: i64) {
        let row = self.settings_row;
        let target = row as i64 + dir;
        if target < 0 || target as usize >= self.settings_rows() {
            return;
        }
        let target = target as usize;

        match (self.row_tag_index(row), self.row_tag_index(target)) {
            // Divider row moved: the focus boundary shifts.
            (None, _) => {
                let n = if dir < 0 {
                    self.registry.focus_count.saturating_sub(1)
                } else {
                    self.registry.focus_count + 1
                };
                self.registry.set_focus_count(n);
            }
            // Tag crossing the divider: order unchanged, boundary shifts so
            // the tag lands on the other side. Moving down shrinks the focus
            // set, moving up grows it.
            (Some(_), None) => {
                let n = if dir < 0 {
                    self.registry.focus_count + 1
                } else {
                    self.registry.focus_count.saturating_sub(1)
                };
                self.registry.set_focus_count(n);
            }
            // Tag swapping with a tag.
            (Some(from), Some(to)) => {
                self.registry.reorder_tags(from, to);
            }
        }
        self.save_registry();
        self.settings_row = target;
    }

    // --- input line --------------------------------------------------------

    fn handle_input_line(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => {
                if self.input_target == InputTarget::Assist {
                    self.close_assist_panel();
                } else {
                    self.input_target = InputTarget::None;
                    self.status_message.clear();
                }
            }
            KeyCode::Enter => self.submit_input(),
            KeyCode::Backspace => self.input.handle_backspace(),
            KeyCode::Left => self.input.move_cursor_left(),
            KeyCode::Right => self.input.move_cursor_right(),
            KeyCode::Char(c) => {
                // The assist input stays read-only while a request runs.
                if !(self.input_target == InputTarget::Assist && self.assist.pending) {
                    self.input.handle_char(c);
                }
            }
            _ => {}
        }
    }

    fn submit_input(&mut self) {
        match self.input_target {
            InputTarget::None => {}
            InputTarget::QuickAdd => {
                let entry = self.input.take();
                let new = parse_quick_entry(&entry);
                if let Some(tag) = &new.tag {
                    self.registry.ensure_tag(tag);
                    self.save_registry();
                }
                let date = self.selected_date();
                match self.store.add(date, new) {
                    Some(id) => {
                        self.save_store();
                        self.set_status(format!("Added task {id}"));
                    }
                    None => self.set_status("Title cannot be empty"),
                }
                self.input_target = InputTarget::None;
            }
            InputTarget::EditTask { id } => {
                let entry = self.input.take();
                let new = parse_quick_entry(&entry);
                if new.title.trim().is_empty() {
                    self.set_status("Title cannot be empty");
                    self.input_target = InputTarget::None;
                    return;
                }
                if let Some(tag) = &new.tag {
                    self.registry.ensure_tag(tag);
                    self.save_registry();
                }
                let date = self.selected_date();
                let patch = TaskPatch {
                    title: Some(new.title),
                    tag: Some(new.tag),
                    duration: Some(new.duration),
                    ..Default::default()
                };
                if self.store.edit(id, date, &patch) {
                    self.save_store();
                    self.set_status(format!("Updated task {id}"));
                } else {
                    self.set_status(format!("Task {id} not found"));
                }
                self.input_target = InputTarget::None;
            }
            InputTarget::EditNote { id } => {
                let text = self.input.take();
                let date = self.selected_date();
                let patch = TaskPatch {
                    note: Some((!text.trim().is_empty()).then(|| text.trim().to_string())),
                    ..Default::default()
                };
                if self.store.edit(id, date, &patch) {
                    self.save_store();
                }
                self.input_target = InputTarget::None;
                self.status_message.clear();
            }
            InputTarget::Assist => self.submit_assist_request(),
            InputTarget::TagAdd => {
                let name = self.input.take();
                if self.registry.add_tag(&name) {
                    self.save_registry();
                    self.set_status(format!("Added tag '{}'", name.trim()));
                } else {
                    self.set_status("Tag is empty or already present");
                }
                self.input_target = InputTarget::None;
            }
            InputTarget::TagRename { index } => {
                let name = self.input.take();
                self.registry.rename_tag(index, &name);
                self.save_registry();
                if self.settings_row >= self.settings_rows() {
                    self.settings_row = self.settings_rows() - 1;
                }
                self.input_target = InputTarget::None;
                self.status_message.clear();
            }
            InputTarget::Objective { index } => {
                let text = self.input.take();
                let tag = self.registry.tags[index].clone();
                self.registry.set_objective(&tag, text.trim());
                self.save_registry();
                self.input_target = InputTarget::None;
                self.status_message.clear();
            }
        }
    }

    // --- assist panel ------------------------------------------------------

    fn toggle_assist_panel(&mut self) {
        if self.assist.open {
            self.close_assist_panel();
        } else {
            self.assist.open = true;
            self.input = InputField::new();
            self.input_target = InputTarget::Assist;
            self.set_status("Describe tasks to add, modify or reschedule, Enter to send");
        }
    }

    /// Close the panel. Bumping the generation means an in-flight reply is
    /// discarded on arrival rather than applied silently.
    fn close_assist_panel(&mut self) {
        self.assist.open = false;
        self.assist.pending = false;
        self.assist.seq += 1;
        self.assist.rx = None;
        self.input_target = InputTarget::None;
        self.status_message.clear();
    }

    fn submit_assist_request(&mut self) {
        if self.assist.pending || self.input.value.trim().is_empty() {
            return;
        }
        let request = self.input.value.trim().to_string();
        let client = AssistClient::new(AssistConfig::from_env());
        let tags = self.registry.tags.clone();
        let today = Local::now().date_naive();
        let context = assist::relevant_tasks_json(&self.store, today);
        let seq = self.assist.seq;

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let result = client.complete(&request, &tags, today, &context);
            let _ = tx.send(AssistReply { seq, result });
        });

        self.assist.pending = true;
        self.assist.rx = Some(rx);
        self.set_status("Processing...");
    }

    /// Apply any finished assist request whose generation still matches.
    fn poll_assist(&mut self) {
        let Some(rx) = &self.assist.rx else {
            return;
        };
        let Ok(reply) = rx.try_recv() else {
            return;
        };
        self.assist.rx = None;
        if reply.seq != self.assist.seq {
            // Stale reply from a closed panel: discard.
            return;
        }
        self.assist.pending = false;

        match reply.result {
            Ok(response) => {
                let planned = assist::parse_planned(&response);
                let today = Local::now().date_naive();
                let ids = assist::apply_planned(
                    &mut self.store,
                    &mut self.registry,
                    &planned,
                    today,
                );
                self.save_store();
                self.save_registry();
                self.input = InputField::new();
                self.set_status(format!("Created {} task(s)", ids.len()));
            }
            Err(e) => {
                // Input stays as typed so the request can be retried by hand.
                self.set_status(format!("{e}"));
            }
        }
    }

    // --- rendering ---------------------------------------------------------

    fn render(&mut self, f: &mut Frame) {
        let input_open = self.input_target != InputTarget::None;
        let constraints = if input_open {
            vec![
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
                Constraint::Length(1),
            ]
        } else {
            vec![
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(1),
            ]
        };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(f.area());

        self.render_header(f, chunks[0]);
        match self.screen {
            Screen::Board => self.render_board(f, chunks[1]),
            Screen::Settings => self.render_settings(f, chunks[1]),
        }
        if input_open {
            self.render_input_line(f, chunks[2]);
            self.render_status_bar(f, chunks[3]);
        } else {
            self.render_status_bar(f, chunks[2]);
        }
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let today = Local::now().date_naive();
        let summary = week_summary(&self.store, &self.registry, today);

        let focus_color = if summary.key_task_percentage >= 70 {
            HEALTHY_GREEN
        } else {
            ALERT_RED
        };
        let filled_color = if summary.filled_percentage >= 70 {
            HEALTHY_GREEN
        } else {
            ALERT_RED
        };

        let header_text = vec![Line::from(vec![
            Span::styled("WEEKPLAN", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(format!("  {}  ", today)),
            Span::styled(
                format!(
                    "Focus {} / {} ({}%)",
                    format_hours(summary.key_task_time),
                    format_hours(summary.total_time),
                    summary.key_task_percentage
                ),
                Style::default().fg(focus_color),
            ),
            Span::raw("  "),
            Span::styled(
                format!(
                    "Filled {} / 40.0h ({}%)",
                    format_hours(summary.total_time),
                    summary.filled_percentage
                ),
                Style::default().fg(filled_color),
            ),
        ])];

        let header = Paragraph::new(header_text)
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
        f.render_widget(header, area);
    }

    fn render_board(&mut self, f: &mut Frame, area: Rect) {
        let constraints: Vec<Constraint> = (0..DAYS_PER_WEEK)
            .map(|_| Constraint::Percentage(100 / DAYS_PER_WEEK as u16))
            .collect();
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(constraints)
            .split(area);

        for (col, &column_area) in columns.iter().enumerate() {
            self.render_column(f, column_area, col);
        }
    }

    fn render_column(&mut self, f: &mut Frame, area: Rect, col: usize) {
        let date = self.column_date(col);
        let today = Local::now().date_naive();
        let is_selected = col == self.selected_col;
        let is_today = date == today;
        let summary = day_summary(&self.store, &self.registry, date);

        let title = format!(
            "{} {} {}%",
            date.format("%a %d"),
            format_hours(summary.total_time),
            summary.focus_percentage
        );

        let border_style = if is_selected {
            Style::default().fg(TODAY_BLUE).add_modifier(Modifier::BOLD)
        } else if is_today {
            Style::default().fg(TODAY_BLUE)
        } else {
            Style::default()
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(border_style);
        let inner = block.inner(area);
        f.render_widget(block, area);

        let order = self.store.display_order(date);
        if order.is_empty() || inner.height == 0 {
            return;
        }

        let available_height = inner.height as usize;
        let visible_cards = (available_height / CARD_HEIGHT).max(1);

        // Keep the selected card scrolled into view.
        let scroll = if is_selected {
            let start = self.col_scroll[col];
            if self.selected_card < start {
                self.col_scroll[col] = self.selected_card;
            } else if self.selected_card >= start + visible_cards {
                self.col_scroll[col] = self.selected_card + 1 - visible_cards;
            }
            self.col_scroll[col]
        } else {
            self.col_scroll[col].min(order.len().saturating_sub(1))
        };

        let bucket = self.store.bucket(date);
        let mut y = 0usize;
        let mut rendered = 0usize;
        for (pos, &stored) in order.iter().enumerate().skip(scroll) {
            if y + CARD_HEIGHT > available_height {
                break;
            }
            let card_area = Rect {
                x: inner.x,
                y: inner.y + y as u16,
                width: inner.width,
                height: CARD_HEIGHT as u16,
            };
            let card_selected = is_selected && pos == self.selected_card;
            self.render_card(f, card_area, &bucket[stored], card_selected);
            y += CARD_HEIGHT;
            rendered += 1;
        }

        if scroll > 0 {
            let indicator = Paragraph::new(format!("▲ +{scroll}"))
                .style(Style::default().fg(Color::Cyan));
            f.render_widget(
                indicator,
                Rect { x: inner.x, y: inner.y, width: inner.width, height: 1 },
            );
        }
        let below = order.len() - scroll - rendered;
        if below > 0 {
            let indicator = Paragraph::new(format!("▼ +{below}"))
                .style(Style::default().fg(Color::Cyan));
            f.render_widget(
                indicator,
                Rect {
                    x: inner.x,
                    y: inner.y + inner.height - 1,
                    width: inner.width,
                    height: 1,
                },
            );
        }
    }

    fn render_card(&self, f: &mut Frame, area: Rect, task: &Task, is_selected: bool) {
        let style = if is_selected {
            Style::default()
                .bg(TODAY_BLUE)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD)
        } else if task.completed {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().bg(Color::DarkGray)
        };

        let mut text = Vec::new();
        let title_style = if task.completed {
            Style::default().add_modifier(Modifier::CROSSED_OUT)
        } else {
            Style::default()
        };
        for line in wrap_title(&task.title, area.width.saturating_sub(2) as usize, 2) {
            text.push(Line::from(Span::styled(line, title_style)));
        }

        let mut meta = vec![Span::raw(format_duration(task.duration as u64))];
        if let Some(tag) = &task.tag {
            let tag_style = if self.registry.is_focus(tag) {
                Style::default().fg(FOCUS_TAG).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            meta.push(Span::raw(" "));
            meta.push(Span::styled(format!("#{tag}"), tag_style));
        }
        if task.note.is_some() {
            meta.push(Span::raw(" ▪"));
        }
        if task.completed {
            meta.push(Span::raw(" ✓"));
        }
        text.push(Line::from(meta));

        let card = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL))
            .style(style)
            .wrap(Wrap { trim: true });
        f.render_widget(card, area);
    }

    fn render_settings(&self, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Tags (first rows above the divider are focus tags)");
        let inner = block.inner(area);
        f.render_widget(block, area);

        let mut lines = Vec::new();
        let mut row = 0usize;
        for (i, tag) in self.registry.tags.iter().enumerate() {
            if i == self.registry.focus_count {
                lines.push(self.settings_line(row, None));
                row += 1;
            }
            lines.push(self.settings_line(row, Some(tag)));
            row += 1;
        }
        if self.registry.focus_count >= self.registry.tags.len() {
            lines.push(self.settings_line(row, None));
        }

        let list = Paragraph::new(lines);
        f.render_widget(list, inner);
    }

    fn settings_line(&self, row: usize, tag: Option<&str>) -> Line<'static> {
        let selected = row == self.settings_row;
        match tag {
            Some(tag) => {
                let style = if selected {
                    Style::default()
                        .bg(TODAY_BLUE)
                        .fg(Color::Black)
                        .add_modifier(Modifier::BOLD)
                } else if self.registry.is_focus(tag) {
                    Style::default().fg(FOCUS_TAG)
                } else {
                    Style::default()
                };
                let objective = self
                    .registry
                    .objective(tag)
                    .map(|o| format!("  — {o}"))
                    .unwrap_or_default();
                Line::from(Span::styled(format!(" {tag}{objective}"), style))
            }
            None => {
                let style = if selected {
                    Style::default().bg(TODAY_BLUE).fg(Color::Black)
                } else {
                    Style::default().fg(DIVIDER_GREY)
                };
                Line::from(Span::styled(" ───── focus divider ─────", style))
            }
        }
    }

    fn render_input_line(&self, f: &mut Frame, area: Rect) {
        let title = match self.input_target {
            InputTarget::QuickAdd => "Add task",
            InputTarget::EditTask { .. } => "Edit task",
            InputTarget::EditNote { .. } => "Note",
            InputTarget::Assist if self.assist.pending => "Assist (processing...)",
            InputTarget::Assist => "Assist",
            InputTarget::TagAdd => "New tag",
            InputTarget::TagRename { .. } => "Rename tag",
            InputTarget::Objective { .. } => "Objective",
            InputTarget::None => "",
        };
        let input = Paragraph::new(self.input.value.as_str())
            .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(input, area);
        f.set_cursor_position((area.x + 1 + self.input.cursor as u16, area.y + 1));
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let text = if !self.status_message.is_empty() {
            self.status_message.clone()
        } else {
            match self.screen {
                Screen::Board => format!(
                    "Week of {} | a: Add | Space: Done | Ctrl+arrows: Move | s: Tags | Ctrl+K: Assist | h: Help",
                    self.week_anchor
                ),
                Screen::Settings => {
                    "Ctrl+Up/Down: Move | a: Add | e: Rename | d: Remove | o: Objective | Esc: Back"
                        .to_string()
                }
            }
        };
        let status = Paragraph::new(text)
            .style(Style::default().bg(TODAY_BLUE).fg(Color::White))
            .alignment(Alignment::Left);
        f.render_widget(status, area);
    }
}

/// Word-wrap a title into at most `max_lines` lines of `width` characters.
fn wrap_title(title: &str, width: usize, max_lines: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in title.split_whitespace() {
        if current.is_empty() {
            current = word.to_string();
        } else if current.chars().count() + 1 + word.chars().count() <= width {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(current.clone());
            current = word.to_string();
            if lines.len() >= max_lines {
                break;
            }
        }
    }
    if !current.is_empty() && lines.len() < max_lines {
        lines.push(current);
    }
    lines
}

/// Parse a quick-entry line: words form the title, a `#word` token sets the
/// tag and an `@N` token sets the duration in minutes.
fn parse_quick_entry(entry: &str) -> NewTask {
    let mut title_words = Vec::new();
    let mut tag = None;
    let mut duration = 30u32;

    for token in entry.split_whitespace() {
        if let Some(t) = token.strip_prefix('#') {
            if !t.is_empty() {
                tag = Some(t.to_string());
                continue;
            }
        }
        if let Some(d) = token.strip_prefix('@') {
            if let Ok(minutes) = d.parse::<u32>() {
                if minutes > 0 {
                    duration = minutes;
                    continue;
                }
            }
        }
        title_words.push(token);
    }

    NewTask {
        title: title_words.join(" "),
        tag,
        duration,
    }
}

/// Format a task back into quick-entry syntax for editing.
fn format_quick_entry(task: &Task) -> String {
    let mut entry = task.title.clone();
    if let Some(tag) = &task.tag {
        entry.push_str(&format!(" #{tag}"));
    }
    entry.push_str(&format!(" @{}", task.duration));
    entry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quick_entry_parses_title_tag_and_duration() {
        let new = parse_quick_entry("Call investor #Fundraising @45");
        assert_eq!(new.title, "Call investor");
        assert_eq!(new.tag.as_deref(), Some("Fundraising"));
        assert_eq!(new.duration, 45);
    }

    #[test]
    fn quick_entry_defaults_and_ignores_malformed_markers() {
        let new = parse_quick_entry("Send invoice @soon");
        assert_eq!(new.title, "Send invoice @soon");
        assert_eq!(new.tag, None);
        assert_eq!(new.duration, 30);
    }

    #[test]
    fn quick_entry_round_trips_through_format() {
        let task = Task {
            id: 1,
            title: "Write report".into(),
            tag: Some("Admin".into()),
            duration: 60,
            completed: false,
            note: None,
        };
        let new = parse_quick_entry(&format_quick_entry(&task));
        assert_eq!(new.title, task.title);
        assert_eq!(new.tag, task.tag);
        assert_eq!(new.duration, task.duration);
    }

    #[test]
    fn titles_wrap_to_at_most_two_lines() {
        let lines = wrap_title("one two three four five six seven", 9, 2);
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.chars().count() <= 9));
    }

    fn settings_app(focus_count: usize) -> (tempfile::TempDir, BoardApp) {
        let dir = tempfile::tempdir().unwrap();
        let mut app = BoardApp::new(dir.path()).unwrap();
        app.registry = TagRegistry {
            tags: vec!["A".into(), "B".into(), "C".into()],
            objectives: Default::default(),
            focus_count,
        };
        app.screen = Screen::Settings;
        (dir, app)
    }

    #[test]
    fn moving_a_tag_down_across_the_divider_demotes_it() {
        // Rows: A, B, divider, C. Moving B down must land it below the
        // divider, keeping the tag order and following it with the cursor.
        let (_dir, mut app) = settings_app(2);
        app.settings_row = 1;
        app.move_settings_row(1);
        assert_eq!(app.registry.focus_count, 1);
        assert_eq!(app.registry.tags, ["A", "B", "C"]);
        assert_eq!(app.registry.focus_tags(), ["A"]);
        assert_eq!(app.row_tag_index(app.settings_row), Some(1));
    }

    #[test]
    fn moving_a_tag_up_across_the_divider_promotes_it() {
        // Rows: A, divider, B, C. Moving B up makes it a focus tag.
        let (_dir, mut app) = settings_app(1);
        app.settings_row = 2;
        app.move_settings_row(-1);
        assert_eq!(app.registry.focus_count, 2);
        assert_eq!(app.registry.tags, ["A", "B", "C"]);
        assert_eq!(app.registry.focus_tags(), ["A", "B"]);
        assert_eq!(app.row_tag_index(app.settings_row), Some(1));
    }

    #[test]
    fn moving_the_divider_itself_shifts_the_focus_count() {
        let (_dir, mut app) = settings_app(2);
        app.settings_row = 2;
        app.move_settings_row(-1);
        assert_eq!(app.registry.focus_count, 1);
        assert_eq!(app.settings_row, 1);
        app.move_settings_row(1);
        assert_eq!(app.registry.focus_count, 2);
        assert_eq!(app.settings_row, 2);
    }
}
