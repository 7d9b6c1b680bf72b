use crate::model::{Task, TaskId};
use crate::state::{AppState, Update};
use crate::sync::{self, SyncEvent, SyncSubscription};
use anyhow::Result;
use chrono::{Datelike, Local, NaiveDate};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_secs(3);

pub fn run(state: AppState) -> Result<()> {
    let subscription = match sync::load_config()? {
        Some(config) => Some(sync::subscribe(config, POLL_INTERVAL)?),
        None => None,
    };
    let mut terminal = setup_terminal()?;
    let mut app = App::new(state, subscription);
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    result
}

struct App {
    state: AppState,
    subscription: Option<SyncSubscription>,
    selected_list: usize,
    selected_task: usize,
    scroll_offsets: Vec<usize>,
    last_save: Instant,
    status: String,
    mode: Mode,
}

enum Mode {
    Normal,
    TaskForm {
        editing: Option<TaskId>,
        form: TaskForm,
    },
    ListForm {
        renaming: Option<String>,
        input: FieldValue,
    },
    ConfirmDeleteTask {
        id: TaskId,
    },
    ConfirmDeleteList {
        name: String,
    },
}

struct TaskForm {
    text: FieldValue,
    due: FieldValue,
    field: FormField,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum FormField {
    Text,
    Due,
}

#[derive(Clone)]
struct FieldValue {
    value: String,
    cursor: usize,
}

impl FieldValue {
    fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    fn move_left(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor = prev_grapheme(self.cursor, &self.value);
    }

    fn move_right(&mut self) {
        if self.cursor >= self.value.len() {
            return;
        }
        self.cursor = next_grapheme(self.cursor, &self.value);
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = prev_grapheme(self.cursor, &self.value);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }
}

impl TaskForm {
    fn new() -> Self {
        TaskForm {
            text: FieldValue::new(""),
            due: FieldValue::new(""),
            field: FormField::Text,
        }
    }

    fn from_task(task: &Task) -> Self {
        TaskForm {
            text: FieldValue::new(&task.text),
            due: FieldValue::new(
                &task
                    .due
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
            ),
            field: FormField::Text,
        }
    }

    fn next_field(&mut self) {
        self.field = match self.field {
            FormField::Text => FormField::Due,
            FormField::Due => FormField::Text,
        };
    }

    fn active_field_mut(&mut self) -> &mut FieldValue {
        match self.field {
            FormField::Text => &mut self.text,
            FormField::Due => &mut self.due,
        }
    }
}

impl App {
    fn new(state: AppState, subscription: Option<SyncSubscription>) -> Self {
        let status = format!("Loaded board from {}", state.location.path.display());
        let list_count = state.board.lists.len();
        let selected_list = state
            .board
            .lists
            .iter()
            .position(|l| l.name == state.current_list)
            .unwrap_or(0);
        App {
            state,
            subscription,
            selected_list,
            selected_task: 0,
            scroll_offsets: vec![0; list_count],
            last_save: Instant::now(),
            status,
            mode: Mode::Normal,
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            self.drain_sync_events();
            terminal.draw(|f| self.draw(f))?;
            if event::poll(Duration::from_millis(200))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key)? {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    fn drain_sync_events(&mut self) {
        let mut events = Vec::new();
        if let Some(subscription) = &self.subscription {
            while let Some(event) = subscription.try_recv() {
                events.push(event);
            }
        }
        for event in events {
            match event {
                SyncEvent::Snapshot(snapshot) => {
                    // A snapshot identical to the local board is our own
                    // write echoing back; only a differing one replaces it.
                    if sync::snapshots_differ(&self.state.board, &snapshot) {
                        self.apply_update(Update::ReplaceBoard(snapshot));
                    } else {
                        self.state.sync_status = sync::STATUS_SYNCED.to_string();
                    }
                }
                SyncEvent::RemoteEmpty => self.state.push_snapshot(),
                SyncEvent::Failed(status) => self.state.sync_status = status,
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        match self.mode {
            Mode::Normal => self.handle_normal_key(key),
            Mode::TaskForm { .. } | Mode::ListForm { .. } => {
                self.handle_form_key(key);
                Ok(false)
            }
            Mode::ConfirmDeleteTask { .. } | Mode::ConfirmDeleteList { .. } => {
                self.handle_confirm_key(key);
                Ok(false)
            }
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Left | KeyCode::Char('h') => self.prev_list(),
            KeyCode::Right | KeyCode::Char('l') => self.next_list(),
            KeyCode::Up | KeyCode::Char('k') => self.prev_task(),
            KeyCode::Down | KeyCode::Char('j') => self.next_task(),
            KeyCode::Char('n') => {
                self.mode = Mode::TaskForm {
                    editing: None,
                    form: TaskForm::new(),
                };
                self.status =
                    format!("New task in {} (Tab switch field, Enter save, Esc cancel)",
                        self.selected_list_name());
            }
            KeyCode::Char('e') => {
                if let Some(task) = self.current_task() {
                    let id = task.id;
                    let form = TaskForm::from_task(task);
                    self.mode = Mode::TaskForm {
                        editing: Some(id),
                        form,
                    };
                    self.status = format!("Editing task {}", id);
                } else {
                    self.status = "No task selected to edit".into();
                }
            }
            KeyCode::Char(' ') | KeyCode::Char('x') | KeyCode::Enter => {
                if let Some(id) = self.current_task_id() {
                    let list = self.selected_list_name();
                    self.apply_update(Update::ToggleTask { list, id });
                } else {
                    self.status = "No task selected to toggle".into();
                }
            }
            KeyCode::Char('d') => {
                if let Some(id) = self.current_task_id() {
                    self.mode = Mode::ConfirmDeleteTask { id };
                    self.status = format!("Delete task {}? (y to confirm, n/Esc to cancel)", id);
                } else {
                    self.status = "No task selected to delete".into();
                }
            }
            KeyCode::Char('N') => {
                self.mode = Mode::ListForm {
                    renaming: None,
                    input: FieldValue::new(""),
                };
                self.status = "New list (Enter save, Esc cancel)".into();
            }
            KeyCode::Char('R') => {
                let name = self.selected_list_name();
                self.mode = Mode::ListForm {
                    renaming: Some(name.clone()),
                    input: FieldValue::new(&name),
                };
                self.status = format!("Renaming {}", name);
            }
            KeyCode::Char('D') => {
                let name = self.selected_list_name();
                self.mode = Mode::ConfirmDeleteList { name: name.clone() };
                self.status = format!(
                    "Delete list {} and all its tasks? (y to confirm, n/Esc to cancel)",
                    name
                );
            }
            KeyCode::Char('s') => {
                self.state.push_snapshot();
                self.status = self.state.sync_status.clone();
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        let mut close_form = false;
        let mut mode = std::mem::replace(&mut self.mode, Mode::Normal);
        match &mut mode {
            Mode::TaskForm { editing, form } => match key.code {
                KeyCode::Esc => {
                    close_form = true;
                    self.status = "Canceled".into();
                }
                KeyCode::Tab | KeyCode::BackTab => form.next_field(),
                KeyCode::Left => form.active_field_mut().move_left(),
                KeyCode::Right => form.active_field_mut().move_right(),
                KeyCode::Backspace => form.active_field_mut().backspace(),
                KeyCode::Enter => close_form = self.submit_task_form(editing.as_ref(), form),
                KeyCode::Char(c) => {
                    if !key
                        .modifiers
                        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                    {
                        form.active_field_mut().insert_char(c);
                    }
                }
                _ => {}
            },
            Mode::ListForm { renaming, input } => match key.code {
                KeyCode::Esc => {
                    close_form = true;
                    self.status = "Canceled".into();
                }
                KeyCode::Left => input.move_left(),
                KeyCode::Right => input.move_right(),
                KeyCode::Backspace => input.backspace(),
                KeyCode::Enter => close_form = self.submit_list_form(renaming.as_deref(), input),
                KeyCode::Char(c) => {
                    if !key
                        .modifiers
                        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                    {
                        input.insert_char(c);
                    }
                }
                _ => {}
            },
            _ => {}
        }
        self.mode = if close_form { Mode::Normal } else { mode };
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) {
        let confirmed = matches!(key.code, KeyCode::Char('y') | KeyCode::Enter);
        let canceled = matches!(key.code, KeyCode::Char('n') | KeyCode::Esc);
        if !confirmed && !canceled {
            return;
        }
        let mode = std::mem::replace(&mut self.mode, Mode::Normal);
        if canceled {
            self.status = "Canceled".into();
            return;
        }
        match mode {
            Mode::ConfirmDeleteTask { id } => {
                let list = self.selected_list_name();
                self.apply_update(Update::DeleteTask { list, id });
            }
            Mode::ConfirmDeleteList { name } => {
                self.apply_update(Update::DeleteList { name });
                self.selected_list = self
                    .state
                    .board
                    .lists
                    .iter()
                    .position(|l| l.name == self.state.current_list)
                    .unwrap_or(0);
                self.selected_task = 0;
            }
            _ => {}
        }
    }

    fn submit_task_form(&mut self, editing: Option<&TaskId>, form: &TaskForm) -> bool {
        let due = match parse_due_field(&form.due.value) {
            Ok(due) => due,
            Err(message) => {
                self.status = message;
                return false;
            }
        };
        let list = self.selected_list_name();
        match editing {
            None => {
                let text = form.text.value.clone();
                let list_name = list.clone();
                match self.state.apply(Update::AddTask { list, text, due }) {
                    Ok(message) => {
                        self.on_applied(message);
                        let new_id = self
                            .state
                            .board
                            .find_list(&list_name)
                            .and_then(|l| l.tasks.last())
                            .map(|t| t.id);
                        if let Some(new_id) = new_id {
                            self.select_task_by_id(new_id);
                        }
                        true
                    }
                    Err(err) => {
                        self.status = format!("Could not add: {}", err);
                        false
                    }
                }
            }
            Some(&id) => {
                let text = form.text.value.clone();
                let result = self
                    .state
                    .apply(Update::EditTaskText {
                        list: list.clone(),
                        id,
                        text,
                    })
                    .and_then(|_| self.state.apply(Update::SetDue { list, id, due }));
                match result {
                    Ok(_) => {
                        self.on_applied(format!("Updated task {}", id));
                        self.select_task_by_id(id);
                        true
                    }
                    Err(err) => {
                        self.status = format!("Could not edit: {}", err);
                        false
                    }
                }
            }
        }
    }

    fn submit_list_form(&mut self, renaming: Option<&str>, input: &FieldValue) -> bool {
        let name = input.value.clone();
        let result = match renaming {
            None => self.state.apply(Update::AddList { name }),
            Some(old) => self.state.apply(Update::RenameList {
                old: old.to_string(),
                new: name,
            }),
        };
        match result {
            Ok(message) => {
                self.on_applied(message);
                self.selected_list = self
                    .state
                    .board
                    .lists
                    .iter()
                    .position(|l| l.name == self.state.current_list)
                    .unwrap_or(self.selected_list);
                self.selected_task = 0;
                true
            }
            Err(err) => {
                self.status = format!("Could not save list: {}", err);
                false
            }
        }
    }

    fn apply_update(&mut self, update: Update) {
        match self.state.apply(update) {
            Ok(message) => self.on_applied(message),
            Err(err) => self.status = format!("{}", err),
        }
    }

    fn on_applied(&mut self, message: String) {
        self.last_save = Instant::now();
        self.status = message;
        self.clamp_selection();
    }

    fn clamp_selection(&mut self) {
        let list_count = self.state.board.lists.len();
        if self.scroll_offsets.len() < list_count {
            self.scroll_offsets.resize(list_count, 0);
        }
        if list_count == 0 {
            self.selected_list = 0;
            self.selected_task = 0;
            return;
        }
        self.selected_list = self.selected_list.min(list_count - 1);
        let task_count = self.state.board.lists[self.selected_list].tasks.len();
        self.selected_task = if task_count == 0 {
            0
        } else {
            self.selected_task.min(task_count - 1)
        };
    }

    fn prev_list(&mut self) {
        if self.selected_list > 0 {
            self.selected_list -= 1;
            self.selected_task = 0;
            self.state.current_list = self.selected_list_name();
        }
    }

    fn next_list(&mut self) {
        if self.selected_list + 1 < self.state.board.lists.len() {
            self.selected_list += 1;
            self.selected_task = 0;
            self.state.current_list = self.selected_list_name();
        }
    }

    fn prev_task(&mut self) {
        if self.selected_task > 0 {
            self.selected_task -= 1;
        }
    }

    fn next_task(&mut self) {
        if let Some(list) = self.state.board.lists.get(self.selected_list) {
            if self.selected_task + 1 < list.tasks.len() {
                self.selected_task += 1;
            }
        }
    }

    fn selected_list_name(&self) -> String {
        self.state
            .board
            .lists
            .get(self.selected_list)
            .map(|l| l.name.clone())
            .unwrap_or_else(|| "Main".into())
    }

    fn current_task(&self) -> Option<&Task> {
        let list = self.state.board.lists.get(self.selected_list)?;
        list.sorted_tasks().get(self.selected_task).copied()
    }

    fn current_task_id(&self) -> Option<TaskId> {
        self.current_task().map(|t| t.id)
    }

    fn select_task_by_id(&mut self, id: TaskId) {
        if let Some(list) = self.state.board.lists.get(self.selected_list) {
            if let Some(idx) = list.sorted_tasks().iter().position(|t| t.id == id) {
                self.selected_task = idx;
            }
        }
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, layout[0]);
        self.draw_board(f, layout[1]);
        self.draw_footer(f, layout[2]);

        match &self.mode {
            Mode::TaskForm { editing, form } => {
                let title = if editing.is_some() {
                    "Edit Task"
                } else {
                    "New Task"
                };
                self.draw_task_form(f, title, form);
            }
            Mode::ListForm { renaming, input } => {
                let title = if renaming.is_some() {
                    "Rename List"
                } else {
                    "New List"
                };
                self.draw_list_form(f, title, input);
            }
            Mode::ConfirmDeleteTask { id } => self.draw_confirm_task(f, *id),
            Mode::ConfirmDeleteList { name } => self.draw_confirm_list(f, name),
            Mode::Normal => {}
        }
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let scope = match self.state.location.scope {
            crate::storage::BoardScope::Project => "project",
            crate::storage::BoardScope::Global => "global",
        };
        let sync_color = if self.state.sync_status == sync::STATUS_SYNCED {
            Color::LightGreen
        } else if self.state.sync_status == sync::STATUS_OFFLINE {
            Color::Gray
        } else {
            Color::LightRed
        };
        let title = Line::from(vec![
            Span::styled(
                "cozio ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(scope, Style::default().fg(Color::Green)),
            Span::raw("  •  "),
            Span::styled(
                format!("{}", self.state.location.path.display()),
                Style::default().fg(Color::DarkGray),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("saved {}", format_elapsed(self.last_save)),
                Style::default().fg(Color::Gray),
            ),
            Span::raw("  •  "),
            Span::styled(&self.state.sync_status, Style::default().fg(sync_color)),
        ]);

        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let paragraph = Paragraph::new(title)
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_board(&mut self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let today = Local::now().date_naive();
        let list_count = self.state.board.lists.len();
        if list_count == 0 {
            let msg = Paragraph::new("No lists defined")
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).title("cozio"));
            f.render_widget(Clear, area);
            f.render_widget(msg, area);
            return;
        }

        if self.scroll_offsets.len() < list_count {
            self.scroll_offsets.resize(list_count, 0);
        }

        let chunk_constraints = self
            .state
            .board
            .lists
            .iter()
            .map(|_| Constraint::Percentage((100 / list_count as u16).max(1)))
            .collect::<Vec<_>>();

        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(chunk_constraints)
            .split(area);

        for (idx, list) in self.state.board.lists.iter().enumerate() {
            let accent = color_for_index(idx);
            let item_width = chunks[idx].width.saturating_sub(2);
            let sorted = list.sorted_tasks();
            let items = if sorted.is_empty() {
                vec![ListItem::new(Line::from(Span::styled(
                    "No tasks here!",
                    Style::default().fg(Color::DarkGray),
                )))]
            } else {
                sorted
                    .iter()
                    .enumerate()
                    .map(|(t_idx, task)| {
                        task_item(
                            task,
                            item_width,
                            idx == self.selected_list && t_idx == self.selected_task,
                            today,
                        )
                    })
                    .collect::<Vec<_>>()
            };

            let mut list_state = ListState::default();
            let mut offset = *self.scroll_offsets.get(idx).unwrap_or(&0);
            let viewport = (chunks[idx].height.saturating_sub(2) as usize) / 3;
            if idx == self.selected_list && !sorted.is_empty() {
                let selected = self.selected_task.min(sorted.len() - 1);
                offset = adjust_offset(selected, offset, viewport.max(1), 1, sorted.len());
                self.scroll_offsets[idx] = offset;
                list_state.select(Some(selected));
                *list_state.offset_mut() = offset;
            } else {
                *list_state.offset_mut() = offset.min(sorted.len().saturating_sub(1));
            }

            let open = list.tasks.iter().filter(|t| !t.completed).count();
            let title = format!("{} ({} open / {})", list.name, open, list.tasks.len());
            let block = Block::default()
                .title(Span::styled(
                    title,
                    Style::default()
                        .fg(accent)
                        .add_modifier(if idx == self.selected_list {
                            Modifier::BOLD | Modifier::UNDERLINED
                        } else {
                            Modifier::BOLD
                        }),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(accent));

            let widget = List::new(items).block(block);
            f.render_stateful_widget(widget, chunks[idx], &mut list_state);
        }
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help_bar = Paragraph::new(help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(help_bar, rows[0]);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(rows[1]);

        let status = Paragraph::new(self.status.clone())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(status, bottom[0]);

        let detail = Paragraph::new(self.detail_line())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray))
                    .title("Selected"),
            );
        f.render_widget(detail, bottom[1]);
    }

    fn detail_line(&self) -> Line<'static> {
        let today = Local::now().date_naive();
        match self.current_task() {
            Some(task) => {
                let mut spans = vec![Span::styled(
                    task.text.clone(),
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                )];
                if let Some(due) = task.due {
                    spans.push(Span::raw("  "));
                    let overdue = task.is_overdue(today);
                    spans.push(Span::styled(
                        format_due_relative(due, today),
                        Style::default().fg(if overdue {
                            Color::LightRed
                        } else {
                            Color::LightYellow
                        }),
                    ));
                    if overdue {
                        spans.push(Span::styled(
                            " overdue",
                            Style::default()
                                .fg(Color::LightRed)
                                .add_modifier(Modifier::BOLD),
                        ));
                    }
                }
                if task.completed {
                    spans.push(Span::styled(
                        "  done",
                        Style::default().fg(Color::DarkGray),
                    ));
                }
                Line::from(spans)
            }
            None => Line::from("No task selected"),
        }
    }

    fn draw_task_form(&self, f: &mut ratatui::Frame<'_>, title: &str, form: &TaskForm) {
        let area = centered_rect(60, 40, f.size());
        let mut lines = Vec::new();
        lines.push(field_line("Task", &form.text, form.field == FormField::Text));
        lines.push(field_line(
            "Due (YYYY-MM-DD)",
            &form.due,
            form.field == FormField::Due,
        ));
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Enter to save • Esc to cancel • Tab to switch field",
            Style::default().fg(Color::Gray),
        )));
        let dialog = Paragraph::new(lines)
            .block(
                Block::default()
                    .title(Span::styled(
                        title,
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            )
            .wrap(Wrap { trim: true });

        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_list_form(&self, f: &mut ratatui::Frame<'_>, title: &str, input: &FieldValue) {
        let area = centered_rect(50, 30, f.size());
        let lines = vec![
            field_line("Name", input, true),
            Line::from(""),
            Line::from(Span::styled(
                "Enter to save • Esc to cancel",
                Style::default().fg(Color::Gray),
            )),
        ];
        let dialog = Paragraph::new(lines)
            .block(
                Block::default()
                    .title(Span::styled(
                        title,
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            )
            .wrap(Wrap { trim: true });

        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_confirm_task(&self, f: &mut ratatui::Frame<'_>, id: TaskId) {
        let text = self
            .state
            .board
            .find_list(&self.selected_list_name())
            .and_then(|l| l.tasks.iter().find(|t| t.id == id))
            .map(|t| t.text.clone())
            .unwrap_or_else(|| format!("task {}", id));
        self.draw_confirm(f, "Confirm Delete", &format!("Delete \"{}\"?", text));
    }

    fn draw_confirm_list(&self, f: &mut ratatui::Frame<'_>, name: &str) {
        self.draw_confirm(
            f,
            "Confirm Delete",
            &format!("Delete the list \"{}\" and all its tasks?", name),
        );
    }

    fn draw_confirm(&self, f: &mut ratatui::Frame<'_>, title: &str, question: &str) {
        let area = centered_rect(50, 30, f.size());
        let body = vec![
            Line::from(Span::styled(
                question.to_string(),
                Style::default()
                    .fg(Color::LightRed)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("Press y to confirm, n or Esc to cancel"),
        ];
        let dialog = Paragraph::new(body).alignment(Alignment::Center).block(
            Block::default()
                .title(Span::styled(
                    title.to_string(),
                    Style::default()
                        .fg(Color::LightRed)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::LightRed)),
        );
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }
}

fn help_line() -> Line<'static> {
    Line::from(vec![
        Span::styled("←↑↓→ / h j k l", Style::default().fg(Color::LightCyan)),
        Span::raw(" move  "),
        Span::styled("Space", Style::default().fg(Color::LightGreen)),
        Span::raw(" toggle  "),
        Span::styled("n", Style::default().fg(Color::LightMagenta)),
        Span::raw(" new  "),
        Span::styled("e", Style::default().fg(Color::LightYellow)),
        Span::raw(" edit  "),
        Span::styled("d", Style::default().fg(Color::LightRed)),
        Span::raw(" delete  "),
        Span::styled("N/R/D", Style::default().fg(Color::LightBlue)),
        Span::raw(" list ops  "),
        Span::styled("s", Style::default().fg(Color::LightGreen)),
        Span::raw(" sync  "),
        Span::styled("q", Style::default().fg(Color::LightRed)),
        Span::raw(" quit"),
    ])
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ]
            .as_ref(),
        )
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(popup_layout[1])[1]
}

fn parse_due_field(input: &str) -> Result<Option<NaiveDate>, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| format!("invalid date format (use YYYY-MM-DD): {}", trimmed))
}

fn color_for_index(idx: usize) -> Color {
    let palette = [
        Color::Cyan,
        Color::LightGreen,
        Color::LightMagenta,
        Color::LightBlue,
        Color::LightYellow,
        Color::LightRed,
    ];
    palette[idx % palette.len()]
}

fn adjust_offset(
    selected: usize,
    current_offset: usize,
    viewport: usize,
    scrolloff: usize,
    len: usize,
) -> usize {
    if viewport == 0 || len == 0 {
        return 0;
    }
    let max_offset = len.saturating_sub(viewport);
    let margin = scrolloff.min(viewport.saturating_sub(1));
    let mut offset = current_offset.min(max_offset);
    if selected < offset.saturating_add(margin) {
        offset = selected.saturating_sub(margin);
    } else {
        let upper = offset
            .saturating_add(viewport.saturating_sub(1))
            .saturating_sub(margin);
        if selected > upper {
            offset = selected.saturating_add(margin + 1).saturating_sub(viewport);
        }
    }
    offset.min(max_offset)
}

fn truncate_text(text: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let mut out = String::new();
    for ch in text.chars() {
        if out.chars().count() >= max.saturating_sub(3) {
            out.push_str("...");
            break;
        }
        out.push(ch);
    }
    if out.chars().count() > max {
        out.truncate(max);
    }
    out
}

/// "Today", "Tomorrow", a short month-day within the current year, or the
/// full date otherwise.
fn format_due_relative(due: NaiveDate, today: NaiveDate) -> String {
    if due == today {
        "Today".to_string()
    } else if Some(due) == today.succ_opt() {
        "Tomorrow".to_string()
    } else if due.year() == today.year() {
        due.format("%b %-d").to_string()
    } else {
        due.format("%Y-%m-%d").to_string()
    }
}

fn task_item(task: &Task, width: u16, selected: bool, today: NaiveDate) -> ListItem<'static> {
    let inner_width = width.saturating_sub(2).max(10) as usize;
    let text_style = if task.completed {
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::CROSSED_OUT)
    } else {
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD)
    };
    let text_line = Line::from(Span::styled(
        truncate_text(&task.text, inner_width),
        text_style,
    ));

    let meta_line = if task.completed {
        Line::from(Span::styled("done", Style::default().fg(Color::DarkGray)))
    } else if let Some(due) = task.due {
        let overdue = task.is_overdue(today);
        let label = if overdue {
            format!("due {} (overdue)", format_due_relative(due, today))
        } else {
            format!("due {}", format_due_relative(due, today))
        };
        Line::from(Span::styled(
            label,
            Style::default().fg(if overdue {
                Color::LightRed
            } else {
                Color::LightYellow
            }),
        ))
    } else {
        Line::from(Span::styled(
            "no due date",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM),
        ))
    };

    let lines = vec![text_line, meta_line, Line::from("")];
    let mut item = ListItem::new(lines);
    if selected {
        item = item.style(
            Style::default()
                .bg(Color::Rgb(40, 44, 58))
                .add_modifier(Modifier::BOLD),
        );
    }
    item
}

fn field_line(label: &str, field: &FieldValue, active: bool) -> Line<'static> {
    let label_style = Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::BOLD | Modifier::DIM);
    let value_style = Style::default().fg(if active { Color::Cyan } else { Color::White });
    let text = if active {
        field.with_caret()
    } else {
        field.value.clone()
    };
    Line::from(vec![
        Span::styled(format!("{}: ", label), label_style),
        Span::styled(text, value_style),
    ])
}

fn prev_grapheme(cursor: usize, text: &str) -> usize {
    if cursor == 0 {
        return 0;
    }
    let mut prev = 0;
    for (idx, _) in text.char_indices() {
        if idx >= cursor {
            break;
        }
        prev = idx;
    }
    prev
}

fn next_grapheme(cursor: usize, text: &str) -> usize {
    for (idx, ch) in text.char_indices() {
        if idx > cursor {
            return idx;
        }
        if idx == cursor {
            return cursor + ch.len_utf8();
        }
    }
    text.len()
}

fn format_elapsed(last: Instant) -> String {
    let secs = last.elapsed().as_secs();
    if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}
