#![forbid(unsafe_code)]

use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{
    Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Tabs, Wrap,
};

use crate::api::ApiClient;
use crate::api::types::{Priority, RecurringRule, Task};
use crate::config::{self, Config, TaskFilter};
use crate::form::TaskDraft;
use crate::store::{ChatLog, Role, TaskStore};
use crate::tui;
use crate::tui::TerminalGuard;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TabId {
    Tasks,
    Chat,
    Config,
    Help,
}

impl TabId {
    const ALL: [TabId; 4] = [TabId::Tasks, TabId::Chat, TabId::Config, TabId::Help];

    fn title(self) -> &'static str {
        match self {
            TabId::Tasks => "Tasks",
            TabId::Chat => "Chat",
            TabId::Config => "Config",
            TabId::Help => "Help",
        }
    }

    fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    TaskForm,
    Confirm,
}

#[derive(Debug, Clone)]
struct TextInput {
    text: String,
    cursor: usize,
}

impl TextInput {
    fn new(initial: impl Into<String>) -> Self {
        let text = initial.into();
        let cursor = text.chars().count();
        Self { text, cursor }
    }

    fn as_str(&self) -> &str {
        &self.text
    }

    fn insert_char(&mut self, c: char) {
        let mut chars: Vec<char> = self.text.chars().collect();
        let cur = self.cursor.min(chars.len());
        chars.insert(cur, c);
        self.text = chars.into_iter().collect();
        self.cursor = cur + 1;
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let mut chars: Vec<char> = self.text.chars().collect();
        let cur = self.cursor.min(chars.len());
        if cur == 0 {
            return;
        }
        chars.remove(cur - 1);
        self.text = chars.into_iter().collect();
        self.cursor = cur - 1;
    }

    fn delete(&mut self) {
        let mut chars: Vec<char> = self.text.chars().collect();
        let cur = self.cursor.min(chars.len());
        if cur >= chars.len() {
            return;
        }
        chars.remove(cur);
        self.text = chars.into_iter().collect();
    }

    fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    fn move_right(&mut self) {
        let len = self.text.chars().count();
        self.cursor = (self.cursor + 1).min(len);
    }

    fn move_home(&mut self) {
        self.cursor = 0;
    }

    fn move_end(&mut self) {
        self.cursor = self.text.chars().count();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskFormField {
    Title,
    Description,
    Tags,
    Due,
    Priority,
    Recurring,
}

impl TaskFormField {
    const ALL: [TaskFormField; 6] = [
        TaskFormField::Title,
        TaskFormField::Description,
        TaskFormField::Tags,
        TaskFormField::Due,
        TaskFormField::Priority,
        TaskFormField::Recurring,
    ];

    fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone)]
struct TaskFormDialog {
    /// Task id when editing, None when creating.
    editing: Option<i64>,
    title: TextInput,
    description: TextInput,
    tags: TextInput,
    due: TextInput,
    priority: Priority,
    recurring: Option<RecurringRule>,
    field: TaskFormField,
    error: Option<String>,
}

impl TaskFormDialog {
    fn new_create() -> Self {
        Self {
            editing: None,
            title: TextInput::new(""),
            description: TextInput::new(""),
            tags: TextInput::new(""),
            due: TextInput::new(""),
            priority: Priority::default(),
            recurring: None,
            field: TaskFormField::Title,
            error: None,
        }
    }

    fn new_edit(task: &Task) -> Self {
        let draft = TaskDraft::from_task(task);
        Self {
            editing: Some(task.id),
            title: TextInput::new(draft.title),
            description: TextInput::new(draft.description),
            tags: TextInput::new(draft.tags),
            due: TextInput::new(draft.due_local),
            priority: draft.priority,
            recurring: draft.recurring,
            field: TaskFormField::Title,
            error: None,
        }
    }

    fn draft(&self) -> TaskDraft {
        TaskDraft {
            title: self.title.text.clone(),
            description: self.description.text.clone(),
            priority: self.priority,
            tags: self.tags.text.clone(),
            due_local: self.due.text.clone(),
            recurring: self.recurring,
        }
    }

    fn popup_title(&self) -> &'static str {
        if self.editing.is_some() {
            "Edit task"
        } else {
            "New task"
        }
    }
}

#[derive(Debug, Clone)]
struct ConfirmDialog {
    title: String,
    message: String,
    action: ConfirmAction,
}

#[derive(Debug, Clone)]
enum ConfirmAction {
    DeleteTask { id: i64 },
}

#[derive(Debug, Clone)]
struct Toast {
    message: String,
    until: Instant,
}

impl Toast {
    fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            until: Instant::now() + Duration::from_secs(3),
        }
    }
}

struct AppState {
    cfg: Config,
    client: ApiClient,
    tab: TabId,
    mode: Mode,
    store: TaskStore,
    task_state: TableState,
    filter: TaskFilter,
    show_completed: bool,
    needs_reload: bool,
    chat: ChatLog,
    chat_input: TextInput,
    form: Option<TaskFormDialog>,
    confirm: Option<ConfirmDialog>,
    config_text: String,
    config_scroll: usize,
    needs_config_refresh: bool,
    toast: Option<Toast>,
    last_error: Option<String>,
    should_quit: bool,
}

impl AppState {
    fn new(cfg: Config, client: ApiClient) -> Self {
        let mut task_state = TableState::default();
        task_state.select(Some(0));
        Self {
            filter: cfg.ui.default_filter,
            show_completed: cfg.ui.show_completed,
            cfg,
            client,
            tab: TabId::Tasks,
            mode: Mode::Normal,
            store: TaskStore::new(),
            task_state,
            needs_reload: false,
            chat: ChatLog::new(),
            chat_input: TextInput::new(""),
            form: None,
            confirm: None,
            config_text: String::new(),
            config_scroll: 0,
            needs_config_refresh: true,
            toast: None,
            last_error: None,
            should_quit: false,
        }
    }

    /// Rows shown on the Tasks tab, in store order. `show_completed` only
    /// matters for the All filter; Pending/Completed are already explicit.
    fn visible_tasks(&self) -> Vec<&Task> {
        match self.filter {
            TaskFilter::All => {
                if self.show_completed {
                    self.store.tasks().iter().collect()
                } else {
                    self.store.pending()
                }
            }
            TaskFilter::Pending => self.store.pending(),
            TaskFilter::Completed => self.store.completed(),
        }
    }

    fn selected_task_index(&self) -> usize {
        self.task_state.selected().unwrap_or(0)
    }

    fn selected_task_id(&self) -> Option<i64> {
        let visible = self.visible_tasks();
        if visible.is_empty() {
            return None;
        }
        let idx = self.selected_task_index().min(visible.len() - 1);
        Some(visible[idx].id)
    }

    fn clamp_task_selection(&mut self) {
        let len = self.visible_tasks().len();
        if len == 0 {
            self.task_state.select(Some(0));
            return;
        }
        let idx = self.selected_task_index().min(len - 1);
        self.task_state.select(Some(idx));
    }

    fn move_task_selection(&mut self, delta: i64) {
        let len = self.visible_tasks().len();
        if len == 0 {
            return;
        }
        let cur = i64::try_from(self.selected_task_index()).unwrap_or(0);
        let max = i64::try_from(len.saturating_sub(1)).unwrap_or(0);
        let next = (cur + delta).clamp(0, max);
        let next = usize::try_from(next).unwrap_or(0);
        self.task_state.select(Some(next));
    }

    fn toast(&mut self, message: impl Into<String>) {
        self.toast = Some(Toast::info(message));
        self.last_error = None;
    }
}

pub async fn run(cfg: Config, client: ApiClient) -> anyhow::Result<()> {
    let terminal = tui::init_terminal()?;
    let mut guard = TerminalGuard::new(terminal);

    let mut app = AppState::new(cfg, client);
    reload_tasks(&mut app).await;

    loop {
        if let Some(toast) = &app.toast
            && Instant::now() >= toast.until
        {
            app.toast = None;
        }

        {
            let Some(terminal) = guard.terminal.as_mut() else {
                anyhow::bail!("terminal unavailable");
            };
            terminal.draw(|f| draw(f, &mut app))?;
        }

        if app.should_quit {
            break;
        }

        if app.needs_reload {
            app.needs_reload = false;
            reload_tasks(&mut app).await;
        }

        if app.needs_config_refresh {
            app.config_text = config::list_resolved_toml().unwrap_or_else(|e| e.to_string());
            app.needs_config_refresh = false;
        }

        if event::poll(Duration::from_millis(50))?
            && let Event::Key(key) = event::read()?
        {
            handle_key(key, &mut app).await;
        }
    }

    Ok(())
}

/// One in-flight list at a time: requests are awaited inline, and the store
/// ticket drops anything a newer reload superseded.
async fn reload_tasks(app: &mut AppState) {
    let ticket = app.store.begin_reload();
    match app.client.list_tasks().await {
        Ok(tasks) => {
            if app.store.commit_reload(ticket, tasks) {
                app.last_error = None;
            }
            app.clamp_task_selection();
        }
        Err(e) => app.last_error = Some(e.to_string()),
    }
}

async fn handle_key(key: KeyEvent, app: &mut AppState) {
    if key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c')) {
        app.should_quit = true;
        return;
    }

    // Modals take precedence
    if app.confirm.is_some() {
        app.mode = Mode::Confirm;
        handle_confirm_key(key, app).await;
        return;
    }
    if app.form.is_some() {
        app.mode = Mode::TaskForm;
        handle_form_key(key, app).await;
        return;
    }
    app.mode = Mode::Normal;

    // The chat tab owns the keyboard: everything that is not navigation
    // types into the message input.
    if app.tab == TabId::Chat {
        handle_chat_key(key, app).await;
        return;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            app.should_quit = true;
            return;
        }
        KeyCode::Char('?' | '4') => app.tab = TabId::Help,
        KeyCode::Char('1') => app.tab = TabId::Tasks,
        KeyCode::Char('2') => app.tab = TabId::Chat,
        KeyCode::Char('3') => app.tab = TabId::Config,
        KeyCode::Char('h') | KeyCode::BackTab => app.tab = app.tab.prev(),
        KeyCode::Char('l') | KeyCode::Tab => app.tab = app.tab.next(),
        _ => {}
    }

    match app.tab {
        TabId::Tasks => handle_tasks_tab_key(key, app).await,
        TabId::Config => handle_config_tab_key(key, app),
        TabId::Chat | TabId::Help => {}
    }
}

async fn handle_tasks_tab_key(key: KeyEvent, app: &mut AppState) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.move_task_selection(1),
        KeyCode::Char('k') | KeyCode::Up => app.move_task_selection(-1),
        KeyCode::Char('a') | KeyCode::Char('n') => {
            app.form = Some(TaskFormDialog::new_create());
        }
        KeyCode::Char('e') | KeyCode::Enter => {
            if let Some(id) = app.selected_task_id()
                && let Some(task) = app.store.get(id)
            {
                app.form = Some(TaskFormDialog::new_edit(task));
            }
        }
        KeyCode::Char(' ' | 'x') => toggle_selected(app).await,
        KeyCode::Char('d') => {
            let Some(id) = app.selected_task_id() else {
                return;
            };
            if app.cfg.ui.confirm_delete {
                let title = app
                    .store
                    .get(id)
                    .map_or_else(|| format!("#{id}"), |t| t.title.clone());
                app.confirm = Some(ConfirmDialog {
                    title: "Delete task".to_owned(),
                    message: format!("Delete '{title}'? This cannot be undone."),
                    action: ConfirmAction::DeleteTask { id },
                });
            } else {
                delete_task(app, id).await;
            }
        }
        KeyCode::Char('r') => app.needs_reload = true,
        KeyCode::Char('f') => {
            app.filter = app.filter.cycle();
            app.clamp_task_selection();
        }
        KeyCode::Char('c') => {
            app.show_completed = !app.show_completed;
            app.clamp_task_selection();
        }
        _ => {}
    }
}

fn handle_config_tab_key(key: KeyEvent, app: &mut AppState) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.config_scroll = app.config_scroll.saturating_add(1),
        KeyCode::Char('k') | KeyCode::Up => app.config_scroll = app.config_scroll.saturating_sub(1),
        KeyCode::Char('r') => app.needs_config_refresh = true,
        _ => {}
    }
}

async fn handle_chat_key(key: KeyEvent, app: &mut AppState) {
    if key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('n')) {
        app.chat.reset();
        app.toast("New conversation");
        return;
    }
    match key.code {
        KeyCode::Esc => app.should_quit = true,
        KeyCode::Tab => app.tab = app.tab.next(),
        KeyCode::BackTab => app.tab = app.tab.prev(),
        KeyCode::Enter => send_chat_message(app).await,
        _ => handle_text_input_key(key, &mut app.chat_input),
    }
}

/// The user turn lands in the transcript before the request goes out; a
/// failure takes exactly that turn back and restores the input text.
async fn send_chat_message(app: &mut AppState) {
    let message = app.chat_input.text.trim().to_owned();
    if message.is_empty() {
        return;
    }
    app.chat.push_user(message.clone());
    app.chat_input = TextInput::new("");

    match app.client.send_chat(&message, app.chat.conversation()).await {
        Ok(reply) => {
            app.chat.commit_reply(&reply);
            app.last_error = None;
            // The assistant may have touched the list behind our back.
            if !reply.tool_calls.is_empty() {
                app.needs_reload = true;
            }
        }
        Err(e) => {
            if let Some(text) = app.chat.rollback_send() {
                app.chat_input = TextInput::new(text);
            }
            app.last_error = Some(e.to_string());
        }
    }
}

async fn toggle_selected(app: &mut AppState) {
    let Some(id) = app.selected_task_id() else {
        return;
    };
    match app.client.toggle_complete(id).await {
        Ok(task) => {
            let completed = task.completed;
            let outcome = app.store.apply_toggle(task);
            if outcome.needs_reload() {
                app.needs_reload = true;
            }
            if completed {
                app.toast("Task completed!");
            } else {
                app.toast("Task reopened");
            }
            app.clamp_task_selection();
        }
        Err(e) => app.last_error = Some(e.to_string()),
    }
}

async fn delete_task(app: &mut AppState, id: i64) {
    match app.client.delete_task(id).await {
        Ok(ack) => {
            app.store.apply_delete(ack.id);
            app.clamp_task_selection();
            app.toast("Task deleted");
        }
        Err(e) => app.last_error = Some(e.to_string()),
    }
}

async fn handle_confirm_key(key: KeyEvent, app: &mut AppState) {
    match key.code {
        KeyCode::Char('y' | 'Y') => {
            let Some(confirm) = app.confirm.take() else {
                return;
            };
            match confirm.action {
                ConfirmAction::DeleteTask { id } => delete_task(app, id).await,
            }
        }
        KeyCode::Char('n' | 'N') | KeyCode::Esc => {
            app.confirm = None;
        }
        _ => {}
    }
}

async fn handle_form_key(key: KeyEvent, app: &mut AppState) {
    let Some(dialog) = app.form.as_mut() else {
        return;
    };

    match key.code {
        KeyCode::Esc => {
            app.form = None;
            return;
        }
        KeyCode::Tab | KeyCode::Down => {
            dialog.field = dialog.field.next();
            return;
        }
        KeyCode::BackTab | KeyCode::Up => {
            dialog.field = dialog.field.prev();
            return;
        }
        KeyCode::Enter => {
            if dialog.field == TaskFormField::Recurring {
                submit_form(app).await;
            } else {
                dialog.field = dialog.field.next();
            }
            return;
        }
        _ => {}
    }

    match dialog.field {
        TaskFormField::Title => handle_text_input_key(key, &mut dialog.title),
        TaskFormField::Description => handle_text_input_key(key, &mut dialog.description),
        TaskFormField::Tags => handle_text_input_key(key, &mut dialog.tags),
        TaskFormField::Due => handle_text_input_key(key, &mut dialog.due),
        TaskFormField::Priority => match key.code {
            KeyCode::Left => dialog.priority = priority_prev(dialog.priority),
            KeyCode::Right | KeyCode::Char(' ') => dialog.priority = dialog.priority.cycle(),
            _ => {}
        },
        TaskFormField::Recurring => match key.code {
            KeyCode::Left => dialog.recurring = recurring_prev(dialog.recurring),
            KeyCode::Right | KeyCode::Char(' ') => {
                dialog.recurring = RecurringRule::cycle(dialog.recurring);
            }
            _ => {}
        },
    }
}

fn priority_prev(p: Priority) -> Priority {
    match p {
        Priority::Low => Priority::High,
        Priority::Medium => Priority::Low,
        Priority::High => Priority::Medium,
    }
}

fn recurring_prev(r: Option<RecurringRule>) -> Option<RecurringRule> {
    match r {
        None => Some(RecurringRule::Monthly),
        Some(RecurringRule::Daily) => None,
        Some(RecurringRule::Weekly) => Some(RecurringRule::Daily),
        Some(RecurringRule::Monthly) => Some(RecurringRule::Weekly),
    }
}

/// On failure the dialog stays open with every value intact so the user can
/// fix the field and retry.
async fn submit_form(app: &mut AppState) {
    let Some(dialog) = app.form.as_mut() else {
        return;
    };
    let draft = dialog.draft();

    if let Some(id) = dialog.editing {
        let patch = match draft.to_patch() {
            Ok(p) => p,
            Err(e) => {
                dialog.error = Some(e.to_string());
                return;
            }
        };
        match app.client.update_task(id, &patch).await {
            Ok(task) => {
                if !app.store.apply_update(task) {
                    app.needs_reload = true;
                }
                app.form = None;
                app.toast("Task updated");
            }
            Err(e) => {
                if let Some(dialog) = app.form.as_mut() {
                    dialog.error = Some(e.to_string());
                }
            }
        }
    } else {
        let body = match draft.to_new_task() {
            Ok(b) => b,
            Err(e) => {
                dialog.error = Some(e.to_string());
                return;
            }
        };
        match app.client.create_task(&body).await {
            Ok(task) => {
                app.store.insert_created(task);
                app.form = None;
                app.clamp_task_selection();
                app.toast("Task created");
            }
            Err(e) => {
                if let Some(dialog) = app.form.as_mut() {
                    dialog.error = Some(e.to_string());
                }
            }
        }
    }
}

fn handle_text_input_key(key: KeyEvent, input: &mut TextInput) {
    match key.code {
        KeyCode::Backspace => input.backspace(),
        KeyCode::Delete => input.delete(),
        KeyCode::Left => input.move_left(),
        KeyCode::Right => input.move_right(),
        KeyCode::Home => input.move_home(),
        KeyCode::End => input.move_end(),
        KeyCode::Char(c) => {
            if !key.modifiers.contains(KeyModifiers::CONTROL)
                && !key.modifiers.contains(KeyModifiers::ALT)
            {
                input.insert_char(c);
            }
        }
        _ => {}
    }
}

fn draw(f: &mut Frame<'_>, app: &mut AppState) {
    let area = f.area();

    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    draw_tabs(f, root[0], app);
    draw_body(f, root[1], app);
    draw_footer(f, root[2], app);

    if let Some(confirm) = &app.confirm {
        draw_confirm(f, confirm);
    }

    if let Some(dialog) = &app.form {
        draw_form_popup(f, dialog);

        let popup = centered_rect(80, 55, area);
        let inner = Block::default()
            .borders(Borders::ALL)
            .title(dialog.popup_title())
            .inner(popup);

        let (line_idx, prefix, input) = match dialog.field {
            TaskFormField::Title => (0u16, "Title:       ", Some(&dialog.title)),
            TaskFormField::Description => (1u16, "Description: ", Some(&dialog.description)),
            TaskFormField::Tags => (2u16, "Tags:        ", Some(&dialog.tags)),
            TaskFormField::Due => (3u16, "Due:         ", Some(&dialog.due)),
            TaskFormField::Priority | TaskFormField::Recurring => (0u16, "", None),
        };

        if let Some(input) = input {
            let prefix_len = prefix.chars().count();
            let x = inner.x
                + u16::try_from(prefix_len).unwrap_or(0)
                + cursor_x_for_text(input.as_str(), input.cursor);
            let y = inner.y + line_idx;
            f.set_cursor_position((x, y));
        }
    }
}

fn draw_tabs(f: &mut Frame<'_>, area: Rect, app: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(area);

    let titles: Vec<Line> = TabId::ALL
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let idx = i + 1;
            let mut title = format!("{} [{idx}]", t.title());
            match t {
                TabId::Tasks => {
                    title = format!("{title} ({}/{})", app.store.pending().len(), app.store.len());
                }
                TabId::Chat => title = format!("{title} ({})", app.chat.turns().len()),
                _ => {}
            }
            Line::from(title)
        })
        .collect();

    let selected = TabId::ALL.iter().position(|t| *t == app.tab).unwrap_or(0);

    let tabs = Tabs::new(titles)
        .select(selected)
        .style(Style::default().fg(Color::Gray))
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::LightBlue)
                .add_modifier(Modifier::BOLD),
        )
        .divider(" | ");

    f.render_widget(tabs, chunks[0]);

    let user = Paragraph::new(Line::from(app.client.user_id().to_owned()))
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Right);
    f.render_widget(user, chunks[1]);
}

fn draw_body(f: &mut Frame<'_>, area: Rect, app: &mut AppState) {
    match app.tab {
        TabId::Tasks => draw_tasks_tab(f, area, app),
        TabId::Chat => draw_chat_tab(f, area, app),
        TabId::Config => draw_config_tab(f, area, app),
        TabId::Help => draw_help_tab(f, area, app),
    }
}

fn draw_footer(f: &mut Frame<'_>, area: Rect, app: &AppState) {
    let effective_mode = if app.confirm.is_some() {
        Mode::Confirm
    } else if app.form.is_some() {
        Mode::TaskForm
    } else {
        app.mode
    };

    let mut left = match effective_mode {
        Mode::Normal => match app.tab {
            TabId::Tasks => {
                "q quit • 1-4 tabs • j/k move • a add • e edit • Space toggle • d delete • f filter • c completed • r reload".to_owned()
            }
            TabId::Chat => "Enter send • Ctrl-N new conversation • Tab next tab • Esc quit".to_owned(),
            TabId::Config => "q quit • 1-4 tabs • j/k scroll • r reload".to_owned(),
            TabId::Help => "q quit • 1-4 tabs".to_owned(),
        },
        Mode::TaskForm => {
            "Enter next/apply • Tab switch field • ←/→ cycle choice • Esc cancel".to_owned()
        }
        Mode::Confirm => "y delete • n cancel".to_owned(),
    };

    if let Some(err) = &app.last_error {
        left = format!("Error: {err}");
    } else if let Some(toast) = &app.toast {
        left.clone_from(&toast.message);
    }

    let mut right = String::new();
    if app.tab == TabId::Tasks {
        right = format!(
            "Filter: {} • Completed: {}",
            app.filter.as_str(),
            if app.show_completed || app.filter == TaskFilter::Completed {
                "shown"
            } else {
                "hidden"
            },
        );
    } else if app.tab == TabId::Chat {
        right = match app.chat.conversation() {
            Some(id) => format!("Conversation #{id}"),
            None => "New conversation".to_owned(),
        };
    }

    let error_style = if app.last_error.is_some() {
        Style::default()
            .fg(Color::White)
            .bg(Color::Red)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White).bg(Color::Blue)
    };

    let spans = vec![
        Span::styled(left, error_style),
        Span::raw(" "),
        Span::styled(
            right,
            Style::default()
                .fg(Color::White)
                .bg(Color::Blue)
                .add_modifier(Modifier::DIM),
        ),
    ];

    let bg = if app.last_error.is_some() {
        Color::Red
    } else {
        Color::Blue
    };
    let p = Paragraph::new(Line::from(spans)).style(Style::default().bg(bg));
    f.render_widget(p, area);
}

fn draw_tasks_tab(f: &mut Frame<'_>, area: Rect, app: &mut AppState) {
    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    draw_tasks_table(f, layout[0], app);
    draw_task_detail(f, layout[1], app);
}

fn draw_tasks_table(f: &mut Frame<'_>, area: Rect, app: &mut AppState) {
    let headers = Row::new(vec!["", "PRI", "TITLE", "DUE", "TAGS"])
        .style(Style::default().add_modifier(Modifier::BOLD));

    let now = chrono::Utc::now();
    let icons = app.cfg.ui.icons;
    let visible = app.visible_tasks();
    let rows: Vec<Row> = visible
        .iter()
        .map(|t| {
            let done = if t.completed {
                if icons { "✓" } else { "x" }
            } else if icons {
                "○"
            } else {
                "-"
            };
            let due = t
                .due()
                .map(|d| {
                    d.with_timezone(&chrono::Local)
                        .format("%Y-%m-%d %H:%M")
                        .to_string()
                })
                .unwrap_or_default();
            let due_cell = if t.is_overdue(now) {
                Cell::from(due).style(Style::default().fg(Color::Red))
            } else {
                Cell::from(due)
            };
            let title_style = if t.completed {
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::CROSSED_OUT)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(done),
                Cell::from(t.priority.as_str()).style(priority_style(t.priority)),
                Cell::from(t.title.clone()).style(title_style),
                due_cell,
                Cell::from(t.tags.clone().unwrap_or_default()),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        vec![
            Constraint::Length(2),
            Constraint::Length(6),
            Constraint::Min(20),
            Constraint::Length(16),
            Constraint::Percentage(20),
        ],
    )
    .header(headers)
    .block(Block::default().borders(Borders::ALL).title("Tasks"))
    .row_highlight_style(
        Style::default()
            .fg(Color::Black)
            .bg(Color::LightBlue)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("▸ ");

    f.render_stateful_widget(table, area, &mut app.task_state);
}

fn priority_style(priority: Priority) -> Style {
    match priority {
        Priority::Low => Style::default().fg(Color::DarkGray),
        Priority::Medium => Style::default(),
        Priority::High => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    }
}

fn draw_task_detail(f: &mut Frame<'_>, area: Rect, app: &mut AppState) {
    let block = Block::default().borders(Borders::ALL).title("Details");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let visible = app.visible_tasks();
    if visible.is_empty() {
        f.render_widget(Paragraph::new("No tasks.").wrap(Wrap { trim: true }), inner);
        return;
    }

    let idx = app.selected_task_index().min(visible.len() - 1);
    let t = visible[idx];

    let due = t
        .due()
        .map(|d| {
            d.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        })
        .unwrap_or_else(|| "-".to_owned());

    let lines = vec![
        Line::from(vec![
            Span::styled("Task: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(t.title.as_str()),
        ]),
        Line::from(format!("ID: {}", t.id)),
        Line::from(format!(
            "Status: {}",
            if t.completed { "completed" } else { "pending" }
        )),
        Line::from(format!("Priority: {}", t.priority.as_str())),
        Line::from(format!("Due: {due}")),
        Line::from(format!(
            "Recurring: {}",
            t.recurring_rule.map_or("-", RecurringRule::as_str)
        )),
        Line::from(format!("Tags: {}", t.tags.as_deref().unwrap_or("-"))),
        Line::from(format!("Created: {}", t.created_at)),
        Line::from(format!("Updated: {}", t.updated_at)),
        Line::from(""),
        Line::from(vec![
            Span::styled(
                "Description: ",
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(if t.description.trim().is_empty() {
                "-"
            } else {
                &t.description
            }),
        ]),
    ];

    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

fn draw_chat_tab(f: &mut Frame<'_>, area: Rect, app: &mut AppState) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)])
        .split(area);

    draw_chat_transcript(f, layout[0], app);
    draw_chat_input(f, layout[1], app);
}

fn draw_chat_transcript(f: &mut Frame<'_>, area: Rect, app: &AppState) {
    let block = Block::default().borders(Borders::ALL).title("Assistant");
    let inner = block.inner(area);
    f.render_widget(block, area);

    if app.chat.turns().is_empty() {
        f.render_widget(
            Paragraph::new("Ask the assistant to add, list, or complete tasks.")
                .style(Style::default().fg(Color::DarkGray))
                .wrap(Wrap { trim: true }),
            inner,
        );
        return;
    }

    let mut lines: Vec<Line> = Vec::new();
    for turn in app.chat.turns() {
        let (prefix, style) = match turn.role {
            Role::User => (
                "you> ",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
            Role::Assistant => ("assistant> ", Style::default().fg(Color::Cyan)),
        };
        let mut first = true;
        for text_line in turn.content.lines() {
            if first {
                lines.push(Line::from(vec![
                    Span::styled(prefix, style),
                    Span::raw(text_line.to_owned()),
                ]));
                first = false;
            } else {
                lines.push(Line::from(text_line.to_owned()));
            }
        }
        if first {
            // Empty content still gets its prefix line.
            lines.push(Line::from(Span::styled(prefix, style)));
        }
    }

    let total = lines.len();
    let visible = inner.height as usize;
    let scroll = total.saturating_sub(visible.max(1));
    let para = Paragraph::new(Text::from(lines))
        .scroll((u16::try_from(scroll).unwrap_or(u16::MAX), 0))
        .wrap(Wrap { trim: false });
    f.render_widget(para, inner);
}

fn draw_chat_input(f: &mut Frame<'_>, area: Rect, app: &AppState) {
    let title = match app.chat.conversation() {
        Some(id) => format!("Message (conversation #{id})"),
        None => "Message (new conversation)".to_owned(),
    };
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let line = Line::from(vec![
        Span::styled("> ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(app.chat_input.as_str()),
    ]);
    f.render_widget(Paragraph::new(line), inner);

    if app.tab == TabId::Chat && app.form.is_none() && app.confirm.is_none() {
        let prefix_len = "> ".chars().count();
        let x = inner.x
            + u16::try_from(prefix_len).unwrap_or(0)
            + cursor_x_for_text(app.chat_input.as_str(), app.chat_input.cursor);
        f.set_cursor_position((x, inner.y));
    }
}

fn draw_config_tab(f: &mut Frame<'_>, area: Rect, app: &mut AppState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Resolved config");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let total_lines = app.config_text.lines().count().max(1);
    let visible = inner.height as usize;
    let max_scroll = total_lines.saturating_sub(visible.max(1));
    if app.config_scroll > max_scroll {
        app.config_scroll = max_scroll;
    }

    let lines: Vec<Line> = app
        .config_text
        .lines()
        .map(|l| Line::from(l.to_owned()))
        .collect();
    let text = Text::from(lines);
    let para = Paragraph::new(text)
        .scroll((u16::try_from(app.config_scroll).unwrap_or(u16::MAX), 0))
        .wrap(Wrap { trim: false });
    f.render_widget(para, inner);
}

fn draw_help_tab(f: &mut Frame<'_>, area: Rect, _app: &mut AppState) {
    let block = Block::default().borders(Borders::ALL).title("Help");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let lines = vec![
        Line::from("todotui"),
        Line::from(""),
        Line::from("Global keys:"),
        Line::from("  1-4 / h/l   Switch tabs (Tab/Shift-Tab also work)"),
        Line::from("  q / Ctrl-C  Quit"),
        Line::from(""),
        Line::from("Tasks tab:"),
        Line::from("  j/k, ↑/↓    Move selection"),
        Line::from("  a           New task"),
        Line::from("  e / Enter   Edit selected task"),
        Line::from("  Space / x   Toggle completion"),
        Line::from("  d           Delete selected task"),
        Line::from("  f           Cycle filter (all / pending / completed)"),
        Line::from("  c           Show/hide completed tasks"),
        Line::from("  r           Reload from server"),
        Line::from(""),
        Line::from("Chat tab:"),
        Line::from("  Enter       Send message"),
        Line::from("  Ctrl-N      Start a new conversation"),
        Line::from("  Esc         Quit"),
        Line::from(""),
        Line::from("Config tab:"),
        Line::from("  j/k         Scroll"),
        Line::from("  r           Reload config from disk"),
        Line::from(""),
        Line::from("Settings live in the config file; `todotui config set` edits them."),
    ];
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

fn draw_confirm(f: &mut Frame<'_>, confirm: &ConfirmDialog) {
    let area = centered_rect(70, 30, f.area());
    f.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(confirm.title.as_str());
    let inner = block.inner(area);
    f.render_widget(block, area);

    let lines = vec![
        Line::from(confirm.message.clone()),
        Line::from(""),
        Line::from("[y] delete    [n] cancel"),
    ];
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}

fn draw_form_popup(f: &mut Frame<'_>, dialog: &TaskFormDialog) {
    let area = centered_rect(80, 55, f.area());
    f.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(dialog.popup_title());
    let inner = block.inner(area);
    f.render_widget(block, area);

    let active_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);
    let style_for = |field: TaskFormField| {
        if dialog.field == field {
            active_style
        } else {
            Style::default()
        }
    };
    let label = Style::default().add_modifier(Modifier::BOLD);
    let hint = Style::default().fg(Color::DarkGray);

    let mut lines = vec![
        Line::from(vec![
            Span::styled("Title:       ", label),
            Span::styled(dialog.title.as_str(), style_for(TaskFormField::Title)),
        ]),
        Line::from(vec![
            Span::styled("Description: ", label),
            Span::styled(
                dialog.description.as_str(),
                style_for(TaskFormField::Description),
            ),
        ]),
        Line::from(vec![
            Span::styled("Tags:        ", label),
            Span::styled(dialog.tags.as_str(), style_for(TaskFormField::Tags)),
            Span::styled("  (comma-separated)", hint),
        ]),
        Line::from(vec![
            Span::styled("Due:         ", label),
            Span::styled(dialog.due.as_str(), style_for(TaskFormField::Due)),
            Span::styled("  (YYYY-MM-DD HH:MM, local time)", hint),
        ]),
        Line::from(vec![
            Span::styled("Priority:    ", label),
            Span::styled(
                dialog.priority.as_str(),
                style_for(TaskFormField::Priority),
            ),
            Span::styled("  (←/→ to change)", hint),
        ]),
        Line::from(vec![
            Span::styled("Recurring:   ", label),
            Span::styled(
                dialog.recurring.map_or("none", RecurringRule::as_str),
                style_for(TaskFormField::Recurring),
            ),
            Span::styled("  (←/→ to change)", hint),
        ]),
    ];

    if let Some(err) = dialog.error.as_deref() {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled(
                "Error: ",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
            Span::styled(err, Style::default().fg(Color::Red)),
        ]));
    }

    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
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

fn cursor_x_for_text(text: &str, cursor: usize) -> u16 {
    // `Paragraph` doesn't do cursor for us; approximate by counting graphemes as chars.
    let prefix: String = text.chars().take(cursor).collect();
    u16::try_from(prefix.chars().count()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tab_cycle_wraps_both_ways() {
        assert_eq!(TabId::Help.next(), TabId::Tasks);
        assert_eq!(TabId::Tasks.prev(), TabId::Help);
        assert_eq!(TabId::Tasks.next(), TabId::Chat);
    }

    #[test]
    fn text_input_edits_at_cursor() {
        let mut input = TextInput::new("bye");
        input.move_home();
        input.insert_char('a');
        assert_eq!(input.as_str(), "abye");
        input.move_end();
        input.backspace();
        assert_eq!(input.as_str(), "aby");
        input.move_home();
        input.delete();
        assert_eq!(input.as_str(), "by");
    }

    #[test]
    fn form_field_order_is_stable() {
        let mut field = TaskFormField::Title;
        for expected in [
            TaskFormField::Description,
            TaskFormField::Tags,
            TaskFormField::Due,
            TaskFormField::Priority,
            TaskFormField::Recurring,
            TaskFormField::Title,
        ] {
            field = field.next();
            assert_eq!(field, expected);
        }
        assert_eq!(TaskFormField::Title.prev(), TaskFormField::Recurring);
    }

    #[test]
    fn priority_and_recurring_cycle_backwards() {
        assert_eq!(priority_prev(Priority::Low), Priority::High);
        assert_eq!(priority_prev(Priority::High), Priority::Medium);
        assert_eq!(recurring_prev(None), Some(RecurringRule::Monthly));
        assert_eq!(recurring_prev(Some(RecurringRule::Daily)), None);
    }
}
