use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use tracing::{error, info, warn};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::api::{ApiError, ClientApi};
use crate::models::{ClientRecord, SaveResponse};
use crate::navigation::{Navigator, CLIENT_LIST_PATH};
use crate::ui::components::date_input::{self, DatePart};

/// Time between a successful save and the move to the listing.
pub const REDIRECT_DELAY: Duration = Duration::from_millis(2000);

const INPUT_POLL: Duration = Duration::from_millis(100);

const LOAD_REFUSED: &str = "Не удалось загрузить данные клиента";
const LOAD_FAILED: &str = "Ошибка при загрузке данных клиента";
const SAVE_REFUSED: &str = "Ошибка при сохранении клиента";
const SAVE_FAILED: &str = "Ошибка соединения с сервером. Попробуйте еще раз";
const CREATED: &str = "Клиент успешно добавлен";
const UPDATED: &str = "Клиент успешно обновлен";

pub enum ClientFormAction {
    Cancel,
    Submit,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FormPhase {
    Loading,
    Ready,
    Submitting,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Banner {
    Error(String),
    Success(String),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ClientField {
    FullName,
    Email,
    Phone,
    Address,
    PassportNumber,
    PassportIssueDate,
    PassportExpiryDate,
    DriverLicenseNumber,
    DriverLicenseExpiry,
    Notes,
}

impl ClientField {
    /// Focus order: the grid row by row, then notes.
    pub const ALL: [ClientField; 10] = [
        ClientField::FullName,
        ClientField::Phone,
        ClientField::Email,
        ClientField::Address,
        ClientField::PassportNumber,
        ClientField::PassportIssueDate,
        ClientField::PassportExpiryDate,
        ClientField::DriverLicenseNumber,
        ClientField::DriverLicenseExpiry,
        ClientField::Notes,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ClientField::FullName => "ФИО",
            ClientField::Email => "Email",
            ClientField::Phone => "Телефон",
            ClientField::Address => "Адрес",
            ClientField::PassportNumber => "Номер паспорта",
            ClientField::PassportIssueDate => "Дата выдачи паспорта",
            ClientField::PassportExpiryDate => "Срок действия паспорта",
            ClientField::DriverLicenseNumber => "Номер водительского удостоверения",
            ClientField::DriverLicenseExpiry => "Срок действия водительского удостоверения",
            ClientField::Notes => "Примечания",
        }
    }

    pub fn is_required(self) -> bool {
        matches!(
            self,
            ClientField::FullName | ClientField::Phone | ClientField::PassportNumber
        )
    }

    pub fn is_date(self) -> bool {
        matches!(
            self,
            ClientField::PassportIssueDate
                | ClientField::PassportExpiryDate
                | ClientField::DriverLicenseExpiry
        )
    }

    pub fn value(self, record: &ClientRecord) -> &str {
        match self {
            ClientField::FullName => &record.full_name,
            ClientField::Email => &record.email,
            ClientField::Phone => &record.phone,
            ClientField::Address => &record.address,
            ClientField::PassportNumber => &record.passport_number,
            ClientField::PassportIssueDate => &record.passport_issue_date,
            ClientField::PassportExpiryDate => &record.passport_expiry_date,
            ClientField::DriverLicenseNumber => &record.driver_license_number,
            ClientField::DriverLicenseExpiry => &record.driver_license_expiry,
            ClientField::Notes => &record.notes,
        }
    }

    fn value_mut(self, record: &mut ClientRecord) -> &mut String {
        match self {
            ClientField::FullName => &mut record.full_name,
            ClientField::Email => &mut record.email,
            ClientField::Phone => &mut record.phone,
            ClientField::Address => &mut record.address,
            ClientField::PassportNumber => &mut record.passport_number,
            ClientField::PassportIssueDate => &mut record.passport_issue_date,
            ClientField::PassportExpiryDate => &mut record.passport_expiry_date,
            ClientField::DriverLicenseNumber => &mut record.driver_license_number,
            ClientField::DriverLicenseExpiry => &mut record.driver_license_expiry,
            ClientField::Notes => &mut record.notes,
        }
    }

    fn position(self) -> usize {
        Self::ALL.iter().position(|f| *f == self).unwrap_or(0)
    }

    fn next(self) -> Self {
        Self::ALL[(self.position() + 1) % Self::ALL.len()]
    }

    fn previous(self) -> Self {
        Self::ALL[(self.position() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SaveMode {
    Create,
    Update(i32),
}

/// A snapshot of the form taken when a submission starts.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub mode: SaveMode,
    pub record: ClientRecord,
}

impl SubmitRequest {
    pub async fn send(&self, api: &dyn ClientApi) -> Result<SaveResponse, ApiError> {
        match self.mode {
            SaveMode::Create => api.create_client(&self.record).await,
            SaveMode::Update(id) => api.update_client(id, &self.record).await,
        }
    }
}

/// Form for creating a client, or editing one when mounted with an id.
pub struct ClientFormState {
    client_id: Option<i32>,
    record: ClientRecord,
    phase: FormPhase,
    banner: Option<Banner>,
    validation_hint: Option<String>,
    current_field: ClientField,
    editing: bool,
    redirect_at: Option<Instant>,
}

impl ClientFormState {
    pub fn new(client_id: Option<i32>) -> Self {
        Self {
            client_id,
            record: ClientRecord::default(),
            phase: if client_id.is_some() {
                FormPhase::Loading
            } else {
                FormPhase::Ready
            },
            banner: None,
            validation_hint: None,
            current_field: ClientField::FullName,
            editing: false,
            redirect_at: None,
        }
    }

    pub fn is_edit_mode(&self) -> bool {
        self.client_id.is_some()
    }

    pub fn phase(&self) -> FormPhase {
        self.phase
    }

    pub fn record(&self) -> &ClientRecord {
        &self.record
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    pub fn redirect_at(&self) -> Option<Instant> {
        self.redirect_at
    }

    /// Reads the record being edited. Leaves `Loading` whatever the outcome;
    /// on failure the fields stay blank and an error banner is shown.
    pub async fn load(&mut self, api: &dyn ClientApi) {
        let Some(id) = self.client_id else {
            self.phase = FormPhase::Ready;
            return;
        };

        match api.get_client(id).await {
            Ok(response) if response.success => match response.client {
                Some(mut client) => {
                    info!(client_id = id, "client form: record loaded");
                    for field in ClientField::ALL.into_iter().filter(|field| field.is_date()) {
                        let value = field.value_mut(&mut client);
                        *value = date_input::normalize(value);
                    }
                    self.record = client;
                }
                None => {
                    error!(client_id = id, error = %ApiError::MissingRecord, "client form: load failed");
                    self.banner = Some(Banner::Error(LOAD_FAILED.to_string()));
                }
            },
            Ok(response) => {
                warn!(client_id = id, message = ?response.message, "client form: load refused");
                self.banner = Some(Banner::Error(server_message(response.message, LOAD_REFUSED)));
            }
            Err(err) => {
                error!(client_id = id, error = %err, "client form: load failed");
                self.banner = Some(Banner::Error(LOAD_FAILED.to_string()));
            }
        }

        self.phase = FormPhase::Ready;
    }

    pub fn update_field(&mut self, field: ClientField, value: impl Into<String>) {
        *field.value_mut(&mut self.record) = value.into();
    }

    /// The first field that keeps the form from being sent: an empty required
    /// field, or a date that is not a complete calendar date.
    pub fn blocking_field(&self) -> Option<ClientField> {
        ClientField::ALL.into_iter().find(|field| {
            let value = field.value(&self.record);
            (field.is_required() && value.is_empty())
                || (field.is_date() && !date_input::is_acceptable(value))
        })
    }

    /// Input-level gate run before a submit is dispatched. Focuses the
    /// offending field and shows a hint when the form is incomplete.
    pub fn check_submittable(&mut self) -> bool {
        match self.blocking_field() {
            Some(field) => {
                self.current_field = field;
                self.editing = false;
                self.validation_hint = Some(if field.is_date() {
                    format!("Введите корректную дату в поле «{}»", field.label())
                } else {
                    format!("Заполните обязательное поле «{}»", field.label())
                });
                false
            }
            None => {
                self.validation_hint = None;
                true
            }
        }
    }

    /// Enters `Submitting` and hands back what to send. Refused while a
    /// load or another submission is in flight.
    pub fn begin_submit(&mut self) -> Option<SubmitRequest> {
        if self.phase != FormPhase::Ready {
            return None;
        }

        self.banner = None;
        self.validation_hint = None;
        self.editing = false;
        self.phase = FormPhase::Submitting;

        let mode = match self.client_id {
            Some(id) => SaveMode::Update(id),
            None => SaveMode::Create,
        };
        Some(SubmitRequest {
            mode,
            record: self.record.clone(),
        })
    }

    /// Applies the outcome of a submission and returns to `Ready`. Success
    /// schedules the move to the listing `REDIRECT_DELAY` after `now`.
    pub fn finish_submit(
        &mut self,
        mode: SaveMode,
        result: Result<SaveResponse, ApiError>,
        now: Instant,
    ) {
        match result {
            Ok(response) if response.success => {
                info!(?mode, "client form: saved");
                let fallback = match mode {
                    SaveMode::Create => CREATED,
                    SaveMode::Update(_) => UPDATED,
                };
                self.banner = Some(Banner::Success(server_message(response.message, fallback)));
                if mode == SaveMode::Create {
                    self.record = ClientRecord::default();
                    self.current_field = ClientField::FullName;
                }
                self.redirect_at = Some(now + REDIRECT_DELAY);
            }
            Ok(response) => {
                warn!(?mode, message = ?response.message, "client form: save refused");
                self.banner = Some(Banner::Error(server_message(response.message, SAVE_REFUSED)));
            }
            Err(err) => {
                error!(?mode, error = %err, "client form: save failed");
                self.banner = Some(Banner::Error(SAVE_FAILED.to_string()));
            }
        }

        self.phase = FormPhase::Ready;
    }

    /// Fires the scheduled move to the listing once its deadline has passed.
    pub fn poll_redirect(&mut self, now: Instant, navigator: &mut dyn Navigator) -> bool {
        match self.redirect_at {
            Some(at) if now >= at => {
                self.redirect_at = None;
                navigator.navigate(CLIENT_LIST_PATH);
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self, navigator: &mut dyn Navigator) {
        navigator.navigate(CLIENT_LIST_PATH);
    }

    pub fn next_field(&mut self) {
        self.current_field = self.current_field.next();
    }

    pub fn previous_field(&mut self) {
        self.current_field = self.current_field.previous();
    }

    pub fn toggle_editing(&mut self) {
        self.editing = !self.editing;
        if self.editing {
            self.validation_hint = None;
        }
    }

    pub fn edit_current_field(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        let field = self.current_field;
        let mut value = field.value(&self.record).to_string();
        if field.is_date() {
            date_input::handle_key(&mut value, key);
        } else {
            match key {
                KeyCode::Char(c) => value.push(c),
                KeyCode::Enter if field == ClientField::Notes => value.push('\n'),
                KeyCode::Backspace => {
                    value.pop();
                }
                _ => return,
            }
        }
        self.update_field(field, value);
    }
}

fn server_message(message: Option<String>, fallback: &str) -> String {
    message
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

pub fn render_client_form<B: Backend>(f: &mut Frame<B>, state: &mut ClientFormState) {
    let notice_height = if state.banner.is_some() || state.validation_hint.is_some() {
        3
    } else {
        0
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(notice_height),
                Constraint::Min(15),
                Constraint::Length(5),
                Constraint::Length(3),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(f.size());

    let title_text = if state.is_edit_mode() {
        "Редактирование клиента"
    } else {
        "Новый клиент"
    };
    let title = Paragraph::new(title_text)
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    render_notice(f, state, chunks[1]);

    if state.phase == FormPhase::Loading {
        let loading = Paragraph::new("Загрузка данных клиента...")
            .style(Style::default().fg(Color::Gray))
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(loading, chunks[2]);
    } else {
        render_grid(f, state, chunks[2]);
        render_field(f, state, ClientField::Notes, chunks[3]);
    }

    render_buttons(f, state, chunks[4]);

    let help_text = if state.editing && state.current_field == ClientField::Notes {
        "Enter - Новая строка | Esc - Завершить ввод | Tab - Следующее поле | Ctrl+S - Сохранить"
    } else if state.editing {
        "Enter/Esc - Завершить ввод | Tab - Следующее поле | Ctrl+S - Сохранить"
    } else {
        "Enter - Изменить поле | Up/Down - Навигация | S - Сохранить | Esc - Отмена"
    };
    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[5]);
}

fn render_notice<B: Backend>(f: &mut Frame<B>, state: &ClientFormState, area: Rect) {
    let text = match (state.banner(), &state.validation_hint) {
        (_, Some(hint)) => Spans::from(Span::styled(hint.as_str(), Style::default().fg(Color::Yellow))),
        (Some(Banner::Error(message)), None) => {
            Spans::from(Span::styled(message.as_str(), Style::default().fg(Color::Red)))
        }
        (Some(Banner::Success(message)), None) => {
            let mut spans = vec![Span::styled(message.as_str(), Style::default().fg(Color::Green))];
            if state.redirect_at().is_some() {
                spans.push(Span::styled(
                    "  Переход к списку клиентов...",
                    Style::default().fg(Color::Gray),
                ));
            }
            Spans::from(spans)
        }
        (None, None) => return,
    };

    let notice = Paragraph::new(text)
        .style(Style::default().add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(notice, area);
}

fn render_grid<B: Backend>(f: &mut Frame<B>, state: &ClientFormState, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(area);

    // Notes is the last entry of ALL and gets its own full-width row.
    let grid_fields = &ClientField::ALL[..ClientField::ALL.len() - 1];
    for (column, area) in columns.iter().enumerate() {
        let fields: Vec<ClientField> = grid_fields
            .iter()
            .copied()
            .skip(column)
            .step_by(2)
            .collect();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(vec![Constraint::Length(3); 5])
            .split(*area);
        for (field, row) in fields.into_iter().zip(rows) {
            render_field(f, state, field, row);
        }
    }
}

fn render_field<B: Backend>(f: &mut Frame<B>, state: &ClientFormState, field: ClientField, area: Rect) {
    let focused = field == state.current_field;
    let editing = focused && state.editing;
    let value = field.value(state.record());

    let shown = if field.is_date() {
        date_input::display(value, editing)
    } else if editing {
        format!("{value}|")
    } else {
        value.to_string()
    };

    let mut title = if field.is_required() {
        format!("{} *", field.label())
    } else {
        field.label().to_string()
    };
    if field.is_date() && editing {
        let part = match date_input::current_part(value) {
            DatePart::Year => "год",
            DatePart::Month => "месяц",
            DatePart::Day => "день",
        };
        title.push_str(&format!(" ({part})"));
    }
    let border_style = match (focused, editing) {
        (true, true) => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        (true, false) => Style::default().fg(Color::Yellow),
        _ => Style::default(),
    };
    let value_style = if editing {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };

    let lines: Vec<Spans> = shown
        .split('\n')
        .map(|line| Spans::from(Span::styled(line.to_string(), value_style)))
        .collect();
    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(title),
        );
    f.render_widget(paragraph, area);
}

fn render_buttons<B: Backend>(f: &mut Frame<B>, state: &ClientFormState, area: Rect) {
    let (submit_label, submit_style) = if state.phase == FormPhase::Submitting {
        ("[ Сохранение... ]", Style::default().fg(Color::DarkGray))
    } else {
        (
            "[ Сохранить ]",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )
    };

    let buttons = Paragraph::new(Spans::from(vec![
        Span::styled(submit_label, submit_style),
        Span::raw("  "),
        Span::styled("[ Отмена ]", Style::default().fg(Color::White)),
    ]))
    .block(Block::default().borders(Borders::TOP));
    f.render_widget(buttons, area);
}

/// Turns a key press into a form action. Submission is gated here, the way a
/// browser refuses to send a form with an empty required input.
pub fn handle_key(state: &mut ClientFormState, key: KeyEvent) -> Option<ClientFormAction> {
    if state.phase == FormPhase::Loading {
        return match key.code {
            KeyCode::Esc => Some(ClientFormAction::Cancel),
            _ => None,
        };
    }

    if key.code == KeyCode::Char('s') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return submit_attempt(state);
    }

    if state.editing {
        match key.code {
            // Notes is a text area: Enter breaks the line, only Esc leaves it
            KeyCode::Enter if state.current_field == ClientField::Notes => {
                state.edit_current_field(KeyCode::Enter)
            }
            KeyCode::Esc | KeyCode::Enter => state.toggle_editing(),
            KeyCode::Tab => {
                state.toggle_editing();
                state.next_field();
            }
            code => state.edit_current_field(code),
        }
        return None;
    }

    match key.code {
        KeyCode::Esc => return Some(ClientFormAction::Cancel),
        KeyCode::Enter => state.toggle_editing(),
        KeyCode::Down | KeyCode::Tab => state.next_field(),
        KeyCode::Up | KeyCode::BackTab => state.previous_field(),
        KeyCode::Char('s') => return submit_attempt(state),
        _ => {}
    }

    None
}

fn submit_attempt(state: &mut ClientFormState) -> Option<ClientFormAction> {
    if state.phase != FormPhase::Ready {
        return None;
    }
    if !state.check_submittable() {
        return None;
    }
    Some(ClientFormAction::Submit)
}

/// Waits briefly for a key so the caller can keep the redirect timer going.
pub fn handle_input(state: &mut ClientFormState) -> Result<Option<ClientFormAction>> {
    if !event::poll(INPUT_POLL)? {
        return Ok(None);
    }
    if let Event::Key(key) = event::read()? {
        return Ok(handle_key(state, key));
    }
    Ok(None)
}
