use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent};
use tracing::{error, warn};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::api::ClientApi;
use crate::models::ClientSummary;
use crate::navigation::{Navigator, Route};

const LIST_REFUSED: &str = "Не удалось загрузить список клиентов";
const LIST_FAILED: &str = "Ошибка при загрузке списка клиентов";

// Represents the state of the client listing screen
pub struct ClientsState {
    clients: Vec<ClientSummary>,
    list_state: ListState,
    error: Option<String>,
}

pub enum ClientAction {
    Quit,
    Reload,
}

impl ClientsState {
    pub fn new(clients: Vec<ClientSummary>) -> Self {
        let mut list_state = ListState::default();
        if !clients.is_empty() {
            list_state.select(Some(0));
        }

        Self {
            clients,
            list_state,
            error: None,
        }
    }

    /// Fetches the listing; on failure the list is empty and an error line shows.
    pub async fn load(api: &dyn ClientApi) -> Self {
        match api.list_clients().await {
            Ok(response) if response.success => Self::new(response.clients),
            Ok(response) => {
                warn!(message = ?response.message, "clients: listing refused");
                let mut state = Self::new(Vec::new());
                state.error = Some(
                    response
                        .message
                        .filter(|m| !m.is_empty())
                        .unwrap_or_else(|| LIST_REFUSED.to_string()),
                );
                state
            }
            Err(err) => {
                error!(error = %err, "clients: listing failed");
                let mut state = Self::new(Vec::new());
                state.error = Some(LIST_FAILED.to_string());
                state
            }
        }
    }

    pub fn next(&mut self) {
        if self.clients.is_empty() {
            return;
        }

        let i = match self.list_state.selected() {
            Some(i) if i + 1 < self.clients.len() => i + 1,
            _ => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.clients.is_empty() {
            return;
        }

        let i = match self.list_state.selected() {
            Some(0) | None => self.clients.len() - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }

    pub fn selected_client(&self) -> Option<&ClientSummary> {
        self.list_state.selected().and_then(|i| self.clients.get(i))
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

pub fn render_clients<B: Backend>(frame: &mut Frame<B>, state: &mut ClientsState) {
    let size = frame.size();

    let error_height = if state.error().is_some() { 3 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(error_height),
                Constraint::Min(1),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(size);

    if let Some(error) = state.error() {
        let error = Paragraph::new(error)
            .style(Style::default().fg(Color::Red))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(error, chunks[0]);
    }

    let items: Vec<ListItem> = state
        .clients
        .iter()
        .map(|client| {
            ListItem::new(Spans::from(vec![
                Span::raw(client.full_name.as_str()),
                Span::styled(
                    format!("  {}  {}", client.phone, client.passport_number),
                    Style::default().fg(Color::Gray),
                ),
            ]))
        })
        .collect();

    let clients_list = List::new(items)
        .block(Block::default().title("Клиенты").borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );

    frame.render_stateful_widget(clients_list, chunks[1], &mut state.list_state);

    let buttons_text = if state.selected_client().is_some() {
        "<N> Новый клиент | <E>/<Enter> Редактировать | <R> Обновить | <Q> Выход"
    } else {
        "<N> Новый клиент | <R> Обновить | <Q> Выход"
    };

    let buttons = Paragraph::new(buttons_text)
        .block(Block::default().borders(Borders::TOP))
        .style(Style::default().fg(Color::White));

    frame.render_widget(buttons, chunks[2]);
}

/// Opening a client goes through the navigator; the returned action is for
/// what the listing cannot do by itself.
pub fn handle_key(
    state: &mut ClientsState,
    key: KeyEvent,
    navigator: &mut dyn Navigator,
) -> Option<ClientAction> {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return Some(ClientAction::Quit),
        KeyCode::Char('r') => return Some(ClientAction::Reload),
        KeyCode::Char('n') => navigator.navigate(&Route::NewClient.path()),
        KeyCode::Char('e') | KeyCode::Enter => {
            match state.selected_client().map(|client| client.id) {
                Some(Some(id)) => navigator.navigate(&Route::EditClient(id).path()),
                Some(None) => warn!("clients: selected row has no id"),
                None => {}
            }
        }
        KeyCode::Down => state.next(),
        KeyCode::Up => state.previous(),
        _ => {}
    }
    None
}

pub fn handle_input(
    state: &mut ClientsState,
    navigator: &mut dyn Navigator,
) -> Result<Option<ClientAction>> {
    if !event::poll(Duration::from_millis(250))? {
        return Ok(None);
    }
    if let Event::Key(key) = event::read()? {
        return Ok(handle_key(state, key, navigator));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use crossterm::event::KeyModifiers;

    use super::*;
    use crate::api::ApiError;
    use crate::models::{ClientListResponse, ClientRecord, ClientResponse, SaveResponse};
    use crate::navigation::testing::RecordingNavigator;

    struct ListingApi(&'static str);

    #[async_trait]
    impl ClientApi for ListingApi {
        async fn list_clients(&self) -> Result<ClientListResponse, ApiError> {
            Ok(serde_json::from_str(self.0)?)
        }

        async fn get_client(&self, _id: i32) -> Result<ClientResponse, ApiError> {
            unreachable!()
        }

        async fn create_client(&self, _record: &ClientRecord) -> Result<SaveResponse, ApiError> {
            unreachable!()
        }

        async fn update_client(&self, _id: i32, _record: &ClientRecord) -> Result<SaveResponse, ApiError> {
            unreachable!()
        }
    }

    fn summary(id: i32, name: &str) -> ClientSummary {
        ClientSummary {
            id: Some(id),
            full_name: name.to_string(),
            phone: String::new(),
            passport_number: String::new(),
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[tokio::test]
    async fn load_selects_first_client() {
        let api = ListingApi(r#"{"success": true, "clients": [{"id": 3, "full_name": "A"}, {"id": 4}]}"#);
        let state = ClientsState::load(&api).await;
        assert!(state.error().is_none());
        assert_eq!(state.selected_client().and_then(|c| c.id), Some(3));
    }

    #[tokio::test]
    async fn refused_listing_shows_message() {
        let api = ListingApi(r#"{"success": false, "message": "Нет доступа"}"#);
        let state = ClientsState::load(&api).await;
        assert_eq!(state.error(), Some("Нет доступа"));
        assert!(state.selected_client().is_none());
    }

    #[tokio::test]
    async fn broken_listing_shows_fixed_message() {
        let api = ListingApi("not json");
        let state = ClientsState::load(&api).await;
        assert_eq!(state.error(), Some(LIST_FAILED));
    }

    #[test]
    fn selection_wraps() {
        let mut state = ClientsState::new(vec![summary(1, "A"), summary(2, "B")]);
        state.previous();
        assert_eq!(state.selected_client().and_then(|c| c.id), Some(2));
        state.next();
        assert_eq!(state.selected_client().and_then(|c| c.id), Some(1));
    }

    #[test]
    fn keys_navigate_to_form_routes() {
        let mut state = ClientsState::new(vec![summary(1, "A"), summary(42, "B")]);
        let mut navigator = RecordingNavigator::default();

        handle_key(&mut state, key(KeyCode::Char('n')), &mut navigator);
        handle_key(&mut state, key(KeyCode::Down), &mut navigator);
        handle_key(&mut state, key(KeyCode::Enter), &mut navigator);

        assert_eq!(
            navigator.visited,
            vec!["/clients/new".to_string(), "/clients/42/edit".to_string()]
        );
        assert!(matches!(
            handle_key(&mut state, key(KeyCode::Char('q')), &mut navigator),
            Some(ClientAction::Quit)
        ));
    }

    #[test]
    fn edit_on_empty_list_does_nothing() {
        let mut state = ClientsState::new(Vec::new());
        let mut navigator = RecordingNavigator::default();
        handle_key(&mut state, key(KeyCode::Char('e')), &mut navigator);
        assert!(navigator.visited.is_empty());
    }

    #[test]
    fn row_without_id_is_not_opened() {
        let mut nameless = summary(0, "A");
        nameless.id = None;
        let mut state = ClientsState::new(vec![nameless, summary(5, "B")]);
        let mut navigator = RecordingNavigator::default();

        handle_key(&mut state, key(KeyCode::Enter), &mut navigator);
        assert!(navigator.visited.is_empty());

        handle_key(&mut state, key(KeyCode::Down), &mut navigator);
        handle_key(&mut state, key(KeyCode::Enter), &mut navigator);
        assert_eq!(navigator.visited, vec!["/clients/5/edit".to_string()]);
    }
}
