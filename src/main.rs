mod api;
mod config;
mod models;
mod navigation;
mod ui;

use std::fs::OpenOptions;
use std::io;
use std::sync::Mutex;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use crate::api::{ClientApi, HttpClientApi};
use crate::config::{Cli, Config};
use crate::navigation::{Navigator, Route};
use crate::ui::{
    client_form::{
        handle_input as handle_client_form_input, render_client_form, ClientFormAction,
        ClientFormState, FormPhase, SubmitRequest,
    },
    clients::{handle_input as handle_clients_input, render_clients, ClientAction, ClientsState},
};

// Represents the current screen in the app
enum AppScreen {
    Clients(ClientsState),
    ClientForm(ClientFormState),
}

/// Collects navigation requests; the main loop switches screens between frames.
#[derive(Default)]
struct AppNavigator {
    pending: Option<String>,
}

impl Navigator for AppNavigator {
    fn navigate(&mut self, path: &str) {
        self.pending = Some(path.to_string());
    }
}

// Main application state
struct AppState {
    api: Box<dyn ClientApi>,
    screen: AppScreen,
    navigator: AppNavigator,
    // Drawn as `Submitting` for one frame before it is sent
    pending_submit: Option<SubmitRequest>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::init(&cli)?;
    init_logging(&config)?;
    info!(api_url = config.clients_api_url(), "starting client registry");

    let api = HttpClientApi::from_config(&config)?;

    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app_state = AppState {
        api: Box::new(api),
        screen: AppScreen::ClientForm(ClientFormState::new(None)),
        navigator: AppNavigator::default(),
        pending_submit: None,
    };
    open_route(&mut app_state, cli.start_route()).await;

    let result = run_app(&mut terminal, &mut app_state).await;

    terminal::disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        println!("Error: {}", err);
    }

    Ok(())
}

// The terminal owns stdout, so diagnostics go to a file
fn init_logging(config: &Config) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app_state: &mut AppState) -> Result<()> {
    loop {
        terminal.draw(|f| match &mut app_state.screen {
            AppScreen::Clients(state) => render_clients(f, state),
            AppScreen::ClientForm(state) => render_client_form(f, state),
        })?;

        let should_quit = match app_state.screen {
            AppScreen::Clients(_) => handle_clients_screen(app_state).await?,
            AppScreen::ClientForm(_) => handle_client_form_screen(app_state).await?,
        };

        if should_quit {
            break;
        }

        follow_navigation(app_state).await;
    }

    Ok(())
}

async fn follow_navigation(app_state: &mut AppState) {
    if let Some(path) = app_state.navigator.pending.take() {
        let route = Route::parse(&path).unwrap_or_else(|| {
            warn!(path = %path, "unknown route, showing client list");
            Route::ClientList
        });
        open_route(app_state, route).await;
    }
}

async fn open_route(app_state: &mut AppState, route: Route) {
    info!(path = %route.path(), "navigate");
    // Whatever the old screen had in flight goes with it
    app_state.pending_submit = None;
    app_state.screen = match route {
        Route::ClientList => AppScreen::Clients(ClientsState::load(app_state.api.as_ref()).await),
        Route::NewClient => AppScreen::ClientForm(ClientFormState::new(None)),
        Route::EditClient(id) => AppScreen::ClientForm(ClientFormState::new(Some(id))),
    };
}

async fn handle_clients_screen(app_state: &mut AppState) -> Result<bool> {
    let AppState {
        api,
        screen,
        navigator,
        ..
    } = app_state;
    let AppScreen::Clients(state) = screen else {
        return Ok(false);
    };

    match handle_clients_input(state, navigator)? {
        Some(ClientAction::Quit) => return Ok(true),
        Some(ClientAction::Reload) => {
            *state = ClientsState::load(api.as_ref()).await;
        }
        None => {}
    }

    Ok(false)
}

/// Work the form owes before it reads input: the fetch after the loading
/// frame, a submission already drawn as in flight, a redirect that came due.
/// Returns true when one of them ran.
async fn advance_client_form(app_state: &mut AppState, now: Instant) -> bool {
    let AppState {
        api,
        screen,
        navigator,
        pending_submit,
    } = app_state;
    let AppScreen::ClientForm(form) = screen else {
        return false;
    };

    if form.phase() == FormPhase::Loading {
        form.load(api.as_ref()).await;
        return true;
    }

    if let Some(request) = pending_submit.take() {
        let result = request.send(api.as_ref()).await;
        form.finish_submit(request.mode, result, now);
        return true;
    }

    form.poll_redirect(now, navigator)
}

fn apply_client_form_action(app_state: &mut AppState, action: ClientFormAction) {
    let AppScreen::ClientForm(form) = &mut app_state.screen else {
        return;
    };

    match action {
        ClientFormAction::Cancel => form.cancel(&mut app_state.navigator),
        ClientFormAction::Submit => app_state.pending_submit = form.begin_submit(),
    }
}

async fn handle_client_form_screen(app_state: &mut AppState) -> Result<bool> {
    if advance_client_form(app_state, Instant::now()).await {
        return Ok(false);
    }

    let AppScreen::ClientForm(form) = &mut app_state.screen else {
        return Ok(false);
    };
    if let Some(action) = handle_client_form_input(form)? {
        apply_client_form_action(app_state, action);
    }

    Ok(false)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::api::ApiError;
    use crate::models::{ClientListResponse, ClientRecord, ClientResponse, SaveResponse};
    use crate::ui::client_form::{Banner, ClientField, REDIRECT_DELAY};

    type CallLog = Arc<std::sync::Mutex<Vec<String>>>;

    /// Answers every call with success and logs what was asked.
    struct ScriptedApi {
        calls: CallLog,
    }

    fn body<T: serde::de::DeserializeOwned>(json: &str) -> Result<T, ApiError> {
        Ok(serde_json::from_str(json)?)
    }

    #[async_trait]
    impl ClientApi for ScriptedApi {
        async fn list_clients(&self) -> Result<ClientListResponse, ApiError> {
            self.calls.lock().unwrap().push("GET /api/clients".to_string());
            body(r#"{"success": true, "clients": [{"id": 1, "full_name": "A"}]}"#)
        }

        async fn get_client(&self, id: i32) -> Result<ClientResponse, ApiError> {
            self.calls.lock().unwrap().push(format!("GET /api/clients/{id}"));
            body(r#"{"success": true, "client": {"full_name": "A", "phone": "1", "passport_number": "P"}}"#)
        }

        async fn create_client(&self, _record: &ClientRecord) -> Result<SaveResponse, ApiError> {
            self.calls.lock().unwrap().push("POST /api/clients".to_string());
            body(r#"{"success": true, "message": "Created"}"#)
        }

        async fn update_client(&self, id: i32, _record: &ClientRecord) -> Result<SaveResponse, ApiError> {
            self.calls.lock().unwrap().push(format!("PUT /api/clients/{id}"));
            body(r#"{"success": true}"#)
        }
    }

    fn app_with_new_form() -> (AppState, CallLog) {
        let calls = CallLog::default();
        let mut form = ClientFormState::new(None);
        form.update_field(ClientField::FullName, "Ivanov I.I.");
        form.update_field(ClientField::Phone, "+70000000000");
        form.update_field(ClientField::PassportNumber, "1234 567890");
        let app_state = AppState {
            api: Box::new(ScriptedApi {
                calls: calls.clone(),
            }),
            screen: AppScreen::ClientForm(form),
            navigator: AppNavigator::default(),
            pending_submit: None,
        };
        (app_state, calls)
    }

    fn form(app_state: &AppState) -> &ClientFormState {
        match &app_state.screen {
            AppScreen::ClientForm(form) => form,
            AppScreen::Clients(_) => panic!("expected the client form"),
        }
    }

    fn logged(calls: &CallLog) -> Vec<String> {
        calls.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn submission_is_sent_on_the_next_pass_and_redirects_once() {
        let (mut app_state, calls) = app_with_new_form();
        let start = Instant::now();

        apply_client_form_action(&mut app_state, ClientFormAction::Submit);
        assert!(app_state.pending_submit.is_some());
        assert_eq!(form(&app_state).phase(), FormPhase::Submitting);
        assert!(logged(&calls).is_empty());

        assert!(advance_client_form(&mut app_state, start).await);
        assert_eq!(logged(&calls), vec!["POST /api/clients"]);
        assert_eq!(form(&app_state).phase(), FormPhase::Ready);
        assert_eq!(form(&app_state).banner(), Some(&Banner::Success("Created".to_string())));

        assert!(!advance_client_form(&mut app_state, start + Duration::from_millis(1999)).await);
        assert!(app_state.navigator.pending.is_none());

        assert!(advance_client_form(&mut app_state, start + REDIRECT_DELAY).await);
        assert_eq!(app_state.navigator.pending.as_deref(), Some("/clients"));
        assert!(!advance_client_form(&mut app_state, start + Duration::from_secs(5)).await);

        follow_navigation(&mut app_state).await;
        assert!(matches!(app_state.screen, AppScreen::Clients(_)));
        assert!(app_state.navigator.pending.is_none());
        assert_eq!(logged(&calls), vec!["POST /api/clients", "GET /api/clients"]);
    }

    #[tokio::test]
    async fn cancelling_drops_an_unsent_submission() {
        let (mut app_state, calls) = app_with_new_form();

        apply_client_form_action(&mut app_state, ClientFormAction::Submit);
        apply_client_form_action(&mut app_state, ClientFormAction::Cancel);
        follow_navigation(&mut app_state).await;

        assert!(app_state.pending_submit.is_none());
        assert!(matches!(app_state.screen, AppScreen::Clients(_)));
        assert_eq!(logged(&calls), vec!["GET /api/clients"]);
    }

    #[tokio::test]
    async fn leaving_the_form_drops_its_redirect() {
        let (mut app_state, calls) = app_with_new_form();
        let start = Instant::now();

        apply_client_form_action(&mut app_state, ClientFormAction::Submit);
        advance_client_form(&mut app_state, start).await;
        assert!(form(&app_state).redirect_at().is_some());

        app_state.navigator.navigate("/clients/new");
        follow_navigation(&mut app_state).await;
        assert!(form(&app_state).redirect_at().is_none());

        assert!(!advance_client_form(&mut app_state, start + Duration::from_secs(10)).await);
        assert!(app_state.navigator.pending.is_none());
        assert_eq!(logged(&calls), vec!["POST /api/clients"]);
    }

    #[tokio::test]
    async fn edit_route_loads_on_first_pass() {
        let (mut app_state, calls) = app_with_new_form();

        app_state.navigator.navigate("/clients/42/edit");
        follow_navigation(&mut app_state).await;
        assert_eq!(form(&app_state).phase(), FormPhase::Loading);

        assert!(advance_client_form(&mut app_state, Instant::now()).await);
        assert_eq!(form(&app_state).phase(), FormPhase::Ready);
        assert_eq!(form(&app_state).record().full_name, "A");
        assert_eq!(logged(&calls), vec!["GET /api/clients/42"]);

        apply_client_form_action(&mut app_state, ClientFormAction::Submit);
        advance_client_form(&mut app_state, Instant::now()).await;
        assert_eq!(logged(&calls), vec!["GET /api/clients/42", "PUT /api/clients/42"]);
    }

    #[tokio::test]
    async fn unknown_path_falls_back_to_listing() {
        let (mut app_state, _calls) = app_with_new_form();
        app_state.navigator.navigate("/nowhere");
        follow_navigation(&mut app_state).await;
        assert!(matches!(app_state.screen, AppScreen::Clients(_)));
    }
}
