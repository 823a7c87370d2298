mod app;
mod components;
mod draw;
mod keys;
mod state;
mod ui;

use crate::app::App;
use crate::components::bracket::{BracketLayout, LayoutConfig};
use crate::components::export;
use crate::state::app_settings::{AppSettings, EventTarget};
use crate::state::messages::{NetworkRequest, NetworkResponse, UiEvent};
use crate::state::network::{LoadingState, NetworkWorker};
use crate::state::refresher::PeriodicRefresher;
use anyhow::{Context, bail};
use crossterm::event::{self as crossterm_event, DisableMouseCapture, EnableMouseCapture, Event};
use crossterm::{cursor, execute, terminal};
use log::{LevelFilter, error, info};
use std::io::Stdout;
use std::path::PathBuf;
use std::sync::Arc;
use std::{io, panic};
use tokio::sync::{Mutex, mpsc};
use tourney_api::client::TourneyApi;
use tui::{Terminal, backend::CrosstermBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let options = match parse_args(std::env::args().skip(1)) {
        Ok(CliCommand::Help) => {
            println!("{}", usage_text());
            return Ok(());
        }
        Ok(CliCommand::Version) => {
            println!("brackets {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Ok(CliCommand::Run(options)) => options,
        Err(message) => {
            eprintln!("{message}\n\n{}", usage_text());
            std::process::exit(2);
        }
    };

    let mut settings = AppSettings::load();
    options.apply(&mut settings);
    let Some(target) = settings.target() else {
        bail!("no event selected: pass EVENT_ID or set BRACKETS_EVENT_ID");
    };
    let client = TourneyApi::new(&settings.api_url).with_cookie(settings.cookie.clone());

    if let Some(export_target) = options.export {
        return run_export(&client, &target, export_target).await;
    }

    better_panic::install();

    let backend = CrosstermBackend::new(io::stdout());
    let terminal = Terminal::new(backend)?;

    setup_panic_hook();
    setup_terminal()?;

    let level = settings.log_level.unwrap_or(LevelFilter::Error);
    tui_logger::init_logger(level)?;
    tui_logger::set_default_level(level);
    info!("showing event {} from {}", target.event_id, client.base_url());

    let refresh_interval = settings.refresh_interval;
    let app = Arc::new(Mutex::new(App::new(settings)));

    let (ui_event_tx, ui_event_rx) = mpsc::channel::<UiEvent>(100);
    let (network_req_tx, network_req_rx) = mpsc::channel::<NetworkRequest>(100);
    let (network_resp_tx, network_resp_rx) = mpsc::channel::<NetworkResponse>(100);

    // Input handler thread
    let input_handler = tokio::spawn(input_handler_task(ui_event_tx.clone()));

    // Network thread
    let network_worker = NetworkWorker::new(client, target, network_req_rx, network_resp_tx);
    let network_task = tokio::spawn(network_worker.run());

    // Periodic snapshot refresh
    let periodic_task = refresh_interval
        .map(|period| tokio::spawn(PeriodicRefresher::new(ui_event_tx.clone(), period).run()));

    // Trigger bracket load on startup
    let _ = ui_event_tx.send(UiEvent::AppStarted).await;

    main_ui_loop(terminal, app, ui_event_rx, network_req_tx, network_resp_rx).await;

    input_handler.abort();
    network_task.abort();
    if let Some(task) = periodic_task {
        task.abort();
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum ExportTarget {
    Svg(PathBuf),
    Json(PathBuf),
}

#[derive(Debug, Default, Clone, PartialEq)]
struct CliOptions {
    event_id: Option<String>,
    teams: bool,
    api_url: Option<String>,
    export: Option<ExportTarget>,
}

impl CliOptions {
    /// Command line flags win over the environment.
    fn apply(&self, settings: &mut AppSettings) {
        if let Some(event_id) = &self.event_id {
            settings.event_id = Some(event_id.clone());
        }
        if self.teams {
            settings.multiplayer = true;
        }
        if let Some(api_url) = &self.api_url {
            settings.api_url = api_url.clone();
        }
    }
}

#[derive(Debug, PartialEq)]
enum CliCommand {
    Run(CliOptions),
    Help,
    Version,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<CliCommand, String> {
    let mut options = CliOptions::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(CliCommand::Help),
            "-V" | "--version" => return Ok(CliCommand::Version),
            "--teams" => options.teams = true,
            "--api" => {
                options.api_url = Some(args.next().ok_or("--api needs a URL")?);
            }
            "--svg" | "--json" => {
                let path = PathBuf::from(args.next().ok_or(format!("{arg} needs a file path"))?);
                if options.export.is_some() {
                    return Err("--svg and --json are mutually exclusive".to_string());
                }
                options.export = Some(if arg == "--svg" {
                    ExportTarget::Svg(path)
                } else {
                    ExportTarget::Json(path)
                });
            }
            flag if flag.starts_with('-') => return Err(format!("Unknown argument: {flag}")),
            event_id => {
                if options.event_id.is_some() {
                    return Err(format!("Unexpected extra argument: {event_id}"));
                }
                options.event_id = Some(event_id.to_string());
            }
        }
    }

    Ok(CliCommand::Run(options))
}

fn usage_text() -> &'static str {
    "brackets - single-elimination bracket viewer for tournament events

Usage:
  brackets [EVENT_ID] [--teams] [--api URL]
  brackets [EVENT_ID] [--teams] [--api URL] --svg FILE
  brackets [EVENT_ID] [--teams] [--api URL] --json FILE
  brackets --help
  brackets --version

Options:
  --teams       Event is team-vs-team (default user-vs-user)
  --api URL     Backend base URL
  --svg FILE    Fetch once, write the bracket as SVG and exit
  --json FILE   Fetch once, write the computed layout as JSON and exit

Environment:
  BRACKETS_API_URL        Backend base URL (default http://localhost:3000)
  BRACKETS_EVENT_ID       Event to display
  BRACKETS_MULTIPLAYER    1/true/yes for team events
  BRACKETS_COOKIE         Cookie header forwarded to the backend
  BRACKETS_REFRESH_SECS   Refresh period in seconds, 0 disables (default 30)
  BRACKETS_LOG            Log level: error, warn, info, debug, trace"
}

async fn run_export(client: &TourneyApi, target: &EventTarget, export_target: ExportTarget) -> anyhow::Result<()> {
    let bracket = client
        .fetch_bracket(&target.event_id, target.multiplayer)
        .await
        .with_context(|| format!("failed to fetch event {}", target.event_id))?;
    let layout = BracketLayout::compute(&bracket, LayoutConfig::default());

    let (path, contents) = match export_target {
        ExportTarget::Svg(path) => (path, export::render_svg(&bracket, &layout)),
        ExportTarget::Json(path) => (path, export::render_json(&bracket, &layout)?),
    };
    std::fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    println!(
        "wrote {} ({} rounds, {} matches)",
        path.display(),
        bracket.rounds.len(),
        bracket.match_count()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// UI loop
// ---------------------------------------------------------------------------

async fn main_ui_loop(
    mut terminal: Terminal<CrosstermBackend<Stdout>>,
    app: Arc<Mutex<App>>,
    mut ui_events: mpsc::Receiver<UiEvent>,
    network_requests: mpsc::Sender<NetworkRequest>,
    mut network_responses: mpsc::Receiver<NetworkResponse>,
) {
    let mut loading = LoadingState::default();

    loop {
        tokio::select! {
            Some(ui_event) = ui_events.recv() => {
                let should_redraw = handle_ui_event(ui_event, &app, &network_requests).await;
                if should_redraw && !loading.is_loading {
                    let mut app_guard = app.lock().await;
                    draw::draw(&mut terminal, &mut app_guard, loading);
                }
            }

            Some(response) = network_responses.recv() => {
                let should_redraw = handle_network_response(response, &app, &mut loading).await;
                if should_redraw {
                    let mut app_guard = app.lock().await;
                    draw::draw(&mut terminal, &mut app_guard, loading);
                }
            }
        }
    }
}

async fn handle_ui_event(
    ui_event: UiEvent,
    app: &Arc<Mutex<App>>,
    network_requests: &mpsc::Sender<NetworkRequest>,
) -> bool {
    match ui_event {
        UiEvent::AppStarted => {
            let request = app.lock().await.request_bracket();
            keys::send_request(request, app, network_requests).await;
            true
        }
        UiEvent::RefreshTick => {
            let request = app.lock().await.refresh_tick();
            if let Some(request) = request {
                keys::send_request(request, app, network_requests).await;
            }
            true
        }
        UiEvent::KeyPressed(key_event) => {
            keys::handle_key_bindings(key_event, app, network_requests).await;
            true
        }
        UiEvent::Mouse(mouse_event) => keys::handle_mouse(mouse_event, app).await,
        UiEvent::Resize => true,
    }
}

async fn handle_network_response(
    response: NetworkResponse,
    app: &Arc<Mutex<App>>,
    loading: &mut LoadingState,
) -> bool {
    match response {
        NetworkResponse::LoadingStateChanged { loading_state } => {
            *loading = loading_state;
            return true;
        }
        NetworkResponse::BracketLoaded { generation, bracket } => {
            app.lock().await.on_bracket_loaded(generation, bracket);
        }
        NetworkResponse::WinnerDeclared { match_id, generation, refreshed } => {
            app.lock().await.on_winner_declared(match_id, generation, refreshed);
        }
        NetworkResponse::DecisionFailed { match_id, message } => {
            app.lock().await.on_decision_failed(match_id, message);
        }
        NetworkResponse::Error { message } => {
            error!("Network error: {message}");
            app.lock().await.on_load_failed(message);
        }
    }
    !loading.is_loading
}

async fn input_handler_task(ui_events: mpsc::Sender<UiEvent>) {
    loop {
        if let Ok(event) = crossterm_event::read() {
            let ui_event = match event {
                Event::Key(key_event) => Some(UiEvent::KeyPressed(key_event)),
                Event::Mouse(mouse_event) => Some(UiEvent::Mouse(mouse_event)),
                Event::Resize(_, _) => Some(UiEvent::Resize),
                _ => None,
            };

            if let Some(ui_event) = ui_event
                && ui_events.send(ui_event).await.is_err()
            {
                break;
            }
        }
    }
}

fn setup_terminal() -> io::Result<()> {
    let mut stdout = io::stdout();
    execute!(stdout, cursor::Hide)?;
    execute!(stdout, terminal::EnterAlternateScreen)?;
    execute!(stdout, terminal::Clear(terminal::ClearType::All))?;
    execute!(stdout, EnableMouseCapture)?;
    terminal::enable_raw_mode()
}

/// Best effort: also runs from the panic hook, where there is nobody to report to.
pub fn cleanup_terminal() {
    let mut stdout = io::stdout();
    let _ = execute!(stdout, DisableMouseCapture);
    let _ = execute!(stdout, cursor::MoveTo(0, 0));
    let _ = execute!(stdout, terminal::Clear(terminal::ClearType::All));
    let _ = execute!(stdout, terminal::LeaveAlternateScreen);
    let _ = execute!(stdout, cursor::Show);
    let _ = terminal::disable_raw_mode();
}

fn setup_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        cleanup_terminal();
        better_panic::Settings::auto().create_panic_handler()(panic_info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn parse(args: &[&str]) -> Result<CliCommand, String> {
        parse_args(args.iter().map(|a| a.to_string()))
    }

    #[test]
    fn no_arguments_runs_with_environment() {
        assert_eq!(parse(&[]), Ok(CliCommand::Run(CliOptions::default())));
    }

    #[test]
    fn help_and_version_short_circuit() {
        assert_eq!(parse(&["42", "--help"]), Ok(CliCommand::Help));
        assert_eq!(parse(&["-V"]), Ok(CliCommand::Version));
    }

    #[test]
    fn full_command_line() {
        let Ok(CliCommand::Run(options)) =
            parse(&["42", "--teams", "--api", "https://t.example.com", "--svg", "out.svg"])
        else {
            panic!("expected a run command");
        };
        assert_eq!(
            options,
            CliOptions {
                event_id: Some("42".into()),
                teams: true,
                api_url: Some("https://t.example.com".into()),
                export: Some(ExportTarget::Svg(PathBuf::from("out.svg"))),
            }
        );
    }

    #[test]
    fn bad_command_lines_are_rejected() {
        assert!(parse(&["--api"]).is_err());
        assert!(parse(&["--svg", "a.svg", "--json", "b.json"]).is_err());
        assert!(parse(&["1", "2"]).is_err());
        assert_eq!(parse(&["--frobnicate"]), Err("Unknown argument: --frobnicate".to_string()));
    }

    #[test]
    fn flags_override_environment() {
        let mut settings = AppSettings {
            event_id: Some("1".into()),
            refresh_interval: Some(Duration::from_secs(9)),
            ..AppSettings::default()
        };
        CliOptions {
            event_id: Some("2".into()),
            teams: true,
            api_url: None,
            export: None,
        }
        .apply(&mut settings);

        assert_eq!(settings.target(), Some(EventTarget { event_id: "2".into(), multiplayer: true }));
        assert_eq!(settings.api_url, "http://localhost:3000");
        assert_eq!(settings.refresh_interval, Some(Duration::from_secs(9)));
    }

    #[tokio::test]
    async fn export_writes_svg_from_the_server_snapshot() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/event/3/match")
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"id": 1, "keyNumber": 0, "matchNumber": 0, "winnerId": null,
                     "firstUser": {"id": 1, "username": "ann"}, "secondUser": {"id": 2, "username": "bob"}}]"#,
            )
            .create_async()
            .await;

        let path = std::env::temp_dir().join(format!("brackets-export-{}.svg", std::process::id()));
        let target = EventTarget { event_id: "3".into(), multiplayer: false };
        run_export(&TourneyApi::new(&server.url()), &target, ExportTarget::Svg(path.clone()))
            .await
            .unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        mock.assert_async().await;
        assert!(svg.contains(">ann</text>"));
        assert!(svg.contains(">bob</text>"));
    }
}
