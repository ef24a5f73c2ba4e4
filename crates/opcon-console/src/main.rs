mod state;
mod theme;
mod ui;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use opcon_client::ConsoleClient;
use ratatui::{backend::CrosstermBackend, Terminal};
use state::{
    AgentCommandKind, App, ConfigCommandKind, ExperimentCommandKind, NetEvent, Request,
};
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

const NET_QUEUE_CAPACITY: usize = 64;

#[derive(Parser, Debug)]
#[command(
    name = "opcon-console",
    about = "Terminal operator console for the automation platform backend"
)]
struct Cli {
    /// Backend base address, e.g. http://127.0.0.1:8000. Falls back to
    /// OPCON_BACKEND_URL, then to the local default.
    #[arg(long)]
    backend_url: Option<String>,
}

fn resolve_backend_url(cli: &Cli) -> String {
    if let Some(url) = cli.backend_url.as_deref() {
        if !url.trim().is_empty() {
            return url.to_string();
        }
    }
    if let Ok(value) = std::env::var("OPCON_BACKEND_URL") {
        if !value.trim().is_empty() {
            return value;
        }
    }
    "http://127.0.0.1:8000".to_string()
}

fn parse_bool_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_enabled = std::env::var("OPCON_LOG_STDOUT")
        .ok()
        .and_then(|value| parse_bool_flag(&value))
        .unwrap_or(false);
    if stdout_enabled {
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    } else {
        // The alternate screen owns stdout; keep diagnostics out of it.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::sink)
            .try_init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let backend_url = resolve_backend_url(&cli);
    let client = Arc::new(ConsoleClient::new(&backend_url));
    let mut app = App::new(client.base_url().to_string());

    let (net_tx, mut net_rx) = mpsc::channel::<NetEvent>(NET_QUEUE_CAPACITY);

    // Agent list and log are fetched once up front; everything else is
    // pulled on demand.
    dispatch(Request::FetchAgents, &client, &net_tx);
    dispatch(Request::FetchLog, &client, &net_tx);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let mut events = EventStream::new();

    loop {
        terminal.draw(|frame| ui::render(frame, &app))?;
        tokio::select! {
            Some(event) = net_rx.recv() => {
                for followup in app.apply_net_event(event) {
                    dispatch(followup, &client, &net_tx);
                }
            }
            maybe_event = events.next() => {
                if let Some(Ok(Event::Key(key))) = maybe_event {
                    if matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
                        for request in app.handle_key(key) {
                            dispatch(request, &client, &net_tx);
                        }
                    }
                }
            }
        }
        if app.should_quit {
            break;
        }
    }

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Execute one request on its own task; the completion re-enters the event
/// loop as a [`NetEvent`] carrying the context it was issued for.
fn dispatch(request: Request, client: &Arc<ConsoleClient>, tx: &mpsc::Sender<NetEvent>) {
    debug!(?request, "dispatching backend request");
    let client = Arc::clone(client);
    let tx = tx.clone();
    tokio::spawn(async move {
        let event = run_request(request, &client).await;
        if tx.send(event).await.is_err() {
            warn!("event loop closed before a completion could be delivered");
        }
    });
}

async fn run_request(request: Request, client: &ConsoleClient) -> NetEvent {
    match request {
        Request::FetchAgents => NetEvent::Agents(client.list_agents().await),
        Request::FetchStatuses => NetEvent::Statuses(client.list_statuses().await),
        Request::StartAgent { identity } => {
            let result = client.start_agent(&identity).await;
            NetEvent::AgentCommand {
                kind: AgentCommandKind::Start,
                identity,
                result,
            }
        }
        Request::StopAgent { identity } => {
            let result = client.stop_agent(&identity).await;
            NetEvent::AgentCommand {
                kind: AgentCommandKind::Stop,
                identity,
                result,
            }
        }
        Request::RemoveAgent { identity } => {
            let result = client.remove_agent(&identity).await;
            NetEvent::AgentCommand {
                kind: AgentCommandKind::Remove,
                identity,
                result,
            }
        }
        Request::InstallAgent(install) => NetEvent::Installed {
            result: client.install_agent(&install).await,
        },
        Request::FetchConfigs { agent } => {
            let result = client.list_configs(&agent).await;
            NetEvent::Configs { agent, result }
        }
        Request::FetchConfigContent { agent, config } => {
            let result = client.config_content(&agent, &config).await;
            NetEvent::ConfigContent {
                agent,
                config,
                result,
            }
        }
        Request::SaveConfig {
            agent,
            config,
            content,
        } => {
            let result = client.save_config(&agent, &config, &content).await;
            NetEvent::ConfigCommand {
                kind: ConfigCommandKind::Save,
                agent,
                config,
                result,
            }
        }
        Request::AddConfig { agent, request } => {
            let config = request.config_name.clone();
            let result = client.add_config(&agent, &request).await;
            NetEvent::ConfigCommand {
                kind: ConfigCommandKind::Add,
                agent,
                config,
                result,
            }
        }
        Request::DeleteConfig { agent, config } => {
            let result = client.delete_config(&agent, &config).await;
            NetEvent::ConfigCommand {
                kind: ConfigCommandKind::Delete,
                agent,
                config,
                result,
            }
        }
        Request::SubmitExperiment(submission) => NetEvent::ExperimentSubmitted {
            result: client.submit_experiment(&submission).await,
        },
        Request::AuthorizeExperiment {
            experiment_id,
            supervisor_name,
        } => {
            let result = client
                .authorize_experiment(&experiment_id, &supervisor_name)
                .await;
            NetEvent::ExperimentCommand {
                kind: ExperimentCommandKind::Authorize,
                experiment_id,
                result,
            }
        }
        Request::FinalizeExperiment {
            experiment_id,
            readiness,
        } => {
            let result = client
                .finalize_experiment(&experiment_id, &readiness)
                .await;
            NetEvent::ExperimentCommand {
                kind: ExperimentCommandKind::Finalize,
                experiment_id,
                result,
            }
        }
        Request::FetchExperiments => NetEvent::Experiments(client.list_experiments().await),
        Request::FetchExperimentDetail { experiment_id } => {
            let result = client.experiment_data(&experiment_id).await;
            NetEvent::ExperimentDetail {
                experiment_id,
                result,
            }
        }
        Request::FetchTopics => NetEvent::Topics(client.list_topics().await),
        Request::FetchLog => NetEvent::Log(client.fetch_log().await),
    }
}
