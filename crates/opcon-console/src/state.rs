//! Resource state store and orchestration controller.
//!
//! The store holds the remote resource families (agent list, status map,
//! config list, config content, experiment scratch state) and is mutated in
//! exactly one place: [`App::apply_net_event`], which the event loop calls
//! once per completed network request, to completion, before the next event.
//! Controller operations validate locally and return typed [`Request`]
//! values; follow-up refetches demanded by the invalidation rules are also
//! returned as data, never chained inside callbacks.
//!
//! Config-scoped fetches are tagged with the selection context they were
//! issued for. A completion whose tag no longer matches the current
//! selection is discarded without touching the store, so responses may
//! arrive in any order.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use opcon_client::ClientError;
use opcon_core::wire::{
    ExperimentReadiness, ExperimentSubmission, InstallAgentRequest, StoreConfigRequest,
    SubmitExperimentResponse,
};
use opcon_core::{split_list_field, Agent, AgentStatus};
use serde_json::Value;
use std::collections::BTreeMap;

/// Outbound network intent. One controller invocation emits at most one of
/// these; invalidation follow-ups are emitted by `apply_net_event`.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    FetchAgents,
    FetchStatuses,
    StartAgent { identity: String },
    StopAgent { identity: String },
    RemoveAgent { identity: String },
    InstallAgent(InstallAgentRequest),
    FetchConfigs { agent: String },
    FetchConfigContent { agent: String, config: String },
    SaveConfig { agent: String, config: String, content: String },
    AddConfig { agent: String, request: StoreConfigRequest },
    DeleteConfig { agent: String, config: String },
    SubmitExperiment(ExperimentSubmission),
    AuthorizeExperiment { experiment_id: String, supervisor_name: String },
    FinalizeExperiment { experiment_id: String, readiness: ExperimentReadiness },
    FetchExperiments,
    FetchExperimentDetail { experiment_id: String },
    FetchTopics,
    FetchLog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentCommandKind {
    Start,
    Stop,
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigCommandKind {
    Save,
    Add,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExperimentCommandKind {
    Authorize,
    Finalize,
}

/// A completed network request, tagged with the context it was issued for.
#[derive(Debug)]
pub enum NetEvent {
    Agents(Result<Vec<Agent>, ClientError>),
    Statuses(Result<BTreeMap<String, AgentStatus>, ClientError>),
    Configs {
        agent: String,
        result: Result<Vec<String>, ClientError>,
    },
    ConfigContent {
        agent: String,
        config: String,
        result: Result<String, ClientError>,
    },
    AgentCommand {
        kind: AgentCommandKind,
        identity: String,
        result: Result<Option<String>, ClientError>,
    },
    Installed {
        result: Result<Option<String>, ClientError>,
    },
    ConfigCommand {
        kind: ConfigCommandKind,
        agent: String,
        config: String,
        result: Result<Option<String>, ClientError>,
    },
    ExperimentSubmitted {
        result: Result<SubmitExperimentResponse, ClientError>,
    },
    ExperimentCommand {
        kind: ExperimentCommandKind,
        experiment_id: String,
        result: Result<Option<String>, ClientError>,
    },
    Experiments(Result<Vec<Value>, ClientError>),
    ExperimentDetail {
        experiment_id: String,
        result: Result<Value, ClientError>,
    },
    Topics(Result<Value, ClientError>),
    Log(Result<String, ClientError>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Agents,
    Install,
    Configs,
    Experiments,
    Log,
}

impl Panel {
    pub fn title(self) -> &'static str {
        match self {
            Panel::Agents => "Agents",
            Panel::Install => "Install",
            Panel::Configs => "Config Store",
            Panel::Experiments => "Experiments",
            Panel::Log => "Log",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Panel::Agents => Panel::Install,
            Panel::Install => Panel::Configs,
            Panel::Configs => Panel::Experiments,
            Panel::Experiments => Panel::Log,
            Panel::Log => Panel::Agents,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Panel::Agents => Panel::Log,
            Panel::Install => Panel::Agents,
            Panel::Configs => Panel::Install,
            Panel::Experiments => Panel::Configs,
            Panel::Log => Panel::Experiments,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFocus {
    List,
    Editor,
    AddForm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExperimentFocus {
    Forms,
    Browser,
}

// Experiment form rows, flattened for cursor navigation.
pub const EXP_FIELD_ID: usize = 0;
pub const EXP_FIELD_EXPERIMENTER: usize = 1;
pub const EXP_FIELD_DESCRIPTION: usize = 2;
pub const EXP_FIELD_START: usize = 3;
pub const EXP_FIELD_STOP: usize = 4;
pub const EXP_FIELD_PLANTS: usize = 5;
pub const EXP_ACTION_SUBMIT: usize = 6;
pub const EXP_FIELD_AUTH_ID: usize = 7;
pub const EXP_FIELD_SUPERVISOR: usize = 8;
pub const EXP_ACTION_AUTHORIZE: usize = 9;
pub const EXP_FIELD_READY_ID: usize = 10;
pub const EXP_FIELD_READY_AGENTS: usize = 11;
pub const EXP_FIELD_TOPICS: usize = 12;
pub const EXP_ACTION_FINALIZE: usize = 13;
pub const EXP_ROWS: usize = 14;

pub const INSTALL_ROWS: usize = 4;
pub const ADD_CONFIG_ROWS: usize = 3;

pub struct App {
    pub backend_label: String,

    // Resource families.
    pub agents: Vec<Agent>,
    pub selected_agent: Option<Agent>,
    pub statuses: BTreeMap<String, AgentStatus>,
    pub config_editor_open: bool,
    pub configs: Vec<String>,
    pub selected_config: Option<String>,
    pub config_content: String,
    pub config_dirty: bool,

    // Install form. Fields survive a successful install so the operator can
    // re-issue with small edits.
    pub install_base_dir: String,
    pub install_config_file: String,
    pub install_tag: String,
    pub install_cursor: usize,

    // Add-config form.
    pub add_config_open: bool,
    pub new_config_name: String,
    pub new_config_path: String,
    pub add_cursor: usize,

    // Experiment lifecycle scratch fields.
    pub experiment_id: String,
    pub experimenter: String,
    pub description: String,
    pub start_time: String,
    pub stop_time: String,
    pub plants: String,
    pub auth_experiment_id: String,
    pub supervisor_name: String,
    pub ready_experiment_id: String,
    pub ready_agents: String,
    pub topics_to_log: String,
    pub experiment_cursor: usize,
    pub experiment_focus: ExperimentFocus,
    pub experiments: Vec<Value>,
    pub experiment_browser_cursor: usize,
    pub experiment_detail: Option<Value>,
    pub topics: Option<Value>,

    // Log pane.
    pub log_content: String,
    pub log_scroll: u16,

    // Presentation.
    pub panel: Panel,
    pub config_focus: ConfigFocus,
    pub status_note: Option<String>,
    pub should_quit: bool,
}

impl App {
    pub fn new(backend_label: String) -> Self {
        Self {
            backend_label,
            agents: Vec::new(),
            selected_agent: None,
            statuses: BTreeMap::new(),
            config_editor_open: false,
            configs: Vec::new(),
            selected_config: None,
            config_content: String::new(),
            config_dirty: false,
            install_base_dir: String::new(),
            install_config_file: String::new(),
            install_tag: String::new(),
            install_cursor: 0,
            add_config_open: false,
            new_config_name: String::new(),
            new_config_path: String::new(),
            add_cursor: 0,
            experiment_id: String::new(),
            experimenter: String::new(),
            description: String::new(),
            start_time: String::new(),
            stop_time: String::new(),
            plants: String::new(),
            auth_experiment_id: String::new(),
            supervisor_name: String::new(),
            ready_experiment_id: String::new(),
            ready_agents: String::new(),
            topics_to_log: String::new(),
            experiment_cursor: 0,
            experiment_focus: ExperimentFocus::Forms,
            experiments: Vec::new(),
            experiment_browser_cursor: 0,
            experiment_detail: None,
            topics: None,
            log_content: String::new(),
            log_scroll: 0,
            panel: Panel::Agents,
            config_focus: ConfigFocus::List,
            status_note: None,
            should_quit: false,
        }
    }

    pub fn selected_identity(&self) -> Option<&str> {
        self.selected_agent.as_ref().map(|a| a.identity.as_str())
    }

    fn note(&mut self, text: impl Into<String>) {
        self.status_note = Some(text.into());
    }

    fn note_error(&mut self, what: &str, err: &ClientError) {
        self.status_note = Some(format!("{what} failed: {}", err.user_message()));
    }

    fn clear_config_state(&mut self) {
        self.configs.clear();
        self.selected_config = None;
        self.config_content.clear();
        self.config_dirty = false;
        self.config_focus = ConfigFocus::List;
        self.add_config_open = false;
    }

    fn clear_selection(&mut self) {
        self.selected_agent = None;
        self.clear_config_state();
    }

    // ------------------- controller operations -------------------

    pub fn refresh_agents(&mut self) -> Vec<Request> {
        vec![Request::FetchAgents]
    }

    pub fn refresh_statuses(&mut self) -> Vec<Request> {
        vec![Request::FetchStatuses]
    }

    pub fn refresh_log(&mut self) -> Vec<Request> {
        vec![Request::FetchLog]
    }

    pub fn refresh_experiments(&mut self) -> Vec<Request> {
        vec![Request::FetchExperiments]
    }

    pub fn refresh_topics(&mut self) -> Vec<Request> {
        vec![Request::FetchTopics]
    }

    /// Change the agent selection. Any change invalidates the config list,
    /// the selected config, and the content buffer; with the editor open the
    /// new agent's config list is fetched.
    pub fn select_agent(&mut self, index: Option<usize>) -> Vec<Request> {
        let next = index.and_then(|i| self.agents.get(i)).cloned();
        if next.as_ref().map(|a| a.identity.as_str()) == self.selected_identity() {
            return Vec::new();
        }
        self.selected_agent = next;
        let keep_editor = self.config_editor_open;
        self.clear_config_state();
        self.config_editor_open = keep_editor && self.selected_agent.is_some();
        match (&self.selected_agent, self.config_editor_open) {
            (Some(agent), true) => vec![Request::FetchConfigs {
                agent: agent.identity.clone(),
            }],
            _ => Vec::new(),
        }
    }

    pub fn selected_index(&self) -> Option<usize> {
        let identity = self.selected_identity()?;
        self.agents.iter().position(|a| a.identity == identity)
    }

    pub fn select_next_agent(&mut self) -> Vec<Request> {
        if self.agents.is_empty() {
            return Vec::new();
        }
        let next = match self.selected_index() {
            None => 0,
            Some(i) => (i + 1).min(self.agents.len() - 1),
        };
        self.select_agent(Some(next))
    }

    pub fn select_prev_agent(&mut self) -> Vec<Request> {
        match self.selected_index() {
            None | Some(0) => self.select_agent(None),
            Some(i) => self.select_agent(Some(i - 1)),
        }
    }

    pub fn toggle_config_editor(&mut self) -> Vec<Request> {
        if self.config_editor_open {
            self.config_editor_open = false;
            self.clear_config_state();
            return Vec::new();
        }
        let Some(identity) = self.selected_identity().map(str::to_string) else {
            self.note("select an agent before opening the config store");
            return Vec::new();
        };
        self.config_editor_open = true;
        vec![Request::FetchConfigs { agent: identity }]
    }

    /// Change the config selection; a non-empty selection fetches the
    /// content for `(agent, config)`, an empty one just clears the buffer.
    pub fn select_config(&mut self, index: Option<usize>) -> Vec<Request> {
        let next = index.and_then(|i| self.configs.get(i)).cloned();
        if next.as_deref() == self.selected_config.as_deref() {
            return Vec::new();
        }
        self.selected_config = next;
        self.config_content.clear();
        self.config_dirty = false;
        match (self.selected_identity(), &self.selected_config) {
            (Some(agent), Some(config)) => vec![Request::FetchConfigContent {
                agent: agent.to_string(),
                config: config.clone(),
            }],
            _ => Vec::new(),
        }
    }

    pub fn selected_config_index(&self) -> Option<usize> {
        let config = self.selected_config.as_deref()?;
        self.configs.iter().position(|c| c == config)
    }

    pub fn select_next_config(&mut self) -> Vec<Request> {
        if self.configs.is_empty() {
            return Vec::new();
        }
        let next = match self.selected_config_index() {
            None => 0,
            Some(i) => (i + 1).min(self.configs.len() - 1),
        };
        self.select_config(Some(next))
    }

    pub fn select_prev_config(&mut self) -> Vec<Request> {
        match self.selected_config_index() {
            None | Some(0) => self.select_config(None),
            Some(i) => self.select_config(Some(i - 1)),
        }
    }

    pub fn start_agent(&mut self) -> Vec<Request> {
        match self.selected_identity() {
            Some(identity) => vec![Request::StartAgent {
                identity: identity.to_string(),
            }],
            None => {
                self.note("select an agent to start");
                Vec::new()
            }
        }
    }

    pub fn stop_agent(&mut self) -> Vec<Request> {
        match self.selected_identity() {
            Some(identity) => vec![Request::StopAgent {
                identity: identity.to_string(),
            }],
            None => {
                self.note("select an agent to stop");
                Vec::new()
            }
        }
    }

    pub fn remove_agent(&mut self) -> Vec<Request> {
        match self.selected_identity() {
            Some(identity) => vec![Request::RemoveAgent {
                identity: identity.to_string(),
            }],
            None => {
                self.note("select an agent to remove");
                Vec::new()
            }
        }
    }

    /// Install requires base dir, config file, and tag; fails fast with no
    /// network call when any is empty.
    pub fn install_agent(&mut self) -> Vec<Request> {
        if self.install_base_dir.trim().is_empty()
            || self.install_config_file.trim().is_empty()
            || self.install_tag.trim().is_empty()
        {
            self.note("install requires base dir, config file, and tag");
            return Vec::new();
        }
        vec![Request::InstallAgent(InstallAgentRequest {
            base_dir: self.install_base_dir.clone(),
            config_file: self.install_config_file.clone(),
            tag: self.install_tag.clone(),
        })]
    }

    pub fn save_config(&mut self) -> Vec<Request> {
        match (self.selected_identity(), self.selected_config.as_deref()) {
            (Some(agent), Some(config)) => vec![Request::SaveConfig {
                agent: agent.to_string(),
                config: config.to_string(),
                content: self.config_content.clone(),
            }],
            _ => {
                self.note("select a config to save");
                Vec::new()
            }
        }
    }

    /// Add-config requires a name and a path (plus an agent selection).
    pub fn add_config(&mut self) -> Vec<Request> {
        let Some(agent) = self.selected_identity().map(str::to_string) else {
            self.note("select an agent before storing a config");
            return Vec::new();
        };
        if self.new_config_name.trim().is_empty() || self.new_config_path.trim().is_empty() {
            self.note("storing a config requires a name and a path");
            return Vec::new();
        }
        vec![Request::AddConfig {
            request: StoreConfigRequest {
                agent_identity: agent.clone(),
                config_name: self.new_config_name.clone(),
                config_path: self.new_config_path.clone(),
            },
            agent,
        }]
    }

    /// Delete requires an existing selection.
    pub fn delete_config(&mut self) -> Vec<Request> {
        match (self.selected_identity(), self.selected_config.as_deref()) {
            (Some(agent), Some(config)) => vec![Request::DeleteConfig {
                agent: agent.to_string(),
                config: config.to_string(),
            }],
            _ => {
                self.note("select a config to delete");
                Vec::new()
            }
        }
    }

    pub fn submit_experiment(&mut self) -> Vec<Request> {
        if self.experiment_id.trim().is_empty() {
            self.note("experiment id is required");
            return Vec::new();
        }
        vec![Request::SubmitExperiment(ExperimentSubmission {
            experiment_id: self.experiment_id.clone(),
            experimenter: self.experimenter.clone(),
            description: self.description.clone(),
            start_time: self.start_time.clone(),
            stop_time: self.stop_time.clone(),
            plants: split_list_field(&self.plants),
        })]
    }

    pub fn authorize_experiment(&mut self) -> Vec<Request> {
        if self.auth_experiment_id.trim().is_empty() {
            self.note("experiment id is required");
            return Vec::new();
        }
        vec![Request::AuthorizeExperiment {
            experiment_id: self.auth_experiment_id.clone(),
            supervisor_name: self.supervisor_name.clone(),
        }]
    }

    pub fn finalize_experiment(&mut self) -> Vec<Request> {
        if self.ready_experiment_id.trim().is_empty() {
            self.note("experiment id is required");
            return Vec::new();
        }
        vec![Request::FinalizeExperiment {
            experiment_id: self.ready_experiment_id.clone(),
            readiness: ExperimentReadiness {
                agents_for_experiment: split_list_field(&self.ready_agents),
                topics_to_log: split_list_field(&self.topics_to_log),
            },
        }]
    }

    pub fn fetch_selected_experiment_detail(&mut self) -> Vec<Request> {
        let Some(row) = self.experiments.get(self.experiment_browser_cursor) else {
            return Vec::new();
        };
        match experiment_row_id(row) {
            Some(id) => vec![Request::FetchExperimentDetail { experiment_id: id }],
            None => {
                self.note("selected experiment record has no id field");
                Vec::new()
            }
        }
    }

    // ------------------- event application -------------------

    /// Apply one completed request to the store. Returns the follow-up
    /// requests demanded by the invalidation rules. Stale completions
    /// (selection context mismatch) are dropped without effect.
    pub fn apply_net_event(&mut self, event: NetEvent) -> Vec<Request> {
        match event {
            NetEvent::Agents(Ok(agents)) => {
                self.agents = agents;
                if let Some(selected) = self.selected_identity().map(str::to_string) {
                    if !self.agents.iter().any(|a| a.identity == selected) {
                        self.clear_selection();
                        self.config_editor_open = false;
                    }
                }
                Vec::new()
            }
            NetEvent::Agents(Err(err)) => {
                self.note_error("agent list", &err);
                Vec::new()
            }
            NetEvent::Statuses(Ok(statuses)) => {
                self.statuses = statuses;
                Vec::new()
            }
            NetEvent::Statuses(Err(err)) => {
                self.note_error("status refresh", &err);
                Vec::new()
            }
            NetEvent::Configs { agent, result } => {
                if !self.config_editor_open || self.selected_identity() != Some(agent.as_str()) {
                    return Vec::new();
                }
                match result {
                    Ok(configs) => {
                        self.configs = configs;
                        if let Some(selected) = self.selected_config.clone() {
                            if !self.configs.contains(&selected) {
                                self.selected_config = None;
                                self.config_content.clear();
                                self.config_dirty = false;
                            }
                        }
                    }
                    Err(err) => self.note_error("config list", &err),
                }
                Vec::new()
            }
            NetEvent::ConfigContent {
                agent,
                config,
                result,
            } => {
                if self.selected_identity() != Some(agent.as_str())
                    || self.selected_config.as_deref() != Some(config.as_str())
                {
                    return Vec::new();
                }
                match result {
                    Ok(content) => {
                        self.config_content = content;
                        self.config_dirty = false;
                    }
                    Err(err) => self.note_error("config content", &err),
                }
                Vec::new()
            }
            NetEvent::AgentCommand {
                kind,
                identity,
                result,
            } => match result {
                Ok(message) => {
                    let text = message.unwrap_or_else(|| match kind {
                        AgentCommandKind::Start => format!("{identity} started"),
                        AgentCommandKind::Stop => format!("{identity} stopped"),
                        AgentCommandKind::Remove => format!("{identity} removed"),
                    });
                    self.note(text);
                    if kind == AgentCommandKind::Remove {
                        if self.selected_identity() == Some(identity.as_str()) {
                            self.clear_selection();
                            self.config_editor_open = false;
                        }
                        return vec![Request::FetchAgents];
                    }
                    Vec::new()
                }
                Err(err) => {
                    let what = match kind {
                        AgentCommandKind::Start => "start",
                        AgentCommandKind::Stop => "stop",
                        AgentCommandKind::Remove => "remove",
                    };
                    self.note_error(what, &err);
                    Vec::new()
                }
            },
            NetEvent::Installed { result } => match result {
                Ok(message) => {
                    self.note(message.unwrap_or_else(|| "agent installed".to_string()));
                    vec![Request::FetchAgents]
                }
                Err(err) => {
                    self.note_error("install", &err);
                    Vec::new()
                }
            },
            NetEvent::ConfigCommand {
                kind,
                agent,
                config,
                result,
            } => match result {
                Ok(message) => {
                    let text = message.unwrap_or_else(|| match kind {
                        ConfigCommandKind::Save => format!("config {config} saved"),
                        ConfigCommandKind::Add => format!("config {config} stored"),
                        ConfigCommandKind::Delete => format!("config {config} deleted"),
                    });
                    self.note(text);
                    match kind {
                        ConfigCommandKind::Save => self.config_dirty = false,
                        ConfigCommandKind::Add => {
                            self.new_config_name.clear();
                            self.new_config_path.clear();
                        }
                        ConfigCommandKind::Delete => {
                            if self.selected_config.as_deref() == Some(config.as_str()) {
                                self.selected_config = None;
                                self.config_content.clear();
                                self.config_dirty = false;
                                self.config_focus = ConfigFocus::List;
                            }
                        }
                    }
                    if self.config_editor_open && self.selected_identity() == Some(agent.as_str())
                    {
                        vec![Request::FetchConfigs { agent }]
                    } else {
                        Vec::new()
                    }
                }
                Err(err) => {
                    // A failed save leaves the local buffer untouched.
                    let what = match kind {
                        ConfigCommandKind::Save => "config save",
                        ConfigCommandKind::Add => "config store",
                        ConfigCommandKind::Delete => "config delete",
                    };
                    self.note_error(what, &err);
                    Vec::new()
                }
            },
            NetEvent::ExperimentSubmitted { result } => match result {
                Ok(resp) => {
                    self.note(format!("experiment submitted: {}", resp.experiment_id));
                    vec![Request::FetchExperiments]
                }
                Err(err) => {
                    self.note_error("experiment submit", &err);
                    Vec::new()
                }
            },
            NetEvent::ExperimentCommand {
                kind,
                experiment_id,
                result,
            } => match result {
                Ok(message) => {
                    let text = message.unwrap_or_else(|| match kind {
                        ExperimentCommandKind::Authorize => {
                            format!("experiment {experiment_id} authorised")
                        }
                        ExperimentCommandKind::Finalize => {
                            format!("experiment {experiment_id} finalized")
                        }
                    });
                    self.note(text);
                    vec![Request::FetchExperiments]
                }
                Err(err) => {
                    let what = match kind {
                        ExperimentCommandKind::Authorize => "experiment authorize",
                        ExperimentCommandKind::Finalize => "experiment finalize",
                    };
                    self.note_error(what, &err);
                    Vec::new()
                }
            },
            NetEvent::Experiments(Ok(list)) => {
                self.experiments = list;
                if self.experiment_browser_cursor >= self.experiments.len() {
                    self.experiment_browser_cursor = self.experiments.len().saturating_sub(1);
                }
                Vec::new()
            }
            NetEvent::Experiments(Err(err)) => {
                self.note_error("experiment list", &err);
                Vec::new()
            }
            NetEvent::ExperimentDetail { result, .. } => {
                match result {
                    Ok(data) => self.experiment_detail = Some(data),
                    Err(err) => self.note_error("experiment data", &err),
                }
                Vec::new()
            }
            NetEvent::Topics(Ok(data)) => {
                self.topics = Some(data);
                Vec::new()
            }
            NetEvent::Topics(Err(err)) => {
                self.note_error("topic list", &err);
                Vec::new()
            }
            NetEvent::Log(Ok(log)) => {
                self.log_content = log;
                Vec::new()
            }
            NetEvent::Log(Err(err)) => {
                self.note_error("log fetch", &err);
                Vec::new()
            }
        }
    }

    // ------------------- input routing -------------------

    pub fn handle_key(&mut self, key: KeyEvent) -> Vec<Request> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return self.handle_ctrl_key(key.code);
        }
        match key.code {
            KeyCode::Tab => {
                self.panel = self.panel.next();
                return Vec::new();
            }
            KeyCode::BackTab => {
                self.panel = self.panel.prev();
                return Vec::new();
            }
            _ => {}
        }
        match self.panel {
            Panel::Agents => self.handle_agents_key(key.code),
            Panel::Install => self.handle_install_key(key.code),
            Panel::Configs => self.handle_configs_key(key.code),
            Panel::Experiments => self.handle_experiments_key(key.code),
            Panel::Log => self.handle_log_key(key.code),
        }
    }

    fn handle_ctrl_key(&mut self, code: KeyCode) -> Vec<Request> {
        match code {
            KeyCode::Char('c') => {
                self.should_quit = true;
                Vec::new()
            }
            KeyCode::Char('s') if self.panel == Panel::Configs => self.save_config(),
            KeyCode::Char('b') if self.panel == Panel::Experiments => {
                self.experiment_focus = match self.experiment_focus {
                    ExperimentFocus::Forms => ExperimentFocus::Browser,
                    ExperimentFocus::Browser => ExperimentFocus::Forms,
                };
                if self.experiment_focus == ExperimentFocus::Browser {
                    return self.refresh_experiments();
                }
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn handle_agents_key(&mut self, code: KeyCode) -> Vec<Request> {
        match code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                Vec::new()
            }
            KeyCode::Down | KeyCode::Char('j') => self.select_next_agent(),
            KeyCode::Up | KeyCode::Char('k') => self.select_prev_agent(),
            KeyCode::Esc => self.select_agent(None),
            KeyCode::Char('r') => self.refresh_agents(),
            KeyCode::Char('u') => self.refresh_statuses(),
            KeyCode::Char('s') => self.start_agent(),
            KeyCode::Char('x') => self.stop_agent(),
            KeyCode::Char('d') => self.remove_agent(),
            KeyCode::Char('e') => self.toggle_config_editor(),
            _ => Vec::new(),
        }
    }

    fn handle_install_key(&mut self, code: KeyCode) -> Vec<Request> {
        match code {
            KeyCode::Down => {
                self.install_cursor = (self.install_cursor + 1).min(INSTALL_ROWS - 1);
                Vec::new()
            }
            KeyCode::Up => {
                self.install_cursor = self.install_cursor.saturating_sub(1);
                Vec::new()
            }
            KeyCode::Enter => {
                if self.install_cursor == INSTALL_ROWS - 1 {
                    self.install_agent()
                } else {
                    self.install_cursor += 1;
                    Vec::new()
                }
            }
            KeyCode::Backspace => {
                if let Some(field) = self.install_field_mut() {
                    field.pop();
                }
                Vec::new()
            }
            KeyCode::Char(c) => {
                if let Some(field) = self.install_field_mut() {
                    field.push(c);
                }
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn install_field_mut(&mut self) -> Option<&mut String> {
        match self.install_cursor {
            0 => Some(&mut self.install_base_dir),
            1 => Some(&mut self.install_config_file),
            2 => Some(&mut self.install_tag),
            _ => None,
        }
    }

    fn handle_configs_key(&mut self, code: KeyCode) -> Vec<Request> {
        if !self.config_editor_open {
            return match code {
                KeyCode::Char('e') => self.toggle_config_editor(),
                KeyCode::Char('q') => {
                    self.should_quit = true;
                    Vec::new()
                }
                _ => Vec::new(),
            };
        }
        match self.config_focus {
            ConfigFocus::List => match code {
                KeyCode::Char('q') => {
                    self.should_quit = true;
                    Vec::new()
                }
                KeyCode::Down | KeyCode::Char('j') => self.select_next_config(),
                KeyCode::Up | KeyCode::Char('k') => self.select_prev_config(),
                KeyCode::Enter => {
                    if self.selected_config.is_some() {
                        self.config_focus = ConfigFocus::Editor;
                    }
                    Vec::new()
                }
                KeyCode::Char('n') => {
                    self.add_config_open = !self.add_config_open;
                    self.config_focus = if self.add_config_open {
                        ConfigFocus::AddForm
                    } else {
                        ConfigFocus::List
                    };
                    self.add_cursor = 0;
                    Vec::new()
                }
                KeyCode::Char('d') => self.delete_config(),
                KeyCode::Char('e') => self.toggle_config_editor(),
                _ => Vec::new(),
            },
            ConfigFocus::Editor => match code {
                KeyCode::Esc => {
                    self.config_focus = ConfigFocus::List;
                    Vec::new()
                }
                KeyCode::Enter => {
                    self.config_content.push('\n');
                    self.config_dirty = true;
                    Vec::new()
                }
                KeyCode::Backspace => {
                    if self.config_content.pop().is_some() {
                        self.config_dirty = true;
                    }
                    Vec::new()
                }
                KeyCode::Char(c) => {
                    self.config_content.push(c);
                    self.config_dirty = true;
                    Vec::new()
                }
                _ => Vec::new(),
            },
            ConfigFocus::AddForm => match code {
                KeyCode::Esc => {
                    self.add_config_open = false;
                    self.config_focus = ConfigFocus::List;
                    Vec::new()
                }
                KeyCode::Down => {
                    self.add_cursor = (self.add_cursor + 1).min(ADD_CONFIG_ROWS - 1);
                    Vec::new()
                }
                KeyCode::Up => {
                    self.add_cursor = self.add_cursor.saturating_sub(1);
                    Vec::new()
                }
                KeyCode::Enter => {
                    if self.add_cursor == ADD_CONFIG_ROWS - 1 {
                        self.add_config()
                    } else {
                        self.add_cursor += 1;
                        Vec::new()
                    }
                }
                KeyCode::Backspace => {
                    if let Some(field) = self.add_field_mut() {
                        field.pop();
                    }
                    Vec::new()
                }
                KeyCode::Char(c) => {
                    if let Some(field) = self.add_field_mut() {
                        field.push(c);
                    }
                    Vec::new()
                }
                _ => Vec::new(),
            },
        }
    }

    fn add_field_mut(&mut self) -> Option<&mut String> {
        match self.add_cursor {
            0 => Some(&mut self.new_config_name),
            1 => Some(&mut self.new_config_path),
            _ => None,
        }
    }

    fn handle_experiments_key(&mut self, code: KeyCode) -> Vec<Request> {
        match self.experiment_focus {
            ExperimentFocus::Forms => match code {
                KeyCode::Down => {
                    self.experiment_cursor = (self.experiment_cursor + 1).min(EXP_ROWS - 1);
                    Vec::new()
                }
                KeyCode::Up => {
                    self.experiment_cursor = self.experiment_cursor.saturating_sub(1);
                    Vec::new()
                }
                KeyCode::Enter => match self.experiment_cursor {
                    EXP_ACTION_SUBMIT => self.submit_experiment(),
                    EXP_ACTION_AUTHORIZE => self.authorize_experiment(),
                    EXP_ACTION_FINALIZE => self.finalize_experiment(),
                    _ => {
                        self.experiment_cursor += 1;
                        Vec::new()
                    }
                },
                KeyCode::Backspace => {
                    if let Some(field) = self.experiment_field_mut() {
                        field.pop();
                    }
                    Vec::new()
                }
                KeyCode::Char(c) => {
                    if let Some(field) = self.experiment_field_mut() {
                        field.push(c);
                    }
                    Vec::new()
                }
                _ => Vec::new(),
            },
            ExperimentFocus::Browser => match code {
                KeyCode::Esc => {
                    self.experiment_focus = ExperimentFocus::Forms;
                    Vec::new()
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    if !self.experiments.is_empty() {
                        self.experiment_browser_cursor =
                            (self.experiment_browser_cursor + 1).min(self.experiments.len() - 1);
                    }
                    Vec::new()
                }
                KeyCode::Up | KeyCode::Char('k') => {
                    self.experiment_browser_cursor =
                        self.experiment_browser_cursor.saturating_sub(1);
                    Vec::new()
                }
                KeyCode::Enter => self.fetch_selected_experiment_detail(),
                KeyCode::Char('g') => self.refresh_experiments(),
                KeyCode::Char('t') => self.refresh_topics(),
                KeyCode::Char('q') => {
                    self.should_quit = true;
                    Vec::new()
                }
                _ => Vec::new(),
            },
        }
    }

    pub fn experiment_field_mut(&mut self) -> Option<&mut String> {
        match self.experiment_cursor {
            EXP_FIELD_ID => Some(&mut self.experiment_id),
            EXP_FIELD_EXPERIMENTER => Some(&mut self.experimenter),
            EXP_FIELD_DESCRIPTION => Some(&mut self.description),
            EXP_FIELD_START => Some(&mut self.start_time),
            EXP_FIELD_STOP => Some(&mut self.stop_time),
            EXP_FIELD_PLANTS => Some(&mut self.plants),
            EXP_FIELD_AUTH_ID => Some(&mut self.auth_experiment_id),
            EXP_FIELD_SUPERVISOR => Some(&mut self.supervisor_name),
            EXP_FIELD_READY_ID => Some(&mut self.ready_experiment_id),
            EXP_FIELD_READY_AGENTS => Some(&mut self.ready_agents),
            EXP_FIELD_TOPICS => Some(&mut self.topics_to_log),
            _ => None,
        }
    }

    fn handle_log_key(&mut self, code: KeyCode) -> Vec<Request> {
        match code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                Vec::new()
            }
            KeyCode::Char('r') => self.refresh_log(),
            KeyCode::Down | KeyCode::Char('j') => {
                self.log_scroll = self.log_scroll.saturating_add(1);
                Vec::new()
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.log_scroll = self.log_scroll.saturating_sub(1);
                Vec::new()
            }
            KeyCode::PageDown => {
                self.log_scroll = self.log_scroll.saturating_add(20);
                Vec::new()
            }
            KeyCode::PageUp => {
                self.log_scroll = self.log_scroll.saturating_sub(20);
                Vec::new()
            }
            KeyCode::Home => {
                self.log_scroll = 0;
                Vec::new()
            }
            _ => Vec::new(),
        }
    }
}

/// Best-effort id extraction from an opaque experiment record.
pub fn experiment_row_id(row: &Value) -> Option<String> {
    for key in ["experiment_id", "id"] {
        if let Some(id) = row.get(key).and_then(Value::as_str) {
            return Some(id.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(identity: &str) -> Agent {
        Agent {
            id: format!("uuid-{identity}"),
            identity: identity.to_string(),
        }
    }

    fn app_with_agents(identities: &[&str]) -> App {
        let mut app = App::new("http://test:8000".into());
        app.apply_net_event(NetEvent::Agents(Ok(identities
            .iter()
            .map(|i| agent(i))
            .collect())));
        app
    }

    fn backend_err(detail: &str) -> ClientError {
        ClientError::Backend {
            detail: detail.to_string(),
        }
    }

    #[test]
    fn selecting_agent_clears_config_state() {
        let mut app = app_with_agents(&["listener1", "listener2"]);
        app.select_agent(Some(0));
        app.config_editor_open = true;
        app.configs = vec!["config".into()];
        app.selected_config = Some("config".into());
        app.config_content = "a = 1".into();

        let requests = app.select_agent(Some(1));
        assert!(app.configs.is_empty());
        assert_eq!(app.selected_config, None);
        assert!(app.config_content.is_empty());
        assert_eq!(
            requests,
            vec![Request::FetchConfigs {
                agent: "listener2".into()
            }]
        );
    }

    #[test]
    fn reselecting_same_agent_is_a_no_op() {
        let mut app = app_with_agents(&["listener1"]);
        app.select_agent(Some(0));
        app.configs = vec!["keep".into()];
        assert!(app.select_agent(Some(0)).is_empty());
        assert_eq!(app.configs, vec!["keep".to_string()]);
    }

    #[test]
    fn stale_config_list_for_previous_agent_is_discarded() {
        let mut app = app_with_agents(&["listener1", "listener2"]);
        app.select_agent(Some(0));
        app.toggle_config_editor();
        // Selection moves to listener2 before listener1's fetch resolves.
        app.select_agent(Some(1));

        app.apply_net_event(NetEvent::Configs {
            agent: "listener1".into(),
            result: Ok(vec!["old-config".into()]),
        });
        assert!(app.configs.is_empty(), "stale response must not populate");

        app.apply_net_event(NetEvent::Configs {
            agent: "listener2".into(),
            result: Ok(vec!["fresh".into()]),
        });
        assert_eq!(app.configs, vec!["fresh".to_string()]);
    }

    #[test]
    fn stale_config_content_is_discarded() {
        let mut app = app_with_agents(&["listener1"]);
        app.select_agent(Some(0));
        app.toggle_config_editor();
        app.apply_net_event(NetEvent::Configs {
            agent: "listener1".into(),
            result: Ok(vec!["a".into(), "b".into()]),
        });
        app.select_config(Some(0));
        app.select_config(Some(1));

        app.apply_net_event(NetEvent::ConfigContent {
            agent: "listener1".into(),
            config: "a".into(),
            result: Ok("content of a".into()),
        });
        assert!(app.config_content.is_empty());

        app.apply_net_event(NetEvent::ConfigContent {
            agent: "listener1".into(),
            config: "b".into(),
            result: Ok("content of b".into()),
        });
        assert_eq!(app.config_content, "content of b");
    }

    #[test]
    fn agent_list_refresh_keeps_present_selection() {
        let mut app = app_with_agents(&["listener1", "listener2"]);
        app.select_agent(Some(1));
        app.apply_net_event(NetEvent::Agents(Ok(vec![
            agent("listener2"),
            agent("listener3"),
        ])));
        assert_eq!(app.selected_identity(), Some("listener2"));
    }

    #[test]
    fn agent_list_refresh_clears_vanished_selection() {
        let mut app = app_with_agents(&["listener1"]);
        app.select_agent(Some(0));
        app.toggle_config_editor();
        app.configs = vec!["config".into()];
        app.apply_net_event(NetEvent::Agents(Ok(vec![agent("other")])));
        assert_eq!(app.selected_identity(), None);
        assert!(app.configs.is_empty());
        assert!(!app.config_editor_open);
    }

    #[test]
    fn editor_toggle_on_fetches_and_off_clears() {
        let mut app = app_with_agents(&["listener1"]);
        app.select_agent(Some(0));
        let requests = app.toggle_config_editor();
        assert_eq!(
            requests,
            vec![Request::FetchConfigs {
                agent: "listener1".into()
            }]
        );
        app.configs = vec!["config".into()];
        app.selected_config = Some("config".into());
        app.config_content = "x".into();

        assert!(app.toggle_config_editor().is_empty());
        assert!(!app.config_editor_open);
        assert!(app.configs.is_empty());
        assert_eq!(app.selected_config, None);
        assert!(app.config_content.is_empty());
    }

    #[test]
    fn editor_toggle_without_agent_is_local_error() {
        let mut app = App::new("x".into());
        assert!(app.toggle_config_editor().is_empty());
        assert!(!app.config_editor_open);
        assert!(app.status_note.is_some());
    }

    #[test]
    fn selecting_config_fetches_content_and_clearing_clears_it() {
        let mut app = app_with_agents(&["listener1"]);
        app.select_agent(Some(0));
        app.toggle_config_editor();
        app.apply_net_event(NetEvent::Configs {
            agent: "listener1".into(),
            result: Ok(vec!["config".into()]),
        });

        let requests = app.select_config(Some(0));
        assert_eq!(
            requests,
            vec![Request::FetchConfigContent {
                agent: "listener1".into(),
                config: "config".into()
            }]
        );

        app.apply_net_event(NetEvent::ConfigContent {
            agent: "listener1".into(),
            config: "config".into(),
            result: Ok("k = v".into()),
        });
        assert_eq!(app.config_content, "k = v");

        app.select_config(None);
        assert!(app.config_content.is_empty());
    }

    #[test]
    fn save_success_refetches_config_list() {
        let mut app = app_with_agents(&["listener1"]);
        app.select_agent(Some(0));
        app.toggle_config_editor();
        app.configs = vec!["config".into()];
        app.selected_config = Some("config".into());
        app.config_content = "edited".into();
        app.config_dirty = true;

        let followups = app.apply_net_event(NetEvent::ConfigCommand {
            kind: ConfigCommandKind::Save,
            agent: "listener1".into(),
            config: "config".into(),
            result: Ok(None),
        });
        assert_eq!(
            followups,
            vec![Request::FetchConfigs {
                agent: "listener1".into()
            }]
        );
        assert!(!app.config_dirty);
        assert_eq!(app.config_content, "edited");
    }

    #[test]
    fn failed_save_leaves_buffer_and_surfaces_detail() {
        let mut app = app_with_agents(&["listener1"]);
        app.select_agent(Some(0));
        app.toggle_config_editor();
        app.selected_config = Some("config".into());
        app.config_content = "draft".into();
        app.config_dirty = true;

        let followups = app.apply_net_event(NetEvent::ConfigCommand {
            kind: ConfigCommandKind::Save,
            agent: "listener1".into(),
            config: "config".into(),
            result: Err(backend_err("store rejected the blob")),
        });
        assert!(followups.is_empty());
        assert_eq!(app.config_content, "draft");
        assert!(app.config_dirty);
        let note = app.status_note.clone().unwrap_or_default();
        assert!(note.contains("store rejected the blob"));
    }

    #[test]
    fn delete_success_clears_selection_and_refetches() {
        let mut app = app_with_agents(&["listener1"]);
        app.select_agent(Some(0));
        app.toggle_config_editor();
        app.configs = vec!["config".into()];
        app.selected_config = Some("config".into());
        app.config_content = "x".into();

        let followups = app.apply_net_event(NetEvent::ConfigCommand {
            kind: ConfigCommandKind::Delete,
            agent: "listener1".into(),
            config: "config".into(),
            result: Ok(None),
        });
        assert_eq!(app.selected_config, None);
        assert!(app.config_content.is_empty());
        assert_eq!(
            followups,
            vec![Request::FetchConfigs {
                agent: "listener1".into()
            }]
        );
    }

    #[test]
    fn config_list_refresh_drops_vanished_selection() {
        let mut app = app_with_agents(&["listener1"]);
        app.select_agent(Some(0));
        app.toggle_config_editor();
        app.configs = vec!["gone".into()];
        app.selected_config = Some("gone".into());
        app.config_content = "x".into();

        app.apply_net_event(NetEvent::Configs {
            agent: "listener1".into(),
            result: Ok(vec!["other".into()]),
        });
        assert_eq!(app.selected_config, None);
        assert!(app.config_content.is_empty());
    }

    #[test]
    fn remove_success_clears_selection_and_refetches_agents() {
        let mut app = app_with_agents(&["listener1"]);
        app.select_agent(Some(0));
        app.toggle_config_editor();
        app.configs = vec!["config".into()];

        let followups = app.apply_net_event(NetEvent::AgentCommand {
            kind: AgentCommandKind::Remove,
            identity: "listener1".into(),
            result: Ok(None),
        });
        assert_eq!(followups, vec![Request::FetchAgents]);
        assert_eq!(app.selected_identity(), None);
        assert!(app.configs.is_empty());
    }

    #[test]
    fn remove_of_no_longer_selected_agent_keeps_current_selection() {
        let mut app = app_with_agents(&["listener1", "listener2"]);
        app.select_agent(Some(0));
        app.select_agent(Some(1));

        let followups = app.apply_net_event(NetEvent::AgentCommand {
            kind: AgentCommandKind::Remove,
            identity: "listener1".into(),
            result: Ok(None),
        });
        assert_eq!(followups, vec![Request::FetchAgents]);
        assert_eq!(app.selected_identity(), Some("listener2"));
    }

    #[test]
    fn install_success_refetches_agents_and_keeps_form() {
        let mut app = App::new("x".into());
        app.install_base_dir = "/opt/v".into();
        app.install_config_file = "cfg.json".into();
        app.install_tag = "v1".into();

        let requests = app.install_agent();
        assert_eq!(
            requests,
            vec![Request::InstallAgent(InstallAgentRequest {
                base_dir: "/opt/v".into(),
                config_file: "cfg.json".into(),
                tag: "v1".into(),
            })]
        );

        let followups = app.apply_net_event(NetEvent::Installed {
            result: Ok(Some("Agent installed successfully".into())),
        });
        assert_eq!(followups, vec![Request::FetchAgents]);
        assert_eq!(app.install_base_dir, "/opt/v");
        assert_eq!(app.install_tag, "v1");
        assert_eq!(
            app.status_note.as_deref(),
            Some("Agent installed successfully")
        );
    }

    #[test]
    fn install_with_missing_field_issues_no_request() {
        let mut app = App::new("x".into());
        app.install_base_dir = "/opt/v".into();
        assert!(app.install_agent().is_empty());
        assert!(app.status_note.clone().unwrap_or_default().contains("requires"));
    }

    #[test]
    fn add_config_requires_name_and_path() {
        let mut app = app_with_agents(&["listener1"]);
        app.select_agent(Some(0));
        assert!(app.add_config().is_empty());

        app.new_config_name = "config".into();
        app.new_config_path = "/tmp/config.json".into();
        let requests = app.add_config();
        assert_eq!(
            requests,
            vec![Request::AddConfig {
                agent: "listener1".into(),
                request: StoreConfigRequest {
                    agent_identity: "listener1".into(),
                    config_name: "config".into(),
                    config_path: "/tmp/config.json".into(),
                },
            }]
        );
    }

    #[test]
    fn delete_without_selection_issues_no_request() {
        let mut app = app_with_agents(&["listener1"]);
        app.select_agent(Some(0));
        assert!(app.delete_config().is_empty());
        assert!(app.status_note.is_some());
    }

    #[test]
    fn agent_commands_require_selection() {
        let mut app = App::new("x".into());
        assert!(app.start_agent().is_empty());
        assert!(app.stop_agent().is_empty());
        assert!(app.remove_agent().is_empty());
    }

    #[test]
    fn submit_experiment_splits_plants_preserving_empties() {
        let mut app = App::new("x".into());
        app.experiment_id = "exp-1".into();
        app.plants = "plant1, ,plant2".into();
        let requests = app.submit_experiment();
        match &requests[0] {
            Request::SubmitExperiment(sub) => {
                assert_eq!(sub.plants, vec!["plant1", "", "plant2"]);
            }
            other => panic!("unexpected request {other:?}"),
        }
    }

    #[test]
    fn finalize_splits_both_list_fields() {
        let mut app = App::new("x".into());
        app.ready_experiment_id = "exp-1".into();
        app.ready_agents = "a1,a2".into();
        app.topics_to_log = "t/one, t/two".into();
        let requests = app.finalize_experiment();
        match &requests[0] {
            Request::FinalizeExperiment { readiness, .. } => {
                assert_eq!(readiness.agents_for_experiment, vec!["a1", "a2"]);
                assert_eq!(readiness.topics_to_log, vec!["t/one", "t/two"]);
            }
            other => panic!("unexpected request {other:?}"),
        }
    }

    #[test]
    fn authorize_requires_experiment_id() {
        let mut app = App::new("x".into());
        app.supervisor_name = "dr. grey".into();
        assert!(app.authorize_experiment().is_empty());
        app.auth_experiment_id = "exp-1".into();
        assert_eq!(
            app.authorize_experiment(),
            vec![Request::AuthorizeExperiment {
                experiment_id: "exp-1".into(),
                supervisor_name: "dr. grey".into(),
            }]
        );
    }

    #[test]
    fn submitted_experiment_notes_id_and_refreshes_list() {
        let mut app = App::new("x".into());
        let followups = app.apply_net_event(NetEvent::ExperimentSubmitted {
            result: Ok(SubmitExperimentResponse {
                experiment_id: "exp-9".into(),
                message: None,
            }),
        });
        assert_eq!(followups, vec![Request::FetchExperiments]);
        assert!(app.status_note.clone().unwrap_or_default().contains("exp-9"));
    }

    #[test]
    fn backend_failure_detail_is_surfaced_verbatim() {
        let mut app = App::new("x".into());
        app.apply_net_event(NetEvent::Log(Err(backend_err("log missing"))));
        assert!(app
            .status_note
            .clone()
            .unwrap_or_default()
            .contains("log missing"));
    }

    #[test]
    fn log_fetch_replaces_content() {
        let mut app = App::new("x".into());
        app.apply_net_event(NetEvent::Log(Ok("line one\nline two".into())));
        assert_eq!(app.log_content, "line one\nline two");
    }

    #[test]
    fn experiment_row_id_prefers_experiment_id_key() {
        let row = serde_json::json!({"experiment_id": "exp-1", "id": "shadow"});
        assert_eq!(experiment_row_id(&row).as_deref(), Some("exp-1"));
        let row = serde_json::json!({"id": "exp-2"});
        assert_eq!(experiment_row_id(&row).as_deref(), Some("exp-2"));
        assert_eq!(experiment_row_id(&serde_json::json!({})), None);
    }
}
