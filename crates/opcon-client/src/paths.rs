//! Backend endpoint paths, built by pure functions so request routing is
//! testable without a network.

pub const AGENTS: &str = "/agents";
pub const AGENT_STATUSES: &str = "/agent_statuses";
pub const INSTALL_AGENT: &str = "/install-agent";
pub const SUBMIT_EXPERIMENT: &str = "/experiments/submit";
pub const EXPERIMENTS_LIST: &str = "/experiments/all/data";
pub const TOPICS: &str = "/topics/all/data";
pub const LOG: &str = "/log";

pub fn start_agent(identity: &str) -> String {
    format!("/agents/{identity}/start")
}

pub fn stop_agent(identity: &str) -> String {
    format!("/agents/{identity}/stop")
}

pub fn remove_agent(identity: &str) -> String {
    format!("/agents/{identity}/remove")
}

pub fn configs(identity: &str) -> String {
    format!("/agents/{identity}/configs")
}

pub fn config(identity: &str, name: &str) -> String {
    format!("/agents/{identity}/configs/{name}")
}

/// Note the trailing slash: the store-new-config route is distinct from the
/// config list route on the backend.
pub fn add_config(identity: &str) -> String {
    format!("/agents/{identity}/configs/")
}

pub fn authorize_experiment(experiment_id: &str) -> String {
    format!("/experiments/{experiment_id}/authorise")
}

pub fn finalize_experiment(experiment_id: &str) -> String {
    format!("/experiments/{experiment_id}/ready")
}

pub fn experiment_data(experiment_id: &str) -> String {
    format!("/experiments/{experiment_id}/data")
}
