//! Request and response payloads for the supervisory backend's HTTP API.
//!
//! Success responses are small JSON envelopes around the resource; failure
//! responses carry a detail string under `detail` (documented interface) or
//! `error` (deployed backend). [`error_detail`] accepts both.

use crate::{Agent, AgentStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentsResponse {
    pub agents: Vec<Agent>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusesResponse {
    pub statuses: BTreeMap<String, AgentStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigsResponse {
    pub configs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigContentResponse {
    pub content: String,
    #[serde(default)]
    pub config_name: Option<String>,
}

/// Generic confirmation envelope; several write operations return only an
/// optional human-readable `message`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmitExperimentResponse {
    pub experiment_id: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogResponse {
    pub log: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExperimentsListResponse {
    #[serde(default)]
    pub list: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExperimentDataResponse {
    pub data: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopicsResponse {
    pub data: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstallAgentRequest {
    pub base_dir: String,
    pub config_file: String,
    pub tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SaveConfigRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreConfigRequest {
    pub agent_identity: String,
    pub config_name: String,
    pub config_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExperimentSubmission {
    pub experiment_id: String,
    pub experimenter: String,
    pub description: String,
    pub start_time: String,
    pub stop_time: String,
    pub plants: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExperimentReadiness {
    pub agents_for_experiment: Vec<String>,
    pub topics_to_log: Vec<String>,
}

/// Extract the backend-supplied error detail from a failure body, if any.
pub fn error_detail(body: &Value) -> Option<String> {
    for key in ["detail", "error"] {
        if let Some(detail) = body.get(key).and_then(Value::as_str) {
            if !detail.is_empty() {
                return Some(detail.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn statuses_envelope_round_trips() {
        let raw = json!({
            "statuses": {
                "listener1": {"uuid": "abc-1", "status": "running", "last_checked": 1714550400}
            }
        });
        let parsed: StatusesResponse = serde_json::from_value(raw).unwrap();
        let entry = &parsed.statuses["listener1"];
        assert_eq!(entry.uuid, "abc-1");
        assert_eq!(entry.last_checked, 1714550400);
    }

    #[test]
    fn error_detail_prefers_detail_key() {
        let body = json!({"detail": "no such agent", "error": "shadowed"});
        assert_eq!(error_detail(&body).as_deref(), Some("no such agent"));
    }

    #[test]
    fn error_detail_falls_back_to_error_key() {
        let body = json!({"error": "rpc timeout"});
        assert_eq!(error_detail(&body).as_deref(), Some("rpc timeout"));
    }

    #[test]
    fn error_detail_absent_when_body_has_neither() {
        assert_eq!(error_detail(&json!({"message": "ok"})), None);
        assert_eq!(error_detail(&json!({"detail": ""})), None);
    }

    #[test]
    fn submission_serializes_plants_as_list() {
        let sub = ExperimentSubmission {
            experiment_id: "exp-7".into(),
            experimenter: "ada".into(),
            description: "duration test".into(),
            start_time: "2024-05-01T08:00:00".into(),
            stop_time: "2024-05-01T10:00:00".into(),
            plants: vec!["plant1".into(), "".into(), "plant2".into()],
        };
        let value = serde_json::to_value(&sub).unwrap();
        assert_eq!(value["plants"], json!(["plant1", "", "plant2"]));
    }
}
