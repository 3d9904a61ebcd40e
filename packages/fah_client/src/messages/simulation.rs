use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::MaterializeError;
use crate::fields::{Fields, FromFields};
use crate::registry::TypedMessage;

/// Progress of the simulation running in one slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimulationInfo {
    pub user: String,
    pub team: i64,
    pub project: i64,
    pub run: i64,
    pub clone: i64,
    pub generation: i64,
    pub core_type: i64,
    pub core: String,
    pub total_iterations: i64,
    pub iterations_done: i64,
    pub energy: f64,
    pub temperature: f64,
    pub start_time: Option<DateTime<Utc>>,
    /// Epoch seconds on the wire, `0` when unset.
    pub timeout: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    #[serde(serialize_with = "super::serialize_duration_secs")]
    pub eta: Option<Duration>,
    pub progress: f64,
    pub news: String,
    pub slot: i64,
}

impl FromFields for SimulationInfo {
    fn from_fields(f: &Fields<'_>) -> Result<Self, MaterializeError> {
        Ok(Self {
            user: f.string("user")?,
            team: f.integer("team")?,
            project: f.integer("project")?,
            run: f.integer("run")?,
            clone: f.integer("clone")?,
            generation: f.integer("gen")?,
            core_type: f.integer("core_type")?,
            core: f.string("core")?,
            total_iterations: f.integer("total_iterations")?,
            iterations_done: f.integer("iterations_done")?,
            energy: f.float("energy")?,
            temperature: f.float("temperature")?,
            start_time: f.calendar_timestamp("start_time")?,
            timeout: f.epoch_timestamp("timeout")?,
            deadline: f.epoch_timestamp("deadline")?,
            eta: f.duration("eta")?,
            progress: f.float("progress")?,
            news: f.string("news")?,
            slot: f.integer("slot")?,
        })
    }
}

impl TypedMessage for SimulationInfo {
    fn from_payload(payload: &Value) -> Result<Self, MaterializeError> {
        Self::from_fields(&Fields::at(payload, "simulation-info")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_time_fields() {
        let payload = json!({
            "user": "harlam357",
            "team": 32,
            "project": 13851,
            "run": 0, "clone": 12, "gen": 3,
            "core_type": 162,
            "core": "GRO_A7",
            "total_iterations": 500000,
            "iterations_done": 125000,
            "start_time": "2020-06-17T14:03:08",
            "timeout": 1592489000,
            "deadline": 0,
            "eta": 3600,
            "progress": 0.25,
            "slot": 1
        });
        let info = SimulationInfo::from_payload(&payload).unwrap();
        assert_eq!(info.project, 13851);
        assert_eq!(
            info.start_time,
            Some("2020-06-17T14:03:08Z".parse::<DateTime<Utc>>().unwrap())
        );
        assert_eq!(info.timeout, DateTime::from_timestamp(1592489000, 0));
        assert_eq!(info.deadline, None);
        assert_eq!(info.eta, Some(Duration::seconds(3600)));
    }

    #[test]
    fn bad_start_time_is_reported() {
        let payload = json!({"start_time": "yesterday"});
        let err = SimulationInfo::from_payload(&payload).unwrap_err();
        assert_eq!(err.field, "simulation-info.start_time");
        assert_eq!(err.raw, r#""yesterday""#);
    }

    #[test]
    fn eta_serializes_as_seconds() {
        let info = SimulationInfo {
            eta: Some(Duration::seconds(90)),
            ..Default::default()
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["eta"], 90);
    }
}
