use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::net::IpAddr;

use crate::error::MaterializeError;
use crate::fields::{self, Fields, FromFields};
use crate::registry::{MessageCollection, TypedMessage};

/// One entry of the client's work queue.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Unit {
    pub id: String,
    pub state: String,
    pub error: String,
    pub project: i64,
    pub run: i64,
    pub clone: i64,
    pub generation: i64,
    pub core: String,
    pub unit: String,
    pub percent_done: Option<f64>,
    pub eta: String,
    pub ppd: f64,
    pub credit_estimate: f64,
    pub waiting_on: String,
    pub next_attempt: String,
    pub time_remaining: String,
    pub total_frames: i64,
    pub frames_done: i64,
    pub assigned: Option<DateTime<Utc>>,
    pub timeout: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    /// Work server.
    pub ws: Option<IpAddr>,
    /// Collection server.
    pub cs: Option<IpAddr>,
    pub attempts: i64,
    pub slot: String,
    pub tpf: String,
    pub base_credit: f64,
}

impl FromFields for Unit {
    fn from_fields(f: &Fields<'_>) -> Result<Self, MaterializeError> {
        Ok(Self {
            id: f.string("id")?,
            state: f.string("state")?,
            error: f.string("error")?,
            project: f.integer("project")?,
            run: f.integer("run")?,
            clone: f.integer("clone")?,
            generation: f.integer("gen")?,
            core: f.string("core")?,
            unit: f.string("unit")?,
            percent_done: f.percent("percentdone")?,
            eta: f.string("eta")?,
            ppd: f.float("ppd")?,
            credit_estimate: f.float("creditestimate")?,
            waiting_on: f.string("waitingon")?,
            next_attempt: f.string("nextattempt")?,
            time_remaining: f.string("timeremaining")?,
            total_frames: f.integer("totalframes")?,
            frames_done: f.integer("framesdone")?,
            assigned: f.calendar_timestamp("assigned")?,
            timeout: f.calendar_timestamp("timeout")?,
            deadline: f.calendar_timestamp("deadline")?,
            ws: f.network_address("ws")?,
            cs: f.network_address("cs")?,
            attempts: f.integer("attempts")?,
            slot: f.string("slot")?,
            tpf: f.string("tpf")?,
            base_credit: f.float("basecredit")?,
        })
    }
}

/// The client's work queue.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct UnitCollection {
    pub units: Vec<Unit>,
}

impl UnitCollection {
    pub fn for_slot<'a>(&'a self, slot: &'a str) -> impl Iterator<Item = &'a Unit> + 'a {
        self.units.iter().filter(move |unit| unit.slot == slot)
    }
}

impl TypedMessage for UnitCollection {
    fn from_payload(payload: &Value) -> Result<Self, MaterializeError> {
        Ok(Self {
            units: fields::repeated_at(payload, "units")?,
        })
    }
}

impl MessageCollection for UnitCollection {
    type Item = Unit;

    fn into_items(self) -> Vec<Unit> {
        self.units
    }
}
