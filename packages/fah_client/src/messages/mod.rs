//! Typed projections of every message kind the client sends.
//!
//! The root path used in materialization errors is the kind's wire key, so a
//! bad slot status reports as `slots[0].status`.

mod client;
mod log;
mod simulation;
mod slots;
mod units;

pub use client::{ClientInfo, Heartbeat, Info, Options, SystemInfo};
pub use log::{LogRestart, LogUpdate};
pub use simulation::SimulationInfo;
pub use slots::{Slot, SlotCollection, SlotOptions};
pub use units::{Unit, UnitCollection};

use chrono::Duration;
use serde::Serializer;

fn serialize_duration_secs<S: Serializer>(
    value: &Option<Duration>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(duration) => serializer.serialize_some(&duration.num_seconds()),
        None => serializer.serialize_none(),
    }
}
