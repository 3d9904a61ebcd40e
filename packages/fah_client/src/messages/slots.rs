use serde::Serialize;
use serde_json::Value;

use crate::convert::SlotStatus;
use crate::error::MaterializeError;
use crate::fields::{self, Fields, FromFields};
use crate::registry::{MessageCollection, TypedMessage};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Slot {
    pub id: String,
    pub status: Option<SlotStatus>,
    pub description: String,
    pub reason: String,
    pub idle: bool,
    pub options: Option<SlotOptions>,
}

impl FromFields for Slot {
    fn from_fields(f: &Fields<'_>) -> Result<Self, MaterializeError> {
        Ok(Self {
            id: f.string("id")?,
            status: f.status("status")?,
            description: f.string("description")?,
            reason: f.string("reason")?,
            idle: f.boolean("idle")?,
            options: f.nested("options")?,
        })
    }
}

/// Every slot the client knows about.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SlotCollection {
    pub slots: Vec<Slot>,
}

impl SlotCollection {
    pub fn get(&self, id: &str) -> Option<&Slot> {
        self.slots.iter().find(|slot| slot.id == id)
    }
}

impl TypedMessage for SlotCollection {
    fn from_payload(payload: &Value) -> Result<Self, MaterializeError> {
        Ok(Self {
            slots: fields::repeated_at(payload, "slots")?,
        })
    }
}

impl MessageCollection for SlotCollection {
    type Item = Slot;

    fn into_items(self) -> Vec<Slot> {
        self.slots
    }
}

/// Per-slot configuration. Every value arrives as a string.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SlotOptions {
    pub machine_id: i64,
    pub client_type: String,
    pub client_subtype: String,
    pub cpus: i64,
    pub cpu_usage: i64,
    pub gpu_index: String,
    pub gpu_usage: i64,
    pub core_priority: String,
    pub max_packet_size: String,
    pub next_unit_percentage: i64,
    pub pause_on_start: bool,
    pub paused: bool,
}

impl FromFields for SlotOptions {
    fn from_fields(f: &Fields<'_>) -> Result<Self, MaterializeError> {
        Ok(Self {
            machine_id: f.integer("machine-id")?,
            client_type: f.string("client-type")?,
            client_subtype: f.string("client-subtype")?,
            cpus: f.integer("cpus")?,
            cpu_usage: f.integer("cpu-usage")?,
            gpu_index: f.string("gpu-index")?,
            gpu_usage: f.integer("gpu-usage")?,
            core_priority: f.string("core-priority")?,
            max_packet_size: f.string("max-packet-size")?,
            next_unit_percentage: f.integer("next-unit-percentage")?,
            pause_on_start: f.boolean("pause-on-start")?,
            paused: f.boolean("paused")?,
        })
    }
}

impl TypedMessage for SlotOptions {
    fn from_payload(payload: &Value) -> Result<Self, MaterializeError> {
        Self::from_fields(&Fields::at(payload, "slot-options")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormatError;
    use serde_json::json;

    #[test]
    fn slots_with_nested_options() {
        let payload = json!([
            {
                "id": "00",
                "status": "RUNNING",
                "description": "cpu:15",
                "options": {"cpus": "15", "paused": "false"},
                "reason": "",
                "idle": false
            },
            {"id": "01", "status": "PAUSED", "description": "gpu:1:GP104", "idle": true}
        ]);
        let slots = SlotCollection::from_payload(&payload).unwrap();
        assert_eq!(slots.slots.len(), 2);

        let cpu = slots.get("00").unwrap();
        assert_eq!(cpu.status, Some(SlotStatus::Running));
        assert_eq!(cpu.options.as_ref().unwrap().cpus, 15);

        let gpu = slots.get("01").unwrap();
        assert_eq!(gpu.status, Some(SlotStatus::Paused));
        assert!(gpu.idle);
        assert!(gpu.options.is_none());
    }

    #[test]
    fn unknown_status_fails_with_path() {
        let payload = json!([{"id": "00", "status": "RUNNING"}, {"id": "01", "status": "BOGUS"}]);
        let err = SlotCollection::from_payload(&payload).unwrap_err();
        assert_eq!(err.field, "slots[1].status");
        assert_eq!(
            err.source,
            FormatError::UnknownStatus {
                value: "BOGUS".into()
            }
        );
    }

    #[test]
    fn slots_payload_must_be_a_list() {
        let err = SlotCollection::from_payload(&json!({"id": "00"})).unwrap_err();
        assert_eq!(err.field, "slots");
    }

    #[test]
    fn slot_options_from_strings() {
        let payload = json!({"machine-id": "0", "cpu-usage": "100", "pause-on-start": "true"});
        let options = SlotOptions::from_payload(&payload).unwrap();
        assert_eq!(options.cpu_usage, 100);
        assert!(options.pause_on_start);
    }
}
