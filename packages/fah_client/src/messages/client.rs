use serde::Serialize;
use serde_json::{Map, Value};

use crate::convert;
use crate::error::MaterializeError;
use crate::fields::{Fields, FromFields};
use crate::registry::TypedMessage;

/// Periodic liveness counter.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Heartbeat {
    pub value: i64,
}

impl TypedMessage for Heartbeat {
    fn from_payload(payload: &Value) -> Result<Self, MaterializeError> {
        if payload.is_object() {
            let fields = Fields::at(payload, "heartbeat")?;
            return Ok(Self {
                value: fields.integer("value")?,
            });
        }
        convert::integer(payload)
            .map(|value| Self { value })
            .map_err(|source| MaterializeError {
                field: "heartbeat".into(),
                raw: payload.to_string(),
                source,
            })
    }
}

/// Client build and host system description.
///
/// The peer sends a list of sections, each `[name, [key, value], ...]`; keys
/// are folded to snake case (`"CPU ID"` becomes `cpu_id`).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Info {
    pub client: ClientInfo,
    pub system: SystemInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClientInfo {
    pub version: String,
    pub date: String,
    pub time: String,
    pub revision: String,
    pub branch: String,
    pub platform: String,
    pub bits: i64,
    pub mode: String,
    pub args: String,
    pub config: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SystemInfo {
    pub os: String,
    pub os_arch: String,
    pub os_version: String,
    pub cpu: String,
    pub cpu_id: String,
    pub cpus: i64,
    pub memory: String,
    pub free_memory: String,
    pub threads: String,
    pub has_battery: bool,
    pub on_battery: bool,
    pub utc_offset: i64,
    pub pid: i64,
    pub cwd: String,
    pub win32_service: bool,
    pub gpus: i64,
    /// `GPU 0`, `GPU 1`, ... in index order.
    pub gpu_devices: Vec<String>,
}

impl FromFields for ClientInfo {
    fn from_fields(f: &Fields<'_>) -> Result<Self, MaterializeError> {
        Ok(Self {
            version: f.string("version")?,
            date: f.string("date")?,
            time: f.string("time")?,
            revision: f.string("revision")?,
            branch: f.string("branch")?,
            platform: f.string("platform")?,
            bits: f.integer("bits")?,
            mode: f.string("mode")?,
            args: f.string("args")?,
            config: f.string("config")?,
        })
    }
}

impl FromFields for SystemInfo {
    fn from_fields(f: &Fields<'_>) -> Result<Self, MaterializeError> {
        let gpus = f.integer("gpus")?;

        // Device entries are whatever `gpu_<n>` keys arrived, ordered by `n`.
        let mut indexed: Vec<(u32, &str)> = f
            .names()
            .filter_map(|name| Some((name.strip_prefix("gpu_")?.parse().ok()?, name)))
            .collect();
        indexed.sort_unstable_by_key(|&(index, _)| index);
        let gpu_devices = indexed
            .into_iter()
            .filter(|&(_, name)| f.get(name).is_some())
            .map(|(_, name)| f.string(name))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            os: f.string("os")?,
            os_arch: f.string("os_arch")?,
            os_version: f.string("os_version")?,
            cpu: f.string("cpu")?,
            cpu_id: f.string("cpu_id")?,
            cpus: f.integer("cpus")?,
            memory: f.string("memory")?,
            free_memory: f.string("free_memory")?,
            threads: f.string("threads")?,
            has_battery: f.boolean("has_battery")?,
            on_battery: f.boolean("on_battery")?,
            utc_offset: f.integer("utc_offset")?,
            pid: f.integer("pid")?,
            cwd: f.string("cwd")?,
            win32_service: f.boolean("win32_service")?,
            gpus,
            gpu_devices,
        })
    }
}

impl TypedMessage for Info {
    fn from_payload(payload: &Value) -> Result<Self, MaterializeError> {
        let sections = match payload {
            Value::Array(items) => fold_sections(items),
            other => other.clone(),
        };
        let fields = Fields::at(&sections, "info")?;
        Ok(Self {
            client: fields.nested("fahclient")?.unwrap_or_default(),
            system: fields.nested("system")?.unwrap_or_default(),
        })
    }
}

/// `[["System", ["CPU ID", "x"]]]` to `{"system": {"cpu_id": "x"}}`.
///
/// Entries that are not `[name, value]` pairs are skipped.
fn fold_sections(items: &[Value]) -> Value {
    let mut sections = Map::new();
    for section in items.iter().filter_map(Value::as_array) {
        let Some((name, entries)) = section.split_first() else {
            continue;
        };
        let Some(name) = name.as_str() else {
            continue;
        };

        let mut map = Map::new();
        for entry in entries.iter().filter_map(Value::as_array) {
            if let [Value::String(key), value] = entry.as_slice() {
                map.insert(snake_key(key), value.clone());
            }
        }
        sections.insert(snake_key(name), Value::Object(map));
    }
    Value::Object(sections)
}

fn snake_key(key: &str) -> String {
    key.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// Client-wide configuration. Every value arrives as a string.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Options {
    pub user: String,
    pub team: i64,
    pub passkey: String,
    pub cause: String,
    pub power: String,
    pub client_type: String,
    pub client_subtype: String,
    pub fold_anon: bool,
    pub gpu: bool,
    pub checkpoint: i64,
    pub next_unit_percentage: i64,
    pub max_packet_size: String,
    pub core_priority: String,
    pub pause_on_start: bool,
    pub idle: bool,
}

impl FromFields for Options {
    fn from_fields(f: &Fields<'_>) -> Result<Self, MaterializeError> {
        Ok(Self {
            user: f.string("user")?,
            team: f.integer("team")?,
            passkey: f.string("passkey")?,
            cause: f.string("cause")?,
            power: f.string("power")?,
            client_type: f.string("client-type")?,
            client_subtype: f.string("client-subtype")?,
            fold_anon: f.boolean("fold-anon")?,
            gpu: f.boolean("gpu")?,
            checkpoint: f.integer("checkpoint")?,
            next_unit_percentage: f.integer("next-unit-percentage")?,
            max_packet_size: f.string("max-packet-size")?,
            core_priority: f.string("core-priority")?,
            pause_on_start: f.boolean("pause-on-start")?,
            idle: f.boolean("idle")?,
        })
    }
}

impl TypedMessage for Options {
    fn from_payload(payload: &Value) -> Result<Self, MaterializeError> {
        Self::from_fields(&Fields::at(payload, "options")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn heartbeat_scalar_and_object() {
        assert_eq!(Heartbeat::from_payload(&json!(3)).unwrap().value, 3);
        assert_eq!(
            Heartbeat::from_payload(&json!({"value": 42})).unwrap().value,
            42
        );
        let err = Heartbeat::from_payload(&json!("soon")).unwrap_err();
        assert_eq!(err.field, "heartbeat");
    }

    #[test]
    fn info_from_sections() {
        let payload = json!([
            ["FAHClient", ["Version", "7.6.21"], ["Bits", "64"], ["Mode", "Release"]],
            ["CBang", ["Date", "Oct 20 2020"]],
            ["System",
                ["CPU", "AMD Ryzen 7"],
                ["CPU ID", "AuthenticAMD Family 23"],
                ["CPUs", "16"],
                ["Has Battery", "false"],
                ["UTC Offset", "-5"],
                ["GPUs", "2"],
                ["GPU 0", "gpu:38:00.0 Navi 10"],
                ["GPU 1", "gpu:39:00.0 GP104"]
            ]
        ]);
        let info = Info::from_payload(&payload).unwrap();
        assert_eq!(info.client.version, "7.6.21");
        assert_eq!(info.client.bits, 64);
        assert_eq!(info.system.cpu_id, "AuthenticAMD Family 23");
        assert_eq!(info.system.cpus, 16);
        assert_eq!(info.system.utc_offset, -5);
        assert!(!info.system.has_battery);
        assert_eq!(
            info.system.gpu_devices,
            vec!["gpu:38:00.0 Navi 10", "gpu:39:00.0 GP104"]
        );
    }

    #[test]
    fn gpu_devices_come_from_present_entries() {
        let payload = json!([[
            "System",
            ["GPUs", "9223372036854775807"],
            ["GPU 10", "gpu:2:0 TU106"],
            ["GPU 2", "gpu:1:0 GP104"]
        ]]);
        let info = Info::from_payload(&payload).unwrap();
        assert_eq!(info.system.gpus, i64::MAX);
        assert_eq!(
            info.system.gpu_devices,
            vec!["gpu:1:0 GP104", "gpu:2:0 TU106"]
        );
    }

    #[test]
    fn info_bad_value_names_section() {
        let payload = json!([["System", ["CPUs", "many"]]]);
        let err = Info::from_payload(&payload).unwrap_err();
        assert_eq!(err.field, "info.system.cpus");
    }

    #[test]
    fn options_from_strings() {
        let payload = json!({
            "user": "anonymous",
            "team": "32",
            "fold-anon": "true",
            "client-type": "advanced",
            "checkpoint": "15"
        });
        let options = Options::from_payload(&payload).unwrap();
        assert_eq!(options.team, 32);
        assert!(options.fold_anon);
        assert_eq!(options.client_type, "advanced");
        assert_eq!(options.checkpoint, 15);
        assert_eq!(options.passkey, "");
    }
}
