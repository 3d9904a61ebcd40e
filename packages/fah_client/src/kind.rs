use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of state pushed by the remote client.
///
/// The wire key is the name that follows the `PyON` header token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageKind {
    Heartbeat,
    Info,
    Options,
    SimulationInfo,
    Slots,
    SlotOptions,
    Units,
    LogRestart,
    LogUpdate,
}

impl MessageKind {
    pub const ALL: [MessageKind; 9] = [
        MessageKind::Heartbeat,
        MessageKind::Info,
        MessageKind::Options,
        MessageKind::SimulationInfo,
        MessageKind::Slots,
        MessageKind::SlotOptions,
        MessageKind::Units,
        MessageKind::LogRestart,
        MessageKind::LogUpdate,
    ];

    /// Stable wire key, byte-for-byte as the peer sends it.
    pub fn wire_key(&self) -> &'static str {
        match self {
            MessageKind::Heartbeat => "heartbeat",
            MessageKind::Info => "info",
            MessageKind::Options => "options",
            MessageKind::SimulationInfo => "simulation-info",
            MessageKind::Slots => "slots",
            MessageKind::SlotOptions => "slot-options",
            MessageKind::Units => "units",
            MessageKind::LogRestart => "log-restart",
            MessageKind::LogUpdate => "log-update",
        }
    }

    /// Whether the payload carries log text rather than client state.
    pub fn is_log(&self) -> bool {
        matches!(self, MessageKind::LogRestart | MessageKind::LogUpdate)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_key())
    }
}

impl std::str::FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MessageKind::ALL
            .into_iter()
            .find(|kind| kind.wire_key().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown message kind: {}", s))
    }
}
