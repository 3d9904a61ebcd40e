use anyhow::Result;
use fah_client::{
    ClientSession, Heartbeat, LogBuffer, MessageKind, MessageUpdated, Options, Slot, Unit,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    /// One human-readable summary per update
    #[default]
    Text,
    /// One JSON object per update
    Json,
}

/// Render the current value behind `update`, or `None` when there is nothing
/// worth printing.
pub fn render(session: &ClientSession, update: MessageUpdated, format: Format) -> Result<Option<String>> {
    match format {
        Format::Json => render_json(session, update.key),
        Format::Text => render_text(session, update.key),
    }
}

fn render_json(session: &ClientSession, kind: MessageKind) -> Result<Option<String>> {
    let Some(message) = session.get_dyn(kind)? else {
        return Ok(None);
    };
    let line = json!({ "kind": kind, "message": message.to_json() });
    Ok(Some(line.to_string()))
}

fn render_text(session: &ClientSession, kind: MessageKind) -> Result<Option<String>> {
    let text = match kind {
        MessageKind::Heartbeat => session
            .get::<Heartbeat>()?
            .map(|h| format!("heartbeat {}", h.value)),
        MessageKind::Options => session
            .get::<Options>()?
            .map(|o| format!("options: user={} team={} power={}", o.user, o.team, o.power)),
        MessageKind::Slots => session.get_items::<Slot>()?.map(|slots| {
            slots
                .iter()
                .map(|s| {
                    let status = s.status.map(|st| st.token()).unwrap_or("-");
                    format!("slot {} {status} {}", s.id, s.description)
                })
                .collect::<Vec<_>>()
                .join("\n")
        }),
        MessageKind::Units => session.get_items::<Unit>()?.map(|units| {
            units
                .iter()
                .map(|u| {
                    let done = u.percent_done.unwrap_or_default();
                    format!(
                        "unit {} slot {} {} P{} ({}, {}, {}) {done:.2}% eta {}",
                        u.id, u.slot, u.state, u.project, u.run, u.clone, u.generation, u.eta
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        }),
        // Log text is printed from the accumulator.
        MessageKind::LogRestart | MessageKind::LogUpdate => None,
        other => Some(format!("{other} updated")),
    };
    Ok(text.filter(|t| !t.is_empty()))
}

/// Print every update until the session's channel closes.
pub async fn print_updates(
    session: Arc<ClientSession>,
    mut updates: broadcast::Receiver<MessageUpdated>,
    format: Format,
    log: Option<Arc<LogBuffer>>,
) {
    let mut printed_lines = 0u64;
    let mut seen_restarts = 0u64;

    loop {
        let update = match updates.recv().await {
            Ok(update) => update,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Output fell behind; skipped updates");
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        match render(&session, update, format) {
            Ok(Some(text)) => println!("{text}"),
            Ok(None) => {}
            Err(e) => warn!(kind = %update.key, error = %e, "Failed to render update"),
        }

        let Some(log) = log.as_ref().filter(|_| update.key.is_log()) else {
            continue;
        };
        let snapshot = log.snapshot();
        if snapshot.restarts != seen_restarts {
            seen_restarts = snapshot.restarts;
            printed_lines = 0;
        }
        for line in snapshot.after(printed_lines) {
            println!("log: {line}");
        }
        printed_lines = snapshot.total_lines;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(session: &ClientSession, text: &str) -> MessageUpdated {
        let mut rx = session.subscribe();
        session.update_from_text(text);
        rx.try_recv().unwrap()
    }

    #[test]
    fn test_text_slots() {
        let session = ClientSession::standard();
        let u = update(
            &session,
            "PyON 1 slots\n[{\"id\": \"00\", \"status\": \"RUNNING\", \"description\": \"cpu:4\"}]\n---\n",
        );
        assert_eq!(
            render(&session, u, Format::Text).unwrap().as_deref(),
            Some("slot 00 RUNNING cpu:4")
        );
    }

    #[test]
    fn test_json_heartbeat() {
        let session = ClientSession::standard();
        let u = update(&session, "PyON 1 heartbeat\n8\n---\n");
        let line = render(&session, u, Format::Json).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["kind"], "heartbeat");
        assert_eq!(value["message"]["value"], 8);
    }

    #[test]
    fn test_bad_payload_is_an_error() {
        let session = ClientSession::standard();
        let u = update(&session, "PyON 1 slots\n[{\"status\": \"LOST\"}]\n---\n");
        assert!(render(&session, u, Format::Text).is_err());
    }

    #[test]
    fn test_log_blocks_print_nothing_directly() {
        let session = ClientSession::standard();
        let u = update(&session, "PyON 1 log-update\n\"x\\n\"\n---\n");
        assert_eq!(render(&session, u, Format::Text).unwrap(), None);
    }
}
