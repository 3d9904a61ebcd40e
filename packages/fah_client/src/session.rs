//! Per-connection facade over the extractor, cache and binder.
//!
//! A session lives exactly as long as one connection. A new connection gets a
//! new session (or a `reset`), so data from a previous connection is never
//! presented as current.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::binder::Binder;
use crate::cache::{MessageCache, MessageUpdated};
use crate::error::{BindError, ExtractError, MaterializeError};
use crate::extract::{self, MessageExtractor};
use crate::kind::MessageKind;
use crate::log_sink::LogSink;
use crate::message::RawMessage;
use crate::messages::{LogRestart, LogUpdate};
use crate::registry::{DynMessage, MessageRegistry, TypedMessage};

/// Outcome of feeding one chunk of stream data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Kinds stored in the cache, in arrival order.
    pub stored: Vec<MessageKind>,
    /// Blocks that were framed but could not be decoded.
    pub errors: Vec<ExtractError>,
}

impl UpdateReport {
    pub fn is_empty(&self) -> bool {
        self.stored.is_empty() && self.errors.is_empty()
    }
}

#[derive(Debug, Default)]
struct StreamBuffer {
    /// Unconsumed text after the last complete block.
    text: String,
    /// Trailing bytes of an incomplete UTF-8 sequence.
    pending: Vec<u8>,
}

pub struct ClientSession {
    extractor: MessageExtractor,
    stream: Mutex<StreamBuffer>,
    cache: Arc<MessageCache>,
    binder: Binder,
    log: Option<Arc<dyn LogSink>>,
}

impl ClientSession {
    pub fn new(registry: Arc<MessageRegistry>) -> Self {
        let cache = Arc::new(MessageCache::new(registry));
        Self {
            extractor: MessageExtractor::new(),
            stream: Mutex::new(StreamBuffer::default()),
            binder: Binder::new(cache.clone()),
            cache,
            log: None,
        }
    }

    /// A session using `MessageRegistry::standard()`.
    pub fn standard() -> Self {
        Self::new(Arc::new(MessageRegistry::standard()))
    }

    pub fn with_log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.log = Some(sink);
        self
    }

    /// Feed text read from the connection.
    pub fn update_from_text(&self, text: &str) -> UpdateReport {
        let mut stream = self.stream.lock();
        stream.text.push_str(text);
        self.drain(&mut stream)
    }

    /// Feed raw bytes. An incomplete UTF-8 sequence at the end is held back
    /// until the next call; invalid sequences are replaced.
    pub fn update_from_bytes(&self, bytes: &[u8]) -> UpdateReport {
        let mut stream = self.stream.lock();
        stream.pending.extend_from_slice(bytes);
        let decoded = decode_utf8(&mut stream.pending);
        stream.text.push_str(&decoded);
        self.drain(&mut stream)
    }

    fn drain(&self, stream: &mut StreamBuffer) -> UpdateReport {
        let mut report = UpdateReport::default();
        let mut extraction = self.extractor.extract(&stream.text);

        for result in extraction.by_ref() {
            match result {
                Ok(message) => {
                    let key = message.key();
                    // The sink must hold the text before subscribers hear about it.
                    if key.is_log() {
                        self.route_log(&message);
                    }
                    self.cache.set(message);
                    report.stored.push(key);
                }
                Err(e) => report.errors.push(e),
            }
        }

        let consumed = extraction.consumed();
        stream.text.drain(..consumed);

        let dead = extract::dead_prefix_len(&stream.text);
        if dead > 0 {
            stream.text.drain(..dead);
            debug!(discarded = dead, "Discarded text outside any block");
        }

        if !report.is_empty() {
            debug!(
                stored = report.stored.len(),
                errors = report.errors.len(),
                buffered = stream.text.len(),
                "Processed stream data"
            );
        }
        report
    }

    fn route_log(&self, message: &RawMessage) {
        let Some(sink) = &self.log else {
            return;
        };
        let result = match message.key() {
            MessageKind::LogRestart => LogRestart::from_payload(message.payload()).map(|log| {
                sink.restart();
                sink.append(&log.text);
            }),
            _ => LogUpdate::from_payload(message.payload()).map(|log| sink.append(&log.text)),
        };
        if let Err(e) = result {
            warn!(kind = %message.key(), error = %e, "Log block is not text");
        }
    }

    /// Forward text from the separate log reader. Never touches the cache.
    pub fn append_log_text(&self, text: &str) {
        if let Some(sink) = &self.log {
            sink.append(text);
        }
    }

    pub fn get<T: TypedMessage>(&self) -> Result<Option<T>, MaterializeError> {
        self.binder.get::<T>()
    }

    pub fn try_get<T: TypedMessage>(&self) -> Result<Option<T>, BindError> {
        self.binder.try_get::<T>()
    }

    pub fn get_items<I: 'static>(&self) -> Result<Option<Vec<I>>, MaterializeError> {
        self.binder.get_items::<I>()
    }

    pub fn get_dyn(&self, kind: MessageKind) -> Result<Option<DynMessage>, BindError> {
        self.binder.get_dyn(kind)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MessageUpdated> {
        self.cache.subscribe()
    }

    pub fn cache(&self) -> &Arc<MessageCache> {
        &self.cache
    }

    pub fn binder(&self) -> &Binder {
        &self.binder
    }

    /// Text held back waiting for the rest of a block.
    pub fn buffered(&self) -> String {
        self.stream.lock().text.clone()
    }

    /// Hard reset: drop every cached message and any partial stream data.
    pub fn reset(&self) {
        let mut stream = self.stream.lock();
        *stream = StreamBuffer::default();
        self.cache.clear();
        debug!("Session reset");
    }
}

impl std::fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("cache", &self.cache)
            .field("has_log_sink", &self.log.is_some())
            .finish()
    }
}

/// Decode the valid prefix of `pending`, leaving an incomplete trailing
/// sequence in place.
fn decode_utf8(pending: &mut Vec<u8>) -> String {
    let mut out = String::new();
    let mut start = 0;

    loop {
        match std::str::from_utf8(&pending[start..]) {
            Ok(valid) => {
                out.push_str(valid);
                start = pending.len();
                break;
            }
            Err(e) => {
                let valid_end = start + e.valid_up_to();
                out.push_str(&String::from_utf8_lossy(&pending[start..valid_end]));
                match e.error_len() {
                    Some(len) => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        start = valid_end + len;
                    }
                    None => {
                        start = valid_end;
                        break;
                    }
                }
            }
        }
    }

    pending.drain(..start);
    out
}
