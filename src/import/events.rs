//! Structured progress events and the serialized channel that delivers them.
//!
//! The core never formats output; it hands [`ProgressEvent`]s to a single
//! observer. Concurrent workers share one [`EventChannel`], whose mutex keeps
//! emissions from interleaving.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Serialize, Serializer};

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventKind {
    ParseStart,
    ParseProgress {
        rows: u64,
    },
    ParseComplete {
        rows: u64,
        #[serde(rename = "duration_ms", serialize_with = "millis")]
        duration: Duration,
    },
    ParseError {
        error: String,
    },
    WriteStart,
    WriteProgress {
        rows: u64,
    },
    WriteComplete {
        rows: u64,
    },
    WriteError {
        error: String,
    },
    IndexStart {
        count: usize,
    },
    IndexComplete {
        count: usize,
        #[serde(rename = "duration_ms", serialize_with = "millis")]
        duration: Duration,
    },
    IndexError {
        error: String,
    },
}

/// An event tagged with its file and destination table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub path: String,
    pub table: String,
    #[serde(flatten)]
    pub kind: EventKind,
}

fn millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Receiver of progress events. Called with the channel lock held.
pub trait ProgressObserver: Send {
    fn on_event(&mut self, event: &ProgressEvent);
}

impl<F> ProgressObserver for F
where
    F: FnMut(&ProgressEvent) + Send,
{
    fn on_event(&mut self, event: &ProgressEvent) {
        self(event);
    }
}

/// Cloneable, mutex-guarded handle to one observer. A silent channel drops everything.
#[derive(Clone, Default)]
pub struct EventChannel {
    observer: Option<Arc<Mutex<Box<dyn ProgressObserver>>>>,
}

impl std::fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventChannel").field("attached", &self.observer.is_some()).finish()
    }
}

impl EventChannel {
    pub fn new(observer: impl ProgressObserver + 'static) -> Self {
        Self { observer: Some(Arc::new(Mutex::new(Box::new(observer)))) }
    }

    #[must_use]
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn emit(&self, path: &str, table: &str, kind: EventKind) {
        let Some(observer) = &self.observer else {
            return;
        };
        let event = ProgressEvent { path: path.to_string(), table: table.to_string(), kind };
        observer.lock().on_event(&event);
    }

    /// Channel bound to one file, so call sites only name the event.
    #[must_use]
    pub fn scoped<'a>(&'a self, path: &'a str, table: &'a str) -> FileEvents<'a> {
        FileEvents { channel: self, path, table }
    }
}

/// [`EventChannel`] bound to one file and table.
#[derive(Debug, Clone, Copy)]
pub struct FileEvents<'a> {
    channel: &'a EventChannel,
    path: &'a str,
    table: &'a str,
}

impl FileEvents<'_> {
    pub fn emit(&self, kind: EventKind) {
        self.channel.emit(self.path, self.table, kind);
    }
}
