use std::io::Write;

use crate::import::{EventKind, ProgressEvent, ProgressObserver};
use crate::source::is_stdin;

use super::runner::OutputMode;

/// Turns progress events into lines on a writer (stderr for the binary).
///
/// Progress ticks are shown only with `show_progress`. In human mode,
/// standard-input imports stay quiet apart from errors.
pub struct EventRenderer {
    out: Box<dyn Write + Send>,
    mode: OutputMode,
    show_progress: bool,
    write_failed: bool,
}

impl EventRenderer {
    pub fn new(out: Box<dyn Write + Send>, mode: OutputMode, show_progress: bool) -> Self {
        Self { out, mode, show_progress, write_failed: false }
    }

    #[must_use]
    pub fn stderr(mode: OutputMode, show_progress: bool) -> Self {
        Self::new(Box::new(std::io::stderr()), mode, show_progress)
    }

    fn line(&self, e: &ProgressEvent) -> Option<String> {
        let ticking = matches!(e.kind, EventKind::ParseProgress { .. } | EventKind::WriteProgress { .. });
        if ticking && !self.show_progress {
            return None;
        }
        match self.mode {
            OutputMode::Json => serde_json::to_string(e).ok(),
            OutputMode::Plain => Some(plain(e)),
            OutputMode::Human => human(e),
        }
    }
}

impl ProgressObserver for EventRenderer {
    fn on_event(&mut self, event: &ProgressEvent) {
        if let Some(line) = self.line(event)
            && let Err(e) = writeln!(self.out, "{line}")
            && !self.write_failed
        {
            self.write_failed = true;
            log::debug!("render: dropping progress output: {e}");
        }
    }
}

fn plain(e: &ProgressEvent) -> String {
    let detail = match &e.kind {
        EventKind::ParseStart | EventKind::WriteStart => String::new(),
        EventKind::ParseProgress { rows }
        | EventKind::WriteProgress { rows }
        | EventKind::WriteComplete { rows } => format!(" rows={rows}"),
        EventKind::ParseComplete { rows, duration } => {
            format!(" rows={rows} ms={}", duration.as_millis())
        }
        EventKind::IndexStart { count } => format!(" count={count}"),
        EventKind::IndexComplete { count, duration } => {
            format!(" count={count} ms={}", duration.as_millis())
        }
        EventKind::ParseError { error }
        | EventKind::WriteError { error }
        | EventKind::IndexError { error } => format!(" error={error}"),
    };
    format!("{} path={} table={}{detail}", event_name(&e.kind), e.path, e.table)
}

fn human(e: &ProgressEvent) -> Option<String> {
    let (path, table) = (&e.path, &e.table);
    let quiet = is_stdin(path);
    let line = match &e.kind {
        EventKind::ParseStart if !quiet => {
            format!("  [→] Parsing & writing {path} → table '{table}' (streaming)...")
        }
        EventKind::ParseProgress { rows } if !quiet => format!("  [·] {path}: {rows} rows parsed"),
        EventKind::ParseComplete { rows, duration } if !quiet => format!(
            "  [✓] Completed streaming {path} ({rows} rows parsed & written) in {}ms",
            duration.as_millis()
        ),
        EventKind::WriteStart if !quiet => format!("  [→] Writing {path} to database..."),
        EventKind::WriteProgress { rows } if !quiet => format!("  [·] {path}: {rows} rows written"),
        EventKind::WriteComplete { rows } if !quiet => {
            format!("  [✓] Imported {rows} rows into '{table}'")
        }
        EventKind::ParseError { error } => format!("  [✗] Parse failed: {path} - {error}"),
        EventKind::WriteError { error } => format!("  [✗] Write failed: {path} - {error}"),
        EventKind::IndexStart { count } => format!("  [→] Creating {count} index(es) on '{table}'..."),
        EventKind::IndexComplete { count, duration } => format!(
            "  [✓] Created {count} index(es) on '{table}' in {}ms",
            duration.as_millis()
        ),
        EventKind::IndexError { error } => {
            format!("  [✗] Index creation failed on '{table}': {error}")
        }
        _ => return None,
    };
    Some(line)
}

fn event_name(kind: &EventKind) -> &'static str {
    match kind {
        EventKind::ParseStart => "parse_start",
        EventKind::ParseProgress { .. } => "parse_progress",
        EventKind::ParseComplete { .. } => "parse_complete",
        EventKind::ParseError { .. } => "parse_error",
        EventKind::WriteStart => "write_start",
        EventKind::WriteProgress { .. } => "write_progress",
        EventKind::WriteComplete { .. } => "write_complete",
        EventKind::WriteError { .. } => "write_error",
        EventKind::IndexStart { .. } => "index_start",
        EventKind::IndexComplete { .. } => "index_complete",
        EventKind::IndexError { .. } => "index_error",
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::Mutex;

    use super::*;

    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn render(mode: OutputMode, progress: bool, events: &[ProgressEvent]) -> String {
        let buf = Shared::default();
        let mut r = EventRenderer::new(Box::new(buf.clone()), mode, progress);
        for e in events {
            r.on_event(e);
        }
        String::from_utf8(buf.0.lock().clone()).unwrap()
    }

    fn ev(path: &str, kind: EventKind) -> ProgressEvent {
        ProgressEvent { path: path.into(), table: "t".into(), kind }
    }

    #[test]
    fn progress_ticks_need_flag() {
        let events = [ev("a.csv", EventKind::WriteProgress { rows: 5 })];
        assert!(render(OutputMode::Plain, false, &events).is_empty());
        assert_eq!(render(OutputMode::Plain, true, &events), "write_progress path=a.csv table=t rows=5\n");
    }

    #[test]
    fn json_lines() {
        let events = [ev(
            "a.csv",
            EventKind::IndexComplete { count: 2, duration: Duration::from_millis(3) },
        )];
        let out = render(OutputMode::Json, false, &events);
        let v: serde_json::Value = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(v["event"], "index_complete");
        assert_eq!(v["count"], 2);
    }

    #[test]
    fn human_mode_is_quiet_for_stdin_except_errors() {
        let events = [
            ev("-", EventKind::ParseStart),
            ev("-", EventKind::WriteComplete { rows: 1 }),
            ev("-", EventKind::ParseError { error: "boom".into() }),
        ];
        let out = render(OutputMode::Human, false, &events);
        assert_eq!(out.lines().count(), 1);
        assert!(out.contains("Parse failed"));
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_failures_are_noted_once_and_rendering_continues() {
        let mut r = EventRenderer::new(Box::new(Broken), OutputMode::Plain, false);
        assert!(!r.write_failed);
        r.on_event(&ev("a.csv", EventKind::ParseStart));
        assert!(r.write_failed);
        r.on_event(&ev("a.csv", EventKind::WriteStart));
        assert!(r.write_failed);
    }
}
