//! Formatting half of the browser console logger. Events are formatted by a
//! plain `tracing_subscriber::fmt` subscriber; each finished line is handed to
//! `console.error`, `console.warn` or `console.log` by level.

use std::io;

use tracing::{Level, Subscriber};
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ConsoleMethod {
    Error,
    Warn,
    Log,
}

impl ConsoleMethod {
    pub(crate) fn for_level(level: Level) -> Self {
        if level == Level::ERROR {
            Self::Error
        } else if level == Level::WARN {
            Self::Warn
        } else {
            Self::Log
        }
    }
}

/// The console has its own timestamps, so lines carry none. No ANSI colors.
pub(crate) fn console_subscriber<W>(make_writer: W) -> impl Subscriber + Send + Sync
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_writer(make_writer)
        .with_max_level(Level::INFO)
        .with_ansi(false)
        .with_target(false)
        .without_time()
        .finish()
}

/// One formatted event, buffered until its writer is dropped.
pub(crate) struct EventLine {
    level: Level,
    buffer: Vec<u8>,
}

impl EventLine {
    pub(crate) fn new(level: Level) -> Self {
        Self {
            level,
            buffer: Vec::new(),
        }
    }

    pub(crate) fn finish(&mut self) -> Option<(ConsoleMethod, String)> {
        if self.buffer.is_empty() {
            return None;
        }
        let bytes = std::mem::take(&mut self.buffer);
        let line = String::from_utf8_lossy(&bytes).trim_end().to_string();
        Some((ConsoleMethod::for_level(self.level), line))
    }
}

impl io::Write for EventLine {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tracing::Metadata;

    use super::*;

    type Lines = Arc<Mutex<Vec<(ConsoleMethod, String)>>>;

    #[derive(Clone, Default)]
    struct CapturedConsole(Lines);

    struct CapturedWriter {
        line: EventLine,
        sink: Lines,
    }

    impl io::Write for CapturedWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            io::Write::write(&mut self.line, buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Drop for CapturedWriter {
        fn drop(&mut self) {
            if let Some(entry) = self.line.finish() {
                self.sink.lock().unwrap().push(entry);
            }
        }
    }

    impl<'a> MakeWriter<'a> for CapturedConsole {
        type Writer = CapturedWriter;

        fn make_writer(&'a self) -> CapturedWriter {
            self.writer(Level::INFO)
        }

        fn make_writer_for(&'a self, meta: &Metadata<'_>) -> CapturedWriter {
            self.writer(*meta.level())
        }
    }

    impl CapturedConsole {
        fn writer(&self, level: Level) -> CapturedWriter {
            CapturedWriter {
                line: EventLine::new(level),
                sink: Arc::clone(&self.0),
            }
        }
    }

    #[test]
    fn levels_map_to_console_methods() {
        assert_eq!(ConsoleMethod::for_level(Level::ERROR), ConsoleMethod::Error);
        assert_eq!(ConsoleMethod::for_level(Level::WARN), ConsoleMethod::Warn);
        assert_eq!(ConsoleMethod::for_level(Level::INFO), ConsoleMethod::Log);
        assert_eq!(ConsoleMethod::for_level(Level::TRACE), ConsoleMethod::Log);
    }

    #[test]
    fn dispatch_failures_reach_the_console_as_warnings() {
        let console = CapturedConsole::default();
        tracing::subscriber::with_default(console_subscriber(console.clone()), || {
            tracing::warn!(action = "recipe", kind = "network", "atfood action failed");
            tracing::error!("atfood widget failed to start");
            tracing::info!("atfood widget started");
            tracing::debug!("trigger dispatch settled without a response");
        });

        let lines = console.0.lock().unwrap().clone();
        let methods: Vec<ConsoleMethod> = lines.iter().map(|(method, _)| *method).collect();
        assert_eq!(
            methods,
            vec![ConsoleMethod::Warn, ConsoleMethod::Error, ConsoleMethod::Log]
        );
        assert!(lines[0].1.contains("WARN"));
        assert!(lines[0].1.contains("atfood action failed"));
        assert!(lines[0].1.contains("recipe"));
        assert!(!lines[0].1.ends_with('\n'));
        assert!(lines[1].1.contains("failed to start"));
    }

    #[test]
    fn empty_writes_emit_nothing() {
        let mut line = EventLine::new(Level::WARN);
        assert_eq!(line.finish(), None);
    }
}
