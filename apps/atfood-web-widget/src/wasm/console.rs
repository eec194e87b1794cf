use std::io;

use tracing::Metadata;
use tracing_subscriber::fmt::MakeWriter;

use super::*;
use crate::console_log::{ConsoleMethod, EventLine, console_subscriber};

/// Routes `tracing` output to the browser console. Installed at start, before
/// anything else logs.
pub(super) fn install_console_logging() {
    if tracing::subscriber::set_global_default(console_subscriber(ConsoleMakeWriter)).is_err() {
        web_sys::console::warn_1(&JsValue::from_str(
            "atfood: a tracing subscriber is already installed",
        ));
    }
}

struct ConsoleMakeWriter;

impl<'a> MakeWriter<'a> for ConsoleMakeWriter {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> ConsoleWriter {
        ConsoleWriter(EventLine::new(tracing::Level::INFO))
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> ConsoleWriter {
        ConsoleWriter(EventLine::new(*meta.level()))
    }
}

struct ConsoleWriter(EventLine);

impl io::Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::Write::write(&mut self.0, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        let Some((method, line)) = self.0.finish() else {
            return;
        };
        let message = JsValue::from_str(&line);
        match method {
            ConsoleMethod::Error => web_sys::console::error_1(&message),
            ConsoleMethod::Warn => web_sys::console::warn_1(&message),
            ConsoleMethod::Log => web_sys::console::log_1(&message),
        }
    }
}
