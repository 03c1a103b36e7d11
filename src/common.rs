// Licensed under the Apache-2.0 license

//! Logging facade shared by the drivers in this crate.
//!
//! Drivers take a `L: Logger` type parameter (defaulting to [`NoOpLogger`]) instead of
//! reaching for a global printer, so a board can route messages to a UART while tests
//! and size-constrained builds compile the calls away.

use core::fmt::{self, Write as _};
use embedded_io::Write;
use heapless::String;

/// Sink for driver diagnostics.
pub trait Logger {
    fn debug(&mut self, args: fmt::Arguments<'_>);
    fn info(&mut self, args: fmt::Arguments<'_>);
    fn error(&mut self, args: fmt::Arguments<'_>);
}

impl<L: Logger + ?Sized> Logger for &mut L {
    fn debug(&mut self, args: fmt::Arguments<'_>) {
        (**self).debug(args);
    }

    fn info(&mut self, args: fmt::Arguments<'_>) {
        (**self).info(args);
    }

    fn error(&mut self, args: fmt::Arguments<'_>) {
        (**self).error(args);
    }
}

/// Logger that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn debug(&mut self, _args: fmt::Arguments<'_>) {}
    fn info(&mut self, _args: fmt::Arguments<'_>) {}
    fn error(&mut self, _args: fmt::Arguments<'_>) {}
}

const LOG_LINE_CAPACITY: usize = 128;

/// Logger writing one `[LEVEL] message` line per call to an `embedded-io` writer.
///
/// Lines that do not fit in the internal line buffer are truncated. Write errors are
/// dropped: a broken console must never take the driver down with it.
pub struct UartLogger<W: Write> {
    writer: W,
}

impl<W: Write> UartLogger<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Give back the underlying writer.
    pub fn release(self) -> W {
        self.writer
    }

    fn emit(&mut self, level: &str, args: fmt::Arguments<'_>) {
        let mut line: String<LOG_LINE_CAPACITY> = String::new();
        let _ = write!(line, "[{level}] ");
        let _ = line.write_fmt(args);
        let _ = self.writer.write_all(line.as_bytes());
        let _ = self.writer.write_all(b"\r\n");
    }
}

impl<W: Write> Logger for UartLogger<W> {
    fn debug(&mut self, args: fmt::Arguments<'_>) {
        self.emit("DEBUG", args);
    }

    fn info(&mut self, args: fmt::Arguments<'_>) {
        self.emit("INFO", args);
    }

    fn error(&mut self, args: fmt::Arguments<'_>) {
        self.emit("ERROR", args);
    }
}
