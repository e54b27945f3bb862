//! Runtime-checked diagnostics for the registry.
//!
//! The leak report has a fixed line shape that external tooling greps for,
//! so it is written to a pluggable byte stream (stderr unless a test swaps
//! in a capture buffer) instead of going through `tracing`. Everything
//! else (per-add/per-remove trace lines, the leak summary) is a regular
//! `tracing` event.
//!
//! Verbosity is a runtime flag, not a compile-time one: quiet and verbose
//! behavior coexist in a single build and can both be exercised by tests.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tally_types::LeakRecord;

/// Environment variable that switches verbose diagnostics on (`1` or
/// `true`).
pub const VERBOSE_ENV: &str = "TALLY_LOG";

/// Verbosity gate plus the stream the leak report is written to.
pub struct Diagnostics {
    verbose: AtomicBool,
    sink: Mutex<Box<dyn Write + Send>>,
}

impl Diagnostics {
    /// Read the verbosity flag from [`VERBOSE_ENV`]; report to stderr.
    pub fn from_env() -> Self {
        let verbose = std::env::var(VERBOSE_ENV)
            .is_ok_and(|value| value == "1" || value.eq_ignore_ascii_case("true"));
        Self::enabled(verbose)
    }

    /// Fixed verbosity; report to stderr.
    pub fn enabled(verbose: bool) -> Self {
        Self::with_sink(verbose, Box::new(io::stderr()))
    }

    /// Fixed verbosity, reporting into `sink` instead of stderr.
    pub fn with_sink(verbose: bool, sink: Box<dyn Write + Send>) -> Self {
        Self {
            verbose: AtomicBool::new(verbose),
            sink: Mutex::new(sink),
        }
    }

    /// Whether verbose diagnostics are currently on.
    pub fn verbose(&self) -> bool {
        self.verbose.load(Ordering::Relaxed)
    }

    /// Flip verbose diagnostics at runtime.
    pub fn set_verbose(&self, verbose: bool) {
        self.verbose.store(verbose, Ordering::Relaxed);
    }

    /// Write one line per leaked object, in the given order, followed by a
    /// blank flush line.
    ///
    /// No-op unless verbose diagnostics are on. Write failures are
    /// ignored: the process is exiting and the report is best-effort.
    pub fn write_leak_report(&self, leaked: &[LeakRecord]) {
        if !self.verbose() || leaked.is_empty() {
            return;
        }
        let mut sink = self.sink.lock();
        for record in leaked {
            let _ = writeln!(
                sink,
                "Leaked object with {} references: {}",
                record.ref_count, record.type_name
            );
        }
        let _ = writeln!(sink);
        let _ = sink.flush();
    }
}
