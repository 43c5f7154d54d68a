//! Capture `tracing` output for assertions.

use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

const CAPTURE_ALL: &str = "trace";

/// In-memory sink for formatted log records.
///
/// # Example
///
/// ```
/// use vellox_testing::LogCapture;
///
/// let logs = LogCapture::new();
/// logs.capture(|| tracing::error!("Exception in 'lifespan' protocol."));
///
/// assert!(logs.contains("Exception in 'lifespan' protocol."));
/// ```
#[derive(Debug, Clone)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
    directives: String,
}

impl Default for LogCapture {
    fn default() -> Self {
        Self::with_filter(CAPTURE_ALL)
    }
}

impl LogCapture {
    /// Create an empty capture that records everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty capture that only records events matching
    /// `directives`, in `RUST_LOG` syntax (e.g. `"vellox_runtime=info"`).
    #[must_use]
    pub fn with_filter(directives: impl Into<String>) -> Self {
        Self {
            buffer: Arc::default(),
            directives: directives.into(),
        }
    }

    /// Run `f` with events on this thread recorded through the capture's filter.
    ///
    /// Directives that fail to parse fall back to recording everything.
    pub fn capture<T>(&self, f: impl FnOnce() -> T) -> T {
        let filter =
            EnvFilter::try_new(&self.directives).unwrap_or_else(|_| EnvFilter::new(CAPTURE_ALL));
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_env_filter(filter)
            .finish();
        tracing::subscriber::with_default(subscriber, f)
    }

    /// Everything recorded so far.
    #[must_use]
    pub fn contents(&self) -> String {
        let buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buffer).into_owned()
    }

    /// Whether `needle` appears in the recorded output.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.contents().contains(needle)
    }

    /// Number of recorded lines containing `needle`.
    #[must_use]
    pub fn count(&self, needle: &str) -> usize {
        self.contents()
            .lines()
            .filter(|line| line.contains(needle))
            .count()
    }
}

/// Writer handed out per event.
#[derive(Debug)]
pub struct CaptureWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl io::Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CaptureWriter {
            buffer: Arc::clone(&self.buffer),
        }
    }
}
