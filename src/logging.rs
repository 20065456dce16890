//! Tracing subscriber setup

use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::LogFormat;

const DEFAULT_FILTER: &str = "media_auditor=info";

/// Where diagnostics are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    /// Interleaved with the text report
    Stdout,
    /// Kept off stdout so JSON results stay parseable
    Stderr,
}

impl LogStream {
    fn writer(self) -> BoxMakeWriter {
        match self {
            LogStream::Stdout => BoxMakeWriter::new(std::io::stdout),
            LogStream::Stderr => BoxMakeWriter::new(std::io::stderr),
        }
    }
}

/// Install the global subscriber
pub fn init(format: LogFormat, stream: LogStream) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    let (text, json) = match format {
        LogFormat::Text => (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(stream.writer()),
            ),
            None,
        ),
        LogFormat::Json => (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(stream.writer()),
            ),
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .init();
}

/// In-memory subscriber for asserting on emitted diagnostics
#[cfg(test)]
pub(crate) mod capture {
    use std::io;
    use std::sync::{Arc, Mutex};

    use tracing::Subscriber;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    pub(crate) struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        /// Debug-level subscriber writing plain text into this buffer
        pub(crate) fn subscriber(&self) -> impl Subscriber + Send + Sync + 'static {
            tracing_subscriber::fmt()
                .with_writer(self.clone())
                .with_ansi(false)
                .with_max_level(tracing::Level::DEBUG)
                .finish()
        }

        pub(crate) fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
        }

        /// Lines at `level` ("WARN", "DEBUG", ...) mentioning `needle`
        pub(crate) fn lines_with(&self, level: &str, needle: &str) -> Vec<String> {
            self.contents()
                .lines()
                .filter(|l| l.contains(level) && l.contains(needle))
                .map(String::from)
                .collect()
        }
    }

    pub(crate) struct CapturedWriter(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedWriter;

        fn make_writer(&'a self) -> Self::Writer {
            CapturedWriter(self.0.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::capture::CapturedLogs;

    #[test]
    fn test_captured_logs_record_fields() {
        let logs = CapturedLogs::default();
        tracing::subscriber::with_default(logs.subscriber(), || {
            tracing::warn!(show = %"Foo", "Something odd");
        });
        let lines = logs.lines_with("WARN", "Something odd");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("show=Foo"));
    }
}
