//! Human-readable sample lines for diagnostics.

use super::{Discard, Sender, TimeStamp};
use crate::error::Result;
use crate::reading::Reading;
use crate::tags::{TAG_HOST, Tags};
use std::fmt::Write as _;
use std::io::Write;

/// Diagnostic tee.
///
/// Formats every sample as one human-readable line, then forwards it to the
/// wrapped sender if there is one. Lines go to the configured writer, or to
/// an `info` event on the `snmp_poller::sender::debug` target.
pub struct DebugSender<S = Discard> {
    inner: Option<S>,
    writer: Option<Box<dyn Write + Send>>,
}

impl DebugSender<Discard> {
    /// A debug sender that ends the pipeline.
    pub fn terminal() -> Self {
        Self {
            inner: None,
            writer: None,
        }
    }
}

impl<S: Sender> DebugSender<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner: Some(inner),
            writer: None,
        }
    }

    /// Write lines to `writer` instead of the tracing subscriber.
    pub fn with_writer(mut self, writer: Box<dyn Write + Send>) -> Self {
        self.writer = Some(writer);
        self
    }
}

/// Render the diagnostic line for one sample.
pub(crate) fn format_line(name: &str, tags: &Tags, value: &Reading, ts: &TimeStamp) -> String {
    let host = tags.get(TAG_HOST).map(String::as_str).unwrap_or("");
    let mut line = format!(
        "Host:{} Name:{} Value:{} ({}) Elapsed:{:?} Tags:",
        host,
        name,
        value,
        value.kind(),
        ts.elapsed()
    );
    let mut first = true;
    for (k, v) in tags.iter().filter(|(k, _)| k.as_str() != TAG_HOST) {
        if !first {
            line.push(',');
        }
        first = false;
        let _ = write!(line, "{}={}", k, v);
    }
    line
}

impl<S: Sender> Sender for DebugSender<S> {
    fn send(&mut self, name: &str, tags: Tags, value: Reading, ts: TimeStamp) -> Result<()> {
        let line = format_line(name, &tags, &value, &ts);
        match self.writer.as_mut() {
            Some(w) => writeln!(w, "{}", line)?,
            None => tracing::info!(target: "snmp_poller::sender::debug", "{}", line),
        }
        match self.inner.as_mut() {
            Some(inner) => inner.send(name, tags, value, ts),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sender::Collect;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::time::Instant;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn sample_tags() -> Tags {
        Tags::from([
            ("host".to_string(), "r1".to_string()),
            ("column".to_string(), "eth0".to_string()),
            ("alias".to_string(), "uplink".to_string()),
        ])
    }

    #[test]
    fn line_format_excludes_host_from_tags() {
        let start = Instant::now();
        let ts = TimeStamp::new(start, start + Duration::from_millis(3));
        let line = format_line("ifHCInOctets", &sample_tags(), &Reading::Counter64(42), &ts);
        assert_eq!(
            line,
            "Host:r1 Name:ifHCInOctets Value:42 (counter64) Elapsed:3ms Tags:alias=uplink,column=eth0"
        );
    }

    #[test]
    fn tees_to_writer_and_inner() {
        let buf = Buffer::default();
        let sink = Collect::new();
        let mut s = DebugSender::new(sink.clone()).with_writer(Box::new(buf.clone()));
        s.send("sysName", sample_tags(), Reading::from("core"), TimeStamp::now())
            .unwrap();
        assert_eq!(sink.len(), 1);
        let written = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert!(written.starts_with("Host:r1 Name:sysName Value:core (text)"));
        assert!(written.ends_with('\n'));
    }

    #[test]
    fn terminal_succeeds_without_inner() {
        let mut s = DebugSender::terminal();
        assert!(s.send("x", Tags::new(), Reading::Integer(1), TimeStamp::now()).is_ok());
    }
}
