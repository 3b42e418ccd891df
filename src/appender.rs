//! Append-only JSON array log.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::model::Measurement;

/// Errors from opening or writing the output log.
#[derive(Debug)]
pub enum AppendError {
    /// The output path could not be created or written at startup.
    Open { path: PathBuf, source: io::Error },
    /// A record failed to serialize or write.
    Write(io::Error),
}

impl std::fmt::Display for AppendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppendError::Open { path, source } => {
                write!(f, "cannot open output log '{}': {}", path.display(), source)
            }
            AppendError::Write(e) => write!(f, "cannot append to output log: {}", e),
        }
    }
}

impl std::error::Error for AppendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppendError::Open { source, .. } => Some(source),
            AppendError::Write(e) => Some(e),
        }
    }
}

impl From<serde_json::Error> for AppendError {
    fn from(e: serde_json::Error) -> Self {
        AppendError::Write(io::Error::from(e))
    }
}

/// Buffered writer laying measurements out as one top-level JSON array.
///
/// Opened once at startup and holding the only handle to the output file
/// for the process lifetime. Single-writer discipline: no internal locking,
/// callers serialize access. Each successful [`append`](Self::append) is
/// fully written into the internal buffer before returning, though not
/// necessarily flushed to storage.
///
/// [`close`](Self::close) terminates the array and flushes, so a log from a
/// clean shutdown parses as JSON while a crash mid-run leaves an
/// unterminated array that readers detect as invalid.
#[derive(Debug)]
pub struct LogAppender {
    writer: BufWriter<File>,
    records: u64,
    finalized: bool,
}

impl LogAppender {
    /// Creates (or truncates) the output file and opens the array.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AppendError> {
        let path = path.as_ref();
        let open = |source| AppendError::Open {
            path: path.to_path_buf(),
            source,
        };
        let file = File::create(path).map_err(open)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(b"[").map_err(open)?;
        Ok(Self {
            writer,
            records: 0,
            finalized: false,
        })
    }

    /// Appends one measurement as the next array element.
    pub fn append(&mut self, measurement: &Measurement) -> Result<(), AppendError> {
        let separator: &[u8] = if self.records == 0 { b"\n" } else { b",\n" };
        self.writer.write_all(separator).map_err(AppendError::Write)?;
        serde_json::to_writer(&mut self.writer, measurement)?;
        self.records += 1;
        Ok(())
    }

    /// Number of records appended so far.
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Terminates the array and flushes the buffer.
    pub fn close(mut self) -> Result<(), AppendError> {
        self.finalize().map_err(AppendError::Write)
    }

    fn finalize(&mut self) -> io::Result<()> {
        if self.finalized {
            return Ok(());
        }
        self.finalized = true;
        self.writer.write_all(b"\n]\n")?;
        self.writer.flush()
    }
}

impl Drop for LogAppender {
    fn drop(&mut self) {
        // best effort; close() reports errors for the orderly path
        let _ = self.finalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MemoryUsage, OsMemorySnapshot, RuntimeMemorySnapshot};

    fn sample(gc_events: u64) -> Measurement {
        let heap = MemoryUsage {
            committed: 1024,
            init: 256,
            max: 4096,
            used: 700,
        };
        let non_heap = MemoryUsage {
            committed: 128,
            init: -1,
            max: -1,
            used: 96,
        };
        Measurement {
            current_time_millis: 1700000000000 + gc_events,
            gc_events_count: gc_events,
            os: OsMemorySnapshot::default(),
            jvm: RuntimeMemorySnapshot::new(heap, non_heap),
        }
    }

    #[test]
    fn empty_log_is_a_valid_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memlog.json");

        let appender = LogAppender::open(&path).unwrap();
        appender.close().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 0);
    }

    #[test]
    fn appended_records_parse_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memlog.json");

        let mut appender = LogAppender::open(&path).unwrap();
        appender.append(&sample(0)).unwrap();
        appender.append(&sample(2)).unwrap();
        assert_eq!(appender.records(), 2);
        appender.close().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        let records = value.as_array().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["gcEventsCount"], 0);
        assert_eq!(records[1]["gcEventsCount"], 2);
        assert_eq!(records[1]["jvm"]["overall"], 1152);
        assert_eq!(records[1]["jvm"]["nonHeap"]["init"], -1);
    }

    #[test]
    fn drop_without_close_still_terminates_the_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memlog.json");

        {
            let mut appender = LogAppender::open(&path).unwrap();
            appender.append(&sample(1)).unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(serde_json::from_str::<serde_json::Value>(&content).is_ok());
    }

    #[test]
    fn unwritable_path_fails_at_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-such-dir").join("memlog.json");

        let err = LogAppender::open(&path).unwrap_err();
        assert!(matches!(err, AppendError::Open { .. }));
    }
}
