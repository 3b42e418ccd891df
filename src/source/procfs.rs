//! OS memory statistics from the Linux `/proc` filesystem.
//!
//! Reads `/proc/meminfo` for system totals and `/proc/self/status` for the
//! process resident set size. Values in both files are kB and are converted
//! to bytes here.

use std::io;
use std::path::{Path, PathBuf};

use crate::model::OsMemorySnapshot;
use crate::source::SnapshotError;

/// Read access to the proc filesystem.
///
/// Lets tests substitute fixture content for the real `/proc`, which also
/// keeps the parsing testable on non-Linux hosts.
pub trait ProcFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
}

/// Real filesystem reader delegating to `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealProc;

impl ProcFs for RealProc {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// Collects [`OsMemorySnapshot`]s from a proc filesystem root.
#[derive(Debug)]
pub struct ProcReader<F: ProcFs> {
    fs: F,
    proc_path: PathBuf,
}

impl Default for ProcReader<RealProc> {
    fn default() -> Self {
        Self::new(RealProc, "/proc")
    }
}

impl<F: ProcFs> ProcReader<F> {
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or fixture)
    /// * `proc_path` - Base path of the proc filesystem (usually "/proc")
    pub fn new(fs: F, proc_path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
        }
    }

    pub fn os_snapshot(&self) -> Result<OsMemorySnapshot, SnapshotError> {
        let meminfo = self.fs.read_to_string(&self.proc_path.join("meminfo"))?;
        let status = self.fs.read_to_string(&self.proc_path.join("self/status"))?;

        let mut snapshot = parse_meminfo(&meminfo)?;
        snapshot.process_rss = parse_status_rss(&status)?;
        Ok(snapshot)
    }
}

/// Parses `/proc/meminfo` content. Fields the snapshot does not carry are
/// skipped.
fn parse_meminfo(content: &str) -> Result<OsMemorySnapshot, SnapshotError> {
    let mut snapshot = OsMemorySnapshot::default();
    let mut seen_total = false;

    for line in content.lines() {
        if line.starts_with("MemTotal:") {
            snapshot.memory_total = parse_kb_as_bytes(line);
            seen_total = true;
        } else if line.starts_with("MemFree:") {
            snapshot.memory_free = parse_kb_as_bytes(line);
        } else if line.starts_with("MemAvailable:") {
            snapshot.memory_available = parse_kb_as_bytes(line);
        } else if line.starts_with("SwapTotal:") {
            snapshot.swap_total = parse_kb_as_bytes(line);
        } else if line.starts_with("SwapFree:") {
            snapshot.swap_free = parse_kb_as_bytes(line);
        }
    }

    if !seen_total {
        return Err(SnapshotError::Parse("meminfo has no MemTotal line".into()));
    }
    Ok(snapshot)
}

/// Extracts VmRSS from `/proc/self/status` content.
fn parse_status_rss(content: &str) -> Result<i64, SnapshotError> {
    content
        .lines()
        .find(|line| line.starts_with("VmRSS:"))
        .map(parse_kb_as_bytes)
        .ok_or_else(|| SnapshotError::Parse("status has no VmRSS line".into()))
}

/// Parses the kB value of a `Key:   12345 kB` line into bytes.
fn parse_kb_as_bytes(line: &str) -> i64 {
    line.split_whitespace()
        .nth(1)
        .and_then(|s| s.parse::<i64>().ok())
        .map(|kb| kb * 1024)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// In-memory proc filesystem for fixture-driven tests.
    #[derive(Default)]
    struct FixtureProc {
        files: HashMap<PathBuf, String>,
    }

    impl FixtureProc {
        fn with_file(mut self, path: &str, content: &str) -> Self {
            self.files.insert(PathBuf::from(path), content.to_string());
            self
        }
    }

    impl ProcFs for FixtureProc {
        fn read_to_string(&self, path: &Path) -> io::Result<String> {
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
        }
    }

    const MEMINFO: &str = "\
MemTotal:       16384000 kB
MemFree:         2048000 kB
MemAvailable:   12000000 kB
Buffers:          512000 kB
Cached:          4096000 kB
SwapTotal:       8192000 kB
SwapFree:        8000000 kB
";

    const STATUS: &str = "\
Name:   memlogd
Umask:  0022
State:  S (sleeping)
VmPeak:   131072 kB
VmSize:   120000 kB
VmRSS:     65536 kB
Threads:        2
";

    #[test]
    fn parses_meminfo_and_rss_into_bytes() {
        let fs = FixtureProc::default()
            .with_file("/proc/meminfo", MEMINFO)
            .with_file("/proc/self/status", STATUS);
        let reader = ProcReader::new(fs, "/proc");

        let snapshot = reader.os_snapshot().unwrap();
        assert_eq!(snapshot.memory_total, 16384000 * 1024);
        assert_eq!(snapshot.memory_free, 2048000 * 1024);
        assert_eq!(snapshot.memory_available, 12000000 * 1024);
        assert_eq!(snapshot.swap_total, 8192000 * 1024);
        assert_eq!(snapshot.swap_free, 8000000 * 1024);
        assert_eq!(snapshot.process_rss, 65536 * 1024);
    }

    #[test]
    fn missing_meminfo_is_an_io_error() {
        let fs = FixtureProc::default().with_file("/proc/self/status", STATUS);
        let reader = ProcReader::new(fs, "/proc");

        assert!(matches!(
            reader.os_snapshot().unwrap_err(),
            SnapshotError::Io(_)
        ));
    }

    #[test]
    fn meminfo_without_memtotal_is_a_parse_error() {
        let fs = FixtureProc::default()
            .with_file("/proc/meminfo", "Slab: 100 kB\n")
            .with_file("/proc/self/status", STATUS);
        let reader = ProcReader::new(fs, "/proc");

        assert!(matches!(
            reader.os_snapshot().unwrap_err(),
            SnapshotError::Parse(_)
        ));
    }

    #[test]
    fn status_without_vmrss_is_a_parse_error() {
        let fs = FixtureProc::default()
            .with_file("/proc/meminfo", MEMINFO)
            .with_file("/proc/self/status", "Name: memlogd\n");
        let reader = ProcReader::new(fs, "/proc");

        assert!(matches!(
            reader.os_snapshot().unwrap_err(),
            SnapshotError::Parse(_)
        ));
    }
}
