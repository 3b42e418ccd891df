//! End-to-end agent lifecycle tests: real thread, mock source, tempdir
//! output.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use memlog::{
    Agent, AgentError, Config, MemoryUsage, MetricsSource, OsMemorySnapshot, SnapshotError,
};

/// Source returning fixed snapshots, optionally failing one scripted call.
struct ScriptedSource {
    os_calls: Arc<AtomicU64>,
    fail_on_call: Option<u64>,
}

impl ScriptedSource {
    fn new(fail_on_call: Option<u64>) -> (Self, Arc<AtomicU64>) {
        let os_calls = Arc::new(AtomicU64::new(0));
        (
            Self {
                os_calls: Arc::clone(&os_calls),
                fail_on_call,
            },
            os_calls,
        )
    }
}

impl MetricsSource for ScriptedSource {
    fn os_snapshot(&mut self) -> Result<OsMemorySnapshot, SnapshotError> {
        let call = self.os_calls.fetch_add(1, Ordering::SeqCst);
        if Some(call) == self.fail_on_call {
            return Err(SnapshotError::Unavailable("scripted failure".into()));
        }
        Ok(OsMemorySnapshot {
            memory_total: 8_589_934_592,
            memory_free: 1_073_741_824,
            memory_available: 4_294_967_296,
            swap_total: 0,
            swap_free: 0,
            process_rss: 52_428_800,
        })
    }

    fn runtime_snapshot(&mut self, heap: bool) -> Result<MemoryUsage, SnapshotError> {
        Ok(if heap {
            MemoryUsage {
                committed: 2048,
                init: 512,
                max: 4096,
                used: 1024,
            }
        } else {
            MemoryUsage {
                committed: 256,
                init: -1,
                max: -1,
                used: 128,
            }
        })
    }
}

fn config_for(path: &Path, cron: &str, divider: u32) -> Config {
    Config {
        cron_expression: cron.to_string(),
        output_path: path.display().to_string(),
        timeout_divider: divider,
        stdout_messages: false,
    }
}

fn read_records(path: &Path) -> Vec<serde_json::Value> {
    let content = std::fs::read_to_string(path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("output log is not valid JSON: {e}\n{content}"));
    value.as_array().unwrap().clone()
}

#[test]
fn counts_accumulate_across_samples() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memlog.json");
    let config = config_for(&path, "*/1 * * * * *", 2);
    let (source, _) = ScriptedSource::new(None);

    let mut agent = Agent::new(&config, source).unwrap();
    let counter = agent.counter();

    // two events land before the first sample
    counter.increment();
    counter.increment();
    agent.start().unwrap();

    thread::sleep(Duration::from_millis(1500));
    counter.increment();
    thread::sleep(Duration::from_millis(1300));
    agent.stop();

    let records = read_records(&path);
    assert!(records.len() >= 2, "expected at least 2 records");
    assert_eq!(records[0]["gcEventsCount"], 2);
    assert_eq!(records.last().unwrap()["gcEventsCount"], 3);

    // cumulative, never reset: counts are non-decreasing
    let counts: Vec<u64> = records
        .iter()
        .map(|r| r["gcEventsCount"].as_u64().unwrap())
        .collect();
    assert!(counts.windows(2).all(|pair| pair[0] <= pair[1]));

    // overall recomputed from the pools on every record
    for record in &records {
        assert_eq!(record["jvm"]["overall"], 2048 + 256);
        assert_eq!(record["jvm"]["nonHeap"]["init"], -1);
    }
}

#[test]
fn source_failure_skips_one_iteration_and_the_loop_continues() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memlog.json");
    let config = config_for(&path, "*/1 * * * * *", 2);
    let (source, os_calls) = ScriptedSource::new(Some(1));

    let mut agent = Agent::new(&config, source).unwrap();
    agent.start().unwrap();
    thread::sleep(Duration::from_millis(2600));
    agent.stop();

    let calls = os_calls.load(Ordering::SeqCst);
    assert!(calls >= 3, "expected at least 3 sampling attempts");

    // exactly the failed iteration is missing from the log
    let records = read_records(&path);
    assert_eq!(records.len() as u64, calls - 1);
}

#[test]
fn no_oversampling_from_divided_waits() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memlog.json");
    // divider 8 means ~8 wake-ups per second; samples must still track
    // the one-second schedule
    let config = config_for(&path, "*/1 * * * * *", 8);
    let (source, _) = ScriptedSource::new(None);

    let mut agent = Agent::new(&config, source).unwrap();
    agent.start().unwrap();
    thread::sleep(Duration::from_millis(2300));
    agent.stop();

    let records = read_records(&path);
    assert!(records.len() >= 2, "expected at least 2 records");
    assert!(
        records.len() <= 4,
        "expected one sample per due instant, got {}",
        records.len()
    );
}

#[test]
fn stop_interrupts_a_long_wait_and_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memlog.json");
    // hourly schedule: without a wakeable wait, stop would block for the
    // rest of the interval slice
    let config = config_for(&path, "0 0 * * * *", 2);
    let (source, _) = ScriptedSource::new(None);

    let mut agent = Agent::new(&config, source).unwrap();
    agent.start().unwrap();
    thread::sleep(Duration::from_millis(300));

    let begin = Instant::now();
    agent.stop();
    assert!(begin.elapsed() < Duration::from_secs(2));

    // second stop is a no-op
    agent.stop();

    // the immediate startup sample, plus possibly one more if the test
    // happened to straddle an hour boundary
    let records = read_records(&path);
    assert!(!records.is_empty() && records.len() <= 2);
}

#[test]
fn malformed_expression_fails_before_creating_the_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memlog.json");
    let config = config_for(&path, "definitely not cron", 2);
    let (source, _) = ScriptedSource::new(None);

    let err = Agent::new(&config, source).unwrap_err();
    assert!(matches!(err, AgentError::Schedule(_)));
    assert!(!path.exists());
}

#[test]
fn unwritable_output_path_fails_construction() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("memlog.json");
    let config = config_for(&path, "*/1 * * * * *", 2);
    let (source, _) = ScriptedSource::new(None);

    let err = Agent::new(&config, source).unwrap_err();
    assert!(matches!(err, AgentError::Log(_)));
}
