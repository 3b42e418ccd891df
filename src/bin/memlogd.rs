//! memlogd - standalone memory log daemon.
//!
//! Runs the memlog sampling pipeline against its own process: OS memory
//! statistics from `/proc`, runtime pool usage from jemalloc. Event
//! notifications are wired by an embedding runtime, so in standalone mode
//! the GC event count stays at zero.

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::sync::mpsc;

use clap::Parser;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

use memlog::{Agent, Config, ProcessSource};

/// Standalone memory log daemon.
#[derive(Parser)]
#[command(name = "memlogd", about = "Self-monitoring memory log daemon", version)]
struct Args {
    /// Path to the JSON configuration file.
    #[arg(short, long, default_value = "config.json")]
    config: String,

    /// Increase logging verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Initializes the tracing subscriber. With `stdoutMessages` off only
/// errors pass, mirroring the config's quiet default.
fn init_logging(verbose: u8, stdout_messages: bool) {
    let level = if !stdout_messages {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("memlog={}", level).parse().unwrap())
        .add_directive(format!("memlogd={}", level).parse().unwrap());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() {
    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("memlogd: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(args.verbose, config.stdout_messages);

    info!("memlogd {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Config: schedule='{}', output={}, timeout_divider={}",
        config.cron_expression, config.output_path, config.timeout_divider
    );

    let mut agent = match Agent::new(&config, ProcessSource::new()) {
        Ok(agent) => agent,
        Err(e) => {
            error!("initialization failed: {}", e);
            eprintln!("memlogd: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = agent.start() {
        error!("startup failed: {}", e);
        eprintln!("memlogd: {}", e);
        std::process::exit(1);
    }

    // Block until SIGINT/SIGTERM, then shut the agent down cleanly.
    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(());
    }) {
        error!("failed to set signal handler: {}", e);
        agent.stop();
        std::process::exit(1);
    }

    let _ = shutdown_rx.recv();
    info!("received shutdown signal");
    agent.stop();
    info!("shutdown complete");
}
