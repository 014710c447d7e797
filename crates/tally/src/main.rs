//! tally demo
//!
//! Builds a registry (from `tally.yaml` when present), records from a few
//! worker threads, and prints the plain JSON rendering.
//!
//! Usage: `tally-demo [config.yaml]`

use std::path::Path;
use std::sync::Arc;
use std::thread;

use tracing_subscriber::{fmt, EnvFilter};

use tally::core::config::{self, TelemetryConfig};
use tally::core::Registry;

fn fibonacci(i: u32) -> u64 {
    if i < 2 {
        1
    } else {
        fibonacci(i - 1) + fibonacci(i - 2)
    }
}

fn main() -> tally::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "tally.yaml".into());
    let cfg = if Path::new(&path).exists() {
        config::load_from_file(&path)?
    } else {
        tracing::info!(%path, "no config file, using defaults");
        TelemetryConfig::default()
    };

    let registry = Arc::new(Registry::from_config(&cfg));
    if !registry.is_active() {
        tracing::info!("telemetry inactive, nothing to record");
        println!("{}", registry.serialize_plain_json()?);
        return Ok(());
    }

    let calls = registry.new_count("FIBONACCI_CALLS")?;
    let large = registry.new_flag("FIBONACCI_LARGE_RESULT")?;

    let workers: Vec<_> = (20..28)
        .map(|n| {
            let calls = calls.clone();
            let large = large.clone();
            thread::spawn(move || {
                let v = fibonacci(n);
                calls.record(1);
                large.record_cb(|| (v > 100_000).then_some(()));
            })
        })
        .collect();
    for w in workers {
        if w.join().is_err() {
            tracing::warn!("worker thread panicked");
        }
    }

    tracing::info!(metrics = registry.len(), "recording done");
    println!("{}", registry.serialize_plain_json()?);
    Ok(())
}
