//! Walks through every `GuardedValue` operation, then hammers one counter
//! from many threads.
//!
//! # Usage
//!
//! ```bash
//! guarded-counter [THREADS] [INCREMENTS]
//! RUST_LOG=guarded_value=trace guarded-counter
//! ```

use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use guarded_value::GuardedValue;

const DEFAULT_THREADS: usize = 100;
const DEFAULT_INCREMENTS: usize = 1000;

#[derive(Debug)]
struct Args {
    threads: usize,
    increments: usize,
    /// `threads * increments`, checked for overflow at parse time.
    expected: usize,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {

    let mut next_count = |name: &str, default: usize| match args.next() {
        None => Ok(default),
        Some(raw) => match raw.parse::<usize>() {
            Ok(0) => Err(format!("{name} must be at least 1")),
            Ok(n) => Ok(n),
            Err(e) => Err(format!("invalid {name} `{raw}`: {e}")),
        },
    };

    let threads = next_count("THREADS", DEFAULT_THREADS)?;
    let increments = next_count("INCREMENTS", DEFAULT_INCREMENTS)?;
    let expected = threads
        .checked_mul(increments)
        .ok_or_else(|| format!("THREADS * INCREMENTS overflows ({threads} * {increments})"))?;

    Ok(Args {
        threads,
        increments,
        expected,
    })
}

fn walkthrough() {
    let value = GuardedValue::new(10);
    println!("Initial value: {}", value.get());

    value.set(20);
    println!("Updated value: {}", value.get());

    value.update(|v| v * 2);
    println!("Doubled value: {}", value.get());

    value.with_lock(|v| *v += 10);
    println!("Incremented value: {}", value.get());

    value.with_read_lock(|v| println!("Read value: {v}"));
}

fn hammer(args: &Args) -> usize {
    let counter = Arc::new(GuardedValue::new(0usize));
    let started = Instant::now();

    let handles: Vec<_> = (0..args.threads)
        .map(|_| {
            let counter = Arc::clone(&counter);
            let increments = args.increments;
            thread::spawn(move || {
                for _ in 0..increments {
                    counter.with_lock(|n| *n += 1);
                }
            })
        })
        .collect();

    for handle in handles {
        if handle.join().is_err() {
            tracing::error!("worker thread panicked");
        }
    }

    let total = counter.get();
    tracing::info!(
        threads = args.threads,
        increments = args.increments,
        total,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "counter run finished"
    );
    total
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!("usage: guarded-counter [THREADS] [INCREMENTS]");
            return ExitCode::FAILURE;
        }
    };

    walkthrough();

    let expected = args.expected;
    let total = hammer(&args);
    println!("Counter: {total} (expected {expected})");

    if total == expected {
        ExitCode::SUCCESS
    } else {
        tracing::error!(total, expected, "lost updates");
        ExitCode::FAILURE
    }
}
