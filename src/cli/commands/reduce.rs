//! Reduce command implementation
//!
//! Pushes every number onto a [`ResultQueue`] from the main thread while a
//! [`ResultReducer`] sums them in the background.

use crate::cli::Output;
use crate::config::UtilpConfig;
use crate::logging::PrintLogger;
use crate::reducer::{ResultQueue, ResultReducer, WaitStrategy};
use anyhow::{Context, Result};
use console::style;
use std::io::{self, BufRead};
use std::time::Duration;

pub struct ReduceArgs {
    pub numbers: Vec<f64>,
    pub interval: Option<usize>,
    pub poll: bool,
    pub log: bool,
}

/// Execute the reduce command
pub fn execute(args: ReduceArgs, config: &UtilpConfig, output: &Output) -> Result<()> {
    let settings = config.settings()?;

    let mut reducer_config = settings.reducer.to_reducer_config();
    if let Some(interval) = args.interval {
        reducer_config.interval = interval;
    }
    if args.poll {
        reducer_config.wait = WaitStrategy::Polling {
            max_backoff: Duration::from_millis(settings.reducer.max_backoff_ms),
        };
    }
    reducer_config.verbose |= output.is_verbose();

    let numbers = if args.numbers.is_empty() {
        read_numbers(io::stdin().lock())?
    } else {
        args.numbers
    };
    if numbers.is_empty() {
        output.warning("No numbers to reduce");
        return Ok(());
    }

    let logger = PrintLogger::with_config(
        "reduce",
        output.is_verbose(),
        args.log,
        false,
        settings.logging.to_logger_config(),
    )?;

    let queue = ResultQueue::new();
    let handle = ResultReducer::new("reduce", &queue, |acc: Option<f64>, x: f64| {
        Ok(acc.map_or(x, |sum| sum + x))
    })
    .with_config(reducer_config)
    .on_progress(|processed| {
        eprintln!("{} {processed} partial results reduced.", style("ℹ").dim());
    })
    .start()?;

    for number in logger.progress(numbers, "numbers") {
        queue.push_partial(number)?;
    }
    queue.finish()?;

    let outcome = handle.join()?;
    let sum = outcome.result.unwrap_or_default();
    output.result(&sum.to_string());
    output.verbose(&format!("{} numbers reduced on '{}'", outcome.processed, outcome.name));

    if logger.is_logging() {
        logger.log(&format!("sum of {} numbers: {sum}", outcome.processed))?;
        output.info(&format!("Logged to {}", logger.log_file().display()));
    }
    Ok(())
}

/// One number per line, blank lines skipped
fn read_numbers<R: BufRead>(reader: R) -> Result<Vec<f64>> {
    let mut numbers = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read input")?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let number = trimmed
            .parse()
            .with_context(|| format!("line {}: '{trimmed}' is not a number", index + 1))?;
        numbers.push(number);
    }
    Ok(numbers)
}
