//! Row throughput reporting during data load.

use std::time::Instant;

use tracing::{debug, info};

/// Rows between throughput reports.
pub const REPORT_INTERVAL: u64 = 20_000;

/// Counts rows copied for one table and reports the rate periodically.
///
/// Reports go to `info` in verbose mode and to `debug` otherwise.
#[derive(Debug)]
pub struct ProgressMeter {
    table: String,
    verbose: bool,
    rows: u64,
    started: Instant,
    window_started: Instant,
}

impl ProgressMeter {
    pub fn new(table: impl Into<String>, verbose: bool) -> Self {
        let now = Instant::now();
        Self {
            table: table.into(),
            verbose,
            rows: 0,
            started: now,
            window_started: now,
        }
    }

    /// Record one copied row.
    pub fn tick(&mut self) {
        self.rows += 1;
        if self.rows % REPORT_INTERVAL == 0 {
            let elapsed = self.window_started.elapsed().as_secs_f64();
            let rate = rate(REPORT_INTERVAL, elapsed);
            self.report(format_args!(
                "{}: {} rows copied ({} rows/sec)",
                self.table, self.rows, rate
            ));
            self.window_started = Instant::now();
        }
    }

    /// Rows recorded so far.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Report the final count and return it.
    pub fn finish(self) -> u64 {
        let elapsed = self.started.elapsed().as_secs_f64();
        self.report(format_args!(
            "{}: {} rows copied in {:.1}s ({} rows/sec)",
            self.table,
            self.rows,
            elapsed,
            rate(self.rows, elapsed)
        ));
        self.rows
    }

    fn report(&self, message: std::fmt::Arguments<'_>) {
        if self.verbose {
            info!("{}", message);
        } else {
            debug!("{}", message);
        }
    }
}

fn rate(rows: u64, secs: f64) -> u64 {
    if secs > 0.0 {
        (rows as f64 / secs) as u64
    } else {
        rows
    }
}
