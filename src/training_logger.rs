//! Training Logger
//!
//! Records one line of metrics per epoch, both to a CSV file and to the
//! `tracing` log, so a run can be plotted or compared later.
//!
//! ## Example
//!
//! ```rust,no_run
//! use bagwise::{EpochStats, TrainingLogger};
//!
//! let mut logger = TrainingLogger::new("training_log.csv")
//!     .expect("Failed to create logger");
//!
//! logger.log(&EpochStats { epoch: 1, loss: 0.69, accuracy: 0.5, learning_rate: 5.0 })
//!     .expect("Failed to log");
//! ```
//!
//! ## CSV Format
//!
//! - `epoch`: 1-based epoch number
//! - `elapsed_seconds`: Time since the logger was created
//! - `learning_rate`: Learning rate used during the epoch
//! - `loss`: Mean cross-entropy over the epoch
//! - `accuracy`: Fraction of samples classified correctly

use crate::error::Result;
use crate::train::EpochStats;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Instant;

const HEADER: &str = "epoch,elapsed_seconds,learning_rate,loss,accuracy";

/// Per-epoch metrics logger
pub struct TrainingLogger {
    log_file: File,
    start_time: Instant,
    last_log_time: Instant,
}

impl TrainingLogger {
    /// Create (or truncate) a CSV log file and write its header
    pub fn new<P: AsRef<Path>>(log_path: P) -> Result<Self> {
        let mut log_file = File::create(log_path)?;
        writeln!(log_file, "{}", HEADER)?;

        let now = Instant::now();
        Ok(Self {
            log_file,
            start_time: now,
            last_log_time: now,
        })
    }

    /// Append one epoch's metrics
    pub fn log(&mut self, stats: &EpochStats) -> Result<()> {
        let elapsed = self.start_time.elapsed().as_secs_f32();

        writeln!(
            self.log_file,
            "{},{:.3},{:.6},{:.6},{:.4}",
            stats.epoch, elapsed, stats.learning_rate, stats.loss, stats.accuracy
        )?;

        // Flush so a crashed run still leaves its metrics behind
        self.log_file.flush()?;

        let epoch_time = self.last_log_time.elapsed().as_secs_f32();
        tracing::info!(
            epoch = stats.epoch,
            elapsed_secs = elapsed,
            epoch_secs = epoch_time,
            learning_rate = stats.learning_rate,
            loss = stats.loss,
            accuracy = stats.accuracy,
            "logged epoch"
        );

        self.last_log_time = Instant::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");

        let mut logger = TrainingLogger::new(&path).unwrap();
        logger
            .log(&EpochStats {
                epoch: 1,
                loss: 0.5,
                accuracy: 0.75,
                learning_rate: 5.0,
            })
            .unwrap();
        logger
            .log(&EpochStats {
                epoch: 2,
                loss: 0.25,
                accuracy: 1.0,
                learning_rate: 0.5,
            })
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADER);

        let fields: Vec<&str> = lines[2].split(',').collect();
        assert_eq!(fields[0], "2");
        assert_eq!(fields[2], "0.500000");
        assert_eq!(fields[3], "0.250000");
        assert_eq!(fields[4], "1.0000");
    }
}
