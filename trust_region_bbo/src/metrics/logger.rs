//! Round loggers.
//!
//! Provides different logging backends for per-round progress.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use super::results::ResultsSnapshot;

/// Summary of one explore-fit-step round.
#[derive(Debug, Clone)]
pub struct RoundReport {
    /// Rounds completed since the run started.
    pub round: usize,
    /// Objective evaluations spent so far.
    pub frame: usize,
    /// Uncounted objective value of the policy after this round's step.
    pub reward_pi: f32,
    /// Best policy evaluation so far.
    pub best_pi_evaluate: f32,
    /// Best objective value observed by the objective itself.
    pub best_observed: Option<f32>,
    pub value_loss: Option<f32>,
    pub derivative_loss: Option<f32>,
    /// L2 norm of the (unclipped) surrogate gradient at the policy.
    pub grad_norm: f32,
    pub epsilon: f32,
    pub pi_lr: f32,
    pub min_trust_sigma: f32,
    pub no_change: usize,
    pub divergence: usize,
    /// Results persisted at the end of this round, if it was a flush round.
    pub flushed: Option<ResultsSnapshot>,
}

impl RoundReport {
    pub fn new(round: usize, frame: usize, reward_pi: f32, best_pi_evaluate: f32) -> Self {
        Self {
            round,
            frame,
            reward_pi,
            best_pi_evaluate,
            best_observed: None,
            value_loss: None,
            derivative_loss: None,
            grad_norm: 0.0,
            epsilon: 0.0,
            pi_lr: 0.0,
            min_trust_sigma: 0.0,
            no_change: 0,
            divergence: 0,
            flushed: None,
        }
    }

    pub fn is_flush(&self) -> bool {
        self.flushed.is_some()
    }
}

/// Logger trait for different logging backends.
pub trait MetricsLogger: Send {
    /// Log a round.
    fn log(&mut self, report: &RoundReport);

    /// Flush any buffered output.
    fn flush(&mut self);
}

/// Console logger with a fixed-width table.
pub struct ConsoleLogger {
    log_interval: usize,
    last_log_round: Option<usize>,
    start_time: Instant,
    show_header: bool,
}

impl ConsoleLogger {
    /// # Arguments
    ///
    /// * `log_interval` - Rounds between log lines
    pub fn new(log_interval: usize) -> Self {
        Self {
            log_interval: log_interval.max(1),
            last_log_round: None,
            start_time: Instant::now(),
            show_header: true,
        }
    }

    pub fn reset_timer(&mut self) {
        self.start_time = Instant::now();
    }

    fn should_log(&self, round: usize) -> bool {
        match self.last_log_round {
            None => true,
            Some(last) => round >= last + self.log_interval,
        }
    }

    fn print_header(&self) {
        println!(
            "{:>7} {:>9} {:>12} {:>12} {:>10} {:>10} {:>9} {:>5} {:>5} {:>8}",
            "Round", "Frame", "Pi", "BestPi", "Loss", "GradNorm", "Sigma", "Stall", "Div", "FPS"
        );
        println!("{}", "-".repeat(96));
    }
}

impl MetricsLogger for ConsoleLogger {
    fn log(&mut self, report: &RoundReport) {
        if !self.should_log(report.round) {
            return;
        }

        if self.show_header {
            self.print_header();
            self.show_header = false;
        }

        let elapsed = self.start_time.elapsed().as_secs_f32();
        let fps = if elapsed > 0.0 {
            report.frame as f32 / elapsed
        } else {
            0.0
        };
        let loss = report.derivative_loss.or(report.value_loss).unwrap_or(f32::NAN);

        println!(
            "{:>7} {:>9} {:>12.4e} {:>12.4e} {:>10.4} {:>10.4} {:>9.2e} {:>5} {:>5} {:>8.0}",
            report.round,
            report.frame,
            report.reward_pi,
            report.best_pi_evaluate,
            loss,
            report.grad_norm,
            report.min_trust_sigma,
            report.no_change,
            report.divergence,
            fps
        );

        self.last_log_round = Some(report.round);
    }

    fn flush(&mut self) {
        let _ = std::io::stdout().flush();
    }
}

/// CSV file logger for analysis.
pub struct CSVLogger {
    writer: BufWriter<File>,
    start_time: Instant,
}

impl CSVLogger {
    /// Create the file and write the header.
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        writeln!(
            writer,
            "round,frame,reward_pi,best_pi_evaluate,best_observed,value_loss,derivative_loss,grad_norm,epsilon,pi_lr,min_trust_sigma,no_change,divergence,elapsed_secs"
        )?;

        Ok(Self {
            writer,
            start_time: Instant::now(),
        })
    }

    pub fn reset_timer(&mut self) {
        self.start_time = Instant::now();
    }
}

fn optional(value: Option<f32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl MetricsLogger for CSVLogger {
    fn log(&mut self, report: &RoundReport) {
        let elapsed = self.start_time.elapsed().as_secs_f32();

        let _ = writeln!(
            self.writer,
            "{},{},{},{},{},{},{},{:.6},{:.6},{:.6},{:.6e},{},{},{:.2}",
            report.round,
            report.frame,
            report.reward_pi,
            report.best_pi_evaluate,
            optional(report.best_observed),
            optional(report.value_loss),
            optional(report.derivative_loss),
            report.grad_norm,
            report.epsilon,
            report.pi_lr,
            report.min_trust_sigma,
            report.no_change,
            report.divergence,
            elapsed
        );
    }

    fn flush(&mut self) {
        let _ = self.writer.flush();
    }
}

impl Drop for CSVLogger {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Multi-logger that writes to multiple backends.
pub struct MultiLogger {
    loggers: Vec<Box<dyn MetricsLogger>>,
}

impl MultiLogger {
    pub fn new() -> Self {
        Self {
            loggers: Vec::new(),
        }
    }

    pub fn add<L: MetricsLogger + 'static>(mut self, logger: L) -> Self {
        self.loggers.push(Box::new(logger));
        self
    }
}

impl Default for MultiLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsLogger for MultiLogger {
    fn log(&mut self, report: &RoundReport) {
        for logger in &mut self.loggers {
            logger.log(report);
        }
    }

    fn flush(&mut self) {
        for logger in &mut self.loggers {
            logger.flush();
        }
    }
}
