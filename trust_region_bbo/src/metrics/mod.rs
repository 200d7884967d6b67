//! Results accumulation, persistence and logging.
//!
//! ## Results
//!
//! - [`RoundResults`]: per-flush accumulator of named series
//! - [`ResultsSnapshot`]: immutable view handed out on flush
//!
//! ## Recorders
//!
//! - [`JsonSeriesRecorder`]: one append-only JSON file per metric
//! - [`MemoryRecorder`]: in-memory storage for tests and embedding
//!
//! ## Loggers
//!
//! - [`ConsoleLogger`]: Pretty-printed console output
//! - [`CSVLogger`]: CSV file logging for analysis
//! - [`MultiLogger`]: Combine multiple loggers

pub mod logger;
pub mod recorder;
pub mod results;

pub use logger::{CSVLogger, ConsoleLogger, MetricsLogger, MultiLogger, RoundReport};
pub use recorder::{JsonSeriesRecorder, MemoryRecorder, MetricsRecorder};
pub use results::{keys, ResultsSnapshot, RoundResults, Series};
