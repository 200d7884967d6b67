//! Shared demo plumbing: argument parsing, backend, and output wiring.

use std::error::Error;
use std::path::PathBuf;

use burn::backend::ndarray::NdArrayDevice;
use burn::backend::{Autodiff, NdArray};

use bbo_objectives::{Benchmark, BenchmarkConfig, BenchmarkFunction};
use trust_region_bbo::{AgentConfig, CSVLogger, ConsoleLogger, MultiLogger, SurrogateMethod};

// ============================================================================
// Backend Type
// ============================================================================

pub type B = Autodiff<NdArray<f32>>;

pub fn device() -> NdArrayDevice {
    NdArrayDevice::Cpu
}

// ============================================================================
// Run Options
// ============================================================================

/// Options shared by every demo.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub method: SurrogateMethod,
    pub function: BenchmarkFunction,
    pub dim: usize,
    pub seed: u64,
    pub budget: usize,
    /// Directory for the CSV log, flushed series, and checkpoints.
    pub out_dir: PathBuf,
}

impl RunOptions {
    /// Parse `<method> [function] [dim] [seed] [budget]` from positional args.
    pub fn from_args(args: &[String]) -> Result<Self, Box<dyn Error>> {
        let method: SurrogateMethod = args.first().ok_or("missing method")?.parse()?;
        let function: BenchmarkFunction = match args.get(1) {
            Some(name) => name.parse()?,
            None => BenchmarkFunction::Rosenbrock,
        };
        let dim: usize = args.get(2).map(|s| s.parse()).transpose()?.unwrap_or(10);
        let seed: u64 = args.get(3).map(|s| s.parse()).transpose()?.unwrap_or(0);
        let budget: usize = args.get(4).map(|s| s.parse()).transpose()?.unwrap_or(150_000);
        let out_dir = PathBuf::from("runs").join(format!("{}_{}_{}d_s{}", method, function, dim, seed));

        Ok(Self {
            method,
            function,
            dim,
            seed,
            budget,
            out_dir,
        })
    }

    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig::new()
            .with_method(self.method)
            .with_budget(self.budget)
            .with_seed(self.seed)
    }

    pub fn benchmark(&self) -> Result<Benchmark, Box<dyn Error>> {
        let config = BenchmarkConfig::new(self.function, self.dim).with_seed(self.seed);
        Ok(Benchmark::new(config)?)
    }

    pub fn series_dir(&self) -> PathBuf {
        self.out_dir.join("series")
    }

    pub fn checkpoint_dir(&self) -> PathBuf {
        self.out_dir.join("checkpoints")
    }

    /// Console output every round plus a CSV with one row per round.
    pub fn loggers(&self) -> Result<MultiLogger, Box<dyn Error>> {
        std::fs::create_dir_all(&self.out_dir)?;
        let csv = CSVLogger::new(self.out_dir.join("rounds.csv"))?;
        Ok(MultiLogger::new().add(ConsoleLogger::new(10)).add(csv))
    }
}
