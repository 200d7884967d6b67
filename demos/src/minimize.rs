//! Minimize one benchmark from scratch.
//!
//! Flushed series land in `<out>/series`, checkpoints with surrogate weights
//! in `<out>/checkpoints`, and one CSV row per round in `<out>/rounds.csv`.

use std::error::Error;

use bbo_objectives::Benchmark;
use trust_region_bbo::{
    Checkpointer, CheckpointerConfig, JsonSeriesRecorder, Objective, RoundOutcome,
    TrustRegionMinimizer,
};

use crate::common::{device, RunOptions, B};

pub fn run(opts: &RunOptions) -> Result<(), Box<dyn Error>> {
    let objective = opts.benchmark()?;
    println!(
        "Minimizing {} in {} dimensions with the {} surrogate (f_opt = {:.2})",
        opts.function,
        opts.dim,
        opts.method,
        objective.f_opt()
    );

    let mut minimizer = TrustRegionMinimizer::<B, _>::new(opts.agent_config(), objective, &device())?
        .with_recorder(JsonSeriesRecorder::new(opts.series_dir())?)
        .with_checkpoints(Checkpointer::new(CheckpointerConfig::new(opts.checkpoint_dir()))?);

    let mut logger = opts.loggers()?;
    let outcome = minimizer.run(&mut logger)?;
    summarize(&minimizer, &outcome);
    Ok(())
}

pub fn summarize(minimizer: &TrustRegionMinimizer<B, Benchmark>, outcome: &RoundOutcome) {
    let objective = minimizer.objective();
    println!();
    match outcome {
        RoundOutcome::Done(_) => println!("Solved after {} evaluations", minimizer.frame()),
        RoundOutcome::Failed(reason) => println!("Stopped: {:?}", reason),
        _ => {}
    }
    println!("  restarts:      {}", minimizer.divergence());
    println!("  best policy:   {:.6e}", minimizer.best_pi_evaluate());
    if let Some(best) = objective.best_observed() {
        println!("  best observed: {:.6e}", best);
    }
    if let Some(excess) = objective.best_excess() {
        println!("  f - f_opt:     {:.3e}", excess);
    }
    if let Some(point) = objective.best_point() {
        let native = objective.denormalize(&point);
        let shown: Vec<String> = native.iter().take(5).map(|v| format!("{:.3}", v)).collect();
        println!("  best point:    [{}{}]", shown.join(", "), if native.len() > 5 { ", ..." } else { "" });
    }
}
