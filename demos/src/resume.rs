//! Continue a previous `minimize` run from its latest checkpoint.

use std::error::Error;

use trust_region_bbo::{
    CheckpointStore, Checkpointer, CheckpointerConfig, JsonSeriesRecorder, TrustRegionMinimizer,
};

use crate::common::{device, RunOptions, B};
use crate::minimize::summarize;

pub fn run(opts: &RunOptions) -> Result<(), Box<dyn Error>> {
    let checkpoints = Checkpointer::new(CheckpointerConfig::new(opts.checkpoint_dir()))?;
    let Some(tag) = checkpoints.latest()? else {
        return Err(format!("no checkpoint under {}", opts.checkpoint_dir().display()).into());
    };

    let mut minimizer = TrustRegionMinimizer::<B, _>::new(opts.agent_config(), opts.benchmark()?, &device())?
        .with_recorder(JsonSeriesRecorder::new(opts.series_dir())?)
        .with_checkpoints(checkpoints);
    minimizer.resume_from(tag)?;
    println!("Resumed {} at frame {}", opts.function, minimizer.frame());

    let mut logger = opts.loggers()?;
    let outcome = minimizer.run(&mut logger)?;
    summarize(&minimizer, &outcome);
    Ok(())
}
