//! Agent checkpointing.
//!
//! ## Example
//!
//! ```rust,ignore
//! use trust_region_bbo::checkpoint::{Checkpointer, CheckpointerConfig, CheckpointStore};
//!
//! let config = CheckpointerConfig::new("./checkpoints").with_keep_last_n(5);
//! let checkpointer = Checkpointer::new(config)?;
//!
//! // Resume from the most recent checkpoint:
//! if let Some(tag) = checkpointer.latest()? {
//!     let state = checkpointer.load(tag)?;
//! }
//! ```

pub mod checkpointer;

pub use checkpointer::{
    checkpoint_stem,
    CheckpointInfo,
    CheckpointStore,
    Checkpointer,
    CheckpointerConfig,
    MemoryCheckpoints,
};
