//! Agent checkpointing.
//!
//! A checkpoint is an [`AgentState`] serialized to JSON, tagged by the frame
//! counter at which it was taken. Surrogate weights are written next to it by
//! burn's `BinFileRecorder` under the same file stem.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::agent::AgentState;
use crate::error::{BboError, Result};

/// File stem shared by the state and weight files of checkpoint `tag`.
pub fn checkpoint_stem(tag: usize) -> String {
    format!("checkpoint_{:08}", tag)
}

fn parse_stem(name: &str) -> Option<usize> {
    name.strip_prefix("checkpoint_")?
        .strip_suffix(".json")?
        .parse()
        .ok()
}

/// Storage for agent checkpoints.
pub trait CheckpointStore {
    /// Store `state` under `tag`, replacing any previous checkpoint with that tag.
    fn save(&mut self, tag: usize, state: &AgentState) -> Result<()>;

    /// Load the checkpoint stored under `tag`.
    fn load(&self, tag: usize) -> Result<AgentState>;

    /// Highest stored tag.
    fn latest(&self) -> Result<Option<usize>>;

    /// Directory where surrogate weights belong, if the store is on disk.
    fn weights_dir(&self) -> Option<&Path> {
        None
    }
}

impl<S: CheckpointStore + ?Sized> CheckpointStore for Box<S> {
    fn save(&mut self, tag: usize, state: &AgentState) -> Result<()> {
        (**self).save(tag, state)
    }

    fn load(&self, tag: usize) -> Result<AgentState> {
        (**self).load(tag)
    }

    fn latest(&self) -> Result<Option<usize>> {
        (**self).latest()
    }

    fn weights_dir(&self) -> Option<&Path> {
        (**self).weights_dir()
    }
}

/// Configuration for the checkpointer.
#[derive(Debug, Clone)]
pub struct CheckpointerConfig {
    /// Directory to store checkpoints.
    pub checkpoint_dir: PathBuf,
    /// Number of recent checkpoints to keep (0 = keep all).
    pub keep_last_n: usize,
}

impl Default for CheckpointerConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir: PathBuf::from("./checkpoints"),
            keep_last_n: 5,
        }
    }
}

impl CheckpointerConfig {
    pub fn new(checkpoint_dir: impl Into<PathBuf>) -> Self {
        Self {
            checkpoint_dir: checkpoint_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_keep_last_n(mut self, n: usize) -> Self {
        self.keep_last_n = n;
        self
    }
}

/// Checkpoint metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointInfo {
    /// Path to the state file.
    pub path: PathBuf,
    pub tag: usize,
}

/// On-disk checkpoint store.
pub struct Checkpointer {
    config: CheckpointerConfig,
    history: Vec<usize>,
}

impl Checkpointer {
    /// Creates the checkpoint directory if it doesn't exist.
    pub fn new(config: CheckpointerConfig) -> Result<Self> {
        fs::create_dir_all(&config.checkpoint_dir)?;
        Ok(Self {
            config,
            history: Vec::new(),
        })
    }

    pub fn config(&self) -> &CheckpointerConfig {
        &self.config
    }

    fn state_path(&self, tag: usize) -> PathBuf {
        self.config
            .checkpoint_dir
            .join(format!("{}.json", checkpoint_stem(tag)))
    }

    /// Every checkpoint in the directory, sorted by tag.
    pub fn list_checkpoints(&self) -> Result<Vec<CheckpointInfo>> {
        let mut checkpoints: Vec<CheckpointInfo> = fs::read_dir(&self.config.checkpoint_dir)?
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let path = e.path();
                let tag = parse_stem(path.file_name()?.to_str()?)?;
                Some(CheckpointInfo { path, tag })
            })
            .collect();

        checkpoints.sort_by_key(|c| c.tag);
        Ok(checkpoints)
    }

    pub fn find_latest_checkpoint(&self) -> Result<Option<CheckpointInfo>> {
        Ok(self.list_checkpoints()?.pop())
    }

    /// Remove a checkpoint's state file and any weight files sharing its stem.
    fn remove(&self, tag: usize) {
        let stem = checkpoint_stem(tag);
        let _ = fs::remove_file(self.state_path(tag));
        if let Ok(entries) = fs::read_dir(&self.config.checkpoint_dir) {
            for entry in entries.filter_map(|e| e.ok()) {
                let path = entry.path();
                let is_weights = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with(&stem) && n.ends_with(".bin"))
                    .unwrap_or(false);
                if is_weights {
                    let _ = fs::remove_file(&path);
                }
            }
        }
    }

    /// Keep only the last N checkpoints written by this checkpointer.
    fn cleanup_old_checkpoints(&mut self) {
        if self.config.keep_last_n == 0 {
            return;
        }
        while self.history.len() > self.config.keep_last_n {
            let old = self.history.remove(0);
            self.remove(old);
        }
    }
}

impl CheckpointStore for Checkpointer {
    fn save(&mut self, tag: usize, state: &AgentState) -> Result<()> {
        let path = self.state_path(tag);
        fs::write(&path, state.to_json()?)?;
        log::debug!("Saved checkpoint {}", path.display());

        self.history.retain(|&t| t != tag);
        self.history.push(tag);
        self.cleanup_old_checkpoints();
        Ok(())
    }

    fn load(&self, tag: usize) -> Result<AgentState> {
        let path = self.state_path(tag);
        if !path.exists() {
            return Err(BboError::MissingCheckpoint(tag));
        }
        Ok(AgentState::from_json(&fs::read(&path)?)?)
    }

    fn latest(&self) -> Result<Option<usize>> {
        Ok(self.find_latest_checkpoint()?.map(|c| c.tag))
    }

    fn weights_dir(&self) -> Option<&Path> {
        Some(&self.config.checkpoint_dir)
    }
}

/// In-memory checkpoint store holding the most recent tags.
#[derive(Debug, Clone)]
pub struct MemoryCheckpoints {
    states: BTreeMap<usize, AgentState>,
    /// Number of checkpoints to keep (0 = keep all).
    keep_last_n: usize,
}

impl Default for MemoryCheckpoints {
    fn default() -> Self {
        Self {
            states: BTreeMap::new(),
            keep_last_n: CheckpointerConfig::default().keep_last_n,
        }
    }
}

impl MemoryCheckpoints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keep_last_n(mut self, n: usize) -> Self {
        self.keep_last_n = n;
        self
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl CheckpointStore for MemoryCheckpoints {
    fn save(&mut self, tag: usize, state: &AgentState) -> Result<()> {
        self.states.insert(tag, state.clone());
        if self.keep_last_n > 0 {
            while self.states.len() > self.keep_last_n {
                self.states.pop_first();
            }
        }
        Ok(())
    }

    fn load(&self, tag: usize) -> Result<AgentState> {
        self.states
            .get(&tag)
            .cloned()
            .ok_or(BboError::MissingCheckpoint(tag))
    }

    fn latest(&self) -> Result<Option<usize>> {
        Ok(self.states.keys().next_back().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Phase;
    use crate::config::SurrogateMethod;
    use crate::core::{ReplayBuffer, RobustNormalizer, SampleSet, TrustRegion};
    use tempfile::tempdir;

    fn state(frame: usize) -> AgentState {
        AgentState {
            method: SurrogateMethod::Anchor,
            phase: Phase::Explore,
            frame,
            round: frame / 8,
            counter: 3,
            divergence: 1,
            no_change: 2,
            epsilon: 0.1,
            pi_lr: 0.01,
            pi: vec![0.25, -0.5],
            mean_grad: vec![0.0, 0.1],
            trust_region: TrustRegion::new(2, (-1.0, 1.0), 0.5),
            normalizer: RobustNormalizer::new(0.1),
            replay: ReplayBuffer::new(2, 64, 8),
            history: SampleSet::new(2),
            best_pi_evaluate: 1.5,
            best_point: Some(vec![0.2, -0.4]),
            reward_pi: 1.75,
            f0: 3.0,
        }
    }

    #[test]
    fn test_checkpointer_config() {
        let config = CheckpointerConfig::new("./test_ckpts").with_keep_last_n(3);

        assert_eq!(config.checkpoint_dir, PathBuf::from("./test_ckpts"));
        assert_eq!(config.keep_last_n, 3);
    }

    #[test]
    fn test_checkpoint_dir_creation() {
        let dir = tempdir().unwrap();
        let subdir = dir.path().join("nested/checkpoints");

        let _checkpointer = Checkpointer::new(CheckpointerConfig::new(&subdir)).unwrap();

        assert!(subdir.exists());
    }

    #[test]
    fn test_save_and_load_state() {
        let dir = tempdir().unwrap();
        let mut checkpointer = Checkpointer::new(CheckpointerConfig::new(dir.path())).unwrap();

        checkpointer.save(64, &state(64)).unwrap();

        assert!(dir.path().join("checkpoint_00000064.json").exists());
        assert_eq!(checkpointer.load(64).unwrap(), state(64));
        assert_eq!(checkpointer.latest().unwrap(), Some(64));
        assert_eq!(checkpointer.weights_dir(), Some(dir.path()));
    }

    #[test]
    fn test_missing_checkpoint() {
        let dir = tempdir().unwrap();
        let checkpointer = Checkpointer::new(CheckpointerConfig::new(dir.path())).unwrap();

        assert!(matches!(checkpointer.load(8), Err(BboError::MissingCheckpoint(8))));
        assert_eq!(checkpointer.latest().unwrap(), None);
    }

    #[test]
    fn test_cleanup_keeps_last_n_with_weights() {
        let dir = tempdir().unwrap();
        let config = CheckpointerConfig::new(dir.path()).with_keep_last_n(2);
        let mut checkpointer = Checkpointer::new(config).unwrap();

        for tag in [8, 16, 24] {
            fs::write(dir.path().join(format!("{}_value.bin", checkpoint_stem(tag))), b"w").unwrap();
            checkpointer.save(tag, &state(tag)).unwrap();
        }

        let tags: Vec<usize> = checkpointer
            .list_checkpoints()
            .unwrap()
            .into_iter()
            .map(|c| c.tag)
            .collect();
        assert_eq!(tags, vec![16, 24]);
        assert!(!dir.path().join("checkpoint_00000008_value.bin").exists());
        assert!(dir.path().join("checkpoint_00000016_value.bin").exists());
    }

    #[test]
    fn test_memory_checkpoints() {
        let mut store = MemoryCheckpoints::new();
        store.save(16, &state(16)).unwrap();
        store.save(8, &state(8)).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.latest().unwrap(), Some(16));
        assert_eq!(store.load(8).unwrap().frame, 8);
        assert!(store.weights_dir().is_none());
    }

    #[test]
    fn test_memory_checkpoints_keep_last_n() {
        let mut store = MemoryCheckpoints::new().with_keep_last_n(2);
        for tag in [8, 16, 24] {
            store.save(tag, &state(tag)).unwrap();
        }

        assert_eq!(store.len(), 2);
        assert!(matches!(store.load(8), Err(BboError::MissingCheckpoint(8))));
        assert_eq!(store.load(16).unwrap().frame, 16);
        assert_eq!(store.latest().unwrap(), Some(24));

        let mut unbounded = MemoryCheckpoints::new().with_keep_last_n(0);
        for tag in (1..=10).map(|k| k * 8) {
            unbounded.save(tag, &state(tag)).unwrap();
        }
        assert_eq!(unbounded.len(), 10);

        let mut default = MemoryCheckpoints::new();
        for tag in (1..=10).map(|k| k * 8) {
            default.save(tag, &state(tag)).unwrap();
        }
        assert_eq!(default.len(), 5);
        assert_eq!(default.latest().unwrap(), Some(80));
    }
}
