use serde::{Deserialize, Serialize};
use std::fmt;

/// Build stages in execution order. `Failed` is reachable from any
/// non-terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Init,
    Normalizing,
    Deduplicating,
    Aggregating,
    IndexBuilding,
    ShardWriting,
    Done,
    Failed,
}

impl Stage {
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Init => Some(Stage::Normalizing),
            Stage::Normalizing => Some(Stage::Deduplicating),
            Stage::Deduplicating => Some(Stage::Aggregating),
            Stage::Aggregating => Some(Stage::IndexBuilding),
            Stage::IndexBuilding => Some(Stage::ShardWriting),
            Stage::ShardWriting => Some(Stage::Done),
            Stage::Done | Stage::Failed => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::Normalizing => "normalizing",
            Stage::Deduplicating => "deduplicating",
            Stage::Aggregating => "aggregating",
            Stage::IndexBuilding => "index_building",
            Stage::ShardWriting => "shard_writing",
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_form_a_single_chain() {
        let mut stage = Stage::Init;
        let mut seen = vec![stage];
        while let Some(next) = stage.next() {
            stage = next;
            seen.push(stage);
        }
        assert_eq!(seen.len(), 7);
        assert_eq!(stage, Stage::Done);
        assert!(Stage::Failed.next().is_none());
    }
}
