//! Scripted distribution for deterministic address sequences
//!
//! Replays a fixed list of candidate indices. Once the script runs out it keeps
//! returning the last value, which is what the collision and wraparound tests
//! want: the allocator is forced to resolve the same candidate repeatedly.

use super::Distribution;
use std::collections::VecDeque;

/// Distribution that returns pre-recorded candidates
#[derive(Debug, Clone)]
pub struct ScriptedDistribution {
    script: VecDeque<u64>,
    last: u64,
    limit: u64,
}

impl ScriptedDistribution {
    /// Replay `candidates` in order
    pub fn new(candidates: impl IntoIterator<Item = u64>) -> Self {
        Self {
            script: candidates.into_iter().collect(),
            last: 0,
            limit: u64::MAX,
        }
    }

    /// Pretend the generator can only sample `[0, limit)`
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Candidates not yet consumed
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl Distribution for ScriptedDistribution {
    fn next_block(&mut self, num_blocks: u64) -> u64 {
        if let Some(next) = self.script.pop_front() {
            self.last = next;
        }
        if num_blocks == 0 {
            return 0;
        }
        self.last % num_blocks
    }

    fn max_blocks(&self) -> u64 {
        self.limit
    }
}
