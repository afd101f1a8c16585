// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Memory accounting, budget-driven victim selection and the unload queue.

use std::collections::VecDeque;
use vessel_core::asset::AssetKind;
use vessel_core::handle::AssetHandle;

/// Memory usage of one asset kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStat {
    /// Bytes currently resident.
    pub current: u64,
    /// Highest value `current` ever reached.
    pub max: u64,
}

/// An unreferenced, resident record that budget eviction may reclaim.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvictionCandidate {
    /// The record.
    pub handle: AssetHandle,
    /// Its resident footprint.
    pub byte_size: u64,
    /// Seconds since it was last requested or released.
    pub age_secs: f64,
}

/// Scores a candidate: `(1 + |size - overage|) * size * age`.
pub fn eviction_score(byte_size: u64, overage: u64, age_secs: f64) -> f64 {
    let distance = byte_size.abs_diff(overage) as f64;
    (1.0 + distance) * byte_size as f64 * age_secs
}

/// Picks the highest scoring candidate. Ties keep the first one seen.
pub fn select_victim(
    overage: u64,
    candidates: impl IntoIterator<Item = EvictionCandidate>,
) -> Option<EvictionCandidate> {
    let mut best: Option<(EvictionCandidate, f64)> = None;
    for candidate in candidates {
        let score = eviction_score(candidate.byte_size, overage, candidate.age_secs);
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((candidate, score)),
        }
    }
    best.map(|(candidate, _)| candidate)
}

/// Tracks usage against optional per-kind budgets and holds the queue of
/// records waiting to be unloaded.
#[derive(Debug, Default)]
pub struct EvictionEngine {
    stats: [MemoryStat; AssetKind::ALL.len()],
    budgets: [Option<u64>; AssetKind::ALL.len()],
    unload_queue: VecDeque<AssetHandle>,
}

impl EvictionEngine {
    /// Creates an engine with no budgets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Usage of a kind.
    pub fn usage(&self, kind: AssetKind) -> MemoryStat {
        self.stats[kind.index()]
    }

    /// Budget of a kind, if any.
    pub fn budget(&self, kind: AssetKind) -> Option<u64> {
        self.budgets[kind.index()]
    }

    /// Sets or clears the budget of a kind.
    pub fn set_budget(&mut self, kind: AssetKind, bytes: Option<u64>) {
        self.budgets[kind.index()] = bytes;
    }

    /// Accounts for a newly resident resource.
    pub fn charge(&mut self, kind: AssetKind, bytes: u64) -> u64 {
        let stat = &mut self.stats[kind.index()];
        stat.current = stat.current.saturating_add(bytes);
        stat.max = stat.max.max(stat.current);
        stat.current
    }

    /// Accounts for a released resource.
    pub fn discharge(&mut self, kind: AssetKind, bytes: u64) -> u64 {
        let stat = &mut self.stats[kind.index()];
        stat.current = stat.current.saturating_sub(bytes);
        stat.current
    }

    /// Bytes above budget, or `None` when the kind is within budget or has none.
    pub fn overage(&self, kind: AssetKind) -> Option<u64> {
        let budget = self.budget(kind)?;
        let current = self.usage(kind).current;
        (current > budget).then(|| current - budget)
    }

    /// Queues a record for unloading.
    pub fn queue_unload(&mut self, handle: AssetHandle) {
        self.unload_queue.push_back(handle);
    }

    /// Pops up to `limit` queued records, oldest first.
    pub fn take_unloads(&mut self, limit: usize) -> Vec<AssetHandle> {
        let count = limit.min(self.unload_queue.len());
        self.unload_queue.drain(..count).collect()
    }

    /// Records waiting in the unload queue.
    pub fn queued_unloads(&self) -> usize {
        self.unload_queue.len()
    }

    /// Empties the unload queue and zeroes current usage. Peaks are kept.
    pub fn reset(&mut self) {
        self.unload_queue.clear();
        for stat in &mut self.stats {
            stat.current = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(index: u32, byte_size: u64, age_secs: f64) -> EvictionCandidate {
        EvictionCandidate {
            handle: AssetHandle::new(index, 1),
            byte_size,
            age_secs,
        }
    }

    #[test]
    fn score_formula() {
        assert_eq!(eviction_score(100, 40, 2.0), (1.0 + 60.0) * 100.0 * 2.0);
        assert_eq!(eviction_score(40, 100, 1.0), (1.0 + 60.0) * 40.0);
        assert_eq!(eviction_score(100, 100, 3.0), 300.0);
        assert_eq!(eviction_score(100, 100, 0.0), 0.0);
    }

    #[test]
    fn oldest_wins_among_equal_sizes() {
        let victim = select_victim(
            50,
            [candidate(1, 50, 1.0), candidate(2, 50, 5.0), candidate(3, 50, 2.0)],
        );
        assert_eq!(victim.map(|c| c.handle), Some(AssetHandle::new(2, 1)));
    }

    #[test]
    fn ties_keep_the_first_candidate() {
        let victim = select_victim(10, [candidate(1, 10, 0.0), candidate(2, 10, 0.0)]);
        assert_eq!(victim.map(|c| c.handle), Some(AssetHandle::new(1, 1)));
        assert!(select_victim(10, []).is_none());
    }

    #[test]
    fn overage_requires_a_budget() {
        let mut engine = EvictionEngine::new();
        engine.charge(AssetKind::Image, 300);
        assert_eq!(engine.overage(AssetKind::Image), None);

        engine.set_budget(AssetKind::Image, Some(200));
        assert_eq!(engine.overage(AssetKind::Image), Some(100));
        engine.discharge(AssetKind::Image, 150);
        assert_eq!(engine.overage(AssetKind::Image), None);

        let stat = engine.usage(AssetKind::Image);
        assert_eq!(stat, MemoryStat { current: 150, max: 300 });
        assert_eq!(engine.usage(AssetKind::Audio), MemoryStat::default());
    }

    #[test]
    fn unload_queue_is_bounded_per_take() {
        let mut engine = EvictionEngine::new();
        for index in 1..=5 {
            engine.queue_unload(AssetHandle::new(index, 1));
        }
        assert_eq!(engine.take_unloads(2).len(), 2);
        assert_eq!(engine.queued_unloads(), 3);
        assert_eq!(engine.take_unloads(10).len(), 3);
    }

    #[test]
    fn discharge_saturates_at_zero() {
        let mut engine = EvictionEngine::new();
        engine.charge(AssetKind::Video, 10);
        assert_eq!(engine.discharge(AssetKind::Video, 25), 0);
    }
}
