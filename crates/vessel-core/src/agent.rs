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

//! Traits for autonomous cache subsystems.

use serde::{Deserialize, Serialize};

/// A throttling strategy applied to an agent's per-frame work caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyId {
    /// Minimal work per frame.
    LowPower,
    /// The configured caps.
    Balanced,
    /// Several times the configured caps.
    HighPerformance,
    /// An explicit per-frame cap.
    Custom(u32),
}

/// A snapshot of an agent's health.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentStatus {
    /// Name of the reporting agent.
    pub agent: &'static str,
    /// `1.0` when healthy, approaching `0.0` as work piles up or fails.
    pub health_score: f32,
    /// The strategy in effect.
    pub current_strategy: StrategyId,
    /// `true` when queued work cannot make progress.
    pub is_stalled: bool,
    /// Human-readable details.
    pub message: String,
}

/// The interface of a subsystem that does bounded work once per frame.
pub trait Agent: Send {
    /// Stable name used in logs and status reports.
    fn name(&self) -> &'static str;

    /// Adjusts the per-frame work caps.
    fn apply_strategy(&mut self, strategy: StrategyId);

    /// Performs one frame of work.
    fn update(&mut self);

    /// Reports the current status and health of the agent.
    fn report_status(&self) -> AgentStatus;
}
