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

//! Construction-time settings for the [`CommandQueue`](super::CommandQueue).

use super::command::{IntPacking, COMMAND_STRIDE_BYTES};
use super::error::CommandQueueError;
use serde::{Deserialize, Serialize};

/// The default number of commands the processing pass handles per frame.
pub const DEFAULT_COMMANDS_PER_FRAME: usize = 1024;

/// The size budget of the GPU command buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueBudget {
    /// A byte budget. Capacity is `bytes / stride`, rounded down.
    Bytes(u64),
    /// A number of commands per frame.
    Commands(usize),
}

impl QueueBudget {
    /// The budget expressed in bytes, saturating at `u64::MAX`.
    pub fn budget_bytes(self) -> u64 {
        let stride = COMMAND_STRIDE_BYTES as u64;
        match self {
            QueueBudget::Bytes(bytes) => bytes,
            QueueBudget::Commands(count) => (count as u64).saturating_mul(stride),
        }
    }

    /// The number of whole commands that fit in the budget.
    pub fn capacity_per_frame(self) -> usize {
        match self {
            QueueBudget::Bytes(bytes) => {
                let count = bytes / COMMAND_STRIDE_BYTES as u64;
                usize::try_from(count).unwrap_or(usize::MAX)
            }
            QueueBudget::Commands(count) => count,
        }
    }
}

impl Default for QueueBudget {
    fn default() -> Self {
        QueueBudget::Commands(DEFAULT_COMMANDS_PER_FRAME)
    }
}

/// Settings used when constructing a command queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandQueueConfig {
    /// Debug label of the GPU data buffer.
    pub label: String,
    /// The size budget of the GPU data buffer.
    pub budget: QueueBudget,
    /// How integer fields are encoded in the stream.
    pub int_packing: IntPacking,
    /// Logs a warning when the post-drain depth rises above this value.
    pub warn_pending_depth: Option<usize>,
}

impl Default for CommandQueueConfig {
    fn default() -> Self {
        Self {
            label: "CommandQueue".to_string(),
            budget: QueueBudget::default(),
            int_packing: IntPacking::default(),
            warn_pending_depth: None,
        }
    }
}

impl CommandQueueConfig {
    /// Parses a configuration from RON. Missing fields take their default value.
    pub fn from_ron_str(source: &str) -> Result<Self, CommandQueueError> {
        ron::from_str(source).map_err(|e| CommandQueueError::Config(e.to_string()))
    }

    /// The number of commands processed per frame under this configuration.
    pub fn capacity_per_frame(&self) -> usize {
        self.budget.capacity_per_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CommandQueueConfig::default();
        assert_eq!(config.capacity_per_frame(), DEFAULT_COMMANDS_PER_FRAME);
        assert_eq!(config.int_packing, IntPacking::BitCast);
        assert_eq!(config.warn_pending_depth, None);
    }

    #[test]
    fn test_byte_budget_rounds_down() {
        assert_eq!(QueueBudget::Bytes(1000).capacity_per_frame(), 1000 / 32);
        assert_eq!(QueueBudget::Bytes(31).capacity_per_frame(), 0);
        assert_eq!(QueueBudget::Bytes(64).capacity_per_frame(), 2);
        assert_eq!(QueueBudget::Commands(3).budget_bytes(), 96);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_budget_bytes_saturates() {
        assert_eq!(QueueBudget::Commands(usize::MAX).budget_bytes(), u64::MAX);
        assert_eq!(QueueBudget::Commands(1 << 59).budget_bytes(), u64::MAX);
    }

    #[test]
    fn test_parse_partial_ron() {
        let config = CommandQueueConfig::from_ron_str(
            "(budget: Bytes(4096), int_packing: Convert, warn_pending_depth: Some(500))",
        )
        .unwrap();
        assert_eq!(config.budget, QueueBudget::Bytes(4096));
        assert_eq!(config.capacity_per_frame(), 128);
        assert_eq!(config.int_packing, IntPacking::Convert);
        assert_eq!(config.warn_pending_depth, Some(500));
        assert_eq!(config.label, "CommandQueue");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = CommandQueueConfig::from_ron_str("(budget: Lots)").unwrap_err();
        assert!(matches!(err, CommandQueueError::Config(_)));
    }
}
