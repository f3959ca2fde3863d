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

//! Error types for the GPU command subsystem.

use crate::renderer::error::ResourceError;
use std::fmt;

/// An error raised while decoding an encoded command slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Word 0 does not hold a known command tag.
    UnknownTag(u32),
    /// The byte slice is shorter than one command stride.
    Truncated {
        /// The length of the slice that was provided.
        len: usize,
    },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::UnknownTag(tag) => write!(f, "Unknown command tag: {tag}"),
            DecodeError::Truncated { len } => {
                write!(f, "Command slot truncated: got {len} bytes")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// A fatal error raised while constructing a [`CommandQueue`](super::CommandQueue).
///
/// There is no degraded mode: a queue either starts fully initialized or the
/// pipeline is misconfigured.
#[derive(Debug)]
pub enum CommandQueueError {
    /// The configured budget cannot hold a single command.
    ZeroCapacity {
        /// The configured budget in bytes.
        budget_bytes: u64,
        /// The stride of one encoded command in bytes.
        stride_bytes: usize,
    },
    /// The configured budget holds more commands than one frame can address.
    BudgetTooLarge {
        /// The number of commands the budget asked for.
        capacity_per_frame: usize,
        /// The stride of one encoded command in bytes.
        stride_bytes: usize,
    },
    /// The graphics backend failed to allocate one of the queue's buffers.
    Allocation(ResourceError),
    /// The queue configuration could not be parsed.
    Config(String),
}

impl fmt::Display for CommandQueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandQueueError::ZeroCapacity {
                budget_bytes,
                stride_bytes,
            } => write!(
                f,
                "Command buffer budget of {budget_bytes} bytes cannot hold one {stride_bytes}-byte command"
            ),
            CommandQueueError::BudgetTooLarge {
                capacity_per_frame,
                stride_bytes,
            } => write!(
                f,
                "Command buffer budget of {capacity_per_frame} commands of {stride_bytes} bytes is too large"
            ),
            CommandQueueError::Allocation(err) => {
                write!(f, "Failed to allocate command queue storage: {err}")
            }
            CommandQueueError::Config(msg) => write!(f, "Invalid command queue config: {msg}"),
        }
    }
}

impl std::error::Error for CommandQueueError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandQueueError::Allocation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for CommandQueueError {
    fn from(err: ResourceError) -> Self {
        CommandQueueError::Allocation(err)
    }
}
