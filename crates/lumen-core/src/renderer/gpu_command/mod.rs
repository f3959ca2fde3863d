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

//! Deferred application of scene mutations on the GPU.
//!
//! CPU-side code records [`Command`]s into a [`CommandQueue`] whenever the
//! scene changes. Once per frame the queue serializes up to a fixed number of
//! them into a GPU buffer and publishes the count; a processing pass then
//! applies them, in order, to GPU-resident tables. Commands that exceed the
//! per-frame capacity stay queued for later frames.

mod command;
mod config;
mod defines;
mod error;
mod list;
mod queue;

pub use self::command::{
    Command, CommandType, IntPacking, COMMAND_GROUPS, COMMAND_STRIDE_BYTES, COMMAND_WORDS,
};
pub use self::config::{CommandQueueConfig, QueueBudget, DEFAULT_COMMANDS_PER_FRAME};
pub use self::defines::{register_defines, ShaderDefines, INT_AS_FLOAT_DEFINE};
pub use self::error::{CommandQueueError, DecodeError};
pub use self::list::CommandList;
pub use self::queue::{
    CommandQueue, CommandQueueBindings, CommandSender, GpuCommandCount, QueueStats,
    COUNT_BUFFER_SIZE,
};
