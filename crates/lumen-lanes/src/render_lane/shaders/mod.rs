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

//! Built-in shader sources for the command queue.
//!
//! The sources are embedded at compile time. They are not complete WGSL on
//! their own: the `CMD_*` and `GPU_CMD_INT_AS_FLOAT` constants are supplied
//! by the [`ShaderSourceBuilder`](super::ShaderSourceBuilder) preamble.

/// The processing pass applying a frame's uploaded commands.
///
/// Bindings (group 0): `0` the command data buffer, `1` the count parameter,
/// `2` the light table, `3` the source table.
pub const PROCESS_COMMAND_QUEUE_WGSL: &str = include_str!("process_command_queue.wgsl");

/// Entry point of [`PROCESS_COMMAND_QUEUE_WGSL`].
pub const PROCESS_COMMAND_QUEUE_ENTRY: &str = "main";
