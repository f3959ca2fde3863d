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

//! Provides the public, backend-agnostic rendering contracts for Lumen.
//!
//! This module defines the "common language" used between the pipeline and
//! its graphics backend: the [`GraphicsDevice`] trait, resource descriptors
//! and handles, and the error types returned by the backend.
//!
//! The [`gpu_command`] module builds on top of these contracts. It batches
//! structural scene mutations (lights, shadow sources) into a compact binary
//! stream that a processing shader applies on the GPU, a bounded number of
//! entries per frame. The 'how' of uploading is left to a concrete backend in
//! the `lumen-infra` crate, which implements [`GraphicsDevice`].

pub mod api;
pub mod error;
pub mod gpu_command;
pub mod traits;

// Re-export the most important traits and types for easier use.
pub use self::api::*;
pub use self::error::{ResourceError, ShaderError};
pub use self::gpu_command::{
    Command, CommandList, CommandQueue, CommandQueueConfig, CommandQueueError, CommandSender,
    CommandType, IntPacking, ShaderDefines,
};
pub use self::traits::GraphicsDevice;
