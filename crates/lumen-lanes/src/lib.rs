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

//! Hot-path lanes of the Lumen pipeline.
//!
//! [`render_lane::CommandQueueLane`] is the per-frame tick that drains the
//! GPU command queue and owns the processing shader. The rest of the crate
//! supports it: shader-source generation from a defines table, the embedded
//! WGSL processing shader, and a CPU reference processor that applies an
//! uploaded stream to host-side tables.

#![warn(missing_docs)]

pub mod render_lane;

pub use render_lane::*;
