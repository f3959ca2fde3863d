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

//! A host-side implementation of the command processing pass.
//!
//! Applies an uploaded command stream to slot-indexed light and source
//! tables exactly as `process_command_queue.wgsl` does on the GPU: commands
//! are applied one at a time in stream order, slots outside a table are
//! ignored, and slots with an unknown tag are skipped.

use bytemuck::{Pod, Zeroable};
use lumen_core::renderer::gpu_command::{Command, IntPacking, COMMAND_STRIDE_BYTES};

/// A light as stored in the GPU light table.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightRecord {
    /// World-space position; `w` is 1 for an occupied slot.
    pub position: [f32; 4],
    /// Linear RGB color; `w` is unused.
    pub color: [f32; 4],
}

impl LightRecord {
    /// Creates a record for a light at `position` with `color`.
    pub fn new(position: [f32; 3], color: [f32; 3]) -> Self {
        Self {
            position: [position[0], position[1], position[2], 1.0],
            color: [color[0], color[1], color[2], 0.0],
        }
    }
}

/// A shadow source as stored in the GPU source table.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SourceRecord {
    /// Atlas region as `[u0, v0, u1, v1]`.
    pub region: [f32; 4],
    /// Shadow map resolution in texels.
    pub resolution: u32,
    /// 1 for an occupied slot.
    pub occupied: u32,
    /// Padding/Reserved.
    pub _padding: [u32; 2],
}

impl SourceRecord {
    /// Creates a record for an occupied source slot.
    pub fn new(resolution: u32, region: [f32; 4]) -> Self {
        Self {
            region,
            resolution,
            occupied: 1,
            _padding: [0; 2],
        }
    }
}

/// A fixed-size table of optional records, indexed by slot.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotTable<T> {
    slots: Vec<Option<T>>,
}

/// The light table.
pub type LightTable = SlotTable<LightRecord>;

/// The shadow source table.
pub type SourceTable = SlotTable<SourceRecord>;

impl<T: Pod> SlotTable<T> {
    /// Creates a table with `capacity` empty slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
        }
    }

    /// The number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the record at `slot`, if the slot exists and is occupied.
    pub fn get(&self, slot: u32) -> Option<&T> {
        self.slots.get(slot as usize)?.as_ref()
    }

    /// The number of occupied slots.
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Iterates over occupied slots and their records.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|r| (i as u32, r)))
    }

    /// Flattens the table into its GPU layout. Empty slots are zeroed.
    pub fn to_gpu_records(&self) -> Vec<T> {
        self.slots
            .iter()
            .map(|s| s.unwrap_or_else(T::zeroed))
            .collect()
    }

    /// Writes `value` into `slot`. Returns `false` if the slot does not exist.
    fn set(&mut self, slot: u32, value: Option<T>) -> bool {
        match self.slots.get_mut(slot as usize) {
            Some(entry) => {
                *entry = value;
                true
            }
            None => false,
        }
    }
}

/// Applies command streams to a [`LightTable`] and a [`SourceTable`].
#[derive(Debug, Clone)]
pub struct CpuCommandProcessor {
    lights: LightTable,
    sources: SourceTable,
    packing: IntPacking,
}

impl CpuCommandProcessor {
    /// Creates a processor with empty tables of the given capacities.
    pub fn new(light_capacity: usize, source_capacity: usize, packing: IntPacking) -> Self {
        Self {
            lights: LightTable::new(light_capacity),
            sources: SourceTable::new(source_capacity),
            packing,
        }
    }

    /// The light table.
    pub fn lights(&self) -> &LightTable {
        &self.lights
    }

    /// The source table.
    pub fn sources(&self) -> &SourceTable {
        &self.sources
    }

    /// Applies a single command.
    pub fn apply(&mut self, command: &Command) {
        match *command {
            Command::Invalid => {}
            Command::StoreLight {
                slot,
                position,
                color,
            } => {
                if !self.lights.set(slot, Some(LightRecord::new(position, color))) {
                    log::warn!("CpuCommandProcessor: Light slot {slot} out of range");
                }
            }
            Command::RemoveLight { slot } => {
                if !self.lights.set(slot, None) {
                    log::warn!("CpuCommandProcessor: Light slot {slot} out of range");
                }
            }
            Command::StoreSource {
                slot,
                resolution,
                region,
            } => {
                if !self
                    .sources
                    .set(slot, Some(SourceRecord::new(resolution, region)))
                {
                    log::warn!("CpuCommandProcessor: Source slot {slot} out of range");
                }
            }
            Command::RemoveSources { first_slot, count } => {
                let capacity = u32::try_from(self.sources.capacity()).unwrap_or(u32::MAX);
                if first_slot >= capacity {
                    log::warn!(
                        "CpuCommandProcessor: Source range {first_slot}+{count} starts past {capacity} slots"
                    );
                    return;
                }
                let end = first_slot + count.min(capacity - first_slot);
                if end - first_slot < count {
                    log::warn!(
                        "CpuCommandProcessor: Source range {first_slot}+{count} exceeds {capacity} slots"
                    );
                }
                for slot in first_slot..end {
                    self.sources.set(slot, None);
                }
            }
        }
    }

    /// Decodes and applies the first `count` commands of `stream`, in order.
    ///
    /// `count` is clamped to the number of whole slots in `stream`. Slots that
    /// fail to decode are skipped. Returns the number of commands applied.
    pub fn process(&mut self, stream: &[u8], count: usize) -> usize {
        let available = stream.len() / COMMAND_STRIDE_BYTES;
        if count > available {
            log::warn!(
                "CpuCommandProcessor: Count {count} exceeds the {available} slots in the stream"
            );
        }

        let mut applied = 0;
        for slot in stream.chunks_exact(COMMAND_STRIDE_BYTES).take(count) {
            match Command::decode(slot, self.packing) {
                Ok(command) => {
                    self.apply(&command);
                    applied += 1;
                }
                Err(e) => log::warn!("CpuCommandProcessor: Skipping slot: {e}"),
            }
        }
        applied
    }
}
