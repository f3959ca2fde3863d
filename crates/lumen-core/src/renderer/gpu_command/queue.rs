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

//! The per-frame bridge between CPU-side scene events and the GPU processing pass.
//!
//! # Frame flow
//!
//! ```text
//! scene events ──enqueue()──► CommandList ──process_frame()──► data buffer [cap × 32 B]
//!  other threads ──CommandSender──┘                    └──────► count buffer [u32 + pad]
//!                                                                   │
//!                                  processing pass reads both ◄─────┘
//! ```
//!
//! `process_frame` must run exactly once per frame, after the device can accept
//! uploads and before the processing pass of the same frame is submitted. That
//! ordering belongs to the render graph; the queue does not enforce it.

use super::command::{Command, CommandType, IntPacking, COMMAND_STRIDE_BYTES};
use super::config::CommandQueueConfig;
use super::defines::{register_defines, ShaderDefines};
use super::error::CommandQueueError;
use super::list::CommandList;
use crate::renderer::api::{BufferDescriptor, BufferId, BufferUsage};
use crate::renderer::error::ResourceError;
use crate::renderer::traits::GraphicsDevice;
use bytemuck::{Pod, Zeroable};
use std::borrow::Cow;

/// The GPU-visible parameter holding the number of valid slots this frame.
///
/// Padded to 16 bytes so it can be bound as a uniform.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct GpuCommandCount {
    /// Number of commands written this frame.
    pub count: u32,
    /// Padding/Reserved.
    pub _padding: [u32; 3],
}

impl GpuCommandCount {
    /// Creates a count parameter.
    pub const fn new(count: u32) -> Self {
        Self {
            count,
            _padding: [0; 3],
        }
    }
}

/// Size in bytes of the count parameter buffer.
pub const COUNT_BUFFER_SIZE: u64 = std::mem::size_of::<GpuCommandCount>() as u64;

/// A non-owning view of the queue's GPU resources, handed to the processing stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandQueueBindings {
    /// The buffer holding the encoded commands.
    pub data_buffer: BufferId,
    /// The buffer holding the [`GpuCommandCount`].
    pub count_buffer: BufferId,
    /// The number of slots in `data_buffer`.
    pub capacity_per_frame: usize,
    /// The size of one slot in bytes.
    pub stride_bytes: usize,
}

/// Running counters describing how the queue has been draining.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Number of `process_frame` calls that completed.
    pub frames_processed: u64,
    /// Total number of commands uploaded.
    pub commands_written: u64,
    /// Number of frames that left commands queued for later frames.
    pub frames_deferred: u64,
    /// The highest pending depth observed before a drain.
    pub peak_pending: usize,
    /// Number of times the post-drain depth rose above `warn_pending_depth`.
    pub depth_warnings: u64,
}

/// A cloneable handle that lets other threads submit commands to a [`CommandQueue`].
///
/// Commands sent through a handle reach the queue's list at the start of the
/// next [`CommandQueue::process_frame`], in the order each handle sent them.
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: flume::Sender<Command>,
}

impl CommandSender {
    /// Submits a command. Returns it back if the queue has been dropped.
    pub fn send(&self, command: Command) -> Result<(), Command> {
        self.tx.send(command).map_err(|e| e.into_inner())
    }
}

/// Batches scene mutations and uploads up to a fixed number of them per frame.
///
/// The queue owns its [`CommandList`] and two GPU buffers: the data buffer,
/// sized `capacity_per_frame * COMMAND_STRIDE_BYTES`, and a small count buffer.
/// Commands that do not fit in a frame stay queued in order for the next ones;
/// there is no upper bound on the pending depth.
#[derive(Debug)]
pub struct CommandQueue {
    label: String,
    list: CommandList,
    capacity_per_frame: usize,
    staging: Vec<u8>,
    data_buffer: BufferId,
    count_buffer: BufferId,
    written_count: usize,
    inbox: flume::Receiver<Command>,
    outbox: flume::Sender<Command>,
    warn_pending_depth: Option<usize>,
    above_warn_depth: bool,
    stats: QueueStats,
}

impl CommandQueue {
    /// Creates the queue, allocates its GPU buffers and publishes the command
    /// constants into `defines`.
    ///
    /// # Errors
    ///
    /// Returns [`CommandQueueError::ZeroCapacity`] if the budget cannot hold a
    /// command, [`CommandQueueError::BudgetTooLarge`] if its size in bytes or
    /// its per-frame count does not fit the target types, and
    /// [`CommandQueueError::Allocation`] if the staging memory or either
    /// buffer cannot be allocated.
    pub fn new(
        device: &dyn GraphicsDevice,
        config: &CommandQueueConfig,
        defines: &mut ShaderDefines,
    ) -> Result<Self, CommandQueueError> {
        let capacity_per_frame = config.capacity_per_frame();
        if capacity_per_frame == 0 {
            return Err(CommandQueueError::ZeroCapacity {
                budget_bytes: config.budget.budget_bytes(),
                stride_bytes: COMMAND_STRIDE_BYTES,
            });
        }

        // The published count is a u32.
        let buffer_size = capacity_per_frame
            .checked_mul(COMMAND_STRIDE_BYTES)
            .filter(|_| u32::try_from(capacity_per_frame).is_ok())
            .ok_or(CommandQueueError::BudgetTooLarge {
                capacity_per_frame,
                stride_bytes: COMMAND_STRIDE_BYTES,
            })?;
        log::debug!("Allocating command buffer of size {buffer_size}");

        let mut staging = Vec::new();
        staging.try_reserve_exact(buffer_size).map_err(|e| {
            CommandQueueError::Allocation(ResourceError::AllocationFailed {
                label: format!("{} [staging]: {e}", config.label),
                size: buffer_size as u64,
            })
        })?;
        staging.resize(buffer_size, 0);

        let data_buffer = device.create_buffer(&BufferDescriptor {
            label: Some(Cow::Borrowed(config.label.as_str())),
            size: buffer_size as u64,
            usage: BufferUsage::STORAGE | BufferUsage::COPY_DST,
        })?;

        let count_buffer = match device.create_buffer(&BufferDescriptor {
            label: Some(Cow::Owned(format!("{} [count]", config.label))),
            size: COUNT_BUFFER_SIZE,
            usage: BufferUsage::UNIFORM | BufferUsage::COPY_DST,
        }) {
            Ok(id) => id,
            Err(e) => {
                if let Err(destroy_err) = device.destroy_buffer(data_buffer) {
                    log::warn!(
                        "CommandQueue({}): Failed to release data buffer: {:?}",
                        config.label,
                        destroy_err
                    );
                }
                return Err(e.into());
            }
        };

        register_defines(defines, config.int_packing);

        let (outbox, inbox) = flume::unbounded();

        log::info!(
            "CommandQueue({}): {} commands per frame, {:?} integer packing",
            config.label,
            capacity_per_frame,
            config.int_packing
        );

        Ok(Self {
            label: config.label.clone(),
            list: CommandList::new(config.int_packing),
            capacity_per_frame,
            staging,
            data_buffer,
            count_buffer,
            written_count: 0,
            inbox,
            outbox,
            warn_pending_depth: config.warn_pending_depth,
            above_warn_depth: false,
            stats: QueueStats::default(),
        })
    }

    /// Buffers a command for a later frame.
    pub fn enqueue(&mut self, command: Command) {
        if command.command_type() == CommandType::Invalid {
            log::warn!("CommandQueue({}): Enqueued an invalid command", self.label);
        }
        self.list.append(command);
    }

    /// Returns a handle for submitting commands from other threads.
    pub fn sender(&self) -> CommandSender {
        CommandSender {
            tx: self.outbox.clone(),
        }
    }

    /// Uploads up to `capacity_per_frame` pending commands in FIFO order and
    /// publishes how many were written. Returns that number.
    ///
    /// Only the written prefix of the data buffer is touched; an empty drain
    /// uploads no command data and sets the count to zero. Commands are
    /// removed from the list only once the upload has succeeded.
    ///
    /// # Errors
    ///
    /// Propagates the device's [`ResourceError`] if an upload fails. In that
    /// case the commands stay queued.
    pub fn process_frame(&mut self, device: &dyn GraphicsDevice) -> Result<usize, ResourceError> {
        self.list.extend(self.inbox.try_iter());

        let pending = self.list.depth();
        self.stats.peak_pending = self.stats.peak_pending.max(pending);

        let written = self
            .list
            .encode_front(self.capacity_per_frame, &mut self.staging);

        if written > 0 {
            device.write_buffer(
                self.data_buffer,
                0,
                &self.staging[..written * COMMAND_STRIDE_BYTES],
            )?;
        }
        let count = GpuCommandCount::new(written as u32);
        device.write_buffer(self.count_buffer, 0, bytemuck::bytes_of(&count))?;

        self.list.discard_front(written);
        self.written_count = written;

        self.stats.frames_processed += 1;
        self.stats.commands_written += written as u64;
        if !self.list.is_empty() {
            self.stats.frames_deferred += 1;
            log::trace!(
                "CommandQueue({}): Deferred {} commands to the next frame",
                self.label,
                self.list.depth()
            );
        }
        self.check_pending_depth();

        Ok(written)
    }

    fn check_pending_depth(&mut self) {
        let Some(limit) = self.warn_pending_depth else {
            return;
        };
        let depth = self.list.depth();
        let above = depth > limit;
        if above && !self.above_warn_depth {
            self.stats.depth_warnings += 1;
            log::warn!(
                "CommandQueue({}): {} commands pending after drain (limit {}, {} per frame)",
                self.label,
                depth,
                limit,
                self.capacity_per_frame
            );
        }
        self.above_warn_depth = above;
    }

    /// The number of commands waiting in the list.
    pub fn pending_count(&self) -> usize {
        self.list.depth()
    }

    /// The number of commands sent through [`CommandSender`]s and not yet ingested.
    pub fn pending_in_channel(&self) -> usize {
        self.inbox.len()
    }

    /// The number of commands written by the last `process_frame`.
    pub fn written_count(&self) -> usize {
        self.written_count
    }

    /// The maximum number of commands uploaded per frame.
    pub fn capacity_per_frame(&self) -> usize {
        self.capacity_per_frame
    }

    /// The size of one encoded command in bytes.
    pub const fn stride_bytes(&self) -> usize {
        COMMAND_STRIDE_BYTES
    }

    /// The size of the data buffer in bytes.
    pub fn buffer_size_bytes(&self) -> u64 {
        (self.capacity_per_frame * COMMAND_STRIDE_BYTES) as u64
    }

    /// The integer packing mode of the stream.
    pub fn int_packing(&self) -> IntPacking {
        self.list.packing()
    }

    /// The debug label of the queue.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The GPU resources the processing stage reads.
    pub fn bindings(&self) -> CommandQueueBindings {
        CommandQueueBindings {
            data_buffer: self.data_buffer,
            count_buffer: self.count_buffer,
            capacity_per_frame: self.capacity_per_frame,
            stride_bytes: COMMAND_STRIDE_BYTES,
        }
    }

    /// Returns the running drain counters.
    pub fn stats(&self) -> QueueStats {
        self.stats
    }

    /// Releases the queue's GPU buffers.
    ///
    /// The queue must not be processed again afterwards.
    pub fn destroy(&self, device: &dyn GraphicsDevice) {
        for buffer in [self.data_buffer, self.count_buffer] {
            if let Err(e) = device.destroy_buffer(buffer) {
                log::warn!(
                    "CommandQueue({}): Failed to destroy buffer: {:?}",
                    self.label,
                    e
                );
            }
        }
    }
}
