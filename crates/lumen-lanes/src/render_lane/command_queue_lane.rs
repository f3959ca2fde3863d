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

//! The per-frame tick that drains the GPU command queue.

use super::shaders::{PROCESS_COMMAND_QUEUE_ENTRY, PROCESS_COMMAND_QUEUE_WGSL};
use super::ShaderSourceBuilder;
use lumen_core::lane::{Lane, LaneContext, LaneError};
use lumen_core::renderer::gpu_command::{
    Command, CommandQueue, CommandQueueBindings, CommandQueueConfig, CommandQueueError,
    CommandSender, QueueStats, ShaderDefines,
};
use lumen_core::renderer::{
    BufferId, GraphicsDevice, ResourceError, ShaderModuleDescriptor, ShaderModuleId,
    ShaderSourceData,
};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

/// Input name under which the command data buffer is exposed.
pub const COMMAND_QUEUE_INPUT: &str = "CommandQueue";

/// Input name under which the command count buffer is exposed.
pub const COMMAND_COUNT_INPUT: &str = "commandCount";

/// Number of commands uploaded by the last [`CommandQueueLane`] execution.
///
/// Inserted into the [`LaneContext`] alongside the queue's
/// [`CommandQueueBindings`] so the processing pass can skip empty frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandsWritten(pub usize);

/// Owns a [`CommandQueue`] and drives it once per frame.
///
/// The lane also owns the processing shader module, compiled from
/// [`PROCESS_COMMAND_QUEUE_WGSL`] with the queue's defines, and the table of
/// named buffers the processing pass binds.
///
/// Expects an `Arc<dyn GraphicsDevice>` in the [`LaneContext`]. An optional
/// [`ShaderDefines`] entry in the context replaces the lane's own table when
/// compiling shaders.
#[derive(Debug)]
pub struct CommandQueueLane {
    queue: Mutex<CommandQueue>,
    defines: RwLock<ShaderDefines>,
    shader: RwLock<Option<ShaderModuleId>>,
    inputs: RwLock<BTreeMap<String, BufferId>>,
}

impl CommandQueueLane {
    /// Creates the lane and its queue.
    ///
    /// The queue's constants are registered into `defines`, and the lane keeps
    /// a copy of the resulting table for shader compilation.
    pub fn new(
        device: &dyn GraphicsDevice,
        config: &CommandQueueConfig,
        defines: &mut ShaderDefines,
    ) -> Result<Self, CommandQueueError> {
        let queue = CommandQueue::new(device, config, defines)?;
        let bindings = queue.bindings();

        let mut inputs = BTreeMap::new();
        inputs.insert(COMMAND_QUEUE_INPUT.to_string(), bindings.data_buffer);
        inputs.insert(COMMAND_COUNT_INPUT.to_string(), bindings.count_buffer);

        Ok(Self {
            queue: Mutex::new(queue),
            defines: RwLock::new(defines.clone()),
            shader: RwLock::new(None),
            inputs: RwLock::new(inputs),
        })
    }

    fn queue(&self) -> MutexGuard<'_, CommandQueue> {
        // A panic while holding the lock leaves the queue consistent: the list
        // is only shortened after a successful upload.
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Buffers a command for a later frame.
    pub fn enqueue(&self, command: Command) {
        self.queue().enqueue(command);
    }

    /// Returns a handle for submitting commands from other threads.
    pub fn sender(&self) -> CommandSender {
        self.queue().sender()
    }

    /// The number of commands waiting in the queue.
    pub fn pending_count(&self) -> usize {
        self.queue().pending_count()
    }

    /// The queue's GPU resources.
    pub fn bindings(&self) -> CommandQueueBindings {
        self.queue().bindings()
    }

    /// The queue's running drain counters.
    pub fn stats(&self) -> QueueStats {
        self.queue().stats()
    }

    /// The compiled processing shader, if [`reload_shaders`](Self::reload_shaders) succeeded.
    pub fn shader_module(&self) -> Option<ShaderModuleId> {
        *self.shader.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Exposes an additional buffer to the processing pass under `name`.
    ///
    /// The queue's own inputs cannot be replaced.
    pub fn register_input(&self, name: impl Into<String>, buffer: BufferId) {
        let name = name.into();
        if name == COMMAND_QUEUE_INPUT || name == COMMAND_COUNT_INPUT {
            log::warn!("CommandQueueLane: Input '{name}' is reserved");
            return;
        }
        let mut inputs = self.inputs.write().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = inputs.insert(name.clone(), buffer) {
            log::debug!("CommandQueueLane: Input '{name}' replaced {previous:?}");
        }
    }

    /// Returns the named buffers the processing pass binds, in name order.
    pub fn inputs(&self) -> Vec<(String, BufferId)> {
        self.inputs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(name, buffer)| (name.clone(), *buffer))
            .collect()
    }

    /// Recompiles the processing shader with the lane's defines.
    pub fn reload_shaders(
        &self,
        device: &dyn GraphicsDevice,
    ) -> Result<ShaderModuleId, ResourceError> {
        let defines = self
            .defines
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        self.reload_shaders_with(device, &defines)
    }

    /// Recompiles the processing shader with `defines`, which become the
    /// lane's table for later reloads. The previous module is destroyed once
    /// the new one compiled.
    pub fn reload_shaders_with(
        &self,
        device: &dyn GraphicsDevice,
        defines: &ShaderDefines,
    ) -> Result<ShaderModuleId, ResourceError> {
        let source = ShaderSourceBuilder::new(defines).build(PROCESS_COMMAND_QUEUE_WGSL);
        let module = device.create_shader_module(&ShaderModuleDescriptor {
            label: Some("process_command_queue"),
            source: ShaderSourceData::Wgsl(Cow::Owned(source)),
            entry_point: PROCESS_COMMAND_QUEUE_ENTRY,
        })?;

        *self.defines.write().unwrap_or_else(|e| e.into_inner()) = defines.clone();
        let previous = self
            .shader
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .replace(module);
        if let Some(previous) = previous {
            if let Err(e) = device.destroy_shader_module(previous) {
                log::warn!("CommandQueueLane: Failed to destroy shader module: {:?}", e);
            }
        }

        log::debug!("CommandQueueLane: Compiled processing shader {module:?}");
        Ok(module)
    }

    fn on_gpu_init(
        &self,
        ctx: &LaneContext,
        device: &dyn GraphicsDevice,
    ) -> Result<(), ResourceError> {
        match ctx.get::<ShaderDefines>() {
            Some(defines) => self.reload_shaders_with(device, defines)?,
            None => self.reload_shaders(device)?,
        };
        Ok(())
    }

    fn on_gpu_shutdown(&self, device: &dyn GraphicsDevice) {
        let shader = self
            .shader
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(shader) = shader {
            if let Err(e) = device.destroy_shader_module(shader) {
                log::warn!("CommandQueueLane: Failed to destroy shader module: {:?}", e);
            }
        }
        self.queue().destroy(device);
    }
}

impl Lane for CommandQueueLane {
    fn strategy_name(&self) -> &'static str {
        "CommandQueue"
    }

    fn on_initialize(&self, ctx: &mut LaneContext) -> Result<(), LaneError> {
        let device = ctx
            .get::<Arc<dyn GraphicsDevice>>()
            .ok_or(LaneError::missing("Arc<dyn GraphicsDevice>"))?
            .clone();
        self.on_gpu_init(ctx, device.as_ref())
            .map_err(|e| LaneError::InitializationFailed(Box::new(e)))
    }

    fn execute(&self, ctx: &mut LaneContext) -> Result<(), LaneError> {
        let device = ctx
            .get::<Arc<dyn GraphicsDevice>>()
            .ok_or(LaneError::missing("Arc<dyn GraphicsDevice>"))?
            .clone();

        let (written, bindings) = {
            let mut queue = self.queue();
            let written = queue
                .process_frame(device.as_ref())
                .map_err(|e| LaneError::ExecutionFailed(Box::new(e)))?;
            (written, queue.bindings())
        };

        ctx.insert(bindings);
        ctx.insert(CommandsWritten(written));
        Ok(())
    }

    fn on_shutdown(&self, ctx: &mut LaneContext) {
        if let Some(device) = ctx.get::<Arc<dyn GraphicsDevice>>() {
            self.on_gpu_shutdown(device.as_ref());
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
