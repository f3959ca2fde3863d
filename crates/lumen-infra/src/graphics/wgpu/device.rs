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

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use lumen_core::renderer::{
    BufferDescriptor, BufferId, GraphicsDevice, ResourceError, ShaderError, ShaderModuleDescriptor,
    ShaderModuleId, ShaderSourceData,
};

use super::context::WgpuGraphicsContext;

#[derive(Debug)]
struct WgpuShaderModuleEntry {
    wgpu_module: Arc<wgpu::ShaderModule>,
    entry_point: String,
}

#[derive(Debug)]
struct WgpuBufferEntry {
    wgpu_buffer: Arc<wgpu::Buffer>,
    size: u64, // To track VRAM accurately on destruction
}

/// The internal, non-clonable state of the WgpuDevice.
#[derive(Debug)]
struct WgpuDeviceInternal {
    context: Arc<WgpuGraphicsContext>,
    shader_modules: Mutex<HashMap<ShaderModuleId, WgpuShaderModuleEntry>>,
    buffers: Mutex<HashMap<BufferId, WgpuBufferEntry>>,

    next_shader_id: AtomicUsize,
    next_buffer_id: AtomicUsize,

    // VRAM Tracking
    vram_allocated_bytes: AtomicU64,
    vram_peak_bytes: AtomicU64,
}

/// A clonable, thread-safe handle to the WGPU graphics device.
#[derive(Clone, Debug)]
pub struct WgpuDevice {
    internal: Arc<WgpuDeviceInternal>,
}

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>, ResourceError> {
    mutex
        .lock()
        .map_err(|e| ResourceError::BackendError(format!("Mutex poisoned ({what}): {e}")))
}

impl WgpuDevice {
    /// Wraps an initialized context.
    pub fn new(context: Arc<WgpuGraphicsContext>) -> Self {
        Self {
            internal: Arc::new(WgpuDeviceInternal {
                context,
                shader_modules: Mutex::new(HashMap::new()),
                buffers: Mutex::new(HashMap::new()),
                next_shader_id: AtomicUsize::new(0),
                next_buffer_id: AtomicUsize::new(0),
                vram_allocated_bytes: AtomicU64::new(0),
                vram_peak_bytes: AtomicU64::new(0),
            }),
        }
    }

    /// Creates a device on the default adapter without a surface.
    pub fn new_headless() -> anyhow::Result<Self> {
        let context = WgpuGraphicsContext::new_headless_blocking()?;
        Ok(Self::new(Arc::new(context)))
    }

    /// The underlying context.
    pub fn context(&self) -> &WgpuGraphicsContext {
        &self.internal.context
    }

    // --- ID Generation Helpers ---

    fn generate_shader_id(&self) -> ShaderModuleId {
        ShaderModuleId(self.internal.next_shader_id.fetch_add(1, Ordering::Relaxed))
    }

    fn generate_buffer_id(&self) -> BufferId {
        BufferId(self.internal.next_buffer_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Retrieves the WGPU buffer behind `id`, for binding in a pass.
    pub fn get_wgpu_buffer(&self, id: BufferId) -> Option<Arc<wgpu::Buffer>> {
        let buffers = lock(&self.internal.buffers, "buffers").ok()?;
        buffers.get(&id).map(|entry| entry.wgpu_buffer.clone())
    }

    /// Retrieves the WGPU shader module behind `id` and its entry point.
    pub fn get_wgpu_shader_module(
        &self,
        id: ShaderModuleId,
    ) -> Option<(Arc<wgpu::ShaderModule>, String)> {
        let modules = lock(&self.internal.shader_modules, "shader_modules").ok()?;
        modules
            .get(&id)
            .map(|entry| (entry.wgpu_module.clone(), entry.entry_point.clone()))
    }

    /// Bytes currently allocated in buffers created by this device.
    pub fn vram_allocated_bytes(&self) -> u64 {
        self.internal.vram_allocated_bytes.load(Ordering::Relaxed)
    }

    /// The highest value [`vram_allocated_bytes`](Self::vram_allocated_bytes) reached.
    pub fn vram_peak_bytes(&self) -> u64 {
        self.internal.vram_peak_bytes.load(Ordering::Relaxed)
    }
}

impl GraphicsDevice for WgpuDevice {
    // --- Shader Module Operations ---

    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError> {
        let wgpu_source = match &descriptor.source {
            ShaderSourceData::Wgsl(cow_str) => wgpu::ShaderSource::Wgsl(cow_str.clone()),
        };

        let label = descriptor.label;
        log::debug!("WgpuDevice: Creating wgpu::ShaderModule with label: {label:?}");
        let device = &self.internal.context.device;
        let wgpu_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label,
            source: wgpu_source,
        });

        // Errors are reported here and to the uncaptured error handler.
        let info = pollster::block_on(wgpu_module.get_compilation_info());
        let errors: Vec<String> = info
            .messages
            .iter()
            .filter(|m| matches!(m.message_type, wgpu::CompilationMessageType::Error))
            .map(|m| match &m.location {
                Some(loc) => format!("{}:{}: {}", loc.line_number, loc.line_position, m.message),
                None => m.message.clone(),
            })
            .collect();
        if !errors.is_empty() {
            log::error!(
                "WgpuDevice: Shader module {label:?} failed to compile: {}",
                errors.join("; ")
            );
            return Err(ShaderError::CompilationError {
                label: label.unwrap_or_default().to_string(),
                details: errors.join("\n"),
            }
            .into());
        }

        let entry = WgpuShaderModuleEntry {
            wgpu_module: Arc::new(wgpu_module),
            entry_point: descriptor.entry_point.to_string(),
        };
        let id = self.generate_shader_id();
        lock(&self.internal.shader_modules, "shader_modules")?.insert(id, entry);

        log::info!(
            "WgpuDevice: Created shader module '{}' with ID: {:?}",
            label.unwrap_or_default(),
            id
        );
        Ok(id)
    }

    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), ResourceError> {
        let mut modules = lock(&self.internal.shader_modules, "shader_modules")?;

        if modules.remove(&id).is_some() {
            log::debug!("WgpuDevice: Destroyed shader module with ID: {id:?}");
            Ok(())
        } else {
            Err(ShaderError::NotFound { id }.into())
        }
    }

    // --- Buffer Operations ---

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        let label = descriptor.label.as_deref().unwrap_or_default();
        let max_size = self.internal.context.device_limits.max_buffer_size;
        if descriptor.size > max_size {
            log::error!(
                "WgpuDevice: Buffer '{label}' of {} bytes exceeds the device limit of {max_size}",
                descriptor.size
            );
            return Err(ResourceError::AllocationFailed {
                label: label.to_string(),
                size: descriptor.size,
            });
        }

        let wgpu_buffer = self
            .internal
            .context
            .device
            .create_buffer(&wgpu::BufferDescriptor {
                label: descriptor.label.as_deref(),
                size: descriptor.size,
                usage: wgpu::BufferUsages::from_bits_truncate(descriptor.usage.bits()),
                mapped_at_creation: false,
            });
        let id = self.generate_buffer_id();

        // Track VRAM usage
        let current_vram = self
            .internal
            .vram_allocated_bytes
            .fetch_add(descriptor.size, Ordering::Relaxed)
            + descriptor.size;
        self.internal
            .vram_peak_bytes
            .fetch_max(current_vram, Ordering::Relaxed);

        lock(&self.internal.buffers, "buffers")?.insert(
            id,
            WgpuBufferEntry {
                wgpu_buffer: Arc::new(wgpu_buffer),
                size: descriptor.size,
            },
        );

        log::info!(
            "WgpuDevice: Created buffer '{label}' with ID: {id:?}, size: {} bytes",
            descriptor.size
        );
        Ok(id)
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        let mut buffers = lock(&self.internal.buffers, "buffers")?;

        if let Some(entry) = buffers.remove(&id) {
            self.internal
                .vram_allocated_bytes
                .fetch_sub(entry.size, Ordering::Relaxed);
            entry.wgpu_buffer.destroy();
            log::debug!("WgpuDevice: Destroyed buffer with ID: {id:?}");
            Ok(())
        } else {
            Err(ResourceError::NotFound)
        }
    }

    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        let buffers = lock(&self.internal.buffers, "buffers")?;
        let entry = buffers.get(&id).ok_or(ResourceError::NotFound)?;

        let end_offset = offset + data.len() as u64;
        if end_offset > entry.size {
            return Err(ResourceError::OutOfBounds);
        }

        self.internal
            .context
            .queue
            .write_buffer(&entry.wgpu_buffer, offset, data);

        log::debug!(
            "WgpuDevice: Wrote {} bytes to buffer ID: {:?} at offset {}",
            data.len(),
            id,
            offset
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::renderer::BufferUsage;
    use std::borrow::Cow;

    /// Returns `None` on machines without a usable adapter.
    fn try_device() -> Option<WgpuDevice> {
        WgpuDevice::new_headless().ok()
    }

    #[test]
    fn test_write_buffer_checks_bounds() {
        let Some(device) = try_device() else {
            return;
        };

        let id = device
            .create_buffer(&BufferDescriptor {
                label: Some(Cow::Borrowed("bounds")),
                size: 32,
                usage: BufferUsage::STORAGE | BufferUsage::COPY_DST,
            })
            .unwrap();

        assert!(device.write_buffer(id, 0, &[0u8; 32]).is_ok());
        assert!(matches!(
            device.write_buffer(id, 16, &[0u8; 32]),
            Err(ResourceError::OutOfBounds)
        ));
        assert!(device.get_wgpu_buffer(id).is_some());

        device.destroy_buffer(id).unwrap();
        assert!(matches!(
            device.write_buffer(id, 0, &[0u8; 4]),
            Err(ResourceError::NotFound)
        ));
    }

    #[test]
    fn test_vram_tracking() {
        let Some(device) = try_device() else {
            return;
        };

        let descriptor = BufferDescriptor {
            label: None,
            size: 1024,
            usage: BufferUsage::UNIFORM | BufferUsage::COPY_DST,
        };
        let a = device.create_buffer(&descriptor).unwrap();
        let b = device.create_buffer(&descriptor).unwrap();
        assert_eq!(device.vram_allocated_bytes(), 2048);

        device.destroy_buffer(a).unwrap();
        device.destroy_buffer(b).unwrap();
        assert_eq!(device.vram_allocated_bytes(), 0);
        assert_eq!(device.vram_peak_bytes(), 2048);
    }

    #[test]
    fn test_invalid_shader_reports_compilation_error() {
        let Some(device) = try_device() else {
            return;
        };

        let result = device.create_shader_module(&ShaderModuleDescriptor {
            label: Some("broken"),
            source: ShaderSourceData::Wgsl(Cow::Borrowed(
                "const MAX_LIGHTS = 65535x;\n@compute @workgroup_size(1) fn main() {}",
            )),
            entry_point: "main",
        });

        match result {
            Err(ResourceError::Shader(ShaderError::CompilationError { label, details })) => {
                assert_eq!(label, "broken");
                assert!(!details.is_empty());
            }
            other => panic!("expected a compilation error, got {other:?}"),
        }
    }

    #[test]
    fn test_destroy_unknown_shader_fails() {
        let Some(device) = try_device() else {
            return;
        };

        assert!(matches!(
            device.destroy_shader_module(ShaderModuleId(42)),
            Err(ResourceError::Shader(ShaderError::NotFound { .. }))
        ));
    }
}
