use lumen_core::lane::{Lane, LaneContext};
use lumen_core::renderer::gpu_command::{
    Command, CommandQueueBindings, CommandQueueConfig, GpuCommandCount, IntPacking, QueueBudget,
    ShaderDefines,
};
use lumen_core::renderer::{
    BufferDescriptor, BufferId, GraphicsDevice, ResourceError, ShaderModuleDescriptor,
    ShaderModuleId,
};
use lumen_lanes::{CommandQueueLane, CommandsWritten, CpuCommandProcessor};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct MemoryDevice {
    next_id: AtomicUsize,
    buffers: Mutex<HashMap<BufferId, Vec<u8>>>,
    shaders: Mutex<Vec<ShaderModuleId>>,
}

impl MemoryDevice {
    fn read(&self, id: BufferId) -> Vec<u8> {
        self.buffers.lock().unwrap()[&id].clone()
    }
}

impl GraphicsDevice for MemoryDevice {
    fn create_shader_module(
        &self,
        _desc: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError> {
        let id = ShaderModuleId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.shaders.lock().unwrap().push(id);
        Ok(id)
    }

    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), ResourceError> {
        self.shaders.lock().unwrap().retain(|s| *s != id);
        Ok(())
    }

    fn create_buffer(&self, desc: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        let id = BufferId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.buffers
            .lock()
            .unwrap()
            .insert(id, vec![0; desc.size as usize]);
        Ok(id)
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        self.buffers
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::NotFound)
    }

    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        let mut buffers = self.buffers.lock().unwrap();
        let buffer = buffers.get_mut(&id).ok_or(ResourceError::NotFound)?;
        let start = offset as usize;
        if start + data.len() > buffer.len() {
            return Err(ResourceError::OutOfBounds);
        }
        buffer[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }
}

fn setup(capacity: usize) -> (Arc<MemoryDevice>, CommandQueueLane, LaneContext) {
    let device = Arc::new(MemoryDevice::default());
    let config = CommandQueueConfig {
        budget: QueueBudget::Commands(capacity),
        ..Default::default()
    };
    let lane = CommandQueueLane::new(device.as_ref(), &config, &mut ShaderDefines::new()).unwrap();

    let mut ctx = LaneContext::new();
    let shared: Arc<dyn GraphicsDevice> = device.clone();
    ctx.insert(shared);
    (device, lane, ctx)
}

/// Runs the processing stage on the host against the uploaded buffers.
fn apply_upload(device: &MemoryDevice, ctx: &LaneContext, processor: &mut CpuCommandProcessor) {
    let bindings = ctx.get::<CommandQueueBindings>().unwrap();
    let count_bytes = device.read(bindings.count_buffer);
    let count = bytemuck::pod_read_unaligned::<GpuCommandCount>(&count_bytes).count as usize;
    assert_eq!(ctx.get::<CommandsWritten>(), Some(&CommandsWritten(count)));

    assert_eq!(
        processor.process(&device.read(bindings.data_buffer), count),
        count
    );
}

#[test]
fn test_lifecycle_compiles_and_releases_shader() {
    let (device, lane, mut ctx) = setup(8);

    lane.on_initialize(&mut ctx).unwrap();
    assert!(lane.shader_module().is_some());
    assert_eq!(device.shaders.lock().unwrap().len(), 1);

    lane.execute(&mut ctx).unwrap();

    lane.on_shutdown(&mut ctx);
    assert!(lane.shader_module().is_none());
    assert!(device.shaders.lock().unwrap().is_empty());
    assert!(device.buffers.lock().unwrap().is_empty());
}

#[test]
fn test_frames_converge_to_final_scene_state() {
    let (device, lane, mut ctx) = setup(3);
    lane.on_initialize(&mut ctx).unwrap();
    let mut processor = CpuCommandProcessor::new(16, 16, IntPacking::BitCast);

    for slot in 0..6 {
        lane.enqueue(Command::StoreLight {
            slot,
            position: [slot as f32, 0.0, 0.0],
            color: [1.0, 1.0, 1.0],
        });
    }
    lane.enqueue(Command::RemoveLight { slot: 2 });
    lane.enqueue(Command::StoreSource {
        slot: 4,
        resolution: 1024,
        region: [0.0, 0.0, 0.5, 0.5],
    });

    let mut frames = 0;
    while lane.pending_count() > 0 {
        lane.execute(&mut ctx).unwrap();
        apply_upload(&device, &ctx, &mut processor);
        frames += 1;
    }

    assert_eq!(frames, 3);
    assert_eq!(processor.lights().occupied(), 5);
    assert!(processor.lights().get(2).is_none());
    assert_eq!(processor.sources().get(4).unwrap().resolution, 1024);
    assert_eq!(lane.stats().commands_written, 8);
}

#[test]
fn test_sender_from_another_thread_is_applied() {
    let (device, lane, mut ctx) = setup(8);
    let mut processor = CpuCommandProcessor::new(4, 4, IntPacking::BitCast);

    let sender = lane.sender();
    std::thread::spawn(move || {
        sender
            .send(Command::StoreLight {
                slot: 1,
                position: [0.0, 1.0, 0.0],
                color: [0.0, 0.0, 1.0],
            })
            .unwrap();
    })
    .join()
    .unwrap();

    lane.execute(&mut ctx).unwrap();
    apply_upload(&device, &ctx, &mut processor);

    let light = processor.lights().get(1).unwrap();
    approx::assert_relative_eq!(light.color[2], 1.0);
}

#[test]
fn test_context_defines_override_lane_defines() {
    let (device, lane, mut ctx) = setup(2);
    let mut defines = ShaderDefines::new();
    defines.set("MAX_LIGHTS", "16u");
    ctx.insert(defines);

    lane.on_initialize(&mut ctx).unwrap();
    assert_eq!(device.shaders.lock().unwrap().len(), 1);

    // Later reloads reuse the table given at initialization.
    lane.reload_shaders(device.as_ref()).unwrap();
    assert_eq!(device.shaders.lock().unwrap().len(), 1);
}
