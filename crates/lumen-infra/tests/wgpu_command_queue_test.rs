use lumen_core::renderer::gpu_command::{
    Command, CommandQueue, CommandQueueConfig, QueueBudget, ShaderDefines,
};
use lumen_core::renderer::{
    GraphicsDevice, ResourceError, ShaderError, ShaderModuleDescriptor, ShaderSourceData,
};
use lumen_infra::WgpuDevice;
use lumen_lanes::CommandQueueLane;
use std::borrow::Cow;

#[test]
fn test_queue_drains_on_real_device() {
    let Ok(device) = WgpuDevice::new_headless() else {
        eprintln!("No graphics adapter available, skipping");
        return;
    };

    let config = CommandQueueConfig {
        budget: QueueBudget::Commands(4),
        ..Default::default()
    };
    let mut queue = CommandQueue::new(&device, &config, &mut ShaderDefines::new()).unwrap();
    assert_eq!(device.vram_allocated_bytes(), 4 * 32 + 16);

    for slot in 0..6 {
        queue.enqueue(Command::RemoveLight { slot });
    }
    assert_eq!(queue.process_frame(&device).unwrap(), 4);
    assert_eq!(queue.process_frame(&device).unwrap(), 2);
    assert_eq!(queue.pending_count(), 0);

    let bindings = queue.bindings();
    assert_eq!(
        device.get_wgpu_buffer(bindings.data_buffer).unwrap().size(),
        4 * 32
    );

    queue.destroy(&device);
    assert_eq!(device.vram_allocated_bytes(), 0);
}

#[test]
fn test_shader_module_keeps_entry_point() {
    let Ok(device) = WgpuDevice::new_headless() else {
        return;
    };

    let id = device
        .create_shader_module(&ShaderModuleDescriptor {
            label: Some("noop"),
            source: ShaderSourceData::Wgsl(Cow::Borrowed(
                "@compute @workgroup_size(1) fn main() {}",
            )),
            entry_point: "main",
        })
        .unwrap();

    let (_, entry_point) = device.get_wgpu_shader_module(id).unwrap();
    assert_eq!(entry_point, "main");
    device.destroy_shader_module(id).unwrap();
}

#[test]
fn test_processing_shader_compiles_on_real_device() {
    let Ok(device) = WgpuDevice::new_headless() else {
        return;
    };

    let mut defines = ShaderDefines::new();
    let config = CommandQueueConfig::default();
    let lane = CommandQueueLane::new(&device, &config, &mut defines).unwrap();
    let id = lane.reload_shaders(&device).unwrap();
    assert!(device.get_wgpu_shader_module(id).is_some());
}

#[test]
fn test_bad_define_value_is_a_compilation_error() {
    let Ok(device) = WgpuDevice::new_headless() else {
        return;
    };

    let mut defines = ShaderDefines::new();
    let config = CommandQueueConfig::default();
    let lane = CommandQueueLane::new(&device, &config, &mut defines).unwrap();
    let good = lane.reload_shaders(&device).unwrap();

    defines.set("MAX_LIGHTS", "65535x");
    let err = lane.reload_shaders_with(&device, &defines).unwrap_err();
    assert!(matches!(
        err,
        ResourceError::Shader(ShaderError::CompilationError { .. })
    ));
    assert_eq!(lane.shader_module(), Some(good));
}
