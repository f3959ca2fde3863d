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

// Lumen Sandbox
// Drives the command queue through a headless frame loop.

use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use lumen_core::lane::{Lane, LaneContext};
use lumen_core::renderer::gpu_command::{Command, CommandQueueConfig, ShaderDefines};
use lumen_core::renderer::GraphicsDevice;
use lumen_infra::WgpuDevice;
use lumen_lanes::{CommandQueueLane, CommandsWritten};

const FRAMES: usize = 8;
const MAX_LIGHTS: u32 = 256;
const MAX_SOURCES: u32 = 64;

fn load_config() -> Result<CommandQueueConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            let source = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config '{path}'"))?;
            let config = CommandQueueConfig::from_ron_str(&source)?;
            log::info!("Loaded queue config from '{path}'");
            Ok(config)
        }
        None => Ok(CommandQueueConfig::default()),
    }
}

/// A scene load: every light stored at once, more than a frame can take.
fn scene_load(count: u32) -> impl Iterator<Item = Command> {
    (0..count).map(|slot| Command::StoreLight {
        slot: slot % MAX_LIGHTS,
        position: [slot as f32, 2.0, 0.0],
        color: [1.0, 0.95, 0.8],
    })
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info"))
        .filter_module("wgpu_hal", log::LevelFilter::Error)
        .init();

    let config = load_config()?;
    let device = Arc::new(WgpuDevice::new_headless()?);
    log::info!(
        "Running on \"{}\" ({:?})",
        device.context().adapter_name,
        device.context().adapter_backend
    );

    let mut defines = ShaderDefines::new();
    defines.set("MAX_LIGHTS", format!("{MAX_LIGHTS}u"));
    defines.set("MAX_SOURCES", format!("{MAX_SOURCES}u"));
    let lane = CommandQueueLane::new(device.as_ref(), &config, &mut defines)?;

    let mut ctx = LaneContext::new();
    let shared: Arc<dyn GraphicsDevice> = device.clone();
    ctx.insert(shared);
    ctx.insert(defines);
    lane.on_initialize(&mut ctx)?;

    // Shadow sources arrive from a worker thread.
    let sender = lane.sender();
    let producer = thread::spawn(move || {
        for slot in 0..MAX_SOURCES {
            let command = Command::StoreSource {
                slot,
                resolution: 512,
                region: [0.0, 0.0, 0.125, 0.125],
            };
            if sender.send(command).is_err() {
                break;
            }
        }
    });

    let capacity = lane.bindings().capacity_per_frame as u32;
    let burst = capacity * 5 / 2;
    for command in scene_load(burst.min(MAX_LIGHTS)) {
        lane.enqueue(command);
    }

    for frame in 0..FRAMES {
        if frame == 3 {
            lane.enqueue(Command::RemoveSources {
                first_slot: 0,
                count: MAX_SOURCES / 2,
            });
        }

        lane.execute(&mut ctx)?;
        let written = ctx.get::<CommandsWritten>().map_or(0, |w| w.0);
        log::info!(
            "Frame {frame}: uploaded {written} commands, {} pending",
            lane.pending_count()
        );
    }

    if producer.join().is_err() {
        log::error!("Source producer thread panicked");
    }

    let stats = lane.stats();
    log::info!(
        "Processed {} frames, {} commands written, {} frames deferred, peak depth {}, {} depth warnings",
        stats.frames_processed,
        stats.commands_written,
        stats.frames_deferred,
        stats.peak_pending,
        stats.depth_warnings
    );
    log::info!("Peak buffer memory: {} bytes", device.vram_peak_bytes());

    lane.on_shutdown(&mut ctx);
    Ok(())
}
