//! Headless scheduling demo
//!
//! Drives the frame scheduling engine against the null backend: records a
//! few hundred frames of packets on the main thread while the dedicated
//! render thread executes them, exercises shared-state acquisition and
//! deferred deletion, then shuts down cleanly. Useful as a smoke test and
//! as a minimal example of the producer contract.

use std::sync::Arc;

use rhi_core::prelude::*;
use rhi_core::TextureDescriptor;

const FRAME_COUNT: u32 = 300;
const DRAWS_PER_FRAME: u32 = 64;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match RenderConfig::load_from_file("render.toml") {
        Ok(config) => {
            log::info!("Loaded configuration from render.toml");
            config
        }
        Err(_) => RenderConfig::threaded(2).with_surface(1280, 720),
    };

    log::info!(
        "Starting headless demo: {} frames, {} draws per frame, buffering depth {}",
        FRAME_COUNT,
        DRAWS_PER_FRAME,
        config.render_thread_frame_count
    );

    let backend = Arc::new(NullBackend::new());
    let mut system = RenderSystem::new(backend.clone(), config)?;
    log::info!("Device: {}", system.device_caps().device_description);

    let pipeline = system.create_pipeline_state(&Default::default())?;
    let texture = system.create_texture(&TextureDescriptor {
        width: 256,
        height: 256,
        ..Default::default()
    })?;
    let texture_set = system.acquire_texture_set(&TextureSetDescriptor::single(texture));

    for frame in 0..FRAME_COUNT {
        let (pass, lists) = system.allocate_render_pass(&RenderPassConfig::default(), 1)?;
        system.begin_render_pass(pass);
        system.begin_packet_list(lists[0]);

        let packet = Packet {
            pipeline_state: pipeline,
            texture_set,
            primitive_count: 2,
            ..Packet::default()
        };
        let packets = vec![packet; DRAWS_PER_FRAME as usize];
        system.add_packets(lists[0], &packets);

        system.end_packet_list(lists[0], Handle::INVALID);
        system.end_render_pass(pass);
        system.present()?;

        if frame == FRAME_COUNT / 2 {
            // Swap the texture mid-run the way a streaming system would:
            // release the old one behind the frame fence and patch the
            // live texture set in place.
            let replacement = system.create_texture(&TextureDescriptor {
                width: 512,
                height: 512,
                ..Default::default()
            })?;
            system.replace_texture_in_all_texture_sets(texture, replacement);
            system.delete_texture(texture, true);
            log::info!("Replaced scene texture at frame {frame}");
        }
    }

    system.release_texture_set(texture_set, true);
    system.shutdown();

    let stats = backend.stats();
    log::info!(
        "Executed {} frames ({} draws, {} pipeline binds, {} rejected)",
        stats.frames_executed,
        stats.draws,
        stats.pipeline_state_changes,
        stats.frames_rejected
    );

    Ok(())
}
