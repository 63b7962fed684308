//! Packet submission
//!
//! Translates ordered sequences of [`Packet`]s into backend command-encode
//! calls while suppressing redundant state transitions. Each packet list
//! wraps one backend command buffer and tracks the state last set on it;
//! `add_packets` re-emits only the state elements that actually changed.
//! Redundant state-set calls never reaching the backend is a
//! performance-critical invariant, not an optimization to drop.
//!
//! Constant-buffer binds are the exception: constant data is volatile
//! between draws, so they are re-emitted for every packet.

use crate::error::{RenderError, RenderResult};
use crate::handle::Handle;
use crate::system::RenderCore;
use crate::types::{
    CullMode, FillMode, Packet, PacketOptions, RenderPassConfig, ScissorRect, Viewport,
    INVALID_QUERY_INDEX, MAX_PASS_COMMAND_BUFFER_COUNT, MAX_VERTEX_STREAM_COUNT,
};

/// Recording context for one command buffer of a render pass.
#[derive(Debug, Clone)]
pub(crate) struct PacketList {
    command_buffer: Handle,
    query_buffer: Handle,
    viewport: Viewport,

    cur_pipeline_state: Handle,
    cur_vertex_layout: u32,
    cur_texture_set: Handle,
    cur_sampler_state: Handle,
    cur_depth_stencil_state: Handle,
    cur_cull_mode: CullMode,
    cur_vertex_streams: [Handle; MAX_VERTEX_STREAM_COUNT],

    def_depth_stencil_state: Handle,
    def_sampler_state: Handle,
    def_scissor_rect: ScissorRect,

    set_default_viewport: bool,
    restore_def_scissor_rect: bool,
    restore_solid_fill: bool,
    invert_culling: bool,

    batch_index: u32,
}

impl PacketList {
    fn new(command_buffer: Handle, config: &RenderPassConfig, first_in_pass: bool) -> Self {
        Self {
            command_buffer,
            query_buffer: config.query_buffer,
            viewport: config.viewport,
            cur_pipeline_state: Handle::INVALID,
            cur_vertex_layout: 0,
            cur_texture_set: Handle::INVALID,
            cur_sampler_state: Handle::INVALID,
            cur_depth_stencil_state: Handle::INVALID,
            cur_cull_mode: CullMode::None,
            cur_vertex_streams: [Handle::INVALID; MAX_VERTEX_STREAM_COUNT],
            def_depth_stencil_state: Handle::INVALID,
            def_sampler_state: Handle::INVALID,
            def_scissor_rect: ScissorRect::default(),
            set_default_viewport: first_in_pass,
            restore_def_scissor_rect: false,
            restore_solid_fill: false,
            invert_culling: config.invert_culling,
            batch_index: 0,
        }
    }
}

impl RenderCore {
    /// Allocates a render pass plus one packet list per requested command
    /// buffer, and registers the pass with the current frame.
    ///
    /// Pass creation and frame bookkeeping are deliberately one call:
    /// a pass cannot exist outside a frame.
    pub(crate) fn allocate_render_pass(
        &self,
        config: &RenderPassConfig,
        packet_list_count: u32,
    ) -> RenderResult<(Handle, Vec<Handle>)> {
        if packet_list_count == 0 || packet_list_count as usize > MAX_PASS_COMMAND_BUFFER_COUNT {
            return Err(RenderError::RenderingFailed(format!(
                "render pass requested {packet_list_count} command buffers (1..={MAX_PASS_COMMAND_BUFFER_COUNT})"
            )));
        }

        let (pass, command_buffers) = self
            .backend
            .allocate_render_pass(config, packet_list_count)?;
        self.frames.add_pass(pass, config.priority);

        let packet_lists = command_buffers
            .into_iter()
            .enumerate()
            .map(|(i, command_buffer)| {
                self.packet_lists
                    .alloc(PacketList::new(command_buffer, config, i == 0))
            })
            .collect();

        Ok((pass, packet_lists))
    }

    pub(crate) fn begin_render_pass(&self, pass: Handle) {
        self.backend.begin_render_pass(pass);
    }

    pub(crate) fn end_render_pass(&self, pass: Handle) {
        self.backend.end_render_pass(pass);
    }

    /// Opens a packet list for recording and forces every tracked state
    /// element to a known default, so state diffing is well-defined from
    /// the first packet.
    pub(crate) fn begin_packet_list(&self, packet_list: Handle) {
        let (def_depth_stencil, def_sampler) = self.packet_defaults();

        let mut list = self.packet_lists.with(packet_list, Clone::clone);
        list.cur_pipeline_state = Handle::INVALID;
        list.cur_vertex_layout = 0;
        list.cur_texture_set = Handle::INVALID;
        list.cur_vertex_streams = [Handle::INVALID; MAX_VERTEX_STREAM_COUNT];
        list.def_depth_stencil_state = def_depth_stencil;
        list.def_sampler_state = def_sampler;
        list.def_scissor_rect = ScissorRect::default();
        list.restore_def_scissor_rect = false;
        list.restore_solid_fill = false;
        list.batch_index = 0;

        let backend = self.backend.as_ref();
        let command_buffer = list.command_buffer;
        backend.command_buffer_begin(command_buffer);

        if list.set_default_viewport {
            backend.set_viewport(command_buffer, list.viewport);
        }
        backend.set_scissor_rect(command_buffer, ScissorRect::default());

        backend.set_depth_stencil_state(command_buffer, def_depth_stencil);
        list.cur_depth_stencil_state = def_depth_stencil;

        backend.set_sampler_state(command_buffer, def_sampler);
        list.cur_sampler_state = def_sampler;

        backend.set_cull_mode(command_buffer, CullMode::None);
        list.cur_cull_mode = CullMode::None;

        backend.set_fill_mode(command_buffer, FillMode::Solid);

        if list.query_buffer.is_valid() {
            backend.set_query_buffer(command_buffer, list.query_buffer);
        }

        self.packet_lists
            .with_mut(packet_list, |slot| *slot = list);
    }

    /// Closes a packet list. `sync` (if valid) signals once the command
    /// buffer's work retires. The packet list handle is released and must
    /// not be used again.
    pub(crate) fn end_packet_list(&self, packet_list: Handle, sync: Handle) {
        let list = self.packet_lists.free(packet_list);
        self.backend.command_buffer_end(list.command_buffer, sync);
    }

    /// Records `packets` into the packet list's command buffer, coalescing
    /// unchanged state.
    pub(crate) fn add_packets(&self, packet_list: Handle, packets: &[Packet]) {
        let mut list = self.packet_lists.with(packet_list, Clone::clone);
        let backend = self.backend.as_ref();
        let command_buffer = list.command_buffer;

        for packet in packets {
            if packet.perf_query_start.is_valid() {
                backend.issue_timestamp_query(command_buffer, packet.perf_query_start);
            }

            let depth_stencil = if packet.depth_stencil_state.is_valid() {
                packet.depth_stencil_state
            } else {
                list.def_depth_stencil_state
            };
            let sampler = if packet.sampler_state.is_valid() {
                packet.sampler_state
            } else {
                list.def_sampler_state
            };

            if packet.pipeline_state != list.cur_pipeline_state
                || packet.vertex_layout != list.cur_vertex_layout
            {
                backend.set_pipeline_state(command_buffer, packet.pipeline_state, packet.vertex_layout);
                list.cur_pipeline_state = packet.pipeline_state;
                list.cur_vertex_layout = packet.vertex_layout;
            }

            if depth_stencil != list.cur_depth_stencil_state {
                backend.set_depth_stencil_state(command_buffer, depth_stencil);
                list.cur_depth_stencil_state = depth_stencil;
            }

            if sampler != list.cur_sampler_state {
                backend.set_sampler_state(command_buffer, sampler);
                list.cur_sampler_state = sampler;
            }

            if packet.cull_mode != list.cur_cull_mode {
                let mode = if list.invert_culling {
                    packet.cull_mode.inverted()
                } else {
                    packet.cull_mode
                };
                backend.set_cull_mode(command_buffer, mode);
                list.cur_cull_mode = packet.cull_mode;
            }

            for stream in 0..packet.vertex_stream_count as usize {
                if packet.vertex_streams[stream] != list.cur_vertex_streams[stream] {
                    backend.set_vertex_data(
                        command_buffer,
                        packet.vertex_streams[stream],
                        stream as u32,
                    );
                    list.cur_vertex_streams[stream] = packet.vertex_streams[stream];
                }
            }

            if packet.index_buffer.is_valid() {
                backend.set_indices(command_buffer, packet.index_buffer);
            }

            for index in 0..packet.vertex_const_count as usize {
                backend.set_vertex_const_buffer(
                    command_buffer,
                    index as u32,
                    packet.vertex_const[index],
                );
            }
            for index in 0..packet.fragment_const_count as usize {
                backend.set_fragment_const_buffer(
                    command_buffer,
                    index as u32,
                    packet.fragment_const[index],
                );
            }

            if packet.texture_set != list.cur_texture_set {
                if packet.texture_set.is_valid() {
                    let (fragment, fragment_count, vertex, vertex_count) =
                        self.texture_sets.with(packet.texture_set, |set| {
                            (
                                set.fragment_textures,
                                set.fragment_texture_count,
                                set.vertex_textures,
                                set.vertex_texture_count,
                            )
                        });
                    for unit in 0..fragment_count as usize {
                        backend.set_fragment_texture(command_buffer, unit as u32, fragment[unit]);
                    }
                    for unit in 0..vertex_count as usize {
                        backend.set_vertex_texture(command_buffer, unit as u32, vertex[unit]);
                    }
                }
                list.cur_texture_set = packet.texture_set;
            }

            if packet.options.contains(PacketOptions::OVERRIDE_SCISSOR) {
                backend.set_scissor_rect(command_buffer, packet.scissor_rect);
                list.restore_def_scissor_rect = true;
            } else if list.restore_def_scissor_rect {
                backend.set_scissor_rect(command_buffer, list.def_scissor_rect);
                list.restore_def_scissor_rect = false;
            }

            if packet.options.contains(PacketOptions::WIREFRAME) {
                backend.set_fill_mode(command_buffer, FillMode::Wireframe);
                list.restore_solid_fill = true;
            } else if list.restore_solid_fill {
                backend.set_fill_mode(command_buffer, FillMode::Solid);
                list.restore_solid_fill = false;
            }

            if packet.query_index != INVALID_QUERY_INDEX {
                backend.set_query_index(command_buffer, packet.query_index);
            }

            if packet.instance_count > 0 {
                if packet.index_buffer.is_valid() {
                    debug_assert!(packet.vertex_count > 0, "indexed draw needs vertex_count");
                    backend.draw_instanced_indexed_primitive(
                        command_buffer,
                        packet.primitive_type,
                        packet.instance_count,
                        packet.primitive_count,
                        packet.vertex_count,
                        packet.base_vertex,
                        packet.start_index,
                        packet.base_instance,
                    );
                } else {
                    backend.draw_instanced_primitive(
                        command_buffer,
                        packet.primitive_type,
                        packet.instance_count,
                        packet.primitive_count,
                    );
                }
            } else if packet.index_buffer.is_valid() {
                debug_assert!(packet.vertex_count > 0, "indexed draw needs vertex_count");
                backend.draw_indexed_primitive(
                    command_buffer,
                    packet.primitive_type,
                    packet.primitive_count,
                    packet.vertex_count,
                    packet.base_vertex,
                    packet.start_index,
                );
            } else {
                backend.draw_primitive(
                    command_buffer,
                    packet.primitive_type,
                    packet.primitive_count,
                );
            }

            if packet.perf_query_end.is_valid() {
                backend.issue_timestamp_query(command_buffer, packet.perf_query_end);
            }

            list.batch_index += 1;
        }

        self.packet_lists
            .with_mut(packet_list, |slot| *slot = list);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::RenderConfig;
    use crate::null_backend::NullBackend;
    use crate::system::RenderSystem;
    use crate::types::TextureSetDescriptor;

    fn inline_system() -> (RenderSystem, Arc<NullBackend>) {
        let backend = Arc::new(NullBackend::new());
        let system = RenderSystem::new(backend.clone(), RenderConfig::inline()).unwrap();
        (system, backend)
    }

    fn open_packet_list(system: &RenderSystem) -> Handle {
        let (_, lists) = system
            .allocate_render_pass(&RenderPassConfig::default(), 1)
            .unwrap();
        system.begin_packet_list(lists[0]);
        lists[0]
    }

    #[test]
    fn test_identical_packets_coalesce_state() {
        let (system, backend) = inline_system();
        let pipeline = system
            .create_pipeline_state(&crate::types::PipelineStateDescriptor::default())
            .unwrap();
        let texture = system
            .create_texture(&crate::types::TextureDescriptor::default())
            .unwrap();
        let texture_set = system.acquire_texture_set(&TextureSetDescriptor::single(texture));

        let list = open_packet_list(&system);
        let before = backend.stats();

        let packet = Packet {
            pipeline_state: pipeline,
            texture_set,
            primitive_count: 2,
            ..Packet::default()
        };
        system.add_packets(list, &[packet.clone(), packet]);

        let after = backend.stats();
        // Pipeline and texture set were each emitted exactly once for the
        // two identical packets; both draws still happened.
        assert_eq!(after.pipeline_state_changes - before.pipeline_state_changes, 1);
        assert_eq!(after.fragment_texture_binds - before.fragment_texture_binds, 1);
        assert_eq!(after.draws - before.draws, 2);
        // Depth/stencil and sampler resolved to the pass defaults, which
        // `begin_packet_list` already set.
        assert_eq!(after.depth_stencil_changes, before.depth_stencil_changes);
        assert_eq!(after.sampler_changes, before.sampler_changes);
    }

    #[test]
    fn test_state_change_is_emitted_once_per_transition() {
        let (system, backend) = inline_system();
        let pipeline_a = system
            .create_pipeline_state(&crate::types::PipelineStateDescriptor::default())
            .unwrap();
        let pipeline_b = system
            .create_pipeline_state(&crate::types::PipelineStateDescriptor::default())
            .unwrap();

        let list = open_packet_list(&system);
        let before = backend.stats();

        let packet_a = Packet {
            pipeline_state: pipeline_a,
            primitive_count: 1,
            ..Packet::default()
        };
        let packet_b = Packet {
            pipeline_state: pipeline_b,
            primitive_count: 1,
            ..Packet::default()
        };
        system.add_packets(
            list,
            &[packet_a.clone(), packet_a.clone(), packet_b, packet_a],
        );

        let after = backend.stats();
        assert_eq!(after.pipeline_state_changes - before.pipeline_state_changes, 3);
        assert_eq!(after.draws - before.draws, 4);
    }

    #[test]
    fn test_const_buffers_are_never_coalesced() {
        let (system, backend) = inline_system();
        let pipeline = system
            .create_pipeline_state(&crate::types::PipelineStateDescriptor::default())
            .unwrap();
        let const_buffer = system.create_vertex_const_buffer(pipeline, 0).unwrap();

        let list = open_packet_list(&system);
        let before = backend.stats();

        let mut packet = Packet {
            pipeline_state: pipeline,
            primitive_count: 1,
            ..Packet::default()
        };
        packet.vertex_const_count = 1;
        packet.vertex_const[0] = const_buffer;
        system.add_packets(list, &[packet.clone(), packet]);

        let after = backend.stats();
        assert_eq!(after.vertex_const_binds - before.vertex_const_binds, 2);
    }

    #[test]
    fn test_scissor_override_is_restored_after_one_packet() {
        let (system, backend) = inline_system();
        let list = open_packet_list(&system);
        let before = backend.stats();

        let plain = Packet {
            primitive_count: 1,
            ..Packet::default()
        };
        let mut scissored = plain.clone();
        scissored.options = PacketOptions::OVERRIDE_SCISSOR;
        scissored.scissor_rect = ScissorRect {
            x: 1,
            y: 1,
            width: 4,
            height: 4,
        };

        system.add_packets(list, &[scissored, plain.clone(), plain]);

        let after = backend.stats();
        // One override, one restore, and no further scissor traffic.
        assert_eq!(after.scissor_changes - before.scissor_changes, 2);
    }

    #[test]
    fn test_wireframe_fill_mode_auto_restores() {
        let (system, backend) = inline_system();
        let list = open_packet_list(&system);
        let before = backend.stats();

        let plain = Packet {
            primitive_count: 1,
            ..Packet::default()
        };
        let mut wire = plain.clone();
        wire.options = PacketOptions::WIREFRAME;

        system.add_packets(list, &[wire, plain.clone(), plain]);

        let after = backend.stats();
        assert_eq!(after.fill_mode_changes - before.fill_mode_changes, 2);
    }

    #[test]
    fn test_inverted_culling_flips_winding() {
        let (system, backend) = inline_system();
        let config = RenderPassConfig {
            invert_culling: true,
            ..RenderPassConfig::default()
        };
        let (_, lists) = system.allocate_render_pass(&config, 1).unwrap();
        system.begin_packet_list(lists[0]);

        let packet = Packet {
            cull_mode: CullMode::Clockwise,
            primitive_count: 1,
            ..Packet::default()
        };
        system.add_packets(lists[0], &[packet]);

        let log = backend.cull_mode_log();
        // begin_packet_list sets None; the packet's clockwise request goes
        // out counter-clockwise because the pass renders into a flipped
        // target.
        assert_eq!(log.last(), Some(&CullMode::CounterClockwise));
    }

    #[test]
    fn test_vertex_streams_are_diffed_per_slot() {
        let (system, backend) = inline_system();
        let buffer_a = system
            .create_vertex_buffer(&crate::types::VertexBufferDescriptor {
                size: 64,
                ..Default::default()
            })
            .unwrap();
        let buffer_b = system
            .create_vertex_buffer(&crate::types::VertexBufferDescriptor {
                size: 64,
                ..Default::default()
            })
            .unwrap();

        let list = open_packet_list(&system);
        let before = backend.stats();

        let mut packet = Packet {
            primitive_count: 1,
            ..Packet::default()
        };
        packet.vertex_stream_count = 1;
        packet.vertex_streams[0] = buffer_a;
        let mut changed = packet.clone();
        changed.vertex_streams[0] = buffer_b;

        system.add_packets(list, &[packet.clone(), packet, changed]);

        let after = backend.stats();
        assert_eq!(after.vertex_data_binds - before.vertex_data_binds, 2);
    }

    #[test]
    fn test_render_pass_command_buffer_count_is_bounded() {
        let (system, _) = inline_system();
        assert!(system
            .allocate_render_pass(&RenderPassConfig::default(), 0)
            .is_err());
        assert!(system
            .allocate_render_pass(
                &RenderPassConfig::default(),
                (MAX_PASS_COMMAND_BUFFER_COUNT + 1) as u32
            )
            .is_err());
    }
}
