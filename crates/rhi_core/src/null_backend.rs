//! Headless backend
//!
//! `NullBackend` satisfies the full [`RenderBackend`] contract with no
//! native device behind it: resources are pool entries, draws are counter
//! increments, and fences signal the moment the frame that carries them is
//! executed or rejected. It exists so the scheduling core can run (and be
//! tested) without any real GPU — the core's correctness must never depend
//! on a backend-specific side effect.
//!
//! Every state-setting and draw entry point increments a counter readable
//! through [`NullBackend::stats`], which is what the coalescing and
//! lifetime tests observe.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use crate::backend::{BackendResult, FrameExecution, RenderBackend};
use crate::concurrency::lock;
use crate::config::PoolCapacities;
use crate::handle::{Handle, ResourceKind};
use crate::pool::HandlePool;
use crate::types::{
    CullMode, DepthStencilStateDescriptor, DeviceCaps, FillMode, IndexBufferDescriptor,
    PipelineStateDescriptor, PrimitiveType, RenderPassConfig, ResetParam, SamplerStateDescriptor,
    ScissorRect, TextureDescriptor, TextureFace, VertexBufferDescriptor, Viewport,
};

struct NullBuffer {
    size: u32,
}

struct NullConstBuffer {
    #[allow(dead_code)]
    pipeline_state: Handle,
    #[allow(dead_code)]
    slot: u32,
}

struct NullTexture {
    #[allow(dead_code)]
    width: u32,
    #[allow(dead_code)]
    height: u32,
}

struct NullRenderPass {
    command_buffers: Vec<Handle>,
}

struct NullCommandBuffer {
    sync: Handle,
}

struct NullSyncObject {
    signaled: bool,
}

struct NullQueryBuffer {
    #[allow(dead_code)]
    max_object_count: u32,
}

struct NullPerfQuery {
    ready: bool,
}

#[derive(Default)]
struct Counters {
    pipeline_state_changes: AtomicU32,
    depth_stencil_changes: AtomicU32,
    sampler_changes: AtomicU32,
    cull_mode_changes: AtomicU32,
    scissor_changes: AtomicU32,
    fill_mode_changes: AtomicU32,
    vertex_data_binds: AtomicU32,
    index_binds: AtomicU32,
    vertex_texture_binds: AtomicU32,
    fragment_texture_binds: AtomicU32,
    vertex_const_binds: AtomicU32,
    fragment_const_binds: AtomicU32,
    draws: AtomicU32,
    frames_executed: AtomicU32,
    frames_rejected: AtomicU32,
    presents: AtomicU32,
    resets: AtomicU32,
}

/// Snapshot of the backend call counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBackendStats {
    /// `set_pipeline_state` calls
    pub pipeline_state_changes: u32,
    /// `set_depth_stencil_state` calls
    pub depth_stencil_changes: u32,
    /// `set_sampler_state` calls
    pub sampler_changes: u32,
    /// `set_cull_mode` calls
    pub cull_mode_changes: u32,
    /// `set_scissor_rect` calls
    pub scissor_changes: u32,
    /// `set_fill_mode` calls
    pub fill_mode_changes: u32,
    /// `set_vertex_data` calls
    pub vertex_data_binds: u32,
    /// `set_indices` calls
    pub index_binds: u32,
    /// `set_vertex_texture` calls
    pub vertex_texture_binds: u32,
    /// `set_fragment_texture` calls
    pub fragment_texture_binds: u32,
    /// `set_vertex_const_buffer` calls
    pub vertex_const_binds: u32,
    /// `set_fragment_const_buffer` calls
    pub fragment_const_binds: u32,
    /// Draw calls of any flavor
    pub draws: u32,
    /// Frames executed
    pub frames_executed: u32,
    /// Frames rejected
    pub frames_rejected: u32,
    /// Buffer flips
    pub presents: u32,
    /// `reset_block` completions
    pub resets: u32,
}

/// Backend implementation with no device behind it.
pub struct NullBackend {
    vertex_buffers: HandlePool<NullBuffer>,
    index_buffers: HandlePool<NullBuffer>,
    const_buffers: HandlePool<NullConstBuffer>,
    textures: HandlePool<NullTexture>,
    pipeline_states: HandlePool<PipelineStateDescriptor>,
    depth_stencil_states: HandlePool<DepthStencilStateDescriptor>,
    sampler_states: HandlePool<SamplerStateDescriptor>,
    render_passes: HandlePool<NullRenderPass>,
    command_buffers: HandlePool<NullCommandBuffer>,
    sync_objects: HandlePool<NullSyncObject>,
    query_buffers: HandlePool<NullQueryBuffer>,
    perf_queries: HandlePool<NullPerfQuery>,
    counters: Counters,
    surface_valid: AtomicBool,
    present_result: AtomicBool,
    pending_reset: Mutex<Option<ResetParam>>,
    executed_frames: Mutex<Vec<FrameExecution>>,
    cull_mode_log: Mutex<Vec<CullMode>>,
}

impl NullBackend {
    /// Creates a null backend with default pool capacities.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacities(&PoolCapacities::default())
    }

    /// Creates a null backend with explicit pool capacities.
    #[must_use]
    pub fn with_capacities(pools: &PoolCapacities) -> Self {
        Self {
            vertex_buffers: HandlePool::new(ResourceKind::VertexBuffer, pools.vertex_buffers),
            index_buffers: HandlePool::new(ResourceKind::IndexBuffer, pools.index_buffers),
            const_buffers: HandlePool::new(ResourceKind::ConstBuffer, pools.const_buffers),
            textures: HandlePool::new(ResourceKind::Texture, pools.textures),
            pipeline_states: HandlePool::new(ResourceKind::PipelineState, pools.pipeline_states),
            depth_stencil_states: HandlePool::new(
                ResourceKind::DepthStencilState,
                pools.depth_stencil_states,
            ),
            sampler_states: HandlePool::new(ResourceKind::SamplerState, pools.sampler_states),
            render_passes: HandlePool::new(ResourceKind::RenderPass, pools.render_passes),
            command_buffers: HandlePool::new(ResourceKind::CommandBuffer, pools.command_buffers),
            sync_objects: HandlePool::new(ResourceKind::SyncObject, pools.sync_objects),
            query_buffers: HandlePool::new(ResourceKind::QueryBuffer, pools.query_buffers),
            perf_queries: HandlePool::new(ResourceKind::PerfQuery, pools.perf_queries),
            counters: Counters::default(),
            surface_valid: AtomicBool::new(true),
            present_result: AtomicBool::new(true),
            pending_reset: Mutex::new(None),
            executed_frames: Mutex::new(Vec::new()),
            cull_mode_log: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of the call counters.
    pub fn stats(&self) -> NullBackendStats {
        let c = &self.counters;
        NullBackendStats {
            pipeline_state_changes: c.pipeline_state_changes.load(Ordering::Relaxed),
            depth_stencil_changes: c.depth_stencil_changes.load(Ordering::Relaxed),
            sampler_changes: c.sampler_changes.load(Ordering::Relaxed),
            cull_mode_changes: c.cull_mode_changes.load(Ordering::Relaxed),
            scissor_changes: c.scissor_changes.load(Ordering::Relaxed),
            fill_mode_changes: c.fill_mode_changes.load(Ordering::Relaxed),
            vertex_data_binds: c.vertex_data_binds.load(Ordering::Relaxed),
            index_binds: c.index_binds.load(Ordering::Relaxed),
            vertex_texture_binds: c.vertex_texture_binds.load(Ordering::Relaxed),
            fragment_texture_binds: c.fragment_texture_binds.load(Ordering::Relaxed),
            vertex_const_binds: c.vertex_const_binds.load(Ordering::Relaxed),
            fragment_const_binds: c.fragment_const_binds.load(Ordering::Relaxed),
            draws: c.draws.load(Ordering::Relaxed),
            frames_executed: c.frames_executed.load(Ordering::Relaxed),
            frames_rejected: c.frames_rejected.load(Ordering::Relaxed),
            presents: c.presents.load(Ordering::Relaxed),
            resets: c.resets.load(Ordering::Relaxed),
        }
    }

    /// Makes `validate_surface` report the given state (device-loss test
    /// hook).
    pub fn set_surface_valid(&self, valid: bool) {
        self.surface_valid.store(valid, Ordering::Relaxed);
    }

    /// Makes `present_buffer` report the given result (device-loss test
    /// hook).
    pub fn set_present_result(&self, result: bool) {
        self.present_result.store(result, Ordering::Relaxed);
    }

    /// Number of live texture objects (lifetime assertions in tests).
    pub fn live_textures(&self) -> usize {
        self.textures.live_count()
    }

    /// Number of live vertex buffers.
    pub fn live_vertex_buffers(&self) -> usize {
        self.vertex_buffers.live_count()
    }

    /// Number of live depth/stencil state objects.
    pub fn live_depth_stencil_states(&self) -> usize {
        self.depth_stencil_states.live_count()
    }

    /// Number of live sampler state objects.
    pub fn live_sampler_states(&self) -> usize {
        self.sampler_states.live_count()
    }

    /// Number of live sync objects.
    pub fn live_sync_objects(&self) -> usize {
        self.sync_objects.live_count()
    }

    /// Every frame executed so far, in execution order (pass ordering
    /// assertions in tests).
    pub fn executed_frames(&self) -> Vec<FrameExecution> {
        lock(&self.executed_frames).clone()
    }

    /// Every cull mode set so far, in call order (winding inversion
    /// assertions in tests).
    pub fn cull_mode_log(&self) -> Vec<CullMode> {
        lock(&self.cull_mode_log).clone()
    }

    fn signal_sync(&self, sync: Handle) {
        if sync.is_valid() {
            self.sync_objects.with_mut(sync, |s| s.signaled = true);
        }
    }

    fn retire_frame(&self, frame: &FrameExecution) {
        for &pass in &frame.passes {
            let pass_data = self.render_passes.free(pass);
            for command_buffer in pass_data.command_buffers {
                let cb = self.command_buffers.free(command_buffer);
                self.signal_sync(cb.sync);
            }
        }
        self.signal_sync(frame.sync);
        for query in [frame.perf_query_start, frame.perf_query_end] {
            if query.is_valid() {
                self.perf_queries.with_mut(query, |q| q.ready = true);
            }
        }
    }

    fn count(counter: &AtomicU32) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

impl Default for NullBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderBackend for NullBackend {
    fn init_context(&self) -> BackendResult<()> {
        Ok(())
    }

    fn validate_surface(&self) -> bool {
        self.surface_valid.load(Ordering::Relaxed)
    }

    fn finish_rendering(&self) {}

    fn reset(&self, param: &ResetParam) {
        *lock(&self.pending_reset) = Some(*param);
    }

    fn reset_block(&self) -> BackendResult<()> {
        lock(&self.pending_reset).take();
        self.surface_valid.store(true, Ordering::Relaxed);
        self.present_result.store(true, Ordering::Relaxed);
        Self::count(&self.counters.resets);
        Ok(())
    }

    fn present_buffer(&self) -> bool {
        Self::count(&self.counters.presents);
        self.present_result.load(Ordering::Relaxed)
    }

    fn device_caps(&self) -> DeviceCaps {
        DeviceCaps {
            max_anisotropy: 16,
            max_texture_size: 16384,
            is_32bit_indices_supported: true,
            is_instancing_supported: true,
            is_perf_query_supported: true,
            device_description: "null renderer".to_string(),
        }
    }

    fn needs_restore_resources(&self) -> bool {
        false
    }

    fn uninitialize(&self) {}

    fn execute_frame(&self, frame: &FrameExecution) -> BackendResult<()> {
        lock(&self.executed_frames).push(frame.clone());
        self.retire_frame(frame);
        Self::count(&self.counters.frames_executed);
        Ok(())
    }

    fn reject_frame(&self, frame: &FrameExecution) {
        self.retire_frame(frame);
        Self::count(&self.counters.frames_rejected);
    }

    fn allocate_render_pass(
        &self,
        _config: &RenderPassConfig,
        command_buffer_count: u32,
    ) -> BackendResult<(Handle, Vec<Handle>)> {
        let command_buffers: Vec<Handle> = (0..command_buffer_count)
            .map(|_| {
                self.command_buffers.alloc(NullCommandBuffer {
                    sync: Handle::INVALID,
                })
            })
            .collect();
        let pass = self.render_passes.alloc(NullRenderPass {
            command_buffers: command_buffers.clone(),
        });
        Ok((pass, command_buffers))
    }

    fn begin_render_pass(&self, _pass: Handle) {}

    fn end_render_pass(&self, _pass: Handle) {}

    fn command_buffer_begin(&self, _command_buffer: Handle) {}

    fn command_buffer_end(&self, command_buffer: Handle, sync: Handle) {
        self.command_buffers
            .with_mut(command_buffer, |cb| cb.sync = sync);
    }

    fn set_pipeline_state(
        &self,
        _command_buffer: Handle,
        _pipeline_state: Handle,
        _vertex_layout: u32,
    ) {
        Self::count(&self.counters.pipeline_state_changes);
    }

    fn set_cull_mode(&self, _command_buffer: Handle, mode: CullMode) {
        lock(&self.cull_mode_log).push(mode);
        Self::count(&self.counters.cull_mode_changes);
    }

    fn set_scissor_rect(&self, _command_buffer: Handle, _rect: ScissorRect) {
        Self::count(&self.counters.scissor_changes);
    }

    fn set_viewport(&self, _command_buffer: Handle, _viewport: Viewport) {}

    fn set_fill_mode(&self, _command_buffer: Handle, _mode: FillMode) {
        Self::count(&self.counters.fill_mode_changes);
    }

    fn set_vertex_data(&self, _command_buffer: Handle, _vertex_buffer: Handle, _stream: u32) {
        Self::count(&self.counters.vertex_data_binds);
    }

    fn set_vertex_const_buffer(&self, _command_buffer: Handle, _index: u32, _buffer: Handle) {
        Self::count(&self.counters.vertex_const_binds);
    }

    fn set_fragment_const_buffer(&self, _command_buffer: Handle, _index: u32, _buffer: Handle) {
        Self::count(&self.counters.fragment_const_binds);
    }

    fn set_vertex_texture(&self, _command_buffer: Handle, _unit: u32, _texture: Handle) {
        Self::count(&self.counters.vertex_texture_binds);
    }

    fn set_fragment_texture(&self, _command_buffer: Handle, _unit: u32, _texture: Handle) {
        Self::count(&self.counters.fragment_texture_binds);
    }

    fn set_indices(&self, _command_buffer: Handle, _index_buffer: Handle) {
        Self::count(&self.counters.index_binds);
    }

    fn set_depth_stencil_state(&self, _command_buffer: Handle, _state: Handle) {
        Self::count(&self.counters.depth_stencil_changes);
    }

    fn set_sampler_state(&self, _command_buffer: Handle, _state: Handle) {
        Self::count(&self.counters.sampler_changes);
    }

    fn set_query_buffer(&self, _command_buffer: Handle, _query_buffer: Handle) {}

    fn set_query_index(&self, _command_buffer: Handle, _index: u32) {}

    fn issue_timestamp_query(&self, _command_buffer: Handle, perf_query: Handle) {
        self.perf_queries.with_mut(perf_query, |q| q.ready = true);
    }

    fn draw_primitive(&self, _command_buffer: Handle, _primitive: PrimitiveType, _count: u32) {
        Self::count(&self.counters.draws);
    }

    fn draw_indexed_primitive(
        &self,
        _command_buffer: Handle,
        _primitive: PrimitiveType,
        _primitive_count: u32,
        _vertex_count: u32,
        _base_vertex: u32,
        _start_index: u32,
    ) {
        Self::count(&self.counters.draws);
    }

    fn draw_instanced_primitive(
        &self,
        _command_buffer: Handle,
        _primitive: PrimitiveType,
        _instance_count: u32,
        _primitive_count: u32,
    ) {
        Self::count(&self.counters.draws);
    }

    fn draw_instanced_indexed_primitive(
        &self,
        _command_buffer: Handle,
        _primitive: PrimitiveType,
        _instance_count: u32,
        _primitive_count: u32,
        _vertex_count: u32,
        _base_vertex: u32,
        _start_index: u32,
        _base_instance: u32,
    ) {
        Self::count(&self.counters.draws);
    }

    fn create_vertex_buffer(&self, desc: &VertexBufferDescriptor) -> BackendResult<Handle> {
        Ok(self.vertex_buffers.alloc(NullBuffer { size: desc.size }))
    }

    fn update_vertex_buffer(&self, buffer: Handle, data: &[u8], offset: u32) -> BackendResult<()> {
        self.vertex_buffers.with(buffer, |b| {
            debug_assert!(offset as usize + data.len() <= b.size as usize);
        });
        Ok(())
    }

    fn delete_vertex_buffer(&self, buffer: Handle) {
        self.vertex_buffers.free(buffer);
    }

    fn create_index_buffer(&self, desc: &IndexBufferDescriptor) -> BackendResult<Handle> {
        Ok(self.index_buffers.alloc(NullBuffer { size: desc.size }))
    }

    fn update_index_buffer(&self, buffer: Handle, data: &[u8], offset: u32) -> BackendResult<()> {
        self.index_buffers.with(buffer, |b| {
            debug_assert!(offset as usize + data.len() <= b.size as usize);
        });
        Ok(())
    }

    fn delete_index_buffer(&self, buffer: Handle) {
        self.index_buffers.free(buffer);
    }

    fn create_texture(&self, desc: &TextureDescriptor) -> BackendResult<Handle> {
        Ok(self.textures.alloc(NullTexture {
            width: desc.width,
            height: desc.height,
        }))
    }

    fn update_texture(
        &self,
        texture: Handle,
        _data: &[u8],
        _level: u32,
        _face: TextureFace,
    ) -> BackendResult<()> {
        self.textures.with(texture, |_| ());
        Ok(())
    }

    fn delete_texture(&self, texture: Handle) {
        self.textures.free(texture);
    }

    fn create_pipeline_state(&self, desc: &PipelineStateDescriptor) -> BackendResult<Handle> {
        Ok(self.pipeline_states.alloc(desc.clone()))
    }

    fn delete_pipeline_state(&self, pipeline_state: Handle) {
        self.pipeline_states.free(pipeline_state);
    }

    fn create_vertex_const_buffer(
        &self,
        pipeline_state: Handle,
        index: u32,
    ) -> BackendResult<Handle> {
        Ok(self.const_buffers.alloc(NullConstBuffer {
            pipeline_state,
            slot: index,
        }))
    }

    fn create_fragment_const_buffer(
        &self,
        pipeline_state: Handle,
        index: u32,
    ) -> BackendResult<Handle> {
        Ok(self.const_buffers.alloc(NullConstBuffer {
            pipeline_state,
            slot: index,
        }))
    }

    fn update_const_buffer(&self, buffer: Handle, _offset: u32, _data: &[f32]) -> BackendResult<()> {
        self.const_buffers.with(buffer, |_| ());
        Ok(())
    }

    fn delete_const_buffer(&self, buffer: Handle) {
        self.const_buffers.free(buffer);
    }

    fn create_depth_stencil_state(
        &self,
        desc: &DepthStencilStateDescriptor,
    ) -> BackendResult<Handle> {
        Ok(self.depth_stencil_states.alloc(*desc))
    }

    fn delete_depth_stencil_state(&self, state: Handle) {
        self.depth_stencil_states.free(state);
    }

    fn create_sampler_state(&self, desc: &SamplerStateDescriptor) -> BackendResult<Handle> {
        Ok(self.sampler_states.alloc(*desc))
    }

    fn delete_sampler_state(&self, state: Handle) {
        self.sampler_states.free(state);
    }

    fn create_query_buffer(&self, max_object_count: u32) -> BackendResult<Handle> {
        Ok(self
            .query_buffers
            .alloc(NullQueryBuffer { max_object_count }))
    }

    fn reset_query_buffer(&self, query_buffer: Handle) {
        self.query_buffers.with(query_buffer, |_| ());
    }

    fn delete_query_buffer(&self, query_buffer: Handle) {
        self.query_buffers.free(query_buffer);
    }

    fn query_buffer_is_ready(&self, query_buffer: Handle) -> bool {
        self.query_buffers.is_alive(query_buffer)
    }

    fn query_value(&self, _query_buffer: Handle, _index: u32) -> i32 {
        0
    }

    fn create_perf_query(&self) -> BackendResult<Handle> {
        Ok(self.perf_queries.alloc(NullPerfQuery { ready: false }))
    }

    fn delete_perf_query(&self, perf_query: Handle) {
        self.perf_queries.free(perf_query);
    }

    fn reset_perf_query(&self, perf_query: Handle) {
        self.perf_queries.with_mut(perf_query, |q| q.ready = false);
    }

    fn perf_query_is_ready(&self, perf_query: Handle) -> bool {
        self.perf_queries.with(perf_query, |q| q.ready)
    }

    fn perf_query_value(&self, perf_query: Handle) -> u64 {
        self.perf_queries.with(perf_query, |q| u64::from(q.ready))
    }

    fn create_sync_object(&self) -> BackendResult<Handle> {
        Ok(self.sync_objects.alloc(NullSyncObject { signaled: false }))
    }

    fn delete_sync_object(&self, sync: Handle) {
        self.sync_objects.free(sync);
    }

    fn sync_object_signaled(&self, sync: Handle) -> bool {
        if !self.sync_objects.is_alive(sync) {
            // One-shot fences are released once their deletion bucket
            // drains; a stale handle refers to a fence that had already
            // signaled when it was released.
            return sync.is_valid();
        }
        self.sync_objects.with(sync, |s| s.signaled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_signals_frame_and_command_buffer_fences() {
        let backend = NullBackend::new();
        let (pass, cbs) = backend
            .allocate_render_pass(&RenderPassConfig::default(), 2)
            .unwrap();

        let frame_sync = backend.create_sync_object().unwrap();
        let cb_sync = backend.create_sync_object().unwrap();
        backend.command_buffer_end(cbs[0], cb_sync);
        backend.command_buffer_end(cbs[1], Handle::INVALID);

        let frame = FrameExecution {
            passes: vec![pass],
            sync: frame_sync,
            perf_query_start: Handle::INVALID,
            perf_query_end: Handle::INVALID,
            frame_number: 1,
        };
        assert!(!backend.sync_object_signaled(frame_sync));
        backend.execute_frame(&frame).unwrap();

        assert!(backend.sync_object_signaled(frame_sync));
        assert!(backend.sync_object_signaled(cb_sync));
        assert_eq!(backend.stats().frames_executed, 1);
    }

    #[test]
    fn test_reject_still_signals_fences() {
        let backend = NullBackend::new();
        let (pass, cbs) = backend
            .allocate_render_pass(&RenderPassConfig::default(), 1)
            .unwrap();
        let cb_sync = backend.create_sync_object().unwrap();
        backend.command_buffer_end(cbs[0], cb_sync);

        let frame = FrameExecution {
            passes: vec![pass],
            sync: Handle::INVALID,
            perf_query_start: Handle::INVALID,
            perf_query_end: Handle::INVALID,
            frame_number: 1,
        };
        backend.reject_frame(&frame);

        assert!(backend.sync_object_signaled(cb_sync));
        assert_eq!(backend.stats().frames_rejected, 1);
        assert_eq!(backend.stats().frames_executed, 0);
    }

    #[test]
    fn test_perf_query_lifecycle() {
        let backend = NullBackend::new();
        let query = backend.create_perf_query().unwrap();
        assert!(!backend.perf_query_is_ready(query));

        let (_, cbs) = backend
            .allocate_render_pass(&RenderPassConfig::default(), 1)
            .unwrap();
        backend.issue_timestamp_query(cbs[0], query);
        assert!(backend.perf_query_is_ready(query));

        backend.reset_perf_query(query);
        assert!(!backend.perf_query_is_ready(query));
        backend.delete_perf_query(query);
    }
}
