//! Backend abstraction for the scheduling core
//!
//! This module defines the trait that graphics backends must implement.
//! The scheduling core calls only through [`RenderBackend`]; a concrete
//! backend (a native API implementation, or [`crate::NullBackend`] for
//! headless runs) is installed once at system start-up and never swapped.
//!
//! The contract mirrors the split of responsibilities in the core:
//!
//! - The backend owns every native object and hands out pool handles.
//! - `execute_frame` is only ever called for a frame whose passes were
//!   fully recorded; `reject_frame` must still signal the frame's fences
//!   so no waiter deadlocks.
//! - Destroy operations are only called once the core has proven through
//!   its fence gating that no outstanding GPU work references the handle.

use crate::error::RenderError;
use crate::handle::Handle;
use crate::types::{
    CullMode, DepthStencilStateDescriptor, DeviceCaps, FillMode, IndexBufferDescriptor,
    PipelineStateDescriptor, PrimitiveType, RenderPassConfig, ResetParam, SamplerStateDescriptor,
    ScissorRect, TextureDescriptor, TextureFace, VertexBufferDescriptor, Viewport,
};

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, RenderError>;

/// One frame handed to the backend for execution or rejection.
///
/// Passes are already ordered: priority-sorted (stable, highest first) by
/// the frame pool before the backend sees them.
#[derive(Debug, Clone)]
pub struct FrameExecution {
    /// Render passes in execution order
    pub passes: Vec<Handle>,
    /// Fence to signal once all of the frame's work has retired
    pub sync: Handle,
    /// Timestamp query issued at frame start
    pub perf_query_start: Handle,
    /// Timestamp query issued at frame end
    pub perf_query_end: Handle,
    /// Monotonic frame number
    pub frame_number: u64,
}

/// A command that must run inside the executor's native context,
/// out-of-band with respect to the frame queue.
pub type ImmediateCommand = Box<dyn FnOnce(&dyn RenderBackend) + Send>;

/// Main rendering backend trait.
///
/// All methods take `&self`: a backend manages its own interior
/// synchronization, since command recording happens on producer threads
/// while execution happens on the render thread.
pub trait RenderBackend: Send + Sync {
    // === Lifecycle ===

    /// Bind the native context to the executing thread.
    ///
    /// Called exactly once, from the render thread in threaded mode or the
    /// constructing thread in inline mode, before any other call.
    fn init_context(&self) -> BackendResult<()>;

    /// Whether the output surface is currently usable.
    ///
    /// Frames are rejected instead of executed while this returns `false`.
    fn validate_surface(&self) -> bool;

    /// Drain all in-flight native work; called before the executor parks
    /// for suspension.
    fn finish_rendering(&self);

    /// Stage new device parameters for the next [`Self::reset_block`].
    fn reset(&self, param: &ResetParam);

    /// Re-initialize device state after frames were rejected.
    fn reset_block(&self) -> BackendResult<()>;

    /// Flip the swap chain. Returning `false` signals device loss.
    fn present_buffer(&self) -> bool;

    /// Capability report for the active device.
    fn device_caps(&self) -> DeviceCaps;

    /// Whether device-loss recovery left resources waiting to be restored.
    fn needs_restore_resources(&self) -> bool;

    /// Drop any native state caches (used when host code touches the
    /// native API behind the core's back).
    fn invalidate_cache(&self) {}

    /// Tear down the native device. Called once at system shutdown.
    fn uninitialize(&self);

    // === Frames ===

    /// Execute one fully recorded frame and signal its fences.
    fn execute_frame(&self, frame: &FrameExecution) -> BackendResult<()>;

    /// Discard one frame without executing it.
    ///
    /// Must still signal the frame's fence and every fence attached to its
    /// command buffers, and must release the frame's pass objects.
    fn reject_frame(&self, frame: &FrameExecution);

    // === Render passes ===

    /// Allocate a render pass and `command_buffer_count` command buffers
    /// for it.
    fn allocate_render_pass(
        &self,
        config: &RenderPassConfig,
        command_buffer_count: u32,
    ) -> BackendResult<(Handle, Vec<Handle>)>;

    /// Mark a pass as open for recording.
    fn begin_render_pass(&self, pass: Handle);

    /// Mark a pass as fully recorded.
    fn end_render_pass(&self, pass: Handle);

    // === Command encoding ===

    /// Open a command buffer for recording.
    fn command_buffer_begin(&self, command_buffer: Handle);

    /// Close a command buffer; `sync` (if valid) is signaled once the
    /// buffer's work retires.
    fn command_buffer_end(&self, command_buffer: Handle, sync: Handle);

    /// Bind a pipeline state and vertex layout.
    fn set_pipeline_state(&self, command_buffer: Handle, pipeline_state: Handle, vertex_layout: u32);

    /// Set the face culling mode.
    fn set_cull_mode(&self, command_buffer: Handle, mode: CullMode);

    /// Set the scissor rectangle (all-zero = target-sized).
    fn set_scissor_rect(&self, command_buffer: Handle, rect: ScissorRect);

    /// Set the viewport.
    fn set_viewport(&self, command_buffer: Handle, viewport: Viewport);

    /// Set the polygon fill mode.
    fn set_fill_mode(&self, command_buffer: Handle, mode: FillMode);

    /// Bind a vertex buffer to a stream slot.
    fn set_vertex_data(&self, command_buffer: Handle, vertex_buffer: Handle, stream: u32);

    /// Bind a vertex-stage constant buffer.
    fn set_vertex_const_buffer(&self, command_buffer: Handle, index: u32, buffer: Handle);

    /// Bind a fragment-stage constant buffer.
    fn set_fragment_const_buffer(&self, command_buffer: Handle, index: u32, buffer: Handle);

    /// Bind a vertex-stage texture.
    fn set_vertex_texture(&self, command_buffer: Handle, unit: u32, texture: Handle);

    /// Bind a fragment-stage texture.
    fn set_fragment_texture(&self, command_buffer: Handle, unit: u32, texture: Handle);

    /// Bind an index buffer.
    fn set_indices(&self, command_buffer: Handle, index_buffer: Handle);

    /// Bind a depth/stencil state object.
    fn set_depth_stencil_state(&self, command_buffer: Handle, state: Handle);

    /// Bind a sampler state object.
    fn set_sampler_state(&self, command_buffer: Handle, state: Handle);

    /// Bind the query buffer used by subsequent draws.
    fn set_query_buffer(&self, command_buffer: Handle, query_buffer: Handle);

    /// Select the query slot for subsequent draws.
    fn set_query_index(&self, command_buffer: Handle, index: u32);

    /// Record a timestamp into a performance query.
    fn issue_timestamp_query(&self, command_buffer: Handle, perf_query: Handle);

    /// Record a non-indexed draw.
    fn draw_primitive(&self, command_buffer: Handle, primitive: PrimitiveType, count: u32);

    /// Record an indexed draw.
    fn draw_indexed_primitive(
        &self,
        command_buffer: Handle,
        primitive: PrimitiveType,
        primitive_count: u32,
        vertex_count: u32,
        base_vertex: u32,
        start_index: u32,
    );

    /// Record an instanced, non-indexed draw.
    fn draw_instanced_primitive(
        &self,
        command_buffer: Handle,
        primitive: PrimitiveType,
        instance_count: u32,
        primitive_count: u32,
    );

    /// Record an instanced, indexed draw.
    fn draw_instanced_indexed_primitive(
        &self,
        command_buffer: Handle,
        primitive: PrimitiveType,
        instance_count: u32,
        primitive_count: u32,
        vertex_count: u32,
        base_vertex: u32,
        start_index: u32,
        base_instance: u32,
    );

    // === Buffers ===

    /// Create a vertex buffer.
    fn create_vertex_buffer(&self, desc: &VertexBufferDescriptor) -> BackendResult<Handle>;

    /// Overwrite a range of a vertex buffer.
    fn update_vertex_buffer(&self, buffer: Handle, data: &[u8], offset: u32) -> BackendResult<()>;

    /// Destroy a vertex buffer.
    fn delete_vertex_buffer(&self, buffer: Handle);

    /// Create an index buffer.
    fn create_index_buffer(&self, desc: &IndexBufferDescriptor) -> BackendResult<Handle>;

    /// Overwrite a range of an index buffer.
    fn update_index_buffer(&self, buffer: Handle, data: &[u8], offset: u32) -> BackendResult<()>;

    /// Destroy an index buffer.
    fn delete_index_buffer(&self, buffer: Handle);

    // === Textures ===

    /// Create a texture.
    fn create_texture(&self, desc: &TextureDescriptor) -> BackendResult<Handle>;

    /// Overwrite one mip level (and cube face) of a texture.
    fn update_texture(
        &self,
        texture: Handle,
        data: &[u8],
        level: u32,
        face: TextureFace,
    ) -> BackendResult<()>;

    /// Destroy a texture.
    fn delete_texture(&self, texture: Handle);

    // === Pipeline states & constant buffers ===

    /// Create a pipeline state object.
    fn create_pipeline_state(&self, desc: &PipelineStateDescriptor) -> BackendResult<Handle>;

    /// Destroy a pipeline state object.
    fn delete_pipeline_state(&self, pipeline_state: Handle);

    /// Create a vertex-stage constant buffer bound to a pipeline slot.
    fn create_vertex_const_buffer(&self, pipeline_state: Handle, index: u32)
        -> BackendResult<Handle>;

    /// Create a fragment-stage constant buffer bound to a pipeline slot.
    fn create_fragment_const_buffer(
        &self,
        pipeline_state: Handle,
        index: u32,
    ) -> BackendResult<Handle>;

    /// Overwrite a range of a constant buffer, in floats.
    fn update_const_buffer(&self, buffer: Handle, offset: u32, data: &[f32]) -> BackendResult<()>;

    /// Destroy a constant buffer.
    fn delete_const_buffer(&self, buffer: Handle);

    // === Shareable state objects ===

    /// Create a depth/stencil state object.
    fn create_depth_stencil_state(
        &self,
        desc: &DepthStencilStateDescriptor,
    ) -> BackendResult<Handle>;

    /// Destroy a depth/stencil state object.
    fn delete_depth_stencil_state(&self, state: Handle);

    /// Create a sampler state object.
    fn create_sampler_state(&self, desc: &SamplerStateDescriptor) -> BackendResult<Handle>;

    /// Destroy a sampler state object.
    fn delete_sampler_state(&self, state: Handle);

    // === Queries ===

    /// Create a query buffer with `max_object_count` slots.
    fn create_query_buffer(&self, max_object_count: u32) -> BackendResult<Handle>;

    /// Reset a query buffer for reuse.
    fn reset_query_buffer(&self, query_buffer: Handle);

    /// Destroy a query buffer.
    fn delete_query_buffer(&self, query_buffer: Handle);

    /// Whether every slot of the query buffer has a result available.
    fn query_buffer_is_ready(&self, query_buffer: Handle) -> bool;

    /// Result for one query slot (0 when not ready).
    fn query_value(&self, query_buffer: Handle, index: u32) -> i32;

    /// Create a timestamp performance query.
    fn create_perf_query(&self) -> BackendResult<Handle>;

    /// Destroy a performance query.
    fn delete_perf_query(&self, perf_query: Handle);

    /// Reset a performance query for reuse.
    fn reset_perf_query(&self, perf_query: Handle);

    /// Whether the performance query's timestamp is available.
    fn perf_query_is_ready(&self, perf_query: Handle) -> bool;

    /// The recorded timestamp value.
    fn perf_query_value(&self, perf_query: Handle) -> u64;

    // === Sync objects ===

    /// Create a GPU fence. It signals once all work recorded before it has
    /// retired; signaling is one-shot.
    fn create_sync_object(&self) -> BackendResult<Handle>;

    /// Destroy a fence.
    fn delete_sync_object(&self, sync: Handle);

    /// Non-blocking completion query for a fence.
    fn sync_object_signaled(&self, sync: Handle) -> bool;
}
