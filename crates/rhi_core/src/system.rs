//! Render system facade
//!
//! [`RenderSystem`] is the single scheduler object: constructed once with
//! a backend and a validated [`RenderConfig`], shared by reference between
//! producer threads, and torn down explicitly (or on drop). It owns the
//! frame ring, the resource catalogs, the scheduled-deletion buckets and,
//! in threaded mode, the one dedicated render thread.
//!
//! All scheduling state lives behind one `Arc` so the render thread and
//! the producers observe the same cursors and locks; nothing here is a
//! process-wide global.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread;

use crate::backend::RenderBackend;
use crate::concurrency::{AutoResetEvent, Semaphore};
use crate::config::RenderConfig;
use crate::error::{ErrorCallback, RenderError, RenderResult, RenderingFailure};
use crate::frame_pool::FramePool;
use crate::handle::{Handle, ResourceKind};
use crate::packet_list::PacketList;
use crate::pool::HandlePool;
use crate::render_loop::DeletionState;
use crate::resources::{SharedStateEntry, TextureSet, TextureSetEntry};
use crate::types::{
    DepthStencilStateDescriptor, DeviceCaps, IndexBufferDescriptor, Packet,
    PipelineStateDescriptor, RenderPassConfig, ResetParam, SamplerStateDescriptor,
    TextureDescriptor, TextureFace, TextureSetDescriptor, VertexBufferDescriptor,
    MAX_FRAGMENT_TEXTURE_COUNT, MAX_VERTEX_TEXTURE_COUNT,
};

/// Shared scheduler state; everything the render loop, packet submission
/// and acquisition layers operate on.
pub(crate) struct RenderCore {
    pub(crate) backend: Arc<dyn RenderBackend>,
    pub(crate) config: RenderConfig,
    pub(crate) frames: FramePool,
    pub(crate) packet_lists: HandlePool<PacketList>,
    pub(crate) texture_sets: HandlePool<TextureSet>,
    pub(crate) texture_set_catalog: Mutex<Vec<TextureSetEntry>>,
    pub(crate) depth_stencil_catalog: Mutex<Vec<SharedStateEntry<DepthStencilStateDescriptor>>>,
    pub(crate) sampler_catalog: Mutex<Vec<SharedStateEntry<SamplerStateDescriptor>>>,
    packet_defaults: OnceLock<(Handle, Handle)>,
    pub(crate) error_callback: Option<ErrorCallback>,

    pub(crate) frame_prepared: AutoResetEvent,
    pub(crate) frame_done: AutoResetEvent,
    pub(crate) reset_done: AutoResetEvent,
    pub(crate) thread_started: Semaphore,
    pub(crate) suspend_sync: Semaphore,
    pub(crate) suspend_reached: AtomicBool,
    pub(crate) suspended: AtomicBool,
    pub(crate) exit_pending: AtomicBool,
    pub(crate) reset_pending: AtomicBool,
    pub(crate) device_lost: AtomicBool,
    pub(crate) suspend_skip_frame: AtomicBool,
    pub(crate) frames_after_resume: AtomicU32,
    pub(crate) immediate_slot: Mutex<Option<crate::backend::ImmediateCommand>>,
    pub(crate) immediate_pending: AtomicBool,
    pub(crate) deletion: Mutex<DeletionState>,
}

impl RenderCore {
    /// Default depth/stencil and sampler states used when a packet leaves
    /// them unset. Created lazily on first packet list, through the seam.
    pub(crate) fn packet_defaults(&self) -> (Handle, Handle) {
        *self.packet_defaults.get_or_init(|| {
            let depth_stencil = self
                .backend
                .create_depth_stencil_state(&DepthStencilStateDescriptor::default())
                .unwrap_or_else(|error| {
                    log::error!("failed to create default depth-stencil state: {error}");
                    Handle::INVALID
                });
            let sampler_desc = SamplerStateDescriptor {
                fragment_sampler_count: MAX_FRAGMENT_TEXTURE_COUNT as u32,
                vertex_sampler_count: MAX_VERTEX_TEXTURE_COUNT as u32,
                ..SamplerStateDescriptor::default()
            };
            let sampler = self
                .backend
                .create_sampler_state(&sampler_desc)
                .unwrap_or_else(|error| {
                    log::error!("failed to create default sampler state: {error}");
                    Handle::INVALID
                });
            (depth_stencil, sampler)
        })
    }
}

/// Frame scheduling and GPU resource-lifetime engine.
///
/// One producer role records render passes and packets and calls
/// [`present`](Self::present); one executor role (inline or the dedicated
/// render thread, depending on configuration) executes finished frames
/// against the backend. See the crate documentation for the full model.
pub struct RenderSystem {
    core: Arc<RenderCore>,
    render_thread: Option<thread::JoinHandle<()>>,
    shut_down: bool,
}

impl RenderSystem {
    /// Creates the system over `backend` and starts the execution model
    /// selected by `config` (inline, or one render thread).
    pub fn new(backend: Arc<dyn RenderBackend>, config: RenderConfig) -> RenderResult<Self> {
        Self::init(backend, config, None)
    }

    /// Like [`Self::new`], with a callback receiving asynchronous backend
    /// failure reports.
    pub fn with_error_callback(
        backend: Arc<dyn RenderBackend>,
        config: RenderConfig,
        callback: ErrorCallback,
    ) -> RenderResult<Self> {
        Self::init(backend, config, Some(callback))
    }

    fn init(
        backend: Arc<dyn RenderBackend>,
        config: RenderConfig,
        error_callback: Option<ErrorCallback>,
    ) -> RenderResult<Self> {
        config
            .validate()
            .map_err(|error| RenderError::InitializationFailed(error.to_string()))?;

        let core = Arc::new(RenderCore {
            frames: FramePool::new(config.frame_pool_size),
            packet_lists: HandlePool::new(ResourceKind::PacketList, config.pools.packet_lists),
            texture_sets: HandlePool::new(ResourceKind::TextureSet, config.pools.texture_sets),
            texture_set_catalog: Mutex::new(Vec::new()),
            depth_stencil_catalog: Mutex::new(Vec::new()),
            sampler_catalog: Mutex::new(Vec::new()),
            packet_defaults: OnceLock::new(),
            error_callback,
            frame_prepared: AutoResetEvent::new(),
            frame_done: AutoResetEvent::new(),
            reset_done: AutoResetEvent::new(),
            thread_started: Semaphore::new(),
            suspend_sync: Semaphore::new(),
            suspend_reached: AtomicBool::new(false),
            suspended: AtomicBool::new(false),
            exit_pending: AtomicBool::new(false),
            reset_pending: AtomicBool::new(false),
            device_lost: AtomicBool::new(false),
            suspend_skip_frame: AtomicBool::new(false),
            frames_after_resume: AtomicU32::new(0),
            immediate_slot: Mutex::new(None),
            immediate_pending: AtomicBool::new(false),
            deletion: Mutex::new(DeletionState::new(config.frame_pool_size as usize)),
            backend,
            config,
        });

        let render_thread = if core.threaded() {
            let thread_core = Arc::clone(&core);
            let handle = thread::Builder::new()
                .name("rhi.render-thread".to_string())
                .spawn(move || thread_core.render_func())
                .map_err(|error| {
                    RenderError::InitializationFailed(format!(
                        "failed to spawn render thread: {error}"
                    ))
                })?;
            core.thread_started.wait();
            Some(handle)
        } else {
            core.backend.init_context().map_err(|error| {
                core.report_failure(RenderingFailure::FailedToInitialize);
                RenderError::InitializationFailed(error.to_string())
            })?;
            None
        };

        Ok(Self {
            core,
            render_thread,
            shut_down: false,
        })
    }

    /// Stops the executor, joins the render thread and tears down the
    /// backend. Runs automatically on drop; calling it twice is harmless.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        if let Some(handle) = self.render_thread.take() {
            self.core.exit_pending.store(true, Ordering::Release);
            if self.core.suspended.load(Ordering::Acquire) {
                log::info!("render thread is suspended, resuming it to join");
                self.core.resume_render();
            }
            self.core.frame_prepared.signal();

            log::info!("render thread join begin");
            if handle.join().is_err() {
                log::error!("render thread terminated by panic");
            }
            log::info!("render thread join end");
        }
        self.core.backend.uninitialize();
    }

    // === Frame production ===

    /// Finishes the frame under recording and schedules it for execution.
    ///
    /// Blocks only while the number of in-flight frames has reached the
    /// configured buffering depth (threaded mode); a frame with no
    /// recorded passes is discarded without executing anything.
    pub fn present(&self) -> RenderResult<()> {
        self.core.present()
    }

    /// Number of finished frames not yet executed.
    #[must_use]
    pub fn frames_in_flight(&self) -> u32 {
        self.core.frames.frames_count()
    }

    /// Allocates a render pass with `packet_list_count` packet lists and
    /// attaches it to the frame being recorded.
    pub fn allocate_render_pass(
        &self,
        config: &RenderPassConfig,
        packet_list_count: u32,
    ) -> RenderResult<(Handle, Vec<Handle>)> {
        self.core.allocate_render_pass(config, packet_list_count)
    }

    /// Marks a pass open for recording.
    pub fn begin_render_pass(&self, pass: Handle) {
        self.core.begin_render_pass(pass);
    }

    /// Marks a pass fully recorded. No explicit release is needed; the
    /// pass is consumed by frame execution.
    pub fn end_render_pass(&self, pass: Handle) {
        self.core.end_render_pass(pass);
    }

    /// Opens a packet list for recording.
    pub fn begin_packet_list(&self, packet_list: Handle) {
        self.core.begin_packet_list(packet_list);
    }

    /// Records one packet.
    pub fn add_packet(&self, packet_list: Handle, packet: &Packet) {
        self.core.add_packets(packet_list, std::slice::from_ref(packet));
    }

    /// Records a sequence of packets with state-change coalescing.
    pub fn add_packets(&self, packet_list: Handle, packets: &[Packet]) {
        self.core.add_packets(packet_list, packets);
    }

    /// Closes a packet list; its handle is invalid afterwards. `sync`
    /// (if valid) signals once the recorded work retires on the GPU.
    pub fn end_packet_list(&self, packet_list: Handle, sync: Handle) {
        self.core.end_packet_list(packet_list, sync);
    }

    /// Attaches frame-level timestamp queries to the frame being recorded.
    pub fn set_frame_perf_queries(&self, start: Handle, end: Handle) {
        self.core.frames.set_frame_perf_queries(start, end);
    }

    // === Execution control ===

    /// Blocks until the executor is quiescent; no GPU work is in flight
    /// once this returns.
    pub fn suspend_rendering(&self) {
        self.core.suspend_render();
    }

    /// Suspends only after the frame currently in flight completes.
    pub fn suspend_rendering_after_frame(&self) {
        self.core.suspend_render_after_frame();
    }

    /// Releases a suspended executor.
    pub fn resume_rendering(&self) {
        self.core.resume_render();
    }

    /// Rejects all in-flight frames and re-initializes backend device
    /// state with `param`. Blocks until the reset completed.
    pub fn reset(&self, param: &ResetParam) {
        self.core.backend.reset(param);
        self.core.set_reset_pending();
    }

    /// Runs `command` inside the executor's native context, bypassing the
    /// frame queue; blocks until it has executed.
    pub fn issue_immediate_command(
        &self,
        command: impl FnOnce(&dyn RenderBackend) + Send + 'static,
    ) {
        self.core.issue_immediate_command(Box::new(command));
    }

    // === Backend queries ===

    /// Capability report for the active device.
    #[must_use]
    pub fn device_caps(&self) -> DeviceCaps {
        self.core.backend.device_caps()
    }

    /// Whether device-loss recovery left resources waiting to be restored.
    #[must_use]
    pub fn needs_restore_resources(&self) -> bool {
        self.core.backend.needs_restore_resources()
    }

    /// Drops backend state caches after host code touched the native API
    /// directly.
    pub fn invalidate_cache(&self) {
        self.core.backend.invalidate_cache();
    }

    // === Sync objects ===

    /// Creates a GPU fence; it signals once all work recorded before it
    /// has retired.
    pub fn create_sync_object(&self) -> RenderResult<Handle> {
        self.core.backend.create_sync_object()
    }

    /// Destroys a fence.
    pub fn delete_sync_object(&self, sync: Handle) {
        self.core.backend.delete_sync_object(sync);
    }

    /// Non-blocking fence completion query.
    #[must_use]
    pub fn sync_object_signaled(&self, sync: Handle) -> bool {
        self.core.backend.sync_object_signaled(sync)
    }

    /// Fence of the frame currently being recorded, created lazily.
    pub fn current_frame_sync_object(&self) -> Handle {
        self.core.current_frame_sync_object()
    }

    // === Resources ===

    /// Creates a vertex buffer.
    pub fn create_vertex_buffer(&self, desc: &VertexBufferDescriptor) -> RenderResult<Handle> {
        self.core.create_vertex_buffer(desc)
    }

    /// Overwrites a range of a vertex buffer.
    pub fn update_vertex_buffer(
        &self,
        buffer: Handle,
        data: &[u8],
        offset: u32,
    ) -> RenderResult<()> {
        self.core.update_vertex_buffer(buffer, data, offset)
    }

    /// Deletes a vertex buffer, deferred behind the current fence when
    /// `schedule_deletion` is set.
    pub fn delete_vertex_buffer(&self, buffer: Handle, schedule_deletion: bool) {
        self.core.delete_vertex_buffer(buffer, schedule_deletion);
    }

    /// Creates an index buffer.
    pub fn create_index_buffer(&self, desc: &IndexBufferDescriptor) -> RenderResult<Handle> {
        self.core.create_index_buffer(desc)
    }

    /// Overwrites a range of an index buffer.
    pub fn update_index_buffer(
        &self,
        buffer: Handle,
        data: &[u8],
        offset: u32,
    ) -> RenderResult<()> {
        self.core.update_index_buffer(buffer, data, offset)
    }

    /// Deletes an index buffer (optionally deferred).
    pub fn delete_index_buffer(&self, buffer: Handle, schedule_deletion: bool) {
        self.core.delete_index_buffer(buffer, schedule_deletion);
    }

    /// Creates a texture.
    pub fn create_texture(&self, desc: &TextureDescriptor) -> RenderResult<Handle> {
        self.core.create_texture(desc)
    }

    /// Overwrites one mip level (and cube face) of a texture.
    pub fn update_texture(
        &self,
        texture: Handle,
        data: &[u8],
        level: u32,
        face: TextureFace,
    ) -> RenderResult<()> {
        self.core.update_texture(texture, data, level, face)
    }

    /// Deletes a texture (optionally deferred).
    pub fn delete_texture(&self, texture: Handle, schedule_deletion: bool) {
        self.core.delete_texture(texture, schedule_deletion);
    }

    /// Creates a pipeline state object.
    pub fn create_pipeline_state(&self, desc: &PipelineStateDescriptor) -> RenderResult<Handle> {
        self.core.create_pipeline_state(desc)
    }

    /// Deletes a pipeline state object (optionally deferred).
    pub fn delete_pipeline_state(&self, pipeline_state: Handle, schedule_deletion: bool) {
        self.core.delete_pipeline_state(pipeline_state, schedule_deletion);
    }

    /// Creates a vertex-stage constant buffer for a pipeline slot.
    pub fn create_vertex_const_buffer(
        &self,
        pipeline_state: Handle,
        index: u32,
    ) -> RenderResult<Handle> {
        self.core.create_vertex_const_buffer(pipeline_state, index)
    }

    /// Creates a fragment-stage constant buffer for a pipeline slot.
    pub fn create_fragment_const_buffer(
        &self,
        pipeline_state: Handle,
        index: u32,
    ) -> RenderResult<Handle> {
        self.core.create_fragment_const_buffer(pipeline_state, index)
    }

    /// Overwrites a range of a constant buffer, in floats.
    pub fn update_const_buffer(
        &self,
        buffer: Handle,
        offset: u32,
        data: &[f32],
    ) -> RenderResult<()> {
        self.core.update_const_buffer(buffer, offset, data)
    }

    /// Deletes a constant buffer (optionally deferred).
    pub fn delete_const_buffer(&self, buffer: Handle, schedule_deletion: bool) {
        self.core.delete_const_buffer(buffer, schedule_deletion);
    }

    // === Queries ===

    /// Creates a query buffer with `max_object_count` slots.
    pub fn create_query_buffer(&self, max_object_count: u32) -> RenderResult<Handle> {
        self.core.create_query_buffer(max_object_count)
    }

    /// Resets a query buffer for reuse.
    pub fn reset_query_buffer(&self, query_buffer: Handle) {
        self.core.backend.reset_query_buffer(query_buffer);
    }

    /// Deletes a query buffer (optionally deferred).
    pub fn delete_query_buffer(&self, query_buffer: Handle, schedule_deletion: bool) {
        self.core.delete_query_buffer(query_buffer, schedule_deletion);
    }

    /// Whether every slot of the query buffer has a result. Callers poll;
    /// an unavailable result is not an error.
    #[must_use]
    pub fn query_buffer_is_ready(&self, query_buffer: Handle) -> bool {
        self.core.backend.query_buffer_is_ready(query_buffer)
    }

    /// Result for one query slot.
    #[must_use]
    pub fn query_value(&self, query_buffer: Handle, index: u32) -> i32 {
        self.core.backend.query_value(query_buffer, index)
    }

    /// Creates a timestamp performance query.
    pub fn create_perf_query(&self) -> RenderResult<Handle> {
        self.core.backend.create_perf_query()
    }

    /// Deletes a performance query (optionally deferred).
    pub fn delete_perf_query(&self, perf_query: Handle, schedule_deletion: bool) {
        self.core.delete_perf_query(perf_query, schedule_deletion);
    }

    /// Resets a performance query for reuse.
    pub fn reset_perf_query(&self, perf_query: Handle) {
        self.core.backend.reset_perf_query(perf_query);
    }

    /// Whether the performance query's timestamp is available (poll).
    #[must_use]
    pub fn perf_query_is_ready(&self, perf_query: Handle) -> bool {
        self.core.backend.perf_query_is_ready(perf_query)
    }

    /// The recorded timestamp value.
    #[must_use]
    pub fn perf_query_value(&self, perf_query: Handle) -> u64 {
        self.core.backend.perf_query_value(perf_query)
    }

    // === Shareable state objects ===

    /// Acquires a texture set, deduplicating by descriptor value.
    pub fn acquire_texture_set(&self, desc: &TextureSetDescriptor) -> Handle {
        self.core.acquire_texture_set(desc)
    }

    /// Adds a reference to an acquired texture set.
    pub fn copy_texture_set(&self, texture_set: Handle) -> Handle {
        self.core.copy_texture_set(texture_set)
    }

    /// Drops one texture set reference; the set is destroyed at zero.
    pub fn release_texture_set(&self, texture_set: Handle, schedule_deletion: bool) {
        self.core.release_texture_set(texture_set, schedule_deletion);
    }

    /// Rewrites `old` to `new` in every live texture set, after a texture
    /// was recreated.
    pub fn replace_texture_in_all_texture_sets(&self, old: Handle, new: Handle) {
        self.core.replace_texture_in_all_texture_sets(old, new);
    }

    /// Acquires a depth/stencil state, deduplicating by descriptor value.
    pub fn acquire_depth_stencil_state(
        &self,
        desc: &DepthStencilStateDescriptor,
    ) -> RenderResult<Handle> {
        self.core.acquire_depth_stencil_state(desc)
    }

    /// Adds a reference to an acquired depth/stencil state.
    pub fn copy_depth_stencil_state(&self, state: Handle) -> Handle {
        self.core.copy_depth_stencil_state(state)
    }

    /// Drops one depth/stencil state reference; destroyed at zero.
    pub fn release_depth_stencil_state(&self, state: Handle, schedule_deletion: bool) {
        self.core.release_depth_stencil_state(state, schedule_deletion);
    }

    /// Acquires a sampler state, deduplicating by descriptor value.
    pub fn acquire_sampler_state(&self, desc: &SamplerStateDescriptor) -> RenderResult<Handle> {
        self.core.acquire_sampler_state(desc)
    }

    /// Adds a reference to an acquired sampler state.
    pub fn copy_sampler_state(&self, state: Handle) -> Handle {
        self.core.copy_sampler_state(state)
    }

    /// Drops one sampler state reference; destroyed at zero.
    pub fn release_sampler_state(&self, state: Handle, schedule_deletion: bool) {
        self.core.release_sampler_state(state, schedule_deletion);
    }
}

impl Drop for RenderSystem {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::time::{Duration, Instant};

    use crate::null_backend::NullBackend;

    fn inline_system() -> (RenderSystem, Arc<NullBackend>) {
        let backend = Arc::new(NullBackend::new());
        let system = RenderSystem::new(backend.clone(), RenderConfig::inline()).unwrap();
        (system, backend)
    }

    fn threaded_system(frame_count: u32) -> (RenderSystem, Arc<NullBackend>) {
        let backend = Arc::new(NullBackend::new());
        let system =
            RenderSystem::new(backend.clone(), RenderConfig::threaded(frame_count)).unwrap();
        (system, backend)
    }

    fn record_one_frame(system: &RenderSystem) {
        let (pass, lists) = system
            .allocate_render_pass(&RenderPassConfig::default(), 1)
            .unwrap();
        system.begin_render_pass(pass);
        system.begin_packet_list(lists[0]);
        system.add_packet(
            lists[0],
            &Packet {
                primitive_count: 1,
                ..Packet::default()
            },
        );
        system.end_packet_list(lists[0], Handle::INVALID);
        system.end_render_pass(pass);
    }

    fn wait_for_drain(system: &RenderSystem) {
        let start = Instant::now();
        while system.frames_in_flight() > 0 {
            assert!(
                start.elapsed() < Duration::from_secs(5),
                "in-flight frames did not drain"
            );
            thread::yield_now();
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let backend = Arc::new(NullBackend::new());
        let config = RenderConfig::threaded(16); // equals the ring size
        assert!(RenderSystem::new(backend, config).is_err());
    }

    #[test]
    fn test_inline_present_executes_frame() {
        let (system, backend) = inline_system();
        record_one_frame(&system);
        system.present().unwrap();

        let stats = backend.stats();
        assert_eq!(stats.frames_executed, 1);
        assert_eq!(stats.presents, 1);
        assert_eq!(stats.draws, 1);
        assert_eq!(system.frames_in_flight(), 0);
    }

    #[test]
    fn test_present_without_work_is_discarded() {
        let (system, backend) = inline_system();
        system.present().unwrap();
        system.present().unwrap();

        let stats = backend.stats();
        assert_eq!(stats.frames_executed, 0);
        assert_eq!(stats.presents, 0);
    }

    #[test]
    fn test_scheduled_deletion_waits_for_frame_fence() {
        let (system, backend) = inline_system();
        let texture = system.create_texture(&TextureDescriptor::default()).unwrap();
        assert_eq!(backend.live_textures(), 1);

        system.delete_texture(texture, true);
        // Deferred: the texture survives the deletion request.
        assert_eq!(backend.live_textures(), 1);

        // An empty present produces no frame and therefore no fence; the
        // bucket stays pending.
        system.present().unwrap();
        assert_eq!(backend.live_textures(), 1);

        // A real frame carries the bucket's fence; execution signals it
        // and the drain physically frees the texture.
        record_one_frame(&system);
        system.present().unwrap();
        assert_eq!(backend.live_textures(), 0);
    }

    #[test]
    fn test_scheduled_deletions_span_multiple_buckets() {
        let (system, backend) = inline_system();
        let texture_a = system.create_texture(&TextureDescriptor::default()).unwrap();
        let texture_b = system.create_texture(&TextureDescriptor::default()).unwrap();

        system.delete_texture(texture_a, true);
        record_one_frame(&system);
        system.present().unwrap();

        system.delete_texture(texture_b, true);
        record_one_frame(&system);
        system.present().unwrap();

        assert_eq!(backend.live_textures(), 0);
        // Each drained bucket released its fence object too.
        assert_eq!(backend.live_sync_objects(), 0);
    }

    #[test]
    fn test_current_frame_sync_object_signals_after_present() {
        let (system, _) = inline_system();
        let sync = system.current_frame_sync_object();
        assert!(sync.is_valid());
        assert!(!system.sync_object_signaled(sync));

        record_one_frame(&system);
        system.present().unwrap();
        assert!(system.sync_object_signaled(sync));
    }

    #[test]
    fn test_device_loss_rejects_frames_until_reset() {
        let (system, backend) = inline_system();

        backend.set_present_result(false);
        record_one_frame(&system);
        system.present().unwrap(); // executes, but the flip fails
        assert_eq!(backend.stats().frames_executed, 1);

        // Device is lost now: the next frame is rejected, not executed.
        record_one_frame(&system);
        system.present().unwrap();
        assert_eq!(backend.stats().frames_executed, 1);
        assert_eq!(backend.stats().frames_rejected, 1);

        system.reset(&ResetParam::default());
        assert_eq!(backend.stats().resets, 1);

        record_one_frame(&system);
        system.present().unwrap();
        assert_eq!(backend.stats().frames_executed, 2);
    }

    #[test]
    fn test_error_callback_reports_driver_error() {
        let backend = Arc::new(NullBackend::new());
        let reported = Arc::new(Mutex::new(Vec::new()));
        let callback_log = Arc::clone(&reported);
        let system = RenderSystem::with_error_callback(
            backend.clone(),
            RenderConfig::inline(),
            Arc::new(move |failure| callback_log.lock().unwrap().push(failure)),
        )
        .unwrap();

        backend.set_present_result(false);
        record_one_frame(&system);
        system.present().unwrap();

        assert_eq!(
            reported.lock().unwrap().as_slice(),
            &[RenderingFailure::DriverError]
        );
    }

    #[test]
    fn test_threaded_present_bounds_in_flight_frames() {
        let (system, backend) = threaded_system(2);

        for _ in 0..10 {
            record_one_frame(&system);
            system.present().unwrap();
            // Present returns only once the in-flight count dropped below
            // the configured buffering depth.
            assert!(system.frames_in_flight() < 2);
        }

        wait_for_drain(&system);
        assert_eq!(backend.stats().frames_executed, 10);
    }

    #[test]
    fn test_immediate_command_runs_on_render_thread() {
        let (system, _) = threaded_system(1);

        let ran_on_render_thread = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran_on_render_thread);
        system.issue_immediate_command(move |_backend| {
            let on_render_thread = thread::current().name() == Some("rhi.render-thread");
            flag.store(on_render_thread, Ordering::Release);
        });

        // Submission blocks until execution, so the flag is already set.
        assert!(ran_on_render_thread.load(Ordering::Acquire));
    }

    #[test]
    fn test_suspend_parks_executor_and_resume_continues() {
        let (system, backend) = threaded_system(2);

        record_one_frame(&system);
        system.present().unwrap();
        wait_for_drain(&system);
        let executed = backend.stats().frames_executed;

        system.suspend_rendering();

        // The executor is parked: a frame presented now stays pending.
        record_one_frame(&system);
        system.present().unwrap();
        assert_eq!(backend.stats().frames_executed, executed);
        assert_eq!(system.frames_in_flight(), 1);

        system.resume_rendering();
        wait_for_drain(&system);
        assert_eq!(backend.stats().frames_executed, executed + 1);
    }

    #[test]
    fn test_suspend_after_frame_round_trip() {
        let (system, _) = threaded_system(1);
        record_one_frame(&system);
        system.present().unwrap();
        wait_for_drain(&system);

        system.suspend_rendering_after_frame();
        system.resume_rendering();

        record_one_frame(&system);
        system.present().unwrap();
        wait_for_drain(&system);
    }

    #[test]
    fn test_threaded_reset_round_trip() {
        let (system, backend) = threaded_system(2);
        system.reset(&ResetParam {
            width: 640,
            height: 480,
            ..ResetParam::default()
        });
        assert_eq!(backend.stats().resets, 1);

        record_one_frame(&system);
        system.present().unwrap();
        wait_for_drain(&system);
        assert_eq!(backend.stats().frames_executed, 1);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let (mut system, _) = threaded_system(1);
        record_one_frame(&system);
        system.present().unwrap();
        wait_for_drain(&system);
        system.shutdown();
        system.shutdown();
    }

    #[test]
    fn test_device_caps_passthrough() {
        let (system, _) = inline_system();
        let caps = system.device_caps();
        assert!(caps.is_instancing_supported);
        assert!(!system.needs_restore_resources());
        system.invalidate_cache();
    }
}
