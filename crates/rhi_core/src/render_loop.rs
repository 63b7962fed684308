//! Render loop
//!
//! Owns all cross-thread coordination between the producer (any thread
//! that records passes and calls present) and the executor (the same
//! thread in inline mode, or the single dedicated render thread).
//!
//! Blocking points, and nothing else blocks:
//!
//! - `present` blocks the producer only while the in-flight frame count
//!   has reached the configured buffering depth.
//! - `suspend_render` blocks until the executor reaches its quiescent
//!   checkpoint.
//! - Immediate-command submission blocks until the executor drains the
//!   mailbox, re-signaling the frame-prepared event so an executor parked
//!   waiting for frames still gets there.
//!
//! Scheduled deletion lives here too: deletion requests land in the
//! bucket of the current fence slot and are physically freed only once
//! that fence signals. A bucket is never re-armed before that drain
//! completes — a resource is never destroyed while a fence that could
//! still reference it is unsignaled.

use std::mem;
use std::sync::atomic::Ordering;
use std::thread;

use crate::backend::ImmediateCommand;
use crate::concurrency::lock;
use crate::error::{RenderError, RenderResult, RenderingFailure};
use crate::handle::{Handle, ResourceKind};
use crate::system::RenderCore;

pub(crate) struct ScheduledDeletion {
    handle: Handle,
    kind: ResourceKind,
}

/// Per-fence-slot deletion buckets. `current` tracks the slot deletions
/// are filed under; it advances with the frame ring.
pub(crate) struct DeletionState {
    current: usize,
    buckets: Vec<Vec<ScheduledDeletion>>,
    syncs: Vec<Handle>,
}

impl DeletionState {
    pub(crate) fn new(bucket_count: usize) -> Self {
        Self {
            current: 0,
            buckets: (0..bucket_count).map(|_| Vec::new()).collect(),
            syncs: vec![Handle::INVALID; bucket_count],
        }
    }
}

impl RenderCore {
    pub(crate) fn threaded(&self) -> bool {
        self.config.render_thread_frame_count > 0
    }

    /// Finishes the frame under construction and hands it to the executor.
    ///
    /// In inline mode the frame executes right here; in threaded mode the
    /// render thread is signaled and the call blocks only while the
    /// in-flight count has reached the configured buffering depth.
    pub(crate) fn present(&self) -> RenderResult<()> {
        let frame_sync = self.prepare_frame_sync();

        if !self.frames.finish_frame(frame_sync) {
            // Present without recorded work: nothing to execute, and the
            // fence slot stays armed for the next real frame.
            log::debug!("empty frame finished");
            return Ok(());
        }
        self.rotate_deletion_buckets();

        if self.threaded() {
            if !self.suspended.load(Ordering::Acquire) {
                self.frame_prepared.signal();
            }
            loop {
                let in_flight = self.frames.frames_count();
                if in_flight < self.config.render_thread_frame_count {
                    break;
                }
                self.frame_done.wait();
            }
            Ok(())
        } else if self.suspended.load(Ordering::Acquire) || self.device_lost.load(Ordering::Acquire)
        {
            self.frames.reject_frames(self.backend.as_ref());
            // Rejection still signals the frame fences, so pending
            // buckets can (and must) drain here or rotation would
            // eventually run into one that never got the chance.
            self.process_scheduled_deletions();
            Ok(())
        } else {
            let result = self.execute_pending_frame();
            self.process_scheduled_deletions();
            result
        }
    }

    fn execute_pending_frame(&self) -> RenderResult<()> {
        match self.frames.process_frame(self.backend.as_ref()) {
            Ok(executed) => {
                if executed && !self.backend.present_buffer() {
                    log::error!("present failed, device lost");
                    self.device_lost.store(true, Ordering::Release);
                    self.report_failure(RenderingFailure::DriverError);
                }
                Ok(())
            }
            Err(error) => {
                log::error!("frame execution failed: {error}");
                self.device_lost.store(true, Ordering::Release);
                self.report_failure(RenderingFailure::DriverError);
                Err(RenderError::RenderingFailed(error.to_string()))
            }
        }
    }

    /// Render thread body. Loops until shutdown: wait for a prepared
    /// frame (draining immediate commands meanwhile), execute or reject
    /// it, signal completion, then free whatever the signaled fences
    /// allow.
    pub(crate) fn render_func(&self) {
        if let Err(error) = self.backend.init_context() {
            log::error!("render thread context init failed: {error}");
            self.device_lost.store(true, Ordering::Release);
            self.report_failure(RenderingFailure::FailedToInitialize);
        }
        self.thread_started.post();
        log::info!("render thread started");

        while !self.exit_pending.load(Ordering::Acquire) {
            if self.suspended.load(Ordering::Acquire) {
                self.backend.finish_rendering();
                self.frames_after_resume.store(0, Ordering::Relaxed);
                self.suspend_reached.store(true, Ordering::Release);
                self.suspend_sync.wait();
                self.backend.validate_surface();
            }

            let mut frame_ready = false;
            while !frame_ready && !self.reset_pending.load(Ordering::Acquire) {
                // A post-frame suspension request only takes effect once
                // at least one frame has passed since resume.
                let allow_suspend = !self.suspend_skip_frame.load(Ordering::Relaxed)
                    || self.frames_after_resume.load(Ordering::Relaxed) > 0;
                if self.exit_pending.load(Ordering::Acquire)
                    || (self.suspended.load(Ordering::Acquire) && allow_suspend)
                {
                    break;
                }

                self.check_immediate_command();
                frame_ready = self.frames.frame_ready();
                if !frame_ready {
                    self.frame_prepared.wait();
                }
            }

            if self.reset_pending.load(Ordering::Acquire) {
                loop {
                    self.reset_pending.store(false, Ordering::Release);
                    self.frames.reject_frames(self.backend.as_ref());
                    self.reset_backend_block();
                    if !self.reset_pending.load(Ordering::Acquire) {
                        break;
                    }
                }
                self.reset_done.signal();
                self.frame_done.signal();
            } else if frame_ready {
                if self.backend.validate_surface() && !self.device_lost.load(Ordering::Acquire) {
                    if let Err(error) = self.execute_pending_frame() {
                        log::error!("rejecting remaining frames: {error}");
                        self.frames.reject_frames(self.backend.as_ref());
                    }
                } else {
                    self.frames.reject_frames(self.backend.as_ref());
                }
                self.frame_done.signal();
                self.process_scheduled_deletions();
            }

            self.frames_after_resume.fetch_add(1, Ordering::Relaxed);
        }

        log::info!("render thread finished");
    }

    fn reset_backend_block(&self) {
        match self.backend.reset_block() {
            Ok(()) => {
                self.device_lost.store(false, Ordering::Release);
            }
            Err(error) => {
                log::error!("device reset failed: {error}");
                self.report_failure(RenderingFailure::FailedToInitialize);
            }
        }
    }

    /// Requests that in-flight frames be rejected and backend device
    /// state re-initialized before normal processing resumes. Blocks
    /// until the reset has completed.
    pub(crate) fn set_reset_pending(&self) {
        log::debug!("reset pending");
        if self.threaded() {
            self.reset_pending.store(true, Ordering::Release);
            self.frame_prepared.signal();
            self.reset_done.wait();
        } else {
            self.frames.reject_frames(self.backend.as_ref());
            self.reset_backend_block();
        }
    }

    // === Suspend / resume ===

    /// Blocks until the executor has quiesced; no GPU work is in flight
    /// once this returns.
    pub(crate) fn suspend_render(&self) {
        let was_suspended = self.suspended.swap(true, Ordering::AcqRel);
        assert!(!was_suspended, "rendering already suspended");

        if self.threaded() {
            while !self.suspend_reached.load(Ordering::Acquire) {
                self.frame_prepared.signal(); // keep the executor from stalling
                thread::yield_now();
            }
            self.suspend_reached.store(false, Ordering::Release);
        } else {
            self.backend.finish_rendering();
        }

        log::info!("render suspended");
        self.suspend_skip_frame.store(false, Ordering::Relaxed);
    }

    /// Like [`Self::suspend_render`], but lets the frame currently in
    /// flight complete first, avoiding mid-frame teardown.
    pub(crate) fn suspend_render_after_frame(&self) {
        self.suspend_skip_frame.store(true, Ordering::Relaxed);
        self.suspend_render();
    }

    pub(crate) fn resume_render(&self) {
        let was_suspended = self.suspended.swap(false, Ordering::AcqRel);
        assert!(was_suspended, "rendering is not suspended");

        log::info!("render resumed");
        if self.threaded() {
            self.suspend_sync.post();
        }
    }

    // === Immediate commands ===

    /// Runs `command` inside the executor's native context, bypassing the
    /// frame queue. Blocks the submitting thread until the command has
    /// executed.
    pub(crate) fn issue_immediate_command(&self, command: ImmediateCommand) {
        if !self.threaded() {
            command(self.backend.as_ref());
            return;
        }

        // Single-slot mailbox: claim the slot, then poll for the executor
        // to drain it, re-signaling so an executor parked on frame-ready
        // wakes up to look.
        let mut command = Some(command);
        loop {
            let mut slot = lock(&self.immediate_slot);
            if slot.is_none() {
                *slot = command.take();
                self.immediate_pending.store(true, Ordering::Release);
                break;
            }
            drop(slot);
            thread::yield_now();
        }

        while self.immediate_pending.load(Ordering::Acquire) {
            self.frame_prepared.signal();
            thread::yield_now();
        }
    }

    pub(crate) fn check_immediate_command(&self) {
        if !self.immediate_pending.load(Ordering::Acquire) {
            return;
        }
        let command = lock(&self.immediate_slot).take();
        if let Some(command) = command {
            command(self.backend.as_ref());
            self.immediate_pending.store(false, Ordering::Release);
        }
    }

    // === Scheduled deletion ===

    /// Files `handle` for destruction once the current fence slot's fence
    /// signals.
    pub(crate) fn schedule_resource_deletion(&self, handle: Handle, kind: ResourceKind) {
        let mut deletion = lock(&self.deletion);
        let current = deletion.current;
        deletion.buckets[current].push(ScheduledDeletion { handle, kind });
    }

    /// Fence for the current slot, created lazily. Attached to the next
    /// finished frame by [`Self::present`].
    fn prepare_frame_sync(&self) -> Handle {
        let mut deletion = lock(&self.deletion);
        let current = deletion.current;
        if !deletion.buckets[current].is_empty() && !deletion.syncs[current].is_valid() {
            match self.backend.create_sync_object() {
                Ok(sync) => deletion.syncs[current] = sync,
                Err(error) => log::error!("failed to create frame sync object: {error}"),
            }
        }
        deletion.syncs[current]
    }

    fn rotate_deletion_buckets(&self) {
        let mut deletion = lock(&self.deletion);
        deletion.current = (deletion.current + 1) % deletion.buckets.len();
        let current = deletion.current;
        assert!(
            deletion.buckets[current].is_empty() && !deletion.syncs[current].is_valid(),
            "scheduled-deletion bucket reused before its fence signaled"
        );
    }

    /// Lazily creates and returns the fence of the frame slot currently
    /// being recorded, letting callers observe retirement of work they
    /// just recorded.
    pub(crate) fn current_frame_sync_object(&self) -> Handle {
        let mut deletion = lock(&self.deletion);
        let current = deletion.current;
        if !deletion.syncs[current].is_valid() {
            match self.backend.create_sync_object() {
                Ok(sync) => deletion.syncs[current] = sync,
                Err(error) => {
                    log::error!("failed to create frame sync object: {error}");
                    return Handle::INVALID;
                }
            }
        }
        deletion.syncs[current]
    }

    /// Frees every bucket whose fence has signaled, dispatching each entry
    /// to its kind's destroy path, and releases the fence object.
    pub(crate) fn process_scheduled_deletions(&self) {
        let mut drained: Vec<Vec<ScheduledDeletion>> = Vec::new();
        {
            let mut deletion = lock(&self.deletion);
            for index in 0..deletion.buckets.len() {
                let sync = deletion.syncs[index];
                if sync.is_valid() && self.backend.sync_object_signaled(sync) {
                    drained.push(mem::take(&mut deletion.buckets[index]));
                    self.backend.delete_sync_object(sync);
                    deletion.syncs[index] = Handle::INVALID;
                }
            }
        }

        for entry in drained.into_iter().flatten() {
            self.destroy_resource(entry.handle, entry.kind);
        }
    }

    fn destroy_resource(&self, handle: Handle, kind: ResourceKind) {
        let backend = self.backend.as_ref();
        match kind {
            ResourceKind::VertexBuffer => backend.delete_vertex_buffer(handle),
            ResourceKind::IndexBuffer => backend.delete_index_buffer(handle),
            ResourceKind::ConstBuffer => backend.delete_const_buffer(handle),
            ResourceKind::Texture => backend.delete_texture(handle),
            ResourceKind::PipelineState => backend.delete_pipeline_state(handle),
            ResourceKind::DepthStencilState => backend.delete_depth_stencil_state(handle),
            ResourceKind::SamplerState => backend.delete_sampler_state(handle),
            ResourceKind::QueryBuffer => backend.delete_query_buffer(handle),
            ResourceKind::PerfQuery => backend.delete_perf_query(handle),
            ResourceKind::TextureSet => {
                self.texture_sets.free(handle);
            }
            ResourceKind::RenderPass
            | ResourceKind::CommandBuffer
            | ResourceKind::SyncObject
            | ResourceKind::PacketList => {
                debug_assert!(false, "resource kind {kind:?} cannot be schedule-deleted");
            }
        }
    }

    pub(crate) fn report_failure(&self, failure: RenderingFailure) {
        if let Some(callback) = &self.error_callback {
            callback(failure);
        }
    }
}
