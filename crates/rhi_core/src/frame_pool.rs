//! Frame ring
//!
//! Buffers up to `pool_size` in-flight frames between the recording side
//! and the executing side. Two monotonically increasing cursors index the
//! ring: `frame_to_build` (next slot to populate) and `frame_to_execute`
//! (next slot to consume). `frame_to_execute <= frame_to_build` always
//! holds, and their difference never exceeds the pool size — that bound is
//! the sole admission-control point for backpressure.
//!
//! A frame is never read by the execution side while the recording side
//! still writes it: the build cursor only moves past a slot in
//! `finish_frame`, and the execute cursor never catches up to the build
//! cursor.

use std::cmp::Reverse;
use std::mem;
use std::sync::Mutex;

use crate::backend::{BackendResult, FrameExecution, RenderBackend};
use crate::concurrency::lock;
use crate::handle::Handle;

#[derive(Debug, Clone, Copy)]
struct PassEntry {
    handle: Handle,
    priority: i32,
}

struct Frame {
    passes: Vec<PassEntry>,
    sync: Handle,
    perf_query_start: Handle,
    perf_query_end: Handle,
    frame_number: u64,
    ready_to_execute: bool,
    discarded: bool,
}

impl Frame {
    fn new() -> Self {
        Self {
            passes: Vec::new(),
            sync: Handle::INVALID,
            perf_query_start: Handle::INVALID,
            perf_query_end: Handle::INVALID,
            frame_number: 0,
            ready_to_execute: false,
            discarded: false,
        }
    }

    fn reset(&mut self) {
        self.passes.clear();
        self.sync = Handle::INVALID;
        self.perf_query_start = Handle::INVALID;
        self.perf_query_end = Handle::INVALID;
        self.frame_number = 0;
        self.ready_to_execute = false;
        self.discarded = false;
    }
}

struct FramePoolState {
    frames: Vec<Frame>,
    frame_to_build: u32,
    frame_to_execute: u32,
    next_frame_number: u64,
}

pub(crate) struct FramePool {
    size: u32,
    state: Mutex<FramePoolState>,
}

impl FramePool {
    pub(crate) fn new(pool_size: u32) -> Self {
        assert!(pool_size > 0);
        Self {
            size: pool_size,
            state: Mutex::new(FramePoolState {
                frames: (0..pool_size).map(|_| Frame::new()).collect(),
                frame_to_build: 0,
                frame_to_execute: 0,
                next_frame_number: 1,
            }),
        }
    }

    /// Appends a render pass to the frame currently being recorded.
    pub(crate) fn add_pass(&self, pass: Handle, priority: i32) {
        let mut state = lock(&self.state);
        let index = (state.frame_to_build % self.size) as usize;
        state.frames[index].passes.push(PassEntry {
            handle: pass,
            priority,
        });
    }

    /// Attaches frame-level timestamp queries to the frame being recorded.
    pub(crate) fn set_frame_perf_queries(&self, start: Handle, end: Handle) {
        let mut state = lock(&self.state);
        let index = (state.frame_to_build % self.size) as usize;
        state.frames[index].perf_query_start = start;
        state.frames[index].perf_query_end = end;
    }

    /// Marks the frame being recorded as ready and advances the build
    /// cursor. Returns `false` if nothing was recorded — the frame is
    /// discarded as empty and the cursor does not move.
    pub(crate) fn finish_frame(&self, sync: Handle) -> bool {
        let mut state = lock(&self.state);
        let index = (state.frame_to_build % self.size) as usize;
        if state.frames[index].passes.is_empty() {
            return false;
        }

        let frame_number = state.next_frame_number;
        state.next_frame_number += 1;

        let frame = &mut state.frames[index];
        frame.sync = sync;
        frame.frame_number = frame_number;
        frame.ready_to_execute = true;
        state.frame_to_build += 1;
        true
    }

    /// Whether a finished frame is waiting for execution.
    pub(crate) fn frame_ready(&self) -> bool {
        let state = lock(&self.state);
        state.frame_to_execute != state.frame_to_build
    }

    /// Number of finished frames not yet executed.
    pub(crate) fn frames_count(&self) -> u32 {
        let state = lock(&self.state);
        state.frame_to_build - state.frame_to_execute
    }

    /// Executes the next finished frame through the backend, or rejects it
    /// if it was marked discarded. The slot is reset before execution
    /// starts (its contents move into the [`FrameExecution`]), and the
    /// execute cursor advances afterwards even if execution fails, so a
    /// backend error never corrupts the cursor pair.
    ///
    /// Returns whether a frame was actually executed (as opposed to
    /// rejected or absent), which gates the buffer flip.
    pub(crate) fn process_frame(&self, backend: &dyn RenderBackend) -> BackendResult<bool> {
        let Some((frame, discarded)) = self.take_next_frame() else {
            return Ok(false);
        };

        let result = if discarded {
            backend.reject_frame(&frame);
            Ok(false)
        } else {
            backend.execute_frame(&frame).map(|()| true)
        };
        self.advance_execute_cursor();
        result
    }

    /// Drains every finished frame without executing it. The backend still
    /// signals each frame's fences, so no fence waiter can deadlock. A
    /// partially recorded frame is marked discarded: its state may
    /// reference pre-reset resources, so it must not execute once
    /// finished.
    pub(crate) fn reject_frames(&self, backend: &dyn RenderBackend) {
        while let Some((frame, _)) = self.take_next_frame() {
            backend.reject_frame(&frame);
            self.advance_execute_cursor();
        }

        let mut state = lock(&self.state);
        let index = (state.frame_to_build % self.size) as usize;
        if !state.frames[index].passes.is_empty() {
            state.frames[index].discarded = true;
        }
    }

    fn take_next_frame(&self) -> Option<(FrameExecution, bool)> {
        let mut state = lock(&self.state);
        if state.frame_to_execute == state.frame_to_build {
            return None;
        }

        let index = (state.frame_to_execute % self.size) as usize;
        let frame = &mut state.frames[index];
        debug_assert!(frame.ready_to_execute);

        let mut passes = mem::take(&mut frame.passes);
        // Stable sort: equal priorities keep submission order, which
        // draw-order dependent passes rely on.
        passes.sort_by_key(|pass| Reverse(pass.priority));

        let execution = FrameExecution {
            passes: passes.into_iter().map(|pass| pass.handle).collect(),
            sync: frame.sync,
            perf_query_start: frame.perf_query_start,
            perf_query_end: frame.perf_query_end,
            frame_number: frame.frame_number,
        };
        let discarded = frame.discarded;
        frame.reset();
        Some((execution, discarded))
    }

    fn advance_execute_cursor(&self) {
        let mut state = lock(&self.state);
        state.frame_to_execute += 1;
        // Keep both cursors bounded once a full ring has executed.
        if state.frame_to_execute >= self.size {
            state.frame_to_execute -= self.size;
            state.frame_to_build -= self.size;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::null_backend::NullBackend;
    use crate::types::RenderPassConfig;

    fn make_pass(backend: &NullBackend) -> Handle {
        let (pass, _) = backend
            .allocate_render_pass(&RenderPassConfig::default(), 1)
            .unwrap();
        pass
    }

    #[test]
    fn test_frames_count_tracks_finished_frames() {
        let backend = NullBackend::new();
        let frames = FramePool::new(4);
        assert_eq!(frames.frames_count(), 0);
        assert!(!frames.frame_ready());

        frames.add_pass(make_pass(&backend), 0);
        assert_eq!(frames.frames_count(), 0); // not finished yet

        assert!(frames.finish_frame(Handle::INVALID));
        assert_eq!(frames.frames_count(), 1);
        assert!(frames.frame_ready());

        frames.add_pass(make_pass(&backend), 0);
        assert!(frames.finish_frame(Handle::INVALID));
        assert_eq!(frames.frames_count(), 2);

        frames.process_frame(&backend).unwrap();
        assert_eq!(frames.frames_count(), 1);
        frames.process_frame(&backend).unwrap();
        assert_eq!(frames.frames_count(), 0);
        assert_eq!(backend.stats().frames_executed, 2);
    }

    #[test]
    fn test_empty_finish_is_a_no_op() {
        let backend = NullBackend::new();
        let frames = FramePool::new(4);
        assert!(!frames.finish_frame(Handle::INVALID));
        assert_eq!(frames.frames_count(), 0);

        // The slot is still the build target afterwards.
        frames.add_pass(make_pass(&backend), 0);
        assert!(frames.finish_frame(Handle::INVALID));
        assert_eq!(frames.frames_count(), 1);
    }

    #[test]
    fn test_slot_is_reset_after_execution() {
        let backend = NullBackend::new();
        let frames = FramePool::new(1); // single slot, immediate reuse
        let sync = backend.create_sync_object().unwrap();

        frames.add_pass(make_pass(&backend), 0);
        assert!(frames.finish_frame(sync));
        frames.process_frame(&backend).unwrap();

        // The same slot records the next frame from a clean state: no
        // stale passes, no stale fence.
        frames.add_pass(make_pass(&backend), 0);
        assert!(frames.finish_frame(Handle::INVALID));
        frames.process_frame(&backend).unwrap();

        let executed = backend.executed_frames();
        assert_eq!(executed.len(), 2);
        assert_eq!(executed[0].passes.len(), 1);
        assert_eq!(executed[1].passes.len(), 1);
        assert_eq!(executed[0].sync, sync);
        assert_eq!(executed[1].sync, Handle::INVALID);
        assert_eq!(executed[0].frame_number, 1);
        assert_eq!(executed[1].frame_number, 2);
    }

    #[test]
    fn test_passes_sort_by_priority_stable() {
        let backend = NullBackend::new();
        let frames = FramePool::new(2);

        let low_a = make_pass(&backend);
        let high = make_pass(&backend);
        let low_b = make_pass(&backend);
        frames.add_pass(low_a, 0);
        frames.add_pass(high, 5);
        frames.add_pass(low_b, 0);
        assert!(frames.finish_frame(Handle::INVALID));
        frames.process_frame(&backend).unwrap();

        let executed = backend.executed_frames();
        // Highest priority first; equal priorities keep insertion order.
        assert_eq!(executed[0].passes, vec![high, low_a, low_b]);
    }

    #[test]
    fn test_reject_frames_signals_pending_fences() {
        let backend = NullBackend::new();
        let frames = FramePool::new(4);

        let sync_a = backend.create_sync_object().unwrap();
        let sync_b = backend.create_sync_object().unwrap();
        frames.add_pass(make_pass(&backend), 0);
        assert!(frames.finish_frame(sync_a));
        frames.add_pass(make_pass(&backend), 0);
        assert!(frames.finish_frame(sync_b));

        frames.reject_frames(&backend);
        assert_eq!(frames.frames_count(), 0);
        assert!(backend.sync_object_signaled(sync_a));
        assert!(backend.sync_object_signaled(sync_b));
        assert_eq!(backend.stats().frames_rejected, 2);
    }

    #[test]
    fn test_reject_frames_with_nothing_pending_is_harmless() {
        let backend = NullBackend::new();
        let frames = FramePool::new(4);
        frames.reject_frames(&backend);
        assert_eq!(backend.stats().frames_rejected, 0);
    }

    #[test]
    fn test_partially_recorded_frame_is_discarded_by_reject() {
        let backend = NullBackend::new();
        let frames = FramePool::new(4);

        frames.add_pass(make_pass(&backend), 0);
        frames.reject_frames(&backend); // frame not finished yet

        // Finishing it later still works, but it gets rejected instead of
        // executed.
        assert!(frames.finish_frame(Handle::INVALID));
        frames.process_frame(&backend).unwrap();
        assert_eq!(backend.stats().frames_rejected, 1);
        assert_eq!(backend.stats().frames_executed, 0);
    }

    #[test]
    fn test_cursors_stay_bounded_across_wraps() {
        let backend = NullBackend::new();
        let frames = FramePool::new(2);

        for _ in 0..7 {
            frames.add_pass(make_pass(&backend), 0);
            assert!(frames.finish_frame(Handle::INVALID));
            frames.process_frame(&backend).unwrap();
        }
        assert_eq!(backend.stats().frames_executed, 7);
        assert_eq!(frames.frames_count(), 0);
    }
}
