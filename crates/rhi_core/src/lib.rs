//! # rhi_core
//!
//! Backend-agnostic frame scheduling and GPU resource-lifetime engine.
//!
//! The crate turns a stream of draw/state packets produced by application
//! code into buffered frames, executes them either inline or on a
//! dedicated render thread, and reclaims GPU-visible resources only once
//! a fence has proven the hardware is done with them.
//!
//! ## Architecture
//!
//! - **[`RenderSystem`]**: the single scheduler object — construct once,
//!   share by reference, drop (or `shutdown`) to tear down.
//! - **[`RenderBackend`]**: the dispatch seam. One concrete backend per
//!   process implements every native operation; the scheduling core calls
//!   nothing else. [`NullBackend`] satisfies the contract with no device,
//!   for headless and test execution.
//! - **Frame ring**: up to `frame_pool_size` frames buffer between the
//!   recording producer and the executor; `present` applies backpressure
//!   only when the configured buffering depth is reached.
//! - **Packet submission**: draw packets are recorded into per-pass
//!   command buffers with redundant state changes coalesced away.
//! - **Resource acquisition**: shareable state objects (texture sets,
//!   depth/stencil and sampler states) are deduplicated by descriptor
//!   value and reference-counted.
//! - **Scheduled deletion**: released resources are bucketed behind the
//!   current frame's fence and physically freed only after it signals.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rhi_core::{Handle, NullBackend, Packet, RenderConfig, RenderPassConfig, RenderSystem};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = Arc::new(NullBackend::new());
//!     let system = RenderSystem::new(backend, RenderConfig::threaded(2))?;
//!
//!     let (pass, lists) = system.allocate_render_pass(&RenderPassConfig::default(), 1)?;
//!     system.begin_render_pass(pass);
//!     system.begin_packet_list(lists[0]);
//!     system.add_packet(lists[0], &Packet { primitive_count: 1, ..Packet::default() });
//!     system.end_packet_list(lists[0], Handle::INVALID);
//!     system.end_render_pass(pass);
//!
//!     system.present()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod backend;
pub mod config;
pub mod error;
pub mod handle;
pub mod null_backend;
pub mod pool;
pub mod types;

mod concurrency;
mod frame_pool;
mod packet_list;
mod render_loop;
mod resources;
mod system;

pub use backend::{BackendResult, FrameExecution, ImmediateCommand, RenderBackend};
pub use config::{ConfigError, PoolCapacities, RenderConfig};
pub use error::{ErrorCallback, RenderError, RenderResult, RenderingFailure};
pub use handle::{Handle, ResourceKind};
pub use null_backend::{NullBackend, NullBackendStats};
pub use pool::HandlePool;
pub use system::RenderSystem;
pub use types::{
    BlendState, BufferUsage, ColorBufferConfig, CompareFunc, CullMode, DepthStencilBufferConfig,
    DepthStencilStateDescriptor, DeviceCaps, FillMode, IndexBufferDescriptor, IndexSize,
    LoadAction, Packet, PacketOptions, PipelineStateDescriptor, PrimitiveType, RenderPassConfig,
    ResetParam, SamplerDescriptor, SamplerStateDescriptor, ScissorRect, StencilDescriptor,
    StencilOperation, StoreAction, TextureAddrMode, TextureDescriptor, TextureFace, TextureFilter,
    TextureFormat, TextureMipFilter, TextureSetDescriptor, TextureType, VertexBufferDescriptor,
    Viewport, INVALID_QUERY_INDEX, MAX_CONST_BUFFER_COUNT, MAX_FRAGMENT_TEXTURE_COUNT,
    MAX_PASS_COMMAND_BUFFER_COUNT, MAX_RENDER_TARGET_COUNT, MAX_VERTEX_STREAM_COUNT,
    MAX_VERTEX_TEXTURE_COUNT,
};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        Handle, NullBackend, Packet, PacketOptions, RenderBackend, RenderConfig, RenderError,
        RenderPassConfig, RenderResult, RenderSystem, ResetParam, TextureSetDescriptor,
    };
}
