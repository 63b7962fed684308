//! Value types shared between the producer API and the backend seam
//!
//! Everything here is plain data: draw packets, resource descriptors, pass
//! configuration and the small enums they reference. Descriptors for the
//! shareable state objects (samplers, depth/stencil) derive `PartialEq`
//! because the acquisition layer deduplicates them by value equality.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::handle::Handle;

/// Maximum number of vertex streams bound by one packet.
pub const MAX_VERTEX_STREAM_COUNT: usize = 4;
/// Maximum number of constant buffers per shader stage.
pub const MAX_CONST_BUFFER_COUNT: usize = 8;
/// Maximum number of fragment-stage textures in a texture set.
pub const MAX_FRAGMENT_TEXTURE_COUNT: usize = 8;
/// Maximum number of vertex-stage textures in a texture set.
pub const MAX_VERTEX_TEXTURE_COUNT: usize = 2;
/// Maximum number of color targets in one render pass.
pub const MAX_RENDER_TARGET_COUNT: usize = 4;
/// Maximum number of command buffers allocated for one render pass.
pub const MAX_PASS_COMMAND_BUFFER_COUNT: usize = 8;
/// Query index value meaning "no query slot".
pub const INVALID_QUERY_INDEX: u32 = u32::MAX;

/// Primitive topology of a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    /// Independent triangles
    TriangleList,
    /// Triangle strip
    TriangleStrip,
    /// Independent line segments
    LineList,
}

/// Face culling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    /// No culling
    None,
    /// Cull clockwise-wound faces
    Clockwise,
    /// Cull counter-clockwise-wound faces
    CounterClockwise,
}

impl CullMode {
    /// Winding-flipped counterpart, used when a pass renders into a
    /// vertically inverted target.
    #[must_use]
    pub fn inverted(self) -> Self {
        match self {
            Self::None => Self::None,
            Self::Clockwise => Self::CounterClockwise,
            Self::CounterClockwise => Self::Clockwise,
        }
    }
}

/// Polygon fill mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillMode {
    /// Filled polygons
    Solid,
    /// Wireframe outlines
    Wireframe,
}

/// What happens to a target's previous contents when a pass begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadAction {
    /// Contents are undefined
    #[default]
    None,
    /// Clear to the configured value
    Clear,
    /// Preserve previous contents
    Load,
}

/// What happens to a target's contents when a pass ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreAction {
    /// Contents may be discarded
    #[default]
    None,
    /// Contents are written out
    Store,
    /// Multisampled contents are resolved
    Resolve,
}

/// Index element width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexSize {
    /// 16-bit indices
    #[default]
    Bits16,
    /// 32-bit indices
    Bits32,
}

/// Buffer update frequency hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferUsage {
    /// Backend default
    #[default]
    Default,
    /// Written once, drawn many times
    Static,
    /// Rewritten frequently
    Dynamic,
}

/// Texture dimensionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureType {
    /// Two-dimensional texture
    #[default]
    D2,
    /// Cube map
    Cube,
}

/// Texel storage format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureFormat {
    /// 8-bit RGBA
    #[default]
    Rgba8,
    /// 8-bit RGB
    Rgb8,
    /// Single 8-bit channel
    R8,
    /// 16-bit depth
    D16,
    /// 24-bit depth with 8-bit stencil
    D24S8,
    /// Half-float RGBA
    Rgba16F,
    /// Full-float RGBA
    Rgba32F,
}

/// Cube map face selector for texture updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureFace {
    /// Not a cube map access
    #[default]
    None,
    /// +X face
    PositiveX,
    /// -X face
    NegativeX,
    /// +Y face
    PositiveY,
    /// -Y face
    NegativeY,
    /// +Z face
    PositiveZ,
    /// -Z face
    NegativeZ,
}

/// Texture coordinate addressing outside [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureAddrMode {
    /// Repeat the texture
    #[default]
    Wrap,
    /// Clamp to the edge texel
    Clamp,
    /// Mirror on each repeat
    Mirror,
}

/// Texel filtering within a mip level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureFilter {
    /// Nearest-neighbor
    Nearest,
    /// Linear interpolation
    #[default]
    Linear,
}

/// Filtering between mip levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureMipFilter {
    /// No mipmapping
    None,
    /// Nearest mip level
    Nearest,
    /// Linear blend between mip levels
    #[default]
    Linear,
}

/// Depth/stencil comparison function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompareFunc {
    /// Never passes
    Never,
    /// Passes when incoming < stored
    Less,
    /// Passes on equality
    Equal,
    /// Passes when incoming <= stored
    #[default]
    LessEqual,
    /// Passes when incoming > stored
    Greater,
    /// Passes on inequality
    NotEqual,
    /// Passes when incoming >= stored
    GreaterEqual,
    /// Always passes
    Always,
}

/// Stencil update operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StencilOperation {
    /// Keep the stored value
    #[default]
    Keep,
    /// Zero the stored value
    Zero,
    /// Replace with the reference value
    Replace,
    /// Bitwise invert
    Invert,
    /// Increment with clamping
    IncrementClamp,
    /// Decrement with clamping
    DecrementClamp,
    /// Increment with wrap-around
    IncrementWrap,
    /// Decrement with wrap-around
    DecrementWrap,
}

/// Rectangular viewport in target pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    /// Left edge
    pub x: u32,
    /// Top edge
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Viewport {
    /// Creates a viewport covering the given rectangle.
    #[must_use]
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }
}

/// Scissor rectangle; the all-zero default means "target-sized".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScissorRect {
    /// Left edge
    pub x: u32,
    /// Top edge
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// Vertex buffer creation parameters.
#[derive(Debug, Clone, Default)]
pub struct VertexBufferDescriptor {
    /// Size in bytes
    pub size: u32,
    /// Update frequency hint
    pub usage: BufferUsage,
    /// Optional initial contents (must not exceed `size`)
    pub initial_data: Option<Vec<u8>>,
}

/// Index buffer creation parameters.
#[derive(Debug, Clone, Default)]
pub struct IndexBufferDescriptor {
    /// Size in bytes
    pub size: u32,
    /// Index element width
    pub index_size: IndexSize,
    /// Update frequency hint
    pub usage: BufferUsage,
    /// Optional initial contents (must not exceed `size`)
    pub initial_data: Option<Vec<u8>>,
}

/// Texture creation parameters.
#[derive(Debug, Clone)]
pub struct TextureDescriptor {
    /// Dimensionality
    pub texture_type: TextureType,
    /// Width in texels
    pub width: u32,
    /// Height in texels
    pub height: u32,
    /// Texel format
    pub format: TextureFormat,
    /// Number of mip levels
    pub level_count: u32,
    /// Whether the texture can be bound as a render target
    pub is_render_target: bool,
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            texture_type: TextureType::D2,
            width: 0,
            height: 0,
            format: TextureFormat::Rgba8,
            level_count: 1,
            is_render_target: false,
        }
    }
}

/// Blend configuration for one render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlendState {
    /// Whether blending is enabled at all
    pub enabled: bool,
    /// Source-alpha blending (the only mode the packet path distinguishes)
    pub alpha_blend: bool,
}

/// Pipeline state creation parameters.
///
/// Shader programs are referenced by name; compilation and caching live
/// behind the backend seam.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PipelineStateDescriptor {
    /// Vertex program identifier
    pub vertex_program: String,
    /// Fragment program identifier
    pub fragment_program: String,
    /// Blend configuration
    pub blending: BlendState,
}

/// One sampler's filtering and addressing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SamplerDescriptor {
    /// U-axis addressing
    pub addr_u: TextureAddrMode,
    /// V-axis addressing
    pub addr_v: TextureAddrMode,
    /// W-axis addressing
    pub addr_w: TextureAddrMode,
    /// Minification filter
    pub min_filter: TextureFilter,
    /// Magnification filter
    pub mag_filter: TextureFilter,
    /// Mip-level filter
    pub mip_filter: TextureMipFilter,
    /// Anisotropic filtering level (1 = off)
    pub anisotropy_level: u8,
}

/// Sampler state object creation parameters.
#[derive(Debug, Clone, Copy)]
pub struct SamplerStateDescriptor {
    /// Fragment-stage samplers
    pub fragment_samplers: [SamplerDescriptor; MAX_FRAGMENT_TEXTURE_COUNT],
    /// Number of fragment samplers in use
    pub fragment_sampler_count: u32,
    /// Vertex-stage samplers
    pub vertex_samplers: [SamplerDescriptor; MAX_VERTEX_TEXTURE_COUNT],
    /// Number of vertex samplers in use
    pub vertex_sampler_count: u32,
}

impl Default for SamplerStateDescriptor {
    fn default() -> Self {
        Self {
            fragment_samplers: [SamplerDescriptor::default(); MAX_FRAGMENT_TEXTURE_COUNT],
            fragment_sampler_count: 0,
            vertex_samplers: [SamplerDescriptor::default(); MAX_VERTEX_TEXTURE_COUNT],
            vertex_sampler_count: 0,
        }
    }
}

impl PartialEq for SamplerStateDescriptor {
    fn eq(&self, other: &Self) -> bool {
        // Only the in-use prefix participates in identity.
        self.fragment_sampler_count == other.fragment_sampler_count
            && self.vertex_sampler_count == other.vertex_sampler_count
            && self.fragment_samplers[..self.fragment_sampler_count as usize]
                == other.fragment_samplers[..other.fragment_sampler_count as usize]
            && self.vertex_samplers[..self.vertex_sampler_count as usize]
                == other.vertex_samplers[..other.vertex_sampler_count as usize]
    }
}

/// Per-face stencil configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StencilDescriptor {
    /// Bits compared by the stencil test
    pub read_mask: u8,
    /// Bits written by stencil updates
    pub write_mask: u8,
    /// Reference value
    pub ref_value: u8,
    /// Comparison function
    pub func: CompareFunc,
    /// Operation on stencil-test failure
    pub fail_operation: StencilOperation,
    /// Operation on depth-test failure
    pub depth_fail_operation: StencilOperation,
    /// Operation when both tests pass
    pub depth_stencil_pass_operation: StencilOperation,
}

impl Default for StencilDescriptor {
    fn default() -> Self {
        Self {
            read_mask: 0xFF,
            write_mask: 0xFF,
            ref_value: 0,
            func: CompareFunc::Always,
            fail_operation: StencilOperation::Keep,
            depth_fail_operation: StencilOperation::Keep,
            depth_stencil_pass_operation: StencilOperation::Keep,
        }
    }
}

/// Depth/stencil state object creation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthStencilStateDescriptor {
    /// Whether depth testing is enabled
    pub depth_test_enabled: bool,
    /// Whether depth writes are enabled
    pub depth_write_enabled: bool,
    /// Depth comparison function
    pub depth_func: CompareFunc,
    /// Whether stencil testing is enabled
    pub stencil_enabled: bool,
    /// Whether front and back faces use separate stencil configuration
    pub stencil_two_sided: bool,
    /// Front-face stencil configuration
    pub stencil_front: StencilDescriptor,
    /// Back-face stencil configuration
    pub stencil_back: StencilDescriptor,
}

impl Default for DepthStencilStateDescriptor {
    fn default() -> Self {
        Self {
            depth_test_enabled: true,
            depth_write_enabled: true,
            depth_func: CompareFunc::LessEqual,
            stencil_enabled: false,
            stencil_two_sided: false,
            stencil_front: StencilDescriptor::default(),
            stencil_back: StencilDescriptor::default(),
        }
    }
}

/// Texture set identity: the textures bound per shader stage.
#[derive(Debug, Clone, Copy)]
pub struct TextureSetDescriptor {
    /// Fragment-stage textures
    pub fragment_textures: [Handle; MAX_FRAGMENT_TEXTURE_COUNT],
    /// Number of fragment textures in use
    pub fragment_texture_count: u32,
    /// Vertex-stage textures
    pub vertex_textures: [Handle; MAX_VERTEX_TEXTURE_COUNT],
    /// Number of vertex textures in use
    pub vertex_texture_count: u32,
}

impl Default for TextureSetDescriptor {
    fn default() -> Self {
        Self {
            fragment_textures: [Handle::INVALID; MAX_FRAGMENT_TEXTURE_COUNT],
            fragment_texture_count: 0,
            vertex_textures: [Handle::INVALID; MAX_VERTEX_TEXTURE_COUNT],
            vertex_texture_count: 0,
        }
    }
}

impl TextureSetDescriptor {
    /// Descriptor for the common single fragment texture case.
    #[must_use]
    pub fn single(texture: Handle) -> Self {
        let mut desc = Self::default();
        desc.fragment_textures[0] = texture;
        desc.fragment_texture_count = 1;
        desc
    }
}

impl PartialEq for TextureSetDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.fragment_texture_count == other.fragment_texture_count
            && self.vertex_texture_count == other.vertex_texture_count
            && self.fragment_textures[..self.fragment_texture_count as usize]
                == other.fragment_textures[..other.fragment_texture_count as usize]
            && self.vertex_textures[..self.vertex_texture_count as usize]
                == other.vertex_textures[..other.vertex_texture_count as usize]
    }
}

/// One color target of a render pass.
#[derive(Debug, Clone, Copy)]
pub struct ColorBufferConfig {
    /// Target texture (`Handle::INVALID` = default back buffer)
    pub texture: Handle,
    /// Load behavior at pass begin
    pub load_action: LoadAction,
    /// Store behavior at pass end
    pub store_action: StoreAction,
    /// Clear color when `load_action` is `Clear`
    pub clear_color: [f32; 4],
}

impl Default for ColorBufferConfig {
    fn default() -> Self {
        Self {
            texture: Handle::INVALID,
            load_action: LoadAction::Clear,
            store_action: StoreAction::None,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// Depth/stencil target of a render pass.
#[derive(Debug, Clone, Copy)]
pub struct DepthStencilBufferConfig {
    /// Target texture (`Handle::INVALID` = default depth buffer)
    pub texture: Handle,
    /// Load behavior at pass begin
    pub load_action: LoadAction,
    /// Store behavior at pass end
    pub store_action: StoreAction,
    /// Clear depth when `load_action` is `Clear`
    pub clear_depth: f32,
    /// Clear stencil when `load_action` is `Clear`
    pub clear_stencil: u32,
}

impl Default for DepthStencilBufferConfig {
    fn default() -> Self {
        Self {
            texture: Handle::INVALID,
            load_action: LoadAction::Clear,
            store_action: StoreAction::None,
            clear_depth: 1.0,
            clear_stencil: 0,
        }
    }
}

/// Render pass configuration.
///
/// `priority` orders passes within one frame at execution time: higher
/// values execute first, equal values keep submission order.
#[derive(Debug, Clone, Default)]
pub struct RenderPassConfig {
    /// Color targets
    pub color_buffers: [ColorBufferConfig; MAX_RENDER_TARGET_COUNT],
    /// Depth/stencil target
    pub depth_stencil_buffer: DepthStencilBufferConfig,
    /// Viewport applied to the pass's first command buffer
    pub viewport: Viewport,
    /// Execution priority within the frame
    pub priority: i32,
    /// Whether cull winding is inverted (vertically flipped target)
    pub invert_culling: bool,
    /// Query buffer bound for the whole pass
    pub query_buffer: Handle,
    /// Timestamp query issued when the pass starts
    pub perf_query_start: Handle,
    /// Timestamp query issued when the pass ends
    pub perf_query_end: Handle,
}

bitflags! {
    /// Per-packet behavior overrides.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PacketOptions: u32 {
        /// Apply the packet's scissor rect for this packet only
        const OVERRIDE_SCISSOR = 0x1;
        /// Draw this packet in wireframe fill mode
        const WIREFRAME = 0x2;
    }
}

/// Complete description of one draw call.
///
/// Packets reference pool handles and never own them; the referenced
/// resources must stay alive until the frame recording them has executed
/// (which the scheduled-deletion path guarantees for released resources).
#[derive(Debug, Clone)]
pub struct Packet {
    /// Number of vertex streams in use
    pub vertex_stream_count: u32,
    /// Vertex buffer per stream
    pub vertex_streams: [Handle; MAX_VERTEX_STREAM_COUNT],
    /// Total vertex count (required for indexed draws)
    pub vertex_count: u32,
    /// First vertex offset
    pub base_vertex: u32,
    /// First index offset
    pub start_index: u32,
    /// Opaque vertex layout identifier (0 = pipeline default)
    pub vertex_layout: u32,
    /// Index buffer (`Handle::INVALID` = non-indexed draw)
    pub index_buffer: Handle,
    /// Pipeline state
    pub pipeline_state: Handle,
    /// Depth/stencil state (`Handle::INVALID` = pass default)
    pub depth_stencil_state: Handle,
    /// Sampler state (`Handle::INVALID` = pass default)
    pub sampler_state: Handle,
    /// Face culling mode
    pub cull_mode: CullMode,
    /// Scissor rect used with [`PacketOptions::OVERRIDE_SCISSOR`]
    pub scissor_rect: ScissorRect,
    /// Number of vertex-stage constant buffers
    pub vertex_const_count: u32,
    /// Vertex-stage constant buffers
    pub vertex_const: [Handle; MAX_CONST_BUFFER_COUNT],
    /// Number of fragment-stage constant buffers
    pub fragment_const_count: u32,
    /// Fragment-stage constant buffers
    pub fragment_const: [Handle; MAX_CONST_BUFFER_COUNT],
    /// Texture set bound for the draw
    pub texture_set: Handle,
    /// Primitive topology
    pub primitive_type: PrimitiveType,
    /// Number of primitives
    pub primitive_count: u32,
    /// Instance count (0 = non-instanced)
    pub instance_count: u32,
    /// First instance offset
    pub base_instance: u32,
    /// Slot in the pass query buffer ([`INVALID_QUERY_INDEX`] = none)
    pub query_index: u32,
    /// Timestamp query issued before the draw
    pub perf_query_start: Handle,
    /// Timestamp query issued after the draw
    pub perf_query_end: Handle,
    /// Behavior overrides
    pub options: PacketOptions,
}

impl Default for Packet {
    fn default() -> Self {
        Self {
            vertex_stream_count: 0,
            vertex_streams: [Handle::INVALID; MAX_VERTEX_STREAM_COUNT],
            vertex_count: 0,
            base_vertex: 0,
            start_index: 0,
            vertex_layout: 0,
            index_buffer: Handle::INVALID,
            pipeline_state: Handle::INVALID,
            depth_stencil_state: Handle::INVALID,
            sampler_state: Handle::INVALID,
            cull_mode: CullMode::CounterClockwise,
            scissor_rect: ScissorRect::default(),
            vertex_const_count: 0,
            vertex_const: [Handle::INVALID; MAX_CONST_BUFFER_COUNT],
            fragment_const_count: 0,
            fragment_const: [Handle::INVALID; MAX_CONST_BUFFER_COUNT],
            texture_set: Handle::INVALID,
            primitive_type: PrimitiveType::TriangleList,
            primitive_count: 0,
            instance_count: 0,
            base_instance: 0,
            query_index: INVALID_QUERY_INDEX,
            perf_query_start: Handle::INVALID,
            perf_query_end: Handle::INVALID,
            options: PacketOptions::empty(),
        }
    }
}

/// Device re-initialization parameters for [`crate::RenderSystem::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetParam {
    /// New surface width
    pub width: u32,
    /// New surface height
    pub height: u32,
    /// Whether the surface is fullscreen
    pub fullscreen: bool,
    /// Whether presentation waits for vertical sync
    pub vsync: bool,
}

impl Default for ResetParam {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            fullscreen: false,
            vsync: true,
        }
    }
}

/// Capability report from the active backend.
#[derive(Debug, Clone)]
pub struct DeviceCaps {
    /// Maximum anisotropic filtering level
    pub max_anisotropy: u32,
    /// Maximum texture dimension
    pub max_texture_size: u32,
    /// Whether 32-bit index buffers are supported
    pub is_32bit_indices_supported: bool,
    /// Whether instanced draws are supported
    pub is_instancing_supported: bool,
    /// Whether timestamp queries are supported
    pub is_perf_query_supported: bool,
    /// Human-readable device description
    pub device_description: String,
}

impl Default for DeviceCaps {
    fn default() -> Self {
        Self {
            max_anisotropy: 1,
            max_texture_size: 2048,
            is_32bit_indices_supported: false,
            is_instancing_supported: false,
            is_perf_query_supported: false,
            device_description: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::ResourceKind;

    #[test]
    fn test_packet_defaults() {
        let packet = Packet::default();
        assert_eq!(packet.cull_mode, CullMode::CounterClockwise);
        assert_eq!(packet.query_index, INVALID_QUERY_INDEX);
        assert!(!packet.index_buffer.is_valid());
        assert!(packet.options.is_empty());
    }

    #[test]
    fn test_cull_mode_inversion() {
        assert_eq!(CullMode::Clockwise.inverted(), CullMode::CounterClockwise);
        assert_eq!(CullMode::CounterClockwise.inverted(), CullMode::Clockwise);
        assert_eq!(CullMode::None.inverted(), CullMode::None);
    }

    #[test]
    fn test_texture_set_descriptor_compares_used_prefix_only() {
        let tex = Handle::pack(3, 1, ResourceKind::Texture);
        let other = Handle::pack(4, 1, ResourceKind::Texture);

        let a = TextureSetDescriptor::single(tex);
        let mut b = TextureSetDescriptor::single(tex);
        // Garbage beyond the used prefix must not affect identity.
        b.fragment_textures[5] = other;
        assert_eq!(a, b);

        let c = TextureSetDescriptor::single(other);
        assert_ne!(a, c);
    }

    #[test]
    fn test_sampler_state_descriptor_equality() {
        let mut a = SamplerStateDescriptor::default();
        a.fragment_sampler_count = 1;
        a.fragment_samplers[0].anisotropy_level = 4;

        let mut b = SamplerStateDescriptor::default();
        b.fragment_sampler_count = 1;
        b.fragment_samplers[0].anisotropy_level = 4;
        assert_eq!(a, b);

        b.fragment_samplers[0].min_filter = TextureFilter::Nearest;
        assert_ne!(a, b);
    }
}
