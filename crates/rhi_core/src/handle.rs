//! Opaque resource handles
//!
//! Every object owned by a resource pool is referenced through a `Handle`:
//! a packed 32-bit value carrying the slot index, a generation counter that
//! detects stale references, and a tag identifying the resource kind. The
//! pool owns the object; handles are freely copyable references and never
//! imply ownership.

/// Identifies which pool a handle belongs to.
///
/// The tag is packed into the handle itself so that mixing handles between
/// pools (e.g. passing a texture handle where a buffer is expected) is
/// caught at the pool boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ResourceKind {
    /// Vertex buffer
    VertexBuffer = 1,
    /// Index buffer
    IndexBuffer = 2,
    /// Shader constant buffer
    ConstBuffer = 3,
    /// Texture
    Texture = 4,
    /// Pipeline state object
    PipelineState = 5,
    /// Render pass
    RenderPass = 6,
    /// Command buffer
    CommandBuffer = 7,
    /// Depth/stencil state object
    DepthStencilState = 8,
    /// Sampler state object
    SamplerState = 9,
    /// GPU fence
    SyncObject = 10,
    /// Packet list (recording context for one command buffer)
    PacketList = 11,
    /// Shared texture set
    TextureSet = 12,
    /// Occlusion-style query buffer
    QueryBuffer = 13,
    /// Timestamp performance query
    PerfQuery = 14,
}

impl ResourceKind {
    fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            1 => Some(Self::VertexBuffer),
            2 => Some(Self::IndexBuffer),
            3 => Some(Self::ConstBuffer),
            4 => Some(Self::Texture),
            5 => Some(Self::PipelineState),
            6 => Some(Self::RenderPass),
            7 => Some(Self::CommandBuffer),
            8 => Some(Self::DepthStencilState),
            9 => Some(Self::SamplerState),
            10 => Some(Self::SyncObject),
            11 => Some(Self::PacketList),
            12 => Some(Self::TextureSet),
            13 => Some(Self::QueryBuffer),
            14 => Some(Self::PerfQuery),
            _ => None,
        }
    }
}

const INDEX_MASK: u32 = 0x0000_FFFF;
const INDEX_SHIFT: u32 = 0;
const GENERATION_MASK: u32 = 0x00FF_0000;
const GENERATION_SHIFT: u32 = 16;
const KIND_MASK: u32 = 0xFF00_0000;
const KIND_SHIFT: u32 = 24;

/// Opaque reference to an object inside a typed resource pool.
///
/// `Handle::INVALID` (the zero value) is the universal "no resource"
/// sentinel; a valid handle always carries a non-zero kind tag, so the two
/// can never collide.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Handle(u32);

impl Handle {
    /// The "no resource" sentinel.
    pub const INVALID: Handle = Handle(0);

    pub(crate) fn pack(index: u32, generation: u32, kind: ResourceKind) -> Self {
        debug_assert!(index <= INDEX_MASK >> INDEX_SHIFT);
        Handle(
            ((index << INDEX_SHIFT) & INDEX_MASK)
                | ((generation << GENERATION_SHIFT) & GENERATION_MASK)
                | (((kind as u32) << KIND_SHIFT) & KIND_MASK),
        )
    }

    /// Whether this handle refers to a resource at all.
    ///
    /// A valid handle may still be stale; pools detect that through the
    /// generation check on access.
    #[must_use]
    pub fn is_valid(self) -> bool {
        self.0 != 0
    }

    /// Slot index inside the owning pool.
    #[must_use]
    pub fn index(self) -> usize {
        ((self.0 & INDEX_MASK) >> INDEX_SHIFT) as usize
    }

    /// Generation the slot had when this handle was issued.
    #[must_use]
    pub fn generation(self) -> u32 {
        (self.0 & GENERATION_MASK) >> GENERATION_SHIFT
    }

    /// Kind tag carried by the handle, if it decodes to a known kind.
    #[must_use]
    pub fn kind(self) -> Option<ResourceKind> {
        ResourceKind::from_bits((self.0 & KIND_MASK) >> KIND_SHIFT)
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_valid() {
            write!(
                f,
                "Handle({:?}, index: {}, generation: {})",
                self.kind(),
                self.index(),
                self.generation()
            )
        } else {
            write!(f, "Handle(invalid)")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_roundtrip() {
        let handle = Handle::pack(42, 7, ResourceKind::Texture);
        assert!(handle.is_valid());
        assert_eq!(handle.index(), 42);
        assert_eq!(handle.generation(), 7);
        assert_eq!(handle.kind(), Some(ResourceKind::Texture));
    }

    #[test]
    fn test_invalid_sentinel() {
        assert!(!Handle::INVALID.is_valid());
        assert_eq!(Handle::default(), Handle::INVALID);
        assert_eq!(Handle::INVALID.kind(), None);
    }

    #[test]
    fn test_zero_index_and_generation_is_still_valid() {
        // The kind tag alone keeps a real handle distinct from the sentinel.
        let handle = Handle::pack(0, 0, ResourceKind::VertexBuffer);
        assert!(handle.is_valid());
        assert_ne!(handle, Handle::INVALID);
    }

    #[test]
    fn test_generation_wraps_within_field() {
        let handle = Handle::pack(1, 0x1FF, ResourceKind::SyncObject);
        assert_eq!(handle.generation(), 0xFF);
    }
}
