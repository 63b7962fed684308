//! Resource acquisition and lifetime wrappers
//!
//! Two kinds of operations live here:
//!
//! - Thin create/update/delete wrappers for plain resources (buffers,
//!   textures, pipeline states, queries). Deletes default to the
//!   scheduled path: the handle lands in the current fence bucket and is
//!   physically freed only after the GPU provably finished every draw
//!   that references it.
//! - The acquisition catalogs for shareable, immutable state objects
//!   (texture sets, depth/stencil states, sampler states). Acquisition
//!   deduplicates by descriptor value equality and reference-counts the
//!   result; the backend object is created once per distinct descriptor
//!   and destroyed exactly once, when the count reaches zero.

use crate::concurrency::lock;
use crate::error::RenderResult;
use crate::handle::{Handle, ResourceKind};
use crate::system::RenderCore;
use crate::types::{
    DepthStencilStateDescriptor, IndexBufferDescriptor, PipelineStateDescriptor,
    SamplerStateDescriptor, TextureDescriptor, TextureFace, TextureSetDescriptor,
    VertexBufferDescriptor, MAX_FRAGMENT_TEXTURE_COUNT, MAX_VERTEX_TEXTURE_COUNT,
};

/// Shared texture set: the resolved per-stage texture bindings plus the
/// reference count keeping them alive.
pub(crate) struct TextureSet {
    pub(crate) fragment_textures: [Handle; MAX_FRAGMENT_TEXTURE_COUNT],
    pub(crate) fragment_texture_count: u32,
    pub(crate) vertex_textures: [Handle; MAX_VERTEX_TEXTURE_COUNT],
    pub(crate) vertex_texture_count: u32,
    ref_count: u32,
}

/// Catalog entry mapping a texture set descriptor to its live handle.
pub(crate) struct TextureSetEntry {
    desc: TextureSetDescriptor,
    handle: Handle,
}

/// Catalog entry for a backend-owned shareable state object.
pub(crate) struct SharedStateEntry<D> {
    desc: D,
    state: Handle,
    ref_count: u32,
}

impl RenderCore {
    // === Vertex buffers ===

    pub(crate) fn create_vertex_buffer(
        &self,
        desc: &VertexBufferDescriptor,
    ) -> RenderResult<Handle> {
        self.backend.create_vertex_buffer(desc)
    }

    pub(crate) fn update_vertex_buffer(
        &self,
        buffer: Handle,
        data: &[u8],
        offset: u32,
    ) -> RenderResult<()> {
        self.backend.update_vertex_buffer(buffer, data, offset)
    }

    pub(crate) fn delete_vertex_buffer(&self, buffer: Handle, schedule_deletion: bool) {
        if !buffer.is_valid() {
            return;
        }
        if schedule_deletion {
            self.schedule_resource_deletion(buffer, ResourceKind::VertexBuffer);
        } else {
            self.backend.delete_vertex_buffer(buffer);
        }
    }

    // === Index buffers ===

    pub(crate) fn create_index_buffer(&self, desc: &IndexBufferDescriptor) -> RenderResult<Handle> {
        self.backend.create_index_buffer(desc)
    }

    pub(crate) fn update_index_buffer(
        &self,
        buffer: Handle,
        data: &[u8],
        offset: u32,
    ) -> RenderResult<()> {
        self.backend.update_index_buffer(buffer, data, offset)
    }

    pub(crate) fn delete_index_buffer(&self, buffer: Handle, schedule_deletion: bool) {
        if !buffer.is_valid() {
            return;
        }
        if schedule_deletion {
            self.schedule_resource_deletion(buffer, ResourceKind::IndexBuffer);
        } else {
            self.backend.delete_index_buffer(buffer);
        }
    }

    // === Textures ===

    pub(crate) fn create_texture(&self, desc: &TextureDescriptor) -> RenderResult<Handle> {
        self.backend.create_texture(desc)
    }

    pub(crate) fn update_texture(
        &self,
        texture: Handle,
        data: &[u8],
        level: u32,
        face: TextureFace,
    ) -> RenderResult<()> {
        self.backend.update_texture(texture, data, level, face)
    }

    pub(crate) fn delete_texture(&self, texture: Handle, schedule_deletion: bool) {
        if !texture.is_valid() {
            return;
        }
        if schedule_deletion {
            self.schedule_resource_deletion(texture, ResourceKind::Texture);
        } else {
            self.backend.delete_texture(texture);
        }
    }

    // === Pipeline states & constant buffers ===

    pub(crate) fn create_pipeline_state(
        &self,
        desc: &PipelineStateDescriptor,
    ) -> RenderResult<Handle> {
        self.backend.create_pipeline_state(desc)
    }

    pub(crate) fn delete_pipeline_state(&self, pipeline_state: Handle, schedule_deletion: bool) {
        if !pipeline_state.is_valid() {
            return;
        }
        if schedule_deletion {
            self.schedule_resource_deletion(pipeline_state, ResourceKind::PipelineState);
        } else {
            self.backend.delete_pipeline_state(pipeline_state);
        }
    }

    pub(crate) fn create_vertex_const_buffer(
        &self,
        pipeline_state: Handle,
        index: u32,
    ) -> RenderResult<Handle> {
        self.backend.create_vertex_const_buffer(pipeline_state, index)
    }

    pub(crate) fn create_fragment_const_buffer(
        &self,
        pipeline_state: Handle,
        index: u32,
    ) -> RenderResult<Handle> {
        self.backend
            .create_fragment_const_buffer(pipeline_state, index)
    }

    pub(crate) fn update_const_buffer(
        &self,
        buffer: Handle,
        offset: u32,
        data: &[f32],
    ) -> RenderResult<()> {
        self.backend.update_const_buffer(buffer, offset, data)
    }

    pub(crate) fn delete_const_buffer(&self, buffer: Handle, schedule_deletion: bool) {
        if !buffer.is_valid() {
            return;
        }
        if schedule_deletion {
            self.schedule_resource_deletion(buffer, ResourceKind::ConstBuffer);
        } else {
            self.backend.delete_const_buffer(buffer);
        }
    }

    // === Queries ===

    pub(crate) fn create_query_buffer(&self, max_object_count: u32) -> RenderResult<Handle> {
        self.backend.create_query_buffer(max_object_count)
    }

    pub(crate) fn delete_query_buffer(&self, query_buffer: Handle, schedule_deletion: bool) {
        if !query_buffer.is_valid() {
            return;
        }
        if schedule_deletion {
            self.schedule_resource_deletion(query_buffer, ResourceKind::QueryBuffer);
        } else {
            self.backend.delete_query_buffer(query_buffer);
        }
    }

    pub(crate) fn delete_perf_query(&self, perf_query: Handle, schedule_deletion: bool) {
        if !perf_query.is_valid() {
            return;
        }
        if schedule_deletion {
            self.schedule_resource_deletion(perf_query, ResourceKind::PerfQuery);
        } else {
            self.backend.delete_perf_query(perf_query);
        }
    }

    // === Texture sets ===

    /// Returns a handle to a texture set matching `desc`, creating it on
    /// first request and reference-counting every subsequent identical one.
    pub(crate) fn acquire_texture_set(&self, desc: &TextureSetDescriptor) -> Handle {
        let mut catalog = lock(&self.texture_set_catalog);
        for entry in catalog.iter() {
            if entry.desc == *desc {
                self.texture_sets
                    .with_mut(entry.handle, |set| set.ref_count += 1);
                return entry.handle;
            }
        }

        let handle = self.texture_sets.alloc(TextureSet {
            fragment_textures: desc.fragment_textures,
            fragment_texture_count: desc.fragment_texture_count,
            vertex_textures: desc.vertex_textures,
            vertex_texture_count: desc.vertex_texture_count,
            ref_count: 1,
        });
        catalog.push(TextureSetEntry {
            desc: *desc,
            handle,
        });
        handle
    }

    /// Adds a reference to an already-acquired texture set.
    pub(crate) fn copy_texture_set(&self, texture_set: Handle) -> Handle {
        if !texture_set.is_valid() {
            return Handle::INVALID;
        }
        self.texture_sets
            .with_mut(texture_set, |set| set.ref_count += 1);
        texture_set
    }

    /// Drops one reference; at zero the set is removed from the catalog
    /// and destroyed (deferred behind the current fence when
    /// `schedule_deletion` is set).
    pub(crate) fn release_texture_set(&self, texture_set: Handle, schedule_deletion: bool) {
        if !texture_set.is_valid() {
            return;
        }
        let last = self.texture_sets.with_mut(texture_set, |set| {
            debug_assert!(set.ref_count > 0);
            set.ref_count -= 1;
            set.ref_count == 0
        });
        if !last {
            return;
        }

        lock(&self.texture_set_catalog).retain(|entry| entry.handle != texture_set);
        if schedule_deletion {
            self.schedule_resource_deletion(texture_set, ResourceKind::TextureSet);
        } else {
            self.texture_sets.free(texture_set);
        }
    }

    /// Rewrites every live texture set (and its catalog descriptor) that
    /// references `old` to reference `new` instead.
    ///
    /// Used when an underlying texture is recreated, e.g. after a device
    /// reset, without invalidating every dependent composite object.
    pub(crate) fn replace_texture_in_all_texture_sets(&self, old: Handle, new: Handle) {
        let replace = |textures: &mut [Handle]| {
            for texture in textures {
                if *texture == old {
                    *texture = new;
                }
            }
        };

        let mut catalog = lock(&self.texture_set_catalog);
        for entry in catalog.iter_mut() {
            // Patch the live set object and its catalog descriptor in
            // step, so future acquisitions deduplicate against the new
            // texture.
            self.texture_sets.with_mut(entry.handle, |set| {
                replace(&mut set.fragment_textures[..set.fragment_texture_count as usize]);
                replace(&mut set.vertex_textures[..set.vertex_texture_count as usize]);
            });
            let count = entry.desc.fragment_texture_count as usize;
            replace(&mut entry.desc.fragment_textures[..count]);
            let count = entry.desc.vertex_texture_count as usize;
            replace(&mut entry.desc.vertex_textures[..count]);
        }
    }

    // === Depth/stencil states ===

    pub(crate) fn acquire_depth_stencil_state(
        &self,
        desc: &DepthStencilStateDescriptor,
    ) -> RenderResult<Handle> {
        let mut catalog = lock(&self.depth_stencil_catalog);
        for entry in catalog.iter_mut() {
            if entry.desc == *desc {
                entry.ref_count += 1;
                return Ok(entry.state);
            }
        }

        let state = self.backend.create_depth_stencil_state(desc)?;
        catalog.push(SharedStateEntry {
            desc: *desc,
            state,
            ref_count: 1,
        });
        Ok(state)
    }

    pub(crate) fn copy_depth_stencil_state(&self, state: Handle) -> Handle {
        let mut catalog = lock(&self.depth_stencil_catalog);
        for entry in catalog.iter_mut() {
            if entry.state == state {
                entry.ref_count += 1;
                return state;
            }
        }
        Handle::INVALID
    }

    pub(crate) fn release_depth_stencil_state(&self, state: Handle, schedule_deletion: bool) {
        let mut catalog = lock(&self.depth_stencil_catalog);
        if let Some(position) = catalog.iter().position(|entry| entry.state == state) {
            catalog[position].ref_count -= 1;
            if catalog[position].ref_count == 0 {
                catalog.remove(position);
                drop(catalog);
                if schedule_deletion {
                    self.schedule_resource_deletion(state, ResourceKind::DepthStencilState);
                } else {
                    self.backend.delete_depth_stencil_state(state);
                }
            }
        }
    }

    // === Sampler states ===

    pub(crate) fn acquire_sampler_state(
        &self,
        desc: &SamplerStateDescriptor,
    ) -> RenderResult<Handle> {
        let mut catalog = lock(&self.sampler_catalog);
        for entry in catalog.iter_mut() {
            if entry.desc == *desc {
                entry.ref_count += 1;
                return Ok(entry.state);
            }
        }

        let state = self.backend.create_sampler_state(desc)?;
        catalog.push(SharedStateEntry {
            desc: *desc,
            state,
            ref_count: 1,
        });
        Ok(state)
    }

    pub(crate) fn copy_sampler_state(&self, state: Handle) -> Handle {
        let mut catalog = lock(&self.sampler_catalog);
        for entry in catalog.iter_mut() {
            if entry.state == state {
                entry.ref_count += 1;
                return state;
            }
        }
        Handle::INVALID
    }

    pub(crate) fn release_sampler_state(&self, state: Handle, schedule_deletion: bool) {
        let mut catalog = lock(&self.sampler_catalog);
        if let Some(position) = catalog.iter().position(|entry| entry.state == state) {
            catalog[position].ref_count -= 1;
            if catalog[position].ref_count == 0 {
                catalog.remove(position);
                drop(catalog);
                if schedule_deletion {
                    self.schedule_resource_deletion(state, ResourceKind::SamplerState);
                } else {
                    self.backend.delete_sampler_state(state);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::config::RenderConfig;
    use crate::handle::Handle;
    use crate::null_backend::NullBackend;
    use crate::system::RenderSystem;
    use crate::types::{
        DepthStencilStateDescriptor, TextureDescriptor, TextureSetDescriptor,
    };

    fn inline_system() -> (RenderSystem, Arc<NullBackend>) {
        let backend = Arc::new(NullBackend::new());
        let system = RenderSystem::new(backend.clone(), RenderConfig::inline()).unwrap();
        (system, backend)
    }

    #[test]
    fn test_acquire_texture_set_deduplicates() {
        let (system, _) = inline_system();
        let texture = system.create_texture(&TextureDescriptor::default()).unwrap();
        let desc = TextureSetDescriptor::single(texture);

        let first = system.acquire_texture_set(&desc);
        let second = system.acquire_texture_set(&desc);
        let third = system.acquire_texture_set(&desc);
        assert_eq!(first, second);
        assert_eq!(first, third);

        // Three references: the set survives two releases, the third
        // removes it. Deletion is immediate here so the bookkeeping is
        // directly observable.
        system.release_texture_set(first, false);
        system.release_texture_set(first, false);
        let again = system.acquire_texture_set(&desc);
        assert_eq!(again, first); // still catalogued

        system.release_texture_set(first, false);
        system.release_texture_set(first, false);

        // Catalog is empty now: the same descriptor produces a fresh set.
        let fresh = system.acquire_texture_set(&desc);
        assert_ne!(fresh, Handle::INVALID);
        assert!(first.generation() != fresh.generation() || first.index() != fresh.index());
    }

    #[test]
    fn test_distinct_descriptors_do_not_share() {
        let (system, _) = inline_system();
        let texture_a = system.create_texture(&TextureDescriptor::default()).unwrap();
        let texture_b = system.create_texture(&TextureDescriptor::default()).unwrap();

        let set_a = system.acquire_texture_set(&TextureSetDescriptor::single(texture_a));
        let set_b = system.acquire_texture_set(&TextureSetDescriptor::single(texture_b));
        assert_ne!(set_a, set_b);
    }

    #[test]
    fn test_copy_texture_set_adds_a_reference() {
        let (system, _) = inline_system();
        let texture = system.create_texture(&TextureDescriptor::default()).unwrap();
        let desc = TextureSetDescriptor::single(texture);

        let set = system.acquire_texture_set(&desc);
        let copy = system.copy_texture_set(set);
        assert_eq!(set, copy);

        system.release_texture_set(set, false);
        // The copy's reference keeps the catalog entry alive.
        assert_eq!(system.acquire_texture_set(&desc), set);
        system.release_texture_set(set, false);
        system.release_texture_set(set, false);
    }

    #[test]
    fn test_depth_stencil_backend_object_created_and_destroyed_once() {
        let (system, backend) = inline_system();
        let live_before = backend.live_depth_stencil_states();

        let desc = DepthStencilStateDescriptor {
            depth_write_enabled: false,
            ..DepthStencilStateDescriptor::default()
        };
        let first = system.acquire_depth_stencil_state(&desc).unwrap();
        let second = system.acquire_depth_stencil_state(&desc).unwrap();
        let third = system.acquire_depth_stencil_state(&desc).unwrap();
        assert_eq!(first, second);
        assert_eq!(second, third);
        assert_eq!(backend.live_depth_stencil_states(), live_before + 1);

        system.release_depth_stencil_state(first, false);
        system.release_depth_stencil_state(first, false);
        assert_eq!(backend.live_depth_stencil_states(), live_before + 1);
        system.release_depth_stencil_state(first, false);
        assert_eq!(backend.live_depth_stencil_states(), live_before);
    }

    #[test]
    fn test_copy_unknown_state_returns_invalid() {
        let (system, _) = inline_system();
        assert_eq!(system.copy_depth_stencil_state(Handle::INVALID), Handle::INVALID);
        assert_eq!(system.copy_sampler_state(Handle::INVALID), Handle::INVALID);
    }

    #[test]
    fn test_replace_texture_rewrites_sets_and_catalog() {
        let (system, _) = inline_system();
        let old = system.create_texture(&TextureDescriptor::default()).unwrap();
        let new = system.create_texture(&TextureDescriptor::default()).unwrap();

        let set = system.acquire_texture_set(&TextureSetDescriptor::single(old));
        system.replace_texture_in_all_texture_sets(old, new);

        // The catalog descriptor was patched too: acquiring with the new
        // texture deduplicates against the rewritten entry...
        let same = system.acquire_texture_set(&TextureSetDescriptor::single(new));
        assert_eq!(set, same);

        // ...while the old descriptor no longer matches anything.
        let different = system.acquire_texture_set(&TextureSetDescriptor::single(old));
        assert_ne!(set, different);
    }
}
