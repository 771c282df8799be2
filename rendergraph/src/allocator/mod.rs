//! Transient resource allocator.
//!
//! Transient resources are placed into heaps so that resources whose pass
//! ranges never coincide share the same memory. Each object placed in a heap
//! occupies a slot that records:
//!
//! - the pass range of its current tenant (or nothing between frames),
//! - the frame it was last used in,
//! - the access state it was left in, which becomes the initial state of the
//!   next tenant.
//!
//! Slots keep their objects across frames; a resource declared with the same
//! descriptor next frame gets the same object back. Slots and pooled objects
//! that stay unused for longer than
//! [`RenderGraphConfig::eviction_frames`] are destroyed by [`reset`].
//!
//! Frame outputs bypass the heaps and use a separate non-aliased pool.
//!
//! [`reset`]: ResourceAllocator::reset

mod heap;
mod pool;
mod view_cache;

pub use heap::{AliasedSlot, Heap, Lifetime, ObjectDescriptor};

use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::{
    BackendResult, BufferHandle, GpuDevice, GpuResource, HeapDescriptor, TextureHandle,
    ViewHandle,
};
use crate::config::RenderGraphConfig;
use crate::types::{AccessFlags, BufferDescriptor, TextureDescriptor, ViewDescriptor};

use pool::{NonOverlappingPool, PooledObject};
use view_cache::ViewCache;

/// Heap-based aliasing allocator for render graph resources.
pub struct ResourceAllocator {
    device: Arc<dyn GpuDevice>,
    config: RenderGraphConfig,
    heaps: Vec<Heap>,
    pool: NonOverlappingPool,
    views: Mutex<ViewCache>,
}

impl ResourceAllocator {
    pub fn new(device: Arc<dyn GpuDevice>, config: RenderGraphConfig) -> Self {
        Self {
            device,
            config,
            heaps: Vec::new(),
            pool: NonOverlappingPool::default(),
            views: Mutex::new(ViewCache::default()),
        }
    }

    pub fn device(&self) -> &Arc<dyn GpuDevice> {
        &self.device
    }

    /// Place a texture used from `first_pass` to `last_pass`.
    ///
    /// `last_state` is the state the texture will be left in after
    /// `last_pass`. Returns the texture and the state it is in right now.
    pub fn allocate_texture(
        &mut self,
        first_pass: usize,
        last_pass: usize,
        last_state: AccessFlags,
        desc: &TextureDescriptor,
        name: &str,
    ) -> BackendResult<(TextureHandle, AccessFlags)> {
        let size = self.device.allocation_size(desc);
        let desc = ObjectDescriptor::Texture(desc.clone());
        let (object, state) = self.allocate(first_pass, last_pass, last_state, &desc, size, name)?;
        match object {
            GpuResource::Texture(texture) => Ok((texture, state)),
            GpuResource::Buffer(_) => unreachable!("texture slot holds a buffer"),
        }
    }

    /// Place a buffer used from `first_pass` to `last_pass`.
    pub fn allocate_buffer(
        &mut self,
        first_pass: usize,
        last_pass: usize,
        last_state: AccessFlags,
        desc: &BufferDescriptor,
        name: &str,
    ) -> BackendResult<(BufferHandle, AccessFlags)> {
        let size = desc.size;
        let desc = ObjectDescriptor::Buffer(desc.clone());
        let (object, state) = self.allocate(first_pass, last_pass, last_state, &desc, size, name)?;
        match object {
            GpuResource::Buffer(buffer) => Ok((buffer, state)),
            GpuResource::Texture(_) => unreachable!("buffer slot holds a texture"),
        }
    }

    fn allocate(
        &mut self,
        first_pass: usize,
        last_pass: usize,
        last_state: AccessFlags,
        desc: &ObjectDescriptor,
        size: u64,
        name: &str,
    ) -> BackendResult<(GpuResource, AccessFlags)> {
        let lifetime = Lifetime::new(first_pass, last_pass);
        let heap_index = match self
            .heaps
            .iter()
            .position(|heap| heap.size >= size && !heap.overlaps(&lifetime))
        {
            Some(index) => index,
            None => self.create_heap(size)?,
        };

        let frame = self.device.frame_id();
        self.heaps[heap_index].place(
            self.device.as_ref(),
            desc,
            lifetime,
            last_state,
            frame,
            name,
        )
    }

    fn create_heap(&mut self, size: u64) -> BackendResult<usize> {
        let size = self.config.heap_size_for(size);
        let name = format!("render graph heap {}", self.heaps.len());
        let handle = self.device.create_heap(&HeapDescriptor { size }, &name)?;
        log::debug!("created {handle:?} ({size} bytes)");
        self.heaps.push(Heap::new(handle, size));
        Ok(self.heaps.len() - 1)
    }

    /// Mark the slot holding `object` as unused.
    ///
    /// The slot keeps its object for reuse. Its recorded state is replaced by
    /// `state` only when `set_state` is true.
    pub fn free(&mut self, object: GpuResource, state: AccessFlags, set_state: bool) {
        let frame = self.device.frame_id();
        let slot = self
            .heaps
            .iter_mut()
            .flat_map(|heap| heap.slots.iter_mut())
            .find(|slot| slot.object == object);

        match slot {
            Some(slot) => {
                slot.lifetime = None;
                slot.last_used_frame = frame;
                if set_state {
                    slot.last_used_state = state;
                }
            }
            None => log::warn!("freeing {object:?} which no heap holds"),
        }
    }

    /// The object that most recently occupied the memory `object` takes over
    /// at `first_pass`, with the state it was left in.
    pub fn aliased_prev_resource(
        &mut self,
        object: GpuResource,
        first_pass: usize,
    ) -> Option<(GpuResource, AccessFlags)> {
        self.heaps
            .iter_mut()
            .find(|heap| heap.contains(object))?
            .aliased_prev(object, first_pass)
    }

    /// Get a texture that is not aliased with anything.
    pub fn allocate_non_overlapping_texture(
        &mut self,
        desc: &TextureDescriptor,
        name: &str,
    ) -> BackendResult<(TextureHandle, AccessFlags)> {
        let desc = ObjectDescriptor::Texture(desc.clone());
        let (object, state) = self.allocate_non_overlapping(&desc, name)?;
        match object {
            GpuResource::Texture(texture) => Ok((texture, state)),
            GpuResource::Buffer(_) => unreachable!("pooled texture is a buffer"),
        }
    }

    /// Get a buffer that is not aliased with anything.
    pub fn allocate_non_overlapping_buffer(
        &mut self,
        desc: &BufferDescriptor,
        name: &str,
    ) -> BackendResult<(BufferHandle, AccessFlags)> {
        let desc = ObjectDescriptor::Buffer(desc.clone());
        let (object, state) = self.allocate_non_overlapping(&desc, name)?;
        match object {
            GpuResource::Buffer(buffer) => Ok((buffer, state)),
            GpuResource::Texture(_) => unreachable!("pooled buffer is a texture"),
        }
    }

    fn allocate_non_overlapping(
        &mut self,
        desc: &ObjectDescriptor,
        name: &str,
    ) -> BackendResult<(GpuResource, AccessFlags)> {
        if let Some(reused) = self.pool.acquire(desc) {
            log::trace!("reusing pooled {:?} for '{name}'", reused.0);
            return Ok(reused);
        }
        let object = desc.create(self.device.as_ref(), None, name)?;
        Ok((object, desc.default_state()))
    }

    /// Return a non-aliased texture to the pool in `state`.
    pub fn free_non_overlapping_texture(
        &mut self,
        texture: TextureHandle,
        desc: &TextureDescriptor,
        state: AccessFlags,
    ) {
        self.release_to_pool(
            GpuResource::Texture(texture),
            ObjectDescriptor::Texture(desc.clone()),
            state,
        );
    }

    /// Return a non-aliased buffer to the pool in `state`.
    pub fn free_non_overlapping_buffer(
        &mut self,
        buffer: BufferHandle,
        desc: &BufferDescriptor,
        state: AccessFlags,
    ) {
        self.release_to_pool(
            GpuResource::Buffer(buffer),
            ObjectDescriptor::Buffer(desc.clone()),
            state,
        );
    }

    fn release_to_pool(&mut self, object: GpuResource, desc: ObjectDescriptor, state: AccessFlags) {
        self.pool.release(PooledObject {
            object,
            desc,
            last_used_frame: self.device.frame_id(),
            last_used_state: state,
        });
    }

    /// View of `object` described by `desc`, created on first request.
    pub fn descriptor(
        &self,
        object: GpuResource,
        desc: ViewDescriptor,
        name: &str,
    ) -> BackendResult<ViewHandle> {
        self.views
            .lock()
            .get_or_create(self.device.as_ref(), object, desc, name)
    }

    /// Destroy every cached view of `object`.
    pub fn delete_descriptors(&self, object: GpuResource) {
        self.views.lock().remove_object(self.device.as_ref(), object);
    }

    /// Destroy slots, heaps and pooled objects idle for too long.
    ///
    /// Called once per frame after every resource of the previous frame has
    /// been freed.
    pub fn reset(&mut self) {
        let frame = self.device.frame_id();
        let max_idle = self.config.eviction_frames;
        let device = self.device.clone();

        for heap in &mut self.heaps {
            heap.slots.retain(|slot| {
                let idle = slot.is_unused()
                    && frame.saturating_sub(slot.last_used_frame) > max_idle;
                if idle {
                    log::debug!("evicting {:?} from {:?}", slot.object, heap.handle);
                    self.views.lock().remove_object(device.as_ref(), slot.object);
                    device.destroy_resource(slot.object);
                }
                !idle
            });
        }

        self.heaps.retain(|heap| {
            if heap.slots.is_empty() {
                log::debug!("releasing empty {:?} ({} bytes)", heap.handle, heap.size);
                device.destroy_heap(heap.handle);
                false
            } else {
                true
            }
        });

        for object in self.pool.evict(frame, max_idle) {
            log::debug!("evicting pooled {object:?}");
            self.views.lock().remove_object(device.as_ref(), object);
            device.destroy_resource(object);
        }
    }

    pub fn heaps(&self) -> &[Heap] {
        &self.heaps
    }

    /// Number of objects placed in heaps.
    pub fn slot_count(&self) -> usize {
        self.heaps.iter().map(|heap| heap.slots.len()).sum()
    }

    /// Number of released objects waiting in the non-aliased pool.
    pub fn pooled_count(&self) -> usize {
        self.pool.len()
    }

    pub fn view_count(&self) -> usize {
        self.views.lock().len()
    }
}

impl Drop for ResourceAllocator {
    fn drop(&mut self) {
        let device = self.device.clone();
        let views = self.views.get_mut();
        for heap in self.heaps.drain(..) {
            for slot in heap.slots {
                views.remove_object(device.as_ref(), slot.object);
                device.destroy_resource(slot.object);
            }
            device.destroy_heap(heap.handle);
        }
        for pooled in self.pool.drain() {
            views.remove_object(device.as_ref(), pooled.object);
            device.destroy_resource(pooled.object);
        }
    }
}

impl std::fmt::Debug for ResourceAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceAllocator")
            .field("heaps", &self.heaps.len())
            .field("slots", &self.slot_count())
            .field("pooled", &self.pool.len())
            .finish()
    }
}

#[cfg(all(test, feature = "dummy"))]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyDevice;
    use crate::types::{BufferUsage, TextureFormat, TextureUsage};

    fn setup() -> (Arc<DummyDevice>, ResourceAllocator) {
        let device = Arc::new(DummyDevice::new());
        let allocator = ResourceAllocator::new(device.clone(), RenderGraphConfig::default());
        (device, allocator)
    }

    fn color_desc(size: u32) -> TextureDescriptor {
        TextureDescriptor::new_2d(size, size, TextureFormat::Rgba8Unorm, TextureUsage::RENDER_ATTACHMENT)
    }

    fn assert_no_overlaps(allocator: &ResourceAllocator) {
        for heap in allocator.heaps() {
            let lifetimes: Vec<_> = heap.slots.iter().filter_map(|s| s.lifetime).collect();
            for (i, a) in lifetimes.iter().enumerate() {
                for b in &lifetimes[i + 1..] {
                    assert!(
                        a.last_pass < b.first_pass || b.last_pass < a.first_pass,
                        "{a:?} overlaps {b:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_heap_size_is_rounded() {
        let (device, mut allocator) = setup();
        let desc = color_desc(16);
        allocator
            .allocate_texture(0, 0, AccessFlags::RTV, &desc, "small")
            .unwrap();
        assert_eq!(allocator.heaps().len(), 1);
        assert_eq!(allocator.heaps()[0].size, 64 * 1024);
        assert!(device.allocation_size(&desc) < 64 * 1024);
    }

    #[test]
    fn test_overlapping_lifetimes_get_separate_heaps() {
        let (_device, mut allocator) = setup();
        let desc = color_desc(64);
        let (a, _) = allocator.allocate_texture(0, 3, AccessFlags::RTV, &desc, "a").unwrap();
        let (b, _) = allocator.allocate_texture(2, 5, AccessFlags::RTV, &desc, "b").unwrap();
        let (c, _) = allocator.allocate_texture(6, 7, AccessFlags::RTV, &desc, "c").unwrap();

        assert_ne!(a, b);
        assert_eq!(allocator.heaps().len(), 2);
        assert_no_overlaps(&allocator);
        // c fits after both; it reuses a's memory rather than a new heap.
        assert_eq!(allocator.heaps().len(), 2);
        assert!(allocator.heaps()[0].contains(GpuResource::Texture(c)));
    }

    #[test]
    fn test_disjoint_lifetimes_share_slot_in_frame() {
        let (_device, mut allocator) = setup();
        let desc = color_desc(64);
        let (first, first_initial) = allocator
            .allocate_texture(0, 2, AccessFlags::PIXEL_SHADER_SRV, &desc, "first")
            .unwrap();
        let (second, second_initial) = allocator
            .allocate_texture(3, 5, AccessFlags::COPY_SRC, &desc, "second")
            .unwrap();

        assert_eq!(first_initial, AccessFlags::RTV);
        assert_eq!(first, second);
        assert_eq!(second_initial, AccessFlags::PIXEL_SHADER_SRV);
        assert_eq!(allocator.slot_count(), 1);
        assert_eq!(
            allocator.heaps()[0].slots[0].lifetime,
            Some(Lifetime::new(0, 5))
        );
    }

    #[test]
    fn test_slot_extension_never_covers_other_tenants() {
        let (_device, mut allocator) = setup();
        let color = color_desc(64);
        let other = TextureDescriptor::new_2d(64, 64, TextureFormat::R32Float, TextureUsage::STORAGE_BINDING);

        let (a, _) = allocator.allocate_texture(0, 1, AccessFlags::RTV, &color, "a").unwrap();
        let (b, _) = allocator.allocate_texture(2, 3, AccessFlags::MASK_UAV, &other, "b").unwrap();
        let (c, _) = allocator.allocate_texture(4, 5, AccessFlags::RTV, &color, "c").unwrap();

        assert_ne!(a, c);
        assert_ne!(a, b);
        assert_no_overlaps(&allocator);
    }

    #[test]
    fn test_reuse_across_frames() {
        let (device, mut allocator) = setup();
        let desc = color_desc(128);

        let (first, _) = allocator
            .allocate_texture(0, 2, AccessFlags::PIXEL_SHADER_SRV, &desc, "frame0")
            .unwrap();
        allocator.free(GpuResource::Texture(first), AccessFlags::PIXEL_SHADER_SRV, false);
        allocator.reset();
        device.advance_frame();

        let (second, initial) = allocator
            .allocate_texture(3, 5, AccessFlags::RTV, &desc.clone().with_label("renamed"), "frame1")
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(initial, AccessFlags::PIXEL_SHADER_SRV);
        assert_eq!(device.stats().textures_created, 1);
    }

    #[test]
    fn test_free_can_override_state() {
        let (_device, mut allocator) = setup();
        let desc = color_desc(32);
        let (texture, _) = allocator.allocate_texture(0, 0, AccessFlags::RTV, &desc, "t").unwrap();
        allocator.free(GpuResource::Texture(texture), AccessFlags::COPY_SRC, true);
        let (_, initial) = allocator.allocate_texture(0, 0, AccessFlags::RTV, &desc, "t").unwrap();
        assert_eq!(initial, AccessFlags::COPY_SRC);
    }

    #[test]
    fn test_aliased_prev_resource() {
        let (_device, mut allocator) = setup();
        let color = color_desc(64);
        let storage = TextureDescriptor::new_2d(64, 64, TextureFormat::Rgba8Unorm, TextureUsage::STORAGE_BINDING);

        let (a, _) = allocator.allocate_texture(0, 1, AccessFlags::PIXEL_SHADER_SRV, &color, "a").unwrap();
        let (b, _) = allocator.allocate_texture(2, 4, AccessFlags::COMPUTE_SRV, &storage, "b").unwrap();
        let a = GpuResource::Texture(a);
        let b = GpuResource::Texture(b);

        assert!(allocator.aliased_prev_resource(a, 0).is_none());
        let (prev, state) = allocator.aliased_prev_resource(b, 2).unwrap();
        assert_eq!(prev, a);
        assert_eq!(state, AccessFlags::PIXEL_SHADER_SRV);
        assert_eq!(
            allocator.heaps()[0].slots[0].last_used_state,
            AccessFlags::PIXEL_SHADER_SRV | AccessFlags::DISCARD
        );
    }

    #[test]
    fn test_buffers_alias_by_size() {
        let (_device, mut allocator) = setup();
        let big = BufferDescriptor::new(200 * 1024, BufferUsage::STORAGE);
        let small = BufferDescriptor::new(1024, BufferUsage::STORAGE);
        allocator.allocate_buffer(0, 1, AccessFlags::MASK_UAV, &big, "big").unwrap();
        allocator.allocate_buffer(2, 3, AccessFlags::MASK_UAV, &small, "small").unwrap();

        assert_eq!(allocator.heaps().len(), 1);
        assert_eq!(allocator.heaps()[0].size, 256 * 1024);
        assert_eq!(allocator.slot_count(), 2);
    }

    #[test]
    fn test_eviction_after_idle_frames() {
        let (device, mut allocator) = setup();
        let desc = color_desc(64);
        let (texture, _) = allocator.allocate_texture(0, 0, AccessFlags::RTV, &desc, "t").unwrap();
        let object = GpuResource::Texture(texture);
        allocator
            .descriptor(object, ViewDescriptor::ShaderResource(Default::default()), "t")
            .unwrap();
        allocator.free(object, AccessFlags::RTV, false);

        for _ in 0..30 {
            device.advance_frame();
            allocator.reset();
        }
        assert_eq!(allocator.slot_count(), 1);
        assert_eq!(allocator.view_count(), 1);

        device.advance_frame();
        allocator.reset();
        assert_eq!(allocator.slot_count(), 0);
        assert!(allocator.heaps().is_empty());
        assert_eq!(allocator.view_count(), 0);
        assert!(!device.is_alive(object));
        assert_eq!(device.stats().live_heaps, 0);
    }

    #[test]
    fn test_non_overlapping_pool() {
        let (device, mut allocator) = setup();
        let desc = color_desc(256);

        let (texture, initial) = allocator.allocate_non_overlapping_texture(&desc, "output").unwrap();
        assert_eq!(initial, AccessFlags::RTV);
        assert!(allocator.heaps().is_empty());

        allocator.free_non_overlapping_texture(texture, &desc, AccessFlags::PRESENT);
        assert_eq!(allocator.pooled_count(), 1);
        let (again, state) = allocator.allocate_non_overlapping_texture(&desc, "output").unwrap();
        assert_eq!(again, texture);
        assert_eq!(state, AccessFlags::PRESENT);
        assert_eq!(allocator.pooled_count(), 0);

        allocator.free_non_overlapping_texture(again, &desc, AccessFlags::PRESENT);
        for _ in 0..31 {
            device.advance_frame();
        }
        allocator.reset();
        assert_eq!(allocator.pooled_count(), 0);
        assert!(!device.is_alive(GpuResource::Texture(texture)));
    }

    #[test]
    fn test_view_cache_memoizes() {
        let (device, mut allocator) = setup();
        let desc = color_desc(64);
        let (texture, _) = allocator.allocate_texture(0, 0, AccessFlags::RTV, &desc, "t").unwrap();
        let object = GpuResource::Texture(texture);
        let srv = ViewDescriptor::ShaderResource(Default::default());
        let uav = ViewDescriptor::UnorderedAccess(Default::default());

        let a = allocator.descriptor(object, srv, "t").unwrap();
        let b = allocator.descriptor(object, srv, "t").unwrap();
        let c = allocator.descriptor(object, uav, "t").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(device.stats().views_created, 2);

        allocator.delete_descriptors(object);
        assert_eq!(allocator.view_count(), 0);
        assert_eq!(device.stats().live_views, 0);
    }

    #[test]
    fn test_drop_destroys_everything() {
        let (device, mut allocator) = setup();
        let desc = color_desc(64);
        allocator.allocate_texture(0, 0, AccessFlags::RTV, &desc, "t").unwrap();
        let (pooled, _) = allocator.allocate_non_overlapping_texture(&desc, "o").unwrap();
        allocator.free_non_overlapping_texture(pooled, &desc, AccessFlags::PRESENT);
        drop(allocator);

        let stats = device.stats();
        assert_eq!(stats.live_textures, 0);
        assert_eq!(stats.live_heaps, 0);
    }
}
