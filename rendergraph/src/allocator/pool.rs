//! Pool of objects that are never aliased.
//!
//! Frame outputs must keep their identity until the consumer is done with
//! them, so they live outside the heaps. Released objects wait here and are
//! handed back on an exact descriptor match.

use crate::backend::GpuResource;
use crate::types::AccessFlags;

use super::heap::ObjectDescriptor;

#[derive(Debug)]
pub struct PooledObject {
    pub object: GpuResource,
    pub desc: ObjectDescriptor,
    pub last_used_frame: u64,
    pub last_used_state: AccessFlags,
}

#[derive(Debug, Default)]
pub struct NonOverlappingPool {
    objects: Vec<PooledObject>,
}

impl NonOverlappingPool {
    /// Take a released object matching `desc`, returning it with its state.
    pub fn acquire(&mut self, desc: &ObjectDescriptor) -> Option<(GpuResource, AccessFlags)> {
        let index = self
            .objects
            .iter()
            .position(|pooled| pooled.desc.is_compatible(desc))?;
        let pooled = self.objects.swap_remove(index);
        Some((pooled.object, pooled.last_used_state))
    }

    pub fn release(&mut self, pooled: PooledObject) {
        debug_assert!(
            !self.objects.iter().any(|p| p.object == pooled.object),
            "{:?} released twice",
            pooled.object
        );
        self.objects.push(pooled);
    }

    /// Remove objects idle for more than `max_idle` frames and return them.
    pub fn evict(&mut self, frame: u64, max_idle: u64) -> Vec<GpuResource> {
        let mut evicted = Vec::new();
        self.objects.retain(|pooled| {
            let keep = frame.saturating_sub(pooled.last_used_frame) <= max_idle;
            if !keep {
                evicted.push(pooled.object);
            }
            keep
        });
        evicted
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = PooledObject> + '_ {
        self.objects.drain(..)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TextureHandle;
    use crate::types::{TextureDescriptor, TextureFormat, TextureUsage};

    fn pooled(raw: u64, width: u32, frame: u64) -> PooledObject {
        PooledObject {
            object: GpuResource::Texture(TextureHandle::new(raw)),
            desc: ObjectDescriptor::Texture(TextureDescriptor::new_2d(
                width,
                width,
                TextureFormat::Rgba8Unorm,
                TextureUsage::RENDER_ATTACHMENT,
            )),
            last_used_frame: frame,
            last_used_state: AccessFlags::PRESENT,
        }
    }

    #[test]
    fn test_acquire_matches_descriptor() {
        let mut pool = NonOverlappingPool::default();
        pool.release(pooled(1, 64, 0));
        pool.release(pooled(2, 128, 0));

        let wanted = pooled(0, 128, 0).desc;
        let (object, state) = pool.acquire(&wanted).unwrap();
        assert_eq!(object, GpuResource::Texture(TextureHandle::new(2)));
        assert_eq!(state, AccessFlags::PRESENT);
        assert_eq!(pool.len(), 1);
        assert!(pool.acquire(&wanted).is_none());
    }

    #[test]
    fn test_evict_idle_objects() {
        let mut pool = NonOverlappingPool::default();
        pool.release(pooled(1, 64, 0));
        pool.release(pooled(2, 64, 10));

        assert!(pool.evict(30, 30).is_empty());
        let evicted = pool.evict(31, 30);
        assert_eq!(evicted, vec![GpuResource::Texture(TextureHandle::new(1))]);
        assert_eq!(pool.len(), 1);
    }
}
