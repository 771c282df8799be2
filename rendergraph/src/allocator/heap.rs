//! Heaps and the aliased slots placed inside them.

use crate::backend::{BackendResult, GpuDevice, GpuResource, HeapHandle};
use crate::types::{AccessFlags, BufferDescriptor, TextureDescriptor};

/// Inclusive range of pass indices during which a slot is occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifetime {
    pub first_pass: usize,
    pub last_pass: usize,
}

impl Lifetime {
    pub fn new(first_pass: usize, last_pass: usize) -> Self {
        debug_assert!(first_pass <= last_pass);
        Self {
            first_pass,
            last_pass,
        }
    }

    pub fn overlaps(&self, other: &Lifetime) -> bool {
        !(self.last_pass < other.first_pass || other.last_pass < self.first_pass)
    }
}

/// Descriptor of the object held by a slot or pool entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectDescriptor {
    Texture(TextureDescriptor),
    Buffer(BufferDescriptor),
}

impl ObjectDescriptor {
    /// Descriptors match when everything but the debug label is equal.
    pub fn is_compatible(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Texture(a), Self::Texture(b)) => a.is_compatible(b),
            (Self::Buffer(a), Self::Buffer(b)) => a.is_compatible(b),
            _ => false,
        }
    }

    /// State a freshly created object starts in.
    pub fn default_state(&self) -> AccessFlags {
        use crate::types::TextureUsage;

        match self {
            Self::Texture(desc) if desc.format.is_depth_stencil() => AccessFlags::DSV,
            Self::Texture(desc) if desc.usage.contains(TextureUsage::RENDER_ATTACHMENT) => {
                AccessFlags::RTV
            }
            Self::Texture(desc) if desc.usage.contains(TextureUsage::STORAGE_BINDING) => {
                AccessFlags::MASK_UAV
            }
            Self::Texture(_) | Self::Buffer(_) => AccessFlags::DISCARD,
        }
    }

    pub fn create(
        &self,
        device: &dyn GpuDevice,
        heap: Option<HeapHandle>,
        name: &str,
    ) -> BackendResult<GpuResource> {
        Ok(match self {
            Self::Texture(desc) => GpuResource::Texture(device.create_texture(desc, heap, name)?),
            Self::Buffer(desc) => GpuResource::Buffer(device.create_buffer(desc, heap, name)?),
        })
    }
}

/// One object placed in a heap.
#[derive(Debug)]
pub struct AliasedSlot {
    pub object: GpuResource,
    pub desc: ObjectDescriptor,
    /// `None` while no logical resource occupies the slot.
    pub lifetime: Option<Lifetime>,
    pub last_used_frame: u64,
    pub last_used_state: AccessFlags,
}

impl AliasedSlot {
    pub fn is_unused(&self) -> bool {
        self.lifetime.is_none()
    }
}

/// A block of device memory shared by slots with disjoint lifetimes.
#[derive(Debug)]
pub struct Heap {
    pub handle: HeapHandle,
    pub size: u64,
    pub slots: Vec<AliasedSlot>,
}

impl Heap {
    pub fn new(handle: HeapHandle, size: u64) -> Self {
        Self {
            handle,
            size,
            slots: Vec::new(),
        }
    }

    /// Returns true if an occupied slot overlaps `lifetime`.
    pub fn overlaps(&self, lifetime: &Lifetime) -> bool {
        self.slots
            .iter()
            .filter_map(|slot| slot.lifetime.as_ref())
            .any(|occupied| occupied.overlaps(lifetime))
    }

    pub fn contains(&self, object: GpuResource) -> bool {
        self.slot_index(object).is_some()
    }

    pub fn slot_index(&self, object: GpuResource) -> Option<usize> {
        self.slots.iter().position(|slot| slot.object == object)
    }

    /// Index of a slot that can take `lifetime` without a new object.
    ///
    /// An unused slot with a compatible descriptor is preferred. Failing that,
    /// an occupied slot whose tenant finishes before `lifetime` starts is
    /// extended, as long as the extended range stays clear of every other
    /// slot. Only forward extension is allowed so that the state handed to the
    /// new tenant is the one the previous tenant leaves behind.
    fn reusable_slot(&self, desc: &ObjectDescriptor, lifetime: &Lifetime) -> Option<usize> {
        let compatible = |slot: &AliasedSlot| slot.desc.is_compatible(desc);

        if let Some(index) = self
            .slots
            .iter()
            .position(|slot| slot.is_unused() && compatible(slot))
        {
            return Some(index);
        }

        self.slots.iter().enumerate().find_map(|(index, slot)| {
            let occupied = slot.lifetime?;
            if !compatible(slot) || occupied.last_pass >= lifetime.first_pass {
                return None;
            }
            let extended = Lifetime::new(occupied.first_pass, lifetime.last_pass);
            let clear = self
                .slots
                .iter()
                .enumerate()
                .filter(|(other, _)| *other != index)
                .filter_map(|(_, other)| other.lifetime)
                .all(|other| !other.overlaps(&extended));
            clear.then_some(index)
        })
    }

    /// Place an object for `lifetime` in this heap.
    ///
    /// Returns the object and the state it is currently in.
    pub fn place(
        &mut self,
        device: &dyn GpuDevice,
        desc: &ObjectDescriptor,
        lifetime: Lifetime,
        last_state: AccessFlags,
        frame: u64,
        name: &str,
    ) -> BackendResult<(GpuResource, AccessFlags)> {
        if let Some(index) = self.reusable_slot(desc, &lifetime) {
            let slot = &mut self.slots[index];
            slot.lifetime = Some(match slot.lifetime {
                Some(occupied) => Lifetime::new(occupied.first_pass, lifetime.last_pass),
                None => lifetime,
            });
            let initial_state = slot.last_used_state;
            slot.last_used_state = last_state;
            slot.last_used_frame = frame;
            log::trace!("reusing {:?} for '{name}' {lifetime:?}", slot.object);
            return Ok((slot.object, initial_state));
        }

        let object = desc.create(device, Some(self.handle), name)?;
        log::trace!("placed {object:?} for '{name}' in {:?} {lifetime:?}", self.handle);
        self.slots.push(AliasedSlot {
            object,
            desc: desc.clone(),
            lifetime: Some(lifetime),
            last_used_frame: frame,
            last_used_state: last_state,
        });
        Ok((object, desc.default_state()))
    }

    /// The other occupant of this heap that most recently finished before
    /// `first_pass`. Its recorded state gains [`AccessFlags::DISCARD`].
    ///
    /// A slot extended over an earlier tenant this frame has no predecessor:
    /// its memory was already handed over when that tenant started.
    pub fn aliased_prev(
        &mut self,
        object: GpuResource,
        first_pass: usize,
    ) -> Option<(GpuResource, AccessFlags)> {
        let own = self.slots.iter().find(|slot| slot.object == object)?;
        if own.lifetime.is_some_and(|l| l.first_pass < first_pass) {
            return None;
        }

        let slot = self
            .slots
            .iter_mut()
            .filter(|slot| slot.object != object)
            .filter(|slot| matches!(slot.lifetime, Some(l) if l.last_pass < first_pass))
            .max_by_key(|slot| slot.lifetime.map(|l| l.last_pass))?;

        let state = slot.last_used_state;
        slot.last_used_state |= AccessFlags::DISCARD;
        Some((slot.object, state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::disjoint_before(Lifetime::new(0, 2), Lifetime::new(3, 5), false)]
    #[case::disjoint_after(Lifetime::new(4, 6), Lifetime::new(0, 3), false)]
    #[case::touching(Lifetime::new(0, 2), Lifetime::new(2, 4), true)]
    #[case::nested(Lifetime::new(0, 9), Lifetime::new(3, 4), true)]
    #[case::same_pass(Lifetime::new(1, 1), Lifetime::new(1, 1), true)]
    fn test_lifetime_overlap(#[case] a: Lifetime, #[case] b: Lifetime, #[case] expected: bool) {
        assert_eq!(a.overlaps(&b), expected);
        assert_eq!(b.overlaps(&a), expected);
    }

    #[test]
    fn test_default_states() {
        use crate::types::{BufferUsage, TextureFormat, TextureUsage};

        let depth = TextureDescriptor::new_2d(4, 4, TextureFormat::Depth32Float, TextureUsage::empty());
        let color = TextureDescriptor::new_2d(4, 4, TextureFormat::Rgba8Unorm, TextureUsage::RENDER_ATTACHMENT);
        let storage = TextureDescriptor::new_2d(4, 4, TextureFormat::R32Float, TextureUsage::STORAGE_BINDING);
        let sampled = TextureDescriptor::new_2d(4, 4, TextureFormat::R32Float, TextureUsage::TEXTURE_BINDING);
        let buffer = BufferDescriptor::new(256, BufferUsage::STORAGE);

        assert_eq!(ObjectDescriptor::Texture(depth).default_state(), AccessFlags::DSV);
        assert_eq!(ObjectDescriptor::Texture(color).default_state(), AccessFlags::RTV);
        assert_eq!(ObjectDescriptor::Texture(storage).default_state(), AccessFlags::MASK_UAV);
        assert_eq!(ObjectDescriptor::Texture(sampled).default_state(), AccessFlags::DISCARD);
        assert_eq!(ObjectDescriptor::Buffer(buffer).default_state(), AccessFlags::DISCARD);
    }

    #[test]
    fn test_extended_slot_has_no_aliased_predecessor() {
        use crate::backend::dummy::DummyDevice;
        use crate::backend::HeapDescriptor;
        use crate::types::{TextureFormat, TextureUsage};

        let device = DummyDevice::new();
        let handle = device.create_heap(&HeapDescriptor { size: 1 << 20 }, "heap").unwrap();
        let mut heap = Heap::new(handle, 1 << 20);

        let rgba = ObjectDescriptor::Texture(TextureDescriptor::new_2d(
            4,
            4,
            TextureFormat::Rgba8Unorm,
            TextureUsage::STORAGE_BINDING,
        ));
        let float = ObjectDescriptor::Texture(TextureDescriptor::new_2d(
            4,
            4,
            TextureFormat::R32Float,
            TextureUsage::STORAGE_BINDING,
        ));
        let uav = AccessFlags::COMPUTE_UAV;

        let (a, _) = heap.place(&device, &rgba, Lifetime::new(0, 1), uav, 1, "a").unwrap();
        let (b, _) = heap.place(&device, &float, Lifetime::new(2, 3), uav, 1, "b").unwrap();
        assert_eq!(heap.aliased_prev(b, 2), Some((a, uav)));

        // Same descriptor as `b`, so its slot is extended to [2, 5].
        let (c, _) = heap.place(&device, &float, Lifetime::new(4, 5), uav, 1, "c").unwrap();
        assert_eq!(c, b);
        assert_eq!(heap.aliased_prev(c, 4), None);
        assert_eq!(heap.slots[0].last_used_state, uav | AccessFlags::DISCARD);
    }

    #[test]
    fn test_kinds_are_never_compatible() {
        let texture = ObjectDescriptor::Texture(TextureDescriptor::default());
        let buffer = ObjectDescriptor::Buffer(BufferDescriptor::default());
        assert!(!texture.is_compatible(&buffer));
        assert!(texture.is_compatible(&texture.clone()));
    }
}
