//! Logical resources tracked by the render graph.
//!
//! A logical resource is what pass declarations refer to. It only gets a GPU
//! object once the graph is compiled and the resource is known to be used by
//! at least one surviving pass.
//!
//! While compiling, every surviving (pass, access, subresource) triple that
//! touches the resource is recorded. The records are folded into usage runs:
//! consecutive read-only accesses on the same queue share one state, every
//! other access starts a new run. Barriers are emitted between runs whose
//! states differ.

use std::collections::HashMap;

use crate::allocator::ResourceAllocator;
use crate::backend::{BackendResult, BufferHandle, GpuResource, QueueType, TextureHandle};
use crate::types::{AccessFlags, BufferDescriptor, BufferUsage, TextureDescriptor, TextureUsage};

/// One recorded access by a surviving pass.
#[derive(Debug, Clone, Copy)]
struct Usage {
    pass: usize,
    queue: QueueType,
    subresource: u32,
    access: AccessFlags,
}

/// Consecutive passes that keep a subresource in one state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UsageRun {
    pub first_pass: usize,
    pub last_pass: usize,
    pub queue: QueueType,
    pub subresource: u32,
    pub state: AccessFlags,
}

/// Transition of one subresource of a logical resource before a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ResourceBarrier {
    pub pass: usize,
    pub resource: usize,
    pub subresource: u32,
    pub before: AccessFlags,
    pub after: AccessFlags,
}

/// Retires the previous occupant of aliased memory before a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DiscardBarrier {
    pub pass: usize,
    pub object: GpuResource,
    pub before: AccessFlags,
    pub after: AccessFlags,
}

/// State shared by textures and buffers.
#[derive(Debug, Clone)]
pub(crate) struct ResourceInfo {
    name: String,
    imported: bool,
    output: bool,
    version: u32,
    span: Option<(usize, usize)>,
    initial_state: AccessFlags,
    final_state: AccessFlags,
    usages: Vec<Usage>,
    runs: Vec<UsageRun>,
}

impl ResourceInfo {
    fn new(name: &str, imported: bool, state: AccessFlags) -> Self {
        Self {
            name: name.to_string(),
            imported,
            output: false,
            version: 0,
            span: None,
            initial_state: state,
            final_state: state,
            usages: Vec::new(),
            runs: Vec::new(),
        }
    }
}

macro_rules! resource_accessors {
    ($ty:ident) => {
        impl $ty {
            /// Debug name given at creation.
            pub fn name(&self) -> &str {
                &self.info.name
            }

            /// Returns true if the object is owned by the caller.
            pub fn is_imported(&self) -> bool {
                self.info.imported
            }

            /// Returns true if the resource was presented this frame.
            pub fn is_output(&self) -> bool {
                self.info.output
            }

            /// Latest version number. Version 0 is the initial contents.
            pub fn version(&self) -> u32 {
                self.info.version
            }

            /// First surviving pass using the resource, after compile.
            pub fn first_pass(&self) -> Option<usize> {
                self.info.span.map(|(first, _)| first)
            }

            /// Last surviving pass using the resource, after compile.
            pub fn last_pass(&self) -> Option<usize> {
                self.info.span.map(|(_, last)| last)
            }

            /// State of the backing object before the first pass.
            pub fn initial_state(&self) -> AccessFlags {
                self.info.initial_state
            }

            /// State the backing object is left in at the end of the frame.
            pub fn final_state(&self) -> AccessFlags {
                self.info.final_state
            }
        }
    };
}

/// Logical texture.
#[derive(Debug, Clone)]
pub struct TextureResource {
    info: ResourceInfo,
    desc: TextureDescriptor,
    texture: Option<TextureHandle>,
}

resource_accessors!(TextureResource);

impl TextureResource {
    /// Descriptor, including usage flags inferred from declared accesses.
    pub fn descriptor(&self) -> &TextureDescriptor {
        &self.desc
    }

    /// Backing texture, once realized.
    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }
}

/// Logical buffer.
#[derive(Debug, Clone)]
pub struct BufferResource {
    info: ResourceInfo,
    desc: BufferDescriptor,
    buffer: Option<BufferHandle>,
}

resource_accessors!(BufferResource);

impl BufferResource {
    /// Descriptor, including usage flags inferred from declared accesses.
    pub fn descriptor(&self) -> &BufferDescriptor {
        &self.desc
    }

    /// Backing buffer, once realized.
    pub fn buffer(&self) -> Option<BufferHandle> {
        self.buffer
    }
}

/// A logical texture or buffer.
#[derive(Debug, Clone)]
pub enum Resource {
    Texture(TextureResource),
    Buffer(BufferResource),
}

fn texture_usage_for(access: AccessFlags) -> TextureUsage {
    let mut usage = TextureUsage::empty();
    if access.intersects(AccessFlags::RTV | AccessFlags::MASK_DSV) {
        usage |= TextureUsage::RENDER_ATTACHMENT;
    }
    if access.intersects(AccessFlags::MASK_UAV | AccessFlags::CLEAR_UAV) {
        usage |= TextureUsage::STORAGE_BINDING;
    }
    if access.intersects(AccessFlags::MASK_SRV) {
        usage |= TextureUsage::TEXTURE_BINDING;
    }
    if access.contains(AccessFlags::COPY_SRC) {
        usage |= TextureUsage::COPY_SRC;
    }
    if access.contains(AccessFlags::COPY_DST) {
        usage |= TextureUsage::COPY_DST;
    }
    if access.contains(AccessFlags::SHADING_RATE) {
        usage |= TextureUsage::SHADING_RATE;
    }
    usage
}

fn buffer_usage_for(access: AccessFlags) -> BufferUsage {
    let mut usage = BufferUsage::empty();
    if access.intersects(AccessFlags::MASK_UAV | AccessFlags::CLEAR_UAV | AccessFlags::MASK_SRV) {
        usage |= BufferUsage::STORAGE;
    }
    if access.contains(AccessFlags::INDIRECT_ARGS) {
        usage |= BufferUsage::INDIRECT;
    }
    if access.contains(AccessFlags::INDEX_BUFFER) {
        usage |= BufferUsage::INDEX;
    }
    if access.contains(AccessFlags::COPY_SRC) {
        usage |= BufferUsage::COPY_SRC;
    }
    if access.contains(AccessFlags::COPY_DST) {
        usage |= BufferUsage::COPY_DST;
    }
    usage
}

impl Resource {
    pub(crate) fn new_texture(desc: TextureDescriptor, name: &str) -> Self {
        Self::Texture(TextureResource {
            info: ResourceInfo::new(name, false, AccessFlags::DISCARD),
            desc,
            texture: None,
        })
    }

    pub(crate) fn new_buffer(desc: BufferDescriptor, name: &str) -> Self {
        Self::Buffer(BufferResource {
            info: ResourceInfo::new(name, false, AccessFlags::DISCARD),
            desc,
            buffer: None,
        })
    }

    pub(crate) fn imported_texture(
        texture: TextureHandle,
        desc: TextureDescriptor,
        state: AccessFlags,
        name: &str,
    ) -> Self {
        Self::Texture(TextureResource {
            info: ResourceInfo::new(name, true, state),
            desc,
            texture: Some(texture),
        })
    }

    pub(crate) fn imported_buffer(
        buffer: BufferHandle,
        desc: BufferDescriptor,
        state: AccessFlags,
        name: &str,
    ) -> Self {
        Self::Buffer(BufferResource {
            info: ResourceInfo::new(name, true, state),
            desc,
            buffer: Some(buffer),
        })
    }

    fn info(&self) -> &ResourceInfo {
        match self {
            Self::Texture(texture) => &texture.info,
            Self::Buffer(buffer) => &buffer.info,
        }
    }

    fn info_mut(&mut self) -> &mut ResourceInfo {
        match self {
            Self::Texture(texture) => &mut texture.info,
            Self::Buffer(buffer) => &mut buffer.info,
        }
    }

    pub fn name(&self) -> &str {
        &self.info().name
    }

    pub fn is_texture(&self) -> bool {
        matches!(self, Self::Texture(_))
    }

    /// Returns true if the resource shares heap memory with others.
    pub fn is_overlapping(&self) -> bool {
        let info = self.info();
        !info.imported && !info.output
    }

    pub fn is_used(&self) -> bool {
        self.info().span.is_some()
    }

    /// First and last surviving pass using the resource.
    pub(crate) fn span(&self) -> Option<(usize, usize)> {
        self.info().span
    }

    pub fn final_state(&self) -> AccessFlags {
        self.info().final_state
    }

    /// Backing object, once realized or imported.
    pub fn gpu_resource(&self) -> Option<GpuResource> {
        match self {
            Self::Texture(texture) => texture.texture.map(GpuResource::Texture),
            Self::Buffer(buffer) => buffer.buffer.map(GpuResource::Buffer),
        }
    }

    /// Mip and array slice addressed by a flat subresource index.
    pub(crate) fn subresource_location(&self, subresource: u32) -> (u32, u32) {
        match self {
            Self::Texture(texture) => texture.desc.subresource_location(subresource),
            Self::Buffer(_) => (0, 0),
        }
    }

    pub(crate) fn mark_output(&mut self) {
        self.info_mut().output = true;
    }

    pub(crate) fn set_final_state(&mut self, state: AccessFlags) {
        self.info_mut().final_state = state;
    }

    /// Allocate the next version number.
    pub(crate) fn bump_version(&mut self) -> u32 {
        let info = self.info_mut();
        info.version += 1;
        info.version
    }

    /// Record an access by a surviving pass.
    pub(crate) fn record_usage(
        &mut self,
        pass: usize,
        queue: QueueType,
        access: AccessFlags,
        subresource: u32,
    ) {
        let imported = self.info().imported;
        match self {
            Self::Texture(texture) if !imported => texture.desc.usage |= texture_usage_for(access),
            Self::Buffer(buffer) if !imported => buffer.desc.usage |= buffer_usage_for(access),
            _ => {}
        }

        let info = self.info_mut();
        info.span = Some(match info.span {
            Some((first, last)) => (first.min(pass), last.max(pass)),
            None => (pass, pass),
        });
        info.usages.push(Usage {
            pass,
            queue,
            subresource,
            access,
        });
    }

    /// Fold recorded accesses into runs and derive the final state.
    pub(crate) fn finish_usage(&mut self) {
        let info = self.info_mut();
        info.usages
            .sort_by_key(|usage| (usage.subresource, usage.pass));

        let mut merged: Vec<Usage> = Vec::with_capacity(info.usages.len());
        for usage in &info.usages {
            match merged.last_mut() {
                Some(last) if last.subresource == usage.subresource && last.pass == usage.pass => {
                    last.access |= usage.access;
                }
                _ => merged.push(*usage),
            }
        }

        info.runs.clear();
        for usage in merged {
            match info.runs.last_mut() {
                Some(run)
                    if run.subresource == usage.subresource
                        && run.queue == usage.queue
                        && run.state.is_read_only()
                        && usage.access.is_read_only() =>
                {
                    run.state |= usage.access;
                    run.last_pass = usage.pass;
                }
                _ => info.runs.push(UsageRun {
                    first_pass: usage.pass,
                    last_pass: usage.pass,
                    queue: usage.queue,
                    subresource: usage.subresource,
                    state: usage.access,
                }),
            }
        }
        info.runs
            .sort_by_key(|run| (run.first_pass, run.subresource));

        if let Some(last) = info
            .runs
            .iter()
            .max_by_key(|run| (run.last_pass, run.subresource))
        {
            info.final_state = last.state;
        }
    }

    pub(crate) fn runs(&self) -> &[UsageRun] {
        &self.info().runs
    }

    /// Bind a backing object for the usage span.
    ///
    /// Imported resources already have one; outputs come from the
    /// non-aliased pool; everything else is placed in a heap.
    pub(crate) fn realize(&mut self, allocator: &mut ResourceAllocator) -> BackendResult<()> {
        let output = self.info().output;
        let Some((first, last)) = self.info().span else {
            return Ok(());
        };
        if self.info().imported {
            return Ok(());
        }

        let last_state = self.info().final_state;
        let initial_state = match self {
            Self::Texture(texture) => {
                let (object, state) = if output {
                    allocator.allocate_non_overlapping_texture(&texture.desc, &texture.info.name)?
                } else {
                    allocator.allocate_texture(
                        first,
                        last,
                        last_state,
                        &texture.desc,
                        &texture.info.name,
                    )?
                };
                texture.texture = Some(object);
                state
            }
            Self::Buffer(buffer) => {
                let (object, state) = if output {
                    allocator.allocate_non_overlapping_buffer(&buffer.desc, &buffer.info.name)?
                } else {
                    allocator.allocate_buffer(
                        first,
                        last,
                        last_state,
                        &buffer.desc,
                        &buffer.info.name,
                    )?
                };
                buffer.buffer = Some(object);
                state
            }
        };
        self.info_mut().initial_state = initial_state;
        Ok(())
    }

    /// Barriers needed to walk the resource through its runs, plus the
    /// discard of the previous occupant of its memory.
    pub(crate) fn resolve_barriers(
        &self,
        index: usize,
        allocator: &mut ResourceAllocator,
    ) -> (Vec<ResourceBarrier>, Option<DiscardBarrier>) {
        let info = self.info();
        let (Some(object), Some((first_pass, _))) = (self.gpu_resource(), info.span) else {
            return (Vec::new(), None);
        };

        let discard = if self.is_overlapping() {
            allocator
                .aliased_prev_resource(object, first_pass)
                .filter(|(_, state)| *state != AccessFlags::DISCARD)
                .map(|(prev, state)| DiscardBarrier {
                    pass: first_pass,
                    object: prev,
                    before: state,
                    after: AccessFlags::DISCARD,
                })
        } else {
            None
        };

        let mut states: HashMap<u32, AccessFlags> = HashMap::new();
        let mut barriers = Vec::new();
        for run in &info.runs {
            let before = states
                .get(&run.subresource)
                .copied()
                .unwrap_or(info.initial_state);
            if before != run.state {
                barriers.push(ResourceBarrier {
                    pass: run.first_pass,
                    resource: index,
                    subresource: run.subresource,
                    before,
                    after: run.state,
                });
            }
            states.insert(run.subresource, run.state);
        }

        (barriers, discard)
    }

    /// Hand the backing object back to the allocator at the end of a frame.
    pub(crate) fn release(&self, allocator: &mut ResourceAllocator) {
        let info = self.info();
        if info.imported {
            return;
        }
        match self {
            Self::Texture(texture) => {
                if let Some(object) = texture.texture {
                    if info.output {
                        allocator.free_non_overlapping_texture(object, &texture.desc, info.final_state);
                    } else {
                        allocator.free(GpuResource::Texture(object), info.final_state, false);
                    }
                }
            }
            Self::Buffer(buffer) => {
                if let Some(object) = buffer.buffer {
                    if info.output {
                        allocator.free_non_overlapping_buffer(object, &buffer.desc, info.final_state);
                    } else {
                        allocator.free(GpuResource::Buffer(object), info.final_state, false);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TextureFormat;

    fn texture() -> Resource {
        Resource::new_texture(
            TextureDescriptor::new_2d(16, 16, TextureFormat::Rgba16Float, TextureUsage::empty()),
            "hdr",
        )
    }

    #[test]
    fn test_usage_span_and_inferred_flags() {
        let mut resource = texture();
        resource.record_usage(3, QueueType::Graphics, AccessFlags::RTV, 0);
        resource.record_usage(1, QueueType::Graphics, AccessFlags::COMPUTE_UAV, 0);
        resource.record_usage(5, QueueType::Graphics, AccessFlags::PIXEL_SHADER_SRV, 0);

        let Resource::Texture(tex) = &resource else {
            panic!("expected a texture");
        };
        assert_eq!((tex.first_pass(), tex.last_pass()), (Some(1), Some(5)));
        assert_eq!(
            tex.descriptor().usage,
            TextureUsage::RENDER_ATTACHMENT
                | TextureUsage::STORAGE_BINDING
                | TextureUsage::TEXTURE_BINDING
        );
    }

    #[test]
    fn test_runs_merge_consecutive_reads() {
        let mut resource = texture();
        resource.record_usage(0, QueueType::Graphics, AccessFlags::RTV, 0);
        resource.record_usage(1, QueueType::Graphics, AccessFlags::PIXEL_SHADER_SRV, 0);
        resource.record_usage(2, QueueType::Graphics, AccessFlags::VERTEX_SHADER_SRV, 0);
        resource.record_usage(3, QueueType::Graphics, AccessFlags::COMPUTE_UAV, 0);
        resource.finish_usage();

        let states: Vec<_> = resource.runs().iter().map(|run| run.state).collect();
        assert_eq!(
            states,
            vec![
                AccessFlags::RTV,
                AccessFlags::PIXEL_SHADER_SRV | AccessFlags::VERTEX_SHADER_SRV,
                AccessFlags::COMPUTE_UAV,
            ]
        );
        assert_eq!(resource.final_state(), AccessFlags::COMPUTE_UAV);
    }

    #[test]
    fn test_reads_on_different_queues_do_not_merge() {
        let mut resource = texture();
        resource.record_usage(1, QueueType::Graphics, AccessFlags::PIXEL_SHADER_SRV, 0);
        resource.record_usage(2, QueueType::Compute, AccessFlags::COMPUTE_SRV, 0);
        resource.finish_usage();
        assert_eq!(resource.runs().len(), 2);
    }

    #[test]
    fn test_write_records_merge_within_pass() {
        let mut resource = texture();
        // A write is seen from both its input and output version.
        resource.record_usage(0, QueueType::Graphics, AccessFlags::COMPUTE_UAV, 0);
        resource.record_usage(0, QueueType::Graphics, AccessFlags::COMPUTE_UAV, 0);
        resource.finish_usage();
        assert_eq!(resource.runs().len(), 1);
    }

    #[test]
    fn test_runs_are_per_subresource() {
        let mut resource = texture();
        resource.record_usage(0, QueueType::Graphics, AccessFlags::RTV, 0);
        resource.record_usage(1, QueueType::Graphics, AccessFlags::PIXEL_SHADER_SRV, 0);
        resource.record_usage(1, QueueType::Graphics, AccessFlags::RTV, 1);
        resource.finish_usage();

        let runs = resource.runs();
        assert_eq!(runs.len(), 3);
        assert_eq!((runs[0].first_pass, runs[0].subresource), (0, 0));
        assert_eq!((runs[1].first_pass, runs[1].subresource), (1, 0));
        assert_eq!((runs[2].first_pass, runs[2].subresource), (1, 1));
    }

    #[test]
    fn test_imported_descriptor_is_untouched() {
        let desc = TextureDescriptor::new_2d(8, 8, TextureFormat::Bgra8Unorm, TextureUsage::RENDER_ATTACHMENT);
        let mut resource = Resource::imported_texture(
            TextureHandle::new(9),
            desc.clone(),
            AccessFlags::PRESENT,
            "backbuffer",
        );
        resource.record_usage(0, QueueType::Graphics, AccessFlags::COMPUTE_UAV, 0);
        let Resource::Texture(tex) = &resource else {
            panic!("expected a texture");
        };
        assert_eq!(tex.descriptor(), &desc);
        assert_eq!(tex.initial_state(), AccessFlags::PRESENT);
        assert!(!resource.is_overlapping());
    }
}
