//! GPU collaborator interfaces.
//!
//! The render graph never talks to a graphics API directly. It creates heaps,
//! objects, views and fences through [`GpuDevice`] and records barriers, render
//! passes and queue synchronization through [`CommandList`]. A backend
//! implements both traits; [`dummy`] provides a recording implementation used
//! by tests and benches.

#[cfg(feature = "dummy")]
pub mod dummy;
mod error;

pub use error::{BackendError, BackendResult};

use crate::graph::{LoadOp, StoreOp};
use crate::types::{
    AccessFlags, BufferDescriptor, ShaderResourceViewDescriptor, TextureDescriptor,
    UnorderedAccessViewDescriptor,
};

/// Subresource index addressing every mip and slice of a resource.
///
/// Only valid for barriers; pass declarations must name a concrete subresource.
pub const ALL_SUBRESOURCES: u32 = u32::MAX;

macro_rules! gpu_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a backend-specific identifier.
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Backend-specific identifier.
            pub const fn raw(self) -> u64 {
                self.0
            }
        }
    };
}

gpu_handle!(
    /// Handle to a GPU texture.
    TextureHandle
);
gpu_handle!(
    /// Handle to a GPU buffer.
    BufferHandle
);
gpu_handle!(
    /// Handle to a block of GPU memory that objects can be placed in.
    HeapHandle
);
gpu_handle!(
    /// Handle to a shader resource or unordered access view.
    ViewHandle
);
gpu_handle!(
    /// Handle to a timeline fence.
    FenceHandle
);

/// A concrete GPU object backing a logical resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuResource {
    Texture(TextureHandle),
    Buffer(BufferHandle),
}

impl GpuResource {
    /// Returns the texture handle, if this is a texture.
    pub fn as_texture(self) -> Option<TextureHandle> {
        match self {
            Self::Texture(texture) => Some(texture),
            Self::Buffer(_) => None,
        }
    }

    /// Returns the buffer handle, if this is a buffer.
    pub fn as_buffer(self) -> Option<BufferHandle> {
        match self {
            Self::Buffer(buffer) => Some(buffer),
            Self::Texture(_) => None,
        }
    }
}

/// Descriptor for creating a heap.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HeapDescriptor {
    /// Heap size in bytes.
    pub size: u64,
}

/// Hardware queue a command list submits to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueType {
    Graphics,
    Compute,
}

/// Color target of a render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassColorTarget {
    pub texture: TextureHandle,
    pub mip: u32,
    pub slice: u32,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
}

/// Depth/stencil target of a render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassDepthTarget {
    pub texture: TextureHandle,
    pub mip: u32,
    pub slice: u32,
    pub depth_load_op: LoadOp,
    pub depth_store_op: StoreOp,
    pub stencil_load_op: LoadOp,
    pub stencil_store_op: StoreOp,
    pub read_only: bool,
}

/// Render target binding for a graphics pass.
///
/// `color` is indexed by attachment slot; unused slots are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderPassDescriptor {
    pub label: String,
    pub color: Vec<Option<RenderPassColorTarget>>,
    pub depth: Option<RenderPassDepthTarget>,
}

/// Device-side operations the render graph consumes.
///
/// Calls are synchronous. All methods take `&self`; implementations that need
/// bookkeeping use interior mutability.
pub trait GpuDevice {
    /// Allocate a heap that placed objects can alias inside.
    fn create_heap(&self, desc: &HeapDescriptor, name: &str) -> BackendResult<HeapHandle>;

    /// Create a texture, placed in `heap` when given.
    fn create_texture(
        &self,
        desc: &TextureDescriptor,
        heap: Option<HeapHandle>,
        name: &str,
    ) -> BackendResult<TextureHandle>;

    /// Create a buffer, placed in `heap` when given.
    fn create_buffer(
        &self,
        desc: &BufferDescriptor,
        heap: Option<HeapHandle>,
        name: &str,
    ) -> BackendResult<BufferHandle>;

    /// Create a timeline fence starting at value 0.
    fn create_fence(&self, name: &str) -> BackendResult<FenceHandle>;

    /// Bytes of heap memory a texture with this descriptor occupies.
    fn allocation_size(&self, desc: &TextureDescriptor) -> u64;

    /// Monotonic frame counter.
    fn frame_id(&self) -> u64;

    fn create_shader_resource_view(
        &self,
        resource: GpuResource,
        desc: &ShaderResourceViewDescriptor,
        name: &str,
    ) -> BackendResult<ViewHandle>;

    fn create_unordered_access_view(
        &self,
        resource: GpuResource,
        desc: &UnorderedAccessViewDescriptor,
        name: &str,
    ) -> BackendResult<ViewHandle>;

    fn destroy_resource(&self, resource: GpuResource);

    fn destroy_heap(&self, heap: HeapHandle);

    fn destroy_view(&self, view: ViewHandle);
}

/// Command recording operations the render graph consumes.
pub trait CommandList {
    /// Queue this list submits to.
    fn queue(&self) -> QueueType;

    /// Transition `subresource` of `resource` (or all of them for
    /// [`ALL_SUBRESOURCES`]) from `before` to `after`.
    fn resource_barrier(
        &mut self,
        resource: GpuResource,
        subresource: u32,
        before: AccessFlags,
        after: AccessFlags,
    );

    fn begin_render_pass(&mut self, desc: &RenderPassDescriptor);

    fn end_render_pass(&mut self);

    fn begin_event(&mut self, name: &str);

    fn end_event(&mut self);

    /// Make this queue wait until `fence` reaches `value`.
    fn wait(&mut self, fence: FenceHandle, value: u64);

    /// Signal `fence` to `value` once prior work on this queue completes.
    fn signal(&mut self, fence: FenceHandle, value: u64);

    /// Close the current batch, submit it, and start a new one.
    fn submit(&mut self);

    fn dispatch(&mut self, x: u32, y: u32, z: u32);

    fn draw(&mut self, vertex_count: u32, instance_count: u32);

    fn copy(&mut self, src: GpuResource, dst: GpuResource);
}
