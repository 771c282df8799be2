//! Execution context handed to pass bodies.

use crate::allocator::ResourceAllocator;
use crate::backend::{BufferHandle, CommandList, GpuResource, TextureHandle, ViewHandle};
use crate::error::GraphError;
use crate::types::{ShaderResourceViewDescriptor, UnorderedAccessViewDescriptor, ViewDescriptor};

use super::handle::RgHandle;
use super::resource::Resource;

/// Context for recording one pass.
///
/// Resolves graph handles to the objects realized for this frame and hands out
/// views through the allocator's view cache.
pub struct PassContext<'a> {
    command_list: &'a mut dyn CommandList,
    resources: &'a [Resource],
    allocator: &'a ResourceAllocator,
    pass_name: &'a str,
}

impl<'a> PassContext<'a> {
    pub(crate) fn new(
        command_list: &'a mut dyn CommandList,
        resources: &'a [Resource],
        allocator: &'a ResourceAllocator,
        pass_name: &'a str,
    ) -> Self {
        Self {
            command_list,
            resources,
            allocator,
            pass_name,
        }
    }

    /// Command list the pass records into.
    pub fn command_list(&mut self) -> &mut (dyn CommandList + 'a) {
        &mut *self.command_list
    }

    pub fn pass_name(&self) -> &str {
        self.pass_name
    }

    /// Texture backing `handle`, if it names a realized texture.
    pub fn texture(&self, handle: RgHandle) -> Option<TextureHandle> {
        self.object(handle)?.as_texture()
    }

    /// Buffer backing `handle`, if it names a realized buffer.
    pub fn buffer(&self, handle: RgHandle) -> Option<BufferHandle> {
        self.object(handle)?.as_buffer()
    }

    /// Shader resource view of the object behind `handle`.
    pub fn shader_resource_view(
        &self,
        handle: RgHandle,
        desc: ShaderResourceViewDescriptor,
    ) -> Result<ViewHandle, GraphError> {
        self.view(handle, ViewDescriptor::ShaderResource(desc))
    }

    /// Unordered access view of the object behind `handle`.
    pub fn unordered_access_view(
        &self,
        handle: RgHandle,
        desc: UnorderedAccessViewDescriptor,
    ) -> Result<ViewHandle, GraphError> {
        self.view(handle, ViewDescriptor::UnorderedAccess(desc))
    }

    fn object(&self, handle: RgHandle) -> Option<GpuResource> {
        if !handle.is_valid() {
            return None;
        }
        self.resources
            .get(usize::from(handle.index()))?
            .gpu_resource()
    }

    fn view(&self, handle: RgHandle, desc: ViewDescriptor) -> Result<ViewHandle, GraphError> {
        let object = self.object(handle).ok_or_else(|| {
            GraphError::pass_failed(self.pass_name, format!("{handle:?} has no backing object"))
        })?;
        let name = self.resources[usize::from(handle.index())].name();
        Ok(self.allocator.descriptor(object, desc, name)?)
    }
}
