//! Declaration API used inside a pass's setup closure.

use crate::backend::{BufferHandle, TextureHandle, ALL_SUBRESOURCES};
use crate::types::{AccessFlags, BufferDescriptor, TextureDescriptor};

use super::handle::RgHandle;
use super::pass::{ColorBinding, DepthBinding, PassType, ShaderStages};
use super::resource::Resource;
use super::target::{
    ColorAttachment, DepthStencilAttachment, LoadOp, StoreOp, MAX_COLOR_ATTACHMENTS,
};
use super::{EdgeData, EdgeKind, RenderGraph};

/// Declares the resources one pass creates, reads and writes.
///
/// Reads return the handle they were given. Writes return a handle to the new
/// version they produce; later readers must use that handle to observe the
/// write.
///
/// Every method panics on misuse: invalid or foreign handles, the
/// [`ALL_SUBRESOURCES`] wildcard, access flags the pass type cannot use,
/// attachments on non-graphics passes or on buffers.
pub struct PassBuilder<'a> {
    graph: &'a mut RenderGraph,
    pass: usize,
}

impl<'a> PassBuilder<'a> {
    pub(crate) fn new(graph: &'a mut RenderGraph, pass: usize) -> Self {
        Self { graph, pass }
    }

    /// Type of the pass being declared.
    pub fn pass_type(&self) -> PassType {
        self.graph.passes[self.pass].ty
    }

    /// Create a transient texture. Its memory may alias other transients.
    pub fn create_texture(&mut self, desc: TextureDescriptor, name: &str) -> RgHandle {
        self.graph.add_resource(Resource::new_texture(desc, name))
    }

    /// Create a transient buffer. Its memory may alias other transients.
    pub fn create_buffer(&mut self, desc: BufferDescriptor, name: &str) -> RgHandle {
        self.graph.add_resource(Resource::new_buffer(desc, name))
    }

    /// See [`RenderGraph::import_texture`].
    pub fn import_texture(
        &mut self,
        texture: TextureHandle,
        desc: TextureDescriptor,
        state: AccessFlags,
    ) -> RgHandle {
        self.graph.import_texture(texture, desc, state)
    }

    /// See [`RenderGraph::import_buffer`].
    pub fn import_buffer(
        &mut self,
        buffer: BufferHandle,
        desc: BufferDescriptor,
        state: AccessFlags,
    ) -> RgHandle {
        self.graph.import_buffer(buffer, desc, state)
    }

    /// Read `subresource` of `handle` with `access`.
    pub fn read(&mut self, handle: RgHandle, access: AccessFlags, subresource: u32) -> RgHandle {
        assert!(
            !access.is_empty() && AccessFlags::READ_CAPABLE.contains(access),
            "{access:?} is not a read access"
        );
        self.check_access(handle, access, subresource);
        self.graph.add_read(
            self.pass,
            handle,
            EdgeData::new(EdgeKind::Read, access, subresource),
        );
        handle
    }

    /// Read with the access this pass type normally reads with.
    pub fn read_default(
        &mut self,
        handle: RgHandle,
        subresource: u32,
        stages: ShaderStages,
    ) -> RgHandle {
        let access = self.pass_type().default_read(stages);
        self.read(handle, access, subresource)
    }

    /// Read as indirect draw or dispatch arguments.
    pub fn read_indirect_args(&mut self, handle: RgHandle, subresource: u32) -> RgHandle {
        self.read(handle, AccessFlags::INDIRECT_ARGS, subresource)
    }

    /// Write `subresource` of `handle` with `access`, producing a new version.
    pub fn write(&mut self, handle: RgHandle, access: AccessFlags, subresource: u32) -> RgHandle {
        assert!(
            !access.is_empty() && AccessFlags::WRITE_CAPABLE.contains(access),
            "{access:?} is not a write access"
        );
        self.check_access(handle, access, subresource);
        self.graph.add_write(
            self.pass,
            handle,
            EdgeData::new(EdgeKind::Write, access, subresource),
        )
    }

    /// Write with the access this pass type normally writes with.
    pub fn write_default(
        &mut self,
        handle: RgHandle,
        subresource: u32,
        stages: ShaderStages,
    ) -> RgHandle {
        let access = self.pass_type().default_write(stages);
        self.write(handle, access, subresource)
    }

    /// Bind `subresource` of a texture as color attachment `slot`.
    pub fn write_color(
        &mut self,
        slot: usize,
        handle: RgHandle,
        subresource: u32,
        load_op: LoadOp,
    ) -> RgHandle {
        assert!(
            slot < MAX_COLOR_ATTACHMENTS,
            "color attachment slot {slot} out of range"
        );
        self.check_attachment(handle, subresource);
        assert!(
            self.graph.passes[self.pass].color_attachments[slot].is_none(),
            "color attachment slot {slot} of '{}' is already bound",
            self.graph.passes[self.pass].name
        );

        let attachment = ColorAttachment {
            slot,
            load_op,
            store_op: StoreOp::Store,
        };
        self.graph.passes[self.pass].color_attachments[slot] = Some(ColorBinding {
            resource: usize::from(handle.index()),
            subresource,
            attachment,
        });
        self.graph.add_write(
            self.pass,
            handle,
            EdgeData::new(
                EdgeKind::ColorAttachment(attachment),
                AccessFlags::RTV,
                subresource,
            ),
        )
    }

    /// Bind `subresource` of a texture as the writable depth/stencil attachment.
    pub fn write_depth(
        &mut self,
        handle: RgHandle,
        subresource: u32,
        depth_load_op: LoadOp,
        stencil_load_op: LoadOp,
    ) -> RgHandle {
        let attachment = DepthStencilAttachment {
            depth_load_op,
            stencil_load_op,
            read_only: false,
        };
        self.bind_depth(handle, subresource, attachment, EdgeKind::WriteDepth(attachment))
    }

    /// Bind `subresource` of a texture as a read-only depth/stencil attachment.
    ///
    /// This still produces a new version of the texture.
    pub fn read_depth(&mut self, handle: RgHandle, subresource: u32) -> RgHandle {
        let attachment = DepthStencilAttachment {
            depth_load_op: LoadOp::Load,
            stencil_load_op: LoadOp::Load,
            read_only: true,
        };
        self.bind_depth(handle, subresource, attachment, EdgeKind::ReadDepth(attachment))
    }

    /// Keep the pass even if nothing it produces is presented.
    pub fn skip_culling(&mut self) {
        let id = self.graph.passes[self.pass].dag_id;
        self.graph.dag.mark_target(id);
    }

    fn bind_depth(
        &mut self,
        handle: RgHandle,
        subresource: u32,
        attachment: DepthStencilAttachment,
        kind: EdgeKind,
    ) -> RgHandle {
        self.check_attachment(handle, subresource);
        let pass = &mut self.graph.passes[self.pass];
        assert!(
            pass.depth_attachment.is_none(),
            "depth attachment of '{}' is already bound",
            pass.name
        );
        pass.depth_attachment = Some(DepthBinding {
            resource: usize::from(handle.index()),
            subresource,
            attachment,
        });

        let access = if attachment.read_only {
            AccessFlags::DSV_READ_ONLY
        } else {
            AccessFlags::DSV
        };
        self.graph
            .add_write(self.pass, handle, EdgeData::new(kind, access, subresource))
    }

    fn check_access(&self, handle: RgHandle, access: AccessFlags, subresource: u32) {
        self.check_subresource(handle, subresource);
        let ty = self.pass_type();
        assert!(
            ty.legal_access().contains(access),
            "{access:?} is not allowed in {ty:?} pass '{}'",
            self.graph.passes[self.pass].name
        );
    }

    fn check_attachment(&self, handle: RgHandle, subresource: u32) {
        self.check_subresource(handle, subresource);
        let pass = &self.graph.passes[self.pass];
        assert!(
            pass.ty == PassType::Graphics,
            "attachments require a graphics pass, '{}' is {:?}",
            pass.name,
            pass.ty
        );
        assert!(
            self.graph.resources[usize::from(handle.index())].is_texture(),
            "attachments must be textures"
        );
    }

    fn check_subresource(&self, handle: RgHandle, subresource: u32) {
        assert!(
            subresource != ALL_SUBRESOURCES,
            "passes must name a concrete subresource"
        );
        self.graph.resource_node(handle);
    }
}
