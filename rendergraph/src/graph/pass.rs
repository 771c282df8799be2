//! Pass nodes and their execution callbacks.

use std::any::Any;

use bitflags::bitflags;

use crate::backend::{
    QueueType, RenderPassColorTarget, RenderPassDepthTarget, RenderPassDescriptor,
};
use crate::error::GraphError;
use crate::types::AccessFlags;

use super::context::PassContext;
use super::dag::NodeId;
use super::resource::{DiscardBarrier, Resource, ResourceBarrier};
use super::target::{ColorAttachment, DepthStencilAttachment, StoreOp, MAX_COLOR_ATTACHMENTS};

/// Kind of work a pass records, which decides its queue and legal accesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PassType {
    /// Rasterization work on the graphics queue.
    #[default]
    Graphics,
    /// Compute work on the graphics queue.
    Compute,
    /// Compute work on the asynchronous compute queue.
    AsyncCompute,
    /// Copy work on the graphics queue.
    Copy,
}

impl PassType {
    /// Accesses a pass of this type may declare through `read` and `write`.
    pub fn legal_access(self) -> AccessFlags {
        match self {
            Self::Graphics => {
                AccessFlags::all() - (AccessFlags::COMPUTE_SRV | AccessFlags::COMPUTE_UAV)
            }
            Self::Compute | Self::AsyncCompute => {
                AccessFlags::COMPUTE_SRV
                    | AccessFlags::COMPUTE_UAV
                    | AccessFlags::CLEAR_UAV
                    | AccessFlags::INDIRECT_ARGS
                    | AccessFlags::MASK_COPY
                    | AccessFlags::AS_READ
                    | AccessFlags::AS_WRITE
            }
            Self::Copy => AccessFlags::MASK_COPY,
        }
    }

    /// Queue the pass records into.
    pub fn queue(self) -> QueueType {
        match self {
            Self::AsyncCompute => QueueType::Compute,
            _ => QueueType::Graphics,
        }
    }

    /// Access used by `read_default` for this pass type.
    pub fn default_read(self, stages: ShaderStages) -> AccessFlags {
        match self {
            Self::Graphics => {
                let mut access = AccessFlags::empty();
                if stages.contains(ShaderStages::VERTEX) {
                    access |= AccessFlags::VERTEX_SHADER_SRV;
                }
                if stages.contains(ShaderStages::PIXEL) || stages.is_empty() {
                    access |= AccessFlags::PIXEL_SHADER_SRV;
                }
                access
            }
            Self::Compute | Self::AsyncCompute => AccessFlags::COMPUTE_SRV,
            Self::Copy => AccessFlags::COPY_SRC,
        }
    }

    /// Access used by `write_default` for this pass type.
    pub fn default_write(self, stages: ShaderStages) -> AccessFlags {
        match self {
            Self::Graphics => {
                let mut access = AccessFlags::empty();
                if stages.contains(ShaderStages::VERTEX) {
                    access |= AccessFlags::VERTEX_SHADER_UAV;
                }
                if stages.contains(ShaderStages::PIXEL) || stages.is_empty() {
                    access |= AccessFlags::PIXEL_SHADER_UAV;
                }
                access
            }
            Self::Compute | Self::AsyncCompute => AccessFlags::COMPUTE_UAV | AccessFlags::CLEAR_UAV,
            Self::Copy => AccessFlags::COPY_DST,
        }
    }
}

bitflags! {
    /// Graphics shader stages a default access applies to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStages: u8 {
        const VERTEX = 1 << 0;
        const PIXEL = 1 << 1;
    }
}

impl Default for ShaderStages {
    fn default() -> Self {
        Self::PIXEL
    }
}

/// Type-erased pass body.
pub(crate) trait PassExecutor {
    fn execute(&self, context: &mut PassContext<'_>) -> Result<(), GraphError>;

    /// The pass data, for downcasting back to its declared type.
    fn as_any(&self) -> &dyn Any;
}

/// Pass data paired with the closure that records the pass.
pub(crate) struct TypedPass<D, F> {
    data: D,
    execute: F,
}

impl<D, F> TypedPass<D, F> {
    pub fn new(data: D, execute: F) -> Self {
        Self { data, execute }
    }
}

impl<D, F> PassExecutor for TypedPass<D, F>
where
    D: 'static,
    F: Fn(&D, &mut PassContext<'_>) -> Result<(), GraphError>,
{
    fn execute(&self, context: &mut PassContext<'_>) -> Result<(), GraphError> {
        (self.execute)(&self.data, context)
    }

    fn as_any(&self) -> &dyn Any {
        &self.data
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ColorBinding {
    pub resource: usize,
    pub subresource: u32,
    pub attachment: ColorAttachment,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct DepthBinding {
    pub resource: usize,
    pub subresource: u32,
    pub attachment: DepthStencilAttachment,
}

/// A declared pass and everything compile attaches to it.
pub(crate) struct PassNode {
    pub name: String,
    pub ty: PassType,
    pub dag_id: NodeId,
    pub executor: Option<Box<dyn PassExecutor>>,
    pub color_attachments: [Option<ColorBinding>; MAX_COLOR_ATTACHMENTS],
    pub depth_attachment: Option<DepthBinding>,
    pub barriers: Vec<ResourceBarrier>,
    pub discard_barriers: Vec<DiscardBarrier>,
    /// Value of the other queue's fence to wait for, relative to its frame start.
    pub wait_value: Option<u64>,
    /// Value of this queue's fence to signal, relative to its frame start.
    pub signal_value: Option<u64>,
    pub event_names: Vec<String>,
    pub end_event_count: u32,
}

impl PassNode {
    pub fn new(name: &str, ty: PassType, dag_id: NodeId, event_names: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            ty,
            dag_id,
            executor: None,
            color_attachments: Default::default(),
            depth_attachment: None,
            barriers: Vec::new(),
            discard_barriers: Vec::new(),
            wait_value: None,
            signal_value: None,
            event_names,
            end_event_count: 0,
        }
    }

    pub fn is_async(&self) -> bool {
        self.ty == PassType::AsyncCompute
    }

    pub fn has_attachments(&self) -> bool {
        self.depth_attachment.is_some() || self.color_attachments.iter().any(Option::is_some)
    }

    /// Render pass binding the pass's attachments.
    pub fn render_pass_descriptor(&self, resources: &[Resource]) -> RenderPassDescriptor {
        let texture_of = |index: usize| {
            resources[index]
                .gpu_resource()
                .and_then(|object| object.as_texture())
        };

        let color = self
            .color_attachments
            .iter()
            .map(|binding| {
                let binding = binding.as_ref()?;
                let texture = texture_of(binding.resource)?;
                let (mip, slice) = resources[binding.resource].subresource_location(binding.subresource);
                Some(RenderPassColorTarget {
                    texture,
                    mip,
                    slice,
                    load_op: binding.attachment.load_op,
                    store_op: binding.attachment.store_op,
                })
            })
            .collect();

        let depth = self.depth_attachment.as_ref().and_then(|binding| {
            let texture = texture_of(binding.resource)?;
            let (mip, slice) = resources[binding.resource].subresource_location(binding.subresource);
            let store_op: StoreOp = binding.attachment.store_op();
            Some(RenderPassDepthTarget {
                texture,
                mip,
                slice,
                depth_load_op: binding.attachment.depth_load_op,
                depth_store_op: store_op,
                stencil_load_op: binding.attachment.stencil_load_op,
                stencil_store_op: store_op,
                read_only: binding.attachment.read_only,
            })
        });

        RenderPassDescriptor {
            label: self.name.clone(),
            color,
            depth,
        }
    }
}

impl std::fmt::Debug for PassNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassNode")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("barriers", &self.barriers.len())
            .field("wait_value", &self.wait_value)
            .field("signal_value", &self.signal_value)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::graphics_reads_pixel(PassType::Graphics, AccessFlags::PIXEL_SHADER_SRV, true)]
    #[case::graphics_rejects_compute(PassType::Graphics, AccessFlags::COMPUTE_UAV, false)]
    #[case::compute_reads_indirect(PassType::Compute, AccessFlags::INDIRECT_ARGS, true)]
    #[case::async_rejects_pixel(PassType::AsyncCompute, AccessFlags::PIXEL_SHADER_SRV, false)]
    #[case::copy_copies(PassType::Copy, AccessFlags::COPY_DST, true)]
    #[case::copy_rejects_srv(PassType::Copy, AccessFlags::COMPUTE_SRV, false)]
    fn test_legal_access(#[case] ty: PassType, #[case] access: AccessFlags, #[case] legal: bool) {
        assert_eq!(ty.legal_access().contains(access), legal);
    }

    #[rstest]
    #[case::pixel(PassType::Graphics, ShaderStages::PIXEL, AccessFlags::PIXEL_SHADER_SRV)]
    #[case::no_stage(PassType::Graphics, ShaderStages::empty(), AccessFlags::PIXEL_SHADER_SRV)]
    #[case::both(
        PassType::Graphics,
        ShaderStages::VERTEX | ShaderStages::PIXEL,
        AccessFlags::VERTEX_SHADER_SRV | AccessFlags::PIXEL_SHADER_SRV
    )]
    #[case::compute(PassType::Compute, ShaderStages::VERTEX, AccessFlags::COMPUTE_SRV)]
    #[case::copy(PassType::Copy, ShaderStages::PIXEL, AccessFlags::COPY_SRC)]
    fn test_default_read(
        #[case] ty: PassType,
        #[case] stages: ShaderStages,
        #[case] expected: AccessFlags,
    ) {
        assert_eq!(ty.default_read(stages), expected);
        assert!(ty.legal_access().contains(expected));
    }

    #[test]
    fn test_default_write_is_legal() {
        for ty in [PassType::Graphics, PassType::Compute, PassType::AsyncCompute, PassType::Copy] {
            let access = ty.default_write(ShaderStages::default());
            assert!(access.is_write());
            assert!(ty.legal_access().contains(access));
        }
    }

    #[test]
    fn test_only_async_compute_uses_compute_queue() {
        assert_eq!(PassType::AsyncCompute.queue(), QueueType::Compute);
        assert_eq!(PassType::Compute.queue(), QueueType::Graphics);
    }
}
