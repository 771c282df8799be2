//! Per-frame render graph.
//!
//! A frame goes through four steps:
//!
//! 1. [`clear`](RenderGraph::clear) releases the previous frame's resources
//!    and lets the allocator evict idle memory.
//! 2. Passes are declared with [`add_pass`](RenderGraph::add_pass). Each pass
//!    declares what it creates, reads and writes through a [`PassBuilder`].
//!    Every write produces a new version of the resource, so the declarations
//!    form a DAG of pass nodes and resource-version nodes.
//! 3. [`compile`](RenderGraph::compile) culls everything that cannot reach a
//!    presented resource, schedules async compute, binds backing memory and
//!    works out the barriers every pass needs.
//! 4. [`execute`](RenderGraph::execute) records barriers, fence operations,
//!    render passes and pass bodies into the two command lists.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use redlilium_rendergraph::backend::dummy::{DummyDevice, RecordingCommandList};
//! use redlilium_rendergraph::backend::QueueType;
//! use redlilium_rendergraph::graph::{LoadOp, PassType, RenderGraph, RgHandle};
//! use redlilium_rendergraph::types::{AccessFlags, TextureDescriptor, TextureFormat, TextureUsage};
//!
//! #[derive(Default)]
//! struct Lighting {
//!     output: RgHandle,
//! }
//!
//! let device = Arc::new(DummyDevice::new());
//! let mut graph = RenderGraph::new(device).unwrap();
//!
//! let lighting = graph.add_pass::<Lighting, _, _>(
//!     "lighting",
//!     PassType::Graphics,
//!     |data, builder| {
//!         let desc = TextureDescriptor::new_2d(1920, 1080, TextureFormat::Rgba16Float, TextureUsage::empty());
//!         let hdr = builder.create_texture(desc, "hdr");
//!         data.output = builder.write_color(0, hdr, 0, LoadOp::clear_color(0.0, 0.0, 0.0, 1.0));
//!     },
//!     |_, context| {
//!         context.command_list().draw(3, 1);
//!         Ok(())
//!     },
//! );
//! let output = lighting.output;
//! graph.present(output, AccessFlags::PIXEL_SHADER_SRV);
//!
//! let mut graphics = RecordingCommandList::new(QueueType::Graphics);
//! let mut compute = RecordingCommandList::new(QueueType::Compute);
//! graph.compile().unwrap();
//! graph.execute(&mut graphics, &mut compute).unwrap();
//! assert!(graph.texture(output).unwrap().texture().is_some());
//! ```

mod async_compute;
mod builder;
mod context;
pub mod dag;
mod handle;
mod pass;
mod resource;
mod target;

pub use builder::PassBuilder;
pub use context::PassContext;
pub use dag::{Dag, EdgeId, NodeId};
pub use handle::RgHandle;
pub use pass::{PassType, ShaderStages};
pub use resource::{BufferResource, Resource, TextureResource};
pub use target::{ColorAttachment, DepthStencilAttachment, LoadOp, StoreOp, MAX_COLOR_ATTACHMENTS};

use std::sync::Arc;

use crate::allocator::ResourceAllocator;
use crate::backend::{
    BufferHandle, CommandList, FenceHandle, GpuDevice, TextureHandle, ALL_SUBRESOURCES,
};
use crate::config::RenderGraphConfig;
use crate::error::GraphError;
use crate::profiling::{profile_function, profile_scope};
use crate::types::{AccessFlags, BufferDescriptor, TextureDescriptor};

use pass::{PassNode, TypedPass};

/// Payload of a DAG node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GraphNode {
    /// Index into the frame's passes.
    Pass(usize),
    /// Index into the frame's resource version nodes.
    Resource(usize),
}

/// How a pass touches a resource version.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum EdgeKind {
    Read,
    Write,
    ColorAttachment(ColorAttachment),
    WriteDepth(DepthStencilAttachment),
    ReadDepth(DepthStencilAttachment),
}

/// Payload of a DAG edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct EdgeData {
    pub kind: EdgeKind,
    pub access: AccessFlags,
    pub subresource: u32,
}

impl EdgeData {
    pub fn new(kind: EdgeKind, access: AccessFlags, subresource: u32) -> Self {
        Self {
            kind,
            access,
            subresource,
        }
    }
}

/// One version of a logical resource.
#[derive(Debug, Clone, Copy)]
struct ResourceNode {
    resource: usize,
    version: u32,
    dag_id: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameState {
    Declaring,
    Compiled,
    Executed,
}

/// Render graph for one frame, reused across frames through [`clear`](Self::clear).
pub struct RenderGraph {
    config: RenderGraphConfig,
    allocator: ResourceAllocator,
    dag: Dag<GraphNode, EdgeData>,
    passes: Vec<PassNode>,
    resources: Vec<Resource>,
    resource_nodes: Vec<ResourceNode>,
    outputs: Vec<(RgHandle, AccessFlags)>,
    pending_events: Vec<String>,
    finalizers: Vec<Box<dyn FnOnce()>>,
    graphics_fence: FenceHandle,
    compute_fence: FenceHandle,
    graphics_fence_value: u64,
    compute_fence_value: u64,
    state: FrameState,
}

impl RenderGraph {
    /// Create a render graph with the default configuration.
    pub fn new(device: Arc<dyn GpuDevice>) -> Result<Self, GraphError> {
        Self::with_config(device, RenderGraphConfig::default())
    }

    /// Create a render graph with an explicit configuration.
    pub fn with_config(
        device: Arc<dyn GpuDevice>,
        config: RenderGraphConfig,
    ) -> Result<Self, GraphError> {
        let graphics_fence = device.create_fence("render graph graphics fence")?;
        let compute_fence = device.create_fence("render graph compute fence")?;
        log::debug!("render graph created with {config:?}");

        Ok(Self {
            allocator: ResourceAllocator::new(device, config.clone()),
            config,
            dag: Dag::new(),
            passes: Vec::new(),
            resources: Vec::new(),
            resource_nodes: Vec::new(),
            outputs: Vec::new(),
            pending_events: Vec::new(),
            finalizers: Vec::new(),
            graphics_fence,
            compute_fence,
            graphics_fence_value: 0,
            compute_fence_value: 0,
            state: FrameState::Declaring,
        })
    }

    pub fn config(&self) -> &RenderGraphConfig {
        &self.config
    }

    pub fn allocator(&self) -> &ResourceAllocator {
        &self.allocator
    }

    /// End the previous frame and start declaring a new one.
    ///
    /// Runs registered finalizers, returns every realized resource to the
    /// allocator and evicts memory that has been idle for too long.
    pub fn clear(&mut self) {
        profile_function!();

        for finalizer in self.finalizers.drain(..) {
            finalizer();
        }
        for resource in &self.resources {
            resource.release(&mut self.allocator);
        }

        self.dag.clear();
        self.passes.clear();
        self.resources.clear();
        self.resource_nodes.clear();
        self.outputs.clear();
        self.pending_events.clear();

        self.allocator.reset();
        self.state = FrameState::Declaring;
    }

    /// Run `finalizer` at the next [`clear`](Self::clear), or when the graph
    /// is dropped.
    pub fn register_finalizer(&mut self, finalizer: impl FnOnce() + 'static) {
        self.finalizers.push(Box::new(finalizer));
    }

    /// Open a debug event around the passes declared next.
    pub fn begin_event(&mut self, name: &str) {
        self.pending_events.push(name.to_string());
    }

    /// Close the innermost open debug event.
    pub fn end_event(&mut self) {
        if self.pending_events.pop().is_some() {
            return;
        }
        match self.passes.last_mut() {
            Some(pass) => pass.end_event_count += 1,
            None => log::warn!("end_event() without a matching begin_event()"),
        }
    }

    /// Wrap the passes declared in `f` in a debug event.
    pub fn event_scope<R>(&mut self, name: &str, f: impl FnOnce(&mut Self) -> R) -> R {
        self.begin_event(name);
        let result = f(self);
        self.end_event();
        result
    }

    /// Declare a pass.
    ///
    /// `setup` runs immediately with fresh pass data and a builder for the
    /// pass's resource declarations. `execute` runs during
    /// [`execute`](Self::execute) if the pass survives culling. Returns the
    /// pass data, so handles created in `setup` can be passed on.
    pub fn add_pass<D, S, E>(&mut self, name: &str, ty: PassType, setup: S, execute: E) -> &D
    where
        D: Default + 'static,
        S: FnOnce(&mut D, &mut PassBuilder<'_>),
        E: Fn(&D, &mut PassContext<'_>) -> Result<(), GraphError> + 'static,
    {
        self.assert_declaring();
        let index = self.passes.len();
        let dag_id = self.dag.add_node(GraphNode::Pass(index));
        let events = std::mem::take(&mut self.pending_events);
        self.passes.push(PassNode::new(name, ty, dag_id, events));

        let mut data = D::default();
        setup(&mut data, &mut PassBuilder::new(self, index));

        let pass = &mut self.passes[index];
        pass.executor = Some(Box::new(TypedPass::new(data, execute)));
        pass.executor
            .as_ref()
            .and_then(|executor| executor.as_any().downcast_ref::<D>())
            .expect("pass data has the declared type")
    }

    /// Wrap a caller-owned texture currently in `state`.
    ///
    /// Imported textures are never aliased and never destroyed by the graph.
    pub fn import_texture(
        &mut self,
        texture: TextureHandle,
        desc: TextureDescriptor,
        state: AccessFlags,
    ) -> RgHandle {
        self.assert_declaring();
        let name = desc.label.clone().unwrap_or_else(|| "imported texture".to_string());
        self.add_resource(Resource::imported_texture(texture, desc, state, &name))
    }

    /// Wrap a caller-owned buffer currently in `state`.
    pub fn import_buffer(
        &mut self,
        buffer: BufferHandle,
        desc: BufferDescriptor,
        state: AccessFlags,
    ) -> RgHandle {
        self.assert_declaring();
        let name = desc.label.clone().unwrap_or_else(|| "imported buffer".to_string());
        self.add_resource(Resource::imported_buffer(buffer, desc, state, &name))
    }

    /// Keep `handle` alive through culling and leave its resource in `state`
    /// at the end of the frame.
    ///
    /// Presented resources keep their own memory and get the same object
    /// back next frame when declared with the same descriptor.
    pub fn present(&mut self, handle: RgHandle, state: AccessFlags) {
        self.assert_declaring();
        let node = *self.resource_node(handle);
        self.dag.mark_target(node.dag_id);
        self.resources[node.resource].mark_output();
        self.outputs.push((handle, state));
    }

    /// Cull, schedule, allocate and resolve barriers for the declared frame.
    pub fn compile(&mut self) -> Result<(), GraphError> {
        profile_function!();
        assert!(
            self.state == FrameState::Declaring,
            "compile() requires a freshly declared frame"
        );

        let culled = self.dag.cull();
        let fences = async_compute::schedule(&self.dag, &mut self.passes);

        for node in &self.resource_nodes {
            if self.dag.is_culled(node.dag_id) {
                continue;
            }
            let resource = &mut self.resources[node.resource];
            let outgoing = self.dag.outgoing_edges(node.dag_id);
            let incoming = self.dag.incoming_edges(node.dag_id);
            for &edge_id in outgoing.iter().chain(incoming) {
                if !self.dag.is_edge_live(edge_id) {
                    continue;
                }
                let edge = self.dag.edge(edge_id);
                let other = if edge.from() == node.dag_id {
                    edge.to()
                } else {
                    edge.from()
                };
                let GraphNode::Pass(pass) = *self.dag.node(other) else {
                    unreachable!("resource nodes only connect to passes");
                };
                let data = edge.payload();
                resource.record_usage(
                    pass,
                    self.passes[pass].ty.queue(),
                    data.access,
                    data.subresource,
                );
            }
        }

        let mut order = Vec::new();
        for (index, resource) in self.resources.iter_mut().enumerate() {
            resource.finish_usage();
            if let Some((first, _)) = resource.span() {
                order.push((first, index));
            }
        }
        order.sort_unstable();

        {
            profile_scope!("realize resources");
            for &(_, index) in &order {
                self.resources[index].realize(&mut self.allocator)?;
            }
        }

        {
            profile_scope!("resolve barriers");
            for &(_, index) in &order {
                let (barriers, discard) =
                    self.resources[index].resolve_barriers(index, &mut self.allocator);
                if let Some(discard) = discard {
                    self.passes[discard.pass].discard_barriers.push(discard);
                }
                for barrier in barriers {
                    self.passes[barrier.pass].barriers.push(barrier);
                }
            }
        }

        log::debug!(
            "compiled render graph: {} passes, {} resources used, {} nodes culled, fences +{}/+{}",
            self.passes.len(),
            order.len(),
            culled,
            fences.graphics,
            fences.compute
        );
        self.state = FrameState::Compiled;
        Ok(())
    }

    /// Record the compiled frame.
    ///
    /// Async compute passes record into `compute`; everything else records
    /// into `graphics`. The present transitions are recorded into `graphics`
    /// after the last pass.
    pub fn execute(
        &mut self,
        graphics: &mut dyn CommandList,
        compute: &mut dyn CommandList,
    ) -> Result<(), GraphError> {
        profile_function!();
        assert!(
            self.state == FrameState::Compiled,
            "execute() requires a compiled frame"
        );

        let mut last_graphics = self.graphics_fence_value;
        let mut last_compute = self.compute_fence_value;

        for pass in &self.passes {
            let is_async = pass.is_async();
            let cmd: &mut dyn CommandList = if is_async {
                &mut *compute
            } else {
                &mut *graphics
            };

            if let Some(wait) = pass.wait_value {
                let (fence, base) = if is_async {
                    (self.graphics_fence, self.graphics_fence_value)
                } else {
                    (self.compute_fence, self.compute_fence_value)
                };
                cmd.submit();
                cmd.wait(fence, base + wait);
            }

            for name in &pass.event_names {
                cmd.begin_event(name);
            }
            if !self.dag.is_culled(pass.dag_id) {
                self.execute_pass(pass, cmd)?;
            }
            for _ in 0..pass.end_event_count {
                cmd.end_event();
            }

            if let Some(signal) = pass.signal_value {
                if is_async {
                    let value = self.compute_fence_value + signal;
                    cmd.signal(self.compute_fence, value);
                    last_compute = last_compute.max(value);
                } else {
                    let value = self.graphics_fence_value + signal;
                    cmd.signal(self.graphics_fence, value);
                    last_graphics = last_graphics.max(value);
                }
                cmd.submit();
            }
        }

        self.graphics_fence_value = last_graphics;
        self.compute_fence_value = last_compute;

        for (handle, state) in std::mem::take(&mut self.outputs) {
            let resource = &mut self.resources[usize::from(handle.index())];
            let before = resource.final_state();
            if before == state {
                continue;
            }
            if let Some(object) = resource.gpu_resource() {
                graphics.resource_barrier(object, ALL_SUBRESOURCES, before, state);
            }
            resource.set_final_state(state);
        }

        self.state = FrameState::Executed;
        Ok(())
    }

    fn execute_pass(&self, pass: &PassNode, cmd: &mut dyn CommandList) -> Result<(), GraphError> {
        if self.config.enable_pass_events {
            cmd.begin_event(&pass.name);
        }

        for discard in &pass.discard_barriers {
            cmd.resource_barrier(discard.object, ALL_SUBRESOURCES, discard.before, discard.after);
        }
        for barrier in &pass.barriers {
            if let Some(object) = self.resources[barrier.resource].gpu_resource() {
                cmd.resource_barrier(object, barrier.subresource, barrier.before, barrier.after);
            }
        }

        let render_pass = pass.has_attachments();
        if render_pass {
            cmd.begin_render_pass(&pass.render_pass_descriptor(&self.resources));
        }
        if let Some(executor) = &pass.executor {
            let mut context = PassContext::new(&mut *cmd, &self.resources, &self.allocator, &pass.name);
            executor.execute(&mut context)?;
        }
        if render_pass {
            cmd.end_render_pass();
        }

        if self.config.enable_pass_events {
            cmd.end_event();
        }
        Ok(())
    }

    /// Logical texture behind `handle`.
    ///
    /// Returns `None` for an invalid handle. Panics if `handle` names a buffer.
    pub fn texture(&self, handle: RgHandle) -> Option<&TextureResource> {
        match self.resource(handle)? {
            Resource::Texture(texture) => Some(texture),
            Resource::Buffer(buffer) => {
                panic!("{handle:?} ('{}') is a buffer, not a texture", buffer.name())
            }
        }
    }

    /// Logical buffer behind `handle`.
    ///
    /// Returns `None` for an invalid handle. Panics if `handle` names a texture.
    pub fn buffer(&self, handle: RgHandle) -> Option<&BufferResource> {
        match self.resource(handle)? {
            Resource::Buffer(buffer) => Some(buffer),
            Resource::Texture(texture) => {
                panic!("{handle:?} ('{}') is a texture, not a buffer", texture.name())
            }
        }
    }

    fn resource(&self, handle: RgHandle) -> Option<&Resource> {
        if !handle.is_valid() {
            return None;
        }
        self.resources.get(usize::from(handle.index()))
    }

    /// Version number of the node `handle` refers to.
    pub fn version(&self, handle: RgHandle) -> u32 {
        self.resource_node(handle).version
    }

    /// Returns true if the version `handle` refers to was culled.
    pub fn is_culled(&self, handle: RgHandle) -> bool {
        self.dag.is_culled(self.resource_node(handle).dag_id)
    }

    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Returns true if the pass named `name` was culled by the last compile.
    pub fn is_pass_culled(&self, name: &str) -> Option<bool> {
        self.passes
            .iter()
            .find(|pass| pass.name == name)
            .map(|pass| self.dag.is_culled(pass.dag_id))
    }

    /// Graphics fence value signaled by the last executed frame.
    pub fn graphics_fence_value(&self) -> u64 {
        self.graphics_fence_value
    }

    /// Compute fence value signaled by the last executed frame.
    pub fn compute_fence_value(&self) -> u64 {
        self.compute_fence_value
    }

    pub fn graphics_fence(&self) -> FenceHandle {
        self.graphics_fence
    }

    pub fn compute_fence(&self) -> FenceHandle {
        self.compute_fence
    }

    /// Render the frame's DAG in Graphviz DOT syntax.
    pub fn export_graphviz(&self) -> String {
        self.dag.to_graphviz(
            "render graph",
            |_, node| match *node {
                GraphNode::Pass(index) => {
                    let pass = &self.passes[index];
                    format!(
                        "label=\"{}\\n{:?}\", shape=box",
                        escape(&pass.name),
                        pass.ty
                    )
                }
                GraphNode::Resource(index) => {
                    let node = &self.resource_nodes[index];
                    let resource = &self.resources[node.resource];
                    let shape = if resource.is_texture() { "ellipse" } else { "hexagon" };
                    format!(
                        "label=\"{} v{}\", shape={shape}",
                        escape(resource.name()),
                        node.version
                    )
                }
            },
            |edge| {
                let color = match edge.kind {
                    EdgeKind::Read => "black",
                    EdgeKind::Write => "red",
                    EdgeKind::ColorAttachment(_) => "orange",
                    EdgeKind::WriteDepth(_) | EdgeKind::ReadDepth(_) => "blue",
                };
                format!("color={color}, label=\"{}\"", edge.subresource)
            },
        )
    }

    fn assert_declaring(&self) {
        assert!(
            self.state == FrameState::Declaring,
            "call clear() before declaring the next frame"
        );
    }

    fn resource_node(&self, handle: RgHandle) -> &ResourceNode {
        assert!(handle.is_valid(), "invalid render graph handle");
        let node = self
            .resource_nodes
            .get(usize::from(handle.node()))
            .unwrap_or_else(|| panic!("{handle:?} does not belong to this frame"));
        assert_eq!(
            node.resource,
            usize::from(handle.index()),
            "{handle:?} names a node of another resource"
        );
        node
    }

    fn add_resource(&mut self, resource: Resource) -> RgHandle {
        let index = self.resources.len();
        self.resources.push(resource);
        let node = self.add_resource_node(index, 0);
        RgHandle::new(index, node)
    }

    fn add_resource_node(&mut self, resource: usize, version: u32) -> usize {
        let index = self.resource_nodes.len();
        let dag_id = self.dag.add_node(GraphNode::Resource(index));
        self.resource_nodes.push(ResourceNode {
            resource,
            version,
            dag_id,
        });
        index
    }

    fn add_read(&mut self, pass: usize, handle: RgHandle, edge: EdgeData) {
        let from = self.resource_node(handle).dag_id;
        let to = self.passes[pass].dag_id;
        self.dag.add_edge(from, to, edge);
    }

    /// Connect the written version to the pass and the pass to a new version.
    fn add_write(&mut self, pass: usize, handle: RgHandle, edge: EdgeData) -> RgHandle {
        let input = self.resource_node(handle).dag_id;
        let resource = usize::from(handle.index());
        let pass_id = self.passes[pass].dag_id;
        self.dag.add_edge(input, pass_id, edge);

        let version = self.resources[resource].bump_version();
        let node = self.add_resource_node(resource, version);
        self.dag
            .add_edge(pass_id, self.resource_nodes[node].dag_id, edge);
        RgHandle::new(resource, node)
    }
}

impl Drop for RenderGraph {
    fn drop(&mut self) {
        for finalizer in self.finalizers.drain(..) {
            finalizer();
        }
    }
}

impl std::fmt::Debug for RenderGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderGraph")
            .field("passes", &self.passes.len())
            .field("resources", &self.resources.len())
            .field("nodes", &self.dag.node_count())
            .field("state", &self.state)
            .field("allocator", &self.allocator)
            .finish()
    }
}

fn escape(name: &str) -> String {
    name.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(all(test, feature = "dummy"))]
mod tests {
    use super::*;
    use crate::backend::dummy::{DummyDevice, RecordingCommandList};
    use crate::backend::QueueType;
    use crate::types::{TextureFormat, TextureUsage};

    #[derive(Default)]
    struct Output {
        handle: RgHandle,
    }

    fn graph() -> RenderGraph {
        RenderGraph::new(Arc::new(DummyDevice::new())).unwrap()
    }

    fn color() -> TextureDescriptor {
        TextureDescriptor::new_2d(32, 32, TextureFormat::Rgba8Unorm, TextureUsage::empty())
    }

    #[test]
    fn test_write_appends_version_node() {
        let mut graph = graph();
        let pass = graph.add_pass::<Output, _, _>(
            "blit",
            PassType::Graphics,
            |data, builder| {
                let target = builder.create_texture(color(), "target");
                data.handle = builder.write_color(0, target, 0, LoadOp::Load);
            },
            |_, _| Ok(()),
        );
        let handle = pass.handle;

        assert_eq!(handle.index(), 0);
        assert_eq!(handle.node(), 1);
        assert_eq!(graph.version(handle), 1);
        // pass, v0, v1
        assert_eq!(graph.dag.node_count(), 3);
        assert_eq!(graph.dag.edge_count(), 2);
    }

    #[test]
    fn test_events_attach_to_next_pass() {
        let mut graph = graph();
        graph.event_scope("frame", |graph| {
            graph.add_pass::<(), _, _>("a", PassType::Compute, |_, b| b.skip_culling(), |_, _| Ok(()));
        });
        assert_eq!(graph.passes[0].event_names, vec!["frame".to_string()]);
        assert_eq!(graph.passes[0].end_event_count, 1);
        assert!(graph.pending_events.is_empty());
    }

    #[test]
    fn test_pending_event_closes_before_any_pass() {
        let mut graph = graph();
        graph.begin_event("empty");
        graph.end_event();
        graph.add_pass::<(), _, _>("a", PassType::Compute, |_, b| b.skip_culling(), |_, _| Ok(()));
        assert!(graph.passes[0].event_names.is_empty());
        assert_eq!(graph.passes[0].end_event_count, 0);
    }

    #[test]
    fn test_graphviz_marks_culled_nodes() {
        let mut graph = graph();
        graph.add_pass::<(), _, _>(
            "unused \"pass\"",
            PassType::Graphics,
            |_, builder| {
                let target = builder.create_texture(color(), "scratch");
                builder.write_color(0, target, 0, LoadOp::DontCare);
            },
            |_, _| Ok(()),
        );
        graph.compile().unwrap();

        let dot = graph.export_graphviz();
        assert!(dot.starts_with("digraph \"render graph\" {"));
        assert!(dot.contains("unused \\\"pass\\\""));
        assert!(dot.contains("scratch v1"));
        assert!(dot.contains("style=dashed"));
    }

    #[test]
    fn test_execute_requires_compile() {
        let mut graph = graph();
        let mut graphics = RecordingCommandList::new(QueueType::Graphics);
        let mut compute = RecordingCommandList::new(QueueType::Compute);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = graph.execute(&mut graphics, &mut compute);
        }));
        assert!(result.is_err());
    }
}
