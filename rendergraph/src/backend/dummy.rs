//! Dummy GPU backend for testing and development.
//!
//! [`DummyDevice`] hands out unique handles and tracks which objects are
//! alive without touching any GPU. [`RecordingCommandList`] stores every
//! command it receives so tests can assert on the exact stream the render
//! graph produced.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::types::{
    AccessFlags, BufferDescriptor, ShaderResourceViewDescriptor, TextureDescriptor,
    UnorderedAccessViewDescriptor,
};

use super::{
    BackendError, BackendResult, BufferHandle, CommandList, FenceHandle, GpuDevice, GpuResource,
    HeapDescriptor, HeapHandle, QueueType, RenderPassDescriptor, TextureHandle, ViewHandle,
};

/// Object counters reported by [`DummyDevice::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DummyStats {
    pub heaps_created: usize,
    pub textures_created: usize,
    pub buffers_created: usize,
    pub views_created: usize,
    pub fences_created: usize,
    pub live_heaps: usize,
    pub live_textures: usize,
    pub live_buffers: usize,
    pub live_views: usize,
}

#[derive(Debug, Default)]
struct DeviceState {
    stats: DummyStats,
    heaps: HashMap<HeapHandle, u64>,
    objects: HashMap<GpuResource, Option<HeapHandle>>,
    views: HashSet<ViewHandle>,
}

/// Dummy device.
#[derive(Debug, Default)]
pub struct DummyDevice {
    state: Mutex<DeviceState>,
    next_id: AtomicU64,
    frame: AtomicU64,
    fail_allocations: AtomicBool,
}

impl DummyDevice {
    /// Create a new dummy device at frame 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the backend name.
    pub fn name(&self) -> &'static str {
        "Dummy Backend"
    }

    /// Advance the frame counter by one and return the new frame.
    pub fn advance_frame(&self) -> u64 {
        self.frame.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Make every following object creation fail with
    /// [`BackendError::OutOfMemory`].
    pub fn set_fail_allocations(&self, fail: bool) {
        self.fail_allocations.store(fail, Ordering::Relaxed);
    }

    pub fn stats(&self) -> DummyStats {
        self.state.lock().stats
    }

    /// Returns true if `resource` was created and not yet destroyed.
    pub fn is_alive(&self, resource: GpuResource) -> bool {
        self.state.lock().objects.contains_key(&resource)
    }

    /// Heap `resource` was placed in, if any.
    pub fn placement(&self, resource: GpuResource) -> Option<HeapHandle> {
        self.state.lock().objects.get(&resource).copied().flatten()
    }

    fn next_raw(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn check_allocation(&self, what: &str) -> BackendResult<()> {
        if self.fail_allocations.load(Ordering::Relaxed) {
            log::trace!("DummyDevice: failing {what} allocation");
            return Err(BackendError::OutOfMemory);
        }
        Ok(())
    }

    fn check_heap(&self, state: &DeviceState, heap: Option<HeapHandle>) -> BackendResult<()> {
        match heap {
            Some(heap) if !state.heaps.contains_key(&heap) => Err(
                BackendError::TextureCreationFailed(format!("{heap:?} does not exist")),
            ),
            _ => Ok(()),
        }
    }
}

impl GpuDevice for DummyDevice {
    fn create_heap(&self, desc: &HeapDescriptor, name: &str) -> BackendResult<HeapHandle> {
        self.check_allocation("heap")?;
        let handle = HeapHandle::new(self.next_raw());
        log::trace!("DummyDevice: creating heap '{name}' ({} bytes)", desc.size);
        let mut state = self.state.lock();
        state.heaps.insert(handle, desc.size);
        state.stats.heaps_created += 1;
        state.stats.live_heaps += 1;
        Ok(handle)
    }

    fn create_texture(
        &self,
        desc: &TextureDescriptor,
        heap: Option<HeapHandle>,
        name: &str,
    ) -> BackendResult<TextureHandle> {
        self.check_allocation("texture")?;
        let mut state = self.state.lock();
        self.check_heap(&state, heap)?;
        let handle = TextureHandle::new(self.next_raw());
        log::trace!(
            "DummyDevice: creating texture '{name}' ({}x{}x{})",
            desc.size.width,
            desc.size.height,
            desc.size.depth
        );
        state.objects.insert(GpuResource::Texture(handle), heap);
        state.stats.textures_created += 1;
        state.stats.live_textures += 1;
        Ok(handle)
    }

    fn create_buffer(
        &self,
        desc: &BufferDescriptor,
        heap: Option<HeapHandle>,
        name: &str,
    ) -> BackendResult<BufferHandle> {
        self.check_allocation("buffer")?;
        let mut state = self.state.lock();
        self.check_heap(&state, heap)?;
        let handle = BufferHandle::new(self.next_raw());
        log::trace!("DummyDevice: creating buffer '{name}' (size: {})", desc.size);
        state.objects.insert(GpuResource::Buffer(handle), heap);
        state.stats.buffers_created += 1;
        state.stats.live_buffers += 1;
        Ok(handle)
    }

    fn create_fence(&self, name: &str) -> BackendResult<FenceHandle> {
        log::trace!("DummyDevice: creating fence '{name}'");
        self.state.lock().stats.fences_created += 1;
        Ok(FenceHandle::new(self.next_raw()))
    }

    fn allocation_size(&self, desc: &TextureDescriptor) -> u64 {
        let texel = u64::from(desc.format.block_size()) * u64::from(desc.sample_count.max(1));
        let layers = u64::from(desc.size.depth.max(1));
        (0..desc.mip_level_count.max(1))
            .map(|mip| {
                let width = u64::from((desc.size.width >> mip).max(1));
                let height = u64::from((desc.size.height >> mip).max(1));
                width * height * texel * layers
            })
            .sum()
    }

    fn frame_id(&self) -> u64 {
        self.frame.load(Ordering::Relaxed)
    }

    fn create_shader_resource_view(
        &self,
        resource: GpuResource,
        _desc: &ShaderResourceViewDescriptor,
        name: &str,
    ) -> BackendResult<ViewHandle> {
        log::trace!("DummyDevice: creating SRV '{name}' of {resource:?}");
        self.create_view(resource)
    }

    fn create_unordered_access_view(
        &self,
        resource: GpuResource,
        _desc: &UnorderedAccessViewDescriptor,
        name: &str,
    ) -> BackendResult<ViewHandle> {
        log::trace!("DummyDevice: creating UAV '{name}' of {resource:?}");
        self.create_view(resource)
    }

    fn destroy_resource(&self, resource: GpuResource) {
        log::trace!("DummyDevice: destroying {resource:?}");
        let mut state = self.state.lock();
        if state.objects.remove(&resource).is_some() {
            match resource {
                GpuResource::Texture(_) => state.stats.live_textures -= 1,
                GpuResource::Buffer(_) => state.stats.live_buffers -= 1,
            }
        }
    }

    fn destroy_heap(&self, heap: HeapHandle) {
        log::trace!("DummyDevice: destroying {heap:?}");
        let mut state = self.state.lock();
        if state.heaps.remove(&heap).is_some() {
            state.stats.live_heaps -= 1;
        }
    }

    fn destroy_view(&self, view: ViewHandle) {
        let mut state = self.state.lock();
        if state.views.remove(&view) {
            state.stats.live_views -= 1;
        }
    }
}

impl DummyDevice {
    fn create_view(&self, resource: GpuResource) -> BackendResult<ViewHandle> {
        let mut state = self.state.lock();
        if !state.objects.contains_key(&resource) {
            return Err(BackendError::ViewCreationFailed(format!(
                "{resource:?} does not exist"
            )));
        }
        let view = ViewHandle::new(self.next_raw());
        state.views.insert(view);
        state.stats.views_created += 1;
        state.stats.live_views += 1;
        Ok(view)
    }
}

/// A command captured by [`RecordingCommandList`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    Barrier {
        resource: GpuResource,
        subresource: u32,
        before: AccessFlags,
        after: AccessFlags,
    },
    BeginRenderPass(RenderPassDescriptor),
    EndRenderPass,
    BeginEvent(String),
    EndEvent,
    Wait {
        fence: FenceHandle,
        value: u64,
    },
    Signal {
        fence: FenceHandle,
        value: u64,
    },
    Submit,
    Dispatch {
        x: u32,
        y: u32,
        z: u32,
    },
    Draw {
        vertex_count: u32,
        instance_count: u32,
    },
    Copy {
        src: GpuResource,
        dst: GpuResource,
    },
}

/// Command list that records instead of executing.
#[derive(Debug)]
pub struct RecordingCommandList {
    queue: QueueType,
    commands: Vec<RecordedCommand>,
}

impl RecordingCommandList {
    pub fn new(queue: QueueType) -> Self {
        Self {
            queue,
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[RecordedCommand] {
        &self.commands
    }

    /// Take the recorded commands, leaving the list empty.
    pub fn take_commands(&mut self) -> Vec<RecordedCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Position of the first `BeginEvent` with this name.
    pub fn event_position(&self, name: &str) -> Option<usize> {
        self.commands
            .iter()
            .position(|command| matches!(command, RecordedCommand::BeginEvent(n) if n == name))
    }

    /// Barriers recorded for `resource`, in order.
    pub fn barriers_for(&self, resource: GpuResource) -> Vec<(u32, AccessFlags, AccessFlags)> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                RecordedCommand::Barrier {
                    resource: r,
                    subresource,
                    before,
                    after,
                } if *r == resource => Some((*subresource, *before, *after)),
                _ => None,
            })
            .collect()
    }
}

impl CommandList for RecordingCommandList {
    fn queue(&self) -> QueueType {
        self.queue
    }

    fn resource_barrier(
        &mut self,
        resource: GpuResource,
        subresource: u32,
        before: AccessFlags,
        after: AccessFlags,
    ) {
        self.commands.push(RecordedCommand::Barrier {
            resource,
            subresource,
            before,
            after,
        });
    }

    fn begin_render_pass(&mut self, desc: &RenderPassDescriptor) {
        self.commands
            .push(RecordedCommand::BeginRenderPass(desc.clone()));
    }

    fn end_render_pass(&mut self) {
        self.commands.push(RecordedCommand::EndRenderPass);
    }

    fn begin_event(&mut self, name: &str) {
        self.commands
            .push(RecordedCommand::BeginEvent(name.to_string()));
    }

    fn end_event(&mut self) {
        self.commands.push(RecordedCommand::EndEvent);
    }

    fn wait(&mut self, fence: FenceHandle, value: u64) {
        self.commands.push(RecordedCommand::Wait { fence, value });
    }

    fn signal(&mut self, fence: FenceHandle, value: u64) {
        self.commands.push(RecordedCommand::Signal { fence, value });
    }

    fn submit(&mut self) {
        log::trace!("RecordingCommandList: submit on {:?}", self.queue);
        self.commands.push(RecordedCommand::Submit);
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        self.commands.push(RecordedCommand::Dispatch { x, y, z });
    }

    fn draw(&mut self, vertex_count: u32, instance_count: u32) {
        self.commands.push(RecordedCommand::Draw {
            vertex_count,
            instance_count,
        });
    }

    fn copy(&mut self, src: GpuResource, dst: GpuResource) {
        self.commands.push(RecordedCommand::Copy { src, dst });
    }
}

static_assertions::assert_impl_all!(DummyDevice: Send, Sync);
