//! Common utilities for render graph integration tests.
//!
//! Every test drives the graph against the dummy device and inspects what
//! was recorded into the two command lists.

#![allow(dead_code)]

use std::sync::Arc;

use redlilium_rendergraph::backend::dummy::{DummyDevice, RecordedCommand, RecordingCommandList};
use redlilium_rendergraph::backend::QueueType;
use redlilium_rendergraph::{
    RenderGraph, RenderGraphConfig, TextureDescriptor, TextureFormat, TextureUsage,
};

/// Initialize logging once per test binary.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A render graph wired to a dummy device and two recording command lists.
pub struct TestContext {
    pub device: Arc<DummyDevice>,
    pub graph: RenderGraph,
    pub graphics: RecordingCommandList,
    pub compute: RecordingCommandList,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(RenderGraphConfig::default())
    }

    pub fn with_config(config: RenderGraphConfig) -> Self {
        init_logging();
        let device = Arc::new(DummyDevice::new());
        let graph = RenderGraph::with_config(device.clone(), config)
            .expect("dummy device creates fences");
        Self {
            device,
            graph,
            graphics: RecordingCommandList::new(QueueType::Graphics),
            compute: RecordingCommandList::new(QueueType::Compute),
        }
    }

    /// Move to the next device frame and reset the graph for declaration.
    pub fn next_frame(&mut self) {
        self.device.advance_frame();
        self.graph.clear();
        self.graphics.take_commands();
        self.compute.take_commands();
    }

    /// Compile and execute the declared frame.
    pub fn run(&mut self) {
        self.graph.compile().expect("compile succeeds");
        self.graph
            .execute(&mut self.graphics, &mut self.compute)
            .expect("execute succeeds");
    }

    /// Commands recorded between the `BeginEvent` of `pass` and its matching
    /// `EndEvent` on `list`.
    pub fn pass_commands<'a>(list: &'a RecordingCommandList, pass: &str) -> &'a [RecordedCommand] {
        let commands = list.commands();
        let Some(start) = list.event_position(pass) else {
            return &[];
        };
        let mut depth = 0;
        for (offset, command) in commands[start..].iter().enumerate() {
            match command {
                RecordedCommand::BeginEvent(_) => depth += 1,
                RecordedCommand::EndEvent => {
                    depth -= 1;
                    if depth == 0 {
                        return &commands[start..start + offset + 1];
                    }
                }
                _ => {}
            }
        }
        &commands[start..]
    }
}

pub fn color_desc(size: u32) -> TextureDescriptor {
    TextureDescriptor::new_2d(size, size, TextureFormat::Rgba8Unorm, TextureUsage::empty())
}

pub fn depth_desc(size: u32) -> TextureDescriptor {
    TextureDescriptor::new_2d(size, size, TextureFormat::Depth32Float, TextureUsage::empty())
}
