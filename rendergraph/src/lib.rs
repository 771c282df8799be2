//! # RedLilium Render Graph
//!
//! Per-frame render graph with transient resource aliasing.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`RenderGraph`] - Declares passes and their resource dependencies, culls
//!   unused work, and records barriers and cross-queue synchronization
//! - [`allocator::ResourceAllocator`] - Packs transient resources with disjoint
//!   lifetimes into shared heaps and keeps them alive across frames
//! - [`backend`] - The device and command list traits the graph drives, plus a
//!   recording Dummy backend (for testing)
//!
//! ## Example
//!
//! ```ignore
//! use redlilium_rendergraph::RenderGraph;
//!
//! let mut graph = RenderGraph::new(device)?;
//! loop {
//!     graph.clear();
//!     // add_pass(...), present(...)
//!     graph.compile()?;
//!     graph.execute(&mut graphics, &mut compute)?;
//! }
//! ```

pub mod allocator;
pub mod backend;
pub mod config;
pub mod error;
pub mod graph;
pub mod profiling;
pub mod types;

// Re-export main types for convenience
pub use backend::{BackendError, BackendResult, CommandList, GpuDevice, ALL_SUBRESOURCES};
pub use config::RenderGraphConfig;
pub use error::GraphError;
pub use graph::{
    LoadOp, PassBuilder, PassContext, PassType, RenderGraph, RgHandle, ShaderStages, StoreOp,
};
pub use types::{
    AccessFlags, BufferDescriptor, BufferUsage, ClearValue, Extent3d, TextureDescriptor,
    TextureFormat, TextureUsage,
};

#[cfg(feature = "dummy")]
pub use backend::dummy::{DummyDevice, RecordingCommandList};

/// Render graph library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the render graph subsystem.
pub fn init() {
    log::info!("RedLilium Render Graph v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_render_graph_creation() {
        let device = std::sync::Arc::new(DummyDevice::new());
        let graph = RenderGraph::new(device.clone()).unwrap();
        assert_eq!(graph.pass_count(), 0);
        assert_eq!(device.stats().fences_created, 2);
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_dummy_device() {
        let device = DummyDevice::new();
        assert_eq!(device.name(), "Dummy Backend");
    }
}
