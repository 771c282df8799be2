//! Common types and descriptors for render graph resources.
//!
//! This module contains access states, format enums, usage flags, and the
//! descriptor structs the allocator keys its reuse on.

mod access;
mod buffer;
mod common;
mod texture;
mod view;

pub use access::AccessFlags;
pub use buffer::{BufferDescriptor, BufferUsage};
pub use common::{ClearValue, Extent3d};
pub use texture::{TextureDescriptor, TextureFormat, TextureUsage};
pub use view::{ShaderResourceViewDescriptor, UnorderedAccessViewDescriptor, ViewDescriptor};
