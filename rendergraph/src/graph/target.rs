//! Attachment load/store policies for graphics passes.
//!
//! Color and depth attachments are declared through
//! [`PassBuilder::write_color`](super::PassBuilder::write_color) and friends;
//! the types here carry the per-attachment policy on the attachment edge until
//! the pass begins its render pass.

use crate::types::ClearValue;

/// Maximum number of simultaneously bound color attachments.
pub const MAX_COLOR_ATTACHMENTS: usize = 8;

/// Operation to perform when loading an attachment at the start of a render pass.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LoadOp {
    /// Clear the attachment with a specified value.
    Clear(ClearValue),
    /// Load the existing contents of the attachment.
    #[default]
    Load,
    /// Don't care about the existing contents (may be undefined).
    DontCare,
}

impl LoadOp {
    /// Create a clear operation with a color value.
    pub fn clear_color(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self::Clear(ClearValue::color(r, g, b, a))
    }

    /// Create a clear operation with a depth value.
    pub fn clear_depth(depth: f32) -> Self {
        Self::Clear(ClearValue::depth(depth))
    }

    /// Create a clear operation with a stencil value.
    pub fn clear_stencil(stencil: u32) -> Self {
        Self::Clear(ClearValue::Stencil(stencil))
    }
}

/// Operation to perform when storing an attachment at the end of a render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StoreOp {
    /// Store the attachment contents for later use.
    #[default]
    Store,
    /// Don't care about the contents after the pass (may be discarded).
    DontCare,
}

/// Color attachment policy carried by a color attachment edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorAttachment {
    /// Attachment slot, `0..MAX_COLOR_ATTACHMENTS`.
    pub slot: usize,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
}

/// Depth/stencil attachment policy carried by a depth attachment edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthStencilAttachment {
    pub depth_load_op: LoadOp,
    pub stencil_load_op: LoadOp,
    /// Bound with depth writes disabled.
    pub read_only: bool,
}

impl DepthStencilAttachment {
    /// Store policy for both aspects: read-only bindings have nothing to store.
    pub fn store_op(&self) -> StoreOp {
        if self.read_only {
            StoreOp::DontCare
        } else {
            StoreOp::Store
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_op_clear_values() {
        assert_eq!(
            LoadOp::clear_color(0.0, 0.5, 1.0, 1.0),
            LoadOp::Clear(ClearValue::color(0.0, 0.5, 1.0, 1.0))
        );
        assert_eq!(LoadOp::clear_depth(1.0), LoadOp::Clear(ClearValue::Depth(1.0)));
        assert_eq!(LoadOp::default(), LoadOp::Load);
    }

    #[test]
    fn test_read_only_depth_discards_store() {
        let attachment = DepthStencilAttachment {
            depth_load_op: LoadOp::Load,
            stencil_load_op: LoadOp::Load,
            read_only: true,
        };
        assert_eq!(attachment.store_op(), StoreOp::DontCare);

        let attachment = DepthStencilAttachment {
            read_only: false,
            ..attachment
        };
        assert_eq!(attachment.store_op(), StoreOp::Store);
    }
}
