//! Handles to resource versions.

use std::fmt;

/// Handle to one version of a logical resource in a [`RenderGraph`](super::RenderGraph).
///
/// `index` names the logical resource and `node` the version node in the
/// graph. Writes return a handle with the same `index` and a fresh `node`, so a
/// handle captured before a write keeps referring to the older contents.
///
/// Handles are only valid within the frame that created them.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RgHandle {
    pub(crate) index: u16,
    pub(crate) node: u16,
}

impl RgHandle {
    /// Sentinel value of either field for an unset handle.
    pub const SENTINEL: u16 = u16::MAX;

    /// An unset handle.
    pub const INVALID: Self = Self {
        index: Self::SENTINEL,
        node: Self::SENTINEL,
    };

    pub(crate) fn new(index: usize, node: usize) -> Self {
        assert!(
            index < Self::SENTINEL as usize && node < Self::SENTINEL as usize,
            "render graph exceeded {} resources or nodes",
            Self::SENTINEL
        );
        Self {
            index: index as u16,
            node: node as u16,
        }
    }

    /// Returns true if neither field holds the sentinel.
    pub fn is_valid(self) -> bool {
        self.index != Self::SENTINEL && self.node != Self::SENTINEL
    }

    /// Logical resource index.
    pub fn index(self) -> u16 {
        self.index
    }

    /// Version node index.
    pub fn node(self) -> u16 {
        self.node
    }

    /// Packs the handle into 32 bits, resource index in the high half.
    pub fn to_bits(self) -> u32 {
        (u32::from(self.index) << 16) | u32::from(self.node)
    }

    /// Inverse of [`to_bits`](Self::to_bits).
    pub fn from_bits(bits: u32) -> Self {
        Self {
            index: (bits >> 16) as u16,
            node: bits as u16,
        }
    }
}

impl Default for RgHandle {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Debug for RgHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "RgHandle({}v{})", self.index, self.node)
        } else {
            write!(f, "RgHandle(invalid)")
        }
    }
}

static_assertions::assert_eq_size!(RgHandle, u32);
