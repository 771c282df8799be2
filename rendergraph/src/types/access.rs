//! Resource access states.
//!
//! An [`AccessFlags`] value describes how a pass touches a resource. It doubles
//! as the barrier state: a barrier transitions a subresource from one set of
//! flags to another.

use bitflags::bitflags;

bitflags! {
    /// Access state of a texture or buffer subresource.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessFlags: u32 {
        /// Presented to a swapchain or external consumer.
        const PRESENT = 1 << 0;
        /// Bound as a color render target.
        const RTV = 1 << 1;
        /// Bound as a writable depth/stencil target.
        const DSV = 1 << 2;
        /// Bound as a read-only depth/stencil target.
        const DSV_READ_ONLY = 1 << 3;
        /// Sampled or read in a vertex shader.
        const VERTEX_SHADER_SRV = 1 << 4;
        /// Sampled or read in a pixel shader.
        const PIXEL_SHADER_SRV = 1 << 5;
        /// Sampled or read in a compute shader.
        const COMPUTE_SRV = 1 << 6;
        /// Written from a vertex shader.
        const VERTEX_SHADER_UAV = 1 << 7;
        /// Written from a pixel shader.
        const PIXEL_SHADER_UAV = 1 << 8;
        /// Written from a compute shader.
        const COMPUTE_UAV = 1 << 9;
        /// Cleared through an unordered access view.
        const CLEAR_UAV = 1 << 10;
        /// Destination of a copy.
        const COPY_DST = 1 << 11;
        /// Source of a copy.
        const COPY_SRC = 1 << 12;
        /// Read as a variable-rate shading image.
        const SHADING_RATE = 1 << 13;
        /// Read as an index buffer.
        const INDEX_BUFFER = 1 << 14;
        /// Read as indirect draw/dispatch arguments.
        const INDIRECT_ARGS = 1 << 15;
        /// Read as an acceleration structure.
        const AS_READ = 1 << 16;
        /// Written as an acceleration structure.
        const AS_WRITE = 1 << 17;
        /// Contents are undefined and may be discarded.
        const DISCARD = 1 << 18;

        /// Any shader-resource read.
        const MASK_SRV = Self::VERTEX_SHADER_SRV.bits()
            | Self::PIXEL_SHADER_SRV.bits()
            | Self::COMPUTE_SRV.bits();
        /// Any unordered-access write.
        const MASK_UAV = Self::VERTEX_SHADER_UAV.bits()
            | Self::PIXEL_SHADER_UAV.bits()
            | Self::COMPUTE_UAV.bits();
        /// Any depth/stencil binding.
        const MASK_DSV = Self::DSV.bits() | Self::DSV_READ_ONLY.bits();
        /// Any copy access.
        const MASK_COPY = Self::COPY_DST.bits() | Self::COPY_SRC.bits();
    }
}

impl Default for AccessFlags {
    fn default() -> Self {
        Self::empty()
    }
}

impl AccessFlags {
    /// Accesses a builder `read` may request.
    pub const READ_CAPABLE: Self = Self::MASK_SRV
        .union(Self::INDIRECT_ARGS)
        .union(Self::COPY_SRC)
        .union(Self::INDEX_BUFFER)
        .union(Self::SHADING_RATE)
        .union(Self::AS_READ);

    /// Accesses a builder `write` may request.
    pub const WRITE_CAPABLE: Self = Self::MASK_UAV
        .union(Self::CLEAR_UAV)
        .union(Self::COPY_DST)
        .union(Self::AS_WRITE);

    /// Returns true if every flag describes a read.
    ///
    /// An empty set is not read-only.
    pub fn is_read_only(self) -> bool {
        !self.is_empty()
            && (Self::READ_CAPABLE | Self::DSV_READ_ONLY | Self::PRESENT).contains(self)
    }

    /// Returns true if any flag allows the GPU to modify the resource.
    pub fn is_write(self) -> bool {
        self.intersects(Self::WRITE_CAPABLE | Self::RTV | Self::DSV)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::pixel_srv(AccessFlags::PIXEL_SHADER_SRV, true)]
    #[case::merged_reads(AccessFlags::COMPUTE_SRV | AccessFlags::INDIRECT_ARGS, true)]
    #[case::depth_read(AccessFlags::DSV_READ_ONLY, true)]
    #[case::uav(AccessFlags::COMPUTE_UAV, false)]
    #[case::read_and_write(AccessFlags::COPY_SRC | AccessFlags::COPY_DST, false)]
    #[case::rtv(AccessFlags::RTV, false)]
    #[case::empty(AccessFlags::empty(), false)]
    fn test_is_read_only(#[case] flags: AccessFlags, #[case] expected: bool) {
        assert_eq!(flags.is_read_only(), expected);
    }

    #[test]
    fn test_is_write() {
        assert!(AccessFlags::RTV.is_write());
        assert!(AccessFlags::DSV.is_write());
        assert!(AccessFlags::CLEAR_UAV.is_write());
        assert!(!AccessFlags::DSV_READ_ONLY.is_write());
        assert!(!AccessFlags::MASK_SRV.is_write());
    }

    #[test]
    fn test_capability_masks_are_disjoint() {
        assert!(!AccessFlags::READ_CAPABLE.intersects(AccessFlags::WRITE_CAPABLE));
    }
}
