//! View descriptors used for shader resource and unordered access views.

/// Descriptor for a shader resource view.
///
/// Texture views address a mip range and array slice; buffer views address an
/// element range. Fields that do not apply to the viewed resource are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ShaderResourceViewDescriptor {
    /// First mip level (textures).
    pub base_mip: u32,
    /// Number of mip levels, 0 for all remaining.
    pub mip_count: u32,
    /// Array slice (textures).
    pub array_slice: u32,
    /// First element (buffers).
    pub offset: u64,
    /// Number of bytes, 0 for the whole buffer.
    pub size: u64,
}

impl ShaderResourceViewDescriptor {
    /// View of a single texture mip.
    pub fn texture_mip(mip: u32, slice: u32) -> Self {
        Self {
            base_mip: mip,
            mip_count: 1,
            array_slice: slice,
            ..Self::default()
        }
    }
}

/// Descriptor for an unordered access view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct UnorderedAccessViewDescriptor {
    /// Mip level (textures).
    pub mip: u32,
    /// Array slice (textures).
    pub array_slice: u32,
    /// First byte (buffers).
    pub offset: u64,
    /// Number of bytes, 0 for the whole buffer.
    pub size: u64,
}

/// Either kind of view descriptor, used as the view cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewDescriptor {
    /// Shader resource view.
    ShaderResource(ShaderResourceViewDescriptor),
    /// Unordered access view.
    UnorderedAccess(UnorderedAccessViewDescriptor),
}
