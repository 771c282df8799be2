//! Common types shared by descriptors and attachments.

/// 3D extent (width, height, depth or array layers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent3d {
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Depth in texels, or array layer count for 2D textures.
    pub depth: u32,
}

impl Extent3d {
    /// Create a new 3D extent.
    pub const fn new_3d(width: u32, height: u32, depth: u32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    /// Create a new 2D extent (depth = 1).
    pub const fn new_2d(width: u32, height: u32) -> Self {
        Self::new_3d(width, height, 1)
    }
}

impl Default for Extent3d {
    fn default() -> Self {
        Self::new_2d(1, 1)
    }
}

/// Clear value for render targets.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ClearValue {
    /// No clear value.
    #[default]
    None,
    /// Clear color (RGBA).
    Color { r: f32, g: f32, b: f32, a: f32 },
    /// Clear depth value.
    Depth(f32),
    /// Clear stencil value.
    Stencil(u32),
}

impl ClearValue {
    /// Create a color clear value.
    pub fn color(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self::Color { r, g, b, a }
    }

    /// Create a depth clear value.
    pub fn depth(depth: f32) -> Self {
        Self::Depth(depth)
    }

    /// Returns the color components, or zero for non-color values.
    pub fn as_color(&self) -> [f32; 4] {
        match *self {
            Self::Color { r, g, b, a } => [r, g, b, a],
            _ => [0.0; 4],
        }
    }
}
