//! Render graph configuration.

/// Configuration for a [`RenderGraph`](crate::RenderGraph) and its allocator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderGraphConfig {
    /// Frames an unused heap slot or pooled object survives before it is
    /// destroyed. Must cover the number of frames the GPU may lag behind.
    pub eviction_frames: u64,
    /// Heap sizes are rounded up to a multiple of this many bytes.
    pub heap_alignment: u64,
    /// Wrap every executed pass in a debug event named after it.
    pub enable_pass_events: bool,
}

impl Default for RenderGraphConfig {
    fn default() -> Self {
        Self {
            eviction_frames: 30,
            heap_alignment: 64 * 1024,
            enable_pass_events: true,
        }
    }
}

impl RenderGraphConfig {
    /// Set the idle eviction grace period in frames.
    pub fn with_eviction_frames(mut self, frames: u64) -> Self {
        self.eviction_frames = frames;
        self
    }

    /// Set the heap size granularity in bytes.
    ///
    /// # Panics
    ///
    /// Panics if `alignment` is not a power of two.
    pub fn with_heap_alignment(mut self, alignment: u64) -> Self {
        assert!(
            alignment.is_power_of_two(),
            "heap alignment {alignment} is not a power of two"
        );
        self.heap_alignment = alignment;
        self
    }

    /// Enable or disable per-pass debug events.
    pub fn with_pass_events(mut self, enabled: bool) -> Self {
        self.enable_pass_events = enabled;
        self
    }

    /// Round `size` up to the heap alignment.
    pub(crate) fn heap_size_for(&self, size: u64) -> u64 {
        let mask = self.heap_alignment - 1;
        (size.max(1) + mask) & !mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let config = RenderGraphConfig::default();
        assert_eq!(config.eviction_frames, 30);
        assert_eq!(config.heap_alignment, 65536);
        assert!(config.enable_pass_events);
    }

    #[rstest]
    #[case::tiny(1, 65536)]
    #[case::exact(65536, 65536)]
    #[case::one_over(65537, 131072)]
    #[case::large(3 * 1024 * 1024 + 5, 3 * 1024 * 1024 + 65536)]
    fn test_heap_size_rounding(#[case] size: u64, #[case] expected: u64) {
        assert_eq!(RenderGraphConfig::default().heap_size_for(size), expected);
    }

    #[test]
    #[should_panic(expected = "not a power of two")]
    fn test_rejects_odd_alignment() {
        let _ = RenderGraphConfig::default().with_heap_alignment(3000);
    }
}
