use winit::dpi::PhysicalSize;

/// Rasterization rectangle in physical pixels.
///
/// The engine always renders into the whole client area, so the origin is
/// `(0, 0)` and the extent tracks the window size.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[inline]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Viewport covering a whole drawable of `size`.
    #[inline]
    pub const fn from_size(size: PhysicalSize<u32>) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    /// `false` for a zero-area viewport (e.g. a minimized window).
    #[inline]
    pub fn is_drawable(self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Applies this viewport to a render pass with the full `[0, 1]` depth range.
    pub fn apply(self, rpass: &mut wgpu::RenderPass<'_>) {
        rpass.set_viewport(
            self.x as f32,
            self.y as f32,
            self.width as f32,
            self.height as f32,
            0.0,
            1.0,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_size_covers_the_client_area() {
        let vp = Viewport::from_size(PhysicalSize::new(800, 600));
        assert_eq!(vp, Viewport::new(0, 0, 800, 600));
    }

    #[test]
    fn resized_viewport_tracks_new_size() {
        let before = Viewport::from_size(PhysicalSize::new(800, 600));
        let after = Viewport::from_size(PhysicalSize::new(1024, 300));
        assert_ne!(before, after);
        assert_eq!((after.width, after.height), (1024, 300));
    }

    #[test]
    fn zero_area_is_not_drawable() {
        assert!(!Viewport::from_size(PhysicalSize::new(0, 0)).is_drawable());
        assert!(!Viewport::from_size(PhysicalSize::new(640, 0)).is_drawable());
        assert!(Viewport::from_size(PhysicalSize::new(1, 1)).is_drawable());
    }
}
