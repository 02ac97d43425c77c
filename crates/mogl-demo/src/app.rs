use anyhow::{Context, Result};
use glam::Vec3;

use mogl_engine::coords::Viewport;
use mogl_engine::core::{App, AppControl, FrameCtx};
use mogl_engine::device::Gpu;
use mogl_engine::render::mesh::Mesh;
use mogl_engine::render::quad::{DrawStats, QuadRenderer};
use mogl_engine::render::transform::Transform;

/// Constants of the quad scene.
#[derive(Debug, Clone)]
pub struct QuadConfig {
    pub clear: wgpu::Color,
    pub transform: Transform,
}

impl Default for QuadConfig {
    fn default() -> Self {
        Self {
            clear: wgpu::Color::BLACK,
            // Up by half a unit, 45° about Z, half size.
            transform: Transform::new(Vec3::new(0.0, 0.5, 0.0), 45.0, Vec3::splat(0.5)),
        }
    }
}

/// Draws the colored quad once per frame.
pub struct QuadApp {
    config: QuadConfig,
    renderer: Option<QuadRenderer>,
    viewport: Viewport,
    last_draw: DrawStats,
}

impl QuadApp {
    pub fn new(config: QuadConfig) -> Self {
        Self {
            config,
            renderer: None,
            viewport: Viewport::default(),
            last_draw: DrawStats::default(),
        }
    }

    /// Viewport most recently reported by the runtime.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }
}

impl App for QuadApp {
    fn on_start(&mut self, gpu: &Gpu<'_>) -> Result<()> {
        let renderer = QuadRenderer::new(gpu, Mesh::quad()).context("failed to set up the quad")?;
        self.renderer = Some(renderer);
        Ok(())
    }

    fn on_resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let Some(renderer) = self.renderer.as_ref() else {
            return AppControl::Continue;
        };

        // Recomputed every frame from the constant factors.
        let transform = self.config.transform;
        let mut stats = DrawStats::default();

        let control = ctx.render(self.config.clear, |rctx, target| {
            stats = renderer.render(rctx, target, &transform);
        });

        if stats != self.last_draw {
            log::debug!(
                "frame {}: {} draw call(s), {} indices",
                ctx.frame_index,
                stats.draw_calls,
                stats.indices
            );
            self.last_draw = stats;
        }

        control
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalSize;

    #[test]
    fn default_scene_clears_to_opaque_black() {
        let config = QuadConfig::default();
        assert_eq!(config.clear, wgpu::Color::BLACK);
        assert_eq!(config.clear.a, 1.0);
    }

    #[test]
    fn default_scene_transform() {
        let t = QuadConfig::default().transform;
        assert_eq!(t.translation, Vec3::new(0.0, 0.5, 0.0));
        assert_eq!(t.rotation_z_degrees, 45.0);
        assert_eq!(t.scale, Vec3::splat(0.5));
    }

    #[test]
    fn resize_updates_reported_viewport() {
        let mut app = QuadApp::new(QuadConfig::default());
        assert!(!app.viewport().is_drawable());

        app.on_resize(Viewport::from_size(PhysicalSize::new(800, 600)));
        assert_eq!(app.viewport(), Viewport::new(0, 0, 800, 600));

        app.on_resize(Viewport::from_size(PhysicalSize::new(1280, 720)));
        assert_eq!(app.viewport(), Viewport::new(0, 0, 1280, 720));
    }
}
