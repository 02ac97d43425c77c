use anyhow::Result;
use winit::event::WindowEvent;

use crate::coords::Viewport;
use crate::device::Gpu;

use super::ctx::FrameCtx;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract driven by the runtime.
///
/// All callbacks run on the event-loop thread, in this order: `on_start` once
/// the GPU context exists, then any mix of `on_window_event` / `on_resize` /
/// `on_frame` until the loop ends.
pub trait App {
    /// Called once after the window and GPU context are created.
    ///
    /// Returning an error aborts startup; the runtime reports it from
    /// `Runtime::run`.
    fn on_start(&mut self, gpu: &Gpu<'_>) -> Result<()> {
        let _ = gpu;
        Ok(())
    }

    /// Called after the surface has been resized to `viewport`.
    fn on_resize(&mut self, viewport: Viewport) {
        let _ = viewport;
    }

    /// Called for every window event before the runtime handles it.
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let _ = event;
        AppControl::Continue
    }

    /// Called once per frame.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;
}
