//! GPU rendering subsystem.
//!
//! Each renderer owns its GPU resources (pipeline, buffers, bind groups) and
//! records into a [`RenderTarget`] whose attachments were cleared by the frame.
//!
//! Convention:
//! - geometry is authored in normalized device coordinates
//! - one uniform transform per draw, column-major `mat4x4<f32>`

mod ctx;
pub mod mesh;
pub mod quad;
pub mod shader;
pub mod transform;

pub use ctx::{RenderCtx, RenderTarget};
