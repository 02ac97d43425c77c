//! Screen-space coordinate types.
//!
//! Everything here is in physical pixels with a top-left origin; geometry
//! itself is authored directly in normalized device coordinates.

mod viewport;

pub use viewport::Viewport;
