//! MOGL engine crate.
//!
//! Window bootstrap, GPU context and the small rendering layer used to draw a
//! single colored mesh with a uniform transform.

pub mod coords;
pub mod core;
pub mod device;
pub mod logging;
pub mod render;
pub mod window;
