//! Window creation and the `pixels`-backed framebuffer surface the
//! orchestrator composites into.

pub mod screen;
pub mod window;

pub use screen::Screen;
pub use window::Window;
