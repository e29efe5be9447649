mod renderer;
mod transform;

pub use renderer::Renderer;
pub use transform::{world_to_screen, world_to_screen_px, Viewport};

pub const PIXELS_PER_WORLD: f32 = 32.0;
pub const PLACEHOLDER_HALF_SIZE_PX: i32 = 5;
