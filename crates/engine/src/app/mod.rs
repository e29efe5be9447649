mod input;
mod loop_runner;
mod metrics;
mod rendering;
mod scene;

pub use input::InputAction;
pub use loop_runner::{run_app, AppError, LoopConfig};
pub use metrics::LoopMetricsSnapshot;
pub use rendering::{
    world_to_screen, world_to_screen_px, Renderer, Viewport, PIXELS_PER_WORLD,
    PLACEHOLDER_HALF_SIZE_PX,
};
pub use scene::{
    Camera2D, DrawCommand, DrawList, HudSnapshot, InputSnapshot, Rect, RenderLayer, Renderable,
    Scene, SceneCommand, SoundEvent, Vec2,
};
