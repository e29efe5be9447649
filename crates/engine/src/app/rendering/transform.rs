use crate::app::{Camera2D, Vec2};

#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

pub fn world_to_screen(
    world: Vec2,
    camera: &Camera2D,
    viewport: Viewport,
    pixels_per_world: f32,
) -> (i32, i32) {
    let x = (world.x - camera.position.x) * pixels_per_world + viewport.width as f32 * 0.5;
    let y = viewport.height as f32 * 0.5 - (world.y - camera.position.y) * pixels_per_world;
    (x.round() as i32, y.round() as i32)
}

pub fn world_to_screen_px(camera: &Camera2D, window_size: (u32, u32), world: Vec2) -> (i32, i32) {
    world_to_screen(
        world,
        camera,
        Viewport {
            width: window_size.0,
            height: window_size.1,
        },
        super::PIXELS_PER_WORLD,
    )
}
