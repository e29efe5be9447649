use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use image::ImageReader;
use pixels::{Error, Pixels, SurfaceTexture};
use tracing::warn;
use winit::window::Window;

use crate::app::{Camera2D, DrawList, HudSnapshot, Renderable};

use super::transform::world_to_screen;
use super::{Viewport, PIXELS_PER_WORLD, PLACEHOLDER_HALF_SIZE_PX};

const CLEAR_COLOR: [u8; 4] = [18, 20, 26, 255];
const ALERT_BORDER_COLOR: [u8; 4] = [200, 48, 40, 255];
const ALERT_BORDER_THICKNESS_PX: i32 = 4;

struct LoadedSprite {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
    asset_root: PathBuf,
    sprite_cache: HashMap<String, Option<LoadedSprite>>,
    warned_missing_sprite_keys: HashSet<String>,
}

impl Renderer {
    pub fn new(window: Arc<Window>, asset_root: PathBuf) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport {
                width: size.width,
                height: size.height,
            },
            asset_root,
            sprite_cache: HashMap::new(),
            warned_missing_sprite_keys: HashSet::new(),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport { width, height };
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub(crate) fn render_frame(
        &mut self,
        camera: &Camera2D,
        draw_list: &DrawList,
        hud: &HudSnapshot,
    ) -> Result<(), Error> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Ok(());
        }

        let viewport = self.viewport;
        let asset_root = self.asset_root.clone();
        let sprite_cache = &mut self.sprite_cache;
        let warned = &mut self.warned_missing_sprite_keys;
        let frame = self.pixels.frame_mut();

        fill_frame(frame, CLEAR_COLOR);

        for command in draw_list.commands() {
            let (cx, cy) = world_to_screen(command.center_world, camera, viewport, PIXELS_PER_WORLD);
            let half_w = ((command.half_extent_world.x * PIXELS_PER_WORLD).round() as i32)
                .max(PLACEHOLDER_HALF_SIZE_PX);
            let half_h = ((command.half_extent_world.y * PIXELS_PER_WORLD).round() as i32)
                .max(PLACEHOLDER_HALF_SIZE_PX);

            match &command.renderable {
                Renderable::Placeholder { rgba } => {
                    fill_rect(frame, viewport, cx - half_w, cy - half_h, cx + half_w, cy + half_h, *rgba);
                }
                Renderable::Sprite(key) => {
                    let sprite = load_sprite_cached(sprite_cache, warned, &asset_root, key);
                    match sprite {
                        Some(sprite) => blit_sprite_centered(frame, viewport, cx, cy, sprite),
                        None => fill_rect(
                            frame,
                            viewport,
                            cx - half_w,
                            cy - half_h,
                            cx + half_w,
                            cy + half_h,
                            [220, 220, 240, 255],
                        ),
                    }
                }
            }
        }

        if hud.alert_active {
            draw_border(frame, viewport, ALERT_BORDER_THICKNESS_PX, ALERT_BORDER_COLOR);
        }

        self.pixels.render()
    }
}

fn fill_frame(frame: &mut [u8], rgba: [u8; 4]) {
    for pixel in frame.chunks_exact_mut(4) {
        pixel.copy_from_slice(&rgba);
    }
}

fn fill_rect(
    frame: &mut [u8],
    viewport: Viewport,
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
    rgba: [u8; 4],
) {
    let x0 = left.max(0);
    let y0 = top.max(0);
    let x1 = right.min(viewport.width as i32 - 1);
    let y1 = bottom.min(viewport.height as i32 - 1);
    if x0 > x1 || y0 > y1 {
        return;
    }
    for y in y0..=y1 {
        let row = (y as usize * viewport.width as usize + x0 as usize) * 4;
        let end = (y as usize * viewport.width as usize + x1 as usize) * 4 + 4;
        if let Some(span) = frame.get_mut(row..end) {
            for pixel in span.chunks_exact_mut(4) {
                pixel.copy_from_slice(&rgba);
            }
        }
    }
}

fn draw_border(frame: &mut [u8], viewport: Viewport, thickness: i32, rgba: [u8; 4]) {
    let w = viewport.width as i32;
    let h = viewport.height as i32;
    fill_rect(frame, viewport, 0, 0, w - 1, thickness - 1, rgba);
    fill_rect(frame, viewport, 0, h - thickness, w - 1, h - 1, rgba);
    fill_rect(frame, viewport, 0, 0, thickness - 1, h - 1, rgba);
    fill_rect(frame, viewport, w - thickness, 0, w - 1, h - 1, rgba);
}

fn blit_sprite_centered(
    frame: &mut [u8],
    viewport: Viewport,
    cx: i32,
    cy: i32,
    sprite: &LoadedSprite,
) {
    let left = cx - sprite.width as i32 / 2;
    let top = cy - sprite.height as i32 / 2;
    for sy in 0..sprite.height as i32 {
        let dy = top + sy;
        if dy < 0 || dy >= viewport.height as i32 {
            continue;
        }
        for sx in 0..sprite.width as i32 {
            let dx = left + sx;
            if dx < 0 || dx >= viewport.width as i32 {
                continue;
            }
            let src = ((sy as u32 * sprite.width + sx as u32) * 4) as usize;
            let alpha = sprite.rgba[src + 3];
            if alpha == 0 {
                continue;
            }
            let dst = (dy as usize * viewport.width as usize + dx as usize) * 4;
            frame[dst..dst + 4].copy_from_slice(&sprite.rgba[src..src + 4]);
        }
    }
}

fn load_sprite_cached<'a>(
    cache: &'a mut HashMap<String, Option<LoadedSprite>>,
    warned: &mut HashSet<String>,
    asset_root: &std::path::Path,
    key: &str,
) -> Option<&'a LoadedSprite> {
    if !cache.contains_key(key) {
        let loaded = load_sprite_from_disk(asset_root, key);
        if loaded.is_none() && warned.insert(key.to_string()) {
            warn!(sprite_key = key, "sprite_missing_using_placeholder");
        }
        cache.insert(key.to_string(), loaded);
    }
    cache.get(key).and_then(Option::as_ref)
}

fn load_sprite_from_disk(asset_root: &std::path::Path, key: &str) -> Option<LoadedSprite> {
    let path = asset_root.join(key);
    let image = ImageReader::open(path).ok()?.decode().ok()?.into_rgba8();
    let (width, height) = image.dimensions();
    Some(LoadedSprite {
        width,
        height,
        rgba: image.into_raw(),
    })
}
