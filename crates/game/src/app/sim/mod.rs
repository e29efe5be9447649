use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use engine::{
    Camera2D, DrawCommand, DrawList, HudSnapshot, InputAction, InputSnapshot, LevelDatabase,
    LevelDef, Rect, RenderLayer, Renderable, Scene, SceneCommand, SoundEvent, Vec2,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const SAVE_VERSION: u32 = 1;
const SAVE_FILE: &str = "skulk.save.json";

const PLAYER_HALF_EXTENT: f32 = 0.35;
const GUARD_HALF_EXTENT: f32 = 0.35;
const CAMERA_HALF_EXTENT: f32 = 0.25;
const DOOR_HALF_WIDTH: f32 = 0.6;
const DOOR_HALF_DEPTH_CLOSED: f32 = 0.15;
const PROP_HALF_EXTENT: f32 = 0.3;

const DOOR_INTERACT_RANGE: f32 = 1.2;
const LADDER_INTERACT_RANGE: f32 = 0.8;
const PICTURE_INTERACT_RANGE: f32 = 1.4;
const INFO_INTERACT_RANGE: f32 = 1.2;
const PICKUP_INTERACT_RANGE: f32 = 1.0;

const GUARD_CONTACT_RANGE: f32 = 0.6;
const CONTACT_COOLDOWN_SECONDS: f32 = 1.5;
const FOOTSTEP_STRIDE_WORLD: f32 = 1.2;

const ANIM_FRAME_SECONDS: f32 = 0.15;
const CAMERA_ANIM_FRAMES: u32 = 3;
const CAMERA_ANIM_FRAME_SECONDS: f32 = 0.4;

const LOCKPICK_SWEEP_SECONDS: f32 = 1.6;
const CODE_DIGIT_COUNT: usize = 4;

include!("types.rs");
include!("util.rs");
include!("entities.rs");
include!("puzzle.rs");
include!("world.rs");
include!("snapshot.rs");
include!("scene_impl.rs");

pub(crate) fn build_scene(context: SimContext) -> StealthScene {
    StealthScene::new(context)
}

#[cfg(test)]
mod tests {
    include!("tests.rs");
}
