use std::collections::HashMap;

use crate::app::{Rect, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LevelId(pub u32);

/// Detection geometry, speeds and durations are level data, never compiled-in
/// constants. Every field can be overridden from the `<tuning>` element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tuning {
    pub player_speed: f32,
    pub climb_speed: f32,
    pub patrol_speed: f32,
    pub chase_speed: f32,
    pub guard_view_range: f32,
    pub guard_view_half_angle_degrees: f32,
    pub camera_view_range: f32,
    pub camera_view_half_width: f32,
    pub alert_seconds: f32,
    pub chase_break_distance: f32,
    pub chase_timeout_seconds: f32,
    pub stun_seconds: f32,
    pub alert_radius: f32,
    pub global_alert_seconds: f32,
    pub invisibility_seconds: f32,
    pub hit_recover_seconds: f32,
    pub melee_range: f32,
    pub ranged_range: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            player_speed: 4.0,
            climb_speed: 2.5,
            patrol_speed: 1.5,
            chase_speed: 3.0,
            guard_view_range: 5.0,
            guard_view_half_angle_degrees: 40.0,
            camera_view_range: 6.0,
            camera_view_half_width: 2.5,
            alert_seconds: 0.6,
            chase_break_distance: 8.0,
            chase_timeout_seconds: 4.0,
            stun_seconds: 5.0,
            alert_radius: 10.0,
            global_alert_seconds: 6.0,
            invisibility_seconds: 5.0,
            hit_recover_seconds: 0.8,
            melee_range: 1.0,
            ranged_range: 6.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GuardDef {
    pub position: Vec2,
    pub patrol: Vec<Vec2>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraFacingDef {
    Left,
    Right,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraDef {
    pub position: Vec2,
    pub facing: CameraFacingDef,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PuzzleDef {
    CodeLock { code: String },
    LaserLock { wire_count: u32, live_wire: u32 },
    LockPick { window_start: f32, window_width: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DoorDef {
    pub position: Vec2,
    pub open: bool,
    pub locked: bool,
    pub puzzle: Option<PuzzleDef>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LadderDef {
    pub x: f32,
    pub bottom_y: f32,
    pub top_y: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PictureDef {
    pub position: Vec2,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoKindDef {
    Note,
    Computer,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InfoDef {
    pub position: Vec2,
    pub kind: InfoKindDef,
    pub text: String,
    pub objective: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKindDef {
    Cloak,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickupDef {
    pub position: Vec2,
    pub item: ItemKindDef,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevelDef {
    pub id: LevelId,
    pub name: String,
    pub label: String,
    pub bounds: Rect,
    pub exit: Rect,
    pub player_spawn: Vec2,
    pub detection_limit: u32,
    pub tuning: Tuning,
    pub walls: Vec<Rect>,
    pub guards: Vec<GuardDef>,
    pub cameras: Vec<CameraDef>,
    pub doors: Vec<DoorDef>,
    pub ladders: Vec<LadderDef>,
    pub pictures: Vec<PictureDef>,
    pub infos: Vec<InfoDef>,
    pub pickups: Vec<PickupDef>,
}

impl LevelDef {
    /// Built-in safe default so the game stays bootable when assets/levels is
    /// missing or fails to compile.
    pub fn fallback() -> Self {
        Self {
            id: LevelId(0),
            name: "fallback".to_string(),
            label: "Fallback Floor".to_string(),
            bounds: Rect {
                min: Vec2 { x: -12.0, y: -8.0 },
                max: Vec2 { x: 12.0, y: 8.0 },
            },
            exit: Rect {
                min: Vec2 { x: -12.0, y: -8.0 },
                max: Vec2 { x: -10.5, y: -6.0 },
            },
            player_spawn: Vec2 { x: -10.0, y: -6.0 },
            detection_limit: 3,
            tuning: Tuning::default(),
            walls: vec![Rect {
                min: Vec2 { x: -0.5, y: -8.0 },
                max: Vec2 { x: 0.5, y: 2.0 },
            }],
            guards: vec![GuardDef {
                position: Vec2 { x: 2.0, y: 4.0 },
                patrol: vec![Vec2 { x: 2.0, y: 4.0 }, Vec2 { x: 8.0, y: 4.0 }],
            }],
            cameras: vec![CameraDef {
                position: Vec2 { x: 11.0, y: 7.0 },
                facing: CameraFacingDef::Down,
            }],
            doors: vec![
                DoorDef {
                    position: Vec2 { x: 0.0, y: 3.0 },
                    open: false,
                    locked: false,
                    puzzle: None,
                },
                DoorDef {
                    position: Vec2 { x: 6.0, y: -3.0 },
                    open: false,
                    locked: true,
                    puzzle: Some(PuzzleDef::CodeLock {
                        code: "1234".to_string(),
                    }),
                },
            ],
            ladders: vec![LadderDef {
                x: 10.0,
                bottom_y: -6.0,
                top_y: 0.0,
            }],
            pictures: vec![PictureDef {
                position: Vec2 { x: 3.0, y: 6.0 },
                text: "The frame hangs crooked. 1-2-3-4 is scratched into the backing.".to_string(),
            }],
            infos: vec![InfoDef {
                position: Vec2 { x: 9.0, y: 6.0 },
                kind: InfoKindDef::Computer,
                text: "LEDGER.XLS copied.".to_string(),
                objective: true,
            }],
            pickups: vec![PickupDef {
                position: Vec2 { x: -6.0, y: 4.0 },
                item: ItemKindDef::Cloak,
            }],
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct LevelDatabase {
    levels: Vec<LevelDef>,
    level_ids_by_name: HashMap<String, LevelId>,
}

impl LevelDatabase {
    pub(crate) fn from_levels(mut levels: Vec<LevelDef>) -> Self {
        let mut level_ids_by_name = HashMap::with_capacity(levels.len());
        for (idx, level) in levels.iter_mut().enumerate() {
            let id = LevelId(idx as u32);
            level.id = id;
            level_ids_by_name.insert(level.name.clone(), id);
        }
        Self {
            levels,
            level_ids_by_name,
        }
    }

    pub fn level_id_by_name(&self, name: &str) -> Option<LevelId> {
        self.level_ids_by_name.get(name).copied()
    }

    pub fn level(&self, id: LevelId) -> Option<&LevelDef> {
        self.levels.get(id.0 as usize)
    }

    pub fn level_by_name(&self, name: &str) -> Option<&LevelDef> {
        self.level_id_by_name(name).and_then(|id| self.level(id))
    }

    pub fn levels(&self) -> &[LevelDef] {
        &self.levels
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}
