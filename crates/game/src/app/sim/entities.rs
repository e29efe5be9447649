#[derive(Debug, Clone, PartialEq)]
struct PlayerData {
    state: PlayerState,
    facing: Facing4,
    inventory: Vec<ItemKind>,
    detections: u32,
    /// Remaining seconds in a timed state (Hit recovery, Invisible duration).
    state_seconds: f32,
    climbing_ladder: Option<EntityId>,
    contact_cooldown: f32,
    animator: Animator,
}

impl PlayerData {
    fn new() -> Self {
        Self {
            state: PlayerState::Idle,
            facing: Facing4::Down,
            inventory: Vec::new(),
            detections: 0,
            state_seconds: 0.0,
            climbing_ladder: None,
            contact_cooldown: 0.0,
            animator: Animator::new(AnimClip::Idle),
        }
    }

    fn has_item(&self, item: ItemKind) -> bool {
        self.inventory.contains(&item)
    }

    fn remove_item(&mut self, item: ItemKind) -> bool {
        if let Some(index) = self.inventory.iter().position(|owned| *owned == item) {
            self.inventory.remove(index);
            return true;
        }
        false
    }

    fn begin_hit(&mut self, recover_seconds: f32) {
        self.state = PlayerState::Hit;
        self.state_seconds = recover_seconds;
        self.climbing_ladder = None;
        self.contact_cooldown = CONTACT_COOLDOWN_SECONDS;
    }

    fn begin_invisible(&mut self, duration_seconds: f32) {
        self.state = PlayerState::Invisible;
        self.state_seconds = duration_seconds;
        self.climbing_ladder = None;
    }

    fn begin_climb(&mut self, ladder: EntityId) {
        self.state = PlayerState::Climb;
        self.state_seconds = 0.0;
        self.climbing_ladder = Some(ladder);
    }

    fn end_timed_state_if_expired(&mut self, dt_seconds: f32) {
        self.contact_cooldown = (self.contact_cooldown - dt_seconds).max(0.0);
        if !matches!(self.state, PlayerState::Hit | PlayerState::Invisible) {
            return;
        }
        self.state_seconds -= dt_seconds;
        if self.state_seconds <= 0.0 {
            self.state = PlayerState::Idle;
            self.state_seconds = 0.0;
        }
    }

    fn clip(&self) -> AnimClip {
        match self.state {
            PlayerState::Idle => AnimClip::Idle,
            PlayerState::Run => AnimClip::Run,
            PlayerState::Hit => AnimClip::Hit,
            PlayerState::Climb => AnimClip::Climb,
            PlayerState::Invisible => AnimClip::Vanish,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct GuardData {
    state: GuardState,
    facing: FacingLr,
    patrol: Vec<Vec2>,
    patrol_index: usize,
    /// State-relative clock: elapsed orientation delay in Alert, seconds since
    /// the last re-detection in Chase, remaining stun in Stunned.
    state_seconds: f32,
    last_seen: Vec2,
    animator: Animator,
}

impl GuardData {
    fn new(patrol: Vec<Vec2>) -> Self {
        let last_seen = patrol.first().copied().unwrap_or_default();
        Self {
            state: GuardState::Patrol,
            facing: FacingLr::Right,
            patrol,
            patrol_index: 0,
            state_seconds: 0.0,
            last_seen,
            animator: Animator::new(AnimClip::Patrol),
        }
    }

    /// Stun wins over every other state; a guard that is already stunned
    /// ignores further hits and keeps its running timer.
    fn take_hit(&mut self, stun_seconds: f32) -> bool {
        if self.state == GuardState::Stunned {
            return false;
        }
        self.state = GuardState::Stunned;
        self.state_seconds = stun_seconds;
        true
    }

    fn begin_alert(&mut self, seen_at: Vec2, own_position: Vec2) {
        self.state = GuardState::Alert;
        self.state_seconds = 0.0;
        self.last_seen = seen_at;
        self.facing = FacingLr::from_dx(seen_at.x - own_position.x, self.facing);
    }

    fn nearest_patrol_index(&self, position: Vec2) -> usize {
        let mut best = 0usize;
        let mut best_distance_sq = f32::INFINITY;
        for (index, waypoint) in self.patrol.iter().enumerate() {
            let distance_sq = position.distance_sq_to(*waypoint);
            if distance_sq < best_distance_sq {
                best = index;
                best_distance_sq = distance_sq;
            }
        }
        best
    }

    fn clip(&self) -> AnimClip {
        match self.state {
            GuardState::Patrol => AnimClip::Patrol,
            GuardState::Alert => AnimClip::Alert,
            GuardState::Chase => AnimClip::Chase,
            GuardState::Stunned => AnimClip::Stunned,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct CameraData {
    facing: CameraFacing,
    alerted: bool,
    fov: [Vec2; 3],
    animator: Animator,
}

impl CameraData {
    fn new(position: Vec2, facing: CameraFacing, tuning: &engine::Tuning) -> Self {
        Self {
            facing,
            alerted: false,
            fov: camera_fov(position, facing, tuning),
            animator: Animator::new(AnimClip::Watch),
        }
    }

    fn set_pose(&mut self, position: Vec2, facing: CameraFacing, tuning: &engine::Tuning) {
        self.facing = facing;
        self.fov = camera_fov(position, facing, tuning);
    }
}

/// Triangular field of view with the camera at the apex. Recomputed only when
/// the pose changes; cameras never move during simulation.
fn camera_fov(position: Vec2, facing: CameraFacing, tuning: &engine::Tuning) -> [Vec2; 3] {
    let range = tuning.camera_view_range;
    let half_width = tuning.camera_view_half_width;
    match facing {
        CameraFacing::Left => [
            position,
            Vec2 {
                x: position.x - range,
                y: position.y + half_width,
            },
            Vec2 {
                x: position.x - range,
                y: position.y - half_width,
            },
        ],
        CameraFacing::Right => [
            position,
            Vec2 {
                x: position.x + range,
                y: position.y - half_width,
            },
            Vec2 {
                x: position.x + range,
                y: position.y + half_width,
            },
        ],
        CameraFacing::Down => [
            position,
            Vec2 {
                x: position.x - half_width,
                y: position.y - range,
            },
            Vec2 {
                x: position.x + half_width,
                y: position.y - range,
            },
        ],
    }
}

#[derive(Debug, Clone, PartialEq)]
struct DoorData {
    open: bool,
    locked: bool,
    puzzle: Option<Puzzle>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct LadderData {
    bottom_y: f32,
    top_y: f32,
}

#[derive(Debug, Clone, PartialEq)]
struct PictureData {
    text: String,
}

#[derive(Debug, Clone, PartialEq)]
struct InfoData {
    kind: InfoKind,
    text: String,
    objective: bool,
    read: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PickupData {
    item: ItemKind,
    taken: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum EntityKind {
    Player(PlayerData),
    Guard(GuardData),
    Camera(CameraData),
    Door(DoorData),
    Ladder(LadderData),
    Picture(PictureData),
    Info(InfoData),
    Pickup(PickupData),
}

impl EntityKind {
    fn tag(&self) -> &'static str {
        match self {
            EntityKind::Player(_) => "player",
            EntityKind::Guard(_) => "guard",
            EntityKind::Camera(_) => "camera",
            EntityKind::Door(_) => "door",
            EntityKind::Ladder(_) => "ladder",
            EntityKind::Picture(_) => "picture",
            EntityKind::Info(_) => "info",
            EntityKind::Pickup(_) => "pickup",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Entity {
    id: EntityId,
    position: Vec2,
    layer: RenderLayer,
    visible: bool,
    kind: EntityKind,
}

impl Entity {
    fn as_player(&self) -> Option<&PlayerData> {
        match &self.kind {
            EntityKind::Player(data) => Some(data),
            _ => None,
        }
    }

    fn as_player_mut(&mut self) -> Option<&mut PlayerData> {
        match &mut self.kind {
            EntityKind::Player(data) => Some(data),
            _ => None,
        }
    }

    fn as_guard(&self) -> Option<&GuardData> {
        match &self.kind {
            EntityKind::Guard(data) => Some(data),
            _ => None,
        }
    }

    fn as_guard_mut(&mut self) -> Option<&mut GuardData> {
        match &mut self.kind {
            EntityKind::Guard(data) => Some(data),
            _ => None,
        }
    }

    fn as_door(&self) -> Option<&DoorData> {
        match &self.kind {
            EntityKind::Door(data) => Some(data),
            _ => None,
        }
    }

    fn as_door_mut(&mut self) -> Option<&mut DoorData> {
        match &mut self.kind {
            EntityKind::Door(data) => Some(data),
            _ => None,
        }
    }

    /// Collision footprint. An open door has no footprint at all; a closed one
    /// blocks its full width.
    fn bounding_box(&self) -> Option<Rect> {
        let half_extent = match &self.kind {
            EntityKind::Player(_) => Vec2 {
                x: PLAYER_HALF_EXTENT,
                y: PLAYER_HALF_EXTENT,
            },
            EntityKind::Guard(_) => Vec2 {
                x: GUARD_HALF_EXTENT,
                y: GUARD_HALF_EXTENT,
            },
            EntityKind::Camera(_) => Vec2 {
                x: CAMERA_HALF_EXTENT,
                y: CAMERA_HALF_EXTENT,
            },
            EntityKind::Door(door) => {
                if door.open {
                    return None;
                }
                Vec2 {
                    x: DOOR_HALF_WIDTH,
                    y: DOOR_HALF_DEPTH_CLOSED,
                }
            }
            EntityKind::Ladder(ladder) => Vec2 {
                x: PROP_HALF_EXTENT,
                y: (ladder.top_y - ladder.bottom_y) * 0.5,
            },
            EntityKind::Picture(_) | EntityKind::Info(_) | EntityKind::Pickup(_) => Vec2 {
                x: PROP_HALF_EXTENT,
                y: PROP_HALF_EXTENT,
            },
        };
        Some(Rect::from_center_half_extent(self.position, half_extent))
    }
}
