#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct SavedVec2 {
    x: f32,
    y: f32,
}

impl SavedVec2 {
    fn from_vec2(value: Vec2) -> Self {
        Self {
            x: value.x,
            y: value.y,
        }
    }

    fn to_vec2(self) -> Vec2 {
        Vec2 {
            x: self.x,
            y: self.y,
        }
    }

    fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum SavedFacing4 {
    Up,
    Down,
    Left,
    Right,
}

impl SavedFacing4 {
    fn from_runtime(value: Facing4) -> Self {
        match value {
            Facing4::Up => Self::Up,
            Facing4::Down => Self::Down,
            Facing4::Left => Self::Left,
            Facing4::Right => Self::Right,
        }
    }

    fn to_runtime(self) -> Facing4 {
        match self {
            Self::Up => Facing4::Up,
            Self::Down => Facing4::Down,
            Self::Left => Facing4::Left,
            Self::Right => Facing4::Right,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum SavedFacingLr {
    Left,
    Right,
}

impl SavedFacingLr {
    fn from_runtime(value: FacingLr) -> Self {
        match value {
            FacingLr::Left => Self::Left,
            FacingLr::Right => Self::Right,
        }
    }

    fn to_runtime(self) -> FacingLr {
        match self {
            Self::Left => FacingLr::Left,
            Self::Right => FacingLr::Right,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum SavedCameraFacing {
    Left,
    Right,
    Down,
}

impl SavedCameraFacing {
    fn from_runtime(value: CameraFacing) -> Self {
        match value {
            CameraFacing::Left => Self::Left,
            CameraFacing::Right => Self::Right,
            CameraFacing::Down => Self::Down,
        }
    }

    fn to_runtime(self) -> CameraFacing {
        match self {
            Self::Left => CameraFacing::Left,
            Self::Right => CameraFacing::Right,
            Self::Down => CameraFacing::Down,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum SavedPlayerState {
    Idle,
    Run,
    Hit,
    Climb,
    Invisible,
}

impl SavedPlayerState {
    fn from_runtime(value: PlayerState) -> Self {
        match value {
            PlayerState::Idle => Self::Idle,
            PlayerState::Run => Self::Run,
            PlayerState::Hit => Self::Hit,
            PlayerState::Climb => Self::Climb,
            PlayerState::Invisible => Self::Invisible,
        }
    }

    fn to_runtime(self) -> PlayerState {
        match self {
            Self::Idle => PlayerState::Idle,
            Self::Run => PlayerState::Run,
            Self::Hit => PlayerState::Hit,
            Self::Climb => PlayerState::Climb,
            Self::Invisible => PlayerState::Invisible,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum SavedGuardState {
    Patrol,
    Alert,
    Chase,
    Stunned,
}

impl SavedGuardState {
    fn from_runtime(value: GuardState) -> Self {
        match value {
            GuardState::Patrol => Self::Patrol,
            GuardState::Alert => Self::Alert,
            GuardState::Chase => Self::Chase,
            GuardState::Stunned => Self::Stunned,
        }
    }

    fn to_runtime(self) -> GuardState {
        match self {
            Self::Patrol => GuardState::Patrol,
            Self::Alert => GuardState::Alert,
            Self::Chase => GuardState::Chase,
            Self::Stunned => GuardState::Stunned,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum SavedItemKind {
    Cloak,
    Evidence,
}

impl SavedItemKind {
    fn from_runtime(value: ItemKind) -> Self {
        match value {
            ItemKind::Cloak => Self::Cloak,
            ItemKind::Evidence => Self::Evidence,
        }
    }

    fn to_runtime(self) -> ItemKind {
        match self {
            Self::Cloak => ItemKind::Cloak,
            Self::Evidence => ItemKind::Evidence,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum SavedAnimClip {
    Idle,
    Run,
    Hit,
    Climb,
    Vanish,
    Patrol,
    Alert,
    Chase,
    Stunned,
    Watch,
}

impl SavedAnimClip {
    fn from_runtime(value: AnimClip) -> Self {
        match value {
            AnimClip::Idle => Self::Idle,
            AnimClip::Run => Self::Run,
            AnimClip::Hit => Self::Hit,
            AnimClip::Climb => Self::Climb,
            AnimClip::Vanish => Self::Vanish,
            AnimClip::Patrol => Self::Patrol,
            AnimClip::Alert => Self::Alert,
            AnimClip::Chase => Self::Chase,
            AnimClip::Stunned => Self::Stunned,
            AnimClip::Watch => Self::Watch,
        }
    }

    fn to_runtime(self) -> AnimClip {
        match self {
            Self::Idle => AnimClip::Idle,
            Self::Run => AnimClip::Run,
            Self::Hit => AnimClip::Hit,
            Self::Climb => AnimClip::Climb,
            Self::Vanish => AnimClip::Vanish,
            Self::Patrol => AnimClip::Patrol,
            Self::Alert => AnimClip::Alert,
            Self::Chase => AnimClip::Chase,
            Self::Stunned => AnimClip::Stunned,
            Self::Watch => AnimClip::Watch,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct SavedAnimator {
    clip: SavedAnimClip,
    frame: u32,
    elapsed_seconds: f32,
}

impl SavedAnimator {
    fn from_runtime(value: &Animator) -> Self {
        Self {
            clip: SavedAnimClip::from_runtime(value.clip),
            frame: value.frame,
            elapsed_seconds: value.elapsed_seconds,
        }
    }

    fn to_runtime(self) -> Animator {
        Animator {
            clip: self.clip.to_runtime(),
            frame: self.frame,
            elapsed_seconds: self.elapsed_seconds,
        }
    }

    fn validate(&self, path: &str) -> SaveLoadResult<()> {
        if !self.elapsed_seconds.is_finite() || self.elapsed_seconds < 0.0 {
            return Err(validation_err(
                &format!("{path}.animator.elapsed_seconds"),
                "expected finite number >= 0",
            ));
        }
        if self.frame >= self.clip.to_runtime().frame_count() {
            return Err(validation_err(
                &format!("{path}.animator.frame"),
                format!(
                    "frame {} out of range for clip with {} frames",
                    self.frame,
                    self.clip.to_runtime().frame_count()
                ),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SavedPlayer {
    position: SavedVec2,
    facing: SavedFacing4,
    state: SavedPlayerState,
    state_seconds: f32,
    detections: u32,
    contact_cooldown: f32,
    inventory: Vec<SavedItemKind>,
    #[serde(default)]
    climbing_ladder: Option<u64>,
    animator: SavedAnimator,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SavedGuard {
    position: SavedVec2,
    facing: SavedFacingLr,
    state: SavedGuardState,
    state_seconds: f32,
    patrol_index: u32,
    last_seen: SavedVec2,
    animator: SavedAnimator,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SavedCamera {
    position: SavedVec2,
    facing: SavedCameraFacing,
    alerted: bool,
    animator: SavedAnimator,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct SavedDoor {
    open: bool,
    locked: bool,
    /// `None` for a plain door, `Some(solved)` for a puzzle-linked one.
    puzzle_solved: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct SavedInfo {
    read: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct SavedPickup {
    taken: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct SavedProgress {
    alert_seconds_remaining: f32,
    objective_secured: bool,
    tick_counter: u64,
    #[serde(default)]
    footstep_accumulator: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SaveGame {
    save_version: u32,
    level_name: String,
    player: SavedPlayer,
    guards: Vec<SavedGuard>,
    cameras: Vec<SavedCamera>,
    doors: Vec<SavedDoor>,
    #[serde(default)]
    infos: Vec<SavedInfo>,
    #[serde(default)]
    pickups: Vec<SavedPickup>,
    progress: SavedProgress,
}

fn validation_err(path: &str, message: impl Into<String>) -> String {
    format!("validation failed at {path}: {}", message.into())
}

fn validate_finite_non_negative(value: f32, path: &str) -> SaveLoadResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(validation_err(path, format!("expected finite >= 0, got {value}")));
    }
    Ok(())
}

impl SavedPlayer {
    fn validate(&self, level: &LevelDef, ladder_ids: &HashSet<u64>) -> SaveLoadResult<()> {
        if !self.position.is_finite() {
            return Err(validation_err("player.position", "expected finite numbers"));
        }
        if !level.bounds.contains(self.position.to_vec2()) {
            return Err(validation_err("player.position", "outside level bounds"));
        }
        validate_finite_non_negative(self.state_seconds, "player.state_seconds")?;
        validate_finite_non_negative(self.contact_cooldown, "player.contact_cooldown")?;
        if let Some(ladder_id) = self.climbing_ladder {
            if !ladder_ids.contains(&ladder_id) {
                return Err(validation_err(
                    "player.climbing_ladder",
                    format!("references unknown ladder id {ladder_id}"),
                ));
            }
        }
        if self.state == SavedPlayerState::Climb && self.climbing_ladder.is_none() {
            return Err(validation_err(
                "player.state",
                "Climb state requires a climbing_ladder reference",
            ));
        }
        self.animator.validate("player")
    }
}

impl SavedGuard {
    fn validate(&self, index: usize, patrol_len: usize) -> SaveLoadResult<()> {
        let path = format!("guards[{index}]");
        if !self.position.is_finite() || !self.last_seen.is_finite() {
            return Err(validation_err(&path, "expected finite positions"));
        }
        validate_finite_non_negative(self.state_seconds, &format!("{path}.state_seconds"))?;
        if self.patrol_index as usize >= patrol_len.max(1) {
            return Err(validation_err(
                &format!("{path}.patrol_index"),
                format!(
                    "index {} out of range for route of {} waypoints",
                    self.patrol_index, patrol_len
                ),
            ));
        }
        self.animator.validate(&path)
    }
}

impl SavedCamera {
    fn validate(&self, index: usize) -> SaveLoadResult<()> {
        let path = format!("cameras[{index}]");
        if !self.position.is_finite() {
            return Err(validation_err(&path, "expected finite position"));
        }
        self.animator.validate(&path)
    }
}

impl Simulation {
    /// Extracts every entity and the manager state into a structured record,
    /// grouped by entity category. Entities appear in spawn order, which is
    /// the level-definition order, so records re-align by index on load.
    fn build_save_game(&self) -> SaveLoadResult<SaveGame> {
        let mut player: Option<SavedPlayer> = None;
        let mut guards = Vec::new();
        let mut cameras = Vec::new();
        let mut doors = Vec::new();
        let mut infos = Vec::new();
        let mut pickups = Vec::new();

        for entity in &self.entities {
            match &entity.kind {
                EntityKind::Player(data) => {
                    player = Some(SavedPlayer {
                        position: SavedVec2::from_vec2(entity.position),
                        facing: SavedFacing4::from_runtime(data.facing),
                        state: SavedPlayerState::from_runtime(data.state),
                        state_seconds: data.state_seconds,
                        detections: data.detections,
                        contact_cooldown: data.contact_cooldown,
                        inventory: data
                            .inventory
                            .iter()
                            .map(|item| SavedItemKind::from_runtime(*item))
                            .collect(),
                        climbing_ladder: data.climbing_ladder.map(|id| id.0),
                        animator: SavedAnimator::from_runtime(&data.animator),
                    });
                }
                EntityKind::Guard(data) => {
                    guards.push(SavedGuard {
                        position: SavedVec2::from_vec2(entity.position),
                        facing: SavedFacingLr::from_runtime(data.facing),
                        state: SavedGuardState::from_runtime(data.state),
                        state_seconds: data.state_seconds,
                        patrol_index: data.patrol_index as u32,
                        last_seen: SavedVec2::from_vec2(data.last_seen),
                        animator: SavedAnimator::from_runtime(&data.animator),
                    });
                }
                EntityKind::Camera(data) => {
                    cameras.push(SavedCamera {
                        position: SavedVec2::from_vec2(entity.position),
                        facing: SavedCameraFacing::from_runtime(data.facing),
                        alerted: data.alerted,
                        animator: SavedAnimator::from_runtime(&data.animator),
                    });
                }
                EntityKind::Door(data) => {
                    doors.push(SavedDoor {
                        open: data.open,
                        locked: data.locked,
                        puzzle_solved: data.puzzle.as_ref().map(Puzzle::is_solved),
                    });
                }
                EntityKind::Info(data) => {
                    infos.push(SavedInfo { read: data.read });
                }
                EntityKind::Pickup(data) => {
                    pickups.push(SavedPickup { taken: data.taken });
                }
                EntityKind::Ladder(_) | EntityKind::Picture(_) => {}
            }
        }

        let Some(player) = player else {
            return Err("cannot save: no player entity in simulation".to_string());
        };

        Ok(SaveGame {
            save_version: SAVE_VERSION,
            level_name: self.level.name.clone(),
            player,
            guards,
            cameras,
            doors,
            infos,
            pickups,
            progress: SavedProgress {
                alert_seconds_remaining: self.alert_seconds_remaining,
                objective_secured: self.objective_secured,
                tick_counter: self.tick_counter,
                footstep_accumulator: self.footstep_accumulator,
            },
        })
    }

    /// Rebuilds a running simulation from a save. Reconstruction starts from
    /// the level's default descriptor; each valid record then overlays its
    /// entity. An invalid record degrades to that one entity's default with a
    /// warning instead of failing the whole load.
    fn from_save_game(save: &SaveGame, level: &LevelDef) -> SaveLoadResult<Simulation> {
        if save.save_version != SAVE_VERSION {
            return Err(format!(
                "unsupported save_version {}: expected {SAVE_VERSION}",
                save.save_version
            ));
        }
        if save.level_name != level.name {
            return Err(format!(
                "save references level '{}' but '{}' was resolved",
                save.level_name, level.name
            ));
        }

        let mut sim = Simulation::from_level(level);
        sim.phase = GamePhase::Playing;

        let ladder_ids: HashSet<u64> = sim
            .entities
            .iter()
            .filter(|entity| matches!(entity.kind, EntityKind::Ladder(_)))
            .map(|entity| entity.id.0)
            .collect();

        match save.player.validate(level, &ladder_ids) {
            Ok(()) => {
                let record = &save.player;
                if let Some(player_index) = sim.find_index(sim.player_id) {
                    let entity = &mut sim.entities[player_index];
                    entity.position = record.position.to_vec2();
                    if let EntityKind::Player(player) = &mut entity.kind {
                        player.facing = record.facing.to_runtime();
                        player.state = record.state.to_runtime();
                        player.state_seconds = record.state_seconds;
                        player.detections = record.detections;
                        player.contact_cooldown = record.contact_cooldown;
                        player.inventory = record
                            .inventory
                            .iter()
                            .map(|item| item.to_runtime())
                            .collect();
                        player.climbing_ladder = record.climbing_ladder.map(EntityId);
                        player.animator = record.animator.to_runtime();
                    }
                }
            }
            Err(error) => {
                warn!(error = %error, "save_player_invalid_using_default");
            }
        }

        let mut guard_cursor = 0usize;
        let mut camera_cursor = 0usize;
        let mut door_cursor = 0usize;
        let mut info_cursor = 0usize;
        let mut pickup_cursor = 0usize;

        for entity in &mut sim.entities {
            match &mut entity.kind {
                EntityKind::Guard(guard) => {
                    let index = guard_cursor;
                    guard_cursor += 1;
                    let Some(record) = save.guards.get(index) else {
                        warn!(index, "save_guard_missing_using_default");
                        continue;
                    };
                    match record.validate(index, guard.patrol.len()) {
                        Ok(()) => {
                            entity.position = record.position.to_vec2();
                            guard.facing = record.facing.to_runtime();
                            guard.state = record.state.to_runtime();
                            guard.state_seconds = record.state_seconds;
                            guard.patrol_index = record.patrol_index as usize;
                            guard.last_seen = record.last_seen.to_vec2();
                            guard.animator = record.animator.to_runtime();
                        }
                        Err(error) => {
                            warn!(index, error = %error, "save_guard_invalid_using_default");
                        }
                    }
                }
                EntityKind::Camera(camera) => {
                    let index = camera_cursor;
                    camera_cursor += 1;
                    let Some(record) = save.cameras.get(index) else {
                        warn!(index, "save_camera_missing_using_default");
                        continue;
                    };
                    match record.validate(index) {
                        Ok(()) => {
                            entity.position = record.position.to_vec2();
                            camera.set_pose(
                                entity.position,
                                record.facing.to_runtime(),
                                &level.tuning,
                            );
                            camera.alerted = record.alerted;
                            camera.animator = record.animator.to_runtime();
                        }
                        Err(error) => {
                            warn!(index, error = %error, "save_camera_invalid_using_default");
                        }
                    }
                }
                EntityKind::Door(door) => {
                    let index = door_cursor;
                    door_cursor += 1;
                    let Some(record) = save.doors.get(index) else {
                        warn!(index, "save_door_missing_using_default");
                        continue;
                    };
                    door.open = record.open;
                    door.locked = record.locked;
                    match (&mut door.puzzle, record.puzzle_solved) {
                        (Some(puzzle), Some(true)) => puzzle.mark_solved(),
                        (Some(_), Some(false)) | (None, None) => {}
                        (Some(_), None) | (None, Some(_)) => {
                            warn!(index, "save_door_puzzle_shape_mismatch_keeping_default");
                        }
                    }
                }
                EntityKind::Info(info) => {
                    let index = info_cursor;
                    info_cursor += 1;
                    if let Some(record) = save.infos.get(index) {
                        info.read = record.read;
                    }
                }
                EntityKind::Pickup(pickup) => {
                    let index = pickup_cursor;
                    pickup_cursor += 1;
                    if let Some(record) = save.pickups.get(index) {
                        pickup.taken = record.taken;
                        entity.visible = !record.taken;
                    }
                }
                EntityKind::Player(_) | EntityKind::Ladder(_) | EntityKind::Picture(_) => {}
            }
        }

        if save.guards.len() > guard_cursor {
            warn!(
                extra = save.guards.len() - guard_cursor,
                "save_has_more_guards_than_level_ignoring_extras"
            );
        }

        let progress = &save.progress;
        if progress.alert_seconds_remaining.is_finite() && progress.alert_seconds_remaining >= 0.0 {
            sim.alert_seconds_remaining = progress.alert_seconds_remaining;
        } else {
            warn!("save_progress_alert_invalid_using_default");
        }
        sim.objective_secured = progress.objective_secured;
        sim.tick_counter = progress.tick_counter;
        if progress.footstep_accumulator.is_finite() && progress.footstep_accumulator >= 0.0 {
            sim.footstep_accumulator = progress.footstep_accumulator;
        }

        Ok(sim)
    }
}

fn parse_save_game_json(raw: &str) -> SaveLoadResult<SaveGame> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, SaveGame>(&mut deserializer) {
        Ok(save) => Ok(save),
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            if path.is_empty() || path == "." {
                Err(format!("parse save json: {source}"))
            } else {
                Err(format!("parse save json at {path}: {source}"))
            }
        }
    }
}
