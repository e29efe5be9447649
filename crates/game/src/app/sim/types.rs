#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct EntityId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GamePhase {
    Menu,
    Playing,
    Paused,
    GameOver,
    Victory,
}

impl GamePhase {
    fn label(self) -> &'static str {
        match self {
            GamePhase::Menu => "menu",
            GamePhase::Playing => "playing",
            GamePhase::Paused => "paused",
            GamePhase::GameOver => "game_over",
            GamePhase::Victory => "victory",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Facing4 {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl Facing4 {
    fn from_move_dir(dir: Vec2, current: Facing4) -> Facing4 {
        if dir.x == 0.0 && dir.y == 0.0 {
            return current;
        }
        if dir.x.abs() >= dir.y.abs() {
            if dir.x >= 0.0 {
                Facing4::Right
            } else {
                Facing4::Left
            }
        } else if dir.y >= 0.0 {
            Facing4::Up
        } else {
            Facing4::Down
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum FacingLr {
    Left,
    #[default]
    Right,
}

impl FacingLr {
    fn from_dx(dx: f32, current: FacingLr) -> FacingLr {
        if dx > 0.0 {
            FacingLr::Right
        } else if dx < 0.0 {
            FacingLr::Left
        } else {
            current
        }
    }

    fn sign(self) -> f32 {
        match self {
            FacingLr::Left => -1.0,
            FacingLr::Right => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CameraFacing {
    Left,
    Right,
    Down,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum PlayerState {
    #[default]
    Idle,
    Run,
    Hit,
    Climb,
    Invisible,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum GuardState {
    #[default]
    Patrol,
    Alert,
    Chase,
    Stunned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PuzzleState {
    Unsolved,
    Solved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemKind {
    Cloak,
    Evidence,
}

impl ItemKind {
    fn label(self) -> &'static str {
        match self {
            ItemKind::Cloak => "cloak",
            ItemKind::Evidence => "evidence",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InfoKind {
    Note,
    Computer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnimClip {
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

impl AnimClip {
    fn frame_count(self) -> u32 {
        match self {
            AnimClip::Idle => 2,
            AnimClip::Run => 4,
            AnimClip::Hit => 2,
            AnimClip::Climb => 2,
            AnimClip::Vanish => 2,
            AnimClip::Patrol => 4,
            AnimClip::Alert => 2,
            AnimClip::Chase => 4,
            AnimClip::Stunned => 2,
            AnimClip::Watch => CAMERA_ANIM_FRAMES,
        }
    }

    fn token(self) -> &'static str {
        match self {
            AnimClip::Idle => "idle",
            AnimClip::Run => "run",
            AnimClip::Hit => "hit",
            AnimClip::Climb => "climb",
            AnimClip::Vanish => "vanish",
            AnimClip::Patrol => "patrol",
            AnimClip::Alert => "alert",
            AnimClip::Chase => "chase",
            AnimClip::Stunned => "stunned",
            AnimClip::Watch => "watch",
        }
    }
}

/// Shared animation clock. One advance-and-wrap routine serves every animated
/// entity; frame counts come from the clip, the frame duration from the
/// caller.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Animator {
    clip: AnimClip,
    frame: u32,
    elapsed_seconds: f32,
}

impl Animator {
    fn new(clip: AnimClip) -> Self {
        Self {
            clip,
            frame: 0,
            elapsed_seconds: 0.0,
        }
    }

    fn set_clip(&mut self, clip: AnimClip) {
        if self.clip != clip {
            self.clip = clip;
            self.frame = 0;
            self.elapsed_seconds = 0.0;
        }
    }

    fn advance(&mut self, dt_seconds: f32, frame_seconds: f32) {
        let frame_count = self.clip.frame_count().max(1);
        self.elapsed_seconds += dt_seconds;
        while self.elapsed_seconds >= frame_seconds {
            self.elapsed_seconds -= frame_seconds;
            self.frame = (self.frame + 1) % frame_count;
        }
    }
}

/// Events raised during the update phases and drained at the end of the same
/// update. Cross-entity effects (door unlocks, alert bookkeeping) happen only
/// in the drain, which keeps their ordering explicit.
#[derive(Debug, Clone, PartialEq)]
enum SimEvent {
    Detected {
        source: EntityId,
        player_position: Vec2,
    },
    WrongWire {
        door: EntityId,
    },
    PuzzleSolved {
        door: EntityId,
    },
    DoorUnlocked {
        door: EntityId,
    },
    GuardStunned {
        guard: EntityId,
    },
    PlayerHit {
        guard: EntityId,
    },
    ItemTaken {
        item: ItemKind,
    },
    ObjectiveSecured,
}

#[derive(Default, Debug)]
struct SimEventBus {
    current_tick_events: Vec<SimEvent>,
    last_tick_count: u32,
}

impl SimEventBus {
    fn emit(&mut self, event: SimEvent) {
        self.current_tick_events.push(event);
    }

    fn take_current(&mut self) -> Vec<SimEvent> {
        let events = std::mem::take(&mut self.current_tick_events);
        self.last_tick_count = events.len() as u32;
        events
    }

    fn last_tick_count(&self) -> u32 {
        self.last_tick_count
    }
}

/// External requests applied only at the frame boundary, never mid-phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SimCommand {
    NewGame,
    TogglePause,
}

/// One tick worth of player intent, already translated from raw input by the
/// scene. `move_dir` is normalized or zero; `nav_*` are edge-triggered and
/// only consumed by an open puzzle session.
#[derive(Debug, Clone, Copy, Default)]
struct ControlFrame {
    move_dir: Vec2,
    interact_pressed: bool,
    melee_pressed: bool,
    ranged_pressed: bool,
    gadget_pressed: bool,
    cancel_pressed: bool,
    nav_up_pressed: bool,
    nav_down_pressed: bool,
    nav_left_pressed: bool,
    nav_right_pressed: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum PuzzleUi {
    Code { digits: [u8; CODE_DIGIT_COUNT], cursor: usize },
    Wires { selected: u32, wire_count: u32 },
    Pick { marker: f32, rising: bool },
}

#[derive(Debug, Clone, PartialEq)]
struct PuzzleSession {
    door_id: EntityId,
    ui: PuzzleUi,
}

type SaveLoadResult<T> = Result<T, String>;
