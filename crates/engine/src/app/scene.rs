use super::input::{ActionStates, InputAction};

/// 2D point or displacement in world units.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn distance_sq_to(self, other: Vec2) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }

    pub fn distance_to(self, other: Vec2) -> f32 {
        self.distance_sq_to(other).sqrt()
    }
}

impl std::ops::Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2 {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

/// Axis-aligned rectangle in world units. `min` is the bottom-left corner.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn from_center_half_extent(center: Vec2, half_extent: Vec2) -> Self {
        Self {
            min: Vec2 {
                x: center.x - half_extent.x,
                y: center.y - half_extent.y,
            },
            max: Vec2 {
                x: center.x + half_extent.x,
                y: center.y + half_extent.y,
            },
        }
    }

    pub fn center(&self) -> Vec2 {
        Vec2 {
            x: (self.min.x + self.max.x) * 0.5,
            y: (self.min.y + self.max.y) * 0.5,
        }
    }

    pub fn half_extent(&self) -> Vec2 {
        Vec2 {
            x: (self.max.x - self.min.x) * 0.5,
            y: (self.max.y - self.min.y) * 0.5,
        }
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Camera2D {
    pub position: Vec2,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    actions: ActionStates,
    interact_pressed: bool,
    melee_pressed: bool,
    ranged_pressed: bool,
    gadget_pressed: bool,
    cancel_pressed: bool,
    pause_pressed: bool,
    save_pressed: bool,
    load_pressed: bool,
    window_width: u32,
    window_height: u32,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        quit_requested: bool,
        actions: ActionStates,
        interact_pressed: bool,
        melee_pressed: bool,
        ranged_pressed: bool,
        gadget_pressed: bool,
        cancel_pressed: bool,
        pause_pressed: bool,
        save_pressed: bool,
        load_pressed: bool,
        window_width: u32,
        window_height: u32,
    ) -> Self {
        Self {
            quit_requested,
            actions,
            interact_pressed,
            melee_pressed,
            ranged_pressed,
            gadget_pressed,
            cancel_pressed,
            pause_pressed,
            save_pressed,
            load_pressed,
            window_width,
            window_height,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_interact_pressed(mut self, interact_pressed: bool) -> Self {
        self.interact_pressed = interact_pressed;
        self
    }

    pub fn with_melee_pressed(mut self, melee_pressed: bool) -> Self {
        self.melee_pressed = melee_pressed;
        self
    }

    pub fn with_ranged_pressed(mut self, ranged_pressed: bool) -> Self {
        self.ranged_pressed = ranged_pressed;
        self
    }

    pub fn with_gadget_pressed(mut self, gadget_pressed: bool) -> Self {
        self.gadget_pressed = gadget_pressed;
        self
    }

    pub fn with_cancel_pressed(mut self, cancel_pressed: bool) -> Self {
        self.cancel_pressed = cancel_pressed;
        self
    }

    pub fn with_pause_pressed(mut self, pause_pressed: bool) -> Self {
        self.pause_pressed = pause_pressed;
        self
    }

    pub fn with_save_pressed(mut self, save_pressed: bool) -> Self {
        self.save_pressed = save_pressed;
        self
    }

    pub fn with_load_pressed(mut self, load_pressed: bool) -> Self {
        self.load_pressed = load_pressed;
        self
    }

    pub fn with_window_size(mut self, window_size: (u32, u32)) -> Self {
        self.window_width = window_size.0;
        self.window_height = window_size.1;
        self
    }

    pub fn interact_pressed(&self) -> bool {
        self.interact_pressed
    }

    pub fn melee_pressed(&self) -> bool {
        self.melee_pressed
    }

    pub fn ranged_pressed(&self) -> bool {
        self.ranged_pressed
    }

    pub fn gadget_pressed(&self) -> bool {
        self.gadget_pressed
    }

    pub fn cancel_pressed(&self) -> bool {
        self.cancel_pressed
    }

    pub fn pause_pressed(&self) -> bool {
        self.pause_pressed
    }

    pub fn save_pressed(&self) -> bool {
        self.save_pressed
    }

    pub fn load_pressed(&self) -> bool {
        self.load_pressed
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }
}

/// Draw layers in fixed back-to-front order. Within a layer the submission
/// order is preserved by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RenderLayer {
    World,
    Entities,
    Ui,
}

impl RenderLayer {
    pub const fn index(self) -> u8 {
        match self {
            RenderLayer::World => 0,
            RenderLayer::Entities => 1,
            RenderLayer::Ui => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Renderable {
    Placeholder { rgba: [u8; 4] },
    Sprite(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    pub renderable: Renderable,
    pub center_world: Vec2,
    pub half_extent_world: Vec2,
    pub layer: RenderLayer,
}

/// Ordered draw list handed from the scene to the renderer each frame. The
/// scene is responsible for layer ordering; the renderer draws in list order.
#[derive(Debug, Default)]
pub struct DrawList {
    commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }
}

/// Fire-and-forget audio notifications. The loop drains these after every
/// update; no ordering relative to rendering is promised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundEvent {
    Footstep,
    DoorOpen,
    DoorClose,
    DoorUnlock,
    Alarm,
    WireCut,
    Stun,
    Pickup,
    PuzzleSolved,
}

impl SoundEvent {
    pub fn token(self) -> &'static str {
        match self {
            SoundEvent::Footstep => "footstep",
            SoundEvent::DoorOpen => "door_open",
            SoundEvent::DoorClose => "door_close",
            SoundEvent::DoorUnlock => "door_unlock",
            SoundEvent::Alarm => "alarm",
            SoundEvent::WireCut => "wire_cut",
            SoundEvent::Stun => "stun",
            SoundEvent::Pickup => "pickup",
            SoundEvent::PuzzleSolved => "puzzle_solved",
        }
    }
}

/// Everything the notification layer may show for the current frame. The loop
/// pulls this after every update; the scene never queries UI state back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HudSnapshot {
    pub phase_label: &'static str,
    pub prompt: Option<String>,
    pub note: Option<String>,
    pub alert_active: bool,
    pub detections: u32,
    pub detection_limit: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Quit,
}

pub trait Scene {
    fn load(&mut self);

    fn update(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand;

    /// Pure read: fills the ordered draw list for the current frame.
    fn render(&mut self, frame: &mut DrawList);

    fn camera(&self) -> Camera2D;

    fn drain_sound_events(&mut self) -> Vec<SoundEvent>;

    fn hud_snapshot(&self) -> HudSnapshot;

    fn unload(&mut self);

    fn debug_title(&self) -> Option<String> {
        None
    }
}
