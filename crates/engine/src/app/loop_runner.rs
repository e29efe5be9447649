use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{debug, info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use crate::StartupError;

use super::metrics::MetricsAccumulator;
use super::{DrawList, InputAction, InputSnapshot, Renderer, Scene, SceneCommand};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub max_render_fps: Option<u32>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Skulk".to_string(),
            window_width: 1280,
            window_height: 720,
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            max_render_fps: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

pub fn run_app(
    config: LoopConfig,
    mut scene: Box<dyn Scene>,
    asset_root: std::path::PathBuf,
) -> Result<(), AppError> {
    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer =
        Renderer::new(Arc::clone(&window), asset_root).map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();
    let render_frame_target = target_frame_duration(config.max_render_fps);
    let mut input_collector = InputCollector::new(config.window_width, config.window_height);

    scene.load();
    info!(target_tps, max_ticks_per_frame, "loop_config");

    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut last_present_instant = Instant::now();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval);
    let mut last_applied_title: Option<String> = None;
    let mut last_phase_label: &'static str = "";
    let mut draw_list = DrawList::default();
    let window_for_loop = Arc::clone(&window);

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window_for_loop.id() => {
                match event {
                    WindowEvent::CloseRequested => {
                        info!(reason = "window_close", "shutdown_requested");
                        window_target.exit();
                    }
                    WindowEvent::Resized(new_size) => {
                        input_collector.set_window_size(new_size.width, new_size.height);
                        if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                            warn!(error = %error, "renderer_resize_failed");
                            window_target.exit();
                        }
                    }
                    WindowEvent::ScaleFactorChanged { .. } => {
                        let size = window_for_loop.inner_size();
                        input_collector.set_window_size(size.width, size.height);
                        if let Err(error) = renderer.resize(size.width, size.height) {
                            warn!(error = %error, "renderer_resize_failed");
                            window_target.exit();
                        }
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        input_collector.handle_keyboard_input(&event);
                        if input_collector.quit_requested {
                            info!(reason = "escape_key", "shutdown_requested");
                            window_target.exit();
                        }
                    }
                    WindowEvent::RedrawRequested => {
                        let now = Instant::now();
                        let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                        last_frame_instant = now;

                        let clamped_frame_dt = clamp_frame_delta(raw_frame_dt, max_frame_delta);
                        accumulator = accumulator.saturating_add(clamped_frame_dt);

                        let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
                        for _ in 0..step_plan.ticks_to_run {
                            let input_snapshot = input_collector.snapshot_for_tick();
                            let command = scene.update(fixed_dt_seconds, &input_snapshot);
                            for sound in scene.drain_sound_events() {
                                debug!(sound = sound.token(), "sound_event");
                            }
                            if matches!(command, SceneCommand::Quit) {
                                info!(reason = "scene_command", "shutdown_requested");
                                window_target.exit();
                            }
                            metrics_accumulator.record_tick();
                        }
                        accumulator = step_plan.remaining_accumulator;

                        if step_plan.dropped_backlog > Duration::ZERO {
                            warn!(
                                dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                                max_ticks_per_frame, "sim_clamp_triggered"
                            );
                        }

                        let hud = scene.hud_snapshot();
                        if hud.phase_label != last_phase_label {
                            info!(
                                phase = hud.phase_label,
                                detections = hud.detections,
                                "phase_changed"
                            );
                            last_phase_label = hud.phase_label;
                        }
                        if let Some(note) = &hud.note {
                            info!(note = %note, "hud_note");
                        }

                        // Single FPS-cap sleep point for render pacing.
                        let elapsed_since_last_present =
                            Instant::now().saturating_duration_since(last_present_instant);
                        let cap_sleep =
                            compute_cap_sleep(elapsed_since_last_present, render_frame_target);
                        if cap_sleep > Duration::ZERO {
                            thread::sleep(cap_sleep);
                        }

                        draw_list.clear();
                        scene.render(&mut draw_list);
                        let camera = scene.camera();
                        if let Err(error) = renderer.render_frame(&camera, &draw_list, &hud) {
                            warn!(error = %error, "renderer_draw_failed");
                            window_target.exit();
                        }
                        last_present_instant = Instant::now();

                        let next_title = scene.debug_title();
                        if next_title != last_applied_title {
                            if let Some(title) = &next_title {
                                window_for_loop.set_title(title);
                            } else {
                                window_for_loop.set_title(&config.window_title);
                            }
                            last_applied_title = next_title;
                        }
                        metrics_accumulator.record_frame(raw_frame_dt);

                        if let Some(snapshot) = metrics_accumulator.maybe_snapshot(now) {
                            info!(
                                fps = snapshot.fps,
                                tps = snapshot.tps,
                                frame_time_ms = snapshot.frame_time_ms,
                                "loop_metrics"
                            );
                        }
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => {
                window_for_loop.request_redraw();
            }
            Event::LoopExiting => {
                scene.unload();
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

#[derive(Debug, Default)]
struct InputCollector {
    quit_requested: bool,
    action_states: super::input::ActionStates,
    interact_pressed_edge: bool,
    melee_pressed_edge: bool,
    ranged_pressed_edge: bool,
    gadget_pressed_edge: bool,
    cancel_pressed_edge: bool,
    pause_pressed_edge: bool,
    save_pressed_edge: bool,
    load_pressed_edge: bool,
    window_width: u32,
    window_height: u32,
}

impl InputCollector {
    fn new(window_width: u32, window_height: u32) -> Self {
        Self {
            window_width,
            window_height,
            ..Self::default()
        }
    }

    fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_width = width;
        self.window_height = height;
    }

    fn handle_keyboard_input(&mut self, event: &winit::event::KeyEvent) {
        let PhysicalKey::Code(key_code) = event.physical_key else {
            return;
        };
        let is_down = event.state == ElementState::Pressed;
        let pressed_edge = is_down && !event.repeat;

        match key_code {
            KeyCode::KeyW | KeyCode::ArrowUp => {
                self.action_states.set(InputAction::MoveUp, is_down);
            }
            KeyCode::KeyS | KeyCode::ArrowDown => {
                self.action_states.set(InputAction::MoveDown, is_down);
            }
            KeyCode::KeyA | KeyCode::ArrowLeft => {
                self.action_states.set(InputAction::MoveLeft, is_down);
            }
            KeyCode::KeyD | KeyCode::ArrowRight => {
                self.action_states.set(InputAction::MoveRight, is_down);
            }
            KeyCode::KeyE => {
                if pressed_edge {
                    self.interact_pressed_edge = true;
                }
            }
            KeyCode::KeyJ => {
                if pressed_edge {
                    self.melee_pressed_edge = true;
                }
            }
            KeyCode::KeyK => {
                if pressed_edge {
                    self.ranged_pressed_edge = true;
                }
            }
            KeyCode::KeyG => {
                if pressed_edge {
                    self.gadget_pressed_edge = true;
                }
            }
            KeyCode::KeyC => {
                if pressed_edge {
                    self.cancel_pressed_edge = true;
                }
            }
            KeyCode::KeyP => {
                if pressed_edge {
                    self.pause_pressed_edge = true;
                }
            }
            KeyCode::F5 => {
                if pressed_edge {
                    self.save_pressed_edge = true;
                }
            }
            KeyCode::F9 => {
                if pressed_edge {
                    self.load_pressed_edge = true;
                }
            }
            KeyCode::Escape => {
                self.action_states.set(InputAction::Quit, is_down);
                if pressed_edge {
                    self.quit_requested = true;
                }
            }
            _ => {}
        }
    }

    fn snapshot_for_tick(&mut self) -> InputSnapshot {
        let snapshot = InputSnapshot::new(
            self.quit_requested,
            self.action_states,
            self.interact_pressed_edge,
            self.melee_pressed_edge,
            self.ranged_pressed_edge,
            self.gadget_pressed_edge,
            self.cancel_pressed_edge,
            self.pause_pressed_edge,
            self.save_pressed_edge,
            self.load_pressed_edge,
            self.window_width,
            self.window_height,
        );
        self.interact_pressed_edge = false;
        self.melee_pressed_edge = false;
        self.ranged_pressed_edge = false;
        self.gadget_pressed_edge = false;
        self.cancel_pressed_edge = false;
        self.pause_pressed_edge = false;
        self.save_pressed_edge = false;
        self.load_pressed_edge = false;
        snapshot
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(accumulator: Duration, fixed_dt: Duration, max_ticks_per_frame: u32) -> StepPlan {
    let mut ticks = 0u32;
    let mut remaining = accumulator;
    while remaining >= fixed_dt && ticks < max_ticks_per_frame {
        remaining = remaining.saturating_sub(fixed_dt);
        ticks = ticks.saturating_add(1);
    }

    let mut dropped = Duration::ZERO;
    if remaining >= fixed_dt {
        // Backlog beyond the tick budget is discarded, not simulated.
        while remaining >= fixed_dt {
            remaining = remaining.saturating_sub(fixed_dt);
            dropped = dropped.saturating_add(fixed_dt);
        }
    }

    StepPlan {
        ticks_to_run: ticks,
        remaining_accumulator: remaining,
        dropped_backlog: dropped,
    }
}

fn clamp_frame_delta(raw: Duration, max_frame_delta: Duration) -> Duration {
    raw.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn target_frame_duration(max_render_fps: Option<u32>) -> Option<Duration> {
    max_render_fps
        .filter(|fps| *fps > 0)
        .map(|fps| Duration::from_secs_f64(1.0 / fps as f64))
}

fn compute_cap_sleep(elapsed_since_last_present: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(target) => target.saturating_sub(elapsed_since_last_present),
        None => Duration::ZERO,
    }
}
