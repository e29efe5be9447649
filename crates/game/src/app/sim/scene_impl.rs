/// Everything the scene needs from the outside world, handed over once at
/// construction. Tests build their own context with no save directory.
pub(crate) struct SimContext {
    pub(crate) level_db: LevelDatabase,
    pub(crate) save_dir: Option<PathBuf>,
}

pub(crate) struct StealthScene {
    context: SimContext,
    sim: Simulation,
    move_up_was_down: bool,
    move_down_was_down: bool,
    move_left_was_down: bool,
    move_right_was_down: bool,
}

impl StealthScene {
    fn new(context: SimContext) -> Self {
        let level = context
            .level_db
            .levels()
            .first()
            .cloned()
            .unwrap_or_else(|| {
                warn!("no_levels_compiled_using_fallback");
                LevelDef::fallback()
            });
        let sim = Simulation::from_level(&level);
        Self {
            context,
            sim,
            move_up_was_down: false,
            move_down_was_down: false,
            move_left_was_down: false,
            move_right_was_down: false,
        }
    }

    fn save_file_path(&self) -> SaveLoadResult<PathBuf> {
        let Some(save_dir) = &self.context.save_dir else {
            return Err("no save directory configured".to_string());
        };
        Ok(save_dir.join("saves").join(SAVE_FILE))
    }

    fn save_to_disk(&self) -> SaveLoadResult<PathBuf> {
        let save = self.sim.build_save_game()?;
        let path = self.save_file_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|error| format!("create save dir '{}': {error}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&save)
            .map_err(|error| format!("encode save json: {error}"))?;
        fs::write(&path, json)
            .map_err(|error| format!("write save '{}': {error}", path.display()))?;
        Ok(path)
    }

    fn load_from_disk(&mut self) -> SaveLoadResult<()> {
        let path = self.save_file_path()?;
        let raw = fs::read_to_string(&path)
            .map_err(|error| format!("read save '{}': {error}", path.display()))?;
        let save = parse_save_game_json(&raw)?;
        let level = self
            .resolve_level(&save.level_name)
            .ok_or_else(|| format!("save references unknown level '{}'", save.level_name))?;
        self.sim = Simulation::from_save_game(&save, &level)?;
        Ok(())
    }

    fn resolve_level(&self, name: &str) -> Option<LevelDef> {
        if let Some(level) = self.context.level_db.level_by_name(name) {
            return Some(level.clone());
        }
        // The fallback level is never in the database but may be active.
        if self.sim.level.name == name {
            return Some(self.sim.level.clone());
        }
        None
    }

    fn build_controls(&mut self, input: &InputSnapshot) -> ControlFrame {
        let up = input.is_down(InputAction::MoveUp);
        let down = input.is_down(InputAction::MoveDown);
        let left = input.is_down(InputAction::MoveLeft);
        let right = input.is_down(InputAction::MoveRight);

        let controls = ControlFrame {
            move_dir: movement_dir(input),
            interact_pressed: input.interact_pressed(),
            melee_pressed: input.melee_pressed(),
            ranged_pressed: input.ranged_pressed(),
            gadget_pressed: input.gadget_pressed(),
            cancel_pressed: input.cancel_pressed(),
            nav_up_pressed: up && !self.move_up_was_down,
            nav_down_pressed: down && !self.move_down_was_down,
            nav_left_pressed: left && !self.move_left_was_down,
            nav_right_pressed: right && !self.move_right_was_down,
        };

        self.move_up_was_down = up;
        self.move_down_was_down = down;
        self.move_left_was_down = left;
        self.move_right_was_down = right;

        controls
    }
}

impl Scene for StealthScene {
    fn load(&mut self) {
        info!(
            level = %self.sim.level.name,
            entity_count = self.sim.entities.len(),
            "scene_loaded"
        );
    }

    fn update(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand {
        if input.save_pressed() {
            if self.sim.phase == GamePhase::Playing {
                match self.save_to_disk() {
                    Ok(path) => info!(path = %path.display(), "save_written"),
                    Err(error) => warn!(error = %error, "save_failed"),
                }
            } else {
                debug!(phase = self.sim.phase.label(), "save_ignored_outside_play");
            }
        }

        if input.load_pressed() {
            match self.load_from_disk() {
                Ok(()) => info!("save_loaded"),
                Err(error) => warn!(error = %error, "load_failed"),
            }
        }

        if input.pause_pressed() {
            self.sim.queue_command(SimCommand::TogglePause);
        }

        let mut controls = self.build_controls(input);

        // Menu and end screens restart on the interact key; the press must
        // not leak into the first simulated tick.
        if matches!(
            self.sim.phase,
            GamePhase::Menu | GamePhase::GameOver | GamePhase::Victory
        ) && controls.interact_pressed
        {
            self.sim.queue_command(SimCommand::NewGame);
            controls.interact_pressed = false;
        }

        self.sim.update(fixed_dt_seconds, &controls);
        SceneCommand::None
    }

    fn render(&mut self, frame: &mut DrawList) {
        self.sim.render(frame);
    }

    fn camera(&self) -> Camera2D {
        Camera2D {
            position: self.sim.player_position(),
        }
    }

    fn drain_sound_events(&mut self) -> Vec<SoundEvent> {
        self.sim.take_sounds()
    }

    fn hud_snapshot(&self) -> HudSnapshot {
        self.sim.hud()
    }

    fn unload(&mut self) {
        info!(
            level = %self.sim.level.name,
            entity_count = self.sim.entities.len(),
            "scene_unload"
        );
    }

    fn debug_title(&self) -> Option<String> {
        let position = self.sim.player_position();
        let hud = self.sim.hud();
        Some(format!(
            "Skulk | {} | {} | Player ({:.2}, {:.2}) | Spotted {}/{} | Entities {} | Ev {}",
            self.sim.level.label,
            hud.phase_label,
            position.x,
            position.y,
            hud.detections,
            hud.detection_limit,
            self.sim.entities.len(),
            self.sim.events.last_tick_count()
        ))
    }
}
