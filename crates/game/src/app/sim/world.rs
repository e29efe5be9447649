/// The simulation core. Owns the entity table, the coarse game phase and the
/// event bus; everything mutates through `update` exactly once per tick.
#[derive(Debug)]
struct Simulation {
    level: LevelDef,
    entities: Vec<Entity>,
    player_id: EntityId,
    next_entity_id: u64,
    phase: GamePhase,
    alert_seconds_remaining: f32,
    objective_secured: bool,
    puzzle_session: Option<PuzzleSession>,
    pending_commands: Vec<SimCommand>,
    events: SimEventBus,
    sound_queue: Vec<SoundEvent>,
    prompt: Option<String>,
    note: Option<String>,
    footstep_accumulator: f32,
    tick_counter: u64,
}

impl Simulation {
    fn from_level(level: &LevelDef) -> Self {
        let mut sim = Self {
            level: level.clone(),
            entities: Vec::new(),
            player_id: EntityId(0),
            next_entity_id: 0,
            phase: GamePhase::Menu,
            alert_seconds_remaining: 0.0,
            objective_secured: false,
            puzzle_session: None,
            pending_commands: Vec::new(),
            events: SimEventBus::default(),
            sound_queue: Vec::new(),
            prompt: None,
            note: None,
            footstep_accumulator: 0.0,
            tick_counter: 0,
        };
        sim.spawn_level_entities();
        sim
    }

    fn spawn_level_entities(&mut self) {
        let level = self.level.clone();

        self.player_id = self.spawn(
            level.player_spawn,
            RenderLayer::Entities,
            EntityKind::Player(PlayerData::new()),
        );
        for guard in &level.guards {
            self.spawn(
                guard.position,
                RenderLayer::Entities,
                EntityKind::Guard(GuardData::new(guard.patrol.clone())),
            );
        }
        for camera in &level.cameras {
            let facing = camera_facing_from_def(camera.facing);
            self.spawn(
                camera.position,
                RenderLayer::Entities,
                EntityKind::Camera(CameraData::new(camera.position, facing, &level.tuning)),
            );
        }
        for door in &level.doors {
            self.spawn(
                door.position,
                RenderLayer::Entities,
                EntityKind::Door(DoorData {
                    open: door.open,
                    locked: door.locked,
                    puzzle: door.puzzle.as_ref().map(Puzzle::from_def),
                }),
            );
        }
        for ladder in &level.ladders {
            self.spawn(
                Vec2 {
                    x: ladder.x,
                    y: (ladder.bottom_y + ladder.top_y) * 0.5,
                },
                RenderLayer::World,
                EntityKind::Ladder(LadderData {
                    bottom_y: ladder.bottom_y,
                    top_y: ladder.top_y,
                }),
            );
        }
        for picture in &level.pictures {
            self.spawn(
                picture.position,
                RenderLayer::World,
                EntityKind::Picture(PictureData {
                    text: picture.text.clone(),
                }),
            );
        }
        for info in &level.infos {
            self.spawn(
                info.position,
                RenderLayer::World,
                EntityKind::Info(InfoData {
                    kind: info_kind_from_def(info.kind),
                    text: info.text.clone(),
                    objective: info.objective,
                    read: false,
                }),
            );
        }
        for pickup in &level.pickups {
            self.spawn(
                pickup.position,
                RenderLayer::World,
                EntityKind::Pickup(PickupData {
                    item: item_kind_from_def(pickup.item),
                    taken: false,
                }),
            );
        }
    }

    fn spawn(&mut self, position: Vec2, layer: RenderLayer, kind: EntityKind) -> EntityId {
        let id = EntityId(self.next_entity_id);
        self.next_entity_id = self.next_entity_id.saturating_add(1);
        self.entities.push(Entity {
            id,
            position,
            layer,
            visible: true,
            kind,
        });
        id
    }

    fn find_index(&self, id: EntityId) -> Option<usize> {
        self.entities.iter().position(|entity| entity.id == id)
    }

    fn find_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.id == id)
    }

    fn find_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|entity| entity.id == id)
    }

    fn player_position(&self) -> Vec2 {
        self.find_entity(self.player_id)
            .map(|entity| entity.position)
            .unwrap_or_default()
    }

    fn with_player<R>(&self, read: impl FnOnce(&PlayerData) -> R) -> Option<R> {
        self.find_entity(self.player_id)
            .and_then(Entity::as_player)
            .map(read)
    }

    fn with_player_mut<R>(&mut self, mutate: impl FnOnce(&mut PlayerData) -> R) -> Option<R> {
        let player_id = self.player_id;
        self.find_entity_mut(player_id)
            .and_then(Entity::as_player_mut)
            .map(mutate)
    }

    fn queue_command(&mut self, command: SimCommand) {
        self.pending_commands.push(command);
    }

    /// Commands arrive from outside the core (input, menus) and are applied
    /// only here, at the frame boundary, so no phase ever observes a
    /// half-applied request.
    fn apply_pending_commands(&mut self) {
        let commands = std::mem::take(&mut self.pending_commands);
        for command in commands {
            match command {
                SimCommand::NewGame => {
                    let level = self.level.clone();
                    *self = Simulation::from_level(&level);
                    self.phase = GamePhase::Playing;
                    info!(level = %self.level.name, "run_started");
                }
                SimCommand::TogglePause => match self.phase {
                    GamePhase::Playing => {
                        self.phase = GamePhase::Paused;
                        info!("paused");
                    }
                    GamePhase::Paused => {
                        self.phase = GamePhase::Playing;
                        info!("resumed");
                    }
                    _ => {}
                },
            }
        }
    }

    fn update(&mut self, dt_seconds: f32, controls: &ControlFrame) {
        self.apply_pending_commands();
        self.prompt = None;
        self.note = None;

        if self.phase != GamePhase::Playing {
            return;
        }
        self.tick_counter = self.tick_counter.saturating_add(1);

        let proposed_delta = self.run_behavior_phase(dt_seconds, controls);
        self.run_collision_phase(proposed_delta);
        self.run_detection_phase(dt_seconds);
        self.run_interaction_phase(controls);
        self.drain_events();
        self.check_victory();
    }

    // Phase 1: every animated entity advances its state machine and timers.
    // Player movement is only proposed here; the collision phase commits it.
    fn run_behavior_phase(&mut self, dt_seconds: f32, controls: &ControlFrame) -> Vec2 {
        if let Some(session) = &mut self.puzzle_session {
            session.tick_marker(dt_seconds);
        }

        let tuning = self.level.tuning;
        let session_open = self.puzzle_session.is_some();

        let climb_rail = self
            .with_player(|player| player.climbing_ladder)
            .flatten()
            .and_then(|ladder_id| {
                self.find_entity(ladder_id).and_then(|entity| match &entity.kind {
                    EntityKind::Ladder(ladder) => {
                        Some((entity.position.x, ladder.bottom_y, ladder.top_y))
                    }
                    _ => None,
                })
            });

        let mut proposed_delta = Vec2::default();
        if let Some(player_index) = self.find_index(self.player_id) {
            let entity = &mut self.entities[player_index];
            let position = &mut entity.position;
            if let EntityKind::Player(player) = &mut entity.kind {
                player.end_timed_state_if_expired(dt_seconds);

                if !session_open {
                    match player.state {
                        PlayerState::Climb => match climb_rail {
                            Some((rail_x, bottom_y, top_y)) => {
                                position.x = rail_x;
                                let dy = controls.move_dir.y * tuning.climb_speed * dt_seconds;
                                position.y = (position.y + dy).clamp(bottom_y, top_y);
                                let at_top = dy > 0.0 && position.y >= top_y;
                                let at_bottom = dy < 0.0 && position.y <= bottom_y;
                                if at_top || at_bottom {
                                    player.state = PlayerState::Idle;
                                    player.climbing_ladder = None;
                                }
                            }
                            None => {
                                player.state = PlayerState::Idle;
                                player.climbing_ladder = None;
                            }
                        },
                        PlayerState::Hit => {}
                        PlayerState::Idle | PlayerState::Run | PlayerState::Invisible => {
                            proposed_delta = Vec2 {
                                x: controls.move_dir.x * tuning.player_speed * dt_seconds,
                                y: controls.move_dir.y * tuning.player_speed * dt_seconds,
                            };
                            player.facing = Facing4::from_move_dir(controls.move_dir, player.facing);
                            let moving = controls.move_dir.x != 0.0 || controls.move_dir.y != 0.0;
                            if player.state != PlayerState::Invisible {
                                player.state = if moving {
                                    PlayerState::Run
                                } else {
                                    PlayerState::Idle
                                };
                            }
                        }
                    }
                }

                player.animator.set_clip(player.clip());
                player.animator.advance(dt_seconds, ANIM_FRAME_SECONDS);
            }
        }

        let player_position = self.player_position();
        let player_hittable = self
            .with_player(|player| {
                player.contact_cooldown <= 0.0 && player.state != PlayerState::Hit
            })
            .unwrap_or(false);

        let mut contact_guard: Option<EntityId> = None;
        for entity in &mut self.entities {
            match &mut entity.kind {
                EntityKind::Guard(guard) => {
                    match guard.state {
                        GuardState::Stunned => {
                            guard.state_seconds -= dt_seconds;
                            if guard.state_seconds <= 0.0 {
                                guard.state = GuardState::Patrol;
                                guard.state_seconds = 0.0;
                                guard.patrol_index = guard.nearest_patrol_index(entity.position);
                            }
                        }
                        GuardState::Patrol => {
                            if !guard.patrol.is_empty() {
                                // Consume the whole movement budget, hopping
                                // waypoints as they are reached so arrival
                                // ticks lose no distance.
                                let mut budget = tuning.patrol_speed * dt_seconds;
                                for _ in 0..=guard.patrol.len() {
                                    let target =
                                        guard.patrol[guard.patrol_index % guard.patrol.len()];
                                    guard.facing = FacingLr::from_dx(
                                        target.x - entity.position.x,
                                        guard.facing,
                                    );
                                    let distance = entity.position.distance_to(target);
                                    if distance <= budget {
                                        entity.position = target;
                                        guard.patrol_index =
                                            (guard.patrol_index + 1) % guard.patrol.len();
                                        budget -= distance;
                                        // Sub-millimeter residue is float
                                        // noise, not movement budget.
                                        if budget <= 1e-3 {
                                            break;
                                        }
                                    } else {
                                        let inv_distance = distance.recip();
                                        entity.position = Vec2 {
                                            x: entity.position.x
                                                + (target.x - entity.position.x)
                                                    * inv_distance
                                                    * budget,
                                            y: entity.position.y
                                                + (target.y - entity.position.y)
                                                    * inv_distance
                                                    * budget,
                                        };
                                        break;
                                    }
                                }
                            }
                        }
                        GuardState::Alert => {
                            guard.facing = FacingLr::from_dx(
                                guard.last_seen.x - entity.position.x,
                                guard.facing,
                            );
                            guard.state_seconds += dt_seconds;
                            if guard.state_seconds >= tuning.alert_seconds {
                                guard.state = GuardState::Chase;
                                guard.state_seconds = 0.0;
                            }
                        }
                        GuardState::Chase => {
                            guard.facing = FacingLr::from_dx(
                                guard.last_seen.x - entity.position.x,
                                guard.facing,
                            );
                            let (next, _) = step_toward(
                                entity.position,
                                guard.last_seen,
                                tuning.chase_speed,
                                dt_seconds,
                                0.1,
                            );
                            entity.position = next;
                            guard.state_seconds += dt_seconds;

                            let lost_distance = entity.position.distance_to(player_position)
                                > tuning.chase_break_distance;
                            let lost_time = guard.state_seconds > tuning.chase_timeout_seconds;
                            if lost_distance || lost_time {
                                guard.state = GuardState::Patrol;
                                guard.state_seconds = 0.0;
                                guard.patrol_index = guard.nearest_patrol_index(entity.position);
                            } else if player_hittable
                                && contact_guard.is_none()
                                && entity.position.distance_to(player_position)
                                    <= GUARD_CONTACT_RANGE
                            {
                                contact_guard = Some(entity.id);
                            }
                        }
                    }
                    guard.animator.set_clip(guard.clip());
                    guard.animator.advance(dt_seconds, ANIM_FRAME_SECONDS);
                }
                EntityKind::Camera(camera) => {
                    // The watch cycle runs on its own clock, alerted or not.
                    camera.animator.advance(dt_seconds, CAMERA_ANIM_FRAME_SECONDS);
                }
                _ => {}
            }
        }

        if let Some(guard_id) = contact_guard {
            let recover_seconds = tuning.hit_recover_seconds;
            self.with_player_mut(|player| player.begin_hit(recover_seconds));
            self.events.emit(SimEvent::PlayerHit { guard: guard_id });
        }

        proposed_delta
    }

    // Phase 2: commit proposed player movement against world bounds, walls and
    // closed doors, one axis at a time so sliding along a blocker works.
    fn run_collision_phase(&mut self, proposed_delta: Vec2) {
        if proposed_delta.x == 0.0 && proposed_delta.y == 0.0 {
            return;
        }

        let mut blockers: Vec<Rect> = self.level.walls.clone();
        for entity in &self.entities {
            if let EntityKind::Door(_) = &entity.kind {
                if let Some(footprint) = entity.bounding_box() {
                    blockers.push(footprint);
                }
            }
        }
        let bounds = self.level.bounds;

        let Some(player_index) = self.find_index(self.player_id) else {
            return;
        };
        let start = self.entities[player_index].position;
        let mut position = start;

        for (axis_dx, axis_dy) in [(proposed_delta.x, 0.0), (0.0, proposed_delta.y)] {
            if axis_dx == 0.0 && axis_dy == 0.0 {
                continue;
            }
            let candidate = Vec2 {
                x: position.x + axis_dx,
                y: position.y + axis_dy,
            };
            let footprint = Rect::from_center_half_extent(
                candidate,
                Vec2 {
                    x: PLAYER_HALF_EXTENT,
                    y: PLAYER_HALF_EXTENT,
                },
            );
            let in_bounds = bounds.contains(footprint.min) && bounds.contains(footprint.max);
            let blocked = blockers.iter().any(|blocker| footprint.overlaps(blocker));
            if in_bounds && !blocked {
                position = candidate;
            }
        }

        self.entities[player_index].position = position;

        self.footstep_accumulator += start.distance_to(position);
        while self.footstep_accumulator >= FOOTSTEP_STRIDE_WORLD {
            self.footstep_accumulator -= FOOTSTEP_STRIDE_WORLD;
            self.sound_queue.push(SoundEvent::Footstep);
        }
    }

    // Phase 3a: guards and cameras test for the player. Invisibility
    // suppresses every detection check outright.
    fn run_detection_phase(&mut self, dt_seconds: f32) {
        self.alert_seconds_remaining = (self.alert_seconds_remaining - dt_seconds).max(0.0);

        let player_position = self.player_position();
        let invisible = self
            .with_player(|player| player.state == PlayerState::Invisible)
            .unwrap_or(false);

        let Simulation {
            entities,
            level,
            events,
            ..
        } = self;

        if invisible {
            for entity in entities.iter_mut() {
                if let EntityKind::Camera(camera) = &mut entity.kind {
                    camera.alerted = false;
                }
            }
            return;
        }

        let tuning = level.tuning;
        for entity in entities.iter_mut() {
            match &mut entity.kind {
                EntityKind::Guard(guard) => {
                    if guard.state == GuardState::Stunned {
                        continue;
                    }
                    let seen = within_view_cone(
                        entity.position,
                        guard.facing,
                        player_position,
                        tuning.guard_view_range,
                        tuning.guard_view_half_angle_degrees,
                    ) && line_of_sight_clear(entity.position, player_position, &level.walls);
                    if !seen {
                        continue;
                    }
                    match guard.state {
                        GuardState::Patrol => {
                            guard.begin_alert(player_position, entity.position);
                            events.emit(SimEvent::Detected {
                                source: entity.id,
                                player_position,
                            });
                        }
                        GuardState::Alert => {
                            guard.last_seen = player_position;
                        }
                        GuardState::Chase => {
                            guard.last_seen = player_position;
                            guard.state_seconds = 0.0;
                        }
                        GuardState::Stunned => {}
                    }
                }
                EntityKind::Camera(camera) => {
                    let inside = point_in_triangle(player_position, &camera.fov);
                    if inside && !camera.alerted {
                        events.emit(SimEvent::Detected {
                            source: entity.id,
                            player_position,
                        });
                    }
                    camera.alerted = inside;
                }
                _ => {}
            }
        }
    }

    // Phase 3b: attacks, gadgets and at most one interactable per press —
    // the nearest one in range.
    fn run_interaction_phase(&mut self, controls: &ControlFrame) {
        if self.puzzle_session.is_some() {
            self.run_puzzle_session(controls);
            return;
        }

        if controls.melee_pressed {
            self.resolve_attack(false);
        }
        if controls.ranged_pressed {
            self.resolve_attack(true);
        }
        if controls.gadget_pressed {
            self.use_cloak();
        }

        let nearest = self.nearest_interactable();
        self.prompt = nearest.as_ref().map(|(_, prompt)| prompt.clone());
        if controls.interact_pressed {
            if let Some((target, _)) = nearest {
                self.interact_with(target);
            }
        }
    }

    fn run_puzzle_session(&mut self, controls: &ControlFrame) {
        let Some(mut session) = self.puzzle_session.take() else {
            return;
        };

        if controls.cancel_pressed {
            // Abort closes the puzzle UI without penalty; state stays as-is.
            return;
        }

        session.apply_navigation(controls);
        if !controls.interact_pressed {
            self.puzzle_session = Some(session);
            return;
        }

        let input = session.commit_input();
        let door_id = session.door_id;
        let outcome = self
            .find_entity_mut(door_id)
            .and_then(Entity::as_door_mut)
            .and_then(|door| door.puzzle.as_mut())
            .map(|puzzle| puzzle.solve(&input));

        match outcome {
            Some(SolveOutcome::Solved) => {
                self.sound_queue.push(SoundEvent::PuzzleSolved);
                self.events.emit(SimEvent::PuzzleSolved { door: door_id });
            }
            Some(SolveOutcome::WrongCode) => {
                self.puzzle_session = Some(session);
            }
            Some(SolveOutcome::WrongWire) => {
                self.sound_queue.push(SoundEvent::WireCut);
                self.events.emit(SimEvent::WrongWire { door: door_id });
                self.puzzle_session = Some(session);
            }
            // A missed pick closes the lock again; no penalty beyond retrying.
            Some(SolveOutcome::MissedPick) => {}
            Some(SolveOutcome::AlreadySolved) | None => {}
        }
    }

    fn resolve_attack(&mut self, ranged: bool) {
        let player_position = self.player_position();
        let can_attack = self
            .with_player(|player| {
                !matches!(player.state, PlayerState::Climb | PlayerState::Hit)
            })
            .unwrap_or(false);
        if !can_attack {
            return;
        }

        let tuning = self.level.tuning;
        let range = if ranged {
            tuning.ranged_range
        } else {
            tuning.melee_range
        };

        let mut best: Option<(f32, EntityId)> = None;
        for entity in &self.entities {
            if entity.as_guard().is_none() {
                continue;
            }
            let distance = player_position.distance_to(entity.position);
            if distance > range {
                continue;
            }
            if ranged
                && !line_of_sight_clear(player_position, entity.position, &self.level.walls)
            {
                continue;
            }
            let closer = match best {
                Some((best_distance, _)) => distance < best_distance,
                None => true,
            };
            if closer {
                best = Some((distance, entity.id));
            }
        }

        let Some((_, guard_id)) = best else {
            return;
        };
        let stun_seconds = tuning.stun_seconds;
        let stunned = self
            .find_entity_mut(guard_id)
            .and_then(Entity::as_guard_mut)
            .map(|guard| guard.take_hit(stun_seconds))
            .unwrap_or(false);
        if stunned {
            self.sound_queue.push(SoundEvent::Stun);
            self.events.emit(SimEvent::GuardStunned { guard: guard_id });
        }
    }

    fn use_cloak(&mut self) {
        let invisibility_seconds = self.level.tuning.invisibility_seconds;
        self.with_player_mut(|player| {
            if !matches!(player.state, PlayerState::Idle | PlayerState::Run) {
                return;
            }
            if player.remove_item(ItemKind::Cloak) {
                player.begin_invisible(invisibility_seconds);
            }
        });
    }

    /// Interaction eligibility is purely positional: in range or not.
    fn interaction_range_of(entity: &Entity) -> Option<f32> {
        match &entity.kind {
            EntityKind::Door(_) => Some(DOOR_INTERACT_RANGE),
            EntityKind::Ladder(_) => Some(LADDER_INTERACT_RANGE),
            EntityKind::Picture(_) => Some(PICTURE_INTERACT_RANGE),
            EntityKind::Info(_) => Some(INFO_INTERACT_RANGE),
            EntityKind::Pickup(pickup) => {
                if pickup.taken {
                    None
                } else {
                    Some(PICKUP_INTERACT_RANGE)
                }
            }
            _ => None,
        }
    }

    fn interaction_distance(&self, entity: &Entity, player_position: Vec2) -> f32 {
        match &entity.kind {
            EntityKind::Ladder(ladder) => distance_to_vertical_segment(
                player_position,
                entity.position.x,
                ladder.bottom_y,
                ladder.top_y,
            ),
            _ => player_position.distance_to(entity.position),
        }
    }

    fn prompt_for(entity: &Entity) -> String {
        match &entity.kind {
            EntityKind::Door(door) => {
                if door.locked {
                    match &door.puzzle {
                        Some(puzzle) if puzzle.is_solved() => "Unlock door".to_string(),
                        Some(Puzzle::CodeLock { .. }) => "Enter code".to_string(),
                        Some(Puzzle::LaserLock { .. }) => "Cut wires".to_string(),
                        Some(Puzzle::LockPick { .. }) => "Pick lock".to_string(),
                        None => "Sealed shut".to_string(),
                    }
                } else if door.open {
                    "Close door".to_string()
                } else {
                    "Open door".to_string()
                }
            }
            EntityKind::Ladder(_) => "Climb ladder".to_string(),
            EntityKind::Picture(_) => "Examine picture".to_string(),
            EntityKind::Info(info) => match info.kind {
                InfoKind::Note => "Read note".to_string(),
                InfoKind::Computer => "Use computer".to_string(),
            },
            EntityKind::Pickup(pickup) => format!("Take {}", pickup.item.label()),
            _ => String::new(),
        }
    }

    fn nearest_interactable(&self) -> Option<(EntityId, String)> {
        let player_position = self.player_position();
        let mut best: Option<(f32, EntityId, String)> = None;
        for entity in &self.entities {
            let Some(range) = Self::interaction_range_of(entity) else {
                continue;
            };
            let distance = self.interaction_distance(entity, player_position);
            if distance > range {
                continue;
            }
            let closer = match &best {
                Some((best_distance, _, _)) => distance < *best_distance,
                None => true,
            };
            if closer {
                best = Some((distance, entity.id, Self::prompt_for(entity)));
            }
        }
        best.map(|(_, id, prompt)| (id, prompt))
    }

    fn interact_with(&mut self, target: EntityId) {
        enum FollowUp {
            None,
            DoorToggled {
                open: bool,
            },
            DoorUnlocked,
            OpenSession(PuzzleSession),
            EnterClimb {
                rail_x: f32,
                bottom_y: f32,
                top_y: f32,
            },
            ExitClimb,
            ShowNote(String),
            GrantItem(ItemKind),
            SecureObjective(String),
        }

        let player_climbing = self
            .with_player(|player| player.state == PlayerState::Climb)
            .unwrap_or(false);

        let mut follow_up = FollowUp::None;
        let Some(entity) = self.find_entity_mut(target) else {
            return;
        };
        let entity_id = entity.id;
        let entity_position = entity.position;
        debug!(kind = entity.kind.tag(), id = entity_id.0, "interact_dispatched");

        match &mut entity.kind {
            EntityKind::Door(door) => {
                if door.locked {
                    match &door.puzzle {
                        Some(puzzle) if puzzle.is_solved() => {
                            // Solved earlier but never drained (e.g. restored
                            // from an older save): unlock on this interact.
                            door.locked = false;
                            follow_up = FollowUp::DoorUnlocked;
                        }
                        Some(puzzle) => {
                            follow_up =
                                FollowUp::OpenSession(PuzzleSession::open_for(entity_id, puzzle));
                        }
                        // A locked door without a puzzle never opens from here.
                        None => {}
                    }
                } else {
                    door.open = !door.open;
                    follow_up = FollowUp::DoorToggled { open: door.open };
                }
            }
            EntityKind::Ladder(ladder) => {
                follow_up = if player_climbing {
                    FollowUp::ExitClimb
                } else {
                    FollowUp::EnterClimb {
                        rail_x: entity_position.x,
                        bottom_y: ladder.bottom_y,
                        top_y: ladder.top_y,
                    }
                };
            }
            EntityKind::Picture(picture) => {
                // Idempotent: examining a picture only ever shows its text.
                follow_up = FollowUp::ShowNote(picture.text.clone());
            }
            EntityKind::Info(info) => {
                let first_read = !info.read;
                info.read = true;
                if first_read && info.objective {
                    follow_up = FollowUp::SecureObjective(info.text.clone());
                } else {
                    follow_up = FollowUp::ShowNote(info.text.clone());
                }
            }
            EntityKind::Pickup(pickup) => {
                if !pickup.taken {
                    pickup.taken = true;
                    entity.visible = false;
                    follow_up = FollowUp::GrantItem(pickup.item);
                }
            }
            _ => {}
        }

        match follow_up {
            FollowUp::None => {}
            FollowUp::DoorToggled { open } => {
                self.sound_queue.push(if open {
                    SoundEvent::DoorOpen
                } else {
                    SoundEvent::DoorClose
                });
            }
            FollowUp::DoorUnlocked => {
                self.events.emit(SimEvent::DoorUnlocked { door: entity_id });
            }
            FollowUp::OpenSession(session) => {
                self.puzzle_session = Some(session);
            }
            FollowUp::EnterClimb {
                rail_x,
                bottom_y,
                top_y,
            } => {
                let player_id = self.player_id;
                if let Some(player_entity) = self.find_entity_mut(player_id) {
                    player_entity.position.x = rail_x;
                    player_entity.position.y = player_entity.position.y.clamp(bottom_y, top_y);
                    if let EntityKind::Player(player) = &mut player_entity.kind {
                        player.begin_climb(target);
                    }
                }
            }
            FollowUp::ExitClimb => {
                self.with_player_mut(|player| {
                    player.state = PlayerState::Idle;
                    player.climbing_ladder = None;
                });
            }
            FollowUp::ShowNote(text) => {
                self.note = Some(text);
            }
            FollowUp::GrantItem(item) => {
                self.with_player_mut(|player| player.inventory.push(item));
                self.sound_queue.push(SoundEvent::Pickup);
                self.events.emit(SimEvent::ItemTaken { item });
            }
            FollowUp::SecureObjective(text) => {
                self.note = Some(text);
                self.objective_secured = true;
                self.with_player_mut(|player| player.inventory.push(ItemKind::Evidence));
                self.sound_queue.push(SoundEvent::Pickup);
                self.events.emit(SimEvent::ObjectiveSecured);
            }
        }
    }

    /// End-of-update drain. Events may append more events (door unlocks);
    /// processing continues until the queue is dry.
    fn drain_events(&mut self) {
        let mut pending = self.events.take_current();
        let mut cursor = 0usize;

        while cursor < pending.len() {
            let event = pending[cursor].clone();
            cursor = cursor.saturating_add(1);

            match event {
                SimEvent::Detected {
                    source,
                    player_position,
                } => {
                    let detections = self
                        .with_player_mut(|player| {
                            player.detections = player.detections.saturating_add(1);
                            player.detections
                        })
                        .unwrap_or(0);
                    debug!(source = source.0, detections, "player_detected");
                    self.alert_seconds_remaining = self.level.tuning.global_alert_seconds;
                    self.sound_queue.push(SoundEvent::Alarm);
                    self.propagate_alert(player_position);
                    if detections >= self.level.detection_limit {
                        self.phase = GamePhase::GameOver;
                        info!(detections, limit = self.level.detection_limit, "level_failed");
                    }
                }
                SimEvent::WrongWire { door } => {
                    let alarm_origin = self
                        .find_entity(door)
                        .map(|entity| entity.position)
                        .unwrap_or_else(|| self.player_position());
                    self.alert_seconds_remaining = self.level.tuning.global_alert_seconds;
                    self.sound_queue.push(SoundEvent::Alarm);
                    self.propagate_alert(alarm_origin);
                }
                SimEvent::PuzzleSolved { door } => {
                    if let Some(door_data) =
                        self.find_entity_mut(door).and_then(Entity::as_door_mut)
                    {
                        if door_data.locked {
                            door_data.locked = false;
                            pending.push(SimEvent::DoorUnlocked { door });
                        }
                    }
                }
                SimEvent::DoorUnlocked { door } => {
                    debug!(door = door.0, "door_unlocked");
                    self.sound_queue.push(SoundEvent::DoorUnlock);
                }
                SimEvent::GuardStunned { guard } => {
                    debug!(guard = guard.0, "guard_stunned");
                }
                SimEvent::PlayerHit { guard } => {
                    debug!(guard = guard.0, "player_hit");
                }
                SimEvent::ItemTaken { item } => {
                    debug!(item = item.label(), "item_taken");
                }
                SimEvent::ObjectiveSecured => {
                    info!("objective_secured");
                }
            }
        }
    }

    /// Guards on patrol inside the alert radius turn toward the disturbance.
    fn propagate_alert(&mut self, origin: Vec2) {
        let alert_radius = self.level.tuning.alert_radius;
        for entity in &mut self.entities {
            let position = entity.position;
            if let EntityKind::Guard(guard) = &mut entity.kind {
                if guard.state == GuardState::Patrol
                    && position.distance_to(origin) <= alert_radius
                {
                    guard.begin_alert(origin, position);
                }
            }
        }
    }

    fn check_victory(&mut self) {
        if self.phase != GamePhase::Playing || !self.objective_secured {
            return;
        }
        if self.level.exit.contains(self.player_position()) {
            self.phase = GamePhase::Victory;
            info!("level_complete");
        }
    }

    /// Pure read. The draw list is bucketed by layer and flushed in layer
    /// order; submission order inside a bucket preserves entity insertion
    /// order, which keeps draw order stable across frames.
    fn render(&self, frame: &mut DrawList) {
        let mut world_commands: Vec<DrawCommand> = Vec::new();
        let mut entity_commands: Vec<DrawCommand> = Vec::new();
        let mut ui_commands: Vec<DrawCommand> = Vec::new();

        world_commands.push(DrawCommand {
            renderable: Renderable::Placeholder {
                rgba: [40, 70, 46, 255],
            },
            center_world: self.level.exit.center(),
            half_extent_world: self.level.exit.half_extent(),
            layer: RenderLayer::World,
        });
        for wall in &self.level.walls {
            world_commands.push(DrawCommand {
                renderable: Renderable::Placeholder {
                    rgba: [70, 74, 86, 255],
                },
                center_world: wall.center(),
                half_extent_world: wall.half_extent(),
                layer: RenderLayer::World,
            });
        }

        for entity in &self.entities {
            if !entity.visible {
                continue;
            }
            let command = match &entity.kind {
                EntityKind::Player(player) => DrawCommand {
                    renderable: Renderable::Sprite(format!(
                        "sprites/player_{}_{}.png",
                        player.animator.clip.token(),
                        player.animator.frame
                    )),
                    center_world: entity.position,
                    half_extent_world: Vec2 {
                        x: PLAYER_HALF_EXTENT,
                        y: PLAYER_HALF_EXTENT,
                    },
                    layer: RenderLayer::Entities,
                },
                EntityKind::Guard(guard) => DrawCommand {
                    renderable: Renderable::Sprite(format!(
                        "sprites/guard_{}_{}.png",
                        guard.animator.clip.token(),
                        guard.animator.frame
                    )),
                    center_world: entity.position,
                    half_extent_world: Vec2 {
                        x: GUARD_HALF_EXTENT,
                        y: GUARD_HALF_EXTENT,
                    },
                    layer: RenderLayer::Entities,
                },
                EntityKind::Camera(camera) => DrawCommand {
                    renderable: Renderable::Sprite(format!(
                        "sprites/camera_{}.png",
                        camera.animator.frame
                    )),
                    center_world: entity.position,
                    half_extent_world: Vec2 {
                        x: CAMERA_HALF_EXTENT,
                        y: CAMERA_HALF_EXTENT,
                    },
                    layer: RenderLayer::Entities,
                },
                EntityKind::Door(door) => DrawCommand {
                    renderable: Renderable::Placeholder {
                        rgba: if door.locked {
                            [140, 90, 40, 255]
                        } else {
                            [120, 120, 70, 255]
                        },
                    },
                    center_world: entity.position,
                    half_extent_world: if door.open {
                        Vec2 { x: 0.1, y: 0.1 }
                    } else {
                        Vec2 {
                            x: DOOR_HALF_WIDTH,
                            y: DOOR_HALF_DEPTH_CLOSED,
                        }
                    },
                    layer: RenderLayer::Entities,
                },
                EntityKind::Ladder(ladder) => DrawCommand {
                    renderable: Renderable::Placeholder {
                        rgba: [110, 110, 120, 255],
                    },
                    center_world: entity.position,
                    half_extent_world: Vec2 {
                        x: 0.2,
                        y: (ladder.top_y - ladder.bottom_y) * 0.5,
                    },
                    layer: RenderLayer::World,
                },
                EntityKind::Picture(_) => DrawCommand {
                    renderable: Renderable::Placeholder {
                        rgba: [150, 130, 80, 255],
                    },
                    center_world: entity.position,
                    half_extent_world: Vec2 { x: 0.3, y: 0.3 },
                    layer: RenderLayer::World,
                },
                EntityKind::Info(_) => DrawCommand {
                    renderable: Renderable::Placeholder {
                        rgba: [90, 140, 150, 255],
                    },
                    center_world: entity.position,
                    half_extent_world: Vec2 { x: 0.3, y: 0.3 },
                    layer: RenderLayer::World,
                },
                EntityKind::Pickup(_) => DrawCommand {
                    renderable: Renderable::Placeholder {
                        rgba: [170, 170, 90, 255],
                    },
                    center_world: entity.position,
                    half_extent_world: Vec2 { x: 0.2, y: 0.2 },
                    layer: RenderLayer::World,
                },
            };
            match command.layer {
                RenderLayer::World => world_commands.push(command),
                RenderLayer::Entities => entity_commands.push(command),
                RenderLayer::Ui => ui_commands.push(command),
            }
        }

        // Alert markers over engaged guards and watching cameras.
        for entity in &self.entities {
            let alerted = match &entity.kind {
                EntityKind::Guard(guard) => {
                    matches!(guard.state, GuardState::Alert | GuardState::Chase)
                }
                EntityKind::Camera(camera) => camera.alerted,
                _ => false,
            };
            if alerted {
                ui_commands.push(DrawCommand {
                    renderable: Renderable::Placeholder {
                        rgba: [220, 60, 50, 255],
                    },
                    center_world: Vec2 {
                        x: entity.position.x,
                        y: entity.position.y + 0.7,
                    },
                    half_extent_world: Vec2 { x: 0.1, y: 0.15 },
                    layer: RenderLayer::Ui,
                });
            }
        }

        if let Some(session) = &self.puzzle_session {
            self.render_puzzle_session(session, &mut ui_commands);
        }

        for command in world_commands {
            frame.push(command);
        }
        for command in entity_commands {
            frame.push(command);
        }
        for command in ui_commands {
            frame.push(command);
        }
    }

    fn render_puzzle_session(&self, session: &PuzzleSession, ui_commands: &mut Vec<DrawCommand>) {
        let Some(anchor) = self.find_entity(session.door_id).map(|door| Vec2 {
            x: door.position.x,
            y: door.position.y + 1.2,
        }) else {
            return;
        };

        match &session.ui {
            PuzzleUi::Code { digits, cursor } => {
                for (index, _) in digits.iter().enumerate() {
                    let selected = index == *cursor;
                    ui_commands.push(DrawCommand {
                        renderable: Renderable::Placeholder {
                            rgba: if selected {
                                [240, 240, 150, 255]
                            } else {
                                [170, 170, 170, 255]
                            },
                        },
                        center_world: Vec2 {
                            x: anchor.x + (index as f32 - 1.5) * 0.5,
                            y: anchor.y,
                        },
                        half_extent_world: Vec2 { x: 0.18, y: 0.25 },
                        layer: RenderLayer::Ui,
                    });
                }
            }
            PuzzleUi::Wires {
                selected,
                wire_count,
            } => {
                for wire in 0..*wire_count {
                    let is_selected = wire == *selected;
                    ui_commands.push(DrawCommand {
                        renderable: Renderable::Placeholder {
                            rgba: if is_selected {
                                [240, 120, 120, 255]
                            } else {
                                [140, 140, 200, 255]
                            },
                        },
                        center_world: Vec2 {
                            x: anchor.x + (wire as f32 - (*wire_count as f32 - 1.0) * 0.5) * 0.4,
                            y: anchor.y,
                        },
                        half_extent_world: Vec2 { x: 0.1, y: 0.3 },
                        layer: RenderLayer::Ui,
                    });
                }
            }
            PuzzleUi::Pick { marker, .. } => {
                ui_commands.push(DrawCommand {
                    renderable: Renderable::Placeholder {
                        rgba: [90, 90, 90, 255],
                    },
                    center_world: anchor,
                    half_extent_world: Vec2 { x: 1.0, y: 0.1 },
                    layer: RenderLayer::Ui,
                });
                ui_commands.push(DrawCommand {
                    renderable: Renderable::Placeholder {
                        rgba: [240, 240, 150, 255],
                    },
                    center_world: Vec2 {
                        x: anchor.x - 1.0 + marker * 2.0,
                        y: anchor.y,
                    },
                    half_extent_world: Vec2 { x: 0.05, y: 0.18 },
                    layer: RenderLayer::Ui,
                });
            }
        }
    }

    fn take_sounds(&mut self) -> Vec<SoundEvent> {
        std::mem::take(&mut self.sound_queue)
    }

    fn hud(&self) -> HudSnapshot {
        HudSnapshot {
            phase_label: self.phase.label(),
            prompt: self.prompt.clone(),
            note: self.note.clone(),
            alert_active: self.alert_seconds_remaining > 0.0,
            detections: self.with_player(|player| player.detections).unwrap_or(0),
            detection_limit: self.level.detection_limit,
        }
    }
}

fn camera_facing_from_def(def: engine::CameraFacingDef) -> CameraFacing {
    match def {
        engine::CameraFacingDef::Left => CameraFacing::Left,
        engine::CameraFacingDef::Right => CameraFacing::Right,
        engine::CameraFacingDef::Down => CameraFacing::Down,
    }
}

fn info_kind_from_def(def: engine::InfoKindDef) -> InfoKind {
    match def {
        engine::InfoKindDef::Note => InfoKind::Note,
        engine::InfoKindDef::Computer => InfoKind::Computer,
    }
}

fn item_kind_from_def(def: engine::ItemKindDef) -> ItemKind {
    match def {
        engine::ItemKindDef::Cloak => ItemKind::Cloak,
    }
}
