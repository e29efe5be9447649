use super::*;
use engine::{LevelDatabase, Tuning};

fn base_level() -> LevelDef {
    LevelDef {
        id: engine::LevelId(0),
        name: "test_floor".to_string(),
        label: "Test Floor".to_string(),
        bounds: Rect {
            min: Vec2 { x: -50.0, y: -50.0 },
            max: Vec2 { x: 50.0, y: 50.0 },
        },
        exit: Rect {
            min: Vec2 { x: 40.0, y: 40.0 },
            max: Vec2 { x: 45.0, y: 45.0 },
        },
        player_spawn: Vec2 { x: 0.0, y: 0.0 },
        detection_limit: 3,
        tuning: Tuning::default(),
        walls: Vec::new(),
        guards: Vec::new(),
        cameras: Vec::new(),
        doors: Vec::new(),
        ladders: Vec::new(),
        pictures: Vec::new(),
        infos: Vec::new(),
        pickups: Vec::new(),
    }
}

fn playing_sim(level: &LevelDef) -> Simulation {
    let mut sim = Simulation::from_level(level);
    sim.phase = GamePhase::Playing;
    sim
}

fn advance(sim: &mut Simulation, steps: usize, dt: f32) {
    for _ in 0..steps {
        sim.update(dt, &ControlFrame::default());
    }
}

fn interact_controls() -> ControlFrame {
    ControlFrame {
        interact_pressed: true,
        ..ControlFrame::default()
    }
}

fn move_controls(x: f32, y: f32) -> ControlFrame {
    ControlFrame {
        move_dir: Vec2 { x, y },
        ..ControlFrame::default()
    }
}

fn guard_ids(sim: &Simulation) -> Vec<EntityId> {
    sim.entities
        .iter()
        .filter(|entity| entity.as_guard().is_some())
        .map(|entity| entity.id)
        .collect()
}

fn guard<'a>(sim: &'a Simulation, id: EntityId) -> &'a GuardData {
    sim.find_entity(id).and_then(Entity::as_guard).expect("guard")
}

fn guard_mut<'a>(sim: &'a mut Simulation, id: EntityId) -> &'a mut GuardData {
    sim.find_entity_mut(id)
        .and_then(Entity::as_guard_mut)
        .expect("guard")
}

fn door_ids(sim: &Simulation) -> Vec<EntityId> {
    sim.entities
        .iter()
        .filter(|entity| entity.as_door().is_some())
        .map(|entity| entity.id)
        .collect()
}

fn door<'a>(sim: &'a Simulation, id: EntityId) -> &'a DoorData {
    sim.find_entity(id).and_then(Entity::as_door).expect("door")
}

fn player<'a>(sim: &'a Simulation) -> &'a PlayerData {
    sim.find_entity(sim.player_id)
        .and_then(Entity::as_player)
        .expect("player")
}

fn player_mut<'a>(sim: &'a mut Simulation) -> &'a mut PlayerData {
    let player_id = sim.player_id;
    sim.find_entity_mut(player_id)
        .and_then(Entity::as_player_mut)
        .expect("player")
}

fn set_player_position(sim: &mut Simulation, position: Vec2) {
    let player_id = sim.player_id;
    sim.find_entity_mut(player_id).expect("player").position = position;
}

fn stationary_guard_at(position: Vec2) -> engine::GuardDef {
    engine::GuardDef {
        position,
        patrol: vec![position],
    }
}

fn locked_door_with(puzzle: engine::PuzzleDef, position: Vec2) -> engine::DoorDef {
    engine::DoorDef {
        position,
        open: false,
        locked: true,
        puzzle: Some(puzzle),
    }
}

// --- state machines ---

#[test]
fn take_hit_stuns_from_any_state() {
    let mut level = base_level();
    level.guards.push(stationary_guard_at(Vec2 { x: 5.0, y: 0.0 }));
    let mut sim = playing_sim(&level);
    let id = guard_ids(&sim)[0];

    for initial in [GuardState::Patrol, GuardState::Alert, GuardState::Chase] {
        let data = guard_mut(&mut sim, id);
        data.state = initial;
        assert!(data.take_hit(5.0));
        assert_eq!(data.state, GuardState::Stunned);
        assert_eq!(data.state_seconds, 5.0);
        data.state = GuardState::Patrol;
    }
}

#[test]
fn take_hit_on_stunned_guard_is_noop_and_keeps_timer() {
    let mut level = base_level();
    level.guards.push(stationary_guard_at(Vec2 { x: 5.0, y: 0.0 }));
    let mut sim = playing_sim(&level);
    let id = guard_ids(&sim)[0];

    let data = guard_mut(&mut sim, id);
    assert!(data.take_hit(5.0));
    data.state_seconds = 2.0;
    assert!(!data.take_hit(5.0));
    assert_eq!(data.state, GuardState::Stunned);
    assert_eq!(data.state_seconds, 2.0);
}

#[test]
fn stun_expires_back_to_patrol() {
    let mut level = base_level();
    level.guards.push(stationary_guard_at(Vec2 { x: 5.0, y: 0.0 }));
    let mut sim = playing_sim(&level);
    let id = guard_ids(&sim)[0];
    guard_mut(&mut sim, id).take_hit(0.25);

    advance(&mut sim, 3, 0.1);
    assert_eq!(guard(&sim, id).state, GuardState::Patrol);
}

#[test]
fn patrol_scenario_reaches_far_waypoint_after_ten_seconds() {
    let mut level = base_level();
    level.tuning.patrol_speed = 1.0;
    level.guards.push(engine::GuardDef {
        position: Vec2 { x: 0.0, y: 0.0 },
        patrol: vec![Vec2 { x: 0.0, y: 0.0 }, Vec2 { x: 10.0, y: 0.0 }],
    });
    // Keep the player far outside every view range.
    level.player_spawn = Vec2 { x: -40.0, y: -40.0 };
    let mut sim = playing_sim(&level);
    let id = guard_ids(&sim)[0];

    advance(&mut sim, 100, 0.1);

    let entity = sim.find_entity(id).expect("guard entity");
    assert!(
        (entity.position.x - 10.0).abs() < 0.01,
        "guard x was {}",
        entity.position.x
    );
    assert!(entity.position.y.abs() < 0.01);
    assert_eq!(guard(&sim, id).state, GuardState::Patrol);
    assert_eq!(guard(&sim, id).facing, FacingLr::Right);
}

#[test]
fn patrol_flips_facing_at_route_reversal() {
    let mut level = base_level();
    level.tuning.patrol_speed = 1.0;
    level.guards.push(engine::GuardDef {
        position: Vec2 { x: 0.0, y: 0.0 },
        patrol: vec![Vec2 { x: 0.0, y: 0.0 }, Vec2 { x: 2.0, y: 0.0 }],
    });
    level.player_spawn = Vec2 { x: -40.0, y: -40.0 };
    let mut sim = playing_sim(&level);
    let id = guard_ids(&sim)[0];

    advance(&mut sim, 10, 0.1);
    assert_eq!(guard(&sim, id).facing, FacingLr::Right);
    // Past the far end the guard walks back toward the first waypoint.
    advance(&mut sim, 15, 0.1);
    assert_eq!(guard(&sim, id).facing, FacingLr::Left);
}

#[test]
fn detection_goes_alert_then_chase_after_orientation_delay() {
    let mut level = base_level();
    level.guards.push(stationary_guard_at(Vec2 { x: 2.0, y: 0.0 }));
    let mut sim = playing_sim(&level);
    let id = guard_ids(&sim)[0];
    guard_mut(&mut sim, id).facing = FacingLr::Left;

    sim.update(0.1, &ControlFrame::default());
    assert_eq!(guard(&sim, id).state, GuardState::Alert);

    // Default orientation delay is 0.6 seconds.
    advance(&mut sim, 6, 0.1);
    assert_eq!(guard(&sim, id).state, GuardState::Chase);
}

#[test]
fn detection_counter_increments_only_on_first_sighting() {
    let mut level = base_level();
    level.guards.push(stationary_guard_at(Vec2 { x: 4.0, y: 0.0 }));
    let mut sim = playing_sim(&level);
    let id = guard_ids(&sim)[0];
    guard_mut(&mut sim, id).facing = FacingLr::Left;

    advance(&mut sim, 8, 0.1);
    assert_eq!(player(&sim).detections, 1);
}

#[test]
fn detection_limit_reached_is_game_over() {
    let mut level = base_level();
    level.detection_limit = 1;
    level.guards.push(stationary_guard_at(Vec2 { x: 2.0, y: 0.0 }));
    let mut sim = playing_sim(&level);
    let id = guard_ids(&sim)[0];
    guard_mut(&mut sim, id).facing = FacingLr::Left;

    sim.update(0.1, &ControlFrame::default());
    assert_eq!(sim.phase, GamePhase::GameOver);
}

#[test]
fn chase_breaks_off_to_nearest_waypoint_when_player_escapes() {
    let mut level = base_level();
    level.guards.push(engine::GuardDef {
        position: Vec2 { x: 9.0, y: 0.0 },
        patrol: vec![Vec2 { x: 0.0, y: 0.0 }, Vec2 { x: 9.5, y: 0.0 }],
    });
    let mut sim = playing_sim(&level);
    let id = guard_ids(&sim)[0];
    {
        let data = guard_mut(&mut sim, id);
        data.state = GuardState::Chase;
        data.last_seen = Vec2 { x: 10.0, y: 0.0 };
    }
    set_player_position(&mut sim, Vec2 { x: 30.0, y: 0.0 });

    sim.update(0.1, &ControlFrame::default());

    let data = guard(&sim, id);
    assert_eq!(data.state, GuardState::Patrol);
    assert_eq!(data.patrol_index, 1);
}

#[test]
fn chase_times_out_without_redetection() {
    let mut level = base_level();
    level.tuning.chase_timeout_seconds = 0.3;
    level.guards.push(stationary_guard_at(Vec2 { x: 3.0, y: 0.0 }));
    let mut sim = playing_sim(&level);
    let id = guard_ids(&sim)[0];
    {
        let data = guard_mut(&mut sim, id);
        data.state = GuardState::Chase;
        // Looking at a stale position; the player is out of the view cone.
        data.last_seen = Vec2 { x: 3.0, y: 2.0 };
        data.facing = FacingLr::Right;
    }

    advance(&mut sim, 5, 0.1);
    assert_eq!(guard(&sim, id).state, GuardState::Patrol);
}

#[test]
fn chasing_guard_contact_puts_player_in_hit_state() {
    let mut level = base_level();
    level.guards.push(stationary_guard_at(Vec2 { x: 0.5, y: 0.0 }));
    let mut sim = playing_sim(&level);
    let id = guard_ids(&sim)[0];
    {
        let data = guard_mut(&mut sim, id);
        data.state = GuardState::Chase;
        data.last_seen = Vec2 { x: 0.0, y: 0.0 };
    }

    sim.update(0.1, &ControlFrame::default());
    assert_eq!(player(&sim).state, PlayerState::Hit);

    // Hit recovery runs out and the player is controllable again.
    advance(&mut sim, 10, 0.1);
    assert_ne!(player(&sim).state, PlayerState::Hit);
}

#[test]
fn invisibility_suppresses_guard_and_camera_detection() {
    let mut level = base_level();
    level.guards.push(stationary_guard_at(Vec2 { x: 2.0, y: 0.0 }));
    level.cameras.push(engine::CameraDef {
        position: Vec2 { x: 0.0, y: 3.0 },
        facing: engine::CameraFacingDef::Down,
    });
    let mut sim = playing_sim(&level);
    let id = guard_ids(&sim)[0];
    guard_mut(&mut sim, id).facing = FacingLr::Left;
    player_mut(&mut sim).begin_invisible(10.0);

    advance(&mut sim, 10, 0.1);

    assert_eq!(guard(&sim, id).state, GuardState::Patrol);
    assert_eq!(player(&sim).detections, 0);
    let camera_alerted = sim
        .entities
        .iter()
        .find_map(|entity| match &entity.kind {
            EntityKind::Camera(camera) => Some(camera.alerted),
            _ => None,
        })
        .expect("camera");
    assert!(!camera_alerted);
}

#[test]
fn cloak_is_consumed_and_invisibility_expires() {
    let mut level = base_level();
    level.tuning.invisibility_seconds = 0.3;
    let mut sim = playing_sim(&level);
    player_mut(&mut sim).inventory.push(ItemKind::Cloak);

    sim.update(
        0.1,
        &ControlFrame {
            gadget_pressed: true,
            ..ControlFrame::default()
        },
    );
    assert_eq!(player(&sim).state, PlayerState::Invisible);
    assert!(!player(&sim).has_item(ItemKind::Cloak));

    advance(&mut sim, 4, 0.1);
    assert_eq!(player(&sim).state, PlayerState::Idle);
}

#[test]
fn gadget_without_cloak_is_noop() {
    let level = base_level();
    let mut sim = playing_sim(&level);

    sim.update(
        0.1,
        &ControlFrame {
            gadget_pressed: true,
            ..ControlFrame::default()
        },
    );
    assert_eq!(player(&sim).state, PlayerState::Idle);
}

#[test]
fn alert_propagates_only_within_radius() {
    let mut level = base_level();
    level.guards.push(stationary_guard_at(Vec2 { x: 3.0, y: 0.0 }));
    level.guards.push(stationary_guard_at(Vec2 { x: 0.0, y: 8.0 }));
    level.guards.push(stationary_guard_at(Vec2 { x: 0.0, y: 30.0 }));
    let mut sim = playing_sim(&level);
    let ids = guard_ids(&sim);
    guard_mut(&mut sim, ids[0]).facing = FacingLr::Left;

    sim.update(0.1, &ControlFrame::default());

    assert_eq!(guard(&sim, ids[0]).state, GuardState::Alert);
    assert_eq!(guard(&sim, ids[1]).state, GuardState::Alert);
    assert_eq!(guard(&sim, ids[2]).state, GuardState::Patrol);
}

// --- cameras ---

#[test]
fn camera_detects_on_entry_and_rearms_after_leaving() {
    let mut level = base_level();
    level.cameras.push(engine::CameraDef {
        position: Vec2 { x: 0.0, y: 3.0 },
        facing: engine::CameraFacingDef::Down,
    });
    let mut sim = playing_sim(&level);

    sim.update(0.1, &ControlFrame::default());
    assert_eq!(player(&sim).detections, 1);

    set_player_position(&mut sim, Vec2 { x: 20.0, y: 0.0 });
    sim.update(0.1, &ControlFrame::default());
    assert_eq!(player(&sim).detections, 1);

    set_player_position(&mut sim, Vec2 { x: 0.0, y: 0.0 });
    sim.update(0.1, &ControlFrame::default());
    assert_eq!(player(&sim).detections, 2);
}

#[test]
fn camera_animation_cycles_on_its_own_clock() {
    let mut level = base_level();
    level.cameras.push(engine::CameraDef {
        position: Vec2 { x: 30.0, y: 30.0 },
        facing: engine::CameraFacingDef::Down,
    });
    level.player_spawn = Vec2 { x: -40.0, y: -40.0 };
    let mut sim = playing_sim(&level);

    let frame_at = |sim: &Simulation| {
        sim.entities
            .iter()
            .find_map(|entity| match &entity.kind {
                EntityKind::Camera(camera) => Some(camera.animator.frame),
                _ => None,
            })
            .expect("camera")
    };

    assert_eq!(frame_at(&sim), 0);
    advance(&mut sim, 1, CAMERA_ANIM_FRAME_SECONDS);
    assert_eq!(frame_at(&sim), 1);
    advance(&mut sim, 1, CAMERA_ANIM_FRAME_SECONDS);
    assert_eq!(frame_at(&sim), 2);
    advance(&mut sim, 1, CAMERA_ANIM_FRAME_SECONDS);
    assert_eq!(frame_at(&sim), 0);
}

// --- attacks ---

#[test]
fn melee_stuns_adjacent_guard_only() {
    let mut level = base_level();
    level.guards.push(stationary_guard_at(Vec2 { x: 0.8, y: 0.0 }));
    level.guards.push(stationary_guard_at(Vec2 { x: 3.0, y: 0.0 }));
    let mut sim = playing_sim(&level);
    let ids = guard_ids(&sim);

    sim.update(
        0.1,
        &ControlFrame {
            melee_pressed: true,
            ..ControlFrame::default()
        },
    );

    assert_eq!(guard(&sim, ids[0]).state, GuardState::Stunned);
    assert_ne!(guard(&sim, ids[1]).state, GuardState::Stunned);
}

#[test]
fn ranged_attack_requires_line_of_sight() {
    let mut blocked_level = base_level();
    blocked_level.walls.push(Rect {
        min: Vec2 { x: 2.0, y: -1.0 },
        max: Vec2 { x: 2.5, y: 1.0 },
    });
    blocked_level
        .guards
        .push(stationary_guard_at(Vec2 { x: 4.0, y: 0.0 }));
    let mut blocked = playing_sim(&blocked_level);
    let blocked_id = guard_ids(&blocked)[0];

    blocked.update(
        0.1,
        &ControlFrame {
            ranged_pressed: true,
            ..ControlFrame::default()
        },
    );
    assert_ne!(guard(&blocked, blocked_id).state, GuardState::Stunned);

    let mut clear_level = base_level();
    clear_level
        .guards
        .push(stationary_guard_at(Vec2 { x: 4.0, y: 0.0 }));
    let mut clear = playing_sim(&clear_level);
    let clear_id = guard_ids(&clear)[0];

    clear.update(
        0.1,
        &ControlFrame {
            ranged_pressed: true,
            ..ControlFrame::default()
        },
    );
    assert_eq!(guard(&clear, clear_id).state, GuardState::Stunned);
}

// --- movement & collision ---

#[test]
fn walls_block_movement() {
    let mut level = base_level();
    level.walls.push(Rect {
        min: Vec2 { x: 0.4, y: -1.0 },
        max: Vec2 { x: 1.6, y: 1.0 },
    });
    let mut sim = playing_sim(&level);

    advance_with(&mut sim, 10, 0.1, move_controls(1.0, 0.0));
    let position = sim.player_position();
    assert!(position.x < 0.1, "player x was {}", position.x);
}

#[test]
fn closed_door_blocks_and_open_door_passes() {
    let mut level = base_level();
    level.doors.push(engine::DoorDef {
        position: Vec2 { x: 1.0, y: 0.0 },
        open: false,
        locked: false,
        puzzle: None,
    });
    let mut sim = playing_sim(&level);
    let door_id = door_ids(&sim)[0];

    advance_with(&mut sim, 10, 0.1, move_controls(1.0, 0.0));
    assert!(sim.player_position().x < 0.1);

    sim.find_entity_mut(door_id)
        .and_then(Entity::as_door_mut)
        .expect("door")
        .open = true;
    advance_with(&mut sim, 10, 0.1, move_controls(1.0, 0.0));
    assert!(sim.player_position().x > 2.0);
}

#[test]
fn world_bounds_clamp_movement() {
    let mut level = base_level();
    level.bounds = Rect {
        min: Vec2 { x: -2.0, y: -2.0 },
        max: Vec2 { x: 2.0, y: 2.0 },
    };
    level.exit = Rect {
        min: Vec2 { x: -2.0, y: -2.0 },
        max: Vec2 { x: -1.5, y: -1.5 },
    };
    let mut sim = playing_sim(&level);

    advance_with(&mut sim, 50, 0.1, move_controls(1.0, 0.0));
    assert!(sim.player_position().x <= 2.0 - PLAYER_HALF_EXTENT + 0.001);
}

fn advance_with(sim: &mut Simulation, steps: usize, dt: f32, controls: ControlFrame) {
    for _ in 0..steps {
        sim.update(dt, &controls);
    }
}

#[test]
fn running_emits_footsteps() {
    let level = base_level();
    let mut sim = playing_sim(&level);

    advance_with(&mut sim, 20, 0.1, move_controls(1.0, 0.0));
    let sounds = sim.take_sounds();
    assert!(sounds.contains(&SoundEvent::Footstep));
}

// --- interaction & doors ---

#[test]
fn unlocked_door_interact_toggles_open_then_closed() {
    let mut level = base_level();
    level.doors.push(engine::DoorDef {
        position: Vec2 { x: 1.0, y: 0.0 },
        open: false,
        locked: false,
        puzzle: None,
    });
    let mut sim = playing_sim(&level);
    let door_id = door_ids(&sim)[0];

    sim.update(0.1, &interact_controls());
    assert!(door(&sim, door_id).open);

    sim.update(0.1, &interact_controls());
    assert!(!door(&sim, door_id).open);

    let sounds = sim.take_sounds();
    assert!(sounds.contains(&SoundEvent::DoorOpen));
    assert!(sounds.contains(&SoundEvent::DoorClose));
}

#[test]
fn locked_door_interact_never_opens_directly() {
    let mut level = base_level();
    level.doors.push(locked_door_with(
        engine::PuzzleDef::CodeLock {
            code: "1234".to_string(),
        },
        Vec2 { x: 1.0, y: 0.0 },
    ));
    let mut sim = playing_sim(&level);
    let door_id = door_ids(&sim)[0];

    sim.update(0.1, &interact_controls());

    let data = door(&sim, door_id);
    assert!(!data.open);
    assert!(data.locked);
    assert!(sim.puzzle_session.is_some());
}

#[test]
fn sealed_door_without_puzzle_is_a_noop() {
    let mut level = base_level();
    level.doors.push(engine::DoorDef {
        position: Vec2 { x: 1.0, y: 0.0 },
        open: false,
        locked: true,
        puzzle: None,
    });
    let mut sim = playing_sim(&level);
    let door_id = door_ids(&sim)[0];

    sim.update(0.1, &interact_controls());

    assert!(!door(&sim, door_id).open);
    assert!(door(&sim, door_id).locked);
    assert!(sim.puzzle_session.is_none());
}

#[test]
fn interact_out_of_range_is_a_noop() {
    let mut level = base_level();
    level.doors.push(engine::DoorDef {
        position: Vec2 { x: 5.0, y: 0.0 },
        open: false,
        locked: false,
        puzzle: None,
    });
    let mut sim = playing_sim(&level);
    let door_id = door_ids(&sim)[0];

    sim.update(0.1, &interact_controls());

    assert!(!door(&sim, door_id).open);
    assert!(sim.hud().prompt.is_none());
}

#[test]
fn interact_dispatches_to_nearest_in_range_only() {
    let mut level = base_level();
    level.doors.push(engine::DoorDef {
        position: Vec2 { x: 1.0, y: 0.0 },
        open: false,
        locked: false,
        puzzle: None,
    });
    level.doors.push(engine::DoorDef {
        position: Vec2 { x: -0.8, y: 0.0 },
        open: false,
        locked: false,
        puzzle: None,
    });
    let mut sim = playing_sim(&level);
    let ids = door_ids(&sim);

    sim.update(0.1, &interact_controls());

    assert!(!door(&sim, ids[0]).open, "farther door must stay closed");
    assert!(door(&sim, ids[1]).open, "nearer door must open");
}

#[test]
fn picture_examine_is_idempotent() {
    let mut level = base_level();
    level.pictures.push(engine::PictureDef {
        position: Vec2 { x: 0.5, y: 0.0 },
        text: "A crooked frame.".to_string(),
    });
    let mut sim = playing_sim(&level);

    sim.update(0.1, &interact_controls());
    assert_eq!(sim.hud().note.as_deref(), Some("A crooked frame."));

    sim.update(0.1, &interact_controls());
    assert_eq!(sim.hud().note.as_deref(), Some("A crooked frame."));
}

#[test]
fn objective_computer_grants_evidence_exactly_once() {
    let mut level = base_level();
    level.infos.push(engine::InfoDef {
        position: Vec2 { x: 0.5, y: 0.0 },
        kind: engine::InfoKindDef::Computer,
        text: "Ledger copied.".to_string(),
        objective: true,
    });
    let mut sim = playing_sim(&level);

    sim.update(0.1, &interact_controls());
    assert!(sim.objective_secured);
    assert_eq!(
        player(&sim)
            .inventory
            .iter()
            .filter(|item| **item == ItemKind::Evidence)
            .count(),
        1
    );

    sim.update(0.1, &interact_controls());
    assert_eq!(
        player(&sim)
            .inventory
            .iter()
            .filter(|item| **item == ItemKind::Evidence)
            .count(),
        1
    );
}

#[test]
fn pickup_grants_item_and_hides_entity() {
    let mut level = base_level();
    level.pickups.push(engine::PickupDef {
        position: Vec2 { x: 0.5, y: 0.0 },
        item: engine::ItemKindDef::Cloak,
    });
    let mut sim = playing_sim(&level);

    sim.update(0.1, &interact_controls());

    assert!(player(&sim).has_item(ItemKind::Cloak));
    let pickup_entity = sim
        .entities
        .iter()
        .find(|entity| matches!(entity.kind, EntityKind::Pickup(_)))
        .expect("pickup");
    assert!(!pickup_entity.visible);

    // A taken pickup no longer advertises interaction.
    sim.update(0.1, &ControlFrame::default());
    assert!(sim.hud().prompt.is_none());
}

#[test]
fn ladder_interact_enters_climb_and_top_exit_leaves_it() {
    let mut level = base_level();
    level.ladders.push(engine::LadderDef {
        x: 0.5,
        bottom_y: -1.0,
        top_y: 2.0,
    });
    let mut sim = playing_sim(&level);

    sim.update(0.1, &interact_controls());
    assert_eq!(player(&sim).state, PlayerState::Climb);
    assert!((sim.player_position().x - 0.5).abs() < 0.001);

    // Eight ticks of climbing at 2.5 units/s cover the three-unit rail.
    advance_with(&mut sim, 8, 0.1, move_controls(0.0, 1.0));
    assert_eq!(player(&sim).state, PlayerState::Idle);
    assert!((sim.player_position().y - 2.0).abs() < 0.001);
}

// --- puzzles ---

#[test]
fn code_lock_solves_on_exact_match_only() {
    let mut puzzle = Puzzle::CodeLock {
        code: "1234".to_string(),
        state: PuzzleState::Unsolved,
    };
    assert_eq!(
        puzzle.solve(&PuzzleInput::Code("0000".to_string())),
        SolveOutcome::WrongCode
    );
    assert_eq!(puzzle.state(), PuzzleState::Unsolved);
    assert_eq!(
        puzzle.solve(&PuzzleInput::Code("1234".to_string())),
        SolveOutcome::Solved
    );
    assert_eq!(puzzle.state(), PuzzleState::Solved);
}

#[test]
fn solved_puzzle_is_monotonic_and_resolve_is_noop() {
    let mut puzzle = Puzzle::LaserLock {
        wire_count: 4,
        live_wire: 2,
        state: PuzzleState::Unsolved,
    };
    assert_eq!(puzzle.solve(&PuzzleInput::CutWire(2)), SolveOutcome::Solved);
    assert_eq!(
        puzzle.solve(&PuzzleInput::CutWire(0)),
        SolveOutcome::AlreadySolved
    );
    assert_eq!(puzzle.state(), PuzzleState::Solved);
}

#[test]
fn lock_pick_window_decides_outcome() {
    let mut inside = Puzzle::LockPick {
        window_start: 0.5,
        window_width: 0.2,
        state: PuzzleState::Unsolved,
    };
    assert_eq!(
        inside.solve(&PuzzleInput::StopPick(0.6)),
        SolveOutcome::Solved
    );

    let mut outside = Puzzle::LockPick {
        window_start: 0.5,
        window_width: 0.2,
        state: PuzzleState::Unsolved,
    };
    assert_eq!(
        outside.solve(&PuzzleInput::StopPick(0.2)),
        SolveOutcome::MissedPick
    );
    assert_eq!(outside.state(), PuzzleState::Unsolved);
}

#[test]
fn code_session_solves_door_and_unlock_fires_once() {
    let mut level = base_level();
    level.doors.push(locked_door_with(
        engine::PuzzleDef::CodeLock {
            code: "1234".to_string(),
        },
        Vec2 { x: 1.0, y: 0.0 },
    ));
    let mut sim = playing_sim(&level);
    let door_id = door_ids(&sim)[0];

    sim.update(0.1, &interact_controls());
    assert!(sim.puzzle_session.is_some());

    match &mut sim.puzzle_session {
        Some(PuzzleSession {
            ui: PuzzleUi::Code { digits, .. },
            ..
        }) => *digits = [1, 2, 3, 4],
        _ => panic!("expected code session"),
    }
    sim.update(0.1, &interact_controls());

    assert!(sim.puzzle_session.is_none());
    assert!(!door(&sim, door_id).locked);
    let sounds = sim.take_sounds();
    assert_eq!(
        sounds
            .iter()
            .filter(|sound| **sound == SoundEvent::DoorUnlock)
            .count(),
        1
    );

    // The unlocked door now toggles directly.
    sim.update(0.1, &interact_controls());
    assert!(door(&sim, door_id).open);
}

#[test]
fn wrong_code_keeps_session_open_and_door_locked() {
    let mut level = base_level();
    level.doors.push(locked_door_with(
        engine::PuzzleDef::CodeLock {
            code: "1234".to_string(),
        },
        Vec2 { x: 1.0, y: 0.0 },
    ));
    let mut sim = playing_sim(&level);
    let door_id = door_ids(&sim)[0];

    sim.update(0.1, &interact_controls());
    sim.update(0.1, &interact_controls());

    assert!(sim.puzzle_session.is_some());
    assert!(door(&sim, door_id).locked);
}

#[test]
fn wrong_wire_alerts_guards_and_leaves_puzzle_open_for_retry() {
    let mut level = base_level();
    level.doors.push(locked_door_with(
        engine::PuzzleDef::LaserLock {
            wire_count: 4,
            live_wire: 2,
        },
        Vec2 { x: 1.0, y: 0.0 },
    ));
    level.guards.push(stationary_guard_at(Vec2 { x: 6.0, y: 0.0 }));
    let mut sim = playing_sim(&level);
    let door_id = door_ids(&sim)[0];
    let guard_id = guard_ids(&sim)[0];

    sim.update(0.1, &interact_controls());
    // Default selection is wire 0, which is not the live wire.
    sim.update(0.1, &interact_controls());

    assert!(sim.puzzle_session.is_some());
    assert!(door(&sim, door_id).locked);
    assert_eq!(guard(&sim, guard_id).state, GuardState::Alert);
    assert!(sim.hud().alert_active);
    // The wrong wire raises the alarm but is not a sighting of the player.
    assert_eq!(player(&sim).detections, 0);

    match &mut sim.puzzle_session {
        Some(PuzzleSession {
            ui: PuzzleUi::Wires { selected, .. },
            ..
        }) => *selected = 2,
        _ => panic!("expected wire session"),
    }
    sim.update(0.1, &interact_controls());
    assert!(!door(&sim, door_id).locked);
}

#[test]
fn lock_pick_miss_closes_session_without_penalty() {
    let mut level = base_level();
    level.doors.push(locked_door_with(
        engine::PuzzleDef::LockPick {
            window_start: 0.55,
            window_width: 0.2,
        },
        Vec2 { x: 1.0, y: 0.0 },
    ));
    let mut sim = playing_sim(&level);
    let door_id = door_ids(&sim)[0];

    sim.update(0.1, &interact_controls());
    match &mut sim.puzzle_session {
        Some(PuzzleSession {
            ui: PuzzleUi::Pick { marker, .. },
            ..
        }) => *marker = 0.15,
        _ => panic!("expected pick session"),
    }
    sim.update(0.1, &interact_controls());

    assert!(sim.puzzle_session.is_none());
    assert!(door(&sim, door_id).locked);
    assert!(!sim.hud().alert_active);
}

#[test]
fn lock_pick_stop_inside_window_solves() {
    let mut level = base_level();
    level.doors.push(locked_door_with(
        engine::PuzzleDef::LockPick {
            window_start: 0.55,
            window_width: 0.2,
        },
        Vec2 { x: 1.0, y: 0.0 },
    ));
    let mut sim = playing_sim(&level);
    let door_id = door_ids(&sim)[0];

    sim.update(0.1, &interact_controls());
    match &mut sim.puzzle_session {
        Some(PuzzleSession {
            ui: PuzzleUi::Pick { marker, .. },
            ..
        }) => *marker = 0.6,
        _ => panic!("expected pick session"),
    }
    sim.update(0.1, &interact_controls());

    assert!(sim.puzzle_session.is_none());
    assert!(!door(&sim, door_id).locked);
}

#[test]
fn cancel_aborts_puzzle_session_without_state_change() {
    let mut level = base_level();
    level.doors.push(locked_door_with(
        engine::PuzzleDef::LockPick {
            window_start: 0.55,
            window_width: 0.2,
        },
        Vec2 { x: 1.0, y: 0.0 },
    ));
    let mut sim = playing_sim(&level);
    let door_id = door_ids(&sim)[0];

    sim.update(0.1, &interact_controls());
    assert!(sim.puzzle_session.is_some());

    sim.update(
        0.1,
        &ControlFrame {
            cancel_pressed: true,
            ..ControlFrame::default()
        },
    );

    assert!(sim.puzzle_session.is_none());
    assert!(door(&sim, door_id).locked);
}

#[test]
fn lock_pick_marker_sweeps_back_and_forth() {
    let mut session = PuzzleSession {
        door_id: EntityId(0),
        ui: PuzzleUi::Pick {
            marker: 0.0,
            rising: true,
        },
    };

    session.tick_marker(LOCKPICK_SWEEP_SECONDS);
    match &session.ui {
        PuzzleUi::Pick { marker, rising } => {
            assert!((*marker - 1.0).abs() < 0.001);
            assert!(!rising);
        }
        _ => panic!("expected pick ui"),
    }

    session.tick_marker(LOCKPICK_SWEEP_SECONDS * 0.5);
    match &session.ui {
        PuzzleUi::Pick { marker, rising } => {
            assert!((*marker - 0.5).abs() < 0.001);
            assert!(!rising);
        }
        _ => panic!("expected pick ui"),
    }
}

// --- phases, commands, victory ---

#[test]
fn menu_phase_ignores_movement_until_new_game() {
    let level = base_level();
    let mut sim = Simulation::from_level(&level);
    assert_eq!(sim.phase, GamePhase::Menu);

    advance_with(&mut sim, 5, 0.1, move_controls(1.0, 0.0));
    assert_eq!(sim.player_position().x, 0.0);

    sim.queue_command(SimCommand::NewGame);
    sim.update(0.1, &ControlFrame::default());
    assert_eq!(sim.phase, GamePhase::Playing);
}

#[test]
fn pause_command_applies_at_frame_boundary_and_freezes_update() {
    let mut level = base_level();
    level.guards.push(engine::GuardDef {
        position: Vec2 { x: 5.0, y: 5.0 },
        patrol: vec![Vec2 { x: 5.0, y: 5.0 }, Vec2 { x: 9.0, y: 5.0 }],
    });
    let mut sim = playing_sim(&level);
    let id = guard_ids(&sim)[0];

    sim.queue_command(SimCommand::TogglePause);
    sim.update(0.1, &move_controls(1.0, 0.0));

    assert_eq!(sim.phase, GamePhase::Paused);
    assert_eq!(sim.player_position().x, 0.0, "player must not move while paused");
    let guard_position = sim.find_entity(id).expect("guard").position;
    assert_eq!(guard_position.x, 5.0, "guard must not move while paused");

    sim.queue_command(SimCommand::TogglePause);
    sim.update(0.1, &move_controls(1.0, 0.0));
    assert_eq!(sim.phase, GamePhase::Playing);
    assert!(sim.player_position().x > 0.0);
}

#[test]
fn game_over_is_one_way_until_new_game() {
    let mut level = base_level();
    level.detection_limit = 1;
    level.guards.push(stationary_guard_at(Vec2 { x: 2.0, y: 0.0 }));
    let mut sim = playing_sim(&level);
    let id = guard_ids(&sim)[0];
    guard_mut(&mut sim, id).facing = FacingLr::Left;

    sim.update(0.1, &ControlFrame::default());
    assert_eq!(sim.phase, GamePhase::GameOver);

    advance(&mut sim, 5, 0.1);
    assert_eq!(sim.phase, GamePhase::GameOver);

    sim.queue_command(SimCommand::NewGame);
    sim.update(0.1, &ControlFrame::default());
    assert_eq!(sim.phase, GamePhase::Playing);
    assert_eq!(player(&sim).detections, 0);
}

#[test]
fn victory_requires_objective_before_exit() {
    let mut level = base_level();
    level.infos.push(engine::InfoDef {
        position: Vec2 { x: 0.5, y: 0.0 },
        kind: engine::InfoKindDef::Computer,
        text: "Ledger copied.".to_string(),
        objective: true,
    });
    let mut sim = playing_sim(&level);

    set_player_position(&mut sim, Vec2 { x: 42.0, y: 42.0 });
    sim.update(0.1, &ControlFrame::default());
    assert_eq!(sim.phase, GamePhase::Playing, "exit without objective is not a win");

    set_player_position(&mut sim, Vec2 { x: 0.0, y: 0.0 });
    sim.update(0.1, &interact_controls());
    assert!(sim.objective_secured);

    set_player_position(&mut sim, Vec2 { x: 42.0, y: 42.0 });
    sim.update(0.1, &ControlFrame::default());
    assert_eq!(sim.phase, GamePhase::Victory);
}

// --- rendering ---

#[test]
fn draw_list_is_layer_sorted_and_insertion_stable() {
    let mut level = base_level();
    level.walls.push(Rect {
        min: Vec2 { x: 3.0, y: 3.0 },
        max: Vec2 { x: 4.0, y: 4.0 },
    });
    level.guards.push(stationary_guard_at(Vec2 { x: 8.0, y: 8.0 }));
    level.guards.push(stationary_guard_at(Vec2 { x: 9.0, y: 8.0 }));
    let mut sim = playing_sim(&level);
    let ids = guard_ids(&sim);
    guard_mut(&mut sim, ids[0]).state = GuardState::Alert;

    let mut frame = DrawList::default();
    sim.render(&mut frame);

    let layers: Vec<u8> = frame
        .commands()
        .iter()
        .map(|command| command.layer.index())
        .collect();
    let mut sorted = layers.clone();
    sorted.sort();
    assert_eq!(layers, sorted, "draw list must be ordered by layer");

    let sprite_names: Vec<&str> = frame
        .commands()
        .iter()
        .filter_map(|command| match &command.renderable {
            Renderable::Sprite(key) => Some(key.as_str()),
            _ => None,
        })
        .collect();
    let player_at = sprite_names
        .iter()
        .position(|name| name.starts_with("sprites/player"))
        .expect("player sprite");
    let first_guard_at = sprite_names
        .iter()
        .position(|name| name.starts_with("sprites/guard"))
        .expect("guard sprite");
    assert!(
        player_at < first_guard_at,
        "entity draw order must follow spawn order"
    );
}

#[test]
fn render_is_a_pure_read() {
    let mut level = base_level();
    level.guards.push(stationary_guard_at(Vec2 { x: 8.0, y: 8.0 }));
    let sim = playing_sim(&level);
    let entities_before = sim.entities.clone();

    let mut frame = DrawList::default();
    sim.render(&mut frame);

    assert_eq!(sim.entities, entities_before);
}

// --- snapshot codec ---

fn rich_level() -> LevelDef {
    let mut level = base_level();
    level.guards.push(engine::GuardDef {
        position: Vec2 { x: 10.0, y: 0.0 },
        patrol: vec![Vec2 { x: 10.0, y: 0.0 }, Vec2 { x: 14.0, y: 0.0 }],
    });
    level.guards.push(engine::GuardDef {
        position: Vec2 { x: -10.0, y: 0.0 },
        patrol: vec![Vec2 { x: -10.0, y: 0.0 }, Vec2 { x: -14.0, y: 0.0 }],
    });
    level.cameras.push(engine::CameraDef {
        position: Vec2 { x: 0.0, y: 10.0 },
        facing: engine::CameraFacingDef::Down,
    });
    level.doors.push(locked_door_with(
        engine::PuzzleDef::CodeLock {
            code: "4711".to_string(),
        },
        Vec2 { x: 20.0, y: 0.0 },
    ));
    level.doors.push(engine::DoorDef {
        position: Vec2 { x: 22.0, y: 0.0 },
        open: false,
        locked: false,
        puzzle: None,
    });
    level.ladders.push(engine::LadderDef {
        x: -20.0,
        bottom_y: -2.0,
        top_y: 2.0,
    });
    level.pictures.push(engine::PictureDef {
        position: Vec2 { x: -22.0, y: 0.0 },
        text: "Crooked.".to_string(),
    });
    level.infos.push(engine::InfoDef {
        position: Vec2 { x: 24.0, y: 0.0 },
        kind: engine::InfoKindDef::Computer,
        text: "Ledger.".to_string(),
        objective: true,
    });
    level.pickups.push(engine::PickupDef {
        position: Vec2 { x: 26.0, y: 0.0 },
        item: engine::ItemKindDef::Cloak,
    });
    level
}

fn scrambled_sim(level: &LevelDef) -> Simulation {
    let mut sim = playing_sim(level);

    set_player_position(&mut sim, Vec2 { x: 3.3, y: -2.2 });
    {
        let data = player_mut(&mut sim);
        data.facing = Facing4::Left;
        data.state = PlayerState::Invisible;
        data.state_seconds = 1.25;
        data.detections = 2;
        data.contact_cooldown = 0.4;
        data.inventory = vec![ItemKind::Cloak, ItemKind::Evidence];
        data.animator.set_clip(AnimClip::Vanish);
        data.animator.advance(0.2, ANIM_FRAME_SECONDS);
    }

    let ids = guard_ids(&sim);
    {
        let data = guard_mut(&mut sim, ids[0]);
        data.take_hit(5.0);
        data.state_seconds = 2.5;
        data.animator.set_clip(AnimClip::Stunned);
    }
    {
        let data = guard_mut(&mut sim, ids[1]);
        data.state = GuardState::Chase;
        data.last_seen = Vec2 { x: 1.5, y: 0.5 };
        data.state_seconds = 0.75;
        data.patrol_index = 1;
        data.facing = FacingLr::Left;
        data.animator.set_clip(AnimClip::Chase);
        data.animator.advance(0.31, ANIM_FRAME_SECONDS);
    }

    for entity in &mut sim.entities {
        match &mut entity.kind {
            EntityKind::Camera(camera) => {
                camera.alerted = true;
                camera.animator.advance(0.5, CAMERA_ANIM_FRAME_SECONDS);
            }
            EntityKind::Door(door_data) => {
                if let Some(puzzle) = &mut door_data.puzzle {
                    puzzle.mark_solved();
                    door_data.locked = false;
                    door_data.open = true;
                }
            }
            EntityKind::Info(info) => {
                info.read = true;
            }
            EntityKind::Pickup(pickup) => {
                pickup.taken = true;
                entity.visible = false;
            }
            _ => {}
        }
    }

    sim.alert_seconds_remaining = 3.5;
    sim.objective_secured = true;
    sim.tick_counter = 123;
    sim.footstep_accumulator = 0.6;
    sim
}

#[test]
fn save_round_trip_reconstructs_every_entity_exactly() {
    let level = rich_level();
    let sim = scrambled_sim(&level);

    let save = sim.build_save_game().expect("save");
    let restored = Simulation::from_save_game(&save, &level).expect("restore");

    assert_eq!(restored.entities, sim.entities);
    assert_eq!(restored.phase, GamePhase::Playing);
    assert_eq!(
        restored.alert_seconds_remaining.to_bits(),
        sim.alert_seconds_remaining.to_bits()
    );
    assert_eq!(restored.objective_secured, sim.objective_secured);
    assert_eq!(restored.tick_counter, sim.tick_counter);
    assert_eq!(
        restored.footstep_accumulator.to_bits(),
        sim.footstep_accumulator.to_bits()
    );
}

#[test]
fn save_round_trip_survives_json_encoding() {
    let level = rich_level();
    let sim = scrambled_sim(&level);

    let save = sim.build_save_game().expect("save");
    let json = serde_json::to_string_pretty(&save).expect("encode");
    let parsed = parse_save_game_json(&json).expect("parse");
    let restored = Simulation::from_save_game(&parsed, &level).expect("restore");

    assert_eq!(restored.entities, sim.entities);
}

#[test]
fn climbing_player_round_trips_with_ladder_reference() {
    let level = rich_level();
    let mut sim = playing_sim(&level);
    let ladder_id = sim
        .entities
        .iter()
        .find(|entity| matches!(entity.kind, EntityKind::Ladder(_)))
        .map(|entity| entity.id)
        .expect("ladder");
    set_player_position(&mut sim, Vec2 { x: -20.0, y: 0.0 });
    player_mut(&mut sim).begin_climb(ladder_id);

    let save = sim.build_save_game().expect("save");
    let restored = Simulation::from_save_game(&save, &level).expect("restore");

    assert_eq!(restored.entities, sim.entities);
    assert_eq!(player(&restored).climbing_ladder, Some(ladder_id));
}

#[test]
fn corrupt_guard_record_degrades_only_that_guard() {
    let level = rich_level();
    let sim = scrambled_sim(&level);
    let mut save = sim.build_save_game().expect("save");
    save.guards[0].position.x = f32::NAN;

    let restored = Simulation::from_save_game(&save, &level).expect("restore");

    let ids = guard_ids(&restored);
    let first = guard(&restored, ids[0]);
    assert_eq!(first.state, GuardState::Patrol, "invalid record falls back to default");
    assert_eq!(
        restored.find_entity(ids[0]).expect("guard").position,
        level.guards[0].position
    );

    let second = guard(&restored, ids[1]);
    assert_eq!(second.state, GuardState::Chase, "valid sibling record still applies");
    assert_eq!(second.patrol_index, 1);
}

#[test]
fn out_of_range_patrol_index_falls_back_to_default() {
    let level = rich_level();
    let sim = scrambled_sim(&level);
    let mut save = sim.build_save_game().expect("save");
    save.guards[1].patrol_index = 99;

    let restored = Simulation::from_save_game(&save, &level).expect("restore");
    let ids = guard_ids(&restored);
    assert_eq!(guard(&restored, ids[1]).patrol_index, 0);
    assert_eq!(guard(&restored, ids[1]).state, GuardState::Patrol);
}

#[test]
fn save_version_mismatch_fails_whole_load() {
    let level = rich_level();
    let sim = playing_sim(&level);
    let mut save = sim.build_save_game().expect("save");
    save.save_version = 99;

    let error = Simulation::from_save_game(&save, &level).expect_err("must fail");
    assert!(error.contains("save_version"));
}

#[test]
fn level_name_mismatch_fails_whole_load() {
    let level = rich_level();
    let sim = playing_sim(&level);
    let mut save = sim.build_save_game().expect("save");
    save.level_name = "somewhere_else".to_string();

    assert!(Simulation::from_save_game(&save, &level).is_err());
}

#[test]
fn missing_trailing_records_keep_level_defaults() {
    let level = rich_level();
    let sim = scrambled_sim(&level);
    let mut save = sim.build_save_game().expect("save");
    save.guards.truncate(1);
    save.pickups.clear();

    let restored = Simulation::from_save_game(&save, &level).expect("restore");
    let ids = guard_ids(&restored);
    assert_eq!(guard(&restored, ids[1]).state, GuardState::Patrol);
    let pickup_taken = restored
        .entities
        .iter()
        .find_map(|entity| match &entity.kind {
            EntityKind::Pickup(pickup) => Some(pickup.taken),
            _ => None,
        })
        .expect("pickup");
    assert!(!pickup_taken);
}

#[test]
fn malformed_save_json_reports_path() {
    let error = parse_save_game_json("{\"save_version\": \"not a number\"}")
        .expect_err("must fail");
    assert!(error.contains("save_version"), "error was: {error}");
}

// --- scene-level save/load through the persistence store ---

#[test]
fn scene_saves_and_reloads_from_disk() {
    let temp = tempfile::TempDir::new().expect("tempdir");
    let context = SimContext {
        level_db: LevelDatabase::default(),
        save_dir: Some(temp.path().to_path_buf()),
    };
    let mut scene = StealthScene::new(context);
    scene.sim.phase = GamePhase::Playing;
    set_player_position(&mut scene.sim, Vec2 { x: -3.0, y: -4.5 });
    player_mut(&mut scene.sim).detections = 1;

    let path = scene.save_to_disk().expect("save");
    assert!(path.exists());

    set_player_position(&mut scene.sim, Vec2 { x: 0.0, y: 0.0 });
    player_mut(&mut scene.sim).detections = 0;

    scene.load_from_disk().expect("load");
    let position = scene.sim.player_position();
    assert_eq!(position, Vec2 { x: -3.0, y: -4.5 });
    assert_eq!(player(&scene.sim).detections, 1);
}

#[test]
fn scene_without_save_dir_reports_save_failure() {
    let context = SimContext {
        level_db: LevelDatabase::default(),
        save_dir: None,
    };
    let scene = StealthScene::new(context);
    assert!(scene.save_to_disk().is_err());
}

// --- geometry & helpers ---

#[test]
fn movement_dir_normalizes_diagonals() {
    let input = InputSnapshot::empty()
        .with_action_down(InputAction::MoveRight, true)
        .with_action_down(InputAction::MoveUp, true);
    let dir = movement_dir(&input);
    let magnitude = (dir.x * dir.x + dir.y * dir.y).sqrt();
    assert!((magnitude - 1.0).abs() < 0.0001);
}

#[test]
fn movement_dir_cancels_opposites() {
    let input = InputSnapshot::empty()
        .with_action_down(InputAction::MoveLeft, true)
        .with_action_down(InputAction::MoveRight, true);
    let dir = movement_dir(&input);
    assert_eq!(dir, Vec2 { x: 0.0, y: 0.0 });
}

#[test]
fn view_cone_respects_facing() {
    let guard_position = Vec2 { x: 0.0, y: 0.0 };
    let ahead = Vec2 { x: 3.0, y: 0.5 };
    let behind = Vec2 { x: -3.0, y: 0.5 };

    assert!(within_view_cone(guard_position, FacingLr::Right, ahead, 5.0, 40.0));
    assert!(!within_view_cone(guard_position, FacingLr::Right, behind, 5.0, 40.0));
    assert!(within_view_cone(guard_position, FacingLr::Left, behind, 5.0, 40.0));
    assert!(!within_view_cone(
        guard_position,
        FacingLr::Right,
        Vec2 { x: 10.0, y: 0.0 },
        5.0,
        40.0
    ));
}

#[test]
fn point_in_triangle_matches_camera_fov() {
    let tuning = Tuning::default();
    let fov = camera_fov(Vec2 { x: 0.0, y: 3.0 }, CameraFacing::Down, &tuning);
    assert!(point_in_triangle(Vec2 { x: 0.0, y: 0.0 }, &fov));
    assert!(!point_in_triangle(Vec2 { x: 5.0, y: 0.0 }, &fov));
    assert!(!point_in_triangle(Vec2 { x: 0.0, y: 4.0 }, &fov));
}

#[test]
fn segment_rect_intersection_detects_crossing_and_miss() {
    let wall = Rect {
        min: Vec2 { x: 1.0, y: -1.0 },
        max: Vec2 { x: 2.0, y: 1.0 },
    };
    assert!(segment_intersects_rect(
        Vec2 { x: 0.0, y: 0.0 },
        Vec2 { x: 3.0, y: 0.0 },
        &wall
    ));
    assert!(!segment_intersects_rect(
        Vec2 { x: 0.0, y: 2.0 },
        Vec2 { x: 3.0, y: 2.0 },
        &wall
    ));
}

#[test]
fn vertical_segment_distance_clamps_to_rungs() {
    let distance = distance_to_vertical_segment(Vec2 { x: 1.0, y: 5.0 }, 0.0, -2.0, 2.0);
    let expected = (1.0f32 * 1.0 + 3.0 * 3.0).sqrt();
    assert!((distance - expected).abs() < 0.0001);
}

#[test]
fn animator_advances_and_wraps_frames() {
    let mut animator = Animator::new(AnimClip::Run);
    animator.advance(ANIM_FRAME_SECONDS * 5.0, ANIM_FRAME_SECONDS);
    assert_eq!(animator.frame, 1, "4-frame clip wraps after five steps");
    assert!(animator.elapsed_seconds < ANIM_FRAME_SECONDS);
}

#[test]
fn animator_set_clip_resets_only_on_change() {
    let mut animator = Animator::new(AnimClip::Run);
    animator.advance(ANIM_FRAME_SECONDS, ANIM_FRAME_SECONDS);
    assert_eq!(animator.frame, 1);

    animator.set_clip(AnimClip::Run);
    assert_eq!(animator.frame, 1, "same clip keeps its frame");

    animator.set_clip(AnimClip::Hit);
    assert_eq!(animator.frame, 0, "new clip restarts");
}

#[test]
fn hud_reports_prompt_and_detections() {
    let mut level = base_level();
    level.doors.push(engine::DoorDef {
        position: Vec2 { x: 1.0, y: 0.0 },
        open: false,
        locked: false,
        puzzle: None,
    });
    let mut sim = playing_sim(&level);

    sim.update(0.1, &ControlFrame::default());
    let hud = sim.hud();
    assert_eq!(hud.prompt.as_deref(), Some("Open door"));
    assert_eq!(hud.phase_label, "playing");
    assert_eq!(hud.detection_limit, 3);
}
