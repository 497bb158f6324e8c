use parcelrun_game::{
    Biome, Collision, DayConfig, EventKind, GameConfig, GameEvent, GameSession, JsonFileScoreStore,
    MemoryScoreStore, MinigamePhase, ObstacleKind, ScoreRecord, ScoreStore, TargetId, TickInput,
    World, WorldPosition,
};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

const DT: f32 = 1.0 / 30.0;

fn grid_world(targets: u32, zones: u32) -> World {
    let positions: Vec<WorldPosition> = (0..targets)
        .map(|index| {
            let offset = f32::from(u16::try_from(index).unwrap()) * 12.0;
            WorldPosition::new(offset, 0.0, -offset)
        })
        .collect();
    World::from_positions(&positions, zones)
}

fn record_events(
    session: &GameSession<impl ScoreStore + 'static>,
    kinds: &[EventKind],
) -> Rc<RefCell<Vec<GameEvent>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    for kind in kinds {
        let sink = Rc::clone(&log);
        session.subscribe(*kind, move |event, _| sink.borrow_mut().push(*event));
    }
    log
}

fn assigned(session: &GameSession<impl ScoreStore + 'static>) -> TargetId {
    session
        .snapshot()
        .assigned_target()
        .expect("a target is assigned while the day runs")
}

/// Drive one delivery through proximity and the skill-check, steering the
/// needle with `steer` until the delivery completes.
fn deliver(
    session: &GameSession<impl ScoreStore + 'static>,
    mut steer: impl FnMut(f32, f32, f32) -> f32,
) -> TargetId {
    let target = assigned(session);
    session.vehicle_entered(target);
    session.vehicle_speed(target, 3.0);
    session.vehicle_speed(target, 0.02);
    session.interact_pressed();
    assert!(session.snapshot().is_minigame_active());

    for _ in 0..2_000 {
        let Some(check) = session.minigame_snapshot() else {
            break;
        };
        let axis = if check.phase() == MinigamePhase::Active {
            steer(
                check.needle_position(),
                check.needle_velocity(),
                check.safe_zone_center(),
            )
        } else {
            0.0
        };
        session.tick(DT, &TickInput { steer_axis: axis });
    }
    assert!(session.minigame_snapshot().is_none(), "skill-check never closed");
    target
}

fn chase_zone(needle: f32, velocity: f32, center: f32) -> f32 {
    ((center - needle) / 40.0 - velocity / 120.0).clamp(-1.0, 1.0)
}

fn scratch_path(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "parcelrun-flow-{label}-{}.json",
        std::process::id()
    ))
}

#[test]
fn opening_day_ends_after_quota_with_summed_tips() {
    let store = MemoryScoreStore::new();
    let session =
        GameSession::new(GameConfig::default(), grid_world(5, 6), store.clone(), 11).unwrap();
    let events = record_events(&session, &[EventKind::DayEnded]);

    session.start_day().unwrap();
    assert_eq!(session.snapshot().targets_for_day(), 3);
    for tip in [5, 12, 30] {
        for _ in 0..60 {
            session.tick(0.25, &TickInput::default());
        }
        let target = assigned(&session);
        session
            .bus()
            .publish(GameEvent::DeliveryCompleted { target, tip });
    }

    let state = session.snapshot();
    assert!(!state.is_day_active());
    assert_eq!(state.completed_today(), state.targets_for_day());
    assert!(state.assigned_target().is_none());
    assert_eq!(events.borrow().len(), 1);
    assert_eq!(
        store.records(),
        vec![ScoreRecord {
            time_taken: 45.0,
            tips_earned: 47
        }]
    );
}

#[test]
fn stale_completion_does_not_count() {
    let session =
        GameSession::new(GameConfig::default(), grid_world(4, 4), MemoryScoreStore::new(), 3)
            .unwrap();
    session.start_day().unwrap();
    let current = assigned(&session);
    let stale = TargetId(if current.0 == 0 { 1 } else { 0 });
    session.bus().publish(GameEvent::DeliveryCompleted {
        target: stale,
        tip: 40,
    });
    let state = session.snapshot();
    assert_eq!(state.completed_today(), 0);
    assert_eq!(state.tips_today(), 0);
    assert_eq!(state.assigned_target(), Some(current));
}

#[test]
fn quota_above_target_count_keeps_assigning() {
    let config = GameConfig {
        day: DayConfig {
            opening_day_quota: 3,
            opening_days: 0,
            quota_min: 7,
            quota_max: 7,
        },
        ..GameConfig::default()
    };
    let session = GameSession::new(config, grid_world(2, 3), MemoryScoreStore::new(), 5).unwrap();
    let assignments = record_events(&session, &[EventKind::DeliveryPointAssigned]);

    session.start_day().unwrap();
    assert_eq!(session.snapshot().targets_for_day(), 7);
    for _ in 0..6 {
        let target = assigned(&session);
        session
            .bus()
            .publish(GameEvent::DeliveryCompleted { target, tip: 5 });
        assert!(session.snapshot().assigned_target().is_some());
    }
    assert_eq!(assignments.borrow().len(), 7);

    let target = assigned(&session);
    session
        .bus()
        .publish(GameEvent::DeliveryCompleted { target, tip: 5 });
    assert!(!session.snapshot().is_day_active());
    assert_eq!(assignments.borrow().len(), 7);
}

#[test]
fn played_skill_checks_reward_tracking_the_zone() {
    let session =
        GameSession::new(GameConfig::default(), grid_world(3, 4), MemoryScoreStore::new(), 21)
            .unwrap();
    let completions = record_events(&session, &[EventKind::DeliveryCompleted]);
    session.start_day().unwrap();

    deliver(&session, chase_zone);
    deliver(&session, |_, _, _| 1.0);

    let tips: Vec<u32> = completions
        .borrow()
        .iter()
        .filter_map(|event| match event {
            GameEvent::DeliveryCompleted { tip, .. } => Some(*tip),
            _ => None,
        })
        .collect();
    assert_eq!(tips.len(), 2);
    assert!(tips.iter().all(|tip| (5..=40).contains(tip)));
    assert!(tips[0] > tips[1], "chasing {} vs pinned {}", tips[0], tips[1]);
}

#[test]
fn tutorial_delivery_fails_then_day_completes() {
    let store = MemoryScoreStore::new();
    let session =
        GameSession::new(GameConfig::default(), grid_world(4, 4), store.clone(), 8).unwrap();
    let events = record_events(
        &session,
        &[EventKind::DeliveryFailed, EventKind::DeliveryCompleted],
    );
    session.start_day().unwrap();

    for _ in 0..3 {
        deliver(&session, chase_zone);
    }
    let events = events.borrow();
    assert_eq!(events.len(), 4);
    assert!(matches!(events[2], GameEvent::DeliveryFailed { .. }));
    assert!(matches!(
        events[3],
        GameEvent::DeliveryCompleted { tip: 0, .. }
    ));
    assert_eq!(store.records().len(), 1);
    assert!(!session.snapshot().is_day_active());
}

#[test]
fn day_timer_stops_during_skill_check() {
    let session =
        GameSession::new(GameConfig::default(), grid_world(3, 3), MemoryScoreStore::new(), 2)
            .unwrap();
    session.start_day().unwrap();
    for _ in 0..30 {
        session.tick(DT, &TickInput::default());
    }
    let before = session.snapshot().total_time_today();
    deliver(&session, chase_zone);
    let after = session.snapshot().total_time_today();
    assert!((after - before).abs() < 1e-4);
}

#[test]
fn duplicate_completion_during_skill_check_cancels_it() {
    let session =
        GameSession::new(GameConfig::default(), grid_world(4, 4), MemoryScoreStore::new(), 6)
            .unwrap();
    session.start_day().unwrap();
    let first = assigned(&session);
    session.vehicle_entered(first);
    session.vehicle_speed(first, 3.0);
    session.vehicle_speed(first, 0.02);
    session.interact_pressed();
    assert!(session.minigame_snapshot().is_some());

    session.bus().publish(GameEvent::DeliveryCompleted {
        target: first,
        tip: 9,
    });
    let second = assigned(&session);
    assert_ne!(second, first);
    assert!(session.minigame_snapshot().is_none());
    assert!(!session.snapshot().is_minigame_active());

    let before = session.snapshot().total_time_today();
    for _ in 0..90 {
        session.tick(DT, &TickInput::default());
    }
    assert!(session.snapshot().total_time_today() > before + 2.9);

    session.vehicle_entered(second);
    session.vehicle_speed(second, 3.0);
    session.vehicle_speed(second, 0.02);
    session.interact_pressed();
    let check = session.minigame_snapshot().expect("check opens at the new target");
    assert_eq!(check.target(), second);
}

#[test]
fn corrupt_history_file_does_not_block_saving_days() {
    let path = scratch_path("corrupt");
    std::fs::write(&path, "{ not json").unwrap();

    let session =
        GameSession::with_defaults(grid_world(3, 3), JsonFileScoreStore::new(&path), 15).unwrap();
    assert!(session.history().scores.is_empty());
    session.start_day().unwrap();
    for tip in [5, 6, 7] {
        let target = assigned(&session);
        session
            .bus()
            .publish(GameEvent::DeliveryCompleted { target, tip });
    }
    drop(session);

    let resumed =
        GameSession::with_defaults(grid_world(3, 3), JsonFileScoreStore::new(&path), 16).unwrap();
    assert_eq!(resumed.history().scores.len(), 1);
    assert_eq!(resumed.history().scores[0].tips_earned, 18);
    assert_eq!(resumed.snapshot().current_day(), 1);
    let _ = std::fs::remove_file(&path);
    let _ = std::fs::remove_file(JsonFileScoreStore::new(&path).corrupt_path());
}

#[test]
fn hard_collision_at_speed_eight_costs_point_three_six() {
    let session =
        GameSession::new(GameConfig::default(), grid_world(2, 2), MemoryScoreStore::new(), 4)
            .unwrap();
    let hits = record_events(&session, &[EventKind::VehicleCollidedWithObstacle]);
    session.start_day().unwrap();
    session.obstacle_collision(Collision {
        obstacle: ObstacleKind::Hard,
        impact_speed: 8.0,
    });
    assert!((session.snapshot().vehicle_health() - 0.64).abs() < 1e-5);
    assert_eq!(hits.borrow().len(), 1);

    session.obstacle_collision(Collision {
        obstacle: ObstacleKind::Soft,
        impact_speed: 1.0,
    });
    assert_eq!(hits.borrow().len(), 1, "immunity window ignores the second hit");
}

#[test]
fn destruction_fires_once_and_rolls_the_day_back() {
    let store = MemoryScoreStore::with_records(vec![ScoreRecord {
        time_taken: 60.0,
        tips_earned: 33,
    }]);
    let session =
        GameSession::new(GameConfig::default(), grid_world(3, 3), store.clone(), 6).unwrap();
    let destroyed = record_events(&session, &[EventKind::VehicleDestroyed]);
    session.start_day().unwrap();
    assert_eq!(session.snapshot().current_day(), 2);

    for _ in 0..8 {
        session.obstacle_collision(Collision {
            obstacle: ObstacleKind::Hard,
            impact_speed: 10.0,
        });
        session.tick(0.6, &TickInput::default());
    }

    let state = session.snapshot();
    assert_eq!(destroyed.borrow().len(), 1);
    assert!(state.vehicle_health().abs() < f32::EPSILON);
    assert_eq!(state.current_day(), 1);
    assert!(!state.is_day_active());
    assert_eq!(store.records().len(), 1);
}

#[test]
fn repair_kit_restores_health_up_to_full() {
    let session =
        GameSession::new(GameConfig::default(), grid_world(2, 2), MemoryScoreStore::new(), 4)
            .unwrap();
    let kits = record_events(&session, &[EventKind::VehicleCollectedRepairKit]);
    session.start_day().unwrap();
    session.obstacle_collision(Collision {
        obstacle: ObstacleKind::Soft,
        impact_speed: 0.0,
    });
    session.collect_repair_kit();
    assert!((session.snapshot().vehicle_health() - 1.0).abs() < f32::EPSILON);
    assert_eq!(kits.borrow().len(), 1);
}

#[test]
fn biome_rotates_through_distinct_environments() {
    let session =
        GameSession::new(GameConfig::default(), grid_world(2, 5), MemoryScoreStore::new(), 99)
            .unwrap();
    let changes = record_events(&session, &[EventKind::BiomeChanged]);
    session.start_day().unwrap();
    for _ in 0..(30 * 300) {
        session.tick(DT, &TickInput::default());
    }
    let biomes: Vec<Biome> = changes
        .borrow()
        .iter()
        .filter_map(|event| match event {
            GameEvent::BiomeChanged { biome } => Some(*biome),
            _ => None,
        })
        .collect();
    assert_eq!(biomes[0], Biome::Normal);
    assert!(biomes.len() >= 7, "only {} switches in 300s", biomes.len());
    assert!(biomes.windows(2).all(|pair| pair[0] != pair[1]));
    assert_eq!(session.prop_plan().biome, *biomes.last().unwrap());
}

#[test]
fn json_history_carries_day_count_across_sessions() {
    let path = scratch_path("history");
    let _ = std::fs::remove_file(&path);

    let session =
        GameSession::with_defaults(grid_world(3, 3), JsonFileScoreStore::new(&path), 13).unwrap();
    session.start_day().unwrap();
    for tip in [7, 8, 9] {
        let target = assigned(&session);
        session
            .bus()
            .publish(GameEvent::DeliveryCompleted { target, tip });
    }
    drop(session);

    let resumed =
        GameSession::with_defaults(grid_world(3, 3), JsonFileScoreStore::new(&path), 14).unwrap();
    assert_eq!(resumed.snapshot().current_day(), 1);
    assert_eq!(resumed.history().scores[0].tips_earned, 24);
    resumed.start_day().unwrap();
    assert_eq!(resumed.snapshot().current_day(), 2);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn same_seed_replays_identically() {
    let run = |seed| {
        let session =
            GameSession::new(GameConfig::default(), grid_world(6, 6), MemoryScoreStore::new(), seed)
                .unwrap();
        let log = record_events(
            &session,
            &[EventKind::DeliveryPointAssigned, EventKind::BiomeChanged],
        );
        session.start_day().unwrap();
        for _ in 0..(30 * 120) {
            session.tick(DT, &TickInput::default());
        }
        let events = log.borrow().clone();
        (events, session.queued_targets(), session.biome_countdown())
    };
    assert_eq!(run(77), run(77));
    assert_ne!(run(77), run(78));
}
