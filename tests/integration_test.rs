/// 視線系統綜合測試
///
/// 透過 State 跑完整的 ECS 流程：遮擋物實體、觀察者實體、每幀排程

use omb_los::*;
use specs::{Builder, Entity, WorldExt};
use std::time::Duration;
use vek::Vec2;

const DT: Duration = Duration::from_millis(10);

fn slow_settings() -> SchedulerSettings {
    SchedulerSettings {
        throttle_secs: 10.0,
        ..SchedulerSettings::default()
    }
}

fn spawn_pillar(state: &mut State, x: f32, y: f32, radius: f32) -> Entity {
    state
        .ecs_mut()
        .create_entity()
        .with(Pos(Vec2::new(x, y)))
        .with(Blocker::circle(radius))
        .build()
}

fn spawn_observer(state: &mut State, x: f32, y: f32) -> Entity {
    state
        .ecs_mut()
        .create_entity()
        .with(Pos(Vec2::new(x, y)))
        .with(Facing::new(0.0))
        .with(LineOfSight::new(FieldConfig::default().with_bins(360), slow_settings()))
        .build()
}

fn move_to(state: &mut State, entity: Entity, x: f32, y: f32) {
    let mut positions = state.ecs().write_storage::<Pos>();
    if let Some(pos) = positions.get_mut(entity) {
        pos.0 = Vec2::new(x, y);
    }
}

fn point_visible(state: &State, observer: Entity, point: Vec2<f32>) -> bool {
    let sights = state.ecs().read_storage::<LineOfSight>();
    sights.get(observer).unwrap().is_point_visible(point)
}

#[test]
fn test_first_tick_builds_then_reuses() {
    let mut state = State::new();
    spawn_pillar(&mut state, 5.0, 0.0, 1.0);
    let hero = spawn_observer(&mut state, 0.0, 0.0);

    state.tick(DT).unwrap();
    let stats = state.frame_stats();
    assert_eq!(stats.observers, 1);
    assert_eq!(stats.rebuilt, 1);
    assert_eq!(stats.occluders, 1);

    state.tick(DT).unwrap();
    let stats = state.frame_stats();
    assert_eq!(stats.rebuilt, 0);
    assert_eq!(stats.reused, 1);

    // 柱子後面看不到，旁邊看得到
    assert!(!point_visible(&state, hero, Vec2::new(10.0, 0.0)));
    assert!(point_visible(&state, hero, Vec2::new(0.0, 10.0)));
}

#[test]
fn test_moving_observer_rebuilds_field() {
    let mut state = State::new();
    spawn_pillar(&mut state, 5.0, 0.0, 1.0);
    let hero = spawn_observer(&mut state, 0.0, 0.0);
    state.tick(DT).unwrap();
    assert!(!point_visible(&state, hero, Vec2::new(10.0, 0.0)));

    // 走到柱子上方，原本被擋住的點就看得到了
    move_to(&mut state, hero, 10.0, 5.0);
    state.tick(DT).unwrap();
    assert_eq!(state.frame_stats().rebuilt, 1);
    assert!(point_visible(&state, hero, Vec2::new(10.0, 0.0)));
}

#[test]
fn test_new_blocker_triggers_rebuild() {
    let mut state = State::new();
    let hero = spawn_observer(&mut state, 0.0, 0.0);
    state.tick(DT).unwrap();
    assert!(point_visible(&state, hero, Vec2::new(0.0, 10.0)));

    spawn_pillar(&mut state, 0.0, 5.0, 1.0);
    state.tick(DT).unwrap();
    let stats = state.frame_stats();
    assert_eq!(stats.rebuilt, 1);
    assert!(!point_visible(&state, hero, Vec2::new(0.0, 10.0)));

    let sights = state.ecs().read_storage::<LineOfSight>();
    let sight = sights.get(hero).unwrap();
    assert_eq!(sight.scheduler.stats().last_reason, Some(RebuildReason::CandidateCount));
}

#[test]
fn test_removed_blocker_stops_occluding() {
    let mut state = State::new();
    let pillar = spawn_pillar(&mut state, 5.0, 0.0, 1.0);
    let hero = spawn_observer(&mut state, 0.0, 0.0);
    state.tick(DT).unwrap();
    assert!(!point_visible(&state, hero, Vec2::new(10.0, 0.0)));

    {
        let mut blockers = state.ecs().write_storage::<Blocker>();
        blockers.get_mut(pillar).unwrap().removed = true;
    }
    state.tick(DT).unwrap();
    assert_eq!(state.frame_stats().rebuilt, 1);
    assert!(point_visible(&state, hero, Vec2::new(10.0, 0.0)));
}

#[test]
fn test_omnivision_fails_open() {
    let mut state = State::new();
    spawn_pillar(&mut state, 5.0, 0.0, 1.0);
    let hero = spawn_observer(&mut state, 0.0, 0.0);
    state.tick(DT).unwrap();

    {
        let mut sights = state.ecs().write_storage::<LineOfSight>();
        sights.get_mut(hero).unwrap().set_omnivision(true);
    }
    state.tick(DT).unwrap();
    assert_eq!(state.frame_stats().omnivision, 1);
    assert!(point_visible(&state, hero, Vec2::new(10.0, 0.0)));

    let sights = state.ecs().read_storage::<LineOfSight>();
    let sight = sights.get(hero).unwrap();
    assert!(sight.field().is_empty());
    assert!(sight.silhouette().is_empty());
    let hidden = OccluderShape::Circle { center: Vec2::new(10.0, 0.0), radius: 0.5 };
    assert_eq!(sight.coverage_ratio(&hidden), 1.0);
}

#[test]
fn test_coverage_through_line_of_sight() {
    let mut state = State::new();
    spawn_pillar(&mut state, 5.0, 0.0, 1.0);
    let hero = spawn_observer(&mut state, 0.0, 0.0);
    state.tick(DT).unwrap();

    let sights = state.ecs().read_storage::<LineOfSight>();
    let sight = sights.get(hero).unwrap();

    let behind = OccluderShape::Circle { center: Vec2::new(12.0, 0.0), radius: 0.5 };
    assert!(sight.coverage_ratio(&behind) < 0.05, "柱子正後方應該幾乎看不到");

    let open = OccluderShape::Circle { center: Vec2::new(0.0, -8.0), radius: 0.5 };
    assert!(sight.coverage_ratio(&open) > 0.95, "空曠處應該完全可見");

    // 一半露在柱子外面
    let half = OccluderShape::Circle { center: Vec2::new(12.0, 2.4), radius: 1.0 };
    let ratio = sight.coverage_ratio(&half);
    assert!(ratio > 0.1 && ratio < 0.9, "部分遮蔽比例 {}", ratio);
}

#[test]
fn test_observer_is_not_blocked_by_own_blocker() {
    let mut state = State::new();
    let hero = state
        .ecs_mut()
        .create_entity()
        .with(Pos(Vec2::new(0.0, 0.0)))
        .with(Facing::new(0.0))
        .with(Blocker::circle(0.5))
        .with(LineOfSight::new(FieldConfig::default().with_bins(360), slow_settings()))
        .build();
    state.tick(DT).unwrap();

    let stats = state.frame_stats();
    assert_eq!(stats.occluders, 1);
    assert!(point_visible(&state, hero, Vec2::new(10.0, 3.0)));

    let sights = state.ecs().read_storage::<LineOfSight>();
    let sight = sights.get(hero).unwrap();
    assert!(sight.field().visible_owners().is_empty());
    assert!(sight.field().depths().iter().all(|d| d.is_infinite()));
}

#[test]
fn test_two_observers_are_independent() {
    let mut state = State::new();
    spawn_pillar(&mut state, 5.0, 0.0, 1.0);
    let left = spawn_observer(&mut state, 0.0, 0.0);
    let right = spawn_observer(&mut state, 10.0, 0.0);
    state.tick(DT).unwrap();
    assert_eq!(state.frame_stats().observers, 2);
    assert_eq!(state.frame_stats().rebuilt, 2);

    assert!(!point_visible(&state, left, Vec2::new(10.0, 0.0) + Vec2::new(2.0, 0.0)));
    assert!(!point_visible(&state, right, Vec2::new(-2.0, 0.0)));
    assert!(point_visible(&state, right, Vec2::new(12.0, 0.0)));

    move_to(&mut state, right, 10.0, 8.0);
    state.tick(DT).unwrap();
    let stats = state.frame_stats();
    assert_eq!(stats.rebuilt, 1);
    assert_eq!(stats.reused, 1);
}

#[test]
fn test_time_advances_per_tick() {
    let mut state = State::new();
    for _ in 0..5 {
        state.tick(DT).unwrap();
    }
    assert!((state.get_time() - 0.05).abs() < 1e-9);
    let stats = omb_los::state::TimeManager::get_time_stats(state.ecs());
    assert_eq!(stats.tick, 5);
}

#[test]
fn test_delta_time_is_capped_by_time_manager() {
    let mut state = State::with_time_manager(omb_los::state::TimeManager::with_config(0.05));
    state.tick(Duration::from_millis(200)).unwrap();
    let stats = omb_los::state::TimeManager::get_time_stats(state.ecs());
    assert!((stats.current_delta_time - 0.05).abs() < 1e-6);
    assert!((stats.total_game_time - 0.2).abs() < 1e-9);

    // 無效上限退回預設
    let mut state = State::with_time_manager(omb_los::state::TimeManager::with_config(-1.0));
    state.tick(Duration::from_millis(200)).unwrap();
    let stats = omb_los::state::TimeManager::get_time_stats(state.ecs());
    assert!((stats.current_delta_time - 0.2).abs() < 1e-6);
}
