use failure::{format_err, Error};
use log::{info, warn, LevelFilter};
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use serde::Serialize;
use specs::{Builder, Join, WorldExt};
use std::time::Duration;
use vek::Vec2;

use omb_los::config::CONFIG;
use omb_los::state::TimeManager;
use omb_los::*;

#[derive(Debug, Default, Serialize)]
struct DemoSummary {
    frames: u64,
    game_time: f64,
    builds: u64,
    reuses: u64,
    last_build_micros: u128,
    visible_owners: usize,
    silhouette_area: f32,
    silhouette_runs: usize,
    hidden_target_frames: u64,
}

fn init_logger() -> Result<(), Error> {
    if log4rs::init_file("log4rs.yml", Default::default()).is_ok() {
        return Ok(());
    }
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d(%H:%M:%S)} {l} {t} - {m}{n}")))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info))
        .map_err(|e| format_err!("log4rs config: {}", e))?;
    log4rs::init_config(config).map_err(|e| format_err!("log4rs init: {}", e))?;
    Ok(())
}

/// 佈置幾根柱子和一道牆
fn populate(state: &mut State) {
    let world = state.ecs_mut();
    for (x, y, r) in [(4.0, 0.0, 1.0), (-3.0, 3.0, 0.8), (0.0, -5.0, 1.2), (6.0, 6.0, 0.6)] {
        world
            .create_entity()
            .with(Pos(Vec2::new(x, y)))
            .with(Blocker::circle(r))
            .build();
    }
    let wall = Occluder::rectangle(OccluderId(0), Vec2::zero(), 6.0, 0.5, 0.4);
    world
        .create_entity()
        .with(Pos(Vec2::new(-7.0, -2.0)))
        .with(Blocker::new(wall.shape))
        .build();
}

fn main() -> Result<(), Error> {
    init_logger()?;
    let setting = &*CONFIG;
    info!("視線設定: {:?}", setting);

    let mut state = State::with_time_manager(TimeManager::with_config(setting.demo.max_delta_time));
    populate(&mut state);
    let sight = LineOfSight::new(setting.field_config(), setting.scheduler_settings())
        .with_query_slack(setting.los.query_slack)
        .with_far_distance(setting.los.far_distance);
    let hero = state
        .ecs_mut()
        .create_entity()
        .with(Pos(Vec2::new(setting.demo.walk_radius, 0.0)))
        .with(Facing::new(0.0))
        .with(sight)
        .build();

    let tps = setting.demo.tps.max(1);
    let dt = Duration::from_secs_f64(1.0 / tps as f64);
    let target = Vec2::new(0.0, 0.0);
    let mut summary = DemoSummary::default();

    for frame in 0..setting.demo.frames {
        // 沿著圓周繞場景中心走
        let theta = state.get_time() as f32 * 0.5;
        {
            let world = state.ecs();
            let mut positions = world.write_storage::<Pos>();
            let mut facings = world.write_storage::<Facing>();
            if let Some(pos) = positions.get_mut(hero) {
                pos.0 = Vec2::new(theta.cos(), theta.sin()) * setting.demo.walk_radius;
            }
            if let Some(facing) = facings.get_mut(hero) {
                *facing = Facing::new(theta + std::f32::consts::PI);
            }
        }

        state.tick(dt)?;

        let stats = state.frame_stats();
        let world = state.ecs();
        let sights = world.read_storage::<LineOfSight>();
        let sight = sights
            .get(hero)
            .ok_or_else(|| format_err!("observer {:?} lost its LineOfSight", hero))?;
        if !sight.is_point_visible(target) {
            summary.hidden_target_frames += 1;
        }
        if frame % tps == 0 {
            info!(
                "frame {} 重建={} 沿用={} 遮擋物={} 可見={}",
                frame,
                stats.rebuilt,
                stats.reused,
                stats.occluders,
                sight.field().visible_owners().len()
            );
        }
    }

    let world = state.ecs();
    let sights = world.read_storage::<LineOfSight>();
    for sight in (&sights).join() {
        let stats = sight.scheduler.stats();
        summary.builds += stats.build_count;
        summary.reuses += stats.reuse_count;
        summary.last_build_micros = stats.last_build_duration.as_micros();
        summary.visible_owners = sight.field().visible_owners().len();
        summary.silhouette_area = silhouette_area(&sight.silhouette());
        summary.silhouette_runs = sight.field().owner_runs().len();
    }
    summary.frames = setting.demo.frames;
    summary.game_time = state.get_time();

    if summary.builds == 0 && summary.frames > 0 {
        warn!("視線場一次都沒有建過");
    }
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
