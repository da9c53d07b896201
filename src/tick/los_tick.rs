use log::trace;
use specs::prelude::*;

use crate::comp::*;
use crate::vision::{Occluder, OccluderId, RecomputeOutcome};

/// 本幀視線系統統計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LosFrameStats {
    pub observers: u32,
    pub rebuilt: u32,
    pub reused: u32,
    pub omnivision: u32,
    pub occluders: u32,
}

/// 視線更新系統
///
/// 每幀收集所有遮擋物實體，交給每個觀察者自己的排程器決定是否重建。
#[derive(Default)]
pub struct LosTick;

impl LosTick {
    fn gather_occluders(
        entities: &Entities,
        blockers: &ReadStorage<Blocker>,
        positions: &ReadStorage<Pos>,
    ) -> Vec<Occluder> {
        (entities, blockers, positions.maybe())
            .join()
            .map(|(entity, blocker, pos)| Occluder {
                id: OccluderId::from(entity),
                shape: blocker.world_shape(pos),
                removed: blocker.removed,
            })
            .collect()
    }
}

impl<'a> System<'a> for LosTick {
    type SystemData = (
        Entities<'a>,
        Read<'a, Time>,
        ReadStorage<'a, Pos>,
        ReadStorage<'a, Facing>,
        ReadStorage<'a, Blocker>,
        WriteStorage<'a, LineOfSight>,
        Write<'a, LosFrameStats>,
    );

    fn run(&mut self, (entities, time, positions, facings, blockers, mut sights, mut stats): Self::SystemData) {
        let occluders = Self::gather_occluders(&entities, &blockers, &positions);
        let mut frame = LosFrameStats {
            occluders: occluders.len() as u32,
            ..Default::default()
        };

        for (entity, pos, facing, sight) in (&entities, &positions, facings.maybe(), &mut sights).join() {
            frame.observers += 1;
            let observer = sight.make_observer(pos, facing);

            // 觀察者本身若也是遮擋物，不能擋住自己
            let own = OccluderId::from(entity);
            let outcome = if blockers.contains(entity) {
                let others: Vec<Occluder> = occluders.iter().filter(|o| o.id != own).cloned().collect();
                sight.scheduler.update(time.0, Some(&observer), &others)
            } else {
                sight.scheduler.update(time.0, Some(&observer), &occluders)
            };
            sight.set_observer(Some(observer));

            match outcome {
                RecomputeOutcome::Rebuilt(reason) => {
                    trace!("{:?} 重建視線場: {:?}", entity, reason);
                    frame.rebuilt += 1;
                }
                RecomputeOutcome::Reused => frame.reused += 1,
                RecomputeOutcome::Omnivision => frame.omnivision += 1,
            }
        }

        *stats = frame;
    }
}
