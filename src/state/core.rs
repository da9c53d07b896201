/// 視線模擬狀態核心結構

use std::time::Duration;
use failure::Error;
use specs::{Dispatcher, DispatcherBuilder, World, WorldExt};

use crate::comp::*;
use crate::tick::*;

use super::TimeManager;

/// 視線模擬狀態：ECS 世界加上每幀要跑的系統
pub struct State {
    /// ECS 世界
    ecs: World,
    /// 系統分派器
    dispatcher: Dispatcher<'static, 'static>,
    /// 時間管理器
    time_manager: TimeManager,
}

impl State {
    /// 創建新的狀態
    pub fn new() -> Self {
        Self::with_time_manager(TimeManager::new())
    }

    pub fn with_time_manager(time_manager: TimeManager) -> Self {
        let mut ecs = World::new();

        // Register all components.
        ecs.register::<Pos>();
        ecs.register::<Facing>();
        ecs.register::<Blocker>();
        ecs.register::<LineOfSight>();

        ecs.insert(Time(0.0));
        ecs.insert(DeltaTime(0.0));
        ecs.insert(Tick(0));
        ecs.insert(LosFrameStats::default());

        // 視線場只有單一寫入者，這裡只有一個系統
        let mut dispatcher = DispatcherBuilder::new()
            .with(LosTick, "los", &[])
            .build();
        dispatcher.setup(&mut ecs);

        Self {
            ecs,
            dispatcher,
            time_manager,
        }
    }

    /// 主循環 tick
    pub fn tick(&mut self, dt: Duration) -> Result<(), Error> {
        // 更新時間管理
        self.time_manager.update(&mut self.ecs, dt)?;

        // 運行視線系統
        self.dispatcher.dispatch(&self.ecs);

        // 維護 ECS
        self.ecs.maintain();

        Ok(())
    }

    /// 獲取 ECS 世界引用
    pub fn ecs(&self) -> &World {
        &self.ecs
    }

    /// 獲取 ECS 世界可變引用
    pub fn ecs_mut(&mut self) -> &mut World {
        &mut self.ecs
    }

    /// 獲取遊戲時間
    pub fn get_time(&self) -> f64 {
        self.ecs.read_resource::<Time>().0
    }

    /// 最近一幀的視線統計
    pub fn frame_stats(&self) -> LosFrameStats {
        *self.ecs.read_resource::<LosFrameStats>()
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}
