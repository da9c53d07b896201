/// 時間管理器 - 負責推進遊戲時間

use std::time::Duration;
use specs::{World, WorldExt};
use failure::Error;

use crate::comp::{DeltaTime, Tick, Time};

/// 時間管理器
pub struct TimeManager {
    /// 最大增量時間
    max_delta_time: f32,
}

impl TimeManager {
    /// 創建新的時間管理器
    pub fn new() -> Self {
        Self {
            max_delta_time: 1.0, // 預設最大增量時間
        }
    }

    /// 使用自定義配置創建時間管理器
    pub fn with_config(max_delta_time: f32) -> Self {
        if !(max_delta_time > 0.0) || !max_delta_time.is_finite() {
            log::warn!("max_delta_time {} 無效，改用 1.0", max_delta_time);
            return Self::new();
        }
        Self { max_delta_time }
    }

    /// 更新時間系統
    pub fn update(&self, world: &mut World, dt: Duration) -> Result<(), Error> {
        {
            let mut time = world.write_resource::<Time>();
            time.0 += dt.as_secs_f64();
        }

        {
            let mut delta_time = world.write_resource::<DeltaTime>();
            delta_time.0 = dt.as_secs_f32().min(self.max_delta_time);
        }

        {
            let mut tick = world.write_resource::<Tick>();
            tick.0 += 1;
        }

        Ok(())
    }

    /// 獲取時間統計信息
    pub fn get_time_stats(world: &World) -> TimeStats {
        TimeStats {
            total_game_time: world.read_resource::<Time>().0,
            current_delta_time: world.read_resource::<DeltaTime>().0,
            tick: world.read_resource::<Tick>().0,
        }
    }
}

impl Default for TimeManager {
    fn default() -> Self {
        Self::new()
    }
}

/// 時間統計信息
#[derive(Debug, Clone)]
pub struct TimeStats {
    /// 總遊戲時間
    pub total_game_time: f64,
    /// 當前增量時間
    pub current_delta_time: f32,
    /// 已經過的 tick 數
    pub tick: u64,
}
