use failure::{format_err, Error};
use lazy_static::lazy_static;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{ErrorKind, Read};

use crate::vision::{FieldConfig, SchedulerSettings, DEFAULT_BINS};

/// `[los]` 區段
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct LosSetting {
    pub bins: usize,
    pub fov_degrees: f32,
    pub facing_angle: Option<f32>,
    pub query_slack: f32,
    pub far_distance: f32,
}

impl Default for LosSetting {
    fn default() -> Self {
        Self {
            bins: DEFAULT_BINS,
            fov_degrees: 360.0,
            facing_angle: None,
            query_slack: 0.05,
            far_distance: 30.0,
        }
    }
}

/// `[scheduler]` 區段
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SchedulerSetting {
    pub move_epsilon: f32,
    pub turn_epsilon: f32,
    pub throttle_hz: f64,
}

impl Default for SchedulerSetting {
    fn default() -> Self {
        let base = SchedulerSettings::default();
        Self {
            move_epsilon: base.move_epsilon,
            turn_epsilon: base.turn_epsilon,
            throttle_hz: 1.0 / base.throttle_secs,
        }
    }
}

/// `[demo]` 區段，只有示範程式使用
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DemoSetting {
    pub tps: u64,
    pub frames: u64,
    pub walk_radius: f32,
    /// 單幀增量時間上限（秒）
    pub max_delta_time: f32,
}

impl Default for DemoSetting {
    fn default() -> Self {
        Self {
            tps: 60,
            frames: 600,
            walk_radius: 8.0,
            max_delta_time: 0.25,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Setting {
    pub los: LosSetting,
    pub scheduler: SchedulerSetting,
    pub demo: DemoSetting,
}

impl Setting {
    pub fn from_toml_str(content: &str) -> Result<Self, Error> {
        toml::from_str(content).map_err(|e| format_err!("Error parsing LOS config: {}", e))
    }

    /// 讀取設定檔；檔案不存在時使用預設值
    pub fn load(file_path: &str) -> Result<Self, Error> {
        let mut file = match File::open(file_path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("找不到 {}，使用預設視線設定", file_path);
                return Ok(Self::default());
            }
            Err(e) => return Err(format_err!("no such file {} exception:{}", file_path, e)),
        };
        let mut str_val = String::new();
        file.read_to_string(&mut str_val)
            .map_err(|e| format_err!("Error Reading LOS config: {}", e))?;
        Self::from_toml_str(&str_val)
    }

    /// 建構器參數，超出範圍的值會被修正
    pub fn field_config(&self) -> FieldConfig {
        FieldConfig {
            bins: self.los.bins,
            fov_degrees: self.los.fov_degrees,
            facing_angle: self.los.facing_angle,
        }
        .sanitized()
    }

    pub fn scheduler_settings(&self) -> SchedulerSettings {
        let base = SchedulerSettings::default();
        let throttle_secs = if self.scheduler.throttle_hz.is_finite() && self.scheduler.throttle_hz > 0.0 {
            1.0 / self.scheduler.throttle_hz
        } else {
            warn!("throttle_hz {} 無效，改用預設值", self.scheduler.throttle_hz);
            base.throttle_secs
        };
        SchedulerSettings {
            move_epsilon: non_negative(self.scheduler.move_epsilon, base.move_epsilon, "move_epsilon"),
            turn_epsilon: non_negative(self.scheduler.turn_epsilon, base.turn_epsilon, "turn_epsilon"),
            throttle_secs,
        }
    }
}

fn non_negative(value: f32, fallback: f32, name: &str) -> f32 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        warn!("{} {} 無效，改用 {}", name, value, fallback);
        fallback
    }
}

lazy_static! {
    pub static ref CONFIG: Setting = Setting::load("los.toml").unwrap_or_else(|e| {
        warn!("{}，使用預設視線設定", e);
        Setting::default()
    });
}
