/// 視線場重算排程
///
/// 每幀判斷是否需要重建視線場：觀察者移動、轉向、候選遮擋物變動或超過更新間隔。
/// 持有目前唯一有效的視線場，重建完成後才整個替換。
use std::time::Duration;

use log::{debug, info, trace};
use serde::{Deserialize, Serialize};
use vek::Vec2;

use crate::vision::angle_math::normalize_angle;
use crate::vision::field::{Observer, Occluder, VisibilityField};
use crate::vision::field_builder::{FieldConfig, VisibilityFieldBuilder};

/// 排程參數
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    /// 移動超過此距離就重建
    pub move_epsilon: f32,
    /// 轉向超過此角度（弧度）就重建
    pub turn_epsilon: f32,
    /// 距上次重建超過此秒數就重建
    pub throttle_secs: f64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            move_epsilon: 0.03,
            turn_epsilon: 0.05,
            throttle_secs: 1.0 / 30.0, // 30 FPS 更新頻率
        }
    }
}

/// 重建原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RebuildReason {
    NoField,
    CandidateCount,
    CandidateSet,
    Moved,
    Turned,
    Throttle,
}

/// 單幀排程結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecomputeOutcome {
    Rebuilt(RebuildReason),
    Reused,
    /// 全視模式，不計算
    Omnivision,
}

/// 排程統計
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LosStats {
    pub build_count: u64,
    pub reuse_count: u64,
    pub last_build_duration: Duration,
    pub last_reason: Option<RebuildReason>,
}

/// 候選集合的順序無關雜湊
///
/// 只是便宜的變動偵測，碰撞頂多造成多一幀的過時結果。
pub fn candidate_set_hash(candidates: &[Occluder]) -> u64 {
    candidates
        .iter()
        .filter(|o| !o.removed)
        .fold(0u64, |acc, o| acc ^ mix(o.id.0))
}

#[inline]
fn mix(mut x: u64) -> u64 {
    x ^= x >> 33;
    x = x.wrapping_mul(0xff51_afd7_ed55_8ccd);
    x ^= x >> 33;
    x = x.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    x ^ (x >> 33)
}

/// 上次重建時的狀態
#[derive(Debug, Clone, Copy)]
struct Bookkeeping {
    position: Option<Vec2<f32>>,
    facing: f32,
    candidate_count: usize,
    candidate_hash: u64,
    built_at: f64,
}

/// 每個觀察者一份的重算排程器
pub struct RecomputeScheduler {
    builder: VisibilityFieldBuilder,
    settings: SchedulerSettings,
    omnivision: bool,
    last: Option<Bookkeeping>,
    field: VisibilityField,
    stats: LosStats,
}

impl RecomputeScheduler {
    pub fn new(config: FieldConfig, settings: SchedulerSettings) -> Self {
        Self {
            builder: VisibilityFieldBuilder::new(config),
            settings,
            omnivision: false,
            last: None,
            field: VisibilityField::empty(),
            stats: LosStats::default(),
        }
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    pub fn config(&self) -> &FieldConfig {
        self.builder.config()
    }

    /// 目前的視線場；全視模式或尚未建過時為空場
    pub fn field(&self) -> &VisibilityField {
        &self.field
    }

    pub fn has_field(&self) -> bool {
        self.last.is_some()
    }

    pub fn stats(&self) -> &LosStats {
        &self.stats
    }

    pub fn is_omnivision(&self) -> bool {
        self.omnivision
    }

    /// 切換全視模式，開啟時立即清掉快取
    pub fn set_omnivision(&mut self, enabled: bool) {
        if self.omnivision != enabled {
            info!("全視模式 {}", if enabled { "開啟" } else { "關閉" });
        }
        self.omnivision = enabled;
        if enabled {
            self.clear();
        }
    }

    /// 清掉快取的視線場與所有紀錄
    pub fn clear(&mut self) {
        self.last = None;
        self.field = VisibilityField::empty();
    }

    /// 每幀呼叫，必要時重建視線場
    pub fn update(&mut self, now: f64, observer: Option<&Observer>, candidates: &[Occluder]) -> RecomputeOutcome {
        if self.omnivision {
            self.clear();
            return RecomputeOutcome::Omnivision;
        }

        let count = candidates.iter().filter(|o| !o.removed).count();
        let hash = candidate_set_hash(candidates);

        match self.rebuild_reason(now, observer, count, hash) {
            Some(reason) => {
                let field = self.builder.build(observer, candidates);
                self.stats.build_count += 1;
                self.stats.last_build_duration = field.build_duration();
                self.stats.last_reason = Some(reason);
                debug!(
                    "重建視線場 {:?}: bins={} owners={} 耗時={:?}",
                    reason,
                    field.bins(),
                    field.visible_owners().len(),
                    field.build_duration()
                );

                self.field = field;
                self.last = Some(Bookkeeping {
                    position: observer.map(|o| o.position),
                    facing: observer.map(|o| o.facing).unwrap_or(0.0),
                    candidate_count: count,
                    candidate_hash: hash,
                    built_at: now,
                });
                RecomputeOutcome::Rebuilt(reason)
            }
            None => {
                self.stats.reuse_count += 1;
                trace!("沿用視線場");
                RecomputeOutcome::Reused
            }
        }
    }

    fn rebuild_reason(&self, now: f64, observer: Option<&Observer>, count: usize, hash: u64) -> Option<RebuildReason> {
        let last = match &self.last {
            Some(last) => last,
            None => return Some(RebuildReason::NoField),
        };

        if last.candidate_count != count {
            return Some(RebuildReason::CandidateCount);
        }
        if last.candidate_hash != hash {
            return Some(RebuildReason::CandidateSet);
        }

        match (last.position, observer) {
            (Some(prev), Some(obs)) => {
                if obs.delta_to(prev).magnitude() > self.settings.move_epsilon {
                    return Some(RebuildReason::Moved);
                }
                if normalize_angle(obs.facing - last.facing).abs() > self.settings.turn_epsilon {
                    return Some(RebuildReason::Turned);
                }
            }
            (None, None) => {}
            _ => return Some(RebuildReason::Moved),
        }

        if now - last.built_at > self.settings.throttle_secs {
            return Some(RebuildReason::Throttle);
        }
        None
    }
}

impl Default for RecomputeScheduler {
    fn default() -> Self {
        Self::new(FieldConfig::default(), SchedulerSettings::default())
    }
}
