/// 視線場建構器
///
/// 對每個分箱投射一條射線，記錄最近的遮擋距離與擁有者，再套用前方視野遮罩
use hashbrown::HashSet;
use instant::Instant;
use log::{trace, warn};
use serde::{Deserialize, Serialize};
use vek::Vec2;

use crate::vision::angle_math::{bin_center_angle, normalize_angle, AngularSpan};
use crate::vision::field::{
    Observer, Occluder, OccluderId, OccluderShape, VisibilityField, DEFAULT_BINS, MIN_BINS,
};
use crate::vision::geometry_utils::GeometryUtils;

/// 觀察者與圓心距離在 半徑+此值 以內時視為被包住
pub const CONTAINMENT_EPSILON: f32 = 1e-5;

/// 視野角小於 360 - 此值（度）才做遮罩
const FULL_CIRCLE_SLACK_DEGREES: f32 = 1e-3;

/// 建構參數
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// 分箱數，不小於 64
    pub bins: usize,
    /// 前方視野角（度），0..=360
    pub fov_degrees: f32,
    /// 遮罩面向角，None 時使用觀察者的面向
    pub facing_angle: Option<f32>,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            bins: DEFAULT_BINS,
            fov_degrees: 360.0,
            facing_angle: None,
        }
    }
}

impl FieldConfig {
    pub fn with_bins(mut self, bins: usize) -> Self {
        self.bins = bins;
        self
    }

    pub fn with_fov(mut self, fov_degrees: f32, facing_angle: f32) -> Self {
        self.fov_degrees = fov_degrees;
        self.facing_angle = Some(facing_angle);
        self
    }

    /// 修正超出範圍的值
    pub fn sanitized(self) -> Self {
        let mut cfg = self;
        if cfg.bins < MIN_BINS {
            warn!("bins {} 小於下限，改用 {}", cfg.bins, MIN_BINS);
            cfg.bins = MIN_BINS;
        }
        if !cfg.fov_degrees.is_finite() || cfg.fov_degrees > 360.0 {
            warn!("fov_degrees {} 無效，改用 360", cfg.fov_degrees);
            cfg.fov_degrees = 360.0;
        } else if cfg.fov_degrees < 0.0 {
            warn!("fov_degrees {} 為負，改用 0", cfg.fov_degrees);
            cfg.fov_degrees = 0.0;
        }
        if let Some(facing) = cfg.facing_angle {
            cfg.facing_angle = if facing.is_finite() { Some(normalize_angle(facing)) } else { None };
        }
        cfg
    }
}

/// 外形投射結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeTrace {
    /// 觀察者在圓內，沒有逐分箱結果
    Envelops,
    /// 已對外形邊界佔到的分箱逐一回報距離
    Traced,
}

/// 對外形邊界可能佔到的每個分箱投射射線，回報 (分箱, 距離)
///
/// 圓形用中心角±半角的扇區，多邊形每條邊（含首尾相接那條）用兩端點之間的最短弧。
/// 扇區一律經由 [`AngularSpan`] 建立，方向判斷與最短弧走訪才會一致。
/// 同一個分箱可能被回報多次（多邊形的多條邊），呼叫端自行取最小值。
pub fn trace_shape<F: FnMut(usize, f32)>(
    observer: &Observer,
    shape: &OccluderShape,
    bins: usize,
    mut visit: F,
) -> ShapeTrace {
    match shape {
        OccluderShape::Circle { center, radius } => {
            let local_center = observer.delta_to(*center);
            let center_dist = local_center.magnitude();
            if !center_dist.is_finite() {
                return ShapeTrace::Traced;
            }
            if center_dist <= radius + CONTAINMENT_EPSILON {
                return ShapeTrace::Envelops;
            }

            let center_angle = GeometryUtils::angle_of(local_center);
            let half_angle = (radius / center_dist).max(-1.0).min(1.0).asin();
            let span = AngularSpan::around(center_angle, half_angle);

            span.for_each_bin(bins, |bin| {
                let angle = bin_center_angle(bin, bins);
                if !span.contains(angle) {
                    return;
                }
                let dir = GeometryUtils::direction(angle);
                if let Some(t) = GeometryUtils::ray_circle_distance(Vec2::zero(), dir, local_center, *radius) {
                    visit(bin, t);
                }
            });
            ShapeTrace::Traced
        }
        OccluderShape::Polygon { vertices } => {
            let local: Vec<Vec2<f32>> = vertices.iter().map(|v| observer.delta_to(*v)).collect();
            let n = local.len();

            for i in 0..n {
                let a = local[i];
                let b = local[(i + 1) % n];
                let span = AngularSpan::between(GeometryUtils::angle_of(a), GeometryUtils::angle_of(b));
                span.for_each_bin(bins, |bin| {
                    let dir = GeometryUtils::direction(bin_center_angle(bin, bins));
                    if let Some(t) = GeometryUtils::ray_segment_distance(Vec2::zero(), dir, a, b) {
                        visit(bin, t);
                    }
                });
            }
            ShapeTrace::Traced
        }
    }
}

/// 視線場建構器
pub struct VisibilityFieldBuilder {
    config: FieldConfig,
}

/// 建構中的暫存
struct Scratch {
    depth: Vec<f32>,
    owner: Vec<Option<OccluderId>>,
}

impl Scratch {
    /// 只有更近才覆寫，平手時先寫入者勝
    #[inline]
    fn offer(&mut self, bin: usize, distance: f32, id: OccluderId) {
        if distance >= 0.0 && distance < self.depth[bin] {
            self.depth[bin] = distance;
            self.owner[bin] = Some(id);
        }
    }
}

impl VisibilityFieldBuilder {
    pub fn new(config: FieldConfig) -> Self {
        Self { config: config.sanitized() }
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    /// 建出新的視線場
    ///
    /// 沒有觀察者或沒有候選遮擋物時回傳全為 +∞ 的場。
    pub fn build(&self, observer: Option<&Observer>, occluders: &[Occluder]) -> VisibilityField {
        let started = Instant::now();
        let bins = self.config.bins;

        let observer = match observer {
            Some(obs) if obs.is_valid() => obs,
            _ => {
                let mut field = VisibilityField::unobstructed(bins);
                field.build_duration = started.elapsed();
                return field;
            }
        };

        let mut scratch = Scratch {
            depth: vec![f32::INFINITY; bins],
            owner: vec![None; bins],
        };

        for occluder in occluders {
            if !occluder.is_active() {
                trace!("略過無效或已移除的遮擋物 {:?}", occluder.id);
                continue;
            }
            let id = occluder.id;
            let trace = trace_shape(observer, &occluder.shape, bins, |bin, t| scratch.offer(bin, t, id));
            if trace == ShapeTrace::Envelops {
                // 觀察者被包住，所有方向都擋住；已經是 0 的分箱保留先寫入者
                for bin in 0..bins {
                    scratch.offer(bin, 0.0, id);
                }
            }
        }

        self.apply_fov_mask(observer, &mut scratch);

        let boundaries = Self::extract_boundaries(&scratch.owner);
        let visible_owners: HashSet<OccluderId> = scratch.owner.iter().flatten().copied().collect();

        VisibilityField {
            depth: scratch.depth,
            owner: scratch.owner,
            boundaries,
            visible_owners,
            build_duration: started.elapsed(),
        }
    }

    /// 前方視野外的分箱一律視為完全擋住
    fn apply_fov_mask(&self, observer: &Observer, scratch: &mut Scratch) {
        let half = match observer.fov_half_angle {
            Some(half) if half.is_finite() => half.max(0.0),
            _ => {
                if self.config.fov_degrees >= 360.0 - FULL_CIRCLE_SLACK_DEGREES {
                    return;
                }
                self.config.fov_degrees.to_radians() * 0.5
            }
        };
        if half >= std::f32::consts::PI {
            return;
        }

        let facing = self.config.facing_angle.unwrap_or(observer.facing);
        let bins = self.config.bins;
        for bin in 0..bins {
            let deviation = normalize_angle(bin_center_angle(bin, bins) - facing).abs();
            if deviation > half {
                scratch.depth[bin] = 0.0;
                scratch.owner[bin] = None;
            }
        }
    }

    /// 擁有者與環狀前一分箱不同者
    fn extract_boundaries(owner: &[Option<OccluderId>]) -> Vec<usize> {
        let n = owner.len();
        (0..n)
            .filter(|&i| owner[i] != owner[(i + n - 1) % n])
            .collect()
    }
}

impl Default for VisibilityFieldBuilder {
    fn default() -> Self {
        Self::new(FieldConfig::default())
    }
}
