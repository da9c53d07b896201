/// 視線場資料模型
///
/// 觀察者、遮擋物以及每幀建出的角度分箱視線場
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use specs::Entity;
use vek::Vec2;

use crate::vision::angle_math::{bin_center_angle, normalize_angle};
use crate::vision::geometry_utils::GeometryUtils;

/// 分箱數下限
pub const MIN_BINS: usize = 64;
/// 預設分箱數
pub const DEFAULT_BINS: usize = 1000;

/// 世界座標位移函數（可支援環形世界）
pub trait WorldMetric: Send + Sync {
    /// 從 `from` 指向 `to` 的位移
    fn delta(&self, from: Vec2<f32>, to: Vec2<f32>) -> Vec2<f32>;
}

/// 一般歐氏空間
#[derive(Debug, Clone, Copy, Default)]
pub struct Euclidean;

impl WorldMetric for Euclidean {
    fn delta(&self, from: Vec2<f32>, to: Vec2<f32>) -> Vec2<f32> {
        to - from
    }
}

/// 左右、上下相接的環形世界
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Toroidal {
    pub width: f32,
    pub height: f32,
}

impl Toroidal {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    fn wrap(d: f32, extent: f32) -> f32 {
        if !(extent > 0.0) || !extent.is_finite() {
            return d;
        }
        let r = d.rem_euclid(extent);
        if r > extent * 0.5 { r - extent } else { r }
    }
}

impl WorldMetric for Toroidal {
    fn delta(&self, from: Vec2<f32>, to: Vec2<f32>) -> Vec2<f32> {
        let d = to - from;
        Vec2::new(Self::wrap(d.x, self.width), Self::wrap(d.y, self.height))
    }
}

/// 觀察者
#[derive(Clone)]
pub struct Observer {
    pub position: Vec2<f32>,
    /// 面向角，(-π, π]
    pub facing: f32,
    /// 前方視野半角（弧度），None 表示使用設定值
    pub fov_half_angle: Option<f32>,
    /// 位移函數，None 表示歐氏相減
    pub metric: Option<Arc<dyn WorldMetric>>,
}

impl Observer {
    pub fn new(position: Vec2<f32>, facing: f32) -> Self {
        Self {
            position,
            facing: normalize_angle(facing),
            fov_half_angle: None,
            metric: None,
        }
    }

    pub fn with_fov_half_angle(mut self, half_angle: f32) -> Self {
        self.fov_half_angle = Some(half_angle);
        self
    }

    pub fn with_metric(mut self, metric: Arc<dyn WorldMetric>) -> Self {
        self.metric = Some(metric);
        self
    }

    /// 觀察者到 `point` 的位移
    pub fn delta_to(&self, point: Vec2<f32>) -> Vec2<f32> {
        match &self.metric {
            Some(metric) => metric.delta(self.position, point),
            None => point - self.position,
        }
    }

    pub fn is_valid(&self) -> bool {
        GeometryUtils::is_finite(self.position) && self.facing.is_finite()
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("position", &self.position)
            .field("facing", &self.facing)
            .field("fov_half_angle", &self.fov_half_angle)
            .field("wraps", &self.metric.is_some())
            .finish()
    }
}

/// 遮擋物的不透明識別碼，只用來比較與集合成員判斷
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OccluderId(pub u64);

impl From<Entity> for OccluderId {
    fn from(entity: Entity) -> Self {
        OccluderId(((entity.gen().id() as u32 as u64) << 32) | entity.id() as u64)
    }
}

/// 遮擋物外形
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OccluderShape {
    Circle { center: Vec2<f32>, radius: f32 },
    /// 封閉頂點環，至少兩點
    Polygon { vertices: Vec<Vec2<f32>> },
}

impl OccluderShape {
    pub fn is_valid(&self) -> bool {
        match self {
            OccluderShape::Circle { center, radius } => {
                GeometryUtils::is_finite(*center) && radius.is_finite() && *radius > 0.0
            }
            OccluderShape::Polygon { vertices } => {
                vertices.len() >= 2 && vertices.iter().all(|v| GeometryUtils::is_finite(*v))
            }
        }
    }

    pub fn centroid(&self) -> Option<Vec2<f32>> {
        match self {
            OccluderShape::Circle { center, .. } => Some(*center),
            OccluderShape::Polygon { vertices } => GeometryUtils::vertex_centroid(vertices),
        }
    }
}

/// 遮擋物
#[derive(Debug, Clone, PartialEq)]
pub struct Occluder {
    pub id: OccluderId,
    pub shape: OccluderShape,
    /// 已被移除的遮擋物不參與計算
    pub removed: bool,
}

impl Occluder {
    pub fn new(id: OccluderId, shape: OccluderShape) -> Self {
        Self { id, shape, removed: false }
    }

    pub fn circle(id: OccluderId, center: Vec2<f32>, radius: f32) -> Self {
        Self::new(id, OccluderShape::Circle { center, radius })
    }

    pub fn polygon(id: OccluderId, vertices: Vec<Vec2<f32>>) -> Self {
        Self::new(id, OccluderShape::Polygon { vertices })
    }

    /// 單段牆
    pub fn segment(id: OccluderId, start: Vec2<f32>, end: Vec2<f32>) -> Self {
        Self::polygon(id, vec![start, end])
    }

    /// 旋轉矩形（建築、牆壁）
    pub fn rectangle(id: OccluderId, center: Vec2<f32>, width: f32, height: f32, rotation: f32) -> Self {
        let (sin_r, cos_r) = rotation.sin_cos();
        let half_w = width * 0.5;
        let half_h = height * 0.5;

        let corners = [
            Vec2::new(-half_w, -half_h),
            Vec2::new(half_w, -half_h),
            Vec2::new(half_w, half_h),
            Vec2::new(-half_w, half_h),
        ];

        let vertices = corners
            .iter()
            .map(|c| center + Vec2::new(c.x * cos_r - c.y * sin_r, c.x * sin_r + c.y * cos_r))
            .collect();
        Self::polygon(id, vertices)
    }

    pub fn mark_removed(mut self) -> Self {
        self.removed = true;
        self
    }

    pub fn is_active(&self) -> bool {
        !self.removed && self.shape.is_valid()
    }
}

/// 相同擁有者的連續分箱
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerRun {
    pub owner: Option<OccluderId>,
    /// 起始分箱
    pub start: usize,
    /// 分箱數
    pub len: usize,
}

/// 一次建出的角度分箱視線場
///
/// 建好後不可變；下一次重建會產生新的實例整個替換。
#[derive(Debug, Clone)]
pub struct VisibilityField {
    pub(crate) depth: Vec<f32>,
    pub(crate) owner: Vec<Option<OccluderId>>,
    pub(crate) boundaries: Vec<usize>,
    pub(crate) visible_owners: HashSet<OccluderId>,
    pub(crate) build_duration: Duration,
}

impl VisibilityField {
    /// 所有方向都看不到任何東西的場
    pub fn unobstructed(bins: usize) -> Self {
        Self {
            depth: vec![f32::INFINITY; bins],
            owner: vec![None; bins],
            boundaries: Vec::new(),
            visible_owners: HashSet::new(),
            build_duration: Duration::ZERO,
        }
    }

    /// 沒有分箱的空場（全視模式使用）
    pub fn empty() -> Self {
        Self::unobstructed(0)
    }

    pub fn is_empty(&self) -> bool {
        self.depth.is_empty()
    }

    pub fn bins(&self) -> usize {
        self.depth.len()
    }

    /// 最小角固定為 -π
    pub fn min_angle(&self) -> f32 {
        -std::f32::consts::PI
    }

    pub fn bin_width(&self) -> f32 {
        if self.is_empty() {
            0.0
        } else {
            std::f32::consts::TAU / self.bins() as f32
        }
    }

    pub fn bin_center_angle(&self, bin: usize) -> f32 {
        bin_center_angle(bin, self.bins())
    }

    pub fn depth(&self, bin: usize) -> f32 {
        self.depth.get(bin).copied().unwrap_or(f32::INFINITY)
    }

    pub fn depths(&self) -> &[f32] {
        &self.depth
    }

    pub fn owner(&self, bin: usize) -> Option<OccluderId> {
        self.owner.get(bin).copied().flatten()
    }

    pub fn owners(&self) -> &[Option<OccluderId>] {
        &self.owner
    }

    /// 擁有者與前一個分箱（環狀）不同的分箱
    pub fn boundaries(&self) -> &[usize] {
        &self.boundaries
    }

    pub fn visible_owners(&self) -> &HashSet<OccluderId> {
        &self.visible_owners
    }

    pub fn is_owner_visible(&self, id: OccluderId) -> bool {
        self.visible_owners.contains(&id)
    }

    pub fn build_duration(&self) -> Duration {
        self.build_duration
    }

    /// 由邊界列表切出的連續同擁有者區段，依起始分箱排序
    ///
    /// 輪廓上每一段各自對應一個遮擋物（或空曠），繪製陰影邊緣時逐段處理。
    pub fn owner_runs(&self) -> Vec<OwnerRun> {
        let bins = self.bins();
        if bins == 0 {
            return Vec::new();
        }
        if self.boundaries.is_empty() {
            return vec![OwnerRun { owner: self.owner[0], start: 0, len: bins }];
        }

        let count = self.boundaries.len();
        (0..count)
            .map(|k| {
                let start = self.boundaries[k];
                let next = self.boundaries[(k + 1) % count];
                let len = if next > start { next - start } else { next + bins - start };
                OwnerRun { owner: self.owner[start], start, len }
            })
            .collect()
    }
}

impl Default for VisibilityField {
    fn default() -> Self {
        Self::empty()
    }
}
